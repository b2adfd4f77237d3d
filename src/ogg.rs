//! Ogg-Vorbis decoding through a windowed view of the byte source.

use std::collections::VecDeque;
use std::io::{Read, Seek};

use anyhow::{anyhow, Context, Result};
use symphonia::core::audio::{SampleBuffer, SignalSpec};
use symphonia::core::codecs::{Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::Time;

use crate::decoder::SoundDecoder;
use crate::window::SourceWindow;

/// Streaming decoder for Ogg-encapsulated Vorbis bitstreams.
///
/// The Vorbis page and frame structure is delegated entirely to the
/// bitstream decoder; this type windows the byte source so the decoder
/// sees a self-contained stream, pulls packets on demand, and hands the
/// caller interleaved 16-bit samples a buffer at a time.
pub struct OggDecoder {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    channels: u32,
    sample_rate: u32,
    total_samples: u64,
    sample_buf: Option<SampleBuffer<i16>>,
    sample_spec: Option<SignalSpec>,
    sample_cap: u64,
    pending: VecDeque<i16>,
    eof: bool,
}

impl OggDecoder {
    /// Open a Vorbis stream starting at the source's current position and
    /// spanning `size` bytes.
    pub fn new<R>(source: R, size: u64) -> Result<Self>
    where
        R: Read + Seek + Send + Sync + 'static,
    {
        let window = SourceWindow::new(source, size).context("OGG: failed to window source")?;
        let stream = MediaSourceStream::new(Box::new(window), Default::default());

        let mut hint = Hint::new();
        hint.with_extension("ogg");

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                stream,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .context("OGG: failed to open bitstream")?;
        let format = probed.format;

        let track = format
            .default_track()
            .ok_or_else(|| anyhow!("OGG: no audio track"))?;
        let track_id = track.id;
        let params = track.codec_params.clone();

        let decoder = symphonia::default::get_codecs()
            .make(&params, &DecoderOptions::default())
            .context("OGG: failed to create Vorbis decoder")?;

        let channels = params
            .channels
            .map(|c| c.count() as u32)
            .ok_or_else(|| anyhow!("OGG: channel count missing"))?;
        let sample_rate = params
            .sample_rate
            .ok_or_else(|| anyhow!("OGG: sample rate missing"))?;
        // total uses the stream's true channel count, the reported value
        // is clamped afterwards
        let total_samples = params.n_frames.unwrap_or(0) * u64::from(channels);

        Ok(Self {
            format,
            decoder,
            track_id,
            channels: channels.clamp(1, 2),
            sample_rate,
            total_samples,
            sample_buf: None,
            sample_spec: None,
            sample_cap: 0,
            pending: VecDeque::new(),
            eof: false,
        })
    }

    /// Decode packets into the pending queue until one yields samples.
    /// Returns false when this call can make no further progress; only a
    /// genuine end of stream latches `eof`, so a transient packet fault
    /// leaves the next `read` free to try the backend again.
    fn refill(&mut self) -> bool {
        loop {
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    self.eof = true;
                    return false;
                }
                Err(e) => {
                    log::warn!("OGG: packet read failed: {}", e);
                    return false;
                }
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(e) => {
                    // a corrupt packet is skipped, the next one advances
                    log::warn!("OGG: packet decode failed: {}", e);
                    continue;
                }
            };

            let spec = *decoded.spec();
            let capacity = decoded.capacity() as u64;
            let need_new = self.sample_buf.is_none()
                || self.sample_cap < capacity
                || self.sample_spec != Some(spec);
            if need_new {
                self.sample_buf = Some(SampleBuffer::<i16>::new(capacity, spec));
                self.sample_cap = capacity;
                self.sample_spec = Some(spec);
            }

            if let Some(buf) = self.sample_buf.as_mut() {
                buf.copy_interleaved_ref(decoded);
                self.pending.extend(buf.samples().iter().copied());
            }
            return true;
        }
    }
}

impl SoundDecoder for OggDecoder {
    fn channels(&self) -> u32 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_samples(&self) -> u64 {
        self.total_samples
    }

    fn read(&mut self, out: &mut [i16]) -> usize {
        if out.is_empty() {
            return 0;
        }

        let mut written = 0;
        loop {
            while written < out.len() {
                match self.pending.pop_front() {
                    Some(sample) => {
                        out[written] = sample;
                        written += 1;
                    }
                    None => break,
                }
            }
            if written == out.len() || self.eof {
                break;
            }
            if !self.refill() {
                break;
            }
        }
        written
    }

    fn seek(&mut self, seconds: f64) {
        let seconds = seconds.max(0.0);
        let time = Time {
            seconds: seconds.trunc() as u64,
            frac: seconds.fract(),
        };
        let target = SeekTo::Time {
            time,
            track_id: Some(self.track_id),
        };
        match self.format.seek(SeekMode::Coarse, target) {
            Ok(_) => {
                self.decoder.reset();
                self.pending.clear();
                self.eof = false;
            }
            Err(e) => {
                // position stays wherever the bitstream decoder left it
                log::warn!("OGG: seek to {}s failed: {}", seconds, e);
            }
        }
    }
}
