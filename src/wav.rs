//! RIFF/WAVE container parsing and streaming of raw 16-bit PCM payloads.

use std::io::{Read, Seek, SeekFrom};

use anyhow::{bail, Context, Result};

use crate::decoder::SoundDecoder;

const BYTES_PER_SAMPLE: u64 = 2;

fn read_le_u16<R: Read>(source: &mut R) -> std::io::Result<u16> {
    let mut buf = [0u8; 2];
    source.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

fn read_le_u32<R: Read>(source: &mut R) -> std::io::Result<u32> {
    let mut buf = [0u8; 4];
    source.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

/// Streaming decoder for 16-bit PCM WAV files.
///
/// The constructor walks the chunk list until it has seen a usable
/// `fmt ` chunk and the start of the `data` chunk, then leaves the
/// source positioned at the first payload byte. Only 16-bit integer
/// PCM is accepted; every other depth or format code is rejected.
pub struct WavDecoder<R> {
    source: R,
    channels: u32,
    sample_rate: u32,
    total_samples: u64,
    block_align: u64,
    payload_start: u64,
    payload_len: u64,
    remaining: u64,
    scratch: Vec<u8>,
}

impl<R: Read + Seek> WavDecoder<R> {
    /// Parse the container starting at the source's current position.
    pub fn new(mut source: R) -> Result<Self> {
        let mut header = [0u8; 12];
        source
            .read_exact(&mut header)
            .context("WAV: truncated header")?;
        if &header[0..4] != b"RIFF" || &header[8..12] != b"WAVE" {
            bail!("WAV: invalid header");
        }
        // The RIFF size field (header[4..8]) is read but not trusted.

        let mut fmt_seen = false;
        let mut channels = 0u32;
        let mut sample_rate = 0u32;
        let mut block_align = 0u64;

        let (payload_start, payload_len) = loop {
            let mut tag = [0u8; 4];
            if source.read_exact(&mut tag).is_err() {
                bail!("WAV: no data chunk before end of stream");
            }
            let length = u64::from(read_le_u32(&mut source).context("WAV: truncated chunk")?);

            match &tag {
                b"fmt " if length >= 16 => {
                    // 1 = integer PCM; 3 shows up on mislabeled 16-bit files
                    let format = read_le_u16(&mut source)?;
                    if format != 0x0001 && format != 0x0003 {
                        bail!("WAV: unsupported format code {}", format);
                    }
                    channels = u32::from(read_le_u16(&mut source)?);
                    sample_rate = read_le_u32(&mut source)?;
                    // byte rate, unused
                    source.seek(SeekFrom::Current(4))?;
                    block_align = u64::from(read_le_u16(&mut source)?);
                    if block_align == 0 {
                        bail!("WAV: zero block align");
                    }
                    let bits = read_le_u16(&mut source)?;
                    if bits != 16 {
                        bail!("WAV: unsupported sample depth {}", bits);
                    }
                    // skip whatever the chunk declares past the 16 bytes read
                    source.seek(SeekFrom::Current(length as i64 - 16))?;
                    fmt_seen = true;
                }
                b"data" => {
                    if !fmt_seen {
                        bail!("WAV: data chunk before fmt chunk");
                    }
                    break (source.stream_position()?, length);
                }
                _ => {
                    source.seek(SeekFrom::Current(length as i64))?;
                }
            }
        };

        Ok(Self {
            source,
            channels: channels.clamp(1, 2),
            sample_rate,
            total_samples: payload_len / BYTES_PER_SAMPLE,
            block_align,
            payload_start,
            payload_len,
            remaining: payload_len,
            scratch: Vec::new(),
        })
    }
}

impl<R: Read + Seek + Send> SoundDecoder for WavDecoder<R> {
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

        // Clamp the request to what is left, then round down to whole
        // block-align units so a frame is never split.
        let want = (out.len() as u64 * BYTES_PER_SAMPLE).min(self.remaining);
        let want = want - want % self.block_align;
        if want == 0 {
            return 0;
        }

        // The staging buffer grows to the largest request and is reused
        // across calls.
        if self.scratch.len() < want as usize {
            self.scratch.resize(want as usize, 0);
        }
        let got = match self.source.read(&mut self.scratch[..want as usize]) {
            Ok(n) => n as u64,
            Err(e) => {
                log::warn!("WAV: payload read failed: {}", e);
                return 0;
            }
        };
        let got = got - got % self.block_align;
        self.remaining -= got;

        let mut written = 0;
        for (slot, pair) in out
            .iter_mut()
            .zip(self.scratch[..got as usize].chunks_exact(2))
        {
            *slot = i16::from_le_bytes([pair[0], pair[1]]);
            written += 1;
        }
        written
    }

    fn seek(&mut self, seconds: f64) {
        let seconds = seconds.max(0.0);
        let offset = (seconds * self.sample_rate as f64) as u64
            * BYTES_PER_SAMPLE
            * u64::from(self.channels);
        let offset = offset.min(self.payload_len);
        match self.source.seek(SeekFrom::Start(self.payload_start + offset)) {
            Ok(_) => self.remaining = self.payload_len - offset,
            Err(e) => log::warn!("WAV: seek to {}s failed: {}", seconds, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Build a minimal canonical WAV byte stream around the given samples.
    fn wav_bytes(format: u16, channels: u16, rate: u32, bits: u16, samples: &[i16]) -> Vec<u8> {
        let block_align = channels * bits / 8;
        let data_len = (samples.len() * 2) as u32;
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(4 + 24 + 8 + data_len).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&format.to_le_bytes());
        out.extend_from_slice(&channels.to_le_bytes());
        out.extend_from_slice(&rate.to_le_bytes());
        out.extend_from_slice(&(rate * u32::from(block_align)).to_le_bytes());
        out.extend_from_slice(&block_align.to_le_bytes());
        out.extend_from_slice(&bits.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_len.to_le_bytes());
        for s in samples {
            out.extend_from_slice(&s.to_le_bytes());
        }
        out
    }

    fn stereo_fixture() -> (Vec<i16>, Vec<u8>) {
        let samples = vec![100i16, -100, 2000, -2000, 30000, -30000, 7, -7];
        let bytes = wav_bytes(1, 2, 44100, 16, &samples);
        (samples, bytes)
    }

    #[test]
    fn parses_canonical_stereo() {
        let (samples, bytes) = stereo_fixture();
        let mut dec = WavDecoder::new(Cursor::new(bytes)).unwrap();
        assert_eq!(dec.channels(), 2);
        assert_eq!(dec.sample_rate(), 44100);
        assert_eq!(dec.total_samples(), 8);

        let mut buf = [0i16; 8];
        assert_eq!(dec.read(&mut buf), 8);
        assert_eq!(&buf, samples.as_slice());
        assert_eq!(dec.read(&mut buf), 0);
    }

    #[test]
    fn accepts_float_tagged_header() {
        let bytes = wav_bytes(3, 1, 22050, 16, &[1, 2, 3, 4]);
        let dec = WavDecoder::new(Cursor::new(bytes)).unwrap();
        assert_eq!(dec.total_samples(), 4);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = wav_bytes(1, 2, 44100, 16, &[0; 4]);
        bytes[0..4].copy_from_slice(b"RIFX");
        assert!(WavDecoder::new(Cursor::new(bytes)).is_err());
    }

    #[test]
    fn rejects_unsupported_depths() {
        for bits in [8u16, 24, 32] {
            let bytes = wav_bytes(1, 2, 44100, bits, &[0; 4]);
            assert!(
                WavDecoder::new(Cursor::new(bytes)).is_err(),
                "depth {} must be rejected",
                bits
            );
        }
    }

    #[test]
    fn rejects_unknown_format_code() {
        let bytes = wav_bytes(2, 2, 44100, 16, &[0; 4]);
        assert!(WavDecoder::new(Cursor::new(bytes)).is_err());
    }

    #[test]
    fn rejects_zero_block_align() {
        let mut bytes = wav_bytes(1, 2, 44100, 16, &[0; 4]);
        // block align field sits 12 bytes into the fmt chunk body
        bytes[32] = 0;
        bytes[33] = 0;
        assert!(WavDecoder::new(Cursor::new(bytes)).is_err());
    }

    #[test]
    fn rejects_missing_data_chunk() {
        let bytes = wav_bytes(1, 2, 44100, 16, &[0; 4]);
        // truncate right after the fmt chunk
        assert!(WavDecoder::new(Cursor::new(bytes[..36].to_vec())).is_err());
    }

    #[test]
    fn rejects_data_before_fmt() {
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&20u32.to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"data");
        out.extend_from_slice(&4u32.to_le_bytes());
        out.extend_from_slice(&[0u8; 4]);
        assert!(WavDecoder::new(Cursor::new(out)).is_err());
    }

    #[test]
    fn skips_unknown_chunks() {
        let (samples, canonical) = stereo_fixture();
        // splice a LIST chunk between the header and the fmt chunk
        let mut bytes = canonical[..12].to_vec();
        bytes.extend_from_slice(b"LIST");
        bytes.extend_from_slice(&6u32.to_le_bytes());
        bytes.extend_from_slice(b"junk!!");
        bytes.extend_from_slice(&canonical[12..]);

        let mut dec = WavDecoder::new(Cursor::new(bytes)).unwrap();
        let mut buf = [0i16; 8];
        assert_eq!(dec.read(&mut buf), 8);
        assert_eq!(&buf, samples.as_slice());
    }

    #[test]
    fn partial_reads_reassemble_payload() {
        let (samples, bytes) = stereo_fixture();
        let mut dec = WavDecoder::new(Cursor::new(bytes)).unwrap();

        // 3 samples is not a whole stereo frame; each call rounds down
        // to one frame until the payload runs out.
        let mut collected = Vec::new();
        let mut buf = [0i16; 3];
        loop {
            let n = dec.read(&mut buf);
            if n == 0 {
                break;
            }
            collected.extend_from_slice(&buf[..n]);
        }
        assert_eq!(collected, samples);
    }

    #[test]
    fn reads_sum_to_total_samples() {
        let (_, bytes) = stereo_fixture();
        let mut dec = WavDecoder::new(Cursor::new(bytes)).unwrap();
        let mut buf = [0i16; 6];
        let mut total = 0u64;
        loop {
            let n = dec.read(&mut buf);
            if n == 0 {
                break;
            }
            total += n as u64;
        }
        assert_eq!(total, dec.total_samples());
    }

    #[test]
    fn seek_to_zero_restarts() {
        let (samples, bytes) = stereo_fixture();
        let mut dec = WavDecoder::new(Cursor::new(bytes)).unwrap();
        let mut buf = [0i16; 8];
        assert_eq!(dec.read(&mut buf), 8);

        dec.seek(0.0);
        assert_eq!(dec.read(&mut buf), 8);
        assert_eq!(&buf, samples.as_slice());
    }

    #[test]
    fn seek_past_end_clamps_to_eos() {
        let (_, bytes) = stereo_fixture();
        let mut dec = WavDecoder::new(Cursor::new(bytes)).unwrap();
        dec.seek(1e9);
        let mut buf = [0i16; 8];
        assert_eq!(dec.read(&mut buf), 0);
    }

    #[test]
    fn negative_seek_clamps_to_start() {
        let (samples, bytes) = stereo_fixture();
        let mut dec = WavDecoder::new(Cursor::new(bytes)).unwrap();
        dec.seek(-5.0);
        let mut buf = [0i16; 8];
        assert_eq!(dec.read(&mut buf), 8);
        assert_eq!(&buf, samples.as_slice());
    }

    #[test]
    fn mid_stream_seek_yields_tail() {
        let (samples, bytes) = stereo_fixture();
        let mut dec = WavDecoder::new(Cursor::new(bytes)).unwrap();
        // lands between frame 2 and 3, truncating to 2 whole frames
        dec.seek(2.5 / 44100.0);
        let mut buf = [0i16; 8];
        let n = dec.read(&mut buf);
        assert_eq!(n, 4);
        assert_eq!(&buf[..4], &samples[4..]);
    }
}
