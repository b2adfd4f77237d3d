//! Decoder selection by declared audio type.

use std::io::{Read, Seek};

use crate::decoder::SoundDecoder;
use crate::ogg::OggDecoder;
use crate::wav::WavDecoder;

/// Audio format tag as declared by the asset table, not sniffed from
/// the bytes themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioType {
    /// Unknown or unsupported format; `create_decoder` refuses it
    /// without touching the source.
    None,
    Wav,
    Ogg,
}

/// Build the decoder matching `kind` for a source positioned at the
/// start of the asset. `size` is the declared payload length in bytes;
/// it bounds the Ogg window, while the WAV parser trusts its own chunk
/// walk instead.
///
/// Returns `None` for an unknown type or any malformed stream. The
/// cause is logged and the caller treats it as "could not load sound";
/// a returned decoder is always valid and ready to read.
pub fn create_decoder<R>(source: R, kind: AudioType, size: u64) -> Option<Box<dyn SoundDecoder>>
where
    R: Read + Seek + Send + Sync + 'static,
{
    let decoder: anyhow::Result<Box<dyn SoundDecoder>> = match kind {
        AudioType::Wav => WavDecoder::new(source).map(|d| Box::new(d) as Box<dyn SoundDecoder>),
        AudioType::Ogg => {
            OggDecoder::new(source, size).map(|d| Box::new(d) as Box<dyn SoundDecoder>)
        }
        AudioType::None => return None,
    };
    match decoder {
        Ok(decoder) => Some(decoder),
        Err(e) => {
            log::warn!("could not load sound: {:#}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, SeekFrom};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Byte source that counts every read and seek issued against it.
    struct TrackingSource {
        touches: Arc<AtomicUsize>,
    }

    impl Read for TrackingSource {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            self.touches.fetch_add(1, Ordering::SeqCst);
            Ok(0)
        }
    }

    impl Seek for TrackingSource {
        fn seek(&mut self, _pos: SeekFrom) -> io::Result<u64> {
            self.touches.fetch_add(1, Ordering::SeqCst);
            Ok(0)
        }
    }

    #[test]
    fn unknown_type_returns_none_without_touching_source() {
        let touches = Arc::new(AtomicUsize::new(0));
        let source = TrackingSource {
            touches: touches.clone(),
        };
        assert!(create_decoder(source, AudioType::None, 128).is_none());
        assert_eq!(touches.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn malformed_wav_returns_none() {
        let source = io::Cursor::new(b"not a riff container".to_vec());
        assert!(create_decoder(source, AudioType::Wav, 20).is_none());
    }

    #[test]
    fn malformed_ogg_returns_none() {
        let source = io::Cursor::new(vec![0u8; 256]);
        assert!(create_decoder(source, AudioType::Ogg, 256).is_none());
    }
}
