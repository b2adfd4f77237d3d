//! sounddec - Streaming audio decoding to interleaved 16-bit PCM.
//!
//! Turns WAV and Ogg-Vorbis assets into fixed-format sample buffers on
//! demand, behind one pull-based contract a playback mixer can drive
//! without caring which container the bytes came from. Sources are
//! plain `Read + Seek` handles; a Vorbis stream may sit inside a larger
//! archive at a nonzero offset and is decoded through a bounded window.

mod decoder;
mod factory;
mod ogg;
mod wav;
mod window;

pub use decoder::SoundDecoder;
pub use factory::{create_decoder, AudioType};
pub use ogg::OggDecoder;
pub use wav::WavDecoder;
pub use window::SourceWindow;
