//! Pull-based decoder contract shared by every supported audio format.

/// A trait for streaming audio decoders that turn a compressed or raw
/// container into interleaved 16-bit PCM samples, one buffer at a time.
///
/// A decoder that exists has already parsed its headers and located a
/// usable payload; construction fails otherwise. The playback engine
/// drives it by calling `read` each tick and `seek` on demand.
pub trait SoundDecoder: Send {
    /// Channel count of the decoded stream, clamped to 1 or 2.
    fn channels(&self) -> u32;

    /// Sample rate of the decoded stream in Hz.
    fn sample_rate(&self) -> u32;

    /// Total decodable samples (frames x channels), fixed at open time.
    fn total_samples(&self) -> u64;

    /// Fill `out` with as many interleaved i16 samples as are available,
    /// up to `out.len()`, and return how many were written. Returns 0
    /// only at end of stream or for an empty request; partial results
    /// accumulate across repeated calls until the stream is exhausted.
    fn read(&mut self, out: &mut [i16]) -> usize;

    /// Reposition so the next `read` starts at `seconds` from the
    /// beginning of the stream. Negative times clamp to zero, times past
    /// the end clamp to end of stream. A seek the backend rejects is
    /// logged and leaves the playback position unchanged.
    fn seek(&mut self, seconds: f64);
}
