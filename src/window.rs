//! Origin-shifted, length-bounded view over a seekable byte source.

use std::io::{self, Read, Seek, SeekFrom};

use symphonia::core::io::MediaSource;

/// A sub-range of a larger byte source, addressed as if it began at
/// offset zero.
///
/// The bitstream decoder only ever sees local offsets in `[0, size)`;
/// every access is translated onto `[start, start + size)` in the
/// underlying source. That lets a Vorbis stream embedded inside a larger
/// archive decode without the decoder knowing its true byte offsets.
///
/// The local position always stays within `[0, size]`; seeks outside the
/// window clamp to its bounds.
pub struct SourceWindow<R> {
    inner: R,
    start: u64,
    size: u64,
    pos: u64,
}

impl<R: Read + Seek> SourceWindow<R> {
    /// Window the source over `size` bytes starting at its current position.
    pub fn new(mut inner: R, size: u64) -> io::Result<Self> {
        let start = inner.stream_position()?;
        Ok(Self {
            inner,
            start,
            size,
            pos: 0,
        })
    }
}

impl<R: Read + Seek> Read for SourceWindow<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        // never read across the window's end
        let cap = (self.size - self.pos).min(buf.len() as u64) as usize;
        if cap == 0 {
            return Ok(0);
        }
        let n = self.inner.read(&mut buf[..cap])?;
        self.pos += n as u64;
        Ok(n)
    }
}

impl<R: Read + Seek> Seek for SourceWindow<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => offset as i128,
            SeekFrom::Current(offset) => self.pos as i128 + i128::from(offset),
            SeekFrom::End(offset) => self.size as i128 + i128::from(offset),
        };
        self.pos = target.clamp(0, self.size as i128) as u64;
        self.inner.seek(SeekFrom::Start(self.start + self.pos))?;
        Ok(self.pos)
    }
}

impl<R: Read + Seek + Send + Sync> MediaSource for SourceWindow<R> {
    fn is_seekable(&self) -> bool {
        true
    }

    fn byte_len(&self) -> Option<u64> {
        Some(self.size)
    }
}
