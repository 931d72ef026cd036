use std::io::{self, Read};
use std::sync::Arc;

use super::ReadAt;

/// Sequential reader over a bounded byte range of a [`ReadAt`] source.
///
/// Reads stop at the end of the range even if the source has more data.
pub struct SectionReader<R: ReadAt> {
    reader: Arc<R>,
    offset: u64,
    remaining: u64,
}

impl<R: ReadAt> SectionReader<R> {
    pub fn new(reader: Arc<R>, offset: u64, len: u64) -> Self {
        Self {
            reader,
            offset,
            remaining: len,
        }
    }

    /// Bytes left before the end of the range
    pub fn remaining(&self) -> u64 {
        self.remaining
    }
}

impl<R: ReadAt> Read for SectionReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }

        let want = buf.len().min(self.remaining.min(usize::MAX as u64) as usize);
        let n = self.reader.read_at(self.offset, &mut buf[..want])?;
        if n == 0 {
            // The range claims more bytes than the source holds
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "entry data truncated",
            ));
        }

        self.offset += n as u64;
        self.remaining -= n as u64;
        Ok(n)
    }
}
