//! Byte sinks and sources that give out after a fixed number of bytes, for
//! exercising the I/O error paths of the codecs.

use std::io::{self, Read, Write};

/// Accepts at most `max` bytes, then reports that nothing more was written.
pub struct FixedWriter {
    buf: Vec<u8>,
    max: usize,
}

impl FixedWriter {
    pub fn new(max: usize) -> Self {
        Self {
            buf: Vec::with_capacity(max),
            max,
        }
    }

    pub fn written(&self) -> &[u8] {
        &self.buf
    }
}

impl Write for FixedWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let room = self.max - self.buf.len();
        let n = room.min(data.len());
        self.buf.extend_from_slice(&data[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Yields at most the first `max` bytes of `data`, then end of stream.
pub struct FixedReader {
    data: Vec<u8>,
    pos: usize,
}

impl FixedReader {
    pub fn new(max: usize, data: &[u8]) -> Self {
        let end = max.min(data.len());
        Self {
            data: data[..end].to_vec(),
            pos: 0,
        }
    }
}

impl Read for FixedReader {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let n = (self.data.len() - self.pos).min(out.len());
        out[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

