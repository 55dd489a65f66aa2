//! Byte sources with lookahead
use std::cmp;
use std::io::{self, Read};

/// Size of the temporary chunk `ReaderSource` requests per underlying read.
pub const DEFAULT_CHUNK_SIZE: usize = 16 * 1024;

/// Sequential byte access with non-consuming lookahead.
///
/// Both `peek` and `read` return the number of bytes delivered, which is
/// smaller than requested only at the end of the source. Bytes returned by
/// `peek` are returned again, in the same order, by the next `read`.
pub trait ByteSource {
    /// Copies up to `buf.len()` upcoming bytes without consuming them.
    fn peek(&mut self, buf: &mut [u8]) -> usize;

    /// Consumes up to `buf.len()` bytes. Zero means end of source.
    fn read(&mut self, buf: &mut [u8]) -> usize;

    /// The unread payload, if it is already contiguous in memory.
    fn raw_buffer(&self) -> Option<&[u8]> {
        None
    }
}

/// Medium underneath a `Stream`.
pub trait Source {
    /// Fills as much of `buf` as possible. Returns less than `buf.len()` only
    /// at the end of the medium, or after a read error.
    fn do_read(&mut self, buf: &mut [u8]) -> usize;

    fn raw_buffer(&self) -> Option<&[u8]> {
        None
    }
}

/// Adds a lookahead buffer to a `Source`.
#[derive(Debug)]
pub struct Stream<S> {
    source: S,
    peek_buffer: Vec<u8>,
    peek_offset: usize,
}

impl<S: Source> Stream<S> {
    pub fn new(source: S) -> Stream<S> {
        Stream {
            source,
            peek_buffer: Vec::new(),
            peek_offset: 0,
        }
    }

    pub fn into_inner(self) -> S {
        self.source
    }

    fn peek_remaining(&self) -> usize {
        self.peek_buffer.len() - self.peek_offset
    }
}

impl<'a> Stream<MemorySource<'a>> {
    pub fn from_bytes(data: &'a [u8]) -> Stream<MemorySource<'a>> {
        Stream::new(MemorySource::new(data))
    }
}

impl<R: Read> Stream<ReaderSource<R>> {
    pub fn from_reader(reader: R) -> Stream<ReaderSource<R>> {
        Stream::new(ReaderSource::new(reader))
    }
}

impl<S: Source> ByteSource for Stream<S> {
    fn peek(&mut self, buf: &mut [u8]) -> usize {
        let remaining = self.peek_remaining();
        if buf.len() > remaining {
            // keep the unconsumed lookahead at the front, then top it up
            self.peek_buffer.drain(..self.peek_offset);
            self.peek_offset = 0;
            self.peek_buffer.resize(buf.len(), 0);
            let read = self.source.do_read(&mut self.peek_buffer[remaining..]);
            self.peek_buffer.truncate(remaining + read);
        }
        let n = cmp::min(buf.len(), self.peek_remaining());
        buf[..n].copy_from_slice(&self.peek_buffer[self.peek_offset..self.peek_offset + n]);
        n
    }

    fn read(&mut self, buf: &mut [u8]) -> usize {
        let mut bytes_read = 0;
        let remaining = self.peek_remaining();
        if remaining > 0 {
            bytes_read = cmp::min(buf.len(), remaining);
            buf[..bytes_read].copy_from_slice(
                &self.peek_buffer[self.peek_offset..self.peek_offset + bytes_read],
            );
            self.peek_offset += bytes_read;
            if self.peek_offset == self.peek_buffer.len() {
                self.peek_buffer.clear();
                self.peek_offset = 0;
            }
        }
        if bytes_read < buf.len() {
            bytes_read += self.source.do_read(&mut buf[bytes_read..]);
        }
        bytes_read
    }

    /// Only available while no lookahead is pending.
    fn raw_buffer(&self) -> Option<&[u8]> {
        if self.peek_remaining() == 0 {
            self.source.raw_buffer()
        } else {
            None
        }
    }
}

/// Payload already in memory.
#[derive(Debug, Clone)]
pub struct MemorySource<'a> {
    data: &'a [u8],
}

impl<'a> MemorySource<'a> {
    pub fn new(data: &'a [u8]) -> MemorySource<'a> {
        MemorySource { data }
    }
}

impl<'a> Source for MemorySource<'a> {
    fn do_read(&mut self, buf: &mut [u8]) -> usize {
        let n = cmp::min(buf.len(), self.data.len());
        buf[..n].copy_from_slice(&self.data[..n]);
        self.data = &self.data[n..];
        n
    }

    fn raw_buffer(&self) -> Option<&[u8]> {
        Some(self.data)
    }
}

/// Any `io::Read`, pulled in chunks. Read errors end the source.
#[derive(Debug)]
pub struct ReaderSource<R> {
    reader: R,
    chunk_size: usize,
    failed: bool,
}

impl<R: Read> ReaderSource<R> {
    pub fn new(reader: R) -> ReaderSource<R> {
        ReaderSource::with_chunk_size(reader, DEFAULT_CHUNK_SIZE)
    }

    pub fn with_chunk_size(reader: R, chunk_size: usize) -> ReaderSource<R> {
        ReaderSource {
            reader,
            chunk_size: cmp::max(chunk_size, 1),
            failed: false,
        }
    }
}

impl<R: Read> Source for ReaderSource<R> {
    fn do_read(&mut self, buf: &mut [u8]) -> usize {
        let mut total = 0;
        while total < buf.len() && !self.failed {
            let requested = cmp::min(buf.len() - total, self.chunk_size);
            match self.reader.read(&mut buf[total..total + requested]) {
                Ok(0) => break,
                Ok(n) => total += n,
                Err(ref err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => {
                    warn!("stream read failed: {}", err);
                    self.failed = true;
                }
            }
        }
        total
    }
}
