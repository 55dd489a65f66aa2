use crate::error::DecodingError;
use crate::stream::ByteSource;
use crate::traits::{HasParameters, Parameter};
use crate::types::{ColorTable, Frame};

mod decoder;
pub use self::decoder::{Decoder, MemoryLimit, Progress, Screen};

const BUF_SIZE: usize = 8 * 1024;

impl<'a, S, T> Parameter<Reader<'a, S>> for T
where
    T: Parameter<Decoder>,
    S: ByteSource + ?Sized,
{
    fn set_param(self, this: &mut Reader<'a, S>) {
        this.decoder.set(self);
    }
}

/// Drives a `Decoder` from a `ByteSource`.
pub struct Reader<'a, S: ByteSource + ?Sized> {
    source: &'a mut S,
    decoder: Decoder,
    buf: Vec<u8>,
    // Unconsumed part of `buf`
    pos: usize,
    len: usize,
}

impl<'a, S: ByteSource + ?Sized> HasParameters for Reader<'a, S> {}

impl<'a, S: ByteSource + ?Sized> Reader<'a, S> {
    pub fn new(source: &'a mut S) -> Reader<'a, S> {
        Reader {
            source,
            decoder: Decoder::new(),
            buf: vec![0; BUF_SIZE],
            pos: 0,
            len: 0,
        }
    }

    /// Reads the whole file, up to and including the trailer.
    pub fn read_to_end(&mut self) -> Result<&[Frame], DecodingError> {
        self.read_until(Progress::Trailer)?;
        Ok(self.decoder.frames())
    }

    /// Width of the image
    pub fn width(&self) -> u16 {
        self.decoder.width()
    }

    /// Height of the image
    pub fn height(&self) -> u16 {
        self.decoder.height()
    }

    /// The global color palette
    pub fn global_palette(&self) -> Option<&ColorTable> {
        self.decoder.global_palette()
    }

    /// Index of the background color in the global palette
    pub fn bg_color(&self) -> u8 {
        self.decoder.bg_color()
    }

    pub fn into_screen(self) -> Screen {
        self.decoder.into_screen()
    }

    fn read_until(&mut self, stop_at: Progress) -> Result<(), DecodingError> {
        while self.decoder.progress() != stop_at {
            if self.pos == self.len {
                self.len = self.source.read(&mut self.buf);
                self.pos = 0;
                if self.len == 0 {
                    return Err(DecodingError::Format("unexpected EOF"));
                }
            }
            let consumed = self.decoder.update(&self.buf[self.pos..self.len])?;
            self.pos += consumed;
        }
        Ok(())
    }
}
