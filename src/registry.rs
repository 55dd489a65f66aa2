//! Format detection and decoder dispatch
use crate::error::Error;
use crate::sequence::{gif, DecodeOptions, FrameSequence};
use crate::stream::ByteSource;

/// Recognizes a format from its first `header_len` bytes.
pub type HeaderMatcher = fn(&[u8]) -> bool;

/// Builds a sequence from a source positioned at the start of the file.
pub type Factory = fn(&mut dyn ByteSource, &DecodeOptions) -> FrameSequence;

/// Describes one supported container format.
#[derive(Debug, Clone, Copy)]
pub struct FormatDescriptor {
    pub name: &'static str,
    /// Bytes `is_format` needs to look at
    pub header_len: usize,
    pub is_format: HeaderMatcher,
    pub decode: Factory,
    /// Whether the decoder can work on the whole payload in place
    pub accepts_buffer: HeaderMatcher,
}

/// Ordered set of formats. Earlier registrations win ties.
#[derive(Debug, Clone)]
pub struct Registry {
    formats: Vec<FormatDescriptor>,
}

impl Default for Registry {
    /// All built-in formats.
    fn default() -> Registry {
        let mut registry = Registry::new();
        registry.register(gif::DESCRIPTOR);
        registry
    }
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Registry {
        Registry { formats: Vec::new() }
    }

    pub fn register(&mut self, format: FormatDescriptor) -> &mut Registry {
        self.formats.push(format);
        self
    }

    pub fn formats(&self) -> &[FormatDescriptor] {
        &self.formats
    }

    /// Longest header any registered format inspects.
    pub fn max_header_len(&self) -> usize {
        self.formats.iter().map(|f| f.header_len).max().unwrap_or(0)
    }

    /// Picks the format for `source` without consuming any of it.
    ///
    /// A format that accepts the in-memory payload is preferred. Otherwise the
    /// header is peeked once and matched in registration order.
    pub fn dispatch(&self, source: &mut dyn ByteSource) -> Result<&FormatDescriptor, Error> {
        if let Some(raw) = source.raw_buffer() {
            if let Some(format) = self.formats.iter().find(|f| (f.accepts_buffer)(raw)) {
                return Ok(format);
            }
        }
        let mut header = vec![0; self.max_header_len()];
        let len = source.peek(&mut header);
        let header = &header[..len];
        self.formats
            .iter()
            .find(|f| (f.is_format)(header))
            .ok_or(Error::FormatUnrecognized)
    }

    /// Dispatches and decodes. Only an unrecognized format is an error, a
    /// recognized but broken file gives an empty sequence.
    pub fn decode(
        &self,
        source: &mut dyn ByteSource,
        options: &DecodeOptions,
    ) -> Result<FrameSequence, Error> {
        let format = self.dispatch(source)?;
        debug!("decoding {} data", format.name);
        Ok((format.decode)(source, options))
    }
}
