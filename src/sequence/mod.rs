//! Decoded frame sequences and their compositing state
use std::io::Read;

use crate::bitmap::Color8888;
use crate::error::{DrawError, Error};
use crate::reader::MemoryLimit;
use crate::registry::Registry;
use crate::stream::Stream;
use crate::traits::{HasParameters, Parameter};

pub mod gif;
pub use self::gif::{GifSequence, GifState};

/// Settings handed to a format decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecodeOptions {
    memory_limit: MemoryLimit,
}

impl HasParameters for DecodeOptions {}

impl Parameter<DecodeOptions> for MemoryLimit {
    fn set_param(self, this: &mut DecodeOptions) {
        this.memory_limit = self
    }
}

impl DecodeOptions {
    pub fn new() -> DecodeOptions {
        DecodeOptions::default()
    }

    pub fn memory_limit(&self) -> MemoryLimit {
        self.memory_limit
    }
}

/// An immutable, fully decoded animation.
#[derive(Debug, Clone)]
pub enum FrameSequence {
    Gif(GifSequence),
}

impl FrameSequence {
    /// Decodes an in-memory file with the default registry.
    pub fn decode_bytes(data: &[u8]) -> Result<FrameSequence, Error> {
        Registry::default().decode(&mut Stream::from_bytes(data), &DecodeOptions::default())
    }

    /// Decodes a file from any reader with the default registry.
    pub fn decode_reader<R: Read>(reader: R) -> Result<FrameSequence, Error> {
        Registry::default().decode(&mut Stream::from_reader(reader), &DecodeOptions::default())
    }

    pub fn width(&self) -> usize {
        match *self {
            FrameSequence::Gif(ref seq) => seq.width(),
        }
    }

    pub fn height(&self) -> usize {
        match *self {
            FrameSequence::Gif(ref seq) => seq.height(),
        }
    }

    pub fn is_opaque(&self) -> bool {
        match *self {
            FrameSequence::Gif(ref seq) => seq.is_opaque(),
        }
    }

    pub fn frame_count(&self) -> usize {
        match *self {
            FrameSequence::Gif(ref seq) => seq.frame_count(),
        }
    }

    /// Zero means loop forever.
    pub fn default_loop_count(&self) -> u32 {
        match *self {
            FrameSequence::Gif(ref seq) => seq.default_loop_count(),
        }
    }

    pub fn duration_ms(&self) -> u64 {
        match *self {
            FrameSequence::Gif(ref seq) => seq.duration_ms(),
        }
    }

    /// A fresh compositing state. States never share data with each other.
    pub fn create_state(&self) -> FrameSequenceState<'_> {
        match *self {
            FrameSequence::Gif(ref seq) => FrameSequenceState::Gif(seq.create_state()),
        }
    }
}

/// Compositing state bound to one `FrameSequence`.
#[derive(Debug)]
pub enum FrameSequenceState<'a> {
    Gif(GifState<'a>),
}

impl<'a> FrameSequenceState<'a> {
    /// See `GifState::draw_frame`.
    pub fn draw_frame(
        &mut self,
        frame: usize,
        output: &mut [Color8888],
        stride: usize,
        previous: Option<usize>,
    ) -> Result<u64, DrawError> {
        match *self {
            FrameSequenceState::Gif(ref mut state) => {
                state.draw_frame(frame, output, stride, previous)
            }
        }
    }
}
