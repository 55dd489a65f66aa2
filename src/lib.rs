//! Incremental decoding of animated image sequences.
//!
//! A `FrameSequence` is parsed once and never changes afterwards. Each
//! consumer renders frames through its own `FrameSequenceState`, which reuses
//! the canvas it drew last instead of compositing from the first frame again.
//!
//! ```no_run
//! use framesequence::{Bitmap, FrameSequence};
//!
//! let data = std::fs::read("animation.gif").unwrap();
//! let sequence = FrameSequence::decode_bytes(&data).unwrap();
//! let mut state = sequence.create_state();
//! let mut canvas = Bitmap::new(sequence.width(), sequence.height());
//! let stride = canvas.stride();
//! for frame in 0..sequence.frame_count() {
//!     let previous = frame.checked_sub(1);
//!     let delay = state.draw_frame(frame, canvas.pixels_mut(), stride, previous).unwrap();
//!     println!("frame {} follows a {} ms pause", frame, delay);
//! }
//! ```

#[macro_use]
extern crate log;

mod traits;
mod types;
mod bitmap;
mod error;
mod stream;
mod reader;
mod registry;
mod sequence;
mod playback;

#[cfg(test)]
mod fixture;

pub use crate::traits::{HasParameters, Parameter};
pub use crate::types::{Block, ColorTable, DisposalMethod, Extension, ExtensionBlock, Frame, Rect};
pub use crate::bitmap::{argb, to_rgba, Bitmap, Color8888, COLOR_8888_ALPHA_MASK, TRANSPARENT};
pub use crate::error::{DecodingError, DrawError, Error};

/// Byte sources
pub use crate::stream::{ByteSource, MemorySource, ReaderSource, Source, Stream, DEFAULT_CHUNK_SIZE};
/// GIF block parser
pub use crate::reader::{Decoder, MemoryLimit, Progress, Reader, Screen};
pub use crate::registry::{Factory, FormatDescriptor, HeaderMatcher, Registry};
pub use crate::sequence::gif::{is_gif, GifSequence, GifState, DESCRIPTOR as GIF_DESCRIPTOR};
pub use crate::sequence::{DecodeOptions, FrameSequence, FrameSequenceState};
pub use crate::playback::{LoopBehavior, Player, DEFAULT_DELAY_MS, MIN_DELAY_MS};
