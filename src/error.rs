/// Failure of the GIF block parser. Absorbed by the frame sequence, which
/// degrades to an empty sequence instead.
#[derive(Debug, thiserror::Error)]
pub enum DecodingError {
    #[error("{0}")]
    Format(&'static str),
}

/// Failure to pick a decoder for a byte source.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no registered format recognizes the source")]
    FormatUnrecognized,
}

/// Failure of `draw_frame`. The output buffer is left untouched.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum DrawError {
    #[error("frame sequence has no frames")]
    EmptySequence,
    #[error("frame {frame} out of range, sequence has {count} frames")]
    FrameOutOfRange { frame: usize, count: usize },
    #[error("stride of {stride} pixels is narrower than the canvas width {width}")]
    StrideTooSmall { stride: usize, width: usize },
    #[error("output buffer holds {len} pixels, {needed} needed")]
    BufferTooSmall { needed: usize, len: usize },
}
