//! Animated GIF frame sequence and its incremental compositor
use crate::bitmap::{Color8888, COLOR_8888_ALPHA_MASK, TRANSPARENT};
use crate::error::DrawError;
use crate::reader::{Reader, Screen};
use crate::registry::FormatDescriptor;
use crate::sequence::{DecodeOptions, FrameSequence};
use crate::stream::ByteSource;
use crate::traits::HasParameters;
use crate::types::{
    ColorTable, DisposalMethod, Extension, ExtensionBlock, Frame, Rect, CONTINUE_EXT_FUNC_CODE,
};

/// Number of header bytes needed to recognize a GIF
pub const GIF_STAMP_LEN: usize = 6;

const GIF_STAMPS: [&[u8; GIF_STAMP_LEN]; 3] = [b"GIFVER", b"GIF87a", b"GIF89a"];

const NETSCAPE_LOOP: &[u8] = b"NETSCAPE2.0";

/// Registry entry for GIF.
pub const DESCRIPTOR: FormatDescriptor = FormatDescriptor {
    name: "gif",
    header_len: GIF_STAMP_LEN,
    is_format: is_gif,
    decode: decode_gif,
    accepts_buffer,
};

/// Returns true if `header` starts with one of the GIF stamps.
pub fn is_gif(header: &[u8]) -> bool {
    header.len() >= GIF_STAMP_LEN
        && GIF_STAMPS.iter().any(|stamp| header[..GIF_STAMP_LEN] == stamp[..])
}

/// GIF data is always parsed from the stream.
fn accepts_buffer(_: &[u8]) -> bool {
    false
}

fn decode_gif(source: &mut dyn ByteSource, options: &DecodeOptions) -> FrameSequence {
    FrameSequence::Gif(GifSequence::new(source, options))
}

/// A fully parsed GIF, with the disposal bookkeeping derived from it.
///
/// A failed parse yields an inert sequence: zero frames, zero size.
#[derive(Debug, Clone)]
pub struct GifSequence {
    width: u16,
    height: u16,
    global_palette: Option<ColorTable>,
    frames: Vec<Frame>,
    loop_count: u32,
    bg_color: Color8888,
    /// `preserved_frames[i]`: the canvas as it is after frame `i` must be
    /// saved, because a later frame restores to it.
    preserved_frames: Vec<bool>,
    /// `restoring_frames[i]`: the frame whose saved canvas is restored when
    /// frame `i` is disposed.
    restoring_frames: Vec<Option<usize>>,
}

impl Default for GifSequence {
    fn default() -> GifSequence {
        GifSequence {
            width: 0,
            height: 0,
            global_palette: None,
            frames: Vec::new(),
            loop_count: 1,
            bg_color: TRANSPARENT,
            preserved_frames: Vec::new(),
            restoring_frames: Vec::new(),
        }
    }
}

impl GifSequence {
    /// Reads a whole GIF from `source`. Parse failures are logged and produce
    /// an inert sequence.
    pub fn new<S: ByteSource + ?Sized>(source: &mut S, options: &DecodeOptions) -> GifSequence {
        let mut reader = Reader::new(source);
        reader.set(options.memory_limit());
        if let Err(err) = reader.read_to_end() {
            warn!("gif load failed: {}", err);
            return GifSequence::default();
        }
        GifSequence::from_screen(reader.into_screen())
    }

    /// Derives loop count, background and disposal bookkeeping from a parsed file.
    pub fn from_screen(screen: Screen) -> GifSequence {
        let count = screen.frames.len();
        let mut loop_count = 1;
        let mut preserved_frames = vec![false; count];
        let mut restoring_frames = vec![None; count];
        let mut last_uncleared = None;

        for (i, frame) in screen.frames.iter().enumerate() {
            if let Some(n) = netscape_loop_count(&frame.extensions) {
                loop_count = n;
            }
            if frame.dispose == DisposalMethod::Previous {
                if let Some(last) = last_uncleared {
                    debug!("frame {} restores to frame {}", i, last);
                    preserved_frames[last] = true;
                    restoring_frames[i] = Some(last);
                }
            }
            if !frame.dispose.will_be_cleared() {
                last_uncleared = Some(i);
            }
        }

        let first_opaque = screen.frames.first().map_or(false, |f| f.transparent.is_none());
        let bg_color = match screen.global_palette {
            Some(ref table) if first_opaque => {
                table.color(screen.background_index).unwrap_or_else(|| {
                    debug!("background index {} outside color table", screen.background_index);
                    TRANSPARENT
                })
            }
            _ => TRANSPARENT,
        };

        let sequence = GifSequence {
            width: screen.width,
            height: screen.height,
            global_palette: screen.global_palette,
            frames: screen.frames,
            loop_count,
            bg_color,
            preserved_frames,
            restoring_frames,
        };
        debug!(
            "GIF {}x{}, {} frames, {} ms, loop count {}",
            sequence.width,
            sequence.height,
            count,
            sequence.duration_ms(),
            sequence.loop_count
        );
        sequence
    }

    pub fn width(&self) -> usize {
        self.width as usize
    }

    pub fn height(&self) -> usize {
        self.height as usize
    }

    /// The canvas background has full alpha.
    pub fn is_opaque(&self) -> bool {
        self.bg_color & COLOR_8888_ALPHA_MASK == COLOR_8888_ALPHA_MASK
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Loop count declared by the file, 1 if it declares none. Zero means forever.
    pub fn default_loop_count(&self) -> u32 {
        self.loop_count
    }

    /// Sum of all frame delays.
    pub fn duration_ms(&self) -> u64 {
        self.frames.iter().map(Frame::delay_ms).sum()
    }

    pub fn background_color(&self) -> Color8888 {
        self.bg_color
    }

    pub fn global_palette(&self) -> Option<&ColorTable> {
        self.global_palette.as_ref()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn preserved_frame(&self, frame: usize) -> bool {
        self.preserved_frames.get(frame).cloned().unwrap_or(false)
    }

    pub fn restoring_frame(&self, frame: usize) -> Option<usize> {
        self.restoring_frames.get(frame).cloned().flatten()
    }

    pub fn create_state(&self) -> GifState<'_> {
        GifState {
            sequence: self,
            preserve_buffer: Vec::new(),
            preserve_buffer_frame: None,
        }
    }
}

/// Application extension `NETSCAPE2.0` followed by a `[1, lo, hi]` sub-block.
fn netscape_loop_count(extensions: &[ExtensionBlock]) -> Option<u32> {
    extensions
        .windows(2)
        .filter_map(|pair| {
            let (app, data) = (&pair[0], &pair[1]);
            if app.function == Extension::Application as u8
                && app.bytes == NETSCAPE_LOOP
                && data.function == CONTINUE_EXT_FUNC_CODE
                && data.bytes.len() == 3
                && data.bytes[0] == 1
            {
                Some(u32::from(data.bytes[1]) | u32::from(data.bytes[2]) << 8)
            } else {
                None
            }
        })
        .last()
}

/// Per-consumer compositing state.
///
/// Keeps one saved canvas for "restore to previous" disposal. Each state is
/// independent, any number may draw from the same sequence concurrently.
#[derive(Debug)]
pub struct GifState<'a> {
    sequence: &'a GifSequence,
    preserve_buffer: Vec<Color8888>,
    /// Frame whose composited canvas `preserve_buffer` holds
    preserve_buffer_frame: Option<usize>,
}

impl<'a> GifState<'a> {
    pub fn sequence(&self) -> &'a GifSequence {
        self.sequence
    }

    /// Renders frame `frame_nr` into `output`, a canvas of `stride` pixels per row.
    ///
    /// `previous` names the frame `output` currently shows. When it precedes
    /// `frame_nr` only the frames in between are composited, otherwise the
    /// canvas is rebuilt from frame 0. Returns how long the frame before
    /// `frame_nr` (cyclically) is shown, in milliseconds.
    pub fn draw_frame(
        &mut self,
        frame_nr: usize,
        output: &mut [Color8888],
        stride: usize,
        previous: Option<usize>,
    ) -> Result<u64, DrawError> {
        let seq = self.sequence;
        let count = seq.frame_count();
        if count == 0 {
            return Err(DrawError::EmptySequence);
        }
        if frame_nr >= count {
            return Err(DrawError::FrameOutOfRange { frame: frame_nr, count });
        }
        let (width, height) = (seq.width(), seq.height());
        if stride < width {
            return Err(DrawError::StrideTooSmall { stride, width });
        }
        let needed = match height.checked_sub(1) {
            None => 0,
            Some(rows) => stride
                .checked_mul(rows)
                .and_then(|n| n.checked_add(width))
                .ok_or(DrawError::BufferTooSmall { needed: usize::MAX, len: output.len() })?,
        };
        if output.len() < needed {
            return Err(DrawError::BufferTooSmall { needed, len: output.len() });
        }
        let shown = (frame_nr + count - 1) % count;
        let delay = seq.frames[shown].delay_ms();
        if width == 0 || height == 0 {
            return Ok(delay);
        }

        let mut start = match previous {
            Some(previous) if previous < frame_nr => previous + 1,
            _ => 0,
        };
        if start > 0 {
            let last = start - 1;
            // nothing was saved to undo this frame with
            if seq.frames[last].dispose == DisposalMethod::Previous
                && seq.restoring_frames[last].is_none()
            {
                debug!("frame {} cannot be restored away, redrawing from frame 0", last);
                start = 0;
            }
        }
        for i in start.saturating_sub(1)..frame_nr {
            if let Some(restore) = seq.restoring_frames[i] {
                if self.preserve_buffer_frame != Some(restore) {
                    debug!(
                        "frame {} restores frame {} but {:?} is saved, redrawing from frame 0",
                        i, restore, self.preserve_buffer_frame
                    );
                    start = 0;
                }
            }
        }

        for i in start..=frame_nr {
            let frame = &seq.frames[i];
            trace!("compositing frame {} of {}", i, count);
            if i == 0 {
                for row in output.chunks_mut(stride).take(height) {
                    row[..width].fill(seq.bg_color);
                }
            } else {
                let prev = &seq.frames[i - 1];
                if seq.preserved_frames[i - 1] {
                    self.save_preserve_buffer(i - 1, output, stride);
                }
                let covered = frame.transparent.is_none() && frame.rect().covers(&prev.rect());
                if prev.dispose.will_be_cleared() && !covered {
                    match prev.dispose {
                        DisposalMethod::Background => {
                            clear_rect(output, stride, prev.rect(), width, height)
                        }
                        DisposalMethod::Previous if seq.restoring_frames[i - 1].is_some() => {
                            self.restore_preserve_buffer(output, stride)
                        }
                        _ => {}
                    }
                }
            }
            if i == frame_nr || !frame.dispose.will_be_cleared() {
                self.draw_image(frame, output, stride);
            }
        }

        Ok(delay)
    }

    fn draw_image(&self, frame: &Frame, output: &mut [Color8888], stride: usize) {
        let seq = self.sequence;
        let table = match frame.palette.as_ref().or_else(|| seq.global_palette.as_ref()) {
            Some(table) => table,
            None => {
                warn!("frame has no color table, skipping");
                return;
            }
        };
        if !table.is_consistent() {
            warn!(
                "color table of {} colors does not match its {} bit depth",
                table.len(),
                table.bits_per_pixel()
            );
        }

        let (copy_width, copy_height) = frame.rect().copy_size(seq.width(), seq.height());
        if copy_width == 0 {
            return;
        }
        let frame_width = frame.width as usize;
        for y in 0..copy_height {
            let src_start = y * frame_width;
            let src = match frame.buffer.get(src_start..src_start + copy_width) {
                Some(src) => src,
                None => break,
            };
            let dst_start = (frame.top as usize + y) * stride + frame.left as usize;
            let dst = &mut output[dst_start..dst_start + copy_width];
            copy_line(dst, src, table, frame.transparent);
        }
    }

    fn save_preserve_buffer(&mut self, frame_nr: usize, output: &[Color8888], stride: usize) {
        if self.preserve_buffer_frame == Some(frame_nr) {
            return;
        }
        let (width, height) = (self.sequence.width(), self.sequence.height());
        if self.preserve_buffer.is_empty() {
            self.preserve_buffer = vec![TRANSPARENT; width * height];
        }
        for (saved, row) in self
            .preserve_buffer
            .chunks_mut(width)
            .zip(output.chunks(stride))
        {
            saved.copy_from_slice(&row[..width]);
        }
        self.preserve_buffer_frame = Some(frame_nr);
    }

    fn restore_preserve_buffer(&self, output: &mut [Color8888], stride: usize) {
        if self.preserve_buffer.is_empty() {
            warn!("restore requested before any canvas was saved");
            return;
        }
        let width = self.sequence.width();
        for (row, saved) in output
            .chunks_mut(stride)
            .zip(self.preserve_buffer.chunks(width))
        {
            row[..width].copy_from_slice(saved);
        }
    }
}

/// Sets the part of `rect` inside the canvas to transparent.
fn clear_rect(output: &mut [Color8888], stride: usize, rect: Rect, width: usize, height: usize) {
    let (copy_width, copy_height) = rect.copy_size(width, height);
    if copy_width == 0 {
        return;
    }
    for y in 0..copy_height {
        let start = (rect.top as usize + y) * stride + rect.left as usize;
        output[start..start + copy_width].fill(TRANSPARENT);
    }
}

/// Transparent and out-of-table indices leave the destination alone.
#[inline]
fn copy_line(dst: &mut [Color8888], src: &[u8], table: &ColorTable, transparent: Option<u8>) {
    for (pixel, &index) in dst.iter_mut().zip(src) {
        if Some(index) == transparent {
            continue;
        }
        if let Some(color) = table.color(index) {
            *pixel = color;
        }
    }
}
