//! Common types used by the block parser and the frame sequence
use num::FromPrimitive;

use crate::bitmap::{self, Color8888};
use crate::traits::ReadBytesExt;

/// Implements `num::FromPrimitive` for a fieldless enum from its discriminants.
macro_rules! from_primitive {
    ($name:ident { $($variant:ident = $value:expr),+ $(,)* }) => {
        impl FromPrimitive for $name {
            fn from_i64(n: i64) -> Option<$name> {
                if n < 0 { None } else { $name::from_u64(n as u64) }
            }

            fn from_u64(n: u64) -> Option<$name> {
                match n {
                    $(n if n == $value => Some($name::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

/// Disposal method
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum DisposalMethod {
    /// Decoder is not required to take any action.
    Any = 0,
    /// Do not dispose.
    Keep = 1,
    /// Restore to background color.
    Background = 2,
    /// Restore to previous.
    Previous = 3,
}

from_primitive!(DisposalMethod { Any = 0, Keep = 1, Background = 2, Previous = 3 });

impl DisposalMethod {
    /// Whether the frame's pixels are cleared away before the next frame is composited.
    pub fn will_be_cleared(self) -> bool {
        self == DisposalMethod::Background || self == DisposalMethod::Previous
    }
}

/// Known block types
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Block {
    Image = 0x2C,
    Extension = 0x21,
    Trailer = 0x3B,
}

from_primitive!(Block { Image = 0x2C, Extension = 0x21, Trailer = 0x3B });

/// Known GIF extensions
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Extension {
    Text = 0x01,
    Control = 0xF9,
    Comment = 0xFE,
    Application = 0xFF,
}

from_primitive!(Extension { Text = 0x01, Control = 0xF9, Comment = 0xFE, Application = 0xFF });

/// Function code of every extension sub-block after the first one.
pub const CONTINUE_EXT_FUNC_CODE: u8 = 0x00;

/// One saved extension sub-block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionBlock {
    pub function: u8,
    pub bytes: Vec<u8>,
}

/// RGB color table, as stored in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorTable {
    bits_per_pixel: u8,
    entries: Vec<u8>,
}

/// GIF palettes are RGB
pub const PLTE_CHANNELS: usize = 3;

impl ColorTable {
    pub fn new(bits_per_pixel: u8, entries: Vec<u8>) -> ColorTable {
        ColorTable { bits_per_pixel, entries }
    }

    /// Number of colors actually present.
    pub fn len(&self) -> usize {
        self.entries.len() / PLTE_CHANNELS
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn bits_per_pixel(&self) -> u8 {
        self.bits_per_pixel
    }

    /// The color count agrees with the declared bit depth.
    pub fn is_consistent(&self) -> bool {
        self.bits_per_pixel >= 1
            && self.bits_per_pixel <= 8
            && self.len() == 1 << self.bits_per_pixel
    }

    /// Opaque packed color of `index`.
    #[inline]
    pub fn color(&self, index: u8) -> Option<Color8888> {
        let offset = index as usize * PLTE_CHANNELS;
        self.entries
            .get(offset..offset + PLTE_CHANNELS)
            .map(|c| bitmap::argb(0xff, c[0], c[1], c[2]))
    }

    pub fn entries(&self) -> &[u8] {
        &self.entries
    }

    pub(crate) fn push_entries(&mut self, bytes: &[u8]) {
        self.entries.extend_from_slice(bytes);
    }
}

/// Sub-rectangle of the canvas
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Rect {
    pub left: u16,
    pub top: u16,
    pub width: u16,
    pub height: u16,
}

impl Rect {
    /// Returns true if `self` completely covers the area of `covered`.
    pub fn covers(&self, covered: &Rect) -> bool {
        let (left, top) = (u32::from(self.left), u32::from(self.top));
        let (c_left, c_top) = (u32::from(covered.left), u32::from(covered.top));
        left <= c_left
            && c_left + u32::from(covered.width) <= left + u32::from(self.width)
            && top <= c_top
            && c_top + u32::from(covered.height) <= top + u32::from(self.height)
    }

    /// Width and height of the part inside a `max_width` x `max_height` canvas.
    pub fn copy_size(&self, max_width: usize, max_height: usize) -> (usize, usize) {
        let width = (self.width as usize).min(max_width.saturating_sub(self.left as usize));
        let height = (self.height as usize).min(max_height.saturating_sub(self.top as usize));
        (width, height)
    }
}

/// A frame
#[derive(Debug, Clone)]
pub struct Frame {
    /// Delay in units of 10 ms
    pub delay: u16,
    pub dispose: DisposalMethod,
    pub transparent: Option<u8>,
    pub needs_user_input: bool,
    pub top: u16,
    pub left: u16,
    pub width: u16,
    pub height: u16,
    pub interlaced: bool,
    pub palette: Option<ColorTable>,
    /// Index data, `width * height` bytes in display row order
    pub buffer: Vec<u8>,
    /// Extension sub-blocks preceding the image
    pub extensions: Vec<ExtensionBlock>,
}

impl Default for Frame {
    fn default() -> Frame {
        Frame {
            delay: 0,
            dispose: DisposalMethod::Any,
            transparent: None,
            needs_user_input: false,
            top: 0,
            left: 0,
            width: 0,
            height: 0,
            interlaced: false,
            palette: None,
            buffer: Vec::new(),
            extensions: Vec::new(),
        }
    }
}

impl Frame {
    pub fn rect(&self) -> Rect {
        Rect {
            left: self.left,
            top: self.top,
            width: self.width,
            height: self.height,
        }
    }

    pub fn delay_ms(&self) -> u64 {
        u64::from(self.delay) * 10
    }

    /// Applies the first graphic control extension attached to this frame.
    pub(crate) fn apply_control_extension(&mut self) {
        let control = self.extensions.iter().find(|ext| {
            Extension::from_u8(ext.function) == Some(Extension::Control)
        });
        let bytes = match control {
            Some(ext) => &ext.bytes,
            None => return,
        };
        if bytes.len() != 4 {
            debug!("ignoring graphic control block of length {}", bytes.len());
            return;
        }
        let flags = bytes[0];
        self.dispose = DisposalMethod::from_u8((flags & 0b1_1100) >> 2).unwrap_or_else(|| {
            debug!("unknown disposal method {}", (flags & 0b1_1100) >> 2);
            DisposalMethod::Any
        });
        self.needs_user_input = flags & 0b10 != 0;
        self.delay = bytes.le_u16(1).unwrap_or(0);
        self.transparent = if flags & 1 != 0 { Some(bytes[3]) } else { None };
    }
}
