//! Packed 32 bit output pixels

/// A pixel whose little-endian byte order is R, G, B, A.
pub type Color8888 = u32;

pub const TRANSPARENT: Color8888 = 0x0;
pub const COLOR_8888_ALPHA_MASK: Color8888 = 0xff00_0000;

/// Packs the channels into a `Color8888`.
#[inline]
pub fn argb(a: u8, r: u8, g: u8, b: u8) -> Color8888 {
    (u32::from(a) << 24) | (u32::from(b) << 16) | (u32::from(g) << 8) | u32::from(r)
}

/// Splits a `Color8888` into `[r, g, b, a]`.
#[inline]
pub fn to_rgba(color: Color8888) -> [u8; 4] {
    color.to_le_bytes()
}

/// Caller owned output surface, `stride` pixels per row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: usize,
    height: usize,
    stride: usize,
    pixels: Vec<Color8888>,
}

impl Bitmap {
    pub fn new(width: usize, height: usize) -> Bitmap {
        Bitmap::with_stride(width, height, width)
    }

    /// A bitmap embedded in a wider backing surface. `stride` is clamped to at least `width`.
    pub fn with_stride(width: usize, height: usize, stride: usize) -> Bitmap {
        let stride = stride.max(width);
        Bitmap {
            width,
            height,
            stride,
            pixels: vec![TRANSPARENT; stride * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn pixels(&self) -> &[Color8888] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [Color8888] {
        &mut self.pixels
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<Color8888> {
        if x < self.width && y < self.height {
            Some(self.pixels[y * self.stride + x])
        } else {
            None
        }
    }

    /// Tightly packed RGBA bytes, stride padding removed.
    pub fn to_rgba(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.width * self.height * 4);
        for row in self.pixels.chunks(self.stride.max(1)).take(self.height) {
            for &pixel in &row[..self.width] {
                out.extend_from_slice(&to_rgba(pixel));
            }
        }
        out
    }
}
