//! Builds GIF byte streams for tests.
use lzw::LsbWriter;

use crate::types::DisposalMethod;

const MIN_CODE_SIZE: u8 = 8;

pub struct ImageSpec {
    left: u16,
    top: u16,
    width: u16,
    height: u16,
    pixels: Vec<u8>,
    delay: u16,
    dispose: DisposalMethod,
    transparent: Option<u8>,
    interlaced: bool,
    palette: Option<Vec<[u8; 3]>>,
}

impl ImageSpec {
    pub fn new(left: u16, top: u16, width: u16, height: u16, pixels: Vec<u8>) -> ImageSpec {
        ImageSpec {
            left,
            top,
            width,
            height,
            pixels,
            delay: 0,
            dispose: DisposalMethod::Any,
            transparent: None,
            interlaced: false,
            palette: None,
        }
    }

    pub fn delay(mut self, delay: u16) -> ImageSpec {
        self.delay = delay;
        self
    }

    pub fn dispose(mut self, dispose: DisposalMethod) -> ImageSpec {
        self.dispose = dispose;
        self
    }

    pub fn transparent(mut self, index: u8) -> ImageSpec {
        self.transparent = Some(index);
        self
    }

    /// Pixels are given in stored (pass) order.
    pub fn interlaced(mut self) -> ImageSpec {
        self.interlaced = true;
        self
    }

    pub fn local_palette(mut self, colors: &[[u8; 3]]) -> ImageSpec {
        self.palette = Some(colors.to_vec());
        self
    }

    /// Encodes exactly these indices, whatever the declared size.
    pub fn raw_pixels(mut self, pixels: Vec<u8>) -> ImageSpec {
        self.pixels = pixels;
        self
    }
}

pub struct GifBuilder {
    width: u16,
    height: u16,
    background: u8,
    palette: Option<Vec<[u8; 3]>>,
    loop_count: Option<u16>,
    images: Vec<ImageSpec>,
}

impl GifBuilder {
    pub fn new(width: u16, height: u16) -> GifBuilder {
        GifBuilder {
            width,
            height,
            background: 0,
            palette: None,
            loop_count: None,
            images: Vec::new(),
        }
    }

    pub fn global_palette(mut self, colors: &[[u8; 3]]) -> GifBuilder {
        self.palette = Some(colors.to_vec());
        self
    }

    pub fn background(mut self, index: u8) -> GifBuilder {
        self.background = index;
        self
    }

    pub fn loop_count(mut self, count: u16) -> GifBuilder {
        self.loop_count = Some(count);
        self
    }

    pub fn image(mut self, image: ImageSpec) -> GifBuilder {
        self.images.push(image);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = b"GIF89a".to_vec();
        push_u16(&mut out, self.width);
        push_u16(&mut out, self.height);
        match self.palette {
            Some(ref colors) => {
                let bits = table_bits(colors.len());
                out.push(0x80 | (bits - 1));
                out.push(self.background);
                out.push(0);
                push_table(&mut out, colors, bits);
            }
            None => out.extend_from_slice(&[0, self.background, 0]),
        }
        if let Some(count) = self.loop_count {
            out.extend_from_slice(&[0x21, 0xFF, 11]);
            out.extend_from_slice(b"NETSCAPE2.0");
            out.extend_from_slice(&[3, 1]);
            push_u16(&mut out, count);
            out.push(0);
        }
        for image in &self.images {
            let flags = ((image.dispose as u8) << 2) | image.transparent.is_some() as u8;
            out.extend_from_slice(&[0x21, 0xF9, 4, flags]);
            push_u16(&mut out, image.delay);
            out.push(image.transparent.unwrap_or(0));
            out.push(0);

            out.push(0x2C);
            push_u16(&mut out, image.left);
            push_u16(&mut out, image.top);
            push_u16(&mut out, image.width);
            push_u16(&mut out, image.height);
            let flags = if image.interlaced { 0x40 } else { 0 };
            match image.palette {
                Some(ref colors) => {
                    let bits = table_bits(colors.len());
                    out.push(flags | 0x80 | (bits - 1));
                    push_table(&mut out, colors, bits);
                }
                None => out.push(flags),
            }
            out.push(MIN_CODE_SIZE);
            let mut data = Vec::new();
            lzw::encode(&image.pixels[..], LsbWriter::new(&mut data), MIN_CODE_SIZE)
                .unwrap();
            for chunk in data.chunks(255) {
                out.push(chunk.len() as u8);
                out.extend_from_slice(chunk);
            }
            out.push(0);
        }
        out.push(0x3B);
        out
    }
}

fn push_u16(out: &mut Vec<u8>, value: u16) {
    out.push(value as u8);
    out.push((value >> 8) as u8);
}

fn table_bits(len: usize) -> u8 {
    let mut bits = 1;
    while (1usize << bits) < len {
        bits += 1;
    }
    bits
}

fn push_table(out: &mut Vec<u8>, colors: &[[u8; 3]], bits: u8) {
    for i in 0..(1usize << bits) {
        out.extend_from_slice(&colors.get(i).cloned().unwrap_or([0, 0, 0]));
    }
}
