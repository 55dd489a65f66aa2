use std::cmp;
use std::mem;

use lzw::{Decoder as LzwDecoder, LsbReader};
use num::FromPrimitive;

use crate::error::DecodingError;
use crate::traits::{HasParameters, Parameter};
use crate::types::{
    Block, ColorTable, ExtensionBlock, Frame, CONTINUE_EXT_FUNC_CODE, PLTE_CHANNELS,
};

/// Output pixels are 32bit RGBA
pub const N_CHANNELS: usize = 4;

const DEFAULT_MEMORY_LIMIT: u64 = 256 * 1024 * 1024;

/// The LZW bit reader buffers at most 32 bits, i.e. 16 codes of the smallest width.
const MAX_BUFFERED_CODES: usize = 16;

/// Largest accepted RGBA canvas, in bytes. Larger images fail to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryLimit(pub u64);

impl Default for MemoryLimit {
    fn default() -> MemoryLimit {
        MemoryLimit(DEFAULT_MEMORY_LIMIT)
    }
}

impl MemoryLimit {
    fn admits(self, width: u16, height: u16) -> bool {
        u64::from(width) * u64::from(height) * N_CHANNELS as u64 <= self.0
    }
}

impl Parameter<Decoder> for MemoryLimit {
    fn set_param(self, this: &mut Decoder) {
        this.memory_limit = self
    }
}

/// Indicates the progress of decoding. Used for block-wise reading
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Progress {
    Start,
    BlockStart,
    DataStart,
    DataEnd,
    Trailer,
}

/// Internal state of the GIF decoder
#[derive(Debug)]
enum State {
    Magic(usize, [u8; 6]),
    U16Byte1(U16Value, u8),
    U16(U16Value),
    Byte(ByteValue),
    GlobalPalette(usize),
    BlockStart(Option<Block>),
    BlockEnd,
    ExtensionBlock(u8),
    SubBlock(usize),
    LocalPalette(usize),
    LzwInit(u8),
    DecodeSubBlock(Box<LzwDecoder<LsbReader>>, usize),
    Trailer,
}
use self::State::*;

/// U16 values that may occur in a GIF image
#[derive(Debug)]
enum U16Value {
    /// Logical screen descriptor width
    ScreenWidth,
    /// Logical screen descriptor height
    ScreenHeight,
    /// Left frame offset
    ImageLeft,
    /// Top frame offset
    ImageTop,
    /// Frame width
    ImageWidth,
    /// Frame height
    ImageHeight,
}

/// Single byte screen descriptor values
#[derive(Debug)]
enum ByteValue {
    GlobalFlags,
    Background { table_size: usize },
    AspectRatio { table_size: usize },
    ImageFlags,
    CodeSize,
}

/// Everything a GIF file declares
#[derive(Debug, Default)]
pub struct Screen {
    pub width: u16,
    pub height: u16,
    pub global_palette: Option<ColorTable>,
    /// Index of the background color in the global palette
    pub background_index: u8,
    pub frames: Vec<Frame>,
}

/// GIF decoder which supports streaming
#[derive(Debug)]
pub struct Decoder {
    state: Option<State>,
    progress: Progress,
    memory_limit: MemoryLimit,
    version: &'static str,
    screen: Screen,
    /// Extension currently being read
    ext: (u8, Vec<u8>),
    ext_blocks_read: usize,
    /// Saved extension blocks waiting for the next image
    pending_extensions: Vec<ExtensionBlock>,
    /// Frame data
    current: Option<usize>,
}

impl HasParameters for Decoder {}

impl Default for Decoder {
    fn default() -> Decoder {
        Decoder::new()
    }
}

impl Decoder {
    pub fn new() -> Decoder {
        Decoder {
            state: Some(Magic(0, [0; 6])),
            progress: Progress::Start,
            memory_limit: MemoryLimit::default(),
            version: "",
            screen: Screen::default(),
            ext: (0, Vec::with_capacity(256)), // 0xFF + 1 byte length
            ext_blocks_read: 0,
            pending_extensions: Vec::new(),
            current: None,
        }
    }

    /// Feeds `buf` to the decoder, returns the number of bytes consumed.
    /// Stops consuming once the trailer has been reached.
    pub fn update(&mut self, mut buf: &[u8]) -> Result<usize, DecodingError> {
        let len = buf.len();
        while !buf.is_empty() && self.progress != Progress::Trailer {
            let consumed = self.next_state(buf)?;
            buf = &buf[consumed..];
        }
        Ok(len - buf.len())
    }

    pub fn progress(&self) -> Progress {
        self.progress
    }

    /// "87a" or "89a" once the header has been read
    pub fn version(&self) -> &'static str {
        self.version
    }

    pub fn width(&self) -> u16 {
        self.screen.width
    }

    pub fn height(&self) -> u16 {
        self.screen.height
    }

    /// The global color palette
    pub fn global_palette(&self) -> Option<&ColorTable> {
        self.screen.global_palette.as_ref()
    }

    /// Index of the background color in the global palette
    pub fn bg_color(&self) -> u8 {
        self.screen.background_index
    }

    pub fn frames(&self) -> &[Frame] {
        &self.screen.frames
    }

    pub fn into_screen(self) -> Screen {
        self.screen
    }

    fn next_state(&mut self, buf: &[u8]) -> Result<usize, DecodingError> {
        macro_rules! goto (
            ($n:expr, $state:expr) => ({
                self.state = Some($state);
                Ok($n)
            });
            ($state:expr) => ({
                self.state = Some($state);
                Ok(1)
            })
        );

        let b = buf[0];

        let state = match self.state.take() {
            Some(state) => state,
            None => return Err(DecodingError::Format("decoder is in an invalid state")),
        };

        match state {
            Magic(i, mut version) => if i < 6 {
                version[i] = b;
                goto!(Magic(i + 1, version))
            } else if &version[..3] == b"GIF" {
                self.version = match &version[3..] {
                    b"87a" => "87a",
                    b"89a" => "89a",
                    _ => {
                        debug!("unknown GIF version {:?}, reading as 89a", &version[3..]);
                        ""
                    }
                };
                goto!(U16Byte1(U16Value::ScreenWidth, b))
            } else {
                Err(DecodingError::Format("malformed GIF header"))
            },
            U16(next) => goto!(U16Byte1(next, b)),
            U16Byte1(next, value) => {
                use self::U16Value::*;
                let value = (u16::from(b) << 8) | u16::from(value);
                match next {
                    ScreenWidth => {
                        self.screen.width = value;
                        goto!(U16(ScreenHeight))
                    }
                    ScreenHeight => {
                        self.screen.height = value;
                        if !self.memory_limit.admits(self.screen.width, self.screen.height) {
                            return Err(DecodingError::Format("image exceeds memory limit"));
                        }
                        goto!(Byte(ByteValue::GlobalFlags))
                    }
                    ImageLeft => {
                        self.current_frame_mut().left = value;
                        goto!(U16(ImageTop))
                    }
                    ImageTop => {
                        self.current_frame_mut().top = value;
                        goto!(U16(ImageWidth))
                    }
                    ImageWidth => {
                        self.current_frame_mut().width = value;
                        goto!(U16(ImageHeight))
                    }
                    ImageHeight => {
                        let memory_limit = self.memory_limit;
                        let frame = self.current_frame_mut();
                        frame.height = value;
                        if !memory_limit.admits(frame.width, frame.height) {
                            return Err(DecodingError::Format("frame exceeds memory limit"));
                        }
                        let required = frame.width as usize * frame.height as usize;
                        frame.buffer.reserve_exact(required);
                        goto!(Byte(ByteValue::ImageFlags))
                    }
                }
            }
            Byte(value) => {
                use self::ByteValue::*;
                match value {
                    GlobalFlags => {
                        let global_table = b & 0x80 != 0;
                        let entries = if global_table {
                            let bits = (b & 0b111) + 1;
                            let entries = PLTE_CHANNELS * (1 << bits);
                            self.screen.global_palette =
                                Some(ColorTable::new(bits, Vec::with_capacity(entries)));
                            entries
                        } else {
                            0usize
                        };
                        goto!(Byte(Background { table_size: entries }))
                    }
                    Background { table_size } => {
                        self.screen.background_index = b;
                        goto!(Byte(AspectRatio { table_size }))
                    }
                    AspectRatio { table_size } => goto!(GlobalPalette(table_size)),
                    ImageFlags => {
                        let local_table = (b & 0b1000_0000) != 0;
                        let interlaced = (b & 0b0100_0000) != 0;
                        let table_size = b & 0b0000_0111;

                        self.current_frame_mut().interlaced = interlaced;
                        if local_table {
                            let bits = table_size + 1;
                            let entries = PLTE_CHANNELS * (1 << bits);
                            self.current_frame_mut().palette =
                                Some(ColorTable::new(bits, Vec::with_capacity(entries)));
                            goto!(LocalPalette(entries))
                        } else {
                            goto!(Byte(CodeSize))
                        }
                    }
                    CodeSize => goto!(LzwInit(b)),
                }
            }
            GlobalPalette(left) => {
                if left > 0 {
                    let n = cmp::min(left, buf.len());
                    if let Some(table) = self.screen.global_palette.as_mut() {
                        table.push_entries(&buf[..n]);
                    }
                    goto!(n, GlobalPalette(left - n))
                } else {
                    let state = self.introducer(b)?;
                    goto!(state)
                }
            }
            BlockStart(type_) => match type_ {
                Some(Block::Image) => {
                    self.add_frame();
                    goto!(U16Byte1(U16Value::ImageLeft, b))
                }
                Some(Block::Extension) => goto!(ExtensionBlock(b)),
                Some(Block::Trailer) | None => {
                    Err(DecodingError::Format("unknown block type encountered"))
                }
            },
            BlockEnd => {
                let state = self.introducer(b)?;
                goto!(state)
            }
            ExtensionBlock(label) => {
                self.ext.0 = label;
                self.ext.1.clear();
                self.ext_blocks_read = 0;
                if b == 0 {
                    goto!(BlockEnd)
                } else {
                    goto!(SubBlock(b as usize))
                }
            }
            SubBlock(left) => {
                if left > 0 {
                    let n = cmp::min(left, buf.len());
                    self.ext.1.extend_from_slice(&buf[..n]);
                    goto!(n, SubBlock(left - n))
                } else {
                    self.save_ext_block();
                    if b == 0 {
                        goto!(BlockEnd)
                    } else {
                        goto!(SubBlock(b as usize))
                    }
                }
            }
            LocalPalette(left) => {
                if left > 0 {
                    let n = cmp::min(left, buf.len());
                    if let Some(table) = self.current_frame_mut().palette.as_mut() {
                        table.push_entries(&buf[..n]);
                    }
                    goto!(n, LocalPalette(left - n))
                } else {
                    goto!(LzwInit(b))
                }
            }
            LzwInit(code_size) => {
                if code_size == 0 || code_size > 11 {
                    return Err(DecodingError::Format("invalid minimal code size"));
                }
                self.progress = Progress::DataStart;
                if b == 0 {
                    self.finish_frame();
                    goto!(BlockEnd)
                } else {
                    goto!(DecodeSubBlock(
                        Box::new(LzwDecoder::new(LsbReader::new(), code_size)),
                        b as usize
                    ))
                }
            }
            DecodeSubBlock(mut decoder, left) => {
                if left > 0 {
                    let n = cmp::min(left, buf.len());
                    let mut data = &buf[..n];
                    while !data.is_empty() && !self.frame_complete() {
                        let (consumed, bytes) = decoder
                            .decode_bytes(data)
                            .map_err(|_| DecodingError::Format("invalid LZW code"))?;
                        self.push_pixels(bytes);
                        data = &data[consumed..];
                    }
                    goto!(n, DecodeSubBlock(decoder, left - n))
                } else if b != 0 {
                    // decode next sub-block
                    goto!(DecodeSubBlock(decoder, b as usize))
                } else {
                    // end of image data reached, flush codes still held by the bit reader
                    for _ in 0..MAX_BUFFERED_CODES {
                        if self.frame_complete() {
                            break;
                        }
                        let (_, bytes) = decoder
                            .decode_bytes(&[])
                            .map_err(|_| DecodingError::Format("invalid LZW code"))?;
                        self.push_pixels(bytes);
                    }
                    self.finish_frame();
                    goto!(BlockEnd)
                }
            }
            Trailer => goto!(Trailer),
        }
    }

    /// Resolves a block introducer byte.
    fn introducer(&mut self, b: u8) -> Result<State, DecodingError> {
        match Block::from_u8(b) {
            Some(Block::Trailer) => {
                self.progress = Progress::Trailer;
                Ok(Trailer)
            }
            Some(block) => {
                self.progress = Progress::BlockStart;
                Ok(BlockStart(Some(block)))
            }
            None => Err(DecodingError::Format("unknown block type encountered")),
        }
    }

    /// Saves the sub-block just read. Only the first sub-block of an
    /// extension carries its label.
    fn save_ext_block(&mut self) {
        let function = if self.ext_blocks_read == 0 {
            self.ext.0
        } else {
            CONTINUE_EXT_FUNC_CODE
        };
        self.ext_blocks_read += 1;
        let bytes = mem::replace(&mut self.ext.1, Vec::with_capacity(256));
        self.pending_extensions.push(ExtensionBlock { function, bytes });
    }

    fn add_frame(&mut self) {
        if self.current.is_none() {
            self.current = Some(self.screen.frames.len());
            let mut frame = Frame::default();
            frame.extensions = mem::take(&mut self.pending_extensions);
            frame.apply_control_extension();
            self.screen.frames.push(frame);
        }
    }

    fn frame_complete(&mut self) -> bool {
        let frame = self.current_frame_mut();
        frame.buffer.len() >= frame.width as usize * frame.height as usize
    }

    fn push_pixels(&mut self, bytes: &[u8]) {
        let frame = self.current_frame_mut();
        let required = frame.width as usize * frame.height as usize;
        let n = cmp::min(bytes.len(), required.saturating_sub(frame.buffer.len()));
        frame.buffer.extend_from_slice(&bytes[..n]);
    }

    fn finish_frame(&mut self) {
        let frame = self.current_frame_mut();
        let (width, height) = (frame.width as usize, frame.height as usize);
        if frame.buffer.len() < width * height {
            debug!(
                "image data too short ({} of {} pixels), padding",
                frame.buffer.len(),
                width * height
            );
        }
        frame.buffer.resize(width * height, 0);
        if frame.interlaced {
            frame.buffer = deinterlace(&frame.buffer, width, height);
        }
        self.current = None;
        self.progress = Progress::DataEnd;
    }

    #[inline(always)]
    fn current_frame_mut(&mut self) -> &mut Frame {
        if self.current.is_none() {
            self.add_frame();
        }
        let c = self.current.unwrap_or(0);
        &mut self.screen.frames[c]
    }
}

/// Moves rows stored in the four interlace passes into display order.
fn deinterlace(buf: &[u8], width: usize, height: usize) -> Vec<u8> {
    let mut out = vec![0; buf.len()];
    if width == 0 || height == 0 {
        return out;
    }
    let mut rows = buf.chunks(width);
    for &(start, step) in &[(0, 8), (4, 8), (2, 4), (1, 2)] {
        for y in (start..height).step_by(step) {
            if let Some(row) = rows.next() {
                out[y * width..(y + 1) * width].copy_from_slice(row);
            }
        }
    }
    out
}
