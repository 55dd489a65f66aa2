//! Traits used in this library

/// Configuration parameter trait
pub trait Parameter<Object> {
    fn set_param(self, this: &mut Object);
}

/// Object has parameters
pub trait HasParameters: Sized {
    fn set<T: Parameter<Self>>(&mut self, value: T) -> &mut Self {
        value.set_param(self);
        self
    }
}

/// Reader extension to read little endian data
pub trait ReadBytesExt {
    fn le_u16(&self, offset: usize) -> Option<u16>;
}

impl ReadBytesExt for [u8] {
    #[inline]
    fn le_u16(&self, offset: usize) -> Option<u16> {
        match self.get(offset..offset + 2) {
            Some(b) => Some(u16::from(b[0]) | (u16::from(b[1]) << 8)),
            None => None,
        }
    }
}
