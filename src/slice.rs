use crate::{ImageError, Result, util};

/// One block of the image. Field reads are relative to the block start,
/// errors report absolute image offsets.
#[derive(Debug, Clone, Copy)]
pub struct Block<'a> {
    number: u32,
    offset: u64,
    bytes: &'a [u8],
}

impl<'a> Block<'a> {
    pub fn new(number: u32, offset: u64, bytes: &'a [u8]) -> Self {
        Self {
            number,
            offset,
            bytes,
        }
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn range(&self, pos: usize, len: usize) -> Result<&'a [u8]> {
        util::checked_range(self.bytes, pos as u64, len).map_err(|_| ImageError::OutOfBounds {
            offset: self.offset + pos as u64,
            len: len as u64,
            image_len: self.offset + self.bytes.len() as u64,
        })
    }

    pub fn u8_at(&self, pos: usize) -> Result<u8> {
        Ok(self.range(pos, 1)?[0])
    }

    pub fn u16_at(&self, pos: usize) -> Result<u16> {
        Ok(u16::from_le_bytes(util::array(self.range(pos, 2)?)))
    }

    pub fn u32_at(&self, pos: usize) -> Result<u32> {
        Ok(u32::from_le_bytes(util::array(self.range(pos, 4)?)))
    }
}
