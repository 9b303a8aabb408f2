use positioned_io2::ReadAt;
use std::fs::File;
use std::path::Path;
use thiserror::Error;

pub use crate::slice::Block;

pub mod slice;
mod util;

/// Block size of every image this crate serves. The superblock sits one
/// block in, the group descriptor table one block after that.
pub const BLOCK_SIZE: usize = 1024;

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("out of bounds: {len} bytes at offset {offset} (image is {image_len} bytes)")]
    OutOfBounds { offset: u64, len: u64, image_len: u64 },
    #[error("unsupported integer width: {0} bytes")]
    UnsupportedWidth(usize),
}

pub type Result<T> = std::result::Result<T, ImageError>;

/// An image file loaded once into an immutable buffer.
///
/// Nothing hands out mutable access; decoders borrow an [`ImageView`] for
/// as long as the `Image` lives and the buffer goes away when it drops.
pub struct Image {
    bytes: Vec<u8>,
}

impl Image {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::load(&file, file.metadata()?.len())
    }

    /// Read exactly `len` bytes from the start of `reader`.
    pub fn load<R: ReadAt>(reader: &R, len: u64) -> Result<Self> {
        let len = usize::try_from(len).map_err(|_| ImageError::OutOfBounds {
            offset: 0,
            len,
            image_len: usize::MAX as u64,
        })?;

        let mut bytes = vec![0u8; len];
        reader.read_exact_at(0, &mut bytes)?;
        log::debug!("loaded {} byte image ({} blocks)", len, len / BLOCK_SIZE);

        Ok(Self { bytes })
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn view(&self) -> ImageView<'_> {
        ImageView::new(&self.bytes)
    }
}

/// Borrowed, read-only window over an image buffer. Every access is
/// bounds-checked against the buffer length.
#[derive(Debug, Clone, Copy)]
pub struct ImageView<'a> {
    bytes: &'a [u8],
}

impl<'a> ImageView<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn block_size(&self) -> usize {
        BLOCK_SIZE
    }

    pub fn block_at(&self, block_num: u32) -> Result<Block<'a>> {
        let offset = u64::from(block_num) * BLOCK_SIZE as u64;
        let bytes = self.bytes_at(offset, BLOCK_SIZE)?;
        Ok(Block::new(block_num, offset, bytes))
    }

    pub fn bytes_at(&self, offset: u64, len: usize) -> Result<&'a [u8]> {
        util::checked_range(self.bytes, offset, len)
    }

    /// Decode an unsigned little-endian integer of `width` bytes (1, 2, 4 or 8).
    pub fn read_at(&self, offset: u64, width: usize) -> Result<u64> {
        match width {
            1 => self.read_u8(offset).map(u64::from),
            2 => self.read_u16(offset).map(u64::from),
            4 => self.read_u32(offset).map(u64::from),
            8 => Ok(u64::from_le_bytes(util::array(self.bytes_at(offset, 8)?))),
            _ => Err(ImageError::UnsupportedWidth(width)),
        }
    }

    pub fn read_u8(&self, offset: u64) -> Result<u8> {
        Ok(self.bytes_at(offset, 1)?[0])
    }

    pub fn read_u16(&self, offset: u64) -> Result<u16> {
        Ok(u16::from_le_bytes(util::array(self.bytes_at(offset, 2)?)))
    }

    pub fn read_u32(&self, offset: u64) -> Result<u32> {
        Ok(u32::from_le_bytes(util::array(self.bytes_at(offset, 4)?)))
    }
}
