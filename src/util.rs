use crate::{ImageError, Result};

pub(crate) fn checked_range(bytes: &[u8], offset: u64, len: usize) -> Result<&[u8]> {
    let out_of_bounds = || ImageError::OutOfBounds {
        offset,
        len: len as u64,
        image_len: bytes.len() as u64,
    };

    let start = usize::try_from(offset).map_err(|_| out_of_bounds())?;
    let end = start.checked_add(len).ok_or_else(out_of_bounds)?;
    bytes.get(start..end).ok_or_else(out_of_bounds)
}

/// Fixed-size copy of a range the caller already sized to `N` bytes.
pub(crate) fn array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    bytes
        .try_into()
        .expect("unreachable: range is exactly N bytes")
}
