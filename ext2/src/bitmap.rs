//! Allocation bitmaps. Bit `i` covers inode or block `i + 1` and bits are
//! numbered least-significant first within each byte.

#[derive(Debug, Clone, Copy)]
pub struct Bitmap<'a>(&'a [u8]);

impl<'a> Bitmap<'a> {
    pub fn new(bmap: &'a [u8]) -> Self {
        Self(bmap)
    }

    /// Bits past the end of the map read as clear.
    pub fn is_in_use(&self, bit: usize) -> bool {
        self.0
            .get(bit / 8)
            .is_some_and(|&byte| (byte >> (bit % 8)) & 1 != 0)
    }

    /// The first `num_bytes` bytes as groups of eight `0`/`1` characters,
    /// lowest bit first, separated by single spaces, newline-terminated.
    pub fn render(&self, num_bytes: usize) -> String {
        let mut out = String::with_capacity(num_bytes * 9 + 1);
        for (i, &byte) in self.0.iter().take(num_bytes).enumerate() {
            if i > 0 {
                out.push(' ');
            }
            for bit in 0..8 {
                out.push(if (byte >> bit) & 1 != 0 { '1' } else { '0' });
            }
        }
        out.push('\n');
        out
    }
}
