use std::fmt;
use std::io::{self, Write};

use crate::Bitmap;
use crate::dir::DirBlock;
use crate::inode::InodeEntry;
use crate::structs::{DirEntry, GroupDescriptor, Superblock};

/// Everything decoded from one image, ready to print.
#[derive(Debug, Clone)]
pub struct Report {
    pub superblock: Superblock,
    pub group: GroupDescriptor,
    pub block_bitmap: Vec<u8>,
    pub inode_bitmap: Vec<u8>,
    pub inodes: Vec<InodeEntry>,
    pub dir_blocks: Vec<DirBlock>,
}

impl Report {
    /// Write the report, directory entry names as their raw on-disk bytes.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let sb = &self.superblock;
        let gd = &self.group;

        writeln!(w, "Inodes: {}", sb.inodes_count)?;
        writeln!(w, "Blocks: {}", sb.blocks_count)?;
        writeln!(w, "Block group:")?;
        writeln!(w, "    block bitmap: {}", gd.block_bitmap)?;
        writeln!(w, "    inode bitmap: {}", gd.inode_bitmap)?;
        writeln!(w, "    inode table: {}", gd.inode_table)?;
        writeln!(w, "    free blocks: {}", gd.free_blocks_count)?;
        writeln!(w, "    free inodes: {}", gd.free_inodes_count)?;
        writeln!(w, "    used_dirs: {}", gd.used_dirs_count)?;

        let block_bytes = (sb.blocks_count / 8) as usize;
        let inode_bytes = (sb.inodes_count / 8) as usize;
        write!(w, "Block bitmap: {}", Bitmap::new(&self.block_bitmap).render(block_bytes))?;
        write!(w, "Inode bitmap: {}", Bitmap::new(&self.inode_bitmap).render(inode_bytes))?;

        writeln!(w)?;
        writeln!(w, "Inodes:")?;
        for entry in &self.inodes {
            write_inode(w, entry)?;
        }

        writeln!(w)?;
        writeln!(w, "Directory Blocks:")?;
        for block in &self.dir_blocks {
            writeln!(
                w,
                "   DIR BLOCK NUM: {} (for inode {})",
                block.block, block.owner
            )?;
            for entry in &block.entries {
                write_dir_entry(w, entry)?;
            }
        }

        Ok(())
    }
}

/// Lossy rendering: names that are not UTF-8 get replacement characters.
/// Use [`Report::write_to`] for the exact bytes.
impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = Vec::new();
        self.write_to(&mut buf).map_err(|_| fmt::Error)?;
        f.write_str(&String::from_utf8_lossy(&buf))
    }
}

fn write_inode<W: Write>(w: &mut W, entry: &InodeEntry) -> io::Result<()> {
    let inode = &entry.inode;
    writeln!(
        w,
        "[{}] type: {} size: {} links: {} blocks: {}",
        entry.number,
        entry.file_type.as_char(),
        inode.size,
        inode.links_count,
        inode.blocks
    )?;

    write!(w, "[{}] Blocks:", entry.number)?;
    for block in inode.used_blocks() {
        write!(w, " {block}")?;
    }
    writeln!(w)
}

fn write_dir_entry<W: Write>(w: &mut W, entry: &DirEntry) -> io::Result<()> {
    write!(
        w,
        "Inode: {} rec_len: {} name_len: {} type= {} name=",
        entry.inode,
        entry.rec_len,
        entry.name_len,
        entry.kind().as_char()
    )?;
    w.write_all(&entry.name)?;
    writeln!(w)
}
