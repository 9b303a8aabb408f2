use image_view::{ImageError, ImageView};
use thiserror::Error;

pub use crate::bitmap::Bitmap;
pub use crate::dir::{DirBlock, walk_block, walk_directories, walk_directory_inode};
pub use crate::inode::{
    DIR_ENTRY_TYPE_BITS, FileType, INODE_MODE_TYPE_BITS, InodeEntry, InodeTable, TypeBits,
    classify, in_use_inodes,
};
pub use crate::report::Report;
pub use crate::structs::{DirEntry, GroupDescriptor, Inode, Superblock};

pub mod bitmap;
pub mod dir;
pub mod inode;
pub mod report;
pub mod structs;

#[derive(Error, Debug)]
pub enum Ext2Error {
    #[error(transparent)]
    Image(#[from] ImageError),
    #[error("Invalid inode number: {0}")]
    InvalidInode(u32),
    #[error("Invalid directory entry in block {block} at offset {offset}: {reason}")]
    InvalidDirectoryEntry {
        block: u32,
        offset: usize,
        reason: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, Ext2Error>;

pub const EXT2_SUPER_MAGIC: u16 = 0xEF53;
pub const EXT2_SUPERBLOCK_OFFSET: u64 = 1024;
pub const EXT2_GROUP_DESC_BLOCK: u32 = 2;
pub const EXT2_ROOT_INO: u32 = 2;
pub const EXT2_GOOD_OLD_FIRST_INO: u32 = 11;
pub const EXT2_GOOD_OLD_INODE_SIZE: u16 = 128;
pub const EXT2_SECTOR_SIZE: u32 = 512;

pub const EXT2_S_IFDIR: u16 = 0x4000;
pub const EXT2_S_IFREG: u16 = 0x8000;
pub const EXT2_S_IFLNK: u16 = 0xA000;

pub const EXT2_FT_REG_FILE: u8 = 1;
pub const EXT2_FT_DIR: u8 = 2;
pub const EXT2_FT_SYMLINK: u8 = 7;

pub const EXT2_NDIR_BLOCKS: usize = 12;
pub const EXT2_IND_BLOCK: usize = EXT2_NDIR_BLOCKS;
pub const EXT2_DIND_BLOCK: usize = EXT2_IND_BLOCK + 1;
pub const EXT2_TIND_BLOCK: usize = EXT2_DIND_BLOCK + 1;
pub const EXT2_N_BLOCKS: usize = EXT2_TIND_BLOCK + 1;

/// Decode everything the report shows, in report order.
pub fn inspect(view: ImageView<'_>) -> Result<Report> {
    let superblock = Superblock::read(&view)?;
    superblock.log_suspicious_fields();
    let group = GroupDescriptor::read(&view)?;

    let block_bitmap_len = (superblock.blocks_count / 8) as usize;
    let block_bitmap = view
        .bytes_at(block_offset(group.block_bitmap), block_bitmap_len)?
        .to_vec();

    let inode_bitmap_len = superblock.inodes_count.div_ceil(8) as usize;
    let inode_bitmap = view
        .bytes_at(block_offset(group.inode_bitmap), inode_bitmap_len)?
        .to_vec();

    let table = InodeTable::new(view, &group, superblock.inode_record_size());
    let inodes = in_use_inodes(Bitmap::new(&inode_bitmap), superblock.inodes_count)
        .map(|number| table.entry(number))
        .collect::<Result<Vec<_>>>()?;
    log::info!("{} inodes in use", inodes.len());

    let dir_blocks = walk_directories(&view, &inodes)?;

    Ok(Report {
        superblock,
        group,
        block_bitmap,
        inode_bitmap,
        inodes,
        dir_blocks,
    })
}

pub(crate) fn block_offset(block_num: u32) -> u64 {
    u64::from(block_num) * image_view::BLOCK_SIZE as u64
}
