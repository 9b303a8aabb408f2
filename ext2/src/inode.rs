use image_view::ImageView;

use crate::structs::{GroupDescriptor, Inode};
use crate::{
    Bitmap, EXT2_FT_DIR, EXT2_FT_REG_FILE, EXT2_FT_SYMLINK, EXT2_GOOD_OLD_FIRST_INO,
    EXT2_ROOT_INO, EXT2_S_IFDIR, EXT2_S_IFLNK, EXT2_S_IFREG, Ext2Error, Result, block_offset,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Directory,
    RegularFile,
    Symlink,
    Other,
}

impl FileType {
    pub fn as_char(self) -> char {
        match self {
            FileType::Directory => 'd',
            FileType::RegularFile => 'f',
            FileType::Symlink => 'l',
            FileType::Other => '?',
        }
    }
}

/// The bit patterns that mark each type in one encoding.
#[derive(Debug, Clone, Copy)]
pub struct TypeBits {
    pub dir: u16,
    pub reg: u16,
    pub symlink: u16,
}

pub const INODE_MODE_TYPE_BITS: TypeBits = TypeBits {
    dir: EXT2_S_IFDIR,
    reg: EXT2_S_IFREG,
    symlink: EXT2_S_IFLNK,
};

pub const DIR_ENTRY_TYPE_BITS: TypeBits = TypeBits {
    dir: EXT2_FT_DIR as u16,
    reg: EXT2_FT_REG_FILE as u16,
    symlink: EXT2_FT_SYMLINK as u16,
};

/// Classify by testing whether every bit of a pattern is set, in the order
/// directory, regular file, symlink. The first match wins.
///
/// The patterns overlap (`S_IFLNK` contains `S_IFREG`, `FT_SYMLINK`
/// contains `FT_DIR`), so the order decides those cases.
pub fn classify(bits: u16, masks: TypeBits) -> FileType {
    let has = |mask: u16| bits & mask == mask;

    if has(masks.dir) {
        FileType::Directory
    } else if has(masks.reg) {
        FileType::RegularFile
    } else if has(masks.symlink) {
        FileType::Symlink
    } else {
        FileType::Other
    }
}

/// Root first, unconditionally, then every ordinary inode whose bitmap
/// bit is set, in increasing order.
pub fn in_use_inodes(bitmap: Bitmap<'_>, inodes_count: u32) -> impl Iterator<Item = u32> + '_ {
    let ordinary = (EXT2_GOOD_OLD_FIRST_INO..=inodes_count)
        .filter(move |&ino| bitmap.is_in_use((ino - 1) as usize));

    if !bitmap.is_in_use((EXT2_ROOT_INO - 1) as usize) {
        log::warn!("root inode is not marked in the inode bitmap, reporting it anyway");
    }
    std::iter::once(EXT2_ROOT_INO).chain(ordinary)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InodeEntry {
    pub number: u32,
    pub inode: Inode,
    pub file_type: FileType,
}

pub struct InodeTable<'a> {
    view: ImageView<'a>,
    start: u64,
    record_size: u64,
}

impl<'a> InodeTable<'a> {
    pub fn new(view: ImageView<'a>, group: &GroupDescriptor, record_size: u16) -> Self {
        Self {
            view,
            start: block_offset(group.inode_table),
            record_size: u64::from(record_size),
        }
    }

    pub fn read_inode(&self, inode_num: u32) -> Result<Inode> {
        if inode_num == 0 {
            return Err(Ext2Error::InvalidInode(inode_num));
        }

        let offset = self.start + u64::from(inode_num - 1) * self.record_size;
        Inode::read(&self.view, offset)
    }

    pub fn entry(&self, inode_num: u32) -> Result<InodeEntry> {
        let inode = self.read_inode(inode_num)?;
        let file_type = classify(inode.mode, INODE_MODE_TYPE_BITS);
        log::trace!(
            "inode {inode_num}: mode {:#o} -> {file_type:?} uid {} gid {} flags {:#x} dtime {}",
            inode.mode,
            inode.uid,
            inode.gid,
            inode.flags,
            inode.dtime
        );

        Ok(InodeEntry {
            number: inode_num,
            inode,
            file_type,
        })
    }
}
