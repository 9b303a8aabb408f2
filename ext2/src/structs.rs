use image_view::{BLOCK_SIZE, ImageView};
use uuid::Uuid;

use crate::{
    EXT2_GOOD_OLD_INODE_SIZE, EXT2_GROUP_DESC_BLOCK, EXT2_N_BLOCKS, EXT2_SECTOR_SIZE,
    EXT2_SUPER_MAGIC, EXT2_SUPERBLOCK_OFFSET, Result, block_offset,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Superblock {
    pub inodes_count: u32,
    pub blocks_count: u32,
    pub free_blocks_count: u32,
    pub free_inodes_count: u32,
    pub first_data_block: u32,
    pub log_block_size: u32,
    pub blocks_per_group: u32,
    pub inodes_per_group: u32,
    pub magic: u16,
    pub state: u16,
    pub rev_level: u32,
    pub first_ino: u32,
    pub inode_size: u16,
    pub uuid: Uuid,
    pub volume_name: [u8; 16],
}

impl Superblock {
    pub fn read(view: &ImageView<'_>) -> Result<Self> {
        let base = EXT2_SUPERBLOCK_OFFSET;
        let uuid = Uuid::from_slice(view.bytes_at(base + 104, 16)?)
            .unwrap_or_else(|_| Uuid::nil());
        let mut volume_name = [0u8; 16];
        volume_name.copy_from_slice(view.bytes_at(base + 120, 16)?);

        Ok(Superblock {
            inodes_count: view.read_u32(base)?,
            blocks_count: view.read_u32(base + 4)?,
            free_blocks_count: view.read_u32(base + 12)?,
            free_inodes_count: view.read_u32(base + 16)?,
            first_data_block: view.read_u32(base + 20)?,
            log_block_size: view.read_u32(base + 24)?,
            blocks_per_group: view.read_u32(base + 32)?,
            inodes_per_group: view.read_u32(base + 40)?,
            magic: view.read_u16(base + 56)?,
            state: view.read_u16(base + 58)?,
            rev_level: view.read_u32(base + 76)?,
            first_ino: view.read_u32(base + 84)?,
            inode_size: view.read_u16(base + 88)?,
            uuid,
            volume_name,
        })
    }

    /// Size of one inode table record. Revision 0 images have no
    /// `s_inode_size` field and always use 128 bytes.
    pub fn inode_record_size(&self) -> u16 {
        if self.rev_level >= 1 && self.inode_size >= EXT2_GOOD_OLD_INODE_SIZE {
            self.inode_size
        } else {
            EXT2_GOOD_OLD_INODE_SIZE
        }
    }

    pub fn group_count(&self) -> u32 {
        if self.blocks_per_group == 0 {
            return 1;
        }
        self.blocks_count
            .saturating_sub(self.first_data_block)
            .div_ceil(self.blocks_per_group)
    }

    pub fn volume_name(&self) -> String {
        let end = self
            .volume_name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.volume_name.len());
        String::from_utf8_lossy(&self.volume_name[..end]).into_owned()
    }

    /// Fields are trusted as-is; odd values only get a warning.
    pub(crate) fn log_suspicious_fields(&self) {
        log::info!(
            "volume {:?} uuid {} rev {} state {:#x}",
            self.volume_name(),
            self.uuid,
            self.rev_level,
            self.state
        );
        log::info!(
            "free blocks {} free inodes {} inodes per group {} first inode {}",
            self.free_blocks_count,
            self.free_inodes_count,
            self.inodes_per_group,
            self.first_ino
        );
        if self.magic != EXT2_SUPER_MAGIC {
            log::warn!(
                "superblock magic is {:#06x}, expected {:#06x}",
                self.magic,
                EXT2_SUPER_MAGIC
            );
        }
        if self.log_block_size != 0 {
            log::warn!(
                "image declares {} byte blocks, reading it with {} byte blocks",
                1024u64 << self.log_block_size.min(32),
                BLOCK_SIZE
            );
        }
        if self.group_count() > 1 {
            log::warn!(
                "image has {} block groups, only the first is inspected",
                self.group_count()
            );
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupDescriptor {
    pub block_bitmap: u32,
    pub inode_bitmap: u32,
    pub inode_table: u32,
    pub free_blocks_count: u16,
    pub free_inodes_count: u16,
    pub used_dirs_count: u16,
}

impl GroupDescriptor {
    /// Reads the first descriptor of the table in the block after the superblock.
    pub fn read(view: &ImageView<'_>) -> Result<Self> {
        let base = block_offset(EXT2_GROUP_DESC_BLOCK);

        Ok(GroupDescriptor {
            block_bitmap: view.read_u32(base)?,
            inode_bitmap: view.read_u32(base + 4)?,
            inode_table: view.read_u32(base + 8)?,
            free_blocks_count: view.read_u16(base + 12)?,
            free_inodes_count: view.read_u16(base + 14)?,
            used_dirs_count: view.read_u16(base + 16)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inode {
    pub mode: u16,
    pub uid: u16,
    pub size: u32,
    pub dtime: u32,
    pub gid: u16,
    pub links_count: u16,
    /// 512-byte sectors, not blocks.
    pub blocks: u32,
    pub flags: u32,
    pub block: [u32; EXT2_N_BLOCKS],
}

impl Inode {
    /// Decode the 128-byte record starting at absolute offset `base`.
    pub fn read(view: &ImageView<'_>, base: u64) -> Result<Self> {
        let mut block = [0u32; EXT2_N_BLOCKS];
        for (slot, ptr) in block.iter_mut().enumerate() {
            *ptr = view.read_u32(base + 40 + slot as u64 * 4)?;
        }

        Ok(Inode {
            mode: view.read_u16(base)?,
            uid: view.read_u16(base + 2)?,
            size: view.read_u32(base + 4)?,
            dtime: view.read_u32(base + 20)?,
            gid: view.read_u16(base + 24)?,
            links_count: view.read_u16(base + 26)?,
            blocks: view.read_u32(base + 28)?,
            flags: view.read_u32(base + 32)?,
            block,
        })
    }

    /// Block pointers in use: `blocks` converted from sectors to blocks,
    /// capped at the size of the pointer array. Indirect slots are listed
    /// raw, never followed.
    pub fn used_blocks(&self) -> &[u32] {
        let sectors_per_block = BLOCK_SIZE as u32 / EXT2_SECTOR_SIZE;
        let count = (self.blocks / sectors_per_block) as usize;
        &self.block[..count.min(EXT2_N_BLOCKS)]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub inode: u32,
    pub rec_len: u16,
    pub name_len: u8,
    pub file_type: u8,
    pub name: Vec<u8>,
}
