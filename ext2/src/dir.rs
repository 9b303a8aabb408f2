use image_view::{Block, ImageView};

use crate::inode::{DIR_ENTRY_TYPE_BITS, FileType, InodeEntry, classify};
use crate::structs::{DirEntry, Inode};
use crate::{EXT2_NDIR_BLOCKS, EXT2_ROOT_INO, Ext2Error, Result};

const DIR_ENTRY_HEADER_LEN: usize = 8;

impl DirEntry {
    pub fn kind(&self) -> FileType {
        classify(self.file_type.into(), DIR_ENTRY_TYPE_BITS)
    }
}

/// The entries of one directory data block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirBlock {
    pub block: u32,
    pub owner: u32,
    pub entries: Vec<DirEntry>,
}

/// Parse every entry of a directory block, deleted (`inode == 0`) slots
/// included. The `rec_len` chain has to land exactly on the block end.
pub fn walk_block(block: &Block<'_>) -> Result<Vec<DirEntry>> {
    let invalid = |offset, reason| Ext2Error::InvalidDirectoryEntry {
        block: block.number(),
        offset,
        reason,
    };

    let mut entries = Vec::new();
    let mut offset = 0;
    while offset < block.len() {
        if offset + DIR_ENTRY_HEADER_LEN > block.len() {
            return Err(invalid(offset, "entry header crosses the block end"));
        }

        let inode = block.u32_at(offset)?;
        let rec_len = block.u16_at(offset + 4)?;
        let name_len = block.u8_at(offset + 6)?;
        let file_type = block.u8_at(offset + 7)?;

        if (rec_len as usize) < DIR_ENTRY_HEADER_LEN {
            return Err(invalid(offset, "rec_len is smaller than an entry header"));
        }
        if rec_len as usize > block.len() - offset {
            return Err(invalid(offset, "rec_len runs past the block end"));
        }
        if offset + DIR_ENTRY_HEADER_LEN + name_len as usize > block.len() {
            return Err(invalid(offset, "name runs past the block end"));
        }

        let name = block
            .range(offset + DIR_ENTRY_HEADER_LEN, name_len as usize)?
            .to_vec();
        entries.push(DirEntry {
            inode,
            rec_len,
            name_len,
            file_type,
            name,
        });

        offset += rec_len as usize;
    }

    Ok(entries)
}

/// Walk the direct blocks of a directory inode in pointer order. Indirect
/// blocks are not followed.
pub fn walk_directory_inode(
    view: &ImageView<'_>,
    inode_num: u32,
    inode: &Inode,
) -> Result<Vec<DirBlock>> {
    let used = inode.used_blocks();
    let direct = &used[..used.len().min(EXT2_NDIR_BLOCKS)];

    let mut blocks = Vec::with_capacity(direct.len());
    for &block_num in direct {
        if block_num == 0 {
            log::debug!("inode {inode_num}: skipping hole in directory block list");
            continue;
        }

        let block = view.block_at(block_num)?;
        let entries = walk_block(&block)?;
        log::debug!(
            "inode {inode_num}: block {block_num} holds {} entries",
            entries.len()
        );
        blocks.push(DirBlock {
            block: block_num,
            owner: inode_num,
            entries,
        });
    }

    Ok(blocks)
}

/// Root's blocks first, then every other in-use directory in inode order.
pub fn walk_directories(view: &ImageView<'_>, inodes: &[InodeEntry]) -> Result<Vec<DirBlock>> {
    let mut blocks = Vec::new();

    for entry in inodes.iter().filter(|e| e.number == EXT2_ROOT_INO).take(1) {
        blocks.extend(walk_directory_inode(view, entry.number, &entry.inode)?);
    }

    for entry in inodes
        .iter()
        .filter(|e| e.number != EXT2_ROOT_INO && e.file_type == FileType::Directory)
    {
        blocks.extend(walk_directory_inode(view, entry.number, &entry.inode)?);
    }

    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inode::InodeTable;
    use crate::structs::GroupDescriptor;
    use crate::testutil::*;
    use crate::{EXT2_FT_DIR, EXT2_FT_REG_FILE, EXT2_S_IFDIR, EXT2_S_IFREG};
    use image_view::BLOCK_SIZE;

    fn put_entry(raw: &mut [u8], at: usize, inode: u32, rec_len: u16, name: &[u8]) {
        raw[at..at + 4].copy_from_slice(&inode.to_le_bytes());
        raw[at + 4..at + 6].copy_from_slice(&rec_len.to_le_bytes());
        raw[at + 6] = name.len() as u8;
        raw[at + 7] = EXT2_FT_REG_FILE;
        raw[at + 8..at + 8 + name.len()].copy_from_slice(name);
    }

    #[test]
    fn walk_block_reads_exact_names_and_covers_block() {
        let mut raw = vec![0u8; BLOCK_SIZE];
        put_entry(&mut raw, 0, 2, 12, b".");
        put_entry(&mut raw, 12, 0, 20, b"gone");
        put_entry(&mut raw, 32, 13, (BLOCK_SIZE - 32) as u16, b"notes");
        // bytes after the name are not part of it
        raw[32 + 8 + 5] = b'X';
        let block = Block::new(9, 9 * BLOCK_SIZE as u64, &raw);

        let entries = walk_block(&block).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[1].inode, 0);
        assert_eq!(entries[2].name, b"notes");
        assert_eq!(entries[2].kind(), FileType::RegularFile);
        let total: usize = entries.iter().map(|e| e.rec_len as usize).sum();
        assert_eq!(total, BLOCK_SIZE);
    }

    #[test]
    fn zero_rec_len_is_rejected() {
        let mut raw = vec![0u8; BLOCK_SIZE];
        put_entry(&mut raw, 0, 2, 12, b".");
        put_entry(&mut raw, 12, 2, 0, b"..");
        let block = Block::new(9, 0, &raw);

        let err = walk_block(&block).unwrap_err();
        assert!(matches!(
            err,
            Ext2Error::InvalidDirectoryEntry {
                block: 9,
                offset: 12,
                ..
            }
        ));
    }

    #[test]
    fn rec_len_past_block_end_is_rejected() {
        let mut raw = vec![0u8; BLOCK_SIZE];
        put_entry(&mut raw, 0, 2, 12, b".");
        put_entry(&mut raw, 12, 2, BLOCK_SIZE as u16, b"..");
        let block = Block::new(9, 0, &raw);

        assert!(matches!(
            walk_block(&block),
            Err(Ext2Error::InvalidDirectoryEntry { offset: 12, .. })
        ));
    }

    #[test]
    fn chain_ending_inside_a_header_is_rejected() {
        let mut raw = vec![0u8; BLOCK_SIZE];
        put_entry(&mut raw, 0, 2, (BLOCK_SIZE - 4) as u16, b".");
        let block = Block::new(9, 0, &raw);

        assert!(matches!(
            walk_block(&block),
            Err(Ext2Error::InvalidDirectoryEntry {
                offset: 1020,
                reason: "entry header crosses the block end",
                ..
            })
        ));
    }

    #[test]
    fn name_may_overlap_rec_len_but_not_the_block_end() {
        let mut raw = vec![0u8; BLOCK_SIZE];
        put_entry(&mut raw, 0, 2, 12, b".");
        raw[6] = 255;
        put_entry(&mut raw, 12, 2, (BLOCK_SIZE - 12) as u16, b"..");

        let entries = walk_block(&Block::new(9, 0, &raw)).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name.len(), 255);
        assert_eq!(entries[1].name, b"..");

        let last = BLOCK_SIZE - 8;
        raw[12 + 4..12 + 6].copy_from_slice(&((last - 12) as u16).to_le_bytes());
        put_entry(&mut raw, last, 12, 8, b"");
        raw[last + 6] = 20;
        assert!(matches!(
            walk_block(&Block::new(9, 0, &raw)),
            Err(Ext2Error::InvalidDirectoryEntry { offset: 1016, .. })
        ));
    }

    #[test]
    fn directories_are_walked_root_first_then_by_inode_number() {
        let mut image = ImageBuilder::new(64, 32);
        image.inode(2, EXT2_S_IFDIR | 0o755, 2048, 4, &[20, 21]);
        image.inode(11, EXT2_S_IFDIR | 0o700, 1024, 2, &[22]);
        image.inode(12, EXT2_S_IFREG | 0o644, 5, 1, &[23]);
        image.inode(14, EXT2_S_IFDIR | 0o755, 1024, 2, &[24]);
        image.dir_block(20, &[(2, EXT2_FT_DIR, "."), (2, EXT2_FT_DIR, "..")]);
        image.dir_block(21, &[(11, EXT2_FT_DIR, "lost+found")]);
        image.dir_block(22, &[(11, EXT2_FT_DIR, "."), (2, EXT2_FT_DIR, "..")]);
        image.dir_block(24, &[(14, EXT2_FT_DIR, "."), (2, EXT2_FT_DIR, "..")]);

        let view = ImageView::new(&image.bytes);
        let group = GroupDescriptor::read(&view).unwrap();
        let table = InodeTable::new(view, &group, 128);
        let inodes: Vec<InodeEntry> = [2, 11, 12, 14]
            .into_iter()
            .map(|n| table.entry(n).unwrap())
            .collect();

        let blocks = walk_directories(&view, &inodes).unwrap();
        let order: Vec<(u32, u32)> = blocks.iter().map(|b| (b.block, b.owner)).collect();
        assert_eq!(order, vec![(20, 2), (21, 2), (22, 11), (24, 14)]);
        assert_eq!(blocks[1].entries[0].name, b"lost+found");
    }

    #[test]
    fn holes_are_skipped_and_bad_pointers_are_bounds_errors() {
        let mut image = ImageBuilder::new(64, 32);
        image.inode(2, EXT2_S_IFDIR | 0o755, 2048, 4, &[0, 20]);
        image.dir_block(20, &[(2, EXT2_FT_DIR, ".")]);
        image.inode(11, EXT2_S_IFDIR | 0o755, 1024, 2, &[9999]);

        let view = ImageView::new(&image.bytes);
        let group = GroupDescriptor::read(&view).unwrap();
        let table = InodeTable::new(view, &group, 128);

        let root = table.read_inode(2).unwrap();
        let blocks = walk_directory_inode(&view, 2, &root).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].block, 20);

        let bad = table.read_inode(11).unwrap();
        assert!(matches!(
            walk_directory_inode(&view, 11, &bad),
            Err(Ext2Error::Image(image_view::ImageError::OutOfBounds { .. }))
        ));
    }
}
