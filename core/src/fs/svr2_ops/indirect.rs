// Indirect block chains for contiguous files

use zerocopy::big_endian::U32;

use super::types::IndirectBlock;
use crate::error::{BuildError, Result};
use crate::geometry::{
    index_blocks_for, ADDRS_PER_BLOCK, BLOCK_SIZE, DIRECT_BLOCKS, DOUBLE_INDIRECT_LIMIT,
    SINGLE_INDIRECT_LIMIT,
};

/// Indirect block whose first `count` slots reference `base_block..base_block+count`.
pub fn write_indirect_block(base_block: u32, count: u32) -> IndirectBlock {
    let mut block = IndirectBlock::zeroed();
    let count = count.min(ADDRS_PER_BLOCK) as usize;
    for (n, slot) in block.addrs.iter_mut().take(count).enumerate() {
        *slot = U32::new(base_block + n as u32);
    }
    block
}

/// Double-indirect chain for `total_blocks` data blocks starting at
/// `data_block_start`.
///
/// The first returned block is the top level, stored at `region_start`; it
/// references the second-level blocks stored right after it, which are
/// returned in order. Only the last second-level block can be partial.
pub fn write_double_indirect(
    region_start: u32,
    data_block_start: u32,
    total_blocks: u32,
) -> Result<Vec<IndirectBlock>> {
    let second_level = total_blocks.div_ceil(ADDRS_PER_BLOCK);
    if second_level > ADDRS_PER_BLOCK {
        return Err(BuildError::SizeOverflow {
            what: "double-indirect map",
            size: total_blocks as u64 * BLOCK_SIZE as u64,
            max: (ADDRS_PER_BLOCK * ADDRS_PER_BLOCK) as u64 * BLOCK_SIZE as u64,
        });
    }

    let mut chain = Vec::with_capacity(1 + second_level as usize);
    chain.push(write_indirect_block(region_start + 1, second_level));

    let mut remaining = total_blocks;
    let mut data_block = data_block_start;
    for _ in 0..second_level {
        let count = remaining.min(ADDRS_PER_BLOCK);
        chain.push(write_indirect_block(data_block, count));
        data_block += count;
        remaining -= count;
    }

    Ok(chain)
}

/// Complete index chain of a contiguous file of `total_blocks` blocks stored
/// from `data_start`, laid out from `index_start`: the single-indirect block,
/// then (past 266 blocks) the double-indirect chain.
pub fn build_block_map(total_blocks: u32, data_start: u32, index_start: u32) -> Result<Vec<IndirectBlock>> {
    if index_blocks_for(total_blocks).is_none() {
        return Err(BuildError::SizeOverflow {
            what: "file",
            size: total_blocks as u64 * BLOCK_SIZE as u64,
            max: DOUBLE_INDIRECT_LIMIT as u64 * BLOCK_SIZE as u64,
        });
    }

    let mut map = Vec::new();
    if total_blocks <= DIRECT_BLOCKS {
        return Ok(map);
    }

    map.push(write_indirect_block(
        data_start + DIRECT_BLOCKS,
        total_blocks - DIRECT_BLOCKS,
    ));

    if total_blocks > SINGLE_INDIRECT_LIMIT {
        map.extend(write_double_indirect(
            index_start + 1,
            data_start + SINGLE_INDIRECT_LIMIT,
            total_blocks - SINGLE_INDIRECT_LIMIT,
        )?);
    }

    Ok(map)
}
