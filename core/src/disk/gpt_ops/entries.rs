use gpt_disk_types::{
    GptPartitionAttributes, GptPartitionEntry, GptPartitionName, GptPartitionType, LbaLe, U64Le,
};

use super::types::PartitionSpec;
use crate::error::{BuildError, Result};
use crate::geometry::{GPT_ENTRY_COUNT, GPT_ENTRY_SIZE};

const _: () = assert!(core::mem::size_of::<GptPartitionEntry>() == GPT_ENTRY_SIZE);

/// Serialize the full 128-slot partition entry array.
///
/// Entries must be non-empty, ascending and non-overlapping; slots past the
/// supplied entries are zero.
pub fn build_partition_array(entries: &[PartitionSpec]) -> Result<Vec<u8>> {
    if entries.len() > GPT_ENTRY_COUNT as usize {
        return Err(BuildError::InvalidLayout("more partitions than GPT entry slots"));
    }
    validate_layout(entries)?;

    let mut array = vec![0u8; GPT_ENTRY_COUNT as usize * GPT_ENTRY_SIZE];

    for (slot, spec) in entries.iter().enumerate() {
        let name: GptPartitionName = spec
            .name
            .parse()
            .map_err(|_| BuildError::PartitionName(spec.name.to_string()))?;

        let entry = GptPartitionEntry {
            partition_type_guid: GptPartitionType(spec.type_guid),
            unique_partition_guid: spec.unique_guid,
            starting_lba: LbaLe::from_u64(spec.start_lba),
            ending_lba: LbaLe::from_u64(spec.end_lba),
            attributes: GptPartitionAttributes(U64Le::from_u64(spec.flags)),
            name,
        };

        let offset = slot * GPT_ENTRY_SIZE;
        array[offset..offset + GPT_ENTRY_SIZE].copy_from_slice(bytemuck::bytes_of(&entry));

        log::debug!(
            "partition {} `{}`: LBA {:#x}..={:#x} guid {}",
            slot,
            spec.name,
            spec.start_lba,
            spec.end_lba,
            spec.unique_guid
        );
    }

    Ok(array)
}

fn validate_layout(entries: &[PartitionSpec]) -> Result<()> {
    let invalid = |spec: &PartitionSpec, reason| BuildError::PartitionLayout {
        name: spec.name.to_string(),
        start: spec.start_lba,
        end: spec.end_lba,
        reason,
    };

    let mut previous_end: Option<u64> = None;
    for spec in entries {
        if spec.start_lba > spec.end_lba {
            return Err(invalid(spec, "start is past end"));
        }
        if let Some(end) = previous_end {
            // Two ranges [a,b] and [c,d] in order overlap if c <= b
            if spec.start_lba <= end {
                return Err(invalid(spec, "overlaps or precedes the previous partition"));
            }
        }
        previous_end = Some(spec.end_lba);
    }

    Ok(())
}

/// Decode slot `index` of a serialized partition array.
pub fn parse_partition_entry(array: &[u8], index: usize) -> Option<GptPartitionEntry> {
    let offset = index.checked_mul(GPT_ENTRY_SIZE)?;
    let bytes = array.get(offset..offset + GPT_ENTRY_SIZE)?;
    Some(bytemuck::pod_read_unaligned(bytes))
}
