// Flat directory blocks

use zerocopy::IntoBytes;

use super::types::{DirEntry, DIRENT_SIZE};
use crate::error::Result;

/// Serialize `(inode, name)` pairs into consecutive 16-byte records.
pub fn build_directory_entries(entries: &[(u16, &str)]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(entries.len() * DIRENT_SIZE);
    for &(ino, name) in entries {
        out.extend_from_slice(DirEntry::new(ino, name)?.as_bytes());
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BuildError;

    #[test]
    fn test_root_entries() {
        let bytes = build_directory_entries(&[(4, "linux"), (5, "ccal")]).unwrap();

        assert_eq!(bytes.len(), 32);
        assert_eq!(&bytes[0..7], b"\x00\x04linux");
        assert_eq!(&bytes[16..22], b"\x00\x05ccal");
        assert!(bytes[22..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_empty() {
        assert!(build_directory_entries(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_long_name_fails() {
        assert!(matches!(
            build_directory_entries(&[(4, "a-very-long-file-name")]),
            Err(BuildError::NameTooLong(_))
        ));
    }
}
