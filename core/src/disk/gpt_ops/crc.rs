/// CRC32 (IEEE 802.3 polynomial) as used by every GPT checksum field
pub fn crc32(data: &[u8]) -> u32 {
    const POLYNOMIAL: u32 = 0xEDB88320;
    let mut crc = 0xFFFF_FFFFu32;

    for &byte in data {
        crc ^= byte as u32;
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ POLYNOMIAL;
            } else {
                crc >>= 1;
            }
        }
    }

    !crc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_value() {
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn test_empty() {
        assert_eq!(crc32(&[]), 0);
    }

    #[test]
    fn test_zeroed_partition_array() {
        // CRC of 16 KiB of zeros, the array of a disk with no partitions
        assert_eq!(crc32(&[0u8; 128 * 128]), 0xAB54_D286);
    }
}
