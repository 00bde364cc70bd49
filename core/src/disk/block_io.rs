//! BlockIo adapter for seekable streams.
//!
//! Lets the GPT and filesystem writers target either the real image file or
//! an in-memory `Cursor<Vec<u8>>` through the same `gpt_disk_io::BlockIo`
//! trait.
//!
//! ```text
//! ┌────────────────────────────────────────┐
//! │   GPT builder / SVR2 writer / image    │
//! │        (uses BlockIo trait)            │
//! └───────────────────┬────────────────────┘
//!                     │ gpt_disk_io::BlockIo
//!                     ▼
//! ┌────────────────────────────────────────┐
//! │        ImageBlockIo (this)             │
//! │     512-byte LBAs over Seek + I/O      │
//! └───────────────────┬────────────────────┘
//!                     │ Read + Write + Seek
//!                     ▼
//! ┌────────────────────────────────────────┐
//! │     std::fs::File / io::Cursor         │
//! └────────────────────────────────────────┘
//! ```

use std::io::{self, Read, Seek, SeekFrom, Write};

use gpt_disk_io::BlockIo;
use gpt_disk_types::{BlockSize, Lba};

use crate::geometry::SECTOR_SIZE;

/// 512-byte block view of a seekable stream.
///
/// Writes past the current end grow the stream; the gap reads back as zeros
/// for both files and cursors.
pub struct ImageBlockIo<T> {
    inner: T,
}

impl<T: Read + Write + Seek> ImageBlockIo<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    fn seek_lba(&mut self, lba: Lba, len: usize) -> io::Result<()> {
        if len % SECTOR_SIZE != 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("buffer of {len} bytes is not a multiple of the sector size"),
            ));
        }
        let offset = lba
            .0
            .checked_mul(SECTOR_SIZE as u64)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "LBA out of range"))?;
        self.inner.seek(SeekFrom::Start(offset))?;
        Ok(())
    }
}

impl<T: Read + Write + Seek> BlockIo for ImageBlockIo<T> {
    type Error = io::Error;

    fn block_size(&self) -> BlockSize {
        BlockSize::BS_512
    }

    fn num_blocks(&mut self) -> Result<u64, Self::Error> {
        let len = self.inner.seek(SeekFrom::End(0))?;
        Ok(len / SECTOR_SIZE as u64)
    }

    fn read_blocks(&mut self, start_lba: Lba, dst: &mut [u8]) -> Result<(), Self::Error> {
        self.seek_lba(start_lba, dst.len())?;
        self.inner.read_exact(dst)
    }

    fn write_blocks(&mut self, start_lba: Lba, src: &[u8]) -> Result<(), Self::Error> {
        self.seek_lba(start_lba, src.len())?;
        self.inner.write_all(src)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_write_past_end_zero_fills() {
        let mut io = ImageBlockIo::new(Cursor::new(Vec::new()));
        io.write_blocks(Lba(2), &[0xAB; SECTOR_SIZE]).unwrap();

        assert_eq!(io.num_blocks().unwrap(), 3);
        let bytes = io.into_inner().into_inner();
        assert!(bytes[..2 * SECTOR_SIZE].iter().all(|&b| b == 0));
        assert!(bytes[2 * SECTOR_SIZE..].iter().all(|&b| b == 0xAB));
    }

    #[test]
    fn test_read_back() {
        let mut io = ImageBlockIo::new(Cursor::new(Vec::new()));
        let mut sector = [0u8; SECTOR_SIZE];
        sector[7] = 0x42;
        io.write_blocks(Lba(1), &sector).unwrap();

        let mut back = [0u8; SECTOR_SIZE];
        io.read_blocks(Lba(1), &mut back).unwrap();
        assert_eq!(back, sector);
    }

    #[test]
    fn test_unaligned_buffer_rejected() {
        let mut io = ImageBlockIo::new(Cursor::new(Vec::new()));
        let err = io.write_blocks(Lba(0), &[0u8; 100]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_short_read_is_eof() {
        let mut io = ImageBlockIo::new(Cursor::new(vec![0u8; SECTOR_SIZE]));
        let mut buf = [0u8; SECTOR_SIZE];
        let err = io.read_blocks(Lba(1), &mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
