use std::io::{Read, Write};

use super::error::{FileError, FileResult};
use super::{DEFAULT_PAGE_SIZE, SLOT_TAG_SIZE};

/// Format tag written at offset 0 of every page file
pub const FORMAT_TAG: u32 = 841150978;

/// Fixed prologue of a page file.
///
/// Slots start right after `size()` bytes, so the size of a header must not
/// change once a store has been created.
pub trait PageHeader: Send {
    /// Byte length of the header region
    fn size(&self) -> usize;

    /// Byte size of every page slot
    fn page_size(&self) -> usize;

    /// Populate this header from the first bytes of a store
    fn read_header(&mut self, reader: &mut dyn Read) -> FileResult<()>;

    /// Emit this header; the writer is positioned at offset 0
    fn write_header(&self, writer: &mut dyn Write) -> FileResult<()>;
}

/// Header made of the format tag and the page size (8 bytes, big-endian)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultPageHeader {
    page_size: usize,
}

impl DefaultPageHeader {
    const SIZE: usize = 8;

    pub fn new(page_size: usize) -> Self {
        Self { page_size }
    }

    /// Check that a page size can hold a slot tag and fits the on-disk field
    pub fn validate_page_size(page_size: usize) -> FileResult<()> {
        if page_size <= SLOT_TAG_SIZE || page_size > u32::MAX as usize {
            return Err(FileError::InvalidPageSize(page_size));
        }
        Ok(())
    }
}

impl Default for DefaultPageHeader {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl PageHeader for DefaultPageHeader {
    fn size(&self) -> usize {
        Self::SIZE
    }

    fn page_size(&self) -> usize {
        self.page_size
    }

    fn read_header(&mut self, reader: &mut dyn Read) -> FileResult<()> {
        let mut buf = [0u8; Self::SIZE];
        reader.read_exact(&mut buf)?;

        let tag = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
        if tag != FORMAT_TAG {
            return Err(FileError::InvalidFormat { found: tag });
        }

        let page_size = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]) as usize;
        Self::validate_page_size(page_size)?;

        self.page_size = page_size;
        Ok(())
    }

    fn write_header(&self, writer: &mut dyn Write) -> FileResult<()> {
        Self::validate_page_size(self.page_size)?;

        let mut buf = [0u8; Self::SIZE];
        buf[0..4].copy_from_slice(&FORMAT_TAG.to_be_bytes());
        buf[4..8].copy_from_slice(&(self.page_size as u32).to_be_bytes());
        writer.write_all(&buf)?;
        Ok(())
    }
}
