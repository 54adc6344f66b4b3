use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use super::config::PageFileConfig;
use super::error::{FileError, FileResult};
use super::header::{DefaultPageHeader, PageHeader};
use super::lru_cache::LruCache;
use super::page::Page;
use super::page_file::PageFile;
use super::store::{BackingStore, SlotScan};
use super::{PageId, SLOT_TAG_SIZE};

/// Slot tag of a free slot
pub const EMPTY_PAGE: u32 = 0;

/// Slot tag of a slot holding a page
pub const FILLED_PAGE: u32 = 1;

/// Page file stored in a random-access file
pub type PersistentPageFile<P> = PageFile<P, FileStore<P, DefaultPageHeader>>;

/// Backing store over a file of fixed-size slots.
///
/// Layout: the header at offset 0, then slot `i` at
/// `header.size() + i * page_size`. Every slot starts with a 4-byte
/// big-endian tag (`EMPTY_PAGE` or `FILLED_PAGE`) followed by the encoded
/// page, zero padded to the page size.
pub struct FileStore<P, H> {
    file: File,
    path: PathBuf,
    header: H,
    page_size: usize,
    /// Number of whole slots in the file
    slot_count: u64,
    /// Reusable slot buffer (avoids allocation on every slot access)
    buffer: Vec<u8>,
    _marker: PhantomData<fn() -> P>,
}

impl<P: Page, H: PageHeader> FileStore<P, H> {
    /// Open the store at `path`, creating it when missing or empty.
    ///
    /// For an existing store the header is read and checked before any slot
    /// is touched, and its page size replaces the one in `header`.
    pub fn open<Q: AsRef<Path>>(path: Q, mut header: H) -> FileResult<Self> {
        let path = path.as_ref();

        // Create parent directories if they don't exist
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let length = file.metadata()?.len();
        if length == 0 {
            DefaultPageHeader::validate_page_size(header.page_size())?;
            header.write_header(&mut file)?;
            file.flush()?;
            info!(path = %path.display(), page_size = header.page_size(), "created page file");
        } else {
            if length < header.size() as u64 {
                return Err(FileError::TruncatedStore {
                    length,
                    header: header.size(),
                    page_size: header.page_size(),
                });
            }
            header.read_header(&mut file)?;
            DefaultPageHeader::validate_page_size(header.page_size())?;
            info!(path = %path.display(), page_size = header.page_size(), "opened page file");
        }

        let page_size = header.page_size();
        let slot_count = slot_count(length, header.size(), page_size)?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
            header,
            page_size,
            slot_count,
            buffer: vec![0u8; page_size],
            _marker: PhantomData,
        })
    }

    pub fn header(&self) -> &H {
        &self.header
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of slots currently in the file
    pub fn slot_count(&self) -> u64 {
        self.slot_count
    }

    /// Byte offset of slot `id`
    pub fn slot_offset(&self, id: PageId) -> u64 {
        self.header.size() as u64 + id * self.page_size as u64
    }

    /// Write the slot buffer at slot `id`, growing the file if needed
    fn write_buffer(&mut self, id: PageId) -> FileResult<()> {
        let offset = self.slot_offset(id);

        // Extend the file first; the zero-filled gap reads as empty slots
        if id >= self.slot_count {
            self.file.set_len(offset + self.page_size as u64)?;
            self.slot_count = id + 1;
        }

        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(&self.buffer)?;
        Ok(())
    }
}

impl<P: Page, H: PageHeader> BackingStore<P> for FileStore<P, H> {
    fn page_size(&self) -> usize {
        self.page_size
    }

    fn scan(&mut self) -> FileResult<SlotScan> {
        let header_size = self.header.size() as u64;
        scan_slots(&mut self.file, header_size, self.page_size, self.slot_count)
    }

    fn read_slot(&mut self, id: PageId) -> FileResult<Option<P>> {
        if id >= self.slot_count {
            return Ok(None);
        }

        let offset = self.slot_offset(id);
        self.buffer.resize(self.page_size, 0);
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(&mut self.buffer)?;

        let tag = read_tag(&self.buffer);
        match tag {
            EMPTY_PAGE => Ok(None),
            FILLED_PAGE => {
                let mut page = P::decode(&self.buffer[SLOT_TAG_SIZE..])?;
                page.set_id(id)?;
                debug!(page_id = id, "read page from slot");
                Ok(Some(page))
            }
            tag => Err(FileError::InvalidSlotTag { page_id: id, tag }),
        }
    }

    fn write_slot(&mut self, page: &P) -> FileResult<()> {
        let id = page.id().ok_or(FileError::PageIdUnset)?;

        self.buffer.clear();
        self.buffer.extend_from_slice(&FILLED_PAGE.to_be_bytes());
        page.encode(&mut self.buffer)?;

        // Truncating would corrupt the store, so nothing is written
        if self.buffer.len() > self.page_size {
            return Err(FileError::PageTooLarge {
                page_id: id,
                size: self.buffer.len(),
                max: self.page_size,
            });
        }
        self.buffer.resize(self.page_size, 0);

        self.write_buffer(id)?;
        debug!(page_id = id, "wrote page to slot");
        Ok(())
    }

    fn delete_slot(&mut self, id: PageId) -> FileResult<()> {
        self.buffer.clear();
        self.buffer.extend_from_slice(&EMPTY_PAGE.to_be_bytes());
        self.buffer.resize(self.page_size, 0);

        self.write_buffer(id)?;
        debug!(page_id = id, "emptied slot");
        Ok(())
    }

    fn truncate(&mut self) -> FileResult<()> {
        self.file.set_len(self.header.size() as u64)?;
        self.slot_count = 0;
        Ok(())
    }

    fn sync(&mut self) -> FileResult<()> {
        self.file.sync_data()?;
        Ok(())
    }

    fn close(&mut self) -> FileResult<()> {
        self.file.sync_all()?;
        Ok(())
    }
}

impl<P: Page> PageFile<P, FileStore<P, DefaultPageHeader>> {
    /// Open or create a page file at `path` with the default header.
    /// `config.page_size` only applies when the file is created.
    pub fn open<Q: AsRef<Path>>(path: Q, config: &PageFileConfig) -> FileResult<Self> {
        Self::open_with_header(path, DefaultPageHeader::new(config.page_size), config)
    }
}

impl<P: Page, H: PageHeader> PageFile<P, FileStore<P, H>> {
    /// Open or create a page file at `path` with a custom header
    pub fn open_with_header<Q: AsRef<Path>>(
        path: Q,
        header: H,
        config: &PageFileConfig,
    ) -> FileResult<Self> {
        let store = FileStore::open(path, header)?;
        let capacity = config.cache_capacity(store.page_size)?;
        PageFile::with_cache(store, Box::new(LruCache::new(capacity)?), config.cache_size)
    }

    pub fn header(&self) -> &H {
        self.store().header()
    }
}

/// Layout summary of a page file, independent of the page type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreSummary {
    pub path: String,
    pub file_length: u64,
    pub header_size: usize,
    pub page_size: usize,
    pub slot_count: u64,
    pub filled: u64,
    pub empty: u64,
    /// Ids an opened page file would reuse, last one first
    pub free_ids: Vec<PageId>,
}

/// Read the header and slot tags of a page file without modifying it
pub fn inspect<Q: AsRef<Path>>(path: Q) -> FileResult<StoreSummary> {
    let path = path.as_ref();
    let mut file = File::open(path)?;
    let length = file.metadata()?.len();

    let mut header = DefaultPageHeader::default();
    if length < header.size() as u64 {
        return Err(FileError::TruncatedStore {
            length,
            header: header.size(),
            page_size: header.page_size(),
        });
    }
    header.read_header(&mut file)?;

    let page_size = header.page_size();
    let slots = slot_count(length, header.size(), page_size)?;
    let scan = scan_slots(&mut file, header.size() as u64, page_size, slots)?;
    let empty = scan.free_ids.len() as u64;

    Ok(StoreSummary {
        path: path.display().to_string(),
        file_length: length,
        header_size: header.size(),
        page_size,
        slot_count: slots,
        filled: slots - empty,
        empty,
        free_ids: scan.free_ids,
    })
}

/// Number of whole slots after the header; a trailing partial slot is an error
fn slot_count(length: u64, header_size: usize, page_size: usize) -> FileResult<u64> {
    let body = length.saturating_sub(header_size as u64);
    if body % page_size as u64 != 0 {
        return Err(FileError::TruncatedStore {
            length,
            header: header_size,
            page_size,
        });
    }
    Ok(body / page_size as u64)
}

fn read_tag(buf: &[u8]) -> u32 {
    u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]])
}

/// Rebuild id bookkeeping from slot tags.
///
/// Every empty slot becomes a free id and the next id follows the last slot,
/// so trailing empty slots are reused instead of handed out twice.
fn scan_slots(
    file: &mut File,
    header_size: u64,
    page_size: usize,
    slot_count: u64,
) -> FileResult<SlotScan> {
    let mut scan = SlotScan::default();
    let mut tag = [0u8; SLOT_TAG_SIZE];

    for id in 0..slot_count {
        file.seek(SeekFrom::Start(header_size + id * page_size as u64))?;
        file.read_exact(&mut tag)?;

        match read_tag(&tag) {
            EMPTY_PAGE => scan.free_ids.push(id),
            FILLED_PAGE => {}
            tag => return Err(FileError::InvalidSlotTag { page_id: id, tag }),
        }
    }

    scan.next_id = slot_count;
    Ok(scan)
}
