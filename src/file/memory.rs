use ahash::AHashMap;

use super::PageId;
use super::config::PageFileConfig;
use super::error::{FileError, FileResult};
use super::lru_cache::LruCache;
use super::page::Page;
use super::page_file::PageFile;
use super::store::{BackingStore, SlotScan};

/// Page file kept entirely in memory, for measuring page I/O without a disk
pub type MemoryPageFile<P> = PageFile<P, MemoryStore<P>>;

/// Backing store holding pages in a hash table.
///
/// Pages are stored as values, nothing is encoded, so the page size is only
/// used to size the cache.
pub struct MemoryStore<P> {
    pages: AHashMap<PageId, P>,
    page_size: usize,
}

impl<P: Page> MemoryStore<P> {
    pub fn new(page_size: usize) -> Self {
        Self {
            pages: AHashMap::new(),
            page_size,
        }
    }

    /// Number of pages in the table (cached pages not yet written back excluded)
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn contains(&self, id: PageId) -> bool {
        self.pages.contains_key(&id)
    }
}

impl<P: Page> BackingStore<P> for MemoryStore<P> {
    fn page_size(&self) -> usize {
        self.page_size
    }

    fn scan(&mut self) -> FileResult<SlotScan> {
        let next_id = self.pages.keys().max().map_or(0, |&id| id + 1);
        let free_ids = (0..next_id).filter(|id| !self.pages.contains_key(id)).collect();
        Ok(SlotScan { next_id, free_ids })
    }

    fn read_slot(&mut self, id: PageId) -> FileResult<Option<P>> {
        Ok(self.pages.get(&id).cloned())
    }

    fn write_slot(&mut self, page: &P) -> FileResult<()> {
        let id = page.id().ok_or(FileError::PageIdUnset)?;
        self.pages.insert(id, page.clone());
        Ok(())
    }

    fn delete_slot(&mut self, id: PageId) -> FileResult<()> {
        self.pages.remove(&id);
        Ok(())
    }

    fn truncate(&mut self) -> FileResult<()> {
        self.pages.clear();
        Ok(())
    }

    fn sync(&mut self) -> FileResult<()> {
        Ok(())
    }

    fn close(&mut self) -> FileResult<()> {
        Ok(())
    }
}

impl<P: Page> PageFile<P, MemoryStore<P>> {
    /// Create an empty in-memory page file
    pub fn new(config: &PageFileConfig) -> FileResult<Self> {
        let capacity = config.cache_capacity(config.page_size)?;
        PageFile::with_cache(
            MemoryStore::new(config.page_size),
            Box::new(LruCache::new(capacity)?),
            config.cache_size,
        )
    }
}
