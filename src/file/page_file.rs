use tracing::{debug, info, warn};

use super::PageId;
use super::cache::{Cache, EvictionListener};
use super::config::cache_capacity;
use super::error::{FileError, FileResult};
use super::page::{Page, PageFileId};
use super::stats::PageFileStatistics;
use super::store::BackingStore;

/// Routes pages leaving the cache into the backing store
struct WriteBack<'a, S> {
    store: &'a mut S,
    stats: &'a mut PageFileStatistics,
}

impl<P: Page, S: BackingStore<P>> EvictionListener<P> for WriteBack<'_, S> {
    fn object_removed(&mut self, page: &P) -> FileResult<()> {
        self.store.write_slot(page)?;
        self.stats.physical_writes += 1;
        Ok(())
    }
}

/// Page file: id allocation, a bounded cache and a backing store.
///
/// Freed ids are reused in LIFO order before new ids are handed out.
/// Pages live in the cache until they are evicted, at which point they are
/// written to the store whether or not they are dirty.
pub struct PageFile<P: Page, S: BackingStore<P>> {
    file_id: PageFileId,
    store: S,
    cache: Box<dyn Cache<P>>,
    /// Cache size in bytes
    cache_size: usize,
    next_id: PageId,
    free_ids: Vec<PageId>,
    stats: PageFileStatistics,
    closed: bool,
}

impl<P: Page, S: BackingStore<P>> PageFile<P, S> {
    /// Build a page file over `store`, recovering ids from its current contents
    pub fn with_cache(
        mut store: S,
        cache: Box<dyn Cache<P>>,
        cache_size: usize,
    ) -> FileResult<Self> {
        let capacity = cache_capacity(cache_size, store.page_size())?;
        cache.initialize(capacity)?;

        let scan = store.scan()?;
        debug!(
            next_id = scan.next_id,
            free = scan.free_ids.len(),
            capacity,
            "initialized page file"
        );

        Ok(Self {
            file_id: PageFileId::next(),
            store,
            cache,
            cache_size,
            next_id: scan.next_id,
            free_ids: scan.free_ids,
            stats: PageFileStatistics::default(),
            closed: false,
        })
    }

    /// Token stamped on every page entering this file
    pub fn file_id(&self) -> PageFileId {
        self.file_id
    }

    /// Get a reference to the backing store
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn page_size(&self) -> usize {
        self.store.page_size()
    }

    /// Write a page, assigning an id on first write.
    ///
    /// The page only enters the cache here; the store sees it when it is
    /// evicted or flushed.
    pub fn write_page(&mut self, mut page: P) -> FileResult<PageId> {
        self.stats.logical_accesses += 1;

        let next_id = self.next_id;
        let (id, fresh) = match page.id() {
            Some(id) => {
                self.check_allocated(id)?;
                (id, false)
            }
            None => {
                let id = self.allocate_id();
                page.set_id(id)?;
                (id, true)
            }
        };
        page.set_owner(self.file_id);

        let mut write_back = WriteBack {
            store: &mut self.store,
            stats: &mut self.stats,
        };
        if let Err(err) = self.cache.put(page, &mut write_back) {
            // The page never entered the file, so its new id goes back
            if fresh {
                if id == next_id {
                    self.next_id = next_id;
                } else {
                    self.free_ids.push(id);
                }
            }
            return Err(err);
        }
        Ok(id)
    }

    /// Read a page from the cache, falling back to the store.
    ///
    /// Returns `None` for deleted pages.
    pub fn read_page(&mut self, id: PageId) -> FileResult<Option<P>> {
        self.stats.logical_accesses += 1;

        if id >= self.next_id {
            return Err(FileError::PageNotAllocated(id));
        }

        if let Some(page) = self.cache.get(id) {
            return Ok(Some(page));
        }

        if self.free_ids.contains(&id) {
            return Ok(None);
        }

        let loaded = self.store.read_slot(id)?;
        self.stats.physical_reads += 1;

        let Some(mut page) = loaded else {
            return Ok(None);
        };
        page.set_owner(self.file_id);

        let mut write_back = WriteBack {
            store: &mut self.store,
            stats: &mut self.stats,
        };
        self.cache.put(page.clone(), &mut write_back)?;
        Ok(Some(page))
    }

    /// Delete a page; its id goes on the free list and its slot is emptied
    pub fn delete_page(&mut self, id: PageId) -> FileResult<()> {
        self.check_allocated(id)?;

        // Destroyed, not evicted: no write-back
        self.cache.remove(id);
        self.store.delete_slot(id)?;
        self.stats.physical_writes += 1;
        self.free_ids.push(id);
        Ok(())
    }

    /// Write back every cached page
    pub fn flush(&mut self) -> FileResult<()> {
        let mut write_back = WriteBack {
            store: &mut self.store,
            stats: &mut self.stats,
        };
        self.cache.flush(&mut write_back)?;
        self.store.sync()
    }

    /// Flush the cache and release the store
    pub fn close(mut self) -> FileResult<()> {
        let result = self.flush().and_then(|_| self.store.close());
        self.closed = true;
        info!(file_id = self.file_id.as_u64(), "closed page file");
        result
    }

    /// Drop every cached page without write-back and empty the store
    pub fn clear(&mut self) -> FileResult<()> {
        self.cache.clear();
        self.store.truncate()?;
        self.next_id = 0;
        self.free_ids.clear();
        info!(file_id = self.file_id.as_u64(), "cleared page file");
        Ok(())
    }

    /// Total physical I/O since the last reset
    pub fn io_access(&self) -> u64 {
        self.stats.io_access()
    }

    /// Flush the cache, then zero all counters
    pub fn reset_io_access(&mut self) -> FileResult<()> {
        self.flush()?;
        self.stats = PageFileStatistics::default();
        Ok(())
    }

    /// Same as [`Self::reset_io_access`]
    pub fn reset_page_access(&mut self) -> FileResult<()> {
        self.reset_io_access()
    }

    pub fn physical_read_access(&self) -> u64 {
        self.stats.physical_reads
    }

    pub fn physical_write_access(&self) -> u64 {
        self.stats.physical_writes
    }

    pub fn logical_page_access(&self) -> u64 {
        self.stats.logical_accesses
    }

    pub fn statistics(&self) -> PageFileStatistics {
        self.stats
    }

    /// Id the next allocation gets when the free list is empty
    pub fn next_page_id(&self) -> PageId {
        self.next_id
    }

    /// Override the id counter. Free ids at or above `next_id` are dropped.
    ///
    /// Lowering the counter writes back the cache first, so no cached page
    /// can be replaced by a later allocation of its id.
    pub fn set_next_page_id(&mut self, next_id: PageId) -> FileResult<()> {
        if next_id < self.next_id {
            self.flush()?;
        }
        self.next_id = next_id;
        self.free_ids.retain(|&id| id < next_id);
        Ok(())
    }

    /// Freed ids, the last one is reused first
    pub fn free_page_ids(&self) -> &[PageId] {
        &self.free_ids
    }

    /// Cache size in bytes
    pub fn cache_size(&self) -> usize {
        self.cache_size
    }

    /// Cache size in pages
    pub fn cache_capacity(&self) -> usize {
        self.cache.capacity()
    }

    /// Resize the cache (in bytes); shrinking writes back the evicted pages
    pub fn set_cache_size(&mut self, cache_size: usize) -> FileResult<()> {
        let capacity = cache_capacity(cache_size, self.store.page_size())?;
        let mut write_back = WriteBack {
            store: &mut self.store,
            stats: &mut self.stats,
        };
        self.cache.set_cache_size(capacity, &mut write_back)?;
        self.cache_size = cache_size;
        Ok(())
    }

    /// Check if a page is in the cache
    pub fn is_page_cached(&self, id: PageId) -> bool {
        self.cache.contains(id)
    }

    /// Get the number of pages currently in the cache
    pub fn cached_page_count(&self) -> usize {
        self.cache.len()
    }

    fn allocate_id(&mut self) -> PageId {
        match self.free_ids.pop() {
            Some(id) => id,
            None => {
                let id = self.next_id;
                self.next_id += 1;
                id
            }
        }
    }

    fn check_allocated(&self, id: PageId) -> FileResult<()> {
        if id >= self.next_id || self.free_ids.contains(&id) {
            return Err(FileError::PageNotAllocated(id));
        }
        Ok(())
    }
}

impl<P: Page, S: BackingStore<P>> Drop for PageFile<P, S> {
    fn drop(&mut self) {
        // Flush cached pages when the file is dropped without close()
        if !self.closed
            && let Err(err) = self.flush()
        {
            warn!(file_id = self.file_id.as_u64(), error = %err, "failed to flush page file on drop");
        }
    }
}
