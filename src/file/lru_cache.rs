use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use super::PageId;
use super::cache::{Cache, EvictionListener};
use super::error::{FileError, FileResult};
use super::page::Page;

struct Inner<P> {
    /// Access-ordered entries; the map itself is unbounded, `capacity` is enforced here
    entries: lru::LruCache<PageId, P>,
    capacity: usize,
}

/// Least-recently-used page cache
pub struct LruCache<P> {
    inner: Mutex<Inner<P>>,
}

impl<P: Page> LruCache<P> {
    /// Create a cache holding at most `capacity` pages
    pub fn new(capacity: usize) -> FileResult<Self> {
        Self::validate_capacity(capacity)?;
        Ok(Self {
            inner: Mutex::new(Inner {
                entries: lru::LruCache::unbounded(),
                capacity,
            }),
        })
    }

    /// Ids of resident pages, most recently used first
    pub fn resident_ids(&self) -> Vec<PageId> {
        self.lock().entries.iter().map(|(id, _)| *id).collect()
    }

    fn validate_capacity(capacity: usize) -> FileResult<()> {
        if capacity == 0 {
            return Err(FileError::InvalidCacheSize(
                "cache must hold at least one page".to_string(),
            ));
        }
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Inner<P>> {
        // The map stays consistent even if a listener panicked mid-call
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Pop the least recently used page and hand it to the listener.
    /// On listener failure the page goes back to the LRU position.
    fn evict_lru(
        inner: &mut Inner<P>,
        listener: &mut dyn EvictionListener<P>,
    ) -> FileResult<bool> {
        let Some((id, page)) = inner.entries.pop_lru() else {
            return Ok(false);
        };

        if let Err(err) = listener.object_removed(&page) {
            inner.entries.push(id, page);
            inner.entries.demote(&id);
            return Err(err);
        }

        debug!(page_id = id, "evicted page");
        Ok(true)
    }
}

impl<P: Page> Cache<P> for LruCache<P> {
    fn initialize(&self, capacity: usize) -> FileResult<()> {
        Self::validate_capacity(capacity)?;
        let mut inner = self.lock();
        inner.entries.clear();
        inner.capacity = capacity;
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.lock().capacity
    }

    fn len(&self) -> usize {
        self.lock().entries.len()
    }

    fn contains(&self, id: PageId) -> bool {
        self.lock().entries.contains(&id)
    }

    fn get(&self, id: PageId) -> Option<P> {
        self.lock().entries.get(&id).cloned()
    }

    fn put(&self, page: P, listener: &mut dyn EvictionListener<P>) -> FileResult<()> {
        let id = page.id().ok_or(FileError::PageIdUnset)?;
        let mut inner = self.lock();

        // Make room before inserting a new id; replacing an entry never evicts
        if !inner.entries.contains(&id) {
            while inner.entries.len() >= inner.capacity {
                if !Self::evict_lru(&mut inner, listener)? {
                    break;
                }
            }
        }

        inner.entries.put(id, page);
        Ok(())
    }

    fn remove(&self, id: PageId) -> Option<P> {
        self.lock().entries.pop(&id)
    }

    fn flush(&self, listener: &mut dyn EvictionListener<P>) -> FileResult<()> {
        let mut inner = self.lock();
        while Self::evict_lru(&mut inner, listener)? {}
        Ok(())
    }

    fn clear(&self) {
        self.lock().entries.clear();
    }

    fn set_cache_size(
        &self,
        capacity: usize,
        listener: &mut dyn EvictionListener<P>,
    ) -> FileResult<()> {
        Self::validate_capacity(capacity)?;
        let mut inner = self.lock();
        inner.capacity = capacity;

        while inner.entries.len() > inner.capacity {
            if !Self::evict_lru(&mut inner, listener)? {
                break;
            }
        }
        Ok(())
    }
}
