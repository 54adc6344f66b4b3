use super::PageId;
use super::error::FileResult;
use super::page::Page;

/// Receives pages pushed out of a cache.
///
/// A listener that fails leaves the page resident in the cache.
pub trait EvictionListener<P> {
    fn object_removed(&mut self, page: &P) -> FileResult<()>;
}

/// Bounded id -> page mapping with a pluggable eviction policy.
///
/// Implementations serialize their own operations, so every method takes
/// `&self`. The eviction target is passed to the operations that can evict.
pub trait Cache<P: Page>: Send {
    /// Bind the cache to a capacity in pages, dropping any resident entries
    fn initialize(&self, capacity: usize) -> FileResult<()>;

    fn capacity(&self) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check residency without touching recency
    fn contains(&self, id: PageId) -> bool;

    /// Copy of a resident page; marks it most recently used
    fn get(&self, id: PageId) -> Option<P>;

    /// Insert or replace a page and mark it most recently used.
    /// Inserting a new id into a full cache evicts one entry into `listener`.
    fn put(&self, page: P, listener: &mut dyn EvictionListener<P>) -> FileResult<()>;

    /// Remove a page without writing it back
    fn remove(&self, id: PageId) -> Option<P>;

    /// Write back every resident page and empty the cache
    fn flush(&self, listener: &mut dyn EvictionListener<P>) -> FileResult<()>;

    /// Drop every resident page without writing it back
    fn clear(&self);

    /// Change the capacity, evicting as many entries as the new bound requires
    fn set_cache_size(
        &self,
        capacity: usize,
        listener: &mut dyn EvictionListener<P>,
    ) -> FileResult<()>;
}
