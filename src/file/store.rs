use super::PageId;
use super::error::FileResult;
use super::page::Page;

/// Id bookkeeping recovered from a backing store when it is opened
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotScan {
    /// First id never handed out
    pub next_id: PageId,
    /// Reclaimed ids in ascending order; the last one is reused first
    pub free_ids: Vec<PageId>,
}

/// Storage medium behind a page file.
///
/// A backing store only moves pages in and out of slots; caching and id
/// allocation stay in `PageFile`.
pub trait BackingStore<P: Page>: Send {
    /// Byte size of one slot
    fn page_size(&self) -> usize;

    /// Rebuild next id and free ids from the current store contents
    fn scan(&mut self) -> FileResult<SlotScan>;

    /// Load the page stored at `id`, or `None` for an empty slot
    fn read_slot(&mut self, id: PageId) -> FileResult<Option<P>>;

    /// Store `page` in the slot named by its id
    fn write_slot(&mut self, page: &P) -> FileResult<()>;

    /// Mark the slot at `id` empty
    fn delete_slot(&mut self, id: PageId) -> FileResult<()>;

    /// Drop every slot
    fn truncate(&mut self) -> FileResult<()>;

    /// Push buffered writes down to the medium
    fn sync(&mut self) -> FileResult<()>;

    /// Release the medium; no other call is made afterwards
    fn close(&mut self) -> FileResult<()>;
}
