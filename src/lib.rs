pub mod file;

pub use file::{
    BackingStore, Cache, DEFAULT_CACHE_SIZE, DEFAULT_PAGE_SIZE, DefaultPageHeader,
    EvictionListener, FileError, FileResult, FileStore, LruCache, MemoryPageFile, MemoryStore,
    Page, PageFile, PageFileConfig, PageFileId, PageFileStatistics, PageHeader, PageId, PageMeta,
    PersistentPageFile, RawPage, StoreSummary,
};
