mod cache;
mod config;
mod error;
mod header;
mod lru_cache;
mod memory;
mod page;
mod page_file;
mod persistent;
mod stats;
mod store;
#[cfg(test)]
mod tests;

pub use cache::{Cache, EvictionListener};
pub use config::PageFileConfig;
pub use error::{FileError, FileResult};
pub use header::{DefaultPageHeader, FORMAT_TAG, PageHeader};
pub use lru_cache::LruCache;
pub use memory::{MemoryPageFile, MemoryStore};
pub use page::{Page, PageFileId, PageMeta, RawPage};
pub use page_file::PageFile;
pub use persistent::{EMPTY_PAGE, FILLED_PAGE, FileStore, PersistentPageFile, StoreSummary, inspect};
pub use stats::PageFileStatistics;
pub use store::{BackingStore, SlotScan};

/// Default page size in bytes (4KB)
pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// Default cache size in bytes
/// 1000 pages of the default size, about 4MB
pub const DEFAULT_CACHE_SIZE: usize = 1000 * DEFAULT_PAGE_SIZE;

/// Bytes taken by the empty/filled tag at the start of every slot
pub const SLOT_TAG_SIZE: usize = 4;

/// Page ID type
pub type PageId = u64;
