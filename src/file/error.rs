use std::io;
use thiserror::Error;

use super::PageId;

#[derive(Debug, Error)]
pub enum FileError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Not a recognized page file or wrong version: format tag {found:#010x}")]
    InvalidFormat { found: u32 },

    #[error("Invalid page size: {0} bytes")]
    InvalidPageSize(usize),

    #[error("Store length {length} is not header ({header} bytes) plus whole pages of {page_size} bytes")]
    TruncatedStore {
        length: u64,
        header: usize,
        page_size: usize,
    },

    #[error("Invalid slot tag {tag} at page_id={page_id}")]
    InvalidSlotTag { page_id: PageId, tag: u32 },

    #[error("Page too large: page_id={page_id} needs {size} bytes, page size is {max}")]
    PageTooLarge {
        page_id: PageId,
        size: usize,
        max: usize,
    },

    #[error("Page id already set: current={current}, requested={requested}")]
    PageIdAlreadySet { current: PageId, requested: PageId },

    #[error("Page has no id")]
    PageIdUnset,

    #[error("Page not allocated: page_id={0}")]
    PageNotAllocated(PageId),

    #[error("Invalid cache size: {0}")]
    InvalidCacheSize(String),

    #[error("Page decoding error: {0}")]
    Codec(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type FileResult<T> = Result<T, FileError>;
