use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::error::{FileError, FileResult};
use super::{DEFAULT_CACHE_SIZE, DEFAULT_PAGE_SIZE};

/// Settings for opening a page file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageFileConfig {
    /// Page size for newly created stores; existing stores keep their own
    pub page_size: usize,
    /// Cache size in bytes, turned into a page count with the store's page size
    pub cache_size: usize,
}

impl Default for PageFileConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            cache_size: DEFAULT_CACHE_SIZE,
        }
    }
}

impl PageFileConfig {
    pub fn new(page_size: usize, cache_size: usize) -> Self {
        Self {
            page_size,
            cache_size,
        }
    }

    /// Config whose cache holds exactly `pages` pages of `page_size` bytes
    pub fn with_cache_pages(page_size: usize, pages: usize) -> Self {
        Self::new(page_size, page_size.saturating_mul(pages))
    }

    /// Load a config from a JSON file; missing fields take their defaults
    pub fn load<P: AsRef<Path>>(path: P) -> FileResult<Self> {
        let content = fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> FileResult<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Number of pages the cache holds for a store with the given page size
    pub fn cache_capacity(&self, page_size: usize) -> FileResult<usize> {
        cache_capacity(self.cache_size, page_size)
    }
}

pub(crate) fn cache_capacity(cache_size: usize, page_size: usize) -> FileResult<usize> {
    let capacity = cache_size.checked_div(page_size).unwrap_or(0);
    if capacity == 0 {
        return Err(FileError::InvalidCacheSize(format!(
            "cache of {} bytes cannot hold a page of {} bytes",
            cache_size, page_size
        )));
    }
    Ok(capacity)
}
