use serde::Serialize;

/// I/O counters of a page file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PageFileStatistics {
    /// Pages loaded from the backing store
    pub physical_reads: u64,
    /// Slots written to the backing store (write-back and delete)
    pub physical_writes: u64,
    /// `read_page` and `write_page` calls, hits included
    pub logical_accesses: u64,
}

impl PageFileStatistics {
    /// Total physical I/O
    pub fn io_access(&self) -> u64 {
        self.physical_reads + self.physical_writes
    }

    /// Share of logical accesses that were served from the cache
    pub fn hit_ratio(&self) -> f64 {
        if self.logical_accesses == 0 {
            return 0.0;
        }
        let misses = self.physical_reads.min(self.logical_accesses);
        (self.logical_accesses - misses) as f64 / self.logical_accesses as f64
    }
}
