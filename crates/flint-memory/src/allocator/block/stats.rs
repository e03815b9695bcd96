//! Block pool statistics

/// Statistics snapshot for the block pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockStats {
    /// Total allocations served
    pub total_allocs: u32,
    /// Total deallocations accepted
    pub total_deallocs: u32,
    /// Chunks currently backing the pool
    pub chunk_count: usize,
    /// Bytes currently handed out, measured in class block sizes
    pub current_usage: usize,
    /// Peak simultaneous usage in bytes
    pub peak_usage: usize,
}
