//! Scratch stack statistics

/// Statistics snapshot for the scratch stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackStats {
    /// Total allocations served
    pub total_allocs: u32,
    /// Total deallocations accepted
    pub total_deallocs: u32,
    /// Requests that spilled to the fallback heap
    pub fallback_allocs: u32,
    /// Entries currently outstanding
    pub outstanding: usize,
    /// Bytes currently outstanding, region and heap combined
    pub current_usage: usize,
    /// Peak simultaneous outstanding bytes
    pub peak_usage: usize,
    /// Bytes consumed from the fixed region
    pub region_used: usize,
    /// Fixed region capacity in bytes
    pub capacity: usize,
}
