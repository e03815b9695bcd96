//! Size-class geometry for the block pool
//!
//! The class list is a compile-time constant: game object sizes are known
//! when the engine ships, and a fixed table keeps the size-to-class lookup
//! at a single array index.

/// Number of size classes managed by the pool
pub const BLOCK_COUNT: usize = 14;

/// Largest block size the pool will serve, in bytes
pub const MAX_BLOCK_SIZE: usize = 640;

/// Bytes of backing memory per chunk
pub const CHUNK_SIZE: usize = 16 * 1024;

/// Fixed stride by which the chunk array grows
pub const CHUNK_STRIDE: usize = 128;

/// Alignment of every block handed out by the pool
///
/// Every class size is a multiple of 16 and chunk buffers are 16-aligned,
/// so every slot inherits this alignment.
pub const BLOCK_ALIGN: usize = 16;

/// Block size of each class, strictly increasing
pub const BLOCK_SIZES: [usize; BLOCK_COUNT] = [
    16,  // 0
    32,  // 1
    64,  // 2
    96,  // 3
    128, // 4
    160, // 5
    192, // 6
    224, // 7
    256, // 8
    320, // 9
    384, // 10
    448, // 11
    512, // 12
    640, // 13
];

/// Precomputed byte-size to class-index map
///
/// `table[s]` is the index of the smallest class whose block size is at
/// least `s`. Built once at compile time; read-only thereafter.
pub(crate) struct SizeClassTable {
    classes: [u8; MAX_BLOCK_SIZE + 1],
}

impl SizeClassTable {
    pub(crate) const fn new() -> Self {
        let mut classes = [0u8; MAX_BLOCK_SIZE + 1];
        let mut class = 0;
        let mut size = 1;
        while size <= MAX_BLOCK_SIZE {
            if size > BLOCK_SIZES[class] {
                class += 1;
            }
            classes[size] = class as u8;
            size += 1;
        }
        Self { classes }
    }

    /// Resolves a request size to its class index
    ///
    /// Returns `None` for zero-byte requests and for sizes above
    /// [`MAX_BLOCK_SIZE`]; both fall outside the pool's domain.
    #[inline]
    pub(crate) const fn index_for(&self, size: usize) -> Option<usize> {
        if size == 0 || size > MAX_BLOCK_SIZE {
            None
        } else {
            Some(self.classes[size] as usize)
        }
    }
}

pub(crate) static SIZE_CLASSES: SizeClassTable = SizeClassTable::new();
