//! Buffer pool & memory-mapped buffer (§4.B): pooled byte buffers for the hot
//! storage path, plus a thin wrapper over `memmap2` for read/write spans.

mod mmap;
mod pool;

pub use mmap::{MappedBuffer, MemoryMappingError};
pub use pool::{BufferPool, BufferPoolConfig, BufferPoolStats, PooledBuffer};
