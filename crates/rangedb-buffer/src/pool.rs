use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Pool parameters (§6 "Buffer pool: min_buffers=2, max_buffers=100, default_size=1 MiB").
#[derive(Clone, Copy, Debug)]
pub struct BufferPoolConfig {
    pub min_buffers: usize,
    pub max_buffers: usize,
    pub default_size: usize,
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self {
            min_buffers: 2,
            max_buffers: 100,
            default_size: 1024 * 1024,
        }
    }
}

/// Snapshot of pool activity (§4.B "Statistics").
#[derive(Clone, Debug, Default)]
pub struct BufferPoolStats {
    pub allocations: u64,
    pub deallocations: u64,
    pub cache_hits: u64,
    pub memory_efficiency: f64,
    pub buffer_sizes: Vec<usize>,
}

/// A pool of reusable byte buffers guarded by a single mutex (§5
/// "Buffer pool operations are guarded by a single mutex; capacity is bounded").
pub struct BufferPool {
    config: BufferPoolConfig,
    free: Mutex<Vec<Vec<u8>>>,
    outstanding: AtomicU64,
    allocations: AtomicU64,
    deallocations: AtomicU64,
    cache_hits: AtomicU64,
}

impl BufferPool {
    pub fn new(config: BufferPoolConfig) -> Self {
        let mut free = Vec::with_capacity(config.min_buffers);
        for _ in 0..config.min_buffers {
            free.push(vec![0u8; config.default_size]);
        }
        Self {
            config,
            free: Mutex::new(free),
            outstanding: AtomicU64::new(0),
            allocations: AtomicU64::new(0),
            deallocations: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
        }
    }

    /// Returns a cleared buffer of at least `size` bytes. If the pool is
    /// empty and already at `max_buffers` outstanding, a transient buffer is
    /// allocated and will not be returned to the pool on release.
    pub fn get(self: &std::sync::Arc<Self>, size: usize) -> PooledBuffer {
        let want = size.max(self.config.default_size);
        let mut free = self.free.lock().expect("buffer pool mutex poisoned");

        let (mut buf, from_pool) = if let Some(pos) = free.iter().position(|b| b.capacity() >= want) {
            (free.swap_remove(pos), true)
        } else {
            (Vec::new(), false)
        };

        if from_pool {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
        }

        let outstanding = self.outstanding.fetch_add(1, Ordering::Relaxed) + 1;
        let transient = !from_pool && outstanding as usize > self.config.max_buffers;

        buf.clear();
        buf.resize(want, 0);
        self.allocations.fetch_add(1, Ordering::Relaxed);

        PooledBuffer {
            pool: if transient { None } else { Some(self.clone()) },
            data: Some(buf),
        }
    }

    fn release(&self, mut buf: Vec<u8>) {
        self.outstanding.fetch_sub(1, Ordering::Relaxed);
        self.deallocations.fetch_add(1, Ordering::Relaxed);

        let mut free = self.free.lock().expect("buffer pool mutex poisoned");
        if free.len() < self.config.max_buffers {
            buf.clear();
            free.push(buf);
        }
    }

    pub fn stats(&self) -> BufferPoolStats {
        let allocations = self.allocations.load(Ordering::Relaxed);
        let cache_hits = self.cache_hits.load(Ordering::Relaxed);
        let free = self.free.lock().expect("buffer pool mutex poisoned");
        let memory_efficiency = if allocations == 0 {
            0.0
        } else {
            cache_hits as f64 / allocations as f64
        };
        BufferPoolStats {
            allocations,
            deallocations: self.deallocations.load(Ordering::Relaxed),
            cache_hits,
            memory_efficiency,
            buffer_sizes: free.iter().map(|b| b.capacity()).collect(),
        }
    }
}

/// A buffer checked out of a [`BufferPool`]. Released on drop; releasing a
/// buffer that did not originate from a pool (a transient overflow
/// allocation) is simply dropped rather than returned anywhere.
pub struct PooledBuffer {
    pool: Option<std::sync::Arc<BufferPool>>,
    data: Option<Vec<u8>>,
}

impl PooledBuffer {
    /// Releases the buffer back to its pool now instead of waiting for drop.
    /// A no-op if already released.
    pub fn release(&mut self) {
        if let (Some(pool), Some(data)) = (self.pool.take(), self.data.take()) {
            pool.release(data);
        } else {
            self.data = None;
        }
    }
}

impl std::ops::Deref for PooledBuffer {
    type Target = [u8];
    fn deref(&self) -> &[u8] {
        self.data.as_deref().unwrap_or(&[])
    }
}

impl std::ops::DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.data.as_deref_mut().unwrap_or(&mut [])
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn get_returns_buffer_at_least_requested_size() {
        let pool = Arc::new(BufferPool::new(BufferPoolConfig {
            min_buffers: 1,
            max_buffers: 4,
            default_size: 64,
        }));
        let buf = pool.get(128);
        assert!(buf.len() >= 128);
    }

    #[test]
    fn released_buffer_is_reused_as_cache_hit() {
        let pool = Arc::new(BufferPool::new(BufferPoolConfig {
            min_buffers: 0,
            max_buffers: 4,
            default_size: 64,
        }));
        {
            let _buf = pool.get(64);
        }
        let _buf2 = pool.get(64);
        assert_eq!(pool.stats().cache_hits, 1);
    }

    #[test]
    fn double_release_is_a_no_op() {
        let pool = Arc::new(BufferPool::new(BufferPoolConfig {
            min_buffers: 0,
            max_buffers: 4,
            default_size: 64,
        }));
        let mut buf = pool.get(64);
        buf.release();
        buf.release();
    }

    #[test]
    fn overflow_beyond_max_buffers_is_transient_and_not_pooled() {
        let pool = Arc::new(BufferPool::new(BufferPoolConfig {
            min_buffers: 0,
            max_buffers: 1,
            default_size: 16,
        }));
        let _a = pool.get(16);
        let b = pool.get(16);
        drop(b);
        // Only the non-transient slot should have gone back to the free list.
        let stats = pool.stats();
        assert!(stats.buffer_sizes.len() <= 1);
    }

    #[test]
    fn get_clears_previous_contents() {
        let pool = Arc::new(BufferPool::new(BufferPoolConfig {
            min_buffers: 0,
            max_buffers: 4,
            default_size: 8,
        }));
        {
            let mut buf = pool.get(8);
            buf[0] = 0xff;
        }
        let buf = pool.get(8);
        assert_eq!(buf[0], 0);
    }
}
