//! Reuse pools for statement parts and text buffers.
//!
//! A statement checked out from a [`Dialect`](crate::Dialect) takes its chunk
//! list, argument list and text buffer from the process-wide pools here, and
//! hands them back when it is closed or dropped. Everything returned to a pool
//! is cleared first, so a checkout never observes a previous statement.

use crate::stmt::Chunk;
use crate::value::Value;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{LazyLock, Mutex, PoisonError};

/// Limits applied to the process-wide pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Maximum number of idle statement parts kept for reuse.
    pub max_idle_statements: usize,
    /// Maximum number of idle text buffers kept for reuse.
    pub max_idle_buffers: usize,
    /// Buffers that grew beyond this capacity (in bytes) are dropped
    /// instead of being returned to the pool.
    pub max_buffer_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_idle_statements: 256,
            max_idle_buffers: 256,
            max_buffer_capacity: 64 * 1024,
        }
    }
}

impl PoolConfig {
    /// Create a config with default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of idle statements.
    pub fn max_idle_statements(mut self, n: usize) -> Self {
        self.max_idle_statements = n;
        self
    }

    /// Set the maximum number of idle text buffers.
    pub fn max_idle_buffers(mut self, n: usize) -> Self {
        self.max_idle_buffers = n;
        self
    }

    /// Set the largest buffer capacity that is still worth keeping.
    pub fn max_buffer_capacity(mut self, bytes: usize) -> Self {
        self.max_buffer_capacity = bytes;
        self
    }
}

/// Counters describing pool usage since process start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Checkouts served from an idle entry.
    pub reused: u64,
    /// Checkouts that had to allocate.
    pub allocated: u64,
    /// Entries currently idle.
    pub idle: usize,
}

/// Values that can be reset for reuse.
pub(crate) trait Recycle: Default {
    fn recycle(&mut self);

    /// Heap bytes retained by this value.
    fn retained(&self) -> usize;
}

impl Recycle for String {
    fn recycle(&mut self) {
        self.clear();
    }

    fn retained(&self) -> usize {
        self.capacity()
    }
}

/// The reusable parts of a statement: its chunk list and argument list.
#[derive(Debug, Default)]
pub(crate) struct StmtParts {
    pub(crate) chunks: Vec<Chunk>,
    pub(crate) args: Vec<Value>,
}

impl Recycle for StmtParts {
    fn recycle(&mut self) {
        self.chunks.clear();
        self.args.clear();
    }

    fn retained(&self) -> usize {
        self.chunks.capacity() * std::mem::size_of::<Chunk>()
            + self.args.capacity() * std::mem::size_of::<Value>()
    }
}

/// A mutex-guarded free list.
pub(crate) struct Pool<T> {
    free: Mutex<Vec<T>>,
    max_idle: AtomicUsize,
    max_retained: AtomicUsize,
    reused: AtomicU64,
    allocated: AtomicU64,
}

impl<T: Recycle> Pool<T> {
    fn new(max_idle: usize, max_retained: usize) -> Self {
        Self {
            free: Mutex::new(Vec::new()),
            max_idle: AtomicUsize::new(max_idle),
            max_retained: AtomicUsize::new(max_retained),
            reused: AtomicU64::new(0),
            allocated: AtomicU64::new(0),
        }
    }

    pub(crate) fn get(&self) -> T {
        let item = self
            .free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();
        match item {
            Some(item) => {
                self.reused.fetch_add(1, Ordering::Relaxed);
                item
            }
            None => {
                self.allocated.fetch_add(1, Ordering::Relaxed);
                T::default()
            }
        }
    }

    pub(crate) fn put(&self, mut item: T) {
        if item.retained() > self.max_retained.load(Ordering::Relaxed) {
            return;
        }
        item.recycle();
        let mut free = self.free.lock().unwrap_or_else(PoisonError::into_inner);
        if free.len() < self.max_idle.load(Ordering::Relaxed) {
            free.push(item);
        }
    }

    fn configure(&self, max_idle: usize, max_retained: usize) {
        self.max_idle.store(max_idle, Ordering::Relaxed);
        self.max_retained.store(max_retained, Ordering::Relaxed);
        let mut free = self.free.lock().unwrap_or_else(PoisonError::into_inner);
        free.truncate(max_idle);
    }

    fn stats(&self) -> PoolStats {
        PoolStats {
            reused: self.reused.load(Ordering::Relaxed),
            allocated: self.allocated.load(Ordering::Relaxed),
            idle: self.free.lock().unwrap_or_else(PoisonError::into_inner).len(),
        }
    }
}

// Statement parts are small; cap their retained size generously so one huge
// bulk insert does not pin memory forever.
const MAX_RETAINED_PARTS: usize = 1024 * 1024;

pub(crate) static STATEMENTS: LazyLock<Pool<StmtParts>> = LazyLock::new(|| {
    let cfg = PoolConfig::default();
    Pool::new(cfg.max_idle_statements, MAX_RETAINED_PARTS)
});

pub(crate) static BUFFERS: LazyLock<Pool<String>> = LazyLock::new(|| {
    let cfg = PoolConfig::default();
    Pool::new(cfg.max_idle_buffers, cfg.max_buffer_capacity)
});

/// Apply new limits to the process-wide pools.
///
/// Idle entries above the new limits are dropped immediately.
pub fn configure(config: PoolConfig) {
    STATEMENTS.configure(config.max_idle_statements, MAX_RETAINED_PARTS);
    BUFFERS.configure(config.max_idle_buffers, config.max_buffer_capacity);
}

/// Usage counters of the statement pool.
pub fn statement_stats() -> PoolStats {
    STATEMENTS.stats()
}

/// Usage counters of the text buffer pool.
pub fn buffer_stats() -> PoolStats {
    BUFFERS.stats()
}
