use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::engine::errors::{ExchangeError, Result};

/// Arena-relative identity of an allocated region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegionHandle {
    id: u64,
    len: usize,
}

impl RegionHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// A block of bytes owned by a [`BufferArena`]. Must be handed back via [`BufferArena::release`].
#[derive(Debug)]
pub struct Region {
    handle: RegionHandle,
    bytes: Box<[u8]>,
}

impl Region {
    pub fn handle(&self) -> RegionHandle {
        self.handle
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}

#[derive(Debug, Default)]
struct ArenaState {
    next_id: u64,
    live: HashMap<u64, usize>,
    live_bytes: usize,
    peak_bytes: usize,
    total_allocations: u64,
    double_frees: u64,
}

/// Manually managed allocator with explicit allocate/release and byte accounting.
///
/// Every region handed out is tracked by id until it is released, so tests can
/// assert that a vector or session returned everything it took. Closing the
/// arena refuses new allocations; regions still live at that point are reported
/// and may be released later.
#[derive(Debug)]
pub struct BufferArena {
    name: String,
    limit: usize,
    state: Mutex<ArenaState>,
    closed: AtomicBool,
}

impl BufferArena {
    pub fn new(name: impl Into<String>, limit: usize) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            limit,
            state: Mutex::new(ArenaState::default()),
            closed: AtomicBool::new(false),
        })
    }

    pub fn unbounded(name: impl Into<String>) -> Arc<Self> {
        Self::new(name, usize::MAX)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn allocate(&self, len: usize) -> Result<Region> {
        if self.is_closed() {
            return Err(ExchangeError::Capacity(format!(
                "arena '{}' is closed",
                self.name
            )));
        }

        let mut state = self.state.lock();
        let requested = state.live_bytes.checked_add(len).ok_or_else(|| {
            ExchangeError::Capacity(format!("arena '{}' size overflow", self.name))
        })?;
        if requested > self.limit {
            return Err(ExchangeError::Capacity(format!(
                "arena '{}' limit {} exceeded: {} live + {} requested",
                self.name, self.limit, state.live_bytes, len
            )));
        }

        let mut bytes = Vec::new();
        bytes.try_reserve_exact(len).map_err(|e| {
            ExchangeError::Capacity(format!(
                "arena '{}' failed to allocate {len} bytes: {e}",
                self.name
            ))
        })?;
        bytes.resize(len, 0);

        let id = state.next_id;
        state.next_id += 1;
        state.live.insert(id, len);
        state.live_bytes = requested;
        state.peak_bytes = state.peak_bytes.max(requested);
        state.total_allocations += 1;

        Ok(Region {
            handle: RegionHandle { id, len },
            bytes: bytes.into_boxed_slice(),
        })
    }

    pub fn release(&self, region: Region) {
        let handle = region.handle;
        drop(region);

        let mut state = self.state.lock();
        match state.live.remove(&handle.id) {
            Some(len) => state.live_bytes -= len,
            None => {
                state.double_frees += 1;
                warn!(
                    target: "batch_exchange::memory",
                    arena = %self.name,
                    region = handle.id,
                    "Release of unknown region"
                );
            }
        }
    }

    /// Refuses further allocations. Returns `true` only for the call that closed the arena.
    pub fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }

        let state = self.state.lock();
        if state.live.is_empty() {
            debug!(
                target: "batch_exchange::memory",
                arena = %self.name,
                peak_bytes = state.peak_bytes,
                "Arena closed"
            );
        } else {
            debug!(
                target: "batch_exchange::memory",
                arena = %self.name,
                live_regions = state.live.len(),
                live_bytes = state.live_bytes,
                "Arena closed with outstanding regions"
            );
        }
        true
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn live_bytes(&self) -> usize {
        self.state.lock().live_bytes
    }

    pub fn live_regions(&self) -> usize {
        self.state.lock().live.len()
    }

    pub fn peak_bytes(&self) -> usize {
        self.state.lock().peak_bytes
    }

    pub fn total_allocations(&self) -> u64 {
        self.state.lock().total_allocations
    }

    pub fn double_frees(&self) -> u64 {
        self.state.lock().double_frees
    }
}
