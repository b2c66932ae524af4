use std::sync::Arc;

use serde::Deserialize;

use super::arena::{BufferArena, Region};
use crate::engine::errors::{ExchangeError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryBackend {
    #[default]
    Heap,
    Arena,
}

/// Source of buffers for vectors: the global heap or a tracked [`BufferArena`].
#[derive(Debug, Clone)]
pub enum BufferAllocator {
    Heap,
    Arena(Arc<BufferArena>),
}

impl BufferAllocator {
    pub fn heap() -> Self {
        BufferAllocator::Heap
    }

    pub fn arena(arena: Arc<BufferArena>) -> Self {
        BufferAllocator::Arena(arena)
    }

    pub fn backend(&self) -> MemoryBackend {
        match self {
            BufferAllocator::Heap => MemoryBackend::Heap,
            BufferAllocator::Arena(_) => MemoryBackend::Arena,
        }
    }

    pub fn allocate(&self, len: usize) -> Result<Buffer> {
        let storage = match self {
            BufferAllocator::Heap => {
                let mut bytes = Vec::new();
                bytes.try_reserve_exact(len).map_err(|e| {
                    ExchangeError::Capacity(format!("failed to allocate {len} bytes: {e}"))
                })?;
                bytes.resize(len, 0);
                Storage::Heap(bytes)
            }
            BufferAllocator::Arena(arena) => Storage::Arena {
                region: arena.allocate(len)?,
                arena: Arc::clone(arena),
            },
        };
        Ok(Buffer { storage })
    }
}

#[derive(Debug)]
enum Storage {
    Heap(Vec<u8>),
    Arena {
        arena: Arc<BufferArena>,
        region: Region,
    },
    Released,
}

/// Zero-initialised byte buffer. Growth preserves existing bytes.
#[derive(Debug)]
pub struct Buffer {
    storage: Storage,
}

impl Buffer {
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_released(&self) -> bool {
        matches!(self.storage, Storage::Released)
    }

    pub fn as_slice(&self) -> &[u8] {
        match &self.storage {
            Storage::Heap(bytes) => bytes,
            Storage::Arena { region, .. } => region.bytes(),
            Storage::Released => &[],
        }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        match &mut self.storage {
            Storage::Heap(bytes) => bytes,
            Storage::Arena { region, .. } => region.bytes_mut(),
            Storage::Released => &mut [],
        }
    }

    /// Grows to `new_len` bytes. On failure the buffer is left untouched.
    pub fn grow(&mut self, new_len: usize) -> Result<()> {
        let old_len = self.len();
        if new_len <= old_len {
            return Ok(());
        }

        match &mut self.storage {
            Storage::Heap(bytes) => {
                bytes.try_reserve_exact(new_len - old_len).map_err(|e| {
                    ExchangeError::Capacity(format!(
                        "failed to grow buffer to {new_len} bytes: {e}"
                    ))
                })?;
                bytes.resize(new_len, 0);
            }
            Storage::Arena { arena, region } => {
                let mut fresh = arena.allocate(new_len)?;
                fresh.bytes_mut()[..old_len].copy_from_slice(region.bytes());
                let old = std::mem::replace(region, fresh);
                arena.release(old);
            }
            Storage::Released => {
                return Err(ExchangeError::Capacity(
                    "cannot grow a released buffer".into(),
                ));
            }
        }
        Ok(())
    }

    /// Returns the bytes to their allocator. Safe to call repeatedly.
    pub fn release(&mut self) {
        if let Storage::Arena { arena, region } =
            std::mem::replace(&mut self.storage, Storage::Released)
        {
            arena.release(region);
        }
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        self.release();
    }
}
