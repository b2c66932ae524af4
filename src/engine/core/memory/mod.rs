mod arena;
mod buffer;


pub use arena::{BufferArena, Region, RegionHandle};
pub use buffer::{Buffer, BufferAllocator, MemoryBackend};
