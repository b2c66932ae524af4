pub mod batch;
pub mod column;
pub mod memory;

pub use batch::{ColumnarBatch, RowView};
pub use column::{ArrayView, ColumnVector, NativeType, StructView};
pub use memory::{BufferAllocator, BufferArena, MemoryBackend};
