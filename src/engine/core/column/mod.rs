pub mod bitmap;
pub mod native;
pub mod vector;
pub mod views;

pub use bitmap::ValidityBitmap;
pub use native::NativeType;
pub use vector::ColumnVector;
pub use views::{ArrayView, StructView};
