mod arrow;
mod data_type;
mod layout;
mod scalar;

#[cfg(test)]
mod arrow_test;
#[cfg(test)]
mod layout_test;

pub use arrow::MAX_NESTING_DEPTH;
pub use data_type::{DataType, Field, Schema, TypeTag};
pub use layout::PhysicalLayout;
pub use scalar::{Row, ScalarValue};
