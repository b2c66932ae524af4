pub mod batch_factory;
pub mod row_factory;
pub mod schema_factory;

#[cfg(test)]
mod row_factory_test;

pub use batch_factory::BatchFactory;
pub use row_factory::RowFactory;
pub use schema_factory::SchemaFactory;
