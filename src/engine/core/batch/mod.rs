mod columnar_batch;
mod row_view;


pub use columnar_batch::ColumnarBatch;
pub use row_view::RowView;
