use std::io::Read;
use std::sync::Arc;

use arrow_array::Array;
use arrow_ipc::reader::StreamReader;
use tracing::debug;

use super::array::load_array_data;
use super::compression::Compression;
use super::schema::encode_schema;
use super::slice_reader::LeSliceReader;
use crate::engine::core::batch::ColumnarBatch;
use crate::engine::core::memory::BufferAllocator;
use crate::engine::errors::{ExchangeError, Result};
use crate::engine::types::Schema;

/// Decodes a batch message body produced by [`super::encode_batch`] against the
/// stream schema. Any inconsistency between the header, the checksum and the
/// record batch is a format error; the partially built batch is released
/// before returning.
pub fn decode_batch(
    payload: &[u8],
    schema: &Arc<Schema>,
    allocator: &BufferAllocator,
) -> Result<ColumnarBatch> {
    let mut header = LeSliceReader::new(payload);
    let compression = Compression::from_flags(header.read_u8()?)?;
    let rows = header.read_u32()? as usize;
    let expected_crc = header.read_u32()?;
    let uncompressed_len = header.read_u32()? as usize;
    let body = compression.decompress(header.rest(), uncompressed_len)?;

    let actual_crc = crc32fast::hash(&body);
    if actual_crc != expected_crc {
        return Err(ExchangeError::format(format!(
            "batch checksum mismatch: header {expected_crc:#010x}, body {actual_crc:#010x}"
        )));
    }

    // The stream schema goes in front so arrow can resolve the batch message.
    let schema_message = encode_schema(schema)?;
    let mut messages = StreamReader::try_new(schema_message.as_slice().chain(&body[..]), None)?;
    let record = messages
        .next()
        .ok_or_else(|| ExchangeError::format("batch message holds no record batch"))??;
    if messages.next().is_some() {
        return Err(ExchangeError::format(
            "batch message holds more than one record batch",
        ));
    }
    if record.num_rows() != rows {
        return Err(ExchangeError::format(format!(
            "header announces {rows} rows but the record batch holds {}",
            record.num_rows()
        )));
    }
    if record.num_columns() != schema.field_count() {
        return Err(ExchangeError::format(format!(
            "record batch has {} columns, schema has {}",
            record.num_columns(),
            schema.field_count()
        )));
    }

    let mut batch = ColumnarBatch::new(Arc::clone(schema), rows, allocator)?;
    for (idx, field) in schema.fields().iter().enumerate() {
        let data = record.column(idx).to_data();
        load_array_data(&data, batch.column_mut(idx)?, rows, field, None)?;
    }
    batch.set_num_rows(rows)?;

    debug!(
        target: "batch_exchange::codec",
        rows,
        body_bytes = body.len(),
        %compression,
        "Batch decoded"
    );
    Ok(batch)
}
