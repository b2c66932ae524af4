use std::sync::Arc;

use arrow_array::{ArrayRef, RecordBatch, RecordBatchOptions, make_array};
use arrow_ipc::writer::{DictionaryTracker, IpcDataGenerator, IpcWriteOptions, write_message};
use bytes::{BufMut, Bytes, BytesMut};
use tracing::debug;

use super::array::to_array_data;
use super::compression::Compression;
use crate::engine::core::batch::ColumnarBatch;
use crate::engine::errors::{ExchangeError, Result};

/// Encodes a batch message body (everything after the kind byte): flags, row
/// count, crc32 of the uncompressed body, uncompressed length, then the body,
/// which is one Arrow IPC record batch message.
pub fn encode_batch(batch: &ColumnarBatch, compression: Compression) -> Result<Bytes> {
    let rows = batch.num_rows();
    let columns = batch
        .columns()
        .iter()
        .map(|column| to_array_data(column, rows).map(make_array))
        .collect::<Result<Vec<ArrayRef>>>()?;
    let options = RecordBatchOptions::new().with_row_count(Some(rows));
    let record = RecordBatch::try_new_with_options(
        Arc::new(batch.schema().to_arrow_schema()),
        columns,
        &options,
    )?;

    let write_options = IpcWriteOptions::default();
    let mut dictionary_tracker = DictionaryTracker::new(true);
    let (dictionaries, encoded) = IpcDataGenerator::default().encoded_batch(
        &record,
        &mut dictionary_tracker,
        &write_options,
    )?;
    let mut body = Vec::new();
    for dictionary in dictionaries {
        write_message(&mut body, dictionary, &write_options)?;
    }
    write_message(&mut body, encoded, &write_options)?;

    let crc = crc32fast::hash(&body);
    let payload = compression.compress(&body);

    let mut out = BytesMut::with_capacity(13 + payload.len());
    out.put_u8(compression.flags());
    out.put_u32_le(to_u32(rows, "row count")?);
    out.put_u32_le(crc);
    out.put_u32_le(to_u32(body.len(), "body length")?);
    out.put_slice(&payload);

    debug!(
        target: "batch_exchange::codec",
        rows,
        body_bytes = body.len(),
        wire_bytes = out.len(),
        %compression,
        "Batch encoded"
    );
    Ok(out.freeze())
}

fn to_u32(value: usize, what: &str) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| ExchangeError::Capacity(format!("{what} {value} exceeds u32 range")))
}
