use arrow_ipc::reader::StreamReader;
use arrow_ipc::writer::{DictionaryTracker, IpcDataGenerator, IpcWriteOptions, write_message};

use crate::engine::errors::Result;
use crate::engine::types::Schema;

/// Encodes `schema` as a single Arrow IPC schema message.
pub fn encode_schema(schema: &Schema) -> Result<Vec<u8>> {
    let write_options = IpcWriteOptions::default();
    let mut dictionary_tracker = DictionaryTracker::new(true);
    let encoded = IpcDataGenerator::default().schema_to_bytes_with_dictionary_tracker(
        &schema.to_arrow_schema(),
        &mut dictionary_tracker,
        &write_options,
    );

    let mut out = Vec::new();
    write_message(&mut out, encoded, &write_options)?;
    Ok(out)
}

/// Decodes a schema message written by [`encode_schema`]. Types outside the
/// supported set, runaway nesting and truncated messages are format errors.
pub fn decode_schema(message: &[u8]) -> Result<Schema> {
    let reader = StreamReader::try_new(message, None)?;
    Schema::from_arrow_schema(&reader.schema())
}
