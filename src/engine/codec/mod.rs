//! Conversion between rows, columnar batches and the self-describing wire format.
//!
//! A stream opens with a start marker and one schema message; every batch
//! message after it is decoded against that schema alone. Schema and batch
//! bodies are Arrow IPC messages carried inside the sentinel framing.

mod array;
mod compression;
mod decoder;
mod encoder;
mod frame;
mod rows;
mod schema;
mod slice_reader;

#[cfg(test)]
mod batch_codec_test;
#[cfg(test)]
mod compression_test;
#[cfg(test)]
mod slice_reader_test;

pub use compression::{Compression, CompressionCodec, Lz4Codec};
pub use decoder::decode_batch;
pub use encoder::encode_batch;
pub use frame::{
    END_OF_DATA, Frame, FrameReader, FrameWriter, KIND_BATCH, KIND_SCHEMA, PEER_EXCEPTION,
    START_OF_STREAM, TIMING_DATA, TimingData,
};
pub use rows::{RowBatcher, batch_to_rows, rows_to_batch};
pub use schema::{decode_schema, encode_schema};
pub use slice_reader::LeSliceReader;
