use std::io::Cursor;

use super::{ExchangeWriter, StreamState};
use crate::engine::codec::{Compression, Frame, FrameReader, TimingData};
use crate::engine::errors::ExchangeError;
use crate::test_helpers::factory::Factory;
use crate::test_helpers::streams::{id_row, id_schema};

fn frames(bytes: Vec<u8>) -> Vec<Frame> {
    let mut reader = FrameReader::new(Cursor::new(bytes));
    let mut out = Vec::new();
    while let Some(frame) = reader.read_frame().unwrap() {
        out.push(frame);
    }
    out
}

#[test]
fn writes_frames_in_protocol_order() {
    let schema = id_schema();
    let batch = Factory::batch(schema.clone())
        .with_rows((0..4).map(id_row).collect())
        .create();

    let mut writer = ExchangeWriter::new(Vec::new(), Compression::Lz4);
    writer.start(&schema).unwrap();
    writer.write_batch(&batch).unwrap();
    writer
        .write_timing(TimingData {
            boot_ms: 1,
            init_ms: 2,
            finish_ms: 3,
        })
        .unwrap();
    writer.finish().unwrap();
    assert_eq!(writer.state(), StreamState::Closed);

    let names: Vec<_> = frames(writer.get_ref().clone())
        .iter()
        .map(|f| f.name())
        .collect();
    assert_eq!(
        names,
        vec![
            Frame::StartOfStream.name(),
            Frame::Schema((*schema).clone()).name(),
            Frame::Batch(Default::default()).name(),
            Frame::Timing(TimingData::default()).name(),
            Frame::EndOfData.name(),
        ]
    );
}

#[test]
fn out_of_order_writes_are_rejected() {
    let schema = id_schema();
    let batch = Factory::batch(schema.clone())
        .with_rows(vec![id_row(1)])
        .create();

    let mut writer = ExchangeWriter::new(Vec::new(), Compression::None);
    assert!(matches!(
        writer.write_batch(&batch).unwrap_err(),
        ExchangeError::ProtocolViolation(_)
    ));
    assert!(matches!(
        writer.finish().unwrap_err(),
        ExchangeError::ProtocolViolation(_)
    ));

    writer.start(&schema).unwrap();
    assert!(matches!(
        writer.write_schema(&schema).unwrap_err(),
        ExchangeError::ProtocolViolation(_)
    ));
    assert!(matches!(
        writer.begin().unwrap_err(),
        ExchangeError::ProtocolViolation(_)
    ));
}

#[test]
fn exception_starts_stream_and_closes_it() {
    let mut writer = ExchangeWriter::new(Vec::new(), Compression::None);
    writer.write_exception("bad input").unwrap();
    assert_eq!(writer.state(), StreamState::Closed);
    assert!(writer.finish().is_err());

    let frames = frames(writer.get_ref().clone());
    assert_eq!(
        frames,
        vec![
            Frame::StartOfStream,
            Frame::PeerException("bad input".into())
        ]
    );
}

#[test]
fn batch_metrics_count_rows_and_payload() {
    let schema = id_schema();
    let batch = Factory::batch(schema.clone())
        .with_rows((0..3).map(id_row).collect())
        .create();
    let metrics = super::SessionMetrics::new();

    let mut writer =
        ExchangeWriter::new(Vec::new(), Compression::None).with_metrics(metrics.clone());
    writer.start(&schema).unwrap();
    writer.write_batch(&batch).unwrap();
    writer.write_batch(&batch).unwrap();

    assert_eq!(metrics.batches_sent(), 2);
    assert_eq!(metrics.rows_sent(), 6);
    assert!(metrics.bytes_sent() > 0);
}
