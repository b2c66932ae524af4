use std::sync::Arc;

use bytes::{BufMut, BytesMut};

use super::{Compression, decode_batch, encode_batch};
use crate::engine::core::batch::ColumnarBatch;
use crate::engine::core::memory::{BufferAllocator, BufferArena};
use crate::engine::errors::ExchangeError;
use crate::engine::types::{DataType, Field, Row, ScalarValue, Schema};
use crate::test_helpers::factory::Factory;

/// Wraps a hand-built body in a valid uncompressed batch header.
fn payload(rows: u32, body: &[u8]) -> Vec<u8> {
    let mut out = BytesMut::new();
    out.put_u8(0);
    out.put_u32_le(rows);
    out.put_u32_le(crc32fast::hash(body));
    out.put_u32_le(body.len() as u32);
    out.put_slice(body);
    out.to_vec()
}

/// Offset of the body in an uncompressed batch message.
const BODY_START: usize = 13;

fn offsets(values: &[i32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Replaces the last occurrence of `from` in the body and fixes the checksum.
fn patched(bytes: &[u8], from: &[u8], to: &[u8]) -> Vec<u8> {
    let mut out = bytes.to_vec();
    let at = out[BODY_START..]
        .windows(from.len())
        .rposition(|window| window == from)
        .expect("pattern present in body")
        + BODY_START;
    out[at..at + from.len()].copy_from_slice(to);
    let crc = crc32fast::hash(&out[BODY_START..]);
    out[5..9].copy_from_slice(&crc.to_le_bytes());
    out
}

fn encoded(schema: &Arc<Schema>, rows: Vec<Row>) -> Vec<u8> {
    let batch = Factory::batch(schema.clone()).with_rows(rows).create();
    encode_batch(&batch, Compression::None).unwrap().to_vec()
}

fn single(name: &str, data_type: DataType) -> Arc<Schema> {
    Arc::new(Schema::new(vec![Field::new(name, data_type, true)]).unwrap())
}

fn expect_format(result: Result<impl std::fmt::Debug, ExchangeError>) {
    match result {
        Err(ExchangeError::Format(_)) => {}
        other => panic!("expected format error, got {other:?}"),
    }
}

#[test]
fn every_type_round_trips_with_nulls() {
    let schema = Factory::schema().create();
    let rows = Factory::rows(schema.clone())
        .with_null_ratio(0.3)
        .create_list(200);
    let batch = Factory::batch(schema.clone()).with_rows(rows.clone()).create();

    for compression in [Compression::None, Compression::Lz4] {
        let bytes = encode_batch(&batch, compression).unwrap();
        let decoded = decode_batch(&bytes, &schema, &BufferAllocator::heap()).unwrap();
        assert_eq!(decoded.num_rows(), 200);
        assert_eq!(decoded.to_rows().unwrap(), rows, "compression {compression}");
    }
}

#[test]
fn decoded_batch_keeps_null_counts() {
    let schema = single("v", DataType::Int32);
    let rows: Vec<Row> = vec![
        Row::new(vec![ScalarValue::Int32(1)]),
        Row::new(vec![ScalarValue::Null]),
        Row::new(vec![ScalarValue::Null]),
    ];
    let batch = Factory::batch(schema.clone()).with_rows(rows).create();
    let bytes = encode_batch(&batch, Compression::None).unwrap();
    let decoded = decode_batch(&bytes, &schema, &BufferAllocator::heap()).unwrap();

    let column = decoded.column(0).unwrap();
    assert_eq!(column.null_count(), 2);
    assert_eq!(column.get::<i32>(0).unwrap(), Some(1));
    assert!(column.is_null(2).unwrap());
}

#[test]
fn empty_batch_round_trips() {
    let schema = Factory::schema().create();
    let batch = Factory::batch(schema.clone()).create();
    let bytes = encode_batch(&batch, Compression::Lz4).unwrap();
    let decoded = decode_batch(&bytes, &schema, &BufferAllocator::heap()).unwrap();
    assert_eq!(decoded.num_rows(), 0);
}

#[test]
fn arena_decoded_batch_releases_on_close() {
    let schema = Factory::schema().create();
    let rows = Factory::rows(schema.clone()).create_list(64);
    let batch = Factory::batch(schema.clone()).with_rows(rows).create();
    let bytes = encode_batch(&batch, Compression::None).unwrap();

    let arena = BufferArena::unbounded("decode");
    let mut decoded =
        decode_batch(&bytes, &schema, &BufferAllocator::arena(arena.clone())).unwrap();
    assert!(arena.live_bytes() > 0);
    decoded.close();
    decoded.close();
    assert_eq!(arena.live_bytes(), 0);
    assert_eq!(arena.double_frees(), 0);
}

#[test]
fn nested_arrays_round_trip_exactly() {
    let schema = single(
        "matrix",
        DataType::array_of(Field::new(
            "row",
            DataType::array_of(Field::new("cell", DataType::Int64, true)),
            true,
        )),
    );
    let ints = |v: &[i64]| ScalarValue::Array(v.iter().map(|i| ScalarValue::Int64(*i)).collect());
    let rows = vec![
        Row::new(vec![ScalarValue::Array(vec![ints(&[1, 2]), ints(&[])])]),
        Row::new(vec![ScalarValue::Null]),
        Row::new(vec![ScalarValue::Array(vec![])]),
        Row::new(vec![ScalarValue::Array(vec![ScalarValue::Null, ints(&[3])])]),
    ];
    let batch = Factory::batch(schema.clone()).with_rows(rows.clone()).create();
    let bytes = encode_batch(&batch, Compression::None).unwrap();
    let decoded = decode_batch(&bytes, &schema, &BufferAllocator::heap()).unwrap();
    assert_eq!(decoded.to_rows().unwrap(), rows);
}

#[test]
fn corrupted_body_fails_checksum() {
    let schema = Factory::schema().create();
    let rows = Factory::rows(schema.clone()).create_list(10);
    let batch = Factory::batch(schema.clone()).with_rows(rows).create();
    let mut bytes = encode_batch(&batch, Compression::None).unwrap().to_vec();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xff;

    expect_format(decode_batch(&bytes, &schema, &BufferAllocator::heap()));
}

#[test]
fn truncated_body_is_rejected() {
    let schema = single("v", DataType::Int64);
    let bytes = encoded(&schema, (0..8).map(|i| Row::new(vec![ScalarValue::Int64(i)])).collect());
    let body = &bytes[BODY_START..bytes.len() - 16];

    expect_format(decode_batch(
        &payload(8, body),
        &schema,
        &BufferAllocator::heap(),
    ));
}

#[test]
fn second_record_batch_in_one_message_is_rejected() {
    let schema = single("v", DataType::Int32);
    let bytes = encoded(&schema, vec![Row::new(vec![ScalarValue::Int32(5)])]);
    let mut body = bytes[BODY_START..].to_vec();
    body.extend_from_slice(&bytes[BODY_START..]);

    expect_format(decode_batch(
        &payload(1, &body),
        &schema,
        &BufferAllocator::heap(),
    ));
}

#[test]
fn header_row_count_must_match_the_record_batch() {
    let schema = single("v", DataType::Int64);
    let mut bytes = encoded(&schema, vec![Row::new(vec![ScalarValue::Int64(1)])]);
    bytes[1..5].copy_from_slice(&u32::MAX.to_le_bytes());

    expect_format(decode_batch(&bytes, &schema, &BufferAllocator::heap()));
}

fn two_strings() -> (Arc<Schema>, Vec<u8>) {
    let schema = single("s", DataType::Utf8);
    let bytes = encoded(
        &schema,
        vec![
            Row::new(vec!["seventy".into()]),
            Row::new(vec!["eleven-long".into()]),
        ],
    );
    (schema, bytes)
}

#[test]
fn decreasing_offsets_are_rejected() {
    let (schema, bytes) = two_strings();
    let bytes = patched(&bytes, &offsets(&[0, 7, 18]), &offsets(&[0, 7, 3]));
    expect_format(decode_batch(&bytes, &schema, &BufferAllocator::heap()));
}

#[test]
fn offsets_must_start_at_zero() {
    let (schema, bytes) = two_strings();
    let bytes = patched(&bytes, &offsets(&[0, 7, 18]), &offsets(&[1, 7, 18]));
    expect_format(decode_batch(&bytes, &schema, &BufferAllocator::heap()));
}

#[test]
fn offsets_past_value_data_are_rejected() {
    let (schema, bytes) = two_strings();
    let bytes = patched(&bytes, &offsets(&[0, 7, 18]), &offsets(&[0, 7, 90]));
    expect_format(decode_batch(&bytes, &schema, &BufferAllocator::heap()));
}

#[test]
fn invalid_utf8_is_rejected() {
    let (schema, bytes) = two_strings();
    let bytes = patched(&bytes, b"seventy", &[b's', b'e', 0xff, b'e', b'n', b't', b'y']);
    expect_format(decode_batch(&bytes, &schema, &BufferAllocator::heap()));
}

#[test]
fn binary_accepts_arbitrary_bytes() {
    let schema = single("b", DataType::Binary);
    let bytes = encoded(
        &schema,
        vec![
            Row::new(vec![ScalarValue::Binary(vec![0xff])]),
            Row::new(vec![ScalarValue::Binary(vec![0x00])]),
        ],
    );

    let batch = decode_batch(&bytes, &schema, &BufferAllocator::heap()).unwrap();
    assert_eq!(
        batch.column(0).unwrap().get_bytes(0).unwrap(),
        Some(&[0xff][..])
    );
}

#[test]
fn array_child_must_cover_last_offset() {
    let schema = single(
        "a",
        DataType::array_of(Field::new("item", DataType::Int32, true)),
    );
    let ints = |v: &[i32]| ScalarValue::Array(v.iter().map(|i| ScalarValue::Int32(*i)).collect());
    let bytes = encoded(
        &schema,
        vec![Row::new(vec![ints(&[1, 2])]), Row::new(vec![ints(&[3])])],
    );
    let bytes = patched(&bytes, &offsets(&[0, 2, 3]), &offsets(&[0, 2, 9]));

    expect_format(decode_batch(&bytes, &schema, &BufferAllocator::heap()));
}

#[test]
fn null_in_non_nullable_column_is_rejected() {
    let nullable = single("v", DataType::Int32);
    let bytes = encoded(
        &nullable,
        vec![
            Row::new(vec![ScalarValue::Int32(1)]),
            Row::new(vec![ScalarValue::Null]),
        ],
    );
    let required = Arc::new(Schema::new(vec![Field::new("v", DataType::Int32, false)]).unwrap());

    expect_format(decode_batch(&bytes, &required, &BufferAllocator::heap()));
}

#[test]
fn null_in_non_nullable_struct_child_is_rejected() {
    let point = |nullable| {
        single(
            "p",
            DataType::Struct(vec![
                Field::new("x", DataType::Int32, nullable),
                Field::new("y", DataType::Int32, true),
            ]),
        )
    };
    let bytes = encoded(
        &point(true),
        vec![Row::new(vec![ScalarValue::Struct(vec![
            ScalarValue::Null,
            ScalarValue::Int32(2),
        ])])],
    );

    expect_format(decode_batch(&bytes, &point(false), &BufferAllocator::heap()));
}

#[test]
fn null_struct_rows_may_hide_required_children() {
    let schema = single(
        "p",
        DataType::Struct(vec![Field::new("x", DataType::Int32, false)]),
    );
    let rows = vec![
        Row::new(vec![ScalarValue::Struct(vec![ScalarValue::Int32(1)])]),
        Row::new(vec![ScalarValue::Null]),
    ];
    let bytes = encoded(&schema, rows.clone());

    let decoded = decode_batch(&bytes, &schema, &BufferAllocator::heap()).unwrap();
    assert_eq!(decoded.to_rows().unwrap(), rows);
}

#[test]
fn null_in_required_column_cannot_be_encoded() {
    let schema = Arc::new(Schema::new(vec![Field::new("id", DataType::Int64, false)]).unwrap());
    let mut batch = ColumnarBatch::new(schema, 2, &BufferAllocator::heap()).unwrap();
    let column = batch.column_mut(0).unwrap();
    column.append(1i64).unwrap();
    column.append_null().unwrap();
    batch.set_num_rows(2).unwrap();

    expect_format(encode_batch(&batch, Compression::None));
}

#[test]
fn out_of_order_array_rows_encode_after_sealing() {
    let schema = single(
        "a",
        DataType::array_of(Field::new("item", DataType::Int32, true)),
    );
    let mut batch = ColumnarBatch::new(schema.clone(), 2, &BufferAllocator::heap()).unwrap();
    let column = batch.column_mut(0).unwrap();
    {
        let child = column.child_mut(0).unwrap();
        for v in 0..5i32 {
            child.append(v).unwrap();
        }
    }
    column.put_array(1, 2, 3).unwrap();
    column.put_array(0, 0, 1).unwrap();
    expect_format(encode_batch(&batch, Compression::None));

    batch.set_num_rows(2).unwrap();
    let bytes = encode_batch(&batch, Compression::None).unwrap();
    let decoded = decode_batch(&bytes, &schema, &BufferAllocator::heap()).unwrap();
    let ints = |v: &[i32]| ScalarValue::Array(v.iter().map(|i| ScalarValue::Int32(*i)).collect());
    assert_eq!(
        decoded.to_rows().unwrap(),
        vec![Row::new(vec![ints(&[0])]), Row::new(vec![ints(&[2, 3, 4])])]
    );
}

#[test]
fn unknown_flags_are_rejected() {
    let schema = single("v", DataType::Int32);
    let mut bytes = payload(0, &[]);
    bytes[0] = 0x40;
    expect_format(decode_batch(&bytes, &schema, &BufferAllocator::heap()));
}
