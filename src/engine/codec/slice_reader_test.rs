use super::slice_reader::{LeSliceReader, SIZE_U32};
use crate::engine::errors::ExchangeError;

#[test]
fn reads_integers_and_advances() {
    let mut buf = Vec::new();
    buf.push(0x7f);
    buf.extend_from_slice(&0x11223344u32.to_le_bytes());
    buf.extend_from_slice(&(-5i32).to_le_bytes());
    buf.extend_from_slice(&(-9_000_000_000i64).to_le_bytes());
    let mut r = LeSliceReader::new(&buf);

    assert_eq!(r.read_u8().unwrap(), 0x7f);
    assert_eq!(r.read_u32().unwrap(), 0x11223344);
    assert_eq!(r.read_i32().unwrap(), -5);
    assert_eq!(r.read_i64().unwrap(), -9_000_000_000);
    assert_eq!(r.remaining(), 0);
}

#[test]
fn rest_takes_everything_left() {
    let buf = [1u8, 2, 3, 4, 5];
    let mut r = LeSliceReader::new(&buf);
    r.read_u8().unwrap();

    assert_eq!(r.rest(), &[2, 3, 4, 5]);
    assert_eq!(r.remaining(), 0);
    assert!(r.rest().is_empty());
}

#[test]
fn short_input_is_a_format_error() {
    let buf = vec![0x01, 0x02, 0x03];
    let mut r = LeSliceReader::new(&buf);
    assert!(!r.has_bytes(SIZE_U32));
    assert!(matches!(r.read_u32().unwrap_err(), ExchangeError::Format(_)));
    assert_eq!(r.remaining(), 3);
    assert!(matches!(r.read_bytes(4).unwrap_err(), ExchangeError::Format(_)));
}
