use super::compression::{Compression, CompressionCodec, FLAG_LZ4, Lz4Codec};
use crate::engine::errors::ExchangeError;

#[test]
fn lz4_roundtrip_prepend_size() {
    let codec = Lz4Codec;
    let data = b"0123456789abcdef0123456789abcdef".to_vec();
    let comp = codec.compress(&data);
    let out = codec.decompress(&comp, data.len()).expect("decompress");
    assert_eq!(out, data);
}

#[test]
fn lz4_rejects_wrong_declared_length() {
    let comp = Lz4Codec.compress(b"hello world");
    let err = Lz4Codec.decompress(&comp, 3).unwrap_err();
    assert!(matches!(err, ExchangeError::Format(_)));
}

#[test]
fn corrupt_lz4_body_is_a_format_error() {
    let err = Compression::Lz4
        .decompress(&[10, 0, 0, 0, 0xff, 0xff], 10)
        .unwrap_err();
    assert!(matches!(err, ExchangeError::Format(_)));
}

#[test]
fn flags_map_to_modes() {
    assert_eq!(Compression::None.flags(), 0);
    assert_eq!(Compression::Lz4.flags(), FLAG_LZ4);
    assert_eq!(Compression::from_flags(0).unwrap(), Compression::None);
    assert_eq!(Compression::from_flags(FLAG_LZ4).unwrap(), Compression::Lz4);
    assert!(matches!(
        Compression::from_flags(0x80).unwrap_err(),
        ExchangeError::Format(_)
    ));
}

#[test]
fn parses_case_insensitively() {
    assert_eq!("LZ4".parse::<Compression>().unwrap(), Compression::Lz4);
    assert_eq!("none".parse::<Compression>().unwrap(), Compression::None);
    assert!("zstd".parse::<Compression>().is_err());
    assert_eq!(Compression::Lz4.to_string(), "lz4");
}

#[test]
fn uncompressed_body_length_is_checked() {
    let body = [1u8, 2, 3];
    assert_eq!(&*Compression::None.decompress(&body, 3).unwrap(), &body);
    assert!(Compression::None.decompress(&body, 4).is_err());
}
