use crate::engine::types::{ScalarValue, TypeTag};

/// Fixed-width Rust types that can be read from and written to a vector's value buffer.
pub trait NativeType: Copy + Send + 'static {
    const WIDTH: usize;
    const NAME: &'static str;

    /// Whether values of this type are the physical representation of `tag`.
    fn accepts(tag: TypeTag) -> bool;

    fn write_le(self, out: &mut [u8]);

    fn read_le(bytes: &[u8]) -> Self;

    fn into_scalar(self, tag: TypeTag) -> ScalarValue;
}

impl NativeType for bool {
    const WIDTH: usize = 1;
    const NAME: &'static str = "bool";

    fn accepts(tag: TypeTag) -> bool {
        tag == TypeTag::Boolean
    }

    fn write_le(self, out: &mut [u8]) {
        out[0] = u8::from(self);
    }

    fn read_le(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }

    fn into_scalar(self, _tag: TypeTag) -> ScalarValue {
        ScalarValue::Boolean(self)
    }
}

macro_rules! impl_native {
    ($ty:ty, $width:expr, [$($tag:ident => $variant:ident),+]) => {
        impl NativeType for $ty {
            const WIDTH: usize = $width;
            const NAME: &'static str = stringify!($ty);

            fn accepts(tag: TypeTag) -> bool {
                matches!(tag, $(TypeTag::$tag)|+)
            }

            fn write_le(self, out: &mut [u8]) {
                out[..$width].copy_from_slice(&self.to_le_bytes());
            }

            fn read_le(bytes: &[u8]) -> Self {
                let mut buf = [0u8; $width];
                buf.copy_from_slice(&bytes[..$width]);
                <$ty>::from_le_bytes(buf)
            }

            fn into_scalar(self, tag: TypeTag) -> ScalarValue {
                match tag {
                    $(TypeTag::$tag => ScalarValue::$variant(self),)+
                    _ => unreachable!("{} does not back {}", Self::NAME, tag),
                }
            }
        }
    };
}

impl_native!(i8, 1, [Int8 => Int8]);
impl_native!(i16, 2, [Int16 => Int16]);
impl_native!(i32, 4, [Int32 => Int32, Date => Date]);
impl_native!(i64, 8, [Int64 => Int64, Timestamp => Timestamp]);
impl_native!(f32, 4, [Float32 => Float32]);
impl_native!(f64, 8, [Float64 => Float64]);
impl_native!(i128, 16, [Decimal => Decimal]);
