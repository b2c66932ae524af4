use super::data_type::{DataType, Field, TypeTag};

/// A single dynamically typed value, used for internal rows and dynamic reads.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Null,
    Boolean(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Decimal(i128),
    Utf8(String),
    Binary(Vec<u8>),
    Date(i32),
    Timestamp(i64),
    Array(Vec<ScalarValue>),
    Struct(Vec<ScalarValue>),
}

impl ScalarValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ScalarValue::Null)
    }

    pub fn tag(&self) -> Option<TypeTag> {
        let tag = match self {
            ScalarValue::Null => return None,
            ScalarValue::Boolean(_) => TypeTag::Boolean,
            ScalarValue::Int8(_) => TypeTag::Int8,
            ScalarValue::Int16(_) => TypeTag::Int16,
            ScalarValue::Int32(_) => TypeTag::Int32,
            ScalarValue::Int64(_) => TypeTag::Int64,
            ScalarValue::Float32(_) => TypeTag::Float32,
            ScalarValue::Float64(_) => TypeTag::Float64,
            ScalarValue::Decimal(_) => TypeTag::Decimal,
            ScalarValue::Utf8(_) => TypeTag::Utf8,
            ScalarValue::Binary(_) => TypeTag::Binary,
            ScalarValue::Date(_) => TypeTag::Date,
            ScalarValue::Timestamp(_) => TypeTag::Timestamp,
            ScalarValue::Array(_) => TypeTag::Array,
            ScalarValue::Struct(_) => TypeTag::Struct,
        };
        Some(tag)
    }

    /// Whether this value can be stored in a column of `data_type`. A top-level
    /// null conforms to every type; nested nulls must land in nullable fields.
    pub fn conforms_to(&self, data_type: &DataType) -> bool {
        match (self, data_type) {
            (ScalarValue::Null, _) => true,
            (ScalarValue::Array(items), DataType::Array(element)) => {
                items.iter().all(|item| item.fits(element))
            }
            (ScalarValue::Struct(values), DataType::Struct(fields)) => {
                values.len() == fields.len()
                    && values.iter().zip(fields).all(|(value, field)| value.fits(field))
            }
            (value, data_type) => value.tag() == Some(data_type.tag()),
        }
    }

    /// Like [`ScalarValue::conforms_to`], but a null only fits a nullable field.
    pub fn fits(&self, field: &Field) -> bool {
        match self {
            ScalarValue::Null => field.nullable,
            value => value.conforms_to(&field.data_type),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScalarValue::Utf8(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ScalarValue::Int8(v) => Some(i64::from(*v)),
            ScalarValue::Int16(v) => Some(i64::from(*v)),
            ScalarValue::Int32(v) | ScalarValue::Date(v) => Some(i64::from(*v)),
            ScalarValue::Int64(v) | ScalarValue::Timestamp(v) => Some(*v),
            _ => None,
        }
    }
}

macro_rules! impl_scalar_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for ScalarValue {
                fn from(value: $ty) -> Self {
                    ScalarValue::$variant(value)
                }
            }
        )*
    };
}

impl_scalar_from!(
    bool => Boolean,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    f32 => Float32,
    f64 => Float64,
    i128 => Decimal,
    String => Utf8,
    Vec<u8> => Binary,
);

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        ScalarValue::Utf8(value.to_string())
    }
}

impl<T: Into<ScalarValue>> From<Option<T>> for ScalarValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(ScalarValue::Null)
    }
}

/// Internal row representation handed to and from the executor.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row(Vec<ScalarValue>);

impl Row {
    pub fn new(values: Vec<ScalarValue>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[ScalarValue] {
        &self.0
    }

    pub fn get(&self, idx: usize) -> Option<&ScalarValue> {
        self.0.get(idx)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_values(self) -> Vec<ScalarValue> {
        self.0
    }
}

impl From<Vec<ScalarValue>> for Row {
    fn from(values: Vec<ScalarValue>) -> Self {
        Row(values)
    }
}
