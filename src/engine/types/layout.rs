use super::data_type::TypeTag;

/// How a logical type is laid out in vector buffers and on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhysicalLayout {
    /// `width` bytes per row in the value buffer.
    Fixed { width: usize },
    /// i32 offsets plus a byte buffer.
    VarBinary,
    /// i32 offsets into one child vector.
    List,
    /// One child vector per field, no value buffer.
    Struct,
}

impl PhysicalLayout {
    pub fn has_offsets(&self) -> bool {
        matches!(self, PhysicalLayout::VarBinary | PhysicalLayout::List)
    }
}

// The mapping below is the only place logical types meet their physical encoding.
// Both vectors and the codec read it; adding a type means extending these matches.
impl TypeTag {
    pub fn layout(self) -> PhysicalLayout {
        match self {
            TypeTag::Boolean | TypeTag::Int8 => PhysicalLayout::Fixed { width: 1 },
            TypeTag::Int16 => PhysicalLayout::Fixed { width: 2 },
            TypeTag::Int32 | TypeTag::Float32 | TypeTag::Date => {
                PhysicalLayout::Fixed { width: 4 }
            }
            TypeTag::Int64 | TypeTag::Float64 | TypeTag::Timestamp => {
                PhysicalLayout::Fixed { width: 8 }
            }
            TypeTag::Decimal => PhysicalLayout::Fixed { width: 16 },
            TypeTag::Utf8 | TypeTag::Binary => PhysicalLayout::VarBinary,
            TypeTag::Array => PhysicalLayout::List,
            TypeTag::Struct => PhysicalLayout::Struct,
        }
    }
}
