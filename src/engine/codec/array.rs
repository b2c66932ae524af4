//! Moves column vectors in and out of arrow `ArrayData`.

use arrow_buffer::{BooleanBuffer, Buffer, bit_util};
use arrow_data::ArrayData;

use crate::engine::core::column::{ColumnVector, ValidityBitmap};
use crate::engine::errors::{ExchangeError, Result};
use crate::engine::types::{DataType, Field, PhysicalLayout, TypeTag};

const OFFSET_WIDTH: usize = 4;
const EMPTY_OFFSETS: [u8; OFFSET_WIDTH] = [0; OFFSET_WIDTH];

/// Copies the first `rows` rows of `column` into arrow array data, children
/// included. Arrow validates the result, so a null in a non-nullable child
/// fails here.
pub(crate) fn to_array_data(column: &ColumnVector, rows: usize) -> Result<ArrayData> {
    if rows > column.len() {
        return Err(ExchangeError::format(format!(
            "cannot encode {rows} rows from a {} column of length {}",
            column.data_type(),
            column.len()
        )));
    }
    if !column.is_sealed() {
        return Err(ExchangeError::format(format!(
            "{} column has array rows that were never sealed",
            column.data_type()
        )));
    }

    let mut builder = ArrayData::builder(column.data_type().to_arrow_data_type()).len(rows);
    if column.has_nulls() {
        let bitmap_len = ValidityBitmap::size_for(rows);
        let mut bitmap = column.validity_bytes()[..bitmap_len].to_vec();
        ValidityBitmap::mask_tail(&mut bitmap, rows);
        builder = builder.null_bit_buffer(Some(Buffer::from_vec(bitmap)));
    }

    let layout = column.tag().layout();
    let mut end = 0;
    if layout.has_offsets() {
        let raw = &column.offset_bytes()[..(rows + 1) * OFFSET_WIDTH];
        end = read_offset(raw, rows);
        builder = builder.add_buffer(Buffer::from_slice_ref(raw));
    }

    builder = match layout {
        PhysicalLayout::Fixed { .. } if column.tag() == TypeTag::Boolean => {
            let values = column.value_bytes();
            let packed = BooleanBuffer::collect_bool(rows, |row| values[row] != 0);
            builder.add_buffer(packed.into_inner())
        }
        PhysicalLayout::Fixed { width } => {
            builder.add_buffer(Buffer::from_slice_ref(&column.value_bytes()[..rows * width]))
        }
        PhysicalLayout::VarBinary => {
            builder.add_buffer(Buffer::from_slice_ref(&column.value_bytes()[..end]))
        }
        PhysicalLayout::List => {
            let child = column
                .child(0)
                .ok_or_else(|| ExchangeError::format("array column without element vector"))?;
            builder.add_child_data(to_array_data(child, end)?)
        }
        PhysicalLayout::Struct => {
            for child in column.children() {
                builder = builder.add_child_data(to_array_data(child, rows)?);
            }
            builder
        }
    };
    Ok(builder.build()?)
}

/// Loads `rows` rows of decoded array data into `column`, which must be empty.
///
/// Offsets must start at 0 and never decrease, Utf8 values must be valid
/// UTF-8, and nulls may only appear in nullable fields (or, for struct
/// children, under a null parent row).
pub(crate) fn load_array_data(
    data: &ArrayData,
    column: &mut ColumnVector,
    rows: usize,
    field: &Field,
    parent_validity: Option<&[u8]>,
) -> Result<()> {
    let tag = field.data_type.tag();
    if data.offset() != 0 {
        return Err(ExchangeError::format(format!(
            "column '{}' arrives as a slice at offset {}",
            field.name,
            data.offset()
        )));
    }
    if data.len() < rows {
        return Err(ExchangeError::format(format!(
            "column '{}' holds {} rows, expected {rows}",
            field.name,
            data.len()
        )));
    }

    let mut validity = vec![0u8; ValidityBitmap::size_for(rows)];
    for row in 0..rows {
        if data.is_valid(row) {
            ValidityBitmap::set_valid(&mut validity, row);
            continue;
        }
        let parent_valid =
            parent_validity.is_none_or(|parent| ValidityBitmap::is_valid(parent, row));
        if !field.nullable && parent_valid {
            return Err(ExchangeError::format(format!(
                "null at row {row} of non-nullable field '{}'",
                field.name
            )));
        }
    }

    let layout = tag.layout();
    let (offsets, end) = if layout.has_offsets() {
        let raw = offsets_region(data, rows, field)?;
        (Some(raw), check_offsets(raw, tag)?)
    } else {
        (None, 0)
    };

    match (&field.data_type, layout) {
        (DataType::Boolean, _) => {
            let bits = buffer(data, 0, rows.div_ceil(8), field)?;
            let values = (0..rows)
                .map(|row| u8::from(bit_util::get_bit(bits, row)))
                .collect::<Vec<_>>();
            column.load(rows, &validity, None, &values)
        }
        (_, PhysicalLayout::Fixed { width }) => {
            let values = buffer(data, 0, rows * width, field)?;
            column.load(rows, &validity, None, values)
        }
        (_, PhysicalLayout::VarBinary) => {
            let values = buffer(data, 1, end, field)?;
            if tag == TypeTag::Utf8 {
                check_utf8(offsets.unwrap_or(&EMPTY_OFFSETS), values, rows)?;
            }
            column.load(rows, &validity, offsets, values)
        }
        (DataType::Array(element), _) => {
            column.load(rows, &validity, offsets, &[])?;
            let child_data = data.child_data().first().ok_or_else(|| {
                ExchangeError::format(format!("array column '{}' without elements", field.name))
            })?;
            let child = column
                .child_mut(0)
                .ok_or_else(|| ExchangeError::format("array column without element vector"))?;
            load_array_data(child_data, child, end, element, None)
        }
        (DataType::Struct(fields), _) => {
            if data.child_data().len() != fields.len() {
                return Err(ExchangeError::format(format!(
                    "struct column '{}' has {} children, expected {}",
                    field.name,
                    data.child_data().len(),
                    fields.len()
                )));
            }
            column.load(rows, &validity, None, &[])?;
            for (idx, (child_data, child_field)) in
                data.child_data().iter().zip(fields).enumerate()
            {
                let child = column
                    .child_mut(idx)
                    .ok_or_else(|| ExchangeError::format("struct column without field vector"))?;
                load_array_data(child_data, child, rows, child_field, Some(&validity))?;
            }
            Ok(())
        }
        (other, _) => Err(ExchangeError::type_mismatch("nested layout", other.tag())),
    }
}

/// The `(rows + 1)` offsets of `data`. Arrow may leave the buffer empty when
/// there are no rows.
fn offsets_region<'a>(data: &'a ArrayData, rows: usize, field: &Field) -> Result<&'a [u8]> {
    let needed = (rows + 1) * OFFSET_WIDTH;
    match data.buffers().first() {
        Some(raw) if raw.len() >= needed => Ok(&raw.as_slice()[..needed]),
        _ if rows == 0 => Ok(&EMPTY_OFFSETS),
        _ => Err(ExchangeError::format(format!(
            "offsets of '{}' are shorter than {needed} bytes",
            field.name
        ))),
    }
}

fn buffer<'a>(data: &'a ArrayData, idx: usize, needed: usize, field: &Field) -> Result<&'a [u8]> {
    match data.buffers().get(idx) {
        Some(raw) if raw.len() >= needed => Ok(&raw.as_slice()[..needed]),
        None if needed == 0 => Ok(&[]),
        _ => Err(ExchangeError::format(format!(
            "buffer {idx} of '{}' is shorter than {needed} bytes",
            field.name
        ))),
    }
}

fn read_offset(raw: &[u8], idx: usize) -> usize {
    let mut bytes = [0u8; OFFSET_WIDTH];
    bytes.copy_from_slice(&raw[idx * OFFSET_WIDTH..(idx + 1) * OFFSET_WIDTH]);
    i32::from_le_bytes(bytes).max(0) as usize
}

/// Checks that offsets start at 0 and never decrease; returns the last one.
fn check_offsets(raw: &[u8], tag: TypeTag) -> Result<usize> {
    let mut prev = 0i32;
    for (idx, chunk) in raw.chunks_exact(OFFSET_WIDTH).enumerate() {
        let mut bytes = [0u8; OFFSET_WIDTH];
        bytes.copy_from_slice(chunk);
        let offset = i32::from_le_bytes(bytes);
        if idx == 0 && offset != 0 {
            return Err(ExchangeError::format(format!(
                "{tag} offsets start at {offset}, expected 0"
            )));
        }
        if offset < prev {
            return Err(ExchangeError::format(format!(
                "{tag} offsets decrease at entry {idx}: {prev} > {offset}"
            )));
        }
        prev = offset;
    }
    Ok(prev as usize)
}

fn check_utf8(offsets: &[u8], values: &[u8], rows: usize) -> Result<()> {
    for row in 0..rows {
        let (start, end) = (read_offset(offsets, row), read_offset(offsets, row + 1));
        std::str::from_utf8(&values[start..end])
            .map_err(|e| ExchangeError::format(format!("invalid UTF-8 in row {row}: {e}")))?;
    }
    Ok(())
}
