use tracing::trace;

use super::bitmap::ValidityBitmap;
use super::native::NativeType;
use super::views::{ArrayView, StructView};
use crate::engine::core::memory::{Buffer, BufferAllocator};
use crate::engine::errors::{ExchangeError, Result};
use crate::engine::types::{DataType, PhysicalLayout, ScalarValue, TypeTag};

const MIN_GROWTH_CAPACITY: usize = 4;
const OFFSET_WIDTH: usize = 4;
/// Initial bytes reserved per row for variable-length values.
const DEFAULT_VAR_WIDTH: usize = 8;

/// A typed, nullable, growable column.
///
/// Fixed-width types keep `capacity * width` bytes of values. Utf8/Binary keep
/// `capacity + 1` i32 offsets into a separately grown byte buffer. Arrays keep
/// offsets into a single child vector; structs keep one child per field with the
/// same length as the parent. Array rows written out of order through
/// [`ColumnVector::put_array`] are kept as per-row `(start, length)` slots until
/// [`ColumnVector::set_len`] seals them into offsets. Every buffer comes from the vector's
/// [`BufferAllocator`] and is released exactly once by [`ColumnVector::close`]
/// (or on drop).
#[derive(Debug)]
pub struct ColumnVector {
    data_type: DataType,
    layout: PhysicalLayout,
    allocator: BufferAllocator,
    capacity: usize,
    len: usize,
    null_count: usize,
    validity: Buffer,
    values: Buffer,
    offsets: Option<Buffer>,
    children: Vec<ColumnVector>,
    array_slots: Option<Vec<(usize, usize)>>,
    closed: bool,
}

impl ColumnVector {
    pub fn new(data_type: DataType, capacity: usize, allocator: &BufferAllocator) -> Result<Self> {
        let layout = data_type.tag().layout();

        let validity = allocator.allocate(ValidityBitmap::size_for(capacity))?;
        let values = match layout {
            PhysicalLayout::Fixed { width } => allocator.allocate(bytes_for(capacity, width)?)?,
            PhysicalLayout::VarBinary => {
                allocator.allocate(bytes_for(capacity, DEFAULT_VAR_WIDTH)?)?
            }
            PhysicalLayout::List | PhysicalLayout::Struct => allocator.allocate(0)?,
        };
        let offsets = if layout.has_offsets() {
            Some(allocator.allocate(bytes_for(capacity + 1, OFFSET_WIDTH)?)?)
        } else {
            None
        };
        let children = match &data_type {
            DataType::Array(element) => vec![ColumnVector::new(
                element.data_type.clone(),
                capacity,
                allocator,
            )?],
            DataType::Struct(fields) => fields
                .iter()
                .map(|field| ColumnVector::new(field.data_type.clone(), capacity, allocator))
                .collect::<Result<Vec<_>>>()?,
            _ => Vec::new(),
        };

        Ok(Self {
            data_type,
            layout,
            allocator: allocator.clone(),
            capacity,
            len: 0,
            null_count: 0,
            validity,
            values,
            offsets,
            children,
            array_slots: None,
            closed: false,
        })
    }

    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    pub fn tag(&self) -> TypeTag {
        self.data_type.tag()
    }

    pub fn allocator(&self) -> &BufferAllocator {
        &self.allocator
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn null_count(&self) -> usize {
        self.null_count
    }

    pub fn has_nulls(&self) -> bool {
        self.null_count > 0
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn children(&self) -> &[ColumnVector] {
        &self.children
    }

    pub fn child(&self, idx: usize) -> Option<&ColumnVector> {
        self.children.get(idx)
    }

    pub fn child_mut(&mut self, idx: usize) -> Option<&mut ColumnVector> {
        self.children.get_mut(idx)
    }

    /// Grows to hold at least `new_capacity` rows, preserving every written byte.
    ///
    /// Buffers are grown one at a time and `capacity` is only bumped at the end,
    /// so a failure part way leaves the vector logically as it was.
    pub fn reserve(&mut self, new_capacity: usize) -> Result<()> {
        if self.closed {
            return Err(ExchangeError::Capacity("vector is closed".into()));
        }
        if new_capacity <= self.capacity {
            return Ok(());
        }

        self.validity.grow(ValidityBitmap::size_for(new_capacity))?;
        match self.layout {
            PhysicalLayout::Fixed { width } => {
                self.values.grow(bytes_for(new_capacity, width)?)?;
            }
            PhysicalLayout::VarBinary | PhysicalLayout::List => {
                if let Some(offsets) = self.offsets.as_mut() {
                    offsets.grow(bytes_for(new_capacity + 1, OFFSET_WIDTH)?)?;
                }
            }
            PhysicalLayout::Struct => {
                for child in &mut self.children {
                    child.reserve(new_capacity)?;
                }
            }
        }

        trace!(
            target: "batch_exchange::vector",
            data_type = %self.data_type,
            from = self.capacity,
            to = new_capacity,
            "Vector grown"
        );
        self.capacity = new_capacity;
        Ok(())
    }

    /// Releases all buffers, children included. Later calls are no-ops.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.validity.release();
        self.values.release();
        if let Some(offsets) = self.offsets.as_mut() {
            offsets.release();
        }
        for child in &mut self.children {
            child.close();
        }
        self.array_slots = None;
        self.len = 0;
        self.capacity = 0;
        self.null_count = 0;
        self.closed = true;
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    pub fn append<T: NativeType>(&mut self, value: T) -> Result<()> {
        self.check_native::<T>()?;
        let row = self.len;
        self.ensure_row(row)?;
        value.write_le(&mut self.values.as_mut_slice()[row * T::WIDTH..]);
        self.mark(row, true);
        Ok(())
    }

    /// Writes a fixed-width value at `row`, growing if the row is past capacity.
    pub fn put<T: NativeType>(&mut self, row: usize, value: T) -> Result<()> {
        self.check_native::<T>()?;
        self.ensure_row(row)?;
        value.write_le(&mut self.values.as_mut_slice()[row * T::WIDTH..]);
        self.mark(row, true);
        Ok(())
    }

    pub fn append_null(&mut self) -> Result<()> {
        let row = self.len;
        self.ensure_row(row)?;
        if self.array_slots.is_some() {
            self.record_slot(row, (0, 0));
        } else if self.layout.has_offsets() {
            let end = self.read_offset(row);
            self.write_offset(row + 1, end)?;
        }
        for child in self.struct_children_mut() {
            child.append_null()?;
        }
        self.mark(row, false);
        Ok(())
    }

    /// Marks `row` null. For offset types the row becomes empty at its start offset.
    pub fn put_null(&mut self, row: usize) -> Result<()> {
        self.ensure_row(row)?;
        if self.array_slots.is_some() {
            self.record_slot(row, (0, 0));
        } else if self.layout.has_offsets() {
            let start = self.read_offset(row);
            self.write_offset(row + 1, start)?;
        }
        for child in self.struct_children_mut() {
            child.put_null(row)?;
        }
        self.mark(row, false);
        Ok(())
    }

    pub fn append_str(&mut self, value: &str) -> Result<()> {
        if self.tag() != TypeTag::Utf8 {
            return Err(ExchangeError::type_mismatch("str", self.tag()));
        }
        self.append_var(value.as_bytes())
    }

    pub fn append_bytes(&mut self, value: &[u8]) -> Result<()> {
        if self.layout != PhysicalLayout::VarBinary {
            return Err(ExchangeError::type_mismatch("bytes", self.tag()));
        }
        if self.tag() == TypeTag::Utf8 {
            std::str::from_utf8(value)
                .map_err(|e| ExchangeError::format(format!("invalid UTF-8 for Utf8 column: {e}")))?;
        }
        self.append_var(value)
    }

    /// Appends one array row whose elements are written to the child vector.
    pub fn append_array(&mut self, items: &[ScalarValue]) -> Result<()> {
        let DataType::Array(element) = &self.data_type else {
            return Err(ExchangeError::type_mismatch("array", self.tag()));
        };
        if let Some(bad) = items.iter().find(|v| !v.fits(element)) {
            return Err(ExchangeError::TypeMismatch {
                expected: element.data_type.to_string(),
                actual: format!("{bad:?}"),
            });
        }

        let row = self.len;
        self.ensure_row(row)?;
        if self.array_slots.is_some() {
            let child = &mut self.children[0];
            let start = child.len();
            for item in items {
                child.append_scalar(item)?;
            }
            self.record_slot(row, (start, items.len()));
            self.mark(row, true);
            return Ok(());
        }

        let start = self.read_offset(row);
        let child = &mut self.children[0];
        if child.len() != start {
            return Err(ExchangeError::format(format!(
                "array append at row {row} expects child length {start}, found {}",
                child.len()
            )));
        }
        for item in items {
            child.append_scalar(item)?;
        }
        let end = child.len();
        self.write_offset(row + 1, end)?;
        self.mark(row, true);
        Ok(())
    }

    /// Records that `row` holds `child_length` elements starting at `child_offset`
    /// in the child vector. Rows may be written in any order and may leave gaps
    /// or share elements; [`ColumnVector::set_len`] turns the recorded slots into
    /// monotonic offsets, copying elements into a fresh child when the slots are
    /// not already laid out back to back.
    pub fn put_array(
        &mut self,
        row: usize,
        child_offset: usize,
        child_length: usize,
    ) -> Result<()> {
        if self.layout != PhysicalLayout::List {
            return Err(ExchangeError::type_mismatch("array", self.tag()));
        }
        child_offset
            .checked_add(child_length)
            .ok_or_else(|| ExchangeError::Capacity("array offset overflow".into()))?;
        self.ensure_row(row)?;
        self.unseal();
        self.record_slot(row, (child_offset, child_length));
        self.mark(row, true);
        Ok(())
    }

    pub fn append_struct(&mut self, values: &[ScalarValue]) -> Result<()> {
        if !ScalarValue::Struct(values.to_vec()).conforms_to(&self.data_type) {
            return Err(ExchangeError::TypeMismatch {
                expected: self.data_type.to_string(),
                actual: format!("{values:?}"),
            });
        }
        let row = self.len;
        self.ensure_row(row)?;
        for (child, value) in self.children.iter_mut().zip(values) {
            child.append_scalar(value)?;
        }
        self.mark(row, true);
        Ok(())
    }

    /// Appends a dynamically typed value, recursing into arrays and structs.
    pub fn append_scalar(&mut self, value: &ScalarValue) -> Result<()> {
        match (value, &self.data_type) {
            (ScalarValue::Null, _) => self.append_null(),
            (ScalarValue::Boolean(v), DataType::Boolean) => self.append(*v),
            (ScalarValue::Int8(v), DataType::Int8) => self.append(*v),
            (ScalarValue::Int16(v), DataType::Int16) => self.append(*v),
            (ScalarValue::Int32(v), DataType::Int32) | (ScalarValue::Date(v), DataType::Date) => {
                self.append(*v)
            }
            (ScalarValue::Int64(v), DataType::Int64)
            | (ScalarValue::Timestamp(v), DataType::Timestamp) => self.append(*v),
            (ScalarValue::Float32(v), DataType::Float32) => self.append(*v),
            (ScalarValue::Float64(v), DataType::Float64) => self.append(*v),
            (ScalarValue::Decimal(v), DataType::Decimal { .. }) => self.append(*v),
            (ScalarValue::Utf8(s), DataType::Utf8) => self.append_var(s.as_bytes()),
            (ScalarValue::Binary(b), DataType::Binary) => self.append_var(b),
            (ScalarValue::Array(items), DataType::Array(_)) => self.append_array(items),
            (ScalarValue::Struct(values), DataType::Struct(_)) => self.append_struct(values),
            (other, data_type) => Err(ExchangeError::TypeMismatch {
                expected: data_type.to_string(),
                actual: other
                    .tag()
                    .map(|tag| tag.to_string())
                    .unwrap_or_else(|| "Null".into()),
            }),
        }
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub fn is_null(&self, idx: usize) -> Result<bool> {
        self.check_index(idx)?;
        Ok(self.null_count > 0 && !ValidityBitmap::is_valid(self.validity.as_slice(), idx))
    }

    /// Typed read. `Ok(None)` is the null sentinel.
    pub fn get<T: NativeType>(&self, idx: usize) -> Result<Option<T>> {
        self.check_native::<T>()?;
        if self.is_null(idx)? {
            return Ok(None);
        }
        Ok(Some(T::read_le(&self.values.as_slice()[idx * T::WIDTH..])))
    }

    pub fn get_bytes(&self, idx: usize) -> Result<Option<&[u8]>> {
        if self.layout != PhysicalLayout::VarBinary {
            return Err(ExchangeError::type_mismatch("bytes", self.tag()));
        }
        if self.is_null(idx)? {
            return Ok(None);
        }
        let (start, end) = self.row_range(idx, self.values.len())?;
        Ok(Some(&self.values.as_slice()[start..end]))
    }

    pub fn get_str(&self, idx: usize) -> Result<Option<&str>> {
        if self.tag() != TypeTag::Utf8 {
            return Err(ExchangeError::type_mismatch("str", self.tag()));
        }
        match self.get_bytes(idx)? {
            Some(bytes) => std::str::from_utf8(bytes)
                .map(Some)
                .map_err(|e| ExchangeError::format(format!("invalid UTF-8 at row {idx}: {e}"))),
            None => Ok(None),
        }
    }

    pub fn get_array(&self, idx: usize) -> Result<Option<ArrayView<'_>>> {
        if self.layout != PhysicalLayout::List {
            return Err(ExchangeError::type_mismatch("array", self.tag()));
        }
        if self.is_null(idx)? {
            return Ok(None);
        }
        let child_len = self.children[0].len();
        let (start, end) = match &self.array_slots {
            Some(slots) => {
                let (start, length) = slots.get(idx).copied().unwrap_or((0, 0));
                if start + length > child_len {
                    return Err(ExchangeError::format(format!(
                        "row {idx} spans {start}..{} past {child_len} elements",
                        start + length
                    )));
                }
                (start, start + length)
            }
            None => self.row_range(idx, child_len)?,
        };
        Ok(Some(ArrayView::new(&self.children[0], start, end - start)))
    }

    pub fn get_struct(&self, idx: usize) -> Result<Option<StructView<'_>>> {
        if self.layout != PhysicalLayout::Struct {
            return Err(ExchangeError::type_mismatch("struct", self.tag()));
        }
        if self.is_null(idx)? {
            return Ok(None);
        }
        Ok(Some(StructView::new(self, idx)))
    }

    /// Dynamic read of any type; nulls come back as [`ScalarValue::Null`].
    pub fn get_scalar(&self, idx: usize) -> Result<ScalarValue> {
        if self.is_null(idx)? {
            return Ok(ScalarValue::Null);
        }
        let tag = self.tag();
        let value = match tag {
            TypeTag::Boolean => self.native_scalar::<bool>(idx, tag),
            TypeTag::Int8 => self.native_scalar::<i8>(idx, tag),
            TypeTag::Int16 => self.native_scalar::<i16>(idx, tag),
            TypeTag::Int32 | TypeTag::Date => self.native_scalar::<i32>(idx, tag),
            TypeTag::Int64 | TypeTag::Timestamp => self.native_scalar::<i64>(idx, tag),
            TypeTag::Float32 => self.native_scalar::<f32>(idx, tag),
            TypeTag::Float64 => self.native_scalar::<f64>(idx, tag),
            TypeTag::Decimal => self.native_scalar::<i128>(idx, tag),
            TypeTag::Utf8 => {
                ScalarValue::Utf8(self.get_str(idx)?.unwrap_or_default().to_string())
            }
            TypeTag::Binary => {
                ScalarValue::Binary(self.get_bytes(idx)?.unwrap_or_default().to_vec())
            }
            TypeTag::Array => match self.get_array(idx)? {
                Some(view) => ScalarValue::Array(view.to_scalars()?),
                None => ScalarValue::Null,
            },
            TypeTag::Struct => match self.get_struct(idx)? {
                Some(view) => ScalarValue::Struct(view.to_scalars()?),
                None => ScalarValue::Null,
            },
        };
        Ok(value)
    }

    /// Offsets of every row, `len + 1` entries. Empty for types without offsets.
    /// Unsealed array rows report the offsets sealing will produce.
    pub fn offsets(&self) -> Vec<usize> {
        if !self.layout.has_offsets() || self.closed {
            return Vec::new();
        }
        if let Some(slots) = &self.array_slots {
            let mut offsets = Vec::with_capacity(self.len + 1);
            let mut end = 0;
            offsets.push(end);
            for row in 0..self.len {
                end += slots.get(row).map_or(0, |slot| slot.1);
                offsets.push(end);
            }
            return offsets;
        }
        (0..=self.len).map(|i| self.read_offset(i)).collect()
    }

    /// False while array rows written by [`ColumnVector::put_array`] still wait
    /// for [`ColumnVector::set_len`], here or in any child.
    pub fn is_sealed(&self) -> bool {
        self.array_slots.is_none() && self.children.iter().all(ColumnVector::is_sealed)
    }

    /// Checks the offsets invariant recursively: starts at 0, never decreases,
    /// and stays within the value bytes or child length.
    pub fn validate(&self) -> Result<()> {
        if let Some(slots) = &self.array_slots {
            let child_len = self.children[0].len();
            for (row, &(start, length)) in slots.iter().enumerate() {
                if start + length > child_len {
                    return Err(ExchangeError::format(format!(
                        "array row {row} spans {start}..{} past {child_len} elements",
                        start + length
                    )));
                }
            }
        } else if self.layout.has_offsets() && !self.closed {
            let first = self.read_offset(0);
            if first != 0 {
                return Err(ExchangeError::format(format!(
                    "offsets must start at 0, found {first}"
                )));
            }
            let mut prev = 0;
            for row in 1..=self.len {
                let current = self.read_offset(row);
                if current < prev {
                    return Err(ExchangeError::format(format!(
                        "offsets decrease at row {}: {prev} > {current}",
                        row - 1
                    )));
                }
                prev = current;
            }
            let limit = match self.layout {
                PhysicalLayout::List => self.children[0].len(),
                _ => self.values.len(),
            };
            if prev > limit {
                return Err(ExchangeError::format(format!(
                    "last offset {prev} exceeds available {limit}"
                )));
            }
        }
        for child in &self.children {
            child.validate()?;
        }
        Ok(())
    }

    /// Sets the logical length and seals out-of-order array rows into offsets.
    /// Rows past the old length become nulls; rows past the new length are
    /// dropped. Offsets are validated afterwards.
    pub fn set_len(&mut self, len: usize) -> Result<()> {
        if len > self.capacity {
            return Err(ExchangeError::Capacity(format!(
                "row count {len} exceeds vector capacity {}",
                self.capacity
            )));
        }
        if let Some(slots) = self.array_slots.as_mut() {
            slots.resize(len, (0, 0));
        }
        if len > self.len {
            if self.layout.has_offsets() && self.array_slots.is_none() {
                for row in self.len..len {
                    let end = self.read_offset(row);
                    self.write_offset(row + 1, end)?;
                }
            }
            self.null_count += len - self.len;
        } else if len < self.len {
            ValidityBitmap::mask_tail(self.validity.as_mut_slice(), len);
            self.null_count = ValidityBitmap::count_nulls(self.validity.as_slice(), len);
        }
        self.len = len;
        self.seal_arrays()?;
        for child in self.struct_children_mut() {
            child.set_len(len)?;
        }
        self.validate()
    }

    /// Folds recorded array slots into offsets. Slots laid out back to back from
    /// element 0 keep the child as is; anything else is copied into a new child
    /// in row order.
    fn seal_arrays(&mut self) -> Result<()> {
        let Some(slots) = self.array_slots.take() else {
            return Ok(());
        };
        let child_len = self.children[0].len();
        let mut total = 0usize;
        let mut in_place = true;
        for (row, &(start, length)) in slots.iter().enumerate() {
            if start + length > child_len {
                self.array_slots = Some(slots);
                return Err(ExchangeError::format(format!(
                    "array row {row} spans {start}..{} past {child_len} elements",
                    start + length
                )));
            }
            in_place &= length == 0 || start == total;
            total += length;
        }

        if !in_place {
            let DataType::Array(element) = &self.data_type else {
                return Err(ExchangeError::type_mismatch("array", self.tag()));
            };
            let mut packed = ColumnVector::new(element.data_type.clone(), total, &self.allocator)?;
            for &(start, length) in &slots {
                for idx in start..start + length {
                    packed.append_scalar(&self.children[0].get_scalar(idx)?)?;
                }
            }
            self.children[0] = packed;
        }

        let mut end = 0;
        self.write_offset(0, end)?;
        for (row, &(_, length)) in slots.iter().enumerate() {
            end += length;
            self.write_offset(row + 1, end)?;
        }
        trace!(
            target: "batch_exchange::vector",
            rows = slots.len(),
            elements = total,
            in_place,
            "Array rows sealed"
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Raw buffer access for the codec
    // ------------------------------------------------------------------

    pub(crate) fn validity_bytes(&self) -> &[u8] {
        self.validity.as_slice()
    }

    pub(crate) fn value_bytes(&self) -> &[u8] {
        self.values.as_slice()
    }

    pub(crate) fn offset_bytes(&self) -> &[u8] {
        self.offsets.as_ref().map(|b| b.as_slice()).unwrap_or(&[])
    }

    pub(crate) fn children_mut(&mut self) -> &mut [ColumnVector] {
        &mut self.children
    }

    /// Loads `rows` rows worth of buffers copied off the wire. Children are loaded
    /// separately by the caller.
    pub(crate) fn load(
        &mut self,
        rows: usize,
        validity: &[u8],
        offsets: Option<&[u8]>,
        values: &[u8],
    ) -> Result<()> {
        self.reserve(rows)?;

        let bitmap_len = ValidityBitmap::size_for(rows);
        let bitmap = self.validity.as_mut_slice();
        bitmap[..bitmap_len].copy_from_slice(&validity[..bitmap_len]);
        ValidityBitmap::mask_tail(bitmap, rows);
        self.null_count = ValidityBitmap::count_nulls(bitmap, rows);

        if let (Some(src), Some(dst)) = (offsets, self.offsets.as_mut()) {
            let n = bytes_for(rows + 1, OFFSET_WIDTH)?;
            dst.as_mut_slice()[..n].copy_from_slice(&src[..n]);
        }
        match self.layout {
            PhysicalLayout::Fixed { .. } => {
                self.values.as_mut_slice()[..values.len()].copy_from_slice(values);
            }
            PhysicalLayout::VarBinary => {
                self.values.grow(values.len())?;
                self.values.as_mut_slice()[..values.len()].copy_from_slice(values);
            }
            PhysicalLayout::List | PhysicalLayout::Struct => {}
        }
        self.array_slots = None;
        self.len = rows;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn append_var(&mut self, bytes: &[u8]) -> Result<()> {
        let row = self.len;
        self.ensure_row(row)?;
        let start = self.read_offset(row);
        let end = start + bytes.len();
        if end > self.values.len() {
            let target = end.max(self.values.len().saturating_mul(2));
            self.values.grow(target)?;
        }
        self.values.as_mut_slice()[start..end].copy_from_slice(bytes);
        self.write_offset(row + 1, end)?;
        self.mark(row, true);
        Ok(())
    }

    /// Switches array rows to per-row slots, carrying over rows already sealed.
    fn unseal(&mut self) {
        if self.array_slots.is_some() {
            return;
        }
        let slots = (0..self.len)
            .map(|row| {
                let start = self.read_offset(row);
                (start, self.read_offset(row + 1).saturating_sub(start))
            })
            .collect();
        self.array_slots = Some(slots);
    }

    fn record_slot(&mut self, row: usize, slot: (usize, usize)) {
        if let Some(slots) = self.array_slots.as_mut() {
            if row >= slots.len() {
                slots.resize(row + 1, (0, 0));
            }
            slots[row] = slot;
        }
    }

    /// Row-index-driven growth: doubles, or jumps straight to `row + 1`.
    fn ensure_row(&mut self, row: usize) -> Result<()> {
        if row < self.capacity {
            return Ok(());
        }
        let target = (self.capacity.saturating_mul(2))
            .max(row + 1)
            .max(MIN_GROWTH_CAPACITY);
        self.reserve(target)
    }

    fn mark(&mut self, row: usize, valid: bool) {
        let bitmap = self.validity.as_mut_slice();
        if row >= self.len {
            // Rows skipped over stay null until written.
            self.null_count += row - self.len;
            self.len = row + 1;
            if valid {
                ValidityBitmap::set_valid(bitmap, row);
            } else {
                ValidityBitmap::set_null(bitmap, row);
                self.null_count += 1;
            }
            return;
        }
        match (ValidityBitmap::is_valid(bitmap, row), valid) {
            (true, false) => {
                ValidityBitmap::set_null(bitmap, row);
                self.null_count += 1;
            }
            (false, true) => {
                ValidityBitmap::set_valid(bitmap, row);
                self.null_count -= 1;
            }
            _ => {}
        }
    }

    fn read_offset(&self, idx: usize) -> usize {
        let bytes = self.offset_bytes();
        let at = idx * OFFSET_WIDTH;
        i32::read_le(&bytes[at..at + OFFSET_WIDTH]).max(0) as usize
    }

    fn write_offset(&mut self, idx: usize, value: usize) -> Result<()> {
        let value = i32::try_from(value)
            .map_err(|_| ExchangeError::Capacity(format!("offset {value} exceeds i32 range")))?;
        if let Some(offsets) = self.offsets.as_mut() {
            value.write_le(&mut offsets.as_mut_slice()[idx * OFFSET_WIDTH..]);
        }
        Ok(())
    }

    fn row_range(&self, idx: usize, limit: usize) -> Result<(usize, usize)> {
        let start = self.read_offset(idx);
        let end = self.read_offset(idx + 1);
        if start > end || end > limit {
            return Err(ExchangeError::format(format!(
                "row {idx} has invalid offsets {start}..{end} (limit {limit})"
            )));
        }
        Ok((start, end))
    }

    fn check_native<T: NativeType>(&self) -> Result<()> {
        if T::accepts(self.tag()) {
            Ok(())
        } else {
            Err(ExchangeError::type_mismatch(T::NAME, self.tag()))
        }
    }

    fn check_index(&self, idx: usize) -> Result<()> {
        if idx >= self.len {
            return Err(ExchangeError::OutOfBounds {
                index: idx,
                len: self.len,
            });
        }
        Ok(())
    }

    fn native_scalar<T: NativeType>(&self, idx: usize, tag: TypeTag) -> ScalarValue {
        T::read_le(&self.values.as_slice()[idx * T::WIDTH..]).into_scalar(tag)
    }

    fn struct_children_mut(&mut self) -> impl Iterator<Item = &mut ColumnVector> {
        let is_struct = self.layout == PhysicalLayout::Struct;
        self.children.iter_mut().filter(move |_| is_struct)
    }
}

impl Drop for ColumnVector {
    fn drop(&mut self) {
        self.close();
    }
}

fn bytes_for(rows: usize, width: usize) -> Result<usize> {
    rows.checked_mul(width)
        .ok_or_else(|| ExchangeError::Capacity(format!("{rows} rows of width {width} overflow")))
}
