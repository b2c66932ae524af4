/// Validity bitmap helpers. A set bit marks a non-null row.
pub struct ValidityBitmap;

impl ValidityBitmap {
    pub fn set_valid(bitmap: &mut [u8], index: usize) {
        bitmap[index / 8] |= 1 << (index % 8);
    }

    pub fn set_null(bitmap: &mut [u8], index: usize) {
        bitmap[index / 8] &= !(1 << (index % 8));
    }

    pub fn is_valid(bitmap: &[u8], index: usize) -> bool {
        (bitmap[index / 8] & (1 << (index % 8))) != 0
    }

    pub fn size_for(bits: usize) -> usize {
        bits.div_ceil(8)
    }

    pub fn count_nulls(bitmap: &[u8], len: usize) -> usize {
        (0..len).filter(|&idx| !Self::is_valid(bitmap, idx)).count()
    }

    /// Clears every bit at or after `len` so trailing bytes carry no stale rows.
    pub fn mask_tail(bitmap: &mut [u8], len: usize) {
        let full_bytes = len / 8;
        let rem = len % 8;
        if rem != 0 {
            bitmap[full_bytes] &= (1u8 << rem) - 1;
        }
        let first_clear = ValidityBitmap::size_for(len);
        for byte in bitmap.iter_mut().skip(first_clear) {
            *byte = 0;
        }
    }
}
