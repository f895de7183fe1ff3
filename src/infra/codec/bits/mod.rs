//! Endianness-free bit fields over plain byte buffers.
//!
//! Values are always packed big-endian: bit 0 is the most significant bit of
//! byte 0, and a field spanning several bytes is read MSB first across the byte
//! boundaries. The result is the same on every host, which is what lets the
//! device and the host agree on packed layouts without a schema.
//!
//! Fields may overlap. Writing one field only touches its own bits, so bits
//! shared with another field take the value of the last write.
use crate::error::{BitFieldError, BitReaderError, BitWriterError};

//==================================================================================BITFIELD
/// Descriptor of a `bit_width`-bit unsigned field starting at `first_bit`.
///
/// The descriptor holds no data; every access takes the backing buffer
/// explicitly, which is how several (possibly overlapping) fields share one
/// payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BitField {
    first_bit: u32,
    bit_width: u32,
}

impl BitField {
    /// Build a descriptor for a static layout.
    ///
    /// Meant for `const` items, where an invalid width is rejected at compile
    /// time. Use [`BitField::try_new`] for widths coming from runtime data.
    pub const fn new(first_bit: u32, bit_width: u32) -> Self {
        assert!(
            bit_width >= 1 && bit_width <= 64,
            "bit width must be in 1..=64"
        );
        assert!(
            first_bit.checked_add(bit_width).is_some(),
            "field must end within u32::MAX bits"
        );
        Self {
            first_bit,
            bit_width,
        }
    }

    /// Fallible constructor for descriptors built from runtime values.
    pub const fn try_new(first_bit: u32, bit_width: u32) -> Result<Self, BitFieldError> {
        if bit_width == 0 || bit_width > 64 {
            return Err(BitFieldError::InvalidWidth { asked: bit_width });
        }
        if first_bit.checked_add(bit_width).is_none() {
            return Err(BitFieldError::PositionOverflow {
                first_bit,
                bit_width,
            });
        }
        Ok(Self {
            first_bit,
            bit_width,
        })
    }

    pub const fn first_bit(&self) -> u32 {
        self.first_bit
    }

    pub const fn bit_width(&self) -> u32 {
        self.bit_width
    }

    /// Index of the last bit covered by the field.
    pub const fn last_bit(&self) -> u32 {
        self.first_bit + self.bit_width - 1
    }

    /// Mask keeping the low `bit_width` bits of a value.
    pub const fn value_mask(&self) -> u64 {
        if self.bit_width == 64 {
            u64::MAX
        } else {
            (1u64 << self.bit_width) - 1
        }
    }

    /// Whether the field lies inside a buffer of `len` bytes.
    pub const fn fits(&self, len: usize) -> bool {
        self.end_bit() <= (len as u64).saturating_mul(8)
    }

    /// One past the last bit. Constructors keep it within `u32`.
    const fn end_bit(&self) -> u64 {
        self.first_bit as u64 + self.bit_width as u64
    }

    fn check(&self, len: usize) -> Result<(), BitFieldError> {
        if self.fits(len) {
            Ok(())
        } else {
            Err(BitFieldError::OutOfBounds {
                end_bit: self.end_bit() as usize,
                available: len.saturating_mul(8),
            })
        }
    }

    /// Read the field from `buffer`.
    pub fn read(&self, buffer: &[u8]) -> Result<u64, BitFieldError> {
        self.check(buffer.len())?;
        Ok(self.extract(buffer))
    }

    /// Store the low `bit_width` bits of `value`, leaving every other bit of
    /// `buffer` untouched.
    pub fn write(&self, buffer: &mut [u8], value: u64) -> Result<(), BitFieldError> {
        self.check(buffer.len())?;
        self.insert(buffer, value);
        Ok(())
    }

    /// Validate the descriptor against `buffer` once and return a view whose
    /// accessors cannot fail.
    pub fn bind<'a>(&self, buffer: &'a mut [u8]) -> Result<FieldMut<'a>, BitFieldError> {
        self.check(buffer.len())?;
        Ok(FieldMut {
            field: *self,
            buffer,
        })
    }

    fn extract(&self, buffer: &[u8]) -> u64 {
        let end = self.end_bit() as usize;
        let mut bit = self.first_bit as usize;
        let mut result: u64 = 0;

        while bit < end {
            let offset = bit % 8;
            // Bits available in this byte, capped by what is left of the field.
            let take = (8 - offset).min(end - bit);
            let shift = 8 - offset - take;
            let mask = ((1u16 << take) - 1) as u8;
            let chunk = (buffer[bit / 8] >> shift) & mask;

            result = (result << take) | chunk as u64;
            bit += take;
        }
        result
    }

    fn insert(&self, buffer: &mut [u8], value: u64) {
        let value = value & self.value_mask();
        let end = self.end_bit() as usize;
        let mut bit = self.first_bit as usize;

        while bit < end {
            let offset = bit % 8;
            let take = (8 - offset).min(end - bit);
            let shift = 8 - offset - take;
            let mask = ((1u16 << take) - 1) as u8;
            // Remaining low bits of the field after this chunk.
            let rest = end - bit - take;
            let chunk = ((value >> rest) as u8) & mask;

            let byte = &mut buffer[bit / 8];
            *byte = (*byte & !(mask << shift)) | (chunk << shift);
            bit += take;
        }
    }
}

//==================================================================================FIELD_MUT
/// A bit field bound to a buffer it is known to fit in.
///
/// Compound operators are read-modify-write on the current field value with
/// wrapping arithmetic, then masked back to the field width. They are not
/// atomic: callers sharing a buffer must serialize access themselves.
pub struct FieldMut<'a> {
    field: BitField,
    buffer: &'a mut [u8],
}

impl<'a> FieldMut<'a> {
    pub fn descriptor(&self) -> BitField {
        self.field
    }

    /// Current value of the field.
    pub fn get(&self) -> u64 {
        self.field.extract(self.buffer)
    }

    /// Replace the field value (masked to the field width).
    pub fn set(&mut self, value: u64) {
        self.field.insert(self.buffer, value);
    }

    fn update(&mut self, op: impl FnOnce(u64) -> u64) {
        let current = self.get();
        self.set(op(current));
    }

    pub fn add(&mut self, rhs: u64) {
        self.update(|v| v.wrapping_add(rhs));
    }

    pub fn sub(&mut self, rhs: u64) {
        self.update(|v| v.wrapping_sub(rhs));
    }

    pub fn mul(&mut self, rhs: u64) {
        self.update(|v| v.wrapping_mul(rhs));
    }

    /// Divide the field in place. A zero divisor leaves the field untouched.
    pub fn div(&mut self, rhs: u64) -> Result<(), BitFieldError> {
        let value = self
            .get()
            .checked_div(rhs)
            .ok_or(BitFieldError::DivisionByZero)?;
        self.set(value);
        Ok(())
    }

    /// Remainder in place. A zero divisor leaves the field untouched.
    pub fn rem(&mut self, rhs: u64) -> Result<(), BitFieldError> {
        let value = self
            .get()
            .checked_rem(rhs)
            .ok_or(BitFieldError::DivisionByZero)?;
        self.set(value);
        Ok(())
    }

    /// Shift left; shifting by 64 or more clears the field.
    pub fn shl(&mut self, rhs: u32) {
        self.update(|v| v.checked_shl(rhs).unwrap_or(0));
    }

    /// Shift right; shifting by 64 or more clears the field.
    pub fn shr(&mut self, rhs: u32) {
        self.update(|v| v.checked_shr(rhs).unwrap_or(0));
    }

    pub fn or(&mut self, rhs: u64) {
        self.update(|v| v | rhs);
    }

    pub fn and(&mut self, rhs: u64) {
        self.update(|v| v & rhs);
    }

    pub fn xor(&mut self, rhs: u64) {
        self.update(|v| v ^ rhs);
    }
}

//==================================================================================BITREADER
/// Big-endian cursor reading consecutive fields from a `&[u8]`
/// without extra allocation or copies.
pub struct BitReader<'a> {
    /// Shared source buffer (typically a host command payload).
    buffer: &'a [u8],
    /// Current index expressed as number of bits read from the beginning.
    bit_cursor: usize,
}

impl<'a> BitReader<'a> {
    /// Create a reader positioned at the start of the provided buffer.
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            bit_cursor: 0,
        }
    }

    /// Bits left between the cursor and the end of the buffer.
    pub fn remaining_bits(&self) -> usize {
        self.buffer.len() * 8 - self.bit_cursor
    }

    /// Read `num_bits` bits (1 to 64) at the cursor, most significant bit first.
    pub fn read_u64(&mut self, num_bits: u8) -> Result<u64, BitReaderError> {
        if !(1..=64).contains(&num_bits) {
            return Err(BitReaderError::TooLongForType {
                max: 64,
                asked: num_bits,
            });
        }
        if num_bits as usize > self.remaining_bits() {
            return Err(BitReaderError::OutOfBounds {
                asked: num_bits as usize,
                available: self.remaining_bits(),
            });
        }

        let field = BitField::new(self.bit_cursor as u32, num_bits as u32);
        let value = field.extract(self.buffer);
        self.bit_cursor += num_bits as usize;
        Ok(value)
    }

    /// Read up to 8 bits and return a `u8`.
    pub fn read_u8(&mut self, num_bits: u8) -> Result<u8, BitReaderError> {
        if num_bits > 8 {
            return Err(BitReaderError::TooLongForType {
                max: 8,
                asked: num_bits,
            });
        }
        self.read_u64(num_bits).map(|val| val as u8)
    }

    /// Read up to 16 bits and return a `u16`.
    pub fn read_u16(&mut self, num_bits: u8) -> Result<u16, BitReaderError> {
        if num_bits > 16 {
            return Err(BitReaderError::TooLongForType {
                max: 16,
                asked: num_bits,
            });
        }
        self.read_u64(num_bits).map(|val| val as u16)
    }

    /// Read up to 32 bits and return a `u32`.
    pub fn read_u32(&mut self, num_bits: u8) -> Result<u32, BitReaderError> {
        if num_bits > 32 {
            return Err(BitReaderError::TooLongForType {
                max: 32,
                asked: num_bits,
            });
        }
        self.read_u64(num_bits).map(|val| val as u32)
    }

    /// Return a slice of `len` bytes from the current position.
    /// Cursor must be aligned on an octet boundary.
    pub fn read_slice(&mut self, len: usize) -> Result<&'a [u8], BitReaderError> {
        if self.bit_cursor % 8 != 0 {
            return Err(BitReaderError::NonAlignedBit {
                cursor: self.bit_cursor,
            });
        }

        let byte_start = self.bit_cursor / 8;
        let byte_end = byte_start + len;
        if byte_end > self.buffer.len() {
            return Err(BitReaderError::OutOfBounds {
                asked: len,
                available: self.buffer.len() - byte_start,
            });
        }
        let slice = &self.buffer[byte_start..byte_end];
        self.bit_cursor += len * 8;
        Ok(slice)
    }
}

//==================================================================================BITWRITER
/// Big-endian cursor laying consecutive fields into a `&mut [u8]`.
/// Used to build event payloads field by field.
pub struct BitWriter<'a> {
    /// Target buffer.
    buffer: &'a mut [u8],
    /// Current position expressed in bits written.
    bit_cursor: usize,
}

impl<'a> BitWriter<'a> {
    /// Create a writer positioned at the start of the buffer.
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self {
            buffer,
            bit_cursor: 0,
        }
    }

    /// Expose the cursor position in bits.
    pub fn bit_cursor(&self) -> usize {
        self.bit_cursor
    }

    /// Number of bytes touched so far, counting a partial trailing byte.
    pub fn byte_len(&self) -> usize {
        self.bit_cursor.div_ceil(8)
    }

    /// Write the low `num_bits` bits of `value`, most significant bit first.
    pub fn write_u64(&mut self, value: u64, num_bits: u8) -> Result<(), BitWriterError> {
        if !(1..=64).contains(&num_bits) {
            return Err(BitWriterError::TooLongForType {
                max: 64,
                asked: num_bits,
            });
        }

        let available = self.buffer.len() * 8 - self.bit_cursor;
        if num_bits as usize > available {
            return Err(BitWriterError::OutOfBounds {
                asked: num_bits as usize,
                available,
            });
        }

        BitField::new(self.bit_cursor as u32, num_bits as u32).insert(self.buffer, value);
        self.bit_cursor += num_bits as usize;
        Ok(())
    }

    /// Convenience helper to write up to 8 bits.
    pub fn write_u8(&mut self, value: u8, num_bits: u8) -> Result<(), BitWriterError> {
        if num_bits > 8 {
            return Err(BitWriterError::TooLongForType {
                max: 8,
                asked: num_bits,
            });
        }
        self.write_u64(value as u64, num_bits)
    }

    /// Convenience helper to write up to 32 bits.
    pub fn write_u32(&mut self, value: u32, num_bits: u8) -> Result<(), BitWriterError> {
        if num_bits > 32 {
            return Err(BitWriterError::TooLongForType {
                max: 32,
                asked: num_bits,
            });
        }
        self.write_u64(value as u64, num_bits)
    }

    /// Copy an already-aligned byte slice into the buffer.
    pub fn write_slice(&mut self, slice: &[u8]) -> Result<(), BitWriterError> {
        if self.bit_cursor % 8 != 0 {
            return Err(BitWriterError::NonAlignedBit {
                cursor: self.bit_cursor,
            });
        }
        let byte_start = self.bit_cursor / 8;
        let byte_end = byte_start + slice.len();
        if byte_end > self.buffer.len() {
            return Err(BitWriterError::OutOfBounds {
                asked: slice.len(),
                available: self.buffer.len() - byte_start,
            });
        }
        self.buffer[byte_start..byte_end].copy_from_slice(slice);
        self.bit_cursor += slice.len() * 8;
        Ok(())
    }
}
