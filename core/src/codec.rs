//! Compact byte encoding for replication deltas and chunk updates.
//!
//! Unsigned integers use a big-endian base-128 variable-length quantity with
//! the high bit as continuation flag. Signed integers are zig-zag mapped onto
//! the unsigned form first.

use thiserror::Error;

/// Failure raised while decoding a byte stream.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The stream ended before the value was complete.
    #[error("unexpected end of stream: needed {needed} more byte(s)")]
    UnexpectedEnd {
        /// Bytes missing to finish the current value.
        needed: usize,
    },
    /// A variable-length quantity exceeded 64 bits.
    #[error("variable length quantity overflows 64 bits")]
    VlqOverflow,
    /// A string payload was not valid UTF-8.
    #[error("string payload is not valid utf-8")]
    InvalidUtf8,
}

/// Growable output buffer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ByteWriter {
    buffer: Vec<u8>,
}

impl ByteWriter {
    /// Creates an empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes written so far.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Number of bytes written so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Reports whether nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Consumes the writer, returning its buffer.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Appends raw bytes with no length prefix.
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Appends one byte.
    pub fn write_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    /// Appends a boolean as a single byte.
    pub fn write_bool(&mut self, value: bool) {
        self.write_u8(u8::from(value));
    }

    /// Appends a little-endian `u32`.
    pub fn write_u32(&mut self, value: u32) {
        self.write_raw(&value.to_le_bytes());
    }

    /// Appends a little-endian `u64`.
    pub fn write_u64(&mut self, value: u64) {
        self.write_raw(&value.to_le_bytes());
    }

    /// Appends a little-endian `i32`.
    pub fn write_i32(&mut self, value: i32) {
        self.write_raw(&value.to_le_bytes());
    }

    /// Appends a little-endian `f32`.
    pub fn write_f32(&mut self, value: f32) {
        self.write_raw(&value.to_le_bytes());
    }

    /// Appends a little-endian `f64`.
    pub fn write_f64(&mut self, value: f64) {
        self.write_raw(&value.to_le_bytes());
    }

    /// Appends an unsigned variable-length quantity.
    pub fn write_vlq_u(&mut self, value: u64) {
        let mut groups = [0_u8; 10];
        let mut count = 0;
        let mut rest = value;
        loop {
            groups[count] = (rest & 0x7f) as u8;
            count += 1;
            rest >>= 7;
            if rest == 0 {
                break;
            }
        }
        for index in (0..count).rev() {
            let continuation = if index == 0 { 0 } else { 0x80 };
            self.buffer.push(groups[index] | continuation);
        }
    }

    /// Appends a zig-zag encoded signed variable-length quantity.
    pub fn write_vlq_i(&mut self, value: i64) {
        self.write_vlq_u(((value << 1) ^ (value >> 63)) as u64);
    }

    /// Appends bytes prefixed by their length.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.write_vlq_u(bytes.len() as u64);
        self.write_raw(bytes);
    }

    /// Appends a string prefixed by its byte length.
    pub fn write_string(&mut self, value: &str) {
        self.write_bytes(value.as_bytes());
    }
}

/// Cursor over an input buffer.
#[derive(Clone, Debug)]
pub struct ByteReader<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> ByteReader<'a> {
    /// Creates a reader positioned at the start of `bytes`.
    #[must_use]
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    /// Current read offset.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Bytes left to read.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }

    /// Reports whether every byte has been consumed.
    #[must_use]
    pub fn at_end(&self) -> bool {
        self.remaining() == 0
    }

    /// Reads `count` raw bytes.
    pub fn read_raw(&mut self, count: usize) -> Result<&'a [u8], CodecError> {
        if self.remaining() < count {
            return Err(CodecError::UnexpectedEnd {
                needed: count - self.remaining(),
            });
        }
        let slice = &self.bytes[self.position..self.position + count];
        self.position += count;
        Ok(slice)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut array = [0_u8; N];
        array.copy_from_slice(self.read_raw(N)?);
        Ok(array)
    }

    /// Reads one byte.
    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.read_raw(1)?[0])
    }

    /// Reads a boolean; any non-zero byte is true.
    pub fn read_bool(&mut self) -> Result<bool, CodecError> {
        Ok(self.read_u8()? != 0)
    }

    /// Reads a little-endian `u32`.
    pub fn read_u32(&mut self) -> Result<u32, CodecError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    /// Reads a little-endian `u64`.
    pub fn read_u64(&mut self) -> Result<u64, CodecError> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    /// Reads a little-endian `i32`.
    pub fn read_i32(&mut self) -> Result<i32, CodecError> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    /// Reads a little-endian `f32`.
    pub fn read_f32(&mut self) -> Result<f32, CodecError> {
        Ok(f32::from_le_bytes(self.read_array()?))
    }

    /// Reads a little-endian `f64`.
    pub fn read_f64(&mut self) -> Result<f64, CodecError> {
        Ok(f64::from_le_bytes(self.read_array()?))
    }

    /// Reads an unsigned variable-length quantity.
    pub fn read_vlq_u(&mut self) -> Result<u64, CodecError> {
        let mut value: u64 = 0;
        for _ in 0..10 {
            let byte = self.read_u8()?;
            if value >> 57 != 0 {
                return Err(CodecError::VlqOverflow);
            }
            value = (value << 7) | u64::from(byte & 0x7f);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(CodecError::VlqOverflow)
    }

    /// Reads a zig-zag encoded signed variable-length quantity.
    pub fn read_vlq_i(&mut self) -> Result<i64, CodecError> {
        let raw = self.read_vlq_u()?;
        Ok((raw >> 1) as i64 ^ -((raw & 1) as i64))
    }

    /// Reads a length-prefixed byte block.
    pub fn read_bytes(&mut self) -> Result<&'a [u8], CodecError> {
        let length = self.read_vlq_u()?;
        let length = usize::try_from(length).map_err(|_| CodecError::VlqOverflow)?;
        self.read_raw(length)
    }

    /// Reads a length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> Result<String, CodecError> {
        let bytes = self.read_bytes()?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| CodecError::InvalidUtf8)
    }
}

/// Encoded size in bytes of an unsigned variable-length quantity.
#[must_use]
pub const fn vlq_u_size(value: u64) -> usize {
    let mut size = 1;
    let mut rest = value >> 7;
    while rest != 0 {
        size += 1;
        rest >>= 7;
    }
    size
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vlq_uses_minimal_length() {
        let mut writer = ByteWriter::new();
        writer.write_vlq_u(0);
        writer.write_vlq_u(127);
        writer.write_vlq_u(128);
        assert_eq!(writer.as_bytes(), &[0x00, 0x7f, 0x81, 0x00]);
        assert_eq!(vlq_u_size(128), 2);
        assert_eq!(vlq_u_size(u64::MAX), 10);
    }

    #[test]
    fn signed_values_survive_zig_zag() {
        let mut writer = ByteWriter::new();
        for value in [0, -1, 1, i64::MIN, i64::MAX, -300] {
            writer.write_vlq_i(value);
        }
        let bytes = writer.into_bytes();
        let mut reader = ByteReader::new(&bytes);
        for value in [0, -1, 1, i64::MIN, i64::MAX, -300] {
            assert_eq!(reader.read_vlq_i().expect("value decodes"), value);
        }
        assert!(reader.at_end());
    }

    #[test]
    fn truncated_input_reports_missing_bytes() {
        let mut reader = ByteReader::new(&[0x01, 0x02]);
        assert_eq!(
            reader.read_u32(),
            Err(CodecError::UnexpectedEnd { needed: 2 })
        );
    }

    #[test]
    fn overlong_vlq_is_rejected() {
        let bytes = [0xff_u8; 11];
        let mut reader = ByteReader::new(&bytes);
        assert_eq!(reader.read_vlq_u(), Err(CodecError::VlqOverflow));
    }

    #[test]
    fn strings_are_length_prefixed() {
        let mut writer = ByteWriter::new();
        writer.write_string("orbit");
        writer.write_bool(true);
        let bytes = writer.into_bytes();
        assert_eq!(bytes[0], 5);
        let mut reader = ByteReader::new(&bytes);
        assert_eq!(reader.read_string().expect("string decodes"), "orbit");
        assert!(reader.read_bool().expect("bool decodes"));
    }

    #[test]
    fn invalid_utf8_is_reported() {
        let mut writer = ByteWriter::new();
        writer.write_bytes(&[0xff, 0xfe]);
        let bytes = writer.into_bytes();
        let mut reader = ByteReader::new(&bytes);
        assert_eq!(reader.read_string(), Err(CodecError::InvalidUtf8));
    }
}
