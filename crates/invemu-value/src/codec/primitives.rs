//! Primitive encoding/decoding for the tagged container format.
//!
//! Implements varint, signed varint (zigzag), and fixed-width little-endian
//! scalars.

use super::CodecError;

/// Maximum bytes in a 64-bit LEB128 varint.
pub(crate) const MAX_VARINT_BYTES: usize = 10;

// =============================================================================
// DECODING
// =============================================================================

/// Bounds-checked cursor over encoded bytes.
#[derive(Debug, Clone)]
pub(crate) struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn remaining_len(&self) -> usize {
        self.data.len() - self.pos
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    #[inline]
    pub(crate) fn read_byte(&mut self, context: &'static str) -> Result<u8, CodecError> {
        let byte = *self
            .data
            .get(self.pos)
            .ok_or(CodecError::UnexpectedEof { context })?;
        self.pos += 1;
        Ok(byte)
    }

    #[inline]
    pub(crate) fn read_bytes(
        &mut self,
        n: usize,
        context: &'static str,
    ) -> Result<&'a [u8], CodecError> {
        if n > self.remaining_len() {
            return Err(CodecError::UnexpectedEof { context });
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    pub(crate) fn read_array<const N: usize>(
        &mut self,
        context: &'static str,
    ) -> Result<[u8; N], CodecError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N, context)?);
        Ok(out)
    }

    /// Reads an unsigned varint (LEB128).
    pub(crate) fn read_varint(&mut self, context: &'static str) -> Result<u64, CodecError> {
        let mut result: u64 = 0;
        let mut shift = 0u32;

        for _ in 0..MAX_VARINT_BYTES {
            let byte = self.read_byte(context)?;
            let value = u64::from(byte & 0x7F);

            if shift == 63 && value > 1 {
                return Err(CodecError::VarintTooLong { context });
            }
            result |= value << shift;

            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
        }

        Err(CodecError::VarintTooLong { context })
    }

    /// Reads a signed varint (zigzag encoded).
    pub(crate) fn read_signed_varint(&mut self, context: &'static str) -> Result<i64, CodecError> {
        Ok(zigzag_decode(self.read_varint(context)?))
    }

    /// Reads a varint length and checks it against a limit.
    pub(crate) fn read_len(
        &mut self,
        max: usize,
        field: &'static str,
    ) -> Result<usize, CodecError> {
        let raw = self.read_varint(field)?;
        let len = usize::try_from(raw).unwrap_or(usize::MAX);
        if len > max {
            return Err(CodecError::LengthExceedsLimit { field, len, max });
        }
        Ok(len)
    }

    /// Reads a length-prefixed UTF-8 string.
    pub(crate) fn read_string(
        &mut self,
        max_len: usize,
        field: &'static str,
    ) -> Result<String, CodecError> {
        let len = self.read_len(max_len, field)?;
        let bytes = self.read_bytes(len, field)?;
        std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|_| CodecError::InvalidUtf8 { field })
    }
}

// =============================================================================
// ENCODING
// =============================================================================

/// Growable output buffer.
#[derive(Debug, Clone, Default)]
pub(crate) struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    #[inline]
    pub(crate) fn write_byte(&mut self, byte: u8) {
        self.buf.push(byte);
    }

    #[inline]
    pub(crate) fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Writes an unsigned varint (LEB128).
    pub(crate) fn write_varint(&mut self, mut value: u64) {
        let mut buf = [0u8; MAX_VARINT_BYTES];
        let mut len = 0;
        loop {
            let mut byte = (value & 0x7F) as u8;
            value >>= 7;
            if value != 0 {
                byte |= 0x80;
            }
            buf[len] = byte;
            len += 1;
            if value == 0 {
                break;
            }
        }
        self.buf.extend_from_slice(&buf[..len]);
    }

    /// Writes a signed varint (zigzag encoded).
    pub(crate) fn write_signed_varint(&mut self, value: i64) {
        self.write_varint(zigzag_encode(value));
    }

    /// Writes a length-prefixed UTF-8 string.
    pub(crate) fn write_string(&mut self, s: &str) {
        self.write_varint(s.len() as u64);
        self.buf.extend_from_slice(s.as_bytes());
    }
}

// =============================================================================
// ZIGZAG ENCODING
// =============================================================================

/// Maps negative numbers to odd positive numbers:
/// 0 -> 0, -1 -> 1, 1 -> 2, -2 -> 3, 2 -> 4, ...
#[inline]
pub(crate) fn zigzag_encode(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

#[inline]
pub(crate) fn zigzag_decode(n: u64) -> i64 {
    ((n >> 1) as i64) ^ (-((n & 1) as i64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zigzag_values() {
        assert_eq!(zigzag_encode(0), 0);
        assert_eq!(zigzag_encode(-1), 1);
        assert_eq!(zigzag_encode(1), 2);
        assert_eq!(zigzag_encode(-2), 3);
        for v in [i64::MIN, -1, 0, 1, i64::MAX] {
            assert_eq!(zigzag_decode(zigzag_encode(v)), v);
        }
    }

    #[test]
    fn varint_boundaries() {
        for v in [0u64, 127, 128, 16383, 16384, u64::MAX] {
            let mut writer = Writer::default();
            writer.write_varint(v);
            let bytes = writer.into_bytes();
            let mut reader = Reader::new(&bytes);
            assert_eq!(reader.read_varint("test").unwrap(), v, "failed for {v}");
            assert!(reader.is_empty());
        }
    }

    #[test]
    fn varint_too_long_rejected() {
        let bytes = [0xFFu8; 11];
        let mut reader = Reader::new(&bytes);
        assert!(matches!(
            reader.read_varint("test"),
            Err(CodecError::VarintTooLong { .. })
        ));
    }

    #[test]
    fn read_past_end_is_eof() {
        let mut reader = Reader::new(&[1, 2]);
        assert!(matches!(
            reader.read_bytes(3, "test"),
            Err(CodecError::UnexpectedEof { context: "test" })
        ));
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn string_length_limit_enforced() {
        let mut writer = Writer::default();
        writer.write_string("hello");
        let bytes = writer.into_bytes();
        let mut reader = Reader::new(&bytes);
        assert!(matches!(
            reader.read_string(3, "text"),
            Err(CodecError::LengthExceedsLimit { len: 5, max: 3, .. })
        ));
    }

    #[test]
    fn invalid_utf8_rejected() {
        let bytes = [2u8, 0xC3, 0x28];
        let mut reader = Reader::new(&bytes);
        assert!(matches!(
            reader.read_string(16, "text"),
            Err(CodecError::InvalidUtf8 { field: "text" })
        ));
    }
}
