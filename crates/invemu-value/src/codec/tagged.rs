//! Tagged binary container codec
//!
//! Layout: 4-byte magic `IVB1`, then one root value. Each value is a tag
//! byte followed by its payload:
//!
//! | Tag  | Kind     | Payload                                        |
//! |------|----------|------------------------------------------------|
//! | 0x00 | Null     | none                                           |
//! | 0x01 | Bool     | none (false)                                   |
//! | 0x02 | Bool     | none (true)                                    |
//! | 0x03 | Int8     | 1 byte                                         |
//! | 0x04 | Int16    | 2 bytes LE                                     |
//! | 0x05 | Int32    | 4 bytes LE                                     |
//! | 0x06 | Int64    | zigzag varint                                  |
//! | 0x07 | Float    | 8 bytes LE                                     |
//! | 0x08 | Text     | varint length + UTF-8                          |
//! | 0x09 | DateTime | zigzag varint epoch seconds + varint nanos     |
//! | 0x0A | Sequence | varint count + values                          |
//! | 0x0B | Mapping  | varint count + (varint length + key, value)*   |

use super::primitives::{Reader, Writer};
use super::{Codec, CodecError};
use crate::value::{Mapping, Value};
use chrono::DateTime;

const MAGIC: &[u8; 4] = b"IVB1";

const TAG_NULL: u8 = 0x00;
const TAG_FALSE: u8 = 0x01;
const TAG_TRUE: u8 = 0x02;
const TAG_INT8: u8 = 0x03;
const TAG_INT16: u8 = 0x04;
const TAG_INT32: u8 = 0x05;
const TAG_INT64: u8 = 0x06;
const TAG_FLOAT: u8 = 0x07;
const TAG_TEXT: u8 = 0x08;
const TAG_DATETIME: u8 = 0x09;
const TAG_SEQUENCE: u8 = 0x0A;
const TAG_MAPPING: u8 = 0x0B;

/// Decoder limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Deepest container nesting accepted
    pub max_depth: usize,
    /// Longest text or key in bytes
    pub max_text_len: usize,
    /// Most elements in one sequence or mapping
    pub max_items: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_depth: 128,
            max_text_len: 16 * 1024 * 1024,
            max_items: 1 << 24,
        }
    }
}

/// Self-describing tagged binary codec
#[derive(Debug, Clone, Copy, Default)]
pub struct TaggedCodec {
    limits: Limits,
}

impl TaggedCodec {
    /// Create codec with default limits
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create codec with explicit limits
    #[inline]
    #[must_use]
    pub fn with_limits(limits: Limits) -> Self {
        Self { limits }
    }

    /// Active decoder limits
    #[inline]
    #[must_use]
    pub fn limits(&self) -> Limits {
        self.limits
    }

    fn write_value(w: &mut Writer, value: &Value) {
        match value {
            Value::Null => w.write_byte(TAG_NULL),
            Value::Bool(false) => w.write_byte(TAG_FALSE),
            Value::Bool(true) => w.write_byte(TAG_TRUE),
            Value::Int8(n) => {
                w.write_byte(TAG_INT8);
                w.write_byte(*n);
            }
            Value::Int16(n) => {
                w.write_byte(TAG_INT16);
                w.write_bytes(&n.to_le_bytes());
            }
            Value::Int32(n) => {
                w.write_byte(TAG_INT32);
                w.write_bytes(&n.to_le_bytes());
            }
            Value::Int64(n) => {
                w.write_byte(TAG_INT64);
                w.write_signed_varint(*n);
            }
            Value::Float(f) => {
                w.write_byte(TAG_FLOAT);
                w.write_bytes(&f.to_le_bytes());
            }
            Value::Text(s) => {
                w.write_byte(TAG_TEXT);
                w.write_string(s);
            }
            Value::DateTime(dt) => {
                let utc = dt.and_utc();
                w.write_byte(TAG_DATETIME);
                w.write_signed_varint(utc.timestamp());
                w.write_varint(u64::from(utc.timestamp_subsec_nanos()));
            }
            Value::Sequence(items) => {
                w.write_byte(TAG_SEQUENCE);
                w.write_varint(items.len() as u64);
                for item in items {
                    Self::write_value(w, item);
                }
            }
            Value::Mapping(map) => {
                w.write_byte(TAG_MAPPING);
                w.write_varint(map.len() as u64);
                for (key, item) in map {
                    w.write_string(key);
                    Self::write_value(w, item);
                }
            }
        }
    }

    fn read_value(&self, r: &mut Reader<'_>, depth: usize) -> Result<Value, CodecError> {
        let offset = r.position();
        let tag = r.read_byte("value tag")?;
        let value = match tag {
            TAG_NULL => Value::Null,
            TAG_FALSE => Value::Bool(false),
            TAG_TRUE => Value::Bool(true),
            TAG_INT8 => Value::Int8(r.read_byte("int8")?),
            TAG_INT16 => Value::Int16(u16::from_le_bytes(r.read_array("int16")?)),
            TAG_INT32 => Value::Int32(u32::from_le_bytes(r.read_array("int32")?)),
            TAG_INT64 => Value::Int64(r.read_signed_varint("int64")?),
            TAG_FLOAT => Value::Float(f64::from_le_bytes(r.read_array("float")?)),
            TAG_TEXT => Value::Text(r.read_string(self.limits.max_text_len, "text")?),
            TAG_DATETIME => {
                let seconds = r.read_signed_varint("datetime seconds")?;
                let raw_nanos = r.read_varint("datetime nanos")?;
                let nanos = u32::try_from(raw_nanos).unwrap_or(u32::MAX);
                let dt = DateTime::from_timestamp(seconds, nanos)
                    .ok_or(CodecError::InvalidDateTime { seconds, nanos })?;
                Value::DateTime(dt.naive_utc())
            }
            TAG_SEQUENCE => {
                let next = self.descend(depth)?;
                let count = r.read_len(self.limits.max_items, "sequence")?;
                let mut items = Vec::with_capacity(count.min(r.remaining_len()));
                for _ in 0..count {
                    items.push(self.read_value(r, next)?);
                }
                Value::Sequence(items)
            }
            TAG_MAPPING => {
                let next = self.descend(depth)?;
                let count = r.read_len(self.limits.max_items, "mapping")?;
                let mut map = Mapping::with_capacity(count.min(r.remaining_len()));
                for _ in 0..count {
                    let key = r.read_string(self.limits.max_text_len, "mapping key")?;
                    let item = self.read_value(r, next)?;
                    if map.contains_key(&key) {
                        return Err(CodecError::DuplicateKey { key });
                    }
                    map.insert(key, item);
                }
                Value::Mapping(map)
            }
            other => return Err(CodecError::UnknownTag { tag: other, offset }),
        };
        Ok(value)
    }

    fn descend(&self, depth: usize) -> Result<usize, CodecError> {
        if depth >= self.limits.max_depth {
            return Err(CodecError::DepthExceeded {
                max: self.limits.max_depth,
            });
        }
        Ok(depth + 1)
    }
}

impl Codec for TaggedCodec {
    fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        let mut writer = Writer::with_capacity(256);
        writer.write_bytes(MAGIC);
        Self::write_value(&mut writer, value);
        Ok(writer.into_bytes())
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value, CodecError> {
        let mut reader = Reader::new(bytes);
        let magic = reader.read_bytes(MAGIC.len(), "magic")?;
        if magic != MAGIC {
            return Err(CodecError::InvalidMagic {
                found: magic.to_vec(),
            });
        }
        let value = self.read_value(&mut reader, 0)?;
        if !reader.is_empty() {
            return Err(CodecError::TrailingBytes {
                count: reader.remaining_len(),
            });
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn round_trip(value: &Value) -> Value {
        let codec = TaggedCodec::new();
        codec.decode(&codec.encode(value).unwrap()).unwrap()
    }

    #[test]
    fn scalars_keep_their_width() {
        for v in [
            Value::Int8(200),
            Value::Int16(12345),
            Value::Int32(12345),
            Value::Int64(-9),
        ] {
            assert_eq!(round_trip(&v), v);
        }
    }

    #[test]
    fn datetime_round_trips_with_subseconds() {
        let dt = NaiveDate::from_ymd_opt(2023, 9, 19)
            .unwrap()
            .and_hms_nano_opt(14, 3, 7, 123_456_789)
            .unwrap();
        assert_eq!(round_trip(&Value::DateTime(dt)), Value::DateTime(dt));
    }

    #[test]
    fn pre_epoch_datetime_round_trips() {
        let dt = NaiveDate::from_ymd_opt(1960, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 1)
            .unwrap();
        assert_eq!(round_trip(&Value::DateTime(dt)), Value::DateTime(dt));
    }

    #[test]
    fn mapping_order_survives() {
        let mut m = Mapping::new();
        m.insert("b".into(), Value::Int8(1));
        m.insert("a".into(), Value::Int8(2));
        let decoded = round_trip(&Value::Mapping(m));
        let keys: Vec<_> = decoded.as_mapping().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn bad_magic_rejected() {
        let codec = TaggedCodec::new();
        assert!(matches!(
            codec.decode(b"NOPE\x00"),
            Err(CodecError::InvalidMagic { .. })
        ));
    }

    #[test]
    fn trailing_bytes_rejected() {
        let codec = TaggedCodec::new();
        let mut bytes = codec.encode(&Value::Null).unwrap();
        bytes.push(0);
        assert!(matches!(
            codec.decode(&bytes),
            Err(CodecError::TrailingBytes { count: 1 })
        ));
    }

    #[test]
    fn unknown_tag_rejected() {
        let codec = TaggedCodec::new();
        assert!(matches!(
            codec.decode(b"IVB1\x7f"),
            Err(CodecError::UnknownTag { tag: 0x7f, offset: 4 })
        ));
    }

    #[test]
    fn duplicate_key_rejected() {
        let codec = TaggedCodec::new();
        let bytes = b"IVB1\x0b\x02\x01k\x00\x01k\x00";
        assert!(matches!(
            codec.decode(bytes),
            Err(CodecError::DuplicateKey { .. })
        ));
    }

    #[test]
    fn depth_limit_enforced() {
        let codec = TaggedCodec::with_limits(Limits {
            max_depth: 2,
            ..Limits::default()
        });
        let nested = Value::Sequence(vec![Value::Sequence(vec![Value::Sequence(vec![])])]);
        let bytes = codec.encode(&nested).unwrap();
        assert_eq!(
            codec.decode(&bytes),
            Err(CodecError::DepthExceeded { max: 2 })
        );
    }

    #[test]
    fn truncated_input_is_eof() {
        let codec = TaggedCodec::new();
        let bytes = codec.encode(&Value::Int32(7)).unwrap();
        assert!(matches!(
            codec.decode(&bytes[..bytes.len() - 1]),
            Err(CodecError::UnexpectedEof { .. })
        ));
    }
}
