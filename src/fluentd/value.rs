//! Wire-level value model
//!
//! Defines the nested value tree that forward-protocol messages are built
//! from, the closed attribute variant accepted from instrumentation, and the
//! Fluentd EventTime timestamp.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::warn;

/// Ordered field map used for record bodies and nested property maps.
///
/// `BTreeMap` keeps keys in a deterministic (sorted) order, so encoded
/// messages are byte-stable for a given record.
pub type FieldMap = BTreeMap<String, Value>;

/// MessagePack extension type byte for Fluentd EventTime.
pub const EVENT_TIME_EXT_TYPE: i8 = 0x00;

/// Fluentd EventTime: seconds and nanoseconds since the Unix epoch.
///
/// Encoded on the wire as fixext8 with type [`EVENT_TIME_EXT_TYPE`]: four
/// big-endian bytes of seconds followed by four big-endian bytes of
/// nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventTime {
    /// Whole seconds since the Unix epoch
    pub seconds: i32,
    /// Nanoseconds past the last whole second
    pub nanos: i32,
}

impl EventTime {
    /// Current wall-clock time.
    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now())
    }

    /// Build an EventTime from explicit parts.
    ///
    /// A `(0, 0)` pair means "not supplied" and is replaced with the current
    /// wall-clock time. This matches existing Fluentd exporter behavior;
    /// callers that genuinely mean the Unix epoch cannot express it.
    pub fn from_parts(seconds: i32, nanos: i32) -> Self {
        if seconds == 0 && nanos == 0 {
            Self::now()
        } else {
            Self { seconds, nanos }
        }
    }

    /// Convert from a [`SystemTime`]. Times before the epoch clamp to zero.
    pub fn from_system_time(time: SystemTime) -> Self {
        let duration = time.duration_since(UNIX_EPOCH).unwrap_or_default();
        Self {
            seconds: duration.as_secs() as i32,
            nanos: duration.subsec_nanos() as i32,
        }
    }

    /// Serialize to the 8-byte big-endian wire layout.
    pub fn to_bytes(self) -> [u8; 8] {
        let mut bytes = [0u8; 8];
        bytes[..4].copy_from_slice(&self.seconds.to_be_bytes());
        bytes[4..].copy_from_slice(&self.nanos.to_be_bytes());
        bytes
    }

    /// Deserialize from the 8-byte big-endian wire layout.
    pub fn from_bytes(bytes: [u8; 8]) -> Self {
        let seconds = i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let nanos = i32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        Self { seconds, nanos }
    }
}

/// A value inside a forward-protocol message.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Boolean
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Unsigned integer
    UInt(u64),
    /// Double-precision float
    Double(f64),
    /// UTF-8 string
    Str(String),
    /// Sequence of values
    Array(Vec<Value>),
    /// Nested field map
    Map(FieldMap),
    /// Fluentd EventTime extension value
    EventTime(EventTime),
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<EventTime> for Value {
    fn from(v: EventTime) -> Self {
        Value::EventTime(v)
    }
}

/// Attribute value supplied by instrumentation: scalars and homogeneous
/// arrays only, never nested or mixed-type arrays.
///
/// This is a closed set. [`populate_attribute`] matches it exhaustively with
/// no fallback arm, so adding a variant without updating the serializer is a
/// compile error rather than silently dropped data.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// Boolean scalar
    Bool(bool),
    /// 32-bit signed integer scalar
    I32(i32),
    /// 64-bit signed integer scalar
    I64(i64),
    /// 32-bit unsigned integer scalar
    U32(u32),
    /// 64-bit unsigned integer scalar
    U64(u64),
    /// Double scalar
    F64(f64),
    /// String scalar
    Str(String),
    /// Homogeneous boolean array
    BoolArray(Vec<bool>),
    /// Homogeneous 32-bit signed integer array
    I32Array(Vec<i32>),
    /// Homogeneous 64-bit signed integer array
    I64Array(Vec<i64>),
    /// Homogeneous 32-bit unsigned integer array
    U32Array(Vec<u32>),
    /// Homogeneous 64-bit unsigned integer array
    U64Array(Vec<u64>),
    /// Homogeneous double array
    F64Array(Vec<f64>),
    /// Homogeneous string array
    StrArray(Vec<String>),
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::Str(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::Str(v)
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        AttributeValue::Bool(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::I64(v)
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::F64(v)
    }
}

/// Store an attribute value under `key`, converting it to the wire-level
/// representation. Arrays preserve element order; repeated keys overwrite.
pub fn populate_attribute(fields: &mut FieldMap, key: &str, value: AttributeValue) {
    let converted = match value {
        AttributeValue::Bool(v) => Value::Bool(v),
        AttributeValue::I32(v) => Value::Int(i64::from(v)),
        AttributeValue::I64(v) => Value::Int(v),
        AttributeValue::U32(v) => Value::UInt(u64::from(v)),
        AttributeValue::U64(v) => Value::UInt(v),
        AttributeValue::F64(v) => Value::Double(v),
        AttributeValue::Str(v) => Value::Str(v),
        AttributeValue::BoolArray(vs) => Value::Array(vs.into_iter().map(Value::Bool).collect()),
        AttributeValue::I32Array(vs) => {
            Value::Array(vs.into_iter().map(|v| Value::Int(i64::from(v))).collect())
        }
        AttributeValue::I64Array(vs) => Value::Array(vs.into_iter().map(Value::Int).collect()),
        AttributeValue::U32Array(vs) => {
            Value::Array(vs.into_iter().map(|v| Value::UInt(u64::from(v))).collect())
        }
        AttributeValue::U64Array(vs) => Value::Array(vs.into_iter().map(Value::UInt).collect()),
        AttributeValue::F64Array(vs) => Value::Array(vs.into_iter().map(Value::Double).collect()),
        AttributeValue::StrArray(vs) => Value::Array(vs.into_iter().map(Value::Str).collect()),
    };
    fields.insert(key.to_string(), converted);
}

/// Render a scalar attribute as a string, for fields that are textual on the
/// wire (e.g. a log body). Array values are not representable and collapse to
/// an empty string.
pub fn attribute_value_to_string(value: &AttributeValue) -> String {
    match value {
        AttributeValue::Bool(v) => v.to_string(),
        AttributeValue::I32(v) => v.to_string(),
        AttributeValue::I64(v) => v.to_string(),
        AttributeValue::U32(v) => v.to_string(),
        AttributeValue::U64(v) => v.to_string(),
        AttributeValue::F64(v) => v.to_string(),
        AttributeValue::Str(v) => v.clone(),
        AttributeValue::BoolArray(_)
        | AttributeValue::I32Array(_)
        | AttributeValue::I64Array(_)
        | AttributeValue::U32Array(_)
        | AttributeValue::U64Array(_)
        | AttributeValue::F64Array(_)
        | AttributeValue::StrArray(_) => {
            warn!("array attributes cannot be rendered as text, ignored");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_time_byte_layout_is_big_endian() {
        let ts = EventTime {
            seconds: 0x0102_0304,
            nanos: 0x0506_0708,
        };
        assert_eq!(ts.to_bytes(), [1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(EventTime::from_bytes(ts.to_bytes()), ts);
    }

    #[test]
    fn zero_parts_substitute_current_time() {
        let before = EventTime::now().seconds;
        let ts = EventTime::from_parts(0, 0);
        let after = EventTime::now().seconds;
        assert!(ts.seconds >= before && ts.seconds <= after);
        assert!(ts.seconds != 0 || ts.nanos != 0);
    }

    #[test]
    fn nonzero_parts_are_preserved() {
        let ts = EventTime::from_parts(1, 0);
        assert_eq!(ts, EventTime { seconds: 1, nanos: 0 });
    }

    #[test]
    fn arrays_preserve_element_order() {
        let mut fields = FieldMap::new();
        populate_attribute(&mut fields, "xs", AttributeValue::I64Array(vec![3, 1, 2]));
        assert_eq!(
            fields["xs"],
            Value::Array(vec![Value::Int(3), Value::Int(1), Value::Int(2)])
        );
    }

    #[test]
    fn repeated_key_overwrites() {
        let mut fields = FieldMap::new();
        populate_attribute(&mut fields, "k", AttributeValue::Bool(true));
        populate_attribute(&mut fields, "k", AttributeValue::Str("v2".into()));
        assert_eq!(fields.len(), 1);
        assert_eq!(fields["k"], Value::Str("v2".into()));
    }
}
