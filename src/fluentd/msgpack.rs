//! MessagePack encoding for forward-protocol messages
//!
//! Serializes the nested array/map structure `[tag, [[time, record], ...]]`
//! to MessagePack bytes. Ordinary values use the standard minimal-size
//! encodings (which are big-endian by specification); EventTime values are
//! emitted as fixext8 with type `0x00`.

use rmp::encode::{
    write_array_len, write_bool, write_ext_meta, write_f64, write_map_len, write_sint, write_str,
    write_uint,
};

use crate::error::FluentdExportError;
use crate::fluentd::batcher::ForwardMessage;
use crate::fluentd::value::{EVENT_TIME_EXT_TYPE, EventTime, FieldMap, Value};

fn enc_err<E: std::fmt::Display>(err: E) -> FluentdExportError {
    FluentdExportError::EncodingError(err.to_string())
}

/// Encode one forward-protocol message to a MessagePack byte buffer.
pub fn encode_forward_message(message: &ForwardMessage) -> Result<Vec<u8>, FluentdExportError> {
    let mut buf = Vec::with_capacity(256);
    write_array_len(&mut buf, 2).map_err(enc_err)?;
    write_str(&mut buf, &message.tag).map_err(enc_err)?;
    write_array_len(&mut buf, message.entries.len() as u32).map_err(enc_err)?;
    for entry in &message.entries {
        write_array_len(&mut buf, 2).map_err(enc_err)?;
        encode_event_time(&mut buf, entry.time)?;
        encode_map(&mut buf, &entry.record)?;
    }
    Ok(buf)
}

/// Encode a single value tree.
pub fn encode_value(buf: &mut Vec<u8>, value: &Value) -> Result<(), FluentdExportError> {
    match value {
        Value::Bool(v) => write_bool(buf, *v).map_err(enc_err)?,
        Value::Int(v) => {
            write_sint(buf, *v).map_err(enc_err)?;
        }
        Value::UInt(v) => {
            write_uint(buf, *v).map_err(enc_err)?;
        }
        Value::Double(v) => write_f64(buf, *v).map_err(enc_err)?,
        Value::Str(v) => write_str(buf, v).map_err(enc_err)?,
        Value::Array(items) => {
            write_array_len(buf, items.len() as u32).map_err(enc_err)?;
            for item in items {
                encode_value(buf, item)?;
            }
        }
        Value::Map(fields) => encode_map(buf, fields)?,
        Value::EventTime(ts) => encode_event_time(buf, *ts)?,
    }
    Ok(())
}

fn encode_map(buf: &mut Vec<u8>, fields: &FieldMap) -> Result<(), FluentdExportError> {
    write_map_len(buf, fields.len() as u32).map_err(enc_err)?;
    for (key, value) in fields {
        write_str(buf, key).map_err(enc_err)?;
        encode_value(buf, value)?;
    }
    Ok(())
}

/// Encode an EventTime as fixext8: one type byte then the 8-byte big-endian
/// seconds/nanoseconds pair.
fn encode_event_time(buf: &mut Vec<u8>, ts: EventTime) -> Result<(), FluentdExportError> {
    write_ext_meta(buf, 8, EVENT_TIME_EXT_TYPE).map_err(enc_err)?;
    buf.extend_from_slice(&ts.to_bytes());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_time_encodes_as_fixext8() {
        let mut buf = Vec::new();
        encode_event_time(
            &mut buf,
            EventTime {
                seconds: 1,
                nanos: 2,
            },
        )
        .unwrap();
        // fixext8 marker, type 0x00, then the 8-byte payload
        assert_eq!(buf, [0xd7, 0x00, 0, 0, 0, 1, 0, 0, 0, 2]);
    }

    #[test]
    fn small_ints_use_minimal_encoding() {
        let mut buf = Vec::new();
        encode_value(&mut buf, &Value::Int(5)).unwrap();
        assert_eq!(buf, [0x05]);

        buf.clear();
        encode_value(&mut buf, &Value::UInt(0x1_0000)).unwrap();
        // uint32 marker followed by big-endian payload
        assert_eq!(buf, [0xce, 0x00, 0x01, 0x00, 0x00]);
    }

    #[test]
    fn map_keys_encode_in_sorted_order() {
        let mut fields = FieldMap::new();
        fields.insert("b".into(), Value::Int(2));
        fields.insert("a".into(), Value::Int(1));

        let mut buf = Vec::new();
        encode_map(&mut buf, &fields).unwrap();
        // fixmap(2), fixstr "a", 1, fixstr "b", 2
        assert_eq!(buf, [0x82, 0xa1, b'a', 0x01, 0xa1, b'b', 0x02]);
    }
}
