use crate::types::{
    error::DatabaseError,
    value::{DataType, Value},
};

/// Append the marshaled form of `value`: INT as 4 little-endian bytes, TEXT
/// as a 2-byte length followed by the UTF-8 bytes, BOOLEAN as one byte.
pub fn encode_value(value: &Value, buffer: &mut Vec<u8>) {
    match value {
        Value::Int(n) => buffer.extend_from_slice(&n.to_le_bytes()),
        Value::Text(s) => {
            buffer.extend_from_slice(&(s.len() as u16).to_le_bytes());
            buffer.extend_from_slice(s.as_bytes());
        }
        Value::Boolean(b) => buffer.push(u8::from(*b)),
    }
}

/// Decode one value of `data_type` starting at `*cursor`, advancing it.
pub fn decode_value(
    data_type: DataType,
    bytes: &[u8],
    cursor: &mut usize,
) -> Result<Value, DatabaseError> {
    let value = match data_type {
        DataType::Int => {
            let raw = take(bytes, cursor, 4, "INT")?;
            Value::Int(i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
        }
        DataType::Text => {
            let raw = take(bytes, cursor, 2, "TEXT length")?;
            let length = u16::from_le_bytes([raw[0], raw[1]]) as usize;
            let raw = take(bytes, cursor, length, "TEXT data")?;
            let text = String::from_utf8(raw.to_vec()).map_err(|_| {
                DatabaseError::Serialization {
                    details: "Invalid UTF-8 in TEXT value".to_string(),
                }
            })?;
            Value::Text(text)
        }
        DataType::Boolean => {
            let raw = take(bytes, cursor, 1, "BOOLEAN")?;
            match raw[0] {
                0 => Value::Boolean(false),
                1 => Value::Boolean(true),
                other => {
                    return Err(DatabaseError::Serialization {
                        details: format!("Invalid BOOLEAN byte: {}", other),
                    });
                }
            }
        }
    };
    Ok(value)
}

/// Marshal values in the given order into one record.
pub fn marshal_values<'v, I>(values: I) -> Vec<u8>
where
    I: IntoIterator<Item = &'v Value>,
{
    let mut buffer = Vec::new();
    for value in values {
        encode_value(value, &mut buffer);
    }
    buffer
}

/// Reverse of [`marshal_values`]. The record must be consumed exactly.
pub fn unmarshal_values(types: &[DataType], bytes: &[u8]) -> Result<Vec<Value>, DatabaseError> {
    let mut cursor = 0;
    let values = types
        .iter()
        .map(|&data_type| decode_value(data_type, bytes, &mut cursor))
        .collect::<Result<Vec<_>, _>>()?;

    if cursor != bytes.len() {
        return Err(DatabaseError::Serialization {
            details: format!(
                "{} trailing bytes after {} values",
                bytes.len() - cursor,
                types.len()
            ),
        });
    }
    Ok(values)
}

fn take<'b>(
    bytes: &'b [u8],
    cursor: &mut usize,
    length: usize,
    what: &str,
) -> Result<&'b [u8], DatabaseError> {
    let end = *cursor + length;
    if end > bytes.len() {
        return Err(DatabaseError::Serialization {
            details: format!(
                "Insufficient bytes for {}: expected {}, got {}",
                what,
                length,
                bytes.len() - *cursor
            ),
        });
    }
    let slice = &bytes[*cursor..end];
    *cursor = end;
    Ok(slice)
}
