use crate::access::schema::MAX_ROW_SIZE;
use crate::error::{DbError, DbResult};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;

/// Payload length used for the `string` type name in catalog files.
pub const DEFAULT_TEXT_LEN: usize = 128;

/// Fixed-width field types supported by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    /// 4-byte signed integer
    Int,
    /// Fixed-length text holding at most `n` bytes of UTF-8
    Text(usize),
}

impl Type {
    /// Number of bytes a value of this type occupies on disk
    pub fn width(&self) -> usize {
        match self {
            Type::Int => 4,
            // length prefix + padded payload
            Type::Text(n) => n.saturating_add(4),
        }
    }

    /// Decode one value of this type from `reader`
    pub fn parse(&self, reader: &mut impl Read) -> DbResult<Field> {
        match self {
            Type::Int => Ok(Field::Int(reader.read_i32::<BigEndian>()?)),
            Type::Text(max) => {
                let len = reader.read_u32::<BigEndian>()? as usize;
                if len > *max {
                    return Err(DbError::Corrupt(format!(
                        "text length {} exceeds field width {}",
                        len, max
                    )));
                }
                let mut buf = vec![0u8; *max];
                reader.read_exact(&mut buf)?;
                buf.truncate(len);
                let s = String::from_utf8(buf)
                    .map_err(|e| DbError::Corrupt(format!("invalid utf-8 text: {}", e)))?;
                Ok(Field::Text(s))
            }
        }
    }

    /// Parse a textual value (as found in delimited input files) into a field
    pub fn parse_str(&self, raw: &str) -> DbResult<Field> {
        match self {
            Type::Int => raw.trim().parse::<i32>().map(Field::Int).map_err(|e| {
                DbError::SchemaMismatch(format!("cannot parse {:?} as INT: {}", raw, e))
            }),
            Type::Text(_) => Ok(Field::Text(raw.to_string())),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "INT"),
            Type::Text(n) => write!(f, "TEXT({})", n),
        }
    }
}

impl FromStr for Type {
    type Err = DbError;

    /// Accepts `int`, `string` and `text(n)`, case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.as_str() {
            "int" | "integer" => Ok(Type::Int),
            "string" | "text" => Ok(Type::Text(DEFAULT_TEXT_LEN)),
            _ => {
                let len = lower
                    .strip_prefix("text(")
                    .and_then(|rest| rest.strip_suffix(')'))
                    .and_then(|n| n.trim().parse::<usize>().ok())
                    .ok_or_else(|| DbError::InvalidSchema(format!("unknown type: {}", s)))?;
                let ty = Type::Text(len);
                if ty.width() > MAX_ROW_SIZE {
                    return Err(DbError::InvalidSchema(format!(
                        "{} is {} bytes wide, a row may use at most {}",
                        ty,
                        ty.width(),
                        MAX_ROW_SIZE
                    )));
                }
                Ok(ty)
            }
        }
    }
}

/// A typed value stored in one field of a tuple
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Int(i32),
    Text(String),
}

impl Field {
    /// Check if this value can be stored in a field of the given type
    pub fn is_compatible_with(&self, ty: Type) -> bool {
        matches!(
            (self, ty),
            (Field::Int(_), Type::Int) | (Field::Text(_), Type::Text(_))
        )
    }

    /// Clip text to the bytes a field of type `ty` can hold, keeping whole
    /// characters. Other values are returned unchanged.
    pub fn fit_to(self, ty: Type) -> Field {
        match (self, ty) {
            (Field::Text(s), Type::Text(max)) if s.len() > max => {
                Field::Text(truncate_utf8(&s, max).to_string())
            }
            (value, _) => value,
        }
    }

    /// Encode this value as `ty`, writing exactly `ty.width()` bytes
    pub fn serialize(&self, ty: Type, writer: &mut impl Write) -> DbResult<()> {
        match (self, ty) {
            (Field::Int(v), Type::Int) => writer.write_i32::<BigEndian>(*v)?,
            (Field::Text(s), Type::Text(max)) => {
                let bytes = truncate_utf8(s, max).as_bytes();
                writer.write_u32::<BigEndian>(bytes.len() as u32)?;
                writer.write_all(bytes)?;
                writer.write_all(&vec![0u8; max - bytes.len()])?;
            }
            _ => {
                return Err(DbError::SchemaMismatch(format!(
                    "value {:?} is not compatible with type {}",
                    self, ty
                )))
            }
        }
        Ok(())
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Int(v) => write!(f, "{}", v),
            Field::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i32> for Field {
    fn from(v: i32) -> Self {
        Field::Int(v)
    }
}

impl From<&str> for Field {
    fn from(v: &str) -> Self {
        Field::Text(v.to_string())
    }
}

impl From<String> for Field {
    fn from(v: String) -> Self {
        Field::Text(v)
    }
}

/// Longest prefix of `s` that fits in `max` bytes without splitting a char
fn truncate_utf8(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
