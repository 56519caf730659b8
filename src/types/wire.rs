use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use super::tag::{Representation, TemporalKind, TypeTag};
use super::temporal::TemporalRecord;
use super::value::RowValues;
use crate::error::SqlEngineError;

/// How a driver renders raw column buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowFormat {
    /// Textual rendering, as produced by plain (non-prepared) queries.
    #[default]
    Text,
    /// Native binary encoding, as produced by prepared statements.
    Binary,
}

/// Metadata for one result column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMeta {
    pub name: String,
    pub type_tag: TypeTag,
    /// Declared display length.
    pub length: u64,
    pub nullable: bool,
    pub unsigned: bool,
    /// Binary collation; blob-typed columns without it hold text.
    pub binary: bool,
    pub decimals: u8,
}

impl ColumnMeta {
    #[must_use]
    pub fn new(name: impl Into<String>, type_tag: TypeTag) -> Self {
        Self {
            name: name.into(),
            type_tag,
            length: 0,
            nullable: true,
            unsigned: false,
            binary: false,
            decimals: 0,
        }
    }

    #[must_use]
    pub fn with_length(mut self, length: u64) -> Self {
        self.length = length;
        self
    }

    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    #[must_use]
    pub fn unsigned(mut self) -> Self {
        self.unsigned = true;
        self
    }

    #[must_use]
    pub fn binary(mut self) -> Self {
        self.binary = true;
        self
    }
}

/// Encode a non-null value into the native buffer for `repr`.
///
/// # Errors
///
/// Returns `SqlEngineError::TypeMappingError` when the value cannot be
/// represented (wrong kind, out of range, or NULL passed to a typed slot).
pub fn wire_value(
    tag: TypeTag,
    repr: Representation,
    value: &RowValues,
) -> Result<Vec<u8>, SqlEngineError> {
    match repr {
        Representation::Null => Err(SqlEngineError::type_mapping(format!(
            "cannot bind {} as {tag}",
            value.variant_name()
        ))),
        Representation::Integer { width } => encode_integer(tag, width, value),
        Representation::Float { width } => encode_float(tag, width, value),
        Representation::Temporal(kind) => {
            Ok(TemporalRecord::from_value(kind, value)?.to_wire().to_vec())
        }
        Representation::Text => Ok(text_bytes(tag, value)?.into_owned()),
        Representation::Binary => match value {
            RowValues::Blob(bytes) => Ok(bytes.clone()),
            RowValues::Text(s) => Ok(s.as_bytes().to_vec()),
            other => Err(mismatch(tag, other)),
        },
    }
}

/// Textual payload for a value bound to a text-represented tag.
///
/// Strings are borrowed; numbers and JSON are rendered.
pub(crate) fn text_bytes<'a>(
    tag: TypeTag,
    value: &'a RowValues,
) -> Result<std::borrow::Cow<'a, [u8]>, SqlEngineError> {
    use std::borrow::Cow;
    match value {
        RowValues::Text(s) => Ok(Cow::Borrowed(s.as_bytes())),
        RowValues::JSON(json) => Ok(Cow::Owned(json.to_string().into_bytes())),
        RowValues::Int(i) => Ok(Cow::Owned(i.to_string().into_bytes())),
        RowValues::UInt(u) => Ok(Cow::Owned(u.to_string().into_bytes())),
        RowValues::Float(f) if tag.is_decimal() => Ok(Cow::Owned(f.to_string().into_bytes())),
        other => Err(mismatch(tag, other)),
    }
}

fn encode_integer(tag: TypeTag, width: usize, value: &RowValues) -> Result<Vec<u8>, SqlEngineError> {
    let bits = u32::try_from(width * 8).unwrap_or(64);
    // A signed value must fit the signed range of the width, an unsigned one
    // the unsigned range; the native flag carries the signedness.
    let (v, min, max): (i128, i128, i128) = match value {
        RowValues::Int(i) => (
            i128::from(*i),
            -(1_i128 << (bits - 1)),
            (1_i128 << (bits - 1)) - 1,
        ),
        RowValues::UInt(u) => (i128::from(*u), 0, (1_i128 << bits) - 1),
        RowValues::Bool(b) => (i128::from(*b), 0, 1),
        other => return Err(mismatch(tag, other)),
    };
    if v < min || v > max {
        let signedness = if matches!(value, RowValues::UInt(_)) { "unsigned" } else { "signed" };
        return Err(SqlEngineError::type_mapping(format!(
            "value {v} does not fit {signedness} {tag} ({width} bytes)"
        )));
    }
    Ok(v.to_le_bytes()[..width].to_vec())
}

/// Largest integer magnitude a float of `width` bytes holds exactly.
fn exact_integer_limit(width: usize) -> u64 {
    if width == 4 { 1 << f32::MANTISSA_DIGITS } else { 1 << f64::MANTISSA_DIGITS }
}

fn encode_float(tag: TypeTag, width: usize, value: &RowValues) -> Result<Vec<u8>, SqlEngineError> {
    let v = match value {
        RowValues::Float(f) => *f,
        RowValues::Int(i) => {
            if i.unsigned_abs() > exact_integer_limit(width) {
                return Err(SqlEngineError::type_mapping(format!(
                    "integer {i} is not exactly representable as {tag} ({width} bytes)"
                )));
            }
            *i as f64
        }
        other => return Err(mismatch(tag, other)),
    };
    if width == 4 {
        if v.is_finite() && (v < f64::from(f32::MIN) || v > f64::from(f32::MAX)) {
            return Err(SqlEngineError::type_mapping(format!(
                "value {v} is out of range for {tag} ({width} bytes)"
            )));
        }
        Ok((v as f32).to_le_bytes().to_vec())
    } else {
        Ok(v.to_le_bytes().to_vec())
    }
}

fn mismatch(tag: TypeTag, value: &RowValues) -> SqlEngineError {
    SqlEngineError::type_mapping(format!("cannot bind {} as {tag}", value.variant_name()))
}

/// Decode one raw column buffer into a typed value. `None` is SQL NULL.
///
/// # Errors
///
/// Returns `SqlEngineError::TypeMappingError` if the buffer does not match the
/// column's declared type.
pub fn decode_value(
    column: &ColumnMeta,
    raw: Option<&[u8]>,
    format: RowFormat,
) -> Result<RowValues, SqlEngineError> {
    let Some(raw) = raw else {
        return Ok(RowValues::Null);
    };
    let repr = column.type_tag.native_type()?;
    match (repr, format) {
        (Representation::Null, _) => Ok(RowValues::Null),
        (Representation::Text, _) => decode_text(column, raw),
        (Representation::Binary, _) => Ok(decode_binary(column, raw)),
        (Representation::Integer { width }, RowFormat::Binary) => {
            decode_integer(column, width, raw)
        }
        (Representation::Float { width }, RowFormat::Binary) => decode_float(column, width, raw),
        (Representation::Temporal(kind), RowFormat::Binary) => {
            TemporalRecord::from_wire(raw)?.into_value(kind)
        }
        (Representation::Integer { .. }, RowFormat::Text) => {
            let s = utf8(column, raw)?;
            if column.unsigned {
                s.parse::<u64>().map(RowValues::UInt).map_err(|e| bad(column, e))
            } else {
                s.parse::<i64>().map(RowValues::Int).map_err(|e| bad(column, e))
            }
        }
        (Representation::Float { .. }, RowFormat::Text) => utf8(column, raw)?
            .parse::<f64>()
            .map(RowValues::Float)
            .map_err(|e| bad(column, e)),
        (Representation::Temporal(kind), RowFormat::Text) => {
            parse_temporal_text(column, kind, utf8(column, raw)?)
        }
    }
}

fn decode_text(column: &ColumnMeta, raw: &[u8]) -> Result<RowValues, SqlEngineError> {
    let s = utf8(column, raw)?;
    if column.type_tag == TypeTag::Json {
        return serde_json::from_str(s)
            .map(RowValues::JSON)
            .map_err(|e| bad(column, e));
    }
    Ok(RowValues::Text(s.to_string()))
}

fn decode_binary(column: &ColumnMeta, raw: &[u8]) -> RowValues {
    if !column.binary {
        if let Ok(s) = std::str::from_utf8(raw) {
            return RowValues::Text(s.to_string());
        }
    }
    RowValues::Blob(raw.to_vec())
}

fn decode_integer(column: &ColumnMeta, width: usize, raw: &[u8]) -> Result<RowValues, SqlEngineError> {
    if raw.len() != width {
        return Err(SqlEngineError::type_mapping(format!(
            "column '{}': expected {width} byte integer, got {} bytes",
            column.name,
            raw.len()
        )));
    }
    let mut buf = [0_u8; 8];
    buf[..width].copy_from_slice(raw);
    if column.unsigned {
        return Ok(RowValues::UInt(u64::from_le_bytes(buf)));
    }
    // sign-extend
    if raw[width - 1] & 0x80 != 0 {
        for b in &mut buf[width..] {
            *b = 0xff;
        }
    }
    Ok(RowValues::Int(i64::from_le_bytes(buf)))
}

fn decode_float(column: &ColumnMeta, width: usize, raw: &[u8]) -> Result<RowValues, SqlEngineError> {
    match (width, raw.len()) {
        (4, 4) => Ok(RowValues::Float(f64::from(f32::from_le_bytes([
            raw[0], raw[1], raw[2], raw[3],
        ])))),
        (8, 8) => {
            let mut buf = [0_u8; 8];
            buf.copy_from_slice(raw);
            Ok(RowValues::Float(f64::from_le_bytes(buf)))
        }
        _ => Err(SqlEngineError::type_mapping(format!(
            "column '{}': expected {width} byte float, got {} bytes",
            column.name,
            raw.len()
        ))),
    }
}

/// Textual zero date; decodes to NULL like its binary form.
const ZERO_DATE_TEXT: &str = "0000-00-00";

fn parse_temporal_text(
    column: &ColumnMeta,
    kind: TemporalKind,
    s: &str,
) -> Result<RowValues, SqlEngineError> {
    if kind != TemporalKind::Time && s.starts_with(ZERO_DATE_TEXT) {
        return Ok(RowValues::Null);
    }
    match kind {
        TemporalKind::Date => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(RowValues::Date)
            .map_err(|e| bad(column, e)),
        TemporalKind::Time => NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
            .map(RowValues::Time)
            .map_err(|e| bad(column, e)),
        TemporalKind::DateTime => NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
            .map(RowValues::Timestamp)
            .map_err(|e| bad(column, e)),
    }
}

fn utf8<'a>(column: &ColumnMeta, raw: &'a [u8]) -> Result<&'a str, SqlEngineError> {
    std::str::from_utf8(raw).map_err(|e| bad(column, e))
}

fn bad(column: &ColumnMeta, err: impl std::fmt::Display) -> SqlEngineError {
    SqlEngineError::type_mapping(format!(
        "column '{}' ({}): {err}",
        column.name, column.type_tag
    ))
}
