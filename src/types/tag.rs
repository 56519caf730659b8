use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::SqlEngineError;

/// SQL column/parameter type tags, numbered like the MySQL client ABI.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum TypeTag {
    Decimal,
    Tiny,
    Short,
    Long,
    Float,
    Double,
    Null,
    Timestamp,
    #[value(name = "longlong")]
    #[serde(rename = "longlong")]
    LongLong,
    Int24,
    Date,
    Time,
    #[value(name = "datetime")]
    #[serde(rename = "datetime")]
    DateTime,
    Year,
    #[value(name = "newdate")]
    #[serde(rename = "newdate")]
    NewDate,
    Varchar,
    Bit,
    Json,
    #[value(name = "newdecimal")]
    #[serde(rename = "newdecimal")]
    NewDecimal,
    Enum,
    Set,
    TinyBlob,
    MediumBlob,
    LongBlob,
    Blob,
    VarString,
    String,
    Geometry,
}

/// Temporal shape carried by a [`Representation::Temporal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemporalKind {
    Date,
    Time,
    DateTime,
}

/// Native representation a type tag maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Representation {
    /// No payload; only NULL can be bound.
    Null,
    /// Little-endian two's complement integer of `width` bytes.
    Integer { width: usize },
    /// IEEE-754 float of `width` bytes (4 or 8).
    Float { width: usize },
    /// Fixed-length temporal record.
    Temporal(TemporalKind),
    /// Variable-length UTF-8 text.
    Text,
    /// Variable-length opaque bytes.
    Binary,
}

impl Representation {
    /// Whether values of this kind are passed as raw, variable-length buffers.
    #[must_use]
    pub fn is_variable_length(self) -> bool {
        matches!(self, Representation::Text | Representation::Binary)
    }
}

impl TypeTag {
    /// Numeric code used on the wire.
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            TypeTag::Decimal => 0,
            TypeTag::Tiny => 1,
            TypeTag::Short => 2,
            TypeTag::Long => 3,
            TypeTag::Float => 4,
            TypeTag::Double => 5,
            TypeTag::Null => 6,
            TypeTag::Timestamp => 7,
            TypeTag::LongLong => 8,
            TypeTag::Int24 => 9,
            TypeTag::Date => 10,
            TypeTag::Time => 11,
            TypeTag::DateTime => 12,
            TypeTag::Year => 13,
            TypeTag::NewDate => 14,
            TypeTag::Varchar => 15,
            TypeTag::Bit => 16,
            TypeTag::Json => 245,
            TypeTag::NewDecimal => 246,
            TypeTag::Enum => 247,
            TypeTag::Set => 248,
            TypeTag::TinyBlob => 249,
            TypeTag::MediumBlob => 250,
            TypeTag::LongBlob => 251,
            TypeTag::Blob => 252,
            TypeTag::VarString => 253,
            TypeTag::String => 254,
            TypeTag::Geometry => 255,
        }
    }

    /// Look a tag up by its wire code.
    ///
    /// # Errors
    ///
    /// Returns `SqlEngineError::TypeMappingError` for codes outside the table.
    pub fn from_code(code: u8) -> Result<Self, SqlEngineError> {
        let tag = match code {
            0 => TypeTag::Decimal,
            1 => TypeTag::Tiny,
            2 => TypeTag::Short,
            3 => TypeTag::Long,
            4 => TypeTag::Float,
            5 => TypeTag::Double,
            6 => TypeTag::Null,
            7 => TypeTag::Timestamp,
            8 => TypeTag::LongLong,
            9 => TypeTag::Int24,
            10 => TypeTag::Date,
            11 => TypeTag::Time,
            12 => TypeTag::DateTime,
            13 => TypeTag::Year,
            14 => TypeTag::NewDate,
            15 => TypeTag::Varchar,
            16 => TypeTag::Bit,
            245 => TypeTag::Json,
            246 => TypeTag::NewDecimal,
            247 => TypeTag::Enum,
            248 => TypeTag::Set,
            249 => TypeTag::TinyBlob,
            250 => TypeTag::MediumBlob,
            251 => TypeTag::LongBlob,
            252 => TypeTag::Blob,
            253 => TypeTag::VarString,
            254 => TypeTag::String,
            255 => TypeTag::Geometry,
            other => {
                return Err(SqlEngineError::type_mapping(format!(
                    "unknown type code {other}"
                )));
            }
        };
        Ok(tag)
    }

    /// Native representation for this tag.
    ///
    /// # Errors
    ///
    /// Returns `SqlEngineError::TypeMappingError` for tags with no native
    /// representation.
    pub fn native_type(self) -> Result<Representation, SqlEngineError> {
        let repr = match self {
            TypeTag::Null => Representation::Null,
            TypeTag::Tiny => Representation::Integer { width: 1 },
            TypeTag::Short | TypeTag::Year => Representation::Integer { width: 2 },
            TypeTag::Long | TypeTag::Int24 => Representation::Integer { width: 4 },
            TypeTag::LongLong => Representation::Integer { width: 8 },
            TypeTag::Float => Representation::Float { width: 4 },
            TypeTag::Double => Representation::Float { width: 8 },
            TypeTag::Date | TypeTag::NewDate => Representation::Temporal(TemporalKind::Date),
            TypeTag::Time => Representation::Temporal(TemporalKind::Time),
            TypeTag::DateTime | TypeTag::Timestamp => {
                Representation::Temporal(TemporalKind::DateTime)
            }
            TypeTag::Decimal
            | TypeTag::NewDecimal
            | TypeTag::Varchar
            | TypeTag::VarString
            | TypeTag::String
            | TypeTag::Enum
            | TypeTag::Set
            | TypeTag::Json => Representation::Text,
            TypeTag::TinyBlob
            | TypeTag::MediumBlob
            | TypeTag::LongBlob
            | TypeTag::Blob
            | TypeTag::Bit => Representation::Binary,
            TypeTag::Geometry => {
                return Err(SqlEngineError::type_mapping(format!(
                    "type {self} has no native representation"
                )));
            }
        };
        Ok(repr)
    }

    /// Whether the tag names a numeric decimal column.
    #[must_use]
    pub fn is_decimal(self) -> bool {
        matches!(self, TypeTag::Decimal | TypeTag::NewDecimal)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_possible_value() {
            Some(value) => f.write_str(value.get_name()),
            None => write!(f, "type#{}", self.code()),
        }
    }
}

impl FromStr for TypeTag {
    type Err = SqlEngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Self as ValueEnum>::from_str(s, true)
            .map_err(|_| SqlEngineError::type_mapping(format!("unknown type name '{s}'")))
    }
}
