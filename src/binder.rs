use std::borrow::Cow;

use crate::error::SqlEngineError;
use crate::types::{Representation, RowValues, TypeTag, text_bytes, wire_value};

/// Buffer handed to the driver for one positional parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum BindBuffer<'a> {
    /// SQL NULL; no payload.
    Null,
    /// Fixed-width native encoding (integer, float or temporal record).
    Scalar(Vec<u8>),
    /// Variable-length text/binary payload, borrowed from the caller when possible.
    Raw(Cow<'a, [u8]>),
}

/// Wire-ready binding for one positional parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeBinding<'a> {
    /// Type the driver should bind as; `TypeTag::Null` for null sentinels.
    pub buffer_type: TypeTag,
    pub buffer: BindBuffer<'a>,
    pub is_unsigned: bool,
}

impl NativeBinding<'_> {
    #[must_use]
    pub fn null() -> Self {
        Self {
            buffer_type: TypeTag::Null,
            buffer: BindBuffer::Null,
            is_unsigned: false,
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self.buffer, BindBuffer::Null)
    }

    /// Payload bytes, or `None` for NULL.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match &self.buffer {
            BindBuffer::Null => None,
            BindBuffer::Scalar(bytes) => Some(bytes),
            BindBuffer::Raw(bytes) => Some(bytes),
        }
    }

    /// Detach from the caller's values.
    #[must_use]
    pub fn into_owned(self) -> NativeBinding<'static> {
        let buffer = match self.buffer {
            BindBuffer::Null => BindBuffer::Null,
            BindBuffer::Scalar(bytes) => BindBuffer::Scalar(bytes),
            BindBuffer::Raw(bytes) => BindBuffer::Raw(Cow::Owned(bytes.into_owned())),
        };
        NativeBinding {
            buffer_type: self.buffer_type,
            buffer,
            is_unsigned: self.is_unsigned,
        }
    }
}

/// Convert ordered `(declared type, value)` pairs into positional bindings.
///
/// Null sentinels always produce a NULL-typed binding, whatever their declared
/// type. Text and binary payloads borrow from `values` instead of copying.
///
/// ```rust
/// use sql_stmt_engine::prelude::*;
///
/// let values = vec![RowValues::Int(7), RowValues::from(None::<String>)];
/// let bindings = bind(&[TypeTag::Long, TypeTag::Varchar], &values)?;
/// assert_eq!(bindings[0].as_bytes(), Some(&7_i32.to_le_bytes()[..]));
/// assert!(bindings[1].is_null());
/// # Ok::<(), SqlEngineError>(())
/// ```
///
/// # Errors
///
/// Returns `SqlEngineError::InterfaceError` when the two slices differ in
/// length and `SqlEngineError::TypeMappingError` when a value cannot be
/// represented as its declared type.
pub fn bind<'a>(
    param_types: &[TypeTag],
    values: &'a [RowValues],
) -> Result<Vec<NativeBinding<'a>>, SqlEngineError> {
    if param_types.len() != values.len() {
        return Err(SqlEngineError::interface(format!(
            "length mismatch: {} parameter types, {} values",
            param_types.len(),
            values.len()
        )));
    }

    let mut bindings = Vec::with_capacity(values.len());
    for (position, (tag, value)) in param_types.iter().zip(values).enumerate() {
        let binding = bind_one(*tag, value).map_err(|err| match err {
            SqlEngineError::TypeMappingError(msg) => {
                SqlEngineError::TypeMappingError(format!("parameter {}: {msg}", position + 1))
            }
            other => other,
        })?;
        tracing::trace!(position, buffer_type = %binding.buffer_type, null = binding.is_null(), "bound parameter");
        bindings.push(binding);
    }
    Ok(bindings)
}

fn bind_one(tag: TypeTag, value: &RowValues) -> Result<NativeBinding<'_>, SqlEngineError> {
    if value.is_null() {
        return Ok(NativeBinding::null());
    }
    let repr = tag.native_type()?;
    if !repr.is_variable_length() {
        return Ok(NativeBinding {
            buffer_type: tag,
            buffer: BindBuffer::Scalar(wire_value(tag, repr, value)?),
            is_unsigned: matches!(value, RowValues::UInt(_)),
        });
    }
    let buffer = match (repr, value) {
        (Representation::Text, _) => BindBuffer::Raw(text_bytes(tag, value)?),
        (_, RowValues::Blob(bytes)) => BindBuffer::Raw(Cow::Borrowed(bytes.as_slice())),
        (_, RowValues::Text(s)) => BindBuffer::Raw(Cow::Borrowed(s.as_bytes())),
        _ => BindBuffer::Raw(Cow::Owned(wire_value(tag, repr, value)?)),
    };
    Ok(NativeBinding {
        buffer_type: tag,
        buffer,
        is_unsigned: matches!(value, RowValues::UInt(_)),
    })
}
