// Type mapping table
//
// - tag: SQL type tags and the native representation each maps to
// - value: the `RowValues` enum shared by parameters and result rows
// - temporal: fixed temporal record bound for date/time types
// - wire: encoding values into native buffers and decoding column buffers

mod tag;
mod temporal;
mod value;
mod wire;

pub use tag::{Representation, TemporalKind, TypeTag};
pub use temporal::{TEMPORAL_WIRE_LEN, TemporalRecord};
pub use value::RowValues;
pub use wire::{ColumnMeta, RowFormat, decode_value, wire_value};

pub(crate) use wire::text_bytes;
