use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use super::tag::TemporalKind;
use super::value::RowValues;
use crate::error::SqlEngineError;

/// Encoded size of a [`TemporalRecord`].
pub const TEMPORAL_WIRE_LEN: usize = 12;

/// Fixed native temporal record bound for DATE, TIME, DATETIME and TIMESTAMP.
///
/// Layout (little endian): year `u16`, month, day, hour, minute, second,
/// negative flag, microseconds `u32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TemporalRecord {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub microsecond: u32,
    pub negative: bool,
}

impl TemporalRecord {
    /// # Errors
    ///
    /// Returns `SqlEngineError::TypeMappingError` for years outside `0..=9999`.
    pub fn from_date(date: NaiveDate) -> Result<Self, SqlEngineError> {
        let year = u16::try_from(date.year())
            .ok()
            .filter(|y| *y <= 9999)
            .ok_or_else(|| {
                SqlEngineError::type_mapping(format!("year {} out of range", date.year()))
            })?;
        Ok(Self {
            year,
            month: narrow(date.month()),
            day: narrow(date.day()),
            ..Self::default()
        })
    }

    #[must_use]
    pub fn from_time(time: NaiveTime) -> Self {
        Self {
            hour: narrow(time.hour()),
            minute: narrow(time.minute()),
            second: narrow(time.second()),
            microsecond: time.nanosecond() / 1_000,
            ..Self::default()
        }
    }

    /// # Errors
    ///
    /// Returns `SqlEngineError::TypeMappingError` for years outside `0..=9999`.
    pub fn from_datetime(dt: NaiveDateTime) -> Result<Self, SqlEngineError> {
        let date = Self::from_date(dt.date())?;
        let time = Self::from_time(dt.time());
        Ok(Self {
            hour: time.hour,
            minute: time.minute,
            second: time.second,
            microsecond: time.microsecond,
            ..date
        })
    }

    /// Build a record from a value, checking that the value's shape fits `kind`.
    ///
    /// # Errors
    ///
    /// Returns `SqlEngineError::TypeMappingError` when the value is not temporal
    /// or does not fit the requested kind.
    pub fn from_value(kind: TemporalKind, value: &RowValues) -> Result<Self, SqlEngineError> {
        match (kind, value) {
            (TemporalKind::Date, RowValues::Date(date)) => Self::from_date(*date),
            (TemporalKind::DateTime, RowValues::Timestamp(dt)) => Self::from_datetime(*dt),
            (TemporalKind::DateTime, RowValues::Date(date)) => Self::from_date(*date),
            (TemporalKind::Time, RowValues::Time(time)) => Ok(Self::from_time(*time)),
            (kind, other) => Err(SqlEngineError::type_mapping(format!(
                "cannot bind {} as {kind:?}",
                other.variant_name()
            ))),
        }
    }

    /// The MySQL zero date `0000-00-00`, with any time of day.
    #[must_use]
    pub fn is_zero_date(&self) -> bool {
        self.year == 0 && self.month == 0 && self.day == 0
    }

    /// Convert back into a typed value of the given kind.
    ///
    /// A zero date in a DATE or DATETIME column has no calendar value and
    /// becomes `RowValues::Null`.
    ///
    /// # Errors
    ///
    /// Returns `SqlEngineError::TypeMappingError` when the fields do not form a
    /// valid calendar value (partial zero dates such as `2024-00-00`, negative
    /// times).
    pub fn into_value(self, kind: TemporalKind) -> Result<RowValues, SqlEngineError> {
        if kind != TemporalKind::Time && self.is_zero_date() {
            return Ok(RowValues::Null);
        }
        match kind {
            TemporalKind::Date => Ok(RowValues::Date(self.date()?)),
            TemporalKind::Time => Ok(RowValues::Time(self.time()?)),
            TemporalKind::DateTime => Ok(RowValues::Timestamp(NaiveDateTime::new(
                self.date()?,
                self.time()?,
            ))),
        }
    }

    fn date(&self) -> Result<NaiveDate, SqlEngineError> {
        NaiveDate::from_ymd_opt(
            i32::from(self.year),
            u32::from(self.month),
            u32::from(self.day),
        )
        .ok_or_else(|| {
            SqlEngineError::type_mapping(format!(
                "invalid date {:04}-{:02}-{:02}",
                self.year, self.month, self.day
            ))
        })
    }

    fn time(&self) -> Result<NaiveTime, SqlEngineError> {
        if self.negative {
            return Err(SqlEngineError::type_mapping(
                "negative time intervals are not representable",
            ));
        }
        NaiveTime::from_hms_micro_opt(
            u32::from(self.hour),
            u32::from(self.minute),
            u32::from(self.second),
            self.microsecond,
        )
        .ok_or_else(|| {
            SqlEngineError::type_mapping(format!(
                "invalid time {:02}:{:02}:{:02}.{:06}",
                self.hour, self.minute, self.second, self.microsecond
            ))
        })
    }

    #[must_use]
    pub fn to_wire(&self) -> [u8; TEMPORAL_WIRE_LEN] {
        let mut out = [0_u8; TEMPORAL_WIRE_LEN];
        out[0..2].copy_from_slice(&self.year.to_le_bytes());
        out[2] = self.month;
        out[3] = self.day;
        out[4] = self.hour;
        out[5] = self.minute;
        out[6] = self.second;
        out[7] = u8::from(self.negative);
        out[8..12].copy_from_slice(&self.microsecond.to_le_bytes());
        out
    }

    /// # Errors
    ///
    /// Returns `SqlEngineError::TypeMappingError` if `bytes` is not exactly
    /// [`TEMPORAL_WIRE_LEN`] long.
    pub fn from_wire(bytes: &[u8]) -> Result<Self, SqlEngineError> {
        let bytes: &[u8; TEMPORAL_WIRE_LEN] = bytes.try_into().map_err(|_| {
            SqlEngineError::type_mapping(format!(
                "temporal record must be {TEMPORAL_WIRE_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self {
            year: u16::from_le_bytes([bytes[0], bytes[1]]),
            month: bytes[2],
            day: bytes[3],
            hour: bytes[4],
            minute: bytes[5],
            second: bytes[6],
            negative: bytes[7] != 0,
            microsecond: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
        })
    }
}

// chrono guarantees calendar fields fit in a byte.
fn narrow(v: u32) -> u8 {
    u8::try_from(v).unwrap_or(u8::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn datetime_survives_wire_encoding() {
        let dt = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_micro_opt(10, 30, 0, 250)
            .unwrap();
        let record = TemporalRecord::from_datetime(dt).unwrap();
        let decoded = TemporalRecord::from_wire(&record.to_wire()).unwrap();
        assert_eq!(decoded, record);
        assert_eq!(
            decoded.into_value(TemporalKind::DateTime).unwrap(),
            RowValues::Timestamp(dt)
        );
    }

    #[test]
    fn date_into_datetime_is_midnight() {
        let date = NaiveDate::from_ymd_opt(1999, 12, 31).unwrap();
        let record = TemporalRecord::from_value(TemporalKind::DateTime, &RowValues::Date(date))
            .unwrap();
        assert_eq!(record.hour, 0);
        assert_eq!(record.year, 1999);
    }

    #[test]
    fn rejects_mismatched_shapes() {
        let time = NaiveTime::from_hms_opt(1, 2, 3).unwrap();
        assert!(TemporalRecord::from_value(TemporalKind::Date, &RowValues::Time(time)).is_err());
        assert!(TemporalRecord::from_value(TemporalKind::Time, &RowValues::Int(3)).is_err());
    }

    #[test]
    fn zero_date_decodes_to_null() {
        let record = TemporalRecord::default();
        assert!(record.is_zero_date());
        assert_eq!(record.into_value(TemporalKind::Date).unwrap(), RowValues::Null);
        assert_eq!(record.into_value(TemporalKind::DateTime).unwrap(), RowValues::Null);
        assert_eq!(
            record.into_value(TemporalKind::Time).unwrap(),
            RowValues::Time(NaiveTime::MIN)
        );
    }

    #[test]
    fn partial_zero_date_is_rejected() {
        let record = TemporalRecord { year: 2024, ..TemporalRecord::default() };
        assert!(!record.is_zero_date());
        assert!(record.into_value(TemporalKind::Date).is_err());
        assert!(TemporalRecord::from_wire(&[0_u8; 5]).is_err());
    }
}
