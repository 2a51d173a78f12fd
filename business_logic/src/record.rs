//! This module contains the record format: one delimited text line per
//! cycle, `HH:MM:SS,T1,T2,T3`, temperatures carried as integer hundredths.

use arrayvec::ArrayString;
use core::fmt::{self, Write};

use crate::calibration::{SENTINEL_CELSIUS, TemperatureReading};
use crate::timestamp::TimeOfDay;

/// Room for the time, three full-width i32 values and the separators.
pub const RECORD_CAPACITY: usize = 64;

/// Literal written in place of a temperature when the sensor faulted.
pub const FAULT_TOKEN: &str = "FAULT";

/// Number of temperature channels in a record.
pub const CHANNELS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FractionDigits {
    One,
    #[default]
    Two,
}

/// How a negative value is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NegativeStyle {
    /// `-` whenever the value is negative, then absolute integer and fraction.
    #[default]
    Signed,
    /// Integer part from truncating division with its own sign, fraction as
    /// absolute value.  Values in (-1, 0) lose their sign: -37 renders `0.37`.
    Truncating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RecordFormat {
    pub digits: FractionDigits,
    pub negative: NegativeStyle,
}

/// One temperature column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RecordValue {
    Hundredths(i32),
    Fault,
}

impl RecordValue {
    /// Out-of-range readings keep the sentinel; faults get their own token.
    pub fn from_reading(reading: &TemperatureReading) -> Self {
        match reading {
            TemperatureReading::Celsius(c) => RecordValue::Hundredths(to_hundredths(*c)),
            TemperatureReading::OutOfRange => RecordValue::Hundredths(to_hundredths(SENTINEL_CELSIUS)),
            TemperatureReading::SensorFault(_) => RecordValue::Fault,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    FieldCount,
    Time,
    Value,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::FieldCount => f.write_str("wrong number of fields"),
            ParseError::Time => f.write_str("malformed time field"),
            ParseError::Value => f.write_str("malformed temperature field"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Record {
    pub time: TimeOfDay,
    pub values: [RecordValue; CHANNELS],
}

impl Record {
    pub fn new(time: TimeOfDay, readings: &[TemperatureReading; CHANNELS]) -> Self {
        Self {
            time,
            values: readings.map(|r| RecordValue::from_reading(&r)),
        }
    }

    /// Write the line, without terminator, to any text sink.
    pub fn write_to<W: Write>(&self, out: &mut W, format: &RecordFormat) -> fmt::Result {
        write!(out, "{:02}:{:02}:{:02}", self.time.hour, self.time.minute, self.time.second)?;
        for value in &self.values {
            out.write_char(',')?;
            write_value(out, *value, format)?;
        }
        Ok(())
    }

    pub fn render(&self, format: &RecordFormat) -> ArrayString<RECORD_CAPACITY> {
        let mut line = ArrayString::new();
        // The widest possible record is well under RECORD_CAPACITY.
        let _ = self.write_to(&mut line, format);
        line
    }

    /// Read a line back.  Exact for `NegativeStyle::Signed` at the chosen
    /// precision; `Truncating` lines lose the sign of values in (-1, 0).
    pub fn parse(line: &str, format: &RecordFormat) -> Result<Self, ParseError> {
        let mut fields = line.trim_end().split(',');
        let time = parse_time(fields.next().ok_or(ParseError::FieldCount)?)?;
        let mut values = [RecordValue::Fault; CHANNELS];
        for value in values.iter_mut() {
            *value = parse_value(fields.next().ok_or(ParseError::FieldCount)?, format)?;
        }
        if fields.next().is_some() {
            return Err(ParseError::FieldCount);
        }
        Ok(Self { time, values })
    }
}

/// Degrees to hundredths, rounding half away from zero.
pub fn to_hundredths(celsius: f32) -> i32 {
    let scaled = celsius * 100.0;
    if scaled < 0.0 {
        (scaled - 0.5) as i32
    } else {
        (scaled + 0.5) as i32
    }
}

fn write_value<W: Write>(out: &mut W, value: RecordValue, format: &RecordFormat) -> fmt::Result {
    let hundredths = match value {
        RecordValue::Hundredths(v) => v,
        RecordValue::Fault => return out.write_str(FAULT_TOKEN),
    };
    let fraction = (hundredths % 100).unsigned_abs();
    match format.negative {
        NegativeStyle::Signed => {
            if hundredths < 0 {
                out.write_char('-')?;
            }
            write!(out, "{}", (hundredths / 100).unsigned_abs())?;
        }
        NegativeStyle::Truncating => write!(out, "{}", hundredths / 100)?,
    }
    match format.digits {
        FractionDigits::One => write!(out, ".{}", fraction / 10),
        FractionDigits::Two => write!(out, ".{:02}", fraction),
    }
}

fn parse_two_digits(field: &str) -> Result<u8, ParseError> {
    if field.len() != 2 || !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::Time);
    }
    field.parse().map_err(|_| ParseError::Time)
}

fn parse_time(field: &str) -> Result<TimeOfDay, ParseError> {
    let mut parts = field.split(':');
    let mut next = || parts.next().ok_or(ParseError::Time).and_then(parse_two_digits);
    let (hour, minute, second) = (next()?, next()?, next()?);
    if parts.next().is_some() {
        return Err(ParseError::Time);
    }
    TimeOfDay::new(hour, minute, second).map_err(|_| ParseError::Time)
}

fn parse_value(field: &str, format: &RecordFormat) -> Result<RecordValue, ParseError> {
    if field == FAULT_TOKEN {
        return Ok(RecordValue::Fault);
    }
    let (negative, magnitude) = match field.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, field),
    };
    let (integer, fraction) = magnitude.split_once('.').ok_or(ParseError::Value)?;
    let (width, scale) = match format.digits {
        FractionDigits::One => (1, 10),
        FractionDigits::Two => (2, 1),
    };
    let digits_only = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !digits_only(integer) || !digits_only(fraction) || fraction.len() != width {
        return Err(ParseError::Value);
    }
    let integer: i32 = integer.parse().map_err(|_| ParseError::Value)?;
    let fraction: i32 = fraction.parse().map_err(|_| ParseError::Value)?;
    let magnitude = integer
        .checked_mul(100)
        .and_then(|v| v.checked_add(fraction * scale))
        .ok_or(ParseError::Value)?;
    Ok(RecordValue::Hundredths(if negative { -magnitude } else { magnitude }))
}
