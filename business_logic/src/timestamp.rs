use arrayvec::ArrayString;
use core::fmt::{self, Write};

/// Extension of every session file.
const SESSION_FILE_EXTENSION: &str = "CSV";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimestampError {
    InvalidMonth,
    InvalidDay,
    InvalidTime,
}

impl fmt::Display for TimestampError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimestampError::InvalidMonth => f.write_str("month out of range"),
            TimestampError::InvalidDay => f.write_str("day out of range"),
            TimestampError::InvalidTime => f.write_str("time of day out of range"),
        }
    }
}

/// Hour, minute and second of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimeOfDay {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl TimeOfDay {
    pub fn new(hour: u8, minute: u8, second: u8) -> Result<Self, TimestampError> {
        if hour > 23 || minute > 59 || second > 59 {
            return Err(TimestampError::InvalidTime);
        }
        Ok(Self { hour, minute, second })
    }
}

/// Wall-clock reading from the battery-backed clock.  The year is not part of
/// anything the logger writes, so it is not carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DateTime {
    month: u8, // 1-12.
    day: u8,   // 1-31.
    time: TimeOfDay,
}

impl DateTime {
    pub fn new(month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Result<Self, TimestampError> {
        if !(1..=12).contains(&month) {
            return Err(TimestampError::InvalidMonth);
        }
        if !(1..=31).contains(&day) {
            return Err(TimestampError::InvalidDay);
        }
        let time = TimeOfDay::new(hour, minute, second)?;
        Ok(Self { month, day, time })
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    pub fn day(&self) -> u8 {
        self.day
    }

    pub fn time_of_day(&self) -> TimeOfDay {
        self.time
    }

    /// Name of the file a session started at this instant is written to:
    /// `DDMMHHMM.CSV`, an 8.3 short name unique to the minute.
    pub fn session_file_name(&self) -> ArrayString<12> {
        let mut name = ArrayString::<12>::new();
        // Every field is validated to two digits, so the name always fits.
        let _ = write!(
            &mut name,
            "{:02}{:02}{:02}{:02}.{}",
            self.day, self.month, self.time.hour, self.time.minute, SESSION_FILE_EXTENSION
        );
        name
    }
}
