//! Unrecoverable start-up faults.  Each maps to the number of LED pulses the
//! firmware repeats forever once it has halted.

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Fault {
    ClockNotFound,
    StorageNotFound,
}

impl Fault {
    /// Pulses per repetition of the fault pattern.
    pub const fn blink_code(self) -> u8 {
        match self {
            Fault::ClockNotFound => 1,
            Fault::StorageNotFound => 2,
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fault::ClockNotFound => write!(f, "clock not found (code {})", self.blink_code()),
            Fault::StorageNotFound => write!(f, "storage not found (code {})", self.blink_code()),
        }
    }
}
