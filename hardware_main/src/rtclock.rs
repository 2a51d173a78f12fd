//! Battery-backed RTC as the logger's clock.  A key in a backup register
//! marks that the date has been set once, so later power cycles keep the
//! running time.

use embassy_stm32::rtc::{DateTime as RtcDateTime, DayOfWeek, Rtc, RtcError};

use business_logic::ports::Clock;
use business_logic::timestamp::{DateTime, TimestampError};
use crate::fmt::{info, warn};

const RTC_BACKUP_KEY_INDEX: usize = 0; // Index to RTC backup register where the key is stored
const RTC_BACKUP_KEY_VALUE: u32 = 0xA53C4B69; // Value stored at RTC_BACKUP_KEY_INDEX once the date has been set

// Date the clock starts from on the very first power-up.
const FIRST_RUN_DATE: (u16, u8, u8, DayOfWeek, u8, u8, u8) = (2025, 6, 19, DayOfWeek::Thursday, 9, 42, 0);

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockError {
    Rtc(RtcError),
    InvalidFirstRunDate,
    InvalidReading(TimestampError),
}

impl From<RtcError> for ClockError {
    fn from(err: RtcError) -> Self {
        ClockError::Rtc(err)
    }
}

pub struct Rtclock {
    rtc: Rtc,
}

impl Rtclock {
    pub fn new(rtc: Rtc) -> Self {
        Self { rtc }
    }

    /// Check if the date was set by an earlier run.
    pub fn is_running(rtc: &Rtc) -> bool {
        rtc.read_backup_register(RTC_BACKUP_KEY_INDEX).unwrap_or(0) == RTC_BACKUP_KEY_VALUE
    }
}

impl Clock for Rtclock {
    type Error = ClockError;

    fn initialize(&mut self) -> Result<(), ClockError> {
        if Rtclock::is_running(&self.rtc) {
            info!("RTC is running, keeping the stored time");
        } else {
            info!("RTC not running, setting the first-run date...");
            let (year, month, day, dow, hour, minute, second) = FIRST_RUN_DATE;
            let first_run = RtcDateTime::from(year, month, day, dow, hour, minute, second)
                .map_err(|_| ClockError::InvalidFirstRunDate)?;
            self.rtc.set_datetime(first_run)?;
            self.rtc.write_backup_register(RTC_BACKUP_KEY_INDEX, RTC_BACKUP_KEY_VALUE);
        }
        // A clock that can not be read back is treated as absent.
        self.now().map(|_| ()).inspect_err(|_| warn!("RTC did not answer"))
    }

    fn now(&mut self) -> Result<DateTime, ClockError> {
        let now = self.rtc.now()?;
        DateTime::new(now.month(), now.day(), now.hour(), now.minute(), now.second())
            .map_err(ClockError::InvalidReading)
    }
}
