use crate::calibration::DividerConfig;
use crate::record::{FractionDigits, NegativeStyle, RecordFormat};

/// Runtime settings of the logger.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LoggerConfig {
    pub divider: DividerConfig,
    pub format: RecordFormat,
    pub settle_delay_ms: u32, // Wait before each channel read so the ADC input settles.
    pub debounce_ms: u32,     // Button edges closer together than this are ignored.
    pub cycle_period_ms: u64, // Time between the start of two cycles.
}

impl LoggerConfig {
    pub const DEFAULT: Self = Self {
        divider: DividerConfig::DEFAULT,
        format: RecordFormat {
            digits: FractionDigits::Two,
            negative: NegativeStyle::Signed,
        },
        settle_delay_ms: 10,
        debounce_ms: 250,
        cycle_period_ms: 1000,
    };

    /// Matches files written by the older one-decimal firmware, including its
    /// sign loss between 0 and -1 °C.
    pub const REFERENCE: Self = Self {
        format: RecordFormat {
            digits: FractionDigits::One,
            negative: NegativeStyle::Truncating,
        },
        ..Self::DEFAULT
    };
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
