//! This module contains the thermistor conversion: raw ADC counts to
//! resistance through the voltage divider, then resistance to temperature
//! through an inverse lookup in the calibration table.

use core::fmt;

/// Temperature of table index 0, in °C.  Index `i` is `i + TEMP_OFFSET` °C.
pub const TEMP_OFFSET: i16 = -80;

/// Number of entries in the calibration table (-80 °C to 299 °C).
pub const TABLE_LEN: usize = 380;

/// Weak-contract value for "unknown reading".
pub const SENTINEL_CELSIUS: f32 = -9999.0;

/// Resistance in ohms of the 10 kΩ NTC (B = 3950) at each whole degree,
/// strictly decreasing as the index increases.
#[allow(clippy::excessive_precision)]
pub const CALIBRATION_TABLE: [f32; TABLE_LEN] = [
    13421958.05, 12080093.06, 10884124.68, 9816990.95, 8863758.25, 8011339.96, 7248254.30, 6564415.68, // -80 °C
    5950954.63, 5400062.25, 4904855.66, 4459261.38, 4057914.36, 3696070.16, 3369528.71, 3074567.97, // -72 °C
    2807886.05, 2566550.87, 2347956.02, 2149782.38, 1969964.35, 1806660.43, 1658227.26, 1523197.00, // -64 °C
    1400257.31, 1288233.81, 1186074.66, 1092836.88, 1007674.39, 929827.35, 858612.82, 793416.43, // -56 °C
    733685.03, 678920.21, 628672.50, 582536.20, 540144.91, 501167.38, 465303.96, 432283.34, // -48 °C
    401859.72, 373810.23, 347932.61, 324043.24, 301975.23, 281576.83, 262709.96, 245248.87, // -40 °C
    229078.96, 214095.75, 200203.90, 187316.35, 175353.57, 164242.82, 153917.57, 144316.94, // -32 °C
    135385.12, 127070.98, 119327.64, 112112.05, 105384.69, 99109.27, 93252.39, 87783.38, // -24 °C
    82673.95, 77898.11, 73431.86, 69253.12, 65341.48, 61678.14, 58245.71, 55028.16, // -16 °C
    52010.63, 49179.41, 46521.80, 44026.05, 41681.25, 39477.34, 37404.94, 35455.38, // -8 °C
    33620.60, 31893.14, 30266.03, 28732.84, 27287.54, 25924.56, 24638.71, 23425.14, // 0 °C
    22279.34, 21197.13, 20174.58, 19208.04, 18294.10, 17429.59, 16611.53, 15837.15, // 8 °C
    15103.85, 14409.22, 13750.98, 13127.01, 12535.33, 11974.06, 11441.48, 10935.95, // 16 °C
    10455.94, 10000.00, 9566.80, 9155.06, 8763.61, 8391.31, 8037.14, 7700.10, // 24 °C
    7379.26, 7073.76, 6782.77, 6505.53, 6241.30, 5989.41, 5749.21, 5520.08, // 32 °C
    5301.47, 5092.82, 4893.63, 4703.42, 4521.73, 4348.14, 4182.23, 4023.64, // 40 °C
    3871.99, 3726.95, 3588.18, 3455.39, 3328.29, 3206.60, 3090.07, 2978.44, // 48 °C
    2871.48, 2768.98, 2670.72, 2576.51, 2486.16, 2399.50, 2316.34, 2236.53, // 56 °C
    2159.93, 2086.37, 2015.74, 1947.88, 1882.70, 1820.05, 1759.84, 1701.95, // 64 °C
    1646.28, 1592.74, 1541.24, 1491.68, 1443.99, 1398.08, 1353.88, 1311.32, // 72 °C
    1270.32, 1230.83, 1192.77, 1156.10, 1120.75, 1086.67, 1053.81, 1022.11, // 80 °C
    991.54, 962.04, 933.58, 906.10, 879.58, 853.98, 829.25, 805.37, // 88 °C
    782.30, 760.00, 738.46, 717.65, 697.52, 678.06, 659.25, 641.05, // 96 °C
    623.45, 606.42, 589.94, 573.99, 558.55, 543.61, 529.14, 515.13, // 104 °C
    501.56, 488.41, 475.68, 463.34, 451.38, 439.79, 428.55, 417.65, // 112 °C
    407.09, 396.84, 386.91, 377.26, 367.91, 358.83, 350.02, 341.47, // 120 °C
    333.17, 325.12, 317.29, 309.69, 302.31, 295.14, 288.17, 281.40, // 128 °C
    274.83, 268.43, 262.22, 256.18, 250.30, 244.59, 239.03, 233.63, // 136 °C
    228.38, 223.26, 218.29, 213.45, 208.73, 204.15, 199.68, 195.34, // 144 °C
    191.10, 186.98, 182.97, 179.06, 175.25, 171.54, 167.93, 164.40, // 152 °C
    160.97, 157.62, 154.36, 151.18, 148.08, 145.06, 142.11, 139.24, // 160 °C
    136.43, 133.70, 131.03, 128.43, 125.89, 123.41, 120.99, 118.63, // 168 °C
    116.32, 114.07, 111.87, 109.73, 107.63, 105.59, 103.59, 101.64, // 176 °C
    99.73, 97.87, 96.05, 94.27, 92.53, 90.83, 89.17, 87.55, // 184 °C
    85.96, 84.41, 82.89, 81.41, 79.95, 78.54, 77.15, 75.79, // 192 °C
    74.46, 73.16, 71.89, 70.65, 69.43, 68.24, 67.07, 65.93, // 200 °C
    64.81, 63.72, 62.65, 61.60, 60.57, 59.56, 58.58, 57.61, // 208 °C
    56.67, 55.74, 54.83, 53.95, 53.08, 52.22, 51.39, 50.57, // 216 °C
    49.76, 48.98, 48.20, 47.45, 46.70, 45.98, 45.26, 44.56, // 224 °C
    43.88, 43.21, 42.55, 41.90, 41.26, 40.64, 40.03, 39.43, // 232 °C
    38.84, 38.27, 37.70, 37.14, 36.60, 36.06, 35.54, 35.02, // 240 °C
    34.51, 34.02, 33.53, 33.05, 32.58, 32.12, 31.66, 31.22, // 248 °C
    30.78, 30.35, 29.92, 29.51, 29.10, 28.70, 28.31, 27.92, // 256 °C
    27.54, 27.17, 26.80, 26.44, 26.08, 25.73, 25.39, 25.05, // 264 °C
    24.72, 24.40, 24.08, 23.76, 23.45, 23.15, 22.85, 22.55, // 272 °C
    22.26, 21.98, 21.70, 21.42, 21.15, 20.88, 20.62, 20.36, // 280 °C
    20.11, 19.86, 19.61, 19.37, 19.13, 18.90, 18.66, 18.44, // 288 °C
    18.21, 17.99, 17.78, 17.56, // 296 °C
];

/// Why a channel produced no usable resistance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorFault {
    Shorted,           // Raw reading of 0: the divider voltage is zero.
    Saturated,         // Raw reading at the rail: open sensor or disconnected.
    InvalidResistance, // Negative or non-finite resistance handed to the converter.
    ReadFailed,        // The ADC itself reported an error.
}

impl fmt::Display for SensorFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorFault::Shorted => f.write_str("sensor shorted"),
            SensorFault::Saturated => f.write_str("sensor open or saturated"),
            SensorFault::InvalidResistance => f.write_str("invalid resistance"),
            SensorFault::ReadFailed => f.write_str("ADC read failed"),
        }
    }
}

/// Result of converting one channel.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TemperatureReading {
    Celsius(f32),
    OutOfRange,
    SensorFault(SensorFault),
}

impl TemperatureReading {
    /// Collapse to the legacy single-float contract: -9999.0 when unknown.
    pub fn celsius_or_sentinel(&self) -> f32 {
        self.celsius().unwrap_or(SENTINEL_CELSIUS)
    }

    pub fn celsius(&self) -> Option<f32> {
        match self {
            TemperatureReading::Celsius(c) => Some(*c),
            _ => None,
        }
    }
}

/// Voltage divider feeding the ADC: thermistor to ground, reference
/// resistor to the supply.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DividerConfig {
    pub supply_volts: f32,   // Vin.
    pub reference_ohms: f32, // R2, the fixed resistor.
    pub adc_full_scale: u16, // Counts corresponding to Vin (1024 for 10 bits).
}

impl DividerConfig {
    pub const DEFAULT: Self = Self {
        supply_volts: 5.0,
        reference_ohms: 10_000.0,
        adc_full_scale: 1024,
    };
}

impl Default for DividerConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Convert a raw ADC count to thermistor resistance in ohms.
///
/// `V = raw / full_scale * Vin` and `R = R2 / (Vin / V - 1)`.  A zero reading
/// would divide by zero in `Vin / V`, and a reading at the rail drives the
/// outer denominator to zero, so both are reported as faults.
pub fn analog_to_resistance(raw: u16, divider: &DividerConfig) -> Result<f32, SensorFault> {
    if raw == 0 {
        return Err(SensorFault::Shorted);
    }
    if raw >= divider.adc_full_scale.saturating_sub(1) {
        return Err(SensorFault::Saturated);
    }
    let v_therm = f32::from(raw) / f32::from(divider.adc_full_scale) * divider.supply_volts;
    let denominator = divider.supply_volts / v_therm - 1.0;
    if denominator <= 0.0 {
        return Err(SensorFault::Saturated);
    }
    Ok(divider.reference_ohms / denominator)
}

/// Inverse lookup of a resistance in the calibration table.
pub fn resistance_to_temperature(resistance: f32) -> TemperatureReading {
    lookup(&CALIBRATION_TABLE, resistance)
}

/// Raw count straight to a reading.
pub fn convert_raw(raw: u16, divider: &DividerConfig) -> TemperatureReading {
    match analog_to_resistance(raw, divider) {
        Ok(resistance) => resistance_to_temperature(resistance),
        Err(fault) => TemperatureReading::SensorFault(fault),
    }
}

pub fn table_is_strictly_decreasing(table: &[f32]) -> bool {
    table.windows(2).all(|pair| pair[0] > pair[1])
}

fn lookup(table: &[f32], resistance: f32) -> TemperatureReading {
    if !resistance.is_finite() || resistance < 0.0 {
        return TemperatureReading::SensorFault(SensorFault::InvalidResistance);
    }
    let Some((&coldest, _)) = table.split_first() else {
        return TemperatureReading::OutOfRange;
    };
    if resistance > coldest {
        return TemperatureReading::OutOfRange;
    }

    // First entry the input has dropped below brackets it with its predecessor.
    for i in 1..table.len() {
        if table[i] < resistance {
            let upper = table[i - 1];
            let lower = table[i];
            let fraction = (upper - resistance) / (upper - lower);
            let index = (i - 1) as f32 + fraction;
            return TemperatureReading::Celsius(index + f32::from(TEMP_OFFSET));
        }
    }

    // Nothing below it: only the hottest entry itself is still in range.
    match table.last() {
        Some(&hottest) if resistance == hottest => {
            TemperatureReading::Celsius((table.len() - 1) as f32 + f32::from(TEMP_OFFSET))
        }
        _ => TemperatureReading::OutOfRange,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f32 = 1e-3;

    fn celsius(reading: TemperatureReading) -> f32 {
        match reading {
            TemperatureReading::Celsius(c) => c,
            other => panic!("expected a temperature, got {:?}", other),
        }
    }

    #[test]
    fn test_table_is_monotonic() {
        assert!(table_is_strictly_decreasing(&CALIBRATION_TABLE));
        assert!(!table_is_strictly_decreasing(&[3.0, 2.0, 2.0, 1.0]));
    }

    #[test]
    fn test_exact_table_entries_have_no_interpolation_error() {
        for (i, &r) in CALIBRATION_TABLE.iter().enumerate() {
            let expected = i as f32 + f32::from(TEMP_OFFSET);
            let t = celsius(resistance_to_temperature(r));
            assert!((t - expected).abs() < TOLERANCE, "index {}: {} != {}", i, t, expected);
        }
    }

    #[test]
    fn test_interpolates_between_entries() {
        // Halfway between 25 °C and 26 °C in resistance.
        let r = (CALIBRATION_TABLE[105] + CALIBRATION_TABLE[106]) / 2.0;
        let t = celsius(resistance_to_temperature(r));
        assert!((t - 25.5).abs() < TOLERANCE);
    }

    #[test]
    fn test_colder_than_table_is_out_of_range() {
        for r in [CALIBRATION_TABLE[0] + 1.0, 2.0e7, 1.0e9, f32::MAX] {
            let reading = resistance_to_temperature(r);
            assert_eq!(reading, TemperatureReading::OutOfRange);
            assert_eq!(reading.celsius_or_sentinel(), -9999.0);
        }
    }

    #[test]
    fn test_hotter_than_table_is_out_of_range() {
        let hottest = CALIBRATION_TABLE[TABLE_LEN - 1];
        assert_eq!(resistance_to_temperature(hottest - 0.5), TemperatureReading::OutOfRange);
        assert_eq!(resistance_to_temperature(0.0), TemperatureReading::OutOfRange);
        assert!((celsius(resistance_to_temperature(hottest)) - 299.0).abs() < TOLERANCE);
    }

    #[test]
    fn test_invalid_resistance_is_a_fault_not_a_sentinel() {
        for r in [f32::NAN, f32::INFINITY, -1.0] {
            let reading = resistance_to_temperature(r);
            assert_eq!(reading, TemperatureReading::SensorFault(SensorFault::InvalidResistance));
            assert_eq!(reading.celsius(), None);
            assert_eq!(reading.celsius_or_sentinel(), SENTINEL_CELSIUS);
        }
        assert_eq!(resistance_to_temperature(CALIBRATION_TABLE[0]).celsius(), Some(-80.0));
    }

    #[test]
    fn test_mid_scale_reading_is_reference_resistance() {
        let divider = DividerConfig::default();
        assert_eq!(analog_to_resistance(512, &divider), Ok(10_000.0));
        let t = celsius(convert_raw(512, &divider));
        assert!((t - 25.0).abs() < TOLERANCE);
    }

    #[test]
    fn test_divider_guards() {
        let divider = DividerConfig::default();
        assert_eq!(analog_to_resistance(0, &divider), Err(SensorFault::Shorted));
        assert_eq!(analog_to_resistance(1023, &divider), Err(SensorFault::Saturated));
        assert_eq!(analog_to_resistance(1024, &divider), Err(SensorFault::Saturated));
        assert_eq!(convert_raw(0, &divider), TemperatureReading::SensorFault(SensorFault::Shorted));
        // Just below the rail is still a finite resistance.
        let r = analog_to_resistance(1022, &divider).unwrap();
        assert!(r.is_finite() && r > 0.0);
    }

    #[test]
    fn test_low_counts_are_hot() {
        let divider = DividerConfig::default();
        let cold = celsius(convert_raw(800, &divider));
        let hot = celsius(convert_raw(200, &divider));
        assert!(hot > cold);
    }
}
