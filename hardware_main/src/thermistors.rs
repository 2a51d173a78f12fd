//! The three thermistor dividers on ADC1, read at 10 bits.

use core::convert::Infallible;

use embassy_stm32::adc::{Adc, AnyAdcChannel, Resolution, SampleTime};
use embassy_stm32::peripherals::ADC1;

use business_logic::ports::{AnalogInput, Channel};

pub struct ThermistorInputs {
    adc: Adc<'static, ADC1>,
    channels: [AnyAdcChannel<ADC1>; 3], // In the order of Channel::ALL.
}

impl ThermistorInputs {
    pub fn new(mut adc: Adc<'static, ADC1>, channels: [AnyAdcChannel<ADC1>; 3]) -> Self {
        adc.set_resolution(Resolution::BITS10); // Counts 0-1023, as the divider math expects.
        adc.set_sample_time(SampleTime::CYCLES247_5); // High-impedance dividers need a long sample time.
        Self { adc, channels }
    }
}

impl AnalogInput for ThermistorInputs {
    type Error = Infallible;

    fn read_raw(&mut self, channel: Channel) -> Result<u16, Infallible> {
        Ok(self.adc.blocking_read(&mut self.channels[channel.index()]))
    }
}
