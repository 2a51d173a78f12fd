//! The single status LED: lit while recording, short flashes to acknowledge
//! the button, and a repeating pulse code once a fatal fault has halted the
//! logger.

use embassy_stm32::gpio::Output;
use embassy_time::{Duration, Timer};

use business_logic::{Fault, SessionEvent};

const PULSE: Duration = Duration::from_millis(200);
const FAULT_PAUSE: Duration = Duration::from_millis(1500);

pub struct StatusLed {
    led: Output<'static>,
}

impl StatusLed {
    pub fn new(led: Output<'static>) -> Self {
        Self { led }
    }

    pub fn show_state(&mut self, logging: bool) {
        if logging {
            self.led.set_high();
        } else {
            self.led.set_low();
        }
    }

    /// Button feedback, run from the main loop rather than the edge handler.
    pub async fn acknowledge(&mut self, event: SessionEvent) {
        let flashes = match event {
            SessionEvent::Started | SessionEvent::Stopped => 1,
            SessionEvent::Aborted | SessionEvent::StartFailed => 3,
        };
        self.pulses(flashes).await;
    }

    /// Repeat the fault's pulse code forever.
    pub async fn fault_halt(mut self, fault: Fault) -> ! {
        loop {
            self.pulses(fault.blink_code()).await;
            Timer::after(FAULT_PAUSE).await;
        }
    }

    async fn pulses(&mut self, count: u8) {
        for _ in 0..count {
            self.led.set_high();
            Timer::after(PULSE).await;
            self.led.set_low();
            Timer::after(PULSE).await;
        }
    }
}
