#![no_std]
#![no_main]

mod diagnostics;
mod fmt;
mod rtclock;
mod sd_storage;
mod status_led;
mod thermistors;

// Use declarations
// External libraries
#[cfg(feature = "defmt-rtt")]
use defmt_rtt as _;
#[cfg(feature = "panic-probe")]
use panic_probe as _;
use embassy_executor::Spawner;
use embassy_stm32::adc::{Adc, AdcChannel};
use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::{Level, Output, Pull, Speed};
use embassy_stm32::rtc::{Rtc, RtcConfig};
use embassy_stm32::spi::{self, Spi};
use embassy_stm32::{time::Hertz, Config};
use embassy_time::{Delay, Duration, Instant, Ticker, Timer};
use embedded_hal_bus::spi::ExclusiveDevice;
use embedded_sdmmc::SdCard;
#[cfg(not(feature = "panic-probe"))]
use panic_halt as _;

// Internal modules, both this crate and the business logic crate.
use business_logic::{Logger, LoggerConfig, ToggleRequest};
use diagnostics::DefmtDiagnostics;
use fmt::{error, info, unwrap, warn};
use rtclock::Rtclock;
use sd_storage::SdStorage;
use status_led::StatusLed;
use thermistors::ThermistorInputs;

// Set by the button task, consumed once per cycle by the main loop.
static TOGGLE: ToggleRequest = ToggleRequest::new();

// Contact chatter after an edge is ignored for this long.
const BUTTON_SETTLE_MS: u64 = 50;

#[embassy_executor::main]
async fn main(spawner: Spawner) {

    // Chip peripheral configuration
    let mut config = Config::default();
    {
        use embassy_stm32::rcc::*;
        use embassy_stm32::rcc::mux::{Adcsel, Clk48sel};

        // Adjust the configuration from the default.
        // Default for Config.rcc is hse=None, hsi=false, SAI1,2=None
        config.rcc.msi = Some(MSIRange::RANGE4M); // Multi-speed Osc. = 4 MHz

        // PLL creates 48 MHz at its output (PLLCLK).
        config.rcc.pll = Some(Pll {
            source: PllSource::MSI,
            prediv: PllPreDiv::DIV1,
            mul: PllMul::MUL24,
            divp: None,
            divq: Some(PllQDiv::DIV2),
            divr: Some(PllRDiv::DIV2), // for sysclk of 48 MHz
        });

        // Clock busses
        config.rcc.sys = Sysclk::PLL1_R; // 48 MHz
        config.rcc.ahb_pre = AHBPrescaler::DIV1; // HCLK = 48 MHz
        config.rcc.apb1_pre = APBPrescaler::DIV1;
        config.rcc.apb2_pre = APBPrescaler::DIV1;

        // Low-speed oscillators.  The RTC runs from the 32.768 kHz crystal so it
        // keeps time on the backup battery.
        config.rcc.ls = LsConfig {
            rtc: RtcClockSource::LSE,
            lsi: false,
            lse: Some(LseConfig { frequency: Hertz(32768), mode: LseMode::Oscillator(LseDrive::Low) }),
        };

        config.rcc.mux.adcsel = Adcsel::SYS;
        config.rcc.mux.clk48sel = Clk48sel::PLLSAI1_Q;
    }
    let p = embassy_stm32::init(config);

    // GPIOs
    let mut led = StatusLed::new(Output::new(p.PB0, Level::Low, Speed::Low));
    let btn = ExtiInput::new(p.PB5, p.EXTI5, Pull::Up);

    // RTC, first-run setup happens when the logger starts.
    let mut rtc = Rtc::new(p.RTC, RtcConfig::default());
    rtc.set_daylight_savings(false);
    let clock = Rtclock::new(rtc);

    // Thermistor dividers on PC0, PC1, PC2.
    let inputs = ThermistorInputs::new(
        Adc::new(p.ADC1),
        [p.PC0.degrade_adc(), p.PC1.degrade_adc(), p.PC2.degrade_adc()],
    );

    // SD card on SPI1.  400 kHz keeps card initialization within spec.
    let mut spi_config = spi::Config::default();
    spi_config.frequency = Hertz(400_000);
    let spi = Spi::new_blocking(p.SPI1, p.PA5, p.PA7, p.PA6, spi_config);
    let cs = Output::new(p.PA4, Level::High, Speed::VeryHigh);
    let sd_spi = unwrap!(ExclusiveDevice::new(spi, cs, Delay));
    let storage = SdStorage::new(SdCard::new(sd_spi, Delay));

    let logger_config = LoggerConfig::default();
    let mut logger = match Logger::start(inputs, clock, storage, DefmtDiagnostics, logger_config) {
        Ok(logger) => logger,
        Err(fault) => {
            error!("Halted: {}", fault);
            led.fault_halt(fault).await
        }
    };

    unwrap!(spawner.spawn(button(btn)));

    warn!("Starting main loop");

    let mut ticker = Ticker::every(Duration::from_millis(logger_config.cycle_period_ms));
    loop {
        match logger.run_cycle(&TOGGLE, &mut Delay).await {
            Ok(outcome) => {
                if let Some(event) = outcome.event {
                    info!("Session event: {}", event);
                    led.acknowledge(event).await;
                }
            }
            Err(err) => warn!("Cycle skipped: {}", err),
        }
        led.show_state(logger.is_logging());
        ticker.next().await;
    }
}

/// Edge handler for the start/stop button.  It only stamps and raises the
/// request; debounce and feedback happen in the main loop.  Waiting for the
/// release keeps a held button from counting twice.
#[embassy_executor::task]
async fn button(mut btn: ExtiInput<'static>) {
    loop {
        btn.wait_for_falling_edge().await;
        TOGGLE.request(Instant::now().as_millis() as u32);
        Timer::after(Duration::from_millis(BUTTON_SETTLE_MS)).await;
        btn.wait_for_rising_edge().await;
        Timer::after(Duration::from_millis(BUTTON_SETTLE_MS)).await;
    }
}
