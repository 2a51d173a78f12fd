//! This module contains the per-cycle business logic: read the clock, apply
//! a pending toggle, sample and convert the three channels, then echo the
//! record and persist it when recording.

use embedded_hal_async::delay::DelayNs;

use crate::calibration::{SensorFault, TemperatureReading, convert_raw};
use crate::config::LoggerConfig;
use crate::fault::Fault;
use crate::ports::{AnalogInput, Channel, Clock, DiagnosticSink, LogStorage};
use crate::record::{CHANNELS, Record};
use crate::session::{SessionController, SessionEvent};
use crate::toggle::ToggleRequest;

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CycleOutcome {
    pub event: Option<SessionEvent>,         // Session change made during this cycle.
    pub readings: [TemperatureReading; CHANNELS],
    pub record: Record,
    pub persisted: bool,                     // The record reached storage.
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CycleError {
    Clock, // The clock could not be read; nothing was sampled.
}

pub struct Logger<A, C, S: LogStorage, D> {
    adc: A,
    clock: C,
    session: SessionController<S>,
    diag: D,
    config: LoggerConfig,
}

impl<A, C, S, D> Logger<A, C, S, D>
where
    A: AnalogInput,
    C: Clock,
    S: LogStorage,
    D: DiagnosticSink,
{
    /// Bring up the clock, then the storage.  The first one missing is a
    /// fault and no logger is built, so nothing is ever logged.
    pub fn start(adc: A, mut clock: C, mut storage: S, mut diag: D, config: LoggerConfig) -> Result<Self, Fault> {
        if clock.initialize().is_err() {
            return Err(report_fault(&mut diag, Fault::ClockNotFound));
        }
        if storage.initialize().is_err() {
            return Err(report_fault(&mut diag, Fault::StorageNotFound));
        }
        diag.line("Logger ready, press the button to start recording");

        Ok(Self {
            adc,
            clock,
            session: SessionController::new(storage, config.debounce_ms),
            diag,
            config,
        })
    }

    pub fn config(&self) -> &LoggerConfig {
        &self.config
    }

    pub fn is_logging(&self) -> bool {
        self.session.is_active()
    }

    pub fn session_name(&self) -> Option<&str> {
        self.session.file_name()
    }

    /// One pass of the main loop.
    pub async fn run_cycle<W: DelayNs>(&mut self, toggle: &ToggleRequest, delay: &mut W) -> Result<CycleOutcome, CycleError> {
        let Ok(now) = self.clock.now() else {
            self.diag.line("Clock read failed, cycle skipped");
            return Err(CycleError::Clock);
        };

        let mut event = self.session.poll(toggle, &now, &mut self.diag);

        let readings = self.sample(delay).await;
        let record = Record::new(now.time_of_day(), &readings);
        let line = record.render(&self.config.format);
        self.diag.line(&line);

        let persisted = match self.session.persist(&line, &mut self.diag) {
            Ok(written) => written,
            Err(_) => {
                event = Some(SessionEvent::Aborted);
                false
            }
        };

        Ok(CycleOutcome { event, readings, record, persisted })
    }

    /// Read and convert every channel, letting the input settle before each
    /// read.
    pub async fn sample<W: DelayNs>(&mut self, delay: &mut W) -> [TemperatureReading; CHANNELS] {
        let mut readings = [TemperatureReading::OutOfRange; CHANNELS];
        for channel in Channel::ALL {
            delay.delay_ms(self.config.settle_delay_ms).await;
            readings[channel.index()] = match self.adc.read_raw(channel) {
                Ok(raw) => convert_raw(raw, &self.config.divider),
                Err(_) => TemperatureReading::SensorFault(SensorFault::ReadFailed),
            };
        }
        readings
    }
}

fn report_fault<D: DiagnosticSink>(diag: &mut D, fault: Fault) -> Fault {
    diag.report(format_args!("Fault: {}", fault));
    fault
}
