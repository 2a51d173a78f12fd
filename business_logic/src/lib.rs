#![cfg_attr(not(test), no_std)]

//! Hardware-independent core of the thermistor logger: conversion of raw
//! thermistor readings to temperature, the record format, and the start/stop
//! session state machine driven by the button.

pub mod calibration;
pub mod config;
pub mod fault;
pub mod logger;
pub mod ports;
pub mod record;
pub mod session;
pub mod timestamp;
pub mod toggle;

#[cfg(test)]
mod testing;

pub use calibration::{SENTINEL_CELSIUS, SensorFault, TemperatureReading};
pub use config::LoggerConfig;
pub use fault::Fault;
pub use logger::{CycleError, CycleOutcome, Logger};
pub use session::{SessionEvent, SessionState};
pub use toggle::ToggleRequest;
