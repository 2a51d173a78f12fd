//! Capabilities the logger consumes from the board.  The firmware implements
//! these over the chip peripherals; the tests implement them in memory.

use arrayvec::ArrayString;
use core::fmt::{self, Write};

use crate::timestamp::DateTime;

/// Longest diagnostic notice; longer ones are cut short.
const NOTICE_CAPACITY: usize = 64;

/// One of the three thermistor inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    One,
    Two,
    Three,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::One, Channel::Two, Channel::Three];

    pub fn index(self) -> usize {
        match self {
            Channel::One => 0,
            Channel::Two => 1,
            Channel::Three => 2,
        }
    }
}

/// Blocking analog input, counts in [0, 1023).
pub trait AnalogInput {
    type Error;

    fn read_raw(&mut self, channel: Channel) -> Result<u16, Self::Error>;
}

/// Battery-backed wall clock.
pub trait Clock {
    type Error;

    /// First-run setup.  Fails when the clock device is absent.
    fn initialize(&mut self) -> Result<(), Self::Error>;

    fn now(&mut self) -> Result<DateTime, Self::Error>;
}

/// Removable storage holding one text file per session.
pub trait LogStorage {
    type Handle;
    type Error;

    /// Detect and mount the medium.  Fails when it is absent.
    fn initialize(&mut self) -> Result<(), Self::Error>;

    /// Open `name` for appending, creating it if needed.
    fn open(&mut self, name: &str) -> Result<Self::Handle, Self::Error>;

    /// Append one line; the implementation adds the terminator.
    fn append(&mut self, handle: &mut Self::Handle, line: &str) -> Result<(), Self::Error>;

    /// Flush and close.  The handle is consumed either way.
    fn close(&mut self, handle: Self::Handle) -> Result<(), Self::Error>;
}

/// Best-effort line output for humans.  Never fails.
pub trait DiagnosticSink {
    fn line(&mut self, line: &str);

    /// Format a short notice and send it as one line.
    fn report(&mut self, args: fmt::Arguments<'_>) {
        let mut notice = ArrayString::<NOTICE_CAPACITY>::new();
        let _ = notice.write_fmt(args);
        self.line(&notice);
    }
}

impl<T: AnalogInput + ?Sized> AnalogInput for &mut T {
    type Error = T::Error;

    fn read_raw(&mut self, channel: Channel) -> Result<u16, Self::Error> {
        T::read_raw(self, channel)
    }
}

impl<T: Clock + ?Sized> Clock for &mut T {
    type Error = T::Error;

    fn initialize(&mut self) -> Result<(), Self::Error> {
        T::initialize(self)
    }

    fn now(&mut self) -> Result<DateTime, Self::Error> {
        T::now(self)
    }
}

impl<T: LogStorage + ?Sized> LogStorage for &mut T {
    type Handle = T::Handle;
    type Error = T::Error;

    fn initialize(&mut self) -> Result<(), Self::Error> {
        T::initialize(self)
    }

    fn open(&mut self, name: &str) -> Result<Self::Handle, Self::Error> {
        T::open(self, name)
    }

    fn append(&mut self, handle: &mut Self::Handle, line: &str) -> Result<(), Self::Error> {
        T::append(self, handle, line)
    }

    fn close(&mut self, handle: Self::Handle) -> Result<(), Self::Error> {
        T::close(self, handle)
    }
}

impl<T: DiagnosticSink + ?Sized> DiagnosticSink for &mut T {
    fn line(&mut self, line: &str) {
        T::line(self, line)
    }
}
