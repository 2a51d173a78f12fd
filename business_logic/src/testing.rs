//! In-memory ports for the unit tests.

use std::collections::{BTreeMap, VecDeque};
use std::string::{String, ToString};
use std::vec::Vec;

use embedded_hal_async::delay::DelayNs;

use crate::ports::{AnalogInput, Channel, Clock, DiagnosticSink, LogStorage};
use crate::timestamp::DateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockError;

#[derive(Debug)]
pub struct MemoryHandle {
    id: usize,
    name: String,
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    pub fail_init: bool,
    pub fail_open: bool,
    pub fail_append: bool,
    pub fail_close: bool,
    pub initialized: bool,
    pub opens: usize,
    pub appends: usize,
    pub(crate) open_ids: Vec<usize>,
    pub(crate) files: BTreeMap<String, Vec<String>>,
}

impl MemoryStorage {
    pub fn open_streams(&self) -> usize {
        self.open_ids.len()
    }

    pub fn lines(&self, name: &str) -> Vec<String> {
        self.files.get(name).cloned().unwrap_or_default()
    }

    pub fn file_names(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }
}

impl LogStorage for MemoryStorage {
    type Handle = MemoryHandle;
    type Error = MockError;

    fn initialize(&mut self) -> Result<(), MockError> {
        if self.fail_init {
            return Err(MockError);
        }
        self.initialized = true;
        Ok(())
    }

    fn open(&mut self, name: &str) -> Result<MemoryHandle, MockError> {
        if self.fail_open {
            return Err(MockError);
        }
        self.opens += 1;
        let id = self.opens;
        self.open_ids.push(id);
        self.files.entry(name.to_string()).or_default();
        Ok(MemoryHandle { id, name: name.to_string() })
    }

    fn append(&mut self, handle: &mut MemoryHandle, line: &str) -> Result<(), MockError> {
        assert!(self.open_ids.contains(&handle.id), "append to a closed stream");
        if self.fail_append {
            return Err(MockError);
        }
        self.appends += 1;
        self.files.entry(handle.name.clone()).or_default().push(line.to_string());
        Ok(())
    }

    fn close(&mut self, handle: MemoryHandle) -> Result<(), MockError> {
        self.open_ids.retain(|id| *id != handle.id);
        if self.fail_close {
            return Err(MockError);
        }
        Ok(())
    }
}

/// Clock returning a fixed time unless told otherwise.
#[derive(Debug)]
pub struct FixedClock {
    pub now: DateTime,
    pub fail_init: bool,
    pub fail_now: bool,
}

impl FixedClock {
    pub fn new(now: DateTime) -> Self {
        Self { now, fail_init: false, fail_now: false }
    }
}

impl Clock for FixedClock {
    type Error = MockError;

    fn initialize(&mut self) -> Result<(), MockError> {
        if self.fail_init { Err(MockError) } else { Ok(()) }
    }

    fn now(&mut self) -> Result<DateTime, MockError> {
        if self.fail_now { Err(MockError) } else { Ok(self.now) }
    }
}

/// ADC returning queued readings per channel, then the last one forever.
#[derive(Debug, Default)]
pub struct ScriptedAdc {
    queued: [VecDeque<Result<u16, MockError>>; 3],
    last: [u16; 3],
    pub reads: Vec<Channel>,
}

impl ScriptedAdc {
    pub fn constant(raw: [u16; 3]) -> Self {
        Self { last: raw, ..Default::default() }
    }

    pub fn push(&mut self, channel: Channel, reading: Result<u16, MockError>) {
        self.queued[channel.index()].push_back(reading);
    }
}

impl AnalogInput for ScriptedAdc {
    type Error = MockError;

    fn read_raw(&mut self, channel: Channel) -> Result<u16, MockError> {
        self.reads.push(channel);
        let i = channel.index();
        match self.queued[i].pop_front() {
            Some(Ok(raw)) => {
                self.last[i] = raw;
                Ok(raw)
            }
            Some(Err(err)) => Err(err),
            None => Ok(self.last[i]),
        }
    }
}

#[derive(Debug, Default)]
pub struct RecordingSink {
    pub lines: Vec<String>,
}

impl DiagnosticSink for RecordingSink {
    fn line(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }
}

/// Delay that returns immediately and remembers what was asked of it.
#[derive(Debug, Default)]
pub struct CountingDelay {
    pub total_ns: u64,
    pub calls: usize,
}

impl DelayNs for CountingDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
        self.calls += 1;
    }
}
