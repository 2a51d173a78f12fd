//! This module contains the logging session state machine.  The controller
//! owns the storage port and the open stream, so only one stream can ever
//! be open and nothing else can write to it.

use arrayvec::ArrayString;
use core::fmt;

use crate::ports::{DiagnosticSink, LogStorage};
use crate::timestamp::DateTime;
use crate::toggle::ToggleRequest;

type FileName = ArrayString<12>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionState {
    Inactive,
    Active,
}

/// What a cycle did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionEvent {
    Started,     // Inactive -> Active.
    Stopped,     // Active -> Inactive on request.
    Aborted,     // Active -> Inactive after a failed write.
    StartFailed, // Storage refused to open; still Inactive.
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionError {
    AlreadyActive,
    NotActive,
    OpenFailed,
    WriteFailed,
    CloseFailed,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::AlreadyActive => f.write_str("recording already active"),
            SessionError::NotActive => f.write_str("not recording"),
            SessionError::OpenFailed => f.write_str("storage open failed"),
            SessionError::WriteFailed => f.write_str("storage write failed, recording stopped"),
            SessionError::CloseFailed => f.write_str("storage close failed"),
        }
    }
}

enum Session<H> {
    Inactive,
    Active { handle: H, name: FileName },
}

pub struct SessionController<S: LogStorage> {
    storage: S,
    session: Session<S::Handle>,
    debounce_ms: u32,            // Minimum time between two accepted button edges.
    last_edge_ms: Option<u32>,   // Edge time of the last accepted toggle.
}

impl<S: LogStorage> SessionController<S> {
    pub fn new(storage: S, debounce_ms: u32) -> Self {
        Self {
            storage,
            session: Session::Inactive,
            debounce_ms,
            last_edge_ms: None,
        }
    }

    pub fn state(&self) -> SessionState {
        match self.session {
            Session::Inactive => SessionState::Inactive,
            Session::Active { .. } => SessionState::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state() == SessionState::Active
    }

    /// Name of the open file, if recording.
    pub fn file_name(&self) -> Option<&str> {
        match &self.session {
            Session::Active { name, .. } => Some(name.as_str()),
            Session::Inactive => None,
        }
    }

    fn active_name(&self) -> Option<FileName> {
        match &self.session {
            Session::Active { name, .. } => Some(*name),
            Session::Inactive => None,
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Open a stream named after `now`.  Rejected while already recording.
    pub fn start(&mut self, now: &DateTime) -> Result<SessionEvent, SessionError> {
        if self.is_active() {
            return Err(SessionError::AlreadyActive);
        }
        let name = now.session_file_name();
        let handle = self.storage.open(&name).map_err(|_| SessionError::OpenFailed)?;
        self.session = Session::Active { handle, name };
        Ok(SessionEvent::Started)
    }

    /// Flush and close the stream.  The session ends even if closing fails.
    pub fn stop(&mut self) -> Result<SessionEvent, SessionError> {
        match core::mem::replace(&mut self.session, Session::Inactive) {
            Session::Active { handle, .. } => {
                self.storage.close(handle).map_err(|_| SessionError::CloseFailed)?;
                Ok(SessionEvent::Stopped)
            }
            Session::Inactive => Err(SessionError::NotActive),
        }
    }

    /// Consume a pending toggle, if any, and apply it.  Edges closer than
    /// the debounce window to the last accepted edge are dropped, however
    /// late the cycle sees them.
    pub fn poll<D: DiagnosticSink>(&mut self, toggle: &ToggleRequest, now: &DateTime, diag: &mut D) -> Option<SessionEvent> {
        let edge_ms = toggle.take()?;
        if let Some(last) = self.last_edge_ms {
            if edge_ms.wrapping_sub(last) < self.debounce_ms {
                diag.line("Toggle ignored (debounce)");
                return None;
            }
        }
        self.last_edge_ms = Some(edge_ms);

        if self.is_active() {
            let name = self.active_name().unwrap_or_default();
            match self.stop() {
                Ok(event) => {
                    diag.report(format_args!("Recording stopped: {}", name));
                    Some(event)
                }
                Err(err) => {
                    diag.report(format_args!("Recording stopped: {} ({})", name, err));
                    Some(SessionEvent::Stopped)
                }
            }
        } else {
            match self.start(now) {
                Ok(event) => {
                    let name = self.file_name().unwrap_or_default();
                    diag.report(format_args!("Recording started: {}", name));
                    Some(event)
                }
                Err(err) => {
                    diag.report(format_args!("Recording not started: {}", err));
                    Some(SessionEvent::StartFailed)
                }
            }
        }
    }

    /// Append a line when recording.  Returns whether it was written.  A
    /// failed write closes the stream and ends the session.
    pub fn persist<D: DiagnosticSink>(&mut self, line: &str, diag: &mut D) -> Result<bool, SessionError> {
        let Session::Active { handle, .. } = &mut self.session else {
            return Ok(false);
        };
        if self.storage.append(handle, line).is_ok() {
            return Ok(true);
        }
        if let Session::Active { handle, name } = core::mem::replace(&mut self.session, Session::Inactive) {
            let _ = self.storage.close(handle);
            diag.report(format_args!("{}: {}", name, SessionError::WriteFailed));
        }
        Err(SessionError::WriteFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryStorage, RecordingSink};

    fn at(minute: u8) -> DateTime {
        DateTime::new(6, 19, 9, minute, 0).unwrap()
    }

    #[test]
    fn test_start_and_stop() {
        let mut ctl = SessionController::new(MemoryStorage::default(), 0);
        assert_eq!(ctl.state(), SessionState::Inactive);
        assert_eq!(ctl.start(&at(42)), Ok(SessionEvent::Started));
        assert_eq!(ctl.file_name(), Some("19060942.CSV"));
        assert_eq!(ctl.storage().open_streams(), 1);
        assert_eq!(ctl.stop(), Ok(SessionEvent::Stopped));
        assert_eq!(ctl.storage().open_streams(), 0);
        assert_eq!(ctl.file_name(), None);
    }

    #[test]
    fn test_start_while_active_is_rejected() {
        let mut ctl = SessionController::new(MemoryStorage::default(), 0);
        ctl.start(&at(1)).unwrap();
        assert_eq!(ctl.start(&at(2)), Err(SessionError::AlreadyActive));
        assert_eq!(ctl.storage().open_streams(), 1);
        assert_eq!(ctl.storage().opens, 1);
        assert_eq!(ctl.file_name(), Some("19060901.CSV"));
    }

    #[test]
    fn test_stop_while_inactive_is_rejected() {
        let mut ctl = SessionController::new(MemoryStorage::default(), 0);
        assert_eq!(ctl.stop(), Err(SessionError::NotActive));
    }

    #[test]
    fn test_open_failure_stays_inactive() {
        let storage = MemoryStorage { fail_open: true, ..Default::default() };
        let mut ctl = SessionController::new(storage, 0);
        let mut diag = RecordingSink::default();
        let toggle = ToggleRequest::new();
        toggle.request(0);
        assert_eq!(ctl.poll(&toggle, &at(0), &mut diag), Some(SessionEvent::StartFailed));
        assert_eq!(ctl.state(), SessionState::Inactive);
        assert_eq!(diag.lines, ["Recording not started: storage open failed"]);
        assert_eq!(ctl.persist("00:00:00,1.00,2.00,3.00", &mut diag), Ok(false));
    }

    #[test]
    fn test_close_failure_still_ends_session() {
        let storage = MemoryStorage { fail_close: true, ..Default::default() };
        let mut ctl = SessionController::new(storage, 0);
        ctl.start(&at(3)).unwrap();
        assert_eq!(ctl.stop(), Err(SessionError::CloseFailed));
        assert!(!ctl.is_active());
    }

    #[test]
    fn test_poll_without_request_does_nothing() {
        let mut ctl = SessionController::new(MemoryStorage::default(), 0);
        let mut diag = RecordingSink::default();
        assert_eq!(ctl.poll(&ToggleRequest::new(), &at(0), &mut diag), None);
        assert!(diag.lines.is_empty());
    }

    #[test]
    fn test_many_presses_one_transition() {
        let mut ctl = SessionController::new(MemoryStorage::default(), 0);
        let mut diag = RecordingSink::default();
        let toggle = ToggleRequest::new();
        for ms in 0..7 {
            toggle.request(1000 + ms);
        }
        assert_eq!(ctl.poll(&toggle, &at(5), &mut diag), Some(SessionEvent::Started));
        assert_eq!(ctl.poll(&toggle, &at(5), &mut diag), None);
        assert!(ctl.is_active());
        assert_eq!(ctl.storage().opens, 1);
        assert_eq!(diag.lines, ["Recording started: 19060905.CSV"]);
    }

    #[test]
    fn test_debounce_window() {
        let mut ctl = SessionController::new(MemoryStorage::default(), 250);
        let mut diag = RecordingSink::default();
        let toggle = ToggleRequest::new();

        toggle.request(10_000);
        assert_eq!(ctl.poll(&toggle, &at(0), &mut diag), Some(SessionEvent::Started));
        // Bounce 100 ms after the press.
        toggle.request(10_100);
        assert_eq!(ctl.poll(&toggle, &at(0), &mut diag), None);
        assert!(ctl.is_active());
        // A real press later on.
        toggle.request(10_400);
        assert_eq!(ctl.poll(&toggle, &at(0), &mut diag), Some(SessionEvent::Stopped));
        assert_eq!(
            diag.lines,
            [
                "Recording started: 19060900.CSV",
                "Toggle ignored (debounce)",
                "Recording stopped: 19060900.CSV",
            ]
        );
    }

    #[test]
    fn test_release_bounce_seen_on_a_later_cycle_is_ignored() {
        let mut ctl = SessionController::new(MemoryStorage::default(), 250);
        let mut diag = RecordingSink::default();
        let toggle = ToggleRequest::new();

        toggle.request(5_000);
        assert_eq!(ctl.poll(&toggle, &at(1), &mut diag), Some(SessionEvent::Started));
        // Release chatter lands just after the cycle boundary and waits a
        // whole cycle before it is polled.
        toggle.request(5_120);
        assert_eq!(ctl.poll(&toggle, &at(1), &mut diag), None);
        assert!(ctl.is_active());
        assert_eq!(ctl.storage().opens, 1);
    }

    #[test]
    fn test_debounce_survives_uptime_wrap() {
        let mut ctl = SessionController::new(MemoryStorage::default(), 250);
        let mut diag = RecordingSink::default();
        let toggle = ToggleRequest::new();

        toggle.request(u32::MAX - 50);
        assert_eq!(ctl.poll(&toggle, &at(2), &mut diag), Some(SessionEvent::Started));
        toggle.request(49);
        assert_eq!(ctl.poll(&toggle, &at(2), &mut diag), None);
        toggle.request(300);
        assert_eq!(ctl.poll(&toggle, &at(2), &mut diag), Some(SessionEvent::Stopped));
    }

    #[test]
    fn test_persist_only_when_active() {
        let mut ctl = SessionController::new(MemoryStorage::default(), 0);
        let mut diag = RecordingSink::default();
        assert_eq!(ctl.persist("a", &mut diag), Ok(false));
        ctl.start(&at(7)).unwrap();
        assert_eq!(ctl.persist("b", &mut diag), Ok(true));
        ctl.stop().unwrap();
        assert_eq!(ctl.persist("c", &mut diag), Ok(false));
        assert_eq!(ctl.storage().lines("19060907.CSV"), ["b"]);
    }

    #[test]
    fn test_write_failure_aborts_session() {
        let storage = MemoryStorage { fail_append: true, ..Default::default() };
        let mut ctl = SessionController::new(storage, 0);
        let mut diag = RecordingSink::default();
        ctl.start(&at(8)).unwrap();
        assert_eq!(ctl.persist("x", &mut diag), Err(SessionError::WriteFailed));
        assert!(!ctl.is_active());
        assert_eq!(ctl.storage().open_streams(), 0);
        assert_eq!(diag.lines, ["19060908.CSV: storage write failed, recording stopped"]);
    }
}
