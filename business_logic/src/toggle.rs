//! Single-slot start/stop request shared between the button edge handler and
//! the main cycle.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Pending toggle flag plus the uptime of the latest edge.  Any number of
/// requests before the next cycle collapse into one.
#[derive(Debug, Default)]
pub struct ToggleRequest {
    pending: AtomicBool,
    edge_ms: AtomicU32, // Uptime of the latest edge, wraps after ~49 days.
}

impl ToggleRequest {
    pub const fn new() -> Self {
        Self {
            pending: AtomicBool::new(false),
            edge_ms: AtomicU32::new(0),
        }
    }

    /// Called from the edge handler with the uptime of the edge.  Only
    /// stores the time and sets the flag.
    #[inline]
    pub fn request(&self, uptime_ms: u32) {
        self.edge_ms.store(uptime_ms, Ordering::Relaxed);
        self.pending.store(true, Ordering::Release);
    }

    /// Test-and-clear, called once per cycle.  Returns the uptime of the
    /// latest edge when a request was pending.
    #[inline]
    pub fn take(&self) -> Option<u32> {
        if self.pending.swap(false, Ordering::AcqRel) {
            Some(self.edge_ms.load(Ordering::Relaxed))
        } else {
            None
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }
}
