use business_logic::ports::DiagnosticSink;

use crate::fmt::info;

/// Diagnostic lines go out over RTT with the rest of the log.
pub struct DefmtDiagnostics;

impl DiagnosticSink for DefmtDiagnostics {
    fn line(&mut self, line: &str) {
        info!("{=str}", line);
    }
}
