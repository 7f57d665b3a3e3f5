//! Collection of recoverable diagnostics produced while a score is built.

use log::{error, warn};

/// Accumulates content errors and warnings for the score under construction.
/// Fatal conditions are returned as `Err` values by the passes instead of
/// landing here.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl Diagnostics {
    /// Record a recoverable content error.
    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        error!("{}", message);
        self.errors.push(message);
    }

    /// Record a non-fatal irregularity.
    pub fn warning(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        self.warnings.push(message);
    }
}
