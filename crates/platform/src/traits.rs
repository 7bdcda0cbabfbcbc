//! Core traits for eapike security modules

use crate::EapikeResult;

/// Security module interface
///
/// Every eapike engine implements this trait to provide unified management.
pub trait SecurityModule: Send + Sync {
    /// Unique module identifier
    fn id(&self) -> &'static str;

    /// Module version
    fn version(&self) -> &'static str;

    /// Module description
    fn description(&self) -> &'static str;

    /// Initialize the module
    ///
    /// # Errors
    ///
    /// Returns an error if initialization fails
    fn init(&mut self) -> EapikeResult<()> {
        Ok(())
    }

    /// Shutdown the module
    ///
    /// # Errors
    ///
    /// Returns an error if shutdown fails
    fn shutdown(&mut self) -> EapikeResult<()> {
        Ok(())
    }
}

/// Severity level of a failure or event
///
/// Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Informational
    Info,
    /// Low severity (stray or duplicate traffic)
    Low,
    /// Medium severity (negotiation or local failure)
    Medium,
    /// High severity (integrity failure)
    High,
    /// Critical severity (authentication failure, possible attack)
    Critical,
}

impl Severity {
    /// Whether an event of this severity must be reported to the application
    pub fn must_surface(self) -> bool {
        self >= Severity::High
    }
}
