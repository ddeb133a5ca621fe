//! Error taxonomy for the gateway.
//!
//! Startup errors (`DeviceNotFound`, `BackendUnavailable`) are fatal and
//! bubble out of `main`. Steady-state errors (`InvalidButtonIndex`,
//! `SendFailure`) are logged and absorbed by the callers; the LED state
//! self-heals on the next transition.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedbackError {
    /// The configured MIDI port is not present on this machine.
    #[error("MIDI device '{0}' not found")]
    DeviceNotFound(String),

    /// The mixer remote-control backend could not be initialized.
    #[error("mixer backend unavailable: {0}")]
    BackendUnavailable(String),

    /// A button index outside the configured range was used.
    #[error("button index {index} out of range ({count} buttons configured)")]
    InvalidButtonIndex { index: usize, count: usize },

    /// The output device rejected a message.
    #[error("MIDI send failed: {0}")]
    SendFailure(String),
}
