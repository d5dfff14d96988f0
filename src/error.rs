// Error types raised by the emulation core

use thiserror::Error;

use crate::machine::MachineState;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    /// Snapshot of unexpected size. Loading continues best-effort, so this is
    /// only ever logged.
    #[error("Malformed snapshot: expected {expected} bytes, got {actual}")]
    MalformedSnapshot { expected: usize, actual: usize },

    #[error("Malformed screen buffer: expected {expected} bytes, got {actual}")]
    MalformedScreenBuffer { expected: usize, actual: usize },

    #[error("ROM load failure: expected {expected} bytes, got {actual}")]
    RomLoadFailure { expected: usize, actual: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Audio device unavailable: {0}")]
    AudioDeviceUnavailable(String),

    #[error("Cannot {operation} while the machine is {state:?}")]
    InvalidState {
        operation: &'static str,
        state: MachineState,
    },
}
