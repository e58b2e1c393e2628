//! Error types for the translation engine

use thiserror::Error;

use crate::midi::MessageKind;
use crate::sink::SinkError;

/// Errors raised while building or running a controller
///
/// The first three variants are fatal for controller construction. The rest
/// are reported per dispatch and never stop the consumption loop.
#[derive(Debug, Error)]
pub enum Error {
    /// The MIDI input port could not be found or connected
    #[error("MIDI source unavailable: {0}")]
    SourceUnavailable(String),

    /// The virtual gamepad could not be registered
    #[error("gamepad sink unavailable: {0}")]
    SinkUnavailable(String),

    /// A mapping descriptor references an unknown type, button or axis
    #[error("invalid mapping descriptor: {0}")]
    InvalidMappingDescriptor(String),

    /// A mapping was triggered by a message kind it does not handle
    #[error("unexpected {0} message for this mapping")]
    UnexpectedMessageKind(MessageKind),

    /// A control change value that is not a relative encoder tick
    #[error("invalid encoder value {0} (expected 1 or 127)")]
    InvalidEncoderValue(u8),

    /// The gamepad sink rejected an action
    #[error("gamepad sink error: {0}")]
    Sink(#[from] SinkError),
}

pub type Result<T> = std::result::Result<T, Error>;
