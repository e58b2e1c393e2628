//! Note → button mapping

use tracing::debug;

use crate::error::{Error, Result};
use crate::gamepad::GamepadButton;
use crate::midi::{MessageKind, ProtocolMessage};
use crate::sink::GamepadSink;

/// Maps a MIDI note to a gamepad button
///
/// Note On presses the button, Note Off releases it. A Note On with
/// velocity 0 is a release, as many devices send it instead of Note Off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonMapping {
    pub comment: String,
    pub channel: u8,
    pub key: u8,
    pub button: GamepadButton,
}

impl ButtonMapping {
    pub fn new(comment: impl Into<String>, channel: u8, key: u8, button: GamepadButton) -> Self {
        Self {
            comment: comment.into(),
            channel,
            key,
            button,
        }
    }

    pub fn matches(&self, msg: &ProtocolMessage) -> bool {
        msg.is_note() && msg.channel == self.channel && msg.key == self.key
    }

    pub fn trigger(&self, msg: &ProtocolMessage, sink: &mut dyn GamepadSink) -> Result<()> {
        match msg.kind {
            MessageKind::NoteOn if msg.value != 0 => {
                debug!(mapping = %self.comment, status = "down", "{}", self.button);
                sink.button_down(self.button)?;
            }
            MessageKind::NoteOn | MessageKind::NoteOff => {
                debug!(mapping = %self.comment, status = "up", "{}", self.button);
                sink.button_up(self.button)?;
            }
            other => return Err(Error::UnexpectedMessageKind(other)),
        }
        Ok(())
    }
}
