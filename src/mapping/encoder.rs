//! Relative encoder → button pulse mapping
//!
//! Endless knobs in relative mode send one control change per detent:
//! `1` for a step clockwise and `127` (-1 in 7-bit two's complement) for a
//! step counter-clockwise. Each step becomes one press of the matching button.

use tracing::debug;

use crate::error::{Error, Result};
use crate::gamepad::GamepadButton;
use crate::midi::{MessageKind, ProtocolMessage};
use crate::sink::GamepadSink;

/// Value sent for one positive step
pub const TICK_POSITIVE: u8 = 1;

/// Value sent for one negative step
pub const TICK_NEGATIVE: u8 = 127;

/// Maps a relative encoder to a pair of buttons
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderMapping {
    pub comment: String,
    pub channel: u8,
    pub controller: u8,
    pub positive: GamepadButton,
    pub negative: GamepadButton,
}

impl EncoderMapping {
    pub fn new(
        comment: impl Into<String>,
        channel: u8,
        controller: u8,
        positive: GamepadButton,
        negative: GamepadButton,
    ) -> Self {
        Self {
            comment: comment.into(),
            channel,
            controller,
            positive,
            negative,
        }
    }

    pub fn matches(&self, msg: &ProtocolMessage) -> bool {
        msg.kind == MessageKind::ControlChange
            && msg.channel == self.channel
            && msg.key == self.controller
    }

    pub fn trigger(&self, msg: &ProtocolMessage, sink: &mut dyn GamepadSink) -> Result<()> {
        if msg.kind != MessageKind::ControlChange {
            return Err(Error::UnexpectedMessageKind(msg.kind));
        }

        match msg.value {
            TICK_POSITIVE => {
                debug!(mapping = %self.comment, status = "increased", "{}", self.positive);
                sink.button_press(self.positive)?;
            }
            TICK_NEGATIVE => {
                debug!(mapping = %self.comment, status = "decreased", "{}", self.negative);
                sink.button_press(self.negative)?;
            }
            other => return Err(Error::InvalidEncoderValue(other)),
        }
        Ok(())
    }
}
