//! Control change → analog axis mapping
//!
//! # Normalization
//!
//! A 7-bit controller value `v` maps to:
//! - unsigned: `v / 127`, range [0, 1]
//! - signed: `(v / 127) * 2 - 1`, range [-1, 1]
//!
//! Values whose magnitude falls below the deadzone snap to exactly 0.
//! Outside the deadzone the value is passed through unscaled.

use tracing::debug;

use crate::error::{Error, Result};
use crate::gamepad::GamepadAxis;
use crate::midi::{MessageKind, ProtocolMessage};
use crate::sink::GamepadSink;

/// Largest 7-bit MIDI data value
pub const MIDI_MAX: f64 = 127.0;

/// Normalize a raw controller value
///
/// # Example
/// ```
/// use midi_gamepad::mapping::axis::normalize;
///
/// assert_eq!(normalize(127, false, 0.0), 1.0);
/// assert_eq!(normalize(0, true, 0.0), -1.0);
/// // 63 is just below center on a signed axis
/// assert_eq!(normalize(63, true, 0.05), 0.0);
/// ```
pub fn normalize(raw: u8, signed: bool, deadzone: f64) -> f64 {
    let mut value = f64::from(raw.min(127)) / MIDI_MAX;
    if signed {
        value = value * 2.0 - 1.0;
    }

    if value.abs() < deadzone {
        0.0
    } else {
        value
    }
}

/// Maps a MIDI controller to one stick axis
#[derive(Debug, Clone, PartialEq)]
pub struct AxisMapping {
    pub comment: String,
    pub channel: u8,
    pub controller: u8,
    pub axis: GamepadAxis,
    /// Map to [-1, 1] instead of [0, 1]
    pub signed: bool,
    /// Magnitude below which the axis reads 0, within [0, 1]
    pub deadzone: f64,
}

impl AxisMapping {
    pub fn new(
        comment: impl Into<String>,
        channel: u8,
        controller: u8,
        axis: GamepadAxis,
        signed: bool,
        deadzone: f64,
    ) -> Self {
        Self {
            comment: comment.into(),
            channel,
            controller,
            axis,
            signed,
            deadzone,
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

        let value = normalize(msg.value, self.signed, self.deadzone);
        debug!(
            mapping = %self.comment,
            value,
            deadzone = self.deadzone,
            "{}",
            self.axis
        );

        sink.axis_move(self.axis, value)?;
        Ok(())
    }
}
