//! Mapping table entries and message dispatch
//!
//! A [`Mapping`] decides whether a MIDI message belongs to it and, if so,
//! turns the message into gamepad actions. Mappings are immutable once built.
//! Several mappings may share a match key; all of them fire, in table order.

pub mod axis;
pub mod button;
pub mod encoder;

use std::fmt;

use tracing::{error, trace};

use crate::error::Result;
use crate::midi::ProtocolMessage;
use crate::sink::GamepadSink;

pub use axis::AxisMapping;
pub use button::ButtonMapping;
pub use encoder::EncoderMapping;

/// One entry of a controller's mapping table
#[derive(Debug, Clone, PartialEq)]
pub enum Mapping {
    Button(ButtonMapping),
    Axis(AxisMapping),
    Encoder(EncoderMapping),
}

impl Mapping {
    /// Human-readable label from the mapping file
    pub fn comment(&self) -> &str {
        match self {
            Mapping::Button(m) => &m.comment,
            Mapping::Axis(m) => &m.comment,
            Mapping::Encoder(m) => &m.comment,
        }
    }

    /// Check if `msg` belongs to this mapping, without triggering it
    pub fn matches(&self, msg: &ProtocolMessage) -> bool {
        match self {
            Mapping::Button(m) => m.matches(msg),
            Mapping::Axis(m) => m.matches(msg),
            Mapping::Encoder(m) => m.matches(msg),
        }
    }

    /// Translate `msg` into sink actions
    ///
    /// Does not re-check the match key; call [`matches`](Self::matches) first
    /// or use [`trigger_if_match`](Self::trigger_if_match).
    pub fn trigger(&self, msg: &ProtocolMessage, sink: &mut dyn GamepadSink) -> Result<()> {
        match self {
            Mapping::Button(m) => m.trigger(msg, sink),
            Mapping::Axis(m) => m.trigger(msg, sink),
            Mapping::Encoder(m) => m.trigger(msg, sink),
        }
    }

    /// Trigger if `msg` matches. Returns whether the mapping fired.
    pub fn trigger_if_match(
        &self,
        msg: &ProtocolMessage,
        sink: &mut dyn GamepadSink,
    ) -> Result<bool> {
        if !self.matches(msg) {
            return Ok(false);
        }
        self.trigger(msg, sink)?;
        Ok(true)
    }
}

impl fmt::Display for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mapping::Button(m) => write!(
                f,
                "button  ch:{} n:{} -> {} \"{}\"",
                m.channel, m.key, m.button, m.comment
            ),
            Mapping::Axis(m) => write!(
                f,
                "axis    ch:{} cc:{} -> {}{} dz:{} \"{}\"",
                m.channel,
                m.controller,
                m.axis,
                if m.signed { " (signed)" } else { "" },
                m.deadzone,
                m.comment
            ),
            Mapping::Encoder(m) => write!(
                f,
                "encoder ch:{} cc:{} -> +{} -{} \"{}\"",
                m.channel, m.controller, m.positive, m.negative, m.comment
            ),
        }
    }
}

impl From<ButtonMapping> for Mapping {
    fn from(m: ButtonMapping) -> Self {
        Mapping::Button(m)
    }
}

impl From<AxisMapping> for Mapping {
    fn from(m: AxisMapping) -> Self {
        Mapping::Axis(m)
    }
}

impl From<EncoderMapping> for Mapping {
    fn from(m: EncoderMapping) -> Self {
        Mapping::Encoder(m)
    }
}

/// Run one message through every mapping in table order
///
/// A failing mapping is logged with its comment and does not prevent later
/// mappings from running. Returns the number of mappings that matched.
pub fn dispatch(mappings: &[Mapping], msg: &ProtocolMessage, sink: &mut dyn GamepadSink) -> usize {
    let mut matched = 0;

    for mapping in mappings {
        if !mapping.matches(msg) {
            continue;
        }
        matched += 1;

        if let Err(e) = mapping.trigger(msg, sink) {
            error!(mapping = mapping.comment(), "Error in mapping \"{}\": {}", mapping.comment(), e);
        }
    }

    if matched == 0 {
        trace!("No mapping for {}", msg);
    }

    matched
}
