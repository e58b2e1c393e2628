//! MIDI message types consumed by the translation engine
//!
//! Only the three channel-voice messages a control surface uses for buttons,
//! faders and knobs are modelled. Everything else is dropped at decode time.

use std::fmt;

/// Kind of a decoded MIDI message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    NoteOn,
    NoteOff,
    ControlChange,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageKind::NoteOn => write!(f, "NoteOn"),
            MessageKind::NoteOff => write!(f, "NoteOff"),
            MessageKind::ControlChange => write!(f, "CC"),
        }
    }
}

/// A decoded MIDI message
///
/// `key` is the note number for note messages and the controller number for
/// control changes. `value` is the velocity or the absolute controller level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolMessage {
    pub kind: MessageKind,
    /// MIDI channel (0-15)
    pub channel: u8,
    /// Note or controller number (0-127)
    pub key: u8,
    /// Velocity or controller value (0-127)
    pub value: u8,
}

impl ProtocolMessage {
    pub fn note_on(channel: u8, key: u8, velocity: u8) -> Self {
        Self {
            kind: MessageKind::NoteOn,
            channel: channel & 0x0F,
            key: key & 0x7F,
            value: velocity & 0x7F,
        }
    }

    pub fn note_off(channel: u8, key: u8, velocity: u8) -> Self {
        Self {
            kind: MessageKind::NoteOff,
            channel: channel & 0x0F,
            key: key & 0x7F,
            value: velocity & 0x7F,
        }
    }

    pub fn control_change(channel: u8, controller: u8, value: u8) -> Self {
        Self {
            kind: MessageKind::ControlChange,
            channel: channel & 0x0F,
            key: controller & 0x7F,
            value: value & 0x7F,
        }
    }

    /// Parse a message from raw MIDI bytes
    ///
    /// Returns `None` for anything other than Note On, Note Off and Control
    /// Change, including running-status data and truncated messages. A Note On
    /// with velocity 0 stays a Note On here; button mappings treat it as a
    /// release.
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < 3 {
            return None;
        }

        let status = data[0];

        // Running status (data byte first) is not tracked
        if status < 0x80 {
            return None;
        }

        let channel = status & 0x0F;
        let key = data[1] & 0x7F;
        let value = data[2] & 0x7F;

        match status & 0xF0 {
            0x80 => Some(Self::note_off(channel, key, value)),
            0x90 => Some(Self::note_on(channel, key, value)),
            0xB0 => Some(Self::control_change(channel, key, value)),
            _ => None,
        }
    }

    /// Check whether this is a Note On or Note Off
    pub fn is_note(&self) -> bool {
        matches!(self.kind, MessageKind::NoteOn | MessageKind::NoteOff)
    }
}

impl fmt::Display for ProtocolMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            MessageKind::NoteOn | MessageKind::NoteOff => write!(
                f,
                "{} ch:{} n:{} v:{}",
                self.kind,
                self.channel + 1,
                self.key,
                self.value
            ),
            MessageKind::ControlChange => write!(
                f,
                "CC ch:{} cc:{} v:{}",
                self.channel + 1,
                self.key,
                self.value
            ),
        }
    }
}

/// Format MIDI bytes as hex string for debugging
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
