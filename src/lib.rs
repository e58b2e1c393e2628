//! MIDI Gamepad
//!
//! Translates MIDI controller input into virtual gamepad actions. Each
//! configured MIDI device drives its own virtual gamepad through an ordered
//! table of button, axis and encoder mappings.

pub mod config;
pub mod controller;
pub mod error;
pub mod gamepad;
pub mod mapping;
pub mod midi;
pub mod sink;
pub mod source;

pub use controller::{Controller, ControllerList};
pub use error::{Error, Result};
pub use gamepad::{GamepadAxis, GamepadButton};
pub use mapping::{AxisMapping, ButtonMapping, EncoderMapping, Mapping};
pub use midi::{MessageKind, ProtocolMessage};
pub use sink::{DeviceIdentity, GamepadSink, SinkBackend, SinkError};
pub use source::{ChannelSource, MessageSource, MidiInputSource};
