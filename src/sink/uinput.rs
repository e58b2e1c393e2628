//! Virtual gamepad backed by the Linux uinput subsystem

use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{
    AbsInfo, AbsoluteAxisType, AttributeSet, BusType, EventType, InputEvent, InputId, Key,
    UinputAbsSetup,
};
use tracing::{debug, info};

use super::{DeviceIdentity, GamepadSink, SinkError};
use crate::error::{Error, Result};
use crate::gamepad::{GamepadAxis, GamepadButton};

/// Largest absolute stick value reported by the device
pub const MAX_AXIS_VALUE: i32 = 32767;

const DEVICE_VERSION: u16 = 1;

fn button_key(button: GamepadButton) -> Key {
    match button {
        GamepadButton::North => Key::BTN_NORTH,
        GamepadButton::East => Key::BTN_EAST,
        GamepadButton::South => Key::BTN_SOUTH,
        GamepadButton::West => Key::BTN_WEST,
        GamepadButton::L1 => Key::BTN_TL,
        GamepadButton::L2 => Key::BTN_TL2,
        GamepadButton::L3 => Key::BTN_THUMBL,
        GamepadButton::R1 => Key::BTN_TR,
        GamepadButton::R2 => Key::BTN_TR2,
        GamepadButton::R3 => Key::BTN_THUMBR,
        GamepadButton::Select => Key::BTN_SELECT,
        GamepadButton::Start => Key::BTN_START,
        GamepadButton::DpadUp => Key::BTN_DPAD_UP,
        GamepadButton::DpadDown => Key::BTN_DPAD_DOWN,
        GamepadButton::DpadLeft => Key::BTN_DPAD_LEFT,
        GamepadButton::DpadRight => Key::BTN_DPAD_RIGHT,
    }
}

fn axis_type(axis: GamepadAxis) -> AbsoluteAxisType {
    match axis {
        GamepadAxis::LeftX => AbsoluteAxisType::ABS_X,
        GamepadAxis::LeftY => AbsoluteAxisType::ABS_Y,
        GamepadAxis::RightX => AbsoluteAxisType::ABS_RX,
        GamepadAxis::RightY => AbsoluteAxisType::ABS_RY,
    }
}

/// Convert a normalized axis value to the device range
pub fn denormalize(value: f64) -> i32 {
    (value.clamp(-1.0, 1.0) * MAX_AXIS_VALUE as f64).round() as i32
}

/// Virtual gamepad registered through /dev/uinput
pub struct UinputGamepad {
    device: Option<VirtualDevice>,
    name: String,
}

impl UinputGamepad {
    /// Register a new virtual gamepad
    ///
    /// # Errors
    ///
    /// Returns `SinkUnavailable` if /dev/uinput cannot be opened or the
    /// device cannot be registered (usually a permissions problem).
    pub fn create(name: &str, identity: DeviceIdentity) -> Result<Self> {
        let device = Self::build(name, identity).map_err(|e| {
            Error::SinkUnavailable(format!("failed to create virtual gamepad '{}': {}", name, e))
        })?;

        info!(
            "Virtual gamepad '{}' registered ({:04x}:{:04x})",
            name, identity.vendor_id, identity.product_id
        );

        Ok(Self {
            device: Some(device),
            name: name.to_string(),
        })
    }

    fn build(name: &str, identity: DeviceIdentity) -> std::io::Result<VirtualDevice> {
        let mut keys = AttributeSet::<Key>::new();
        for button in GamepadButton::ALL {
            keys.insert(button_key(button));
        }

        let mut builder = VirtualDeviceBuilder::new()?
            .name(name)
            .input_id(InputId::new(
                BusType::BUS_USB,
                identity.vendor_id,
                identity.product_id,
                DEVICE_VERSION,
            ))
            .with_keys(&keys)?;

        for axis in GamepadAxis::ALL {
            let setup = UinputAbsSetup::new(
                axis_type(axis),
                AbsInfo::new(0, -MAX_AXIS_VALUE, MAX_AXIS_VALUE, 16, 128, 0),
            );
            builder = builder.with_absolute_axis(&setup)?;
        }

        builder.build()
    }

    fn emit(&mut self, events: &[InputEvent]) -> std::result::Result<(), SinkError> {
        let device = self.device.as_mut().ok_or(SinkError::Closed)?;
        device.emit(events)?;
        Ok(())
    }

    fn key_event(button: GamepadButton, pressed: bool) -> InputEvent {
        InputEvent::new(EventType::KEY, button_key(button).code(), pressed as i32)
    }
}

impl GamepadSink for UinputGamepad {
    fn button_down(&mut self, button: GamepadButton) -> std::result::Result<(), SinkError> {
        self.emit(&[Self::key_event(button, true)])
    }

    fn button_up(&mut self, button: GamepadButton) -> std::result::Result<(), SinkError> {
        self.emit(&[Self::key_event(button, false)])
    }

    fn button_press(&mut self, button: GamepadButton) -> std::result::Result<(), SinkError> {
        // Separate reports so readers see both edges
        self.emit(&[Self::key_event(button, true)])?;
        self.emit(&[Self::key_event(button, false)])
    }

    fn axis_move(&mut self, axis: GamepadAxis, value: f64) -> std::result::Result<(), SinkError> {
        let event = InputEvent::new(EventType::ABSOLUTE, axis_type(axis).0, denormalize(value));
        self.emit(&[event])
    }

    fn close(&mut self) {
        if self.device.take().is_some() {
            debug!("Virtual gamepad '{}' removed", self.name);
        }
    }
}
