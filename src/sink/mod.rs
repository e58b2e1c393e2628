//! Gamepad sinks - where translated actions end up
//!
//! A sink is owned by exactly one controller loop, so implementations never
//! see concurrent calls and need no interior locking.

use thiserror::Error;

use crate::error::Result;
use crate::gamepad::{GamepadAxis, GamepadButton};

pub mod log;
#[cfg(target_os = "linux")]
pub mod uinput;

pub use self::log::LogSink;
#[cfg(target_os = "linux")]
pub use self::uinput::UinputGamepad;

/// Vendor ID used when a controller config leaves both IDs at zero
pub const DEFAULT_VENDOR_ID: u16 = 0x045e;

/// Product ID used when a controller config leaves both IDs at zero
pub const DEFAULT_PRODUCT_ID: u16 = 0x0285;

/// Failure of a single sink call
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("device I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("device is closed")]
    Closed,

    #[error("action rejected: {0}")]
    Rejected(String),
}

/// Receiver of gamepad actions
pub trait GamepadSink: Send {
    fn button_down(&mut self, button: GamepadButton) -> std::result::Result<(), SinkError>;

    fn button_up(&mut self, button: GamepadButton) -> std::result::Result<(), SinkError>;

    /// Press and release a button as one pulse
    fn button_press(&mut self, button: GamepadButton) -> std::result::Result<(), SinkError>;

    /// Move an axis to a normalized position in [-1, 1]
    fn axis_move(&mut self, axis: GamepadAxis, value: f64) -> std::result::Result<(), SinkError>;

    /// Release the underlying device. Called once when the owning loop exits.
    fn close(&mut self) {}
}

/// USB identity reported by the virtual gamepad
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub vendor_id: u16,
    pub product_id: u16,
}

impl DeviceIdentity {
    pub fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
        }
    }

    /// Substitute the default identity when none was configured
    ///
    /// The default imitates a wired Xbox controller.
    pub fn resolve(self) -> Self {
        if self.vendor_id == 0 && self.product_id == 0 {
            Self::new(DEFAULT_VENDOR_ID, DEFAULT_PRODUCT_ID)
        } else {
            self
        }
    }
}

impl Default for DeviceIdentity {
    fn default() -> Self {
        Self::new(DEFAULT_VENDOR_ID, DEFAULT_PRODUCT_ID)
    }
}

/// Which sink implementation a controller should create
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SinkBackend {
    /// Kernel virtual gamepad through /dev/uinput
    #[default]
    Uinput,
    /// Log every action instead of emitting it
    DryRun,
}

impl SinkBackend {
    /// Create a sink for the device called `name`
    pub fn create(&self, name: &str, identity: DeviceIdentity) -> Result<Box<dyn GamepadSink>> {
        let identity = identity.resolve();
        match self {
            SinkBackend::DryRun => Ok(Box::new(LogSink::new(name))),
            #[cfg(target_os = "linux")]
            SinkBackend::Uinput => {
                let device = UinputGamepad::create(name, identity)?;
                Ok(Box::new(device))
            }
            #[cfg(not(target_os = "linux"))]
            SinkBackend::Uinput => Err(crate::error::Error::SinkUnavailable(format!(
                "uinput is not available on this platform (device '{}', {:04x}:{:04x})",
                name, identity.vendor_id, identity.product_id
            ))),
        }
    }
}
