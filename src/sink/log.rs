//! Log sink - logs all gamepad actions for testing mappings without a device

use tracing::info;

use super::{GamepadSink, SinkError};
use crate::gamepad::{GamepadAxis, GamepadButton};

/// LogSink logs every action instead of emitting it
///
/// Useful for:
/// - Trying out a mapping file on a machine without uinput access
/// - Checking which controls of a surface send what
pub struct LogSink {
    name: String,
    action_count: u64,
    closed: bool,
}

impl LogSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            action_count: 0,
            closed: false,
        }
    }

    /// Number of actions logged so far
    pub fn action_count(&self) -> u64 {
        self.action_count
    }

    fn record(&mut self, action: &str, target: &str) -> Result<(), SinkError> {
        if self.closed {
            return Err(SinkError::Closed);
        }
        self.action_count += 1;
        info!(
            "🎮 [{}] {} {} [action #{}]",
            self.name, action, target, self.action_count
        );
        Ok(())
    }
}

impl GamepadSink for LogSink {
    fn button_down(&mut self, button: GamepadButton) -> Result<(), SinkError> {
        self.record("button down", button.name())
    }

    fn button_up(&mut self, button: GamepadButton) -> Result<(), SinkError> {
        self.record("button up", button.name())
    }

    fn button_press(&mut self, button: GamepadButton) -> Result<(), SinkError> {
        self.record("button press", button.name())
    }

    fn axis_move(&mut self, axis: GamepadAxis, value: f64) -> Result<(), SinkError> {
        self.record("axis", &format!("{} = {:.4}", axis, value))
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            info!(
                "LogSink '{}' closed after {} actions",
                self.name, self.action_count
            );
        }
    }
}
