//! Gamepad action surface: buttons and analog axes

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Gamepad buttons a mapping can target
///
/// Face buttons are named by compass position so layouts from different
/// vendors (A/B/X/Y, cross/circle/...) map the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GamepadButton {
    North,
    East,
    South,
    West,
    /// Left bumper
    L1,
    /// Left trigger
    L2,
    /// Left thumb (stick click)
    L3,
    R1,
    R2,
    R3,
    Select,
    Start,
    DpadUp,
    DpadDown,
    DpadLeft,
    DpadRight,
}

impl GamepadButton {
    pub const ALL: [GamepadButton; 16] = [
        GamepadButton::North,
        GamepadButton::East,
        GamepadButton::South,
        GamepadButton::West,
        GamepadButton::L1,
        GamepadButton::L2,
        GamepadButton::L3,
        GamepadButton::R1,
        GamepadButton::R2,
        GamepadButton::R3,
        GamepadButton::Select,
        GamepadButton::Start,
        GamepadButton::DpadUp,
        GamepadButton::DpadDown,
        GamepadButton::DpadLeft,
        GamepadButton::DpadRight,
    ];

    /// Name used in mapping files
    pub fn name(&self) -> &'static str {
        match self {
            GamepadButton::North => "north",
            GamepadButton::East => "east",
            GamepadButton::South => "south",
            GamepadButton::West => "west",
            GamepadButton::L1 => "l1",
            GamepadButton::L2 => "l2",
            GamepadButton::L3 => "l3",
            GamepadButton::R1 => "r1",
            GamepadButton::R2 => "r2",
            GamepadButton::R3 => "r3",
            GamepadButton::Select => "select",
            GamepadButton::Start => "start",
            GamepadButton::DpadUp => "dpad-up",
            GamepadButton::DpadDown => "dpad-down",
            GamepadButton::DpadLeft => "dpad-left",
            GamepadButton::DpadRight => "dpad-right",
        }
    }
}

impl FromStr for GamepadButton {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        GamepadButton::ALL
            .iter()
            .copied()
            .find(|b| b.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::InvalidMappingDescriptor(format!("invalid button name \"{}\"", s)))
    }
}

impl fmt::Display for GamepadButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Analog stick axes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GamepadAxis {
    LeftX,
    LeftY,
    RightX,
    RightY,
}

impl GamepadAxis {
    pub const ALL: [GamepadAxis; 4] = [
        GamepadAxis::LeftX,
        GamepadAxis::LeftY,
        GamepadAxis::RightX,
        GamepadAxis::RightY,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            GamepadAxis::LeftX => "left-x",
            GamepadAxis::LeftY => "left-y",
            GamepadAxis::RightX => "right-x",
            GamepadAxis::RightY => "right-y",
        }
    }
}

impl FromStr for GamepadAxis {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        GamepadAxis::ALL
            .iter()
            .copied()
            .find(|a| a.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::InvalidMappingDescriptor(format!("invalid axis name \"{}\"", s)))
    }
}

impl fmt::Display for GamepadAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
