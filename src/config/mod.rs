//! Configuration management for MIDI Gamepad
//!
//! Loads the YAML mapping file and turns each controller entry into the
//! mapping table the translation engine runs on.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::error::Error;
use crate::gamepad::{GamepadAxis, GamepadButton};
use crate::mapping::{AxisMapping, ButtonMapping, EncoderMapping, Mapping};
use crate::sink::DeviceIdentity;

/// Directory name under the user's config dir
const APP_DIR: &str = "midi-gamepad";

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub controller: Vec<ControllerConfig>,
}

/// One physical MIDI device and the gamepad it drives
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerConfig {
    /// Substring of the MIDI input port name
    pub port_name: String,
    #[serde(default, rename = "vendorID", alias = "vendorId")]
    pub vendor_id: u16,
    #[serde(default, rename = "productID", alias = "productId")]
    pub product_id: u16,
    #[serde(default)]
    pub mappings: Vec<MappingConfig>,
}

/// Every field any mapping type may need
///
/// Names are kept as strings so unknown values surface as
/// `InvalidMappingDescriptor` when the mapping is built.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingConfig {
    #[serde(default)]
    pub comment: String,
    #[serde(rename = "type")]
    pub mapping_type: String,
    #[serde(default)]
    pub midi_channel: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub midi_key: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub midi_controller: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button_negative: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub axis: Option<String>,
    #[serde(default)]
    pub is_signed: bool,
    #[serde(default)]
    pub deadzone: f64,
}

impl AppConfig {
    /// Load configuration from file with validation
    ///
    /// A leading `~` and `$HOME` in `path` are expanded.
    pub async fn load(path: &str) -> Result<Self> {
        let path = expand_path(path);
        let contents = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = Self::parse(&contents)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(config)
    }

    /// Parse and validate YAML text
    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig =
            serde_yaml::from_str(contents).context("Failed to parse YAML config")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration for correctness and consistency
    pub fn validate(&self) -> Result<()> {
        if self.controller.is_empty() {
            anyhow::bail!("At least one controller must be defined");
        }

        for (idx, controller) in self.controller.iter().enumerate() {
            if controller.port_name.trim().is_empty() {
                anyhow::bail!("Controller {} portName cannot be empty", idx);
            }

            for (mapping_idx, mapping) in controller.mappings.iter().enumerate() {
                mapping.validate().with_context(|| {
                    format!(
                        "Invalid mapping {} (\"{}\") for controller '{}'",
                        mapping_idx, mapping.comment, controller.port_name
                    )
                })?;
            }
        }

        Ok(())
    }
}

impl ControllerConfig {
    /// Vendor/product pair for the virtual gamepad
    pub fn identity(&self) -> DeviceIdentity {
        DeviceIdentity::new(self.vendor_id, self.product_id).resolve()
    }

    /// Build the mapping table in file order
    pub fn build_mappings(&self) -> Result<Vec<Mapping>, Error> {
        self.mappings.iter().map(MappingConfig::build).collect()
    }
}

impl MappingConfig {
    /// Check numeric ranges
    ///
    /// Names are checked by [`build`](Self::build).
    pub fn validate(&self) -> Result<()> {
        if self.midi_channel > 15 {
            anyhow::bail!("midiChannel {} is invalid (must be 0-15)", self.midi_channel);
        }
        if let Some(key) = self.midi_key {
            if key > 127 {
                anyhow::bail!("midiKey {} is invalid (must be 0-127)", key);
            }
        }
        if let Some(controller) = self.midi_controller {
            if controller > 127 {
                anyhow::bail!("midiController {} is invalid (must be 0-127)", controller);
            }
        }
        if !(0.0..=1.0).contains(&self.deadzone) {
            anyhow::bail!("deadzone {} is invalid (must be 0-1)", self.deadzone);
        }
        Ok(())
    }

    /// Build the mapping this entry describes
    ///
    /// # Errors
    ///
    /// Returns `InvalidMappingDescriptor` for an unknown type tag, an unknown
    /// or missing button/axis name, or a missing key/controller number.
    pub fn build(&self) -> Result<Mapping, Error> {
        match self.mapping_type.trim().to_ascii_lowercase().as_str() {
            "button" => {
                let key = self.require(self.midi_key, "midiKey")?;
                let button = self.button_named(self.button.as_deref(), "button")?;

                debug!(
                    comment = %self.comment,
                    midi_channel = self.midi_channel,
                    midi_key = key,
                    %button,
                    "Parsed button mapping"
                );

                Ok(ButtonMapping::new(self.comment.clone(), self.midi_channel, key, button).into())
            }
            // "control" is the older name for axis mappings
            "axis" | "control" => {
                let controller = self.require(self.midi_controller, "midiController")?;
                let axis: GamepadAxis = self
                    .axis
                    .as_deref()
                    .ok_or_else(|| self.missing("axis"))?
                    .parse()?;

                debug!(
                    comment = %self.comment,
                    midi_channel = self.midi_channel,
                    midi_controller = controller,
                    %axis,
                    is_signed = self.is_signed,
                    deadzone = self.deadzone,
                    "Parsed axis mapping"
                );

                Ok(AxisMapping::new(
                    self.comment.clone(),
                    self.midi_channel,
                    controller,
                    axis,
                    self.is_signed,
                    self.deadzone,
                )
                .into())
            }
            "encoder" => {
                let controller = self.require(self.midi_controller, "midiController")?;
                let positive = self.button_named(self.button.as_deref(), "button")?;
                let negative = self.button_named(self.button_negative.as_deref(), "buttonNegative")?;

                debug!(
                    comment = %self.comment,
                    midi_channel = self.midi_channel,
                    midi_controller = controller,
                    %positive,
                    %negative,
                    "Parsed encoder mapping"
                );

                Ok(EncoderMapping::new(
                    self.comment.clone(),
                    self.midi_channel,
                    controller,
                    positive,
                    negative,
                )
                .into())
            }
            other => Err(Error::InvalidMappingDescriptor(format!(
                "invalid mapping type \"{}\" in mapping \"{}\"",
                other, self.comment
            ))),
        }
    }

    fn require(&self, value: Option<u8>, field: &str) -> Result<u8, Error> {
        value.ok_or_else(|| self.missing(field))
    }

    fn button_named(&self, name: Option<&str>, field: &str) -> Result<GamepadButton, Error> {
        name.ok_or_else(|| self.missing(field))?.parse()
    }

    fn missing(&self, field: &str) -> Error {
        Error::InvalidMappingDescriptor(format!(
            "{} mapping \"{}\" requires '{}'",
            self.mapping_type, self.comment, field
        ))
    }
}

/// Default config location (`~/.config/midi-gamepad/config.yaml` on Linux)
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("config.yaml")
}

/// Expand a leading `~` and any `$HOME` / `${HOME}` in a path
pub fn expand_path(path: &str) -> PathBuf {
    let Some(home) = dirs::home_dir() else {
        return PathBuf::from(path);
    };
    let home = home.to_string_lossy();

    let expanded = path.replace("${HOME}", &home).replace("$HOME", &home);
    if expanded == "~" {
        return PathBuf::from(home.as_ref());
    }
    match expanded.strip_prefix("~/") {
        Some(rest) => Path::new(home.as_ref()).join(rest),
        None => PathBuf::from(expanded),
    }
}
