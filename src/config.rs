//! Configuration management for the gateway.
//!
//! Handles loading and parsing of the YAML configuration file. When no file
//! is present the built-in button table is used, so a stock setup runs with
//! zero configuration.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::info;

/// Pad addresses live in the 7-bit sysex payload range (0x70 + index).
const MAX_BUTTONS: usize = 16;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub midi: MidiConfig,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default = "default_buttons")]
    pub buttons: Vec<ButtonConfig>,
}

/// MIDI port configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MidiConfig {
    /// Output port name, matched exactly against the port list
    #[serde(default = "default_port_name")]
    pub output_port: String,
    /// Input port name (direct mode only)
    #[serde(default = "default_port_name")]
    pub input_port: String,
}

/// Operating mode
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Poll the mixer and mirror its mute state onto the pads
    #[default]
    Mirror,
    /// Toggle mute state from the controller's own pad presses
    Direct,
}

/// Loop timing knobs
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimingConfig {
    /// Mixer poll tick (mirror mode)
    #[serde(default = "default_poll_ms")]
    pub poll_interval_ms: u64,
    /// Half-period of the blink loop (LED off, then on)
    #[serde(default = "default_blink_half_ms")]
    pub blink_half_period_ms: u64,
    /// Delay between a pad release and the resting-color restore
    #[serde(default = "default_settle_ms")]
    pub release_settle_ms: u64,
}

/// One physical pad: note number, mixer strip, and backlight colors.
///
/// The order of the `buttons` list fixes the button-index ↔ note ↔ strip
/// mapping for the whole process lifetime.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ButtonConfig {
    pub note: u8,
    pub label: String,
    /// Mixer strip this pad mirrors (mirror mode only)
    #[serde(default)]
    pub strip: usize,
    pub default_color: u8,
    pub mute_color: u8,
}

fn default_port_name() -> String {
    "Arturia MiniLab mkII".to_string()
}

fn default_poll_ms() -> u64 {
    50
}

fn default_blink_half_ms() -> u64 {
    500
}

fn default_settle_ms() -> u64 {
    100
}

fn button(note: u8, label: &str, strip: usize, default_color: u8, mute_color: u8) -> ButtonConfig {
    ButtonConfig {
        note,
        label: label.to_string(),
        strip,
        default_color,
        mute_color,
    }
}

/// The stock pad layout: pads 1-8, one Voicemeeter Potato strip each.
fn default_buttons() -> Vec<ButtonConfig> {
    vec![
        button(48, "Microphone", 0, 0x01, 0x01),
        button(49, "PlayStation", 1, 0x10, 0x10),
        button(50, "Spotify", 2, 0x04, 0x04),
        button(51, "Chrome", 3, 0x05, 0x05),
        button(52, "Console 2", 4, 0x14, 0x14),
        button(53, "Default Channel", 5, 0x7F, 0x7F),
        button(54, "Game Channel", 6, 0x7F, 0x7F),
        button(55, "VOIP Channel", 7, 0x7F, 0x7F),
    ]
}

impl Default for MidiConfig {
    fn default() -> Self {
        Self {
            output_port: default_port_name(),
            input_port: default_port_name(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_ms(),
            blink_half_period_ms: default_blink_half_ms(),
            release_settle_ms: default_settle_ms(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            midi: MidiConfig::default(),
            mode: Mode::default(),
            timing: TimingConfig::default(),
            buttons: default_buttons(),
        }
    }
}

impl TimingConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn blink_half_period(&self) -> Duration {
        Duration::from_millis(self.blink_half_period_ms)
    }

    pub fn release_settle(&self) -> Duration {
        Duration::from_millis(self.release_settle_ms)
    }
}

impl AppConfig {
    /// Load configuration from a YAML file, falling back to the built-in
    /// defaults when the file does not exist.
    pub async fn load(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            info!("No config file at '{}', using built-in defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file '{}'", path))?;

        let config: Self = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file '{}'", path))?;

        config.validate()?;
        Ok(config)
    }

    /// Sanity-check the button table.
    pub fn validate(&self) -> Result<()> {
        if self.buttons.is_empty() {
            bail!("Config has no buttons");
        }
        if self.buttons.len() > MAX_BUTTONS {
            bail!(
                "Config has {} buttons, but pad addresses only go up to 0x7F ({} max)",
                self.buttons.len(),
                MAX_BUTTONS
            );
        }
        Ok(())
    }
}
