//! Processor configuration.
//!
//! Everything the original sourced from process-wide system properties is
//! an explicit, TOML-loadable config object here: the tool family, the
//! watchdog timeout, per-sub-command executable overrides, and the named
//! variant table. Nothing reads the environment behind the caller's back.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [settings]
//! tool = "graphicsmagick"      # or "imagemagick" (case-insensitive)
//! timeout_millis = 3000        # watchdog; a value <= 0 disables it
//! # working_directory = "/var/tmp"   # defaults to the system temp dir
//!
//! [settings.executables]       # per-sub-command executable overrides
//! # convert = "/usr/local/bin/gm"
//! # identify = "/usr/local/bin/gm"
//!
//! # Variants are processed in declaration order. A width or height of 0
//! # means that axis is unbounded; 0x0 stores the original unscaled.
//! [[variants]]
//! name = "thumbnail"
//! width = 100
//! height = 100
//!
//! [[variants]]
//! name = "large"
//! width = 1280
//! height = 1280
//! ```
//!
//! Unknown keys are rejected to catch typos early. The one deliberate
//! exception is `tool`: any value that is not `"imagemagick"` falls back
//! to GraphicsMagick, the default family.
//!
//! Note the timeout footgun: `timeout_millis = 0` does not mean "time out
//! immediately", it means "no watchdog at all". [`ToolSettings::timeout`]
//! is the single place that conversion happens.

use crate::dimension::Dimension;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Which external tool family handles the images.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", rename_all = "lowercase")]
pub enum ToolFamily {
    #[default]
    GraphicsMagick,
    ImageMagick,
}

impl ToolFamily {
    /// Case-insensitive selector match; anything that is not a known
    /// ImageMagick spelling falls back to the GraphicsMagick default.
    pub fn from_name(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("imagemagick") {
            Self::ImageMagick
        } else {
            Self::GraphicsMagick
        }
    }
}

impl From<String> for ToolFamily {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

/// Execution settings shared by every tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolSettings {
    /// Tool family selector.
    pub tool: ToolFamily,
    /// Watchdog timeout in milliseconds. `<= 0` disables the watchdog
    /// entirely, deferring to the OS for process lifetime.
    pub timeout_millis: i64,
    /// Executable override per sub-command (e.g. `identify =
    /// "/opt/gm/bin/gm"`). Absent entries resolve to the family default
    /// via `PATH`.
    pub executables: BTreeMap<String, String>,
    /// Working directory for tool invocations. Defaults to the system
    /// temp dir so relative outputs and tool scratch files land in a
    /// predictable, cleanable place.
    pub working_directory: Option<PathBuf>,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            tool: ToolFamily::default(),
            timeout_millis: 3000,
            executables: BTreeMap::new(),
            working_directory: None,
        }
    }
}

impl ToolSettings {
    /// The watchdog duration, or `None` when disabled (`timeout_millis <= 0`).
    pub fn timeout(&self) -> Option<Duration> {
        if self.timeout_millis <= 0 {
            None
        } else {
            Some(Duration::from_millis(self.timeout_millis as u64))
        }
    }

    /// The configured executable override for a sub-command, if any.
    pub fn executable_for(&self, sub_command: &str) -> Option<&str> {
        self.executables
            .get(sub_command)
            .map(String::as_str)
            .filter(|exe| !exe.trim().is_empty())
    }

    /// The working directory every invocation runs in.
    pub fn working_directory(&self) -> PathBuf {
        self.working_directory.clone().unwrap_or_else(env::temp_dir)
    }
}

/// A named, independently configured rendition of an upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Variant {
    pub name: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

impl Variant {
    pub fn dimension(&self) -> Dimension {
        Dimension::new(self.width, self.height)
    }
}

/// Full processor configuration: tool settings plus the ordered variant
/// table. Declaration order is the processing order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessorConfig {
    pub settings: ToolSettings,
    pub variants: Vec<Variant>,
}

impl ProcessorConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::from_toml_str(&fs::read_to_string(path)?)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }
}
