//! Configuration management for hapticd
//!
//! Handles loading and validation of the JSON configuration file.
//! Configuration is stored at `~/.config/hapticd/config.json` unless a path
//! is given on the command line. Strength levels and style are runtime-only
//! and never persisted.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::evdev::{DEFAULT_DRIVER_NAME, DEFAULT_INPUT_DIR};
use crate::firmware::{FirmwareDirs, DEFAULT_CRISP_DIR, DEFAULT_GENTLE_DIR};

// ============================================================================
// Constants
// ============================================================================

/// Default config directory name
const CONFIG_DIR: &str = "hapticd";

/// Default config file name
const CONFIG_FILE: &str = "config.json";

/// Default bus name of the touch-feature service
pub const DEFAULT_TOUCH_SERVICE: &str = "org.hapticd.Touch";

// ============================================================================
// Device Configuration
// ============================================================================

/// Where to look for the haptics input device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Directory scanned for `event*` nodes
    #[serde(default = "default_input_dir")]
    pub input_dir: PathBuf,

    /// Kernel name the device must report exactly
    #[serde(default = "default_driver_name")]
    pub driver_name: String,
}

fn default_input_dir() -> PathBuf { PathBuf::from(DEFAULT_INPUT_DIR) }
fn default_driver_name() -> String { DEFAULT_DRIVER_NAME.to_string() }

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            input_dir: default_input_dir(),
            driver_name: default_driver_name(),
        }
    }
}

// ============================================================================
// Firmware Configuration
// ============================================================================

/// Per-style firmware directories
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirmwareConfig {
    /// Waveforms for the crisp style
    #[serde(default = "default_crisp_dir")]
    pub crisp_dir: PathBuf,

    /// Waveforms for the gentle style
    #[serde(default = "default_gentle_dir")]
    pub gentle_dir: PathBuf,
}

fn default_crisp_dir() -> PathBuf { PathBuf::from(DEFAULT_CRISP_DIR) }
fn default_gentle_dir() -> PathBuf { PathBuf::from(DEFAULT_GENTLE_DIR) }

impl Default for FirmwareConfig {
    fn default() -> Self {
        Self {
            crisp_dir: default_crisp_dir(),
            gentle_dir: default_gentle_dir(),
        }
    }
}

impl FirmwareConfig {
    pub fn to_dirs(&self) -> FirmwareDirs {
        FirmwareDirs {
            crisp: self.crisp_dir.clone(),
            gentle: self.gentle_dir.clone(),
        }
    }
}

// ============================================================================
// Service Configuration
// ============================================================================

/// Message bus the service registers on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusKind {
    #[default]
    System,
    Session,
}

/// D-Bus settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Bus to serve the vibrator interface on
    #[serde(default)]
    pub bus: BusKind,

    /// Bus name of the touch-feature collaborator
    #[serde(default = "default_touch_service")]
    pub touch_service: String,
}

fn default_touch_service() -> String { DEFAULT_TOUCH_SERVICE.to_string() }

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bus: BusKind::default(),
            touch_service: default_touch_service(),
        }
    }
}

// ============================================================================
// Main Configuration
// ============================================================================

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Device discovery settings
    #[serde(default)]
    pub device: DeviceConfig,

    /// Firmware locations
    #[serde(default)]
    pub firmware: FirmwareConfig,

    /// Service settings
    #[serde(default)]
    pub service: ServiceConfig,

    /// Configuration file path (not serialized)
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Config {
    /// Get the default config directory path
    pub fn default_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join(CONFIG_DIR))
    }

    /// Get the default config file path
    pub fn default_config_path() -> Option<PathBuf> {
        Self::default_config_dir().map(|p| p.join(CONFIG_FILE))
    }

    /// Load configuration from the default location
    ///
    /// Returns default config if file doesn't exist.
    pub fn load_default() -> Result<Self, ConfigError> {
        match Self::default_config_path() {
            Some(path) => Self::load(&path),
            None => {
                tracing::warn!("Could not determine config directory, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load configuration from file path
    ///
    /// Returns default config if file doesn't exist.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::info!(path = %path.display(), "Config file not found, using defaults");
            let mut config = Self::default();
            config.config_path = Some(path.to_path_buf());
            return Ok(config);
        }

        let contents = fs::read_to_string(path).map_err(ConfigError::IoError)?;
        let mut config: Config =
            serde_json::from_str(&contents).map_err(ConfigError::ParseError)?;

        config.validate()?;
        config.config_path = Some(path.to_path_buf());

        tracing::info!(
            path = %path.display(),
            input_dir = %config.device.input_dir.display(),
            driver = %config.device.driver_name,
            bus = ?config.service.bus,
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Reject values the daemon cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device.driver_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "device.driver_name must not be empty".to_string(),
            ));
        }
        if self.service.touch_service.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "service.touch_service must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = match &self.config_path {
            Some(p) => p.clone(),
            None => Self::default_config_path()
                .ok_or_else(|| ConfigError::ValidationError("No config path".to_string()))?,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(ConfigError::IoError)?;
        }

        let contents = serde_json::to_string_pretty(self).map_err(ConfigError::ParseError)?;
        fs::write(&path, contents).map_err(ConfigError::IoError)?;

        tracing::info!(path = %path.display(), "Configuration saved");
        Ok(())
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration error type
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error reading/writing file
    IoError(std::io::Error),
    /// JSON parsing error
    ParseError(serde_json::Error),
    /// Validation error
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "I/O error: {}", e),
            ConfigError::ParseError(e) => write!(f, "Parse error: {}", e),
            ConfigError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::IoError(e) => Some(e),
            ConfigError::ParseError(e) => Some(e),
            ConfigError::ValidationError(_) => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
