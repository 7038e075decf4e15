//! hapticd Library
//!
//! Public API for testing and integration.

pub mod catalog;
pub mod config;
pub mod dbus;
pub mod effect;
pub mod engine;
pub mod evdev;
pub mod ff;
pub mod firmware;
pub mod strength;
pub mod touch;

/// Re-export commonly used types
pub use catalog::{lookup, CompositeEffect, Stage, CATALOG};
pub use config::{BusKind, Config, ConfigError};
pub use dbus::{init_dbus_service, VibratorService, DBUS_INTERFACE, DBUS_NAME, DBUS_PATH};
pub use effect::{classify_duration, is_duration_vibration, is_haptic_feedback, Effect, Style};
pub use engine::{new_shared_engine, PlaybackEngine, PlaybackError, SharedEngine};
pub use evdev::{DeviceError, DeviceInfo, EffectFrame, ForceFeedbackDevice, HapticDevice};
pub use firmware::{FirmwareCache, FirmwareDirs, WaveformBlob};
pub use strength::{LevelRange, StrengthChannel, StrengthLevels};
pub use touch::{BusTouchLocator, TouchError, TouchFeatureClient};
