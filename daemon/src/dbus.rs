//! D-Bus IPC server for hapticd
//!
//! Hosts the playback engine as the `org.hapticd.Vibrator` interface.
//! Every request goes through the one shared engine lock, so requests are
//! handled one at a time. The lock can be held across a multi-stage play,
//! so engine calls wait for it on the blocking pool, never on a runtime
//! worker.
//!
//! ## Interface: org.hapticd.Vibrator
//!
//! ### Methods:
//! - `Initialize()` - Discover and bind the haptics device
//! - `Play(effect_id: i32, duration_ms: u64) -> i64` - Play an effect; -1 on failure
//! - `Stop()` - Release the outstanding effect
//! - `SetAmplitude(amplitude: f64)` - One-shot amplitude for the next play
//! - `SetStyle(style: i32)` / `IsStyleSupported(style: i32) -> bool`
//! - `GetStrengthRange(channel: i32) -> (u32, u32)` - `(max, default)` level
//! - `SetStrengthLevel(channel: i32, level: u32)`
//! - `IsEffectSupported(effect_id: i32) -> bool`
//! - `ReadTouchNode(feature_id: i32) -> String`
//! - `WriteTouchNode(feature_id: i32, value: String) -> i32`
//!
//! ### Properties:
//! - `DaemonVersion`

use std::sync::Arc;

use zbus::{fdo, interface};

use crate::catalog;
use crate::config::{BusKind, DeviceConfig};
use crate::effect::{Effect, Style};
use crate::engine::{PlaybackEngine, SharedEngine};
use crate::touch::{BusTouchLocator, TouchFeatureClient};

/// D-Bus interface name
pub const DBUS_INTERFACE: &str = "org.hapticd.Vibrator";

/// D-Bus object path
pub const DBUS_PATH: &str = "/org/hapticd/Vibrator";

/// D-Bus bus name
pub const DBUS_NAME: &str = "org.hapticd";

/// Value `Play` returns when nothing was played
pub const PLAY_FAILED: i64 = -1;

/// Touch client as deployed
pub type SharedTouchClient = Arc<TouchFeatureClient<BusTouchLocator>>;

/// hapticd D-Bus service
pub struct VibratorService {
    /// Daemon version
    version: String,
    /// Shared playback engine
    engine: SharedEngine,
    /// Where `Initialize` looks for the device
    device: DeviceConfig,
    /// Touch-feature collaborator
    touch: SharedTouchClient,
}

impl VibratorService {
    pub fn new(engine: SharedEngine, device: DeviceConfig, touch: SharedTouchClient) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            engine,
            device,
            touch,
        }
    }

    /// Run `f` against the locked engine on the blocking pool
    async fn with_engine<T, F>(&self, f: F) -> fdo::Result<T>
    where
        F: FnOnce(&mut PlaybackEngine) -> T + Send + 'static,
        T: Send + 'static,
    {
        let engine = Arc::clone(&self.engine);
        tokio::task::spawn_blocking(move || {
            let mut engine = engine.lock().map_err(|e| {
                tracing::error!(error = %e, "Failed to lock playback engine");
                fdo::Error::Failed("Playback engine unavailable".to_string())
            })?;
            Ok(f(&mut *engine))
        })
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Engine task failed");
            fdo::Error::Failed("Playback engine task failed".to_string())
        })?
    }
}

#[interface(name = "org.hapticd.Vibrator")]
impl VibratorService {
    /// Discover and bind the haptics device
    ///
    /// Discovery runs once per process; later calls report its outcome.
    async fn initialize(&self) -> fdo::Result<()> {
        tracing::info!("Initialize called");
        let device = self.device.clone();
        self.with_engine(move |engine| {
            engine.initialize(&device.input_dir, &device.driver_name)
        })
        .await?
        .map_err(|e| fdo::Error::Failed(e.to_string()))
    }

    /// Play an effect
    ///
    /// Returns the playback duration in milliseconds, or -1 if nothing
    /// was played. Multi-stage effects sleep between stages, holding the
    /// engine until they finish.
    async fn play(&self, effect_id: i32, duration_ms: u64) -> i64 {
        let result = self
            .with_engine(move |engine| engine.play_raw(effect_id, duration_ms))
            .await;

        match result {
            Ok(Ok(played)) => i64::try_from(played).unwrap_or(i64::MAX),
            Ok(Err(e)) => {
                tracing::debug!(effect_id, error = %e, "Play failed");
                PLAY_FAILED
            }
            Err(_) => PLAY_FAILED,
        }
    }

    /// Release the outstanding effect
    async fn stop(&self) -> fdo::Result<()> {
        self.with_engine(|engine| engine.turn_off()).await
    }

    /// One-shot amplitude override in `[0, 1]`, consumed by the next play
    async fn set_amplitude(&self, amplitude: f64) -> fdo::Result<()> {
        self.with_engine(move |engine| engine.set_amplitude(amplitude as f32))
            .await
    }

    /// Switch the global style
    async fn set_style(&self, style: i32) -> fdo::Result<()> {
        let style = Style::from_raw(style)
            .ok_or_else(|| fdo::Error::InvalidArgs(format!("Unknown style {}", style)))?;
        self.with_engine(move |engine| engine.set_style(style)).await
    }

    /// `(max, default)` level of a strength channel; `(0, 0)` if unknown
    async fn get_strength_range(&self, channel: i32) -> fdo::Result<(u32, u32)> {
        let range = self
            .with_engine(move |engine| engine.strength_range(channel))
            .await?;
        Ok((range.max_level, range.default_level))
    }

    /// Set the level of a strength channel
    async fn set_strength_level(&self, channel: i32, level: u32) -> fdo::Result<()> {
        self.with_engine(move |engine| engine.set_strength_level_raw(channel, level))
            .await?
            .map(|_| ())
            .map_err(|e| fdo::Error::InvalidArgs(e.to_string()))
    }

    async fn is_effect_supported(&self, effect_id: i32) -> bool {
        Effect::from_raw(effect_id).is_some_and(catalog::is_supported)
    }

    async fn is_style_supported(&self, style: i32) -> bool {
        Style::from_raw(style).is_some()
    }

    /// Read a touch-feature node
    async fn read_touch_node(&self, feature_id: i32) -> fdo::Result<String> {
        self.touch
            .read_node(feature_id)
            .await
            .map_err(|e| fdo::Error::Failed(e.to_string()))
    }

    /// Write a touch-feature node
    async fn write_touch_node(&self, feature_id: i32, value: &str) -> fdo::Result<i32> {
        self.touch
            .write_node(feature_id, value)
            .await
            .map_err(|e| fdo::Error::Failed(e.to_string()))
    }

    // =========================================================================
    // PROPERTIES
    // =========================================================================

    /// Get daemon version
    #[zbus(property)]
    async fn daemon_version(&self) -> &str {
        &self.version
    }
}

/// Initialize and run the D-Bus service
///
/// Connects to the configured bus, registers the service name, and exports
/// the interface at the object path.
///
/// # Returns
/// A `zbus::Connection` that should be kept alive for the service to run.
pub async fn init_dbus_service(
    bus: BusKind,
    service: VibratorService,
) -> zbus::Result<zbus::Connection> {
    let builder = match bus {
        BusKind::System => zbus::connection::Builder::system()?,
        BusKind::Session => zbus::connection::Builder::session()?,
    };

    let connection = builder
        .name(DBUS_NAME)?
        .serve_at(DBUS_PATH, service)?
        .build()
        .await?;

    tracing::info!(
        name = DBUS_NAME,
        path = DBUS_PATH,
        bus = ?bus,
        "D-Bus service registered"
    );

    Ok(connection)
}
