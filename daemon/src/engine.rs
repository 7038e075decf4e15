//! Playback engine
//!
//! Owns every piece of mutable playback state: the bound device and its one
//! outstanding effect slot, the firmware cache, the global style, the
//! one-shot amplitude override, channel strength levels and the suppression
//! window.
//!
//! ## Play sequence
//! A request is resolved through the catalog, then each stage is uploaded
//! and played in turn. At most one slot is live on the device; the previous
//! slot is erased before every upload. Pauses between stages block the
//! calling thread.
//!
//! ## Suppression window
//! When a composite effect finishes faster than its minimum interval, the
//! same effect is rejected until the interval has passed. The window is a
//! deadline checked on the next call, so nothing runs in the background and
//! a new window simply replaces the old one.
//!
//! The engine does no locking of its own; share it through [`SharedEngine`].

use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::catalog::{self, CompositeEffect, Stage};
use crate::effect::{classify_duration, is_duration_vibration, Effect, Style, TEXTURE_TICK_ID};
use crate::evdev::{self, DeviceError, EffectFrame, ForceFeedbackDevice, HapticDevice};
use crate::firmware::{FirmwareCache, FirmwareDirs};
use crate::strength::{self, LevelRange, StrengthChannel, StrengthLevels};

/// Durations at or below this are too short to render as a duration class
const SHORT_DURATION_MS: u64 = 50;

/// Engine shared with the service layer
pub type SharedEngine = Arc<Mutex<PlaybackEngine>>;

/// Create a shared engine bound to nothing yet
pub fn new_shared_engine(firmware_dirs: FirmwareDirs) -> SharedEngine {
    Arc::new(Mutex::new(PlaybackEngine::new(firmware_dirs)))
}

/// Playback error type
#[derive(Debug)]
pub enum PlaybackError {
    /// No force-feedback device was found at startup
    DeviceUnavailable,
    /// Effect id is not in the catalog and not a duration class
    UnsupportedEffect(i32),
    /// An expected firmware waveform could not be loaded
    FirmwareMissing { style: Style, id: u32 },
    /// Upload, play or erase failed on the device
    HardwareIo(io::Error),
    /// Strength operation on an unrecognized channel
    UnknownChannel(i32),
    /// Same effect requested again inside its suppression window
    Suppressed(Effect),
}

impl std::fmt::Display for PlaybackError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackError::DeviceUnavailable => write!(f, "Haptics device unavailable"),
            PlaybackError::UnsupportedEffect(id) => write!(f, "Effect {} not supported", id),
            PlaybackError::FirmwareMissing { style, id } => {
                write!(f, "Firmware waveform {} ({}) not available", id, style)
            }
            PlaybackError::HardwareIo(e) => write!(f, "Device I/O error: {}", e),
            PlaybackError::UnknownChannel(raw) => write!(f, "Unknown strength channel {}", raw),
            PlaybackError::Suppressed(effect) => {
                write!(f, "{} suppressed until its minimum interval elapses", effect)
            }
        }
    }
}

impl std::error::Error for PlaybackError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PlaybackError::HardwareIo(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for PlaybackError {
    fn from(e: io::Error) -> Self {
        PlaybackError::HardwareIo(e)
    }
}

/// Active suppression window
#[derive(Debug, Clone, Copy)]
struct Suppression {
    effect: Effect,
    until: Instant,
}

/// Haptic effect playback engine
pub struct PlaybackEngine<D: HapticDevice = ForceFeedbackDevice> {
    device: Option<D>,
    initialized: bool,
    firmware: FirmwareCache,
    style: Style,
    amplitude: f32,
    levels: StrengthLevels,
    current_slot: Option<i16>,
    suppression: Option<Suppression>,
}

impl<D: HapticDevice> std::fmt::Debug for PlaybackEngine<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackEngine")
            .field("device", &self.device.is_some())
            .field("initialized", &self.initialized)
            .field("style", &self.style)
            .field("amplitude", &self.amplitude)
            .field("levels", &self.levels)
            .field("current_slot", &self.current_slot)
            .field("suppression", &self.suppression)
            .finish_non_exhaustive()
    }
}

impl PlaybackEngine<ForceFeedbackDevice> {
    /// Discover and bind the haptics device.
    ///
    /// Runs discovery once; later calls return the outcome of the first.
    /// A failed discovery is permanent and every `play` reports
    /// [`PlaybackError::DeviceUnavailable`].
    pub fn initialize(&mut self, input_dir: &Path, driver_name: &str) -> Result<(), DeviceError> {
        if self.initialized {
            return if self.device.is_some() {
                Ok(())
            } else {
                Err(DeviceError::DeviceNotFound)
            };
        }

        match evdev::discover(input_dir, driver_name) {
            Ok(device) => {
                tracing::info!(path = %device.path().display(), "Playback engine initialized");
                self.bind(Some(device));
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "No haptics device, playback disabled");
                self.bind(None);
                Err(e)
            }
        }
    }
}

impl<D: HapticDevice> PlaybackEngine<D> {
    pub fn new(firmware_dirs: FirmwareDirs) -> Self {
        Self {
            device: None,
            initialized: false,
            firmware: FirmwareCache::new(firmware_dirs),
            style: Style::default(),
            amplitude: 1.0,
            levels: StrengthLevels::default(),
            current_slot: None,
            suppression: None,
        }
    }

    /// Bind the outcome of device discovery; the first call wins
    pub fn bind(&mut self, device: Option<D>) {
        if self.initialized {
            tracing::debug!("Device binding already done, ignoring");
            return;
        }
        self.device = device;
        self.initialized = true;
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn has_device(&self) -> bool {
        self.device.is_some()
    }

    pub fn device(&self) -> Option<&D> {
        self.device.as_ref()
    }

    pub fn firmware(&self) -> &FirmwareCache {
        &self.firmware
    }

    pub fn style(&self) -> Style {
        self.style
    }

    pub fn amplitude(&self) -> f32 {
        self.amplitude
    }

    pub fn current_slot(&self) -> Option<i16> {
        self.current_slot
    }

    /// Whether a suppression window is still open
    pub fn is_suppressed(&self) -> bool {
        self.suppression
            .is_some_and(|s| Instant::now() < s.until)
    }

    /// Play an effect given its wire value
    pub fn play_raw(&mut self, raw: i32, duration_ms: u64) -> Result<u64, PlaybackError> {
        match Effect::from_raw(raw) {
            Some(effect) => self.play(effect, duration_ms),
            None => {
                if self.device.is_none() {
                    tracing::error!("Play requested but haptics device is unavailable");
                    self.turn_off();
                    return Err(PlaybackError::DeviceUnavailable);
                }
                tracing::error!(effect_id = raw, "Effect not supported");
                self.turn_off();
                Err(PlaybackError::UnsupportedEffect(raw))
            }
        }
    }

    /// Play `effect`, returning the reported playback duration in ms
    pub fn play(&mut self, effect: Effect, duration_ms: u64) -> Result<u64, PlaybackError> {
        tracing::debug!(effect = %effect, duration_ms, "Play requested");

        if self.device.is_none() {
            tracing::error!("Play requested but haptics device is unavailable");
            self.turn_off();
            return Err(PlaybackError::DeviceUnavailable);
        }

        if effect == Effect::DurationDefault {
            return self.play(classify_duration(duration_ms), duration_ms);
        }

        if !catalog::is_supported(effect) {
            if effect.to_raw() == TEXTURE_TICK_ID {
                tracing::debug!(effect = %effect, "Texture tick has no waveform, ignored");
            } else {
                tracing::error!(effect = %effect, "Effect not supported");
            }
            self.turn_off();
            return Err(PlaybackError::UnsupportedEffect(effect.to_raw()));
        }

        if is_duration_vibration(effect) && duration_ms <= SHORT_DURATION_MS {
            tracing::debug!(effect = %effect, duration_ms, "Short duration, using level 10");
            return self.play(Effect::DurationStrengthLevel10, duration_ms);
        }

        if let Some(window) = self.suppression {
            if Instant::now() < window.until && window.effect == effect {
                tracing::debug!(effect = %effect, "Inside minimum interval, same effect ignored");
                return Err(PlaybackError::Suppressed(effect));
            }
            self.suppression = None;
        }

        let composite = catalog::lookup(effect, self.style);
        if composite.is_none() && duration_ms == 0 {
            tracing::error!(effect = %effect, "Zero duration and no composite entry");
            self.turn_off();
            return Err(PlaybackError::UnsupportedEffect(effect.to_raw()));
        }

        let elapsed = match self.run_stages(effect, composite, duration_ms) {
            Ok(elapsed) => elapsed,
            Err(e) => {
                tracing::error!(effect = %effect, error = %e, "Play aborted");
                self.turn_off();
                return Err(e);
            }
        };
        self.amplitude = 1.0;

        tracing::debug!(effect = %effect, elapsed_ms = elapsed, "Play done");

        match composite {
            Some(c) if elapsed < c.min_interval_ms => {
                let remaining = c.min_interval_ms - elapsed;
                self.suppression = Some(Suppression {
                    effect,
                    until: Instant::now() + Duration::from_millis(remaining),
                });
                Ok(c.min_interval_ms)
            }
            _ => Ok(elapsed),
        }
    }

    /// Upload and play every stage, returning the accumulated elapsed time
    fn run_stages(
        &mut self,
        effect: Effect,
        composite: Option<&'static CompositeEffect>,
        duration_ms: u64,
    ) -> Result<u64, PlaybackError> {
        let device = self.device.as_mut().ok_or(PlaybackError::DeviceUnavailable)?;
        let stages = composite.map_or(1, |c| c.stages.len());
        let mut elapsed = 0u64;

        for i in 0..stages {
            if let Some(slot) = self.current_slot.take() {
                if let Err(e) = device.erase(slot) {
                    tracing::warn!(slot, error = %e, "Failed to erase previous effect");
                }
            }

            let (scale, fixed_scale) = match composite {
                Some(c) => (c.stage_scale(i), c.fixed_scale),
                None => (1.0, false),
            };
            let magnitude =
                strength::magnitude(&self.levels, effect, self.amplitude, scale, fixed_scale);

            let (frame, length_ms) = match composite.map(|c| (c, c.stages[i])) {
                Some((c, Stage::Waveform(id))) => {
                    let style = c.firmware_style(self.style);
                    let waveform = self
                        .firmware
                        .load(style, id)
                        .ok_or(PlaybackError::FirmwareMissing { style, id })?;
                    let length_ms = waveform.duration_ms();
                    tracing::debug!(stage = i, firmware_id = id, style = %style, magnitude, "Waveform stage");
                    (EffectFrame::Custom { magnitude, waveform }, length_ms)
                }
                Some((_, Stage::Pulse(ms))) => (constant_frame(magnitude, ms as u64), ms as u64),
                None => (constant_frame(magnitude, duration_ms), duration_ms),
            };

            let slot = device.upload(&frame)?;
            self.current_slot = Some(slot);
            elapsed += length_ms;
            device.play(slot)?;

            if let Some(c) = composite {
                let pause = c.sleep_after(i);
                if i + 1 < stages && pause > 0 {
                    elapsed += pause;
                    std::thread::sleep(Duration::from_millis(pause));
                }
            }
        }

        Ok(elapsed)
    }

    /// Release the outstanding slot and reset the amplitude override.
    ///
    /// Does nothing while a suppression window is open.
    pub fn turn_off(&mut self) {
        if self.is_suppressed() {
            tracing::debug!("Turn off ignored inside suppression window");
            return;
        }
        if let Some(slot) = self.current_slot.take() {
            if let Some(device) = self.device.as_mut() {
                if let Err(e) = device.erase(slot) {
                    tracing::warn!(slot, error = %e, "Failed to erase effect");
                }
            }
        }
        self.amplitude = 1.0;
    }

    /// One-shot amplitude override for the next play
    pub fn set_amplitude(&mut self, amplitude: f32) {
        tracing::debug!(amplitude, "Amplitude set");
        self.amplitude = amplitude;
    }

    pub fn set_style(&mut self, style: Style) {
        tracing::debug!(style = %style, "Style set");
        self.style = style;
    }

    /// Set a channel level; returns the level stored after clamping
    pub fn set_strength_level(&mut self, channel: StrengthChannel, level: u32) -> u32 {
        let stored = self.levels.set_level(channel, level);
        tracing::debug!(
            channel = %channel,
            level = stored,
            scale = self.levels.scale(channel),
            "Strength level set"
        );
        stored
    }

    /// Set a channel level by wire value
    pub fn set_strength_level_raw(&mut self, raw: i32, level: u32) -> Result<u32, PlaybackError> {
        match StrengthChannel::from_raw(raw) {
            Some(channel) => Ok(self.set_strength_level(channel, level)),
            None => {
                tracing::error!(channel = raw, "Unknown strength channel");
                Err(PlaybackError::UnknownChannel(raw))
            }
        }
    }

    pub fn strength_levels(&self) -> &StrengthLevels {
        &self.levels
    }

    /// `(max, default)` level range of a raw channel
    pub fn strength_range(&self, raw: i32) -> LevelRange {
        let range = LevelRange::for_raw(raw);
        if range == LevelRange::UNKNOWN {
            tracing::error!(channel = raw, "Unknown strength channel");
        }
        range
    }
}

/// Constant pulse frame; the kernel replay length tops out at `u16::MAX` ms
fn constant_frame(level: i16, length_ms: u64) -> EffectFrame {
    let capped = u16::try_from(length_ms).unwrap_or(u16::MAX);
    if u64::from(capped) != length_ms {
        tracing::warn!(
            requested_ms = length_ms,
            played_ms = capped,
            "Constant pulse longer than the device allows, capped"
        );
    }
    EffectFrame::Constant {
        level,
        length_ms: capped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strength::MAX_MAGNITUDE;
    use std::fs;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Upload(EffectFrame),
        Play(i16),
        Erase(i16),
    }

    #[derive(Default)]
    struct MockDevice {
        calls: Arc<Mutex<Vec<Call>>>,
        next_slot: i16,
        fail_upload: bool,
        fail_play: bool,
    }

    impl HapticDevice for MockDevice {
        fn upload(&mut self, frame: &EffectFrame) -> io::Result<i16> {
            if self.fail_upload {
                return Err(io::Error::from_raw_os_error(libc::EINVAL));
            }
            self.calls.lock().unwrap().push(Call::Upload(frame.clone()));
            let slot = self.next_slot;
            self.next_slot += 1;
            Ok(slot)
        }

        fn play(&mut self, slot: i16) -> io::Result<()> {
            self.calls.lock().unwrap().push(Call::Play(slot));
            if self.fail_play {
                return Err(io::Error::from_raw_os_error(libc::EBADF));
            }
            Ok(())
        }

        fn erase(&mut self, slot: i16) -> io::Result<()> {
            self.calls.lock().unwrap().push(Call::Erase(slot));
            Ok(())
        }
    }

    struct Fixture {
        _root: TempDir,
        dirs: FirmwareDirs,
        calls: Arc<Mutex<Vec<Call>>>,
        engine: PlaybackEngine<MockDevice>,
    }

    impl Fixture {
        fn new() -> Self {
            let root = tempfile::tempdir().unwrap();
            let dirs = FirmwareDirs {
                crisp: root.path().join("def"),
                gentle: root.path().join("soft"),
            };
            fs::create_dir_all(&dirs.crisp).unwrap();
            fs::create_dir_all(&dirs.gentle).unwrap();

            let device = MockDevice::default();
            let calls = Arc::clone(&device.calls);
            let mut engine = PlaybackEngine::new(dirs.clone());
            engine.bind(Some(device));
            Self {
                _root: root,
                dirs,
                calls,
                engine,
            }
        }

        fn firmware(&self, style: Style, id: u32, len: usize) {
            fs::write(self.dirs.path_for(style, id), vec![0x40u8; len]).unwrap();
        }

        fn take_calls(&self) -> Vec<Call> {
            std::mem::take(&mut *self.calls.lock().unwrap())
        }
    }

    #[test]
    fn test_click_is_suppressed_inside_interval() {
        let mut fx = Fixture::new();
        fx.firmware(Style::Crisp, 6, 24);

        // 24 samples play in 2 ms, short of the 80 ms interval
        assert_eq!(fx.engine.play(Effect::Click, 0).unwrap(), 80);
        assert!(fx.engine.is_suppressed());
        let calls = fx.take_calls();
        assert_eq!(calls.len(), 2);
        assert!(matches!(calls[1], Call::Play(0)));

        let err = fx.engine.play(Effect::Click, 0).unwrap_err();
        assert!(matches!(err, PlaybackError::Suppressed(Effect::Click)));
        assert!(fx.take_calls().is_empty());
    }

    #[test]
    fn test_different_effect_passes_suppression() {
        let mut fx = Fixture::new();
        fx.firmware(Style::Crisp, 6, 24);
        fx.firmware(Style::Crisp, 2, 24);

        fx.engine.play(Effect::Click, 0).unwrap();
        fx.take_calls();

        assert_eq!(fx.engine.play(Effect::Tick, 0).unwrap(), 120);
        let calls = fx.take_calls();
        assert_eq!(calls[0], Call::Erase(0));
        assert!(matches!(calls[1], Call::Upload(EffectFrame::Custom { .. })));
        assert_eq!(calls[2], Call::Play(1));
    }

    #[test]
    fn test_suppression_expires() {
        let mut fx = Fixture::new();
        fx.firmware(Style::Crisp, 6, 24);

        fx.engine.play(Effect::Click, 0).unwrap();
        std::thread::sleep(Duration::from_millis(100));
        assert!(!fx.engine.is_suppressed());
        assert_eq!(fx.engine.play(Effect::Click, 0).unwrap(), 80);
    }

    #[test]
    fn test_long_waveform_reports_elapsed() {
        let mut fx = Fixture::new();
        // 4800 samples at 24 kHz play for 201 ms
        fx.firmware(Style::Crisp, 6, 4800);

        assert_eq!(fx.engine.play(Effect::Click, 0).unwrap(), 201);
        assert!(!fx.engine.is_suppressed());
    }

    #[test]
    fn test_short_alarm_call_plays_level10() {
        let mut fx = Fixture::new();
        fx.firmware(Style::Crisp, 8, 24);

        let alarm = fx.engine.play(Effect::DurationAlarmCall, 50).unwrap();
        let alarm_calls = fx.take_calls();

        let mut other = Fixture::new();
        other.firmware(Style::Crisp, 8, 24);
        let level10 = other.engine.play(Effect::DurationStrengthLevel10, 50).unwrap();
        let level10_calls = other.take_calls();

        assert_eq!(alarm, level10);
        assert_eq!(alarm_calls, level10_calls);
    }

    #[test]
    fn test_duration_default_classifies() {
        let mut fx = Fixture::new();

        // 400 ms resolves to the alarm/call class: one constant pulse
        assert_eq!(fx.engine.play(Effect::DurationDefault, 400).unwrap(), 400);
        let calls = fx.take_calls();
        assert_eq!(
            calls[0],
            Call::Upload(EffectFrame::Constant {
                level: MAX_MAGNITUDE as i16,
                length_ms: 400
            })
        );
        assert_eq!(calls[1], Call::Play(0));
        assert!(!fx.engine.is_suppressed());
    }

    #[test]
    fn test_turn_off_is_idempotent() {
        let mut fx = Fixture::new();
        fx.engine.play(Effect::DurationAlarmCall, 400).unwrap();
        fx.take_calls();

        fx.engine.turn_off();
        fx.engine.turn_off();
        assert_eq!(fx.take_calls(), vec![Call::Erase(0)]);
        assert_eq!(fx.engine.current_slot(), None);
    }

    #[test]
    fn test_turn_off_noop_while_suppressed() {
        let mut fx = Fixture::new();
        fx.firmware(Style::Crisp, 6, 24);
        fx.engine.play(Effect::Click, 0).unwrap();
        fx.take_calls();

        fx.engine.turn_off();
        assert!(fx.take_calls().is_empty());
        assert_eq!(fx.engine.current_slot(), Some(0));
    }

    #[test]
    fn test_missing_device() {
        let root = tempfile::tempdir().unwrap();
        let dirs = FirmwareDirs {
            crisp: root.path().to_path_buf(),
            gentle: root.path().to_path_buf(),
        };
        fs::write(dirs.path_for(Style::Crisp, 6), vec![1u8; 24]).unwrap();

        let mut engine: PlaybackEngine<MockDevice> = PlaybackEngine::new(dirs);
        engine.bind(None);

        for effect in [Effect::Click, Effect::DurationDefault, Effect::TextureTick] {
            let err = engine.play(effect, 100).unwrap_err();
            assert!(matches!(err, PlaybackError::DeviceUnavailable));
        }
        assert!(matches!(
            engine.play_raw(9999, 10).unwrap_err(),
            PlaybackError::DeviceUnavailable
        ));
        assert!(engine.firmware().is_empty());
    }

    #[test]
    fn test_bind_only_once() {
        let mut fx = Fixture::new();
        fx.engine.bind(None);
        assert!(fx.engine.has_device());
    }

    #[test]
    fn test_unsupported_effects() {
        let mut fx = Fixture::new();

        let err = fx.engine.play(Effect::TextureTick, 0).unwrap_err();
        assert!(matches!(err, PlaybackError::UnsupportedEffect(21)));

        let err = fx.engine.play_raw(150, 0).unwrap_err();
        assert!(matches!(err, PlaybackError::UnsupportedEffect(150)));
        assert!(fx.take_calls().is_empty());
    }

    #[test]
    fn test_zero_duration_without_composite() {
        let mut fx = Fixture::new();
        let err = fx.engine.play(Effect::DurationAlarmCall, 0);
        // Zero is short, so it is re-dispatched as level 10 and needs firmware
        assert!(matches!(
            err.unwrap_err(),
            PlaybackError::FirmwareMissing { style: Style::Crisp, id: 8 }
        ));
    }

    #[test]
    fn test_firmware_missing_aborts() {
        let mut fx = Fixture::new();
        fx.engine.set_amplitude(0.5);

        let err = fx.engine.play(Effect::Click, 0).unwrap_err();
        assert!(matches!(
            err,
            PlaybackError::FirmwareMissing { style: Style::Crisp, id: 6 }
        ));
        assert!(fx.take_calls().is_empty());
        assert_eq!(fx.engine.amplitude(), 1.0);
        assert!(!fx.engine.is_suppressed());
    }

    #[test]
    fn test_upload_failure_is_hardware_io() {
        let mut fx = Fixture::new();
        fx.engine.device.as_mut().unwrap().fail_upload = true;

        let err = fx.engine.play(Effect::DurationAlarmCall, 400).unwrap_err();
        assert!(matches!(err, PlaybackError::HardwareIo(_)));
        assert_eq!(fx.engine.current_slot(), None);
    }

    #[test]
    fn test_firmware_missing_mid_effect_releases_slot() {
        let mut fx = Fixture::new();

        // PlugIn opens with a 200 ms pulse; waveform 108 is absent
        let err = fx.engine.play(Effect::PlugIn, 0).unwrap_err();
        assert!(matches!(
            err,
            PlaybackError::FirmwareMissing { style: Style::Crisp, id: 108 }
        ));

        let calls = fx.take_calls();
        assert_eq!(calls.len(), 3);
        assert!(matches!(
            calls[0],
            Call::Upload(EffectFrame::Constant { length_ms: 200, .. })
        ));
        assert_eq!(calls[1], Call::Play(0));
        assert_eq!(calls[2], Call::Erase(0));
        assert_eq!(fx.engine.current_slot(), None);
        assert!(!fx.engine.is_suppressed());
    }

    #[test]
    fn test_play_failure_releases_slot() {
        let mut fx = Fixture::new();
        fx.engine.device.as_mut().unwrap().fail_play = true;

        let err = fx.engine.play(Effect::DurationAlarmCall, 400).unwrap_err();
        assert!(matches!(err, PlaybackError::HardwareIo(_)));

        let calls = fx.take_calls();
        assert!(matches!(calls[0], Call::Upload(EffectFrame::Constant { .. })));
        assert_eq!(&calls[1..], &[Call::Play(0), Call::Erase(0)]);
        assert_eq!(fx.engine.current_slot(), None);
    }

    #[test]
    fn test_long_constant_pulse_is_capped() {
        let mut fx = Fixture::new();

        assert_eq!(fx.engine.play(Effect::DurationAlarmCall, 100_000).unwrap(), 100_000);
        let calls = fx.take_calls();
        assert!(matches!(
            calls[0],
            Call::Upload(EffectFrame::Constant { length_ms: u16::MAX, .. })
        ));
        assert_eq!(
            constant_frame(100, 65_535),
            EffectFrame::Constant { level: 100, length_ms: 65_535 }
        );
    }

    #[test]
    fn test_amplitude_is_one_shot() {
        let mut fx = Fixture::new();
        fx.engine.set_amplitude(0.5);
        fx.engine.play(Effect::DurationAlarmCall, 400).unwrap();
        assert_eq!(fx.engine.amplitude(), 1.0);

        let calls = fx.take_calls();
        let Call::Upload(EffectFrame::Constant { level, .. }) = calls[0] else {
            panic!("expected constant upload, got {:?}", calls[0]);
        };
        assert!(level < MAX_MAGNITUDE as i16);
    }

    #[test]
    fn test_multi_stage_sleeps_and_single_slot() {
        let mut fx = Fixture::new();
        fx.firmware(Style::Crisp, 8, 24);

        let started = Instant::now();
        // Two 2 ms stages with a 150 ms pause between them
        assert_eq!(fx.engine.play(Effect::DoubleClick, 0).unwrap(), 154);
        assert!(started.elapsed() >= Duration::from_millis(150));

        let calls = fx.take_calls();
        assert_eq!(calls.len(), 5);
        assert!(matches!(calls[0], Call::Upload(_)));
        assert_eq!(calls[1], Call::Play(0));
        assert_eq!(calls[2], Call::Erase(0));
        assert!(matches!(calls[3], Call::Upload(_)));
        assert_eq!(calls[4], Call::Play(1));
    }

    #[test]
    fn test_gentle_style_uses_gentle_firmware() {
        let mut fx = Fixture::new();
        fx.firmware(Style::Gentle, 6, 24);
        fx.engine.set_style(Style::Gentle);

        fx.engine.play(Effect::Click, 0).unwrap();
        assert!(fx.engine.firmware().contains(Style::Gentle, 6));
        assert!(!fx.engine.firmware().contains(Style::Crisp, 6));
    }

    #[test]
    fn test_style_override_resolves_crisp_firmware() {
        let mut fx = Fixture::new();
        fx.firmware(Style::Crisp, 315, 24);
        fx.engine.set_style(Style::Gentle);

        fx.engine.play(Effect::ScreenOff, 0).unwrap();
        assert!(fx.engine.firmware().contains(Style::Crisp, 315));
        assert!(!fx.engine.firmware().contains(Style::Gentle, 315));
    }

    #[test]
    fn test_pulse_stage_uploads_constant() {
        let mut fx = Fixture::new();
        let composite = catalog::lookup(Effect::PlugIn, Style::Crisp).unwrap();
        for stage in composite.stages {
            if let Stage::Waveform(id) = stage {
                fx.firmware(Style::Crisp, *id, 24);
            }
        }

        fx.engine.play(Effect::PlugIn, 0).unwrap();
        let calls = fx.take_calls();
        assert!(matches!(
            calls[0],
            Call::Upload(EffectFrame::Constant { length_ms: 200, .. })
        ));
    }

    #[test]
    fn test_strength_levels() {
        let mut fx = Fixture::new();
        assert_eq!(fx.engine.strength_range(1), LevelRange::new(14, 14));
        assert_eq!(fx.engine.strength_range(7), LevelRange::UNKNOWN);

        assert_eq!(fx.engine.set_strength_level_raw(2, 3).unwrap(), 3);
        assert_eq!(
            fx.engine.strength_levels().level(StrengthChannel::Notification),
            3
        );

        let before = fx.engine.strength_levels().clone();
        let err = fx.engine.set_strength_level_raw(9, 1).unwrap_err();
        assert!(matches!(err, PlaybackError::UnknownChannel(9)));
        assert_eq!(fx.engine.strength_levels(), &before);
    }

    #[test]
    fn test_error_display() {
        let err = PlaybackError::FirmwareMissing { style: Style::Gentle, id: 6 };
        assert_eq!(format!("{}", err), "Firmware waveform 6 (gentle) not available");
        let err: PlaybackError = io::Error::from_raw_os_error(libc::EIO).into();
        assert!(matches!(err, PlaybackError::HardwareIo(_)));
    }
}
