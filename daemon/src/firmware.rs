//! Firmware waveform cache
//!
//! Waveforms are raw sample blobs authored per style and stored as
//! `effect_<id>.bin` under one directory per style. A blob is read once and
//! kept for the lifetime of the process; the firmware set is small and fixed
//! so there is no eviction.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::effect::Style;

/// Sample rate the driver plays firmware waveforms at
pub const PLAY_RATE_HZ: u32 = 24000;

/// Default firmware directory for the crisp style
pub const DEFAULT_CRISP_DIR: &str = "/odm/etc/vibrator/def";

/// Default firmware directory for the gentle style
pub const DEFAULT_GENTLE_DIR: &str = "/odm/etc/vibrator/soft";

/// An immutable firmware waveform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaveformBlob {
    pub effect_id: u32,
    pub play_rate_hz: u32,
    data: Vec<i8>,
}

impl WaveformBlob {
    pub fn new(effect_id: u32, data: Vec<i8>) -> Self {
        Self {
            effect_id,
            play_rate_hz: PLAY_RATE_HZ,
            data,
        }
    }

    /// Raw samples, one signed byte each
    pub fn samples(&self) -> &[i8] {
        &self.data
    }

    /// Length in bytes (equal to the sample count)
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Playback time in milliseconds, rounded up by one to cover the tail
    pub fn duration_ms(&self) -> u64 {
        self.data.len() as u64 * 1000 / self.play_rate_hz as u64 + 1
    }
}

/// Per-style firmware directories
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareDirs {
    pub crisp: PathBuf,
    pub gentle: PathBuf,
}

impl Default for FirmwareDirs {
    fn default() -> Self {
        Self {
            crisp: PathBuf::from(DEFAULT_CRISP_DIR),
            gentle: PathBuf::from(DEFAULT_GENTLE_DIR),
        }
    }
}

impl FirmwareDirs {
    pub fn dir_for(&self, style: Style) -> &Path {
        match style {
            Style::Crisp => &self.crisp,
            Style::Gentle => &self.gentle,
        }
    }

    /// Path of the firmware file for `effect_id` in `style`
    pub fn path_for(&self, style: Style, effect_id: u32) -> PathBuf {
        self.dir_for(style).join(format!("effect_{}.bin", effect_id))
    }
}

/// Memoizing firmware loader keyed by (style, waveform id)
#[derive(Debug, Default)]
pub struct FirmwareCache {
    dirs: FirmwareDirs,
    entries: HashMap<(Style, u32), Arc<WaveformBlob>>,
}

impl FirmwareCache {
    pub fn new(dirs: FirmwareDirs) -> Self {
        Self {
            dirs,
            entries: HashMap::new(),
        }
    }

    /// Load a waveform, reading it from disk on first use.
    ///
    /// Missing or empty files are not cached, so a later call retries.
    pub fn load(&mut self, style: Style, effect_id: u32) -> Option<Arc<WaveformBlob>> {
        if let Some(blob) = self.entries.get(&(style, effect_id)) {
            return Some(Arc::clone(blob));
        }

        let path = self.dirs.path_for(style, effect_id);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(
                    path = %path.display(),
                    effect_id,
                    error = %e,
                    "Failed to read firmware waveform"
                );
                return None;
            }
        };

        if bytes.is_empty() {
            tracing::error!(path = %path.display(), effect_id, "Firmware waveform is empty");
            return None;
        }

        let data = bytes.into_iter().map(|b| b as i8).collect();
        let blob = Arc::new(WaveformBlob::new(effect_id, data));
        tracing::debug!(
            path = %path.display(),
            style = %style,
            effect_id,
            length = blob.len(),
            "Firmware waveform cached"
        );
        self.entries.insert((style, effect_id), Arc::clone(&blob));
        Some(blob)
    }

    /// Number of cached waveforms
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, style: Style, effect_id: u32) -> bool {
        self.entries.contains_key(&(style, effect_id))
    }
}
