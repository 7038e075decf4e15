//! Strength channels and magnitude computation
//!
//! Each of the three channels carries a user-facing level in `0..=max_level`.
//! Stage magnitudes are derived from the channel level (or from the one-shot
//! amplitude override) mapped linearly into `[MIN_MAGNITUDE, MAX_MAGNITUDE]`
//! and then multiplied by the stage scale.

use std::fmt;

use crate::effect::{is_haptic_feedback, Effect};

/// Lowest magnitude the actuator renders reliably
pub const MIN_MAGNITUDE: u32 = 0x1111;

/// Full-scale magnitude
pub const MAX_MAGNITUDE: u32 = 0x7fff;

/// Level granularity of the one-shot amplitude override
const OVERRIDE_MAX_LEVEL: u32 = 0xff;

/// Independently adjustable intensity setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum StrengthChannel {
    AlarmCall = 0,
    Haptic = 1,
    Notification = 2,
}

impl StrengthChannel {
    pub const ALL: [StrengthChannel; 3] = [
        StrengthChannel::AlarmCall,
        StrengthChannel::Haptic,
        StrengthChannel::Notification,
    ];

    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(StrengthChannel::AlarmCall),
            1 => Some(StrengthChannel::Haptic),
            2 => Some(StrengthChannel::Notification),
            _ => None,
        }
    }

    pub fn to_raw(self) -> i32 {
        self as i32
    }

    /// Channel an effect draws its level from
    pub fn for_effect(effect: Effect) -> Self {
        if is_haptic_feedback(effect) {
            StrengthChannel::Haptic
        } else if effect == Effect::DurationNotification {
            StrengthChannel::Notification
        } else {
            StrengthChannel::AlarmCall
        }
    }

    /// Level range of this channel
    pub fn range(self) -> LevelRange {
        match self {
            StrengthChannel::AlarmCall => LevelRange::new(5, 5),
            StrengthChannel::Haptic => LevelRange::new(14, 14),
            StrengthChannel::Notification => LevelRange::new(5, 5),
        }
    }
}

impl fmt::Display for StrengthChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrengthChannel::AlarmCall => write!(f, "alarm_call"),
            StrengthChannel::Haptic => write!(f, "haptic"),
            StrengthChannel::Notification => write!(f, "notification"),
        }
    }
}

/// `(max_level, default_level)` of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelRange {
    pub max_level: u32,
    pub default_level: u32,
}

impl LevelRange {
    pub const fn new(max_level: u32, default_level: u32) -> Self {
        Self {
            max_level,
            default_level,
        }
    }

    /// Range reported for a channel value nobody recognizes
    pub const UNKNOWN: LevelRange = LevelRange::new(0, 0);

    /// Range for a raw channel value, [`LevelRange::UNKNOWN`] if unrecognized
    pub fn for_raw(raw: i32) -> Self {
        StrengthChannel::from_raw(raw)
            .map(StrengthChannel::range)
            .unwrap_or(Self::UNKNOWN)
    }
}

/// Current level of each channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrengthLevels {
    alarm_call: u32,
    haptic: u32,
    notification: u32,
}

impl Default for StrengthLevels {
    fn default() -> Self {
        Self {
            alarm_call: StrengthChannel::AlarmCall.range().default_level,
            haptic: StrengthChannel::Haptic.range().default_level,
            notification: StrengthChannel::Notification.range().default_level,
        }
    }
}

impl StrengthLevels {
    pub fn level(&self, channel: StrengthChannel) -> u32 {
        match channel {
            StrengthChannel::AlarmCall => self.alarm_call,
            StrengthChannel::Haptic => self.haptic,
            StrengthChannel::Notification => self.notification,
        }
    }

    /// Set a channel level, clamped to the channel's maximum.
    ///
    /// Returns the level actually stored.
    pub fn set_level(&mut self, channel: StrengthChannel, level: u32) -> u32 {
        let level = level.min(channel.range().max_level);
        match channel {
            StrengthChannel::AlarmCall => self.alarm_call = level,
            StrengthChannel::Haptic => self.haptic = level,
            StrengthChannel::Notification => self.notification = level,
        }
        level
    }

    /// Derived strength scale `level / max_level`
    pub fn scale(&self, channel: StrengthChannel) -> f32 {
        self.level(channel) as f32 / channel.range().max_level as f32
    }
}

/// Map `level` of `max_level` into the magnitude range
fn level_to_magnitude(level: u32, max_level: u32) -> u32 {
    level * (MAX_MAGNITUDE - MIN_MAGNITUDE) / max_level + MIN_MAGNITUDE
}

/// Magnitude for one stage of `effect`.
///
/// An `amplitude` other than 1.0 overrides the channel level unless the
/// composite entry is `fixed_scale`.
pub fn magnitude(
    levels: &StrengthLevels,
    effect: Effect,
    amplitude: f32,
    stage_scale: f32,
    fixed_scale: bool,
) -> i16 {
    let base = if amplitude == 1.0 || fixed_scale {
        let channel = StrengthChannel::for_effect(effect);
        level_to_magnitude(levels.level(channel), channel.range().max_level)
    } else {
        let level = (amplitude * OVERRIDE_MAX_LEVEL as f32) as u8;
        level_to_magnitude(level as u32, OVERRIDE_MAX_LEVEL)
    };
    (base as f32 * stage_scale) as i16
}
