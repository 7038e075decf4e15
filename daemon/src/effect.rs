//! Effect identifiers and haptic styles
//!
//! Effects are the abstract, semantically named haptic events callers ask
//! for. Their wire values are fixed by the hosting service interface, so
//! every enum here carries an explicit discriminant and a raw conversion.
//!
//! ## Ranges
//! - `< DURATION_DEFAULT`: framework feedback effects (click, tick, ...)
//! - `DURATION_*`: requests expressed as "vibrate for N ms"
//! - `(CUSTOM_EFFECT_START, CUSTOM_EFFECT_END)`: vendor UI effects

use std::fmt;

/// First wire value of the duration block
pub const DURATION_DEFAULT_ID: i32 = 100;

/// Exclusive lower bound of the custom effect range
pub const CUSTOM_EFFECT_START: i32 = 200;

/// Exclusive upper bound of the custom effect range
pub const CUSTOM_EFFECT_END: i32 = 218;

/// Wire value of the texture tick effect.
///
/// Requested by an upstream feature that the hardware has no waveform for;
/// it is rejected like any other unsupported effect but never logged as an
/// anomaly.
pub const TEXTURE_TICK_ID: i32 = 21;

/// Abstract haptic effect identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Effect {
    Click = 0,
    DoubleClick = 1,
    Tick = 2,
    Thud = 3,
    Pop = 4,
    HeavyClick = 5,
    TextureTick = TEXTURE_TICK_ID,

    /// Resolve by duration (see [`classify_duration`])
    DurationDefault = DURATION_DEFAULT_ID,
    DurationAlarmCall = 101,
    DurationNotification = 102,
    DurationStrengthLevel1 = 103,
    DurationStrengthLevel2 = 104,
    DurationStrengthLevel3 = 105,
    DurationStrengthLevel4 = 106,
    DurationStrengthLevel5 = 107,
    DurationStrengthLevel6 = 108,
    DurationStrengthLevel7 = 109,
    DurationStrengthLevel8 = 110,
    DurationStrengthLevel9 = 111,
    DurationStrengthLevel10 = 112,

    RingtoneCut = 201,
    AlertSliderBottom = 202,
    AlertSliderMiddle = 203,
    BackGesture = 204,
    ButtonClick = 205,
    ClearAllNotification = 206,
    ClearAllRecent = 207,
    KeyboardPress = 208,
    PlugIn = 209,
    ScreenOff = 210,
    ScreenOn = 211,
    Screenshot = 212,
    SliderEdge = 213,
    SliderStep = 214,
    SwitchToggle = 215,
    UnifiedError = 216,
    UnifiedSuccess = 217,
}

impl Effect {
    /// Every known effect, in wire order
    pub const ALL: [Effect; 37] = [
        Effect::Click,
        Effect::DoubleClick,
        Effect::Tick,
        Effect::Thud,
        Effect::Pop,
        Effect::HeavyClick,
        Effect::TextureTick,
        Effect::DurationDefault,
        Effect::DurationAlarmCall,
        Effect::DurationNotification,
        Effect::DurationStrengthLevel1,
        Effect::DurationStrengthLevel2,
        Effect::DurationStrengthLevel3,
        Effect::DurationStrengthLevel4,
        Effect::DurationStrengthLevel5,
        Effect::DurationStrengthLevel6,
        Effect::DurationStrengthLevel7,
        Effect::DurationStrengthLevel8,
        Effect::DurationStrengthLevel9,
        Effect::DurationStrengthLevel10,
        Effect::RingtoneCut,
        Effect::AlertSliderBottom,
        Effect::AlertSliderMiddle,
        Effect::BackGesture,
        Effect::ButtonClick,
        Effect::ClearAllNotification,
        Effect::ClearAllRecent,
        Effect::KeyboardPress,
        Effect::PlugIn,
        Effect::ScreenOff,
        Effect::ScreenOn,
        Effect::Screenshot,
        Effect::SliderEdge,
        Effect::SliderStep,
        Effect::SwitchToggle,
        Effect::UnifiedError,
        Effect::UnifiedSuccess,
    ];

    /// Wire value of this effect
    pub fn to_raw(self) -> i32 {
        self as i32
    }

    /// Map a wire value back to an effect
    pub fn from_raw(raw: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|effect| effect.to_raw() == raw)
    }

    /// Whether this is one of the ten discrete strength levels
    pub fn is_strength_level(self) -> bool {
        let raw = self.to_raw();
        raw >= Effect::DurationStrengthLevel1.to_raw()
            && raw <= Effect::DurationStrengthLevel10.to_raw()
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.to_raw())
    }
}

/// Global haptic "feel" preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(i32)]
pub enum Style {
    #[default]
    Crisp = 0,
    Gentle = 1,
}

impl Style {
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(Style::Crisp),
            1 => Some(Style::Gentle),
            _ => None,
        }
    }

    pub fn to_raw(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Style::Crisp => write!(f, "crisp"),
            Style::Gentle => write!(f, "gentle"),
        }
    }
}

/// Resolve a raw "vibrate for N ms" request to a concrete effect.
///
/// Short requests become discrete strength levels; longer ones fall into
/// the notification or alarm/call duration classes.
pub fn classify_duration(duration_ms: u64) -> Effect {
    match duration_ms {
        0..=16 => Effect::DurationStrengthLevel3,
        17..=33 => Effect::DurationStrengthLevel6,
        34..=50 => Effect::DurationStrengthLevel10,
        51..=299 => Effect::DurationNotification,
        _ => Effect::DurationAlarmCall,
    }
}

/// Whether an effect is UI feedback (and therefore uses the haptic channel)
pub fn is_haptic_feedback(effect: Effect) -> bool {
    let raw = effect.to_raw();
    raw < DURATION_DEFAULT_ID
        || effect.is_strength_level()
        || (raw > CUSTOM_EFFECT_START && raw < CUSTOM_EFFECT_END)
}

/// Whether an effect is one of the two duration classes
pub fn is_duration_vibration(effect: Effect) -> bool {
    matches!(effect, Effect::DurationAlarmCall | Effect::DurationNotification)
}
