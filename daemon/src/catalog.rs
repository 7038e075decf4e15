//! Static effect catalog
//!
//! Maps an [`Effect`] and a [`Style`] to the composite recipe played on the
//! hardware: an ordered list of stages, per-stage amplitude scales,
//! inter-stage pauses and the minimum replay interval.
//!
//! The table is plain static data; nothing here is mutated at runtime.

use crate::effect::{is_duration_vibration, Effect, Style};

/// Default minimum time between two plays of the same effect
pub const DEFAULT_MIN_INTERVAL_MS: u64 = 50;

/// One stage of a composite effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Firmware waveform streamed to the driver
    Waveform(u32),
    /// Constant-force pulse of the given length in milliseconds
    Pulse(u32),
}

/// Catalog entry for one (effect, style) pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositeEffect {
    pub stages: &'static [Stage],
    /// Amplitude multiplier per stage; empty means 1.0 everywhere
    pub scales: &'static [f32],
    /// Pause after stage `i`, at most `stages.len() - 1` entries
    pub sleep_ms: &'static [u64],
    /// Ignore the one-shot amplitude override
    pub fixed_scale: bool,
    pub min_interval_ms: u64,
    /// Resolve firmware against this style instead of the global one
    pub style_override: Option<Style>,
}

impl CompositeEffect {
    const fn new(stages: &'static [Stage]) -> Self {
        Self {
            stages,
            scales: &[],
            sleep_ms: &[],
            fixed_scale: false,
            min_interval_ms: DEFAULT_MIN_INTERVAL_MS,
            style_override: None,
        }
    }

    const fn scales(mut self, scales: &'static [f32]) -> Self {
        self.scales = scales;
        self
    }

    const fn sleeps(mut self, sleep_ms: &'static [u64]) -> Self {
        self.sleep_ms = sleep_ms;
        self
    }

    const fn interval(mut self, min_interval_ms: u64) -> Self {
        self.min_interval_ms = min_interval_ms;
        self
    }

    const fn crisp_firmware(mut self) -> Self {
        self.style_override = Some(Style::Crisp);
        self
    }

    /// Amplitude scale of stage `index`
    pub fn stage_scale(&self, index: usize) -> f32 {
        self.scales.get(index).copied().unwrap_or(1.0)
    }

    /// Pause following stage `index`, zero when none is defined
    pub fn sleep_after(&self, index: usize) -> u64 {
        self.sleep_ms.get(index).copied().unwrap_or(0)
    }

    /// Style used to resolve firmware, given the current global style
    pub fn firmware_style(&self, current: Style) -> Style {
        self.style_override.unwrap_or(current)
    }
}

/// Both style variants of an effect
#[derive(Debug, Clone, Copy)]
pub struct CatalogEntry {
    pub effect: Effect,
    pub crisp: CompositeEffect,
    pub gentle: CompositeEffect,
}

impl CatalogEntry {
    pub fn for_style(&self, style: Style) -> &CompositeEffect {
        match style {
            Style::Crisp => &self.crisp,
            Style::Gentle => &self.gentle,
        }
    }
}

use Stage::{Pulse, Waveform as W};

const fn entry(effect: Effect, crisp: CompositeEffect, gentle: CompositeEffect) -> CatalogEntry {
    CatalogEntry { effect, crisp, gentle }
}

const fn fx(stages: &'static [Stage]) -> CompositeEffect {
    CompositeEffect::new(stages)
}

/// The effect table
pub static CATALOG: &[CatalogEntry] = &[
    // Framework effects
    entry(
        Effect::Click,
        fx(&[W(6)]).interval(80),
        fx(&[W(6)]).scales(&[0.8]).interval(80),
    ),
    entry(
        Effect::DoubleClick,
        fx(&[W(8), W(8)]).sleeps(&[150]),
        fx(&[W(6), W(6)]).sleeps(&[150]),
    ),
    entry(
        Effect::Tick,
        fx(&[W(2)]).interval(120),
        fx(&[W(6)]).scales(&[0.6]).interval(120),
    ),
    entry(Effect::Thud, fx(&[W(4)]), fx(&[W(6)]).scales(&[0.8])),
    entry(Effect::Pop, fx(&[W(4)]), fx(&[W(6)]).scales(&[0.8])),
    entry(Effect::HeavyClick, fx(&[W(8)]), fx(&[W(6)])),
    // Discrete strength levels
    entry(
        Effect::DurationStrengthLevel1,
        fx(&[W(110)]).scales(&[0.6]).interval(80),
        fx(&[W(6)]).scales(&[0.18]).interval(80),
    ),
    entry(
        Effect::DurationStrengthLevel2,
        fx(&[W(110)]).scales(&[0.7]).interval(80),
        fx(&[W(6)]).scales(&[0.26]).interval(80),
    ),
    entry(
        Effect::DurationStrengthLevel3,
        fx(&[W(110)]).scales(&[0.8]).interval(80),
        fx(&[W(6)]).scales(&[0.34]).interval(80),
    ),
    entry(
        Effect::DurationStrengthLevel4,
        fx(&[W(111)]).scales(&[0.8]).interval(80),
        fx(&[W(6)]).scales(&[0.42]).interval(80),
    ),
    entry(
        Effect::DurationStrengthLevel5,
        fx(&[W(111)]).scales(&[0.9]).interval(80),
        fx(&[W(6)]).scales(&[0.50]).interval(80),
    ),
    entry(
        Effect::DurationStrengthLevel6,
        fx(&[W(111)]).scales(&[1.0]).interval(80),
        fx(&[W(6)]).scales(&[0.68]).interval(80),
    ),
    entry(
        Effect::DurationStrengthLevel7,
        fx(&[W(8)]).scales(&[0.7]).interval(80),
        fx(&[W(6)]).scales(&[0.76]).interval(80),
    ),
    entry(
        Effect::DurationStrengthLevel8,
        fx(&[W(8)]).scales(&[0.8]).interval(80),
        fx(&[W(6)]).scales(&[0.84]).interval(80),
    ),
    entry(
        Effect::DurationStrengthLevel9,
        fx(&[W(8)]).scales(&[0.9]).interval(80),
        fx(&[W(6)]).scales(&[0.92]).interval(80),
    ),
    entry(
        Effect::DurationStrengthLevel10,
        fx(&[W(8)]).scales(&[1.0]).interval(80),
        fx(&[W(6)]).scales(&[1.0]).interval(80),
    ),
    // Vendor UI effects
    entry(
        Effect::RingtoneCut,
        fx(&[W(42)]).scales(&[0.8]),
        fx(&[W(42)]).scales(&[0.8]).crisp_firmware(),
    ),
    entry(
        Effect::AlertSliderBottom,
        fx(&[W(308)]).scales(&[0.8]),
        fx(&[W(308)]).scales(&[0.8]).crisp_firmware(),
    ),
    entry(
        Effect::AlertSliderMiddle,
        fx(&[W(365)]),
        fx(&[W(365)]).crisp_firmware(),
    ),
    entry(Effect::BackGesture, fx(&[W(4)]), fx(&[W(6)]).scales(&[0.8])),
    entry(Effect::ButtonClick, fx(&[W(4)]), fx(&[W(6)]).scales(&[0.8])),
    entry(
        Effect::ClearAllNotification,
        fx(&[W(4), W(4), W(4), W(4), W(4)]).sleeps(&[30, 30, 30, 30]),
        fx(&[W(6), W(6), W(6), W(6), W(6)])
            .sleeps(&[30, 30, 30, 30])
            .scales(&[0.6, 0.6, 0.6, 0.6, 0.6]),
    ),
    entry(
        Effect::ClearAllRecent,
        fx(&[W(47)]),
        fx(&[W(47)]).crisp_firmware(),
    ),
    entry(
        Effect::KeyboardPress,
        fx(&[W(8), W(8)]).sleeps(&[100]).interval(80),
        fx(&[W(6), W(6)]).sleeps(&[100]).interval(80),
    ),
    entry(
        Effect::PlugIn,
        fx(&[Pulse(200), W(108)]).sleeps(&[600]),
        fx(&[Pulse(200), W(108)]).sleeps(&[600]).crisp_firmware(),
    ),
    entry(
        Effect::ScreenOff,
        fx(&[W(315)]),
        fx(&[W(315)]).crisp_firmware(),
    ),
    entry(Effect::ScreenOn, fx(&[W(2)]), fx(&[W(6)]).scales(&[0.6])),
    entry(
        Effect::Screenshot,
        fx(&[W(47)]),
        fx(&[W(47)]).crisp_firmware(),
    ),
    entry(Effect::SliderEdge, fx(&[W(8)]), fx(&[W(6)])),
    entry(
        Effect::SliderStep,
        fx(&[W(111)]).interval(120),
        fx(&[W(6)]).scales(&[0.6]).interval(120),
    ),
    entry(Effect::SwitchToggle, fx(&[W(4)]), fx(&[W(6)]).scales(&[0.8])),
    entry(
        Effect::UnifiedError,
        fx(&[W(46)]),
        fx(&[W(6), W(6)]).sleeps(&[120]),
    ),
    entry(Effect::UnifiedSuccess, fx(&[W(109)]), fx(&[W(6)])),
];

/// Look up the recipe for an effect in the given style
pub fn lookup(effect: Effect, style: Style) -> Option<&'static CompositeEffect> {
    CATALOG
        .iter()
        .find(|entry| entry.effect == effect)
        .map(|entry| entry.for_style(style))
}

/// Whether the engine can play an effect at all
pub fn is_supported(effect: Effect) -> bool {
    is_duration_vibration(effect) || CATALOG.iter().any(|entry| entry.effect == effect)
}

#[cfg(test)]
mod tests {
    use super::*;

    const STYLES: [Style; 2] = [Style::Crisp, Style::Gentle];

    #[test]
    fn test_scales_match_stage_count() {
        for entry in CATALOG {
            for style in STYLES {
                let fx = entry.for_style(style);
                assert!(
                    fx.scales.is_empty() || fx.scales.len() == fx.stages.len(),
                    "{} ({}) has {} scales for {} stages",
                    entry.effect,
                    style,
                    fx.scales.len(),
                    fx.stages.len()
                );
            }
        }
    }

    #[test]
    fn test_sleeps_fit_between_stages() {
        for entry in CATALOG {
            for style in STYLES {
                let fx = entry.for_style(style);
                assert!(!fx.stages.is_empty());
                assert!(fx.sleep_ms.len() < fx.stages.len(), "{} ({})", entry.effect, style);
            }
        }
    }

    #[test]
    fn test_scales_in_unit_range() {
        for entry in CATALOG {
            for style in STYLES {
                for scale in entry.for_style(style).scales {
                    assert!(*scale > 0.0 && *scale <= 1.0);
                }
            }
        }
    }

    #[test]
    fn test_catalog_has_no_duplicates() {
        for (i, entry) in CATALOG.iter().enumerate() {
            assert!(
                CATALOG[i + 1..].iter().all(|other| other.effect != entry.effect),
                "duplicate entry for {}",
                entry.effect
            );
        }
    }

    #[test]
    fn test_duration_classes_not_in_table() {
        assert!(lookup(Effect::DurationAlarmCall, Style::Crisp).is_none());
        assert!(lookup(Effect::DurationNotification, Style::Gentle).is_none());
        assert!(lookup(Effect::DurationDefault, Style::Crisp).is_none());
    }

    #[test]
    fn test_is_supported() {
        assert!(is_supported(Effect::Click));
        assert!(is_supported(Effect::DurationAlarmCall));
        assert!(is_supported(Effect::DurationNotification));
        assert!(is_supported(Effect::DurationStrengthLevel7));
        assert!(!is_supported(Effect::TextureTick));
        assert!(!is_supported(Effect::DurationDefault));
    }

    #[test]
    fn test_click_entry() {
        let crisp = lookup(Effect::Click, Style::Crisp).unwrap();
        assert_eq!(crisp.stages, &[Stage::Waveform(6)]);
        assert_eq!(crisp.min_interval_ms, 80);
        assert_eq!(crisp.stage_scale(0), 1.0);

        let gentle = lookup(Effect::Click, Style::Gentle).unwrap();
        assert_eq!(gentle.stage_scale(0), 0.8);
    }

    #[test]
    fn test_default_interval() {
        let thud = lookup(Effect::Thud, Style::Crisp).unwrap();
        assert_eq!(thud.min_interval_ms, DEFAULT_MIN_INTERVAL_MS);
        assert!(!thud.fixed_scale);
        assert_eq!(thud.style_override, None);
    }

    #[test]
    fn test_plug_in_starts_with_pulse() {
        let fx = lookup(Effect::PlugIn, Style::Gentle).unwrap();
        assert_eq!(fx.stages, &[Stage::Pulse(200), Stage::Waveform(108)]);
        assert_eq!(fx.sleep_after(0), 600);
        assert_eq!(fx.sleep_after(1), 0);
        assert_eq!(fx.firmware_style(Style::Gentle), Style::Crisp);
    }

    #[test]
    fn test_style_override_only_on_gentle() {
        for entry in CATALOG {
            assert_eq!(entry.crisp.style_override, None, "{}", entry.effect);
        }
        let recent = lookup(Effect::ClearAllRecent, Style::Gentle).unwrap();
        assert_eq!(recent.firmware_style(Style::Gentle), Style::Crisp);
        let click = lookup(Effect::Click, Style::Gentle).unwrap();
        assert_eq!(click.firmware_style(Style::Gentle), Style::Gentle);
    }
}
