//! Presentation state for the canvas: zoom level and device preview.
//!
//! Both are small state machines the canvas and the export pipeline consult;
//! neither touches the document.

use serde::{Deserialize, Serialize};

/// The canvas (viewport) dimensions in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        DeviceMode::Desktop.viewport()
    }
}

// ─── Device mode ─────────────────────────────────────────────────────────

/// Simulated device width for previewing responsive layouts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceMode {
    #[default]
    Desktop,
    Tablet,
    Mobile,
}

impl DeviceMode {
    pub const ALL: [DeviceMode; 3] = [DeviceMode::Desktop, DeviceMode::Tablet, DeviceMode::Mobile];

    pub fn viewport(self) -> Viewport {
        match self {
            DeviceMode::Desktop => Viewport {
                width: 1440.0,
                height: 900.0,
            },
            DeviceMode::Tablet => Viewport {
                width: 768.0,
                height: 1024.0,
            },
            DeviceMode::Mobile => Viewport {
                width: 375.0,
                height: 812.0,
            },
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DeviceMode::Desktop => "desktop",
            DeviceMode::Tablet => "tablet",
            DeviceMode::Mobile => "mobile",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.name() == name)
    }

    /// Next mode in the desktop → tablet → mobile cycle.
    pub fn cycle(self) -> Self {
        match self {
            DeviceMode::Desktop => DeviceMode::Tablet,
            DeviceMode::Tablet => DeviceMode::Mobile,
            DeviceMode::Mobile => DeviceMode::Desktop,
        }
    }
}

// ─── Zoom ────────────────────────────────────────────────────────────────

/// Zoom limits. Levels are scale factors (1.0 = 100%).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ZoomConfig {
    pub min: f32,
    pub max: f32,
    pub step: f32,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            min: 0.25,
            max: 3.0,
            step: 0.1,
        }
    }
}

impl ZoomConfig {
    /// A usable copy: non-finite or non-positive values fall back to the
    /// defaults and a reversed range is swapped.
    pub fn normalized(self) -> Self {
        let defaults = Self::default();
        let usable = |v: f32, fallback: f32| if v.is_finite() && v > 0.0 { v } else { fallback };
        let min = usable(self.min, defaults.min);
        let max = usable(self.max, defaults.max);
        Self {
            min: min.min(max),
            max: min.max(max),
            step: usable(self.step, defaults.step),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomState {
    level: f32,
    config: ZoomConfig,
}

impl ZoomState {
    pub fn new(config: ZoomConfig) -> Self {
        let config = config.normalized();
        Self {
            level: 1.0_f32.clamp(config.min, config.max),
            config,
        }
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    /// Zoom as a whole percentage (`100` for 1.0).
    pub fn percent(&self) -> u32 {
        (self.level * 100.0).round() as u32
    }

    /// Set the level, clamped to the configured range. Returns the
    /// level actually applied.
    pub fn set(&mut self, level: f32) -> f32 {
        let level = if level.is_finite() { level } else { 1.0 };
        // Snap to 1/100 so repeated steps don't accumulate float drift.
        let snapped = (level * 100.0).round() / 100.0;
        self.level = snapped.clamp(self.config.min, self.config.max);
        self.level
    }

    pub fn zoom_in(&mut self) -> f32 {
        self.set(self.level + self.config.step)
    }

    pub fn zoom_out(&mut self) -> f32 {
        self.set(self.level - self.config.step)
    }

    pub fn reset(&mut self) -> f32 {
        self.set(1.0)
    }

    /// Zoom so a page `content_width` wide fits in `available_width`.
    pub fn fit_to_width(&mut self, content_width: f32, available_width: f32) -> f32 {
        if content_width <= 0.0 {
            return self.level;
        }
        self.set(available_width / content_width)
    }
}

impl Default for ZoomState {
    fn default() -> Self {
        Self::new(ZoomConfig::default())
    }
}
