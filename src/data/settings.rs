//! User Settings
//!
//! The schema observed by every presentation surface, plus the partial form
//! surfaces send when they change a subset of options.

use serde::{Deserialize, Deserializer, Serialize};

/// Bounds the preferences surface enforces on scatter intensity input.
pub const MIN_SCATTER_INTENSITY: i64 = 1;
pub const MAX_SCATTER_INTENSITY: i64 = 10;

/// Particle coloring strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorType {
    #[default]
    Random,
    Rainbow,
    Single,
}

/// Keystroke sound voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoundType {
    #[default]
    Synth,
    Typewriter,
    Mute,
}

/// Particle shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeType {
    #[default]
    Circle,
    Square,
    Star,
}

/// Window-chrome button offset of the preferences surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChromeOffset {
    #[serde(deserialize_with = "lenient_i32")]
    pub x: i32,
    #[serde(deserialize_with = "lenient_i32")]
    pub y: i32,
}

impl Default for ChromeOffset {
    fn default() -> Self {
        Self { x: 15, y: 20 }
    }
}

/// Full settings value. Field names match the persisted JSON keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub volume: i64,
    pub particle_size: i64,
    pub particle_life: i64,
    pub color_type: ColorType,
    pub sound_type: SoundType,
    pub shape_type: ShapeType,
    pub gravity: bool,
    pub use_mouse_pos: bool,
    pub screen_shake: bool,
    pub bloom: bool,
    pub show_combo: bool,
    pub traffic_light_position: ChromeOffset,
    pub scatter_intensity: i64,
    pub enable_resurgence: bool,
    pub bounce: bool,
    #[serde(rename = "showWPM")]
    pub show_wpm: bool,
    pub echo: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            volume: 50,
            particle_size: 5,
            particle_life: 50,
            color_type: ColorType::default(),
            sound_type: SoundType::default(),
            shape_type: ShapeType::default(),
            gravity: false,
            use_mouse_pos: false,
            screen_shake: false,
            bloom: false,
            show_combo: true,
            traffic_light_position: ChromeOffset::default(),
            scatter_intensity: 5,
            enable_resurgence: false,
            bounce: false,
            show_wpm: false,
            echo: false,
        }
    }
}

impl Settings {
    /// Layer `partial` over `self`. Keys present in the partial win, every
    /// other key is retained.
    pub fn merged(mut self, partial: &PartialSettings) -> Self {
        if let Some(v) = partial.volume {
            self.volume = v;
        }
        if let Some(v) = partial.particle_size {
            self.particle_size = v;
        }
        if let Some(v) = partial.particle_life {
            self.particle_life = v;
        }
        if let Some(v) = partial.color_type {
            self.color_type = v;
        }
        if let Some(v) = partial.sound_type {
            self.sound_type = v;
        }
        if let Some(v) = partial.shape_type {
            self.shape_type = v;
        }
        if let Some(v) = partial.gravity {
            self.gravity = v;
        }
        if let Some(v) = partial.use_mouse_pos {
            self.use_mouse_pos = v;
        }
        if let Some(v) = partial.screen_shake {
            self.screen_shake = v;
        }
        if let Some(v) = partial.bloom {
            self.bloom = v;
        }
        if let Some(v) = partial.show_combo {
            self.show_combo = v;
        }
        if let Some(v) = partial.traffic_light_position {
            self.traffic_light_position = v;
        }
        if let Some(v) = partial.scatter_intensity {
            self.scatter_intensity = v;
        }
        if let Some(v) = partial.enable_resurgence {
            self.enable_resurgence = v;
        }
        if let Some(v) = partial.bounce {
            self.bounce = v;
        }
        if let Some(v) = partial.show_wpm {
            self.show_wpm = v;
        }
        if let Some(v) = partial.echo {
            self.echo = v;
        }
        self
    }
}

/// Any subset of [`Settings`]. Absent keys deserialize to `None`; unknown
/// keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub particle_size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub particle_life: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_type: Option<ColorType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sound_type: Option<SoundType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape_type: Option<ShapeType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gravity: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_mouse_pos: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen_shake: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bloom: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_combo: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traffic_light_position: Option<ChromeOffset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scatter_intensity: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_resurgence: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounce: Option<bool>,
    #[serde(
        default,
        rename = "showWPM",
        skip_serializing_if = "Option::is_none"
    )]
    pub show_wpm: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub echo: Option<bool>,
}

impl PartialSettings {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Accept `15` as well as `"15"` for window-chrome coordinates.
fn lenient_i32<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Coordinate {
        Int(i64),
        Float(f64),
        Text(String),
    }

    let value = match Coordinate::deserialize(deserializer)? {
        Coordinate::Int(v) => v,
        Coordinate::Float(v) => v.trunc() as i64,
        Coordinate::Text(s) => parse_leading_int(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("not an integer: {:?}", s)))?,
    };
    i32::try_from(value).map_err(serde::de::Error::custom)
}

/// Parse the leading decimal integer of a string, ignoring surrounding
/// whitespace and any trailing non-digit text (`"20px"` -> 20).
fn parse_leading_int(s: &str) -> Option<i64> {
    let s = s.trim();
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().ok().map(|v| sign * v)
}
