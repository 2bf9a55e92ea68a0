use std::{fs, path::Path};

use serde::Deserialize;

use crate::{
    error::{MatrixError, Result},
    types::{LayoutStrategy, SourceFormat},
};

pub const DEFAULT_CHARS: &str = "01";
pub const DEFAULT_PERIOD: u64 = 300;
pub const DEFAULT_DURATION: u64 = 3000;
pub const DEFAULT_LETTER_ANIMATION_DURATION: u64 = 500;
pub const DEFAULT_LETTER_INTERVAL: u64 = 100;
pub const DEFAULT_INITIAL_DELAY: u64 = 200;

/// Animator options. All times are milliseconds.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MatrixOptions {
    /// Scramble alphabet.
    pub chars: String,
    /// Unused by the scramble loop.
    pub period: u64,
    /// Unused total-duration hint.
    pub duration: u64,
    pub letter_animation_duration: u64,
    pub letter_interval: u64,
    pub initial_delay: u64,
    pub layout: LayoutStrategy,
    pub format: SourceFormat,
}

impl Default for MatrixOptions {
    fn default() -> Self {
        Self {
            chars: DEFAULT_CHARS.to_string(),
            period: DEFAULT_PERIOD,
            duration: DEFAULT_DURATION,
            letter_animation_duration: DEFAULT_LETTER_ANIMATION_DURATION,
            letter_interval: DEFAULT_LETTER_INTERVAL,
            initial_delay: DEFAULT_INITIAL_DELAY,
            layout: LayoutStrategy::default(),
            format: SourceFormat::default(),
        }
    }
}

impl MatrixOptions {
    /// Empty alphabets and zero timings fall back to their defaults.
    pub fn resolved(mut self) -> Self {
        fn or_default(value: u64, default: u64) -> u64 {
            if value == 0 { default } else { value }
        }

        if self.chars.is_empty() {
            self.chars = DEFAULT_CHARS.to_string();
        }
        self.period = or_default(self.period, DEFAULT_PERIOD);
        self.duration = or_default(self.duration, DEFAULT_DURATION);
        self.letter_animation_duration = or_default(
            self.letter_animation_duration,
            DEFAULT_LETTER_ANIMATION_DURATION,
        );
        self.letter_interval = or_default(self.letter_interval, DEFAULT_LETTER_INTERVAL);
        self.initial_delay = or_default(self.initial_delay, DEFAULT_INITIAL_DELAY);

        self
    }

    pub fn alphabet(&self) -> Vec<char> {
        self.chars.chars().collect()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct SurfaceConfig {
    pub id: String,
    pub content: String,
}

/// A page file: the surfaces to show, which of them to animate, and the
/// options shared by their animators.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    pub animate: Vec<String>,
    pub options: MatrixOptions,
    #[serde(rename = "surface")]
    pub surfaces: Vec<SurfaceConfig>,
}

impl PageConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| MatrixError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Single-surface page around one piece of text.
    pub fn single(id: &str, content: String) -> Self {
        Self {
            animate: vec![id.to_string()],
            options: MatrixOptions::default(),
            surfaces: vec![SurfaceConfig {
                id: id.to_string(),
                content,
            }],
        }
    }

    /// Surfaces to animate; the first surface when none are named.
    pub fn targets(&self) -> Vec<String> {
        if self.animate.is_empty() {
            self.surfaces.iter().take(1).map(|s| s.id.clone()).collect()
        } else {
            self.animate.clone()
        }
    }
}
