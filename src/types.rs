use serde::Deserialize;

/// Glyph shown in the slot of a whitespace unit.
pub const NBSP: char = '\u{a0}';

/// Colour transition applied to every slot when its highlight changes.
pub const SLOT_TRANSITION_MS: u64 = 100;

/// One parsed item of surface content.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Unit {
    Character {
        ch: char,
        is_space: bool,
        is_matrix: bool,
    },
    Break,
}

impl Unit {
    pub fn character(ch: char) -> Self {
        Unit::Character {
            ch,
            is_space: ch == ' ',
            is_matrix: false,
        }
    }

    pub fn is_break(&self) -> bool {
        matches!(self, Unit::Break)
    }

    /// Glyph a slot bound to this unit shows when idle.
    pub fn rest_glyph(&self) -> Option<char> {
        match self {
            Unit::Character { is_space: true, .. } => Some(NBSP),
            Unit::Character { ch, .. } => Some(*ch),
            Unit::Break => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderSlot {
    pub glyph: char,
    /// Bound to a whitespace unit; never scrambled, may wrap.
    pub is_space: bool,
    pub highlighted: bool,
    /// Time of the last highlight change, used to blend colours.
    pub changed_at: u64,
    pub transition_ms: u64,
}

impl RenderSlot {
    pub fn new(glyph: char, is_space: bool, now: u64) -> Self {
        Self {
            glyph,
            is_space,
            highlighted: false,
            changed_at: now,
            transition_ms: SLOT_TRANSITION_MS,
        }
    }

    pub fn set_highlight(&mut self, on: bool, now: u64) {
        if self.highlighted != on {
            self.highlighted = on;
            self.changed_at = now;
        }
    }

    /// How far the slot is from "fully highlighted", in `0.0..=1.0`.
    pub fn highlight_level(&self, now: u64) -> f32 {
        let progress = if self.transition_ms == 0 {
            1.0
        } else {
            (now.saturating_sub(self.changed_at) as f32 / self.transition_ms as f32).min(1.0)
        };

        if self.highlighted { progress } else { 1.0 - progress }
    }
}

/// Children of a display surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Node {
    Slot(RenderSlot),
    Break,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LayoutStrategy {
    /// Honour authored line breaks.
    #[default]
    Structured,
    /// One unbroken run, wrapped at the container width.
    Flow,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    #[default]
    Markup,
    Plain,
}

/// A slot placed on screen: the glyph shown and the slot's index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Glyph {
    pub ch: char,
    pub idx: usize,
}

pub type Layout = Vec<Vec<Glyph>>;
