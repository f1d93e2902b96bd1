//! Countdown phase schedule: 3 -> 2 -> 1 -> cake.

use crate::params::CountdownParams;

/// Ordered presentation phases. Each digit phase displays its glyph field;
/// the cake phase installs the cake field and arms the candle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationPhase {
    Three,
    Two,
    One,
    Cake,
}

impl AnimationPhase {
    /// Text to rasterize for digit phases; `None` once the cake is up.
    pub fn glyph_text(&self) -> Option<&'static str> {
        match self {
            AnimationPhase::Three => Some("3"),
            AnimationPhase::Two => Some("2"),
            AnimationPhase::One => Some("1"),
            AnimationPhase::Cake => None,
        }
    }
}

/// Maps elapsed show time to the current phase.
pub struct Countdown {
    params: CountdownParams,
}

impl Countdown {
    pub fn new(params: CountdownParams) -> Self {
        Self { params }
    }

    pub fn phase_at(&self, elapsed_secs: f32) -> AnimationPhase {
        let step = self.params.step_secs;
        if elapsed_secs < step {
            AnimationPhase::Three
        } else if elapsed_secs < 2.0 * step {
            AnimationPhase::Two
        } else if elapsed_secs < 3.0 * step {
            AnimationPhase::One
        } else {
            AnimationPhase::Cake
        }
    }
}
