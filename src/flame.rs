//! Candle life state machine driven by the breath signal.
//!
//! Tracks remaining candle `life` and the instantaneous `wind` strength. The
//! choreographer reads both every frame; the values may be up to one frame
//! stale relative to the latest breath sample, which is acceptable
//! (last-writer-wins).

use crate::params::FlameParams;

/// Snapshot of the flame physics shared with the choreographer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlameData {
    /// Remaining burn value in [0,1]; 0 means extinguished
    pub life: f32,
    /// Instantaneous breath strength in [0,1]
    pub wind: f32,
}

impl Default for FlameData {
    fn default() -> Self {
        Self {
            life: 1.0,
            wind: 0.0,
        }
    }
}

/// Candle states. Extinguished is terminal until an explicit reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandleState {
    Lit,
    Extinguished,
}

/// State machine consuming breath samples and emitting one extinguish event.
pub struct FlameState {
    params: FlameParams,
    data: FlameData,
    state: CandleState,
}

impl FlameState {
    pub fn new(params: FlameParams) -> Self {
        Self {
            params,
            data: FlameData::default(),
            state: CandleState::Lit,
        }
    }

    pub fn data(&self) -> FlameData {
        self.data
    }

    pub fn state(&self) -> CandleState {
        self.state
    }

    /// Consume one breath sample. Strong wind decays life proportionally;
    /// calm lets the flame recover slowly. Returns `true` exactly once, on
    /// the tick the candle goes out; samples after that are ignored (the
    /// caller is expected to tear down the breath subscription).
    pub fn apply_sample(&mut self, wind: f32) -> bool {
        if self.state == CandleState::Extinguished {
            return false;
        }

        self.data.wind = wind;

        if wind > self.params.wind_threshold {
            self.data.life = (self.data.life - wind * self.params.decay_rate).max(0.0);
        } else {
            self.data.life = (self.data.life + self.params.recovery_rate).min(1.0);
        }

        if self.data.life <= 0.0 {
            self.extinguish();
            return true;
        }
        false
    }

    /// Manual override (e.g. a key press): blow the candle out immediately.
    /// Returns `true` if this call produced the extinguish event.
    pub fn blow_out(&mut self) -> bool {
        if self.state == CandleState::Extinguished {
            return false;
        }
        self.extinguish();
        true
    }

    /// Reinitialize to a lit candle (restart of the whole sequence).
    pub fn reset(&mut self) {
        self.data = FlameData::default();
        self.state = CandleState::Lit;
    }

    fn extinguish(&mut self) {
        self.data = FlameData {
            life: 0.0,
            wind: 0.0,
        };
        self.state = CandleState::Extinguished;
    }
}
