//! One-shot ADSR envelope.
//!
//! A render triggers the envelope once at sample 0 and never sends a note
//! off, so the sustain level is only the end point of the decay ramp: the
//! envelope runs Attack → Decay → Release → Idle on its own.

/// Envelope stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Attack,
    Decay,
    Release,
}

/// ADSR envelope with linear ramps.
#[derive(Debug, Clone)]
pub struct Envelope {
    /// Attack time in seconds.
    pub attack: f64,
    /// Decay time in seconds.
    pub decay: f64,
    /// Level reached at the end of the decay ramp [0, 1].
    pub sustain: f64,
    /// Release time in seconds.
    pub release: f64,

    stage: Stage,
    level: f64,
    sample_rate: f64,
    stage_samples: usize,
    stage_counter: usize,
}

impl Envelope {
    pub fn new(sample_rate: f64) -> Self {
        Envelope {
            attack: 0.0,
            decay: 0.0,
            sustain: 0.0,
            release: 0.0,
            stage: Stage::Idle,
            level: 0.0,
            sample_rate,
            stage_samples: 0,
            stage_counter: 0,
        }
    }

    /// Restart from silence at the attack stage.
    pub fn trigger(&mut self) {
        self.level = 0.0;
        self.enter(Stage::Attack);
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn is_finished(&self) -> bool {
        self.stage == Stage::Idle
    }

    /// Generate the next envelope sample [0, 1].
    pub fn next_sample(&mut self) -> f64 {
        let sustain = self.sustain.clamp(0.0, 1.0);
        match self.stage {
            Stage::Idle => self.level = 0.0,
            Stage::Attack => {
                if self.ramp(0.0, 1.0) {
                    self.enter(Stage::Decay);
                }
            }
            Stage::Decay => {
                if self.ramp(1.0, sustain) {
                    self.enter(Stage::Release);
                }
            }
            Stage::Release => {
                if self.ramp(sustain, 0.0) {
                    self.enter(Stage::Idle);
                }
            }
        }
        self.level
    }

    // Linear step from `from` to `to`; true once the stage is complete.
    fn ramp(&mut self, from: f64, to: f64) -> bool {
        if self.stage_samples == 0 {
            self.level = to;
            return true;
        }
        let t = self.stage_counter as f64 / self.stage_samples as f64;
        self.level = from + (to - from) * t;
        self.stage_counter += 1;
        if self.stage_counter >= self.stage_samples {
            self.level = to;
            return true;
        }
        false
    }

    fn enter(&mut self, stage: Stage) {
        let seconds = match stage {
            Stage::Idle => 0.0,
            Stage::Attack => self.attack,
            Stage::Decay => self.decay,
            Stage::Release => self.release,
        };
        self.stage = stage;
        self.stage_samples = (seconds.max(0.0) * self.sample_rate) as usize;
        self.stage_counter = 0;
    }
}
