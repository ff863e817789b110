use crate::{
    render::node::{ControlId, RenderBackend, Seconds},
    synth::params::ParamVector,
    ENV_TIME_SCALE,
};

/*
Scheduled ADSR
==============

This envelope never renders a sample. It translates four normalized slots
into ramp instructions for the renderer:

  Level
   peak ┐     ╱╲
        │    ╱  ╲___________
    S   │   ╱               ╲
        │  ╱                 ╲
      0 └─╱───────────────────╲──→ Time
        Attack Decay  Sustain  Release

Attack and decay are issued back-to-back at note-on, each completing at
`now + time * ENV_TIME_SCALE`. Sustain needs no instruction at all — the
decay target simply holds until something else is scheduled.

Release is deliberately NOT here. It has to fire asynchronously at note-up,
ramping from whatever value the control holds at that instant, so it lives in
the voice's release actions (see voice.rs). Scheduling it up front would pin
the start level and produce an audible jump on an early key-up.

Zero durations are legal: the ramp deadline lands on `now` and the renderer
applies it immediately.
*/

/// Envelope shape captured from four consecutive parameter slots.
///
/// Immutable once extracted; a fresh shape requires a fresh snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Adsr {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

impl Adsr {
    /// Read (attack, decay, sustain, release) from `offset..offset+4`.
    /// Slots past the end of the vector read as zero.
    pub fn from_params(params: &ParamVector, offset: usize) -> Self {
        let slot = |i: usize| params.get(offset + i).unwrap_or(0.0);
        Self {
            attack: slot(0),
            decay: slot(1),
            sustain: slot(2),
            release: slot(3),
        }
    }

    /// Ramp `target` to `peak`, completing at `now + attack * ENV_TIME_SCALE`.
    pub fn schedule_attack(&self, backend: &mut dyn RenderBackend, target: ControlId, peak: f32) {
        let end = backend.now() + Seconds::from(self.attack * ENV_TIME_SCALE);
        backend.ramp_control(target, peak, end);
    }

    /// Ramp `target` on to `min + (max - min) * sustain`, completing at
    /// `now + (attack + decay) * ENV_TIME_SCALE`. Call directly after
    /// [`Adsr::schedule_attack`] so the ramp chains off the attack peak.
    pub fn schedule_decay(
        &self,
        backend: &mut dyn RenderBackend,
        target: ControlId,
        min: f32,
        max: f32,
    ) {
        let end = backend.now() + Seconds::from((self.attack + self.decay) * ENV_TIME_SCALE);
        backend.ramp_control(target, min + (max - min) * self.sustain, end);
    }

    /// Seconds a release ramp should take, under the same time scaling.
    pub fn release_seconds(&self) -> f32 {
        self.release * ENV_TIME_SCALE
    }
}
