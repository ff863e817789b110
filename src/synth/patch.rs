use crate::{
    render::node::{ControlId, NodeId, RenderBackend, Waveform},
    synth::{envelope::Adsr, midi_note_to_freq, params::ParamVector, voice::Voice},
};

/// Parameter slots and ranges of the stock recipe. Slot positions and the
/// envelope offset are fixed points of the instrument's control surface.
pub const CUTOFF_SLOT: usize = 0;
pub const MOD_DEPTH_SLOT: usize = 2;
pub const ENV_OFFSET: usize = 4; // attack, decay, sustain, release in 4..=7

pub const CUTOFF_MAX: f32 = 5_000.0;
pub const MOD_DEPTH_MAX: f32 = 10_000.0;
/// Envelope peak on the voice's gain stage.
pub const PEAK_LEVEL: f32 = 0.3;

/// Everything a recipe gets to work with when a note starts.
pub struct PatchCtx<'a> {
    pub note: u8,
    /// Snapshot of the parameter vector at key-down time.
    pub params: &'a ParamVector,
    /// Shared modulation source owned by the instrument, already running.
    pub lfo: NodeId,
}

/// Instrument-specific synthesis recipe.
///
/// Configure the sound once; the instrument stamps out one voice per note.
/// A recipe allocates the node chain, schedules the envelope onset, starts
/// the source, and assembles bindings and release behavior via
/// [`Voice::builder`].
pub trait Patch {
    fn build(&self, backend: &mut dyn RenderBackend, cx: &PatchCtx) -> Voice;
}

impl<F> Patch for F
where
    F: Fn(&mut dyn RenderBackend, &PatchCtx) -> Voice,
{
    fn build(&self, backend: &mut dyn RenderBackend, cx: &PatchCtx) -> Voice {
        self(backend, cx)
    }
}

/// The stock recipe: square oscillator → lowpass filter → gain → sink,
/// with the shared LFO feeding a per-voice depth gain summed into the filter
/// cutoff. Cutoff rides slot 0, modulation depth slot 2.
pub struct SquareLead;

impl Patch for SquareLead {
    fn build(&self, backend: &mut dyn RenderBackend, cx: &PatchCtx) -> Voice {
        let now = backend.now();
        let osc = backend.add_oscillator(Waveform::Square, midi_note_to_freq(cx.note));
        let filter = backend.add_filter(CUTOFF_MAX);
        let gain = backend.add_gain(0.0);
        backend.connect(osc, filter);
        backend.connect(filter, gain);
        backend.connect_output(gain);

        let depth = backend.add_gain(0.0);
        backend.connect(cx.lfo, depth);
        backend.connect_control(depth, ControlId::cutoff(filter));

        let env = Adsr::from_params(cx.params, ENV_OFFSET);
        let level = ControlId::level(gain);
        env.schedule_attack(backend, level, PEAK_LEVEL);
        env.schedule_decay(backend, level, 0.0, PEAK_LEVEL);
        backend.start(osc, now);

        let fade = env.release_seconds();
        let mut voice = Voice::builder()
            .bind(CUTOFF_SLOT, ControlId::cutoff(filter), 0.0, CUTOFF_MAX)
            .bind(MOD_DEPTH_SLOT, ControlId::level(depth), 0.0, MOD_DEPTH_MAX)
            .fade_out(level, fade)
            .stop_source(osc, fade)
            .own(osc)
            .own(filter)
            .own(gain)
            .own(depth)
            .build();
        voice.apply_params(backend, cx.params);
        voice
    }
}
