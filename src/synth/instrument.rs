use std::collections::HashMap;

use crate::{
    render::node::{ControlId, NodeId, RenderBackend, Waveform},
    synth::{
        params::ParamVector,
        patch::{Patch, PatchCtx, SquareLead},
        voice::Voice,
    },
};

/// Slot driving the shared LFO rate, mapped linearly over [0, LFO_RATE_MAX] Hz.
pub const LFO_RATE_SLOT: usize = 1;
pub const LFO_RATE_MAX: f32 = 20.0;

/// The polyphonic controller: owns the parameter vector, the per-note voice
/// registry, the shared modulation source, and the renderer backend.
///
/// The three `on_*` handlers are the only entry points into the engine. They
/// are total: malformed input is ignored, never an error — a live instrument
/// must not fall silent over a bad event.
pub struct Instrument<B: RenderBackend> {
    backend: B,
    params: ParamVector,
    voices: HashMap<u8, Voice>,
    releasing: Vec<Voice>,
    patch: Box<dyn Patch>,
    lfo: NodeId,
}

impl<B: RenderBackend> Instrument<B> {
    pub fn new(backend: B) -> Self {
        Self::with_patch(backend, Box::new(SquareLead))
    }

    pub fn with_patch(mut backend: B, patch: Box<dyn Patch>) -> Self {
        // The shared modulation source runs for the whole session, silent at
        // 0 Hz until a parameter-set says otherwise.
        let lfo = backend.add_oscillator(Waveform::Sine, 0.0);
        let now = backend.now();
        backend.start(lfo, now);
        Self {
            backend,
            params: ParamVector::new(),
            voices: HashMap::new(),
            releasing: Vec::new(),
            patch,
            lfo,
        }
    }

    pub fn on_key_down(&mut self, note: u8) {
        self.reap();
        log::debug!("key down: note {note}");
        // One live voice per note. Stop the old chain before replacing the
        // registry entry, or its handle is lost while it keeps sounding.
        if let Some(mut old) = self.voices.remove(&note) {
            old.stop(&mut self.backend);
            self.releasing.push(old);
        }
        let params = self.params;
        let cx = PatchCtx {
            note,
            params: &params,
            lfo: self.lfo,
        };
        let voice = self.patch.build(&mut self.backend, &cx);
        self.voices.insert(note, voice);
    }

    pub fn on_key_up(&mut self, note: u8) {
        self.reap();
        log::debug!("key up: note {note}");
        // No matching voice means a dropped or out-of-order note-down; benign.
        if let Some(mut voice) = self.voices.remove(&note) {
            voice.stop(&mut self.backend);
            self.releasing.push(voice);
        }
    }

    pub fn on_param_set(&mut self, slot: usize, value: f32) {
        self.reap();
        if !self.params.set(slot, value) {
            log::trace!("parameter slot {slot} out of range, ignored");
            return;
        }
        let value = value.clamp(0.0, 1.0);
        if slot == LFO_RATE_SLOT {
            self.backend
                .set_control(ControlId::frequency(self.lfo), value * LFO_RATE_MAX);
        }
        log::trace!("slot {slot} = {value}, fan-out to {} voices", self.voices.len());
        for voice in self.voices.values_mut() {
            voice.set_param(&mut self.backend, slot, value);
        }
    }

    /// Dispose voices whose release has fully played out. Runs at the head of
    /// every event handler; callable directly by hosts with no event traffic.
    pub fn reap(&mut self) {
        let now = self.backend.now();
        let backend = &mut self.backend;
        self.releasing.retain_mut(|voice| {
            if voice.is_finished(now) {
                voice.dispose(backend);
                false
            } else {
                true
            }
        });
    }

    /// Voices in the registry, i.e. notes without a note-off yet.
    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    pub fn is_sounding(&self, note: u8) -> bool {
        self.voices.contains_key(&note)
    }

    /// Voices past note-off, still ringing out.
    pub fn releasing_count(&self) -> usize {
        self.releasing.len()
    }

    pub fn params(&self) -> &ParamVector {
        &self.params
    }

    pub fn lfo(&self) -> NodeId {
        self.lfo
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::offline::OfflineBackend;
    use crate::synth::patch::{CUTOFF_MAX, CUTOFF_SLOT};
    use crate::render::node::Port;

    fn instrument() -> Instrument<OfflineBackend> {
        Instrument::new(OfflineBackend::new())
    }

    /// Current cutoff value of every live filter, found through the recorded
    /// modulation edges (each voice has exactly one).
    fn cutoff_controls(inst: &Instrument<OfflineBackend>) -> Vec<f32> {
        use crate::render::offline::Edge;
        let backend = inst.backend();
        backend
            .edges()
            .iter()
            .filter_map(|edge| match *edge {
                Edge::Control(_, target) if target.port == Port::Cutoff => {
                    (!backend.is_discarded(target.node)).then(|| backend.control_value(target))
                }
                _ => None,
            })
            .collect()
    }

    #[test]
    fn key_down_registers_one_voice() {
        let mut inst = instrument();
        inst.on_key_down(60);
        assert_eq!(inst.voice_count(), 1);
        assert!(inst.is_sounding(60));
    }

    #[test]
    fn key_round_trip_empties_the_registry() {
        let mut inst = instrument();
        inst.on_key_down(60);
        inst.on_key_up(60);
        assert_eq!(inst.voice_count(), 0);
        assert_eq!(inst.releasing_count(), 1);

        // A second key-up for the same note must be a harmless no-op.
        inst.on_key_up(60);
        assert_eq!(inst.voice_count(), 0);
    }

    #[test]
    fn key_up_without_key_down_is_benign() {
        let mut inst = instrument();
        inst.on_key_up(99);
        assert_eq!(inst.voice_count(), 0);
        assert_eq!(inst.releasing_count(), 0);
    }

    #[test]
    fn out_of_range_slot_changes_nothing() {
        let mut inst = instrument();
        inst.on_key_down(60);
        let before = *inst.params();

        inst.on_param_set(crate::PARAM_SLOTS, 0.9);
        assert_eq!(*inst.params(), before);
    }

    #[test]
    fn duplicate_key_down_stops_the_old_voice() {
        let mut inst = instrument();
        inst.on_key_down(60);
        inst.on_key_down(60);

        // Still exactly one live registry entry; the first voice is fading.
        assert_eq!(inst.voice_count(), 1);
        assert_eq!(inst.releasing_count(), 1);
    }

    #[test]
    fn lfo_rate_slot_drives_the_shared_source() {
        let mut inst = instrument();
        inst.on_param_set(LFO_RATE_SLOT, 0.5);
        let rate = inst
            .backend()
            .control_value(ControlId::frequency(inst.lfo()));
        assert!((rate - 0.5 * LFO_RATE_MAX).abs() < 1e-6);
    }

    #[test]
    fn reap_disposes_finished_voices() {
        let mut inst = instrument();
        inst.on_param_set(7, 0.5); // release time
        inst.on_key_down(60);
        let live_before = inst.backend().live_nodes();
        inst.on_key_up(60);

        // Deadline is release * ENV_TIME_SCALE; move past it and reap.
        inst.backend_mut().advance(f64::from(0.5 * crate::ENV_TIME_SCALE) + 0.01);
        inst.reap();
        assert_eq!(inst.releasing_count(), 0);
        // Everything but the shared LFO is gone.
        assert_eq!(inst.backend().live_nodes(), live_before - 4);
    }

    #[test]
    fn custom_patch_recipes_plug_in() {
        struct Beep;
        impl Patch for Beep {
            fn build(&self, backend: &mut dyn RenderBackend, cx: &PatchCtx) -> Voice {
                let now = backend.now();
                let osc = backend.add_oscillator(
                    Waveform::Sine,
                    crate::synth::midi_note_to_freq(cx.note),
                );
                backend.connect_output(osc);
                backend.start(osc, now);
                Voice::builder().stop_source(osc, 0.0).own(osc).build()
            }
        }

        let mut inst = Instrument::with_patch(OfflineBackend::new(), Box::new(Beep));
        inst.on_key_down(42);
        assert_eq!(inst.voice_count(), 1);
        // LFO plus the one-node voice.
        assert_eq!(inst.backend().live_nodes(), 2);
    }

    #[test]
    fn fan_out_reaches_every_registry_voice() {
        let mut inst = instrument();
        inst.on_key_down(60);
        inst.on_key_down(64);
        inst.on_key_down(67);

        inst.on_param_set(CUTOFF_SLOT, 0.8);

        let cutoffs = cutoff_controls(&inst);
        assert_eq!(cutoffs.len(), 3);
        for cutoff in cutoffs {
            assert!((cutoff - 0.8 * CUTOFF_MAX).abs() < 1e-3);
        }
    }
}
