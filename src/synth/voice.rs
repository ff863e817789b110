use std::panic::{self, AssertUnwindSafe};

use crate::{
    render::node::{ControlId, NodeId, RenderBackend, Seconds},
    synth::params::ParamVector,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Sounding,  // Playing, envelope in attack/decay/sustain
    Releasing, // Key released, release ramps scheduled
    Disposed,  // Renderer resources reclaimed, terminal
}

/// One unit of parameter dispatch. A voice holds an ordered list of these and
/// offers every (slot, value) pair to each in turn; a listener reacts only to
/// its own slot.
pub trait ParamListener {
    fn apply(&self, backend: &mut dyn RenderBackend, slot: usize, value: f32);
}

/// Binds one slot to one control with a declared value range: a normalized
/// input lands on `min + (max - min) * value`.
#[derive(Debug, Clone, Copy)]
pub struct RangeBinding {
    pub slot: usize,
    pub target: ControlId,
    pub min: f32,
    pub max: f32,
}

impl ParamListener for RangeBinding {
    fn apply(&self, backend: &mut dyn RenderBackend, slot: usize, value: f32) {
        if slot == self.slot {
            backend.set_control(self.target, self.min + (self.max - self.min) * value);
        }
    }
}

/// One unit of release behavior, run when the voice stops. Returns the time
/// at which its effect completes so the voice can track the latest one.
pub trait ReleaseAction {
    fn run(&self, backend: &mut dyn RenderBackend, now: Seconds) -> Seconds;
}

/// Ramp a control to zero over a fixed duration, starting from whatever value
/// it holds at stop time.
#[derive(Debug, Clone, Copy)]
pub struct FadeOut {
    pub target: ControlId,
    pub seconds: f32,
}

impl ReleaseAction for FadeOut {
    fn run(&self, backend: &mut dyn RenderBackend, now: Seconds) -> Seconds {
        // Re-anchor at the current value so the ramp starts here, not at the
        // control's last scheduled point. No jump on an early key-up.
        let current = backend.control_value(self.target);
        backend.set_control(self.target, current);
        let end = now + Seconds::from(self.seconds);
        backend.ramp_control(self.target, 0.0, end);
        end
    }
}

/// Schedule a source node to cease after a fixed delay.
#[derive(Debug, Clone, Copy)]
pub struct StopSource {
    pub node: NodeId,
    pub seconds: f32,
}

impl ReleaseAction for StopSource {
    fn run(&self, backend: &mut dyn RenderBackend, now: Seconds) -> Seconds {
        let at = now + Seconds::from(self.seconds);
        backend.stop(self.node, at);
        at
    }
}

/// One sounding note: its node chain, its parameter bindings, and its release
/// behavior. Composition is fixed at build time; only the lifecycle state
/// moves afterwards.
pub struct Voice {
    state: VoiceState,
    listeners: Vec<Box<dyn ParamListener>>,
    releases: Vec<Box<dyn ReleaseAction>>,
    nodes: Vec<NodeId>,
    deadline: Option<Seconds>,
}

impl Voice {
    pub fn builder() -> VoiceBuilder {
        VoiceBuilder::default()
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }

    /// Offer one (slot, value) pair to every listener, in composition order.
    /// A no-op after disposal — never an error, never a resurrection.
    pub fn set_param(&mut self, backend: &mut dyn RenderBackend, slot: usize, value: f32) {
        if self.state == VoiceState::Disposed {
            return;
        }
        for listener in &self.listeners {
            listener.apply(backend, slot, value);
        }
    }

    /// Dispatch the full vector once, slot by slot in index order. Used at
    /// creation to apply the initial parameter snapshot.
    pub fn apply_params(&mut self, backend: &mut dyn RenderBackend, params: &ParamVector) {
        for (slot, value) in params.iter() {
            self.set_param(backend, slot, value);
        }
    }

    /// Run the composed release actions and enter Releasing. Idempotent: the
    /// first call fixes the release deadline, repeat calls return it without
    /// scheduling anything further.
    pub fn stop(&mut self, backend: &mut dyn RenderBackend) -> Seconds {
        if let Some(deadline) = self.deadline {
            return deadline;
        }
        let now = backend.now();
        let mut deadline = now;
        for action in &self.releases {
            // A panicking action must not keep the rest of the chain from
            // running; the gain fade is usually last and always matters most.
            match panic::catch_unwind(AssertUnwindSafe(|| action.run(backend, now))) {
                Ok(end) => deadline = deadline.max(end),
                Err(_) => log::error!("release action panicked; continuing with the rest"),
            }
        }
        self.state = VoiceState::Releasing;
        self.deadline = Some(deadline);
        deadline
    }

    /// Time at which the longest scheduled release ramp completes, once
    /// [`Voice::stop`] has run.
    pub fn release_deadline(&self) -> Option<Seconds> {
        self.deadline
    }

    /// True once the voice is releasing and its deadline has passed.
    pub fn is_finished(&self, now: Seconds) -> bool {
        self.state == VoiceState::Releasing && self.deadline.is_some_and(|d| now >= d)
    }

    /// Discard every owned node handle and enter the terminal state.
    pub fn dispose(&mut self, backend: &mut dyn RenderBackend) {
        if self.state == VoiceState::Disposed {
            return;
        }
        for &node in &self.nodes {
            backend.discard(node);
        }
        self.state = VoiceState::Disposed;
    }
}

/// Staged configuration for a [`Voice`], consumed once by `build`.
#[derive(Default)]
pub struct VoiceBuilder {
    listeners: Vec<Box<dyn ParamListener>>,
    releases: Vec<Box<dyn ReleaseAction>>,
    nodes: Vec<NodeId>,
}

impl VoiceBuilder {
    /// Add a [`RangeBinding`] from `slot` to `target` over `[min, max]`.
    pub fn bind(mut self, slot: usize, target: ControlId, min: f32, max: f32) -> Self {
        self.listeners.push(Box::new(RangeBinding {
            slot,
            target,
            min,
            max,
        }));
        self
    }

    /// Add an arbitrary listener. Dispatch order is insertion order.
    pub fn listener(mut self, listener: Box<dyn ParamListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Fade `target` to zero over `seconds` at release.
    pub fn fade_out(mut self, target: ControlId, seconds: f32) -> Self {
        self.releases.push(Box::new(FadeOut { target, seconds }));
        self
    }

    /// Stop `node` `seconds` after release.
    pub fn stop_source(mut self, node: NodeId, seconds: f32) -> Self {
        self.releases.push(Box::new(StopSource { node, seconds }));
        self
    }

    /// Add an arbitrary release action. Run order is insertion order.
    pub fn release(mut self, action: Box<dyn ReleaseAction>) -> Self {
        self.releases.push(action);
        self
    }

    /// Record a node for disposal when the voice is reclaimed.
    pub fn own(mut self, node: NodeId) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn build(self) -> Voice {
        Voice {
            state: VoiceState::Sounding,
            listeners: self.listeners,
            releases: self.releases,
            nodes: self.nodes,
            deadline: None,
        }
    }
}
