/// Time in seconds on the renderer's monotonic clock.
pub type Seconds = f64;

/// Handle to one renderer-owned signal-processing node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

/// The controllable scalar inputs a node can expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Port {
    /// Oscillator pitch in Hz.
    Frequency,
    /// Gain-stage multiplier.
    Level,
    /// Filter cutoff in Hz.
    Cutoff,
}

/// Address of one controllable output: a port on a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControlId {
    pub node: NodeId,
    pub port: Port,
}

impl ControlId {
    pub fn frequency(node: NodeId) -> Self {
        Self {
            node,
            port: Port::Frequency,
        }
    }

    pub fn level(node: NodeId) -> Self {
        Self {
            node,
            port: Port::Level,
        }
    }

    pub fn cutoff(node: NodeId) -> Self {
        Self {
            node,
            port: Port::Cutoff,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Waveform {
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

/// Minimum capability set the engine needs from a renderer.
///
/// All scheduling is declarative and non-blocking: `ramp_control` means
/// "reach `target` by `end_time`", and control returns before the ramp runs.
/// A ramp whose deadline is not in the future takes effect immediately.
///
/// Operations on unknown or discarded handles must be ignored, never fatal —
/// a live instrument keeps running through a bad handle the same way it keeps
/// running through a malformed event.
pub trait RenderBackend {
    /// Current time on the renderer's monotonic clock.
    fn now(&self) -> Seconds;

    fn add_oscillator(&mut self, shape: Waveform, frequency: f32) -> NodeId;
    fn add_gain(&mut self, level: f32) -> NodeId;
    fn add_filter(&mut self, cutoff: f32) -> NodeId;

    /// Route `from`'s signal into `to`'s input.
    fn connect(&mut self, from: NodeId, to: NodeId);
    /// Sum `from`'s signal into a control input (modulation path).
    fn connect_control(&mut self, from: NodeId, target: ControlId);
    /// Route `from`'s signal to the output sink.
    fn connect_output(&mut self, from: NodeId);

    fn start(&mut self, node: NodeId, at: Seconds);
    fn stop(&mut self, node: NodeId, at: Seconds);

    /// Release the node's resources. The handle is dead afterwards.
    fn discard(&mut self, node: NodeId);

    /// Value the control holds right now, with any in-flight ramp applied.
    fn control_value(&self, control: ControlId) -> f32;
    fn set_control(&mut self, control: ControlId, value: f32);
    /// Linear ramp from the control's previous scheduled point to `target`,
    /// completing at `end_time`.
    fn ramp_control(&mut self, control: ControlId, target: f32, end_time: Seconds);
}
