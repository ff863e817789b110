use std::collections::HashMap;

use crate::render::node::{ControlId, NodeId, RenderBackend, Seconds, Waveform};

/*
Offline Backend
===============

An in-memory renderer that never produces audio. It keeps, for every control,
the piecewise-linear automation curve the engine has scheduled, and evaluates
it against a clock the caller advances by hand.

Curve semantics follow the usual renderer convention:

  ramp(target, end)   anchors at the control's previous scheduled point and
                      interpolates linearly to (end, target). A deadline at or
                      before `now` takes effect immediately.

  set(value)          cancels every scheduled point in the future and steps
                      to `value` at the current time.

A consequence worth knowing when reading tests: a bare ramp issued long after
the last scheduled point interpolates from that old point, not from `now`.
Release actions therefore re-anchor with `set(current)` before ramping — that
is what keeps a release free of jumps no matter when the key comes up.
*/

/// Where a node's output was routed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Edge {
    Node(NodeId, NodeId),
    Control(NodeId, ControlId),
    Output(NodeId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Oscillator(Waveform),
    Gain,
    Filter,
}

#[derive(Debug)]
struct NodeState {
    kind: NodeKind,
    started_at: Option<Seconds>,
    stops_at: Option<Seconds>,
    discarded: bool,
}

/// Piecewise-linear automation curve. Points are time-ordered; the last one
/// holds forever.
#[derive(Debug)]
struct Curve {
    points: Vec<(Seconds, f32)>,
}

impl Curve {
    fn new(at: Seconds, value: f32) -> Self {
        Self {
            points: vec![(at, value)],
        }
    }

    fn value_at(&self, at: Seconds) -> f32 {
        let Some(&(first_t, first_v)) = self.points.first() else {
            return 0.0;
        };
        if at <= first_t {
            return first_v;
        }
        for pair in self.points.windows(2) {
            let (t0, v0) = pair[0];
            let (t1, v1) = pair[1];
            if at < t1 {
                if t1 - t0 <= f64::EPSILON {
                    return v1;
                }
                let frac = ((at - t0) / (t1 - t0)) as f32;
                return v0 + (v1 - v0) * frac;
            }
        }
        self.points[self.points.len() - 1].1
    }

    fn set(&mut self, at: Seconds, value: f32) {
        self.points.retain(|&(t, _)| t < at);
        self.points.push((at, value));
    }

    fn ramp(&mut self, end: Seconds, target: f32) {
        self.points.retain(|&(t, _)| t < end);
        self.points.push((end, target));
    }

    fn end_time(&self) -> Seconds {
        self.points.last().map(|&(t, _)| t).unwrap_or(0.0)
    }
}

/// [`RenderBackend`] that records topology and automation instead of playing
/// them. Drives the test suite and the schedule dump in the demo binary.
#[derive(Debug, Default)]
pub struct OfflineBackend {
    clock: Seconds,
    next_node: u32,
    nodes: HashMap<NodeId, NodeState>,
    controls: HashMap<ControlId, Curve>,
    edges: Vec<Edge>,
}

impl OfflineBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward. Scheduled ramps "play out" simply by being
    /// evaluated at the later time.
    pub fn advance(&mut self, dt: Seconds) {
        debug_assert!(dt >= 0.0);
        self.clock += dt;
    }

    /// Nodes created and not yet discarded.
    pub fn live_nodes(&self) -> usize {
        self.nodes.values().filter(|n| !n.discarded).count()
    }

    pub fn node_kind(&self, node: NodeId) -> Option<NodeKind> {
        self.nodes.get(&node).map(|n| n.kind)
    }

    pub fn is_discarded(&self, node: NodeId) -> bool {
        self.nodes.get(&node).map(|n| n.discarded).unwrap_or(false)
    }

    pub fn started_at(&self, node: NodeId) -> Option<Seconds> {
        self.nodes.get(&node).and_then(|n| n.started_at)
    }

    pub fn stop_time(&self, node: NodeId) -> Option<Seconds> {
        self.nodes.get(&node).and_then(|n| n.stops_at)
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn feeds(&self, from: NodeId, to: NodeId) -> bool {
        self.edges.contains(&Edge::Node(from, to))
    }

    pub fn feeds_control(&self, from: NodeId, target: ControlId) -> bool {
        self.edges.contains(&Edge::Control(from, target))
    }

    /// Whether a node's signal reaches the output sink through the recorded
    /// node-to-node edges.
    pub fn reaches_output(&self, node: NodeId) -> bool {
        let mut frontier = vec![node];
        let mut seen = vec![node];
        while let Some(current) = frontier.pop() {
            for edge in &self.edges {
                match *edge {
                    Edge::Output(from) if from == current => return true,
                    Edge::Node(from, to) if from == current && !seen.contains(&to) => {
                        seen.push(to);
                        frontier.push(to);
                    }
                    _ => {}
                }
            }
        }
        false
    }

    /// Time of the last scheduled point on a control's curve.
    pub fn scheduled_end(&self, control: ControlId) -> Option<Seconds> {
        self.controls.get(&control).map(|c| c.end_time())
    }

    /// Raw automation points, for tests that assert ramp shape.
    pub fn curve(&self, control: ControlId) -> Option<&[(Seconds, f32)]> {
        self.controls.get(&control).map(|c| c.points.as_slice())
    }

    fn add_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        self.nodes.insert(
            id,
            NodeState {
                kind,
                started_at: None,
                stops_at: None,
                discarded: false,
            },
        );
        id
    }

    fn live(&mut self, node: NodeId) -> Option<&mut NodeState> {
        match self.nodes.get_mut(&node) {
            Some(state) if !state.discarded => Some(state),
            Some(_) => {
                log::warn!("operation on discarded node {node:?}");
                None
            }
            None => {
                log::warn!("operation on unknown node {node:?}");
                None
            }
        }
    }
}

impl RenderBackend for OfflineBackend {
    fn now(&self) -> Seconds {
        self.clock
    }

    fn add_oscillator(&mut self, shape: Waveform, frequency: f32) -> NodeId {
        let id = self.add_node(NodeKind::Oscillator(shape));
        self.controls
            .insert(ControlId::frequency(id), Curve::new(self.clock, frequency));
        id
    }

    fn add_gain(&mut self, level: f32) -> NodeId {
        let id = self.add_node(NodeKind::Gain);
        self.controls
            .insert(ControlId::level(id), Curve::new(self.clock, level));
        id
    }

    fn add_filter(&mut self, cutoff: f32) -> NodeId {
        let id = self.add_node(NodeKind::Filter);
        self.controls
            .insert(ControlId::cutoff(id), Curve::new(self.clock, cutoff));
        id
    }

    fn connect(&mut self, from: NodeId, to: NodeId) {
        self.edges.push(Edge::Node(from, to));
    }

    fn connect_control(&mut self, from: NodeId, target: ControlId) {
        self.edges.push(Edge::Control(from, target));
    }

    fn connect_output(&mut self, from: NodeId) {
        self.edges.push(Edge::Output(from));
    }

    fn start(&mut self, node: NodeId, at: Seconds) {
        if let Some(state) = self.live(node) {
            state.started_at = Some(at);
        }
    }

    fn stop(&mut self, node: NodeId, at: Seconds) {
        if let Some(state) = self.live(node) {
            state.stops_at = Some(at);
        }
    }

    fn discard(&mut self, node: NodeId) {
        match self.nodes.get_mut(&node) {
            Some(state) => state.discarded = true,
            None => log::warn!("discard of unknown node {node:?}"),
        }
    }

    fn control_value(&self, control: ControlId) -> f32 {
        self.controls
            .get(&control)
            .map(|c| c.value_at(self.clock))
            .unwrap_or(0.0)
    }

    fn set_control(&mut self, control: ControlId, value: f32) {
        let now = self.clock;
        match self.controls.get_mut(&control) {
            Some(curve) => curve.set(now, value),
            None => log::warn!("set on unknown control {control:?}"),
        }
    }

    fn ramp_control(&mut self, control: ControlId, target: f32, end_time: Seconds) {
        let end = end_time.max(self.clock);
        match self.controls.get_mut(&control) {
            Some(curve) => curve.ramp(end, target),
            None => log::warn!("ramp on unknown control {control:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ramp_interpolates_linearly() {
        let mut backend = OfflineBackend::new();
        let gain = backend.add_gain(0.0);
        let ctl = ControlId::level(gain);

        backend.ramp_control(ctl, 1.0, 2.0);
        assert_eq!(backend.control_value(ctl), 0.0);

        backend.advance(1.0);
        assert!((backend.control_value(ctl) - 0.5).abs() < 1e-6);

        backend.advance(1.0);
        assert!((backend.control_value(ctl) - 1.0).abs() < 1e-6);

        // Past the deadline the target holds.
        backend.advance(5.0);
        assert!((backend.control_value(ctl) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn instant_ramp_takes_effect_immediately() {
        let mut backend = OfflineBackend::new();
        let gain = backend.add_gain(0.0);
        let ctl = ControlId::level(gain);

        // Deadline == now: a zero-length attack is still a valid ramp.
        backend.ramp_control(ctl, 0.3, backend.now());
        assert!((backend.control_value(ctl) - 0.3).abs() < 1e-6);
    }

    #[test]
    fn set_cancels_scheduled_points() {
        let mut backend = OfflineBackend::new();
        let gain = backend.add_gain(0.0);
        let ctl = ControlId::level(gain);

        backend.ramp_control(ctl, 1.0, 4.0);
        backend.advance(1.0);
        backend.set_control(ctl, 0.9);

        // The pending ramp to 1.0 is gone; the value holds at 0.9.
        backend.advance(10.0);
        assert!((backend.control_value(ctl) - 0.9).abs() < 1e-6);
        assert_eq!(backend.scheduled_end(ctl), Some(1.0));
    }

    #[test]
    fn chained_ramps_anchor_at_previous_point() {
        let mut backend = OfflineBackend::new();
        let gain = backend.add_gain(0.0);
        let ctl = ControlId::level(gain);

        backend.ramp_control(ctl, 1.0, 1.0);
        backend.ramp_control(ctl, 0.5, 2.0);

        backend.advance(1.5);
        assert!((backend.control_value(ctl) - 0.75).abs() < 1e-6);
    }

    #[test]
    fn discard_retires_the_handle() {
        let mut backend = OfflineBackend::new();
        let osc = backend.add_oscillator(Waveform::Square, 440.0);
        assert_eq!(backend.live_nodes(), 1);

        backend.discard(osc);
        assert_eq!(backend.live_nodes(), 0);
        assert!(backend.is_discarded(osc));

        // Further operations on the dead handle are ignored.
        backend.start(osc, 0.0);
        assert_eq!(backend.started_at(osc), None);
    }

    #[test]
    fn topology_queries_follow_edges() {
        let mut backend = OfflineBackend::new();
        let osc = backend.add_oscillator(Waveform::Square, 440.0);
        let filter = backend.add_filter(5_000.0);
        let gain = backend.add_gain(0.0);
        let lfo = backend.add_oscillator(Waveform::Sine, 0.0);

        backend.connect(osc, filter);
        backend.connect(filter, gain);
        backend.connect_output(gain);
        backend.connect_control(lfo, ControlId::cutoff(filter));

        assert!(backend.feeds(osc, filter));
        assert!(backend.reaches_output(osc));
        assert!(!backend.reaches_output(lfo));
        assert!(backend.feeds_control(lfo, ControlId::cutoff(filter)));
    }
}
