use crate::{
    io::midi::{decode, MidiEvent, RawMessage},
    render::node::RenderBackend,
    synth::instrument::Instrument,
};

#[cfg(feature = "rtrb")]
use rtrb::Consumer;

/// Source of pending transport records, drained in arrival order.
pub trait EventReceiver {
    fn pop(&mut self) -> Option<RawMessage>;
}

#[cfg(feature = "rtrb")]
impl EventReceiver for Consumer<RawMessage> {
    fn pop(&mut self) -> Option<RawMessage> {
        Consumer::pop(self).ok()
    }
}

/// Decodes raw records and dispatches exactly one instrument call per event,
/// synchronously, in arrival order. No buffering, no coalescing: a burst of
/// parameter-set events is applied and fanned out one by one.
#[derive(Debug, Default, Clone, Copy)]
pub struct EventRouter {
    channel: Option<u8>,
}

impl EventRouter {
    /// Route events from every channel.
    pub fn new() -> Self {
        Self { channel: None }
    }

    /// Route only events on `channel`, ignoring the rest.
    pub fn with_channel(channel: u8) -> Self {
        Self {
            channel: Some(channel),
        }
    }

    pub fn route<B: RenderBackend>(&self, instrument: &mut Instrument<B>, msg: &RawMessage) {
        let Some(event) = decode(msg) else {
            log::trace!("unsupported command {}, skipped", msg.command);
            return;
        };
        if self.channel.is_some_and(|ch| ch != msg.channel) {
            return;
        }
        match event {
            MidiEvent::NoteOn { key, .. } => instrument.on_key_down(key),
            MidiEvent::NoteOff { key, .. } => instrument.on_key_up(key),
            MidiEvent::ControlChange { slot, value, .. } => {
                instrument.on_param_set(usize::from(slot), value)
            }
        }
    }

    /// Pull every pending record off the receiver and route each in order.
    pub fn drain<B, R>(&self, rx: &mut R, instrument: &mut Instrument<B>)
    where
        B: RenderBackend,
        R: EventReceiver,
    {
        while let Some(msg) = rx.pop() {
            self.route(instrument, &msg);
        }
    }
}
