/// Command nibbles of the events the engine reacts to.
pub const NOTE_DOWN: u8 = 9;
pub const NOTE_UP: u8 = 8;
pub const PARAM_SET: u8 = 11;

/// One raw transport record: the fields of a 3-byte packet, with velocity
/// already normalized from [0, 127] to [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawMessage {
    pub command: u8,
    pub channel: u8,
    pub note: u8,
    pub velocity: f32,
}

impl RawMessage {
    /// Decode a 3-byte packet: high nibble of byte 0 is the command, low
    /// nibble the channel; byte 1 names the note (or parameter slot), byte 2
    /// carries the velocity (or parameter value).
    pub fn from_packet(bytes: [u8; 3]) -> Self {
        Self {
            command: bytes[0] >> 4,
            channel: bytes[0] & 0xF,
            note: bytes[1],
            velocity: f32::from(bytes[2]) / 127.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MidiEvent {
    NoteOn { channel: u8, key: u8, velocity: f32 },
    NoteOff { channel: u8, key: u8, velocity: f32 },
    ControlChange { channel: u8, slot: u8, value: f32 },
}

/// Classify a raw record. Commands the engine has no handler for decode to
/// `None` and are skipped upstream.
pub fn decode(msg: &RawMessage) -> Option<MidiEvent> {
    match msg.command {
        NOTE_DOWN => Some(MidiEvent::NoteOn {
            channel: msg.channel,
            key: msg.note,
            velocity: msg.velocity,
        }),
        NOTE_UP => Some(MidiEvent::NoteOff {
            channel: msg.channel,
            key: msg.note,
            velocity: msg.velocity,
        }),
        PARAM_SET => Some(MidiEvent::ControlChange {
            channel: msg.channel,
            slot: msg.note,
            value: msg.velocity,
        }),
        _ => None,
    }
}
