// Purpose - event transport boundary: packet decoding, routing

pub mod midi;
pub mod router;
