//! voicebox - scripted keyboard session against the offline renderer
//!
//! Drives a short phrase of raw 3-byte events through the router and prints
//! the schedule the engine hands the renderer. Run with: cargo run

use voicebox::{
    io::{midi::RawMessage, router::EventRouter},
    render::{node::RenderBackend, offline::OfflineBackend},
    synth::instrument::Instrument,
};

/// (seconds since session start, packet)
const SCRIPT: &[(f64, [u8; 3])] = &[
    // Shape the patch first: cutoff, LFO rate, mod depth, then ADSR.
    (0.00, [0xB0, 0, 102]), // cutoff ~80%
    (0.00, [0xB0, 1, 25]),  // LFO rate ~20%
    (0.00, [0xB0, 2, 38]),  // mod depth ~30%
    (0.00, [0xB0, 4, 13]),  // attack
    (0.00, [0xB0, 5, 25]),  // decay
    (0.00, [0xB0, 6, 89]),  // sustain
    (0.00, [0xB0, 7, 51]),  // release
    // A held triad, then a cutoff sweep while it sounds.
    (0.10, [0x90, 60, 100]),
    (0.15, [0x90, 64, 100]),
    (0.20, [0x90, 67, 100]),
    (0.60, [0xB0, 0, 64]),
    (0.80, [0xB0, 0, 32]),
    // Release the chord.
    (1.20, [0x80, 60, 0]),
    (1.25, [0x80, 64, 0]),
    (1.30, [0x80, 67, 0]),
];

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    env_logger::init();

    let router = EventRouter::new();
    let mut inst = Instrument::new(OfflineBackend::new());

    for &(at, packet) in SCRIPT {
        let now = inst.backend().now();
        if at > now {
            inst.backend_mut().advance(at - now);
        }
        let msg = RawMessage::from_packet(packet);
        router.route(&mut inst, &msg);
        println!(
            "t={at:.2}  cmd={:X} data=({}, {:.2})  voices={} releasing={} live-nodes={}",
            msg.command,
            msg.note,
            msg.velocity,
            inst.voice_count(),
            inst.releasing_count(),
            inst.backend().live_nodes(),
        );
    }

    // Let the releases ring out, then reclaim.
    inst.backend_mut().advance(1.0);
    inst.reap();
    println!(
        "session end: voices={} releasing={} live-nodes={}",
        inst.voice_count(),
        inst.releasing_count(),
        inst.backend().live_nodes(),
    );
    Ok(())
}
