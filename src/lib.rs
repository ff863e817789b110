pub mod io; // Event transport decoding and routing
pub mod render; // Renderer interface boundary
pub mod synth; // Voice lifecycle, envelopes, polyphony

/// Number of slots in a [`synth::params::ParamVector`].
pub const PARAM_SLOTS: usize = 16;

/// Attack/decay/release times are nominal fractions; the scheduler compresses
/// them by this factor. Tuning constant, kept as-is.
pub const ENV_TIME_SCALE: f32 = 0.5;
