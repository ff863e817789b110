//! Interface boundary to the audio renderer.
//!
//! The engine core never touches samples. It hands the renderer declarative
//! instructions — build this node, connect it there, ramp this control to a
//! target by a deadline — and returns immediately. Everything the core needs
//! from a renderer is captured by [`node::RenderBackend`].

/// Node/control addressing and the backend trait.
pub mod node;
/// Clock-driven in-memory backend for tests and offline inspection.
pub mod offline;
