//! Test utilities for renderer testing
//!
//! Simulated hardware collaborators. Every simulator is a cheap, cloneable
//! handle onto shared state, so a test can keep one clone while the renderer
//! owns another (possibly on its own thread).

mod hardware;

pub use hardware::*;
