//! Taint propagation infrastructure

pub mod propagator;

pub use propagator::{PropagationOutcome, Propagator};
