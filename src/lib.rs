//! Agent-based simulation of cruising for curb-side parking.
//!
//! Drivers arrive minute by minute, each with sampled prices, parking durations and
//! values of time. They park at the curb when it is cheaper and free, park off-street
//! when that is cheaper, and otherwise cruise until a curb space frees up or their
//! patience runs out. [`monte_carlo::MonteCarlo`] repeats independent runs and stacks
//! the per-minute [`model::State`] rows into a `[minute, field, run]` tensor.

pub mod analysis;
pub mod config;
pub mod economics;
pub mod engine;
pub mod manager;
pub mod model;
pub mod monte_carlo;
pub mod population;
pub mod sampler;
pub mod stats;
