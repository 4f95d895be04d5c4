//! Visibility-driven playback scheduling components.

pub mod admission;
pub mod facade;
pub mod fallback;
pub mod telemetry;
