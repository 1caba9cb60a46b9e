//! CLI command implementations

pub mod correlate;
pub mod predict;
pub mod simulate;
pub mod specs;
pub mod variability;
