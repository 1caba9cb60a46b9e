//! qcast: Monte Carlo quality-test risk prediction
//!
//! Predicts the outcome of a product's quality tests from its formula,
//! process parameters and production facility, and aggregates the
//! per-test probabilities of failure into a project-level risk report.

pub mod cli;
pub mod core;
pub mod entities;
pub mod reference;
pub mod yaml;
