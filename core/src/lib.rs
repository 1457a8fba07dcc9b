//! Population microsimulation and tax engine.
//!
//! Synthesises one record per resident from published aggregate tables,
//! then computes each resident's tax under a progressive schedule.

pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod event;
pub mod income_sampler;
pub mod occupation;
pub mod reference;
pub mod rng;
pub mod status_classifier;
pub mod store;
pub mod summary;
pub mod synthesizer;
pub mod tail_adjustment;
pub mod tax_engine;
pub mod types;
