// src/scoring/mod.rs

//! Response sheet → tallies → marks → shift → ranks.

pub mod extractor;
pub mod marking;
pub mod pipeline;
pub mod rank;
pub mod shift;

pub use pipeline::ScoringPipeline;
