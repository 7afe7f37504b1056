// src/models/mod.rs

pub mod candidate;
pub mod evaluation;
pub mod exam;
pub mod result;
