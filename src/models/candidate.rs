// src/models/candidate.rs

use serde::{Deserialize, Serialize};

/// Candidate metadata scraped from a response sheet.
/// Only `roll` and `name` are required for persistence; the rest is best-effort.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateDetails {
    pub roll: Option<String>,
    pub name: Option<String>,
    pub venue: Option<String>,
    /// `dd/mm/yyyy`
    pub exam_date: Option<String>,
    /// `H:MM AM - H:MM PM`, meridians uppercased.
    pub exam_time: Option<String>,
    pub subject: Option<String>,
}

/// Per-section classification counts, in first-seen section order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionTally {
    pub label: String,
    pub correct: u32,
    pub wrong: u32,
    pub unattempted: u32,
}

impl SectionTally {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }
}
