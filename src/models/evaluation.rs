// src/models/evaluation.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::candidate::CandidateDetails;
use super::result::SubjectResult;

/// Candidate fields supplied by the requester rather than the sheet.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct EvaluationContext {
    #[validate(length(min = 1, message = "exam_name required"))]
    pub exam_name: String,
    #[validate(length(min = 1, message = "category required"))]
    pub category: String,
    #[validate(length(min = 1, message = "gender required"))]
    pub gender: String,
    #[validate(length(min = 1, message = "state required"))]
    pub state: String,
}

/// DTO for evaluating an uploaded response sheet.
#[derive(Debug, Deserialize, Validate)]
pub struct EvaluateRequest {
    #[serde(flatten)]
    #[validate(nested)]
    pub context: EvaluationContext,
    /// Raw markup of the response sheet.
    #[validate(length(min = 1, message = "html required"))]
    pub html: String,
}

/// DTO for evaluating a response sheet hosted by the exam vendor.
#[derive(Debug, Deserialize, Validate)]
pub struct EvaluateUrlRequest {
    #[serde(flatten)]
    #[validate(nested)]
    pub context: EvaluationContext,
    #[validate(custom(function = validate_sheet_url))]
    pub url: String,
}

fn validate_sheet_url(raw: &str) -> Result<(), validator::ValidationError> {
    match url::Url::parse(raw.trim()) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
        _ => Err(validator::ValidationError::new("invalid_url")),
    }
}

/// What a completed evaluation reports back.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationOutcome {
    pub final_marks: f64,
    pub shift_id: String,
    pub candidate: CandidateDetails,
    pub subjects: Vec<SubjectResult>,
}
