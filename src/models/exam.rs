// src/models/exam.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Per-answer point values. Values may be fractional or negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarkingScheme {
    pub correct: f64,
    pub wrong: f64,
    pub na: f64,
}

/// One configured subject. Subjects are matched positionally against
/// the sections of a response sheet, so their order matters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectConfig {
    pub name: String,
    pub max_marks: f64,
    pub count_in_total: bool,
}

/// Represents an exam as created by an administrator.
/// Read-only once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamConfig {
    pub name: String,
    pub scheme: MarkingScheme,
    pub subjects: Vec<SubjectConfig>,
}

pub const BASE_COLUMNS: [&str; 6] = ["Name", "Roll", "Category", "Gender", "State", "Final Marks"];
pub const RANK_COLUMN: &str = "Rank";

/// Storage key for an exam name: trimmed, whitespace runs replaced by `_`.
pub fn exam_key(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join("_")
}

impl ExamConfig {
    pub fn key(&self) -> String {
        exam_key(&self.name)
    }

    /// Header every new shift table is cloned from: the base columns
    /// followed by five columns per subject in configured order.
    pub fn column_template(&self) -> Vec<String> {
        let mut columns: Vec<String> = BASE_COLUMNS.iter().map(|c| c.to_string()).collect();
        for subject in &self.subjects {
            for suffix in ["Attempt", "R", "W", "NA", "Marks"] {
                columns.push(format!("{}_{}", subject.name, suffix));
            }
        }
        columns
    }
}

/// DTO for creating a new exam.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateExamRequest {
    #[validate(length(min = 1, max = 200, message = "exam_name required"))]
    pub exam_name: String,
    pub correct: f64,
    pub wrong: f64,
    #[serde(default)]
    pub na: f64,
    #[validate(
        length(min = 1, message = "subjects required"),
        custom(function = validate_subjects)
    )]
    pub subjects: Vec<SubjectConfig>,
}

fn validate_subjects(subjects: &[SubjectConfig]) -> Result<(), validator::ValidationError> {
    let mut seen = std::collections::HashSet::new();
    for subject in subjects {
        if subject.name.trim().is_empty() {
            return Err(validator::ValidationError::new("empty_subject_name"));
        }
        if !seen.insert(subject.name.trim().to_lowercase()) {
            return Err(validator::ValidationError::new("duplicate_subject_name"));
        }
    }
    Ok(())
}

impl From<CreateExamRequest> for ExamConfig {
    fn from(req: CreateExamRequest) -> Self {
        ExamConfig {
            name: req.exam_name.trim().to_string(),
            scheme: MarkingScheme {
                correct: req.correct,
                wrong: req.wrong,
                na: req.na,
            },
            subjects: req
                .subjects
                .into_iter()
                .map(|s| SubjectConfig {
                    name: s.name.trim().to_string(),
                    ..s
                })
                .collect(),
        }
    }
}

/// DTO for deleting an exam.
#[derive(Debug, Deserialize, Validate)]
pub struct DeleteExamRequest {
    #[validate(length(min = 1, message = "exam_name required"))]
    pub exam_name: String,
}

/// Flattened view used by the admin exam listing.
#[derive(Debug, Serialize)]
pub struct ExamSummary {
    pub exam_name: String,
    pub correct: f64,
    pub wrong: f64,
    pub na: f64,
    pub subjects: Vec<SubjectConfig>,
}

impl From<ExamConfig> for ExamSummary {
    fn from(exam: ExamConfig) -> Self {
        ExamSummary {
            exam_name: exam.name,
            correct: exam.scheme.correct,
            wrong: exam.scheme.wrong,
            na: exam.scheme.na,
            subjects: exam.subjects,
        }
    }
}
