// src/models/result.rs

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::exam::{BASE_COLUMNS, RANK_COLUMN};

/// Scored outcome for one subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectResult {
    pub name: String,
    /// correct + wrong
    pub attempt: u32,
    pub correct: u32,
    pub wrong: u32,
    pub na: u32,
    pub marks: f64,
    pub count_in_total: bool,
}

/// Identifies one shift table of one exam.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ShiftHandle {
    pub exam_key: String,
    pub shift_id: String,
}

/// Row payload handed to `upsert_row`; `roll` is the upsert key.
#[derive(Debug, Clone, PartialEq)]
pub struct NewResultRow {
    pub name: String,
    pub roll: String,
    pub category: String,
    pub gender: String,
    pub state: String,
    pub final_marks: f64,
    pub subjects: Vec<SubjectResult>,
}

/// A stored shift row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    pub id: i64,
    pub name: String,
    pub roll: String,
    pub category: String,
    pub gender: String,
    pub state: String,
    pub final_marks: f64,
    pub subjects: Vec<SubjectResult>,
    pub rank: Option<i64>,
}

impl ResultRow {
    /// Cell values laid out against a shift table header.
    /// Columns the row knows nothing about come back as `null`.
    pub fn cells(&self, columns: &[String]) -> Vec<Value> {
        columns.iter().map(|column| self.cell(column)).collect()
    }

    fn cell(&self, column: &str) -> Value {
        match column {
            c if c == BASE_COLUMNS[0] => json!(self.name),
            c if c == BASE_COLUMNS[1] => json!(self.roll),
            c if c == BASE_COLUMNS[2] => json!(self.category),
            c if c == BASE_COLUMNS[3] => json!(self.gender),
            c if c == BASE_COLUMNS[4] => json!(self.state),
            c if c == BASE_COLUMNS[5] => json!(self.final_marks),
            RANK_COLUMN => json!(self.rank),
            other => self
                .subjects
                .iter()
                .find_map(|s| {
                    let suffix = other.strip_prefix(s.name.as_str())?.strip_prefix('_')?;
                    match suffix {
                        "Attempt" => Some(json!(s.attempt)),
                        "R" => Some(json!(s.correct)),
                        "W" => Some(json!(s.wrong)),
                        "NA" => Some(json!(s.na)),
                        "Marks" => Some(json!(s.marks)),
                        _ => None,
                    }
                })
                .unwrap_or(Value::Null),
        }
    }
}

/// Candidate block of a result lookup.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateInfo {
    pub name: String,
    pub roll: String,
    pub category: String,
    pub gender: String,
    pub state: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubjectMarks {
    pub name: String,
    pub attempt: u32,
    pub correct: u32,
    pub wrong: u32,
    pub na: u32,
    pub marks: f64,
}

impl From<&SubjectResult> for SubjectMarks {
    fn from(s: &SubjectResult) -> Self {
        SubjectMarks {
            name: s.name.clone(),
            attempt: s.attempt,
            correct: s.correct,
            wrong: s.wrong,
            na: s.na,
            marks: s.marks,
        }
    }
}

/// Response for a lookup by `(exam, roll)`.
#[derive(Debug, Clone, Serialize)]
pub struct ResultView {
    pub exam: String,
    pub candidate: CandidateInfo,
    pub counted_subjects: Vec<SubjectMarks>,
    pub qualifying_subjects: Vec<SubjectMarks>,
    pub final_marks: f64,
    pub shift_id: String,
    pub rank: Option<i64>,
    pub total_candidates: usize,
}

impl ResultView {
    pub fn new(exam: String, shift_id: String, row: ResultRow, total_candidates: usize) -> Self {
        let (counted, qualifying): (Vec<&SubjectResult>, Vec<&SubjectResult>) =
            row.subjects.iter().partition(|s| s.count_in_total);

        ResultView {
            exam,
            counted_subjects: counted.into_iter().map(SubjectMarks::from).collect(),
            qualifying_subjects: qualifying.into_iter().map(SubjectMarks::from).collect(),
            final_marks: row.final_marks,
            shift_id,
            rank: row.rank,
            total_candidates,
            candidate: CandidateInfo {
                name: row.name,
                roll: row.roll,
                category: row.category,
                gender: row.gender,
                state: row.state,
            },
        }
    }
}

/// A whole shift table rendered against its header, ordered by rank.
#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardView {
    pub exam: String,
    pub shift_id: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}
