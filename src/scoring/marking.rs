// src/scoring/marking.rs

use crate::{
    error::AppError,
    models::{
        candidate::SectionTally,
        exam::{ExamConfig, MarkingScheme},
        result::SubjectResult,
    },
};

/// Marks earned for a tally under a scheme.
pub fn section_marks(scheme: &MarkingScheme, correct: u32, wrong: u32, na: u32) -> f64 {
    f64::from(correct) * scheme.correct + f64::from(wrong) * scheme.wrong + f64::from(na) * scheme.na
}

/// Maps the i-th section onto the i-th configured subject and scores it.
///
/// Returns `(final_marks, subject_results)`, where `final_marks` sums only
/// subjects marked `count_in_total`. Fails with `SchemaMismatch` when the
/// sheet and the exam disagree on the number of sections.
pub fn evaluate(
    tallies: &[SectionTally],
    exam: &ExamConfig,
) -> Result<(f64, Vec<SubjectResult>), AppError> {
    if tallies.len() != exam.subjects.len() {
        return Err(AppError::SchemaMismatch {
            sections: tallies.len(),
            subjects: exam.subjects.len(),
        });
    }

    let mut final_marks = 0.0;
    let mut results = Vec::with_capacity(tallies.len());

    for (tally, subject) in tallies.iter().zip(&exam.subjects) {
        if !tally.label.trim().eq_ignore_ascii_case(subject.name.trim()) {
            tracing::debug!(
                section = %tally.label,
                subject = %subject.name,
                "Section label differs from positional subject"
            );
        }

        let marks = section_marks(&exam.scheme, tally.correct, tally.wrong, tally.unattempted);
        if subject.count_in_total {
            final_marks += marks;
        }

        results.push(SubjectResult {
            name: subject.name.clone(),
            attempt: tally.correct + tally.wrong,
            correct: tally.correct,
            wrong: tally.wrong,
            na: tally.unattempted,
            marks,
            count_in_total: subject.count_in_total,
        });
    }

    Ok((final_marks, results))
}
