// src/scoring/rank.rs

use crate::{error::AppError, models::result::ShiftHandle, repository::ResultRepository};

/// Standard competition ranking ("1224").
///
/// Input is `(row_id, final_marks)` in read order. Equal marks share a rank,
/// and the next distinct score ranks at rows-seen-so-far + 1. Ties keep
/// their read order.
pub fn competition_ranks(scores: &[(i64, f64)]) -> Vec<(i64, i64)> {
    let mut sorted = scores.to_vec();
    // `sort_by` is stable, which preserves read order inside a tie.
    sorted.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut ranks = Vec::with_capacity(sorted.len());
    let mut prev_marks: Option<f64> = None;
    let mut current_rank = 0;

    for (processed, (row_id, marks)) in sorted.into_iter().enumerate() {
        if prev_marks != Some(marks) {
            current_rank = processed as i64 + 1;
            prev_marks = Some(marks);
        }
        ranks.push((row_id, current_rank));
    }

    ranks
}

/// Re-ranks every row of a shift and writes the ranks back.
/// Returns the shift population.
pub async fn recompute_shift_ranks(
    repo: &dyn ResultRepository,
    shift: &ShiftHandle,
) -> Result<usize, AppError> {
    let rows = repo.read_all_rows(shift).await?;
    let scores: Vec<(i64, f64)> = rows.iter().map(|r| (r.id, r.final_marks)).collect();

    let ranks = competition_ranks(&scores);
    repo.write_ranks(shift, &ranks).await?;

    tracing::debug!(shift = %shift.shift_id, rows = ranks.len(), "Ranks recomputed");
    Ok(ranks.len())
}
