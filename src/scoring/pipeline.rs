// src/scoring/pipeline.rs

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::{extractor, marking, rank, shift::resolve_shift_id};
use crate::{
    error::AppError,
    models::{
        evaluation::{EvaluationContext, EvaluationOutcome},
        exam::ExamConfig,
        result::{LeaderboardView, NewResultRow, ResultView, ShiftHandle},
    },
    repository::ResultRepository,
    utils::lock::ShiftLocks,
};

/// Markup in, ranked shift row out.
///
/// Extraction and scoring are pure. The write path (ensure shift, upsert,
/// re-rank) runs under the shift's lock. The deadline bounds the lock wait
/// and the write; the re-rank always runs to completion.
#[derive(Clone)]
pub struct ScoringPipeline {
    repo: Arc<dyn ResultRepository>,
    locks: Arc<ShiftLocks>,
    repository_timeout: Duration,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl ScoringPipeline {
    pub fn new(repo: Arc<dyn ResultRepository>, repository_timeout: Duration) -> Self {
        Self {
            repo,
            locks: Arc::new(ShiftLocks::new()),
            repository_timeout,
        }
    }

    pub fn repository(&self) -> &dyn ResultRepository {
        self.repo.as_ref()
    }

    async fn within<T>(
        &self,
        operation: &str,
        fut: impl Future<Output = Result<T, AppError>>,
    ) -> Result<T, AppError> {
        tokio::time::timeout(self.repository_timeout, fut)
            .await
            .map_err(|_| {
                tracing::warn!(operation, "Repository deadline exceeded");
                AppError::Repository(format!(
                    "{} timed out after {}s",
                    operation,
                    self.repository_timeout.as_secs_f64()
                ))
            })?
    }

    /// Scores one response sheet and records it in its shift.
    pub async fn evaluate(
        &self,
        markup: &str,
        ctx: &EvaluationContext,
    ) -> Result<EvaluationOutcome, AppError> {
        let (details, tallies) = extractor::extract(markup);

        let (Some(roll), Some(name)) = (present(&details.roll), present(&details.name)) else {
            return Err(AppError::Extraction(
                "unable to extract candidate roll number and name".to_string(),
            ));
        };
        let (Some(exam_date), Some(exam_time)) =
            (present(&details.exam_date), present(&details.exam_time))
        else {
            return Err(AppError::Extraction(
                "shift not determinable: exam date or time missing from response sheet".to_string(),
            ));
        };
        let shift_id = resolve_shift_id(exam_date, exam_time);

        let exam = self
            .within("loading exam", self.repo.load_exam(&ctx.exam_name))
            .await?;
        let (final_marks, subjects) = marking::evaluate(&tallies, &exam)?;

        let row = NewResultRow {
            name: name.to_string(),
            roll: roll.to_string(),
            category: ctx.category.clone(),
            gender: ctx.gender.clone(),
            state: ctx.state.clone(),
            final_marks,
            subjects,
        };

        let population = self.record(&exam, &shift_id, &row).await?;

        tracing::info!(
            exam = %exam.name,
            roll = %row.roll,
            shift = %shift_id,
            final_marks,
            population,
            "Evaluation saved"
        );

        Ok(EvaluationOutcome {
            final_marks,
            shift_id,
            candidate: details,
            subjects: row.subjects,
        })
    }

    async fn record(
        &self,
        exam: &ExamConfig,
        shift_id: &str,
        row: &NewResultRow,
    ) -> Result<usize, AppError> {
        let _guard = self
            .within("waiting for shift lock", async {
                Ok(self.locks.acquire(&exam.key(), shift_id).await)
            })
            .await?;

        let shift = ShiftHandle {
            exam_key: exam.key(),
            shift_id: shift_id.to_string(),
        };
        let written = self
            .within("recording result", async {
                self.repo.ensure_shift(exam, shift_id).await?;
                self.repo.upsert_row(&shift, row).await
            })
            .await;

        // A write cut off by the deadline may still have landed, so the
        // shift is re-ranked before the lock is released in every case.
        let ranked = rank::recompute_shift_ranks(self.repo.as_ref(), &shift).await;
        match (written, ranked) {
            (Ok(()), ranked) => ranked,
            (Err(err), Ok(_)) => Err(err),
            (Err(err), Err(rank_err)) => {
                tracing::warn!(shift = %shift_id, "Re-rank after failed write also failed: {}", rank_err);
                Err(err)
            }
        }
    }

    /// Looks a candidate up by roll number within an exam.
    pub async fn lookup(&self, exam_name: &str, roll: &str) -> Result<ResultView, AppError> {
        let exam = self.repo.load_exam(exam_name).await?;
        let (shift, row) = self
            .repo
            .find_by_roll(exam_name, roll.trim())
            .await?
            .ok_or_else(|| AppError::NotFound("Candidate not found".to_string()))?;

        let total_candidates = self.repo.read_all_rows(&shift).await?.len();
        Ok(ResultView::new(exam.name, shift.shift_id, row, total_candidates))
    }

    /// The full shift table, best rank first.
    pub async fn leaderboard(
        &self,
        exam_name: &str,
        shift_id: &str,
    ) -> Result<LeaderboardView, AppError> {
        let exam = self.repo.load_exam(exam_name).await?;
        let shift = ShiftHandle {
            exam_key: exam.key(),
            shift_id: shift_id.to_string(),
        };

        let columns = self.repo.shift_columns(&shift).await?;
        let mut rows = self.repo.read_all_rows(&shift).await?;
        rows.sort_by_key(|r| (r.rank.unwrap_or(i64::MAX), r.id));

        Ok(LeaderboardView {
            exam: exam.name,
            shift_id: shift.shift_id,
            rows: rows.iter().map(|r| r.cells(&columns)).collect(),
            columns,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::models::exam::{MarkingScheme, SubjectConfig};
    use crate::models::result::ResultRow;
    use crate::repository::MemoryRepository;
    use crate::scoring::fixtures::{Question, SheetBuilder};

    fn exam() -> ExamConfig {
        ExamConfig {
            name: "JEE Mock".to_string(),
            scheme: MarkingScheme {
                correct: 4.0,
                wrong: -1.0,
                na: 0.0,
            },
            subjects: ["Physics", "Chemistry", "Maths"]
                .iter()
                .map(|name| SubjectConfig {
                    name: name.to_string(),
                    max_marks: 120.0,
                    count_in_total: true,
                })
                .collect(),
        }
    }

    fn context() -> EvaluationContext {
        EvaluationContext {
            exam_name: "JEE Mock".to_string(),
            category: "OBC".to_string(),
            gender: "F".to_string(),
            state: "RJ".to_string(),
        }
    }

    fn sheet(roll: &str, tallies: [(u32, u32, u32); 3]) -> String {
        let mut builder = SheetBuilder::new()
            .meta("Roll Number", roll)
            .meta("Candidate Name", &format!("Candidate {}", roll))
            .meta("Exam Date", "13/10/2025")
            .meta("Exam Time", "9:30 AM - 11:00 AM");
        for (label, (c, w, n)) in ["Physics", "Chemistry", "Maths"].iter().zip(tallies) {
            builder = builder.section(label, &Question::tally(c, w, n));
        }
        builder.build()
    }

    async fn pipeline() -> (ScoringPipeline, Arc<MemoryRepository>) {
        let repo = Arc::new(MemoryRepository::new());
        repo.create_exam(&exam()).await.unwrap();
        let pipeline = ScoringPipeline::new(repo.clone(), Duration::from_secs(5));
        (pipeline, repo)
    }

    #[tokio::test]
    async fn test_end_to_end_scoring() {
        let (pipeline, _) = pipeline().await;
        let outcome = pipeline
            .evaluate(&sheet("1001", [(20, 5, 5), (15, 10, 5), (25, 0, 5)]), &context())
            .await
            .unwrap();

        assert_eq!(outcome.final_marks, 225.0);
        assert_eq!(outcome.shift_id, "13-10-2025_9-30AM-11-00AM");
        assert_eq!(outcome.candidate.roll.as_deref(), Some("1001"));
        let marks: Vec<f64> = outcome.subjects.iter().map(|s| s.marks).collect();
        assert_eq!(marks, vec![75.0, 50.0, 100.0]);
    }

    #[tokio::test]
    async fn test_resubmission_overwrites_single_row() {
        let (pipeline, _) = pipeline().await;
        pipeline
            .evaluate(&sheet("1001", [(1, 0, 0), (1, 0, 0), (1, 0, 0)]), &context())
            .await
            .unwrap();
        pipeline
            .evaluate(&sheet("1001", [(2, 0, 0), (2, 0, 0), (2, 0, 0)]), &context())
            .await
            .unwrap();

        let board = pipeline
            .leaderboard("JEE Mock", "13-10-2025_9-30AM-11-00AM")
            .await
            .unwrap();
        assert_eq!(board.rows.len(), 1);

        let view = pipeline.lookup("JEE Mock", "1001").await.unwrap();
        assert_eq!(view.final_marks, 24.0);
        assert_eq!(view.rank, Some(1));
        assert_eq!(view.total_candidates, 1);
    }

    #[tokio::test]
    async fn test_ranks_follow_every_write() {
        let (pipeline, _) = pipeline().await;
        let sheets = [
            ("A", [(20, 5, 5), (15, 10, 5), (25, 0, 5)]), // 225
            ("B", [(20, 5, 5), (15, 10, 5), (25, 0, 5)]), // 225
            ("C", [(20, 0, 0), (10, 0, 0), (20, 0, 0)]),  // 200
            ("D", [(10, 0, 0), (10, 0, 0), (20, 10, 0)]), // 150
        ];
        for (roll, tallies) in sheets {
            pipeline.evaluate(&sheet(roll, tallies), &context()).await.unwrap();
        }

        let mut ranks = Vec::new();
        for roll in ["A", "B", "C", "D"] {
            ranks.push(pipeline.lookup("JEE Mock", roll).await.unwrap().rank);
        }
        assert_eq!(ranks, vec![Some(1), Some(1), Some(3), Some(4)]);

        let board = pipeline
            .leaderboard("JEE Mock", "13-10-2025_9-30AM-11-00AM")
            .await
            .unwrap();
        assert_eq!(board.columns.last().map(String::as_str), Some("Rank"));
        assert_eq!(board.rows[3][1], serde_json::json!("D"));
    }

    #[tokio::test]
    async fn test_missing_roll_never_reaches_repository() {
        let (pipeline, repo) = pipeline().await;
        let markup = SheetBuilder::new()
            .meta("Candidate Name", "No Roll")
            .meta("Exam Date", "13/10/2025")
            .meta("Exam Time", "9:30 AM - 11:00 AM")
            .build();

        let err = pipeline.evaluate(&markup, &context()).await.unwrap_err();
        assert!(matches!(err, AppError::Extraction(_)));
        assert!(repo.list_shifts("JEE Mock").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_time_is_shift_error() {
        let (pipeline, _) = pipeline().await;
        let markup = SheetBuilder::new()
            .meta("Roll Number", "9")
            .meta("Candidate Name", "No Time")
            .meta("Exam Date", "13/10/2025")
            .build();

        match pipeline.evaluate(&markup, &context()).await {
            Err(AppError::Extraction(msg)) => assert!(msg.contains("shift not determinable")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_venue_still_evaluates() {
        let (pipeline, _) = pipeline().await;
        let outcome = pipeline
            .evaluate(&sheet("77", [(1, 1, 1), (1, 1, 1), (1, 1, 1)]), &context())
            .await
            .unwrap();
        assert_eq!(outcome.candidate.venue, None);
        assert_eq!(outcome.final_marks, 9.0);
    }

    #[tokio::test]
    async fn test_unknown_exam_and_section_mismatch() {
        let (pipeline, repo) = pipeline().await;
        let mut ctx = context();
        ctx.exam_name = "Nope".to_string();
        let err = pipeline
            .evaluate(&sheet("1", [(1, 0, 0), (1, 0, 0), (1, 0, 0)]), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let two_sections = SheetBuilder::new()
            .meta("Roll Number", "2")
            .meta("Candidate Name", "Two")
            .meta("Exam Date", "13/10/2025")
            .meta("Exam Time", "9:30 AM - 11:00 AM")
            .section("Physics", &Question::tally(1, 0, 0))
            .section("Chemistry", &Question::tally(1, 0, 0))
            .build();
        let err = pipeline.evaluate(&two_sections, &context()).await.unwrap_err();
        assert!(matches!(err, AppError::SchemaMismatch { sections: 2, subjects: 3 }));
        assert!(repo.list_shifts("JEE Mock").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_evaluations_in_one_shift() {
        let (pipeline, _) = pipeline().await;
        let mut handles = Vec::new();
        for i in 0..16u32 {
            let pipeline = pipeline.clone();
            handles.push(tokio::spawn(async move {
                let markup = sheet(&format!("R{}", i), [(i % 4, 0, 0), (0, 0, 0), (0, 0, 0)]);
                pipeline.evaluate(&markup, &context()).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let board = pipeline
            .leaderboard("JEE Mock", "13-10-2025_9-30AM-11-00AM")
            .await
            .unwrap();
        assert_eq!(board.rows.len(), 16);
        let rank_at = board.columns.iter().position(|c| c == "Rank").unwrap();
        let ranks: Vec<i64> = board
            .rows
            .iter()
            .map(|r| r[rank_at].as_i64().unwrap())
            .collect();
        assert_eq!(ranks, [vec![1; 4], vec![5; 4], vec![9; 4], vec![13; 4]].concat());
    }

    #[tokio::test]
    async fn test_repeat_evaluation_is_stable() {
        let (pipeline, _) = pipeline().await;
        let markup = sheet("5", [(3, 2, 1), (4, 0, 2), (0, 6, 0)]);
        let first = pipeline.evaluate(&markup, &context()).await.unwrap();
        let second = pipeline.evaluate(&markup, &context()).await.unwrap();
        assert_eq!(first.final_marks, second.final_marks);
        assert_eq!(first.subjects, second.subjects);
    }

    /// In-memory store that stalls after upserts and before reads.
    #[derive(Default)]
    struct SlowRepository {
        inner: MemoryRepository,
        upsert_delay: Duration,
        read_delay: Duration,
    }

    #[async_trait]
    impl ResultRepository for SlowRepository {
        async fn create_exam(&self, exam: &ExamConfig) -> Result<(), AppError> {
            self.inner.create_exam(exam).await
        }

        async fn list_exams(&self) -> Result<Vec<ExamConfig>, AppError> {
            self.inner.list_exams().await
        }

        async fn load_exam(&self, exam_name: &str) -> Result<ExamConfig, AppError> {
            self.inner.load_exam(exam_name).await
        }

        async fn delete_exam(&self, exam_name: &str) -> Result<(), AppError> {
            self.inner.delete_exam(exam_name).await
        }

        async fn ensure_shift(
            &self,
            exam: &ExamConfig,
            shift_id: &str,
        ) -> Result<ShiftHandle, AppError> {
            self.inner.ensure_shift(exam, shift_id).await
        }

        async fn upsert_row(&self, shift: &ShiftHandle, row: &NewResultRow) -> Result<(), AppError> {
            self.inner.upsert_row(shift, row).await?;
            tokio::time::sleep(self.upsert_delay).await;
            Ok(())
        }

        async fn read_all_rows(&self, shift: &ShiftHandle) -> Result<Vec<ResultRow>, AppError> {
            tokio::time::sleep(self.read_delay).await;
            self.inner.read_all_rows(shift).await
        }

        async fn write_rank(
            &self,
            shift: &ShiftHandle,
            row_id: i64,
            rank: i64,
        ) -> Result<(), AppError> {
            self.inner.write_rank(shift, row_id, rank).await
        }

        async fn shift_columns(&self, shift: &ShiftHandle) -> Result<Vec<String>, AppError> {
            self.inner.shift_columns(shift).await
        }

        async fn list_shifts(&self, exam_name: &str) -> Result<Vec<String>, AppError> {
            self.inner.list_shifts(exam_name).await
        }

        async fn find_by_roll(
            &self,
            exam_name: &str,
            roll: &str,
        ) -> Result<Option<(ShiftHandle, ResultRow)>, AppError> {
            self.inner.find_by_roll(exam_name, roll).await
        }
    }

    async fn slow_pipeline(repo: SlowRepository) -> (ScoringPipeline, Arc<SlowRepository>) {
        let repo = Arc::new(repo);
        repo.create_exam(&exam()).await.unwrap();
        let pipeline = ScoringPipeline::new(repo.clone(), Duration::from_millis(50));
        (pipeline, repo)
    }

    #[tokio::test]
    async fn test_deadline_after_write_still_ranks_shift() {
        let (pipeline, repo) = slow_pipeline(SlowRepository {
            upsert_delay: Duration::from_millis(200),
            ..SlowRepository::default()
        })
        .await;

        let err = pipeline
            .evaluate(&sheet("1", [(10, 0, 0), (0, 0, 0), (0, 0, 0)]), &context())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Repository(_)));
        assert_eq!(err.kind(), "repository");

        let err = pipeline
            .evaluate(&sheet("2", [(20, 0, 0), (0, 0, 0), (0, 0, 0)]), &context())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Repository(_)));

        // Both writes landed; neither row is left unranked.
        let (_, first) = repo.find_by_roll("JEE Mock", "1").await.unwrap().unwrap();
        let (_, second) = repo.find_by_roll("JEE Mock", "2").await.unwrap().unwrap();
        assert_eq!(second.rank, Some(1));
        assert_eq!(first.rank, Some(2));
    }

    #[tokio::test]
    async fn test_slow_rank_pass_is_not_cut_off() {
        let (pipeline, repo) = slow_pipeline(SlowRepository {
            read_delay: Duration::from_millis(200),
            ..SlowRepository::default()
        })
        .await;

        let outcome = pipeline
            .evaluate(&sheet("1", [(1, 0, 0), (0, 0, 0), (0, 0, 0)]), &context())
            .await
            .unwrap();
        assert_eq!(outcome.final_marks, 4.0);

        let (_, row) = repo.find_by_roll("JEE Mock", "1").await.unwrap().unwrap();
        assert_eq!(row.rank, Some(1));
    }
}
