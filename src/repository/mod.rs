// src/repository/mod.rs

//! Durable storage for exams and their per-shift result tables.
//!
//! The scoring pipeline only talks to [`ResultRepository`]; the in-memory
//! and Postgres backends are interchangeable behind it.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::{
    error::AppError,
    models::{
        exam::ExamConfig,
        result::{NewResultRow, ResultRow, ShiftHandle},
    },
};

pub use memory::MemoryRepository;
pub use postgres::PgRepository;

#[async_trait]
pub trait ResultRepository: Send + Sync {
    /// Stores a new exam. `Conflict` if an exam with the same key exists.
    async fn create_exam(&self, exam: &ExamConfig) -> Result<(), AppError>;

    async fn list_exams(&self) -> Result<Vec<ExamConfig>, AppError>;

    /// `NotFound` if the exam does not exist.
    async fn load_exam(&self, exam_name: &str) -> Result<ExamConfig, AppError>;

    /// Removes an exam together with all of its shifts.
    async fn delete_exam(&self, exam_name: &str) -> Result<(), AppError>;

    /// Creates the shift table from the exam's column template if absent.
    /// Calling it again for an existing shift is a no-op.
    async fn ensure_shift(&self, exam: &ExamConfig, shift_id: &str)
    -> Result<ShiftHandle, AppError>;

    /// Inserts a row, or overwrites the row with the same roll. `rank` is left alone.
    async fn upsert_row(&self, shift: &ShiftHandle, row: &NewResultRow) -> Result<(), AppError>;

    async fn read_all_rows(&self, shift: &ShiftHandle) -> Result<Vec<ResultRow>, AppError>;

    async fn write_rank(&self, shift: &ShiftHandle, row_id: i64, rank: i64)
    -> Result<(), AppError>;

    async fn write_ranks(&self, shift: &ShiftHandle, ranks: &[(i64, i64)]) -> Result<(), AppError> {
        for &(row_id, rank) in ranks {
            self.write_rank(shift, row_id, rank).await?;
        }
        Ok(())
    }

    /// Header of the shift table: the exam template, plus `Rank` once ranked.
    async fn shift_columns(&self, shift: &ShiftHandle) -> Result<Vec<String>, AppError>;

    async fn list_shifts(&self, exam_name: &str) -> Result<Vec<String>, AppError>;

    /// Most recently written row for `roll` anywhere in the exam.
    async fn find_by_roll(
        &self,
        exam_name: &str,
        roll: &str,
    ) -> Result<Option<(ShiftHandle, ResultRow)>, AppError>;
}
