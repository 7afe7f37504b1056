// src/repository/memory.rs

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::ResultRepository;
use crate::{
    error::AppError,
    models::{
        exam::{ExamConfig, RANK_COLUMN, exam_key},
        result::{NewResultRow, ResultRow, ShiftHandle},
    },
};

/// Process-local repository. Used when no database is configured and in tests.
#[derive(Default)]
pub struct MemoryRepository {
    exams: RwLock<BTreeMap<String, ExamEntry>>,
    next_row_id: AtomicI64,
    write_seq: AtomicU64,
}

struct ExamEntry {
    config: ExamConfig,
    shifts: BTreeMap<String, ShiftTable>,
}

struct ShiftTable {
    columns: Vec<String>,
    rows: Vec<StoredRow>,
}

struct StoredRow {
    row: ResultRow,
    written: u64,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn exam_not_found(exam_name: &str) -> AppError {
    AppError::NotFound(format!("exam '{}' not found", exam_name))
}

fn shift_not_found(shift: &ShiftHandle) -> AppError {
    AppError::NotFound(format!(
        "shift '{}' of exam '{}' not found",
        shift.shift_id, shift.exam_key
    ))
}

impl ExamEntry {
    fn shift(&self, shift: &ShiftHandle) -> Result<&ShiftTable, AppError> {
        self.shifts.get(&shift.shift_id).ok_or_else(|| shift_not_found(shift))
    }
}

#[async_trait]
impl ResultRepository for MemoryRepository {
    async fn create_exam(&self, exam: &ExamConfig) -> Result<(), AppError> {
        let mut exams = self.exams.write().await;
        let key = exam.key();
        if exams.contains_key(&key) {
            return Err(AppError::Conflict(format!("exam '{}' already exists", exam.name)));
        }
        exams.insert(
            key,
            ExamEntry {
                config: exam.clone(),
                shifts: BTreeMap::new(),
            },
        );
        Ok(())
    }

    async fn list_exams(&self) -> Result<Vec<ExamConfig>, AppError> {
        let exams = self.exams.read().await;
        let mut configs: Vec<ExamConfig> = exams.values().map(|e| e.config.clone()).collect();
        configs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(configs)
    }

    async fn load_exam(&self, exam_name: &str) -> Result<ExamConfig, AppError> {
        let exams = self.exams.read().await;
        exams
            .get(&exam_key(exam_name))
            .map(|e| e.config.clone())
            .ok_or_else(|| exam_not_found(exam_name))
    }

    async fn delete_exam(&self, exam_name: &str) -> Result<(), AppError> {
        let mut exams = self.exams.write().await;
        exams
            .remove(&exam_key(exam_name))
            .map(|_| ())
            .ok_or_else(|| exam_not_found(exam_name))
    }

    async fn ensure_shift(
        &self,
        exam: &ExamConfig,
        shift_id: &str,
    ) -> Result<ShiftHandle, AppError> {
        let mut exams = self.exams.write().await;
        let key = exam.key();
        let entry = exams.get_mut(&key).ok_or_else(|| exam_not_found(&exam.name))?;

        entry
            .shifts
            .entry(shift_id.to_string())
            .or_insert_with(|| ShiftTable {
                columns: entry.config.column_template(),
                rows: Vec::new(),
            });

        Ok(ShiftHandle {
            exam_key: key,
            shift_id: shift_id.to_string(),
        })
    }

    async fn upsert_row(&self, shift: &ShiftHandle, row: &NewResultRow) -> Result<(), AppError> {
        let mut exams = self.exams.write().await;
        let table = exams
            .get_mut(&shift.exam_key)
            .and_then(|e| e.shifts.get_mut(&shift.shift_id))
            .ok_or_else(|| shift_not_found(shift))?;

        let written = self.write_seq.fetch_add(1, Ordering::Relaxed);

        match table.rows.iter_mut().find(|s| s.row.roll == row.roll) {
            Some(stored) => {
                let existing = &mut stored.row;
                existing.name = row.name.clone();
                existing.category = row.category.clone();
                existing.gender = row.gender.clone();
                existing.state = row.state.clone();
                existing.final_marks = row.final_marks;
                existing.subjects = row.subjects.clone();
                stored.written = written;
            }
            None => {
                let id = self.next_row_id.fetch_add(1, Ordering::Relaxed) + 1;
                table.rows.push(StoredRow {
                    row: ResultRow {
                        id,
                        name: row.name.clone(),
                        roll: row.roll.clone(),
                        category: row.category.clone(),
                        gender: row.gender.clone(),
                        state: row.state.clone(),
                        final_marks: row.final_marks,
                        subjects: row.subjects.clone(),
                        rank: None,
                    },
                    written,
                });
            }
        }
        Ok(())
    }

    async fn read_all_rows(&self, shift: &ShiftHandle) -> Result<Vec<ResultRow>, AppError> {
        let exams = self.exams.read().await;
        let entry = exams
            .get(&shift.exam_key)
            .ok_or_else(|| shift_not_found(shift))?;
        Ok(entry.shift(shift)?.rows.iter().map(|s| s.row.clone()).collect())
    }

    async fn write_rank(&self, shift: &ShiftHandle, row_id: i64, rank: i64) -> Result<(), AppError> {
        let mut exams = self.exams.write().await;
        let table = exams
            .get_mut(&shift.exam_key)
            .and_then(|e| e.shifts.get_mut(&shift.shift_id))
            .ok_or_else(|| shift_not_found(shift))?;

        if !table.columns.iter().any(|c| c == RANK_COLUMN) {
            table.columns.push(RANK_COLUMN.to_string());
        }

        let stored = table
            .rows
            .iter_mut()
            .find(|s| s.row.id == row_id)
            .ok_or_else(|| AppError::NotFound(format!("row {} not found", row_id)))?;
        stored.row.rank = Some(rank);
        Ok(())
    }

    async fn shift_columns(&self, shift: &ShiftHandle) -> Result<Vec<String>, AppError> {
        let exams = self.exams.read().await;
        let entry = exams
            .get(&shift.exam_key)
            .ok_or_else(|| shift_not_found(shift))?;
        Ok(entry.shift(shift)?.columns.clone())
    }

    async fn list_shifts(&self, exam_name: &str) -> Result<Vec<String>, AppError> {
        let exams = self.exams.read().await;
        let entry = exams
            .get(&exam_key(exam_name))
            .ok_or_else(|| exam_not_found(exam_name))?;
        Ok(entry.shifts.keys().cloned().collect())
    }

    async fn find_by_roll(
        &self,
        exam_name: &str,
        roll: &str,
    ) -> Result<Option<(ShiftHandle, ResultRow)>, AppError> {
        let exams = self.exams.read().await;
        let key = exam_key(exam_name);
        let entry = exams.get(&key).ok_or_else(|| exam_not_found(exam_name))?;

        let latest = entry
            .shifts
            .iter()
            .flat_map(|(shift_id, table)| table.rows.iter().map(move |s| (shift_id, s)))
            .filter(|(_, s)| s.row.roll == roll)
            .max_by_key(|(_, s)| s.written);

        Ok(latest.map(|(shift_id, stored)| {
            (
                ShiftHandle {
                    exam_key: key.clone(),
                    shift_id: shift_id.clone(),
                },
                stored.row.clone(),
            )
        }))
    }
}
