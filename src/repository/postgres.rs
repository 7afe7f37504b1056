// src/repository/postgres.rs

use std::time::Duration;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool, postgres::PgPoolOptions, types::Json};

use super::ResultRepository;
use crate::{
    error::AppError,
    models::{
        exam::{ExamConfig, MarkingScheme, RANK_COLUMN, SubjectConfig, exam_key},
        result::{NewResultRow, ResultRow, ShiftHandle, SubjectResult},
    },
};

const CONNECT_ATTEMPTS: u32 = 5;

/// Postgres-backed repository. Schema lives in `migrations/`.
#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

/// Helper struct for reading exam configuration rows.
#[derive(FromRow)]
struct ExamRecord {
    name: String,
    correct: f64,
    wrong: f64,
    na: f64,
    subjects: Json<Vec<SubjectConfig>>,
}

impl From<ExamRecord> for ExamConfig {
    fn from(record: ExamRecord) -> Self {
        ExamConfig {
            name: record.name,
            scheme: MarkingScheme {
                correct: record.correct,
                wrong: record.wrong,
                na: record.na,
            },
            subjects: record.subjects.0,
        }
    }
}

#[derive(FromRow)]
struct ResultRecord {
    id: i64,
    name: String,
    roll: String,
    category: String,
    gender: String,
    state: String,
    final_marks: f64,
    subjects: Json<Vec<SubjectResult>>,
    rank: Option<i64>,
}

impl From<ResultRecord> for ResultRow {
    fn from(record: ResultRecord) -> Self {
        ResultRow {
            id: record.id,
            name: record.name,
            roll: record.roll,
            category: record.category,
            gender: record.gender,
            state: record.state,
            final_marks: record.final_marks,
            subjects: record.subjects.0,
            rank: record.rank,
        }
    }
}

#[derive(FromRow)]
struct LocatedResult {
    shift_id: String,
    #[sqlx(flatten)]
    result: ResultRecord,
}

fn exam_not_found(exam_name: &str) -> AppError {
    AppError::NotFound(format!("exam '{}' not found", exam_name))
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects with retry and applies pending migrations.
    pub async fn connect(database_url: &str) -> Result<Self, AppError> {
        let mut retry_count = 0;
        let pool = loop {
            match PgPoolOptions::new()
                .max_connections(5)
                .acquire_timeout(Duration::from_secs(3))
                .connect(database_url)
                .await
            {
                Ok(pool) => break pool,
                Err(e) => {
                    retry_count += 1;
                    if retry_count >= CONNECT_ATTEMPTS {
                        return Err(AppError::Repository(format!(
                            "failed to connect to database after {} attempts: {}",
                            CONNECT_ATTEMPTS, e
                        )));
                    }
                    tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            }
        };

        tracing::info!("Database connected, running migrations...");
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Migrations applied successfully.");

        Ok(Self::new(pool))
    }

    async fn exam_exists(&self, key: &str) -> Result<bool, AppError> {
        let found: Option<(String,)> = sqlx::query_as("SELECT exam_key FROM exams WHERE exam_key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }
}

#[async_trait]
impl ResultRepository for PgRepository {
    async fn create_exam(&self, exam: &ExamConfig) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO exams (exam_key, name, correct, wrong, na, subjects)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (exam_key) DO NOTHING
            "#,
        )
        .bind(exam.key())
        .bind(&exam.name)
        .bind(exam.scheme.correct)
        .bind(exam.scheme.wrong)
        .bind(exam.scheme.na)
        .bind(Json(&exam.subjects))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create exam: {:?}", e);
            AppError::from(e)
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict(format!("exam '{}' already exists", exam.name)));
        }
        Ok(())
    }

    async fn list_exams(&self) -> Result<Vec<ExamConfig>, AppError> {
        let records: Vec<ExamRecord> = sqlx::query_as(
            "SELECT name, correct, wrong, na, subjects FROM exams ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(records.into_iter().map(ExamConfig::from).collect())
    }

    async fn load_exam(&self, exam_name: &str) -> Result<ExamConfig, AppError> {
        let record: Option<ExamRecord> = sqlx::query_as(
            "SELECT name, correct, wrong, na, subjects FROM exams WHERE exam_key = $1",
        )
        .bind(exam_key(exam_name))
        .fetch_optional(&self.pool)
        .await?;

        record.map(ExamConfig::from).ok_or_else(|| exam_not_found(exam_name))
    }

    async fn delete_exam(&self, exam_name: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM exams WHERE exam_key = $1")
            .bind(exam_key(exam_name))
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(exam_not_found(exam_name));
        }
        Ok(())
    }

    async fn ensure_shift(
        &self,
        exam: &ExamConfig,
        shift_id: &str,
    ) -> Result<ShiftHandle, AppError> {
        let key = exam.key();
        sqlx::query(
            r#"
            INSERT INTO shifts (exam_key, shift_id, columns)
            VALUES ($1, $2, $3)
            ON CONFLICT (exam_key, shift_id) DO NOTHING
            "#,
        )
        .bind(&key)
        .bind(shift_id)
        .bind(Json(exam.column_template()))
        .execute(&self.pool)
        .await?;

        Ok(ShiftHandle {
            exam_key: key,
            shift_id: shift_id.to_string(),
        })
    }

    async fn upsert_row(&self, shift: &ShiftHandle, row: &NewResultRow) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO shift_results
                (exam_key, shift_id, roll, name, category, gender, state, final_marks, subjects)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (exam_key, shift_id, roll) DO UPDATE SET
                name = EXCLUDED.name,
                category = EXCLUDED.category,
                gender = EXCLUDED.gender,
                state = EXCLUDED.state,
                final_marks = EXCLUDED.final_marks,
                subjects = EXCLUDED.subjects,
                updated_at = NOW()
            "#,
        )
        .bind(&shift.exam_key)
        .bind(&shift.shift_id)
        .bind(&row.roll)
        .bind(&row.name)
        .bind(&row.category)
        .bind(&row.gender)
        .bind(&row.state)
        .bind(row.final_marks)
        .bind(Json(&row.subjects))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to upsert shift row: {:?}", e);
            AppError::from(e)
        })?;
        Ok(())
    }

    async fn read_all_rows(&self, shift: &ShiftHandle) -> Result<Vec<ResultRow>, AppError> {
        let records: Vec<ResultRecord> = sqlx::query_as(
            r#"
            SELECT id, name, roll, category, gender, state, final_marks, subjects, rank
            FROM shift_results
            WHERE exam_key = $1 AND shift_id = $2
            ORDER BY id
            "#,
        )
        .bind(&shift.exam_key)
        .bind(&shift.shift_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(records.into_iter().map(ResultRow::from).collect())
    }

    async fn write_rank(&self, shift: &ShiftHandle, row_id: i64, rank: i64) -> Result<(), AppError> {
        self.write_ranks(shift, &[(row_id, rank)]).await
    }

    async fn write_ranks(&self, shift: &ShiftHandle, ranks: &[(i64, i64)]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE shifts SET columns = columns || jsonb_build_array($3::text)
            WHERE exam_key = $1 AND shift_id = $2 AND NOT (columns ? $3)
            "#,
        )
        .bind(&shift.exam_key)
        .bind(&shift.shift_id)
        .bind(RANK_COLUMN)
        .execute(&mut *tx)
        .await?;

        for &(row_id, rank) in ranks {
            sqlx::query(
                "UPDATE shift_results SET rank = $1 WHERE id = $2 AND exam_key = $3 AND shift_id = $4",
            )
            .bind(rank)
            .bind(row_id)
            .bind(&shift.exam_key)
            .bind(&shift.shift_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn shift_columns(&self, shift: &ShiftHandle) -> Result<Vec<String>, AppError> {
        let columns: Option<(Json<Vec<String>>,)> =
            sqlx::query_as("SELECT columns FROM shifts WHERE exam_key = $1 AND shift_id = $2")
                .bind(&shift.exam_key)
                .bind(&shift.shift_id)
                .fetch_optional(&self.pool)
                .await?;

        columns.map(|(c,)| c.0).ok_or_else(|| {
            AppError::NotFound(format!(
                "shift '{}' of exam '{}' not found",
                shift.shift_id, shift.exam_key
            ))
        })
    }

    async fn list_shifts(&self, exam_name: &str) -> Result<Vec<String>, AppError> {
        let key = exam_key(exam_name);
        if !self.exam_exists(&key).await? {
            return Err(exam_not_found(exam_name));
        }

        let shifts: Vec<(String,)> =
            sqlx::query_as("SELECT shift_id FROM shifts WHERE exam_key = $1 ORDER BY shift_id")
                .bind(&key)
                .fetch_all(&self.pool)
                .await?;
        Ok(shifts.into_iter().map(|(id,)| id).collect())
    }

    async fn find_by_roll(
        &self,
        exam_name: &str,
        roll: &str,
    ) -> Result<Option<(ShiftHandle, ResultRow)>, AppError> {
        let key = exam_key(exam_name);
        if !self.exam_exists(&key).await? {
            return Err(exam_not_found(exam_name));
        }

        let located: Option<LocatedResult> = sqlx::query_as(
            r#"
            SELECT shift_id, id, name, roll, category, gender, state, final_marks, subjects, rank
            FROM shift_results
            WHERE exam_key = $1 AND roll = $2
            ORDER BY updated_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(&key)
        .bind(roll)
        .fetch_optional(&self.pool)
        .await?;

        Ok(located.map(|l| {
            (
                ShiftHandle {
                    exam_key: key.clone(),
                    shift_id: l.shift_id,
                },
                ResultRow::from(l.result),
            )
        }))
    }
}
