// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use super::validated;
use crate::{
    error::AppError,
    models::exam::{CreateExamRequest, DeleteExamRequest, ExamConfig, ExamSummary, exam_key},
    scoring::ScoringPipeline,
};

/// Lists every configured exam with its marking scheme.
pub async fn list_exams(
    State(pipeline): State<ScoringPipeline>,
) -> Result<impl IntoResponse, AppError> {
    let exams = pipeline.repository().list_exams().await?;
    let summaries: Vec<ExamSummary> = exams.into_iter().map(ExamSummary::from).collect();
    Ok(Json(summaries))
}

/// Creates an exam: marking scheme plus ordered subject list.
pub async fn create_exam(
    State(pipeline): State<ScoringPipeline>,
    payload: Result<Json<CreateExamRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let payload = validated(payload)?;
    if exam_key(&payload.exam_name).is_empty() {
        return Err(AppError::Validation("exam_name required".to_string()));
    }

    let exam = ExamConfig::from(payload);
    pipeline.repository().create_exam(&exam).await?;
    tracing::info!(exam = %exam.name, subjects = exam.subjects.len(), "Exam created");

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({"status": "success", "exam": exam.name})),
    ))
}

/// Deletes an exam and every shift recorded under it.
pub async fn delete_exam(
    State(pipeline): State<ScoringPipeline>,
    payload: Result<Json<DeleteExamRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let payload = validated(payload)?;
    pipeline.repository().delete_exam(&payload.exam_name).await?;
    tracing::info!(exam = %payload.exam_name, "Exam deleted");

    Ok(Json(serde_json::json!({"status": "deleted"})))
}

#[derive(Debug, Deserialize)]
pub struct ShiftListParams {
    pub exam: Option<String>,
}

/// Lists the shift ids recorded for an exam.
pub async fn list_shifts(
    State(pipeline): State<ScoringPipeline>,
    Query(params): Query<ShiftListParams>,
) -> Result<impl IntoResponse, AppError> {
    let exam = params
        .exam
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Missing exam".to_string()))?;

    let shifts = pipeline.repository().list_shifts(&exam).await?;
    Ok(Json(serde_json::json!({"exam": exam, "shifts": shifts})))
}
