// src/handlers/evaluate.rs

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    response::IntoResponse,
};

use super::validated;
use crate::{
    error::AppError,
    models::evaluation::{EvaluateRequest, EvaluateUrlRequest, EvaluationOutcome},
    scoring::ScoringPipeline,
    state::AppState,
};

fn saved(outcome: EvaluationOutcome) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "saved",
        "final_marks": outcome.final_marks,
        "shift_id": outcome.shift_id,
        "candidate": outcome.candidate,
    }))
}

/// Evaluates a response sheet whose markup is posted inline.
pub async fn evaluate(
    State(pipeline): State<ScoringPipeline>,
    payload: Result<Json<EvaluateRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let req = validated(payload)?;
    let outcome = pipeline.evaluate(&req.html, &req.context).await?;
    Ok(saved(outcome))
}

/// Fetches the vendor-hosted response sheet, then evaluates it.
pub async fn evaluate_from_url(
    State(state): State<AppState>,
    payload: Result<Json<EvaluateUrlRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let req = validated(payload)?;
    let markup = state.fetcher.fetch(req.url.trim()).await?;
    let outcome = state.pipeline.evaluate(&markup, &req.context).await?;
    Ok(saved(outcome))
}
