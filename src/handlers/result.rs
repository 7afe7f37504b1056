// src/handlers/result.rs

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;

use crate::{error::AppError, scoring::ScoringPipeline};

#[derive(Debug, Deserialize)]
pub struct ResultParams {
    pub exam: Option<String>,
    pub roll: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardParams {
    pub exam: Option<String>,
    pub shift: Option<String>,
}

fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// A candidate's result: subject breakdown, rank and shift size.
pub async fn get_result(
    State(pipeline): State<ScoringPipeline>,
    Query(params): Query<ResultParams>,
) -> Result<impl IntoResponse, AppError> {
    let (Some(exam), Some(roll)) = (required(params.exam), required(params.roll)) else {
        return Err(AppError::Validation("Missing exam or roll".to_string()));
    };

    Ok(Json(pipeline.lookup(&exam, &roll).await?))
}

/// The ranked table of one shift.
pub async fn get_leaderboard(
    State(pipeline): State<ScoringPipeline>,
    Query(params): Query<LeaderboardParams>,
) -> Result<impl IntoResponse, AppError> {
    let (Some(exam), Some(shift)) = (required(params.exam), required(params.shift)) else {
        return Err(AppError::Validation("Missing exam or shift".to_string()));
    };

    Ok(Json(pipeline.leaderboard(&exam, &shift).await?))
}
