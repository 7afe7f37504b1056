// src/handlers/mod.rs

pub mod admin;
pub mod evaluate;
pub mod result;

use axum::{Json, extract::rejection::JsonRejection};
use validator::Validate;

use crate::error::AppError;

/// Unwraps a JSON body and runs its `validator` rules.
/// Malformed bodies and rule violations both surface as `Validation`.
pub(crate) fn validated<T: Validate>(
    payload: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let Json(payload) = payload.map_err(|rejection| AppError::Validation(rejection.body_text()))?;
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::Validation(validation_errors.to_string()));
    }
    Ok(payload)
}

pub async fn home() -> &'static str {
    "Backend running"
}
