// src/utils/fetch.rs

use std::time::Duration;

use reqwest::{Client, header};

use crate::error::AppError;

const USER_AGENT: &str = "Mozilla/5.0";

/// Downloads response sheets published by the exam vendor.
#[derive(Clone)]
pub struct ResponseSheetFetcher {
    client: Client,
}

impl ResponseSheetFetcher {
    pub fn new(timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AppError::Internal(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Fetches the page body. Any non-success status is an upstream failure.
    pub async fn fetch(&self, url: &str) -> Result<String, AppError> {
        let response = self
            .client
            .get(url)
            .header(header::ACCEPT, "text/html,application/xhtml+xml")
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(url, "Response sheet request failed: {}", e);
                AppError::from(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(url, %status, "Response sheet fetch returned non-success status");
            return Err(AppError::UpstreamFetch(format!(
                "unable to fetch response sheet (status {})",
                status.as_u16()
            )));
        }

        Ok(response.text().await?)
    }
}
