use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    config::Config,
    error::AppError,
    repository::ResultRepository,
    scoring::ScoringPipeline,
    utils::fetch::ResponseSheetFetcher,
};

#[derive(Clone)]
pub struct AppState {
    pub pipeline: ScoringPipeline,
    pub fetcher: ResponseSheetFetcher,
    pub config: Config,
}

impl AppState {
    pub fn new(repo: Arc<dyn ResultRepository>, config: Config) -> Result<Self, AppError> {
        Ok(Self {
            pipeline: ScoringPipeline::new(repo, config.repository_timeout),
            fetcher: ResponseSheetFetcher::new(config.fetch_timeout)?,
            config,
        })
    }
}

impl FromRef<AppState> for ScoringPipeline {
    fn from_ref(state: &AppState) -> Self {
        state.pipeline.clone()
    }
}
