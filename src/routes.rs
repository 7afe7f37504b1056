// src/routes.rs

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{self, admin, evaluate, result},
    state::AppState,
};

/// Inline response sheets carry every question panel of the paper.
const SHEET_BODY_LIMIT: usize = 16 * 1024 * 1024;

/// Assembles the main application router.
///
/// * Admin routes manage exams.
/// * Evaluation routes score response sheets and update shift ranks.
/// * Result routes serve candidate results and shift leaderboards.
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    let admin_routes = Router::new()
        .route("/exams", get(admin::list_exams))
        .route("/create-exam", post(admin::create_exam))
        .route("/delete-exam", post(admin::delete_exam))
        .route("/shifts", get(admin::list_shifts));

    Router::new()
        .route("/", get(handlers::home))
        .route(
            "/evaluate",
            post(evaluate::evaluate).layer(DefaultBodyLimit::max(SHEET_BODY_LIMIT)),
        )
        .route("/evaluate-from-url", post(evaluate::evaluate_from_url))
        .route("/result", get(result::get_result))
        .route("/leaderboard", get(result::get_leaderboard))
        .nest("/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
