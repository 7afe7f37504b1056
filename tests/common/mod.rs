#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{Router, routing::get};
use rankpred::{
    config::Config, create_router, repository::MemoryRepository, state::AppState,
};
use serde_json::{Value, json};
use tokio::net::TcpListener;

const SHEET_TEMPLATE: &str = include_str!("../fixtures/response_sheet.html");

/// Shift id of the fixture sheet (13/10/2025, 9:30 AM - 11:00 AM).
pub const FIXTURE_SHIFT: &str = "13-10-2025_9-30AM-11-00AM";

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn create_exam(&self, body: &Value) -> reqwest::Response {
        self.client
            .post(self.url("/admin/create-exam"))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn evaluate(&self, exam_name: &str, html: &str) -> reqwest::Response {
        self.client
            .post(self.url("/evaluate"))
            .json(&evaluation_body(exam_name, json!({ "html": html })))
            .send()
            .await
            .expect("Failed to execute request")
    }
}

/// Starts the application on a random port, backed by an in-memory repository.
pub async fn spawn_app() -> TestApp {
    let config = Config {
        fetch_timeout: Duration::from_secs(5),
        repository_timeout: Duration::from_secs(5),
        ..Config::default()
    };

    let state = AppState::new(Arc::new(MemoryRepository::new()), config)
        .expect("Failed to build application state");
    let app = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        client: reqwest::Client::new(),
    }
}

/// Serves the fixture sheet at `/sheet/{roll}`; every other path is a 404.
pub async fn spawn_sheet_host() -> String {
    let app = Router::new().route(
        "/sheet/{roll}",
        get(|axum::extract::Path(roll): axum::extract::Path<String>| async move {
            axum::response::Html(sheet(&roll, "Hosted Candidate"))
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://127.0.0.1:{}", port)
}

/// Unique exam name so tests never collide.
pub fn unique_exam() -> String {
    format!("Mock CGL {}", &uuid::Uuid::new_v4().simple().to_string()[..8])
}

/// Two subjects, +2 / -0.5 / 0. English only qualifies, so the fixture
/// sheet totals 1.5 (General Intelligence: 1 right, 1 wrong, 1 skipped).
pub fn exam_body(exam_name: &str) -> Value {
    json!({
        "exam_name": exam_name,
        "correct": 2.0,
        "wrong": -0.5,
        "na": 0.0,
        "subjects": [
            { "name": "General Intelligence", "max_marks": 6.0, "count_in_total": true },
            { "name": "English Comprehension", "max_marks": 4.0, "count_in_total": false }
        ]
    })
}

pub fn evaluation_body(exam_name: &str, extra: Value) -> Value {
    let mut body = json!({
        "exam_name": exam_name,
        "category": "UR",
        "gender": "F",
        "state": "Delhi"
    });
    if let (Some(body), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
        body.extend(extra.clone());
    }
    body
}

pub fn sheet(roll: &str, name: &str) -> String {
    SHEET_TEMPLATE
        .replace("{{ROLL}}", roll)
        .replace("{{NAME}}", name)
}

/// The fixture sheet with its skipped question answered correctly: totals 3.5.
pub fn stronger_sheet(roll: &str, name: &str) -> String {
    sheet(roll, name).replacen(
        r#"<td>Chosen Option :</td><td class="bold">--</td>"#,
        r#"<td>Chosen Option :</td><td class="bold">4</td>"#,
        1,
    )
}
