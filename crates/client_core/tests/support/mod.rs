//! In-process backend speaking the document service HTTP contract.

use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::json;
use shared::{
    domain::ProjectId,
    protocol::{
        CreateProjectRequest, CredentialsRequest, ExportRequest, FeedbackUpdateRequest,
        GenerateRequest, ProjectRecord, RefineRequest,
    },
};
use tokio::{net::TcpListener, sync::Mutex};

pub const TOKEN: &str = "integration-token";

#[derive(Clone, Default)]
pub struct Backend {
    pub projects: Arc<Mutex<Vec<ProjectRecord>>>,
    pub next_id: Arc<Mutex<i64>>,
    pub fail_refine: Arc<Mutex<bool>>,
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {TOKEN}"))
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"detail": "Could not validate credentials"})),
    )
        .into_response()
}

async fn generate(Json(body): Json<GenerateRequest>) -> Json<serde_json::Value> {
    let content = match body.topic.as_str() {
        "Renewable Energy" => "Solar and wind...".to_string(),
        topic => format!("An introduction to {topic}."),
    };
    Json(json!({ "content": content }))
}

async fn refine(State(backend): State<Backend>, Json(body): Json<RefineRequest>) -> Response {
    if *backend.fail_refine.lock().await {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"detail": "refinement model unavailable"})),
        )
            .into_response();
    }
    let shortened: String = body.content.chars().take(20).collect();
    Json(json!({ "content": format!("{shortened} ({})", body.instruction) })).into_response()
}

async fn export(Path(format): Path<String>, Json(body): Json<ExportRequest>) -> Response {
    if !matches!(format.as_str(), "pdf" | "docx" | "pptx") {
        return StatusCode::NOT_FOUND.into_response();
    }
    let mut bytes = b"PK".to_vec();
    bytes.extend_from_slice(body.content.as_bytes());
    bytes.into_response()
}

async fn list_projects(State(backend): State<Backend>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(backend.projects.lock().await.clone()).into_response()
}

async fn create_project(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Json(body): Json<CreateProjectRequest>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let id = {
        let mut next = backend.next_id.lock().await;
        *next += 1;
        ProjectId(*next * 10)
    };
    backend.projects.lock().await.push(ProjectRecord {
        id,
        title: body.title,
        content: body.content,
        doc_type: body.doc_type,
        is_liked: Some(false),
        is_disliked: Some(false),
        user_notes: None,
    });
    Json(json!({ "message": "Project saved", "project_id": id.0 })).into_response()
}

async fn update_feedback(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<FeedbackUpdateRequest>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut projects = backend.projects.lock().await;
    let Some(project) = projects.iter_mut().find(|p| p.id.0 == id) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    project.is_liked = Some(body.is_liked);
    project.is_disliked = Some(body.is_disliked);
    project.user_notes = Some(body.user_notes);
    Json(json!({ "message": "Feedback updated" })).into_response()
}

async fn delete_project(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    backend.projects.lock().await.retain(|p| p.id.0 != id);
    Json(json!({ "message": "Project deleted" })).into_response()
}

async fn login(Json(body): Json<CredentialsRequest>) -> Response {
    if body.password == "correct horse" {
        Json(json!({ "access_token": TOKEN, "token_type": "bearer" })).into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Invalid credentials"})),
        )
            .into_response()
    }
}

pub async fn spawn_backend() -> Result<(String, Backend)> {
    let backend = Backend::default();
    let app = Router::new()
        .route("/", get(|| async { Json(json!({"message": "ok"})) }))
        .route("/generate", post(generate))
        .route("/refine", post(refine))
        .route("/export/:format", post(export))
        .route("/projects", get(list_projects).post(create_project))
        .route("/projects/:id/feedback", put(update_feedback))
        .route("/projects/:id", delete(delete_project))
        .route("/login", post(login))
        .with_state(backend.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}"), backend))
}
