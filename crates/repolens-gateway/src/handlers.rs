use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use repolens_core::{AnswerResponse, FileDocumentation, UploadReport};
use repolens_index::SourceFile;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::server::AppState;

#[derive(Deserialize)]
pub(crate) struct UploadedFile {
    path: String,
    content: String,
}

#[derive(Deserialize)]
pub(crate) struct UploadRequest {
    #[serde(default)]
    files: Vec<UploadedFile>,
}

#[derive(Deserialize)]
pub(crate) struct QueryRequest {
    repo_id: Option<String>,
    query: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct DocsRequest {
    repo_id: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct DocsResponse {
    repo_id: String,
    files: Vec<FileDocumentation>,
}

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    repositories: usize,
}

fn required(value: Option<String>, message: &str) -> Result<String, GatewayError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| GatewayError::BadRequest(message.to_owned()))
}

pub(crate) async fn upload_handler(
    State(state): State<AppState>,
    Json(payload): Json<UploadRequest>,
) -> Result<Json<UploadReport>, GatewayError> {
    let files: Vec<SourceFile> = payload
        .files
        .into_iter()
        .map(|f| SourceFile::new(f.path, f.content))
        .collect();
    let report = state.service.upload(files).await?;
    Ok(Json(report))
}

pub(crate) async fn query_handler(
    State(state): State<AppState>,
    Json(payload): Json<QueryRequest>,
) -> Result<Json<AnswerResponse>, GatewayError> {
    let query = required(payload.query, "Missing query or repo_id")?;
    let repo_id = required(payload.repo_id, "Missing query or repo_id")?;
    let response = state.service.ask(&repo_id, &query).await?;
    Ok(Json(response))
}

pub(crate) async fn docs_handler(
    State(state): State<AppState>,
    Json(payload): Json<DocsRequest>,
) -> Result<Json<DocsResponse>, GatewayError> {
    let repo_id = required(payload.repo_id, "Missing repo_id")?;
    let files = state.service.generate_docs(&repo_id).await?;
    Ok(Json(DocsResponse { repo_id, files }))
}

pub(crate) async fn delete_handler(
    State(state): State<AppState>,
    Path(repo_id): Path<String>,
) -> Result<StatusCode, GatewayError> {
    state.service.remove(&repo_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: state.started_at.elapsed().as_secs(),
        repositories: state.service.repository_count().await,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_response_serializes() {
        let resp = HealthResponse {
            status: "ok",
            uptime_secs: 42,
            repositories: 3,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"status\":\"ok\""));
        assert!(json.contains("\"repositories\":3"));
    }

    #[test]
    fn query_request_fields_are_optional() {
        let payload: QueryRequest = serde_json::from_str(r#"{"query":"hi"}"#).unwrap();
        assert_eq!(payload.query.as_deref(), Some("hi"));
        assert!(payload.repo_id.is_none());
    }

    #[test]
    fn blank_values_are_missing() {
        assert!(required(Some("  ".into()), "missing").is_err());
        assert!(required(None, "missing").is_err());
        assert_eq!(required(Some("id".into()), "missing").unwrap(), "id");
    }

    #[test]
    fn upload_request_defaults_to_no_files() {
        let payload: UploadRequest = serde_json::from_str("{}").unwrap();
        assert!(payload.files.is_empty());
    }
}
