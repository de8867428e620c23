use crate::config::ServerConfig;
use crate::service::{ApiError, AppState, Upload};
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use landwatch::PipelineConfig;
use serde_json::{Value, json};
use tracing::{error, info};

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(detail = %self, "request failed");
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Json<Value>, ApiError> {
    serde_json::to_value(value)
        .map(Json)
        .map_err(|e| ApiError::Internal(format!("could not serialize response: {e}")))
}

async fn analyze(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let mut reference = None;
    let mut current = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("malformed upload: {e}")))?
    {
        let name = field.name().map(str::to_owned);
        let upload_filename = field.file_name().map(str::to_owned);
        let content_type = field.content_type().map(str::to_owned);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("could not read upload: {e}")))?;
        let upload = Upload {
            filename: upload_filename,
            content_type,
            bytes: bytes.to_vec(),
        };
        match name.as_deref() {
            Some("reference") => reference = Some(upload),
            Some("current") => current = Some(upload),
            _ => {}
        }
    }

    let reference = reference
        .ok_or_else(|| ApiError::BadRequest("missing 'reference' image".to_string()))?;
    let current =
        current.ok_or_else(|| ApiError::BadRequest("missing 'current' image".to_string()))?;

    let record = state.analyze_upload(reference, current).await?;
    to_json(record.as_ref())
}

async fn list_analyses(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "analyses": state.store.list().await }))
}

async fn get_analysis(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let record = state.analysis(&id).await?;
    to_json(record.as_ref())
}

async fn get_visualization(
    State(state): State<AppState>,
    Path((id, kind)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let bytes = state.visualization(&id, &kind).await?;
    Ok(([(header::CONTENT_TYPE, "image/jpeg")], bytes))
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/api/analyze", post(analyze))
        .route("/api/analyses", get(list_analyses))
        .route("/api/analyses/:id", get(get_analysis))
        .route("/api/analyses/:id/images/:kind", get(get_visualization))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

pub async fn start_server(
    cfg: ServerConfig,
    pipeline: PipelineConfig,
) -> anyhow::Result<tokio::task::JoinHandle<()>> {
    let state = AppState::new(&cfg, pipeline);
    let app = router(state, cfg.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    info!(
        addr = %cfg.bind_addr,
        store_capacity = cfg.store_capacity,
        max_upload_bytes = cfg.max_upload_bytes,
        "LandWatch server listening"
    );

    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "server stopped");
        }
    });

    Ok(server)
}
