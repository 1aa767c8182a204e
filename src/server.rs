use crate::pipeline::{self, ConvertedArchive};
use anyhow::Result;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{header, HeaderName, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::path::PathBuf;

const UPLOAD_FIELD: &str = "file";
const CHAPTER_COUNT_HEADER: &str = "x-chapter-count";

#[derive(Clone, Default)]
pub struct AppState {
    /// Where per-request working directories are created
    pub work_root: Option<PathBuf>,
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(ui))
        .route("/health", get(health))
        .route("/convert", post(convert))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

pub async fn serve(bind_addr: SocketAddr, state: AppState, max_upload_bytes: usize) -> Result<()> {
    let app = router(state, max_upload_bytes);

    tracing::info!("UI listening on http://{}", bind_addr);
    axum::serve(tokio::net::TcpListener::bind(bind_addr).await?, app).await?;

    Ok(())
}

async fn ui() -> Html<&'static str> {
    Html(include_str!("ui.html"))
}

async fn health() -> &'static str {
    "ok"
}

async fn convert(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, (StatusCode, String)> {
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (e.status(), e.body_text()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let name = field.file_name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| (e.status(), e.body_text()))?;
        upload = Some((name, data));
        break;
    }

    let (upload_name, data) = upload.ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            format!("Missing `{}` upload field", UPLOAD_FIELD),
        )
    })?;

    tracing::info!(upload = %upload_name, bytes = data.len(), "Converting upload");

    let log_name = upload_name.clone();
    let work_root = state.work_root.clone();
    let result = tokio::task::spawn_blocking(move || {
        pipeline::convert_upload(work_root.as_deref(), &upload_name, &data)
    })
    .await;

    match result {
        Ok(Ok(archive)) => {
            tracing::info!(
                upload = %log_name,
                archive = %archive.file_name,
                chapters = archive.chapter_count,
                "Conversion finished"
            );
            Ok(download_response(archive))
        }
        Ok(Err(err)) => {
            tracing::error!("Failed to convert {}: {:#}", log_name, err);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Conversion failed".to_string(),
            ))
        }
        Err(err) => {
            tracing::error!("Conversion task for {} panicked: {}", log_name, err);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Conversion failed".to_string(),
            ))
        }
    }
}

fn download_response(archive: ConvertedArchive) -> Response {
    (
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                content_disposition(&archive.file_name),
            ),
            (
                HeaderName::from_static(CHAPTER_COUNT_HEADER),
                archive.chapter_count.to_string(),
            ),
        ],
        archive.bytes,
    )
        .into_response()
}

/// ASCII `filename` for old clients plus an RFC 5987 `filename*` with the
/// real name.
fn content_disposition(file_name: &str) -> String {
    let ascii: String = file_name
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii,
        urlencoding::encode(file_name)
    )
}
