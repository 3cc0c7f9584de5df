//! Route handlers.
//!
//! Every handler reads a fresh snapshot of the collection on the blocking
//! pool and renders from it; nothing is cached between requests.

use std::sync::Arc;

use axum::extract::{Path, Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::{debug, warn};

use docsets_core::{Site, export};
use docsets_shared::{Document, Result};

use crate::AppState;
use crate::error::AppError;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Gate for `/api/docs.json`: rejects before the source is touched.
pub async fn require_export_secret(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    if !state.site.policy().allows(authorization) {
        warn!(
            has_header = authorization.is_some(),
            "rejected export request"
        );
        return (StatusCode::UNAUTHORIZED, [(header::CONTENT_TYPE, TEXT_PLAIN)], "Unauthorized")
            .into_response();
    }

    next.run(request).await
}

/// GET /api/docs.json
pub async fn export_docs(State(state): State<AppState>) -> std::result::Result<Response, AppError> {
    let bytes = render(&state, |_, docs| export::serialize(docs)).await?;
    Ok(([(header::CONTENT_TYPE, "application/json")], bytes).into_response())
}

/// GET /llms.txt
pub async fn llms_txt(State(state): State<AppState>) -> std::result::Result<Response, AppError> {
    let text = render(&state, |site, docs| Ok(site.render_llms_txt(docs))).await?;
    Ok(plain(text))
}

/// GET /llms-full.txt
pub async fn llms_full(State(state): State<AppState>) -> std::result::Result<Response, AppError> {
    let text = render(&state, |site, docs| Ok(site.render_full(docs))).await?;
    Ok(plain(text))
}

/// GET /llms-small.txt
pub async fn llms_small(State(state): State<AppState>) -> std::result::Result<Response, AppError> {
    let text = render(&state, |site, docs| Ok(site.render_small(docs))).await?;
    Ok(plain(text))
}

/// GET /_llms-txt/:file where `file` is `<slug>.txt`
pub async fn llms_set(
    State(state): State<AppState>,
    Path(file): Path<String>,
) -> std::result::Result<Response, AppError> {
    let Some(slug) = file.strip_suffix(".txt").map(str::to_string) else {
        return Ok(not_found());
    };

    let text = render(&state, move |site, docs| Ok(site.render_set(docs, &slug))).await?;
    Ok(match text {
        Some(text) => plain(text),
        None => not_found(),
    })
}

/// Read the collection and run `f` on the blocking pool.
async fn render<T, F>(state: &AppState, f: F) -> std::result::Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce(&Site, &[Document]) -> Result<T> + Send + 'static,
{
    let site = Arc::clone(&state.site);
    let source = Arc::clone(&state.source);

    let output = tokio::task::spawn_blocking(move || {
        let documents = source.list_documents()?;
        debug!(documents = documents.len(), "snapshot read for request");
        f(&site, &documents)
    })
    .await
    .map_err(|e| AppError::Internal(format!("render task failed: {e}")))??;

    Ok(output)
}

fn plain(text: String) -> Response {
    ([(header::CONTENT_TYPE, TEXT_PLAIN)], text).into_response()
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, [(header::CONTENT_TYPE, TEXT_PLAIN)], "Not Found").into_response()
}
