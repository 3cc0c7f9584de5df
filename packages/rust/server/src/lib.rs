//! HTTP surface for docsets.
//!
//! Routes:
//! - `GET /api/docs.json`: the JSON export, gated by the export policy
//! - `GET /llms.txt`, `/llms-full.txt`, `/llms-small.txt`
//! - `GET /_llms-txt/:file` for per-set files (`<slug>.txt`)

mod error;
mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, middleware as axum_mw, routing::get};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use docsets_content::DocumentSource;
use docsets_core::Site;
use docsets_shared::Result;

pub use error::AppError;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub site: Arc<Site>,
    pub source: Arc<dyn DocumentSource>,
}

impl AppState {
    pub fn new(site: Site, source: Arc<dyn DocumentSource>) -> Self {
        Self {
            site: Arc::new(site),
            source,
        }
    }

    /// Read the collection once and validate navigation against it, so
    /// configuration errors stop the server before it binds.
    pub fn preflight(&self) -> Result<usize> {
        let documents = self.source.list_documents()?;
        self.site.navigation(&documents)?;
        Ok(documents.len())
    }
}

/// Build the router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let export = Router::new()
        .route("/api/docs.json", get(handlers::export_docs))
        .route_layer(axum_mw::from_fn_with_state(
            state.clone(),
            handlers::require_export_secret,
        ));

    let manifests = Router::new()
        .route("/llms.txt", get(handlers::llms_txt))
        .route("/llms-full.txt", get(handlers::llms_full))
        .route("/llms-small.txt", get(handlers::llms_small))
        .route("/_llms-txt/:file", get(handlers::llms_set));

    export
        .merge(manifests)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until the process is stopped.
#[instrument(skip_all, fields(%addr))]
pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "docsets server listening");
    axum::serve(listener, build_router(state)).await
}
