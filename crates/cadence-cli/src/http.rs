//! Admin HTTP trigger for on-demand backfill runs.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use cadence_core::backfill::{BackfillEngine, BackfillResult};
use cadence_core::repository::SqliteRepository;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

pub type SharedEngine = Arc<BackfillEngine<SqliteRepository>>;

#[derive(Debug, Deserialize)]
pub struct BackfillParams {
    #[serde(default)]
    pub dry_run: bool,
}

/// JSON envelope returned by the admin trigger and the one-shot command.
#[derive(Debug, Serialize)]
pub struct BackfillResponse {
    pub success: bool,
    #[serde(flatten)]
    pub result: BackfillResult,
}

pub fn router(engine: SharedEngine) -> Router {
    Router::new()
        .route("/admin/recurring/backfill", post(trigger_backfill))
        .with_state(engine)
}

async fn trigger_backfill(
    State(engine): State<SharedEngine>,
    Query(params): Query<BackfillParams>,
) -> Result<Json<BackfillResponse>, (StatusCode, String)> {
    match engine.run_backfill(params.dry_run).await {
        Ok(result) => Ok(Json(BackfillResponse { success: true, result })),
        Err(err) => {
            error!("admin backfill failed: {err}");
            Err((StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))
        }
    }
}

/// Bind and serve the admin router until the process exits.
pub async fn serve(engine: SharedEngine, listen_addr: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    info!("admin trigger listening on {}", listener.local_addr()?);
    axum::serve(listener, router(engine)).await?;
    Ok(())
}
