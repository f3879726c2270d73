//! Operator endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use bluemoon_engine::ReconcileReport;

use crate::auth::AdminAuth;
use crate::error::ApiError;
use crate::state::AppState;

/// Rebuild every derived index from the primary records.
pub async fn reconcile(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
) -> Result<Json<ReconcileReport>, ApiError> {
    tracing::info!(admin_id = %admin.admin_id, "Index reconciliation requested");

    let reconciler = state.engine.reconciler();
    let report = tokio::task::spawn_blocking(move || reconciler.rebuild())
        .await
        .map_err(|e| ApiError::Internal(format!("reconcile task: {e}")))??;

    tracing::info!(
        admin_id = %admin.admin_id,
        clean = report.is_clean(),
        entries_repaired = report.entries_repaired,
        entries_removed = report.entries_removed,
        "Index reconciliation finished"
    );
    Ok(Json(report))
}
