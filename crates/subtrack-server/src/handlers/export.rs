//! Export and import handlers

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, Response, StatusCode},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;

use crate::{audit, AppError, AppState, AuthUser};
use subtrack_core::{export, ImportMode, ImportOptions, ImportOutcome};

/// GET /api/export - Download all of the caller's subscriptions
pub async fn export_subscriptions(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Response<Body>, AppError> {
    let doc = export::export_subscriptions(state.repo.as_ref(), user.id(), Utc::now())?;
    let body = serde_json::to_vec_pretty(&doc)?;

    audit(
        user.id(),
        "export",
        None,
        Some(&format!("count={}", doc.subscriptions.len())),
    );

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/json")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", doc.file_name()),
        )
        .body(Body::from(body))?;

    Ok(response)
}

/// Request body for import
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    /// The export document, as JSON text or already parsed
    pub json_data: Option<Value>,
    /// Absent or `null` means merge
    #[serde(default)]
    pub options: Option<ImportOptions>,
}

/// POST /api/import - Merge or replace from an export document
///
/// Per-record problems come back in `errors` with a 200; only an unusable
/// document fails the request.
pub async fn import_subscriptions(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<ImportRequest>,
) -> Result<Json<ImportOutcome>, AppError> {
    let mode = ImportMode::from(req.options.unwrap_or_default());
    let repo = state.repo.as_ref();

    let outcome = match req.json_data {
        None | Some(Value::Null) => return Err(AppError::bad_request("No data provided")),
        Some(Value::String(text)) => export::import_json(repo, user.id(), &text, mode)?,
        Some(doc) => export::import_subscriptions(repo, user.id(), doc, mode)?,
    };

    audit(
        user.id(),
        "import",
        None,
        Some(&format!(
            "mode={:?}, imported={}, errors={}",
            mode,
            outcome.imported,
            outcome.errors.len()
        )),
    );

    Ok(Json(outcome))
}
