//! Memo generation endpoint.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::{Extension, Json};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, RequestId};
use crate::models::{MemoDocument, RequestProfile};

/// `POST /generate_memo`: build the memo for one request profile.
///
/// Always answers 200 once the body parses; failed sections are reported
/// inside the memo as error markers.
pub async fn generate(
    State(ctx): State<ApiContext>,
    request_id: Option<Extension<RequestId>>,
    body: Result<Json<RequestProfile>, JsonRejection>,
) -> Result<Json<MemoDocument>, ApiError> {
    let Json(profile) = body.map_err(|rejection| {
        tracing::warn!(reason = %rejection.body_text(), "Rejected memo request body");
        ApiError::from(rejection)
    })?;

    let request_id = request_id.map(|Extension(RequestId(id))| id).unwrap_or_default();
    tracing::info!(
        request_id = %request_id,
        jurisdiction = profile.jurisdiction().unwrap_or("-"),
        tax_topics = profile.tax_topics.len(),
        legal_topics = profile.legal_topics.len(),
        "Memo requested"
    );

    let memo = ctx.orchestrator.run_concurrent(Arc::new(profile)).await;
    Ok(Json(memo))
}
