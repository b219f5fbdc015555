//! Transfer handlers

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::error;

use super::super::state::AppState;
use super::super::types::{ApiResponse, TransferStatusData};
use crate::transfer::{TransferReply, handle_request};

/// Execute or stage a transfer
///
/// POST /api/v1/transfer
///
/// The body is read raw: an empty or malformed body is answered with
/// `{"error": "input object is null"}` rather than a parse rejection.
#[utoipa::path(
    post,
    path = "/api/v1/transfer",
    request_body(content = crate::transfer::TransferEnvelope, description = "Transfer envelope {object: {...}}", content_type = "application/json"),
    responses(
        (status = 200, description = "Transfer completed or staged", body = TransferReply),
        (status = 400, description = "Missing object or invalid fields", body = TransferReply),
        (status = 404, description = "Routing reference not registered", body = TransferReply),
        (status = 409, description = "Transfer compensated", body = TransferReply),
        (status = 422, description = "Unsupported bank", body = TransferReply),
        (status = 502, description = "Bank rejected or transfer halted part way", body = TransferReply),
        (status = 503, description = "Ledger unavailable", body = TransferReply),
        (status = 504, description = "Deadline exceeded", body = TransferReply)
    ),
    tag = "Transfer"
)]
pub async fn post_transfer(
    State(state): State<Arc<AppState>>,
    body: String,
) -> (StatusCode, Json<TransferReply>) {
    let (status, reply) = handle_request(&state.coordinator, &body).await;
    (status, Json(reply))
}

/// Current ledger phase of a transfer
///
/// GET /api/v1/transfer/{transfer_id}
///
/// `unsettled` names a phase whose bank leg ended with an unknown outcome;
/// replays of that transfer are refused until it is reconciled.
#[utoipa::path(
    get,
    path = "/api/v1/transfer/{transfer_id}",
    params(
        ("transfer_id" = String, Path, description = "Caller-supplied transfer id")
    ),
    responses(
        (status = 200, description = "Phase found (NONE if never started)", body = TransferStatusData),
        (status = 503, description = "Ledger unavailable")
    ),
    tag = "Transfer"
)]
pub async fn get_transfer(
    State(state): State<Arc<AppState>>,
    Path(transfer_id): Path<String>,
) -> (StatusCode, Json<ApiResponse<TransferStatusData>>) {
    match state.coordinator.phase_of(&transfer_id).await {
        Ok(phase) => {
            let unsettled = state.coordinator.unsettled_leg(&transfer_id);
            let data = TransferStatusData::new(transfer_id, phase).with_unsettled(unsettled);
            (StatusCode::OK, Json(ApiResponse::success(data)))
        }
        Err(e) => {
            error!(transfer_id = %transfer_id, code = e.code(), error = %e, "Phase query failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse::error(503, format!("Ledger unavailable: {}", e))),
            )
        }
    }
}
