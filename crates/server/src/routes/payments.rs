use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;

use service::payment::{GatewayOutcome, PaymentStatusView};
use service::registration::domain::OutcomeReport;

use super::ServerState;
use crate::errors::JsonApiError;

pub const SIGNATURE_HEADER: &str = "x-gateway-signature";

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct VerifyInput {
    pub payment_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackInput {
    #[serde(default)]
    pub payment_id: String,
    #[serde(default)]
    pub transaction_id: Option<String>,
    pub outcome: GatewayOutcome,
}

#[utoipa::path(
    get,
    path = "/payments/{payment_id}/status",
    tag = "payments",
    params(("payment_id" = String, Path, description = "Gateway payment id")),
    responses(
        (status = 200, description = "Current status", body = crate::openapi::PaymentStatusResponse),
        (status = 404, description = "Payment not found")
    )
)]
pub async fn status(
    State(state): State<ServerState>,
    Path(payment_id): Path<String>,
) -> Result<Json<PaymentStatusView>, JsonApiError> {
    Ok(Json(state.registration.resolve_status(&payment_id).await?))
}

/// Polling endpoint used by the checkout return page.
#[utoipa::path(
    post,
    path = "/payments/verify",
    tag = "payments",
    request_body = crate::openapi::VerifyRequest,
    responses(
        (status = 200, description = "Current status", body = crate::openapi::PaymentStatusResponse),
        (status = 400, description = "Payment ID is required"),
        (status = 404, description = "Payment not found")
    )
)]
pub async fn verify(
    State(state): State<ServerState>,
    Json(input): Json<VerifyInput>,
) -> Result<Json<PaymentStatusView>, JsonApiError> {
    Ok(Json(state.registration.resolve_status(&input.payment_id).await?))
}

/// Gateway outcome delivery. Internal failures answer 5xx so the gateway retries.
#[utoipa::path(
    post,
    path = "/payments/callback",
    tag = "payments",
    request_body = crate::openapi::CallbackRequest,
    responses(
        (status = 200, description = "Outcome applied", body = crate::openapi::CallbackResponse),
        (status = 401, description = "Bad signature"),
        (status = 404, description = "Payment not found"),
        (status = 409, description = "Payment already settled differently")
    )
)]
pub async fn callback(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Json(input): Json<CallbackInput>,
) -> Result<Json<OutcomeReport>, JsonApiError> {
    if let Some(secret) = &state.callback_secret {
        let presented = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok()).unwrap_or_default();
        if !constant_time_eq(presented, secret) {
            return Err(JsonApiError::new(StatusCode::UNAUTHORIZED, "Unauthorized", None));
        }
    }
    let report = state
        .registration
        .apply_gateway_outcome(&input.payment_id, input.transaction_id.as_deref(), input.outcome)
        .await?;
    Ok(Json(report))
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes().zip(b.bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
