use axum::{extract::State, Json};
use serde::Serialize;

use service::registration::domain::RegisterInput;

use super::ServerState;
use crate::errors::JsonApiError;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterOutput {
    pub message: &'static str,
    pub payment_id: String,
    pub redirect_url: String,
}

/// Stage a reseller registration and hand back the gateway checkout.
#[utoipa::path(
    post,
    path = "/auth/reseller/register",
    tag = "registration",
    request_body = crate::openapi::RegisterRequest,
    responses(
        (status = 200, description = "Registration initiated", body = crate::openapi::RegisterResponse),
        (status = 400, description = "Bad Request"),
        (status = 409, description = "Email already registered"),
        (status = 502, description = "Payment gateway unavailable")
    )
)]
pub async fn register(
    State(state): State<ServerState>,
    Json(input): Json<RegisterInput>,
) -> Result<Json<RegisterOutput>, JsonApiError> {
    let ticket = state.registration.initiate_registration(input).await?;
    Ok(Json(RegisterOutput {
        message: "Registration initiated",
        payment_id: ticket.payment_id,
        redirect_url: ticket.redirect_url,
    }))
}
