use utoipa::OpenApi;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(ToSchema)]
pub struct HealthResponse { pub status: String }

#[derive(ToSchema)]
#[schema(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub business_name: String,
    /// Optional custom hostname for the store.
    pub domain: Option<String>,
}

#[derive(ToSchema)]
#[schema(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub message: String,
    pub payment_id: String,
    /// Hosted checkout the client must visit.
    pub redirect_url: String,
}

#[derive(ToSchema)]
#[schema(rename_all = "camelCase")]
pub struct VerifyRequest { pub payment_id: String }

/// `status` is one of `pending`, `completed`, `failed`, `cancelled`.
#[derive(ToSchema)]
#[schema(rename_all = "camelCase")]
pub struct PaymentStatusResponse {
    pub payment_id: String,
    pub status: String,
    pub redirect_url: Option<String>,
    pub hosted_url: Option<String>,
}

/// `outcome` is one of `success`, `failure`, `cancel`.
#[derive(ToSchema)]
#[schema(rename_all = "camelCase")]
pub struct CallbackRequest {
    pub payment_id: String,
    pub transaction_id: Option<String>,
    pub outcome: String,
}

#[derive(ToSchema)]
#[schema(rename_all = "camelCase")]
pub struct CallbackResponse {
    pub status: String,
    pub user_id: Option<Uuid>,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::registration::register,
        crate::routes::payments::status,
        crate::routes::payments::verify,
        crate::routes::payments::callback,
    ),
    components(
        schemas(
            HealthResponse,
            RegisterRequest,
            RegisterResponse,
            VerifyRequest,
            PaymentStatusResponse,
            CallbackRequest,
            CallbackResponse,
        )
    ),
    tags(
        (name = "health"),
        (name = "registration"),
        (name = "payments")
    )
)]
pub struct ApiDoc;
