//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use campus_types::{
    ApiKeyId, AppError, AssignRankRequest, AttendanceRequest, BulkAttendanceRequest,
    CancelCheckoutRequest, ConfirmPaymentRequest, CreateOrderRequest, EventId,
    ParticipantCountResponse, PaymentGateway, RegistrationId, RegistrationRepository,
    RegistrationResponse, StudentId, SubeventId,
};

use crate::RegistrationService;

/// Application state shared across handlers.
pub struct AppState<R: RegistrationRepository, G: PaymentGateway> {
    pub service: RegistrationService<R, G>,
}

/// Wrapper to implement IntoResponse for AppError (orphan rule workaround).
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            AppError::Validation(_) | AppError::InvalidSignature => StatusCode::BAD_REQUEST,
            AppError::AlreadyRegistered(_) | AppError::UnpaidRegistration(_) => {
                StatusCode::CONFLICT
            }
            AppError::GatewayUnavailable(_) => StatusCode::BAD_GATEWAY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({
            "error": self.0.to_string(),
            "code": status.as_u16()
        });

        (status, Json(body)).into_response()
    }
}

/// Optional sub-event narrowing for event-scoped queries.
#[derive(Debug, Deserialize)]
pub struct SubeventQuery {
    pub subevent: Option<SubeventId>,
}

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

// ─────────────────────────────────────────────────────────────────────────────
// Checkout
// ─────────────────────────────────────────────────────────────────────────────

/// Create a gateway order for a registration intent.
#[tracing::instrument(skip(state, req), fields(student_id = %req.student_id, event_id = %req.event_id))]
pub async fn create_order<R: RegistrationRepository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let resp = state.service.create_order(req).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

/// Verify a gateway confirmation and commit the registration.
#[tracing::instrument(skip(state, req), fields(order_id = %req.order_id))]
pub async fn confirm_payment<R: RegistrationRepository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    Json(req): Json<ConfirmPaymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let registration = state.service.confirm_payment(req).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegistrationResponse::from(registration)),
    ))
}

/// Record an abandoned checkout.
#[tracing::instrument(skip(state, req), fields(order_id = %req.order_id))]
pub async fn cancel_checkout<R: RegistrationRepository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    Json(req): Json<CancelCheckoutRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.service.cancel_checkout(req).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ─────────────────────────────────────────────────────────────────────────────
// Registration queries
// ─────────────────────────────────────────────────────────────────────────────

/// List a student's registrations.
#[tracing::instrument(skip(state), fields(student_id = %id))]
pub async fn student_registrations<R: RegistrationRepository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let student_id: StudentId = id
        .parse()
        .map_err(|_| AppError::Validation("Invalid student ID".into()))?;

    let regs = state.service.student_registrations(student_id).await?;
    Ok(Json(to_responses(regs)))
}

/// List registrations for an event, optionally narrowed to a sub-event.
#[tracing::instrument(skip(state), fields(event_id = %id))]
pub async fn event_registrations<R: RegistrationRepository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    Path(id): Path<String>,
    Query(query): Query<SubeventQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let event_id: EventId = id
        .parse()
        .map_err(|_| AppError::Validation("Invalid event ID".into()))?;

    let regs = state
        .service
        .event_registrations(event_id, query.subevent)
        .await?;
    Ok(Json(to_responses(regs)))
}

/// Count paid participants for an event or sub-event.
#[tracing::instrument(skip(state), fields(event_id = %id))]
pub async fn participant_count<R: RegistrationRepository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    Path(id): Path<String>,
    Query(query): Query<SubeventQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let event_id: EventId = id
        .parse()
        .map_err(|_| AppError::Validation("Invalid event ID".into()))?;

    let count = state
        .service
        .participant_count(event_id, query.subevent)
        .await?;
    Ok(Json(ParticipantCountResponse { count }))
}

/// Ranked leaderboard for a sub-event.
#[tracing::instrument(skip(state))]
pub async fn leaderboard<R: RegistrationRepository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    Path((event_id, subevent_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let event_id: EventId = event_id
        .parse()
        .map_err(|_| AppError::Validation("Invalid event ID".into()))?;
    let subevent_id: SubeventId = subevent_id
        .parse()
        .map_err(|_| AppError::Validation("Invalid sub-event ID".into()))?;

    let board = state.service.leaderboard(event_id, subevent_id).await?;
    Ok(Json(to_responses(board)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Admin mutations
// ─────────────────────────────────────────────────────────────────────────────

/// Mark attendance on one registration.
#[tracing::instrument(skip(state, req), fields(registration_id = %id))]
pub async fn mark_attendance<R: RegistrationRepository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    Path(id): Path<String>,
    Json(req): Json<AttendanceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id: RegistrationId = id
        .parse()
        .map_err(|_| AppError::Validation("Invalid registration ID".into()))?;

    let reg = state.service.mark_attendance(id, req.present).await?;
    Ok(Json(RegistrationResponse::from(reg)))
}

/// Mark attendance on every paid registration of a sub-event.
#[tracing::instrument(skip(state, req), fields(event_id = %req.event_id, subevent_id = %req.subevent_id))]
pub async fn bulk_attendance<R: RegistrationRepository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    Json(req): Json<BulkAttendanceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let regs = state.service.mark_bulk_attendance(req).await?;
    Ok(Json(to_responses(regs)))
}

/// Assign a competition rank to a registration.
#[tracing::instrument(skip(state, req), fields(registration_id = %id, rank = req.rank))]
pub async fn assign_rank<R: RegistrationRepository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    Path(id): Path<String>,
    Json(req): Json<AssignRankRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id: RegistrationId = id
        .parse()
        .map_err(|_| AppError::Validation("Invalid registration ID".into()))?;

    let reg = state.service.assign_rank(id, req).await?;
    Ok(Json(RegistrationResponse::from(reg)))
}

/// Delete every registration of an event.
#[tracing::instrument(skip(state), fields(event_id = %id))]
pub async fn purge_event<R: RegistrationRepository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let event_id: EventId = id
        .parse()
        .map_err(|_| AppError::Validation("Invalid event ID".into()))?;

    let removed = state.service.purge_event(event_id).await?;
    Ok(Json(serde_json::json!({ "removed": removed })))
}

fn to_responses(regs: Vec<campus_types::Registration>) -> Vec<RegistrationResponse> {
    regs.into_iter().map(RegistrationResponse::from).collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// API Key Management
// ─────────────────────────────────────────────────────────────────────────────

/// Bootstrap endpoint - creates the first API key.
///
/// Only works when NO API keys exist yet. Returns the raw key once.
#[derive(Debug, serde::Deserialize, utoipa::ToSchema)]
pub struct BootstrapRequest {
    /// Name for the API key
    #[schema(example = "fest-admin")]
    pub name: String,
}

#[derive(serde::Serialize, utoipa::ToSchema)]
pub struct BootstrapResponse {
    /// The generated API key (shown only once)
    #[schema(example = "ck_abc123xyz...")]
    pub api_key: String,
    /// Informational message
    pub message: String,
}

#[tracing::instrument(skip(state, req), fields(key_name = %req.name))]
pub async fn bootstrap<R: RegistrationRepository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    Json(req): Json<BootstrapRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let key_count = state
        .service
        .repo()
        .count_api_keys()
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    if key_count > 0 {
        return Err(AppError::Validation(
            "Bootstrap not allowed: API keys already exist. Use an existing key to create new ones.".into()
        ).into());
    }

    let (_api_key, raw_key) = state
        .service
        .repo()
        .create_api_key(&req.name)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok((
        StatusCode::CREATED,
        Json(BootstrapResponse {
            api_key: raw_key,
            message: "First API key created. Save this key securely - it won't be shown again!"
                .into(),
        }),
    ))
}

/// Request to create a new API key.
#[derive(Debug, serde::Deserialize, utoipa::ToSchema)]
pub struct CreateApiKeyRequest {
    /// Name for the API key
    #[schema(example = "registration-desk")]
    pub name: String,
}

/// Response containing API key info (without the raw key).
#[derive(Debug, serde::Serialize, utoipa::ToSchema)]
pub struct ApiKeyInfo {
    /// API key ID
    #[schema(value_type = String, example = "123e4567-e89b-12d3-a456-426614174000")]
    pub id: ApiKeyId,
    /// Name of the API key
    pub name: String,
    /// Whether the key is active
    pub is_active: bool,
    /// When the key was created (ISO 8601)
    #[schema(value_type = String, example = "2026-01-01T00:00:00Z")]
    pub created_at: String,
    /// When the key was last used (ISO 8601)
    #[schema(value_type = Option<String>)]
    pub last_used_at: Option<String>,
}

/// Create a new API key (requires authentication).
#[tracing::instrument(skip(state, req), fields(key_name = %req.name))]
pub async fn create_api_key<R: RegistrationRepository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    Json(req): Json<CreateApiKeyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (_api_key, raw_key) = state
        .service
        .repo()
        .create_api_key(&req.name)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok((
        StatusCode::CREATED,
        Json(BootstrapResponse {
            api_key: raw_key,
            message: "API key created. Save this key securely - it won't be shown again!".into(),
        }),
    ))
}

/// List all active API keys (without exposing raw keys).
#[tracing::instrument(skip(state))]
pub async fn list_api_keys<R: RegistrationRepository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
) -> Result<impl IntoResponse, ApiError> {
    let keys = state
        .service
        .repo()
        .list_api_keys()
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let response: Vec<ApiKeyInfo> = keys
        .into_iter()
        .map(|k| ApiKeyInfo {
            id: k.id,
            name: k.name,
            is_active: k.is_active,
            created_at: k.created_at.to_rfc3339(),
            last_used_at: k.last_used_at.map(|dt| dt.to_rfc3339()),
        })
        .collect();

    Ok(Json(response))
}

/// Delete (deactivate) an API key.
#[tracing::instrument(skip(state), fields(key_id = %id))]
pub async fn delete_api_key<R: RegistrationRepository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let key_id: ApiKeyId = id
        .parse()
        .map_err(|_| AppError::Validation("Invalid API key ID".into()))?;

    let deleted = state
        .service
        .repo()
        .delete_api_key(key_id)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    if deleted {
        Ok(StatusCode::NO_CONTENT.into_response())
    } else {
        Err(AppError::NotFound("API key not found".into()).into())
    }
}
