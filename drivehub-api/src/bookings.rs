use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use drivehub_domain::validate::CreateBookingPayload;
use drivehub_domain::{BookingDetails, BookingStatus};

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RejectBookingRequest {
    pub booking_id: String,
}

#[derive(Debug, Deserialize)]
pub struct RespondBookingRequest {
    pub booking_id: String,
    /// true accepts the request, false rejects it.
    pub booking_status: bool,
}

#[derive(Debug, Deserialize)]
pub struct ListBookingsParams {
    pub user_id: String,
    #[serde(default)]
    pub active: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct CreateBookingResponse {
    pub message: String,
    pub booking_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/booking/create", post(create_booking))
        .route("/booking/reject", post(reject_booking))
        .route("/booking/respond", post(respond_booking))
        .route("/booking/list", get(list_bookings))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /booking/create
async fn create_booking(
    State(state): State<AppState>,
    Json(payload): Json<CreateBookingPayload>,
) -> Result<(StatusCode, Json<CreateBookingResponse>), AppError> {
    let booking_id = state.engine.create(&payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateBookingResponse {
            message: "Booking saved successfully".to_string(),
            booking_id,
        }),
    ))
}

/// POST /booking/reject — unconditional reject, idempotent.
async fn reject_booking(
    State(state): State<AppState>,
    Json(req): Json<RejectBookingRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    state.engine.reject(&req.booking_id).await?;

    Ok(Json(MessageResponse {
        message: "Booking rejected successfully".to_string(),
    }))
}

/// POST /booking/respond — owner's accept/reject decision.
async fn respond_booking(
    State(state): State<AppState>,
    Json(req): Json<RespondBookingRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let status = state
        .engine
        .respond(&req.booking_id, req.booking_status)
        .await?;

    let message = match status {
        BookingStatus::Accepted => "Booking accepted successfully",
        BookingStatus::Rejected => "Booking rejected successfully and car is available again",
        // respond only resolves Pending bookings
        BookingStatus::Pending => unreachable!("respond cannot leave a booking pending"),
    };

    Ok(Json(MessageResponse {
        message: message.to_string(),
    }))
}

/// GET /booking/list?user_id=<uuid>&active=<bool>
async fn list_bookings(
    State(state): State<AppState>,
    Query(params): Query<ListBookingsParams>,
) -> Result<Json<Vec<BookingDetails>>, AppError> {
    let rows = state
        .queries
        .list(&params.user_id, params.active.unwrap_or(false))
        .await?;

    Ok(Json(rows))
}
