use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sonic_rs::Value;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    middleware_layer::client::ClientId,
    models::{
        selection::{BudgetTier, TravelerCategory, TripSelectionInput},
        trip::TripId,
        workflow::{WorkflowEvent, WorkflowState},
    },
    state::{AppState, WorkflowCommand, run_detached},
};

/// The response payload for a stored trip.
#[derive(Serialize)]
pub struct GenerateResponse {
    pub status: &'static str,
    pub trip_id: TripId,
    pub navigate_to: String,
}

/// The response payload describing a client's workflow.
#[derive(Serialize)]
pub struct WorkflowResponse {
    #[serde(flatten)]
    pub state: WorkflowState,
    pub is_busy: bool,
}

/// The response payload for the trip view.
#[derive(Serialize)]
pub struct TripView {
    pub id: TripId,
    pub destination: String,
    pub duration_days: u8,
    pub budget: BudgetTier,
    pub traveler: TravelerCategory,
    pub day_count: Option<usize>,
    pub itinerary: Value,
    pub owner_email: String,
    pub created_at: DateTime<Utc>,
}

/// Builds the response for a freshly stored trip out of the workflow's events.
pub(crate) fn stored_trip_response(trip_id: TripId, events: &[WorkflowEvent]) -> GenerateResponse {
    let navigate_to = events
        .iter()
        .find_map(|event| match event {
            WorkflowEvent::Navigate { trip_id } => Some(trip_id.view_path()),
            WorkflowEvent::SignInPrompt { .. } => None,
        })
        .unwrap_or_else(|| trip_id.view_path());

    GenerateResponse {
        status: "succeeded",
        trip_id,
        navigate_to,
    }
}

/// Handles a trip generation request.
///
/// Runs the whole workflow for the calling client: validation, the sign-in
/// gate, generation and storage. A client can only have one attempt in flight.
#[axum::debug_handler]
pub async fn generate(
    State(state): State<AppState>,
    Extension(ClientId(client_id)): Extension<ClientId>,
    Json(payload): Json<TripSelectionInput>,
) -> Result<Response> {
    tracing::info!("🧭 Trip generation requested by client {}", client_id);

    let (trip_id, events) = run_detached(
        state.workflow_for(client_id),
        WorkflowCommand::Generate(payload),
    )
    .await?;
    let trip_id = trip_id.ok_or_else(|| AppError::Internal("Generation ended without a trip".to_string()))?;
    tracing::info!("✅ Trip {} ready for client {}", trip_id, client_id);

    Ok((StatusCode::CREATED, Json(stored_trip_response(trip_id, &events))).into_response())
}

/// Reports where the calling client's workflow stands.
pub async fn workflow_status(
    State(state): State<AppState>,
    Extension(ClientId(client_id)): Extension<ClientId>,
) -> Result<Json<WorkflowResponse>> {
    let slot = state.workflow_for(client_id);
    let response = match slot.try_lock() {
        Ok(slot) => {
            let current = slot.orchestrator.state().clone();
            WorkflowResponse {
                is_busy: current.is_busy(),
                state: current,
            }
        }
        // The slot is held by a request that is still running.
        Err(_) => WorkflowResponse {
            state: WorkflowState::Generating,
            is_busy: true,
        },
    };

    Ok(Json(response))
}

/// Shows a stored trip.
#[axum::debug_handler]
pub async fn view_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
) -> Result<Json<TripView>> {
    let record = state
        .trips
        .find_by_id(&TripId::from_uuid(trip_id))
        .await?
        .ok_or(AppError::NotFound)?;

    tracing::debug!("👀 Viewing trip {}", record.id);

    Ok(Json(TripView {
        id: record.id,
        destination: record.selection.destination,
        duration_days: record.selection.duration_days,
        budget: record.selection.budget,
        traveler: record.selection.traveler,
        day_count: record.itinerary.day_count(),
        itinerary: record.itinerary.as_value().clone(),
        owner_email: record.owner_email,
        created_at: record.created_at,
    }))
}
