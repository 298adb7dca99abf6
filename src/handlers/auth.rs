use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, Result},
    handlers::trips::stored_trip_response,
    middleware_layer::client::ClientId,
    models::session::AccessCredential,
    state::{AppState, WorkflowCommand, run_detached},
};

/// The request payload for completing a Google sign-in.
#[derive(Deserialize)]
pub struct GoogleLoginRequest {
    pub access_token: AccessCredential,
}

/// The response payload for authentication-related requests.
#[derive(Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
}

/// Handles the credential returned by the Google sign-in popup.
///
/// Stores the session and, if a generation attempt was waiting for sign-in,
/// resumes it. A resumed attempt answers like `POST /api/trips/generate`.
#[axum::debug_handler]
pub async fn google_login(
    State(state): State<AppState>,
    Extension(ClientId(client_id)): Extension<ClientId>,
    Json(payload): Json<GoogleLoginRequest>,
) -> Result<Response> {
    tracing::info!("🔐 Google sign-in for client {}", client_id);

    let credential = AccessCredential::new(payload.access_token.expose().trim());
    if credential.is_empty() {
        return Err(AppError::Validation("access_token cannot be empty".to_string()));
    }

    let (resumed, events) = run_detached(
        state.workflow_for(client_id),
        WorkflowCommand::CompleteLogin(credential),
    )
    .await?;

    match resumed {
        Some(trip_id) => {
            tracing::info!("✅ Resumed trip {} after sign-in", trip_id);
            Ok((StatusCode::CREATED, Json(stored_trip_response(trip_id, &events))).into_response())
        }
        None => {
            let response = AuthResponse {
                success: true,
                message: "Signed in".to_string(),
            };
            Ok((StatusCode::OK, Json(response)).into_response())
        }
    }
}

/// Handles a dismissed sign-in prompt.
pub async fn abandon(
    State(state): State<AppState>,
    Extension(ClientId(client_id)): Extension<ClientId>,
) -> Result<Json<AuthResponse>> {
    let slot = state.workflow_for(client_id);
    let mut slot = slot.try_lock().map_err(|_| {
        AppError::Conflict("A trip generation is already in progress".to_string())
    })?;
    slot.touch();

    let abandoned = slot.orchestrator.abandon_login();
    let message = if abandoned {
        "Trip generation cancelled"
    } else {
        "Nothing to cancel"
    };

    Ok(Json(AuthResponse {
        success: abandoned,
        message: message.to_string(),
    }))
}

/// Handles user logout.
#[axum::debug_handler]
pub async fn logout(
    State(state): State<AppState>,
    Extension(ClientId(client_id)): Extension<ClientId>,
) -> Result<Json<AuthResponse>> {
    let slot = state.workflow_for(client_id);
    let mut slot = slot.try_lock().map_err(|_| {
        AppError::Conflict("A trip generation is already in progress".to_string())
    })?;

    slot.orchestrator.sign_out().await.map_err(|e| {
        tracing::error!("❌ Failed to delete session: {}", e);
        AppError::Internal(format!("Failed to delete session: {}", e))
    })?;

    tracing::info!("👋 Client {} signed out", client_id);

    Ok(Json(AuthResponse {
        success: true,
        message: "Logout successful".to_string(),
    }))
}
