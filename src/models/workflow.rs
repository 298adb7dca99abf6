use serde::Serialize;

use crate::models::trip::TripId;

/// Why the user is being asked to sign in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthReason {
    /// No session existed when generation was requested.
    Required,
    /// A session existed but its credential no longer validates.
    Expired,
}

/// Where a trip generation attempt currently stands.
///
/// `Succeeded` and `Error` end an attempt; the next `generate` call starts over
/// from `ValidatingInput`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum WorkflowState {
    Idle,
    ValidatingInput,
    AwaitingAuth { reason: AuthReason },
    Generating,
    Saving,
    Succeeded { trip_id: TripId },
    Error { reason: String },
}

impl WorkflowState {
    /// Whether an attempt is currently in flight and the trigger should be disabled.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            WorkflowState::ValidatingInput | WorkflowState::Generating | WorkflowState::Saving
        )
    }
}

/// A presentation side effect requested by the workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WorkflowEvent {
    /// Show the sign-in prompt.
    SignInPrompt { reason: AuthReason },
    /// Route to the view of a freshly stored trip.
    Navigate { trip_id: TripId },
}
