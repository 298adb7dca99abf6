use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::models::{itinerary::GeneratedItinerary, selection::TripSelection};

/// The identifier of a stored trip.
///
/// UUIDv7: the leading bits are a millisecond timestamp and the rest is random,
/// so ids sort by creation time and never collide in practice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TripId(Uuid);

impl TripId {
    /// Generates a fresh identifier.
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    /// Wraps an identifier read back from storage or a request path.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// The presentation route for the trip.
    pub fn view_path(&self) -> String {
        format!("/view-trip/{}", self.0)
    }
}

impl fmt::Display for TripId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Represents a generated trip as stored.
///
/// Written exactly once per successful generation and never updated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripRecord {
    /// The unique identifier for the trip.
    pub id: TripId,
    /// The email of the user who generated the trip.
    pub owner_email: String,
    /// What the user asked for.
    pub selection: TripSelection,
    /// What the AI service produced.
    pub itinerary: GeneratedItinerary,
    /// The timestamp when the trip was stored.
    pub created_at: DateTime<Utc>,
}
