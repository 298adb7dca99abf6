use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::Pool;
use thiserror::Error;
use tokio_postgres::Row;
use tokio_postgres::types::Json;
use uuid::Uuid;

use crate::{
    error::Result,
    models::{
        itinerary::GeneratedItinerary,
        selection::TripSelection,
        trip::{TripId, TripRecord},
    },
};

/// The trip record could not be written.
///
/// The write is all-or-nothing: after this error nothing is assumed stored.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("Pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),
}

/// The boundary that stores freshly generated trips.
#[async_trait]
pub trait TripWriter: Send + Sync {
    /// Stores a new trip under a freshly generated identifier.
    ///
    /// The write is attempted exactly once.
    async fn save(
        &self,
        owner_email: &str,
        selection: &TripSelection,
        itinerary: &GeneratedItinerary,
    ) -> std::result::Result<TripId, WriteError>;
}

/// Creates the trips table if it does not exist.
pub const CREATE_TRIPS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS ai_trips (
        id UUID PRIMARY KEY,
        owner_email TEXT NOT NULL,
        selection JSONB NOT NULL,
        itinerary JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    );
    CREATE INDEX IF NOT EXISTS ai_trips_owner_email_idx ON ai_trips (owner_email);
"#;

/// A helper function to map a `tokio_postgres::Row` to a `TripRecord`.
fn row_to_trip(row: &Row) -> Result<TripRecord> {
    let id: Uuid = row.try_get("id")?;
    let owner_email: String = row.try_get("owner_email")?;
    let selection: Json<TripSelection> = row.try_get("selection")?;
    let itinerary: Json<GeneratedItinerary> = row.try_get("itinerary")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;

    Ok(TripRecord {
        id: TripId::from_uuid(id),
        owner_email,
        selection: selection.0,
        itinerary: itinerary.0,
        created_at,
    })
}

/// Stores trip records in PostgreSQL.
#[derive(Clone)]
pub struct PgTripStore {
    pool: Pool,
}

impl PgTripStore {
    /// Creates a new `PgTripStore`.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Finds a trip by its ID.
    ///
    /// # Arguments
    ///
    /// * `trip_id` - The ID of the trip.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `TripRecord`, if it exists.
    pub async fn find_by_id(&self, trip_id: &TripId) -> Result<Option<TripRecord>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                r#"
                SELECT id, owner_email, selection, itinerary, created_at
                FROM ai_trips
                WHERE id = $1
                "#,
                &[trip_id.as_uuid()],
            )
            .await?;
        row.map(|r| row_to_trip(&r)).transpose()
    }
}

#[async_trait]
impl TripWriter for PgTripStore {
    async fn save(
        &self,
        owner_email: &str,
        selection: &TripSelection,
        itinerary: &GeneratedItinerary,
    ) -> std::result::Result<TripId, WriteError> {
        let trip_id = TripId::generate();
        let client = self.pool.get().await?;

        client
            .execute(
                r#"
                INSERT INTO ai_trips (id, owner_email, selection, itinerary)
                VALUES ($1, $2, $3, $4)
                "#,
                &[trip_id.as_uuid(), &owner_email, &Json(selection), &Json(itinerary)],
            )
            .await?;

        tracing::info!("✅ Trip saved: {}", trip_id);
        Ok(trip_id)
    }
}

