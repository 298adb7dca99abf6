use anyhow::Context;
use deadpool_postgres::Pool;
use redis::aio::ConnectionManager;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{
    selection::TripSelectionInput,
    session::AccessCredential,
    trip::TripId,
    workflow::WorkflowEvent,
};
use crate::repositories::{session::RedisSessionStore, trip::PgTripStore};
use crate::services::{
    ai::GeminiClient,
    identity::GoogleIdentityProvider,
    orchestrator::{TripOrchestrator, TripServices},
};

/// One browser client's workflow together with the events it has emitted.
pub struct WorkflowSlot {
    /// The client's trip workflow.
    pub orchestrator: TripOrchestrator,
    events: UnboundedReceiver<WorkflowEvent>,
    last_used: Instant,
}

impl WorkflowSlot {
    /// Creates a new `WorkflowSlot` around a fresh orchestrator.
    pub fn new(orchestrator: TripOrchestrator, events: UnboundedReceiver<WorkflowEvent>) -> Self {
        Self {
            orchestrator,
            events,
            last_used: Instant::now(),
        }
    }

    /// Marks the slot as used now.
    pub fn touch(&mut self) {
        self.last_used = Instant::now();
    }

    /// Takes every event emitted since the last call.
    pub fn drain_events(&mut self) -> Vec<WorkflowEvent> {
        let mut drained = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            drained.push(event);
        }
        drained
    }
}

/// A client's workflow slot, shared between requests.
pub type SharedSlot = Arc<tokio::sync::Mutex<WorkflowSlot>>;

/// A workflow operation that may suspend on I/O.
pub enum WorkflowCommand {
    /// Start a new generation attempt.
    Generate(TripSelectionInput),
    /// Finish a sign-in and resume the pending attempt, if any.
    CompleteLogin(AccessCredential),
}

/// Runs a workflow operation on its own task.
///
/// The task owns the slot's lock until the operation ends, so a caller that
/// goes away mid-attempt never leaves the workflow stuck in a busy state.
///
/// # Arguments
///
/// * `slot` - The client's workflow slot.
/// * `command` - The operation to run.
///
/// # Returns
///
/// A `Result` containing the stored trip's ID, if the operation produced one,
/// and the events emitted along the way.
pub async fn run_detached(
    slot: SharedSlot,
    command: WorkflowCommand,
) -> Result<(Option<TripId>, Vec<WorkflowEvent>)> {
    let mut slot = slot.try_lock_owned().map_err(|_| {
        AppError::Conflict("A trip generation is already in progress".to_string())
    })?;
    slot.touch();

    let task = tokio::spawn(async move {
        let outcome = match command {
            WorkflowCommand::Generate(input) => slot.orchestrator.generate(input).await.map(Some),
            WorkflowCommand::CompleteLogin(credential) => {
                slot.orchestrator.complete_login(credential).await
            }
        };
        slot.touch();
        (outcome, slot.drain_events())
    });

    let (outcome, events) = task.await.map_err(|e| {
        tracing::error!("❌ Workflow task failed: {}", e);
        AppError::Internal(format!("Workflow task failed: {}", e))
    })?;

    Ok((outcome?, events))
}

/// The live workflows, one per browser client.
///
/// Each slot sits behind its own async mutex so a slow generation for one
/// client never blocks another.
#[derive(Clone, Default)]
pub struct WorkflowRegistry {
    slots: Arc<Mutex<HashMap<Uuid, SharedSlot>>>,
}

impl WorkflowRegistry {
    /// Returns the client's slot, creating it with `make` on first use.
    pub fn get_or_insert_with(
        &self,
        client_id: Uuid,
        make: impl FnOnce() -> WorkflowSlot,
    ) -> SharedSlot {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots
            .entry(client_id)
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(make())))
            .clone()
    }

    /// Drops slots that have been idle for longer than `max_idle`.
    ///
    /// Slots that are currently locked are in use and always kept.
    ///
    /// # Returns
    ///
    /// The number of slots removed.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        let before = slots.len();
        slots.retain(|_, slot| match slot.try_lock() {
            Ok(slot) => slot.last_used.elapsed() <= max_idle,
            Err(_) => true,
        });
        before - slots.len()
    }

    /// The number of live workflows.
    pub fn len(&self) -> usize {
        self.slots.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// The Redis connection manager.
    pub redis: ConnectionManager,
    /// The application's configuration.
    pub config: Config,
    /// The trip store, also used for reads by the trip view.
    pub trips: PgTripStore,
    /// The boundaries shared by every workflow.
    pub services: TripServices,
    /// The live workflows.
    pub workflows: WorkflowRegistry,
}

impl AppState {
    /// Creates a new `AppState`.
    ///
    /// # Arguments
    ///
    /// * `config` - The application's configuration.
    /// * `db` - The database connection pool.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `AppState`.
    pub async fn new(config: &Config, db: Pool) -> anyhow::Result<Self> {
        let redis_client = redis::Client::open(config.redis_url.as_str()).context("Invalid REDIS_URL")?;
        let redis = ConnectionManager::new(redis_client)
            .await
            .context("Failed to connect to Redis")?;
        tracing::info!("✅ Redis Connection Manager initialized");

        let identity = GoogleIdentityProvider::new(config.identity_userinfo_url.clone(), config.identity_timeout)
            .context("Failed to build identity client")?;
        let ai = GeminiClient::new(
            config.gemini_base_url.clone(),
            config.gemini_model.clone(),
            config.gemini_api_key.clone(),
            config.ai_timeout,
        )
        .context("Failed to build AI client")?;
        tracing::info!("✅ AI client initialized (model: {})", config.gemini_model);

        let template = config.load_prompt_template()?;
        let trips = PgTripStore::new(db);

        Ok(AppState {
            redis,
            config: config.clone(),
            trips: trips.clone(),
            services: TripServices {
                identity: Arc::new(identity),
                ai: Arc::new(ai),
                trips: Arc::new(trips),
                template: Arc::from(template),
            },
            workflows: WorkflowRegistry::default(),
        })
    }

    /// Returns the workflow slot of a browser client.
    pub fn workflow_for(&self, client_id: Uuid) -> SharedSlot {
        self.workflows.get_or_insert_with(client_id, || {
            let sessions = RedisSessionStore::new(
                self.redis.clone(),
                client_id,
                self.config.session_duration_days,
            );
            let (tx, rx) = mpsc::unbounded_channel();
            tracing::debug!("🆕 New workflow for client {}", client_id);
            WorkflowSlot::new(
                TripOrchestrator::new(self.services.clone(), Arc::new(sessions), tx),
                rx,
            )
        })
    }
}
