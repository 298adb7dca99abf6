use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

use crate::{
    error::TripError,
    models::{
        selection::TripSelectionInput,
        session::{AccessCredential, Identity, Session},
        trip::TripId,
        workflow::{AuthReason, WorkflowEvent, WorkflowState},
    },
    repositories::{
        session::{SessionStore, StoreError},
        trip::TripWriter,
    },
    services::{
        ai::AiClient,
        identity::{CredentialStatus, IdentityProvider},
        parser::parse_itinerary,
        prompt::build_prompt,
    },
    validation::trip::validate_selection,
};

/// The collaborators a trip workflow talks to.
#[derive(Clone)]
pub struct TripServices {
    pub identity: Arc<dyn IdentityProvider>,
    pub ai: Arc<dyn AiClient>,
    pub trips: Arc<dyn TripWriter>,
    pub template: Arc<str>,
}

/// Drives one client's trip generation from selection to stored record.
///
/// Steps run strictly in order: validate, check the session, re-validate the
/// credential, build the prompt, call the AI service, parse, save, navigate.
/// A missing or stale session suspends the attempt in `AwaitingAuth` with the
/// selection kept aside until `complete_login` resumes it or
/// `abandon_login` drops it.
pub struct TripOrchestrator {
    services: TripServices,
    sessions: Arc<dyn SessionStore>,
    events: UnboundedSender<WorkflowEvent>,
    state: WorkflowState,
    pending: Option<TripSelectionInput>,
}

impl TripOrchestrator {
    /// Creates a new `TripOrchestrator` in the `Idle` state.
    ///
    /// # Arguments
    ///
    /// * `services` - The identity, AI and persistence boundaries.
    /// * `sessions` - The session store of the client this workflow serves.
    /// * `events` - Where sign-in prompts and navigation are sent.
    pub fn new(
        services: TripServices,
        sessions: Arc<dyn SessionStore>,
        events: UnboundedSender<WorkflowEvent>,
    ) -> Self {
        Self {
            services,
            sessions,
            events,
            state: WorkflowState::Idle,
            pending: None,
        }
    }

    /// The current workflow state.
    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    /// Generates, stores and navigates to a trip for the given selection.
    ///
    /// # Arguments
    ///
    /// * `input` - The selection as submitted by the user.
    ///
    /// # Returns
    ///
    /// A `Result` containing the stored trip's ID.
    pub async fn generate(&mut self, input: TripSelectionInput) -> Result<TripId, TripError> {
        self.transition(WorkflowState::ValidatingInput);

        let selection = match validate_selection(&input) {
            Ok(selection) => selection,
            Err(e) => {
                tracing::debug!("📝 Selection rejected: {} ({})", e.message, e.field);
                return Err(self.fail(TripError::InvalidInput(e)));
            }
        };

        let Some(session) = self.sessions.load().await else {
            tracing::info!("🔐 No session, asking user to sign in");
            return Err(self.await_auth(AuthReason::Required, input));
        };

        if self.services.identity.validate(&session.access_credential).await == CredentialStatus::Invalid {
            tracing::warn!("🔐 Credential expired for {}", session.identity.email);
            if let Err(e) = self.sessions.clear().await {
                tracing::error!("❌ Failed to clear stale session: {}", e);
            }
            return Err(self.await_auth(AuthReason::Expired, input));
        }

        self.transition(WorkflowState::Generating);
        let prompt = build_prompt(&self.services.template, &selection);

        let raw = match self.services.ai.generate(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!("❌ AI service failed: {}", e);
                return Err(self.fail(TripError::GenerationFailed("AI service unavailable".to_string())));
            }
        };

        let itinerary = match parse_itinerary(&raw) {
            Ok(itinerary) => itinerary,
            Err(e) => {
                tracing::warn!("❌ Could not parse AI response: {}", e);
                return Err(self.fail(TripError::GenerationFailed("malformed AI response".to_string())));
            }
        };

        self.transition(WorkflowState::Saving);

        let trip_id = match self
            .services
            .trips
            .save(&session.identity.email, &selection, &itinerary)
            .await
        {
            Ok(trip_id) => trip_id,
            Err(e) => {
                tracing::error!("❌ Error saving trip: {}", e);
                return Err(self.fail(TripError::SaveFailed(e.to_string())));
            }
        };

        tracing::info!("✅ Trip {} generated for {}", trip_id, session.identity.email);
        self.transition(WorkflowState::Succeeded { trip_id });
        self.emit(WorkflowEvent::Navigate { trip_id });

        Ok(trip_id)
    }

    /// Completes a sign-in and resumes the suspended attempt, if there is one.
    ///
    /// On a rejected credential the workflow keeps waiting for sign-in and the
    /// pending selection is kept.
    ///
    /// # Arguments
    ///
    /// * `credential` - The access credential returned by the sign-in flow.
    ///
    /// # Returns
    ///
    /// A `Result` containing the stored trip's ID when an attempt was resumed.
    pub async fn complete_login(&mut self, credential: AccessCredential) -> Result<Option<TripId>, TripError> {
        let identity = match self.services.identity.fetch_profile(&credential).await {
            Ok(identity) => identity,
            Err(e) => {
                tracing::warn!("❌ Failed to get user profile: {}", e);
                return Err(TripError::LoginFailed(e.to_string()));
            }
        };

        self.sign_in(identity, credential).await?;

        match self.pending.take() {
            Some(input) => {
                tracing::info!("▶️ Resuming trip generation after sign-in");
                self.generate(input).await.map(Some)
            }
            None => {
                self.transition(WorkflowState::Idle);
                Ok(None)
            }
        }
    }

    /// Dismisses the sign-in prompt.
    ///
    /// Only meaningful while `AwaitingAuth`: the pending selection is dropped and
    /// the workflow returns to `Idle`. The session store is not touched.
    ///
    /// # Returns
    ///
    /// `true` if a suspended attempt was abandoned.
    pub fn abandon_login(&mut self) -> bool {
        if !matches!(self.state, WorkflowState::AwaitingAuth { .. }) {
            return false;
        }

        self.pending = None;
        self.transition(WorkflowState::Idle);
        tracing::info!("↩️ Sign-in abandoned");
        true
    }

    /// Signs the user out by deleting the session.
    pub async fn sign_out(&mut self) -> Result<(), StoreError> {
        self.sessions.clear().await?;
        self.pending = None;
        self.transition(WorkflowState::Idle);
        Ok(())
    }

    async fn sign_in(&mut self, identity: Identity, credential: AccessCredential) -> Result<(), TripError> {
        let email = identity.email.clone();
        let session = Session::new(identity, credential);

        self.sessions.save(&session).await.map_err(|e| {
            tracing::error!("❌ Failed to store session: {}", e);
            TripError::SessionUnavailable(e.to_string())
        })?;

        tracing::info!("✅ User signed in: {}", email);
        Ok(())
    }

    fn await_auth(&mut self, reason: AuthReason, input: TripSelectionInput) -> TripError {
        self.pending = Some(input);
        self.transition(WorkflowState::AwaitingAuth { reason });
        self.emit(WorkflowEvent::SignInPrompt { reason });

        match reason {
            AuthReason::Required => TripError::AuthRequired,
            AuthReason::Expired => TripError::AuthExpired,
        }
    }

    fn fail(&mut self, error: TripError) -> TripError {
        self.transition(WorkflowState::Error {
            reason: error.to_string(),
        });
        error
    }

    fn transition(&mut self, next: WorkflowState) {
        tracing::debug!("🔁 Workflow {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn emit(&self, event: WorkflowEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("Workflow event dropped, no listener");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::itinerary::GeneratedItinerary;
    use crate::models::selection::{BudgetTier, TravelerCategory, TripSelection};
    use crate::repositories::session::MemorySessionStore;
    use crate::repositories::trip::WriteError;
    use crate::services::ai::AiError;
    use crate::services::identity::IdentityError;
    use crate::services::prompt::DEFAULT_TEMPLATE;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    const THREE_DAY_PLAN: &str = r#"{
        "hotels": [{"hotelName": "Hotel du Nord"}],
        "itinerary": [
            {"day": 1, "plan": [{"placeName": "Louvre"}]},
            {"day": 2, "plan": [{"placeName": "Orsay"}]},
            {"day": 3, "plan": [{"placeName": "Versailles"}]}
        ]
    }"#;

    /// Accepts exactly one token and counts lookups.
    struct FakeIdentity {
        valid_token: &'static str,
        calls: AtomicUsize,
    }

    impl FakeIdentity {
        fn accepting(valid_token: &'static str) -> Self {
            Self {
                valid_token,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl IdentityProvider for FakeIdentity {
        async fn fetch_profile(&self, credential: &AccessCredential) -> Result<Identity, IdentityError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if credential.expose() == self.valid_token {
                Ok(ana())
            } else {
                Err(IdentityError::Rejected(401))
            }
        }
    }

    /// Replies with canned text and records prompts.
    struct FakeAi {
        reply: Result<&'static str, ()>,
        prompts: Mutex<Vec<String>>,
    }

    impl FakeAi {
        fn replying(reply: &'static str) -> Self {
            Self {
                reply: Ok(reply),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                reply: Err(()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl AiClient for FakeAi {
        async fn generate(&self, prompt: &str) -> Result<String, AiError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            match self.reply {
                Ok(text) => Ok(text.to_string()),
                Err(()) => Err(AiError::Api {
                    status: 503,
                    message: "overloaded".to_string(),
                }),
            }
        }
    }

    /// Keeps records in memory, or refuses every write.
    struct FakeTrips {
        broken: bool,
        attempts: AtomicUsize,
        records: Mutex<Vec<(TripId, String, TripSelection, GeneratedItinerary)>>,
    }

    impl FakeTrips {
        fn working() -> Self {
            Self {
                broken: false,
                attempts: AtomicUsize::new(0),
                records: Mutex::new(Vec::new()),
            }
        }

        fn broken() -> Self {
            Self {
                broken: true,
                ..Self::working()
            }
        }

        fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }

        fn stored(&self) -> usize {
            self.records.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl TripWriter for FakeTrips {
        async fn save(
            &self,
            owner_email: &str,
            selection: &TripSelection,
            itinerary: &GeneratedItinerary,
        ) -> Result<TripId, WriteError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.broken {
                return Err(WriteError::Pool(deadpool_postgres::PoolError::Closed));
            }
            let trip_id = TripId::generate();
            self.records.lock().unwrap().push((
                trip_id,
                owner_email.to_string(),
                selection.clone(),
                itinerary.clone(),
            ));
            Ok(trip_id)
        }
    }

    struct Harness {
        orchestrator: TripOrchestrator,
        events: UnboundedReceiver<WorkflowEvent>,
        sessions: Arc<MemorySessionStore>,
        identity: Arc<FakeIdentity>,
        ai: Arc<FakeAi>,
        trips: Arc<FakeTrips>,
    }

    impl Harness {
        fn new(sessions: MemorySessionStore, ai: FakeAi, trips: FakeTrips) -> Self {
            let sessions = Arc::new(sessions);
            let identity = Arc::new(FakeIdentity::accepting("fresh-token"));
            let ai = Arc::new(ai);
            let trips = Arc::new(trips);
            let (tx, events) = mpsc::unbounded_channel();

            let services = TripServices {
                identity: identity.clone(),
                ai: ai.clone(),
                trips: trips.clone(),
                template: Arc::from(DEFAULT_TEMPLATE),
            };
            let orchestrator = TripOrchestrator::new(services, sessions.clone(), tx);

            Self {
                orchestrator,
                events,
                sessions,
                identity,
                ai,
                trips,
            }
        }

        fn drain(&mut self) -> Vec<WorkflowEvent> {
            let mut drained = Vec::new();
            while let Ok(event) = self.events.try_recv() {
                drained.push(event);
            }
            drained
        }
    }

    fn ana() -> Identity {
        Identity {
            email: "ana@example.com".to_string(),
            display_name: "Ana".to_string(),
            picture: None,
            provider_id: None,
        }
    }

    fn signed_in(token: &str) -> MemorySessionStore {
        MemorySessionStore::with_session(Session::new(ana(), AccessCredential::new(token)))
    }

    fn paris() -> TripSelectionInput {
        TripSelectionInput {
            destination: Some("Paris".to_string()),
            duration_days: Some(3),
            budget: Some("Cheap".to_string()),
            traveler: Some("Couple".to_string()),
        }
    }

    #[tokio::test]
    async fn paris_trip_is_generated_stored_and_navigated_to() {
        let mut h = Harness::new(signed_in("fresh-token"), FakeAi::replying(THREE_DAY_PLAN), FakeTrips::working());

        let trip_id = h.orchestrator.generate(paris()).await.unwrap();

        assert_eq!(h.orchestrator.state(), &WorkflowState::Succeeded { trip_id });
        assert_eq!(h.drain(), vec![WorkflowEvent::Navigate { trip_id }]);
        assert_eq!(h.ai.calls(), 1);

        let records = h.trips.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        let (stored_id, owner, selection, itinerary) = &records[0];
        assert_eq!(*stored_id, trip_id);
        assert_eq!(owner, "ana@example.com");
        assert_eq!(
            selection,
            &TripSelection {
                destination: "Paris".to_string(),
                duration_days: 3,
                budget: BudgetTier::Cheap,
                traveler: TravelerCategory::Couple,
            }
        );
        assert_eq!(itinerary.day_count(), Some(3));
    }

    #[tokio::test]
    async fn prompt_carries_the_selection() {
        let mut h = Harness::new(signed_in("fresh-token"), FakeAi::replying(THREE_DAY_PLAN), FakeTrips::working());

        h.orchestrator.generate(paris()).await.unwrap();

        let prompts = h.ai.prompts.lock().unwrap();
        assert!(prompts[0].contains("Location: Paris"));
        assert!(prompts[0].contains("for 3 Days for Couple with a Cheap budget"));
        assert!(!prompts[0].contains("{totalDays}"));
    }

    #[tokio::test]
    async fn invalid_selection_has_no_side_effects() {
        for input in [
            TripSelectionInput {
                duration_days: Some(6),
                ..paris()
            },
            TripSelectionInput {
                duration_days: Some(0),
                ..paris()
            },
            TripSelectionInput {
                destination: Some(String::new()),
                ..paris()
            },
            TripSelectionInput {
                budget: None,
                ..paris()
            },
        ] {
            let mut h = Harness::new(signed_in("fresh-token"), FakeAi::replying(THREE_DAY_PLAN), FakeTrips::working());

            let err = h.orchestrator.generate(input).await.unwrap_err();

            assert!(matches!(err, TripError::InvalidInput(_)));
            assert!(matches!(h.orchestrator.state(), WorkflowState::Error { .. }));
            assert_eq!(h.identity.calls.load(Ordering::SeqCst), 0);
            assert_eq!(h.ai.calls(), 0);
            assert_eq!(h.trips.attempts(), 0);
            assert!(h.drain().is_empty());
        }
    }

    #[tokio::test]
    async fn missing_session_suspends_until_login() {
        let mut h = Harness::new(MemorySessionStore::default(), FakeAi::replying(THREE_DAY_PLAN), FakeTrips::working());

        let err = h.orchestrator.generate(paris()).await.unwrap_err();

        assert_eq!(err, TripError::AuthRequired);
        assert_eq!(
            h.orchestrator.state(),
            &WorkflowState::AwaitingAuth {
                reason: AuthReason::Required
            }
        );
        assert_eq!(
            h.drain(),
            vec![WorkflowEvent::SignInPrompt {
                reason: AuthReason::Required
            }]
        );
        assert_eq!(h.ai.calls(), 0);
        assert_eq!(h.trips.attempts(), 0);

        let resumed = h
            .orchestrator
            .complete_login(AccessCredential::new("fresh-token"))
            .await
            .unwrap();

        let trip_id = resumed.expect("pending attempt should resume");
        assert_eq!(h.sessions.current().unwrap().identity.email, "ana@example.com");
        assert_eq!(h.ai.calls(), 1);
        assert_eq!(h.trips.stored(), 1);
        assert_eq!(h.drain(), vec![WorkflowEvent::Navigate { trip_id }]);
    }

    #[tokio::test]
    async fn rejected_login_keeps_waiting() {
        let mut h = Harness::new(MemorySessionStore::default(), FakeAi::replying(THREE_DAY_PLAN), FakeTrips::working());
        h.orchestrator.generate(paris()).await.unwrap_err();
        h.drain();

        let err = h
            .orchestrator
            .complete_login(AccessCredential::new("forged"))
            .await
            .unwrap_err();

        assert!(matches!(err, TripError::LoginFailed(_)));
        assert!(matches!(h.orchestrator.state(), WorkflowState::AwaitingAuth { .. }));
        assert!(h.sessions.current().is_none());
        assert_eq!(h.ai.calls(), 0);

        // The selection is still pending for the next try.
        let trip_id = h
            .orchestrator
            .complete_login(AccessCredential::new("fresh-token"))
            .await
            .unwrap();
        assert!(trip_id.is_some());
    }

    #[tokio::test]
    async fn abandoning_login_returns_to_idle_untouched() {
        let mut h = Harness::new(MemorySessionStore::default(), FakeAi::replying(THREE_DAY_PLAN), FakeTrips::working());
        h.orchestrator.generate(paris()).await.unwrap_err();

        assert!(h.orchestrator.abandon_login());

        assert_eq!(h.orchestrator.state(), &WorkflowState::Idle);
        assert_eq!(h.sessions.writes(), 0);
        assert_eq!(h.trips.attempts(), 0);
        assert_eq!(h.ai.calls(), 0);

        // A later sign-in has nothing to resume.
        let resumed = h
            .orchestrator
            .complete_login(AccessCredential::new("fresh-token"))
            .await
            .unwrap();
        assert_eq!(resumed, None);
        assert_eq!(h.orchestrator.state(), &WorkflowState::Idle);
        assert_eq!(h.trips.attempts(), 0);
    }

    #[tokio::test]
    async fn abandon_outside_sign_in_is_ignored() {
        let mut h = Harness::new(signed_in("fresh-token"), FakeAi::replying(THREE_DAY_PLAN), FakeTrips::working());
        h.orchestrator.generate(paris()).await.unwrap();

        assert!(!h.orchestrator.abandon_login());
        assert!(matches!(h.orchestrator.state(), WorkflowState::Succeeded { .. }));
    }

    #[tokio::test]
    async fn expired_credential_clears_session() {
        let mut h = Harness::new(signed_in("stale-token"), FakeAi::replying(THREE_DAY_PLAN), FakeTrips::working());

        let err = h.orchestrator.generate(paris()).await.unwrap_err();

        assert_eq!(err, TripError::AuthExpired);
        assert!(h.sessions.current().is_none());
        assert_eq!(
            h.orchestrator.state(),
            &WorkflowState::AwaitingAuth {
                reason: AuthReason::Expired
            }
        );
        assert_eq!(
            h.drain(),
            vec![WorkflowEvent::SignInPrompt {
                reason: AuthReason::Expired
            }]
        );
        assert_eq!(h.ai.calls(), 0);
    }

    #[tokio::test]
    async fn malformed_ai_response_writes_nothing() {
        let mut h = Harness::new(
            signed_in("fresh-token"),
            FakeAi::replying("Here is a lovely trip to Paris!"),
            FakeTrips::working(),
        );

        let err = h.orchestrator.generate(paris()).await.unwrap_err();

        assert_eq!(err, TripError::GenerationFailed("malformed AI response".to_string()));
        assert!(matches!(h.orchestrator.state(), WorkflowState::Error { .. }));
        assert_eq!(h.ai.calls(), 1);
        assert_eq!(h.trips.attempts(), 0);
        assert!(h.drain().is_empty());
    }

    #[tokio::test]
    async fn ai_service_failure_is_generation_failure() {
        let mut h = Harness::new(signed_in("fresh-token"), FakeAi::failing(), FakeTrips::working());

        let err = h.orchestrator.generate(paris()).await.unwrap_err();

        assert_eq!(err, TripError::GenerationFailed("AI service unavailable".to_string()));
        assert!(!err.to_string().contains("overloaded"));
        assert_eq!(h.ai.calls(), 1);
        assert_eq!(h.trips.attempts(), 0);
    }

    #[tokio::test]
    async fn unstorable_session_is_not_a_login_failure() {
        let mut h = Harness::new(
            MemorySessionStore::refusing_writes(),
            FakeAi::replying(THREE_DAY_PLAN),
            FakeTrips::working(),
        );
        h.orchestrator.generate(paris()).await.unwrap_err();

        let err = h
            .orchestrator
            .complete_login(AccessCredential::new("fresh-token"))
            .await
            .unwrap_err();

        assert!(matches!(err, TripError::SessionUnavailable(_)));
        assert!(!err.needs_sign_in());
        assert!(matches!(h.orchestrator.state(), WorkflowState::AwaitingAuth { .. }));
        assert_eq!(h.ai.calls(), 0);
    }

    #[tokio::test]
    async fn save_failure_does_not_navigate() {
        let mut h = Harness::new(signed_in("fresh-token"), FakeAi::replying(THREE_DAY_PLAN), FakeTrips::broken());

        let err = h.orchestrator.generate(paris()).await.unwrap_err();

        assert!(matches!(err, TripError::SaveFailed(_)));
        assert!(matches!(h.orchestrator.state(), WorkflowState::Error { .. }));
        assert_eq!(h.trips.attempts(), 1);
        assert!(h.drain().is_empty());
    }

    #[tokio::test]
    async fn new_attempt_starts_over_after_error() {
        let mut h = Harness::new(signed_in("fresh-token"), FakeAi::replying(THREE_DAY_PLAN), FakeTrips::working());

        h.orchestrator
            .generate(TripSelectionInput {
                duration_days: Some(9),
                ..paris()
            })
            .await
            .unwrap_err();
        let trip_id = h.orchestrator.generate(paris()).await.unwrap();

        assert_eq!(h.orchestrator.state(), &WorkflowState::Succeeded { trip_id });
        assert_eq!(h.trips.stored(), 1);
    }

    #[tokio::test]
    async fn sign_out_clears_session() {
        let mut h = Harness::new(signed_in("fresh-token"), FakeAi::replying(THREE_DAY_PLAN), FakeTrips::working());

        h.orchestrator.sign_out().await.unwrap();

        assert!(h.sessions.current().is_none());
        assert_eq!(h.orchestrator.generate(paris()).await.unwrap_err(), TripError::AuthRequired);
    }
}
