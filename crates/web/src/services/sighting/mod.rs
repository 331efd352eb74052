//! Sighting report orchestration.
//!
//! A visitor reports that a registered pet was seen. The orchestrator loads
//! the pet and its owner, asks the [`policy`] which channels to use, runs
//! each action through the [`ContactGateway`] and then records when the
//! owner was contacted.
//!
//! Gateway failures never abort a report. Each one is logged and kept in the
//! [`DispatchReport`], the remaining actions still run, and the contact
//! timestamps are still written.

pub mod policy;
mod store;

pub use policy::{DispatchAction, DispatchPlan, plan_notifications, sighting_message};
pub use store::{PgSightingStore, SightingStore};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::instrument;
use url::Url;

use orange_collar_core::{ContactChannel, ContactTimestamps, PetId, StampPolicy, UserId};

use crate::db::RepositoryError;
use crate::services::telephony::{ContactGateway, Delivery, GatewayError};

/// Shown after a successful dispatch.
pub const DISPATCHED_MESSAGE: &str =
    "The owner is being contacted. Thank you for doing your part!";
/// Shown when the owner has no phone on file.
pub const NO_CONTACT_INFO_MESSAGE: &str =
    "Could not find the owner's contact information. Thank you for trying.";
/// Shown when the pet's owner record is missing.
pub const OWNER_NOT_FOUND_MESSAGE: &str =
    "Could not find the owner. Thank you for trying to help.";
/// Shown when the pet does not exist.
pub const PET_NOT_FOUND_MESSAGE: &str = "Pet not found";

/// Settings that shape a dispatch.
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    /// Product name used in the text message.
    pub app_name: String,
    /// Public base URL; call documents live at `calltemplate.xml/{pet_id}`.
    pub callback_base: Url,
    /// Which contact timestamps a dispatch updates.
    pub stamp_policy: StampPolicy,
}

impl DispatchSettings {
    /// URL the provider fetches call instructions from.
    ///
    /// # Errors
    ///
    /// Returns `url::ParseError` if the joined URL is invalid.
    pub fn callback_url(&self, pet_id: PetId) -> Result<Url, url::ParseError> {
        self.callback_base.join(&format!("calltemplate.xml/{pet_id}"))
    }
}

/// Errors that stop a sighting report.
#[derive(Debug, Error)]
pub enum SightingError {
    /// No pet with this id.
    #[error("pet {0} not found")]
    PetNotFound(PetId),

    /// The pet's owner record is missing.
    #[error("owner {0} not found")]
    OwnerNotFound(UserId),

    /// Loading records or writing timestamps failed.
    #[error("sighting store error: {0}")]
    Store(#[from] RepositoryError),
}

impl SightingError {
    /// The message shown to the reporter, or `None` for internal errors.
    #[must_use]
    pub const fn user_message(&self) -> Option<&'static str> {
        match self {
            Self::PetNotFound(_) => Some(PET_NOT_FOUND_MESSAGE),
            Self::OwnerNotFound(_) => Some(OWNER_NOT_FOUND_MESSAGE),
            Self::Store(_) => None,
        }
    }
}

/// One gateway call and how it went.
#[derive(Debug)]
pub struct ChannelAttempt {
    /// Channel used.
    pub channel: ContactChannel,
    /// Provider result.
    pub delivery: Result<Delivery, GatewayError>,
}

/// Everything that happened during a dispatch.
#[derive(Debug)]
pub struct DispatchReport {
    /// Attempts in the order they ran.
    pub attempts: Vec<ChannelAttempt>,
    /// The instant the stamp policy applied to the owner's channels.
    pub stamped_at: DateTime<Utc>,
    /// The owner's contact timestamps as stored after the update.
    pub contact: ContactTimestamps,
}

impl DispatchReport {
    /// Number of attempts the provider did not accept.
    #[must_use]
    pub fn failures(&self) -> usize {
        self.attempts.iter().filter(|a| a.delivery.is_err()).count()
    }
}

/// Result of a sighting report that reached the owner record.
#[derive(Debug)]
pub enum SightingOutcome {
    /// Actions ran (possibly none) and timestamps were updated.
    Dispatched(DispatchReport),
    /// The owner has no phone number; nothing was sent or stamped.
    NoContactInfo,
}

impl SightingOutcome {
    /// The message shown to the reporter.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::Dispatched(_) => DISPATCHED_MESSAGE,
            Self::NoContactInfo => NO_CONTACT_INFO_MESSAGE,
        }
    }
}

/// Drives a sighting report from pet id to owner notification.
pub struct SightingService<'a> {
    store: &'a dyn SightingStore,
    gateway: &'a dyn ContactGateway,
    settings: &'a DispatchSettings,
}

impl<'a> SightingService<'a> {
    /// Create a new sighting service.
    #[must_use]
    pub const fn new(
        store: &'a dyn SightingStore,
        gateway: &'a dyn ContactGateway,
        settings: &'a DispatchSettings,
    ) -> Self {
        Self {
            store,
            gateway,
            settings,
        }
    }

    /// Report a sighting of `pet_id` now.
    ///
    /// # Errors
    ///
    /// Returns `SightingError::PetNotFound` or `SightingError::OwnerNotFound`
    /// when a record is missing, and `SightingError::Store` when persistence
    /// fails. Gateway failures are not errors; see [`DispatchReport`].
    pub async fn report_sighting(&self, pet_id: PetId) -> Result<SightingOutcome, SightingError> {
        self.report_sighting_at(pet_id, Utc::now()).await
    }

    /// Report a sighting using `now` as the clock reading.
    ///
    /// # Errors
    ///
    /// See [`report_sighting`](Self::report_sighting).
    #[instrument(skip(self, now), fields(owner_id))]
    pub async fn report_sighting_at(
        &self,
        pet_id: PetId,
        now: DateTime<Utc>,
    ) -> Result<SightingOutcome, SightingError> {
        let pet = self
            .store
            .find_pet(pet_id)
            .await?
            .ok_or(SightingError::PetNotFound(pet_id))?;

        let owner = self
            .store
            .find_owner(pet.user_id)
            .await?
            .ok_or(SightingError::OwnerNotFound(pet.user_id))?;
        tracing::Span::current().record("owner_id", tracing::field::display(owner.id));

        let actions = match plan_notifications(&pet, &owner, &self.settings.app_name) {
            DispatchPlan::NoContactInfo => {
                tracing::info!("owner has no contact info, nothing dispatched");
                return Ok(SightingOutcome::NoContactInfo);
            }
            DispatchPlan::Actions(actions) => actions,
        };

        let mut attempts = Vec::with_capacity(actions.len());
        for action in &actions {
            let channel = action.channel();
            let delivery = self.execute(action).await;
            match &delivery {
                Ok(Delivery::Sent { sid }) => {
                    tracing::info!(%channel, %sid, "owner notified");
                }
                Ok(Delivery::Skipped) => {
                    tracing::debug!(%channel, "notification skipped");
                }
                Err(e) => {
                    tracing::warn!(%channel, error = %e, "owner notification failed");
                }
            }
            attempts.push(ChannelAttempt { channel, delivery });
        }

        let stamped_at = owner.contact.next_instant(now);
        let used: Vec<ContactChannel> = actions.iter().map(DispatchAction::channel).collect();
        let stamps = owner
            .contact
            .stamped(stamped_at, self.settings.stamp_policy, &used);
        let contact = self.store.record_contact(owner.id, &stamps).await?;

        let report = DispatchReport {
            attempts,
            stamped_at,
            contact,
        };
        tracing::info!(
            attempts = report.attempts.len(),
            failures = report.failures(),
            "sighting dispatched"
        );

        Ok(SightingOutcome::Dispatched(report))
    }

    async fn execute(&self, action: &DispatchAction) -> Result<Delivery, GatewayError> {
        match action {
            DispatchAction::Text { to, body } => self.gateway.send_text(to, body).await,
            DispatchAction::VoiceCall { to, pet_id } => {
                let callback = self.settings.callback_url(*pet_id)?;
                self.gateway.place_voice_call(to, &callback).await
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::TimeDelta;

    use orange_collar_core::PhoneNumber;

    use super::policy::fixtures::{owner, rex, signup_instant};
    use super::*;
    use crate::models::{Pet, User};

    #[derive(Default)]
    struct MemoryStore {
        pets: HashMap<PetId, Pet>,
        users: Mutex<HashMap<UserId, User>>,
        writes: Mutex<usize>,
        // Applied just before each write, like a report that landed first.
        concurrent: Option<ContactTimestamps>,
    }

    impl MemoryStore {
        fn with(pet: Pet, owner: Option<User>) -> Self {
            let mut store = Self::default();
            if let Some(owner) = owner {
                store.users.get_mut().unwrap().insert(owner.id, owner);
            }
            store.pets.insert(pet.id, pet);
            store
        }

        fn owner(&self, id: UserId) -> User {
            self.users.lock().unwrap()[&id].clone()
        }

        fn writes(&self) -> usize {
            *self.writes.lock().unwrap()
        }
    }

    #[async_trait]
    impl SightingStore for MemoryStore {
        async fn find_pet(&self, id: PetId) -> Result<Option<Pet>, RepositoryError> {
            Ok(self.pets.get(&id).cloned())
        }

        async fn find_owner(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
            Ok(self.users.lock().unwrap().get(&id).cloned())
        }

        async fn record_contact(
            &self,
            owner: UserId,
            stamps: &ContactTimestamps,
        ) -> Result<ContactTimestamps, RepositoryError> {
            *self.writes.lock().unwrap() += 1;
            let mut users = self.users.lock().unwrap();
            let user = users.get_mut(&owner).ok_or(RepositoryError::NotFound)?;
            let stored = &mut user.contact;
            for stamp in self.concurrent.iter().chain([stamps]) {
                stored.last_sms = stored.last_sms.max(stamp.last_sms);
                stored.last_mms = stored.last_mms.max(stamp.last_mms);
                stored.last_call = stored.last_call.max(stamp.last_call);
            }
            Ok(*stored)
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Text(String, String),
        Voice(String, String),
    }

    #[derive(Default)]
    struct RecordingGateway {
        calls: Mutex<Vec<Call>>,
        fail_texts: bool,
    }

    impl RecordingGateway {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ContactGateway for RecordingGateway {
        async fn send_text(
            &self,
            to: &PhoneNumber,
            body: &str,
        ) -> Result<Delivery, GatewayError> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Text(to.to_string(), body.to_owned()));
            if self.fail_texts {
                return Err(GatewayError::Api {
                    status: 400,
                    message: "invalid 'To' number".to_owned(),
                });
            }
            Ok(Delivery::Sent { sid: "SM1".into() })
        }

        async fn place_voice_call(
            &self,
            to: &PhoneNumber,
            callback_url: &Url,
        ) -> Result<Delivery, GatewayError> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Voice(to.to_string(), callback_url.to_string()));
            Ok(Delivery::Sent { sid: "CA1".into() })
        }
    }

    fn settings(policy: StampPolicy) -> DispatchSettings {
        DispatchSettings {
            app_name: "Orange Collar".to_owned(),
            callback_base: Url::parse("https://orangecollar.example/").unwrap(),
            stamp_policy: policy,
        }
    }

    fn later() -> DateTime<Utc> {
        signup_instant() + TimeDelta::hours(2)
    }

    #[tokio::test]
    async fn test_sms_only_owner_gets_one_text() {
        let store = MemoryStore::with(rex(), Some(owner("5551234567", true, false)));
        let gateway = RecordingGateway::default();
        let settings = settings(StampPolicy::All);
        let service = SightingService::new(&store, &gateway, &settings);

        let outcome = service
            .report_sighting_at(PetId::new(7), later())
            .await
            .unwrap();

        assert!(matches!(outcome, SightingOutcome::Dispatched(_)));
        assert_eq!(outcome.message(), DISPATCHED_MESSAGE);
        assert_eq!(
            gateway.calls(),
            [Call::Text(
                "5551234567".into(),
                "Your dog, Rex, was sighted in the area. Log in to Orange Collar to change \
                 your pet's status."
                    .into()
            )]
        );
    }

    #[tokio::test]
    async fn test_voice_only_owner_gets_one_call() {
        let store = MemoryStore::with(rex(), Some(owner("5551234567", false, true)));
        let gateway = RecordingGateway::default();
        let settings = settings(StampPolicy::All);
        let service = SightingService::new(&store, &gateway, &settings);

        service
            .report_sighting_at(PetId::new(7), later())
            .await
            .unwrap();

        assert_eq!(
            gateway.calls(),
            [Call::Voice(
                "5551234567".into(),
                "https://orangecollar.example/calltemplate.xml/7".into()
            )]
        );
    }

    #[tokio::test]
    async fn test_owner_without_phone_is_not_contacted() {
        let store = MemoryStore::with(rex(), Some(owner("", true, true)));
        let gateway = RecordingGateway::default();
        let settings = settings(StampPolicy::All);
        let service = SightingService::new(&store, &gateway, &settings);

        let outcome = service
            .report_sighting_at(PetId::new(7), later())
            .await
            .unwrap();

        assert!(matches!(outcome, SightingOutcome::NoContactInfo));
        assert_eq!(outcome.message(), NO_CONTACT_INFO_MESSAGE);
        assert!(gateway.calls().is_empty());
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn test_no_channels_still_dispatched_and_stamped() {
        let store = MemoryStore::with(rex(), Some(owner("5551234567", false, false)));
        let gateway = RecordingGateway::default();
        let settings = settings(StampPolicy::All);
        let service = SightingService::new(&store, &gateway, &settings);

        let outcome = service
            .report_sighting_at(PetId::new(7), later())
            .await
            .unwrap();

        let SightingOutcome::Dispatched(report) = outcome else {
            panic!("expected dispatch");
        };
        assert!(report.attempts.is_empty());
        assert!(gateway.calls().is_empty());
        assert_eq!(store.writes(), 1);
    }

    #[tokio::test]
    async fn test_default_policy_stamps_all_three_equal_and_later() {
        let store = MemoryStore::with(rex(), Some(owner("5551234567", true, false)));
        let before = store.owner(UserId::new(1)).contact;
        let gateway = RecordingGateway::default();
        let settings = settings(StampPolicy::All);
        let service = SightingService::new(&store, &gateway, &settings);

        service
            .report_sighting_at(PetId::new(7), later())
            .await
            .unwrap();

        let after = store.owner(UserId::new(1)).contact;
        assert_eq!(after.last_sms, after.last_mms);
        assert_eq!(after.last_mms, after.last_call);
        assert!(after.last_sms > before.last_sms);
        assert!(after.last_mms > before.last_mms);
        assert!(after.last_call > before.last_call);
    }

    #[tokio::test]
    async fn test_stamp_strictly_increases_when_clock_stalls() {
        let store = MemoryStore::with(rex(), Some(owner("5551234567", true, false)));
        let gateway = RecordingGateway::default();
        let settings = settings(StampPolicy::All);
        let service = SightingService::new(&store, &gateway, &settings);

        // Clock reads the sign-up instant: equal to every prior stamp.
        service
            .report_sighting_at(PetId::new(7), signup_instant())
            .await
            .unwrap();
        let first = store.owner(UserId::new(1)).contact;
        assert!(first.last_sms > signup_instant());

        service
            .report_sighting_at(PetId::new(7), signup_instant())
            .await
            .unwrap();
        let second = store.owner(UserId::new(1)).contact;
        assert!(second.last_sms > first.last_sms);
    }

    #[tokio::test]
    async fn test_report_returns_stored_timestamps_after_concurrent_write() {
        let racing = later() + TimeDelta::minutes(5);
        let store = MemoryStore {
            concurrent: Some(ContactTimestamps::all_at(racing)),
            ..MemoryStore::with(rex(), Some(owner("5551234567", true, false)))
        };
        let gateway = RecordingGateway::default();
        let settings = settings(StampPolicy::All);
        let service = SightingService::new(&store, &gateway, &settings);

        let SightingOutcome::Dispatched(report) = service
            .report_sighting_at(PetId::new(7), later())
            .await
            .unwrap()
        else {
            panic!("expected dispatch");
        };

        assert_eq!(report.stamped_at, later());
        assert_eq!(report.contact, ContactTimestamps::all_at(racing));
        assert_eq!(store.owner(UserId::new(1)).contact, report.contact);
    }

    #[tokio::test]
    async fn test_attempted_policy_leaves_unused_channels() {
        let store = MemoryStore::with(rex(), Some(owner("5551234567", true, false)));
        let gateway = RecordingGateway::default();
        let settings = settings(StampPolicy::Attempted);
        let service = SightingService::new(&store, &gateway, &settings);

        service
            .report_sighting_at(PetId::new(7), later())
            .await
            .unwrap();

        let after = store.owner(UserId::new(1)).contact;
        assert_eq!(after.last_sms, later());
        assert_eq!(after.last_call, signup_instant());
        assert_eq!(after.last_mms, signup_instant());
    }

    #[tokio::test]
    async fn test_failed_text_does_not_stop_call_or_stamp() {
        let store = MemoryStore::with(rex(), Some(owner("5551234567", true, true)));
        let gateway = RecordingGateway {
            fail_texts: true,
            ..RecordingGateway::default()
        };
        let settings = settings(StampPolicy::All);
        let service = SightingService::new(&store, &gateway, &settings);

        let outcome = service
            .report_sighting_at(PetId::new(7), later())
            .await
            .unwrap();

        let SightingOutcome::Dispatched(report) = outcome else {
            panic!("expected dispatch");
        };
        assert_eq!(report.attempts.len(), 2);
        assert_eq!(report.failures(), 1);
        assert_eq!(gateway.calls().len(), 2);
        assert_eq!(store.owner(UserId::new(1)).contact.last_sms, later());
    }

    #[tokio::test]
    async fn test_unknown_pet() {
        let store = MemoryStore::with(rex(), Some(owner("5551234567", true, true)));
        let gateway = RecordingGateway::default();
        let settings = settings(StampPolicy::All);
        let service = SightingService::new(&store, &gateway, &settings);

        let err = service
            .report_sighting_at(PetId::new(999), later())
            .await
            .unwrap_err();

        assert!(matches!(err, SightingError::PetNotFound(id) if id == PetId::new(999)));
        assert_eq!(err.user_message(), Some(PET_NOT_FOUND_MESSAGE));
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_owner() {
        let store = MemoryStore::with(rex(), None);
        let gateway = RecordingGateway::default();
        let settings = settings(StampPolicy::All);
        let service = SightingService::new(&store, &gateway, &settings);

        let err = service
            .report_sighting_at(PetId::new(7), later())
            .await
            .unwrap_err();

        assert!(matches!(err, SightingError::OwnerNotFound(_)));
        assert_eq!(err.user_message(), Some(OWNER_NOT_FOUND_MESSAGE));
        assert_eq!(store.writes(), 0);
    }
}
