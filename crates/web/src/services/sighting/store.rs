//! Persistence seam for the sighting orchestrator.

use async_trait::async_trait;
use sqlx::PgPool;

use orange_collar_core::{ContactTimestamps, PetId, UserId};

use crate::db::{PetRepository, RepositoryError, UserRepository};
use crate::models::{Pet, User};

/// Reads pets and owners and records contact timestamps.
#[async_trait]
pub trait SightingStore: Send + Sync {
    /// Load a pet.
    async fn find_pet(&self, id: PetId) -> Result<Option<Pet>, RepositoryError>;

    /// Load a pet's owner.
    async fn find_owner(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// Persist all three contact timestamps in one update.
    ///
    /// No column moves backwards. Returns the timestamps as stored, which
    /// may be later than `stamps` if another report landed first.
    async fn record_contact(
        &self,
        owner: UserId,
        stamps: &ContactTimestamps,
    ) -> Result<ContactTimestamps, RepositoryError>;
}

/// [`SightingStore`] backed by `PostgreSQL`.
#[derive(Debug, Clone)]
pub struct PgSightingStore {
    pool: PgPool,
}

impl PgSightingStore {
    /// Wrap a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SightingStore for PgSightingStore {
    async fn find_pet(&self, id: PetId) -> Result<Option<Pet>, RepositoryError> {
        PetRepository::new(&self.pool).get(id).await
    }

    async fn find_owner(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        UserRepository::new(&self.pool).get_by_id(id).await
    }

    async fn record_contact(
        &self,
        owner: UserId,
        stamps: &ContactTimestamps,
    ) -> Result<ContactTimestamps, RepositoryError> {
        UserRepository::new(&self.pool)
            .record_contact(owner, stamps)
            .await
    }
}
