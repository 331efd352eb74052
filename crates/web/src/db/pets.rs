//! Pet repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use orange_collar_core::{PetId, PetStatus, UserId};

use super::RepositoryError;
use crate::models::pet::{NewPet, Pet};

const PET_COLUMNS: &str = "id, user_id, name, species, color, breed, gender, description, \
     indoor_pet, status, picture, home_address, created_at";

#[derive(Debug, sqlx::FromRow)]
struct PetRow {
    id: i32,
    user_id: i32,
    name: String,
    species: String,
    color: String,
    breed: String,
    gender: String,
    description: String,
    indoor_pet: bool,
    status: String,
    picture: Option<String>,
    home_address: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<PetRow> for Pet {
    type Error = RepositoryError;

    fn try_from(row: PetRow) -> Result<Self, Self::Error> {
        let status = PetStatus::parse(&row.status).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid status for pet {}: {e}", row.id))
        })?;

        Ok(Self {
            id: PetId::new(row.id),
            user_id: UserId::new(row.user_id),
            name: row.name,
            species: row.species,
            color: row.color,
            breed: row.breed,
            gender: row.gender,
            description: row.description,
            indoor_pet: row.indoor_pet,
            status,
            picture: row.picture.filter(|p| !p.is_empty()),
            home_address: row.home_address,
            created_at: row.created_at,
        })
    }
}

/// Repository for pet database operations.
pub struct PetRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PetRepository<'a> {
    /// Create a new pet repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a pet by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: PetId) -> Result<Option<Pet>, RepositoryError> {
        let sql = format!("SELECT {PET_COLUMNS} FROM pets WHERE id = $1");
        let row = sqlx::query_as::<_, PetRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        row.map(Pet::try_from).transpose()
    }

    /// List a user's pets, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Pet>, RepositoryError> {
        let sql = format!("SELECT {PET_COLUMNS} FROM pets WHERE user_id = $1 ORDER BY id");
        let rows = sqlx::query_as::<_, PetRow>(&sql)
            .bind(user_id)
            .fetch_all(self.pool)
            .await?;

        rows.into_iter().map(Pet::try_from).collect()
    }

    /// Register a pet.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails (including
    /// a `user_id` with no matching user).
    pub async fn create(&self, new_pet: &NewPet) -> Result<Pet, RepositoryError> {
        let sql = format!(
            r"
            INSERT INTO pets (
                user_id, name, species, color, breed, gender, description,
                indoor_pet, status, home_address
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {PET_COLUMNS}
            "
        );

        let row = sqlx::query_as::<_, PetRow>(&sql)
            .bind(new_pet.user_id)
            .bind(&new_pet.name)
            .bind(&new_pet.species)
            .bind(&new_pet.color)
            .bind(&new_pet.breed)
            .bind(&new_pet.gender)
            .bind(&new_pet.description)
            .bind(new_pet.indoor_pet)
            .bind(&new_pet.status)
            .bind(&new_pet.home_address)
            .fetch_one(self.pool)
            .await?;

        Pet::try_from(row)
    }

    /// Attach an uploaded picture to a pet owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such pet belongs to `owner`.
    pub async fn set_picture(
        &self,
        id: PetId,
        owner: UserId,
        file_name: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE pets SET picture = $3 WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .bind(file_name)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Change the status of a pet owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such pet belongs to `owner`.
    pub async fn set_status(
        &self,
        id: PetId,
        owner: UserId,
        status: &PetStatus,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE pets SET status = $3 WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .bind(status)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
