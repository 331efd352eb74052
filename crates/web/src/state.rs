//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::WebConfig;
use crate::services::sighting::{DispatchSettings, PgSightingStore, SightingService, SightingStore};
use crate::services::telephony::{ContactGateway, GatewayError, TwilioGateway};
use crate::services::uploads::ImageStore;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. The gateway and sighting store are trait
/// objects so tests can swap in fakes.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: WebConfig,
    pool: PgPool,
    gateway: Arc<dyn ContactGateway>,
    store: Arc<dyn SightingStore>,
    dispatch: DispatchSettings,
    images: ImageStore,
}

impl AppState {
    /// Create the production state: Twilio gateway and `PostgreSQL` store.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` if the Twilio HTTP client cannot be built.
    pub fn new(config: WebConfig, pool: PgPool) -> Result<Self, GatewayError> {
        let gateway = Arc::new(TwilioGateway::new(&config.telephony)?);
        let store = Arc::new(PgSightingStore::new(pool.clone()));
        Ok(Self::with_services(config, pool, gateway, store))
    }

    /// Create state with explicit gateway and store implementations.
    #[must_use]
    pub fn with_services(
        config: WebConfig,
        pool: PgPool,
        gateway: Arc<dyn ContactGateway>,
        store: Arc<dyn SightingStore>,
    ) -> Self {
        let dispatch = DispatchSettings {
            app_name: config.app_name.clone(),
            callback_base: config.base_url.clone(),
            stamp_policy: config.stamp_policy,
        };
        let images = ImageStore::new(config.images_dir.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                gateway,
                store,
                dispatch,
                images,
            }),
        }
    }

    /// Get a reference to the configuration.
    #[must_use]
    pub fn config(&self) -> &WebConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get the pet picture store.
    #[must_use]
    pub fn images(&self) -> &ImageStore {
        &self.inner.images
    }

    /// Build a sighting service over the shared gateway and store.
    #[must_use]
    pub fn sightings(&self) -> SightingService<'_> {
        SightingService::new(
            self.inner.store.as_ref(),
            self.inner.gateway.as_ref(),
            &self.inner.dispatch,
        )
    }
}
