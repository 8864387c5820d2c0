//! Shared application state handed to every handler.

use std::{sync::Arc, time::Instant};

use crate::config::AppConfig;
use crate::db::StudioStore;
use crate::error::{AppError, AppResult};
use crate::images::ImageHost;
use crate::rate_limit::RateLimiter;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn StudioStore>,
    /// `None` when image-host credentials are not configured.
    pub images: Option<Arc<dyn ImageHost>>,
    pub rate_limiter: RateLimiter,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn StudioStore>,
        images: Option<Arc<dyn ImageHost>>,
    ) -> SharedState {
        let rate_limiter = RateLimiter::new(&config.rate_limit);
        Arc::new(Self {
            config,
            store,
            images,
            rate_limiter,
            started_at: Instant::now(),
        })
    }

    pub fn image_host(&self) -> AppResult<&dyn ImageHost> {
        self.images.as_deref().ok_or_else(|| {
            AppError::ConfigurationMissing(
                "Image hosting is not configured. Set CLOUDINARY_CLOUD_NAME, \
                 CLOUDINARY_API_KEY and CLOUDINARY_API_SECRET."
                    .to_string(),
            )
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::time::Duration;

    use super::*;
    use crate::config::{AdminCredentials, Environment, RateLimitConfig, DEV_JWT_SECRET};
    use crate::db::MemoryStore;
    use crate::images::MemoryImageHost;

    pub const ADMIN_EMAIL: &str = "admin@studio.test";
    pub const ADMIN_PASSWORD: &str = "correct horse";

    pub fn config() -> AppConfig {
        AppConfig {
            environment: Environment::Development,
            host: "127.0.0.1".to_string(),
            port: 0,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            admin: Some(AdminCredentials {
                email: ADMIN_EMAIL.to_string(),
                // Low cost keeps the suite fast.
                password_hash: bcrypt::hash(ADMIN_PASSWORD, 4).unwrap(),
            }),
            cloudinary: None,
            rate_limit: RateLimitConfig {
                max_requests: 10_000,
                window: Duration::from_secs(60),
            },
        }
    }

    pub struct Harness {
        pub state: SharedState,
        pub store: Arc<MemoryStore>,
        pub images: Arc<MemoryImageHost>,
    }

    pub fn harness_with(config: AppConfig) -> Harness {
        let store = Arc::new(MemoryStore::new());
        let images = Arc::new(MemoryImageHost::new("portfolio"));
        let state = AppState::new(config, store.clone(), Some(images.clone()));
        Harness {
            state,
            store,
            images,
        }
    }

    pub fn harness() -> Harness {
        harness_with(config())
    }
}
