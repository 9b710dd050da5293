//! Shared application state.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use jewel_core::billing::bill_day;
use jewel_db::Database;

use crate::auth::JwtManager;
use crate::config::StorefrontConfig;
use crate::error::{ApiError, ApiResult};
use crate::payments::{PaymentGateway, StripeGateway};

/// State handed to every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub jwt: Arc<JwtManager>,
    /// `None` when no Stripe key is configured.
    pub payments: Option<Arc<dyn PaymentGateway>>,
    pub config: Arc<StorefrontConfig>,
}

impl AppState {
    /// Builds state with the Stripe gateway when a key is configured.
    pub fn new(db: Database, config: StorefrontConfig) -> Self {
        let payments = config.stripe_secret_key.as_ref().map(|key| {
            Arc::new(StripeGateway::new(key.clone(), config.stripe_api_base.clone()))
                as Arc<dyn PaymentGateway>
        });
        Self::with_gateway(db, config, payments)
    }

    /// Builds state around an explicit gateway (tests, offline runs).
    pub fn with_gateway(
        db: Database,
        config: StorefrontConfig,
        payments: Option<Arc<dyn PaymentGateway>>,
    ) -> Self {
        AppState {
            db,
            jwt: Arc::new(JwtManager::new(&config.jwt_secret, config.jwt_lifetime_secs)),
            payments,
            config: Arc::new(config),
        }
    }

    pub fn payments(&self) -> ApiResult<&dyn PaymentGateway> {
        self.payments.as_deref().ok_or(ApiError::PaymentsUnavailable)
    }

    /// Calendar day of `now` at the store.
    pub fn store_day(&self, now: DateTime<Utc>) -> NaiveDate {
        bill_day(now, self.config.store.utc_offset_minutes)
    }
}
