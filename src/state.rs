use crate::billing::{PaymentProvider, StripeClient};
use crate::config::AppConfig;
use crate::db;
use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
    pub payments: Arc<dyn PaymentProvider>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let db = db::connect(&config.database_url).await?;

        let payments: Arc<dyn PaymentProvider> =
            Arc::new(StripeClient::from_config(&config.stripe));

        Ok(Self {
            db,
            config,
            payments,
        })
    }

    pub fn from_parts(
        db: SqlitePool,
        config: Arc<AppConfig>,
        payments: Arc<dyn PaymentProvider>,
    ) -> Self {
        Self {
            db,
            config,
            payments,
        }
    }
}
