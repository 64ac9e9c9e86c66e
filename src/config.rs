use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeConfig {
    pub secret_key: String,
    pub price_id: String,
    /// Webhook signing secret (`whsec_...`). Events are only trusted to change
    /// plans when this is set.
    pub endpoint_secret: Option<String>,
    pub api_base: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub stripe: StripeConfig,
    pub frontend_url: String,
    pub admin_api_key: Option<String>,
    pub static_dir: String,
    pub host: String,
    pub port: u16,
}

const THIRTY_DAYS_MINUTES: i64 = 60 * 24 * 30;

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://data/app.db".into());
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "iurisbot".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "iurisbot-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(THIRTY_DAYS_MINUTES),
        };
        let stripe = StripeConfig {
            secret_key: std::env::var("STRIPE_SECRET_KEY").unwrap_or_default(),
            price_id: std::env::var("STRIPE_PRICE_ID").unwrap_or_else(|_| "price_dummy".into()),
            endpoint_secret: non_empty_var("STRIPE_ENDPOINT_SECRET"),
            api_base: std::env::var("STRIPE_API_BASE")
                .unwrap_or_else(|_| "https://api.stripe.com".into()),
        };
        let port = match std::env::var("PORT").or_else(|_| std::env::var("APP_PORT")) {
            Ok(v) => v.parse::<u16>()?,
            Err(_) => 3000,
        };
        Ok(Self {
            database_url,
            jwt,
            stripe,
            frontend_url: std::env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
            admin_api_key: non_empty_var("ADMIN_API_KEY"),
            static_dir: std::env::var("STATIC_DIR").unwrap_or_else(|_| "public".into()),
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
