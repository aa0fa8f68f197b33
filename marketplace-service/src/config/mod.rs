use rust_decimal::Decimal;
use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct MarketplaceConfig {
    pub common: core_config::Config,
    pub mongodb: MongoConfig,
    pub store_backend: StoreBackend,
    pub session: SessionConfig,
    pub redis_url: Option<String>,
    pub pdf: PdfConfig,
    pub pricing: PricingConfig,
    pub login_rate_limit: RateLimitConfig,
    pub bootstrap_admin: Option<AdminBootstrap>,
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Mongo,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(StoreBackend::Mongo),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(format!("Invalid store backend: {}", s)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub secret: Secret<String>,
    pub cookie_name: String,
    pub ttl_hours: i64,
    pub secure_cookie: bool,
}

#[derive(Debug, Clone)]
pub struct PdfConfig {
    pub chrome_path: String,
    pub timeout_secs: u64,
    pub work_dir: String,
}

#[derive(Debug, Clone)]
pub struct PricingConfig {
    pub delivery_fee: Decimal,
    /// Orders with a subtotal at or above this ship free.
    pub free_delivery_threshold: Decimal,
    pub currency_symbol: String,
    pub default_payment_terms_days: u32,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub attempts: u32,
    pub window_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct AdminBootstrap {
    pub email: String,
    pub password: Secret<String>,
}

impl MarketplaceConfig {
    pub fn load() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";
        Self::from_lookup(common, is_prod, |key| env::var(key).ok())
    }

    /// Build from any key lookup. Production refuses to start without the
    /// connection string and session secret.
    pub fn from_lookup(
        common: core_config::Config,
        is_prod: bool,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, AppError> {
        let required = |key: &str, default: Option<&str>| get_env(&lookup, key, default, is_prod);
        let tunable = |key: &str, default: &str| {
            lookup(key).unwrap_or_else(|| default.to_string())
        };

        let bootstrap_admin = match (lookup("ADMIN_EMAIL"), lookup("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminBootstrap {
                email,
                password: Secret::new(password),
            }),
            _ => None,
        };

        Ok(MarketplaceConfig {
            common,
            mongodb: MongoConfig {
                uri: required("MONGODB_URI", Some("mongodb://localhost:27017"))?,
                database: tunable("MONGODB_DATABASE", "marketplace_db"),
            },
            store_backend: parse("STORE_BACKEND", &tunable("STORE_BACKEND", "mongo"))?,
            session: SessionConfig {
                secret: Secret::new(required(
                    "SESSION_SECRET",
                    Some("dev-only-session-secret-change-me"),
                )?),
                cookie_name: tunable("SESSION_COOKIE_NAME", "session"),
                ttl_hours: parse("SESSION_TTL_HOURS", &tunable("SESSION_TTL_HOURS", "12"))?,
                secure_cookie: parse(
                    "SESSION_COOKIE_SECURE",
                    &tunable("SESSION_COOKIE_SECURE", if is_prod { "true" } else { "false" }),
                )?,
            },
            redis_url: lookup("REDIS_URL"),
            pdf: PdfConfig {
                chrome_path: tunable("CHROME_PATH", "chromium"),
                timeout_secs: parse("PDF_TIMEOUT_SECS", &tunable("PDF_TIMEOUT_SECS", "30"))?,
                work_dir: tunable("PDF_WORK_DIR", &env::temp_dir().join("marketplace-pdf").display().to_string()),
            },
            pricing: PricingConfig {
                delivery_fee: parse("DELIVERY_FEE", &tunable("DELIVERY_FEE", "5.00"))?,
                free_delivery_threshold: parse(
                    "FREE_DELIVERY_THRESHOLD",
                    &tunable("FREE_DELIVERY_THRESHOLD", "150.00"),
                )?,
                currency_symbol: tunable("CURRENCY_SYMBOL", "€"),
                default_payment_terms_days: parse(
                    "PAYMENT_TERMS_DAYS",
                    &tunable("PAYMENT_TERMS_DAYS", "30"),
                )?,
            },
            login_rate_limit: RateLimitConfig {
                attempts: parse("LOGIN_RATE_LIMIT", &tunable("LOGIN_RATE_LIMIT", "10"))?,
                window_seconds: parse(
                    "LOGIN_RATE_WINDOW_SECS",
                    &tunable("LOGIN_RATE_WINDOW_SECS", "60"),
                )?,
            },
            bootstrap_admin,
            otlp_endpoint: lookup("OTLP_ENDPOINT"),
        })
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, AppError>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| {
        AppError::ConfigError(anyhow::anyhow!("{} has an invalid value '{}': {}", key, value, e))
    })
}

fn get_env(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Option<&str>,
    is_prod: bool,
) -> Result<String, AppError> {
    match lookup(key) {
        Some(val) => Ok(val),
        None => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}
