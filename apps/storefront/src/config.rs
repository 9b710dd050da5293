//! Storefront configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use std::env;
use std::path::PathBuf;

use jewel_core::billing::TaxRates;
use jewel_core::validation::validate_tax_rate_bps;
use jewel_core::{TaxRate, DEFAULT_GST_RATE_BPS, DEFAULT_STORE_UTC_OFFSET_MINUTES, DEFAULT_VAT_RATE_BPS};
use tracing::warn;

const DEV_JWT_SECRET: &str = "jewel-storefront-dev-secret-change-in-production";

/// Store details printed on invoices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreProfile {
    pub name: String,
    pub tagline: String,
    pub address_lines: Vec<String>,
    pub phone: String,
    pub gstin: String,
    /// Minutes east of UTC for bill days and printed dates.
    pub utc_offset_minutes: i32,
}

impl Default for StoreProfile {
    fn default() -> Self {
        StoreProfile {
            name: "JEWEL STOREFRONT".to_string(),
            tagline: "Fine Jewellery".to_string(),
            address_lines: vec![
                "123 Jewellery Street".to_string(),
                "Chennai, Tamil Nadu".to_string(),
                "PINCODE: 600001".to_string(),
            ],
            phone: String::new(),
            gstin: String::new(),
            utc_offset_minutes: DEFAULT_STORE_UTC_OFFSET_MINUTES,
        }
    }
}

/// Account upserted as admin on startup.
#[derive(Debug, Clone)]
pub struct AdminBootstrap {
    pub email: String,
    pub password: String,
}

/// Storefront server configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Bind address
    pub host: String,

    /// HTTP port
    pub port: u16,

    /// SQLite database file
    pub database_path: PathBuf,

    /// Secret for HS256 token signing
    pub jwt_secret: String,

    /// Token lifetime in seconds
    pub jwt_lifetime_secs: i64,

    /// Where uploaded product images are written
    pub uploads_dir: PathBuf,

    /// Per-file upload limit in bytes
    pub max_upload_bytes: usize,

    /// Files per product request
    pub max_upload_files: usize,

    /// Stripe secret key; payments are disabled without it
    pub stripe_secret_key: Option<String>,

    /// Stripe API origin (overridable for tests)
    pub stripe_api_base: String,

    /// Bootstrap admin account
    pub admin: Option<AdminBootstrap>,

    /// Invoice logo image
    pub logo_path: Option<PathBuf>,

    /// Store details for invoices
    pub store: StoreProfile,

    /// GST/VAT rates
    pub tax_rates: TaxRates,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup` (environment in production, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let jwt_secret = match get("JWT_SECRET") {
            Some(secret) => secret,
            None => {
                // In production, this MUST be set via environment variable
                warn!("JWT_SECRET not set, using development secret");
                DEV_JWT_SECRET.to_string()
            }
        };

        let admin = match (get("ADMIN_EMAIL"), get("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminBootstrap { email, password }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::MissingRequired("ADMIN_PASSWORD".to_string())),
            (None, Some(_)) => return Err(ConfigError::MissingRequired("ADMIN_EMAIL".to_string())),
        };

        let defaults = StoreProfile::default();
        let utc_offset_minutes: i32 = parse_or(&get, "STORE_UTC_OFFSET_MINUTES", DEFAULT_STORE_UTC_OFFSET_MINUTES)?;
        if utc_offset_minutes.abs() >= 24 * 60 {
            return Err(ConfigError::InvalidValue("STORE_UTC_OFFSET_MINUTES".to_string()));
        }

        let store = StoreProfile {
            name: get("STORE_NAME").unwrap_or(defaults.name),
            tagline: get("STORE_TAGLINE").unwrap_or(defaults.tagline),
            address_lines: get("STORE_ADDRESS")
                .map(|a| {
                    a.split('|')
                        .map(str::trim)
                        .filter(|l| !l.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or(defaults.address_lines),
            phone: get("STORE_PHONE").unwrap_or(defaults.phone),
            gstin: get("STORE_GSTIN").unwrap_or(defaults.gstin),
            utc_offset_minutes,
        };

        let tax_rates = TaxRates {
            gst: tax_rate(&get, "GST_RATE_BPS", DEFAULT_GST_RATE_BPS)?,
            vat: tax_rate(&get, "VAT_RATE_BPS", DEFAULT_VAT_RATE_BPS)?,
        };

        let config = StorefrontConfig {
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&get, "PORT", 5000)?,
            database_path: get("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./data/storefront.db")),
            jwt_secret,
            jwt_lifetime_secs: parse_or(&get, "JWT_LIFETIME_SECS", 86_400)?, // 24 hours
            uploads_dir: get("UPLOADS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./uploads")),
            max_upload_bytes: parse_or(&get, "MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?, // 10MB
            max_upload_files: parse_or(&get, "MAX_UPLOAD_FILES", 5)?,
            stripe_secret_key: get("STRIPE_SECRET_KEY"),
            stripe_api_base: get("STRIPE_API_BASE")
                .unwrap_or_else(|| "https://api.stripe.com".to_string()),
            admin,
            logo_path: get("LOGO_PATH").map(PathBuf::from),
            store,
            tax_rates,
        };

        if config.jwt_lifetime_secs <= 0 {
            return Err(ConfigError::InvalidValue("JWT_LIFETIME_SECS".to_string()));
        }
        if config.max_upload_files == 0 || config.max_upload_bytes == 0 {
            return Err(ConfigError::InvalidValue("MAX_UPLOAD_FILES/MAX_UPLOAD_BYTES".to_string()));
        }

        Ok(config)
    }

    /// `host:port` for the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Largest request body a product upload may send.
    pub fn upload_body_limit(&self) -> usize {
        // Text fields and multipart framing on top of the files
        self.max_upload_bytes
            .saturating_mul(self.max_upload_files)
            .saturating_add(1024 * 1024)
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

fn tax_rate<G>(get: &G, key: &str, default: u32) -> Result<TaxRate, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let bps: u32 = parse_or(get, key, default)?;
    validate_tax_rate_bps(bps).map_err(|_| ConfigError::InvalidValue(key.to_string()))?;
    Ok(TaxRate::from_bps(bps))
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<StorefrontConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        StorefrontConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();

        assert_eq!(config.port, 5000);
        assert_eq!(config.bind_address(), "0.0.0.0:5000");
        assert_eq!(config.jwt_lifetime_secs, 86_400);
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.max_upload_files, 5);
        assert!(config.stripe_secret_key.is_none());
        assert!(config.admin.is_none());
        assert_eq!(config.tax_rates.gst.bps(), 300);
        assert_eq!(config.tax_rates.vat.bps(), 1000);
        assert_eq!(config.store.utc_offset_minutes, 330);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("PORT", "8080"),
            ("STRIPE_SECRET_KEY", "sk_test_123"),
            ("STORE_ADDRESS", "12 Bazaar Road | Madurai |"),
            ("GST_RATE_BPS", "500"),
            ("ADMIN_EMAIL", "owner@store.in"),
            ("ADMIN_PASSWORD", "secret123"),
        ])
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.stripe_secret_key.as_deref(), Some("sk_test_123"));
        assert_eq!(config.store.address_lines, vec!["12 Bazaar Road", "Madurai"]);
        assert_eq!(config.tax_rates.gst.bps(), 500);
        assert_eq!(config.admin.unwrap().email, "owner@store.in");
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(load(&[("PORT", "http")]), Err(ConfigError::InvalidValue(_))));
        assert!(matches!(
            load(&[("STORE_UTC_OFFSET_MINUTES", "1440")]),
            Err(ConfigError::InvalidValue(_))
        ));
        assert!(matches!(
            load(&[("ADMIN_EMAIL", "owner@store.in")]),
            Err(ConfigError::MissingRequired(_))
        ));
        assert!(load(&[("VAT_RATE_BPS", "20000")]).is_err());
    }
}
