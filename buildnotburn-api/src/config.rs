/// Configuration management for the API server
///
/// Configuration comes from environment variables, with a `.env` file
/// loaded first when present (development).
///
/// # Environment Variables
///
/// ## Required
/// - `DATABASE_URL`: PostgreSQL connection string
/// - `JWT_SECRET`: Secret key for JWT signing (at least 32 characters)
///
/// ## Optional
/// - `API_HOST`: Server bind address (default: 0.0.0.0)
/// - `API_PORT`: Server port (default: 8080)
/// - `API_CORS_ORIGINS`: Comma-separated allowed origins (default: `*`)
/// - `API_PRODUCTION`: Enables HSTS and strict headers (default: false)
/// - `DATABASE_MAX_CONNECTIONS`: Max pool connections (default: 10)
/// - `APP_URL`: Public URL of the web app, used for checkout redirects
///   (default: http://localhost:9002)
///
/// ## Billing (each optional; missing values block only the feature that needs them)
/// - `STRIPE_SECRET_KEY`, `STRIPE_WEBHOOK_SECRET`
/// - `STRIPE_PRICE_ARCHITECT_MONTHLY`, `STRIPE_PRICE_ARCHITECT_ANNUAL`
/// - `LEMONSQUEEZY_API_KEY`, `LEMONSQUEEZY_STORE_ID`, `LEMONSQUEEZY_WEBHOOK_SECRET`
/// - `LEMONSQUEEZY_VARIANT_ARCHITECT_MONTHLY`, `LEMONSQUEEZY_VARIANT_ARCHITECT_ANNUAL`
/// - `LEMONSQUEEZY_NEWSLETTER_VARIANT_ID`
///
/// # Example
///
/// ```no_run
/// use buildnotburn_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Binding to {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,

    /// Public web app URL, without trailing slash
    pub app_url: String,

    pub billing: BillingConfig,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,

    /// Production mode (HSTS on)
    pub production: bool,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
}

#[derive(Debug, Clone, Default)]
pub struct BillingConfig {
    pub stripe: StripeConfig,
    pub lemonsqueezy: LemonSqueezyConfig,
}

#[derive(Debug, Clone, Default)]
pub struct StripeConfig {
    pub secret_key: Option<String>,
    pub webhook_secret: Option<String>,
    pub price_architect_monthly: Option<String>,
    pub price_architect_annual: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct LemonSqueezyConfig {
    pub api_key: Option<String>,
    pub store_id: Option<String>,
    pub webhook_secret: Option<String>,
    pub variant_architect_monthly: Option<String>,
    pub variant_architect_annual: Option<String>,
    pub newsletter_variant_id: Option<String>,
}

impl Config {
    /// Loads configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing, a number does not
    /// parse, or `JWT_SECRET` is shorter than 32 characters.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through `lookup` instead of the environment
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values count as unset
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let host = get("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = get("API_PORT")
            .unwrap_or_else(|| "8080".to_string())
            .parse::<u16>()
            .map_err(|e| anyhow::anyhow!("API_PORT is not a valid port: {}", e))?;

        let cors_origins = get("API_CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let production = get("API_PRODUCTION")
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let database_url = get("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = get("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|| "10".to_string())
            .parse::<u32>()
            .map_err(|e| anyhow::anyhow!("DATABASE_MAX_CONNECTIONS is not a number: {}", e))?;

        let jwt_secret = get("JWT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let app_url = get("APP_URL")
            .unwrap_or_else(|| "http://localhost:9002".to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            api: ApiConfig {
                host,
                port,
                cors_origins,
                production,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            jwt: JwtConfig { secret: jwt_secret },
            app_url,
            billing: BillingConfig {
                stripe: StripeConfig {
                    secret_key: get("STRIPE_SECRET_KEY"),
                    webhook_secret: get("STRIPE_WEBHOOK_SECRET"),
                    price_architect_monthly: get("STRIPE_PRICE_ARCHITECT_MONTHLY"),
                    price_architect_annual: get("STRIPE_PRICE_ARCHITECT_ANNUAL"),
                },
                lemonsqueezy: LemonSqueezyConfig {
                    api_key: get("LEMONSQUEEZY_API_KEY"),
                    store_id: get("LEMONSQUEEZY_STORE_ID"),
                    webhook_secret: get("LEMONSQUEEZY_WEBHOOK_SECRET"),
                    variant_architect_monthly: get("LEMONSQUEEZY_VARIANT_ARCHITECT_MONTHLY"),
                    variant_architect_annual: get("LEMONSQUEEZY_VARIANT_ARCHITECT_ANNUAL"),
                    newsletter_variant_id: get("LEMONSQUEEZY_NEWSLETTER_VARIANT_ID"),
                },
            },
        })
    }

    /// `host:port` for the listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Whether CORS accepts any origin
    pub fn allows_any_origin(&self) -> bool {
        self.api.cors_origins.iter().any(|origin| origin == "*")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("DATABASE_URL", "postgresql://localhost/bnb"), ("JWT_SECRET", SECRET)]).unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert!(config.allows_any_origin());
        assert!(!config.api.production);
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.app_url, "http://localhost:9002");
        assert!(config.billing.stripe.secret_key.is_none());
        assert!(config.billing.lemonsqueezy.newsletter_variant_id.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("DATABASE_URL", "postgresql://localhost/bnb"),
            ("JWT_SECRET", SECRET),
            ("API_PORT", "9000"),
            ("API_CORS_ORIGINS", "https://a.example, https://b.example"),
            ("API_PRODUCTION", "true"),
            ("APP_URL", "https://buildnotburn.app/"),
            ("STRIPE_SECRET_KEY", "sk_test_1"),
            ("LEMONSQUEEZY_STORE_ID", "  "),
        ])
        .unwrap();

        assert_eq!(config.api.port, 9000);
        assert_eq!(config.api.cors_origins, vec!["https://a.example", "https://b.example"]);
        assert!(!config.allows_any_origin());
        assert!(config.api.production);
        assert_eq!(config.app_url, "https://buildnotburn.app");
        assert_eq!(config.billing.stripe.secret_key.as_deref(), Some("sk_test_1"));
        assert!(config.billing.lemonsqueezy.store_id.is_none());
    }

    #[test]
    fn test_required_variables() {
        assert!(load(&[("JWT_SECRET", SECRET)]).is_err());
        assert!(load(&[("DATABASE_URL", "postgresql://localhost/bnb")]).is_err());
    }

    #[test]
    fn test_short_jwt_secret_rejected() {
        let err = load(&[("DATABASE_URL", "postgresql://localhost/bnb"), ("JWT_SECRET", "short")])
            .unwrap_err();
        assert!(err.to_string().contains("at least 32"));
    }
}
