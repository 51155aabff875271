use anyhow::Context;
use std::env;
use std::time::Duration;

/// Runtime configuration, loaded from the environment at startup
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Port the HTTP server listens on (default: 5001)
    pub port: u16,

    /// Deployment environment label reported by /health (default: "development")
    pub environment: String,

    /// Database connection string (required)
    pub database_url: String,

    /// Pinning service API key; requests to the gateway fail without it
    pub pinata_api_key: Option<String>,

    /// Pinning service secret key; requests to the gateway fail without it
    pub pinata_secret_key: Option<String>,

    /// Pinning service upload endpoint
    pub pinata_api_url: String,

    /// Timeout for a single upstream pin attempt (default: 30s)
    pub pin_timeout: Duration,

    /// Additional pin attempts after the first failure (default: 2)
    pub pin_max_retries: u32,

    /// Base delay between pin attempts, scaled linearly (default: 1s)
    pub pin_retry_delay: Duration,

    /// Maximum accepted upload size in bytes (default: 100 MB)
    pub max_file_size: usize,

    /// Allowed CORS origins
    pub allowed_origins: Vec<String>,

    /// Rate limit window (default: 15 minutes)
    pub rate_limit_window: Duration,

    /// Requests allowed per client per window (default: 100)
    pub rate_limit_max_requests: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 5001,
            environment: "development".to_string(),
            database_url: "sqlite::memory:".to_string(),
            pinata_api_key: None,
            pinata_secret_key: None,
            pinata_api_url: "https://api.pinata.cloud/pinning/pinFileToIPFS".to_string(),
            pin_timeout: Duration::from_secs(30),
            pin_max_retries: 2,
            pin_retry_delay: Duration::from_secs(1),
            max_file_size: 100 * 1024 * 1024, // 100 MB
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(), // Vite default
                "http://127.0.0.1:3000".to_string(),
            ],
            rate_limit_window: Duration::from_secs(15 * 60),
            rate_limit_max_requests: 100,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// DATABASE_URL is mandatory; pinning credentials are not, but every
    /// gateway request fails until both are set.
    pub fn from_env() -> anyhow::Result<Self> {
        let default = Self::default();

        let database_url =
            env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

        Ok(Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.port),

            environment: env::var("APP_ENV").unwrap_or(default.environment),

            database_url,

            pinata_api_key: env::var("PINATA_API_KEY").ok().filter(|v| !v.is_empty()),

            pinata_secret_key: env::var("PINATA_SECRET_KEY").ok().filter(|v| !v.is_empty()),

            pinata_api_url: env::var("PINATA_API_URL").unwrap_or(default.pinata_api_url),

            pin_timeout: env::var("PIN_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(default.pin_timeout),

            pin_max_retries: env::var("PIN_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.pin_max_retries),

            pin_retry_delay: env::var("PIN_RETRY_DELAY_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(default.pin_retry_delay),

            max_file_size: env::var("MAX_FILE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_file_size),

            allowed_origins: env::var("ALLOWED_ORIGINS")
                .ok()
                .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(default.allowed_origins),

            rate_limit_window: env::var("RATE_LIMIT_WINDOW_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(default.rate_limit_window),

            rate_limit_max_requests: env::var("RATE_LIMIT_MAX_REQUESTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.rate_limit_max_requests),
        })
    }

    /// Config for tests and local development: in-memory database, fast
    /// retries, no real pinning credentials
    pub fn development() -> Self {
        Self {
            pin_retry_delay: Duration::from_millis(10),
            ..Self::default()
        }
    }
}
