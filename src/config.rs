use std::env;

pub const DEFAULT_FLUTTERWAVE_API_URL: &str = "https://api.flutterwave.com/v3";

/// Per-tier request rates for the public routes, in requests per minute.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub strict_rpm: u32,
    pub standard_rpm: u32,
    pub relaxed_rpm: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            strict_rpm: 10,
            standard_rpm: 30,
            relaxed_rpm: 60,
        }
    }
}

/// Runtime configuration, read once at startup and passed to components at
/// construction time. Nothing reads the environment after this.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    /// Origin allowed to call the API from a browser.
    pub frontend_origin: String,
    /// Server-side Flutterwave secret (bearer credential).
    pub flw_secret_key: String,
    /// Shared secret expected in the `verif-hash` webhook header.
    pub flw_webhook_hash: String,
    /// Client-exposed Flutterwave key. A `TEST` substring means sandbox mode.
    pub flw_public_key: String,
    /// Base URL of the Flutterwave API, overridable for tests.
    pub flw_api_url: String,
    /// Request timeout for outbound Flutterwave calls, in seconds.
    pub flw_timeout_secs: u64,
    pub rate_limit: RateLimitConfig,
    pub dev_mode: bool,
}

fn env_u32(name: &str, default: u32) -> u32 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("RAVEBILL_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "ravebill.db".to_string()),
            frontend_origin: env::var("FRONTEND_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            flw_secret_key: env::var("FLW_SECRET_KEY").unwrap_or_default(),
            flw_webhook_hash: env::var("FLW_WEBHOOK_HASH").unwrap_or_default(),
            flw_public_key: env::var("FLW_PUBLIC_KEY").unwrap_or_default(),
            flw_api_url: env::var("FLW_API_URL")
                .unwrap_or_else(|_| DEFAULT_FLUTTERWAVE_API_URL.to_string()),
            flw_timeout_secs: env::var("FLW_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(15),
            rate_limit: RateLimitConfig {
                strict_rpm: env_u32("RATE_LIMIT_STRICT_RPM", 10),
                standard_rpm: env_u32("RATE_LIMIT_STANDARD_RPM", 30),
                relaxed_rpm: env_u32("RATE_LIMIT_RELAXED_RPM", 60),
            },
            dev_mode,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Flutterwave's sandbox is detected by convention: test keys carry a
    /// `TEST` marker. Sandbox mode changes how customer emails are read back.
    pub fn is_test_mode(&self) -> bool {
        self.flw_public_key.contains("TEST")
    }
}
