use ipguard_core::settings::IpRestrictionSettings;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Graceful shutdown timeout in seconds (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Optional webhook URL for outbound event delivery. When unset, the
    /// delivery worker is not started.
    pub event_webhook_url: Option<String>,
    /// Geolocation provider base URL (default: `http://ip-api.com/json`).
    pub geo_provider_url: String,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`| `30`                       |
    /// | `EVENT_WEBHOOK_URL`    | unset                      |
    /// | `GEO_PROVIDER_URL`     | `http://ip-api.com/json`   |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let event_webhook_url = std::env::var("EVENT_WEBHOOK_URL").ok().filter(|s| !s.is_empty());

        let geo_provider_url = std::env::var("GEO_PROVIDER_URL")
            .unwrap_or_else(|_| "http://ip-api.com/json".into());

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            event_webhook_url,
            geo_provider_url,
        }
    }
}

/// Load the initial [`IpRestrictionSettings`] from the environment.
///
/// Reads the optional `IP_RESTRICTION_SETTINGS` env var as a JSON document
/// (partial documents are fine, the rest falls back to defaults), validates
/// it, and panics on malformed input so misconfiguration fails fast at
/// startup. Later changes go through the settings endpoints.
pub fn load_ip_restriction_settings() -> IpRestrictionSettings {
    let mut settings = match std::env::var("IP_RESTRICTION_SETTINGS") {
        Ok(raw) => serde_json::from_str(&raw)
            .expect("IP_RESTRICTION_SETTINGS must be valid settings JSON"),
        Err(_) => IpRestrictionSettings::default(),
    };

    settings
        .validate()
        .expect("IP_RESTRICTION_SETTINGS failed validation");

    settings
}
