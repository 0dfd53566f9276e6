use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub business_rules: BusinessRules,
    pub providers: ProviderSecrets,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    #[serde(default = "default_seat_lock_seconds")]
    pub seat_lock_seconds: u64,
    /// Providers do not replay indefinitely; markers may expire after this.
    #[serde(default = "default_event_retention_seconds")]
    pub webhook_event_retention_seconds: u64,
}

fn default_seat_lock_seconds() -> u64 {
    300
}

fn default_event_retention_seconds() -> u64 {
    60 * 60 * 24
}

/// Per-provider webhook signing secrets. Empty secret disables a provider:
/// its signature check can never pass.
#[derive(Debug, Deserialize, Clone)]
pub struct ProviderSecrets {
    #[serde(default)]
    pub flutterwave_secret: String,
    #[serde(default)]
    pub mtn_secret: String,
    #[serde(default)]
    pub airtel_secret: String,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(config::File::with_name("config/default"))
            // Layer the environment-specific file on top (optional)
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `TRANSITA__SERVER__PORT=8080`
            .add_source(config::Environment::with_prefix("TRANSITA").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
