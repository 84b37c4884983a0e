use std::env;

use auth::Environment;
use auth::KeyError;
use auth::SigningKey;
use config::Config as ConfigBuilder;
use config::ConfigError;
use config::Environment as EnvironmentSource;
use config::File;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_run_mode")]
    pub run_mode: String,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub jwt: JwtConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub http_port: u16,
}

#[derive(Deserialize, Clone)]
pub struct JwtConfig {
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default = "default_expiration_minutes")]
    pub expiration_minutes: i64,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("expiration_minutes", &self.expiration_minutes)
            .finish()
    }
}

fn default_run_mode() -> String {
    "development".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_expiration_minutes() -> i64 {
    30
}

impl Config {
    /// Load configuration from files with environment variable overrides
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (DATABASE__URL, JWT__SECRET, etc.)
    /// 2. Environment-specific config file (config/{RUN_MODE}.toml)
    /// 3. Default config file (config/default.toml)
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| default_run_mode());

        let configuration = ConfigBuilder::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Example: JWT__SECRET=... overrides jwt.secret
            .add_source(EnvironmentSource::default().separator("__"))
            .set_override("run_mode", run_mode)?
            .build()?;

        configuration.try_deserialize()
    }

    pub fn environment(&self) -> Environment {
        Environment::from_run_mode(&self.run_mode)
    }

    /// Signing key for this deployment.
    ///
    /// # Errors
    /// * `Missing` - No secret configured in production
    /// * `FallbackInProduction` - Production secret equals the development fallback
    pub fn signing_key(&self) -> Result<SigningKey, KeyError> {
        SigningKey::resolve(self.jwt.secret.as_deref(), self.environment())
    }

    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.jwt.expiration_minutes)
    }
}
