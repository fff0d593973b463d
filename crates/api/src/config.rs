use chrono::{Duration, NaiveTime, Weekday};
use chrono_tz::Tz;
use domain::models::GameNightSchedule;
use domain::services::InvitationSettings;
use serde::Deserialize;
use shared::jwt::{JwtConfig, JwtError, DEFAULT_SESSION_EXPIRY_SECS};
use std::net::SocketAddr;
use uuid::Uuid;

/// Upper bound for `club.invitation_ttl_hours` (30 days).
pub const MAX_INVITATION_TTL_HOURS: i64 = 24 * 30;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    /// Session token verification
    pub jwt: JwtAuthConfig,
    pub club: ClubConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// Where reservations, invitations and profiles live.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Postgres,
    /// Process-local store, lost on restart. Development only.
    Memory,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl DatabaseConfig {
    pub fn pool_settings(&self) -> persistence::db::DatabaseConfig {
        persistence::db::DatabaseConfig {
            url: self.url.clone(),
            max_connections: self.max_connections,
            min_connections: self.min_connections,
            connect_timeout_secs: self.connect_timeout_secs,
            idle_timeout_secs: self.idle_timeout_secs,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecurityConfig {
    /// Allowed browser origins. Empty means any origin.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_request_timeout() -> u64 {
    30
}
fn default_max_connections() -> u32 {
    20
}
fn default_min_connections() -> u32 {
    2
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_idle_timeout() -> u64 {
    600
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtAuthConfig {
    /// RSA public key (PEM) of the identity provider. Takes precedence over
    /// `secret` when both are set.
    #[serde(default)]
    pub public_key: String,

    /// Shared HS256 project secret, for providers that sign that way.
    #[serde(default)]
    pub secret: String,

    /// Leeway in seconds for clock skew tolerance (default: 30)
    #[serde(default = "default_jwt_leeway")]
    pub leeway_secs: u64,
}

fn default_jwt_leeway() -> u64 {
    30
}

impl JwtAuthConfig {
    /// Builds the verifier used for every request.
    pub fn verifier(&self) -> Result<JwtConfig, JwtError> {
        if !self.public_key.is_empty() {
            JwtConfig::from_rsa_public_key(&self.public_key, self.leeway_secs)
        } else if !self.secret.is_empty() {
            Ok(JwtConfig::from_secret(
                &self.secret,
                DEFAULT_SESSION_EXPIRY_SECS,
                self.leeway_secs,
            ))
        } else {
            Err(JwtError::InvalidKey(
                "either jwt.public_key or jwt.secret must be set".to_string(),
            ))
        }
    }
}

/// Club-specific settings: who owns it and when it plays.
#[derive(Debug, Clone, Deserialize)]
pub struct ClubConfig {
    /// Profile with unrestricted role management.
    #[serde(default)]
    pub owner_id: Option<Uuid>,

    /// Weekday of the game night, e.g. "thu" or "Thursday".
    #[serde(default = "default_weekday")]
    pub weekday: String,

    /// Local start time, "HH:MM".
    #[serde(default = "default_start_time")]
    pub start_time: String,

    #[serde(default = "default_booking_window_days")]
    pub booking_window_days: i64,

    /// IANA time zone of the club, e.g. "Europe/Berlin".
    #[serde(default = "default_timezone")]
    pub timezone: String,

    #[serde(default = "default_invitation_ttl_hours")]
    pub invitation_ttl_hours: i64,

    /// Origin of the web app, used in invitation links.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
}

fn default_weekday() -> String {
    "thu".to_string()
}
fn default_start_time() -> String {
    "18:00".to_string()
}
fn default_booking_window_days() -> i64 {
    domain::models::schedule::DEFAULT_BOOKING_WINDOW_DAYS
}
fn default_timezone() -> String {
    "UTC".to_string()
}
fn default_invitation_ttl_hours() -> i64 {
    domain::services::invitation::DEFAULT_INVITATION_TTL_HOURS
}
fn default_public_base_url() -> String {
    "http://localhost:3000".to_string()
}

impl ClubConfig {
    pub fn schedule(&self) -> Result<GameNightSchedule, ConfigValidationError> {
        let weekday: Weekday = self.weekday.trim().parse().map_err(|_| {
            ConfigValidationError::InvalidValue(format!("club.weekday: {}", self.weekday))
        })?;
        let start_time = NaiveTime::parse_from_str(self.start_time.trim(), "%H:%M").map_err(
            |_| ConfigValidationError::InvalidValue(format!("club.start_time: {}", self.start_time)),
        )?;

        let timezone: Tz = self.timezone.trim().parse().map_err(|_| {
            ConfigValidationError::InvalidValue(format!("club.timezone: {}", self.timezone))
        })?;

        GameNightSchedule::new(weekday, start_time, self.booking_window_days, timezone)
            .map_err(ConfigValidationError::InvalidValue)
    }

    pub fn invitation_settings(&self) -> InvitationSettings {
        let hours = self
            .invitation_ttl_hours
            .clamp(1, MAX_INVITATION_TTL_HOURS);
        InvitationSettings {
            ttl: Duration::hours(hours),
            base_url: self.public_base_url.clone(),
        }
    }
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. config/default.toml
    /// 2. config/local.toml (optional, not in git)
    /// 3. Environment variables with GN__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("GN").separator("__"))
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Builds a config from embedded defaults plus `overrides`, without
    /// touching the file system or the environment.
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = r#"
            [server]
            host = "127.0.0.1"
            port = 8080
            request_timeout_secs = 30

            [storage]
            backend = "memory"

            [database]
            url = ""

            [logging]
            level = "info"
            format = "json"

            [security]
            cors_origins = []

            [jwt]
            secret = "test-secret-for-session-tokens-0000"
            leeway_secs = 0

            [club]
            weekday = "thu"
            start_time = "18:00"
            booking_window_days = 6
            timezone = "UTC"
            invitation_ttl_hours = 24
            public_base_url = "http://localhost:3000"
        "#;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        builder.build()?.try_deserialize()
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.storage.backend == StorageBackend::Postgres && self.database.url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "GN__DATABASE__URL environment variable must be set".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "Server port cannot be 0".to_string(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigValidationError::InvalidValue(
                "min_connections cannot exceed max_connections".to_string(),
            ));
        }

        if self.jwt.public_key.is_empty() && self.jwt.secret.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "GN__JWT__PUBLIC_KEY or GN__JWT__SECRET must be set".to_string(),
            ));
        }

        if !(1..=MAX_INVITATION_TTL_HOURS).contains(&self.club.invitation_ttl_hours) {
            return Err(ConfigValidationError::InvalidValue(format!(
                "club.invitation_ttl_hours must be between 1 and {}",
                MAX_INVITATION_TTL_HOURS
            )));
        }

        self.club.schedule().map(|_| ())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigValidationError> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|_| {
                ConfigValidationError::InvalidValue(format!(
                    "Invalid socket address {}:{}",
                    self.server.host, self.server.port
                ))
            })
    }
}
