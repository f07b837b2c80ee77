//! Configuration types for the RFB automation client.
//!
//! A [`Config`] is built once (from TOML, the command line or the builder)
//! and then passed by reference into every operation. Nothing here is global.

use crate::errors::RfbClientError;
use rfb_protocol::messages::types::{SECURITY_TYPE_NONE, SECURITY_TYPE_VNC_AUTH};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Complete client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Connection settings.
    pub connection: ConnectionConfig,
    /// Security settings.
    #[serde(default)]
    pub security: SecurityConfig,
    /// Session settings.
    #[serde(default)]
    pub session: SessionConfig,
}

/// Connection configuration.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Server hostname or IP address.
    pub host: String,
    /// Server port (typically 5900 + display number).
    #[serde(default = "default_port")]
    pub port: u16,
    /// VNC password (if required).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Timeout applied to the TCP connect and to every read/write, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

// Hand-written so the password never ends up in a log line.
impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

fn default_port() -> u16 {
    5900
}

fn default_timeout_ms() -> u64 {
    10_000
}

/// Which security types the negotiator is willing to accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncryptionPreference {
    /// No authentication only.
    Disabled,
    /// VNC password authentication when offered and a password is configured.
    #[default]
    PreferOn,
    /// No authentication when offered, otherwise VNC password authentication.
    PreferOff,
    /// VNC password authentication only.
    AlwaysOn,
}

impl EncryptionPreference {
    /// Security types to accept, most preferred first.
    ///
    /// VNC authentication is never listed without a password.
    #[must_use]
    pub fn acceptable_types(self, has_password: bool) -> Vec<u8> {
        let types: &[u8] = match self {
            Self::Disabled => &[SECURITY_TYPE_NONE],
            Self::PreferOn => &[SECURITY_TYPE_VNC_AUTH, SECURITY_TYPE_NONE],
            Self::PreferOff => &[SECURITY_TYPE_NONE, SECURITY_TYPE_VNC_AUTH],
            Self::AlwaysOn => &[SECURITY_TYPE_VNC_AUTH],
        };
        types
            .iter()
            .copied()
            .filter(|t| has_password || *t != SECURITY_TYPE_VNC_AUTH)
            .collect()
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::PreferOn => "prefer_on",
            Self::PreferOff => "prefer_off",
            Self::AlwaysOn => "always_on",
        }
    }
}

impl fmt::Display for EncryptionPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EncryptionPreference {
    type Err = RfbClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disabled" => Ok(Self::Disabled),
            "prefer_on" => Ok(Self::PreferOn),
            "prefer_off" => Ok(Self::PreferOff),
            "always_on" => Ok(Self::AlwaysOn),
            other => Err(RfbClientError::Config(format!(
                "unknown encryption preference '{other}' (expected disabled, prefer_on, prefer_off or always_on)"
            ))),
        }
    }
}

/// Security configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Which security types to accept.
    #[serde(default)]
    pub encryption: EncryptionPreference,
}

/// Session configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Shared-flag sent in ClientInit. When false the server may disconnect other viewers.
    #[serde(default = "default_true")]
    pub shared: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            shared: default_true(),
        }
    }
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig {
                host: String::new(),
                port: default_port(),
                password: None,
                timeout_ms: default_timeout_ms(),
            },
            security: SecurityConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

impl Config {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// A builder seeded with this configuration, for layering overrides.
    #[must_use]
    pub fn into_builder(self) -> ConfigBuilder {
        ConfigBuilder { config: self }
    }

    /// Parse a TOML document. The result is not validated yet.
    pub fn from_toml_str(content: &str) -> Result<Self, RfbClientError> {
        toml::from_str(content)
            .map_err(|e| RfbClientError::Config(format!("failed to parse config: {e}")))
    }

    /// Read and parse a TOML file. The result is not validated yet.
    pub fn from_toml_file(path: &Path) -> Result<Self, RfbClientError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RfbClientError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<(), RfbClientError> {
        if self.connection.host.trim().is_empty() {
            return Err(RfbClientError::Config("Host cannot be empty".to_string()));
        }

        if self.connection.port == 0 {
            return Err(RfbClientError::Config("Port cannot be 0".to_string()));
        }

        if self.connection.timeout_ms == 0 {
            return Err(RfbClientError::Config("Timeout cannot be 0".to_string()));
        }

        if self.security.encryption == EncryptionPreference::AlwaysOn
            && self.password().is_none()
        {
            return Err(RfbClientError::Config(
                "encryption 'always_on' requires a password".to_string(),
            ));
        }

        Ok(())
    }

    /// Returns the connect/read/write timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.connection.timeout_ms)
    }

    /// The configured password, treating an empty string as absent.
    #[must_use]
    pub fn password(&self) -> Option<&str> {
        self.connection
            .password
            .as_deref()
            .filter(|p| !p.is_empty())
    }

    /// Security types to accept during negotiation, most preferred first.
    #[must_use]
    pub fn acceptable_security_types(&self) -> Vec<u8> {
        self.security
            .encryption
            .acceptable_types(self.password().is_some())
    }

    /// `host:port`, for log lines and connect.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.connection.host, self.connection.port)
    }
}

/// Builder for creating a `Config`.
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Sets the server hostname or IP address.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.connection.host = host.into();
        self
    }

    /// Sets the server port.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.connection.port = port;
        self
    }

    /// Sets the VNC password.
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.connection.password = Some(password.into());
        self
    }

    /// Sets the connect/read/write timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.connection.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Sets the encryption preference.
    #[must_use]
    pub fn encryption(mut self, encryption: EncryptionPreference) -> Self {
        self.config.security.encryption = encryption;
        self
    }

    /// Sets the ClientInit shared flag.
    #[must_use]
    pub fn shared(mut self, shared: bool) -> Self {
        self.config.session.shared = shared;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> Result<Config, RfbClientError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
