//! Configuration structures for directory clients.
//!
//! [`DirectoryConfig`] describes how to reach and authenticate against the directory
//! server, and which DNS domain its naming context is rooted at.

use crate::Error;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use url::Url;
use validator::{Validate, ValidationError};

/// Default connection timeout (seconds).
pub const DEFAULT_CONNECTION_TIMEOUT_SECS: u64 = 10;
/// Default operation timeout (seconds).
pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 10;

/// DNS domain the directory naming context is rooted at (e.g. `example.com`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Domain(String);

impl Domain {
    /// Parses a dot-separated domain name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if the domain is empty or has an empty label.
    pub fn parse(input: impl AsRef<str>) -> Result<Self, Error> {
        let trimmed = input.as_ref().trim().trim_end_matches('.');
        validate_domain(trimmed)
            .map_err(|_| Error::ConfigError(format!("invalid domain `{}`", input.as_ref())))?;
        Ok(Self(trimmed.to_string()))
    }

    /// Borrows the domain name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the directory base DN for this domain (`dc=example,dc=com`).
    #[must_use]
    pub fn base_dn(&self) -> String {
        self.0
            .split('.')
            .map(|label| format!("dc={label}"))
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Domain {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl<'de> Deserialize<'de> for Domain {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

fn validate_domain(domain: &str) -> Result<(), ValidationError> {
    if domain.is_empty() || domain.split('.').any(|label| label.trim().is_empty()) {
        return Err(ValidationError::new("domain"));
    }
    Ok(())
}

fn validate_domain_field(domain: &Domain) -> Result<(), ValidationError> {
    validate_domain(domain.as_str())
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

/// Configuration for connecting to the directory server.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DirectoryConfig {
    /// LDAP endpoint URL (`ldap://` or `ldaps://`)
    #[validate(url)]
    pub url: String,

    /// Domain the naming context is rooted at
    #[validate(custom(function = "validate_domain_field"))]
    pub domain: Domain,

    /// DN used for the administrative bind
    pub bind_dn: String,

    /// Password for the administrative bind
    #[serde(skip_serializing, deserialize_with = "deserialize_secret")]
    pub bind_password: SecretString,

    /// Whether to verify TLS certificates
    #[serde(default = "default_tls_verify")]
    pub tls_verify: bool,

    /// Optional path to custom CA certificate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_ca_cert: Option<PathBuf>,

    /// Connection timeout in seconds
    #[validate(range(min = 1, max = 300))]
    #[serde(default = "default_connection_timeout_secs")]
    pub connection_timeout_secs: u64,

    /// Per-operation timeout in seconds
    #[validate(range(min = 1, max = 300))]
    #[serde(default = "default_operation_timeout_secs")]
    pub operation_timeout_secs: u64,
}

const fn default_tls_verify() -> bool {
    true
}

const fn default_connection_timeout_secs() -> u64 {
    DEFAULT_CONNECTION_TIMEOUT_SECS
}

const fn default_operation_timeout_secs() -> u64 {
    DEFAULT_OPERATION_TIMEOUT_SECS
}

impl DirectoryConfig {
    /// Create a new directory configuration with required parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL or domain is invalid.
    pub fn new(
        url: impl Into<String>,
        domain: impl AsRef<str>,
        bind_dn: impl Into<String>,
        bind_password: impl Into<String>,
    ) -> Result<Self, Error> {
        let url = url.into();
        Url::parse(&url)?;

        let config = Self {
            url,
            domain: Domain::parse(domain)?,
            bind_dn: bind_dn.into(),
            bind_password: SecretString::from(bind_password.into()),
            tls_verify: default_tls_verify(),
            tls_ca_cert: None,
            connection_timeout_secs: default_connection_timeout_secs(),
            operation_timeout_secs: default_operation_timeout_secs(),
        };

        config
            .validate()
            .map_err(|e| Error::ConfigError(format!("Invalid configuration: {e}")))?;

        Ok(config)
    }

    /// Loads and validates a configuration from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed or fails validation.
    pub fn from_json(document: &str) -> Result<Self, Error> {
        let config: Self = serde_json::from_str(document)?;
        Url::parse(&config.url)?;
        config.validate()?;
        Ok(config)
    }

    /// Returns the directory endpoint URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the configured domain.
    #[must_use]
    pub const fn domain(&self) -> &Domain {
        &self.domain
    }

    /// Get the LDAP bind DN.
    #[must_use]
    pub fn bind_dn(&self) -> &str {
        &self.bind_dn
    }

    /// Get the LDAP bind password.
    #[must_use]
    pub fn bind_password(&self) -> &str {
        self.bind_password.expose_secret()
    }

    /// Returns whether TLS certificate verification is enabled.
    #[must_use]
    pub const fn tls_verify(&self) -> bool {
        self.tls_verify
    }

    /// Optional custom CA certificate path.
    #[must_use]
    pub fn tls_ca_cert(&self) -> Option<&PathBuf> {
        self.tls_ca_cert.as_ref()
    }

    /// Returns the connection timeout duration.
    #[must_use]
    pub const fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    /// Returns the operation timeout duration.
    #[must_use]
    pub const fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }

    /// Enables or disables TLS certificate verification.
    #[must_use]
    pub const fn with_tls_verification(mut self, verify: bool) -> Self {
        self.tls_verify = verify;
        self
    }

    /// Sets the custom CA certificate path for TLS verification.
    #[must_use]
    pub fn with_tls_ca_cert(mut self, path: PathBuf) -> Self {
        self.tls_ca_cert = Some(path);
        self
    }

    /// Overrides the connection timeout in seconds.
    #[must_use]
    pub const fn with_connection_timeout_secs(mut self, seconds: u64) -> Self {
        self.connection_timeout_secs = seconds;
        self
    }

    /// Overrides the operation timeout in seconds.
    #[must_use]
    pub const fn with_operation_timeout_secs(mut self, seconds: u64) -> Self {
        self.operation_timeout_secs = seconds;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DirectoryConfig {
        DirectoryConfig::new(
            "ldaps://dc1.example.com",
            "example.com",
            "cn=admin,dc=example,dc=com",
            "secret",
        )
        .unwrap()
    }

    #[test]
    fn test_domain_base_dn() {
        let domain = Domain::parse("corp.example.com").unwrap();
        assert_eq!(domain.base_dn(), "dc=corp,dc=example,dc=com");
    }

    #[test]
    fn test_domain_trailing_dot() {
        let domain = Domain::parse("example.com.").unwrap();
        assert_eq!(domain.as_str(), "example.com");
    }

    #[test]
    fn test_domain_rejects_empty_label() {
        assert!(Domain::parse("").is_err());
        assert!(Domain::parse("example..com").is_err());
    }

    #[test]
    fn test_config_new_defaults() {
        let config = sample();
        assert_eq!(config.url(), "ldaps://dc1.example.com");
        assert_eq!(config.domain().base_dn(), "dc=example,dc=com");
        assert_eq!(config.bind_password(), "secret");
        assert!(config.tls_verify());
        assert_eq!(
            config.operation_timeout(),
            Duration::from_secs(DEFAULT_OPERATION_TIMEOUT_SECS)
        );
    }

    #[test]
    fn test_config_invalid_url() {
        let result = DirectoryConfig::new("not a url", "example.com", "cn=admin", "pw");
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }

    #[test]
    fn builder_overrides() {
        let config = sample()
            .with_connection_timeout_secs(20)
            .with_operation_timeout_secs(30)
            .with_tls_verification(false)
            .with_tls_ca_cert(PathBuf::from("/etc/ssl/ca.pem"));

        assert_eq!(config.connection_timeout(), Duration::from_secs(20));
        assert_eq!(config.operation_timeout(), Duration::from_secs(30));
        assert!(!config.tls_verify());
        assert_eq!(config.tls_ca_cert(), Some(&PathBuf::from("/etc/ssl/ca.pem")));
    }

    #[test]
    fn test_config_from_json() {
        let config = DirectoryConfig::from_json(
            r#"{
                "url": "ldap://localhost:389",
                "domain": "example.com",
                "bind_dn": "cn=admin,dc=example,dc=com",
                "bind_password": "hunter2",
                "operation_timeout_secs": 5
            }"#,
        )
        .unwrap();

        assert_eq!(config.domain().as_str(), "example.com");
        assert_eq!(config.bind_password(), "hunter2");
        assert_eq!(config.operation_timeout(), Duration::from_secs(5));
        assert_eq!(
            config.connection_timeout(),
            Duration::from_secs(DEFAULT_CONNECTION_TIMEOUT_SECS)
        );
    }

    #[test]
    fn test_config_from_json_rejects_timeout_out_of_range() {
        let result = DirectoryConfig::from_json(
            r#"{
                "url": "ldap://localhost:389",
                "domain": "example.com",
                "bind_dn": "cn=admin",
                "bind_password": "pw",
                "operation_timeout_secs": 0
            }"#,
        );
        assert!(matches!(result, Err(Error::ValidationError(_))));
    }

    #[test]
    fn test_config_serialization_hides_password() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert!(!json.contains("secret"));
        assert!(json.contains("example.com"));
    }
}
