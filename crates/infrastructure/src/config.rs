//! Configuration loading.
//!
//! Non-secret settings come from a TOML file; credential material and
//! the state signing secret come from the environment so they never
//! land in a checked-in file.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Environment variable holding the OAuth client identifier.
const ENV_CLIENT_ID: &str = "LEDGERMARK_CLIENT_ID";
/// Environment variable holding the OAuth client secret.
const ENV_CLIENT_SECRET: &str = "LEDGERMARK_CLIENT_SECRET";
/// Environment variable holding the state token signing secret.
const ENV_STATE_SECRET: &str = "LEDGERMARK_STATE_SECRET";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// The config file did not parse as valid TOML.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    /// A required environment variable is absent or empty.
    #[error("missing required environment variable: {name}")]
    MissingEnv {
        /// Name of the absent variable.
        name: String,
    },
}

/// Identity provider settings.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    /// Authorization endpoint URL for the redirect flow.
    pub authorize_url: String,
    /// Callback URI registered with the provider.
    pub redirect_uri: String,
    /// Token endpoint URL.
    pub token_url: String,
    /// Device authorization endpoint URL.
    pub device_authorization_url: String,
    /// Userinfo endpoint for identity claims, when the provider has one.
    #[serde(default)]
    pub userinfo_url: Option<String>,
    /// Scopes to request.
    pub scopes: Vec<String>,
}

/// Ledger API settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// API root of the ledger system.
    pub base_url: String,
    /// Value stamped as `sync_system` on every mark-synced call.
    #[serde(default = "default_sync_system")]
    pub sync_system: String,
    /// Page size for the transaction listing.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_sync_system() -> String {
    "ledgermark".to_string()
}

const fn default_page_size() -> u32 {
    200
}

/// Audit export settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    /// Directory receiving audit CSV files.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> String {
    "exports".to_string()
}

/// Full application configuration parsed from the TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Identity provider settings.
    pub identity: IdentityConfig,
    /// Ledger API settings.
    pub ledger: LedgerConfig,
    /// Audit export settings.
    #[serde(default)]
    pub export: ExportConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns [`ConfigError::Io`] when the file cannot be read and
    /// [`ConfigError::Parse`] when it is not valid TOML.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from TOML text.
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] when the text is not valid TOML.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }
}

/// Credential material sourced from the environment.
#[derive(Clone)]
pub struct Secrets {
    /// OAuth client identifier.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
    /// Secret keying the state token signatures.
    pub state_signing_secret: String,
}

impl Secrets {
    /// Read secrets from the process environment.
    ///
    /// # Errors
    /// Returns [`ConfigError::MissingEnv`] naming the first absent or
    /// empty variable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read secrets through an arbitrary lookup function.
    ///
    /// # Errors
    /// Returns [`ConfigError::MissingEnv`] naming the first absent or
    /// empty variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |name: &str| -> Result<String, ConfigError> {
            match lookup(name) {
                Some(value) if !value.is_empty() => Ok(value),
                _ => Err(ConfigError::MissingEnv {
                    name: name.to_string(),
                }),
            }
        };
        Ok(Self {
            client_id: require(ENV_CLIENT_ID)?,
            client_secret: require(ENV_CLIENT_SECRET)?,
            state_signing_secret: require(ENV_STATE_SECRET)?,
        })
    }
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .field("state_signing_secret", &"[redacted]")
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"
        [identity]
        authorize_url = "https://id.example.com/oauth/authorize"
        redirect_uri = "https://app.example.com/callback"
        token_url = "https://id.example.com/oauth/token"
        device_authorization_url = "https://id.example.com/oauth/device"
        userinfo_url = "https://id.example.com/oauth/userinfo"
        scopes = ["accounting:read", "accounting:write"]

        [ledger]
        base_url = "https://ledger.example.com/api/v1"
    "#;

    #[test]
    fn test_parse_with_defaults() {
        let config = AppConfig::parse(SAMPLE).unwrap();

        assert_eq!(config.identity.scopes.len(), 2);
        assert_eq!(config.ledger.sync_system, "ledgermark");
        assert_eq!(config.ledger.page_size, 200);
        assert_eq!(config.export.output_dir, "exports");
    }

    #[test]
    fn test_parse_overrides() {
        let contents = format!(
            "{SAMPLE}\n[export]\noutput_dir = \"audit\"\n"
        );
        let config = AppConfig::parse(&contents).unwrap();
        assert_eq!(config.export.output_dir, "audit");
    }

    #[test]
    fn test_parse_rejects_missing_section() {
        let result = AppConfig::parse("[identity]\ntoken_url = \"x\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_secrets_from_lookup() {
        let secrets = Secrets::from_lookup(|name| match name {
            "LEDGERMARK_CLIENT_ID" => Some("client".to_string()),
            "LEDGERMARK_CLIENT_SECRET" => Some("secret".to_string()),
            "LEDGERMARK_STATE_SECRET" => Some("signing".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(secrets.client_id, "client");
    }

    #[test]
    fn test_secrets_missing_variable_is_named() {
        let result = Secrets::from_lookup(|name| {
            (name == "LEDGERMARK_CLIENT_ID").then(|| "client".to_string())
        });
        match result {
            Err(ConfigError::MissingEnv { name }) => {
                assert_eq!(name, "LEDGERMARK_CLIENT_SECRET");
            }
            other => panic!("expected MissingEnv, got {other:?}"),
        }
    }

    #[test]
    fn test_secrets_debug_redacts() {
        let secrets = Secrets {
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            state_signing_secret: "signing".to_string(),
        };
        let debug = format!("{secrets:?}");
        assert!(!debug.contains("secret\""));
        assert!(debug.contains("[redacted]"));
    }
}
