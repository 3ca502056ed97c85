//! Credential sources.
//!
//! A source answers "do you have a value for this name?". Absence is
//! `Ok(None)`; only backend failures are errors.

use std::collections::HashMap;
use std::io::IsTerminal;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CredentialError, Result};
use crate::{ATLAS_CONNECTION_STRING, VOYAGE_API_KEY};

/// Which backend a source reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Process environment.
    Env,
    /// Hidden console input.
    Prompt,
    /// OS keyring.
    #[serde(alias = "vault")]
    Keyring,
}

impl FromStr for SourceKind {
    type Err = CredentialError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "env" => Ok(Self::Env),
            "prompt" => Ok(Self::Prompt),
            "keyring" | "vault" => Ok(Self::Keyring),
            other => Err(CredentialError::UnknownSource(other.to_string())),
        }
    }
}

/// A place credentials can be read from.
pub trait CredentialSource: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Look up `name`, returning `None` when this source has no value.
    fn lookup(&self, name: &str) -> Result<Option<String>>;
}

/// Reads credentials from the process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvSource;

impl CredentialSource for EnvSource {
    fn name(&self) -> &str {
        "env"
    }

    fn lookup(&self, name: &str) -> Result<Option<String>> {
        Ok(std::env::var(name).ok())
    }
}

/// Prompts on the console without echoing input.
///
/// When stdin is not a terminal the source reports no value instead of
/// blocking, so non-interactive runs fail fast with a missing credential.
#[derive(Debug, Clone)]
pub struct PromptSource {
    interactive: bool,
}

impl PromptSource {
    /// Create a prompt source, detecting whether stdin is a terminal.
    pub fn new() -> Self {
        Self {
            interactive: std::io::stdin().is_terminal(),
        }
    }

    /// Override terminal detection.
    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    /// Whether this source will actually prompt.
    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    fn prompt_label(name: &str) -> String {
        match name {
            ATLAS_CONNECTION_STRING => "Enter MongoDB connection string".to_string(),
            VOYAGE_API_KEY => "Enter Voyage AI API key".to_string(),
            other => format!("Enter {other}"),
        }
    }
}

impl Default for PromptSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialSource for PromptSource {
    fn name(&self) -> &str {
        "prompt"
    }

    fn lookup(&self, name: &str) -> Result<Option<String>> {
        if !self.interactive {
            debug!("stdin is not a terminal, not prompting for {name}");
            return Ok(None);
        }

        let value = dialoguer::Password::new()
            .with_prompt(Self::prompt_label(name))
            .allow_empty_password(true)
            .interact()
            .map_err(|e| CredentialError::Prompt {
                name: name.to_string(),
                message: e.to_string(),
            })?;

        Ok(Some(value))
    }
}

/// Reads credentials from the OS keyring.
///
/// Each credential is stored as an entry under `service` with the
/// credential name as the user.
#[derive(Debug, Clone)]
pub struct KeyringSource {
    service: String,
}

impl KeyringSource {
    /// Create a keyring source for the given service name.
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// The keyring service name.
    pub fn service(&self) -> &str {
        &self.service
    }
}

impl CredentialSource for KeyringSource {
    fn name(&self) -> &str {
        "keyring"
    }

    fn lookup(&self, name: &str) -> Result<Option<String>> {
        let keyring_err = |e: keyring::Error| CredentialError::Keyring {
            name: name.to_string(),
            message: e.to_string(),
        };

        let entry = keyring::Entry::new(&self.service, name).map_err(keyring_err)?;
        match entry.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(keyring_err(e)),
        }
    }
}

/// A fixed in-memory set of credentials.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    values: HashMap<String, String>,
}

impl StaticSource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a credential.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }
}

impl CredentialSource for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    fn lookup(&self, name: &str) -> Result<Option<String>> {
        Ok(self.values.get(name).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_source_kind_parses_vault_alias() {
        assert_eq!("vault".parse::<SourceKind>().unwrap(), SourceKind::Keyring);
        assert_eq!(" ENV ".parse::<SourceKind>().unwrap(), SourceKind::Env);
        assert!("ldap".parse::<SourceKind>().is_err());
    }

    #[test]
    fn test_non_interactive_prompt_returns_none() {
        let source = PromptSource::new().with_interactive(false);
        assert_eq!(source.lookup(VOYAGE_API_KEY).unwrap(), None);
    }

    #[test]
    fn test_static_source() {
        let source = StaticSource::new().with("A", "1");
        assert_eq!(source.lookup("A").unwrap(), Some("1".to_string()));
        assert_eq!(source.lookup("B").unwrap(), None);
    }
}
