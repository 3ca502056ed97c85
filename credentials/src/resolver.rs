//! Ordered credential resolution with a process-lifetime cache.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use tracing::{debug, info};

use crate::error::{CredentialError, Result};
use crate::source::{CredentialSource, EnvSource, KeyringSource, PromptSource, SourceKind};

/// Resolves credentials by trying each configured source in order.
pub struct CredentialResolver {
    /// Sources, tried first to last.
    sources: Vec<Box<dyn CredentialSource>>,

    /// Values already resolved.
    cache: Mutex<HashMap<String, String>>,

    /// Whether values from non-env sources are written back to the environment.
    export_to_env: bool,
}

impl CredentialResolver {
    /// Create a resolver with no sources.
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            cache: Mutex::new(HashMap::new()),
            export_to_env: true,
        }
    }

    /// Build a resolver from configured source kinds.
    pub fn from_kinds(kinds: &[SourceKind], keyring_service: &str) -> Self {
        kinds.iter().fold(Self::new(), |resolver, kind| match kind {
            SourceKind::Env => resolver.with_source(EnvSource),
            SourceKind::Prompt => resolver.with_source(PromptSource::new()),
            SourceKind::Keyring => resolver.with_source(KeyringSource::new(keyring_service)),
        })
    }

    /// Append a source to the chain.
    pub fn with_source(mut self, source: impl CredentialSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Enable or disable writing resolved values back into the environment.
    pub fn with_export_to_env(mut self, enabled: bool) -> Self {
        self.export_to_env = enabled;
        self
    }

    /// Names of the configured sources, in order.
    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Resolve a credential.
    ///
    /// Blank values are treated as absent. Fails with
    /// [`CredentialError::Missing`] when no source has a value.
    pub fn resolve(&self, name: &str) -> Result<String> {
        if let Some(value) = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            return Ok(value.clone());
        }

        for source in &self.sources {
            let Some(value) = source.lookup(name)? else {
                continue;
            };
            if value.trim().is_empty() {
                debug!("{} returned a blank value for {name}", source.name());
                continue;
            }

            info!("Resolved credential {name} from {}", source.name());

            if self.export_to_env && source.name() != "env" {
                // SAFETY: credentials are resolved during startup, before the
                // process spawns threads that read the environment.
                unsafe { std::env::set_var(name, &value) };
            }

            self.cache
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(name.to_string(), value.clone());
            return Ok(value);
        }

        Err(CredentialError::Missing {
            name: name.to_string(),
        })
    }
}

impl Default for CredentialResolver {
    fn default() -> Self {
        Self::from_kinds(&[SourceKind::Env, SourceKind::Prompt], "semsearch")
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::source::StaticSource;
    use pretty_assertions::assert_eq;
    use serial_test::serial;

    struct CountingSource {
        calls: Arc<AtomicUsize>,
    }

    impl CredentialSource for CountingSource {
        fn name(&self) -> &str {
            "counting"
        }

        fn lookup(&self, _name: &str) -> Result<Option<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some("secret".to_string()))
        }
    }

    #[test]
    fn test_first_source_wins() {
        let resolver = CredentialResolver::new()
            .with_export_to_env(false)
            .with_source(StaticSource::new().with("KEY", "first"))
            .with_source(StaticSource::new().with("KEY", "second"));

        assert_eq!(resolver.resolve("KEY").unwrap(), "first");
    }

    #[test]
    fn test_value_is_cached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let resolver = CredentialResolver::new()
            .with_export_to_env(false)
            .with_source(CountingSource {
                calls: Arc::clone(&calls),
            });

        resolver.resolve("KEY").unwrap();
        resolver.resolve("KEY").unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_blank_value_falls_through() {
        let resolver = CredentialResolver::new()
            .with_export_to_env(false)
            .with_source(StaticSource::new().with("KEY", "   "))
            .with_source(StaticSource::new().with("KEY", "real"));

        assert_eq!(resolver.resolve("KEY").unwrap(), "real");
    }

    #[test]
    #[serial]
    fn test_missing_when_non_interactive() {
        let name = "SEMSEARCH_TEST_MISSING_CREDENTIAL";
        unsafe { std::env::remove_var(name) };

        let resolver = CredentialResolver::new()
            .with_source(EnvSource)
            .with_source(PromptSource::new().with_interactive(false));

        let err = resolver.resolve(name).unwrap_err();
        assert!(err.is_missing());
    }

    #[test]
    #[serial]
    fn test_env_source_and_export() {
        let read_name = "SEMSEARCH_TEST_ENV_CREDENTIAL";
        let export_name = "SEMSEARCH_TEST_EXPORTED_CREDENTIAL";
        unsafe {
            std::env::set_var(read_name, "from-env");
            std::env::remove_var(export_name);
        }

        let resolver = CredentialResolver::new()
            .with_source(EnvSource)
            .with_source(StaticSource::new().with(export_name, "from-static"));

        assert_eq!(resolver.resolve(read_name).unwrap(), "from-env");
        assert_eq!(resolver.resolve(export_name).unwrap(), "from-static");
        assert_eq!(std::env::var(export_name).unwrap(), "from-static");

        unsafe {
            std::env::remove_var(read_name);
            std::env::remove_var(export_name);
        }
    }

    #[test]
    fn test_from_kinds_order() {
        let resolver =
            CredentialResolver::from_kinds(&[SourceKind::Keyring, SourceKind::Env], "svc");
        assert_eq!(resolver.source_names(), vec!["keyring", "env"]);
    }
}
