//! Best-effort injection of an item's fields into a target store
//!
//! Resolution never fails. Anything that goes wrong (no mapping file, no
//! entry for the environment, backend unavailable, item without fields)
//! turns into [`Resolution::Skipped`] and the target store is left untouched.

use std::collections::BTreeMap;
use std::path::PathBuf;

use envlocker_secrets::{ItemField, SecretBackend};

use crate::config::{env_name_from_process, ConfigError, EnvironmentMapping};
use crate::names::is_injectable;
use crate::store::{merge, MergeReport, TargetStore};

/// Inputs to [`resolve`]
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Environment to load. Falls back to `ENVLOCKER_ENV_NAME`, then `development`.
    pub env_name: Option<String>,

    /// Directory holding `.envlockerrc`. Defaults to the current directory.
    pub base_dir: Option<PathBuf>,
}

impl ResolveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn env_name(mut self, env_name: impl Into<String>) -> Self {
        self.env_name = Some(env_name.into());
        self
    }

    pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }
}

/// Why nothing was injected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SkipReason {
    #[error("config file unreadable: {0}")]
    ConfigUnreadable(String),

    #[error("config file malformed: {0}")]
    ConfigMalformed(String),

    #[error("no entry for environment '{0}'")]
    MissingEnvironment(String),

    #[error("environment '{0}' has no item reference")]
    MissingItemReference(String),

    #[error("fetching item '{item}' failed: {message}")]
    FetchFailed { item: String, message: String },

    #[error("item '{0}' has no fields")]
    MissingFields(String),
}

impl From<ConfigError> for SkipReason {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Read { .. } => SkipReason::ConfigUnreadable(err.to_string()),
            ConfigError::Parse { .. } => SkipReason::ConfigMalformed(err.to_string()),
        }
    }
}

/// Outcome of [`resolve`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Fields were merged; lists the keys written and the keys already present
    Applied(MergeReport),

    /// Nothing happened
    Skipped(SkipReason),
}

impl Resolution {
    pub fn is_applied(&self) -> bool {
        matches!(self, Resolution::Applied(_))
    }

    /// Keys written to the target store
    pub fn injected(&self) -> &[String] {
        match self {
            Resolution::Applied(report) => &report.injected,
            Resolution::Skipped(_) => &[],
        }
    }

    pub fn skip_reason(&self) -> Option<&SkipReason> {
        match self {
            Resolution::Applied(_) => None,
            Resolution::Skipped(reason) => Some(reason),
        }
    }
}

/// Keep the fields that form valid assignments.
///
/// A field is kept when its label is a valid variable name and its value is
/// non-empty. When several kept fields share a label the last one wins.
pub fn filter_fields(fields: &[ItemField]) -> BTreeMap<String, String> {
    fields
        .iter()
        .filter(|field| is_injectable(field.label(), field.value()))
        .map(|field| (field.label().to_string(), field.value().to_string()))
        .collect()
}

/// Fetch the configured item and merge its fields into `target`.
///
/// Existing keys in `target` are never overwritten.
pub fn resolve<B, S>(backend: &B, target: &mut S, options: &ResolveOptions) -> Resolution
where
    B: SecretBackend + ?Sized,
    S: TargetStore + ?Sized,
{
    match try_resolve(backend, options) {
        Ok(values) => {
            let report = merge(target, values);
            tracing::info!(
                injected = report.injected.len(),
                preserved = report.preserved.len(),
                "Injected secrets"
            );
            Resolution::Applied(report)
        }
        Err(reason) => {
            tracing::debug!(%reason, "Skipping secret injection");
            Resolution::Skipped(reason)
        }
    }
}

/// Everything up to (not including) the merge, so a failure cannot touch the store
fn try_resolve<B>(
    backend: &B,
    options: &ResolveOptions,
) -> Result<BTreeMap<String, String>, SkipReason>
where
    B: SecretBackend + ?Sized,
{
    let env_name = env_name_from_process(options.env_name.as_deref());

    let base_dir = match &options.base_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()
            .map_err(|e| SkipReason::ConfigUnreadable(format!("no current directory: {}", e)))?,
    };

    let mapping = EnvironmentMapping::load_from_dir(&base_dir)?;

    let entry = mapping
        .entry(&env_name)
        .map_err(|e| SkipReason::ConfigMalformed(format!("entry '{}': {}", env_name, e)))?
        .ok_or_else(|| SkipReason::MissingEnvironment(env_name.clone()))?;

    let reference = entry
        .item_reference()
        .ok_or_else(|| SkipReason::MissingItemReference(env_name.clone()))?;

    tracing::debug!(
        env = %env_name,
        item = reference,
        backend = backend.name(),
        "Resolving secrets"
    );

    let item = backend
        .get_item(reference, &entry.locator())
        .map_err(|e| {
            tracing::warn!(item = reference, error = %e, "Failed to fetch secrets item");
            SkipReason::FetchFailed {
                item: reference.to_string(),
                message: e.to_string(),
            }
        })?;

    let fields = item
        .non_empty_fields()
        .ok_or_else(|| SkipReason::MissingFields(reference.to_string()))?;

    Ok(filter_fields(fields))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::Path;

    use envlocker_secrets::{Item, ItemLocator, MemoryBackend};

    use crate::config::ENV_NAME_VAR;
    use crate::store::ProcessEnv;

    fn write_config(dir: &Path, content: &str) {
        std::fs::write(dir.join(".envlockerrc"), content).unwrap();
    }

    fn sample_backend(reference: &str) -> MemoryBackend {
        MemoryBackend::new().with_fields(
            reference,
            [("FOO", "bar"), ("baz", "qux"), ("BAZ", "QUX")],
        )
    }

    fn expected_sample() -> HashMap<String, String> {
        HashMap::from([
            ("FOO".to_string(), "bar".to_string()),
            ("BAZ".to_string(), "QUX".to_string()),
        ])
    }

    /// Run with the override variable unset so tests don't depend on the caller's env
    fn resolve_isolated(
        backend: &MemoryBackend,
        target: &mut HashMap<String, String>,
        options: &ResolveOptions,
    ) -> Resolution {
        temp_env::with_var_unset(ENV_NAME_VAR, || resolve(backend, target, options))
    }

    #[test]
    fn test_injects_valid_fields() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), r#"{ "development": { "item": "development-item" } }"#);
        let backend = sample_backend("development-item");

        let mut target: HashMap<String, String> = HashMap::new();
        let options = ResolveOptions::new().env_name("development").base_dir(dir.path());
        let resolution = resolve_isolated(&backend, &mut target, &options);

        assert!(resolution.is_applied());
        assert_eq!(target, expected_sample());
        assert_eq!(backend.get_calls()[0].reference, "development-item");
    }

    #[test]
    fn test_defaults_to_development() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), r#"{ "development": { "item": "development-item" } }"#);
        let backend = sample_backend("development-item");

        let mut target: HashMap<String, String> = HashMap::new();
        let resolution =
            resolve_isolated(&backend, &mut target, &ResolveOptions::new().base_dir(dir.path()));

        assert!(resolution.is_applied());
        assert_eq!(target, expected_sample());
    }

    #[test]
    fn test_arbitrary_environment() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), r#"{ "arbitrary": { "item": "arbitrary-item" } }"#);
        let backend = sample_backend("arbitrary-item");

        let mut target: HashMap<String, String> = HashMap::new();
        let options = ResolveOptions::new().env_name("arbitrary").base_dir(dir.path());
        resolve_isolated(&backend, &mut target, &options);

        assert_eq!(target, expected_sample());
    }

    #[test]
    fn test_passes_vault_and_account() {
        let dir = tempfile::tempdir().unwrap();
        write_config(
            dir.path(),
            r#"{ "development": { "item": "development-item", "vault": "vault-name", "account": "account-name" } }"#,
        );
        let backend = sample_backend("development-item");

        let mut target: HashMap<String, String> = HashMap::new();
        let options = ResolveOptions::new().env_name("development").base_dir(dir.path());
        resolve_isolated(&backend, &mut target, &options);

        assert_eq!(
            backend.get_calls()[0].locator,
            ItemLocator {
                account: Some("account-name".to_string()),
                vault: Some("vault-name".to_string()),
            }
        );
    }

    #[test]
    fn test_filters_out_variables_and_values() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), r#"{ "development": { "item": "development-item" } }"#);
        let backend = MemoryBackend::new().with_fields(
            "development-item",
            [
                ("", "bar"),
                ("baz", ""),
                ("HAS SOME SPACES", "QUX"),
                ("Mixed", "v"),
                ("EMPTY", ""),
            ],
        );

        let mut target: HashMap<String, String> = HashMap::new();
        let options = ResolveOptions::new().base_dir(dir.path());
        let resolution = resolve_isolated(&backend, &mut target, &options);

        assert!(target.is_empty());
        assert!(resolution.injected().is_empty());
    }

    #[test]
    fn test_fields_without_label_or_value() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), r#"{ "development": { "item": "development-item" } }"#);
        let backend = MemoryBackend::new().with_item(Item {
            title: Some("development-item".to_string()),
            fields: Some(vec![
                ItemField::default(),
                ItemField {
                    label: Some("FOO".to_string()),
                    ..ItemField::default()
                },
                ItemField::new("OK", "yes"),
            ]),
            ..Item::default()
        });

        let mut target: HashMap<String, String> = HashMap::new();
        resolve_isolated(&backend, &mut target, &ResolveOptions::new().base_dir(dir.path()));

        assert_eq!(target, HashMap::from([("OK".to_string(), "yes".to_string())]));
    }

    #[test]
    fn test_never_overwrites_existing_keys() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), r#"{ "development": { "item": "development-item" } }"#);
        let backend = sample_backend("development-item");

        let mut target = HashMap::from([("FOO".to_string(), "already-set".to_string())]);
        let resolution =
            resolve_isolated(&backend, &mut target, &ResolveOptions::new().base_dir(dir.path()));

        assert_eq!(target["FOO"], "already-set");
        assert_eq!(target["BAZ"], "QUX");
        assert_eq!(
            resolution,
            Resolution::Applied(MergeReport {
                injected: vec!["BAZ".to_string()],
                preserved: vec!["FOO".to_string()],
            })
        );
    }

    #[test]
    fn test_missing_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let backend = sample_backend("development-item");

        let mut target: HashMap<String, String> = HashMap::new();
        let resolution =
            resolve_isolated(&backend, &mut target, &ResolveOptions::new().base_dir(dir.path()));

        assert!(target.is_empty());
        assert!(backend.get_calls().is_empty());
        assert!(matches!(
            resolution.skip_reason(),
            Some(SkipReason::ConfigUnreadable(_))
        ));
    }

    #[test]
    fn test_config_not_json() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), "not json");
        let backend = sample_backend("development-item");

        let mut target: HashMap<String, String> = HashMap::new();
        let resolution =
            resolve_isolated(&backend, &mut target, &ResolveOptions::new().base_dir(dir.path()));

        assert!(target.is_empty());
        assert!(backend.get_calls().is_empty());
        assert!(matches!(
            resolution.skip_reason(),
            Some(SkipReason::ConfigMalformed(_))
        ));
    }

    #[test]
    fn test_environment_missing_from_config() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), r#"{ "development": { "item": "development-item" } }"#);
        let backend = sample_backend("development-item");

        let mut target: HashMap<String, String> = HashMap::new();
        let options = ResolveOptions::new().env_name("arbitrary").base_dir(dir.path());
        let resolution = resolve_isolated(&backend, &mut target, &options);

        assert!(target.is_empty());
        assert!(backend.get_calls().is_empty());
        assert_eq!(
            resolution,
            Resolution::Skipped(SkipReason::MissingEnvironment("arbitrary".to_string()))
        );
    }

    #[test]
    fn test_item_missing_from_config() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), r#"{ "development": {} }"#);
        let backend = sample_backend("development-item");

        let mut target: HashMap<String, String> = HashMap::new();
        let resolution =
            resolve_isolated(&backend, &mut target, &ResolveOptions::new().base_dir(dir.path()));

        assert!(target.is_empty());
        assert!(backend.get_calls().is_empty());
        assert_eq!(
            resolution,
            Resolution::Skipped(SkipReason::MissingItemReference("development".to_string()))
        );
    }

    #[test]
    fn test_item_without_fields() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), r#"{ "development": { "item": "development-item" } }"#);
        let backend = MemoryBackend::new().with_item(Item {
            title: Some("development-item".to_string()),
            ..Item::default()
        });

        let mut target: HashMap<String, String> = HashMap::new();
        let resolution =
            resolve_isolated(&backend, &mut target, &ResolveOptions::new().base_dir(dir.path()));

        assert!(target.is_empty());
        assert_eq!(backend.get_calls().len(), 1);
        assert!(matches!(
            resolution.skip_reason(),
            Some(SkipReason::MissingFields(_))
        ));
    }

    #[test]
    fn test_backend_failure_is_absorbed() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), r#"{ "development": { "item": "development-item" } }"#);
        let backend = MemoryBackend::new().failing("not signed in");

        let mut target: HashMap<String, String> = HashMap::new();
        let resolution =
            resolve_isolated(&backend, &mut target, &ResolveOptions::new().base_dir(dir.path()));

        assert!(target.is_empty());
        assert!(matches!(
            resolution.skip_reason(),
            Some(SkipReason::FetchFailed { .. })
        ));
    }

    #[test]
    fn test_uses_env_name_variable() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), r#"{ "staging": { "item": "the staging item name" } }"#);
        let backend = MemoryBackend::new().with_item(Item {
            title: Some("the staging item name".to_string()),
            ..Item::default()
        });

        let mut target: HashMap<String, String> = HashMap::new();
        temp_env::with_var(ENV_NAME_VAR, Some("staging"), || {
            resolve(&backend, &mut target, &ResolveOptions::new().base_dir(dir.path()))
        });

        let calls = backend.get_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].reference, "the staging item name");
    }

    #[test]
    fn test_explicit_env_name_beats_variable() {
        let dir = tempfile::tempdir().unwrap();
        write_config(
            dir.path(),
            r#"{ "staging": { "item": "staging-item" }, "production": { "item": "production-item" } }"#,
        );
        let backend = sample_backend("production-item");

        let mut target: HashMap<String, String> = HashMap::new();
        let options = ResolveOptions::new().env_name("production").base_dir(dir.path());
        temp_env::with_var(ENV_NAME_VAR, Some("staging"), || {
            resolve(&backend, &mut target, &options)
        });

        assert_eq!(backend.get_calls()[0].reference, "production-item");
        assert_eq!(target, expected_sample());
    }

    #[test]
    fn test_sibling_config_keys_do_not_block_injection() {
        let dir = tempfile::tempdir().unwrap();
        write_config(
            dir.path(),
            r#"{ "$schema": "https://example.com/envlockerrc.json", "development": { "item": "development-item" } }"#,
        );
        let backend = sample_backend("development-item");

        let mut target: HashMap<String, String> = HashMap::new();
        let resolution =
            resolve_isolated(&backend, &mut target, &ResolveOptions::new().base_dir(dir.path()));

        assert!(resolution.is_applied());
        assert_eq!(target, expected_sample());
    }

    #[test]
    fn test_mistyped_entry_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), r#"{ "development": { "item": 42 } }"#);
        let backend = sample_backend("development-item");

        let mut target: HashMap<String, String> = HashMap::new();
        let resolution =
            resolve_isolated(&backend, &mut target, &ResolveOptions::new().base_dir(dir.path()));

        assert!(backend.get_calls().is_empty());
        assert!(matches!(
            resolution.skip_reason(),
            Some(SkipReason::ConfigMalformed(_))
        ));
    }

    #[test]
    fn test_nul_values_are_skipped_for_process_env() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), r#"{ "development": { "item": "development-item" } }"#);
        let backend = MemoryBackend::new().with_fields(
            "development-item",
            [
                ("ENVLOCKER_RESOLVER_NUL", "a\0b"),
                ("ENVLOCKER_RESOLVER_OK", "fine"),
            ],
        );

        temp_env::with_vars(
            [
                (ENV_NAME_VAR, None::<&str>),
                ("ENVLOCKER_RESOLVER_NUL", None),
                ("ENVLOCKER_RESOLVER_OK", None),
            ],
            || {
                let options = ResolveOptions::new().base_dir(dir.path());
                let resolution = resolve(&backend, &mut ProcessEnv, &options);

                assert_eq!(resolution.injected(), ["ENVLOCKER_RESOLVER_OK".to_string()]);
                assert!(std::env::var_os("ENVLOCKER_RESOLVER_NUL").is_none());
                assert_eq!(std::env::var("ENVLOCKER_RESOLVER_OK").unwrap(), "fine");
            },
        );
    }

    #[test]
    fn test_filter_fields_last_wins() {
        let fields = vec![
            ItemField::new("FOO", "first"),
            ItemField::new("FOO", "second"),
            ItemField::new("FOO", ""),
        ];
        let filtered = filter_fields(&fields);
        assert_eq!(filtered.get("FOO").map(String::as_str), Some("second"));
    }
}
