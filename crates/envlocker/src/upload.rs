//! Upload a `.env` file as a new secrets item

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use envlocker_secrets::{CreateItemOptions, FieldAssignment, Item, SecretBackend, SecretError};
use thiserror::Error;

use crate::names::is_injectable;

/// Errors from [`upload`]. Unlike resolution, uploading reports every failure.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Failed to read env file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse env file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },

    #[error("Failed to create item: {0}")]
    Backend(#[from] SecretError),
}

/// What to upload and where
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub file_path: PathBuf,
    pub title: String,
    pub vault: String,
    pub account: Option<String>,
    /// Defaults to `Server`
    pub category: Option<String>,
}

impl UploadRequest {
    pub fn new(
        file_path: impl Into<PathBuf>,
        title: impl Into<String>,
        vault: impl Into<String>,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            title: title.into(),
            vault: vault.into(),
            account: None,
            category: None,
        }
    }

    pub fn account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    fn create_options(&self) -> CreateItemOptions {
        CreateItemOptions::new(&self.title, &self.vault)
            .with_account(self.account.clone())
            .with_category(self.category.clone())
    }
}

/// Parse dotenv-style text into `(key, value)` pairs in file order.
///
/// A key that appears twice keeps its first position and its last value.
/// Values are taken literally: `$NAME` and `${NAME}` are never expanded.
pub fn parse_env_file(content: &str) -> Result<Vec<(String, String)>, dotenvy::Error> {
    let mut entries: Vec<(String, String)> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    let literal = escape_substitutions(content);
    for entry in dotenvy::from_read_iter(literal.as_bytes()) {
        let (key, value) = entry?;
        match positions.get(&key) {
            Some(&index) => entries[index].1 = value,
            None => {
                positions.insert(key.clone(), entries.len());
                entries.push((key, value));
            }
        }
    }

    Ok(entries)
}

/// Where a `$` would be read by dotenvy's value scanner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scan {
    Plain,
    AfterSpace,
    Escape,
    Double,
    DoubleEscape,
    Single,
    SingleEscape,
}

/// Escape every `$` that dotenvy would treat as a substitution.
///
/// Quote and escape tracking follows dotenvy's own line grouping, so
/// multi-line quoted values and trailing comments keep their meaning.
/// `$` inside single quotes or already escaped is left alone.
fn escape_substitutions(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut state = Scan::Plain;

    for line in content.split_inclusive('\n') {
        if state == Scan::Plain && line.trim_start().starts_with('#') {
            out.push_str(line);
            continue;
        }

        for (pos, c) in line.char_indices() {
            if c == '$' && matches!(state, Scan::Plain | Scan::AfterSpace | Scan::Double) {
                out.push('\\');
            }
            state = match (state, c) {
                (Scan::AfterSpace, '#') => {
                    // Trailing comment: dotenvy drops the rest of the line
                    out.push_str(&line[pos..]);
                    state = Scan::Plain;
                    break;
                }
                (Scan::Plain | Scan::AfterSpace, '\\') => Scan::Escape,
                (Scan::Plain | Scan::AfterSpace, '"') => Scan::Double,
                (Scan::Plain | Scan::AfterSpace, '\'') => Scan::Single,
                (Scan::Plain, c) if c.is_whitespace() && c != '\n' && c != '\r' => {
                    Scan::AfterSpace
                }
                (Scan::Plain | Scan::AfterSpace | Scan::Escape, _) => Scan::Plain,
                (Scan::Double, '\\') => Scan::DoubleEscape,
                (Scan::Double, '"') => Scan::Plain,
                (Scan::Double | Scan::DoubleEscape, _) => Scan::Double,
                (Scan::Single, '\\') => Scan::SingleEscape,
                (Scan::Single, '\'') => Scan::Plain,
                (Scan::Single | Scan::SingleEscape, _) => Scan::Single,
            };
            out.push(c);
        }
    }

    out
}

/// Turn env entries into concealed field assignments, dropping invalid ones
pub fn field_assignments<I>(entries: I) -> Vec<FieldAssignment>
where
    I: IntoIterator<Item = (String, String)>,
{
    entries
        .into_iter()
        .filter(|(key, value)| is_injectable(key, value))
        .map(|(key, value)| FieldAssignment::concealed(key, value))
        .collect()
}

/// Read the env file at `path` and build its field assignments
pub fn read_env_file(path: &Path) -> Result<Vec<FieldAssignment>, UploadError> {
    let content = std::fs::read_to_string(path).map_err(|source| UploadError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let entries = parse_env_file(&content).map_err(|source| UploadError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(field_assignments(entries))
}

/// Create a new item from an env file and return it
pub fn upload<B>(backend: &B, request: &UploadRequest) -> Result<Item, UploadError>
where
    B: SecretBackend + ?Sized,
{
    let fields = read_env_file(&request.file_path)?;
    let options = request.create_options();

    tracing::debug!(
        file = %request.file_path.display(),
        fields = fields.len(),
        backend = backend.name(),
        "Uploading env file"
    );

    let item = backend.create_item(&fields, &options)?;

    tracing::info!(
        title = %options.title,
        vault = %options.vault,
        id = item.id.as_deref(),
        "Created item"
    );

    Ok(item)
}
