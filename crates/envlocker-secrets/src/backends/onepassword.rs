//! 1Password CLI backend
//!
//! Uses the `op` CLI tool to read and create items.
//! Requires 1Password CLI to be installed and authenticated.
//!
//! See: https://developer.1password.com/docs/cli

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Command;

use crate::backend::{CreateItemOptions, ItemLocator, SecretBackend};
use crate::error::SecretError;
use crate::item::{FieldAssignment, Item};

/// Overrides the `op` binary location
pub const OP_BIN_VAR: &str = "ENVLOCKER_OP_BIN";

const BACKEND: &str = "1password";

/// [`SecretBackend`] backed by the `op` command-line tool
#[derive(Debug, Clone)]
pub struct OnePasswordCli {
    program: PathBuf,
}

impl Default for OnePasswordCli {
    fn default() -> Self {
        Self::new()
    }
}

impl OnePasswordCli {
    /// Use `op` from `PATH`, or the binary named by `ENVLOCKER_OP_BIN`
    pub fn new() -> Self {
        let program = std::env::var_os(OP_BIN_VAR)
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| OsString::from("op"));
        Self::with_program(program)
    }

    /// Use a specific `op` binary
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn get_args(reference: &str, locator: &ItemLocator) -> Vec<String> {
        let mut args = vec![
            "item".to_string(),
            "get".to_string(),
            reference.to_string(),
            "--format".to_string(),
            "json".to_string(),
        ];
        if let Some(vault) = &locator.vault {
            args.push(format!("--vault={}", vault));
        }
        if let Some(account) = &locator.account {
            args.push(format!("--account={}", account));
        }
        args
    }

    fn create_args(fields: &[FieldAssignment], options: &CreateItemOptions) -> Vec<String> {
        let mut args = vec![
            "item".to_string(),
            "create".to_string(),
            "--format".to_string(),
            "json".to_string(),
            format!("--category={}", options.category),
            format!("--title={}", options.title),
            format!("--vault={}", options.vault),
        ];
        if let Some(account) = &options.account {
            args.push(format!("--account={}", account));
        }
        args.extend(fields.iter().map(FieldAssignment::to_statement));
        args
    }

    /// Run `op` and return its stdout. `subject` names the item in error messages.
    fn run(&self, args: &[String], subject: &str) -> Result<String, SecretError> {
        let output = Command::new(&self.program)
            .args(args)
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    SecretError::backend(
                        BACKEND,
                        format!(
                            "1Password CLI ('{}') not found. Install from https://1password.com/downloads/command-line/",
                            self.program.display()
                        ),
                    )
                } else {
                    SecretError::backend(BACKEND, format!("Failed to execute 'op' CLI: {}", e))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_failure(stderr.trim(), subject));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn parse_item(stdout: &str) -> Result<Item, SecretError> {
        serde_json::from_str(stdout).map_err(|e| SecretError::malformed(BACKEND, e))
    }
}

/// Map `op` stderr to a helpful error
fn classify_failure(stderr: &str, subject: &str) -> SecretError {
    if stderr.contains("not signed in")
        || stderr.contains("session expired")
        || stderr.contains("authorization prompt dismissed")
    {
        return SecretError::not_authenticated(
            BACKEND,
            "Run 'op signin' or 'eval $(op signin)'",
        );
    }

    if stderr.contains("isn't a vault") {
        return SecretError::NotFound(format!("1Password vault for '{}' not found", subject));
    }

    if stderr.contains("isn't an item") {
        return SecretError::NotFound(format!("1Password item '{}' not found", subject));
    }

    if stderr.is_empty() {
        return SecretError::backend(BACKEND, "op exited with a failure status");
    }

    SecretError::backend(BACKEND, stderr)
}

impl SecretBackend for OnePasswordCli {
    fn name(&self) -> &'static str {
        BACKEND
    }

    fn get_item(&self, reference: &str, locator: &ItemLocator) -> Result<Item, SecretError> {
        tracing::debug!(
            item = reference,
            vault = locator.vault.as_deref(),
            account = locator.account.as_deref(),
            "Fetching 1Password item"
        );

        let stdout = self.run(&Self::get_args(reference, locator), reference)?;
        Self::parse_item(&stdout)
    }

    fn create_item(
        &self,
        fields: &[FieldAssignment],
        options: &CreateItemOptions,
    ) -> Result<Item, SecretError> {
        tracing::debug!(
            title = %options.title,
            vault = %options.vault,
            category = %options.category,
            fields = fields.len(),
            "Creating 1Password item"
        );

        let stdout = self.run(&Self::create_args(fields, options), &options.title)?;
        Self::parse_item(&stdout)
    }
}
