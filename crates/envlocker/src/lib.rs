//! Inject secrets from a password manager into a process environment
//!
//! Two routines make up envlocker:
//!
//! - [`resolve`]: read `.envlockerrc`, fetch the item configured for the
//!   active environment, and merge its fields into a [`TargetStore`] without
//!   overwriting anything already set. Best-effort: it never fails, it
//!   returns a [`Resolution`] saying what happened.
//! - [`upload`]: read a `.env` file and create a new item from it, one
//!   concealed field per variable. Every failure is reported.
//!
//! Only keys made of `0-9`, `A-Z` and `_` with non-empty values take part in
//! either direction.
//!
//! # Example
//!
//! ```rust,ignore
//! use envlocker::{resolve, ProcessEnv, ResolveOptions};
//! use envlocker_secrets::OnePasswordCli;
//!
//! let resolution = resolve(&OnePasswordCli::new(), &mut ProcessEnv, &ResolveOptions::new());
//! ```

pub mod config;
mod names;
mod resolver;
mod store;
mod upload;

pub use config::{
    ConfigError, EnvironmentEntry, EnvironmentMapping, CONFIG_FILE_NAME, DEFAULT_ENV_NAME,
    ENV_NAME_VAR,
};
pub use names::{is_env_var_name, is_injectable};
pub use resolver::{filter_fields, resolve, Resolution, ResolveOptions, SkipReason};
pub use store::{merge, MergeReport, ProcessEnv, TargetStore};
pub use upload::{field_assignments, parse_env_file, read_env_file, upload, UploadError, UploadRequest};
