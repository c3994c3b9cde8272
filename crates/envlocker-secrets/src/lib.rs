//! Secrets backend boundary for envlocker
//!
//! envlocker only needs two things from a password manager: fetch an item's
//! fields, and create a new item from a list of fields. This crate defines
//! that boundary as the [`SecretBackend`] trait and ships one implementation:
//!
//! - **1Password CLI** ([`OnePasswordCli`]): shells out to `op item get` /
//!   `op item create`. Requires `op` to be installed and signed in.
//! - **Memory** ([`MemoryBackend`]): items held in a map, every call recorded.
//!
//! # Example
//!
//! ```rust,ignore
//! use envlocker_secrets::{ItemLocator, OnePasswordCli, SecretBackend};
//!
//! let backend = OnePasswordCli::new();
//! let item = backend.get_item("my-app", &ItemLocator::default())?;
//! ```
//!
//! # Features
//!
//! - `onepassword` (default): Enable the 1Password CLI backend

mod backend;
mod backends;
mod error;
mod item;

pub use backend::{CreateItemOptions, ItemLocator, SecretBackend};
pub use error::SecretError;
pub use item::{FieldAssignment, FieldType, Item, ItemField, ItemVault, DEFAULT_CATEGORY};

pub use backends::memory::{CreateCall, GetCall, MemoryBackend};

#[cfg(feature = "onepassword")]
pub use backends::onepassword::{OnePasswordCli, OP_BIN_VAR};
