//! The two operations envlocker needs from a secrets service

use crate::error::SecretError;
use crate::item::{FieldAssignment, Item, DEFAULT_CATEGORY};

/// Where to look for an item. Both parts are passed through as configured.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemLocator {
    pub account: Option<String>,
    pub vault: Option<String>,
}

/// Options for creating a new item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateItemOptions {
    pub title: String,
    pub vault: String,
    pub account: Option<String>,
    pub category: String,
}

impl CreateItemOptions {
    /// Options with the default category and no account
    pub fn new(title: impl Into<String>, vault: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            vault: vault.into(),
            account: None,
            category: DEFAULT_CATEGORY.to_string(),
        }
    }

    pub fn with_account(mut self, account: Option<String>) -> Self {
        self.account = account;
        self
    }

    /// Override the category; `None` keeps the current one
    pub fn with_category(mut self, category: Option<String>) -> Self {
        if let Some(category) = category {
            self.category = category;
        }
        self
    }
}

/// A pre-authenticated secrets service.
pub trait SecretBackend {
    /// Short name for logging/errors
    fn name(&self) -> &'static str;

    /// Fetch an item by reference (id or title)
    fn get_item(&self, reference: &str, locator: &ItemLocator) -> Result<Item, SecretError>;

    /// Create a new item holding the given fields and return it
    fn create_item(
        &self,
        fields: &[FieldAssignment],
        options: &CreateItemOptions,
    ) -> Result<Item, SecretError>;
}

impl<T: SecretBackend + ?Sized> SecretBackend for &T {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn get_item(&self, reference: &str, locator: &ItemLocator) -> Result<Item, SecretError> {
        (**self).get_item(reference, locator)
    }

    fn create_item(
        &self,
        fields: &[FieldAssignment],
        options: &CreateItemOptions,
    ) -> Result<Item, SecretError> {
        (**self).create_item(fields, options)
    }
}

impl<T: SecretBackend + ?Sized> SecretBackend for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn get_item(&self, reference: &str, locator: &ItemLocator) -> Result<Item, SecretError> {
        (**self).get_item(reference, locator)
    }

    fn create_item(
        &self,
        fields: &[FieldAssignment],
        options: &CreateItemOptions,
    ) -> Result<Item, SecretError> {
        (**self).create_item(fields, options)
    }
}
