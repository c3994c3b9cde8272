//! In-memory backend
//!
//! Keeps items in a map and records every call. Useful as a test double and
//! for dry runs.

use parking_lot::Mutex;

use crate::backend::{CreateItemOptions, ItemLocator, SecretBackend};
use crate::error::SecretError;
use crate::item::{FieldAssignment, Item, ItemField, ItemVault};

/// A recorded `get_item` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetCall {
    pub reference: String,
    pub locator: ItemLocator,
}

/// A recorded `create_item` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCall {
    pub fields: Vec<FieldAssignment>,
    pub options: CreateItemOptions,
}

#[derive(Debug, Default)]
struct State {
    items: Vec<Item>,
    gets: Vec<GetCall>,
    creates: Vec<CreateCall>,
    fail_with: Option<String>,
}

/// [`SecretBackend`] that stores items in memory
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an item. It can be fetched by its id or its title.
    pub fn with_item(self, item: Item) -> Self {
        self.state.lock().items.push(item);
        self
    }

    /// Seed an item titled `reference` with the given `(label, value)` fields
    pub fn with_fields<'a>(
        self,
        reference: &str,
        fields: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        let fields = fields
            .into_iter()
            .map(|(label, value)| ItemField::new(label, value))
            .collect();
        self.with_item(Item {
            title: Some(reference.to_string()),
            fields: Some(fields),
            ..Item::default()
        })
    }

    /// Make every subsequent call fail with a backend error
    pub fn failing(self, message: impl Into<String>) -> Self {
        self.state.lock().fail_with = Some(message.into());
        self
    }

    /// All `get_item` calls so far
    pub fn get_calls(&self) -> Vec<GetCall> {
        self.state.lock().gets.clone()
    }

    /// All `create_item` calls so far
    pub fn create_calls(&self) -> Vec<CreateCall> {
        self.state.lock().creates.clone()
    }

    fn matches(item: &Item, reference: &str) -> bool {
        item.id.as_deref() == Some(reference) || item.title.as_deref() == Some(reference)
    }
}

impl SecretBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn get_item(&self, reference: &str, locator: &ItemLocator) -> Result<Item, SecretError> {
        let mut state = self.state.lock();
        state.gets.push(GetCall {
            reference: reference.to_string(),
            locator: locator.clone(),
        });

        if let Some(message) = &state.fail_with {
            return Err(SecretError::backend("memory", message.clone()));
        }

        state
            .items
            .iter()
            .rev()
            .find(|item| Self::matches(item, reference))
            .cloned()
            .ok_or_else(|| SecretError::NotFound(format!("item '{}' not found", reference)))
    }

    fn create_item(
        &self,
        fields: &[FieldAssignment],
        options: &CreateItemOptions,
    ) -> Result<Item, SecretError> {
        let mut state = self.state.lock();
        state.creates.push(CreateCall {
            fields: fields.to_vec(),
            options: options.clone(),
        });

        if let Some(message) = &state.fail_with {
            return Err(SecretError::backend("memory", message.clone()));
        }

        let item = Item {
            id: Some(format!("mem-{}", state.items.len() + 1)),
            title: Some(options.title.clone()),
            category: Some(options.category.clone()),
            vault: Some(ItemVault {
                id: None,
                name: Some(options.vault.clone()),
            }),
            fields: Some(
                fields
                    .iter()
                    .map(|field| ItemField {
                        field_type: Some(field.field_type.as_str().to_uppercase()),
                        ..ItemField::new(field.label.clone(), field.value.clone())
                    })
                    .collect(),
            ),
        };
        state.items.push(item.clone());
        Ok(item)
    }
}
