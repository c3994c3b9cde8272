//! Item and field types exchanged with a secrets backend

use std::fmt;

use serde::{Deserialize, Serialize};

/// Category used for new items when the caller does not pick one
pub const DEFAULT_CATEGORY: &str = "Server";

/// A secret record as returned by the backend.
///
/// Every key is optional: the backend may omit any of them and unknown keys
/// are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vault: Option<ItemVault>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<ItemField>>,
}

impl Item {
    /// Fields of the item, or `None` when the item carries no field list or an empty one
    pub fn non_empty_fields(&self) -> Option<&[ItemField]> {
        self.fields.as_deref().filter(|fields| !fields.is_empty())
    }
}

/// Vault reference embedded in an item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemVault {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A single labelled value inside an item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemField {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
}

impl ItemField {
    /// Build a field with just a label and a value
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            value: Some(value.into()),
            ..Self::default()
        }
    }

    /// Label, treating a missing label as empty
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or_default()
    }

    /// Value, treating a missing value as empty
    pub fn value(&self) -> &str {
        self.value.as_deref().unwrap_or_default()
    }
}

/// Field types that can be assigned when creating an item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Hidden by default in the backend's UI
    Concealed,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Concealed => "concealed",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `(label, type, value)` triple submitted when creating an item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldAssignment {
    pub label: String,
    pub field_type: FieldType,
    pub value: String,
}

impl FieldAssignment {
    /// Create a concealed field assignment
    pub fn concealed(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            field_type: FieldType::Concealed,
            value: value.into(),
        }
    }

    /// Borrow the assignment as a `(label, type, value)` tuple
    pub fn as_tuple(&self) -> (&str, &str, &str) {
        (&self.label, self.field_type.as_str(), &self.value)
    }

    /// Render as a CLI assignment statement: `label[type]=value`.
    ///
    /// `.`, `=` and `\` in the label are backslash-escaped.
    pub fn to_statement(&self) -> String {
        let mut label = String::with_capacity(self.label.len());
        for c in self.label.chars() {
            if matches!(c, '.' | '=' | '\\') {
                label.push('\\');
            }
            label.push(c);
        }
        format!("{}[{}]={}", label, self.field_type, self.value)
    }
}
