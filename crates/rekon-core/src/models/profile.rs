//! Declarative vendor profile configuration.
//!
//! Profiles are authored as JSON and compiled into a [`crate::registry::VendorRegistry`]
//! before any document is processed. A profile describes one vendor's
//! invoice layout: a signature pattern for auto-detection and an ordered
//! list of field rules.

use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{RekonError, Result};

/// How a captured value is interpreted after extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    /// Plain text, trimmed.
    #[default]
    Text,
    /// Locale-aware decimal number (e.g. `1 234,56` or `1234.56`).
    Number,
    /// Calendar date, normalized to ISO.
    Date,
}

/// How multiple matches of one field pattern are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// Take the earliest match in document order.
    #[default]
    First,
    /// Parse every match as a number and add them.
    Sum,
    /// Join every match with `"; "`.
    Concat,
}

fn default_group() -> usize {
    1
}

/// A single field extraction rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldRule {
    /// Field name as it appears in records and reports.
    pub name: String,

    /// Primary regex. Must contain the capture group named by `group`.
    pub pattern: String,

    /// Alternative regexes tried in order when the primary finds nothing.
    #[serde(default)]
    pub fallbacks: Vec<String>,

    /// Capture group index holding the value (default: 1).
    #[serde(default = "default_group")]
    pub group: usize,

    /// Value type the capture is normalized into.
    #[serde(default)]
    pub value_type: ValueType,

    /// Whether absence of this field marks the record `Incomplete`.
    #[serde(default)]
    pub required: bool,

    /// Policy for combining multiple matches.
    #[serde(default)]
    pub aggregation: Aggregation,

    /// Per-field reconciliation tolerance for numeric comparison.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epsilon: Option<Decimal>,
}

fn default_store_field() -> String {
    "store".to_string()
}

/// One vendor's extraction rules. Immutable once registered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorProfile {
    /// Unique vendor identifier.
    pub vendor_id: String,

    /// Human-readable vendor name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Regex used to auto-detect this vendor from raw document text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,

    /// Ordered field rules.
    pub fields: Vec<FieldRule>,

    /// Field whose value keys this vendor's records during reconciliation.
    pub key_field: String,

    /// Field holding the store number used for email enrichment.
    #[serde(default = "default_store_field")]
    pub store_field: String,
}

impl VendorProfile {
    /// Display name, falling back to the vendor id.
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.vendor_id)
    }
}

/// A set of vendor profiles as loaded from configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileSet {
    pub vendors: Vec<VendorProfile>,
}

impl ProfileSet {
    /// Load a profile set from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| RekonError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Save a profile set to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| RekonError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
