//! Extracted record and enriched output models.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A document handed to the extraction engine.
///
/// Transient: consumed by extraction and discarded. The engine never
/// mutates it.
#[derive(Debug, Clone)]
pub struct InvoiceDocument {
    /// Source identifier (file path or name).
    pub source_id: String,

    /// Raw text pulled from the PDF by the external collaborator.
    pub text: String,

    /// Pre-assigned vendor id; when `None`, signature detection decides.
    pub vendor_id: Option<String>,
}

impl InvoiceDocument {
    pub fn new(source_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            text: text.into(),
            vendor_id: None,
        }
    }

    /// Pin the document to a known vendor, skipping signature detection.
    pub fn with_vendor(mut self, vendor_id: impl Into<String>) -> Self {
        self.vendor_id = Some(vendor_id.into());
        self
    }
}

/// A normalized extracted value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Number(Decimal),
    Date(NaiveDate),
}

impl FieldValue {
    /// Numeric view of the value, if it has one.
    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Date(d) => write!(f, "{}", d),
        }
    }
}

/// Per-field extraction status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldStatus {
    /// A single match was found and normalized.
    Found,
    /// The field is required and no pattern matched (or the value failed
    /// to normalize into its declared type).
    MissingRequired,
    /// Multiple matches were combined under the field's aggregation policy.
    Aggregated,
}

/// Overall record status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// Every required field was extracted.
    Complete,
    /// At least one required field is missing.
    Incomplete,
}

/// The result of applying one vendor profile to one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedRecord {
    /// Source identifier of the document this record came from.
    pub source_id: String,

    /// Vendor whose profile produced this record.
    pub vendor_id: String,

    /// Extracted field values, keyed by field name.
    pub fields: BTreeMap<String, FieldValue>,

    /// Per-field status for every rule in the profile that matched or was
    /// required.
    pub field_status: BTreeMap<String, FieldStatus>,

    /// Overall status.
    pub status: RecordStatus,

    /// Extraction warnings (type failures, out-of-range capture groups).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ExtractedRecord {
    /// Value of a field, if extracted.
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// Restrict the record to a chosen set of fields.
    ///
    /// Field selection is a post-hoc projection: extraction always runs
    /// every rule, and callers narrow the output afterwards. Statuses for
    /// dropped fields are dropped with them; the overall status is kept.
    pub fn project(&self, keep: &[&str]) -> ExtractedRecord {
        let mut projected = self.clone();
        projected.fields.retain(|name, _| keep.contains(&name.as_str()));
        projected
            .field_status
            .retain(|name, _| keep.contains(&name.as_str()));
        projected
    }
}

/// Outcome of the store directory lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailStatus {
    /// A directory entry was found and attached.
    Attached,
    /// The store number is not in the directory. Reportable, not fatal.
    NotFoundInDirectory,
    /// The record has no store-number field to look up.
    NoStoreNumber,
}

/// Final output row: extracted record plus directory email and its
/// reconciliation result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedRecord {
    /// The underlying extracted record.
    pub record: ExtractedRecord,

    /// Store contact email, when the directory had one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Directory lookup status.
    pub email_status: EmailStatus,

    /// Reconciliation result for this record's key, when reconciliation ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconciliation: Option<crate::reconcile::ReconciliationResult>,
}

impl EnrichedRecord {
    /// Attach a reconciliation result.
    pub fn with_reconciliation(
        mut self,
        result: crate::reconcile::ReconciliationResult,
    ) -> Self {
        self.reconciliation = Some(result);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn sample_record() -> ExtractedRecord {
        let mut fields = BTreeMap::new();
        fields.insert("invoice_no".to_string(), FieldValue::Text("4521".into()));
        fields.insert(
            "total".to_string(),
            FieldValue::Number(Decimal::from_str("120.50").unwrap()),
        );
        let mut field_status = BTreeMap::new();
        field_status.insert("invoice_no".to_string(), FieldStatus::Found);
        field_status.insert("total".to_string(), FieldStatus::Found);

        ExtractedRecord {
            source_id: "inv.pdf".to_string(),
            vendor_id: "acme".to_string(),
            fields,
            field_status,
            status: RecordStatus::Complete,
            warnings: Vec::new(),
        }
    }

    #[test]
    fn test_project_keeps_selected_fields() {
        let record = sample_record();
        let projected = record.project(&["total"]);

        assert_eq!(projected.fields.len(), 1);
        assert!(projected.get("total").is_some());
        assert!(projected.get("invoice_no").is_none());
        assert_eq!(projected.status, RecordStatus::Complete);
    }

    #[test]
    fn test_field_value_display() {
        assert_eq!(
            FieldValue::Number(Decimal::from_str("120.50").unwrap()).to_string(),
            "120.50"
        );
        assert_eq!(
            FieldValue::Date(NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()).to_string(),
            "2025-01-15"
        );
    }
}
