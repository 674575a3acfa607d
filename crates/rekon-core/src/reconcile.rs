//! GOLD reconciliation.
//!
//! Extracted records are joined against the trusted reference by each
//! vendor's configured key field and classified per field. Ambiguity is
//! reported, never silently resolved.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ReconcileError;
use crate::extract::normalize;
use crate::models::record::ExtractedRecord;
use crate::registry::VendorRegistry;

/// The trusted expected-value dataset, loaded once per run. Immutable.
#[derive(Debug, Clone, Default)]
pub struct GoldReference {
    // Rows in load order; the index maps key -> row position.
    rows: Vec<(String, BTreeMap<String, String>)>,
    index: HashMap<String, usize>,
    duplicates: HashMap<String, usize>,
}

impl GoldReference {
    /// Load from a CSV file. The first column is the reconciliation key;
    /// every other column is an expected field value.
    pub fn load(path: &Path) -> Result<Self, ReconcileError> {
        let mut reader = csv::Reader::from_path(path)
            .map_err(|e| ReconcileError::ReferenceLoad(format!("{}: {}", path.display(), e)))?;

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| ReconcileError::ReferenceLoad(e.to_string()))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        if headers.is_empty() {
            return Err(ReconcileError::EmptyReference);
        }

        let mut gold = Self::default();
        for result in reader.records() {
            let record =
                result.map_err(|e| ReconcileError::ReferenceLoad(e.to_string()))?;
            let key = record.get(0).unwrap_or("").trim().to_string();
            let mut fields = BTreeMap::new();
            for (header, value) in headers.iter().skip(1).zip(record.iter().skip(1)) {
                fields.insert(header.clone(), value.trim().to_string());
            }
            gold.push(key, fields);
        }

        debug!(rows = gold.len(), "loaded GOLD reference");
        Ok(gold)
    }

    /// Build from rows directly (tests, alternate loaders).
    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (String, BTreeMap<String, String>)>,
    {
        let mut gold = Self::default();
        for (key, fields) in rows {
            gold.push(key, fields);
        }
        gold
    }

    fn push(&mut self, key: String, fields: BTreeMap<String, String>) {
        if self.index.contains_key(&key) {
            warn!(%key, "duplicate key in GOLD reference");
            *self.duplicates.entry(key.clone()).or_insert(1) += 1;
        } else {
            self.index.insert(key.clone(), self.rows.len());
        }
        self.rows.push((key, fields));
    }

    /// Expected values for a key (first row when the key is duplicated).
    pub fn get(&self, key: &str) -> Option<&BTreeMap<String, String>> {
        self.index.get(key).map(|&i| &self.rows[i].1)
    }

    /// Whether the key appears more than once in the reference itself.
    pub fn is_duplicated(&self, key: &str) -> bool {
        self.duplicates.contains_key(key)
    }

    /// Unique keys in load order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        let mut seen = std::collections::HashSet::new();
        self.rows
            .iter()
            .map(|(k, _)| k.as_str())
            .filter(move |k| seen.insert(*k))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Per-field (and record-level) classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchClass {
    /// Values agree within tolerance / after normalization.
    Match,
    /// Both values present and disagreeing.
    Mismatch,
    /// Extracted but absent from GOLD.
    MissingInGold,
    /// Present in GOLD but never extracted.
    MissingInExtraction,
    /// The key is claimed by more than one record (or gold row).
    Ambiguous,
}

/// One field's comparison, with both observed values when applicable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldComparison {
    pub field: String,
    pub class: MatchClass,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
}

/// Reconciliation outcome for one key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationResult {
    /// Reconciliation key (empty when the record had no key field value).
    pub key: String,

    /// Source document, absent for `MissingInExtraction` rows.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,

    /// Record-level classification: `Match` when every compared field
    /// matches, `Mismatch` when any disagrees.
    pub class: MatchClass,

    /// Field-level comparisons, independent per field.
    pub fields: Vec<FieldComparison>,
}

/// Reconciliation tuning, owned by the caller.
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Numeric tolerance for fields without a per-field epsilon.
    pub default_epsilon: Decimal,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            default_epsilon: Decimal::ZERO,
        }
    }
}

/// Join extracted records against GOLD and classify every field.
///
/// Output order is deterministic: one result per record in record order,
/// then one `MissingInExtraction` result per leftover gold key in load
/// order. Invoking this twice with identical inputs yields an identical
/// sequence.
pub fn reconcile(
    registry: &VendorRegistry,
    records: &[ExtractedRecord],
    gold: &GoldReference,
    options: &ReconcileOptions,
) -> Vec<ReconciliationResult> {
    // Count key claims first so every holder of a duplicate key is
    // classified Ambiguous, none silently dropped.
    let mut claims: HashMap<String, usize> = HashMap::new();
    let keys: Vec<Option<String>> = records
        .iter()
        .map(|record| {
            let key = record_key(registry, record);
            if let Some(k) = &key {
                *claims.entry(k.clone()).or_insert(0) += 1;
            }
            key
        })
        .collect();

    let mut results = Vec::with_capacity(records.len());
    let mut seen_gold_keys: std::collections::HashSet<&str> = std::collections::HashSet::new();

    for (record, key) in records.iter().zip(&keys) {
        let result = match key {
            None => ReconciliationResult {
                key: String::new(),
                source_id: Some(record.source_id.clone()),
                class: MatchClass::MissingInGold,
                fields: observed_only(record, MatchClass::MissingInGold),
            },
            Some(key) => {
                if gold.get(key).is_some() {
                    seen_gold_keys.insert(key.as_str());
                }
                let ambiguous =
                    claims.get(key).copied().unwrap_or(0) > 1 || gold.is_duplicated(key);
                classify_record(registry, record, key, gold, options, ambiguous)
            }
        };
        results.push(result);
    }

    // Gold keys no record claimed.
    for key in gold.keys() {
        if seen_gold_keys.contains(key) {
            continue;
        }
        let expected = gold.get(key).expect("key comes from gold");
        results.push(ReconciliationResult {
            key: key.to_string(),
            source_id: None,
            class: MatchClass::MissingInExtraction,
            fields: expected
                .iter()
                .map(|(field, value)| FieldComparison {
                    field: field.clone(),
                    class: MatchClass::MissingInExtraction,
                    extracted: None,
                    expected: Some(value.clone()),
                })
                .collect(),
        });
    }

    debug!(results = results.len(), "reconciliation complete");
    results
}

fn record_key(registry: &VendorRegistry, record: &ExtractedRecord) -> Option<String> {
    let key_field = registry
        .lookup(&record.vendor_id)
        .map(|p| p.profile.key_field.clone())
        .ok()?;
    record.get(&key_field).map(|v| v.to_string())
}

fn classify_record(
    registry: &VendorRegistry,
    record: &ExtractedRecord,
    key: &str,
    gold: &GoldReference,
    options: &ReconcileOptions,
    ambiguous: bool,
) -> ReconciliationResult {
    // Ambiguity trumps everything else: every holder of a contested key
    // is reported, whether or not GOLD knows the key.
    if ambiguous {
        return ReconciliationResult {
            key: key.to_string(),
            source_id: Some(record.source_id.clone()),
            class: MatchClass::Ambiguous,
            fields: observed_only(record, MatchClass::Ambiguous),
        };
    }

    let Some(expected) = gold.get(key) else {
        return ReconciliationResult {
            key: key.to_string(),
            source_id: Some(record.source_id.clone()),
            class: MatchClass::MissingInGold,
            fields: observed_only(record, MatchClass::MissingInGold),
        };
    };

    let profile = registry.lookup(&record.vendor_id).ok();
    let mut fields = Vec::new();
    let mut class = MatchClass::Match;

    for (field, expected_value) in expected {
        let Some(extracted) = record.get(field) else {
            fields.push(FieldComparison {
                field: field.clone(),
                class: MatchClass::MissingInExtraction,
                extracted: None,
                expected: Some(expected_value.clone()),
            });
            continue;
        };

        let epsilon = profile
            .and_then(|p| {
                p.fields
                    .iter()
                    .find(|f| &f.rule.name == field)
                    .and_then(|f| f.rule.epsilon)
            })
            .unwrap_or(options.default_epsilon);

        let extracted_text = extracted.to_string();
        let field_class = if values_match(&extracted_text, expected_value, epsilon) {
            MatchClass::Match
        } else {
            class = MatchClass::Mismatch;
            MatchClass::Mismatch
        };

        fields.push(FieldComparison {
            field: field.clone(),
            class: field_class,
            extracted: Some(extracted_text),
            expected: Some(expected_value.clone()),
        });
    }

    // Extracted fields GOLD has no column for.
    for (field, value) in &record.fields {
        if expected.contains_key(field) {
            continue;
        }
        fields.push(FieldComparison {
            field: field.clone(),
            class: MatchClass::MissingInGold,
            extracted: Some(value.to_string()),
            expected: None,
        });
    }

    ReconciliationResult {
        key: key.to_string(),
        source_id: Some(record.source_id.clone()),
        class,
        fields,
    }
}

/// Numeric fields match within epsilon; everything else after case-folding
/// and whitespace normalization.
fn values_match(extracted: &str, expected: &str, epsilon: Decimal) -> bool {
    if let (Some(a), Some(b)) = (
        normalize::parse_decimal_exact(extracted),
        normalize::parse_decimal_exact(expected),
    ) {
        return (a - b).abs() <= epsilon;
    }
    normalize::fold_text(extracted) == normalize::fold_text(expected)
}

fn observed_only(record: &ExtractedRecord, class: MatchClass) -> Vec<FieldComparison> {
    record
        .fields
        .iter()
        .map(|(field, value)| FieldComparison {
            field: field.clone(),
            class,
            extracted: Some(value.to_string()),
            expected: None,
        })
        .collect()
}
