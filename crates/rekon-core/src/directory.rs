//! Store directory enrichment.
//!
//! The directory maps store numbers to contact emails. A missing entry is
//! a reportable status on the record, never a batch failure.

use std::collections::HashMap;
use std::path::Path;

use tracing::debug;

use crate::error::MatchError;
use crate::models::record::{EmailStatus, EnrichedRecord, ExtractedRecord};
use crate::registry::VendorRegistry;

/// Store number -> email mapping, immutable per run.
#[derive(Debug, Clone, Default)]
pub struct StoreDirectory {
    entries: HashMap<String, String>,
}

impl StoreDirectory {
    /// Load from a CSV file whose first two columns are store number and
    /// email.
    pub fn load(path: &Path) -> Result<Self, MatchError> {
        let mut reader = csv::Reader::from_path(path)
            .map_err(|e| MatchError::DirectoryLoad(format!("{}: {}", path.display(), e)))?;

        let mut entries = HashMap::new();
        for result in reader.records() {
            let record = result.map_err(|e| MatchError::DirectoryLoad(e.to_string()))?;
            let (Some(store), Some(email)) = (record.get(0), record.get(1)) else {
                continue;
            };
            entries.insert(store.trim().to_string(), email.trim().to_string());
        }

        debug!(entries = entries.len(), "loaded store directory");
        Ok(Self { entries })
    }

    /// Build from pairs directly (tests, alternate loaders).
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// O(1) email lookup.
    pub fn get(&self, store: &str) -> Option<&str> {
        self.entries.get(store).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Attach the directory email for a record's store-number field.
pub fn enrich(
    record: ExtractedRecord,
    store_field: &str,
    directory: &StoreDirectory,
) -> EnrichedRecord {
    let (email, email_status) = match record.get(store_field) {
        None => (None, EmailStatus::NoStoreNumber),
        Some(store) => match directory.get(&store.to_string()) {
            Some(email) => (Some(email.to_string()), EmailStatus::Attached),
            None => (None, EmailStatus::NotFoundInDirectory),
        },
    };

    EnrichedRecord {
        record,
        email,
        email_status,
        reconciliation: None,
    }
}

/// Enrich a whole batch, resolving each record's store field from its
/// vendor profile.
pub fn enrich_all(
    registry: &VendorRegistry,
    records: impl IntoIterator<Item = ExtractedRecord>,
    directory: &StoreDirectory,
) -> Vec<EnrichedRecord> {
    records
        .into_iter()
        .map(|record| {
            let store_field = registry
                .lookup(&record.vendor_id)
                .map(|p| p.profile.store_field.clone())
                .unwrap_or_else(|_| "store".to_string());
            enrich(record, &store_field, directory)
        })
        .collect()
}
