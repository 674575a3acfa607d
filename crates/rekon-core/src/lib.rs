//! Core library for batch invoice verification.
//!
//! This crate provides:
//! - Vendor pattern registry (per-vendor regex rules, compiled at load)
//! - Per-document field extraction with fallback and aggregation policies
//! - Parallel batch orchestration with deterministic output ordering
//! - Reconciliation of extracted records against a trusted GOLD dataset
//! - Store directory email enrichment and consolidated report rendering
//!
//! The engine is a pure library: registry, GOLD reference, and store
//! directory are explicit immutable objects passed into each call. There
//! is no hidden global state, and each entry point is independently
//! composable.

pub mod batch;
pub mod directory;
pub mod error;
pub mod extract;
pub mod models;
pub mod reconcile;
pub mod registry;
pub mod report;

pub use batch::{submit_batch, BatchItem, BatchOptions, BatchOutcome, CancelToken};
pub use directory::{enrich, enrich_all, StoreDirectory};
pub use error::{ExtractionError, MatchError, ReconcileError, RekonError, Result};
pub use extract::apply;
pub use models::profile::{Aggregation, FieldRule, ProfileSet, ValueType, VendorProfile};
pub use models::record::{
    EmailStatus, EnrichedRecord, ExtractedRecord, FieldStatus, FieldValue, InvoiceDocument,
    RecordStatus,
};
pub use reconcile::{
    reconcile, FieldComparison, GoldReference, MatchClass, ReconcileOptions,
    ReconciliationResult,
};
pub use registry::{CompiledProfile, VendorRegistry};

use std::path::Path;

/// Load a profile configuration file and compile it into a registry.
///
/// Every pattern is validated here; a malformed regex aborts the run
/// before any document is processed.
pub fn load_profiles(path: &Path) -> Result<VendorRegistry> {
    let set = ProfileSet::from_file(path)?;
    VendorRegistry::from_profiles(set).map_err(RekonError::from)
}

/// Load the GOLD reference dataset.
pub fn load_gold(path: &Path) -> Result<GoldReference> {
    GoldReference::load(path).map_err(RekonError::from)
}

/// Load the store directory.
pub fn load_directory(path: &Path) -> Result<StoreDirectory> {
    StoreDirectory::load(path).map_err(RekonError::from)
}
