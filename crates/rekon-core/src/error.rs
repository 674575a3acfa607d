//! Error types for the rekon-core library.

use thiserror::Error;

/// Main error type for the rekon library.
#[derive(Error, Debug)]
pub enum RekonError {
    /// Extraction pipeline error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Reconciliation error.
    #[error("reconciliation error: {0}")]
    Reconcile(#[from] ReconcileError),

    /// Directory enrichment error.
    #[error("directory error: {0}")]
    Match(#[from] MatchError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised while resolving vendors and extracting fields.
///
/// Per-document variants end up attached to a batch slot; profile-level
/// variants abort the run before any document is dispatched.
#[derive(Error, Debug, Clone)]
pub enum ExtractionError {
    /// A document referenced a vendor id absent from the registry.
    #[error("unknown vendor: {0}")]
    UnknownVendor(String),

    /// No registered signature pattern matched the document text.
    #[error("no vendor signature matched document {0}")]
    NoVendorMatched(String),

    /// Two profiles were registered under the same id.
    #[error("duplicate vendor id: {0}")]
    DuplicateVendorId(String),

    /// A profile carried a regex that failed to compile.
    #[error("invalid pattern for {vendor}/{field}: {source}")]
    PatternCompile {
        vendor: String,
        field: String,
        #[source]
        source: regex::Error,
    },

    /// The document source could not be read.
    #[error("source unreadable: {source_id}: {reason}")]
    SourceUnreadable { source_id: String, reason: String },
}

/// Errors related to GOLD reconciliation.
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// The GOLD reference file could not be loaded. Fatal.
    #[error("failed to load GOLD reference: {0}")]
    ReferenceLoad(String),

    /// The GOLD reference has no key column.
    #[error("GOLD reference has no columns")]
    EmptyReference,
}

/// Errors related to store directory enrichment.
#[derive(Error, Debug)]
pub enum MatchError {
    /// The store directory file could not be loaded. Fatal.
    #[error("failed to load store directory: {0}")]
    DirectoryLoad(String),
}

/// Result type for the rekon library.
pub type Result<T> = std::result::Result<T, RekonError>;
