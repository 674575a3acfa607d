//! Parallel batch orchestration.
//!
//! Documents fan out across a fixed-size rayon pool; workers may finish
//! out of order, and completions are reassembled into submission order so
//! batch output is deterministic regardless of scheduling. One document's
//! failure fills its own slot and never aborts sibling work.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{ExtractionError, RekonError, Result};
use crate::extract;
use crate::models::record::{ExtractedRecord, InvoiceDocument};
use crate::registry::VendorRegistry;

/// One unit of batch input.
///
/// Text acquisition happens before a document enters the pool; a source
/// that could not be read is submitted as `Failed` so its error occupies
/// the right slot in the output sequence.
#[derive(Debug, Clone)]
pub enum BatchItem {
    /// A document with its text already acquired.
    Document(InvoiceDocument),
    /// A source that failed before dispatch (unreadable file, empty text).
    Failed {
        source_id: String,
        error: ExtractionError,
    },
}

impl BatchItem {
    pub fn source_id(&self) -> &str {
        match self {
            BatchItem::Document(doc) => &doc.source_id,
            BatchItem::Failed { source_id, .. } => source_id,
        }
    }
}

impl From<InvoiceDocument> for BatchItem {
    fn from(doc: InvoiceDocument) -> Self {
        BatchItem::Document(doc)
    }
}

/// Orchestrator options, owned by the caller.
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Worker pool size. `None` means available parallelism.
    pub workers: Option<usize>,
}

/// Cooperative cancellation handle.
///
/// Cancellation is checked between documents, never mid-extraction: after
/// `cancel()` no new document is dispatched, in-flight work finishes, and
/// results completed after the request are dropped from the sequence.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-document result slot.
pub type BatchSlot = (String, std::result::Result<ExtractedRecord, ExtractionError>);

/// Output of a batch run.
#[derive(Debug)]
pub struct BatchOutcome {
    /// Per-document slots in submission order. On cancellation, slots for
    /// undispatched and in-flight documents are absent.
    pub results: Vec<BatchSlot>,
    /// Whether cancellation was requested during the run.
    pub cancelled: bool,
}

impl BatchOutcome {
    /// Successfully extracted records, in submission order.
    pub fn records(&self) -> impl Iterator<Item = &ExtractedRecord> {
        self.results.iter().filter_map(|(_, r)| r.as_ref().ok())
    }

    /// Failed slots, in submission order.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &ExtractionError)> {
        self.results
            .iter()
            .filter_map(|(id, r)| r.as_ref().err().map(|e| (id.as_str(), e)))
    }
}

/// Fan a batch of documents out across the worker pool.
///
/// The registry is the only shared state and is read-only for the whole
/// run, so workers borrow it without locking.
pub fn submit_batch(
    registry: &VendorRegistry,
    items: Vec<BatchItem>,
    options: &BatchOptions,
    cancel: &CancelToken,
) -> Result<BatchOutcome> {
    let workers = options.workers.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(2)
    });

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| RekonError::Config(format!("worker pool: {}", e)))?;

    info!(documents = items.len(), workers, "dispatching batch");

    let (tx, rx) = mpsc::channel::<(usize, BatchSlot)>();
    let mut cancelled = false;

    pool.scope(|scope| {
        for (idx, item) in items.iter().enumerate() {
            if cancel.is_cancelled() {
                cancelled = true;
                warn!(remaining = items.len() - idx, "batch cancelled, stopping dispatch");
                break;
            }

            let tx = tx.clone();
            let cancel = cancel.clone();
            scope.spawn(move |_| {
                // Queued tasks whose turn comes after a cancellation
                // request never start their extraction.
                if cancel.is_cancelled() {
                    return;
                }
                let slot = process_item(registry, item);
                // Work that completes after a cancellation request is
                // discarded from the final sequence.
                if !cancel.is_cancelled() {
                    let _ = tx.send((idx, slot));
                }
            });
        }
    });
    drop(tx);

    cancelled |= cancel.is_cancelled();

    let mut slots: Vec<Option<BatchSlot>> = (0..items.len()).map(|_| None).collect();
    for (idx, slot) in rx {
        slots[idx] = Some(slot);
    }

    let results: Vec<BatchSlot> = slots.into_iter().flatten().collect();
    debug!(completed = results.len(), cancelled, "batch reassembled");

    Ok(BatchOutcome { results, cancelled })
}

fn process_item(registry: &VendorRegistry, item: &BatchItem) -> BatchSlot {
    match item {
        BatchItem::Failed { source_id, error } => (source_id.clone(), Err(error.clone())),
        BatchItem::Document(doc) => {
            let result = registry
                .resolve(doc)
                .map(|profile| extract::apply(profile, &doc.source_id, &doc.text));
            (doc.source_id.clone(), result)
        }
    }
}
