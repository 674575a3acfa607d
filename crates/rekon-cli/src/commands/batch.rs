//! Batch command: extract a folder of invoices, reconcile against GOLD,
//! enrich with store emails, write the consolidated report.

use std::fs::File;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;

use rekon_core::{
    enrich_all, load_directory, load_gold, load_profiles, reconcile, report, submit_batch,
    BatchItem, BatchOptions, CancelToken, EnrichedRecord, ExtractionError, InvoiceDocument,
    ReconcileOptions, StoreDirectory,
};

use crate::pdf;

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input files or glob pattern
    #[arg(required = true)]
    input: String,

    /// Vendor profile configuration file
    #[arg(short, long)]
    profiles: PathBuf,

    /// GOLD reference CSV; skips reconciliation when omitted
    #[arg(short, long)]
    gold: Option<PathBuf>,

    /// Store directory CSV (store number, email)
    #[arg(short, long)]
    directory: Option<PathBuf>,

    /// Report output file
    #[arg(short, long, default_value = "report.csv")]
    output: PathBuf,

    /// Restrict report columns to these fields (comma-separated)
    #[arg(long, value_delimiter = ',')]
    fields: Vec<String>,

    /// Vendor id for all documents; when omitted, signature detection decides
    #[arg(long)]
    vendor: Option<String>,

    /// Number of parallel workers (default: available parallelism)
    #[arg(short = 'j', long)]
    jobs: Option<usize>,
}

pub fn run(args: BatchArgs) -> anyhow::Result<()> {
    let start = Instant::now();

    // Systemic inputs load first; any failure here aborts before a single
    // document is touched.
    let registry = load_profiles(&args.profiles)?;
    let gold = args.gold.as_deref().map(load_gold).transpose()?;
    let directory = args.directory.as_deref().map(load_directory).transpose()?;

    let files: Vec<PathBuf> = glob(&args.input)?.filter_map(|r| r.ok()).collect();
    if files.is_empty() {
        anyhow::bail!("no matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    // Acquire text before entering the pool; read failures become error
    // slots instead of aborting siblings.
    let read_pb = progress_bar(files.len() as u64, "reading");
    let items: Vec<BatchItem> = files
        .iter()
        .map(|path| {
            read_pb.inc(1);
            let source_id = path.display().to_string();
            match pdf::read_document_text(path) {
                Ok(text) => {
                    let mut doc = InvoiceDocument::new(&source_id, text);
                    if let Some(vendor) = &args.vendor {
                        doc = doc.with_vendor(vendor.clone());
                    }
                    doc.into()
                }
                Err(e) => {
                    warn!(source = %source_id, "unreadable source: {e:#}");
                    BatchItem::Failed {
                        source_id: source_id.clone(),
                        error: ExtractionError::SourceUnreadable {
                            source_id,
                            reason: format!("{e:#}"),
                        },
                    }
                }
            }
        })
        .collect();
    read_pb.finish_and_clear();

    let options = BatchOptions { workers: args.jobs };
    let outcome = submit_batch(&registry, items, &options, &CancelToken::new())?;

    let records: Vec<_> = outcome.records().cloned().collect();
    let failures: Vec<(String, String)> = outcome
        .failures()
        .map(|(id, e)| (id.to_string(), e.to_string()))
        .collect();

    let results = gold
        .as_ref()
        .map(|gold| reconcile(&registry, &records, gold, &ReconcileOptions::default()));

    let directory = directory.unwrap_or_else(StoreDirectory::default);
    let mut enriched: Vec<EnrichedRecord> = enrich_all(&registry, records, &directory);

    if let Some(results) = &results {
        // One reconciliation result per record, in record order.
        for (record, result) in enriched.iter_mut().zip(results.iter()) {
            record.reconciliation = Some(result.clone());
        }
    }

    let selected = (!args.fields.is_empty()).then_some(args.fields.as_slice());
    let file = File::create(&args.output)?;
    report::write_csv(&enriched, selected, file)?;

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        enriched.len() + failures.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(enriched.len()).green(),
        style(failures.len()).red()
    );
    if let Some(results) = &results {
        let unmatched = results
            .iter()
            .filter(|r| r.class != rekon_core::MatchClass::Match)
            .count();
        println!(
            "   {} reconciliation rows, {} needing review",
            results.len(),
            style(unmatched).yellow()
        );
    }
    println!(
        "{} Report written to {}",
        style("✓").green(),
        args.output.display()
    );

    if !failures.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for (source_id, error) in &failures {
            println!("  - {source_id}: {error}");
        }
    }

    Ok(())
}

fn progress_bar(len: u64, msg: &'static str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("=>-"),
    );
    pb.set_message(msg);
    pb
}
