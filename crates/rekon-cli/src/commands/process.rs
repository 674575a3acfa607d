//! Single-document processing command.

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use console::style;

use rekon_core::{apply, load_profiles, InvoiceDocument};

use crate::pdf;

/// Output format for a processed document.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input invoice file (PDF or plain text)
    input: PathBuf,

    /// Vendor profile configuration file
    #[arg(short, long)]
    profiles: PathBuf,

    /// Vendor id; when omitted, signature detection decides
    #[arg(long)]
    vendor: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Restrict output to these fields (comma-separated)
    #[arg(long, value_delimiter = ',')]
    fields: Vec<String>,
}

pub fn run(args: ProcessArgs) -> anyhow::Result<()> {
    let registry = load_profiles(&args.profiles)?;

    let text = pdf::read_document_text(&args.input)?;
    let mut doc = InvoiceDocument::new(args.input.display().to_string(), text);
    if let Some(vendor) = args.vendor {
        doc = doc.with_vendor(vendor);
    }

    let profile = registry.resolve(&doc)?;
    let mut record = apply(profile, &doc.source_id, &doc.text);

    if !args.fields.is_empty() {
        let keep: Vec<&str> = args.fields.iter().map(String::as_str).collect();
        record = record.project(&keep);
    }

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&record)?),
        OutputFormat::Text => {
            println!(
                "{} {} ({:?})",
                style("Vendor:").bold(),
                record.vendor_id,
                record.status
            );
            for (field, value) in &record.fields {
                println!("  {field}: {value}");
            }
            for warning in &record.warnings {
                println!("  {} {warning}", style("warning:").yellow());
            }
        }
    }

    Ok(())
}
