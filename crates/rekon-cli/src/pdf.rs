//! Document text acquisition.
//!
//! Text is pulled before a document enters the worker pool; the core
//! engine only ever sees already-acquired text.

use std::path::Path;

use anyhow::Context;
use tracing::debug;

/// Read the text layer of a document.
///
/// PDFs go through `pdf-extract`; anything else is read as plain text,
/// which keeps fixtures and ad-hoc inputs easy.
pub fn read_document_text(path: &Path) -> anyhow::Result<String> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let text = match extension.as_str() {
        "pdf" => pdf_extract::extract_text(path)
            .map_err(|e| anyhow::anyhow!("{e}"))
            .with_context(|| format!("extracting text from {}", path.display()))?,
        _ => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?,
    };

    if text.trim().is_empty() {
        anyhow::bail!("no text in {}", path.display());
    }

    debug!(path = %path.display(), chars = text.len(), "acquired document text");
    Ok(text)
}
