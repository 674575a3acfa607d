//! Consolidated report rendering.
//!
//! One row per processed document: source, vendor, extracted fields, gold
//! values, per-field match status, email and its status. Column selection
//! is a pure projection over already-complete records.

use std::collections::BTreeSet;
use std::io::Write;

use crate::error::{RekonError, Result};
use crate::models::record::EnrichedRecord;
use crate::reconcile::MatchClass;

fn class_label(class: MatchClass) -> &'static str {
    match class {
        MatchClass::Match => "match",
        MatchClass::Mismatch => "mismatch",
        MatchClass::MissingInGold => "missing_in_gold",
        MatchClass::MissingInExtraction => "missing_in_extraction",
        MatchClass::Ambiguous => "ambiguous",
    }
}

fn email_label(record: &EnrichedRecord) -> &'static str {
    use crate::models::record::EmailStatus;
    match record.email_status {
        EmailStatus::Attached => "attached",
        EmailStatus::NotFoundInDirectory => "not_found_in_directory",
        EmailStatus::NoStoreNumber => "no_store_number",
    }
}

/// Field names appearing anywhere in the batch, sorted. When `selected`
/// is given, only those fields survive, in the caller's order.
fn report_fields(records: &[EnrichedRecord], selected: Option<&[String]>) -> Vec<String> {
    if let Some(selected) = selected {
        return selected.to_vec();
    }
    let mut names: BTreeSet<String> = BTreeSet::new();
    for enriched in records {
        names.extend(enriched.record.fields.keys().cloned());
        if let Some(recon) = &enriched.reconciliation {
            names.extend(recon.fields.iter().map(|f| f.field.clone()));
        }
    }
    names.into_iter().collect()
}

/// Write the consolidated report as CSV.
pub fn write_csv<W: Write>(
    records: &[EnrichedRecord],
    selected_fields: Option<&[String]>,
    writer: W,
) -> Result<()> {
    let fields = report_fields(records, selected_fields);
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = vec![
        "source".to_string(),
        "vendor".to_string(),
        "status".to_string(),
        "key".to_string(),
        "key_status".to_string(),
    ];
    for field in &fields {
        header.push(field.clone());
        header.push(format!("{field}_gold"));
        header.push(format!("{field}_match"));
    }
    header.push("email".to_string());
    header.push("email_status".to_string());
    wtr.write_record(&header)
        .map_err(|e| RekonError::Config(format!("report write: {}", e)))?;

    for enriched in records {
        let record = &enriched.record;
        let recon = enriched.reconciliation.as_ref();

        let mut row = vec![
            record.source_id.clone(),
            record.vendor_id.clone(),
            format!("{:?}", record.status).to_lowercase(),
            recon.map(|r| r.key.clone()).unwrap_or_default(),
            recon.map(|r| class_label(r.class).to_string()).unwrap_or_default(),
        ];

        for field in &fields {
            let comparison = recon.and_then(|r| r.fields.iter().find(|f| &f.field == field));
            let extracted = record
                .get(field)
                .map(|v| v.to_string())
                .or_else(|| comparison.and_then(|c| c.extracted.clone()))
                .unwrap_or_default();
            let expected = comparison
                .and_then(|c| c.expected.clone())
                .unwrap_or_default();
            let class = comparison
                .map(|c| class_label(c.class).to_string())
                .unwrap_or_default();
            row.push(extracted);
            row.push(expected);
            row.push(class);
        }

        row.push(enriched.email.clone().unwrap_or_default());
        row.push(email_label(enriched).to_string());

        wtr.write_record(&row)
            .map_err(|e| RekonError::Config(format!("report write: {}", e)))?;
    }

    wtr.flush()?;
    Ok(())
}

/// Render the report to a CSV string.
pub fn to_csv_string(
    records: &[EnrichedRecord],
    selected_fields: Option<&[String]>,
) -> Result<String> {
    let mut buf = Vec::new();
    write_csv(records, selected_fields, &mut buf)?;
    String::from_utf8(buf).map_err(|e| RekonError::Config(e.to_string()))
}
