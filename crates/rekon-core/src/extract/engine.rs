//! Per-document field extraction.
//!
//! `apply` is a pure function of (profile, text): no clock, no I/O, no
//! state shared with other documents. A missing required field marks the
//! record `Incomplete` but never aborts extraction.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use tracing::debug;

use crate::extract::normalize;
use crate::models::profile::{Aggregation, ValueType};
use crate::models::record::{ExtractedRecord, FieldStatus, FieldValue, RecordStatus};
use crate::registry::{CompiledField, CompiledProfile};

/// Apply one vendor's rules to one document's text.
pub fn apply(profile: &CompiledProfile, source_id: &str, raw_text: &str) -> ExtractedRecord {
    let mut fields = BTreeMap::new();
    let mut field_status = BTreeMap::new();
    let mut warnings = Vec::new();
    let mut status = RecordStatus::Complete;

    for field in &profile.fields {
        match extract_field(field, raw_text, &mut warnings) {
            Some((value, field_st)) => {
                fields.insert(field.rule.name.clone(), value);
                field_status.insert(field.rule.name.clone(), field_st);
            }
            None => {
                if field.rule.required {
                    field_status
                        .insert(field.rule.name.clone(), FieldStatus::MissingRequired);
                    status = RecordStatus::Incomplete;
                }
            }
        }
    }

    debug!(
        vendor = %profile.vendor_id(),
        source = source_id,
        extracted = fields.len(),
        ?status,
        "extracted record"
    );

    ExtractedRecord {
        source_id: source_id.to_string(),
        vendor_id: profile.vendor_id().to_string(),
        fields,
        field_status,
        status,
        warnings,
    }
}

/// Run one rule against the text, applying fallbacks and aggregation.
fn extract_field(
    field: &CompiledField,
    text: &str,
    warnings: &mut Vec<String>,
) -> Option<(FieldValue, FieldStatus)> {
    let rule = &field.rule;
    let captures = first_matching_pattern(field, text, warnings);
    if captures.is_empty() {
        return None;
    }

    match rule.aggregation {
        Aggregation::First => {
            let value = normalize::normalize(&captures[0], rule.value_type);
            if value.is_none() {
                warnings.push(format!(
                    "field {}: capture {:?} is not a valid {:?}",
                    rule.name, captures[0], rule.value_type
                ));
            }
            value.map(|v| (v, FieldStatus::Found))
        }
        Aggregation::Sum => {
            // Every match must parse as a number; a single bad capture
            // classifies the field as missing rather than inventing a
            // partial total.
            let mut total = Decimal::ZERO;
            for capture in &captures {
                match normalize::parse_decimal(capture) {
                    Some(n) => total += n,
                    None => {
                        warnings.push(format!(
                            "field {}: sum aggregation over non-numeric capture {:?}",
                            rule.name, capture
                        ));
                        return None;
                    }
                }
            }
            let st = if captures.len() > 1 {
                FieldStatus::Aggregated
            } else {
                FieldStatus::Found
            };
            Some((FieldValue::Number(total), st))
        }
        Aggregation::Concat => {
            let parts: Vec<String> = captures
                .iter()
                .filter_map(|c| match normalize::normalize(c, ValueType::Text) {
                    Some(FieldValue::Text(s)) => Some(s),
                    _ => None,
                })
                .collect();
            if parts.is_empty() {
                return None;
            }
            let st = if parts.len() > 1 {
                FieldStatus::Aggregated
            } else {
                FieldStatus::Found
            };
            Some((FieldValue::Text(parts.join("; ")), st))
        }
    }
}

/// All captures of the first pattern (primary, then fallbacks in order)
/// that matches anywhere in the text, in document order.
fn first_matching_pattern(
    field: &CompiledField,
    text: &str,
    warnings: &mut Vec<String>,
) -> Vec<String> {
    let rule = &field.rule;
    for pattern in std::iter::once(&field.primary).chain(field.fallbacks.iter()) {
        let captures: Vec<String> = pattern
            .captures_iter(text)
            .filter_map(|caps| match caps.get(rule.group) {
                Some(m) => Some(m.as_str().to_string()),
                None => {
                    warnings.push(format!(
                        "field {}: capture group {} not present in match",
                        rule.name, rule.group
                    ));
                    None
                }
            })
            .collect();
        if !captures.is_empty() {
            return captures;
        }
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::profile::VendorProfile;
    use crate::registry::VendorRegistry;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn compile(json: &str) -> VendorRegistry {
        let profile: VendorProfile = serde_json::from_str(json).unwrap();
        let mut registry = VendorRegistry::new();
        registry.register(profile).unwrap();
        registry
    }

    fn acme() -> VendorRegistry {
        compile(
            r#"{
                "vendor_id": "acme",
                "fields": [
                    {"name": "invoice_no", "pattern": "INV-(\\d+)", "required": true},
                    {"name": "total", "pattern": "Total: (\\d+\\.\\d+)", "value_type": "number", "required": true},
                    {"name": "issued", "pattern": "Issued: (\\S+)", "value_type": "date"}
                ],
                "key_field": "invoice_no"
            }"#,
        )
    }

    #[test]
    fn test_complete_extraction() {
        let registry = acme();
        let profile = registry.lookup("acme").unwrap();

        let record = apply(profile, "a.pdf", "Invoice: INV-4521 Total: 120.50");

        assert_eq!(record.status, RecordStatus::Complete);
        assert_eq!(
            record.get("invoice_no"),
            Some(&FieldValue::Text("4521".to_string()))
        );
        assert_eq!(
            record.get("total"),
            Some(&FieldValue::Number(Decimal::from_str("120.50").unwrap()))
        );
        assert_eq!(
            record.field_status.get("invoice_no"),
            Some(&FieldStatus::Found)
        );
    }

    #[test]
    fn test_missing_required_continues() {
        let registry = acme();
        let profile = registry.lookup("acme").unwrap();

        let record = apply(profile, "a.pdf", "Total: 99.00 Issued: 2025-01-15");

        assert_eq!(record.status, RecordStatus::Incomplete);
        assert_eq!(
            record.field_status.get("invoice_no"),
            Some(&FieldStatus::MissingRequired)
        );
        // Extraction kept going past the missing field.
        assert_eq!(
            record.get("total"),
            Some(&FieldValue::Number(Decimal::from_str("99.00").unwrap()))
        );
        assert_eq!(
            record.get("issued"),
            Some(&FieldValue::Date(
                NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
            ))
        );
    }

    #[test]
    fn test_optional_field_simply_absent() {
        let registry = acme();
        let profile = registry.lookup("acme").unwrap();

        let record = apply(profile, "a.pdf", "INV-1 Total: 1.00");

        assert_eq!(record.status, RecordStatus::Complete);
        assert!(record.get("issued").is_none());
        assert!(!record.field_status.contains_key("issued"));
    }

    #[test]
    fn test_first_takes_earliest_match() {
        let registry = compile(
            r#"{
                "vendor_id": "v",
                "fields": [{"name": "n", "pattern": "INV-(\\d+)"}],
                "key_field": "n"
            }"#,
        );
        let record = apply(registry.lookup("v").unwrap(), "a", "INV-111 then INV-222");
        assert_eq!(record.get("n"), Some(&FieldValue::Text("111".to_string())));
    }

    #[test]
    fn test_sum_aggregation() {
        let registry = compile(
            r#"{
                "vendor_id": "v",
                "fields": [{
                    "name": "vat",
                    "pattern": "VAT: ([\\d,]+)",
                    "value_type": "number",
                    "aggregation": "sum"
                }],
                "key_field": "vat"
            }"#,
        );
        let record = apply(
            registry.lookup("v").unwrap(),
            "a",
            "VAT: 10,50 and VAT: 2,25",
        );
        assert_eq!(
            record.get("vat"),
            Some(&FieldValue::Number(Decimal::from_str("12.75").unwrap()))
        );
        assert_eq!(record.field_status.get("vat"), Some(&FieldStatus::Aggregated));
    }

    #[test]
    fn test_sum_over_non_numeric_is_missing() {
        let registry = compile(
            r#"{
                "vendor_id": "v",
                "fields": [{
                    "name": "vat",
                    "pattern": "VAT: (\\S+)",
                    "value_type": "number",
                    "aggregation": "sum",
                    "required": true
                }],
                "key_field": "vat"
            }"#,
        );
        let record = apply(registry.lookup("v").unwrap(), "a", "VAT: 10,50 VAT: n/a");

        assert!(record.get("vat").is_none());
        assert_eq!(
            record.field_status.get("vat"),
            Some(&FieldStatus::MissingRequired)
        );
        assert_eq!(record.status, RecordStatus::Incomplete);
        assert!(!record.warnings.is_empty());
    }

    #[test]
    fn test_concat_aggregation() {
        let registry = compile(
            r#"{
                "vendor_id": "v",
                "fields": [{
                    "name": "orders",
                    "pattern": "zam (\\d+)",
                    "aggregation": "concat"
                }],
                "key_field": "orders"
            }"#,
        );
        let record = apply(registry.lookup("v").unwrap(), "a", "zam 111 zam 222");
        assert_eq!(
            record.get("orders"),
            Some(&FieldValue::Text("111; 222".to_string()))
        );
    }

    #[test]
    fn test_fallback_pattern() {
        let registry = compile(
            r#"{
                "vendor_id": "v",
                "fields": [{
                    "name": "order",
                    "pattern": "Zamówienia:\\s*(\\d{8})",
                    "fallbacks": ["(?i)zam\\s*(\\d{8})"]
                }],
                "key_field": "order"
            }"#,
        );
        let profile = registry.lookup("v").unwrap();

        let primary = apply(profile, "a", "Zamówienia: 12345678");
        assert_eq!(
            primary.get("order"),
            Some(&FieldValue::Text("12345678".to_string()))
        );

        let fallback = apply(profile, "a", "uwagi: ZAM 87654321");
        assert_eq!(
            fallback.get("order"),
            Some(&FieldValue::Text("87654321".to_string()))
        );
    }

    #[test]
    fn test_deterministic() {
        let registry = acme();
        let profile = registry.lookup("acme").unwrap();
        let text = "Invoice: INV-4521 Total: 120.50 Issued: 2025-01-15";

        let a = apply(profile, "a.pdf", text);
        let b = apply(profile, "a.pdf", text);

        assert_eq!(a.fields, b.fields);
        assert_eq!(a.field_status, b.field_status);
        assert_eq!(a.status, b.status);
    }
}
