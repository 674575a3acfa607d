//! Vendor pattern registry.
//!
//! Every regex in every profile is compiled when the registry is built, so
//! a malformed pattern surfaces as [`ExtractionError::PatternCompile`]
//! before any document is processed. After construction the registry is
//! read-only and shared across worker threads by reference.

use std::collections::HashMap;

use regex::Regex;
use tracing::debug;

use crate::error::ExtractionError;
use crate::models::profile::{FieldRule, ProfileSet, VendorProfile};
use crate::models::record::InvoiceDocument;

/// A field rule with its regexes compiled.
#[derive(Debug, Clone)]
pub struct CompiledField {
    /// The declarative rule this was compiled from.
    pub rule: FieldRule,
    /// Compiled primary pattern.
    pub primary: Regex,
    /// Compiled fallback patterns, tried in order after the primary.
    pub fallbacks: Vec<Regex>,
}

/// A vendor profile with all patterns compiled.
#[derive(Debug, Clone)]
pub struct CompiledProfile {
    /// Profile metadata (id, key field, store field).
    pub profile: VendorProfile,
    /// Compiled signature pattern, when the profile declares one.
    pub signature: Option<Regex>,
    /// Compiled field rules in declaration order.
    pub fields: Vec<CompiledField>,
}

impl CompiledProfile {
    pub fn vendor_id(&self) -> &str {
        &self.profile.vendor_id
    }
}

/// Immutable catalog of per-vendor extraction rules.
#[derive(Debug, Default)]
pub struct VendorRegistry {
    profiles: Vec<CompiledProfile>,
    index: HashMap<String, usize>,
}

impl VendorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile and register every profile in a set.
    pub fn from_profiles(set: ProfileSet) -> Result<Self, ExtractionError> {
        let mut registry = Self::new();
        for profile in set.vendors {
            registry.register(profile)?;
        }
        Ok(registry)
    }

    /// Compile and register a single profile.
    ///
    /// Fails with `DuplicateVendorId` when the id is already taken and
    /// with `PatternCompile` on the first malformed regex.
    pub fn register(&mut self, profile: VendorProfile) -> Result<(), ExtractionError> {
        if self.index.contains_key(&profile.vendor_id) {
            return Err(ExtractionError::DuplicateVendorId(profile.vendor_id));
        }

        let compile = |pattern: &str, field: &str| {
            Regex::new(pattern).map_err(|e| ExtractionError::PatternCompile {
                vendor: profile.vendor_id.clone(),
                field: field.to_string(),
                source: e,
            })
        };

        let signature = match &profile.signature {
            Some(pattern) => Some(compile(pattern, "signature")?),
            None => None,
        };

        let mut fields = Vec::with_capacity(profile.fields.len());
        for rule in &profile.fields {
            let primary = compile(&rule.pattern, &rule.name)?;
            let fallbacks = rule
                .fallbacks
                .iter()
                .map(|p| compile(p, &rule.name))
                .collect::<Result<Vec<_>, _>>()?;
            fields.push(CompiledField {
                rule: rule.clone(),
                primary,
                fallbacks,
            });
        }

        debug!(
            vendor = %profile.vendor_id,
            fields = fields.len(),
            "registered vendor profile"
        );

        self.index
            .insert(profile.vendor_id.clone(), self.profiles.len());
        self.profiles.push(CompiledProfile {
            profile,
            signature,
            fields,
        });
        Ok(())
    }

    /// Look up a profile by vendor id.
    pub fn lookup(&self, vendor_id: &str) -> Result<&CompiledProfile, ExtractionError> {
        self.index
            .get(vendor_id)
            .map(|&i| &self.profiles[i])
            .ok_or_else(|| ExtractionError::UnknownVendor(vendor_id.to_string()))
    }

    /// Auto-detect the vendor from raw text.
    ///
    /// Signature patterns are tried in registration order; the first match
    /// wins. Profiles without a signature never match here.
    pub fn detect(&self, raw_text: &str) -> Option<&CompiledProfile> {
        self.profiles.iter().find(|p| {
            p.signature
                .as_ref()
                .map(|s| s.is_match(raw_text))
                .unwrap_or(false)
        })
    }

    /// Resolve the profile for a document: the pre-assigned vendor id when
    /// present, signature detection otherwise.
    pub fn resolve(&self, doc: &InvoiceDocument) -> Result<&CompiledProfile, ExtractionError> {
        match &doc.vendor_id {
            Some(id) => self.lookup(id),
            None => self
                .detect(&doc.text)
                .ok_or_else(|| ExtractionError::NoVendorMatched(doc.source_id.clone())),
        }
    }

    /// Registered vendor ids, in registration order.
    pub fn vendor_ids(&self) -> impl Iterator<Item = &str> {
        self.profiles.iter().map(|p| p.vendor_id())
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn profile(id: &str, signature: Option<&str>) -> VendorProfile {
        serde_json::from_str(&format!(
            r#"{{
                "vendor_id": "{id}",
                {signature}
                "fields": [
                    {{"name": "invoice_no", "pattern": "INV-(\\d+)", "required": true}}
                ],
                "key_field": "invoice_no"
            }}"#,
            signature = signature
                .map(|s| format!(r#""signature": "{s}","#))
                .unwrap_or_default(),
        ))
        .unwrap()
    }

    #[test]
    fn test_duplicate_vendor_id() {
        let mut registry = VendorRegistry::new();
        registry.register(profile("acme", None)).unwrap();

        let err = registry.register(profile("acme", None)).unwrap_err();
        assert!(matches!(err, ExtractionError::DuplicateVendorId(id) if id == "acme"));
    }

    #[test]
    fn test_pattern_compile_error_at_registration() {
        let mut registry = VendorRegistry::new();
        let mut bad = profile("acme", None);
        bad.fields[0].pattern = "INV-(\\d+".to_string();

        let err = registry.register(bad).unwrap_err();
        assert!(matches!(err, ExtractionError::PatternCompile { field, .. } if field == "invoice_no"));
    }

    #[test]
    fn test_lookup_unknown_vendor() {
        let registry = VendorRegistry::new();
        let err = registry.lookup("nobody").unwrap_err();
        assert!(matches!(err, ExtractionError::UnknownVendor(_)));
    }

    #[test]
    fn test_detect_in_registration_order() {
        let mut registry = VendorRegistry::new();
        registry.register(profile("first", Some("Invoice"))).unwrap();
        registry.register(profile("second", Some("Invoice"))).unwrap();
        registry.register(profile("third", Some("Receipt"))).unwrap();

        let hit = registry.detect("Invoice INV-1").unwrap();
        assert_eq!(hit.vendor_id(), "first");

        let hit = registry.detect("Receipt INV-2").unwrap();
        assert_eq!(hit.vendor_id(), "third");

        assert!(registry.detect("unrelated text").is_none());
    }

    #[test]
    fn test_resolve_prefers_assigned_vendor() {
        let mut registry = VendorRegistry::new();
        registry.register(profile("acme", Some("ACME"))).unwrap();
        registry.register(profile("globex", Some("GLOBEX"))).unwrap();

        let doc = InvoiceDocument::new("a.pdf", "ACME INV-1").with_vendor("globex");
        assert_eq!(registry.resolve(&doc).unwrap().vendor_id(), "globex");

        let doc = InvoiceDocument::new("a.pdf", "ACME INV-1");
        assert_eq!(registry.resolve(&doc).unwrap().vendor_id(), "acme");

        let doc = InvoiceDocument::new("a.pdf", "nothing here");
        assert!(matches!(
            registry.resolve(&doc).unwrap_err(),
            ExtractionError::NoVendorMatched(id) if id == "a.pdf"
        ));
    }
}
