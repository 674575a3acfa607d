//! Data models: vendor profiles, extracted records, enriched output.

pub mod profile;
pub mod record;
