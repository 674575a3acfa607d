//! Field extraction: normalizers and the per-document engine.

pub mod engine;
pub mod normalize;

pub use engine::apply;
pub use normalize::{fold_text, parse_decimal, parse_decimal_exact, parse_iso_or_european_date};
