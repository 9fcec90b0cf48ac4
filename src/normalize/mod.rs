//! Mapping agency-native severity/effect vocabularies onto the canonical
//! three-valued alert classification, plus the text heuristic that infers
//! equipment outages from alert prose.

mod classify;
mod outages;

pub use classify::{classify_effect, classify_severity, classify_text};
pub use outages::{infer_unit_outages, text_indicates_disruption};
