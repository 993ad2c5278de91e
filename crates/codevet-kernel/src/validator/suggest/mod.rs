//! The suggestion pass.
//!
//! Five independent scanners, each returning advisory text. Their output
//! is concatenated in the order below and de-duplicated, keeping the
//! first occurrence. Nothing here affects validity.

mod performance;
mod practices;
mod readability;
mod security;
mod style;

pub use performance::PerformanceIdioms;
pub use practices::BestPractices;
pub use readability::Readability;
pub use security::SecurityHints;
pub use style::StyleConventions;

use std::collections::HashSet;

use super::detector::{self, Detector, Subject};

/// The suggestion scanners, in output order.
pub fn detectors() -> Vec<Box<dyn Detector>> {
    vec![
        Box::new(StyleConventions),
        Box::new(PerformanceIdioms),
        Box::new(Readability),
        Box::new(BestPractices),
        Box::new(SecurityHints),
    ]
}

/// Run `detectors` and return their suggestions, de-duplicated in
/// first-seen order.
pub fn collect(detectors: &[Box<dyn Detector>], subject: &Subject<'_>) -> Vec<String> {
    let mut seen = HashSet::new();
    detector::run_all(detectors, subject)
        .iter()
        .map(|finding| finding.text())
        .filter(|text| seen.insert(text.clone()))
        .collect()
}
