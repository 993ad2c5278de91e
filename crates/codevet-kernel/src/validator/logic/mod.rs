//! The logic pass.
//!
//! Runs only on source that parses. Every finding is a warning:
//!
//! 1. unreachable statements after `return`/`raise`/`break`/`continue`
//! 2. unused bindings (`strict` only)
//! 3. `while True` loops without an exit
//! 4. functions annotated to return a value that never do
//! 5. type consistency and runtime risks (no-ops for now)

mod loops;
mod returns;
mod risk;
mod unreachable;
mod unused;

pub use loops::InfiniteLoops;
pub use returns::MissingReturns;
pub use risk::{RuntimeRisks, TypeConsistency};
pub use unreachable::UnreachableCode;
pub use unused::UnusedBindings;

use super::detector::Detector;

/// The logic-pass detectors, in run order.
///
/// Runtime risks come last on their own; see [`runtime_detectors`].
pub fn detectors() -> Vec<Box<dyn Detector>> {
    vec![
        Box::new(UnreachableCode),
        Box::new(UnusedBindings),
        Box::new(InfiniteLoops),
        Box::new(MissingReturns),
        Box::new(TypeConsistency),
    ]
}

/// Detectors whose warnings are reported as potential runtime errors.
pub fn runtime_detectors() -> Vec<Box<dyn Detector>> {
    vec![Box::new(RuntimeRisks)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detector_order() {
        let names: Vec<_> = detectors().iter().map(|d| d.name()).collect();
        assert_eq!(
            names,
            [
                "unreachable-code",
                "unused-bindings",
                "infinite-loops",
                "missing-returns",
                "type-consistency"
            ]
        );
        let runtime: Vec<_> = runtime_detectors().iter().map(|d| d.name()).collect();
        assert_eq!(runtime, ["runtime-risks"]);
    }
}
