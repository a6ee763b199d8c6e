use crate::executor::Accumulator;

/// Per-aggregate factory. One instance is registered per function name; it
/// is stateless and shared across threads.
pub trait AggregateImpl: Send + Sync {
    /// Canonical lowercase function name ("count", "sum", ...).
    fn name(&self) -> &'static str;

    /// Create a fresh accumulator instance for one group.
    fn create_accumulator(&self) -> Box<dyn Accumulator>;
}
