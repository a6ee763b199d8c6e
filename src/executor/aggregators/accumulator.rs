use serde_json::Value;

use crate::error::PlanError;

/// The per-group state.
/// The executor will:
///   1) evaluate the call's arguments per row into serde_json::Value
///   2) call `update(&mut self, &args)` (an empty slice for `count(*)`)
///   3) after all rows in the group, call `finalize()`
///
/// DISTINCT is handled by the executor, which skips argument tuples it has
/// already fed to the group, so `update` only implements plain semantics.
pub trait Accumulator: Send {
    /// Update the running state with the evaluated arguments of this row.
    fn update(&mut self, args: &[Value]) -> Result<(), PlanError>;

    /// Produce the final result as a JSON value.
    fn finalize(&self) -> Value;
}
