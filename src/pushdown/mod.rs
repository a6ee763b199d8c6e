pub mod physical_plan;
pub use physical_plan::*;

pub mod prune;
pub use prune::*;

pub mod aggregate_pushdown;
pub use aggregate_pushdown::*;
