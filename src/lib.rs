pub mod plan;
pub use plan::{AggregateSource, ColumnRef, Expr, PlanNode, ScanRequest, SourceHandle};

pub mod filter;
pub use filter::{FilterExpr, FilterTranslator};

pub mod normalizer;
pub use normalizer::{Normalized, QualifierNormalizer};

pub mod pushdown;
pub use pushdown::{AggregatePushDown, PhysicalPlan, PlanningStrategy};

pub mod executor;

pub mod source;
pub use source::MemorySource;

pub mod emitter;
pub use emitter::emit_sql;

pub mod config;
pub use config::Config;

pub mod error;
pub use error::PlanError;
