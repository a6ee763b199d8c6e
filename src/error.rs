use std::fmt::{self, Display};

use crate::plan::ColumnRef;

#[derive(Debug, Clone, PartialEq)]
pub enum PlanError {
    /// A column reference reached the normalizer with more than one
    /// qualifier. Raised for analyzer bugs; never recoverable.
    AmbiguousQualifier { column: ColumnRef, qualifiers: Vec<String> },
    UnknownAggregate(String),
    AggregateArgMismatch { name: String, expected: String },
    TypeMismatch(String),
    UnsupportedExpression(String),
    Source(String),
}

impl PlanError {
    pub fn err<T>(self) -> Result<T, PlanError> {
        Err(self)
    }
}

impl Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanError::AmbiguousQualifier { column, qualifiers } => write!(
                f,
                "column {} carries {} qualifiers ({}); expected at most one",
                column.name,
                qualifiers.len(),
                qualifiers.join(", ")
            ),
            PlanError::UnknownAggregate(name) => write!(f, "unknown aggregate function '{}'", name),
            PlanError::AggregateArgMismatch { name, expected } => {
                write!(f, "invalid arguments for {}: expected {}", name, expected)
            }
            PlanError::TypeMismatch(msg) => write!(f, "type mismatch: {}", msg),
            PlanError::UnsupportedExpression(msg) => write!(f, "unsupported expression: {}", msg),
            PlanError::Source(msg) => write!(f, "source error: {}", msg),
        }
    }
}

impl std::error::Error for PlanError {}
