use std::fmt;

use crate::plan::{ColumnRef, Expr};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFunction {
    /// Canonical lowercase name, as registered with the accumulator registry.
    pub fn name(&self) -> &'static str {
        match self {
            AggregateFunction::Count => "count",
            AggregateFunction::Sum => "sum",
            AggregateFunction::Avg => "avg",
            AggregateFunction::Min => "min",
            AggregateFunction::Max => "max",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "count" => Some(AggregateFunction::Count),
            "sum" => Some(AggregateFunction::Sum),
            "avg" => Some(AggregateFunction::Avg),
            "min" => Some(AggregateFunction::Min),
            "max" => Some(AggregateFunction::Max),
            _ => None,
        }
    }
}

/// A normalized aggregate call.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct AggregateCall {
    pub func: AggregateFunction,
    pub args: Vec<Expr>,         // empty means `*`
    pub distinct: bool,
}

impl AggregateCall {
    pub fn new(func: AggregateFunction, args: Vec<Expr>) -> Self {
        Self { func, args, distinct: false }
    }

    pub fn distinct(func: AggregateFunction, args: Vec<Expr>) -> Self {
        Self { func, args, distinct: true }
    }

    pub fn count_star() -> Self {
        Self::new(AggregateFunction::Count, vec![])
    }

    /// Function that combines partial results of this call into the final
    /// value. `None` when partial results cannot be combined (AVG, and any
    /// DISTINCT call whose function is not idempotent).
    pub fn merge_function(&self) -> Option<AggregateFunction> {
        match self.func {
            AggregateFunction::Min => Some(AggregateFunction::Min),
            AggregateFunction::Max => Some(AggregateFunction::Max),
            _ if self.distinct => None,
            AggregateFunction::Count | AggregateFunction::Sum => Some(AggregateFunction::Sum),
            AggregateFunction::Avg => None,
        }
    }

    /// The call that merges partial values stored in `partial`.
    pub fn merge_over(&self, partial: &ColumnRef) -> Option<AggregateCall> {
        self.merge_function()
            .map(|func| AggregateCall::new(func, vec![Expr::Column(partial.clone())]))
    }

    /// True when feeding the same argument value twice cannot change the
    /// result, so the input may be deduplicated before aggregating.
    pub fn is_duplicate_insensitive(&self) -> bool {
        self.distinct || matches!(self.func, AggregateFunction::Min | AggregateFunction::Max)
    }

    pub fn is_count_star(&self) -> bool {
        self.func == AggregateFunction::Count && self.args.is_empty()
    }
}

impl fmt::Display for AggregateCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.func.name())?;
        if self.distinct {
            write!(f, "DISTINCT ")?;
        }
        if self.args.is_empty() {
            write!(f, "*")?;
        }
        for (i, a) in self.args.iter().enumerate() {
            if i > 0 { write!(f, ", ")?; }
            write!(f, "{}", a)?;
        }
        write!(f, ")")
    }
}

impl fmt::Debug for AggregateCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AggregateCall({})", self)
    }
}
