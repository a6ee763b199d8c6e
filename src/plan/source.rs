use std::{fmt, sync::Arc};

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::{error::PlanError, filter::FilterExpr, plan::{ColumnId, ColumnRef, Expr}};

/// One row, keyed by [`ColumnRef::row_key`] inside the engine and by
/// original column names on the storage side.
pub type Row = Map<String, Value>;

/// Rows produced by a backend scan.
pub type ResultStream = Box<dyn Iterator<Item = Row> + Send>;

/// What the planner asks a backend to compute.
///
/// With no grouping and no aggregates the backend returns the requested
/// columns of every row passing `filters`. Otherwise it returns one row per
/// group holding the grouping columns followed by the aggregate outputs.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScanRequest {
    pub columns: Vec<ColumnRef>,
    pub filters: Vec<FilterExpr>,
    pub group_by: Vec<Expr>,
    pub aggregates: Vec<Expr>,
}

impl ScanRequest {
    pub fn is_aggregate(&self) -> bool {
        !self.group_by.is_empty() || !self.aggregates.is_empty()
    }

    /// Columns present in every row the backend returns for this request.
    pub fn output(&self) -> Vec<ColumnRef> {
        if !self.is_aggregate() {
            return self.columns.clone();
        }
        self.group_by
            .iter()
            .chain(self.aggregates.iter())
            .filter_map(Expr::to_attribute)
            .collect()
    }
}

/// A storage backend able to filter, and possibly aggregate, natively.
pub trait AggregateSource: Send + Sync {
    fn name(&self) -> &str;

    /// Whether predicates on `column` may be pushed to this backend.
    fn supports_filter(&self, _column: &ColumnRef) -> bool { true }

    /// Whether the backend can compute the named aggregate expression.
    fn supports_aggregate(&self, expr: &Expr) -> bool;

    /// Declared column identity -> the backend's own (original-case) column.
    fn attribute_map(&self) -> &IndexMap<ColumnId, ColumnRef>;

    fn build_scan(&self, request: &ScanRequest) -> Result<ResultStream, PlanError>;
}

/// Shared handle to a backend stored inside plan nodes. Two handles are equal
/// when they point at the same backend instance.
#[derive(Clone)]
pub struct SourceHandle(pub Arc<dyn AggregateSource>);

impl SourceHandle {
    pub fn new(source: impl AggregateSource + 'static) -> Self {
        Self(Arc::new(source))
    }

    pub fn source(&self) -> &dyn AggregateSource {
        self.0.as_ref()
    }
}

impl PartialEq for SourceHandle {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
    }
}

impl fmt::Debug for SourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SourceHandle({})", self.0.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{AggregateCall, AggregateFunction};

    #[test]
    fn raw_request_outputs_requested_columns() {
        let k = ColumnRef::new(1, "k");
        let req = ScanRequest { columns: vec![k.clone()], ..Default::default() };
        assert!(!req.is_aggregate());
        assert_eq!(req.output(), vec![k]);
    }

    #[test]
    fn aggregate_request_outputs_groups_then_aggregates() {
        let k = ColumnRef::new(1, "k");
        let v = ColumnRef::new(2, "v");
        let s = ColumnRef::new(3, "s");
        let req = ScanRequest {
            columns: vec![k.clone(), v.clone()],
            filters: vec![],
            group_by: vec![Expr::col(&k)],
            aggregates: vec![Expr::Aggregate(AggregateCall::new(AggregateFunction::Sum, vec![Expr::col(&v)])).alias(&s)],
        };
        assert!(req.is_aggregate());
        assert_eq!(req.output(), vec![k, s]);
    }
}
