use crate::plan::{ColumnRef, Expr, ScanRequest, SourceHandle};

/// Physical aggregation plan handed to the execution layer.
#[derive(Debug, Clone, PartialEq)]
pub enum PhysicalPlan {
    /// Local hash aggregation over the rows of `input`.
    HashAggregate {
        partial: bool,
        group_by: Vec<ColumnRef>,
        aggregates: Vec<Expr>,
        input: Box<PhysicalPlan>,
    },

    /// Local re-check of predicates the backend could not take exactly.
    Filter {
        predicate: Expr,
        input: Box<PhysicalPlan>,
    },

    /// Local projection; every expression is named.
    Project {
        exprs: Vec<Expr>,
        input: Box<PhysicalPlan>,
    },

    /// A backend scan, possibly computing grouped aggregates natively.
    AggregateScan {
        source: SourceHandle,
        request: ScanRequest,
    },
}

impl PhysicalPlan {
    pub fn output(&self) -> Vec<ColumnRef> {
        match self {
            PhysicalPlan::HashAggregate { group_by, aggregates, .. } => group_by
                .iter()
                .cloned()
                .chain(aggregates.iter().filter_map(Expr::to_attribute))
                .collect(),
            PhysicalPlan::Filter { input, .. } => input.output(),
            PhysicalPlan::Project { exprs, .. } => exprs.iter().filter_map(Expr::to_attribute).collect(),
            PhysicalPlan::AggregateScan { request, .. } => request.output(),
        }
    }

    /// The scan at the bottom of this plan.
    pub fn scan(&self) -> Option<(&SourceHandle, &ScanRequest)> {
        match self {
            PhysicalPlan::HashAggregate { input, .. }
            | PhysicalPlan::Filter { input, .. }
            | PhysicalPlan::Project { input, .. } => input.scan(),
            PhysicalPlan::AggregateScan { source, request } => Some((source, request)),
        }
    }

    /// Number of local aggregation stages above the scan.
    pub fn local_stages(&self) -> usize {
        match self {
            PhysicalPlan::HashAggregate { input, .. } => 1 + input.local_stages(),
            PhysicalPlan::Filter { input, .. } | PhysicalPlan::Project { input, .. } => input.local_stages(),
            PhysicalPlan::AggregateScan { .. } => 0,
        }
    }
}
