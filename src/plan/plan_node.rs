use crate::plan::{ColumnRef, Expr, JoinType, SourceHandle};

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub expr: Expr,
    pub ascending: bool,
}

/// Logical plan node. Every variant owns its children; sharing between
/// subtrees is only ever expressed through aliases.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanNode {
    /// A named relation. `table_like` relations behave like a plain table in
    /// generated SQL and get a stable generated alias during normalization.
    BaseRelation {
        name: String,
        columns: Vec<ColumnRef>,
        table_like: bool,
    },

    /// Aliased subtree (`(...) AS alias`); scopes the qualifiers of the
    /// columns it produces.
    Subquery {
        alias: String,
        input: Box<PlanNode>,
    },

    Join {
        left: Box<PlanNode>,
        right: Box<PlanNode>,
        join_type: JoinType,
        condition: Option<Expr>,
    },

    /// `START WITH ... CONNECT BY ...` over a single input.
    Hierarchical {
        input: Box<PlanNode>,
        start_with: Option<Expr>,
        connect_by: Expr,
        nocycle: bool,
    },

    /// Projection in SELECT order; every expression is named.
    Project {
        exprs: Vec<Expr>,
        input: Box<PlanNode>,
    },

    Filter {
        predicate: Expr,
        input: Box<PlanNode>,
    },

    /// Group-by aggregation. `partial` marks a stage producing intermediate
    /// state for a later final stage.
    Aggregate {
        partial: bool,
        group_by: Vec<ColumnRef>,
        aggregates: Vec<Expr>,
        input: Box<PlanNode>,
    },

    Sort {
        keys: Vec<OrderBy>,
        input: Box<PlanNode>,
    },

    Limit {
        limit: Option<i64>,
        offset: Option<i64>,
        input: Box<PlanNode>,
    },

    /// Storage scan exposing what its backend can compute natively.
    Scan {
        relation: String,
        columns: Vec<ColumnRef>,
        source: SourceHandle,
    },
}

impl PlanNode {
    pub fn relation(name: &str, columns: Vec<ColumnRef>) -> Self {
        PlanNode::BaseRelation { name: name.to_string(), columns, table_like: true }
    }

    /// A relation already scoped by its backend; never wrapped.
    pub fn opaque_relation(name: &str, columns: Vec<ColumnRef>) -> Self {
        PlanNode::BaseRelation { name: name.to_string(), columns, table_like: false }
    }

    pub fn subquery(alias: &str, input: PlanNode) -> Self {
        PlanNode::Subquery { alias: alias.to_string(), input: Box::new(input) }
    }

    pub fn join(left: PlanNode, right: PlanNode, join_type: JoinType, condition: Option<Expr>) -> Self {
        PlanNode::Join { left: Box::new(left), right: Box::new(right), join_type, condition }
    }

    pub fn hierarchical(input: PlanNode, start_with: Option<Expr>, connect_by: Expr) -> Self {
        PlanNode::Hierarchical { input: Box::new(input), start_with, connect_by, nocycle: false }
    }

    pub fn project(exprs: Vec<Expr>, input: PlanNode) -> Self {
        PlanNode::Project { exprs, input: Box::new(input) }
    }

    pub fn filter(predicate: Expr, input: PlanNode) -> Self {
        PlanNode::Filter { predicate, input: Box::new(input) }
    }

    pub fn aggregate(partial: bool, group_by: Vec<ColumnRef>, aggregates: Vec<Expr>, input: PlanNode) -> Self {
        PlanNode::Aggregate { partial, group_by, aggregates, input: Box::new(input) }
    }

    pub fn scan(relation: &str, columns: Vec<ColumnRef>, source: SourceHandle) -> Self {
        PlanNode::Scan { relation: relation.to_string(), columns, source }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, PlanNode::BaseRelation { .. } | PlanNode::Scan { .. })
    }

    pub fn is_table_like(&self) -> bool {
        matches!(self, PlanNode::BaseRelation { table_like: true, .. })
    }

    /// Columns this node produces, in order.
    pub fn output(&self) -> Vec<ColumnRef> {
        match self {
            PlanNode::BaseRelation { columns, .. } | PlanNode::Scan { columns, .. } => columns.clone(),
            PlanNode::Subquery { input, .. }
            | PlanNode::Hierarchical { input, .. }
            | PlanNode::Filter { input, .. }
            | PlanNode::Sort { input, .. }
            | PlanNode::Limit { input, .. } => input.output(),
            PlanNode::Join { left, right, .. } => {
                let mut out = left.output();
                out.extend(right.output());
                out
            }
            PlanNode::Project { exprs, .. } => exprs.iter().filter_map(Expr::to_attribute).collect(),
            PlanNode::Aggregate { group_by, aggregates, .. } => group_by
                .iter()
                .cloned()
                .chain(aggregates.iter().filter_map(Expr::to_attribute))
                .collect(),
        }
    }

    /// Short label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            PlanNode::BaseRelation { .. } => "BaseRelation",
            PlanNode::Subquery { .. } => "Subquery",
            PlanNode::Join { .. } => "Join",
            PlanNode::Hierarchical { .. } => "Hierarchical",
            PlanNode::Project { .. } => "Project",
            PlanNode::Filter { .. } => "Filter",
            PlanNode::Aggregate { .. } => "Aggregate",
            PlanNode::Sort { .. } => "Sort",
            PlanNode::Limit { .. } => "Limit",
            PlanNode::Scan { .. } => "Scan",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{AggregateCall, ComparatorOp};

    fn c(id: u64, name: &str) -> ColumnRef { ColumnRef::new(id, name) }

    #[test]
    fn join_output_is_left_then_right() {
        let plan = PlanNode::join(
            PlanNode::relation("a", vec![c(1, "x")]),
            PlanNode::relation("b", vec![c(2, "y"), c(3, "z")]),
            JoinType::Inner,
            None,
        );
        let ids: Vec<u64> = plan.output().iter().map(|c| c.id.0).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn project_output_uses_aliases() {
        let plan = PlanNode::project(
            vec![Expr::col(&c(1, "x")), Expr::col(&c(2, "y")).alias(&c(5, "renamed"))],
            PlanNode::filter(
                Expr::compare(Expr::col(&c(1, "x")), ComparatorOp::Gt, Expr::lit(0)),
                PlanNode::relation("t", vec![c(1, "x"), c(2, "y")]),
            ),
        );
        assert_eq!(plan.output(), vec![c(1, "x"), c(5, "renamed")]);
    }

    #[test]
    fn aggregate_output_is_groups_then_aggregates() {
        let agg = Expr::Aggregate(AggregateCall::count_star()).alias(&c(9, "cnt"));
        let plan = PlanNode::aggregate(true, vec![c(1, "k")], vec![agg], PlanNode::relation("t", vec![c(1, "k")]));
        assert_eq!(plan.output(), vec![c(1, "k"), c(9, "cnt")]);
        assert_eq!(plan.kind(), "Aggregate");
    }

    #[test]
    fn opaque_relations_are_not_table_like() {
        assert!(PlanNode::relation("t", vec![]).is_table_like());
        assert!(!PlanNode::opaque_relation("v", vec![]).is_table_like());
    }
}
