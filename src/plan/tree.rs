use indexmap::IndexMap;

use crate::plan::{ColumnId, ColumnRef, Expr, OrderBy, PlanNode};

/// Generic traversal over plan trees. Rewrites consume the tree and build a
/// new one; nothing is mutated in place.
impl PlanNode {
    pub fn children(&self) -> Vec<&PlanNode> {
        match self {
            PlanNode::BaseRelation { .. } | PlanNode::Scan { .. } => vec![],
            PlanNode::Join { left, right, .. } => vec![&**left, &**right],
            PlanNode::Subquery { input, .. }
            | PlanNode::Hierarchical { input, .. }
            | PlanNode::Project { input, .. }
            | PlanNode::Filter { input, .. }
            | PlanNode::Aggregate { input, .. }
            | PlanNode::Sort { input, .. }
            | PlanNode::Limit { input, .. } => vec![&**input],
        }
    }

    /// Rebuild this node with `f` applied to each direct child.
    pub fn map_children<F, E>(self, mut f: F) -> Result<PlanNode, E>
    where
        F: FnMut(PlanNode) -> Result<PlanNode, E>,
    {
        let mut boxed = |b: Box<PlanNode>| -> Result<Box<PlanNode>, E> { Ok(Box::new(f(*b)?)) };
        Ok(match self {
            leaf @ (PlanNode::BaseRelation { .. } | PlanNode::Scan { .. }) => leaf,
            PlanNode::Subquery { alias, input } => PlanNode::Subquery { alias, input: boxed(input)? },
            PlanNode::Join { left, right, join_type, condition } => PlanNode::Join {
                left: boxed(left)?,
                right: boxed(right)?,
                join_type,
                condition,
            },
            PlanNode::Hierarchical { input, start_with, connect_by, nocycle } => PlanNode::Hierarchical {
                input: boxed(input)?,
                start_with,
                connect_by,
                nocycle,
            },
            PlanNode::Project { exprs, input } => PlanNode::Project { exprs, input: boxed(input)? },
            PlanNode::Filter { predicate, input } => PlanNode::Filter { predicate, input: boxed(input)? },
            PlanNode::Aggregate { partial, group_by, aggregates, input } => PlanNode::Aggregate {
                partial,
                group_by,
                aggregates,
                input: boxed(input)?,
            },
            PlanNode::Sort { keys, input } => PlanNode::Sort { keys, input: boxed(input)? },
            PlanNode::Limit { limit, offset, input } => PlanNode::Limit { limit, offset, input: boxed(input)? },
        })
    }

    /// Post-order rewrite: children are transformed first, then `f` sees the
    /// rebuilt node.
    pub fn transform_up<F, E>(self, f: &mut F) -> Result<PlanNode, E>
    where
        F: FnMut(PlanNode) -> Result<PlanNode, E>,
    {
        let node = self.map_children(|c| c.transform_up(&mut *f))?;
        f(node)
    }

    /// Apply `f` to each expression slot of this node, without descending
    /// into child plans. Column-list slots (grouping attributes) are passed
    /// as `Expr::Column` and read back as the attribute of the result.
    pub fn map_expressions<F, E>(self, mut f: F) -> Result<PlanNode, E>
    where
        F: FnMut(Expr) -> Result<Expr, E>,
    {
        Ok(match self {
            leaf @ (PlanNode::BaseRelation { .. } | PlanNode::Scan { .. } | PlanNode::Subquery { .. }) => leaf,
            PlanNode::Join { left, right, join_type, condition } => PlanNode::Join {
                left,
                right,
                join_type,
                condition: condition.map(&mut f).transpose()?,
            },
            PlanNode::Hierarchical { input, start_with, connect_by, nocycle } => PlanNode::Hierarchical {
                input,
                start_with: start_with.map(&mut f).transpose()?,
                connect_by: f(connect_by)?,
                nocycle,
            },
            PlanNode::Project { exprs, input } => PlanNode::Project {
                exprs: exprs.into_iter().map(&mut f).collect::<Result<_, _>>()?,
                input,
            },
            PlanNode::Filter { predicate, input } => PlanNode::Filter { predicate: f(predicate)?, input },
            PlanNode::Aggregate { partial, group_by, aggregates, input } => PlanNode::Aggregate {
                partial,
                group_by: group_by
                    .into_iter()
                    .map(|c| map_column(c, &mut f))
                    .collect::<Result<_, _>>()?,
                aggregates: aggregates.into_iter().map(&mut f).collect::<Result<_, _>>()?,
                input,
            },
            PlanNode::Sort { keys, input } => PlanNode::Sort {
                keys: keys
                    .into_iter()
                    .map(|k| Ok(OrderBy { expr: f(k.expr)?, ascending: k.ascending }))
                    .collect::<Result<_, E>>()?,
                input,
            },
            limit @ PlanNode::Limit { .. } => limit,
        })
    }

    /// Top-down rewrite of every expression subtree held by this node.
    pub fn transform_expressions_down<F, E>(self, f: &mut F) -> Result<PlanNode, E>
    where
        F: FnMut(Expr) -> Result<Expr, E>,
    {
        self.map_expressions(|e| e.transform_down(&mut *f))
    }

    /// Expressions held by this node itself, in slot order.
    pub fn expressions(&self) -> Vec<Expr> {
        match self {
            PlanNode::BaseRelation { .. } | PlanNode::Scan { .. } | PlanNode::Subquery { .. } | PlanNode::Limit { .. } => {
                vec![]
            }
            PlanNode::Join { condition, .. } => condition.iter().cloned().collect(),
            PlanNode::Hierarchical { start_with, connect_by, .. } => {
                start_with.iter().cloned().chain(std::iter::once(connect_by.clone())).collect()
            }
            PlanNode::Project { exprs, .. } => exprs.clone(),
            PlanNode::Filter { predicate, .. } => vec![predicate.clone()],
            PlanNode::Aggregate { group_by, aggregates, .. } => {
                group_by.iter().map(Expr::col).chain(aggregates.iter().cloned()).collect()
            }
            PlanNode::Sort { keys, .. } => keys.iter().map(|k| k.expr.clone()).collect(),
        }
    }

    /// Every node for which `f` returns `Some`, in pre-order (a node before
    /// its children, left before right).
    pub fn collect<T>(&self, f: &mut impl FnMut(&PlanNode) -> Option<T>) -> Vec<T> {
        let mut out = Vec::new();
        self.collect_into(f, &mut out);
        out
    }

    fn collect_into<T>(&self, f: &mut impl FnMut(&PlanNode) -> Option<T>, out: &mut Vec<T>) {
        if let Some(v) = f(self) {
            out.push(v);
        }
        for c in self.children() {
            c.collect_into(f, out);
        }
    }

    /// Distinct column references read anywhere in the tree.
    pub fn references(&self) -> Vec<ColumnRef> {
        let mut seen: IndexMap<ColumnId, ColumnRef> = IndexMap::new();
        for exprs in self.collect(&mut |n| Some(n.expressions())) {
            for c in exprs.iter().flat_map(Expr::referenced_columns) {
                seen.entry(c.id).or_insert(c);
            }
        }
        seen.into_values().collect()
    }

    /// Every column reference in the tree, duplicates included.
    pub fn all_references(&self) -> Vec<ColumnRef> {
        let mut out = Vec::new();
        for exprs in self.collect(&mut |n| Some(n.expressions())) {
            for e in &exprs {
                e.for_each(&mut |x| {
                    if let Expr::Column(c) = x {
                        out.push(c.clone());
                    }
                });
            }
        }
        out
    }
}

fn map_column<F, E>(c: ColumnRef, f: &mut F) -> Result<ColumnRef, E>
where
    F: FnMut(Expr) -> Result<Expr, E>,
{
    let fallback = c.clone();
    Ok(f(Expr::Column(c))?.to_attribute().unwrap_or(fallback))
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use super::*;
    use crate::plan::{AggregateCall, AggregateFunction, ComparatorOp, JoinType};

    fn c(id: u64, name: &str) -> ColumnRef { ColumnRef::new(id, name) }

    fn sample() -> PlanNode {
        let left = PlanNode::subquery("a", PlanNode::relation("r", vec![c(1, "x")]));
        let right = PlanNode::relation("s", vec![c(2, "y")]);
        let join = PlanNode::join(
            left,
            right,
            JoinType::Inner,
            Some(Expr::compare(Expr::col(&c(1, "x")), ComparatorOp::Eq, Expr::col(&c(2, "y")))),
        );
        PlanNode::aggregate(
            false,
            vec![c(1, "x")],
            vec![Expr::Aggregate(AggregateCall::new(AggregateFunction::Sum, vec![Expr::col(&c(2, "y"))])).alias(&c(3, "s"))],
            join,
        )
    }

    #[test]
    fn transform_up_visits_leaves_first() {
        let mut order = Vec::new();
        sample()
            .transform_up(&mut |n| -> Result<PlanNode, Infallible> {
                order.push(n.kind());
                Ok(n)
            })
            .unwrap();
        assert_eq!(order, vec!["BaseRelation", "Subquery", "BaseRelation", "Join", "Aggregate"]);
    }

    #[test]
    fn collect_is_pre_order() {
        let names = sample().collect(&mut |n| match n {
            PlanNode::BaseRelation { name, .. } => Some(name.clone()),
            PlanNode::Subquery { alias, .. } => Some(alias.clone()),
            _ => None,
        });
        assert_eq!(names, vec!["a", "r", "s"]);
    }

    #[test]
    fn expression_rewrite_stays_on_the_node() {
        let qualify = &mut |e: Expr| -> Result<Expr, Infallible> {
            Ok(match e {
                Expr::Column(col) => Expr::Column(col.with_qualifiers(vec!["q".into()])),
                other => other,
            })
        };
        let out = sample().transform_expressions_down(qualify).unwrap();
        match &out {
            PlanNode::Aggregate { group_by, input, .. } => {
                assert_eq!(group_by[0].qualifier(), Some("q"));
                match input.as_ref() {
                    PlanNode::Join { condition: Some(cond), .. } => {
                        assert!(cond.referenced_columns().iter().all(|c| c.qualifiers.is_empty()));
                    }
                    other => panic!("expected Join, got {other:?}"),
                }
            }
            other => panic!("expected Aggregate, got {other:?}"),
        }
    }

    #[test]
    fn references_cover_the_whole_tree() {
        let ids: Vec<u64> = sample().references().iter().map(|c| c.id.0).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(sample().all_references().len(), 4);
    }
}
