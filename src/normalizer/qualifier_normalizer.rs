use tracing::{debug, trace, warn};

use crate::{config::Config, error::PlanError, normalizer::AliasScope, plan::{ColumnRef, Expr, PlanNode}};

/// A column reference whose originating aliased subtree could not be found.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub column: ColumnRef,
    pub node: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub plan: PlanNode,
    pub diagnostics: Vec<Diagnostic>,
}

/// Rewrites a logical plan so every column reference carries exactly one
/// qualifier: the alias of the nearest aliased subtree producing it.
/// Table-like relations get a generated alias (`table1`, `table2`, ... in
/// post-order) unless they already sit directly under an alias.
///
/// The rewrite is a single bottom-up pass; running it on its own output
/// returns the same plan.
pub struct QualifierNormalizer {
    config: Config,
}

impl Default for QualifierNormalizer {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl QualifierNormalizer {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn normalize(&self, plan: PlanNode) -> Result<Normalized, PlanError> {
        if plan.is_leaf() && !self.wraps(&plan) {
            trace!(node = plan.kind(), "single opaque relation; nothing to qualify");
            return Ok(Normalized { plan, diagnostics: vec![] });
        }

        let mut ctx = NormalizeContext { config: &self.config, counter: 0, pending: None, diagnostics: vec![] };
        let plan = plan.transform_up(&mut |node| ctx.rewrite(node))?;
        debug!(generated_aliases = ctx.counter, unresolved = ctx.diagnostics.len(), "qualifiers normalized");
        Ok(Normalized { plan, diagnostics: ctx.diagnostics })
    }

    fn wraps(&self, node: &PlanNode) -> bool {
        self.config.wrap_table_relations && node.is_table_like()
    }
}

/// State owned by one `normalize` call.
struct NormalizeContext<'a> {
    config: &'a Config,
    counter: usize,
    /// Alias generated by the node visited just before this one. Only the
    /// direct parent of a freshly wrapped relation may see it.
    pending: Option<String>,
    diagnostics: Vec<Diagnostic>,
}

impl NormalizeContext<'_> {
    fn rewrite(&mut self, node: PlanNode) -> Result<PlanNode, PlanError> {
        let pending = self.pending.take();
        match node {
            PlanNode::BaseRelation { table_like: true, .. } if self.config.wrap_table_relations => Ok(self.wrap(node)),
            PlanNode::Subquery { alias, input } => Ok(self.collapse(alias, *input, pending)),
            PlanNode::Hierarchical { .. } => self.float_hierarchical(node, pending),
            other => self.qualify(expose_join_aliases(other)),
        }
    }

    fn wrap(&mut self, relation: PlanNode) -> PlanNode {
        self.counter += 1;
        let alias = self.config.alias_for(self.counter);
        trace!(alias = %alias, "wrapping table-like relation");
        self.pending = Some(alias.clone());
        PlanNode::Subquery { alias, input: Box::new(relation) }
    }

    /// `alias(generated(r))` where `generated` was just produced by `wrap`
    /// becomes `alias(r)`; the generated number is handed back. A floated
    /// hierarchical node already qualified its clauses with `generated`, so
    /// those move over to `alias`.
    fn collapse(&mut self, alias: String, input: PlanNode, pending: Option<String>) -> PlanNode {
        match input {
            PlanNode::Subquery { alias: generated, input: inner } if pending.as_deref() == Some(generated.as_str()) => {
                self.counter -= 1;
                trace!(alias = %alias, released = %generated, "relation already aliased");
                let inner = requalify(*inner, &generated, &alias);
                PlanNode::Subquery { alias, input: Box::new(inner) }
            }
            input => PlanNode::Subquery { alias, input: Box::new(input) },
        }
    }

    /// Qualify START WITH / CONNECT BY against the child alias, then move that
    /// alias above the hierarchical node so its parent sees a plain aliased
    /// relation.
    fn float_hierarchical(&mut self, node: PlanNode, pending: Option<String>) -> Result<PlanNode, PlanError> {
        let PlanNode::Hierarchical { input, start_with, connect_by, nocycle } = self.qualify(node)? else {
            return Err(PlanError::UnsupportedExpression("hierarchical node changed shape".into()));
        };
        match *input {
            PlanNode::Subquery { alias, input: inner } => {
                trace!(alias = %alias, "floating alias above hierarchical query");
                if pending.as_deref() == Some(alias.as_str()) {
                    self.pending = Some(alias.clone());
                }
                let hierarchical = PlanNode::Hierarchical { input: inner, start_with, connect_by, nocycle };
                Ok(PlanNode::Subquery { alias, input: Box::new(hierarchical) })
            }
            input => Ok(PlanNode::Hierarchical { input: Box::new(input), start_with, connect_by, nocycle }),
        }
    }

    fn qualify(&mut self, node: PlanNode) -> Result<PlanNode, PlanError> {
        let scope = AliasScope::of(&node);
        let kind = node.kind();
        let diagnostics = &mut self.diagnostics;
        node.transform_expressions_down(&mut |e| match e {
            Expr::Column(c) => resolve(c, &scope, kind, diagnostics).map(Expr::Column),
            other => Ok(other),
        })
    }
}

fn resolve(
    column: ColumnRef,
    scope: &AliasScope,
    node: &'static str,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<ColumnRef, PlanError> {
    if column.qualifiers.len() > 1 {
        return Err(PlanError::AmbiguousQualifier { qualifiers: column.qualifiers.clone(), column });
    }
    match scope.alias_of(&column) {
        Some(alias) => Ok(column.with_qualifiers(vec![alias.to_string()])),
        None => {
            warn!(column = %column, node, "column origin not found; reference left as is");
            diagnostics.push(Diagnostic { column: column.clone(), node });
            Ok(column)
        }
    }
}

/// Point references qualified by `from` at `to`, in `node`'s own expressions.
fn requalify(node: PlanNode, from: &str, to: &str) -> PlanNode {
    node.transform_expressions_down(&mut |e| {
        Ok(match e {
            Expr::Column(c) if c.qualifier() == Some(from) => Expr::Column(c.with_qualifiers(vec![to.to_string()])),
            other => other,
        })
    })
    .unwrap_or_else(|never: std::convert::Infallible| match never {})
}

/// A join side shaped `Project(Subquery(alias, c))` becomes
/// `Subquery(alias, Project(Subquery(alias, c)))` so the alias is visible at
/// the join while the projection keeps its own scope.
fn expose_join_aliases(node: PlanNode) -> PlanNode {
    match node {
        PlanNode::Join { left, right, join_type, condition } => PlanNode::Join {
            left: Box::new(expose_projection_alias(*left)),
            right: Box::new(expose_projection_alias(*right)),
            join_type,
            condition,
        },
        other => other,
    }
}

fn expose_projection_alias(side: PlanNode) -> PlanNode {
    match side {
        PlanNode::Project { exprs, input } => match *input {
            PlanNode::Subquery { alias, input: child } => {
                let projected = PlanNode::Project {
                    exprs,
                    input: Box::new(PlanNode::Subquery { alias: alias.clone(), input: child }),
                };
                PlanNode::Subquery { alias, input: Box::new(projected) }
            }
            input => PlanNode::Project { exprs, input: Box::new(input) },
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{AggregateCall, AggregateFunction, ComparatorOp, JoinType};

    fn c(id: u64, name: &str) -> ColumnRef { ColumnRef::new(id, name) }
    fn col(id: u64, name: &str) -> Expr { Expr::col(&c(id, name)) }
    fn eq(l: Expr, r: Expr) -> Expr { Expr::compare(l, ComparatorOp::Eq, r) }

    fn normalize(plan: PlanNode) -> Normalized {
        QualifierNormalizer::default().normalize(plan).unwrap()
    }

    fn qualifier_of(plan: &PlanNode, id: u64) -> Vec<Option<String>> {
        plan.all_references()
            .into_iter()
            .filter(|c| c.id.0 == id)
            .map(|c| c.qualifier().map(str::to_string))
            .collect()
    }

    fn people_orders() -> PlanNode {
        let people = PlanNode::relation("people", vec![c(1, "id"), c(2, "name")]);
        let orders = PlanNode::relation("orders", vec![c(3, "id"), c(4, "person_id")]);
        let join = PlanNode::join(people, orders, JoinType::Inner, Some(eq(col(1, "id"), col(4, "person_id"))));
        PlanNode::project(vec![col(2, "name"), col(3, "id")], join)
    }

    #[test]
    fn plain_relations_get_numbered_aliases_in_traversal_order() {
        let out = normalize(people_orders()).plan;
        let aliases = out.collect(&mut |n| match n {
            PlanNode::Subquery { alias, input } => match input.as_ref() {
                PlanNode::BaseRelation { name, .. } => Some((alias.clone(), name.clone())),
                _ => None,
            },
            _ => None,
        });
        assert_eq!(
            aliases,
            vec![("table1".to_string(), "people".to_string()), ("table2".to_string(), "orders".to_string())]
        );
        assert_eq!(qualifier_of(&out, 1), vec![Some("table1".to_string())]);
        assert_eq!(qualifier_of(&out, 4), vec![Some("table2".to_string())]);
        assert_eq!(qualifier_of(&out, 2), vec![Some("table1".to_string())]);
    }

    #[test]
    fn counter_is_scoped_to_one_invocation() {
        let n = QualifierNormalizer::default();
        let first = n.normalize(people_orders()).unwrap().plan;
        let second = n.normalize(people_orders()).unwrap().plan;
        assert_eq!(first, second);
    }

    #[test]
    fn normalizing_twice_is_a_no_op() {
        let hier = PlanNode::hierarchical(
            PlanNode::relation("emp", vec![c(10, "id"), c(11, "mgr")]),
            Some(Expr::is_null(col(11, "mgr"))),
            eq(col(10, "id"), col(11, "mgr")),
        );
        let user_aliased = PlanNode::subquery("d", PlanNode::relation("dept", vec![c(12, "id"), c(13, "head")]));
        let side = PlanNode::project(vec![col(13, "head")], user_aliased);
        let join = PlanNode::join(hier, side, JoinType::Left, Some(eq(col(10, "id"), col(13, "head"))));
        let agg = PlanNode::aggregate(
            false,
            vec![c(10, "id")],
            vec![Expr::Aggregate(AggregateCall::count_star()).alias(&c(14, "cnt"))],
            join,
        );
        let plans = vec![people_orders(), agg, PlanNode::relation("solo", vec![c(20, "a")])];

        for plan in plans {
            let once = normalize(plan).plan;
            let twice = normalize(once.clone()).plan;
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn every_reference_has_at_most_one_qualifier() {
        let out = normalize(people_orders()).plan;
        assert!(out.all_references().iter().all(|c| c.qualifiers.len() <= 1));
    }

    #[test]
    fn renamed_column_is_qualified_by_the_renaming_alias() {
        // r(colX) AS a1 -> SELECT colX AS colY -> AS a2 -> SELECT colY
        let a1 = PlanNode::subquery("a1", PlanNode::relation("r", vec![c(1, "colX")]));
        let renamed = PlanNode::project(vec![col(1, "colX").alias(&c(2, "colY"))], a1);
        let a2 = PlanNode::subquery("a2", renamed);
        let top = PlanNode::project(vec![col(2, "colY")], a2);

        let out = normalize(top).plan;
        assert_eq!(qualifier_of(&out, 2), vec![Some("a2".to_string())]);
        assert_eq!(qualifier_of(&out, 1), vec![Some("a1".to_string())]);
        // user aliases suppress wrapping
        assert!(out.collect(&mut |n| matches!(n, PlanNode::Subquery { alias, .. } if alias.starts_with("table")).then_some(())).is_empty());
    }

    #[test]
    fn more_than_one_qualifier_aborts() {
        let bad = ColumnRef { qualifiers: vec!["a".into(), "b".into()], ..c(1, "id") };
        let plan = PlanNode::filter(Expr::is_null(Expr::col(&bad)), PlanNode::relation("t", vec![c(1, "id")]));
        match QualifierNormalizer::default().normalize(plan) {
            Err(PlanError::AmbiguousQualifier { column, qualifiers }) => {
                assert_eq!(column.id, bad.id);
                assert_eq!(qualifiers, vec!["a".to_string(), "b".to_string()]);
            }
            other => panic!("expected AmbiguousQualifier, got {other:?}"),
        }
    }

    #[test]
    fn unresolved_reference_is_kept_and_reported() {
        let synthetic = c(99, "rownum");
        let plan = PlanNode::project(
            vec![col(1, "id"), Expr::Function { name: "abs".into(), args: vec![Expr::col(&synthetic)] }.alias(&c(100, "x"))],
            PlanNode::relation("t", vec![c(1, "id")]),
        );
        let out = normalize(plan);
        assert_eq!(out.diagnostics, vec![Diagnostic { column: synthetic.clone(), node: "Project" }]);
        assert_eq!(qualifier_of(&out.plan, 99), vec![None]);
        assert_eq!(qualifier_of(&out.plan, 1), vec![Some("table1".to_string())]);
    }

    #[test]
    fn hierarchical_alias_floats_outward() {
        let hier = PlanNode::hierarchical(
            PlanNode::relation("emp", vec![c(10, "id"), c(11, "mgr")]),
            Some(Expr::is_null(col(11, "mgr"))),
            eq(col(10, "id"), col(11, "mgr")),
        );
        let out = normalize(PlanNode::project(vec![col(10, "id")], hier)).plan;
        match &out {
            PlanNode::Project { input, exprs } => {
                assert_eq!(exprs[0].to_attribute().unwrap().qualifier(), Some("table1"));
                match input.as_ref() {
                    PlanNode::Subquery { alias, input } => {
                        assert_eq!(alias, "table1");
                        match input.as_ref() {
                            PlanNode::Hierarchical { input, start_with, connect_by, .. } => {
                                assert!(matches!(input.as_ref(), PlanNode::BaseRelation { .. }));
                                let refs = start_with.iter().chain(std::iter::once(connect_by)).flat_map(Expr::referenced_columns);
                                assert!(refs.into_iter().all(|c| c.qualifier() == Some("table1")));
                            }
                            other => panic!("expected Hierarchical, got {other:?}"),
                        }
                    }
                    other => panic!("expected Subquery, got {other:?}"),
                }
            }
            other => panic!("expected Project, got {other:?}"),
        }
    }

    #[test]
    fn user_alias_over_hierarchical_query_owns_its_clauses() {
        let hier = PlanNode::hierarchical(
            PlanNode::relation("emp", vec![c(10, "id"), c(11, "mgr")]),
            Some(Expr::is_null(col(11, "mgr"))),
            eq(col(10, "id"), col(11, "mgr")),
        );
        let plan = PlanNode::project(vec![col(10, "id")], PlanNode::subquery("e", hier));
        let out = normalize(plan).plan;

        let aliases = out.collect(&mut |n| match n {
            PlanNode::Subquery { alias, .. } => Some(alias.clone()),
            _ => None,
        });
        assert_eq!(aliases, vec!["e".to_string()]);
        assert!(out.all_references().iter().all(|c| c.qualifier() == Some("e")));
        assert_eq!(normalize(out.clone()).plan, out);
    }

    #[test]
    fn projected_join_side_exposes_its_alias() {
        let left = PlanNode::project(
            vec![col(1, "id")],
            PlanNode::subquery("p", PlanNode::relation("people", vec![c(1, "id"), c(2, "name")])),
        );
        let right = PlanNode::subquery("o", PlanNode::relation("orders", vec![c(4, "person_id")]));
        let plan = PlanNode::join(left, right, JoinType::Inner, Some(eq(col(1, "id"), col(4, "person_id"))));

        let out = normalize(plan).plan;
        match &out {
            PlanNode::Join { left, condition: Some(cond), .. } => {
                match left.as_ref() {
                    PlanNode::Subquery { alias, input } => {
                        assert_eq!(alias, "p");
                        match input.as_ref() {
                            PlanNode::Project { input, .. } => {
                                assert!(matches!(input.as_ref(), PlanNode::Subquery { alias, .. } if alias == "p"))
                            }
                            other => panic!("expected Project, got {other:?}"),
                        }
                    }
                    other => panic!("expected Subquery, got {other:?}"),
                }
                assert!(cond.referenced_columns().iter().all(|c| c.qualifier().is_some()));
                assert_eq!(qualifier_of(&out, 1), vec![Some("p".to_string()), Some("p".to_string())]);
                assert_eq!(qualifier_of(&out, 4), vec![Some("o".to_string())]);
            }
            other => panic!("expected Join, got {other:?}"),
        }
    }

    #[test]
    fn opaque_relations_are_left_alone() {
        let opaque = PlanNode::opaque_relation("v_sales", vec![c(1, "amount")]);
        let out = normalize(opaque.clone());
        assert_eq!(out.plan, opaque);

        let filtered = PlanNode::filter(Expr::is_null(col(1, "amount")), opaque);
        let out = normalize(filtered.clone());
        assert_eq!(out.plan, filtered);
        assert_eq!(out.diagnostics.len(), 1);
    }

    #[test]
    fn wrapping_and_prefix_follow_config() {
        let custom = QualifierNormalizer::new(Config::with_alias_prefix("rel_"));
        let out = custom.normalize(people_orders()).unwrap().plan;
        assert_eq!(qualifier_of(&out, 1), vec![Some("rel_1".to_string())]);

        let off = QualifierNormalizer::new(Config { wrap_table_relations: false, ..Config::default() });
        let out = off.normalize(people_orders()).unwrap();
        assert!(out.plan.collect(&mut |n| matches!(n, PlanNode::Subquery { .. }).then_some(())).is_empty());
        assert_eq!(out.diagnostics.len(), 4);
    }

    #[test]
    fn grouping_attributes_are_qualified() {
        let plan = PlanNode::aggregate(
            false,
            vec![c(1, "k")],
            vec![Expr::Aggregate(AggregateCall::new(AggregateFunction::Sum, vec![col(2, "v")])).alias(&c(3, "s"))],
            PlanNode::relation("kv", vec![c(1, "k"), c(2, "v")]),
        );
        match normalize(plan).plan {
            PlanNode::Aggregate { group_by, aggregates, .. } => {
                assert_eq!(group_by[0].qualifier(), Some("table1"));
                assert_eq!(aggregates[0].referenced_columns()[0].qualifier(), Some("table1"));
                assert_eq!(aggregates[0].to_attribute().unwrap().qualifiers, Vec::<String>::new());
            }
            other => panic!("expected Aggregate, got {other:?}"),
        }
    }
}
