use tracing::debug;

use crate::{
    config::Config,
    plan::{referenced_columns_of, AggregateCall, AggregateFunction, ColumnRef, Expr, PlanNode, ScanRequest, SourceHandle},
    pushdown::{inline_aliases, projection_definitions, prune_filter_project_agg, push_filters, PhysicalPlan, PushedFilters},
};

/// Turns a logical subtree into a physical plan when it recognises the shape.
pub trait PlanningStrategy {
    fn name(&self) -> &'static str;

    /// `None` means "not applicable"; the caller keeps its default plan.
    fn plan(&self, plan: &PlanNode) -> Option<PhysicalPlan>;
}

/// First plan produced by `strategies`, tried in order.
pub fn plan_with(strategies: &[&dyn PlanningStrategy], plan: &PlanNode) -> Option<PhysicalPlan> {
    strategies.iter().find_map(|s| {
        let physical = s.plan(plan);
        if physical.is_some() {
            debug!(strategy = s.name(), "strategy produced a physical plan");
        }
        physical
    })
}

/// Hands partial aggregations over a filtered scan to the scan's backend.
///
/// Matches `Aggregate(partial)` over an optional `Project` over any number of
/// `Filter`s over a `Scan`. When the backend computes every aggregate, the
/// result is one local merge stage over an aggregating scan. When it computes
/// only some of them and the rest are insensitive to duplicates, the scan also
/// groups by every column those aggregates read and a local stage finishes
/// them while merging the pushed ones.
pub struct AggregatePushDown {
    config: Config,
}

impl Default for AggregatePushDown {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

struct ScanShape<'a> {
    project: Option<&'a [Expr]>,
    filters: Vec<Expr>,
    source: &'a SourceHandle,
}

fn match_shape(node: &PlanNode) -> Result<ScanShape<'_>, &'static str> {
    let mut node = node;
    let mut project = None;
    // conjuncts over the projection read its outputs; those under it read the scan
    let mut above = Vec::new();
    let mut below = Vec::new();
    loop {
        match node {
            PlanNode::Filter { predicate, input } => {
                let side = if project.is_some() { &mut below } else { &mut above };
                side.extend(predicate.clone().conjuncts());
                node = input;
            }
            PlanNode::Project { .. } if project.is_some() => return Err("stacked projections"),
            PlanNode::Project { exprs, input } => {
                project = Some(exprs.as_slice());
                node = input;
            }
            PlanNode::Scan { source, .. } => {
                let defs = projection_definitions(project.unwrap_or_default());
                below.extend(above.into_iter().map(|p| inline_aliases(p, &defs)));
                return Ok(ScanShape { project, filters: below, source });
            }
            _ => return Err("input is not a filtered scan"),
        }
    }
}

fn rejected(reason: &str) -> Option<PhysicalPlan> {
    debug!(reason, "aggregate push-down rejected");
    None
}

/// `agg(...) AS out` rewritten to combine partial values already stored in `out`.
fn merged(aggregate: &Expr) -> Option<Expr> {
    let out = aggregate.to_attribute()?;
    let call = aggregate.as_aggregate()?.merge_over(&out)?;
    Some(Expr::Aggregate(call).alias(&out))
}

/// Final value of `out` when exactly one partial row reaches each group.
fn passed_through(aggregate: &Expr) -> Option<Expr> {
    let out = aggregate.to_attribute()?;
    Some(Expr::Aggregate(AggregateCall::new(AggregateFunction::Max, vec![Expr::col(&out)])).alias(&out))
}

fn conjunction(mut predicates: Vec<Expr>) -> Option<Expr> {
    match predicates.len() {
        0 => None,
        1 => predicates.pop(),
        _ => Some(Expr::And(predicates)),
    }
}

impl AggregatePushDown {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn plan_aggregate(&self, group_by: &[ColumnRef], aggregates: &[Expr], input: &PlanNode) -> Option<PhysicalPlan> {
        let shape = match match_shape(input) {
            Ok(shape) => shape,
            Err(reason) => return rejected(reason),
        };
        if aggregates.iter().any(|a| a.as_aggregate().is_none() || a.to_attribute().is_none()) {
            return rejected("aggregate list holds an unnamed or non-aggregate expression");
        }
        let source = shape.source.source();

        let filters = push_filters(source, &shape.filters);
        if !filters.is_exact() {
            if self.config.require_exact_filters {
                return rejected("filter cannot be handed to the backend exactly");
            }
            debug!(source = source.name(), local = filters.remaining.len(), "aggregating locally over a filtered scan");
            return Some(Self::local_plan(group_by, aggregates, &shape, filters));
        }

        let defs = projection_definitions(shape.project.unwrap_or_default());
        let pushed_groups: Vec<Expr> = group_by
            .iter()
            .map(|g| match defs.get(&g.id) {
                Some(def) => def.clone().alias(g),
                None => Expr::col(g),
            })
            .collect();
        let (supported, unsupported): (Vec<Expr>, Vec<Expr>) = aggregates
            .iter()
            .map(|a| inline_aliases(a.clone(), &defs))
            .partition(|a| source.supports_aggregate(a));

        if unsupported.is_empty() {
            // the scan groups by exactly `group_by`, so each group arrives as one row
            let finals = match supported.iter().map(|a| merged(a).or_else(|| passed_through(a))).collect::<Option<Vec<_>>>() {
                Some(f) => f,
                None => return rejected("a pushed aggregate has no output column"),
            };
            let scan = self.scan_plan(&shape, pushed_groups, supported, filters);
            debug!(source = source.name(), aggregates = finals.len(), "all aggregates pushed down");
            return Some(PhysicalPlan::HashAggregate {
                partial: false,
                group_by: group_by.to_vec(),
                aggregates: finals,
                input: Box::new(scan),
            });
        }

        let merged_supported = match supported.iter().map(merged).collect::<Option<Vec<_>>>() {
            Some(m) => m,
            None => return rejected("a pushed aggregate has no merge function"),
        };

        if !self.config.split_aggregates {
            return rejected("backend supports only part of the aggregate list");
        }
        if !unsupported.iter().all(|a| a.as_aggregate().is_some_and(AggregateCall::is_duplicate_insensitive)) {
            return rejected("local aggregate is sensitive to duplicates");
        }

        let mut stage_groups = pushed_groups;
        for c in referenced_columns_of(&unsupported) {
            if !stage_groups.iter().any(|g| g.to_attribute().is_some_and(|a| a.id == c.id)) {
                stage_groups.push(Expr::col(&c));
            }
        }
        // an empty input would leave the merged COUNT null instead of zero
        let counts = supported.iter().any(|a| a.as_aggregate().is_some_and(|c| c.func == AggregateFunction::Count));
        if group_by.is_empty() && !stage_groups.is_empty() && counts {
            return rejected("global COUNT cannot be split");
        }

        let scan = self.scan_plan(&shape, stage_groups, supported, filters);
        debug!(
            source = source.name(),
            pushed = merged_supported.len(),
            local = unsupported.len(),
            "aggregates split between backend and local stage"
        );
        Some(PhysicalPlan::HashAggregate {
            partial: false,
            group_by: group_by.to_vec(),
            aggregates: unsupported.into_iter().chain(merged_supported).collect(),
            input: Box::new(scan),
        })
    }

    fn scan_plan(&self, shape: &ScanShape<'_>, group_by: Vec<Expr>, aggregates: Vec<Expr>, filters: PushedFilters) -> PhysicalPlan {
        let project_list: Vec<Expr> = match shape.project {
            Some(exprs) => exprs.to_vec(),
            None => referenced_columns_of(group_by.iter().chain(&aggregates)).iter().map(Expr::col).collect(),
        };
        let request = ScanRequest { columns: vec![], filters: filters.pushed, group_by, aggregates };
        prune_filter_project_agg(&project_list, &shape.filters, shape.source, request)
    }

    /// Plain scan with whatever filters translate, everything else local.
    fn local_plan(group_by: &[ColumnRef], aggregates: &[Expr], shape: &ScanShape<'_>, filters: PushedFilters) -> PhysicalPlan {
        let columns = match shape.project {
            Some(exprs) => referenced_columns_of(exprs.iter().chain(&filters.remaining)),
            None => {
                let groups: Vec<Expr> = group_by.iter().map(Expr::col).collect();
                referenced_columns_of(groups.iter().chain(aggregates).chain(&filters.remaining))
            }
        };
        let mut plan = PhysicalPlan::AggregateScan {
            source: shape.source.clone(),
            request: ScanRequest { columns, filters: filters.pushed, ..Default::default() },
        };
        if let Some(predicate) = conjunction(filters.remaining) {
            plan = PhysicalPlan::Filter { predicate, input: Box::new(plan) };
        }
        if let Some(exprs) = shape.project {
            plan = PhysicalPlan::Project { exprs: exprs.to_vec(), input: Box::new(plan) };
        }
        PhysicalPlan::HashAggregate {
            partial: false,
            group_by: group_by.to_vec(),
            aggregates: aggregates.to_vec(),
            input: Box::new(plan),
        }
    }
}

impl PlanningStrategy for AggregatePushDown {
    fn name(&self) -> &'static str {
        "aggregate_pushdown"
    }

    fn plan(&self, plan: &PlanNode) -> Option<PhysicalPlan> {
        match plan {
            PlanNode::Aggregate { partial: true, group_by, aggregates, input } => {
                self.plan_aggregate(group_by, aggregates, input)
            }
            _ => None,
        }
    }
}
