use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::{
    error::PlanError,
    executor::{Accumulator, Eval, Helpers, DEFAULT_AGGREGATES},
    plan::{Expr, Row},
    pushdown::PhysicalPlan,
};

pub trait Executor {
    fn execute(&self) -> Result<Vec<Row>, PlanError>;
}

/// Runs a [`PhysicalPlan`] locally. Output rows are keyed by the row key of
/// each output column.
pub struct PlanExecutor {
    plan: PhysicalPlan,
}

impl Executor for PlanExecutor {
    fn execute(&self) -> Result<Vec<Row>, PlanError> {
        Self::run_plan(&self.plan)
    }
}

type GroupEntry = (Vec<Value>, Vec<Box<dyn Accumulator>>);

impl PlanExecutor {
    pub fn new(plan: PhysicalPlan) -> Self { Self { plan } }

    pub fn run_plan(plan: &PhysicalPlan) -> Result<Vec<Row>, PlanError> {
        match plan {
            PhysicalPlan::AggregateScan { source, request } => {
                let rows: Vec<Row> = source.source().build_scan(request)?.collect();
                tracing::trace!(source = source.source().name(), rows = rows.len(), "scan returned");
                Ok(rows)
            }
            PhysicalPlan::Filter { predicate, input } => {
                let rows = Self::run_plan(input)?;
                Ok(rows.into_iter().filter(|r| Eval::eval_predicate3(predicate, r).accepts()).collect())
            }
            PhysicalPlan::Project { exprs, input } => {
                let rows = Self::run_plan(input)?;
                Self::project_rows(rows, exprs)
            }
            PhysicalPlan::HashAggregate { group_by, aggregates, input, .. } => {
                let rows = Self::run_plan(input)?;
                let keys: Vec<Expr> = group_by.iter().map(Expr::col).collect();
                Self::aggregate_rows(rows, &keys, aggregates)
            }
        }
    }

    pub fn project_rows(rows: Vec<Row>, exprs: &[Expr]) -> Result<Vec<Row>, PlanError> {
        let names = exprs
            .iter()
            .map(|e| Self::output_key(e))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows
            .iter()
            .map(|row| {
                names
                    .iter()
                    .zip(exprs)
                    .map(|(name, e)| (name.clone(), Eval::eval_scalar(e, row)))
                    .collect::<Map<String, Value>>()
            })
            .collect())
    }

    // ---- Aggregation runner ----

    /// Group `rows` by `group_keys` and fold each aggregate expression per
    /// group. Groups come out in order of first appearance. With no grouping
    /// keys an empty input still yields one row.
    pub fn aggregate_rows(rows: Vec<Row>, group_keys: &[Expr], aggregates: &[Expr]) -> Result<Vec<Row>, PlanError> {
        let calls = aggregates
            .iter()
            .map(|e| {
                e.as_aggregate()
                    .ok_or_else(|| PlanError::UnsupportedExpression(format!("{} is not an aggregate", e)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let group_names = group_keys.iter().map(Self::output_key).collect::<Result<Vec<_>, _>>()?;
        let agg_names = aggregates.iter().map(Self::output_key).collect::<Result<Vec<_>, _>>()?;

        let new_accumulators = || -> Result<Vec<Box<dyn Accumulator>>, PlanError> {
            calls.iter().map(|call| DEFAULT_AGGREGATES.accumulator_for(call)).collect()
        };

        let mut groups: IndexMap<String, GroupEntry> = IndexMap::new();
        let mut distinct: HashMap<(String, usize), HashSet<String>> = HashMap::new();

        for row in &rows {
            let gb_vals: Vec<Value> = group_keys.iter().map(|e| Eval::eval_scalar(e, row)).collect();
            let gk = Helpers::canonical_tuple(&gb_vals);

            if !groups.contains_key(&gk) {
                groups.insert(gk.clone(), (gb_vals, new_accumulators()?));
            }
            let Some(entry) = groups.get_mut(&gk) else { continue };

            for (i, call) in calls.iter().enumerate() {
                let args: Vec<Value> = call.args.iter().map(|a| Eval::eval_scalar(a, row)).collect();
                if call.distinct {
                    let set = distinct.entry((gk.clone(), i)).or_default();
                    if !set.insert(Helpers::canonical_tuple(&args)) {
                        continue;
                    }
                }
                entry.1[i].update(&args)?;
            }
        }

        if groups.is_empty() && group_keys.is_empty() {
            groups.insert(String::new(), (vec![], new_accumulators()?));
        }

        // group keys first, then aggregates
        let mut out = Vec::with_capacity(groups.len());
        for (_gk, (gb_vals, accs)) in groups {
            let mut m = Map::new();
            for (name, v) in group_names.iter().zip(gb_vals) {
                m.insert(name.clone(), v);
            }
            for (name, acc) in agg_names.iter().zip(accs.iter()) {
                m.insert(name.clone(), acc.finalize());
            }
            out.push(m);
        }
        Ok(out)
    }

    fn output_key(e: &Expr) -> Result<String, PlanError> {
        e.to_attribute()
            .map(|c| c.row_key())
            .ok_or_else(|| PlanError::UnsupportedExpression(format!("{} has no output name", e)))
    }
}
