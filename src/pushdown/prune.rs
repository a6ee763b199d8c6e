use indexmap::IndexMap;

use crate::{
    filter::{FilterExpr, FilterTranslator},
    plan::{referenced_columns_of, AggregateSource, ColumnId, ColumnRef, Expr, ScanRequest, SourceHandle},
    pushdown::PhysicalPlan,
};

/// Outcome of handing a list of conjuncts to a backend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PushedFilters {
    /// Filters in the backend's own column names.
    pub pushed: Vec<FilterExpr>,
    /// Predicates (engine names) that still need a local check.
    pub remaining: Vec<Expr>,
}

impl PushedFilters {
    pub fn is_exact(&self) -> bool {
        self.remaining.is_empty()
    }
}

/// Translate each conjunct into the backend's filter language.
///
/// A conjunct is only offered to the backend when every column it reads is
/// declared by the backend and accepted by [`AggregateSource::supports_filter`].
/// Column names are rewritten to the backend's originals before translation.
pub fn push_filters(source: &dyn AggregateSource, predicates: &[Expr]) -> PushedFilters {
    let map = source.attribute_map();
    let mut out = PushedFilters::default();
    for p in predicates {
        let filterable = p.referenced_columns().iter().all(|c| source.supports_filter(c));
        let remapped = if filterable { to_source_names(p, map) } else { None };
        let Some(remapped) = remapped else {
            out.remaining.push(p.clone());
            continue;
        };
        let (pushed, rest) = FilterTranslator::select_filters(std::slice::from_ref(&remapped));
        out.pushed.extend(pushed);
        if !rest.is_empty() {
            out.remaining.push(p.clone());
        }
    }
    out
}

/// `expr` with every column swapped for the backend's original column, or
/// `None` if some column is unknown to the backend.
pub fn to_source_names(expr: &Expr, map: &IndexMap<ColumnId, ColumnRef>) -> Option<Expr> {
    expr.clone()
        .transform_down(&mut |e| match e {
            Expr::Column(c) => map.get(&c.id).cloned().map(Expr::Column).ok_or(c),
            other => Ok(other),
        })
        .ok()
}

/// Output column -> defining expression, for every aliased entry of a
/// projection list.
pub fn projection_definitions(project_list: &[Expr]) -> IndexMap<ColumnId, Expr> {
    let mut defs = IndexMap::new();
    for e in project_list {
        if let Expr::Alias { expr, output } = e {
            if !expr.referenced_columns().iter().any(|c| c.id == output.id) {
                defs.insert(output.id, expr.as_ref().clone());
            }
        }
    }
    defs
}

/// Replace references to projected aliases with their definitions, so the
/// result only reads columns below the projection.
pub fn inline_aliases(expr: Expr, defs: &IndexMap<ColumnId, Expr>) -> Expr {
    if defs.is_empty() {
        return expr;
    }
    expr.transform_down(&mut |e| {
        Ok(match e {
            Expr::Column(c) => defs.get(&c.id).cloned().unwrap_or(Expr::Column(c)),
            other => other,
        })
    })
    .unwrap_or_else(|never: std::convert::Infallible| match never {})
}

/// Build the scan side of an aggregate push-down.
///
/// When `project_list` is nothing but plain columns, and those are exactly
/// the columns read by the projection and the filters, the backend scan is
/// returned as is. Otherwise the scan reads the union of the columns the
/// projection and the filters reference, and a projection over the scan
/// narrows its rows to the request's output.
pub fn prune_filter_project_agg(
    project_list: &[Expr],
    filters: &[Expr],
    source: &SourceHandle,
    mut request: ScanRequest,
) -> PhysicalPlan {
    let project_refs = referenced_columns_of(project_list);
    let needed = referenced_columns_of(project_list.iter().chain(filters));
    let plain = project_list.iter().all(Expr::is_attribute);

    // needed always contains project_refs, so equal length means equal sets
    if plain && project_refs.len() == needed.len() {
        request.columns = project_list.iter().filter_map(Expr::to_attribute).collect();
        return PhysicalPlan::AggregateScan { source: source.clone(), request };
    }

    let output = request.output();
    request.columns = needed;
    PhysicalPlan::Project {
        exprs: output.iter().map(Expr::col).collect(),
        input: Box::new(PhysicalPlan::AggregateScan { source: source.clone(), request }),
    }
}
