use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::{
    error::PlanError,
    executor::PlanExecutor,
    plan::{AggregateSource, ColumnId, ColumnRef, Expr, ResultStream, Row, ScanRequest},
};

pub type AggregateSupport = Box<dyn Fn(&Expr) -> bool + Send + Sync>;
pub type FilterSupport = Box<dyn Fn(&ColumnRef) -> bool + Send + Sync>;

/// In-memory backend over JSON rows keyed by original column names.
///
/// Pushed filters run against the stored rows; grouping and aggregate
/// expressions run on the local accumulators, so any aggregate the engine
/// can compute this source can compute too. Which ones it *claims* to
/// support is configurable.
pub struct MemorySource {
    name: String,
    columns: Vec<ColumnRef>,
    attributes: IndexMap<ColumnId, ColumnRef>,
    rows: Vec<Row>,
    aggregate_support: AggregateSupport,
    filter_support: FilterSupport,
}

impl MemorySource {
    /// `columns` pairs each declared column with the name the rows use.
    pub fn new(name: &str, columns: Vec<(ColumnRef, &str)>, rows: Vec<Row>) -> Self {
        let attributes = columns
            .iter()
            .map(|(c, original)| (c.id, ColumnRef { id: c.id, name: original.to_string(), qualifiers: vec![] }))
            .collect();
        Self {
            name: name.to_string(),
            columns: columns.into_iter().map(|(c, _)| c).collect(),
            attributes,
            rows,
            aggregate_support: Box::new(|e| e.as_aggregate().is_some()),
            filter_support: Box::new(|_| true),
        }
    }

    pub fn with_aggregate_support(mut self, f: impl Fn(&Expr) -> bool + Send + Sync + 'static) -> Self {
        self.aggregate_support = Box::new(f);
        self
    }

    pub fn with_filter_support(mut self, f: impl Fn(&ColumnRef) -> bool + Send + Sync + 'static) -> Self {
        self.filter_support = Box::new(f);
        self
    }

    pub fn columns(&self) -> &[ColumnRef] {
        &self.columns
    }

    /// Re-key a stored row by the engine's row keys.
    fn to_engine_row(&self, row: &Row) -> Row {
        self.columns
            .iter()
            .map(|c| {
                let value = self
                    .attributes
                    .get(&c.id)
                    .and_then(|orig| row.get(&orig.name))
                    .cloned()
                    .unwrap_or(Value::Null);
                (c.row_key(), value)
            })
            .collect::<Map<String, Value>>()
    }
}

impl AggregateSource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports_filter(&self, column: &ColumnRef) -> bool {
        (self.filter_support)(column)
    }

    fn supports_aggregate(&self, expr: &Expr) -> bool {
        (self.aggregate_support)(expr)
    }

    fn attribute_map(&self) -> &IndexMap<ColumnId, ColumnRef> {
        &self.attributes
    }

    fn build_scan(&self, request: &ScanRequest) -> Result<ResultStream, PlanError> {
        for f in &request.filters {
            if let Some(unknown) = f.columns().into_iter().find(|c| !self.attributes.values().any(|a| &a.name == c)) {
                return Err(PlanError::Source(format!("{}: filter on unknown column {}", self.name, unknown)));
            }
        }

        let matching: Vec<Row> = self
            .rows
            .iter()
            .filter(|r| request.filters.iter().all(|f| f.evaluate(r).accepts()))
            .map(|r| self.to_engine_row(r))
            .collect();
        tracing::trace!(source = %self.name, rows = matching.len(), filters = request.filters.len(), "memory scan");

        let out = if request.is_aggregate() {
            PlanExecutor::aggregate_rows(matching, &request.group_by, &request.aggregates)?
        } else {
            let keys: Vec<String> = request.columns.iter().map(ColumnRef::row_key).collect();
            matching
                .into_iter()
                .map(|mut r| keys.iter().map(|k| (k.clone(), r.remove(k).unwrap_or(Value::Null))).collect::<Row>())
                .collect()
        };
        Ok(Box::new(out.into_iter()))
    }
}
