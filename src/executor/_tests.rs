#[cfg(test)]
pub mod fixtures {
    use serde_json::{json, Value};

    use crate::{
        plan::{ColumnRef, Expr, Row, SourceHandle},
        source::MemorySource,
    };

    pub fn rows_of(v: Value) -> Vec<Row> {
        v.as_array()
            .unwrap()
            .iter()
            .map(|r| r.as_object().cloned().unwrap())
            .collect()
    }

    /// `(K, V)` rows with original-case column names.
    pub fn kv_rows() -> Vec<Row> {
        rows_of(json!([
            { "K": 1, "V": 10 },
            { "K": 1, "V": 20 },
            { "K": 2, "V": 5 }
        ]))
    }

    pub fn k() -> ColumnRef { ColumnRef::new(1, "k") }
    pub fn v() -> ColumnRef { ColumnRef::new(2, "v") }

    pub fn kv_source(rows: Vec<Row>) -> (SourceHandle, ColumnRef, ColumnRef) {
        kv_source_with(rows, |e| e.as_aggregate().is_some())
    }

    /// Source declaring `k#1` and `v#2`, claiming the aggregates `supports`
    /// accepts.
    pub fn kv_source_with(
        rows: Vec<Row>,
        supports: impl Fn(&Expr) -> bool + Send + Sync + 'static,
    ) -> (SourceHandle, ColumnRef, ColumnRef) {
        let source = MemorySource::new("kv", vec![(k(), "K"), (v(), "V")], rows).with_aggregate_support(supports);
        (SourceHandle::new(source), k(), v())
    }

    /// Orders-like table used by the larger scenarios.
    pub fn sales_rows() -> Vec<Row> {
        rows_of(json!([
            { "Region": "EU", "Product": "Laptop", "Qty": 1, "Price": 1200.5 },
            { "Region": "EU", "Product": "Mouse",  "Qty": 3, "Price": 25.99 },
            { "Region": "US", "Product": "Laptop", "Qty": 2, "Price": 1200.5 },
            { "Region": "US", "Product": "Desk",   "Qty": 1, "Price": 499.0 },
            { "Region": "US", "Product": "Mouse",  "Qty": 1, "Price": 25.99 },
            { "Region": "APAC", "Product": "Desk", "Qty": 4, "Price": null },
            { "Region": null, "Product": "Kettle", "Qty": 2, "Price": 35.5 }
        ]))
    }

    pub fn region() -> ColumnRef { ColumnRef::new(11, "region") }
    pub fn product() -> ColumnRef { ColumnRef::new(12, "product") }
    pub fn qty() -> ColumnRef { ColumnRef::new(13, "qty") }
    pub fn price() -> ColumnRef { ColumnRef::new(14, "price") }

    pub fn sales_source(supports: impl Fn(&Expr) -> bool + Send + Sync + 'static) -> SourceHandle {
        let source = MemorySource::new(
            "sales",
            vec![(region(), "Region"), (product(), "Product"), (qty(), "Qty"), (price(), "Price")],
            sales_rows(),
        )
        .with_aggregate_support(supports);
        SourceHandle::new(source)
    }
}
