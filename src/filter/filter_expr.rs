use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{executor::Helpers, plan::{ComparatorOp, Literal, Row, Truth}};

/// Predicate handed to a storage backend. Works on column *names* and
/// literal values only; column identities never cross this boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterExpr {
    Equals { column: String, value: Literal },
    GreaterThan { column: String, value: Literal },
    LessThan { column: String, value: Literal },
    GreaterOrEqual { column: String, value: Literal },
    LessOrEqual { column: String, value: Literal },
    In { column: String, values: Vec<Literal> },
    IsNull { column: String },
    IsNotNull { column: String },
    And(Box<FilterExpr>, Box<FilterExpr>),
    Or(Box<FilterExpr>, Box<FilterExpr>),
    Not(Box<FilterExpr>),
}

impl FilterExpr {
    /// Build the comparison `column op value`. `<>` becomes `NOT (=)`.
    pub fn comparison(column: &str, op: ComparatorOp, value: Literal) -> FilterExpr {
        let column = column.to_string();
        match op {
            ComparatorOp::Eq => FilterExpr::Equals { column, value },
            ComparatorOp::NotEq => FilterExpr::Not(Box::new(FilterExpr::Equals { column, value })),
            ComparatorOp::Gt => FilterExpr::GreaterThan { column, value },
            ComparatorOp::Lt => FilterExpr::LessThan { column, value },
            ComparatorOp::GtEq => FilterExpr::GreaterOrEqual { column, value },
            ComparatorOp::LtEq => FilterExpr::LessOrEqual { column, value },
        }
    }

    pub fn and(self, other: FilterExpr) -> FilterExpr {
        FilterExpr::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: FilterExpr) -> FilterExpr {
        FilterExpr::Or(Box::new(self), Box::new(other))
    }

    /// Column names this filter reads, in order of first appearance.
    pub fn columns(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns(&self, out: &mut Vec<String>) {
        match self {
            FilterExpr::Equals { column, .. }
            | FilterExpr::GreaterThan { column, .. }
            | FilterExpr::LessThan { column, .. }
            | FilterExpr::GreaterOrEqual { column, .. }
            | FilterExpr::LessOrEqual { column, .. }
            | FilterExpr::In { column, .. }
            | FilterExpr::IsNull { column }
            | FilterExpr::IsNotNull { column } => {
                if !out.contains(column) {
                    out.push(column.clone());
                }
            }
            FilterExpr::And(a, b) | FilterExpr::Or(a, b) => {
                a.collect_columns(out);
                b.collect_columns(out);
            }
            FilterExpr::Not(a) => a.collect_columns(out),
        }
    }

    /// Evaluate against a row keyed by column name. Missing columns read as NULL.
    pub fn evaluate(&self, row: &Row) -> Truth {
        let get = |column: &String| row.get(column).cloned().unwrap_or(Value::Null);
        match self {
            FilterExpr::Equals { column, value } => Helpers::compare3(&get(column), ComparatorOp::Eq, &value.to_json()),
            FilterExpr::GreaterThan { column, value } => Helpers::compare3(&get(column), ComparatorOp::Gt, &value.to_json()),
            FilterExpr::LessThan { column, value } => Helpers::compare3(&get(column), ComparatorOp::Lt, &value.to_json()),
            FilterExpr::GreaterOrEqual { column, value } => Helpers::compare3(&get(column), ComparatorOp::GtEq, &value.to_json()),
            FilterExpr::LessOrEqual { column, value } => Helpers::compare3(&get(column), ComparatorOp::LtEq, &value.to_json()),
            FilterExpr::In { column, values } => {
                let list: Vec<Value> = values.iter().map(Literal::to_json).collect();
                Helpers::in_list3(&get(column), &list)
            }
            FilterExpr::IsNull { column } => Truth::from_bool(get(column).is_null()),
            FilterExpr::IsNotNull { column } => Truth::from_bool(!get(column).is_null()),
            FilterExpr::And(a, b) => a.evaluate(row).and(b.evaluate(row)),
            FilterExpr::Or(a, b) => a.evaluate(row).or(b.evaluate(row)),
            FilterExpr::Not(a) => a.evaluate(row).not(),
        }
    }
}

impl fmt::Display for FilterExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterExpr::Equals { column, value } => write!(f, "{} = {}", column, value.to_sql()),
            FilterExpr::GreaterThan { column, value } => write!(f, "{} > {}", column, value.to_sql()),
            FilterExpr::LessThan { column, value } => write!(f, "{} < {}", column, value.to_sql()),
            FilterExpr::GreaterOrEqual { column, value } => write!(f, "{} >= {}", column, value.to_sql()),
            FilterExpr::LessOrEqual { column, value } => write!(f, "{} <= {}", column, value.to_sql()),
            FilterExpr::In { column, values } => {
                let vals: Vec<String> = values.iter().map(Literal::to_sql).collect();
                write!(f, "{} IN ({})", column, vals.join(", "))
            }
            FilterExpr::IsNull { column } => write!(f, "{} IS NULL", column),
            FilterExpr::IsNotNull { column } => write!(f, "{} IS NOT NULL", column),
            FilterExpr::And(a, b) => write!(f, "({} AND {})", a, b),
            FilterExpr::Or(a, b) => write!(f, "({} OR {})", a, b),
            FilterExpr::Not(a) => write!(f, "NOT ({})", a),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn row(v: Value) -> Row {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn comparisons_follow_three_valued_logic() {
        let f = FilterExpr::comparison("age", ComparatorOp::Gt, Literal::Int(30));
        assert_eq!(f.evaluate(&row(json!({"age": 31}))), Truth::True);
        assert_eq!(f.evaluate(&row(json!({"age": 30}))), Truth::False);
        assert_eq!(f.evaluate(&row(json!({"age": null}))), Truth::Unknown);
        assert_eq!(f.evaluate(&row(json!({}))), Truth::Unknown);
    }

    #[test]
    fn not_equals_is_negated_equality() {
        let f = FilterExpr::comparison("c", ComparatorOp::NotEq, Literal::from("x"));
        assert!(matches!(f, FilterExpr::Not(_)));
        assert_eq!(f.evaluate(&row(json!({"c": "y"}))), Truth::True);
        assert_eq!(f.evaluate(&row(json!({"c": "x"}))), Truth::False);
    }

    #[test]
    fn in_with_null_member_is_unknown_when_not_found() {
        let f = FilterExpr::In { column: "k".into(), values: vec![Literal::Int(1), Literal::Null] };
        assert_eq!(f.evaluate(&row(json!({"k": 1}))), Truth::True);
        assert_eq!(f.evaluate(&row(json!({"k": 2}))), Truth::Unknown);
    }

    #[test]
    fn columns_are_deduplicated() {
        let f = FilterExpr::IsNotNull { column: "a".into() }
            .and(FilterExpr::comparison("b", ComparatorOp::Lt, Literal::Int(2)))
            .or(FilterExpr::IsNull { column: "a".into() });
        assert_eq!(f.columns(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(f.to_string(), "((a IS NOT NULL AND b < 2) OR a IS NULL)");
    }

    #[test]
    fn filters_round_trip_through_json() {
        let f = FilterExpr::In { column: "Region".into(), values: vec![Literal::from("EU")] };
        let text = serde_json::to_string(&f).unwrap();
        let back: FilterExpr = serde_json::from_str(&text).unwrap();
        assert_eq!(back, f);
    }
}
