use serde_json::Value;

use crate::{executor::Helpers, plan::{Expr, Row, Truth}};

/// Row-level expression evaluation. Rows are keyed by [`ColumnRef::row_key`].
///
/// [`ColumnRef::row_key`]: crate::plan::ColumnRef::row_key
pub struct Eval;

impl Eval {
    pub fn eval_scalar(expr: &Expr, row: &Row) -> Value {
        match expr {
            Expr::Literal(l) => l.to_json(),
            Expr::Column(c) => row.get(&c.row_key()).cloned().unwrap_or(Value::Null),
            Expr::Function { name, args } => Self::eval_scalar_function(name, args, row),
            Expr::Alias { expr, .. } => Self::eval_scalar(expr, row),
            // computed by the aggregate operator, never per row
            Expr::Aggregate(_) => Value::Null,
            predicate => match Self::eval_predicate3(predicate, row) {
                Truth::True => Value::Bool(true),
                Truth::False => Value::Bool(false),
                Truth::Unknown => Value::Null,
            },
        }
    }

    fn eval_scalar_function(name: &str, args: &[Expr], row: &Row) -> Value {
        let lname = name.to_ascii_lowercase();
        let args: Vec<Value> = args.iter().map(|a| Self::eval_scalar(a, row)).collect();
        match (lname.as_str(), args.as_slice()) {
            ("upper", [Value::String(s)]) => Value::String(s.to_uppercase()),
            ("lower", [Value::String(s)]) => Value::String(s.to_lowercase()),
            ("trim", [Value::String(s)]) => Value::String(s.trim().to_string()),
            ("length", [Value::String(s)]) => Helpers::json_i(s.chars().count() as i64),
            ("abs", [Value::Number(n)]) => match n.as_i64() {
                Some(i) => Helpers::json_i(i.abs()),
                None => n.as_f64().map(|f| Helpers::json_f(f.abs())).unwrap_or(Value::Null),
            },
            ("coalesce", vals) => vals.iter().find(|v| !v.is_null()).cloned().unwrap_or(Value::Null),
            _ => Value::Null,
        }
    }

    pub fn eval_predicate3(expr: &Expr, row: &Row) -> Truth {
        match expr {
            Expr::And(v) => v.iter().fold(Truth::True, |acc, x| acc.and(Self::eval_predicate3(x, row))),
            Expr::Or(v) => v.iter().fold(Truth::False, |acc, x| acc.or(Self::eval_predicate3(x, row))),
            Expr::Not(e) => Self::eval_predicate3(e, row).not(),
            Expr::Compare { left, op, right } => {
                let l = Self::eval_scalar(left, row);
                let r = Self::eval_scalar(right, row);
                Helpers::compare3(&l, *op, &r)
            }
            Expr::IsNull { expr, negated } => {
                let t = Truth::from_bool(Self::eval_scalar(expr, row).is_null());
                if *negated { t.not() } else { t }
            }
            Expr::InList { expr, list, negated } => {
                let v = Self::eval_scalar(expr, row);
                let list: Vec<Value> = list.iter().map(|e| Self::eval_scalar(e, row)).collect();
                let t = Helpers::in_list3(&v, &list);
                if *negated { t.not() } else { t }
            }
            Expr::Like { expr, pattern, negated } => {
                let t = match (Self::eval_scalar(expr, row), Self::eval_scalar(pattern, row)) {
                    (Value::String(s), Value::String(p)) => Truth::from_bool(Helpers::like(&s, &p)),
                    _ => Truth::Unknown,
                };
                if *negated { t.not() } else { t }
            }
            other => match Self::eval_scalar(other, row) {
                Value::Bool(b) => Truth::from_bool(b),
                _ => Truth::Unknown,
            },
        }
    }
}
