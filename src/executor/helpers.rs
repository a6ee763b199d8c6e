use std::cmp::Ordering;

use serde_json::Value;

use crate::plan::{ComparatorOp, Truth};

pub struct Helpers;

impl Helpers {
    /// Stable string key for a tuple of values, used to bucket group keys.
    pub fn canonical_tuple(vals: &[Value]) -> String {
        serde_json::to_string(vals).unwrap_or_default()
    }

    /// SQL comparison with NULL propagation. Numbers compare numerically
    /// regardless of integer/float representation; strings compare
    /// lexicographically; booleans only support (in)equality.
    pub fn compare3(l: &Value, op: ComparatorOp, r: &Value) -> Truth {
        if l.is_null() || r.is_null() {
            return Truth::Unknown;
        }
        let ord = match (l, r) {
            (Value::Bool(a), Value::Bool(b)) => match op {
                ComparatorOp::Eq => return Truth::from_bool(a == b),
                ComparatorOp::NotEq => return Truth::from_bool(a != b),
                _ => return Truth::Unknown,
            },
            (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y),
                _ => None,
            },
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            _ => None,
        };
        let Some(ord) = ord else { return Truth::Unknown };
        Truth::from_bool(match op {
            ComparatorOp::Eq => ord == Ordering::Equal,
            ComparatorOp::NotEq => ord != Ordering::Equal,
            ComparatorOp::Lt => ord == Ordering::Less,
            ComparatorOp::LtEq => ord != Ordering::Greater,
            ComparatorOp::Gt => ord == Ordering::Greater,
            ComparatorOp::GtEq => ord != Ordering::Less,
        })
    }

    /// `v IN (list)`: true on a match, unknown when `v` is NULL or when no
    /// member matched but one of them is NULL.
    pub fn in_list3(v: &Value, list: &[Value]) -> Truth {
        if v.is_null() {
            return Truth::Unknown;
        }
        let mut has_null = false;
        for item in list {
            if item.is_null() {
                has_null = true;
                continue;
            }
            if Self::value_equal(v, item) {
                return Truth::True;
            }
        }
        if has_null { Truth::Unknown } else { Truth::False }
    }

    pub fn value_equal(a: &Value, b: &Value) -> bool {
        use serde_json::Value::*;
        match (a, b) {
            (Null, Null) => true,
            (Bool(x), Bool(y)) => x == y,
            (Number(x), Number(y)) => x.as_f64() == y.as_f64(),
            (String(x), String(y)) => x == y,
            _ => false,
        }
    }

    /// SQL `LIKE` with `%` and `_` wildcards; `\` escapes the next character.
    pub fn like(value: &str, pattern: &str) -> bool {
        let mut re = String::from("(?s)^");
        let mut chars = pattern.chars();
        while let Some(ch) = chars.next() {
            match ch {
                '%' => re.push_str(".*"),
                '_' => re.push('.'),
                '\\' => {
                    if let Some(next) = chars.next() {
                        re.push_str(&regex::escape(&next.to_string()));
                    }
                }
                c => re.push_str(&regex::escape(&c.to_string())),
            }
        }
        re.push('$');
        regex::Regex::new(&re).map(|re| re.is_match(value)).unwrap_or(false)
    }

    pub fn json_i(i: i64) -> Value {
        Value::Number(serde_json::Number::from(i))
    }

    pub fn json_f(f: f64) -> Value {
        serde_json::Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::Helpers;
    use crate::plan::{ComparatorOp, Truth};

    #[test]
    fn canonical_tuple_is_deterministic_for_same_values() {
        let a = vec![json!(1), json!("x"), json!(true)];
        let b = vec![json!(1), json!("x"), json!(true)];
        assert_eq!(Helpers::canonical_tuple(&a), Helpers::canonical_tuple(&b));
        assert_ne!(Helpers::canonical_tuple(&a), Helpers::canonical_tuple(&[json!(1), json!("y"), json!(true)]));
    }

    #[test]
    fn numbers_compare_across_representations() {
        assert_eq!(Helpers::compare3(&json!(2), ComparatorOp::Eq, &json!(2.0)), Truth::True);
        assert_eq!(Helpers::compare3(&json!(1), ComparatorOp::Lt, &json!(1.5)), Truth::True);
        assert_eq!(Helpers::compare3(&json!(3), ComparatorOp::LtEq, &json!(2)), Truth::False);
    }

    #[test]
    fn strings_order_and_bools_only_equate() {
        assert_eq!(Helpers::compare3(&json!("a"), ComparatorOp::Lt, &json!("b")), Truth::True);
        assert_eq!(Helpers::compare3(&json!(true), ComparatorOp::NotEq, &json!(false)), Truth::True);
        assert_eq!(Helpers::compare3(&json!(true), ComparatorOp::Gt, &json!(false)), Truth::Unknown);
        assert_eq!(Helpers::compare3(&json!("1"), ComparatorOp::Eq, &json!(1)), Truth::Unknown);
    }

    #[test]
    fn null_operands_are_unknown() {
        assert_eq!(Helpers::compare3(&Value::Null, ComparatorOp::Eq, &json!(1)), Truth::Unknown);
        assert_eq!(Helpers::in_list3(&Value::Null, &[json!(1)]), Truth::Unknown);
        assert_eq!(Helpers::in_list3(&json!(3), &[json!(1), Value::Null]), Truth::Unknown);
        assert_eq!(Helpers::in_list3(&json!(1), &[json!(1), Value::Null]), Truth::True);
        assert_eq!(Helpers::in_list3(&json!(3), &[json!(1), json!(2)]), Truth::False);
    }

    #[test]
    fn like_handles_wildcards_and_escapes() {
        assert!(Helpers::like("Hello123", "He%2_"));
        assert!(Helpers::like("a_c", "a\\_c"));
        assert!(!Helpers::like("abc", "a\\_c"));
        assert!(Helpers::like("a.b", "a.b"));
        assert!(!Helpers::like("axb", "a.b"));
    }
}
