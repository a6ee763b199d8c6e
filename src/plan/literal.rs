use ordered_float::NotNan;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{self, Display};

#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Literal {
    String(String),
    Int(i64),
    Float(NotNan<f64>),
    Bool(bool),
    Null,
}

impl Literal {
    pub fn float(f: f64) -> Option<Self> {
        NotNan::new(f).ok().map(Literal::Float)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Literal::Null)
    }

    pub fn to_json(&self) -> Value {
        match self {
            Literal::Null => Value::Null,
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Int(i) => Value::Number(serde_json::Number::from(*i)),
            Literal::Float(f) => serde_json::Number::from_f64(f.into_inner()).map(Value::Number).unwrap_or(Value::Null),
            Literal::String(s) => Value::String(s.clone()),
        }
    }

    /// SQL text for this literal.
    pub fn to_sql(&self) -> String {
        match self {
            Literal::String(s) => format!("'{}'", s.replace('\'', "''")),
            Literal::Int(i) => i.to_string(),
            Literal::Float(f) => f.into_inner().to_string(),
            Literal::Bool(b) => if *b { "TRUE".into() } else { "FALSE".into() },
            Literal::Null => "NULL".into(),
        }
    }
}

impl From<i64> for Literal {
    fn from(i: i64) -> Self { Literal::Int(i) }
}

impl From<i32> for Literal {
    fn from(i: i32) -> Self { Literal::Int(i as i64) }
}

impl From<&str> for Literal {
    fn from(s: &str) -> Self { Literal::String(s.to_string()) }
}

impl From<bool> for Literal {
    fn from(b: bool) -> Self { Literal::Bool(b) }
}

impl Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::String(s) => write!(f, "s: \"{}\"", s),
            Literal::Int(i) => write!(f, "i: {}", i),
            Literal::Float(n) => write!(f, "f: {}", n.into_inner()),
            Literal::Bool(b) => write!(f, "b: {}", b),
            Literal::Null => write!(f, "n: NULL"),
        }
    }
}

impl fmt::Debug for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::String(_) => write!(f, "String({})", self),
            Literal::Int(_) => write!(f, "Int({})", self),
            Literal::Float(_) => write!(f, "Float({})", self),
            Literal::Bool(_) => write!(f, "Bool({})", self),
            Literal::Null => write!(f, "Null(n: NULL)"),
        }
    }
}
