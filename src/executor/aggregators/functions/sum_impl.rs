use serde_json::Value;

use crate::{error::PlanError, executor::{Accumulator, AggregateImpl, Helpers}};

pub struct SumImpl;

impl AggregateImpl for SumImpl {
    fn name(&self) -> &'static str { "sum" }
    fn create_accumulator(&self) -> Box<dyn Accumulator> { Box::new(SumAcc::Empty) }
}

// Integers stay exact until a float shows up.
enum SumAcc {
    Empty,
    Int(i128),
    Float(f64),
}

impl Accumulator for SumAcc {
    fn update(&mut self, args: &[Value]) -> Result<(), PlanError> {
        let [v] = args else {
            return Err(PlanError::AggregateArgMismatch { name: "SUM".into(), expected: "SUM(expr)".into() });
        };
        let n = match v {
            Value::Null => return Ok(()),
            Value::Number(n) => n,
            other => return Err(PlanError::TypeMismatch(format!("SUM got non numeric arg: {}", other))),
        };
        *self = match (&*self, n.as_i64(), n.as_f64()) {
            (SumAcc::Empty, Some(i), _) => SumAcc::Int(i as i128),
            (SumAcc::Empty, None, Some(f)) => SumAcc::Float(f),
            (SumAcc::Int(acc), Some(i), _) => SumAcc::Int(acc + i as i128),
            (SumAcc::Int(acc), None, Some(f)) => SumAcc::Float(*acc as f64 + f),
            (SumAcc::Float(acc), _, Some(f)) => SumAcc::Float(acc + f),
            _ => return Err(PlanError::TypeMismatch("SUM got non numeric number".into())),
        };
        Ok(())
    }

    fn finalize(&self) -> Value {
        match self {
            SumAcc::Empty => Value::Null,
            SumAcc::Int(i) => match i64::try_from(*i) {
                Ok(i) => Helpers::json_i(i),
                Err(_) => Helpers::json_f(*i as f64),
            },
            SumAcc::Float(f) => Helpers::json_f(*f),
        }
    }
}
