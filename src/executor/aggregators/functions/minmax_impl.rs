use std::cmp::Ordering;

use serde_json::Value;

use crate::{error::PlanError, executor::{Accumulator, AggregateImpl}};

pub struct MinImpl;
pub struct MaxImpl;

impl AggregateImpl for MinImpl {
    fn name(&self) -> &'static str { "min" }
    fn create_accumulator(&self) -> Box<dyn Accumulator> { Box::new(ExtremaAcc::new_min()) }
}

impl AggregateImpl for MaxImpl {
    fn name(&self) -> &'static str { "max" }
    fn create_accumulator(&self) -> Box<dyn Accumulator> { Box::new(ExtremaAcc::new_max()) }
}

enum Mode { Min, Max }

struct ExtremaAcc {
    mode: Mode,
    current: Option<Value>,
}

impl ExtremaAcc {
    fn new_min() -> Self { Self { mode: Mode::Min, current: None } }
    fn new_max() -> Self { Self { mode: Mode::Max, current: None } }

    /// Whether `candidate` should replace `current`.
    fn better(mode: &Mode, current: &Value, candidate: &Value) -> Result<bool, PlanError> {
        use Value::*;
        let ord = match (current, candidate) {
            (Bool(x), Bool(y)) => x.cmp(y),
            (Number(x), Number(y)) => match (x.as_i64(), y.as_i64()) {
                (Some(ix), Some(iy)) => ix.cmp(&iy),
                _ => match (x.as_f64(), y.as_f64()) {
                    (Some(fx), Some(fy)) => fx.partial_cmp(&fy).unwrap_or(Ordering::Equal),
                    _ => return Err(PlanError::TypeMismatch("MIN/MAX got non numeric number".into())),
                },
            },
            (String(x), String(y)) => x.cmp(y),
            _ => return Err(PlanError::TypeMismatch("MIN/MAX mixed or unsupported types".into())),
        };
        Ok(match mode { Mode::Min => ord.is_gt(), Mode::Max => ord.is_lt() })
    }
}

impl Accumulator for ExtremaAcc {
    fn update(&mut self, args: &[Value]) -> Result<(), PlanError> {
        let [v] = args else {
            return Err(PlanError::AggregateArgMismatch { name: "MIN/MAX".into(), expected: "MIN/MAX(expr)".into() });
        };
        if v.is_null() { return Ok(()); }
        match &mut self.current {
            None => self.current = Some(v.clone()),
            Some(cur) => {
                if Self::better(&self.mode, cur, v)? {
                    *cur = v.clone();
                }
            }
        }
        Ok(())
    }

    fn finalize(&self) -> Value {
        self.current.clone().unwrap_or(Value::Null)
    }
}
