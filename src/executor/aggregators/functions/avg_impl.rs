use serde_json::Value;

use crate::{error::PlanError, executor::{Accumulator, AggregateImpl, Helpers}};

pub struct AvgImpl;

impl AggregateImpl for AvgImpl {
    fn name(&self) -> &'static str { "avg" }
    fn create_accumulator(&self) -> Box<dyn Accumulator> { Box::new(AvgAcc { sum: 0.0, cnt: 0 }) }
}

struct AvgAcc { sum: f64, cnt: i64 }

impl Accumulator for AvgAcc {
    fn update(&mut self, args: &[Value]) -> Result<(), PlanError> {
        let [v] = args else {
            return Err(PlanError::AggregateArgMismatch { name: "AVG".into(), expected: "AVG(expr)".into() });
        };
        match v {
            Value::Null => {}
            Value::Number(n) => match n.as_f64() {
                Some(f) => { self.sum += f; self.cnt += 1; }
                None => return Err(PlanError::TypeMismatch("AVG got non numeric number".into())),
            },
            other => return Err(PlanError::TypeMismatch(format!("AVG got non numeric arg: {}", other))),
        }
        Ok(())
    }

    fn finalize(&self) -> Value {
        if self.cnt == 0 { Value::Null } else { Helpers::json_f(self.sum / self.cnt as f64) }
    }
}
