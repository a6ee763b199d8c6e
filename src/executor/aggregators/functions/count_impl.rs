use serde_json::Value;

use crate::{error::PlanError, executor::{Accumulator, AggregateImpl}};

pub struct CountImpl;

impl AggregateImpl for CountImpl {
    fn name(&self) -> &'static str { "count" }

    fn create_accumulator(&self) -> Box<dyn Accumulator> {
        Box::new(CountAcc { cnt: 0 })
    }
}

struct CountAcc {
    cnt: i64,
}

impl Accumulator for CountAcc {
    fn update(&mut self, args: &[Value]) -> Result<(), PlanError> {
        match args {
            // count(*)
            [] => self.cnt += 1,
            [v] => {
                if !v.is_null() {
                    self.cnt += 1;
                }
            }
            _ => {
                return Err(PlanError::AggregateArgMismatch {
                    name: "COUNT".into(),
                    expected: "COUNT(*|expr)".into(),
                })
            }
        }
        Ok(())
    }

    fn finalize(&self) -> Value {
        Value::Number(serde_json::Number::from(self.cnt))
    }
}
