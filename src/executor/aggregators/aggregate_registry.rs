use std::{collections::HashMap, sync::Arc};

use once_cell::sync::Lazy;

use crate::{error::PlanError, executor::{Accumulator, AggregateImpl, AvgImpl, CountImpl, MaxImpl, MinImpl, SumImpl}, plan::AggregateCall};

/// Registry shared by every executor and in-memory source.
pub static DEFAULT_AGGREGATES: Lazy<AggregateRegistry> = Lazy::new(AggregateRegistry::default_aggregate_registry);

/// Case-insensitive registry of aggregates.
#[derive(Default)]
pub struct AggregateRegistry {
    by_name: HashMap<String, Arc<dyn AggregateImpl>>,
}

impl AggregateRegistry {
    pub fn new() -> Self { Self { by_name: HashMap::new() } }

    pub fn register<I: AggregateImpl + 'static>(&mut self, impl_: I) {
        self.by_name.insert(impl_.name().to_string(), Arc::new(impl_));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn AggregateImpl>> {
        self.by_name.get(&name.to_ascii_lowercase()).cloned()
    }

    pub fn list(&self) -> Vec<String> {
        let mut v: Vec<_> = self.by_name.keys().cloned().collect();
        v.sort();
        v
    }

    /// Fresh accumulator for one group of `call`.
    pub fn accumulator_for(&self, call: &AggregateCall) -> Result<Box<dyn Accumulator>, PlanError> {
        let name = call.func.name();
        let imp = self.get(name).ok_or_else(|| PlanError::UnknownAggregate(name.to_string()))?;
        Ok(imp.create_accumulator())
    }

    pub fn default_aggregate_registry() -> Self {
        let mut registry = Self::new();
        registry.register(CountImpl);
        registry.register(SumImpl);
        registry.register(AvgImpl);
        registry.register(MinImpl);
        registry.register(MaxImpl);
        registry
    }
}
