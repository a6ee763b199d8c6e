pub mod helpers;
pub use helpers::*;

pub mod eval;
pub use eval::*;

pub mod aggregators;
pub use aggregators::*;

pub mod plan_executor;
pub use plan_executor::*;

pub mod _tests;
pub use _tests::*;
