pub mod column_ref;
pub use column_ref::*;

pub mod literal;
pub use literal::*;

pub mod truth;
pub use truth::*;

pub mod operators;
pub use operators::*;

pub mod aggregate_call;
pub use aggregate_call::*;

pub mod expr;
pub use expr::*;

pub mod plan_node;
pub use plan_node::*;

pub mod tree;
pub use tree::*;

pub mod source;
pub use source::*;
