pub mod filter_expr;
pub use filter_expr::*;

pub mod translator;
pub use translator::*;
