pub mod alias_scope;
pub use alias_scope::*;

pub mod qualifier_normalizer;
pub use qualifier_normalizer::*;
