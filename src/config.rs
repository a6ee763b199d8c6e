/// Settings shared by the rewrite passes.
///
/// - `alias_prefix` names the aliases generated for table-like relations
///   (`table1`, `table2`, ...).
/// - `wrap_table_relations` turns relation wrapping on or off.
/// - `split_aggregates` lets the push-down planner emit a two-stage plan when
///   the backend only supports part of the aggregate list.
/// - `require_exact_filters` rejects aggregate push-down when a filter cannot
///   be handed to the backend in full. When off, such plans fall back to a
///   plain filtered scan aggregated locally.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub alias_prefix: String,
    pub wrap_table_relations: bool,
    pub split_aggregates: bool,
    pub require_exact_filters: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            alias_prefix: "table".to_string(),
            wrap_table_relations: true,
            split_aggregates: true,
            require_exact_filters: true,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience: default settings with a custom alias prefix.
    pub fn with_alias_prefix(alias_prefix: &str) -> Self {
        Self {
            alias_prefix: alias_prefix.to_string(),
            ..Self::default()
        }
    }

    /// Convenience: only push aggregates down when the backend handles all of them.
    pub fn no_split() -> Self {
        Self {
            split_aggregates: false,
            ..Self::default()
        }
    }

    pub fn alias_for(&self, n: usize) -> String {
        format!("{}{}", self.alias_prefix, n)
    }
}
