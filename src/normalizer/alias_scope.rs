use indexmap::IndexMap;

use crate::plan::{ColumnId, ColumnRef, PlanNode};

/// Column identity -> alias of the aliased subtree that exposes it, as seen
/// from one plan node.
///
/// Subtrees are visited outermost first and the first alias recorded for an
/// identity is kept, so a column passed up through several aliased subtrees
/// resolves to the one nearest the referencing node. A column renamed inside
/// a subtree gets a new identity, so its rename point always wins over the
/// relation it was read from.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct AliasScope {
    by_id: IndexMap<ColumnId, String>,
}

impl AliasScope {
    pub fn of(node: &PlanNode) -> Self {
        let aliased = node.collect(&mut |n| match n {
            PlanNode::Subquery { alias, input } => Some((alias.clone(), input.output())),
            _ => None,
        });
        let mut by_id = IndexMap::new();
        for (alias, columns) in aliased {
            for c in columns {
                by_id.entry(c.id).or_insert_with(|| alias.clone());
            }
        }
        Self { by_id }
    }

    pub fn alias_of(&self, column: &ColumnRef) -> Option<&str> {
        self.by_id.get(&column.id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
