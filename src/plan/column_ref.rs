use std::{fmt, sync::atomic::{AtomicU64, Ordering}};

static NEXT_COLUMN_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a column reference, assigned once by the analyzer and
/// carried by value through every copy of the plan.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnId(pub u64);

impl ColumnId {
    /// Allocate a fresh, process-wide unique identity.
    pub fn next() -> Self {
        ColumnId(NEXT_COLUMN_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Debug for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ColumnId({})", self.0)
    }
}

/// A bound reference to a column: identity, display name and the qualifier
/// chain (table or subquery alias) used when regenerating SQL text.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub id: ColumnId,
    pub name: String,
    pub qualifiers: Vec<String>,
}

impl ColumnRef {
    pub fn new(id: u64, name: &str) -> Self {
        Self { id: ColumnId(id), name: name.to_string(), qualifiers: vec![] }
    }

    /// Same column under a freshly allocated identity.
    pub fn fresh(name: &str) -> Self {
        Self { id: ColumnId::next(), name: name.to_string(), qualifiers: vec![] }
    }

    pub fn qualified(id: u64, qualifier: &str, name: &str) -> Self {
        Self { id: ColumnId(id), name: name.to_string(), qualifiers: vec![qualifier.to_string()] }
    }

    pub fn with_qualifiers(&self, qualifiers: Vec<String>) -> Self {
        Self { id: self.id, name: self.name.clone(), qualifiers }
    }

    pub fn unqualified(&self) -> Self {
        self.with_qualifiers(vec![])
    }

    /// `Some(q)` when exactly one qualifier is attached.
    pub fn qualifier(&self) -> Option<&str> {
        match self.qualifiers.as_slice() {
            [q] => Some(q.as_str()),
            _ => None,
        }
    }

    /// Key used for this column inside row maps. Names can repeat across a
    /// plan, identities cannot.
    pub fn row_key(&self) -> String {
        format!("{}#{}", self.name, self.id.0)
    }

    pub fn same_column(&self, other: &ColumnRef) -> bool {
        self.id == other.id
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for q in &self.qualifiers {
            write!(f, "{}.", q)?;
        }
        write!(f, "{}{}", self.name, self.id)
    }
}

impl fmt::Debug for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ColumnRef({})", self)
    }
}
