use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparatorOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq
}

impl ComparatorOp {
    /// Operator to use when the operands swap sides: `5 > a` is `a < 5`.
    pub fn flip(&self) -> Self {
        match self {
            ComparatorOp::Lt => ComparatorOp::Gt,
            ComparatorOp::LtEq => ComparatorOp::GtEq,
            ComparatorOp::Gt => ComparatorOp::Lt,
            ComparatorOp::GtEq => ComparatorOp::LtEq,
            other => *other,
        }
    }
}

impl fmt::Display for ComparatorOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComparatorOp::Eq => write!(f, "="),
            ComparatorOp::NotEq => write!(f, "<>"),
            ComparatorOp::Lt => write!(f, "<"),
            ComparatorOp::LtEq => write!(f, "<="),
            ComparatorOp::Gt => write!(f, ">"),
            ComparatorOp::GtEq => write!(f, ">="),
        }
    }
}

impl fmt::Debug for ComparatorOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComparatorOp({})", self)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinType::Inner => write!(f, "INNER JOIN"),
            JoinType::Left => write!(f, "LEFT JOIN"),
            JoinType::Right => write!(f, "RIGHT JOIN"),
            JoinType::Full => write!(f, "FULL OUTER JOIN"),
            JoinType::Cross => write!(f, "CROSS JOIN"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ComparatorOp;

    #[test]
    fn flip_swaps_inequalities_only() {
        assert_eq!(ComparatorOp::Gt.flip(), ComparatorOp::Lt);
        assert_eq!(ComparatorOp::LtEq.flip(), ComparatorOp::GtEq);
        assert_eq!(ComparatorOp::Eq.flip(), ComparatorOp::Eq);
        assert_eq!(ComparatorOp::NotEq.flip(), ComparatorOp::NotEq);
    }
}
