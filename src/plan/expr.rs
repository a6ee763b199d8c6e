use std::fmt;

use indexmap::IndexMap;

use crate::plan::{AggregateCall, ColumnId, ColumnRef, ComparatorOp, Literal};

/// Expression tree. A *named* expression is a `Column` or an `Alias`; those
/// are the only shapes allowed in projection and aggregate lists.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    Literal(Literal),
    Column(ColumnRef),
    Function { name: String, args: Vec<Expr> },
    Compare { left: Box<Expr>, op: ComparatorOp, right: Box<Expr> },
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
    IsNull { expr: Box<Expr>, negated: bool },
    InList { expr: Box<Expr>, list: Vec<Expr>, negated: bool },
    Like { expr: Box<Expr>, pattern: Box<Expr>, negated: bool },
    Aggregate(AggregateCall),
    Alias { expr: Box<Expr>, output: ColumnRef },
}

impl Expr {
    pub fn col(c: &ColumnRef) -> Expr {
        Expr::Column(c.clone())
    }

    pub fn lit(l: impl Into<Literal>) -> Expr {
        Expr::Literal(l.into())
    }

    pub fn compare(left: Expr, op: ComparatorOp, right: Expr) -> Expr {
        Expr::Compare { left: Box::new(left), op, right: Box::new(right) }
    }

    pub fn is_null(expr: Expr) -> Expr {
        Expr::IsNull { expr: Box::new(expr), negated: false }
    }

    pub fn is_not_null(expr: Expr) -> Expr {
        Expr::IsNull { expr: Box::new(expr), negated: true }
    }

    pub fn in_list(expr: Expr, list: Vec<Expr>) -> Expr {
        Expr::InList { expr: Box::new(expr), list, negated: false }
    }

    pub fn negate(expr: Expr) -> Expr {
        Expr::Not(Box::new(expr))
    }

    pub fn alias(self, output: &ColumnRef) -> Expr {
        Expr::Alias { expr: Box::new(self), output: output.clone() }
    }

    /// Output column produced by a named expression.
    pub fn to_attribute(&self) -> Option<ColumnRef> {
        match self {
            Expr::Column(c) => Some(c.clone()),
            Expr::Alias { output, .. } => Some(output.clone()),
            _ => None,
        }
    }

    pub fn is_attribute(&self) -> bool {
        matches!(self, Expr::Column(_))
    }

    /// Strip one level of aliasing.
    pub fn unalias(&self) -> &Expr {
        match self {
            Expr::Alias { expr, .. } => expr,
            other => other,
        }
    }

    pub fn as_aggregate(&self) -> Option<&AggregateCall> {
        match self.unalias() {
            Expr::Aggregate(call) => Some(call),
            _ => None,
        }
    }

    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Literal(_) | Expr::Column(_) => vec![],
            Expr::Function { args, .. } => args.iter().collect(),
            Expr::Compare { left, right, .. } => vec![&**left, &**right],
            Expr::And(v) | Expr::Or(v) => v.iter().collect(),
            Expr::Not(e) => vec![&**e],
            Expr::IsNull { expr, .. } => vec![&**expr],
            Expr::InList { expr, list, .. } => {
                let mut out: Vec<&Expr> = vec![&**expr];
                out.extend(list.iter());
                out
            }
            Expr::Like { expr, pattern, .. } => vec![&**expr, &**pattern],
            Expr::Aggregate(call) => call.args.iter().collect(),
            Expr::Alias { expr, .. } => vec![&**expr],
        }
    }

    /// Rebuild this node with `f` applied to each direct child.
    pub fn map_children<F, E>(self, mut f: F) -> Result<Expr, E>
    where
        F: FnMut(Expr) -> Result<Expr, E>,
    {
        let boxed = |b: Box<Expr>, f: &mut F| -> Result<Box<Expr>, E> { Ok(Box::new(f(*b)?)) };
        Ok(match self {
            e @ (Expr::Literal(_) | Expr::Column(_)) => e,
            Expr::Function { name, args } => Expr::Function {
                name,
                args: args.into_iter().map(&mut f).collect::<Result<_, _>>()?,
            },
            Expr::Compare { left, op, right } => Expr::Compare {
                left: boxed(left, &mut f)?,
                op,
                right: boxed(right, &mut f)?,
            },
            Expr::And(v) => Expr::And(v.into_iter().map(&mut f).collect::<Result<_, _>>()?),
            Expr::Or(v) => Expr::Or(v.into_iter().map(&mut f).collect::<Result<_, _>>()?),
            Expr::Not(e) => Expr::Not(boxed(e, &mut f)?),
            Expr::IsNull { expr, negated } => Expr::IsNull { expr: boxed(expr, &mut f)?, negated },
            Expr::InList { expr, list, negated } => Expr::InList {
                expr: boxed(expr, &mut f)?,
                list: list.into_iter().map(&mut f).collect::<Result<_, _>>()?,
                negated,
            },
            Expr::Like { expr, pattern, negated } => Expr::Like {
                expr: boxed(expr, &mut f)?,
                pattern: boxed(pattern, &mut f)?,
                negated,
            },
            Expr::Aggregate(call) => Expr::Aggregate(AggregateCall {
                func: call.func,
                args: call.args.into_iter().map(&mut f).collect::<Result<_, _>>()?,
                distinct: call.distinct,
            }),
            Expr::Alias { expr, output } => Expr::Alias { expr: boxed(expr, &mut f)?, output },
        })
    }

    /// Pre-order rewrite: `f` sees a node before its (rewritten) children.
    pub fn transform_down<F, E>(self, f: &mut F) -> Result<Expr, E>
    where
        F: FnMut(Expr) -> Result<Expr, E>,
    {
        let node = f(self)?;
        node.map_children(|c| c.transform_down(&mut *f))
    }

    /// Visit every subexpression in pre-order.
    pub fn for_each<'a>(&'a self, f: &mut impl FnMut(&'a Expr)) {
        f(self);
        for c in self.children() {
            c.for_each(f);
        }
    }

    pub fn exists(&self, mut pred: impl FnMut(&Expr) -> bool) -> bool {
        let mut found = false;
        self.for_each(&mut |e| found = found || pred(e));
        found
    }

    /// Distinct column references read by this expression, in order of first
    /// appearance. An alias's output column is produced, not read.
    pub fn referenced_columns(&self) -> Vec<ColumnRef> {
        let mut seen: IndexMap<ColumnId, ColumnRef> = IndexMap::new();
        self.for_each(&mut |e| {
            if let Expr::Column(c) = e {
                seen.entry(c.id).or_insert_with(|| c.clone());
            }
        });
        seen.into_values().collect()
    }

    pub fn contains_aggregate(&self) -> bool {
        self.exists(|e| matches!(e, Expr::Aggregate(_)))
    }

    pub fn is_constant(&self) -> bool {
        !self.exists(|e| matches!(e, Expr::Column(_) | Expr::Aggregate(_)))
    }

    /// Split a predicate into its top-level conjuncts.
    pub fn conjuncts(self) -> Vec<Expr> {
        match self {
            Expr::And(v) => v.into_iter().flat_map(Expr::conjuncts).collect(),
            other => vec![other],
        }
    }
}

/// Distinct columns referenced across several expressions, first appearance wins.
pub fn referenced_columns_of<'a>(exprs: impl IntoIterator<Item = &'a Expr>) -> Vec<ColumnRef> {
    let mut seen: IndexMap<ColumnId, ColumnRef> = IndexMap::new();
    for e in exprs {
        for c in e.referenced_columns() {
            seen.entry(c.id).or_insert(c);
        }
    }
    seen.into_values().collect()
}

fn join_exprs(f: &mut fmt::Formatter<'_>, v: &[Expr], sep: &str) -> fmt::Result {
    for (i, e) in v.iter().enumerate() {
        if i > 0 { write!(f, "{}", sep)?; }
        write!(f, "{}", e)?;
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(l) => write!(f, "{}", l.to_sql()),
            Expr::Column(c) => write!(f, "{}", c),
            Expr::Function { name, args } => {
                write!(f, "{}(", name)?;
                join_exprs(f, args, ", ")?;
                write!(f, ")")
            }
            Expr::Compare { left, op, right } => write!(f, "{} {} {}", left, op, right),
            Expr::And(v) => {
                write!(f, "(")?;
                join_exprs(f, v, " AND ")?;
                write!(f, ")")
            }
            Expr::Or(v) => {
                write!(f, "(")?;
                join_exprs(f, v, " OR ")?;
                write!(f, ")")
            }
            Expr::Not(e) => write!(f, "NOT {}", e),
            Expr::IsNull { expr, negated } => {
                write!(f, "{} IS {}NULL", expr, if *negated { "NOT " } else { "" })
            }
            Expr::InList { expr, list, negated } => {
                write!(f, "{} {}IN (", expr, if *negated { "NOT " } else { "" })?;
                join_exprs(f, list, ", ")?;
                write!(f, ")")
            }
            Expr::Like { expr, pattern, negated } => {
                write!(f, "{} {}LIKE {}", expr, if *negated { "NOT " } else { "" }, pattern)
            }
            Expr::Aggregate(call) => write!(f, "{}", call),
            Expr::Alias { expr, output } => write!(f, "{} AS {}", expr, output),
        }
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(_) => write!(f, "Literal({})", self),
            Expr::Column(_) => write!(f, "Column({})", self),
            Expr::Aggregate(_) => write!(f, "Aggregate({})", self),
            Expr::Alias { .. } => write!(f, "Alias({})", self),
            _ => write!(f, "Expr({})", self),
        }
    }
}
