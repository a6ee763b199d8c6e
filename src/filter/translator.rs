use crate::{filter::FilterExpr, plan::{Expr, Literal}};

/// Maps predicate expressions onto [`FilterExpr`].
///
/// Translation is total: shapes that have no portable form yield `None`.
/// Under `AND` a partial translation keeps whichever conjuncts translate,
/// which only ever weakens the pushed filter. `OR` needs every operand and
/// `NOT` needs an exact operand, since weakening below a negation would
/// strengthen the result.
pub struct FilterTranslator;

impl FilterTranslator {
    pub fn translate(expr: &Expr) -> Option<FilterExpr> {
        Self::translate_with(expr, true)
    }

    /// All-or-nothing variant: `Some` only when the filter is equivalent to
    /// `expr`, never weaker.
    pub fn translate_exact(expr: &Expr) -> Option<FilterExpr> {
        Self::translate_with(expr, false)
    }

    /// Translate each predicate. Returns the filters to push and the
    /// predicates the caller must still evaluate after the scan (anything
    /// that did not translate exactly).
    pub fn select_filters(predicates: &[Expr]) -> (Vec<FilterExpr>, Vec<Expr>) {
        let mut pushed = Vec::new();
        let mut remaining = Vec::new();
        for p in predicates {
            match Self::translate_exact(p) {
                Some(f) => pushed.push(f),
                None => {
                    if let Some(weaker) = Self::translate(p) {
                        pushed.push(weaker);
                    }
                    remaining.push(p.clone());
                }
            }
        }
        (pushed, remaining)
    }

    fn translate_with(expr: &Expr, allow_partial: bool) -> Option<FilterExpr> {
        match expr {
            Expr::Compare { left, op, right } => match (left.as_ref(), right.as_ref()) {
                (Expr::Column(c), Expr::Literal(l)) => Some(FilterExpr::comparison(&c.name, *op, l.clone())),
                (Expr::Literal(l), Expr::Column(c)) => Some(FilterExpr::comparison(&c.name, op.flip(), l.clone())),
                _ => None,
            },
            Expr::InList { expr, list, negated } => {
                let Expr::Column(c) = expr.as_ref() else { return None };
                let values = list
                    .iter()
                    .map(|e| match e {
                        Expr::Literal(l) => Some(l.clone()),
                        _ => None,
                    })
                    .collect::<Option<Vec<Literal>>>()?;
                let f = FilterExpr::In { column: c.name.clone(), values };
                Some(if *negated { FilterExpr::Not(Box::new(f)) } else { f })
            }
            Expr::IsNull { expr, negated } => {
                let Expr::Column(c) = expr.as_ref() else { return None };
                let column = c.name.clone();
                Some(if *negated { FilterExpr::IsNotNull { column } } else { FilterExpr::IsNull { column } })
            }
            Expr::And(operands) => {
                let translated: Vec<Option<FilterExpr>> =
                    operands.iter().map(|e| Self::translate_with(e, allow_partial)).collect();
                if !allow_partial && translated.iter().any(Option::is_none) {
                    return None;
                }
                translated.into_iter().flatten().reduce(FilterExpr::and)
            }
            Expr::Or(operands) => operands
                .iter()
                .map(|e| Self::translate_with(e, allow_partial))
                .collect::<Option<Vec<_>>>()?
                .into_iter()
                .reduce(FilterExpr::or),
            Expr::Not(inner) => Self::translate_with(inner, false).map(|f| FilterExpr::Not(Box::new(f))),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Map, Value};

    use super::*;
    use crate::{executor::Eval, plan::{ColumnRef, ComparatorOp, Row}};

    fn a() -> ColumnRef { ColumnRef::new(1, "colA") }
    fn col_a() -> Expr { Expr::col(&a()) }
    fn lit_i(i: i64) -> Expr { Expr::lit(i) }
    fn unsupported() -> Expr {
        Expr::Like {
            expr: Box::new(Expr::col(&ColumnRef::new(2, "name"))),
            pattern: Box::new(Expr::lit("a%")),
            negated: false,
        }
    }

    #[test]
    fn literal_first_comparison_is_flipped() {
        let lit_first = Expr::compare(lit_i(5), ComparatorOp::Gt, col_a());
        let col_first = Expr::compare(col_a(), ComparatorOp::Lt, lit_i(5));
        let f1 = FilterTranslator::translate(&lit_first);
        let f2 = FilterTranslator::translate(&col_first);
        assert_eq!(f1, f2);
        assert_eq!(f1, Some(FilterExpr::LessThan { column: "colA".into(), value: Literal::Int(5) }));

        let ge = Expr::compare(lit_i(5), ComparatorOp::GtEq, col_a());
        assert_eq!(
            FilterTranslator::translate(&ge),
            Some(FilterExpr::LessOrEqual { column: "colA".into(), value: Literal::Int(5) })
        );
    }

    #[test]
    fn or_is_all_or_nothing() {
        let p = Expr::Or(vec![Expr::compare(col_a(), ComparatorOp::Gt, lit_i(1)), unsupported()]);
        assert_eq!(FilterTranslator::translate(&p), None);
    }

    #[test]
    fn and_keeps_translatable_side() {
        let p = Expr::And(vec![Expr::compare(col_a(), ComparatorOp::Gt, lit_i(1)), unsupported()]);
        assert_eq!(
            FilterTranslator::translate(&p),
            Some(FilterExpr::GreaterThan { column: "colA".into(), value: Literal::Int(1) })
        );
        assert_eq!(FilterTranslator::translate_exact(&p), None);
    }

    #[test]
    fn not_requires_exact_operand() {
        let p = Expr::negate(Expr::And(vec![Expr::compare(col_a(), ComparatorOp::Gt, lit_i(1)), unsupported()]));
        assert_eq!(FilterTranslator::translate(&p), None);

        let q = Expr::negate(Expr::is_null(col_a()));
        assert_eq!(
            FilterTranslator::translate(&q),
            Some(FilterExpr::Not(Box::new(FilterExpr::IsNull { column: "colA".into() })))
        );
    }

    #[test]
    fn in_requires_plain_column_and_literals() {
        let ok = Expr::in_list(col_a(), vec![lit_i(1), lit_i(2)]);
        assert_eq!(
            FilterTranslator::translate(&ok),
            Some(FilterExpr::In { column: "colA".into(), values: vec![Literal::Int(1), Literal::Int(2)] })
        );
        let fn_left = Expr::in_list(Expr::Function { name: "abs".into(), args: vec![col_a()] }, vec![lit_i(1)]);
        assert_eq!(FilterTranslator::translate(&fn_left), None);
        let col_member = Expr::in_list(col_a(), vec![Expr::col(&ColumnRef::new(3, "b"))]);
        assert_eq!(FilterTranslator::translate(&col_member), None);
    }

    #[test]
    fn other_shapes_do_not_translate() {
        assert_eq!(FilterTranslator::translate(&unsupported()), None);
        let col_col = Expr::compare(col_a(), ComparatorOp::Eq, Expr::col(&ColumnRef::new(3, "b")));
        assert_eq!(FilterTranslator::translate(&col_col), None);
        assert_eq!(FilterTranslator::translate(&lit_i(1)), None);
    }

    #[test]
    fn select_filters_reports_remainder() {
        let exact = Expr::is_not_null(col_a());
        let partial = Expr::And(vec![Expr::compare(col_a(), ComparatorOp::Eq, lit_i(3)), unsupported()]);
        let none = unsupported();
        let (pushed, remaining) = FilterTranslator::select_filters(&[exact.clone(), partial.clone(), none.clone()]);
        assert_eq!(pushed.len(), 2);
        assert_eq!(remaining, vec![partial, none]);
    }

    // translate-then-evaluate must agree with evaluating the predicate itself
    #[test]
    fn translated_filters_agree_with_direct_evaluation() {
        let predicates = vec![
            Expr::compare(col_a(), ComparatorOp::Eq, lit_i(2)),
            Expr::compare(lit_i(2), ComparatorOp::Gt, col_a()),
            Expr::compare(col_a(), ComparatorOp::LtEq, lit_i(2)),
            Expr::compare(lit_i(1), ComparatorOp::LtEq, col_a()),
            Expr::in_list(col_a(), vec![lit_i(1), lit_i(3)]),
            Expr::is_null(col_a()),
            Expr::is_not_null(col_a()),
            Expr::And(vec![
                Expr::compare(col_a(), ComparatorOp::GtEq, lit_i(1)),
                Expr::negate(Expr::compare(col_a(), ComparatorOp::Eq, lit_i(2))),
            ]),
            Expr::negate(Expr::in_list(col_a(), vec![lit_i(2), Expr::lit(Literal::Null)])),
        ];
        let values = vec![json!(1), json!(2), json!(3), Value::Null];

        for p in &predicates {
            let f = FilterTranslator::translate_exact(p).expect("predicate translates");
            for v in &values {
                let mut by_key: Row = Map::new();
                by_key.insert(a().row_key(), v.clone());
                let mut by_name: Row = Map::new();
                by_name.insert("colA".into(), v.clone());

                let direct = Eval::eval_predicate3(p, &by_key);
                let pushed = f.evaluate(&by_name);
                assert_eq!(direct.accepts(), pushed.accepts(), "predicate {p} on {v}");
            }
        }
    }
}
