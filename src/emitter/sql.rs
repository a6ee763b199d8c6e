//! SQL emitter
//!
//! Renders a normalized logical plan as SQL text. Column references print
//! with their qualifier (`table1.name`), so the output is only meaningful
//! once the qualifier normalizer has run.

use crate::{
    error::PlanError,
    plan::{AggregateCall, ColumnRef, Expr, JoinType, OrderBy, PlanNode},
};

/// Emit a pretty-printed SQL string from a plan.
pub fn emit_sql(node: &PlanNode) -> Result<String, PlanError> {
    emit_node(node, 0)
}

fn pad(indent: usize) -> String {
    "  ".repeat(indent)
}

// ---------------------------------------------------------------------------
// Node dispatch
// ---------------------------------------------------------------------------

fn emit_node(node: &PlanNode, indent: usize) -> Result<String, PlanError> {
    let p = pad(indent);
    match node {
        PlanNode::BaseRelation { name, columns, .. } | PlanNode::Scan { relation: name, columns, .. } => {
            Ok(format!("{p}SELECT {cols}\n{p}FROM {name}", cols = emit_columns(columns)))
        }
        PlanNode::Subquery { alias, input } if matches!(input.as_ref(), PlanNode::Hierarchical { .. }) => {
            emit_hierarchical(input, Some(alias), indent)
        }
        PlanNode::Subquery { .. } | PlanNode::Join { .. } => {
            Ok(format!("{p}SELECT *\n{p}FROM {from}", from = emit_from(node, indent)?))
        }
        PlanNode::Project { exprs, input } => emit_project(exprs, input, indent),
        PlanNode::Filter { predicate, input } => Ok(format!(
            "{p}SELECT *\n{p}FROM {from}\n{p}WHERE {pred}",
            from = emit_from(input, indent)?,
            pred = emit_predicate(predicate)?,
        )),
        PlanNode::Aggregate { group_by, aggregates, input, .. } => emit_aggregate(group_by, aggregates, input, indent),
        PlanNode::Hierarchical { .. } => emit_hierarchical(node, None, indent),
        PlanNode::Sort { keys, input } => Ok(format!(
            "{p}SELECT *\n{p}FROM {from}\n{p}ORDER BY {keys}",
            from = emit_from(input, indent)?,
            keys = emit_order_by(keys)?,
        )),
        PlanNode::Limit { limit, offset, input } => {
            let mut sql = format!("{p}SELECT *\n{p}FROM {from}", from = emit_from(input, indent)?);
            if let Some(n) = limit {
                sql.push_str(&format!("\n{p}LIMIT {n}"));
            }
            if let Some(n) = offset {
                sql.push_str(&format!("\n{p}OFFSET {n}"));
            }
            Ok(sql)
        }
    }
}

/// FROM-clause rendering: relations by name, aliased subtrees as
/// `(...) AS alias`, joins inline so both sides keep their aliases.
fn emit_from(node: &PlanNode, indent: usize) -> Result<String, PlanError> {
    let p = pad(indent);
    match node {
        PlanNode::BaseRelation { name, .. } | PlanNode::Scan { relation: name, .. } => Ok(name.clone()),
        PlanNode::Subquery { alias, input } => emit_aliased(alias, input, indent),
        PlanNode::Join { left, right, join_type, condition } => {
            let left = emit_from(left, indent)?;
            let right = emit_from(right, indent)?;
            match (join_type, condition) {
                (JoinType::Cross, None) => Ok(format!("{left}\n{p}{join_type} {right}")),
                (JoinType::Cross, Some(_)) => {
                    Err(PlanError::UnsupportedExpression("CROSS JOIN with a join condition".into()))
                }
                (_, Some(cond)) => Ok(format!("{left}\n{p}{join_type} {right}\n{p}  ON {}", emit_predicate(cond)?)),
                (_, None) => Err(PlanError::UnsupportedExpression(format!("{join_type} without a join condition"))),
            }
        }
        other => Ok(format!("(\n{body}\n{p})", body = emit_node(other, indent + 1)?)),
    }
}

/// `input AS alias` as a FROM item.
fn emit_aliased(alias: &str, input: &PlanNode, indent: usize) -> Result<String, PlanError> {
    let p = pad(indent);
    match input {
        PlanNode::BaseRelation { name, .. } | PlanNode::Scan { relation: name, .. } => Ok(format!("{name} AS {alias}")),
        PlanNode::Hierarchical { .. } => Ok(format!(
            "(\n{body}\n{p}) AS {alias}",
            body = emit_hierarchical(input, Some(alias), indent + 1)?
        )),
        inner => Ok(format!("(\n{body}\n{p}) AS {alias}", body = emit_node(inner, indent + 1)?)),
    }
}

/// START WITH / CONNECT BY query. The normalizer leaves the alias above the
/// hierarchical node while its clauses use it, so an `alias` given here is
/// attached to the relation being walked.
fn emit_hierarchical(node: &PlanNode, alias: Option<&str>, indent: usize) -> Result<String, PlanError> {
    let PlanNode::Hierarchical { input, start_with, connect_by, nocycle } = node else {
        return emit_node(node, indent);
    };
    let p = pad(indent);
    let from = match alias {
        Some(alias) => emit_aliased(alias, input, indent)?,
        None => emit_from(input, indent)?,
    };
    let mut sql = format!("{p}SELECT *\n{p}FROM {from}");
    if let Some(start) = start_with {
        sql.push_str(&format!("\n{p}START WITH {}", emit_predicate(start)?));
    }
    let nocycle = if *nocycle { "NOCYCLE " } else { "" };
    sql.push_str(&format!("\n{p}CONNECT BY {nocycle}{}", emit_predicate(connect_by)?));
    Ok(sql)
}

// ---------------------------------------------------------------------------
// Select lists
// ---------------------------------------------------------------------------

fn emit_project(exprs: &[Expr], input: &PlanNode, indent: usize) -> Result<String, PlanError> {
    if exprs.is_empty() {
        return Err(PlanError::UnsupportedExpression("empty projection".into()));
    }
    let p = pad(indent);
    let items = exprs.iter().map(emit_scalar).collect::<Result<Vec<_>, _>>()?;
    Ok(format!("{p}SELECT {sel}\n{p}FROM {from}", sel = items.join(", "), from = emit_from(input, indent)?))
}

fn emit_aggregate(group_by: &[ColumnRef], aggregates: &[Expr], input: &PlanNode, indent: usize) -> Result<String, PlanError> {
    let p = pad(indent);
    let from = emit_from(input, indent)?;
    let group_cols: Vec<String> = group_by.iter().map(emit_column).collect();

    let mut select_items = group_cols.clone();
    for a in aggregates {
        select_items.push(emit_expr(a, true)?);
    }
    if select_items.is_empty() {
        return Err(PlanError::UnsupportedExpression("aggregation with no output".into()));
    }

    if group_cols.is_empty() {
        Ok(format!("{p}SELECT {sel}\n{p}FROM {from}", sel = select_items.join(", ")))
    } else {
        Ok(format!(
            "{p}SELECT {sel}\n{p}FROM {from}\n{p}GROUP BY {grp}",
            sel = select_items.join(", "),
            grp = group_cols.join(", "),
        ))
    }
}

fn emit_order_by(keys: &[OrderBy]) -> Result<String, PlanError> {
    let rendered = keys
        .iter()
        .map(|k| Ok(format!("{} {}", emit_scalar(&k.expr)?, if k.ascending { "ASC" } else { "DESC" })))
        .collect::<Result<Vec<_>, PlanError>>()?;
    Ok(rendered.join(", "))
}

fn emit_columns(columns: &[ColumnRef]) -> String {
    if columns.is_empty() {
        return "*".to_string();
    }
    columns.iter().map(|c| c.name.clone()).collect::<Vec<_>>().join(", ")
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

fn emit_column(col: &ColumnRef) -> String {
    match col.qualifiers.as_slice() {
        [] => col.name.clone(),
        qs => format!("{}.{}", qs.join("."), col.name),
    }
}

fn emit_scalar(expr: &Expr) -> Result<String, PlanError> {
    emit_expr(expr, false)
}

fn emit_predicate(expr: &Expr) -> Result<String, PlanError> {
    emit_expr(expr, false)
}

fn emit_list(exprs: &[Expr], allow_aggregates: bool) -> Result<Vec<String>, PlanError> {
    exprs.iter().map(|e| emit_expr(e, allow_aggregates)).collect()
}

fn emit_expr(expr: &Expr, allow_aggregates: bool) -> Result<String, PlanError> {
    let nested = |e: &Expr| -> Result<String, PlanError> {
        let s = emit_expr(e, allow_aggregates)?;
        Ok(match e {
            Expr::And(_) | Expr::Or(_) => format!("({s})"),
            _ => s,
        })
    };
    match expr {
        Expr::Literal(l) => Ok(l.to_sql()),
        Expr::Column(c) => Ok(emit_column(c)),
        Expr::Function { name, args } => {
            Ok(format!("{}({})", name.to_uppercase(), emit_list(args, allow_aggregates)?.join(", ")))
        }
        Expr::Compare { left, op, right } => Ok(format!("{} {op} {}", nested(left)?, nested(right)?)),
        Expr::And(operands) => Ok(operands.iter().map(&nested).collect::<Result<Vec<_>, _>>()?.join(" AND ")),
        Expr::Or(operands) => Ok(operands.iter().map(&nested).collect::<Result<Vec<_>, _>>()?.join(" OR ")),
        Expr::Not(inner) => Ok(format!("NOT ({})", emit_expr(inner, allow_aggregates)?)),
        Expr::IsNull { expr, negated } => {
            Ok(format!("{} IS {}NULL", nested(expr)?, if *negated { "NOT " } else { "" }))
        }
        Expr::InList { expr, list, negated } => Ok(format!(
            "{} {}IN ({})",
            nested(expr)?,
            if *negated { "NOT " } else { "" },
            emit_list(list, allow_aggregates)?.join(", ")
        )),
        Expr::Like { expr, pattern, negated } => Ok(format!(
            "{} {}LIKE {}",
            nested(expr)?,
            if *negated { "NOT " } else { "" },
            nested(pattern)?
        )),
        Expr::Aggregate(call) if allow_aggregates => emit_aggregate_call(call),
        Expr::Aggregate(call) => Err(PlanError::UnsupportedExpression(format!("{call} outside an aggregation"))),
        Expr::Alias { expr, output } => {
            let inner = emit_expr(expr, allow_aggregates)?;
            match expr.as_ref() {
                Expr::Column(c) if c.name == output.name => Ok(inner),
                _ => Ok(format!("{inner} AS {}", output.name)),
            }
        }
    }
}

fn emit_aggregate_call(call: &AggregateCall) -> Result<String, PlanError> {
    let name = call.func.name().to_uppercase();
    if call.args.is_empty() {
        return Ok(format!("{name}(*)"));
    }
    // nested aggregates are not valid SQL
    let args = emit_list(&call.args, false)?.join(", ");
    if call.distinct {
        Ok(format!("{name}(DISTINCT {args})"))
    } else {
        Ok(format!("{name}({args})"))
    }
}
