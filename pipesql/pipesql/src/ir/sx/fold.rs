//! Rewriting of the scalar expression tree and of select nodes.
//!
//! Unlike a plain fold, these rewrites preserve sharing: a node is rebuilt
//! only if one of its children was replaced, otherwise the very same [Arc] is
//! returned. Applying a fold that changes nothing is free and yields a
//! pointer-identical tree.
//!
//! The translator builds its trees through [SelectBuilder] mutations and
//! doesn't fold. [SqlFold] is the hook for callers that post-process a
//! [ShapedQuery] before it is rendered, i.e. renaming tables or replacing
//! parameters with constants.
//!
//! [SelectBuilder]: crate::ir::select::SelectBuilder
//! [ShapedQuery]: crate::translate::ShapedQuery
use std::sync::Arc;

use super::{CaseWhen, SqlExpr, SqlExprKind};
use crate::ir::select::{Ordering, ProjectionItem, SelectExpr, TableSource};
use crate::Result;

pub trait SqlFold {
    fn fold_sql_expr(&mut self, expr: &Arc<SqlExpr>) -> Result<Arc<SqlExpr>> {
        fold_sql_expr_children(self, expr)
    }

    fn fold_select(&mut self, select: &Arc<SelectExpr>) -> Result<Arc<SelectExpr>> {
        fold_select_children(self, select)
    }
}

/// Records whether any folded child came back as a different node.
#[derive(Default)]
struct Changes {
    changed: bool,
}

impl Changes {
    fn expr<F: ?Sized + SqlFold>(
        &mut self,
        fold: &mut F,
        expr: &Arc<SqlExpr>,
    ) -> Result<Arc<SqlExpr>> {
        let new = fold.fold_sql_expr(expr)?;
        self.changed |= !Arc::ptr_eq(expr, &new);
        Ok(new)
    }

    fn opt_expr<F: ?Sized + SqlFold>(
        &mut self,
        fold: &mut F,
        expr: &Option<Arc<SqlExpr>>,
    ) -> Result<Option<Arc<SqlExpr>>> {
        expr.as_ref().map(|e| self.expr(fold, e)).transpose()
    }

    fn exprs<F: ?Sized + SqlFold>(
        &mut self,
        fold: &mut F,
        exprs: &[Arc<SqlExpr>],
    ) -> Result<Vec<Arc<SqlExpr>>> {
        exprs.iter().map(|e| self.expr(fold, e)).collect()
    }

    fn select<F: ?Sized + SqlFold>(
        &mut self,
        fold: &mut F,
        select: &Arc<SelectExpr>,
    ) -> Result<Arc<SelectExpr>> {
        let new = fold.fold_select(select)?;
        self.changed |= !Arc::ptr_eq(select, &new);
        Ok(new)
    }
}

pub fn fold_sql_expr_children<F: ?Sized + SqlFold>(
    fold: &mut F,
    expr: &Arc<SqlExpr>,
) -> Result<Arc<SqlExpr>> {
    let mut changes = Changes::default();

    let kind = match &expr.kind {
        SqlExprKind::Column { .. }
        | SqlExprKind::Constant(_)
        | SqlExprKind::Parameter(_)
        | SqlExprKind::Fragment(_) => return Ok(Arc::clone(expr)),

        SqlExprKind::Binary { op, left, right } => SqlExprKind::Binary {
            op: *op,
            left: changes.expr(fold, left)?,
            right: changes.expr(fold, right)?,
        },
        SqlExprKind::Not(operand) => SqlExprKind::Not(changes.expr(fold, operand)?),
        SqlExprKind::Negate(operand) => SqlExprKind::Negate(changes.expr(fold, operand)?),
        SqlExprKind::IsNull { operand, negated } => SqlExprKind::IsNull {
            operand: changes.expr(fold, operand)?,
            negated: *negated,
        },
        SqlExprKind::Function {
            name,
            schema,
            instance,
            args,
        } => SqlExprKind::Function {
            name: name.clone(),
            schema: schema.clone(),
            instance: changes.opt_expr(fold, instance)?,
            args: changes.exprs(fold, args)?,
        },
        SqlExprKind::Case { whens, else_result } => SqlExprKind::Case {
            whens: whens
                .iter()
                .map(|w| -> Result<_> {
                    Ok(CaseWhen {
                        test: changes.expr(fold, &w.test)?,
                        result: changes.expr(fold, &w.result)?,
                    })
                })
                .collect::<Result<_>>()?,
            else_result: changes.opt_expr(fold, else_result)?,
        },
        SqlExprKind::Exists { subquery, negated } => SqlExprKind::Exists {
            subquery: changes.select(fold, subquery)?,
            negated: *negated,
        },
        SqlExprKind::Like {
            match_expr,
            pattern,
            escape,
        } => SqlExprKind::Like {
            match_expr: changes.expr(fold, match_expr)?,
            pattern: changes.expr(fold, pattern)?,
            escape: changes.opt_expr(fold, escape)?,
        },
        SqlExprKind::Cast(operand) => SqlExprKind::Cast(changes.expr(fold, operand)?),
    };

    Ok(if changes.changed {
        Arc::new(expr.with_kind(kind))
    } else {
        Arc::clone(expr)
    })
}

pub fn fold_select_children<F: ?Sized + SqlFold>(
    fold: &mut F,
    select: &Arc<SelectExpr>,
) -> Result<Arc<SelectExpr>> {
    let mut changes = Changes::default();

    let tables = select
        .tables
        .iter()
        .map(|table| -> Result<_> {
            Ok(match table {
                TableSource::Table { .. } => table.clone(),
                TableSource::Subquery { select, alias } => TableSource::Subquery {
                    select: changes.select(fold, select)?,
                    alias: alias.clone(),
                },
            })
        })
        .collect::<Result<_>>()?;
    let projection = select
        .projection
        .iter()
        .map(|item| -> Result<_> {
            Ok(ProjectionItem {
                expr: changes.expr(fold, &item.expr)?,
                alias: item.alias.clone(),
            })
        })
        .collect::<Result<_>>()?;
    let predicate = changes.opt_expr(fold, &select.predicate)?;
    let orderings = select
        .orderings
        .iter()
        .map(|o| -> Result<_> {
            Ok(Ordering {
                expr: changes.expr(fold, &o.expr)?,
                ascending: o.ascending,
            })
        })
        .collect::<Result<_>>()?;
    let limit = changes.opt_expr(fold, &select.limit)?;
    let offset = changes.opt_expr(fold, &select.offset)?;

    if !changes.changed {
        return Ok(Arc::clone(select));
    }
    Ok(Arc::new(SelectExpr {
        tables,
        projection,
        projection_mapping: select.projection_mapping.clone(),
        predicate,
        orderings,
        limit,
        offset,
        is_distinct: select.is_distinct,
    }))
}

#[cfg(test)]
mod test {
    use pipesql_ast::{Literal, Ty};

    use super::*;
    use crate::ir::sx::SqlBinOp;

    struct Identity;
    impl SqlFold for Identity {}

    /// Replaces every constant `1` with `2`.
    struct OneToTwo;
    impl SqlFold for OneToTwo {
        fn fold_sql_expr(&mut self, expr: &Arc<SqlExpr>) -> Result<Arc<SqlExpr>> {
            if expr.kind == SqlExprKind::Constant(Literal::Integer(1)) {
                return Ok(Arc::new(expr.with_kind(SqlExprKind::Constant(Literal::Integer(2)))));
            }
            fold_sql_expr_children(self, expr)
        }
    }

    fn sample() -> Arc<SqlExpr> {
        let age = Arc::new(SqlExpr::column("p", "Age", Ty::int32(), None));
        let name = Arc::new(SqlExpr::column("p", "Name", Ty::text(), None));
        let one = Arc::new(SqlExpr::new(
            SqlExprKind::Constant(Literal::Integer(1)),
            Ty::int32(),
            None,
        ));
        let cmp = Arc::new(SqlExpr::binary(
            SqlBinOp::GreaterThan,
            age,
            one,
            Ty::bool(),
            None,
        ));
        let not_null = Arc::new(SqlExpr::new(
            SqlExprKind::IsNull {
                operand: name,
                negated: true,
            },
            Ty::bool(),
            None,
        ));
        Arc::new(SqlExpr::and(cmp, not_null))
    }

    #[test]
    fn identity_fold_keeps_nodes() {
        let expr = sample();
        let folded = Identity.fold_sql_expr(&expr).unwrap();
        assert!(Arc::ptr_eq(&expr, &folded));

        let leaf = Arc::new(SqlExpr::new(SqlExprKind::Fragment("*".into()), Ty::int32(), None));
        assert!(Arc::ptr_eq(&leaf, &Identity.fold_sql_expr(&leaf).unwrap()));
    }

    #[test]
    fn changed_child_rebuilds_path_only() {
        let expr = sample();
        let folded = OneToTwo.fold_sql_expr(&expr).unwrap();
        assert!(!Arc::ptr_eq(&expr, &folded));
        assert_ne!(expr, folded);

        // the untouched `Name IS NOT NULL` branch is shared
        let (_, _, old_right) = expr.kind.as_binary().unwrap();
        let (_, _, new_right) = folded.kind.as_binary().unwrap();
        assert!(Arc::ptr_eq(old_right, new_right));
    }

    #[test]
    fn identity_fold_keeps_select() {
        let select = Arc::new(SelectExpr {
            tables: vec![TableSource::Table {
                name: "Person".into(),
                schema: None,
                alias: "p".into(),
            }],
            projection: vec![ProjectionItem {
                expr: sample(),
                alias: None,
            }],
            projection_mapping: vec![],
            predicate: Some(sample()),
            orderings: vec![],
            limit: None,
            offset: None,
            is_distinct: false,
        });
        let folded = Identity.fold_select(&select).unwrap();
        assert!(Arc::ptr_eq(&select, &folded));
    }
}
