//! A trait to "fold" a pipeline expression tree, rebuilding it bottom-up.
//!
//! Implementors override the methods for the nodes they care about and call
//! the free functions of this module to recurse into the rest.
use itertools::Itertools;

use crate::{Expr, Lambda, NewMember, Result};

pub trait ExprFold {
    fn fold_expr(&mut self, expr: Expr) -> Result<Expr> {
        fold_expr(self, expr)
    }

    fn fold_exprs(&mut self, exprs: Vec<Expr>) -> Result<Vec<Expr>> {
        exprs.into_iter().map(|e| self.fold_expr(e)).try_collect()
    }

    fn fold_lambda(&mut self, lambda: Lambda) -> Result<Lambda> {
        fold_lambda(self, lambda)
    }
}

pub fn fold_expr<F: ?Sized + ExprFold>(fold: &mut F, expr: Expr) -> Result<Expr> {
    Ok(match expr {
        Expr::Param(_)
        | Expr::Constant(_)
        | Expr::Parameter { .. }
        | Expr::EntityShaper { .. }
        | Expr::ProjectionBinding { .. } => expr,

        Expr::Member { instance, member } => Expr::Member {
            instance: fold_optional_box(fold, instance)?,
            member,
        },
        Expr::New(members) => Expr::New(
            members
                .into_iter()
                .map(|m| -> Result<_> {
                    Ok(NewMember {
                        name: m.name,
                        expr: fold.fold_expr(m.expr)?,
                    })
                })
                .try_collect()?,
        ),
        Expr::Binary { op, left, right } => Expr::Binary {
            op,
            left: Box::new(fold.fold_expr(*left)?),
            right: Box::new(fold.fold_expr(*right)?),
        },
        Expr::Unary { op, expr } => Expr::Unary {
            op,
            expr: Box::new(fold.fold_expr(*expr)?),
        },
        Expr::Call {
            instance,
            function,
            args,
        } => Expr::Call {
            instance: fold_optional_box(fold, instance)?,
            function,
            args: fold.fold_exprs(args)?,
        },
        Expr::Conditional {
            test,
            if_true,
            if_false,
        } => Expr::Conditional {
            test: Box::new(fold.fold_expr(*test)?),
            if_true: Box::new(fold.fold_expr(*if_true)?),
            if_false: Box::new(fold.fold_expr(*if_false)?),
        },
        Expr::Convert { expr, ty } => Expr::Convert {
            expr: Box::new(fold.fold_expr(*expr)?),
            ty,
        },
        Expr::EnsureNonEmpty(expr) => Expr::EnsureNonEmpty(Box::new(fold.fold_expr(*expr)?)),
    })
}

pub fn fold_lambda<F: ?Sized + ExprFold>(fold: &mut F, lambda: Lambda) -> Result<Lambda> {
    Ok(Lambda {
        param: lambda.param,
        body: Box::new(fold.fold_expr(*lambda.body)?),
    })
}

fn fold_optional_box<F: ?Sized + ExprFold>(
    fold: &mut F,
    expr: Option<Box<Expr>>,
) -> Result<Option<Box<Expr>>> {
    Ok(match expr {
        Some(e) => Some(Box::new(fold.fold_expr(*e)?)),
        None => None,
    })
}

/// Substitutes `replacement` for every reference to the lambda's parameter,
/// returning the rewritten body.
pub fn inline_lambda(lambda: &Lambda, replacement: &Expr) -> Result<Expr> {
    let mut replacer = ParamReplacer {
        param: &lambda.param,
        replacement,
    };
    replacer.fold_expr(lambda.body.as_ref().clone())
}

struct ParamReplacer<'a> {
    param: &'a str,
    replacement: &'a Expr,
}

impl ExprFold for ParamReplacer<'_> {
    fn fold_expr(&mut self, expr: Expr) -> Result<Expr> {
        match expr {
            Expr::Param(name) if name == self.param => Ok(self.replacement.clone()),
            expr => fold_expr(self, expr),
        }
    }
}
