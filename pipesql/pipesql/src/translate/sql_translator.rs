use std::sync::Arc;

use log::trace;
use pipesql_ast::{BinOp, Expr, Ident, Literal, Ty, TyKind, UnOp};

use super::{reduce_member_access, SqlExprFactory};
use crate::functions::{owner_name, FunctionRegistry};
use crate::ir::select::SelectBuilder;
use crate::ir::sx::{SqlBinOp, SqlExpr};
use crate::Result;

/// Translates bodies of lambdas into scalar nodes.
///
/// Bodies are expected to have the lambda parameter already replaced by the
/// shaper of the query, so entity members resolve to columns of `select`.
///
/// `Ok(None)` means that the expression has no SQL equivalent. Errors are
/// reserved for broken invariants and for misuse of functions.
pub struct SqlTranslator<'a> {
    factory: &'a SqlExprFactory,
    functions: &'a FunctionRegistry,
    select: &'a SelectBuilder,
}

impl<'a> SqlTranslator<'a> {
    pub fn new(
        factory: &'a SqlExprFactory,
        functions: &'a FunctionRegistry,
        select: &'a SelectBuilder,
    ) -> Self {
        SqlTranslator {
            factory,
            functions,
            select,
        }
    }

    /// Translates an expression in value context.
    pub fn translate(&self, expr: &Expr) -> Result<Option<Arc<SqlExpr>>> {
        self.translate_in_context(expr, true)
    }

    /// Translates an expression in condition context.
    pub fn translate_condition(&self, expr: &Expr) -> Result<Option<Arc<SqlExpr>>> {
        self.translate_in_context(expr, false)
    }

    fn translate_in_context(&self, expr: &Expr, as_value: bool) -> Result<Option<Arc<SqlExpr>>> {
        let Some(translated) = self.visit(expr)? else {
            trace!("no translation for {expr}");
            return Ok(None);
        };
        let translated = self.factory.apply_default_type_mapping(&translated)?;
        Ok(Some(translated.to_value(as_value)))
    }

    fn visit(&self, expr: &Expr) -> Result<Option<Arc<SqlExpr>>> {
        Ok(Some(match expr {
            Expr::Constant(value) => self.factory.constant(value.clone(), literal_ty(value)),
            Expr::Parameter { name, ty } => self.factory.parameter(name, ty.clone()),

            Expr::Member { instance, member } => {
                return self.visit_member(instance.as_deref(), member)
            }
            Expr::Binary { op, left, right } => return self.visit_binary(*op, left, right),
            Expr::Unary { op, expr } => {
                let Some(operand) = self.visit(expr)? else {
                    return Ok(None);
                };
                match op {
                    UnOp::Not => self.factory.not(&operand)?,
                    UnOp::Negate => self.factory.negate(&operand)?,
                }
            }
            Expr::Call {
                instance,
                function,
                args,
            } => return self.visit_call(instance.as_deref(), function, args),
            Expr::Conditional {
                test,
                if_true,
                if_false,
            } => {
                let Some(test) = self.visit(test)? else {
                    return Ok(None);
                };
                let Some((if_true, if_false)) = self.visit_pair(if_true, if_false)? else {
                    return Ok(None);
                };
                self.factory.case(vec![(test, if_true)], Some(if_false))?
            }
            Expr::Convert { expr, ty } => {
                let Some(operand) = self.visit(expr)? else {
                    return Ok(None);
                };
                if operand.ty.kind == ty.kind {
                    // only nullability changes
                    let mut converted = SqlExpr::clone(&operand);
                    converted.ty = ty.clone();
                    Arc::new(converted)
                } else {
                    return self.factory.cast(&operand, ty.clone());
                }
            }
            Expr::ProjectionBinding { member, .. } => {
                return Ok(self.select.get_projection_expression(member))
            }

            Expr::Param(_) | Expr::New(_) | Expr::EntityShaper { .. } | Expr::EnsureNonEmpty(_) => {
                return Ok(None)
            }
        }))
    }

    fn visit_member(
        &self,
        instance: Option<&Expr>,
        member: &Ident,
    ) -> Result<Option<Arc<SqlExpr>>> {
        if let Some(instance) = instance {
            match reduce_member_access(instance) {
                Expr::EntityShaper { member: path, .. } => {
                    return Ok(self.select.bind_property(path, &member.name));
                }
                Expr::New(members) => {
                    let Some(selected) = members
                        .iter()
                        .find(|m| m.name.as_deref() == Some(member.name.as_str()))
                    else {
                        return Ok(None);
                    };
                    return self.visit(&selected.expr);
                }
                _ => {}
            }
        }

        let instance = match instance {
            Some(instance) => match self.visit(instance)? {
                Some(instance) => Some(instance),
                None => return Ok(None),
            },
            None => None,
        };
        let member = qualify(member, instance.as_ref());
        self.functions
            .translate_member(self.factory, instance.as_ref(), &member)
    }

    fn visit_call(
        &self,
        instance: Option<&Expr>,
        function: &Ident,
        args: &[Expr],
    ) -> Result<Option<Arc<SqlExpr>>> {
        let instance = match instance {
            Some(instance) => match self.visit(instance)? {
                Some(instance) => Some(instance),
                None => return Ok(None),
            },
            None => None,
        };

        let mut translated = Vec::with_capacity(args.len());
        for arg in args {
            let Some(arg) = self.visit(arg)? else {
                return Ok(None);
            };
            translated.push(arg);
        }

        let function = qualify(function, instance.as_ref());
        self.functions
            .translate_method(self.factory, instance.as_ref(), &function, &translated)
    }

    fn visit_binary(&self, op: BinOp, left: &Expr, right: &Expr) -> Result<Option<Arc<SqlExpr>>> {
        // comparisons with null are null checks
        if matches!(op, BinOp::Eq | BinOp::Ne) {
            let negated = op == BinOp::Ne;
            let operand = match (is_null(left), is_null(right)) {
                (false, true) => Some(left),
                (true, false) => Some(right),
                _ => None,
            };
            if let Some(operand) = operand {
                let Some(operand) = self.visit(operand)? else {
                    return Ok(None);
                };
                return self.factory.is_null(&operand, negated).map(Some);
            }
        }

        let Some(op) = SqlBinOp::from_bin_op(op) else {
            return Ok(None);
        };
        let Some((left, right)) = self.visit_pair(left, right)? else {
            return Ok(None);
        };
        self.factory.binary(op, &left, &right).map(Some)
    }

    /// Translates two operands. A `null` operand takes the type of the other.
    fn visit_pair(
        &self,
        left: &Expr,
        right: &Expr,
    ) -> Result<Option<(Arc<SqlExpr>, Arc<SqlExpr>)>> {
        let null_like = |other: &Arc<SqlExpr>| {
            let ty = other.ty.clone().with_nullable(true);
            self.factory.constant(Literal::Null, ty)
        };

        Ok(match (is_null(left), is_null(right)) {
            (false, true) => self.visit(left)?.map(|left| {
                let right = null_like(&left);
                (left, right)
            }),
            (true, false) => self.visit(right)?.map(|right| (null_like(&right), right)),
            _ => match (self.visit(left)?, self.visit(right)?) {
                (Some(left), Some(right)) => Some((left, right)),
                _ => None,
            },
        })
    }
}

fn is_null(expr: &Expr) -> bool {
    matches!(expr, Expr::Constant(Literal::Null))
}

/// Qualifies an unqualified method or member by the kind of its instance.
fn qualify(ident: &Ident, instance: Option<&Arc<SqlExpr>>) -> Ident {
    match instance {
        Some(instance) if ident.path.is_empty() => {
            Ident::new(owner_name(&instance.ty.kind), &ident.name)
        }
        _ => ident.clone(),
    }
}

/// Type of a literal written in a pipeline.
fn literal_ty(value: &Literal) -> Ty {
    Ty::new(match value {
        Literal::Null => return Ty::nullable(TyKind::Text),
        Literal::Boolean(_) => TyKind::Bool,
        Literal::Integer(i) if i32::try_from(*i).is_ok() => TyKind::Int32,
        Literal::Integer(_) => TyKind::Int64,
        Literal::Float(_) => TyKind::Float64,
        Literal::Decimal(_) => TyKind::Decimal,
        Literal::Text(_) => TyKind::Text,
        Literal::Char(_) => TyKind::Char,
        Literal::Date(_) => TyKind::Date,
        Literal::DateTime(_) => TyKind::DateTime,
        Literal::Bytes(_) => TyKind::Bytes,
        // arrays are only passed to functions, which read them as constants
        Literal::Array(_) => TyKind::Text,
    })
}
