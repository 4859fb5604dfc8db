use std::sync::Arc;

use pipesql_ast::{Literal, Ty, TyKind};

use crate::ir::select::SelectExpr;
use crate::ir::sx::{CaseWhen, SqlBinOp, SqlExpr, SqlExprKind};
use crate::types::{TypeMapping, TypeMappingSource};
use crate::{Error, Result};

/// Builds scalar nodes, inferring type mappings of operands from each other
/// and from the catalog.
///
/// Constants and parameters don't know their store type. When they are
/// combined with another operand, they take the mapping of that operand
/// (`p.Name = 'x'` writes `'x'` as the column's type). Otherwise they fall
/// back to the catalog default of their type.
#[derive(Debug, Clone)]
pub struct SqlExprFactory {
    mappings: Arc<dyn TypeMappingSource>,
}

impl SqlExprFactory {
    pub fn new(mappings: Arc<dyn TypeMappingSource>) -> Self {
        SqlExprFactory { mappings }
    }

    pub fn find_mapping(&self, kind: &TyKind) -> Option<TypeMapping> {
        self.mappings.find_mapping(kind)
    }

    /// Resolves the type mapping of a node that has none.
    ///
    /// Nodes that already have a mapping are returned as they are.
    pub fn apply_type_mapping(
        &self,
        expr: &Arc<SqlExpr>,
        mapping: Option<&TypeMapping>,
    ) -> Result<Arc<SqlExpr>> {
        let Some(mapping) = mapping else {
            return Err(Error::new_assert(format!(
                "cannot apply an empty type mapping to {}",
                expr.kind.as_ref()
            )));
        };
        if expr.type_mapping.is_some() {
            return Ok(Arc::clone(expr));
        }

        let kind = match &expr.kind {
            SqlExprKind::Negate(operand) => {
                SqlExprKind::Negate(self.apply_type_mapping(operand, Some(mapping))?)
            }
            SqlExprKind::Binary { op, left, right } if !op.is_comparison() && !op.is_logical() => {
                SqlExprKind::Binary {
                    op: *op,
                    left: self.apply_type_mapping(left, Some(mapping))?,
                    right: self.apply_type_mapping(right, Some(mapping))?,
                }
            }
            SqlExprKind::Case { whens, else_result } => SqlExprKind::Case {
                whens: whens
                    .iter()
                    .map(|w| -> Result<_> {
                        Ok(CaseWhen {
                            test: Arc::clone(&w.test),
                            result: self.apply_type_mapping(&w.result, Some(mapping))?,
                        })
                    })
                    .collect::<Result<_>>()?,
                else_result: else_result
                    .as_ref()
                    .map(|e| self.apply_type_mapping(e, Some(mapping)))
                    .transpose()?,
            },
            kind => kind.clone(),
        };

        let mut expr = expr.with_kind(kind);
        expr.type_mapping = Some(mapping.clone());
        Ok(Arc::new(expr))
    }

    /// Resolves the mapping of a node from the catalog default of its type.
    /// Types without a catalog mapping are left unresolved.
    pub fn apply_default_type_mapping(&self, expr: &Arc<SqlExpr>) -> Result<Arc<SqlExpr>> {
        if expr.type_mapping.is_some() {
            return Ok(Arc::clone(expr));
        }
        match self.find_mapping(&expr.ty.kind) {
            Some(mapping) => self.apply_type_mapping(expr, Some(&mapping)),
            None => Ok(Arc::clone(expr)),
        }
    }

    /// Applies an inferred mapping, or the default mapping when nothing
    /// could be inferred.
    pub fn apply_inferred_type_mapping(
        &self,
        expr: &Arc<SqlExpr>,
        inferred: Option<&TypeMapping>,
    ) -> Result<Arc<SqlExpr>> {
        match inferred {
            Some(mapping) => self.apply_type_mapping(expr, Some(mapping)),
            None => self.apply_default_type_mapping(expr),
        }
    }

    /// Infers a mapping among the nodes and applies it to all of them.
    pub fn apply_common_type_mapping(
        &self,
        exprs: &[&Arc<SqlExpr>],
    ) -> Result<Vec<Arc<SqlExpr>>> {
        let inferred = Self::infer_type_mapping(exprs.iter().copied());
        exprs
            .iter()
            .map(|e| self.apply_inferred_type_mapping(e, inferred.as_ref()))
            .collect()
    }

    /// First resolved mapping among the nodes.
    pub fn infer_type_mapping<'a, I>(exprs: I) -> Option<TypeMapping>
    where
        I: IntoIterator<Item = &'a Arc<SqlExpr>>,
    {
        exprs.into_iter().find_map(|e| e.type_mapping.clone())
    }

    pub fn constant(&self, value: Literal, ty: Ty) -> Arc<SqlExpr> {
        Arc::new(SqlExpr::new(SqlExprKind::Constant(value), ty, None))
    }

    /// An `int` constant with its mapping resolved.
    pub fn int(&self, value: i64) -> Arc<SqlExpr> {
        let mapping = self.find_mapping(&TyKind::Int32);
        Arc::new(SqlExpr::new(
            SqlExprKind::Constant(Literal::Integer(value)),
            Ty::int32(),
            mapping,
        ))
    }

    pub fn parameter<S: ToString>(&self, name: S, ty: Ty) -> Arc<SqlExpr> {
        Arc::new(SqlExpr::new(
            SqlExprKind::Parameter(name.to_string()),
            ty,
            None,
        ))
    }

    pub fn fragment<S: ToString>(&self, sql: S, ty: Ty) -> Arc<SqlExpr> {
        Arc::new(SqlExpr::new(SqlExprKind::Fragment(sql.to_string()), ty, None))
    }

    pub fn binary(
        &self,
        op: SqlBinOp,
        left: &Arc<SqlExpr>,
        right: &Arc<SqlExpr>,
    ) -> Result<Arc<SqlExpr>> {
        if op.is_logical() {
            let left = self.apply_default_type_mapping(left)?;
            let right = self.apply_default_type_mapping(right)?;
            return Ok(Arc::new(SqlExpr::binary(
                op,
                left,
                right,
                Ty::bool(),
                self.find_mapping(&TyKind::Bool),
            )));
        }

        let inferred = Self::infer_type_mapping([left, right]);
        let left = self.apply_inferred_type_mapping(left, inferred.as_ref())?;
        let right = self.apply_inferred_type_mapping(right, inferred.as_ref())?;

        let (ty, mapping) = if op.is_comparison() {
            (Ty::bool(), self.find_mapping(&TyKind::Bool))
        } else {
            let nullable = match op {
                SqlBinOp::Coalesce => right.ty.nullable,
                _ => left.ty.nullable || right.ty.nullable,
            };
            (left.ty.clone().with_nullable(nullable), left.type_mapping.clone())
        };
        Ok(Arc::new(SqlExpr::binary(op, left, right, ty, mapping)))
    }

    pub fn equal(&self, left: &Arc<SqlExpr>, right: &Arc<SqlExpr>) -> Result<Arc<SqlExpr>> {
        self.binary(SqlBinOp::Equal, left, right)
    }

    pub fn add(&self, left: &Arc<SqlExpr>, right: &Arc<SqlExpr>) -> Result<Arc<SqlExpr>> {
        self.binary(SqlBinOp::Add, left, right)
    }

    pub fn subtract(&self, left: &Arc<SqlExpr>, right: &Arc<SqlExpr>) -> Result<Arc<SqlExpr>> {
        self.binary(SqlBinOp::Subtract, left, right)
    }

    pub fn and(&self, left: &Arc<SqlExpr>, right: &Arc<SqlExpr>) -> Result<Arc<SqlExpr>> {
        self.binary(SqlBinOp::AndAlso, left, right)
    }

    pub fn or(&self, left: &Arc<SqlExpr>, right: &Arc<SqlExpr>) -> Result<Arc<SqlExpr>> {
        self.binary(SqlBinOp::OrElse, left, right)
    }

    pub fn not(&self, operand: &Arc<SqlExpr>) -> Result<Arc<SqlExpr>> {
        let operand = self.apply_default_type_mapping(operand)?.to_value(false);
        Ok(Arc::new(SqlExpr::new(
            SqlExprKind::Not(operand),
            Ty::bool(),
            self.find_mapping(&TyKind::Bool),
        )))
    }

    pub fn negate(&self, operand: &Arc<SqlExpr>) -> Result<Arc<SqlExpr>> {
        let operand = operand.to_value(true);
        let ty = operand.ty.clone();
        let mapping = operand.type_mapping.clone();
        Ok(Arc::new(SqlExpr::new(SqlExprKind::Negate(operand), ty, mapping)))
    }

    pub fn is_null(&self, operand: &Arc<SqlExpr>, negated: bool) -> Result<Arc<SqlExpr>> {
        let operand = self.apply_default_type_mapping(operand)?.to_value(true);
        Ok(Arc::new(SqlExpr::new(
            SqlExprKind::IsNull { operand, negated },
            Ty::bool(),
            self.find_mapping(&TyKind::Bool),
        )))
    }

    /// A function call, typed with the catalog mapping of its result type.
    pub fn function<S: ToString>(
        &self,
        name: S,
        args: Vec<Arc<SqlExpr>>,
        ty: Ty,
    ) -> Result<Arc<SqlExpr>> {
        let mapping = self.find_mapping(&ty.kind);
        self.function_with_mapping(name, None, args, ty, mapping)
    }

    pub fn function_with_mapping<S: ToString>(
        &self,
        name: S,
        instance: Option<Arc<SqlExpr>>,
        args: Vec<Arc<SqlExpr>>,
        ty: Ty,
        mapping: Option<TypeMapping>,
    ) -> Result<Arc<SqlExpr>> {
        let args = args
            .iter()
            .map(|a| Ok(self.apply_default_type_mapping(a)?.to_value(true)))
            .collect::<Result<_>>()?;
        let kind = SqlExprKind::Function {
            name: name.to_string(),
            schema: None,
            instance,
            args,
        };
        Ok(Arc::new(SqlExpr::new(kind, ty, mapping)))
    }

    /// `CASE WHEN .. THEN .. ELSE .. END`
    pub fn case(
        &self,
        whens: Vec<(Arc<SqlExpr>, Arc<SqlExpr>)>,
        else_result: Option<Arc<SqlExpr>>,
    ) -> Result<Arc<SqlExpr>> {
        let inferred =
            Self::infer_type_mapping(whens.iter().map(|(_, r)| r).chain(else_result.as_ref()));

        let mut ty = None;
        let whens = whens
            .into_iter()
            .map(|(test, result)| -> Result<_> {
                let result = self
                    .apply_inferred_type_mapping(&result, inferred.as_ref())?
                    .to_value(true);
                ty.get_or_insert_with(|| result.ty.clone());
                Ok(CaseWhen {
                    test: self.apply_default_type_mapping(&test)?.to_value(false),
                    result,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let else_result = else_result
            .map(|e| -> Result<_> {
                let e = self.apply_inferred_type_mapping(&e, inferred.as_ref())?;
                Ok(e.to_value(true))
            })
            .transpose()?;

        let Some(ty) = ty else {
            return Err(Error::new_assert("CASE without any WHEN"));
        };
        let nullable = else_result.as_ref().map_or(true, |e| e.ty.nullable)
            || whens.iter().any(|w| w.result.ty.nullable);
        let kind = SqlExprKind::Case { whens, else_result };
        Ok(Arc::new(SqlExpr::new(kind, ty.with_nullable(nullable), inferred)))
    }

    pub fn exists(&self, subquery: SelectExpr, negated: bool) -> Arc<SqlExpr> {
        let kind = SqlExprKind::Exists {
            subquery: Arc::new(subquery),
            negated,
        };
        Arc::new(SqlExpr::new(kind, Ty::bool(), self.find_mapping(&TyKind::Bool)))
    }

    pub fn like(
        &self,
        match_expr: &Arc<SqlExpr>,
        pattern: &Arc<SqlExpr>,
        escape: Option<&Arc<SqlExpr>>,
    ) -> Result<Arc<SqlExpr>> {
        let inferred = Self::infer_type_mapping([match_expr, pattern].into_iter().chain(escape));
        let match_expr = self.apply_inferred_type_mapping(match_expr, inferred.as_ref())?;
        let pattern = self.apply_inferred_type_mapping(pattern, inferred.as_ref())?;
        let escape = escape
            .map(|e| self.apply_inferred_type_mapping(e, inferred.as_ref()))
            .transpose()?;

        let kind = SqlExprKind::Like {
            match_expr,
            pattern,
            escape,
        };
        Ok(Arc::new(SqlExpr::new(
            kind,
            Ty::bool(),
            self.find_mapping(&TyKind::Bool),
        )))
    }

    /// `CAST(operand AS store type)`. Types without a store type can't be
    /// cast to.
    pub fn cast(&self, operand: &Arc<SqlExpr>, ty: Ty) -> Result<Option<Arc<SqlExpr>>> {
        let Some(mapping) = self.find_mapping(&ty.kind) else {
            return Ok(None);
        };
        let operand = self.apply_default_type_mapping(operand)?.to_value(true);
        Ok(Some(Arc::new(SqlExpr::new(
            SqlExprKind::Cast(operand),
            ty,
            Some(mapping),
        ))))
    }

    /// `CAST(operand AS store_type)` with an explicit mapping.
    pub fn cast_with_mapping(
        &self,
        operand: &Arc<SqlExpr>,
        ty: Ty,
        mapping: TypeMapping,
    ) -> Arc<SqlExpr> {
        Arc::new(SqlExpr::new(
            SqlExprKind::Cast(operand.to_value(true)),
            ty,
            Some(mapping),
        ))
    }
}

#[cfg(test)]
mod test {
    use insta::assert_snapshot;

    use super::*;
    use crate::sql::Dialect;
    use crate::types::DialectTypeMappings;

    fn factory() -> SqlExprFactory {
        SqlExprFactory::new(Arc::new(DialectTypeMappings::new(Dialect::MsSql)))
    }

    #[test]
    fn infers_mapping_from_other_operand() {
        let factory = factory();
        let mapping = factory
            .find_mapping(&TyKind::Text)
            .unwrap()
            .with_store_type("nvarchar(50)");
        let name = Arc::new(SqlExpr::column("p", "Name", Ty::text(), Some(mapping)));
        let constant = factory.constant("Bob".into(), Ty::text());

        let eq = factory.equal(&name, &constant).unwrap();
        let (_, _, right) = eq.kind.as_binary().unwrap();
        assert_snapshot!(right.type_mapping.as_ref().unwrap().store_type, @"nvarchar(50)");
        assert_snapshot!(eq.type_mapping.as_ref().unwrap().store_type, @"bit");
        assert!(eq.is_condition);
    }

    #[test]
    fn falls_back_to_default_mapping() {
        let factory = factory();
        let sum = factory
            .add(&factory.constant(1.into(), Ty::int32()), &factory.parameter("p", Ty::int32()))
            .unwrap();
        assert_snapshot!(sum.type_mapping.as_ref().unwrap().store_type, @"int");
        assert!(!sum.is_condition);
    }

    #[test]
    fn null_mapping_is_a_bug() {
        let factory = factory();
        let constant = factory.constant(1.into(), Ty::int32());
        let err = factory.apply_type_mapping(&constant, None).unwrap_err();
        assert_snapshot!(err, @"internal compiler error; cannot apply an empty type mapping to Constant");
    }

    #[test]
    fn logical_operands_become_conditions() {
        let factory = factory();
        let active = Arc::new(SqlExpr::column("p", "Active", Ty::bool(), None));
        let and = factory.and(&active, &active).unwrap();
        let (_, left, _) = and.kind.as_binary().unwrap();
        assert!(!left.as_value);
        assert!(!left.is_condition);
    }
}
