use std::sync::Arc;

use pipesql_ast::{Ident, Ty, TyKind};

use super::FunctionTranslator;
use crate::ir::sx::{SqlExpr, SqlExprKind};
use crate::translate::SqlExprFactory;
use crate::Result;

/// `collection.get_item(i)` as `GeometryN(collection, i + 1)`.
#[derive(Debug)]
pub struct SqliteGeometryCollectionTranslator;

impl FunctionTranslator for SqliteGeometryCollectionTranslator {
    fn translate_method(
        &self,
        factory: &SqlExprFactory,
        instance: Option<&Arc<SqlExpr>>,
        method: &Ident,
        args: &[Arc<SqlExpr>],
    ) -> Result<Option<Arc<SqlExpr>>> {
        let (Some(instance), [index]) = (instance, args) else {
            return Ok(None);
        };
        if !method.is("geometry_collection", "get_item") {
            return Ok(None);
        }

        // GeometryN is 1-based
        let index = factory.add(index, &factory.int(1))?;
        let ty = Ty::new(TyKind::Geometry).with_nullable(true);
        factory
            .function("GeometryN", vec![Arc::clone(instance), index], ty)
            .map(Some)
    }
}

/// `line.count` as `NumPoints(line)`.
#[derive(Debug)]
pub struct SqliteLineStringTranslator;

impl FunctionTranslator for SqliteLineStringTranslator {
    fn translate_member(
        &self,
        factory: &SqlExprFactory,
        instance: Option<&Arc<SqlExpr>>,
        member: &Ident,
    ) -> Result<Option<Arc<SqlExpr>>> {
        let Some(instance) = instance.filter(|_| member.is("line_string", "count")) else {
            return Ok(None);
        };

        let instance = match &instance.kind {
            SqlExprKind::Cast(operand) => operand,
            _ => instance,
        };
        let ty = Ty::int32().with_nullable(instance.ty.nullable);
        factory
            .function("NumPoints", vec![Arc::clone(instance)], ty)
            .map(Some)
    }
}
