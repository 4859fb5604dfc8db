use std::sync::Arc;

use pipesql_ast::{Ident, Literal, Ty, TyKind};

use super::FunctionTranslator;
use crate::ir::sx::{SqlExpr, SqlExprKind};
use crate::translate::SqlExprFactory;
use crate::{Error, Result};

/// `x.to_string()` as `CONVERT(VARCHAR(n), x)`.
#[derive(Debug)]
pub struct SqlServerObjectToStringTranslator;

/// Length of the string representation of a store type.
fn string_length(store_type: &str) -> Option<u32> {
    const DEFAULT_LENGTH: u32 = 100;

    let base = store_type.split('(').next().unwrap_or(store_type).trim();
    Some(match base {
        "int" => 11,
        "bigint" => 20,
        "smallint" => 6,
        "tinyint" => 3,
        "nchar" | "char" => 1,
        "uniqueidentifier" => 36,
        "date" | "datetime" | "datetime2" | "datetimeoffset" | "time" | "float" | "real"
        | "decimal" | "numeric" | "money" | "varbinary" | "binary" => DEFAULT_LENGTH,
        _ => return None,
    })
}

impl FunctionTranslator for SqlServerObjectToStringTranslator {
    fn translate_method(
        &self,
        factory: &SqlExprFactory,
        instance: Option<&Arc<SqlExpr>>,
        method: &Ident,
        args: &[Arc<SqlExpr>],
    ) -> Result<Option<Arc<SqlExpr>>> {
        let Some(instance) = instance else {
            return Ok(None);
        };
        if method.name != "to_string" || !args.is_empty() {
            return Ok(None);
        }

        let instance = factory.apply_default_type_mapping(instance)?;
        let Some(length) = instance
            .type_mapping
            .as_ref()
            .and_then(|m| string_length(&m.store_type))
        else {
            return Ok(None);
        };

        let store_type = factory.fragment(format!("VARCHAR({length})"), Ty::text());
        let ty = Ty::text().with_nullable(instance.ty.nullable);
        let mapping = factory.find_mapping(&TyKind::Text);
        factory
            .function_with_mapping("CONVERT", None, vec![store_type, instance], ty, mapping)
            .map(Some)
    }
}

/// `FREETEXT` and `CONTAINS` full-text predicates, called as
/// `functions.freetext(property, text)` or with a language term
/// `functions.freetext(property, text, 1033)`.
#[derive(Debug)]
pub struct SqlServerFullTextTranslator;

impl FunctionTranslator for SqlServerFullTextTranslator {
    fn translate_method(
        &self,
        factory: &SqlExprFactory,
        instance: Option<&Arc<SqlExpr>>,
        method: &Ident,
        args: &[Arc<SqlExpr>],
    ) -> Result<Option<Arc<SqlExpr>>> {
        if instance.is_some() || method.owner() != Some("functions") {
            return Ok(None);
        }
        let function = match method.name.as_str() {
            "freetext" => "FREETEXT",
            "contains" => "CONTAINS",
            _ => return Ok(None),
        };
        let (property, search, language) = match args {
            [property, search] => (property, search, None),
            [property, search, language] => (property, search, Some(language)),
            _ => return Ok(None),
        };

        if !matches!(property.kind, SqlExprKind::Column { .. }) {
            return Err(Error::new_usage(
                method,
                "the property argument must be a column of an entity",
            ));
        }
        let search = factory.apply_inferred_type_mapping(search, property.type_mapping.as_ref())?;

        let mut function_args = vec![Arc::clone(property), search];
        if let Some(language) = language {
            let SqlExprKind::Constant(Literal::Integer(language)) = &language.kind else {
                return Err(Error::new_usage(method, "the language term must be a constant"));
            };
            function_args.push(factory.fragment(format!("LANGUAGE {language}"), Ty::int32()));
        }

        let mapping = factory.find_mapping(&TyKind::Bool);
        let predicate =
            factory.function_with_mapping(function, None, function_args, Ty::bool(), mapping)?;
        Ok(Some(Arc::new(SqlExpr::clone(&predicate).into_condition())))
    }
}
