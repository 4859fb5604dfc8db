use std::sync::Arc;

use pipesql_ast::{Ident, Literal, Ty, TyKind};

use super::FunctionTranslator;
use crate::ir::sx::SqlExpr;
use crate::translate::SqlExprFactory;
use crate::Result;

/// Date members on SQL Server: `GETDATE()` and `DATEPART(part, x)`.
#[derive(Debug)]
pub struct SqlServerDateTimeTranslator;

impl FunctionTranslator for SqlServerDateTimeTranslator {
    fn translate_member(
        &self,
        factory: &SqlExprFactory,
        instance: Option<&Arc<SqlExpr>>,
        member: &Ident,
    ) -> Result<Option<Arc<SqlExpr>>> {
        if member.owner() != Some("datetime") {
            return Ok(None);
        }

        let Some(instance) = instance else {
            let function = match member.name.as_str() {
                "now" => "GETDATE",
                "utc_now" => "GETUTCDATE",
                _ => return Ok(None),
            };
            return factory
                .function(function, Vec::new(), Ty::new(TyKind::DateTime))
                .map(Some);
        };

        let part = match member.name.as_str() {
            "year" | "month" | "day" | "hour" | "minute" | "second" => member.name.as_str(),
            _ => return Ok(None),
        };
        let ty = Ty::int32().with_nullable(instance.ty.nullable);
        let args = vec![factory.fragment(part, Ty::text()), Arc::clone(instance)];
        factory.function("DATEPART", args, ty).map(Some)
    }
}

/// Date members on SQLite, which stores dates as text.
#[derive(Debug)]
pub struct SqliteDateTimeTranslator;

impl FunctionTranslator for SqliteDateTimeTranslator {
    fn translate_member(
        &self,
        factory: &SqlExprFactory,
        instance: Option<&Arc<SqlExpr>>,
        member: &Ident,
    ) -> Result<Option<Arc<SqlExpr>>> {
        if member.owner() != Some("datetime") {
            return Ok(None);
        }
        let text = |value: &str| factory.constant(Literal::Text(value.to_string()), Ty::text());

        let Some(instance) = instance else {
            let modifiers = match member.name.as_str() {
                "now" => vec![text("now"), text("localtime")],
                "utc_now" => vec![text("now")],
                _ => return Ok(None),
            };
            let args = std::iter::once(text("%Y-%m-%d %H:%M:%f"))
                .chain(modifiers)
                .collect();
            return factory
                .function("strftime", args, Ty::new(TyKind::DateTime))
                .map(Some);
        };

        let format = match member.name.as_str() {
            "year" => "%Y",
            "month" => "%m",
            "day" => "%d",
            "hour" => "%H",
            "minute" => "%M",
            "second" => "%S",
            _ => return Ok(None),
        };
        let ty = Ty::int32().with_nullable(instance.ty.nullable);
        let part = factory.function(
            "strftime",
            vec![text(format), Arc::clone(instance)],
            Ty::text(),
        )?;
        factory.cast(&part, ty)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ir::sx::SqlExprKind;
    use crate::sql::Dialect;
    use crate::types::DialectTypeMappings;

    #[test]
    fn year() {
        let factory = SqlExprFactory::new(Arc::new(DialectTypeMappings::new(Dialect::SQLite)));
        let born = Arc::new(SqlExpr::column("p", "Born", Ty::new(TyKind::DateTime), None));
        let year = Ident::new("datetime", "year");

        let sqlite = SqliteDateTimeTranslator
            .translate_member(&factory, Some(&born), &year)
            .unwrap()
            .unwrap();
        assert!(matches!(sqlite.kind, SqlExprKind::Cast(_)));
        assert_eq!(sqlite.type_mapping.as_ref().unwrap().store_type, "INTEGER");

        let sqlserver = SqlServerDateTimeTranslator
            .translate_member(&factory, Some(&born), &year)
            .unwrap()
            .unwrap();
        let (name, _, _, args) = sqlserver.kind.as_function().unwrap();
        assert_eq!(name, "DATEPART");
        assert_eq!(args[0].kind, SqlExprKind::Fragment("year".into()));

        let now = Ident::new("datetime", "now");
        assert!(SqlServerDateTimeTranslator
            .translate_member(&factory, None, &now)
            .unwrap()
            .is_some());
        assert!(SqlServerDateTimeTranslator
            .translate_member(&factory, None, &Ident::new("datetime", "yesterday"))
            .unwrap()
            .is_none());
    }
}
