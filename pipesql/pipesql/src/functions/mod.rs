//! Translation of method calls and member accesses that have no direct SQL
//! operator, such as string manipulation, date parts or spatial functions.
//!
//! Each [FunctionTranslator] handles some set of operations. The
//! [FunctionRegistry] tries them in order and the first one that returns a
//! node wins. Translators added with [FunctionRegistry::register] are tried
//! before the built-in translators of the dialect.
//!
//! Operations are identified by an [Ident] whose owner is the kind of the
//! instance (see [owner_name]), i.e. `string.starts_with` or
//! `datetime.year`. Static operations carry the owner they were called with,
//! i.e. `functions.freetext`.

mod datetime;
mod spatial;
mod sqlserver;
mod string;

use std::fmt::Debug;
use std::sync::Arc;

use pipesql_ast::{Ident, TyKind};

pub use datetime::{SqlServerDateTimeTranslator, SqliteDateTimeTranslator};
pub use spatial::{SqliteGeometryCollectionTranslator, SqliteLineStringTranslator};
pub use sqlserver::{SqlServerFullTextTranslator, SqlServerObjectToStringTranslator};
pub use string::{SqliteStringTranslator, StringTranslator};

use crate::ir::sx::SqlExpr;
use crate::sql::Dialect;
use crate::translate::SqlExprFactory;
use crate::Result;

/// Translates some operations into scalar nodes.
///
/// Returning `Ok(None)` means the operation is not handled by this
/// translator. Errors are reserved for operations that are handled, but were
/// called with arguments that can't be translated.
pub trait FunctionTranslator: Debug + Send + Sync {
    fn translate_method(
        &self,
        factory: &SqlExprFactory,
        instance: Option<&Arc<SqlExpr>>,
        method: &Ident,
        args: &[Arc<SqlExpr>],
    ) -> Result<Option<Arc<SqlExpr>>> {
        let _ = (factory, instance, method, args);
        Ok(None)
    }

    fn translate_member(
        &self,
        factory: &SqlExprFactory,
        instance: Option<&Arc<SqlExpr>>,
        member: &Ident,
    ) -> Result<Option<Arc<SqlExpr>>> {
        let _ = (factory, instance, member);
        Ok(None)
    }
}

/// Ordered list of function translators.
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    translators: Vec<Arc<dyn FunctionTranslator>>,
    /// Number of translators registered by the user, all at the front.
    registered: usize,
}

impl FunctionRegistry {
    /// Built-in translators of a dialect.
    pub fn for_dialect(dialect: Dialect) -> Self {
        let translators: Vec<Arc<dyn FunctionTranslator>> = match dialect {
            Dialect::MsSql => vec![
                Arc::new(StringTranslator::new("LEN")),
                Arc::new(SqlServerObjectToStringTranslator),
                Arc::new(SqlServerFullTextTranslator),
                Arc::new(SqlServerDateTimeTranslator),
            ],
            Dialect::SQLite => vec![
                Arc::new(SqliteStringTranslator),
                Arc::new(SqliteDateTimeTranslator),
                Arc::new(SqliteGeometryCollectionTranslator),
                Arc::new(SqliteLineStringTranslator),
            ],
            Dialect::Postgres => vec![Arc::new(StringTranslator::new("LENGTH"))],
            Dialect::Generic => vec![Arc::new(StringTranslator::new("CHAR_LENGTH"))],
        };
        FunctionRegistry {
            translators,
            registered: 0,
        }
    }

    /// Adds a translator, tried after previously registered ones, but before
    /// all built-in translators.
    pub fn register(&mut self, translator: Arc<dyn FunctionTranslator>) {
        self.translators.insert(self.registered, translator);
        self.registered += 1;
    }

    pub fn translate_method(
        &self,
        factory: &SqlExprFactory,
        instance: Option<&Arc<SqlExpr>>,
        method: &Ident,
        args: &[Arc<SqlExpr>],
    ) -> Result<Option<Arc<SqlExpr>>> {
        for translator in &self.translators {
            if let Some(expr) = translator.translate_method(factory, instance, method, args)? {
                return Ok(Some(expr));
            }
        }
        Ok(None)
    }

    pub fn translate_member(
        &self,
        factory: &SqlExprFactory,
        instance: Option<&Arc<SqlExpr>>,
        member: &Ident,
    ) -> Result<Option<Arc<SqlExpr>>> {
        for translator in &self.translators {
            if let Some(expr) = translator.translate_member(factory, instance, member)? {
                return Ok(Some(expr));
            }
        }
        Ok(None)
    }
}

/// Name under which operations on values of a kind are looked up.
pub fn owner_name(kind: &TyKind) -> &'static str {
    match kind {
        TyKind::Bool => "bool",
        TyKind::Int16 | TyKind::Int32 | TyKind::Int64 => "int",
        TyKind::Float32 | TyKind::Float64 => "float",
        TyKind::Decimal => "decimal",
        TyKind::Text => "string",
        TyKind::Char => "char",
        TyKind::Date | TyKind::DateTime => "datetime",
        TyKind::Bytes => "bytes",
        TyKind::Geometry => "geometry",
        TyKind::Point => "point",
        TyKind::LineString => "line_string",
        TyKind::GeometryCollection => "geometry_collection",
        TyKind::Entity(_) | TyKind::Anonymous => "object",
    }
}
