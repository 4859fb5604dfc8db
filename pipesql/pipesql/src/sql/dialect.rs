//! Feature map for SQL dialects.
//!
//! Generated SQL targets the generic dialect wherever possible. Dialect
//! specifics are added only where the generic form is not supported (i.e.
//! `FETCH FIRST` is not supported by SQLite) or where the dialect has no
//! native boolean values and conditions have to be coerced.
use core::fmt::Debug;
use std::any::{Any, TypeId};

use serde::{Deserialize, Serialize};

/// SQL dialect.
///
/// This changes pagination, identifier quoting, literal rendering of some
/// types and the set of available functions.
#[derive(
    Debug,
    PartialEq,
    Eq,
    Hash,
    Clone,
    Copy,
    Serialize,
    Default,
    Deserialize,
    strum::Display,
    strum::EnumIter,
    strum::EnumString,
    strum::VariantNames,
)]
#[strum(serialize_all = "lowercase")]
pub enum Dialect {
    #[default]
    Generic,
    MsSql,
    Postgres,
    SQLite,
}

impl Dialect {
    pub fn handler(&self) -> Box<dyn DialectHandler> {
        match self {
            Dialect::MsSql => Box::new(MsSqlDialect),
            Dialect::SQLite => Box::new(SQLiteDialect),
            Dialect::Postgres => Box::new(PostgresDialect),
            Dialect::Generic => Box::new(GenericDialect),
        }
    }
}

#[derive(Debug)]
pub struct GenericDialect;
#[derive(Debug)]
pub struct MsSqlDialect;
#[derive(Debug)]
pub struct PostgresDialect;
#[derive(Debug)]
pub struct SQLiteDialect;

/// How limit and offset are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pagination {
    /// `SELECT TOP(n)` without an offset, `OFFSET .. FETCH NEXT` with one.
    Top,
    /// `OFFSET n ROWS FETCH NEXT m ROWS ONLY`, `FETCH FIRST m ROWS ONLY`.
    Fetch,
    /// `LIMIT m OFFSET n`.
    LimitOffset,
}

pub trait DialectHandler: Any + Debug + Send + Sync {
    fn pagination(&self) -> Pagination {
        Pagination::Fetch
    }

    /// Opening and closing identifier quote.
    fn ident_quote(&self) -> (char, char) {
        ('"', '"')
    }

    fn parameter_prefix(&self) -> char {
        '@'
    }

    /// Whether conditions can be used as values and boolean values as
    /// conditions, without coercion.
    fn supports_boolean_values(&self) -> bool {
        true
    }

    fn concat_operator(&self) -> &'static str {
        "||"
    }

    /// Function counting rows into a 64-bit integer.
    fn long_count_function(&self) -> &'static str {
        "COUNT"
    }

    /// Limit that stands for "all rows", for dialects which cannot express an
    /// offset without a limit.
    fn limit_all(&self) -> Option<&'static str> {
        None
    }
}

impl dyn DialectHandler {
    #[inline]
    pub fn is<T: DialectHandler + 'static>(&self) -> bool {
        TypeId::of::<T>() == self.type_id()
    }
}

impl DialectHandler for GenericDialect {}

impl DialectHandler for MsSqlDialect {
    fn pagination(&self) -> Pagination {
        Pagination::Top
    }

    fn ident_quote(&self) -> (char, char) {
        ('[', ']')
    }

    fn supports_boolean_values(&self) -> bool {
        false
    }

    fn concat_operator(&self) -> &'static str {
        "+"
    }

    fn long_count_function(&self) -> &'static str {
        "COUNT_BIG"
    }
}

impl DialectHandler for PostgresDialect {
    fn pagination(&self) -> Pagination {
        Pagination::LimitOffset
    }
}

impl DialectHandler for SQLiteDialect {
    fn pagination(&self) -> Pagination {
        Pagination::LimitOffset
    }

    fn supports_boolean_values(&self) -> bool {
        false
    }

    // https://www.sqlite.org/lang_select.html#the_limit_clause
    fn limit_all(&self) -> Option<&'static str> {
        Some("-1")
    }
}
