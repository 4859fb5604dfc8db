//! Type mappings: how values of a semantic type are stored and written as
//! SQL literals.
//!
//! The catalog is consulted through [TypeMappingSource]. [DialectTypeMappings]
//! is the default catalog for each [Dialect].

use std::fmt::Debug;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use pipesql_ast::{Literal, TyKind};
use serde::Serialize;

use crate::sql::Dialect;
use crate::{Error, Result};

/// Mapping of a semantic type onto a store type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TypeMapping {
    /// Name of the type in the database, as used in `CAST`.
    pub store_type: String,
    /// Semantic type this mapping was found for.
    pub kind: TyKind,
    pub literal: LiteralStyle,
    /// Length of the store type, if it has one (`nvarchar(50)`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
}

/// How values are written as literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LiteralStyle {
    Number,
    Text {
        /// Prefix string literals with `N`.
        national: bool,
    },
    /// `CAST(1 AS bit)`
    BitCast,
    /// `1` and `0`
    BitInteger,
    /// `TRUE` and `FALSE`
    BoolKeyword,
    Date(&'static str),
    DateTime(&'static str),
    /// `0x0102`
    HexBytes,
    /// `X'0102'`
    QuotedHexBytes,
    /// `'\x0102'`
    EscapedHexBytes,
    /// No literal form, values must be bound as parameters.
    Unsupported,
}

impl TypeMapping {
    pub fn new<S: ToString>(store_type: S, kind: TyKind, literal: LiteralStyle) -> Self {
        TypeMapping {
            store_type: store_type.to_string(),
            kind,
            literal,
            size: None,
        }
    }

    /// Replaces the store type, picking up its length (`varchar(10)`).
    pub fn with_store_type(mut self, store_type: &str) -> Self {
        self.size = parse_size(store_type);
        self.store_type = store_type.to_string();
        self
    }

    /// Renders a value as a SQL literal of this type.
    pub fn generate_sql_literal(&self, value: &Literal) -> Result<String> {
        if value.is_null() {
            return Ok("NULL".to_string());
        }

        Ok(match (self.literal, value) {
            (LiteralStyle::Number, Literal::Integer(i)) => i.to_string(),
            (LiteralStyle::Number, Literal::Float(f)) if f.is_finite() => format!("{f:?}"),
            (LiteralStyle::Number, Literal::Decimal(d)) => d.clone(),
            (LiteralStyle::Number, Literal::Boolean(b)) => (*b as u8).to_string(),

            (LiteralStyle::Text { national }, Literal::Text(s)) => quote_text(s, national),
            (LiteralStyle::Text { national }, Literal::Char(c)) => {
                quote_text(&c.to_string(), national)
            }

            (LiteralStyle::BitCast, Literal::Boolean(b)) => format!("CAST({} AS bit)", *b as u8),
            (LiteralStyle::BitInteger, Literal::Boolean(b)) => (*b as u8).to_string(),
            (LiteralStyle::BoolKeyword, Literal::Boolean(b)) => {
                (if *b { "TRUE" } else { "FALSE" }).to_string()
            }

            (LiteralStyle::Date(format), Literal::Date(d)) => format!("'{}'", d.format(format)),
            (LiteralStyle::DateTime(format), Literal::DateTime(d)) => {
                format!("'{}'", d.format(format))
            }
            (LiteralStyle::DateTime(format), Literal::Date(d)) => {
                format!("'{}'", midnight(d).format(format))
            }

            (LiteralStyle::HexBytes, Literal::Bytes(b)) => format!("0x{}", hex(b)),
            (LiteralStyle::QuotedHexBytes, Literal::Bytes(b)) => format!("X'{}'", hex(b)),
            (LiteralStyle::EscapedHexBytes, Literal::Bytes(b)) => format!("'\\x{}'", hex(b)),

            (_, value) => {
                return Err(Error::new_simple(format!(
                    "cannot write {value} as a literal of type {}",
                    self.store_type
                )))
            }
        })
    }
}

fn quote_text(text: &str, national: bool) -> String {
    let prefix = if national { "N" } else { "" };
    format!("{prefix}'{}'", text.replace('\'', "''"))
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}

fn midnight(date: &NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::default())
}

fn parse_size(store_type: &str) -> Option<u32> {
    let (_, rest) = store_type.split_once('(')?;
    let (size, _) = rest.split_once(')')?;
    size.trim().parse().ok()
}

/// Catalog of type mappings.
pub trait TypeMappingSource: Debug + Send + Sync {
    /// Default mapping for a semantic type. Structural types have none.
    fn find_mapping(&self, kind: &TyKind) -> Option<TypeMapping>;
}

/// The built-in type catalog of a dialect.
#[derive(Debug, Clone, Copy)]
pub struct DialectTypeMappings {
    pub dialect: Dialect,
}

impl DialectTypeMappings {
    pub fn new(dialect: Dialect) -> Self {
        DialectTypeMappings { dialect }
    }
}

impl TypeMappingSource for DialectTypeMappings {
    fn find_mapping(&self, kind: &TyKind) -> Option<TypeMapping> {
        use LiteralStyle as L;

        let (store_type, literal) = match self.dialect {
            Dialect::MsSql => match kind {
                TyKind::Bool => ("bit", L::BitCast),
                TyKind::Int16 => ("smallint", L::Number),
                TyKind::Int32 => ("int", L::Number),
                TyKind::Int64 => ("bigint", L::Number),
                TyKind::Float32 => ("real", L::Number),
                TyKind::Float64 => ("float", L::Number),
                TyKind::Decimal => ("decimal(18,2)", L::Number),
                TyKind::Text => ("nvarchar(max)", L::Text { national: true }),
                TyKind::Char => ("nchar(1)", L::Text { national: true }),
                TyKind::Date => ("date", L::Date("%Y-%m-%d")),
                TyKind::DateTime => ("datetime2", L::DateTime("%Y-%m-%dT%H:%M:%S%.3f")),
                TyKind::Bytes => ("varbinary(max)", L::HexBytes),
                TyKind::Geometry
                | TyKind::Point
                | TyKind::LineString
                | TyKind::GeometryCollection => {
                    ("geometry", L::Unsupported)
                }
                TyKind::Entity(_) | TyKind::Anonymous => return None,
            },
            Dialect::SQLite => match kind {
                TyKind::Bool => ("INTEGER", L::BitInteger),
                TyKind::Int16 | TyKind::Int32 | TyKind::Int64 => ("INTEGER", L::Number),
                TyKind::Float32 | TyKind::Float64 => ("REAL", L::Number),
                TyKind::Decimal => ("TEXT", L::Number),
                TyKind::Text | TyKind::Char => ("TEXT", L::Text { national: false }),
                TyKind::Date => ("TEXT", L::Date("%Y-%m-%d")),
                TyKind::DateTime => ("TEXT", L::DateTime("%Y-%m-%d %H:%M:%S%.f")),
                TyKind::Bytes => ("BLOB", L::QuotedHexBytes),
                TyKind::Geometry => ("GEOMETRY", L::Unsupported),
                TyKind::Point => ("POINT", L::Unsupported),
                TyKind::LineString => ("LINESTRING", L::Unsupported),
                TyKind::GeometryCollection => ("GEOMETRYCOLLECTION", L::Unsupported),
                TyKind::Entity(_) | TyKind::Anonymous => return None,
            },
            Dialect::Postgres => match kind {
                TyKind::Bool => ("boolean", L::BoolKeyword),
                TyKind::Int16 => ("smallint", L::Number),
                TyKind::Int32 => ("integer", L::Number),
                TyKind::Int64 => ("bigint", L::Number),
                TyKind::Float32 => ("real", L::Number),
                TyKind::Float64 => ("double precision", L::Number),
                TyKind::Decimal => ("numeric", L::Number),
                TyKind::Text => ("text", L::Text { national: false }),
                TyKind::Char => ("character(1)", L::Text { national: false }),
                TyKind::Date => ("date", L::Date("%Y-%m-%d")),
                TyKind::DateTime => ("timestamp", L::DateTime("%Y-%m-%d %H:%M:%S%.f")),
                TyKind::Bytes => ("bytea", L::EscapedHexBytes),
                TyKind::Geometry
                | TyKind::Point
                | TyKind::LineString
                | TyKind::GeometryCollection => {
                    ("geometry", L::Unsupported)
                }
                TyKind::Entity(_) | TyKind::Anonymous => return None,
            },
            Dialect::Generic => match kind {
                TyKind::Bool => ("BOOLEAN", L::BoolKeyword),
                TyKind::Int16 => ("SMALLINT", L::Number),
                TyKind::Int32 => ("INTEGER", L::Number),
                TyKind::Int64 => ("BIGINT", L::Number),
                TyKind::Float32 => ("REAL", L::Number),
                TyKind::Float64 => ("DOUBLE PRECISION", L::Number),
                TyKind::Decimal => ("DECIMAL", L::Number),
                TyKind::Text => ("VARCHAR", L::Text { national: false }),
                TyKind::Char => ("CHAR(1)", L::Text { national: false }),
                TyKind::Date => ("DATE", L::Date("%Y-%m-%d")),
                TyKind::DateTime => ("TIMESTAMP", L::DateTime("%Y-%m-%d %H:%M:%S%.f")),
                TyKind::Bytes => ("VARBINARY", L::QuotedHexBytes),
                TyKind::Geometry
                | TyKind::Point
                | TyKind::LineString
                | TyKind::GeometryCollection => {
                    ("GEOMETRY", L::Unsupported)
                }
                TyKind::Entity(_) | TyKind::Anonymous => return None,
            },
        };

        Some(TypeMapping::new(store_type, kind.clone(), literal).with_store_type(store_type))
    }
}
