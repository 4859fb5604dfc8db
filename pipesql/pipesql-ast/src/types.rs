use enum_as_inner::EnumAsInner;
use serde::{Deserialize, Serialize};
use strum::AsRefStr;

use crate::Literal;

/// Semantic type of a value flowing through a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ty {
    pub kind: TyKind,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub nullable: bool,
}

#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, EnumAsInner,
)]
pub enum TyKind {
    Bool,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Decimal,
    Text,
    Char,
    Date,
    DateTime,
    Bytes,
    /// Any kind of geometry.
    Geometry,
    Point,
    LineString,
    GeometryCollection,
    /// A row of a mapped entity type, by entity name.
    Entity(String),
    /// A structural shape built with a constructor.
    Anonymous,
}

impl TyKind {
    pub fn is_integer(&self) -> bool {
        matches!(self, TyKind::Int16 | TyKind::Int32 | TyKind::Int64)
    }

    pub fn is_float(&self) -> bool {
        matches!(self, TyKind::Float32 | TyKind::Float64)
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float() || matches!(self, TyKind::Decimal)
    }

    pub fn is_structural(&self) -> bool {
        matches!(self, TyKind::Entity(_) | TyKind::Anonymous)
    }

    /// The value a non-nullable slot of this type holds when the database
    /// returns NULL. Reference-like kinds have no default besides NULL.
    pub fn default_value(&self) -> Literal {
        match self {
            TyKind::Bool => Literal::Boolean(false),
            TyKind::Int16 | TyKind::Int32 | TyKind::Int64 => Literal::Integer(0),
            TyKind::Float32 | TyKind::Float64 => Literal::Float(0.0),
            TyKind::Decimal => Literal::Decimal("0".to_string()),
            TyKind::Char => Literal::Char('\0'),
            _ => Literal::Null,
        }
    }
}

impl Ty {
    pub fn new(kind: TyKind) -> Self {
        Ty {
            kind,
            nullable: false,
        }
    }

    pub fn nullable(kind: TyKind) -> Self {
        Ty {
            kind,
            nullable: true,
        }
    }

    pub fn bool() -> Self {
        Ty::new(TyKind::Bool)
    }

    pub fn int32() -> Self {
        Ty::new(TyKind::Int32)
    }

    pub fn int64() -> Self {
        Ty::new(TyKind::Int64)
    }

    pub fn float64() -> Self {
        Ty::new(TyKind::Float64)
    }

    pub fn text() -> Self {
        Ty::new(TyKind::Text)
    }

    pub fn entity<S: ToString>(name: S) -> Self {
        Ty::new(TyKind::Entity(name.to_string()))
    }

    pub fn anonymous() -> Self {
        Ty::new(TyKind::Anonymous)
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Default value of this type, which is NULL for all nullable types.
    pub fn default_value(&self) -> Literal {
        if self.nullable {
            Literal::Null
        } else {
            self.kind.default_value()
        }
    }
}

impl From<TyKind> for Ty {
    fn from(kind: TyKind) -> Self {
        Ty::new(kind)
    }
}

impl std::fmt::Display for Ty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            TyKind::Entity(name) => f.write_str(name)?,
            kind => f.write_str(&kind.as_ref().to_lowercase())?,
        }
        if self.nullable {
            f.write_str("?")?;
        }
        Ok(())
    }
}
