//! Relational algebra node
//!
//! One `SELECT` is assembled with a [SelectBuilder] while pipeline operators
//! are dispatched, and then frozen into a [SelectExpr] by
//! [SelectBuilder::finalize]. Only the frozen form is rendered to SQL or
//! nested into other nodes.

mod builder;

use std::sync::Arc;

use enum_as_inner::EnumAsInner;
use pipesql_ast::ProjectionMember;
use serde::Serialize;

pub use builder::{EntityProjection, ProjectionValue, SelectBuilder};

use super::sx::SqlExpr;

/// A finalized `SELECT`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SelectExpr {
    pub tables: Vec<TableSource>,

    /// Flat list of projected scalars, in slot order.
    pub projection: Vec<ProjectionItem>,

    /// Where each path of the result shape can be read from a row.
    pub projection_mapping: Vec<(ProjectionMember, ProjectionSlot)>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicate: Option<Arc<SqlExpr>>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub orderings: Vec<Ordering>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<Arc<SqlExpr>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<Arc<SqlExpr>>,

    pub is_distinct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, EnumAsInner)]
pub enum TableSource {
    Table {
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        schema: Option<String>,
        alias: String,
    },
    Subquery {
        select: Arc<SelectExpr>,
        alias: String,
    },
}

impl TableSource {
    pub fn alias(&self) -> &str {
        match self {
            TableSource::Table { alias, .. } | TableSource::Subquery { alias, .. } => alias,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ProjectionItem {
    pub expr: Arc<SqlExpr>,

    /// Name of the column, required when the select is used as a subquery.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Ordering {
    pub expr: Arc<SqlExpr>,
    pub ascending: bool,
}

impl Ordering {
    pub fn new(expr: Arc<SqlExpr>, ascending: bool) -> Self {
        Ordering { expr, ascending }
    }
}

/// Position of a projected path in the result row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, EnumAsInner)]
pub enum ProjectionSlot {
    Scalar(usize),
    /// All columns of an entity, by property name.
    Entity(Vec<(String, usize)>),
}

impl SelectExpr {
    /// Slot of a path in the result row.
    pub fn slot(&self, member: &ProjectionMember) -> Option<&ProjectionSlot> {
        self.projection_mapping
            .iter()
            .find(|(m, _)| m == member)
            .map(|(_, slot)| slot)
    }
}
