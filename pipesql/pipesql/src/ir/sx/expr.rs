use std::sync::Arc;

use enum_as_inner::EnumAsInner;
use pipesql_ast::{BinOp, Literal, Ty, TyKind};
use serde::Serialize;
use strum::AsRefStr;

use crate::ir::select::SelectExpr;
use crate::types::TypeMapping;

/// A typed node of the scalar SQL expression tree.
///
/// Nodes are immutable and shared behind [Arc]. Besides its kind, every node
/// tracks whether it is a boolean condition and whether it is currently
/// placed where SQL expects a value. Conditions in value position and
/// boolean values in condition position are coerced when rendered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SqlExpr {
    pub kind: SqlExprKind,
    pub ty: Ty,
    /// Resolved store type. Constants and parameters don't have one until
    /// it is inferred from their surroundings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_mapping: Option<TypeMapping>,
    pub is_condition: bool,
    pub as_value: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, AsRefStr, EnumAsInner)]
pub enum SqlExprKind {
    /// A column of a table source, qualified by the source's alias.
    Column {
        table: String,
        name: String,
    },
    Constant(Literal),
    /// A named value, bound at execution.
    Parameter(String),
    Binary {
        op: SqlBinOp,
        left: Arc<SqlExpr>,
        right: Arc<SqlExpr>,
    },
    Not(Arc<SqlExpr>),
    Negate(Arc<SqlExpr>),
    IsNull {
        operand: Arc<SqlExpr>,
        negated: bool,
    },
    Function {
        name: String,
        schema: Option<String>,
        instance: Option<Arc<SqlExpr>>,
        args: Vec<Arc<SqlExpr>>,
    },
    Case {
        whens: Vec<CaseWhen>,
        else_result: Option<Arc<SqlExpr>>,
    },
    Exists {
        subquery: Arc<SelectExpr>,
        negated: bool,
    },
    Like {
        match_expr: Arc<SqlExpr>,
        pattern: Arc<SqlExpr>,
        escape: Option<Arc<SqlExpr>>,
    },
    /// Cast to the store type of the node's type mapping.
    Cast(Arc<SqlExpr>),
    /// Opaque SQL text.
    Fragment(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CaseWhen {
    pub test: Arc<SqlExpr>,
    pub result: Arc<SqlExpr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, AsRefStr)]
pub enum SqlBinOp {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    AndAlso,
    OrElse,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    BitwiseAnd,
    BitwiseOr,
    Coalesce,
}

impl SqlBinOp {
    /// Maps an operator of the pipeline language onto its SQL counterpart.
    /// Operators without one return `None`.
    pub fn from_bin_op(op: BinOp) -> Option<Self> {
        Some(match op {
            BinOp::Eq => SqlBinOp::Equal,
            BinOp::Ne => SqlBinOp::NotEqual,
            BinOp::Gt => SqlBinOp::GreaterThan,
            BinOp::Gte => SqlBinOp::GreaterThanOrEqual,
            BinOp::Lt => SqlBinOp::LessThan,
            BinOp::Lte => SqlBinOp::LessThanOrEqual,
            BinOp::And => SqlBinOp::AndAlso,
            BinOp::Or => SqlBinOp::OrElse,
            BinOp::Add => SqlBinOp::Add,
            BinOp::Sub => SqlBinOp::Subtract,
            BinOp::Mul => SqlBinOp::Multiply,
            BinOp::Div => SqlBinOp::Divide,
            BinOp::Mod => SqlBinOp::Modulo,
            BinOp::BitAnd => SqlBinOp::BitwiseAnd,
            BinOp::BitOr => SqlBinOp::BitwiseOr,
            BinOp::Coalesce => SqlBinOp::Coalesce,
            BinOp::Xor | BinOp::Pow | BinOp::Shl | BinOp::Shr => return None,
        })
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            SqlBinOp::Equal
                | SqlBinOp::NotEqual
                | SqlBinOp::GreaterThan
                | SqlBinOp::GreaterThanOrEqual
                | SqlBinOp::LessThan
                | SqlBinOp::LessThanOrEqual
        )
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, SqlBinOp::AndAlso | SqlBinOp::OrElse)
    }

    /// Token written between operands. Coalesce renders as a function.
    pub fn token(&self) -> &'static str {
        match self {
            SqlBinOp::Equal => " = ",
            SqlBinOp::NotEqual => " <> ",
            SqlBinOp::GreaterThan => " > ",
            SqlBinOp::GreaterThanOrEqual => " >= ",
            SqlBinOp::LessThan => " < ",
            SqlBinOp::LessThanOrEqual => " <= ",
            SqlBinOp::AndAlso => " AND ",
            SqlBinOp::OrElse => " OR ",
            SqlBinOp::Add => " + ",
            SqlBinOp::Subtract => " - ",
            SqlBinOp::Multiply => " * ",
            SqlBinOp::Divide => " / ",
            SqlBinOp::Modulo => " % ",
            SqlBinOp::BitwiseAnd => " & ",
            SqlBinOp::BitwiseOr => " | ",
            SqlBinOp::Coalesce => ", ",
        }
    }
}

impl SqlExpr {
    /// Creates a node in its natural context: conditions as conditions,
    /// everything else as a value.
    pub fn new(kind: SqlExprKind, ty: Ty, type_mapping: Option<TypeMapping>) -> Self {
        let is_condition = match &kind {
            SqlExprKind::Binary { op, .. } => op.is_comparison() || op.is_logical(),
            SqlExprKind::Not(_)
            | SqlExprKind::IsNull { .. }
            | SqlExprKind::Exists { .. }
            | SqlExprKind::Like { .. } => true,
            _ => false,
        };
        SqlExpr {
            kind,
            ty,
            type_mapping,
            is_condition,
            as_value: !is_condition,
        }
    }

    pub fn column<T: ToString, N: ToString>(
        table: T,
        name: N,
        ty: Ty,
        type_mapping: Option<TypeMapping>,
    ) -> Self {
        let kind = SqlExprKind::Column {
            table: table.to_string(),
            name: name.to_string(),
        };
        SqlExpr::new(kind, ty, type_mapping)
    }

    /// Builds a binary node, moving its operands into the context the
    /// operator expects: logical operators take conditions, all others take
    /// values.
    pub fn binary(
        op: SqlBinOp,
        left: Arc<SqlExpr>,
        right: Arc<SqlExpr>,
        ty: Ty,
        type_mapping: Option<TypeMapping>,
    ) -> Self {
        let operands_as_value = !op.is_logical();
        let kind = SqlExprKind::Binary {
            op,
            left: left.to_value(operands_as_value),
            right: right.to_value(operands_as_value),
        };
        SqlExpr::new(kind, ty, type_mapping)
    }

    /// Conjunction of two conditions.
    pub fn and(left: Arc<SqlExpr>, right: Arc<SqlExpr>) -> Self {
        let type_mapping = left.type_mapping.clone().or(right.type_mapping.clone());
        SqlExpr::binary(SqlBinOp::AndAlso, left, right, Ty::bool(), type_mapping)
    }

    /// True for a constant `true` literal.
    pub fn is_true_constant(&self) -> bool {
        matches!(self.kind, SqlExprKind::Constant(Literal::Boolean(true)))
    }

    pub fn is_bool(&self) -> bool {
        self.ty.kind == TyKind::Bool
    }

    /// Moves the node into value (`true`) or condition (`false`) context.
    /// Returns the same node when it is already there.
    pub fn to_value(self: &Arc<Self>, as_value: bool) -> Arc<Self> {
        if self.as_value == as_value {
            return Arc::clone(self);
        }
        let mut expr = SqlExpr::clone(self);
        expr.as_value = as_value;
        Arc::new(expr)
    }

    /// Marks a node as a condition, for functions which are predicates.
    pub fn into_condition(mut self) -> Self {
        self.is_condition = true;
        self.as_value = false;
        self
    }

    /// Same node attributes, different kind.
    pub fn with_kind(&self, kind: SqlExprKind) -> Self {
        SqlExpr {
            kind,
            ty: self.ty.clone(),
            type_mapping: self.type_mapping.clone(),
            is_condition: self.is_condition,
            as_value: self.as_value,
        }
    }

    /// Name under which this expression would be projected from a subquery.
    pub fn preferred_alias(&self) -> Option<&str> {
        match &self.kind {
            SqlExprKind::Column { name, .. } => Some(name),
            _ => None,
        }
    }
}
