//! Scalar SQL AST
//!
//! Typed expression tree for the values and conditions inside one `SELECT`.

mod expr;
mod fold;

pub use expr::{CaseWhen, SqlBinOp, SqlExpr, SqlExprKind};
pub use fold::*;
