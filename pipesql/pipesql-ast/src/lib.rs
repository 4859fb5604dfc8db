//! The pipeline language of pipesql.
//!
//! A pipeline ([Query]) starts at an entity and applies a chain of
//! [Operator]s, whose arguments are [Lambda]s over source [Expr]essions.
//! This crate only describes pipelines; compiling them to SQL is the job of
//! the `pipesql` crate.

mod error;
mod expr;
pub mod fold;
mod ident;
mod literal;
mod member;
mod pipeline;
mod types;

pub use error::{codes, Error, Errors, MessageKind, Reason, WithErrorInfo};
pub use expr::{lambda, BinOp, Expr, Lambda, NewMember, UnOp};
pub use ident::Ident;
pub use literal::Literal;
pub use member::ProjectionMember;
pub use pipeline::{Operator, Query};
pub use types::{Ty, TyKind};

pub type Result<T, E = Error> = core::result::Result<T, E>;
