//! Intermediate Representations of a translated pipeline
//!
pub mod select;
pub mod sx;
