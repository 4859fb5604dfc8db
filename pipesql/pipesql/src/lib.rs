//! Compiler for strongly-typed query pipelines into SQL.
//!
//! A pipeline ([Query]) names an entity of a [Model] and applies operators
//! such as `Where`, `Select`, `OrderBy`, `Take` or `Count` to it. The
//! compiler turns it into a single SQL statement plus a shaper, which
//! describes how to build results out of the rows of that statement.
//!
//! Compilation runs in stages:
//! - [translate] dispatches each operator onto a `SELECT` under
//!   construction, translating lambda bodies into SQL expressions with the
//!   [functions] of the dialect.
//! - The select is frozen, together with its shaper, into a
//!   [ShapedQuery](translate::ShapedQuery).
//! - [sql] renders the frozen select for the target [Dialect](sql::Dialect).
//!
//! # Example
//!
//! ```
//! use pipesql::{compile, lambda, Expr, Options, Query, Ty};
//! use pipesql::model::{EntityType, Model};
//!
//! let model = Model::new().with_entity(
//!     EntityType::new("Person")
//!         .property("Name", Ty::text())
//!         .property("Age", Ty::int32()),
//! );
//! let query = Query::from("Person")
//!     .filter(lambda("x", |x| x.member("Age").gte(Expr::lit(18))))
//!     .order_by(lambda("x", |x| x.member("Name")));
//!
//! let opts = Options::default().no_format().no_signature();
//! let command = compile(&query, &model, &opts).unwrap();
//! assert_eq!(
//!     command.sql,
//!     "SELECT p.Name, p.Age\nFROM Person AS p\nWHERE p.Age >= 18\nORDER BY p.Name"
//! );
//! ```

pub mod debug;
mod error_message;
pub mod functions;
pub mod ir;
pub mod model;
pub mod shaper;
pub mod sql;
pub mod translate;
pub mod types;
mod utils;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use error_message::{ErrorMessage, ErrorMessages};
pub use pipesql_ast::{
    codes, lambda, BinOp, Error, Errors, Expr, Ident, Lambda, Literal, MessageKind, NewMember,
    Operator, ProjectionMember, Query, Reason, Ty, TyKind, UnOp, WithErrorInfo,
};
pub use shaper::{QueryResult, Value};
pub use sql::{Command, CommandParameter, Dialect, Quoting};
pub use translate::{ResultCardinality, ShapedQuery};

use functions::{FunctionRegistry, FunctionTranslator};
use model::Model;
use translate::{QueryTranslator, SqlExprFactory};
use types::DialectTypeMappings;

pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Version of the compiler, as written into the signature comment.
pub fn compiler_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Compile a pipeline over a model into a SQL command.
///
/// This is a shorthand for [Compiler::compile] with the built-in functions
/// of the dialect.
pub fn compile(query: &Query, model: &Model, options: &Options) -> Result<Command, ErrorMessages> {
    Compiler::new(model, options.clone()).compile(query)
}

/// Compilation options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Options {
    /// Pass generated SQL string through a formatter that splits it
    /// into multiple lines and prettifies indentation and spacing.
    ///
    /// Defaults to true.
    pub format: bool,

    /// Target dialect. Defaults to [Dialect::Generic].
    pub dialect: Dialect,

    /// Emits the compiler signature as a comment after generated SQL
    ///
    /// Defaults to true.
    pub signature_comment: bool,

    /// Which identifiers are quoted. Defaults to [Quoting::WhenNeeded].
    pub quoting: Quoting,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            format: true,
            dialect: Dialect::Generic,
            signature_comment: true,
            quoting: Quoting::WhenNeeded,
        }
    }
}

impl Options {
    pub fn with_format(mut self, format: bool) -> Self {
        self.format = format;
        self
    }

    pub fn no_format(self) -> Self {
        self.with_format(false)
    }

    pub fn with_signature_comment(mut self, signature_comment: bool) -> Self {
        self.signature_comment = signature_comment;
        self
    }

    pub fn no_signature(self) -> Self {
        self.with_signature_comment(false)
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn with_quoting(mut self, quoting: Quoting) -> Self {
        self.quoting = quoting;
        self
    }
}

/// Compiles pipelines over one model.
///
/// A compiler is immutable once built and can be shared between threads.
#[derive(Debug, Clone)]
pub struct Compiler<'a> {
    model: &'a Model,
    options: Options,
    functions: FunctionRegistry,
    factory: SqlExprFactory,
}

impl<'a> Compiler<'a> {
    pub fn new(model: &'a Model, options: Options) -> Self {
        let functions = FunctionRegistry::for_dialect(options.dialect);
        let factory = SqlExprFactory::new(Arc::new(DialectTypeMappings::new(options.dialect)));
        Compiler {
            model,
            options,
            functions,
            factory,
        }
    }

    /// Adds a function translator, tried before the built-in ones.
    pub fn with_function(mut self, translator: Arc<dyn FunctionTranslator>) -> Self {
        self.functions.register(translator);
        self
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Translate and render a pipeline.
    pub fn compile(&self, query: &Query) -> Result<Command, ErrorMessages> {
        let shaped = self.translate(query)?;
        self.generate(&shaped)
    }

    /// Translate a pipeline into a shaped query, without rendering it.
    pub fn translate(&self, query: &Query) -> Result<ShapedQuery, ErrorMessages> {
        debug::log_stage(debug::Stage::Translate);
        debug::log_entry(|| debug::DebugEntryKind::ReprQuery(query.clone()));

        let dialect = self.options.dialect.handler();
        let translator =
            QueryTranslator::new(self.model, &self.factory, &self.functions, dialect.as_ref());
        let shaped = translator.translate(query)?;

        debug::log_stage(debug::Stage::Finalize);
        debug::log_entry(|| debug::DebugEntryKind::ReprShaped(shaped.clone()));
        Ok(shaped)
    }

    /// Render the select of a shaped query.
    pub fn generate(&self, shaped: &ShapedQuery) -> Result<Command, ErrorMessages> {
        Ok(sql::compile(&shaped.select, &self.options)?)
    }
}

/// JSON serialization and deserialization functions
pub mod json {
    use super::*;

    /// JSON deserialization
    pub fn to_query(json: &str) -> Result<Query, ErrorMessages> {
        serde_json::from_str(json).map_err(convert_json_err)
    }

    /// JSON serialization
    pub fn from_query(query: &Query) -> Result<String, ErrorMessages> {
        serde_json::to_string(query).map_err(convert_json_err)
    }

    /// JSON deserialization
    pub fn to_model(json: &str) -> Result<Model, ErrorMessages> {
        serde_json::from_str(json).map_err(convert_json_err)
    }

    /// JSON serialization
    pub fn from_shaped(shaped: &ShapedQuery) -> Result<String, ErrorMessages> {
        serde_json::to_string(shaped).map_err(convert_json_err)
    }

    /// JSON serialization
    pub fn from_command(command: &Command) -> Result<String, ErrorMessages> {
        serde_json::to_string(command).map_err(convert_json_err)
    }

    fn convert_json_err(err: serde_json::Error) -> ErrorMessages {
        ErrorMessages::from(Error::new_simple(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;

    use super::*;
    use crate::model::EntityType;

    fn model() -> Model {
        Model::new().with_entity(
            EntityType::new("Person")
                .property("Name", Ty::text())
                .property("Age", Ty::int32()),
        )
    }

    #[test]
    fn test_options() {
        let opts = Options::default()
            .no_format()
            .no_signature()
            .with_dialect(Dialect::SQLite)
            .with_quoting(Quoting::Always);
        assert!(!opts.format);
        assert!(!opts.signature_comment);
        assert_eq!(opts.dialect, Dialect::SQLite);
        assert_eq!(opts.quoting, Quoting::Always);
    }

    #[test]
    fn test_json_roundtrip() {
        let query = Query::from("Person").take(Expr::lit(3));
        let json = json::from_query(&query).unwrap();
        assert_eq!(json::to_query(&json).unwrap(), query);

        let err = json::to_model("{").unwrap_err();
        assert!(err.to_string().starts_with("Error: EOF"));
    }

    #[test]
    fn test_debug_log() {
        let model = model();
        let opts = Options::default().no_format().no_signature();

        debug::log_start();
        compile(&Query::from("Person"), &model, &opts).unwrap();
        let log = debug::log_finish().unwrap();

        let kinds: Vec<_> = log.entries.iter().map(|e| e.kind.as_ref()).collect();
        assert_eq!(kinds, ["ReprQuery", "ReprShaped", "ReprSql"]);
    }

    #[test]
    fn test_error_messages() {
        let err = compile(&Query::from("Planet"), &model(), &Options::default()).unwrap_err();
        assert_snapshot!(err, @"Error: entity `Planet` not found");
    }
}
