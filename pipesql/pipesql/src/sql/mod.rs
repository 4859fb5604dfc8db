//! Backend for rendering a translated select into SQL text.

mod command;
mod dialect;
mod gen_query;
mod helper;
mod keywords;

use sqlformat::{format, FormatOptions, QueryParams};

pub use command::{Command, CommandParameter};
pub use dialect::{
    Dialect, DialectHandler, GenericDialect, MsSqlDialect, Pagination, PostgresDialect,
    SQLiteDialect,
};
pub use helper::{Quoting, SqlGenerationHelper};

use crate::debug;
use crate::ir::select::SelectExpr;
use crate::{Options, Result};

/// Renders a select for the dialect of the options.
pub(crate) fn compile(select: &SelectExpr, options: &Options) -> Result<Command> {
    debug::log_stage(debug::Stage::Generate);

    let dialect = options.dialect.handler();
    let helper = SqlGenerationHelper::new(dialect.as_ref(), options.quoting);
    let mut command = gen_query::QuerySqlGenerator::new(&helper, dialect.as_ref()).generate(select)?;

    if options.format {
        command.sql = format(&command.sql, &QueryParams::default(), &FormatOptions::default());
    }

    if options.signature_comment {
        command.sql.push_str("\n\n");
        command.sql.push_str(&signature());
        command.sql.push('\n');
    }

    debug::log_entry(|| debug::DebugEntryKind::ReprSql(command.sql.clone()));
    Ok(command)
}

fn signature() -> String {
    format!("-- Generated by pipesql {}", crate::compiler_version())
}
