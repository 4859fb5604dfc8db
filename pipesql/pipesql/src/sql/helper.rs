use serde::{Deserialize, Serialize};

use super::keywords;
use super::DialectHandler;
use crate::utils::valid_ident;

/// When identifiers are wrapped in quotes.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub enum Quoting {
    /// Only identifiers which are keywords or contain special characters.
    #[default]
    WhenNeeded,
    Always,
}

/// Identifier quoting and parameter naming of a dialect.
#[derive(Debug)]
pub struct SqlGenerationHelper<'a> {
    dialect: &'a dyn DialectHandler,
    quoting: Quoting,
}

impl<'a> SqlGenerationHelper<'a> {
    pub fn new(dialect: &'a dyn DialectHandler, quoting: Quoting) -> Self {
        SqlGenerationHelper { dialect, quoting }
    }

    pub fn delimit_identifier(&self, ident: &str) -> String {
        let is_bare = valid_ident().is_match(ident) && !keywords::is_keyword(ident);
        if self.quoting == Quoting::WhenNeeded && is_bare {
            return ident.to_string();
        }

        let (open, close) = self.dialect.ident_quote();
        let escaped = ident.replace(close, &format!("{close}{close}"));
        format!("{open}{escaped}{close}")
    }

    /// `schema.name`, each part delimited separately.
    pub fn delimit_qualified(&self, name: &str, schema: Option<&str>) -> String {
        match schema {
            Some(schema) => format!(
                "{}.{}",
                self.delimit_identifier(schema),
                self.delimit_identifier(name)
            ),
            None => self.delimit_identifier(name),
        }
    }

    pub fn parameter_placeholder(&self, name: &str) -> String {
        format!("{}{name}", self.dialect.parameter_prefix())
    }
}

#[cfg(test)]
mod test {
    use insta::assert_snapshot;

    use super::*;
    use crate::sql::Dialect;

    #[test]
    fn quoting() {
        let mssql = Dialect::MsSql.handler();
        let helper = SqlGenerationHelper::new(mssql.as_ref(), Quoting::WhenNeeded);
        assert_snapshot!(helper.delimit_identifier("Person"), @"Person");
        assert_snapshot!(helper.delimit_identifier("Order"), @"[Order]");
        assert_snapshot!(helper.delimit_identifier("Order Details"), @"[Order Details]");
        assert_snapshot!(helper.delimit_identifier("a]b"), @"[a]]b]");
        assert_snapshot!(helper.delimit_qualified("Person", Some("dbo")), @"dbo.Person");
        assert_snapshot!(helper.parameter_placeholder("p0"), @"@p0");

        let sqlite = Dialect::SQLite.handler();
        let helper = SqlGenerationHelper::new(sqlite.as_ref(), Quoting::Always);
        assert_snapshot!(helper.delimit_identifier("Person"), @r#""Person""#);
        assert_snapshot!(helper.delimit_identifier(r#"a"b"#), @r#""a""b""#);
    }
}
