use serde::Serialize;

use crate::types::TypeMapping;

/// Generated SQL with the parameters it references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Command {
    pub sql: String,
    /// In order of first reference.
    pub parameters: Vec<CommandParameter>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandParameter {
    pub name: String,
    /// Token standing for the parameter in the SQL, i.e. `@p0`.
    pub placeholder: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_mapping: Option<TypeMapping>,
    pub nullable: bool,
}

const INDENT: &str = "    ";

/// Accumulates SQL text line by line, indenting each line on the first write.
#[derive(Debug, Default)]
pub(super) struct CommandBuilder {
    text: String,
    indent: usize,
    line_start: bool,
    parameters: Vec<CommandParameter>,
}

impl CommandBuilder {
    pub fn append(&mut self, text: &str) -> &mut Self {
        if text.is_empty() {
            return self;
        }
        if self.line_start {
            for _ in 0..self.indent {
                self.text.push_str(INDENT);
            }
            self.line_start = false;
        }
        self.text.push_str(text);
        self
    }

    pub fn append_line(&mut self) -> &mut Self {
        self.text.push('\n');
        self.line_start = true;
        self
    }

    pub fn increment_indent(&mut self) {
        self.indent += 1;
    }

    pub fn decrement_indent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    /// Registers a parameter, unless one with the same name already is.
    pub fn add_parameter(&mut self, parameter: CommandParameter) {
        if self.parameters.iter().any(|p| p.name == parameter.name) {
            return;
        }
        self.parameters.push(parameter);
    }

    pub fn build(self) -> Command {
        Command {
            sql: self.text,
            parameters: self.parameters,
        }
    }
}

#[cfg(test)]
mod test {
    use insta::assert_snapshot;

    use super::*;

    #[test]
    fn indentation() {
        let mut builder = CommandBuilder::default();
        builder.append("SELECT (").append_line();
        builder.increment_indent();
        builder.append("SELECT 1").append_line();
        builder.append("FROM t");
        builder.decrement_indent();
        builder.append_line().append(")");

        assert_snapshot!(builder.build().sql, @r"
        SELECT (
            SELECT 1
            FROM t
        )
        ");
    }

    #[test]
    fn parameters_registered_once() {
        let mut builder = CommandBuilder::default();
        for _ in 0..2 {
            builder.add_parameter(CommandParameter {
                name: "p0".into(),
                placeholder: "@p0".into(),
                type_mapping: None,
                nullable: false,
            });
        }
        assert_eq!(builder.build().parameters.len(), 1);
    }
}
