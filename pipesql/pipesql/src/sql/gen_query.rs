//! Renders a finalized [SelectExpr] into SQL text.
//!
//! The generator walks the algebra node and its scalar nodes once, writing
//! into a [CommandBuilder]. Nested selects (subquery sources and `EXISTS`)
//! are written on their own indented lines.

use pipesql_ast::{Literal, TyKind};

use super::command::{CommandBuilder, CommandParameter};
use super::{DialectHandler, Pagination, SqlGenerationHelper};
use crate::ir::select::{ProjectionItem, SelectExpr, TableSource};
use crate::ir::sx::{SqlBinOp, SqlExpr, SqlExprKind};
use crate::sql::Command;
use crate::{Error, Result};

pub struct QuerySqlGenerator<'a> {
    helper: &'a SqlGenerationHelper<'a>,
    dialect: &'a dyn DialectHandler,
    builder: CommandBuilder,
}

impl<'a> QuerySqlGenerator<'a> {
    pub fn new(helper: &'a SqlGenerationHelper<'a>, dialect: &'a dyn DialectHandler) -> Self {
        QuerySqlGenerator {
            helper,
            dialect,
            builder: CommandBuilder::default(),
        }
    }

    pub fn generate(mut self, select: &SelectExpr) -> Result<Command> {
        self.visit_select(select)?;
        Ok(self.builder.build())
    }

    fn visit_select(&mut self, select: &SelectExpr) -> Result<()> {
        let pagination = self.dialect.pagination();

        self.builder.append("SELECT ");
        if select.is_distinct {
            self.builder.append("DISTINCT ");
        }
        if pagination == Pagination::Top && select.offset.is_none() {
            if let Some(limit) = &select.limit {
                self.builder.append("TOP(");
                self.visit(limit)?;
                self.builder.append(") ");
            }
        }

        if select.projection.is_empty() {
            self.builder.append("1");
        }
        for (i, item) in select.projection.iter().enumerate() {
            if i > 0 {
                self.builder.append(", ");
            }
            self.visit_projection_item(item)?;
        }

        if !select.tables.is_empty() {
            self.builder.append_line().append("FROM ");
            for (i, table) in select.tables.iter().enumerate() {
                if i > 0 {
                    self.builder.append_line();
                }
                self.visit_table(table)?;
            }
        }

        if let Some(predicate) = &select.predicate {
            self.builder.append_line().append("WHERE ");
            self.visit(predicate)?;
        }

        if !select.orderings.is_empty() {
            self.builder.append_line().append("ORDER BY ");
            for (i, ordering) in select.orderings.iter().enumerate() {
                if i > 0 {
                    self.builder.append(", ");
                }
                self.visit(&ordering.expr)?;
                if !ordering.ascending {
                    self.builder.append(" DESC");
                }
            }
        } else if select.offset.is_some() && pagination != Pagination::LimitOffset {
            // OFFSET requires an ORDER BY
            self.builder.append_line().append("ORDER BY (SELECT 1)");
        }

        self.visit_limit_offset(select, pagination)
    }

    fn visit_limit_offset(&mut self, select: &SelectExpr, pagination: Pagination) -> Result<()> {
        match pagination {
            Pagination::Top | Pagination::Fetch => {
                if let Some(offset) = &select.offset {
                    self.builder.append_line().append("OFFSET ");
                    self.visit(offset)?;
                    self.builder.append(" ROWS");
                    if let Some(limit) = &select.limit {
                        self.builder.append(" FETCH NEXT ");
                        self.visit(limit)?;
                        self.builder.append(" ROWS ONLY");
                    }
                } else if let (Pagination::Fetch, Some(limit)) = (pagination, &select.limit) {
                    self.builder.append_line().append("FETCH FIRST ");
                    self.visit(limit)?;
                    self.builder.append(" ROWS ONLY");
                }
            }
            Pagination::LimitOffset => {
                let mut has_limit = true;
                match (&select.limit, &select.offset, self.dialect.limit_all()) {
                    (Some(limit), _, _) => {
                        self.builder.append_line().append("LIMIT ");
                        self.visit(limit)?;
                    }
                    (None, Some(_), Some(all)) => {
                        self.builder.append_line().append("LIMIT ").append(all);
                    }
                    _ => has_limit = false,
                }
                if let Some(offset) = &select.offset {
                    if has_limit {
                        self.builder.append(" ");
                    } else {
                        self.builder.append_line();
                    }
                    self.builder.append("OFFSET ");
                    self.visit(offset)?;
                }
            }
        }
        Ok(())
    }

    fn visit_projection_item(&mut self, item: &ProjectionItem) -> Result<()> {
        self.visit(&item.expr)?;
        if let Some(alias) = &item.alias {
            if item.expr.preferred_alias() != Some(alias.as_str()) {
                let alias = self.helper.delimit_identifier(alias);
                self.builder.append(" AS ").append(&alias);
            }
        }
        Ok(())
    }

    fn visit_table(&mut self, table: &TableSource) -> Result<()> {
        match table {
            TableSource::Table { name, schema, .. } => {
                let name = self.helper.delimit_qualified(name, schema.as_deref());
                self.builder.append(&name);
            }
            TableSource::Subquery { select, .. } => {
                self.builder.append("(").append_line();
                self.builder.increment_indent();
                self.visit_select(select)?;
                self.builder.decrement_indent();
                self.builder.append_line().append(")");
            }
        }
        let alias = self.helper.delimit_identifier(table.alias());
        self.builder.append(" AS ").append(&alias);
        Ok(())
    }

    /// Writes a scalar, coercing between conditions and values when the
    /// dialect has no boolean values.
    fn visit(&mut self, expr: &SqlExpr) -> Result<()> {
        if !self.dialect.supports_boolean_values() {
            if expr.is_condition && expr.as_value {
                return self.visit_condition_as_value(expr);
            }
            if !expr.is_condition && !expr.as_value && expr.is_bool() {
                self.visit_kind(expr)?;
                let true_literal = bool_literal(expr, true)?;
                self.builder.append(" = ").append(&true_literal);
                return Ok(());
            }
        }
        self.visit_kind(expr)
    }

    fn visit_condition_as_value(&mut self, expr: &SqlExpr) -> Result<()> {
        let true_literal = bool_literal(expr, true)?;
        let false_literal = bool_literal(expr, false)?;

        self.builder.append("CASE");
        self.builder.increment_indent();
        self.builder.append_line().append("WHEN ");
        self.visit_kind(expr)?;
        self.builder.append(" THEN ").append(&true_literal);
        self.builder.append_line().append("ELSE ").append(&false_literal);
        self.builder.decrement_indent();
        self.builder.append_line().append("END");
        Ok(())
    }

    fn visit_kind(&mut self, expr: &SqlExpr) -> Result<()> {
        match &expr.kind {
            SqlExprKind::Column { table, name } => {
                let table = self.helper.delimit_identifier(table);
                let name = self.helper.delimit_identifier(name);
                self.builder.append(&table).append(".").append(&name);
            }
            SqlExprKind::Constant(value) => {
                let literal = match (&expr.type_mapping, value) {
                    (_, Literal::Null) => "NULL".to_string(),
                    (Some(mapping), value) => mapping.generate_sql_literal(value)?,
                    (None, value) => {
                        return Err(Error::new_assert(format!(
                            "constant {value} has no type mapping"
                        )))
                    }
                };
                self.builder.append(&literal);
            }
            SqlExprKind::Parameter(name) => {
                let placeholder = self.helper.parameter_placeholder(name);
                self.builder.add_parameter(CommandParameter {
                    name: name.clone(),
                    placeholder: placeholder.clone(),
                    type_mapping: expr.type_mapping.clone(),
                    nullable: expr.ty.nullable,
                });
                self.builder.append(&placeholder);
            }

            SqlExprKind::Binary {
                op: SqlBinOp::Coalesce,
                left,
                right,
            } => {
                self.builder.append("COALESCE(");
                self.visit(left)?;
                self.builder.append(", ");
                self.visit(right)?;
                self.builder.append(")");
            }
            SqlExprKind::Binary { op, left, right } => {
                self.visit_operand(left)?;
                let is_text = matches!(expr.ty.kind, TyKind::Text | TyKind::Char);
                if *op == SqlBinOp::Add && is_text {
                    let concat = format!(" {} ", self.dialect.concat_operator());
                    self.builder.append(&concat);
                } else {
                    self.builder.append(op.token());
                }
                self.visit_operand(right)?;
            }

            SqlExprKind::Not(operand) => {
                self.builder.append("NOT (");
                self.visit(operand)?;
                self.builder.append(")");
            }
            SqlExprKind::Negate(operand) => {
                self.builder.append("-");
                self.visit_operand(operand)?;
            }
            SqlExprKind::IsNull { operand, negated } => {
                self.visit_operand(operand)?;
                self.builder.append(if *negated {
                    " IS NOT NULL"
                } else {
                    " IS NULL"
                });
            }

            SqlExprKind::Function {
                name,
                schema,
                instance,
                args,
            } => {
                if let Some(schema) = schema {
                    let schema = self.helper.delimit_identifier(schema);
                    self.builder.append(&schema).append(".");
                }
                if let Some(instance) = instance {
                    self.visit(instance)?;
                    self.builder.append(".");
                }
                self.builder.append(name).append("(");
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        self.builder.append(", ");
                    }
                    self.visit(arg)?;
                }
                self.builder.append(")");
            }

            SqlExprKind::Case { whens, else_result } => {
                self.builder.append("CASE");
                self.builder.increment_indent();
                for when in whens {
                    self.builder.append_line().append("WHEN ");
                    self.visit(&when.test)?;
                    self.builder.append(" THEN ");
                    self.visit(&when.result)?;
                }
                if let Some(else_result) = else_result {
                    self.builder.append_line().append("ELSE ");
                    self.visit(else_result)?;
                }
                self.builder.decrement_indent();
                self.builder.append_line().append("END");
            }

            SqlExprKind::Exists { subquery, negated } => {
                if *negated {
                    self.builder.append("NOT ");
                }
                self.builder.append("EXISTS (").append_line();
                self.builder.increment_indent();
                self.visit_select(subquery)?;
                self.builder.decrement_indent();
                self.builder.append_line().append(")");
            }

            SqlExprKind::Like {
                match_expr,
                pattern,
                escape,
            } => {
                self.visit(match_expr)?;
                self.builder.append(" LIKE ");
                self.visit(pattern)?;
                if let Some(escape) = escape {
                    self.builder.append(" ESCAPE ");
                    self.visit(escape)?;
                }
            }

            SqlExprKind::Cast(operand) => {
                let Some(mapping) = &expr.type_mapping else {
                    return Err(Error::new_assert("cast without a target type mapping"));
                };
                self.builder.append("CAST(");
                self.visit(operand)?;
                self.builder
                    .append(" AS ")
                    .append(&mapping.store_type)
                    .append(")");
            }

            SqlExprKind::Fragment(sql) => {
                self.builder.append(sql);
            }
        }
        Ok(())
    }

    /// Operands of operators are parenthesized when they are operators
    /// themselves.
    fn visit_operand(&mut self, expr: &SqlExpr) -> Result<()> {
        let parenthesize = matches!(
            &expr.kind,
            SqlExprKind::Binary { op, .. } if *op != SqlBinOp::Coalesce
        );
        if parenthesize {
            self.builder.append("(");
            self.visit(expr)?;
            self.builder.append(")");
            Ok(())
        } else {
            self.visit(expr)
        }
    }
}

/// A boolean literal in the store type of a node.
fn bool_literal(expr: &SqlExpr, value: bool) -> Result<String> {
    match &expr.type_mapping {
        Some(mapping) => mapping.generate_sql_literal(&Literal::Boolean(value)),
        None => Ok((if value { "1" } else { "0" }).to_string()),
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use insta::assert_snapshot;
    use pipesql_ast::Ty;

    use super::*;
    use crate::ir::select::{EntityProjection, Ordering, SelectBuilder};
    use crate::sql::{Dialect, Quoting};
    use crate::translate::SqlExprFactory;
    use crate::types::DialectTypeMappings;

    fn generate(dialect: Dialect, select: SelectExpr) -> Command {
        let handler = dialect.handler();
        let helper = SqlGenerationHelper::new(handler.as_ref(), Quoting::WhenNeeded);
        QuerySqlGenerator::new(&helper, handler.as_ref())
            .generate(&select)
            .unwrap()
    }

    fn person(factory: &SqlExprFactory) -> (SelectBuilder, Arc<SqlExpr>, Arc<SqlExpr>) {
        let int = factory.find_mapping(&TyKind::Int32);
        let bool = factory.find_mapping(&TyKind::Bool);
        let age = Arc::new(SqlExpr::column("p", "Age", Ty::int32(), int));
        let active = Arc::new(SqlExpr::column("p", "Active", Ty::bool(), bool));
        let select = SelectBuilder::new(
            TableSource::Table {
                name: "Person".into(),
                schema: None,
                alias: "p".into(),
            },
            EntityProjection {
                entity: "Person".into(),
                columns: vec![
                    ("Age".into(), Arc::clone(&age)),
                    ("Active".into(), Arc::clone(&active)),
                ],
            },
        );
        (select, age, active)
    }

    fn factory(dialect: Dialect) -> SqlExprFactory {
        SqlExprFactory::new(Arc::new(DialectTypeMappings::new(dialect)))
    }

    #[test]
    fn top_without_offset() {
        let factory = factory(Dialect::MsSql);
        let (mut select, age, _) = person(&factory);
        select.apply_order_by(Ordering::new(age, false));
        select.apply_limit(factory.int(5));

        assert_snapshot!(generate(Dialect::MsSql, select.clone().finalize()).sql, @r"
        SELECT TOP(5) p.Age, p.Active
        FROM Person AS p
        ORDER BY p.Age DESC
        ");
        assert_snapshot!(generate(Dialect::Generic, select.clone().finalize()).sql, @r"
        SELECT p.Age, p.Active
        FROM Person AS p
        ORDER BY p.Age DESC
        FETCH FIRST 5 ROWS ONLY
        ");
        assert_snapshot!(generate(Dialect::SQLite, select.finalize()).sql, @r"
        SELECT p.Age, p.Active
        FROM Person AS p
        ORDER BY p.Age DESC
        LIMIT 5
        ");
    }

    #[test]
    fn offset_without_ordering() {
        let factory = factory(Dialect::MsSql);
        let (mut select, _, _) = person(&factory);
        select.apply_offset(factory.int(10));

        assert_snapshot!(generate(Dialect::MsSql, select.clone().finalize()).sql, @r"
        SELECT p.Age, p.Active
        FROM Person AS p
        ORDER BY (SELECT 1)
        OFFSET 10 ROWS
        ");
        assert_snapshot!(generate(Dialect::SQLite, select.clone().finalize()).sql, @r"
        SELECT p.Age, p.Active
        FROM Person AS p
        LIMIT -1 OFFSET 10
        ");
        assert_snapshot!(generate(Dialect::Postgres, select.finalize()).sql, @r"
        SELECT p.Age, p.Active
        FROM Person AS p
        OFFSET 10
        ");
    }

    #[test]
    fn bool_coercion() {
        let factory = factory(Dialect::MsSql);
        let (mut select, age, active) = person(&factory);
        select.apply_predicate(active.to_value(false));
        let adult = factory.binary(SqlBinOp::GreaterThanOrEqual, &age, &factory.int(18)).unwrap();
        select.replace_projection(vec![(
            pipesql_ast::ProjectionMember::root(),
            crate::ir::select::ProjectionValue::Sql(adult),
        )]);

        assert_snapshot!(generate(Dialect::MsSql, select.clone().finalize()).sql, @r"
        SELECT CASE
            WHEN p.Age >= 18 THEN CAST(1 AS bit)
            ELSE CAST(0 AS bit)
        END
        FROM Person AS p
        WHERE p.Active = CAST(1 AS bit)
        ");
        assert_snapshot!(generate(Dialect::Postgres, select.finalize()).sql, @r"
        SELECT p.Age >= 18
        FROM Person AS p
        WHERE p.Active
        ");
    }

    #[test]
    fn operators() {
        let factory = factory(Dialect::SQLite);
        let int = factory.find_mapping(&TyKind::Int32);
        let a = Arc::new(SqlExpr::column("p", "A", Ty::int32(), int.clone()));
        let b = Arc::new(SqlExpr::column("p", "B", Ty::int32(), int));

        let sum = factory.add(&a, &b).unwrap();
        let product = factory.binary(SqlBinOp::Multiply, &sum, &a).unwrap();
        let coalesce = factory.binary(SqlBinOp::Coalesce, &product, &b).unwrap();
        let compared = factory.binary(SqlBinOp::Equal, &coalesce, &b).unwrap();

        let mut select = SelectBuilder::default();
        select.apply_predicate(compared);
        assert_snapshot!(generate(Dialect::SQLite, select.finalize()).sql, @r"
        SELECT 1
        WHERE COALESCE((p.A + p.B) * p.A, p.B) = p.B
        ");
    }
}
