//! Simple tests for "this pipeline creates this SQL" go here.
use insta::assert_snapshot;
use pipesql::{compile, lambda, Command, Dialect, Expr, Ident, Options, Query, Quoting, Ty};
use rstest::rstest;

use crate::model;

fn options(dialect: Dialect) -> Options {
    Options::default()
        .no_format()
        .no_signature()
        .with_dialect(dialect)
}

fn compile_with(query: &Query, dialect: Dialect) -> Command {
    compile(query, &model(), &options(dialect)).unwrap()
}

fn sql(query: &Query, dialect: Dialect) -> String {
    compile_with(query, dialect).sql
}

fn adults() -> Query {
    Query::from("Person").filter(lambda("x", |x| x.member("Age").gte(Expr::lit(18))))
}

#[test]
fn test_paged_projection() {
    let query = Query::from("Person")
        .filter(lambda("x", |x| {
            x.member("Age").gte(Expr::parameter("p0", Ty::int32()))
        }))
        .order_by(lambda("x", |x| x.member("Name")))
        .select(lambda("x", |x| {
            Expr::new_shape([("Age", x.clone().member("Age")), ("Name", x.member("Name"))])
        }))
        .skip(Expr::lit(10))
        .take(Expr::lit(5));

    let command = compile_with(&query, Dialect::MsSql);
    assert_snapshot!(command.sql, @r"
    SELECT p.Age, p.Name
    FROM Person AS p
    WHERE p.Age >= @p0
    ORDER BY p.Name
    OFFSET 10 ROWS FETCH NEXT 5 ROWS ONLY
    ");
    assert_eq!(command.parameters.len(), 1);
    assert_eq!(command.parameters[0].placeholder, "@p0");
    assert_eq!(
        command.parameters[0].type_mapping.as_ref().map(|m| m.store_type.as_str()),
        Some("int")
    );

    assert_snapshot!(sql(&query, Dialect::SQLite), @r"
    SELECT p.Age, p.Name
    FROM Person AS p
    WHERE p.Age >= @p0
    ORDER BY p.Name
    LIMIT 5 OFFSET 10
    ");
}

#[test]
fn test_entity_columns() {
    assert_snapshot!(sql(&Query::from("Person"), Dialect::Generic), @r"
    SELECT p.Name, p.Age, p.Active, p.nick_name
    FROM Person AS p
    ");
}

#[rstest]
#[case::generic(Dialect::Generic, "SELECT p.Name, p.Age, p.Active, p.nick_name\nFROM Person AS p\nFETCH FIRST 3 ROWS ONLY")]
#[case::mssql(Dialect::MsSql, "SELECT TOP(3) p.Name, p.Age, p.Active, p.nick_name\nFROM Person AS p")]
#[case::postgres(Dialect::Postgres, "SELECT p.Name, p.Age, p.Active, p.nick_name\nFROM Person AS p\nLIMIT 3")]
#[case::sqlite(Dialect::SQLite, "SELECT p.Name, p.Age, p.Active, p.nick_name\nFROM Person AS p\nLIMIT 3")]
fn test_take(#[case] dialect: Dialect, #[case] expected: &str) {
    let query = Query::from("Person").take(Expr::lit(3));
    similar_asserts::assert_eq!(sql(&query, dialect), expected);
}

#[test]
fn test_where_after_take() {
    let query = Query::from("Person")
        .take(Expr::lit(5))
        .filter(lambda("x", |x| x.member("Age").gt(Expr::lit(18))));

    assert_snapshot!(sql(&query, Dialect::SQLite), @r"
    SELECT t.Name, t.Age, t.Active, t.nick_name
    FROM (
        SELECT p.Name, p.Age, p.Active, p.nick_name
        FROM Person AS p
        LIMIT 5
    ) AS t
    WHERE t.Age > 18
    ");
}

#[test]
fn test_count() {
    let query = adults().count(None);
    assert_snapshot!(sql(&query, Dialect::SQLite), @r"
    SELECT COUNT(*)
    FROM Person AS p
    WHERE p.Age >= 18
    ");

    let query = Query::from("Person").then(pipesql::Operator::LongCount(None));
    assert_snapshot!(sql(&query, Dialect::MsSql), @r"
    SELECT COUNT_BIG(*)
    FROM Person AS p
    ");
}

#[test]
fn test_count_with_predicate() {
    let query = Query::from("Person").count(Some(lambda("x", |x| x.member("Active"))));
    assert_snapshot!(sql(&query, Dialect::MsSql), @r"
    SELECT COUNT(*)
    FROM Person AS p
    WHERE p.Active = CAST(1 AS bit)
    ");
}

#[test]
fn test_distinct_then_paging() {
    let skipped = Query::from("Person").distinct().skip(Expr::lit(2));
    assert_snapshot!(sql(&skipped, Dialect::MsSql), @r"
    SELECT t.Name, t.Age, t.Active, t.nick_name
    FROM (
        SELECT DISTINCT p.Name, p.Age, p.Active, p.nick_name
        FROM Person AS p
    ) AS t
    ORDER BY (SELECT 1)
    OFFSET 2 ROWS
    ");

    let taken = Query::from("Person").distinct().take(Expr::lit(3));
    assert_snapshot!(sql(&taken, Dialect::MsSql), @r"
    SELECT DISTINCT TOP(3) p.Name, p.Age, p.Active, p.nick_name
    FROM Person AS p
    ");
}

#[test]
fn test_all() {
    let query = Query::from("Person").then(pipesql::Operator::All(lambda("x", |x| {
        x.member("Age").gt(Expr::lit(18))
    })));

    assert_snapshot!(sql(&query, Dialect::Postgres), @r"
    SELECT NOT EXISTS (
        SELECT 1
        FROM Person AS p
        WHERE NOT (p.Age > 18)
    )
    ");
}

#[test]
fn test_any() {
    let query = Query::from("Person").any(Some(lambda("x", |x| {
        x.member("Age").gt(Expr::lit(60))
    })));

    assert_snapshot!(sql(&query, Dialect::Postgres), @r"
    SELECT EXISTS (
        SELECT 1
        FROM Person AS p
        WHERE p.Age > 60
    )
    ");

    assert_snapshot!(sql(&query, Dialect::MsSql), @r"
    SELECT CASE
        WHEN EXISTS (
            SELECT 1
            FROM Person AS p
            WHERE p.Age > 60
        ) THEN CAST(1 AS bit)
        ELSE CAST(0 AS bit)
    END
    ");
}

#[test]
fn test_bool_column() {
    let query = Query::from("Person").filter(lambda("x", |x| x.member("Active")));

    assert_snapshot!(sql(&query, Dialect::MsSql), @r"
    SELECT p.Name, p.Age, p.Active, p.nick_name
    FROM Person AS p
    WHERE p.Active = CAST(1 AS bit)
    ");
    assert_snapshot!(sql(&query, Dialect::Postgres), @r"
    SELECT p.Name, p.Age, p.Active, p.nick_name
    FROM Person AS p
    WHERE p.Active
    ");
}

#[test]
fn test_null_comparison() {
    let query = Query::from("Person")
        .filter(lambda("x", |x| x.member("Nickname").not_equals(Expr::null())))
        .select(lambda("x", |x| x.member("Nickname")));

    assert_snapshot!(sql(&query, Dialect::SQLite), @r"
    SELECT p.nick_name
    FROM Person AS p
    WHERE p.nick_name IS NOT NULL
    ");
}

#[test]
fn test_string_functions() {
    let upper = Query::from("Person").select(lambda("x", |x| {
        x.member("Name").call("to_upper", vec![])
    }));
    assert_snapshot!(sql(&upper, Dialect::SQLite), @r"
    SELECT upper(p.Name)
    FROM Person AS p
    ");
    assert_snapshot!(sql(&upper, Dialect::MsSql), @r"
    SELECT UPPER(p.Name)
    FROM Person AS p
    ");

    let long_names = Query::from("Person")
        .filter(lambda("x", |x| x.member("Name").member("length").gt(Expr::lit(3))))
        .count(None);
    assert_snapshot!(sql(&long_names, Dialect::MsSql), @r"
    SELECT COUNT(*)
    FROM Person AS p
    WHERE LEN(p.Name) > 3
    ");

    let starts = Query::from("Person").filter(lambda("x", |x| {
        x.member("Name").call("starts_with", vec![Expr::lit("A")])
    }));
    assert!(sql(&starts, Dialect::MsSql).ends_with("WHERE p.Name LIKE N'A%'"));
    assert!(sql(&starts, Dialect::SQLite).contains("substr(p.Name, 1, length('A'))"));
}

#[test]
fn test_concat() {
    let query = Query::from("Person").select(lambda("x", |x| {
        x.member("Name").binary(pipesql::BinOp::Add, Expr::lit("!"))
    }));

    assert_snapshot!(sql(&query, Dialect::MsSql), @r"
    SELECT p.Name + N'!'
    FROM Person AS p
    ");
    assert_snapshot!(sql(&query, Dialect::Postgres), @r"
    SELECT p.Name || '!'
    FROM Person AS p
    ");
}

#[test]
fn test_full_text() {
    let query = Query::from("Person").filter(lambda("x", |x| {
        Expr::call_static(
            Ident::new("functions", "freetext"),
            vec![x.member("Name"), Expr::lit("rust")],
        )
    }));

    assert_snapshot!(sql(&query, Dialect::MsSql), @r"
    SELECT p.Name, p.Age, p.Active, p.nick_name
    FROM Person AS p
    WHERE FREETEXT(p.Name, N'rust')
    ");
}

#[test]
fn test_conditional() {
    let query = Query::from("Person").select(lambda("x", |x| {
        x.member("Age")
            .gt(Expr::lit(60))
            .conditional(Expr::lit("senior"), Expr::lit("other"))
    }));

    assert_snapshot!(sql(&query, Dialect::SQLite), @r"
    SELECT CASE
        WHEN p.Age > 60 THEN 'senior'
        ELSE 'other'
    END
    FROM Person AS p
    ");
}

#[test]
fn test_last_reverses_ordering() {
    let query = Query::from("Person")
        .order_by(lambda("x", |x| x.member("Age")))
        .then_by_descending(lambda("x", |x| x.member("Name")))
        .last(None);

    assert_snapshot!(sql(&query, Dialect::Postgres), @r"
    SELECT p.Name, p.Age, p.Active, p.nick_name
    FROM Person AS p
    ORDER BY p.Age DESC, p.Name
    LIMIT 1
    ");
}

#[test]
fn test_offset_without_ordering() {
    let query = Query::from("Person").skip(Expr::lit(20));

    assert_snapshot!(sql(&query, Dialect::MsSql), @r"
    SELECT p.Name, p.Age, p.Active, p.nick_name
    FROM Person AS p
    ORDER BY (SELECT 1)
    OFFSET 20 ROWS
    ");
    assert_snapshot!(sql(&query, Dialect::SQLite), @r"
    SELECT p.Name, p.Age, p.Active, p.nick_name
    FROM Person AS p
    LIMIT -1 OFFSET 20
    ");
}

#[test]
fn test_quoting() {
    let query = Query::from("Person").select(lambda("x", |x| x.member("Name")));
    let options = options(Dialect::MsSql).with_quoting(Quoting::Always);

    assert_snapshot!(compile(&query, &model(), &options).unwrap().sql, @r"
    SELECT [p].[Name]
    FROM [Person] AS [p]
    ");
}

#[test]
fn test_format_and_signature() {
    let options = Options::default().with_dialect(Dialect::SQLite);
    let sql = compile(&adults(), &model(), &options).unwrap().sql;

    assert!(sql.starts_with("SELECT\n"));
    assert!(sql.contains("-- Generated by pipesql "));
}

#[rstest]
#[case::mssql(Dialect::MsSql)]
#[case::postgres(Dialect::Postgres)]
#[case::sqlite(Dialect::SQLite)]
fn test_parses(#[case] dialect: Dialect) {
    use sqlparser::dialect::{MsSqlDialect, PostgreSqlDialect, SQLiteDialect};
    use sqlparser::parser::Parser;

    let query = adults()
        .order_by_descending(lambda("x", |x| x.member("Age")))
        .skip(Expr::lit(10))
        .take(Expr::lit(5));
    let sql = sql(&query, dialect);

    let parsed = match dialect {
        Dialect::MsSql => Parser::parse_sql(&MsSqlDialect {}, &sql),
        Dialect::Postgres => Parser::parse_sql(&PostgreSqlDialect {}, &sql),
        _ => Parser::parse_sql(&SQLiteDialect {}, &sql),
    };
    assert_eq!(parsed.unwrap().len(), 1, "{sql}");
}

#[test]
fn test_rewrite_before_generate() {
    use std::sync::Arc;

    use pipesql::ir::sx::{fold_sql_expr_children, SqlExpr, SqlExprKind, SqlFold};
    use pipesql::{Compiler, Literal};

    /// Writes the value of parameter `p0` into the SQL.
    struct InlineParameter(i64);
    impl SqlFold for InlineParameter {
        fn fold_sql_expr(&mut self, expr: &Arc<SqlExpr>) -> pipesql::Result<Arc<SqlExpr>> {
            if matches!(&expr.kind, SqlExprKind::Parameter(name) if name == "p0") {
                let value = SqlExprKind::Constant(Literal::Integer(self.0));
                return Ok(Arc::new(expr.with_kind(value)));
            }
            fold_sql_expr_children(self, expr)
        }
    }

    let model = model();
    let compiler = Compiler::new(&model, options(Dialect::SQLite));
    let query = Query::from("Person")
        .filter(lambda("x", |x| {
            x.member("Age").gte(Expr::parameter("p0", Ty::int32()))
        }))
        .select(lambda("x", |x| x.member("Name")));

    let mut shaped = compiler.translate(&query).unwrap();
    let select = Arc::new(shaped.select);
    shaped.select = InlineParameter(21).fold_select(&select).unwrap().as_ref().clone();

    let command = compiler.generate(&shaped).unwrap();
    assert_snapshot!(command.sql, @r"
    SELECT p.Name
    FROM Person AS p
    WHERE p.Age >= 21
    ");
    assert!(command.parameters.is_empty());

    // nothing left to rewrite: the same tree comes back
    let inlined = Arc::new(shaped.select);
    let refolded = InlineParameter(21).fold_select(&inlined).unwrap();
    assert!(Arc::ptr_eq(&inlined, &refolded));
}
