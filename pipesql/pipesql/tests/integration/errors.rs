use insta::assert_snapshot;
use pipesql::{codes, compile, lambda, Dialect, Expr, Ident, Options, Query};

use crate::model;

fn compile_err(query: Query) -> String {
    let options = Options::default().with_dialect(Dialect::MsSql);
    compile(&query, &model(), &options).unwrap_err().to_string()
}

#[test]
fn test_unsupported_operator() {
    let query = Query::from("Person").then(pipesql::Operator::Reverse);
    assert_snapshot!(compile_err(query), @"[E0001] Error: operator `Reverse` is not implemented");
}

#[test]
fn test_untranslatable_predicate() {
    let query = Query::from("Person").filter(lambda("x", |x| {
        x.member("Name").call("reverse", vec![]).equals("a")
    }));
    assert_snapshot!(compile_err(query), @r#"[E0002] Error: predicate `x.Name.reverse() == "a"` could not be translated to SQL"#);
}

#[test]
fn test_freetext_needs_a_column() {
    let query = Query::from("Person").filter(lambda("x", |x| {
        Expr::call_static(
            Ident::new("functions", "freetext"),
            vec![x.member("Name").call("to_upper", vec![]), Expr::lit("rust")],
        )
    }));
    assert_snapshot!(compile_err(query), @"[E0003] Error: invalid call to `functions.freetext`: the property argument must be a column of an entity");
}

#[test]
fn test_unknown_entity() {
    assert_snapshot!(compile_err(Query::from("Planet")), @"Error: entity `Planet` not found");
}

#[test]
fn test_last_without_ordering() {
    let query = Query::from("Person").last(None);
    assert_snapshot!(compile_err(query), @r"
    Error: `Last` requires an ordered sequence
    ↳ Hint: add an `OrderBy` before it
    ");
}

#[test]
fn test_error_codes() {
    let options = Options::default();
    let query = Query::from("Person").then(pipesql::Operator::Reverse);
    let err = compile(&query, &model(), &options).unwrap_err();

    assert_eq!(err.inner.len(), 1);
    assert_eq!(err.inner[0].code.as_deref(), Some(codes::UNSUPPORTED_OPERATOR));
}
