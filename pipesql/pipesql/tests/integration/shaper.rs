use insta::assert_snapshot;
use pipesql::{
    codes, lambda, Compiler, Expr, Literal, Operator, Options, Query, QueryResult, ShapedQuery,
    Value,
};

use crate::model;

fn translate(query: Query) -> ShapedQuery {
    let model = model();
    Compiler::new(&model, Options::default())
        .translate(&query)
        .unwrap()
}

fn text(value: &str) -> Literal {
    Literal::Text(value.to_string())
}

#[test]
fn test_count() {
    let shaped = translate(Query::from("Person").count(None));
    let result = shaped.materialize(&[vec![Literal::Integer(3)]]).unwrap();
    assert_eq!(result, QueryResult::Single(Value::Scalar(Literal::Integer(3))));
}

#[test]
fn test_max_of_nothing() {
    let shaped = translate(
        Query::from("Person").then(Operator::Max(Some(lambda("x", |x| x.member("Age"))))),
    );

    let result = shaped.materialize(&[vec![Literal::Integer(71)]]).unwrap();
    assert_eq!(result, QueryResult::Single(Value::Scalar(Literal::Integer(71))));

    // an aggregate over no rows comes back as NULL
    let err = shaped.materialize(&[vec![Literal::Null]]).unwrap_err();
    assert_eq!(err.code, Some(codes::NO_ELEMENTS));
    assert_snapshot!(err, @"[E0004] Sequence contains no elements");
}

#[test]
fn test_sum_of_nothing() {
    let age = || Some(lambda("x", |x| x.member("Age")));

    let sum = translate(Query::from("Person").then(Operator::Sum(age())));
    let result = sum.materialize(&[vec![Literal::Null]]).unwrap();
    assert_eq!(result, QueryResult::Single(Value::Scalar(Literal::Integer(0))));

    let average = translate(Query::from("Person").then(Operator::Average(age())));
    let err = average.materialize(&[vec![Literal::Null]]).unwrap_err();
    assert_eq!(err.code, Some(codes::NO_ELEMENTS));
}

#[test]
fn test_projection() {
    let shaped = translate(Query::from("Person").select(lambda("x", |x| {
        Expr::new_shape([
            ("Name", x.clone().member("Name")),
            ("Nickname", x.clone().member("Nickname")),
            ("Active", x.member("Active")),
        ])
    })));

    let rows = vec![
        vec![text("Ada"), text("ada"), Literal::Integer(1)],
        vec![text("Bob"), Literal::Null, Literal::Integer(0)],
    ];
    let QueryResult::Sequence(values) = shaped.materialize(&rows).unwrap() else {
        panic!("expected a sequence");
    };

    assert_eq!(values.len(), 2);
    assert_eq!(values[0].get("Name"), Some(&Value::Scalar(text("Ada"))));
    assert_eq!(
        values[0].get("Active"),
        Some(&Value::Scalar(Literal::Boolean(true)))
    );
    assert_eq!(values[1].get("Nickname"), Some(&Value::Scalar(Literal::Null)));
    assert_eq!(
        values[1].get("Active"),
        Some(&Value::Scalar(Literal::Boolean(false)))
    );
}

#[test]
fn test_first_or_default() {
    let shaped = translate(
        Query::from("Person")
            .order_by(lambda("x", |x| x.member("Name")))
            .then(Operator::First {
                predicate: None,
                or_default: true,
            }),
    );

    assert_eq!(
        shaped.materialize(&[]).unwrap(),
        QueryResult::SingleOrDefault(None)
    );

    let row = vec![text("Ada"), Literal::Integer(36), Literal::Integer(1), Literal::Null];
    let QueryResult::SingleOrDefault(Some(person)) = shaped.materialize(&[row]).unwrap() else {
        panic!("expected a value");
    };
    assert_eq!(person.get("Age"), Some(&Value::Scalar(Literal::Integer(36))));
}
