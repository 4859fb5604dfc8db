use std::thread;

use pipesql::{debug, lambda, Compiler, Dialect, Expr, Options, Query};

use crate::model;

fn queries() -> Vec<Query> {
    vec![
        Query::from("Person"),
        Query::from("Person")
            .filter(lambda("x", |x| x.member("Age").gt(Expr::lit(21))))
            .order_by(lambda("x", |x| x.member("Name")))
            .skip(Expr::lit(5))
            .take(Expr::lit(10)),
        Query::from("Person").take(Expr::lit(3)).distinct().count(None),
        Query::from("Person").any(Some(lambda("x", |x| x.member("Active")))),
    ]
}

const DIALECTS: [Dialect; 4] = [
    Dialect::Generic,
    Dialect::MsSql,
    Dialect::Postgres,
    Dialect::SQLite,
];

fn compile_all(compiler: &Compiler) -> Vec<String> {
    queries()
        .iter()
        .map(|query| compiler.compile(query).unwrap().sql)
        .collect()
}

#[test]
fn test_shared_compilers() {
    let model = model();
    let compilers: Vec<_> = DIALECTS
        .iter()
        .map(|dialect| Compiler::new(&model, Options::default().with_dialect(*dialect)))
        .collect();

    let sequential: Vec<_> = compilers.iter().map(compile_all).collect();

    let concurrent: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .flat_map(|_| compilers.iter())
            .map(|compiler| scope.spawn(move || compile_all(compiler)))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });

    for (i, result) in concurrent.iter().enumerate() {
        similar_asserts::assert_eq!(result, &sequential[i % DIALECTS.len()]);
    }
}

#[test]
fn test_debug_logs_stay_on_their_thread() {
    let model = model();
    let compiler = Compiler::new(&model, Options::default().with_dialect(Dialect::SQLite));

    let entries: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = queries()
            .into_iter()
            .map(|query| {
                let compiler = &compiler;
                scope.spawn(move || {
                    debug::log_start();
                    compiler.compile(&query).unwrap();
                    debug::log_finish().unwrap().entries.len()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });

    // one query, one shaped query and one SQL text per compilation
    assert!(entries.iter().all(|len| *len >= 3), "{entries:?}");
}
