// Whole-program expansion: properties that only show across clauses and sessions.

use std::collections::BTreeSet;
use std::path::Path;

use dscript_ast::walk::walk_clause_exprs;
use dscript_ast::{BinaryOp, Clause, Expr, ExprKind, ProbeDesc, Program, Span, Stmt};
use dscript_xd::{Session, XdConfig, XdError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dscript_xd=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

fn span() -> Span {
    Span::default()
}

fn probe(text: &str) -> ProbeDesc {
    ProbeDesc::parse(text).unwrap()
}

fn ident(name: &str) -> Expr {
    Expr::ident(name, span())
}

fn entry(field: &str) -> Expr {
    Expr::ptr(ident("entry"), field, span())
}

fn trace_of(expr: Expr) -> Stmt {
    Stmt::expr(Expr::call("trace", vec![expr], span()))
}

fn quantize(key: Expr, value: Expr) -> Stmt {
    Stmt::expr(Expr::new(
        ExprKind::Agg {
            name: "lat".to_string(),
            keys: vec![key],
            func: Some(Box::new(Expr::call("quantize", vec![value], span()))),
        },
        span(),
    ))
}

/// I/O latency keyed by whether `spa_sync` is on the stack, plus a bounded walk
/// over a linked list.
fn latency_program() -> Program {
    Program::new(vec![
        Clause::new(
            vec![probe("BEGIN")],
            None,
            vec![trace_of(ident("walltimestamp"))],
            span(),
        ),
        Clause::new(
            vec![probe("fbt::zio_wait:return"), probe("fbt::zio_read:return")],
            Some(Expr::binary(
                BinaryOp::Gt,
                entry("elapsed_us"),
                Expr::int(100, span()),
                span(),
            )),
            vec![
                quantize(
                    Expr::index(
                        ident("callers"),
                        vec![Expr::string("spa_sync", span())],
                        span(),
                    ),
                    entry("elapsed_ns"),
                ),
                Stmt::If {
                    cond: Expr::binary(
                        BinaryOp::Ne,
                        Expr::index(entry("args"), vec![Expr::int(0, span())], span()),
                        Expr::int(0, span()),
                        span(),
                    ),
                    then_body: vec![trace_of(entry("errno"))],
                    else_body: vec![trace_of(Expr::int(0, span()))],
                    span: span(),
                },
            ],
            span(),
        ),
        Clause::new(
            vec![probe("fbt::vdev_queue_io:entry")],
            None,
            vec![
                Stmt::expr(Expr::assign(
                    Expr::scoped("this", "n", span()),
                    ident("arg0"),
                    span(),
                )),
                Stmt::While {
                    cond: Expr::scoped("this", "n", span()),
                    max_iter: 4,
                    body: vec![Stmt::expr(Expr::assign(
                        Expr::scoped("this", "n", span()),
                        Expr::ptr(Expr::scoped("this", "n", span()), "next", span()),
                        span(),
                    ))],
                    span: span(),
                },
            ],
            span(),
        ),
        Clause::new(
            vec![probe("fbt::spa_sync:return")],
            None,
            vec![trace_of(entry("vtimestamp"))],
            span(),
        ),
    ])
}

fn error_handlers(program: &Program) -> usize {
    program
        .clauses
        .iter()
        .filter(|c| c.probes == vec![probe("dtrace:::ERROR")])
        .count()
}

/// Names of every synthesized variable referenced by `clause`.
fn synthesized_names(clause: &Clause) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    walk_clause_exprs(clause, &mut |expr| {
        if let Some(name) = expr.as_ident() {
            if name.starts_with("_XD_") {
                names.insert(name.to_string());
            }
        }
    });
    names
}

#[test]
fn test_program_uses_one_error_handler_at_the_front() {
    init_tracing();
    let mut session = Session::new(XdConfig::experimental()).unwrap();
    let compiled = session.compile_program(latency_program()).unwrap();

    assert_eq!(error_handlers(&compiled), 1);
    // BEGIN is a plain single clause and comes first; the handler leads the
    // first multi-clause expansion.
    assert_eq!(compiled.clauses[0].probes, vec![probe("BEGIN")]);
    assert_eq!(compiled.clauses[1].probes, vec![probe("dtrace:::ERROR")]);
    assert!(session.error_handler_emitted());
}

#[test]
fn test_no_entry_references_survive_in_return_clauses() {
    init_tracing();
    let mut session = Session::new(XdConfig::experimental()).unwrap();
    let compiled = session.compile_program(latency_program()).unwrap();

    for clause in &compiled.clauses {
        walk_clause_exprs(clause, &mut |expr| {
            assert!(
                !expr.is_ident("entry") && !expr.is_ident("callers"),
                "unrewritten form in:\n{}",
                clause
            );
        });
    }
}

#[test]
fn test_capture_groups_distinct_across_clauses() {
    init_tracing();
    let mut session = Session::new(XdConfig::experimental()).unwrap();
    let compiled = session.compile_program(latency_program()).unwrap();

    assert_eq!(session.ids().capture_groups(), 2);
    assert_eq!(session.ids().counters(), 1);

    let captures: Vec<&Clause> = compiled
        .clauses
        .iter()
        .filter(|c| c.probes.iter().all(ProbeDesc::is_entry))
        .filter(|c| c.actions.iter().any(|s| s.to_string().contains("_XD_entry_")))
        .collect();
    assert_eq!(captures.len(), 2);

    let first = synthesized_names(captures[0]);
    let second = synthesized_names(captures[1]);
    assert!(first.iter().all(|n| n.ends_with("_1")));
    assert!(second.iter().all(|n| n.ends_with("_2")));
    assert!(first.is_disjoint(&second));

    // zio_wait/zio_read capture: args0, errno, marker; elapsed reads share the marker.
    assert_eq!(
        first,
        ["_XD_entry_args0_1", "_XD_entry_errno_1", "_XD_entry_timestamp_1"]
            .into_iter()
            .map(String::from)
            .collect::<BTreeSet<String>>()
    );
    for clause in &captures {
        let last = clause.actions.last().unwrap().to_string();
        assert!(last.contains("_XD_entry_timestamp_"), "marker not last: {}", last);
    }
}

#[test]
fn test_while_loop_clause_count() {
    init_tracing();
    let mut session = Session::new(XdConfig::experimental()).unwrap();
    let program = latency_program();
    let loop_clause = program.clauses[2].clone();

    let out = session.expand(loop_clause).unwrap();

    // handler, clear, block before the loop, not-done init, 4 x (test, body)
    assert_eq!(out.len(), 12);
    let tests = out
        .iter()
        .filter(|c| {
            c.actions[0].to_string() == "this->_XD_condition_1 = (this->_XD_condition_1 && this->n);\n"
        })
        .count();
    assert_eq!(tests, 4);
}

#[test]
fn test_callers_clauses_bracket_their_expansion() {
    init_tracing();
    let mut session = Session::new(XdConfig::experimental()).unwrap();
    let program = latency_program();

    let out = session.expand(program.clauses[1].clone()).unwrap();
    let rendered: Vec<String> = out.iter().map(ToString::to_string).collect();

    // handler first, then the increment before everything else
    assert!(rendered[1].contains("++self->_XD_callers_1;"));
    assert!(rendered[1].starts_with("::spa_sync:entry"));
    // the decrement after the release clause
    let last = rendered.last().unwrap();
    assert!(last.contains("--self->_XD_callers_1;"));
    assert!(rendered[rendered.len() - 2].contains("_XD_entry_timestamp_1[stackdepth] = 0;"));
}

#[test]
fn test_dump_subclauses_does_not_change_output() {
    init_tracing();
    let quiet = Session::new(XdConfig::experimental())
        .unwrap()
        .compile_program(latency_program())
        .unwrap();

    let config: XdConfig =
        serde_json::from_str(r#"{ "experimental": true, "dump_subclauses": true }"#).unwrap();
    let mut session = Session::new(config).unwrap();
    assert!(session.config().dump_subclauses);
    let dumped = session.compile_program(latency_program()).unwrap();

    assert_eq!(quiet, dumped);
}

#[test]
fn test_custom_error_probe() {
    init_tracing();
    let config = XdConfig {
        error_probe: "dtrace:::FAULT".to_string(),
        ..XdConfig::experimental()
    };
    let mut session = Session::new(config).unwrap();
    let compiled = session.compile_program(latency_program()).unwrap();

    assert_eq!(compiled.clauses[1].probes, vec![probe("dtrace:::FAULT")]);
    assert_eq!(error_handlers(&compiled), 0);
}

#[test]
fn test_plain_script_rejects_experimental_program() {
    init_tracing();
    let config = XdConfig::default().with_script(Path::new("latency.d"));
    let mut session = Session::new(config).unwrap();

    assert!(matches!(
        session.compile_program(latency_program()),
        Err(XdError::ExperimentalDisabled { .. })
    ));
}

#[test]
fn test_xd_script_enables_expansion() {
    init_tracing();
    let config = XdConfig::default().with_script(Path::new("latency.xd"));
    let mut session = Session::new(config).unwrap();
    assert!(session.config().experimental);

    let compiled = session.compile_program(latency_program()).unwrap();
    assert!(compiled.len() > latency_program().len());
}
