//! The repetition family, in rule-mode (hidden tokens skipped between
//! iterations) and terminal-mode (contiguous matches only).

use pretty_assertions::assert_eq;

use parsnip::{
    at_least_one, at_least_one_sep, lit, many, many_sep, opt, rep, s, Expr, Grammar,
};

fn fixture(body: Expr) -> Grammar {
    let mut g = Grammar::new();
    g.terminal("WS").ignore().is(at_least_one(s()));
    g.datatype("RULE").is(body.clone());
    g.terminal("TERM").is(body);
    g
}

#[test]
fn optional() {
    let g = fixture(opt(lit("test")));

    assert!(g.parse("RULE", "").full_match);
    assert!(g.parse("RULE", " ").full_match);
    assert!(g.parse("RULE", "  test  ").full_match);
    assert!(!g.parse("RULE", "test test").full_match);
    assert!(!g.parse("RULE", "testtest").full_match);

    assert_eq!(g.parse("RULE", "    ").value.into_string(), "");
    assert_eq!(g.parse("RULE", "  test  ").value.into_string(), "test");

    assert!(g.parse("TERM", "").full_match);
    assert!(g.parse("TERM", "test").full_match);
    assert!(!g.parse("TERM", " ").full_match);
    assert!(!g.parse("TERM", "test ").full_match);
    assert!(!g.parse("TERM", " test").full_match);
    assert!(!g.parse("TERM", "testtest").full_match);

    assert_eq!(g.parse("TERM", "").value.into_string(), "");
    assert_eq!(g.parse("TERM", "test").value.into_string(), "test");
}

#[test]
fn many_repetitions() {
    let g = fixture(many(lit("test")));

    assert!(g.parse("RULE", "").full_match);
    assert!(g.parse("RULE", "test").full_match);
    assert!(g.parse("RULE", "test test").full_match);
    assert!(g.parse("RULE", "test test test test test").full_match);

    assert_eq!(
        g.parse("RULE", " test  test   ").value.into_string(),
        "testtest"
    );

    assert!(g.parse("TERM", "").full_match);
    assert!(g.parse("TERM", "test").full_match);
    assert!(g.parse("TERM", "testtest").full_match);
    assert!(g.parse("TERM", "testtesttesttesttest").full_match);
    assert!(!g.parse("TERM", " ").full_match);
    assert!(!g.parse("TERM", "test ").full_match);
    assert!(!g.parse("TERM", " test").full_match);
    assert!(!g.parse("TERM", "testtest ").full_match);

    assert_eq!(g.parse("TERM", "testtest").value.into_string(), "testtest");
}

#[test]
fn many_with_separator() {
    let g = fixture(many_sep(lit("."), lit("test")));

    assert!(!g.parse("RULE", ".").full_match);
    // no trailing separator
    assert!(!g.parse("RULE", "test.").full_match);
    assert!(g.parse("RULE", "").full_match);

    assert!(g.parse("RULE", "test").full_match);
    assert!(g.parse("RULE", " test . test ").full_match);
    assert!(g.parse("RULE", "test.test.test. test.test").full_match);

    assert_eq!(
        g.parse("RULE", " test  . test   ").value.into_string(),
        "test.test"
    );

    assert!(!g.parse("TERM", " ").full_match);
    assert!(!g.parse("TERM", "test .").full_match);
    assert!(!g.parse("TERM", " test.").full_match);
    assert!(!g.parse("TERM", "test.test ").full_match);

    assert!(g.parse("TERM", "").full_match);
    assert!(g.parse("TERM", "test").full_match);
    assert!(g.parse("TERM", "test.test").full_match);
    assert!(g.parse("TERM", "test.test.test.test.test").full_match);

    assert_eq!(
        g.parse("TERM", "test.test").value.into_string(),
        "test.test"
    );
}

#[test]
fn at_least_one_repetitions() {
    let g = fixture(at_least_one(lit("test")));

    assert!(!g.parse("RULE", "").full_match);
    assert!(!g.parse("RULE", "testtest").full_match);
    assert!(g.parse("RULE", "test").full_match);
    assert!(g.parse("RULE", "test test").full_match);
    assert!(g.parse("RULE", "test test test test test").full_match);

    assert_eq!(g.parse("RULE", " test  ").value.into_string(), "test");

    assert!(!g.parse("TERM", "").full_match);
    assert!(!g.parse("TERM", "test test").full_match);
    assert!(g.parse("TERM", "test").full_match);
    assert!(g.parse("TERM", "testtest").full_match);
    assert!(g.parse("TERM", "testtesttesttesttest").full_match);

    assert_eq!(g.parse("TERM", "test").value.into_string(), "test");
}

#[test]
fn at_least_one_with_separator() {
    let g = fixture(at_least_one_sep(lit("."), lit("test")));

    assert!(!g.parse("RULE", "").full_match);
    assert!(!g.parse("RULE", ".").full_match);
    assert!(!g.parse("RULE", "test.").full_match);
    assert!(g.parse("RULE", "test ").full_match);
    assert!(g.parse("RULE", "test .test").full_match);
    assert!(g.parse("RULE", "  test.test . test.test.test  ").full_match);

    assert_eq!(
        g.parse("RULE", " test  . test   ").value.into_string(),
        "test.test"
    );

    assert!(!g.parse("TERM", "").full_match);
    assert!(!g.parse("TERM", ".").full_match);
    assert!(!g.parse("TERM", "test.").full_match);
    assert!(!g.parse("TERM", "test .test").full_match);
    assert!(g.parse("TERM", "test").full_match);
    assert!(g.parse("TERM", "test.test").full_match);
    assert!(g.parse("TERM", "test.test.test.test.test").full_match);

    assert_eq!(
        g.parse("TERM", "test.test").value.into_string(),
        "test.test"
    );
}

#[test]
fn bounded_repetition() {
    let g = fixture(rep(2, 3, lit("test")));

    assert!(!g.parse("RULE", "test").full_match);
    assert!(g.parse("RULE", "test test").full_match);
    assert!(g.parse("RULE", "test test test").full_match);
    assert!(!g.parse("RULE", "test test test test").full_match);

    assert_eq!(
        g.parse("RULE", " test   test   ").value.into_string(),
        "testtest"
    );

    assert!(!g.parse("TERM", "test").full_match);
    assert!(g.parse("TERM", "testtest").full_match);
    assert!(g.parse("TERM", "testtesttest").full_match);
    assert!(!g.parse("TERM", "testtesttesttest").full_match);

    assert_eq!(g.parse("TERM", "testtest").value.into_string(), "testtest");
}

#[test]
fn nullable_body_terminates() {
    let g = fixture(many(opt(lit("x"))));
    let result = g.parse("TERM", "xx");
    assert!(result.full_match);
    assert!(g.parse("TERM", "").full_match);
    assert!(g.parse("RULE", " x x ").full_match);
}
