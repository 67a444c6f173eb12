//! AST projection: assignments, appends, recursive rule calls, hidden
//! comments, references and constant-valued terminals.

use std::sync::Arc;

use pretty_assertions::assert_eq;

use parsnip::{
    any, append, assign, at_least_one, at_least_one_sep, chars, eol, lit, many, not, opt, s, w,
    Grammar, NodeRef,
};

#[derive(Default)]
struct TestAst {
    name: String,
    children: Vec<Box<TestAst>>,
}

#[derive(Default)]
struct Import {
    target: NodeRef<TestAst>,
}

#[derive(Default)]
struct Flag {
    value: bool,
}

parsnip::ast_node!(TestAst, Import, Flag);

fn base_grammar() -> Grammar {
    let mut g = Grammar::new();
    g.terminal("WS").ignore().is(at_least_one(s()));
    g.terminal("SL_COMMENT")
        .hide()
        .is(lit("//") + many(not(eol()) + any()));
    g.terminal("ML_COMMENT").hide().is(lit("/*") >> lit("*/"));
    g.terminal("ID").is(chars("a-zA-Z_") + many(w()));
    g
}

#[test]
fn nested_nodes() {
    let mut g = base_grammar();
    let body = lit("test")
        + assign(|n: &mut TestAst| &mut n.name, g.call("ID"))
        + opt(
            lit("{")
                + many(append(|n: &mut TestAst| &mut n.children, g.call("TestAst")))
                + lit("}"),
        );
    g.parser::<TestAst>("TestAst").is(body);

    let result = g.parse(
        "TestAst",
        "
      test name
      {
        test child1
        test child2
        {
          test nested
        }
      }
      ",
    );
    assert!(result.full_match);

    let ast = result.value.into_node::<TestAst>();
    assert_eq!(ast.name, "name");
    assert_eq!(ast.children.len(), 2);
    assert_eq!(ast.children[0].name, "child1");
    assert_eq!(ast.children[1].name, "child2");
    assert_eq!(ast.children[1].children.len(), 1);
    assert_eq!(ast.children[1].children[0].name, "nested");
}

#[test]
fn qualified_name_with_comments() {
    let mut g = base_grammar();
    let id = g.call("ID");
    g.datatype("QualifiedName")
        .is(at_least_one_sep(lit("."), id));

    let result = g.parse("QualifiedName", "a.b.c");
    assert!(result.full_match);
    assert_eq!(result.value.into_string(), "a.b.c");

    let result = g.parse(
        "QualifiedName",
        "
  /*
   * multi line comment
   */
  a  .
  // single line comment
  b
  .

  c
  // trailing comment
",
    );
    assert!(result.full_match);
    // hidden tokens vanish from the concatenated leaves
    assert_eq!(result.value.into_string(), "a.b.c");
}

#[test]
fn hidden_comments_stay_in_the_cst() {
    let mut g = base_grammar();
    let id = g.call("ID");
    g.datatype("QualifiedName")
        .is(at_least_one_sep(lit("."), id));

    let result = g.parse("QualifiedName", "a // tail\n.b");
    assert!(result.full_match);

    let hidden: Vec<_> = result
        .root
        .node
        .descendants()
        .filter(|node| node.hidden)
        .collect();
    assert_eq!(hidden.len(), 1);
    assert_eq!(hidden[0].text(result.root.text()), "// tail");
}

#[test]
fn reference_fields_hold_raw_text() {
    let mut g = base_grammar();
    let target = assign(|n: &mut Import| &mut n.target, g.call("ID"));
    g.parser::<Import>("Import").is(lit("use") + target);

    let result = g.parse("Import", "use foo");
    assert!(result.full_match);

    let ast = result.value.into_node::<Import>();
    assert_eq!(ast.target.raw_text(), "foo");
    assert!(!ast.target.is_resolved());

    let resolved = ast.target.resolve_with(|text| {
        Some(Arc::new(TestAst {
            name: text.to_owned(),
            children: Vec::new(),
        }))
    });
    assert_eq!(resolved.unwrap().name, "foo");
    assert!(ast.target.is_resolved());
}

#[test]
fn constant_terminals() {
    let mut g = base_grammar();
    g.terminal("TRUE").constant(true).is(lit("true"));
    g.terminal("FALSE").constant(false).is(lit("false"));
    let value = assign(
        |f: &mut Flag| &mut f.value,
        g.call("TRUE") | g.call("FALSE"),
    );
    g.parser::<Flag>("Flag").is(value);

    let result = g.parse("Flag", " true ");
    assert!(result.full_match);
    assert!(result.value.into_node::<Flag>().value);

    let result = g.parse("Flag", "false");
    assert!(result.full_match);
    assert!(!result.value.into_node::<Flag>().value);
}

#[test]
fn literal_assignment_yields_its_text() {
    #[derive(Default)]
    struct Visibility {
        modifier: String,
    }
    parsnip::ast_node!(Visibility);

    let mut g = base_grammar();
    let modifier = assign(
        |v: &mut Visibility| &mut v.modifier,
        lit("public") | lit("private"),
    );
    g.parser::<Visibility>("Visibility").is(modifier);

    let result = g.parse("Visibility", "private");
    assert!(result.full_match);
    assert_eq!(result.value.into_node::<Visibility>().modifier, "private");
}

#[test]
fn rule_call_without_assignment_forwards_its_node() {
    let mut g = base_grammar();
    let inner = lit("test") + assign(|n: &mut TestAst| &mut n.name, g.call("ID"));
    g.parser::<TestAst>("Inner").is(inner);
    let outer = g.call("Inner");
    g.parser::<TestAst>("Outer").is(outer);

    let result = g.parse("Outer", "test forwarded");
    assert!(result.full_match);
    assert_eq!(result.value.into_node::<TestAst>().name, "forwarded");
}

#[test]
fn parser_rule_without_assignments_yields_a_default_node() {
    let mut g = base_grammar();
    g.parser::<Flag>("Unit").is(lit("unit"));

    let result = g.parse("Unit", "unit");
    assert!(result.full_match);
    assert!(!result.value.into_node::<Flag>().value);
}
