use super::*;
use crate::builder::build_program;
use crate::symbol::SymbolAllocator;
use crate::test_utils::{atom, fact, fact_with, join_rule, neg, rule, s, symbolic_string, symsign};

#[test]
fn literal_display_quotes_strings() {
    let lit = atom("r", &["X", "a b", "7", "_"]);
    assert_eq!(lit.to_string(), "r(X, \"a b\", 7, _)");
    assert_eq!(neg("q", &["X"]).to_string(), "!q(X)");
}

#[test]
fn encoded_literal_uses_reserved_names() {
    let symbols = SymbolAllocator::new();
    let alpha = symbolic_string(&symbols, "alpha");
    let lit = Literal::new("r", [Term::Symbolic(alpha.clone()), Term::string("b")]);

    assert_eq!(lit.to_string(), "r(alpha, \"b\")");
    assert_eq!(
        lit.encoded().to_string(),
        format!("r(\"{}\", \"b\")", alpha.encoded_string())
    );
}

#[test]
fn string_escaping_in_display() {
    let lit = atom("r", &["say \"hi\""]);
    assert_eq!(lit.to_string(), "r(\"say \\\"hi\\\"\")");
}

#[test]
fn fact_substitution_concretizes_symbols() {
    let symbols = SymbolAllocator::new();
    let alpha = symbolic_string(&symbols, "alpha");
    let f = fact_with("r", vec![Term::Symbolic(alpha.clone()), Term::string("b")]);

    let assignment = Assignment::from([(alpha.clone(), s("a"))]);
    let concrete = f.substitute(&assignment);
    assert_eq!(concrete, fact("r", &["a", "b"]));
    assert_eq!(concrete.symbols().count(), 0);

    // Unbound symbols are left alone.
    assert_eq!(f.substitute(&Assignment::new()), f);
}

#[test]
fn substitute_constants_introduces_symbols() {
    let symbols = SymbolAllocator::new();
    let alpha = symbolic_string(&symbols, "alpha");
    let f = symsign("r", &["a", "b"]);

    let replace = BTreeMap::from([(Constant::from("a"), alpha.clone())]);
    let replaced = f.substitute_constants(&replace);

    assert!(replaced.symbolic_sign);
    assert_eq!(replaced.symbols().collect::<Vec<_>>(), vec![&alpha]);
    assert_eq!(replaced.head.args[1], Term::string("b"));
}

#[test]
fn idb_and_edb_are_derived() {
    let program = build_program([join_rule()], [fact("r", &["a", "b"])]).unwrap();

    assert_eq!(program.idb_relations(), BTreeSet::from(["t"]));
    assert_eq!(program.edb_relations(), BTreeSet::from(["r", "s"]));
}

#[test]
fn new_rejects_undeclared_and_arity_mismatch() {
    let rules = BTreeSet::from([join_rule()]);
    let err = Program::new(
        BTreeMap::new(),
        BTreeSet::new(),
        BTreeSet::new(),
        rules.clone(),
        BTreeSet::new(),
        Vec::new(),
    )
    .unwrap_err();
    assert!(matches!(err, SymlogError::Undeclared { .. }));

    let declarations = BTreeMap::from([
        ("t".to_string(), vec![BaseType::Symbol, BaseType::Symbol]),
        ("r".to_string(), vec![BaseType::Symbol]),
        ("s".to_string(), vec![BaseType::Symbol, BaseType::Symbol]),
    ]);
    let err = Program::new(
        declarations,
        BTreeSet::new(),
        BTreeSet::new(),
        rules,
        BTreeSet::new(),
        Vec::new(),
    )
    .unwrap_err();
    assert!(matches!(err, SymlogError::Arity { expected: 1, found: 2, .. }));
}

#[test]
fn intrinsics_need_no_declaration() {
    let contains_rule = rule(
        atom("t", &["X"]),
        vec![atom("r", &["X"]), atom("contains", &["a", "X"])],
    );
    let program = build_program([contains_rule], [fact("r", &["abc"])]).unwrap();
    assert!(program.declaration("contains").is_none());
}

#[test]
fn with_facts_tracks_symbols() {
    let symbols = SymbolAllocator::new();
    let alpha = symbolic_string(&symbols, "alpha");
    let beta = symbolic_string(&symbols, "beta");
    let program = build_program(
        [join_rule()],
        [fact_with("r", vec![Term::Symbolic(alpha.clone()), Term::string("b")])],
    )
    .unwrap();
    assert_eq!(program.symbols(), &[alpha.clone()]);

    let swapped = program.with_facts([fact_with(
        "s",
        vec![Term::Symbolic(beta.clone()), Term::string("c")],
    )]);
    assert_eq!(swapped.symbols(), &[beta]);
    assert_eq!(swapped.rules(), program.rules());
}

#[test]
fn render_souffle_splits_inline_facts() {
    let program = build_program(
        [join_rule()],
        [fact("r", &["a", "b"]), fact("s", &["b", "c"])],
    )
    .unwrap();

    let text = program.render_souffle(|f| f.name() == "s");
    assert!(text.contains(".decl r(v0:symbol, v1:symbol)"));
    assert!(text.contains(".input r"));
    assert!(text.contains(".output t"));
    assert!(text.contains("t(X, Z) :- r(X, Y), s(Y, Z)."));
    assert!(text.contains("s(\"b\", \"c\")."));
    assert!(!text.contains("r(\"a\", \"b\")."));
}
