use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::SymlogResult;
use crate::evaluator::Evaluator;
use crate::program::{is_intrinsic, Fact, Literal, Program, Rule};
use crate::symbol::{BaseType, SymbolAllocator, SymbolicConstant};
use crate::term::{Constant, Term, Value};

/// Literal from shorthand arguments: `_` is a wildcard, a leading uppercase
/// letter makes a variable, digits make numbers, anything else a string.
pub(crate) fn atom(name: &str, args: &[&str]) -> Literal {
    Literal::new(name, args.iter().map(|a| term(a)))
}

pub(crate) fn neg(name: &str, args: &[&str]) -> Literal {
    Literal::negated(name, args.iter().map(|a| term(a)))
}

pub(crate) fn term(arg: &str) -> Term {
    if arg == "_" {
        Term::Wildcard
    } else if arg.starts_with(|c: char| c.is_ascii_uppercase()) {
        Term::var(arg)
    } else if let Ok(n) = arg.parse::<i64>() {
        Term::number(n)
    } else {
        Term::string(arg)
    }
}

pub(crate) fn rule(head: Literal, body: Vec<Literal>) -> Rule {
    Rule::new(head, body)
}

pub(crate) fn fact(name: &str, args: &[&str]) -> Fact {
    Fact::new(atom(name, args))
}

pub(crate) fn symsign(name: &str, args: &[&str]) -> Fact {
    Fact::symbolic(atom(name, args))
}

pub(crate) fn fact_with(name: &str, args: Vec<Term>) -> Fact {
    Fact::new(Literal::new(name, args))
}

pub(crate) fn symbolic_string(symbols: &SymbolAllocator, name: &str) -> SymbolicConstant {
    symbols.named(name, BaseType::Symbol).unwrap()
}

pub(crate) fn s(value: &str) -> Value {
    Value::Constant(Constant::String(value.to_string()))
}

/// `t(X, Z) :- r(X, Y), s(Y, Z).`
pub(crate) fn join_rule() -> Rule {
    rule(
        atom("t", &["X", "Z"]),
        vec![atom("r", &["X", "Y"]), atom("s", &["Y", "Z"])],
    )
}

type Tuple = Vec<Value>;

/// Stratified bottom-up evaluator used in place of Souffle.
///
/// Supports negation, wildcards and the `contains` intrinsic. Keeps the first
/// derivation of every tuple so it can answer explanation queries in the same
/// JSON shape Souffle produces.
pub(crate) struct NaiveEvaluator {
    explain_enabled: bool,
    evaluations: AtomicUsize,
    explanations: AtomicUsize,
}

impl NaiveEvaluator {
    pub(crate) fn new() -> Self {
        Self {
            explain_enabled: true,
            evaluations: AtomicUsize::new(0),
            explanations: AtomicUsize::new(0),
        }
    }

    /// An evaluator whose explanation channel is unavailable.
    pub(crate) fn without_explain() -> Self {
        Self {
            explain_enabled: false,
            ..Self::new()
        }
    }

    pub(crate) fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::Relaxed)
    }

    pub(crate) fn explanations(&self) -> usize {
        self.explanations.load(Ordering::Relaxed)
    }
}

impl Evaluator for NaiveEvaluator {
    fn evaluate(&self, program: &Program) -> SymlogResult<BTreeSet<Literal>> {
        self.evaluations.fetch_add(1, Ordering::Relaxed);
        let db = Database::run(program);
        let mut out = BTreeSet::new();
        for relation in program.outputs() {
            for tuple in db.tuples(relation) {
                out.insert(Literal::new(
                    relation,
                    tuple.iter().cloned().map(Term::from),
                ));
            }
        }
        Ok(out)
    }

    fn explain(&self, program: &Program, target: &Literal) -> SymlogResult<Option<String>> {
        if !self.explain_enabled {
            return Ok(None);
        }
        self.explanations.fetch_add(1, Ordering::Relaxed);
        let db = Database::run(program);
        let Some(values) = target.values() else {
            return Ok(None);
        };
        let proof = match db.proof(&target.name, &values) {
            Some(tree) => tree,
            None => "{\"axiom\": \"Tuple not found\"}".to_string(),
        };
        Ok(Some(format!("{{\"proof\": {}}}", proof)))
    }
}

#[derive(Default)]
struct Database {
    relations: BTreeMap<String, BTreeSet<Tuple>>,
    /// Body tuples of the first derivation; facts map to `None`.
    support: BTreeMap<(String, Tuple), Option<Vec<(String, Tuple)>>>,
}

impl Database {
    fn run(program: &Program) -> Self {
        let mut db = Database::default();
        for fact in program.facts() {
            if let Some(values) = fact.head.values() {
                db.insert(&fact.head.name, values, None);
            }
        }

        let strata = stratify(program);
        let max = strata.values().copied().max().unwrap_or(0);
        for level in 0..=max {
            let rules: Vec<&Rule> = program
                .rules()
                .iter()
                .filter(|r| strata.get(&r.head.name).copied().unwrap_or(0) == level)
                .collect();
            loop {
                let mut derived = Vec::new();
                for rule in &rules {
                    db.fire(rule, &mut derived);
                }
                let mut changed = false;
                for (name, tuple, support) in derived {
                    changed |= db.insert(&name, tuple, Some(support));
                }
                if !changed {
                    break;
                }
            }
        }
        db
    }

    fn insert(&mut self, name: &str, tuple: Tuple, support: Option<Vec<(String, Tuple)>>) -> bool {
        let fresh = self
            .relations
            .entry(name.to_string())
            .or_default()
            .insert(tuple.clone());
        if fresh {
            self.support.insert((name.to_string(), tuple), support);
        }
        fresh
    }

    fn tuples(&self, name: &str) -> impl Iterator<Item = &Tuple> {
        self.relations.get(name).into_iter().flatten()
    }

    fn fire(&self, rule: &Rule, derived: &mut Vec<(String, Tuple, Vec<(String, Tuple)>)>) {
        let positives: Vec<&Literal> = rule
            .body
            .iter()
            .filter(|l| l.positive && !is_intrinsic(&l.name))
            .collect();
        let checks: Vec<&Literal> = rule
            .body
            .iter()
            .filter(|l| !l.positive || is_intrinsic(&l.name))
            .collect();

        let mut partial: Vec<(BTreeMap<String, Value>, Vec<(String, Tuple)>)> =
            vec![(BTreeMap::new(), Vec::new())];
        for lit in positives {
            let mut next = Vec::new();
            for (binding, used) in &partial {
                for tuple in self.tuples(&lit.name) {
                    if let Some(extended) = unify(lit, tuple, binding) {
                        let mut used = used.clone();
                        used.push((lit.name.clone(), tuple.clone()));
                        next.push((extended, used));
                    }
                }
            }
            partial = next;
        }

        for (binding, used) in partial {
            if !checks.iter().all(|c| self.holds(c, &binding)) {
                continue;
            }
            let head: Option<Tuple> = rule
                .head
                .args
                .iter()
                .map(|t| resolve(t, &binding))
                .collect();
            if let Some(head) = head {
                if !self.contains(&rule.head.name, &head) {
                    derived.push((rule.head.name.clone(), head, used));
                }
            }
        }
    }

    fn holds(&self, lit: &Literal, binding: &BTreeMap<String, Value>) -> bool {
        if is_intrinsic(&lit.name) {
            let args: Option<Vec<Value>> = lit.args.iter().map(|t| resolve(t, binding)).collect();
            let result = match args.as_deref() {
                Some([needle, haystack]) => {
                    haystack.encode().raw().contains(&needle.encode().raw())
                }
                _ => false,
            };
            return result == lit.positive;
        }
        let found = self
            .tuples(&lit.name)
            .any(|tuple| unify(lit, tuple, binding).is_some());
        found == lit.positive
    }

    fn contains(&self, name: &str, tuple: &Tuple) -> bool {
        self.relations
            .get(name)
            .is_some_and(|tuples| tuples.contains(tuple))
    }

    fn proof(&self, name: &str, tuple: &Tuple) -> Option<String> {
        let support = self.support.get(&(name.to_string(), tuple.clone()))?;
        let shown = render_tuple(name, tuple);
        Some(match support {
            None => format!("{{\"axiom\": {:?}}}", shown),
            Some(body) => {
                let children: Vec<String> = body
                    .iter()
                    .filter_map(|(n, t)| self.proof(n, t))
                    .collect();
                format!(
                    "{{\"premises\": {:?}, \"rule-number\": \"(R1)\", \"children\": [{}]}}",
                    shown,
                    children.join(", ")
                )
            }
        })
    }
}

fn render_tuple(name: &str, tuple: &Tuple) -> String {
    let args: Vec<String> = tuple.iter().map(|v| v.encode().raw()).collect();
    format!("{}({})", name, args.join(", "))
}

fn resolve(term: &Term, binding: &BTreeMap<String, Value>) -> Option<Value> {
    match term {
        Term::Variable(v) => binding.get(v).cloned(),
        Term::Wildcard => None,
        other => other.value(),
    }
}

fn unify(
    lit: &Literal,
    tuple: &Tuple,
    binding: &BTreeMap<String, Value>,
) -> Option<BTreeMap<String, Value>> {
    if lit.args.len() != tuple.len() {
        return None;
    }
    let mut out = binding.clone();
    for (arg, value) in lit.args.iter().zip(tuple) {
        match arg {
            Term::Wildcard => {}
            Term::Variable(v) => match out.get(v) {
                Some(bound) if bound != value => return None,
                Some(_) => {}
                None => {
                    out.insert(v.clone(), value.clone());
                }
            },
            other => {
                if other.value().as_ref() != Some(value) {
                    return None;
                }
            }
        }
    }
    Some(out)
}

/// Stratum per relation: at least that of positive dependencies and one more
/// than that of negated ones.
fn stratify(program: &Program) -> BTreeMap<String, usize> {
    let mut strata: BTreeMap<String, usize> = BTreeMap::new();
    let limit = program.declarations().len() + 1;
    let mut changed = true;
    while changed {
        changed = false;
        for rule in program.rules() {
            let mut level = strata.get(&rule.head.name).copied().unwrap_or(0);
            for lit in rule.body.iter().filter(|l| !is_intrinsic(&l.name)) {
                let dep = strata.get(&lit.name).copied().unwrap_or(0);
                let needed = if lit.positive { dep } else { dep + 1 };
                level = level.max(needed.min(limit));
            }
            if strata.get(&rule.head.name).copied().unwrap_or(0) != level {
                strata.insert(rule.head.name.clone(), level);
                changed = true;
            }
        }
    }
    strata
}
