//! Building a validated [`Program`] from user rules and facts.
//!
//! The builder checks the structural restrictions the executor relies on and
//! infers a declaration for every relation from the constants and variable
//! joins it sees. Every check fails fast with a construction error.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{SymlogError, SymlogResult};
use crate::program::{is_intrinsic, Fact, Literal, Program, Rule};
use crate::symbol::{in_number_pool, BaseType, SymbolicConstant, RESERVED_PREFIX};
use crate::term::{Constant, Term};
use crate::trace::debug;

/// Build a program with default input and output relations.
///
/// Inputs are the relations used in rule bodies but never defined by a rule;
/// outputs are all rule heads.
pub fn build_program(
    rules: impl IntoIterator<Item = Rule>,
    facts: impl IntoIterator<Item = Fact>,
) -> SymlogResult<Program> {
    ProgramBuilder::new().rules(rules).facts(facts).build()
}

/// Incremental program construction with optional explicit I/O relations.
#[derive(Debug, Default, Clone)]
pub struct ProgramBuilder {
    rules: Vec<Rule>,
    facts: Vec<Fact>,
    inputs: Option<BTreeSet<String>>,
    outputs: Option<BTreeSet<String>>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(mut self, rules: impl IntoIterator<Item = Rule>) -> Self {
        self.rules.extend(rules);
        self
    }

    pub fn fact(mut self, fact: Fact) -> Self {
        self.facts.push(fact);
        self
    }

    pub fn facts(mut self, facts: impl IntoIterator<Item = Fact>) -> Self {
        self.facts.extend(facts);
        self
    }

    pub fn inputs<S: Into<String>>(mut self, inputs: impl IntoIterator<Item = S>) -> Self {
        self.inputs = Some(inputs.into_iter().map(Into::into).collect());
        self
    }

    pub fn outputs<S: Into<String>>(mut self, outputs: impl IntoIterator<Item = S>) -> Self {
        self.outputs = Some(outputs.into_iter().map(Into::into).collect());
        self
    }

    pub fn build(self) -> SymlogResult<Program> {
        let mut checker = Checker::default();
        for rule in &self.rules {
            checker.check_rule(rule)?;
        }
        for fact in &self.facts {
            checker.check_fact(fact)?;
        }

        let declarations = infer_declarations(&self.rules, &self.facts, &checker.arity)?;
        let symbols = collect_symbols(&self.facts)?;

        let heads: BTreeSet<String> = self.rules.iter().map(|r| r.head.name.clone()).collect();
        let inputs = self.inputs.unwrap_or_else(|| {
            self.rules
                .iter()
                .flat_map(|r| r.body.iter())
                .map(|l| l.name.clone())
                .filter(|n| !heads.contains(n) && !is_intrinsic(n))
                .collect()
        });
        let outputs = self.outputs.unwrap_or_else(|| heads.clone());

        debug!(
            rules = self.rules.len(),
            facts = self.facts.len(),
            symbols = symbols.len(),
            "built program"
        );

        Program::new(
            declarations,
            inputs,
            outputs,
            self.rules.into_iter().collect(),
            self.facts.into_iter().collect(),
            symbols,
        )
    }
}

#[derive(Default)]
struct Checker {
    arity: BTreeMap<String, usize>,
    constant_types: BTreeMap<(String, usize), BaseType>,
}

impl Checker {
    fn check_literal(&mut self, lit: &Literal) -> SymlogResult<()> {
        if lit.name.starts_with(RESERVED_PREFIX) {
            return Err(SymlogError::reserved(&lit.name));
        }
        for arg in &lit.args {
            check_reserved_term(arg)?;
        }
        if is_intrinsic(&lit.name) {
            return Ok(());
        }

        let expected = *self.arity.entry(lit.name.clone()).or_insert(lit.arity());
        if expected != lit.arity() {
            return Err(SymlogError::Arity {
                relation: lit.name.clone(),
                expected,
                found: lit.arity(),
            });
        }

        for (idx, arg) in lit.args.iter().enumerate() {
            let Some(value) = arg.value() else { continue };
            let ty = value.base_type();
            let known = *self
                .constant_types
                .entry((lit.name.clone(), idx))
                .or_insert(ty);
            if known != ty {
                return Err(SymlogError::type_error(format!(
                    "argument {} of `{}` is used as both {} and {}",
                    idx, lit.name, known, ty
                )));
            }
        }
        Ok(())
    }

    fn check_rule(&mut self, rule: &Rule) -> SymlogResult<()> {
        if !rule.head.positive {
            return Err(SymlogError::invalid_rule(rule, "negated head"));
        }
        if is_intrinsic(&rule.head.name) {
            return Err(SymlogError::invalid_rule(rule, "intrinsic relation in head"));
        }
        if rule.head.args.iter().any(|t| matches!(t, Term::Wildcard)) {
            return Err(SymlogError::invalid_rule(rule, "wildcard in head"));
        }
        if rule.body.is_empty() {
            return Err(SymlogError::invalid_rule(rule, "empty body; use a fact"));
        }
        if rule.literals().any(|l| l.symbols().next().is_some()) {
            return Err(SymlogError::invalid_rule(
                rule,
                "symbolic constants are only allowed in facts",
            ));
        }

        let grounded: BTreeSet<&str> = rule
            .body
            .iter()
            .filter(|l| l.positive && !is_intrinsic(&l.name))
            .flat_map(Literal::variables)
            .collect();
        if let Some(var) = rule.head.variables().find(|v| !grounded.contains(v)) {
            return Err(SymlogError::invalid_rule(
                rule,
                format!("ungrounded head variable `{}`", var),
            ));
        }

        for lit in rule.literals() {
            self.check_literal(lit)?;
        }
        Ok(())
    }

    fn check_fact(&mut self, fact: &Fact) -> SymlogResult<()> {
        if !fact.head.positive {
            return Err(SymlogError::invalid_fact(fact, "negated fact"));
        }
        if is_intrinsic(fact.name()) {
            return Err(SymlogError::invalid_fact(fact, "intrinsic relation"));
        }
        if !fact.head.is_ground() {
            return Err(SymlogError::invalid_fact(fact, "arguments must be constants"));
        }
        self.check_literal(&fact.head)
    }
}

fn check_reserved_term(term: &Term) -> SymlogResult<()> {
    match term {
        Term::Variable(v) if v.starts_with(RESERVED_PREFIX) => Err(SymlogError::reserved(v)),
        Term::Constant(Constant::String(s)) if s.starts_with(RESERVED_PREFIX) => {
            Err(SymlogError::reserved(s))
        }
        Term::Constant(Constant::Number(n)) if in_number_pool(*n) => {
            Err(SymlogError::reserved(n.to_string()))
        }
        _ => Ok(()),
    }
}

/// Infer column types: seed from constants, then propagate through shared
/// variables until nothing changes. Positions never determined become
/// `symbol`.
fn infer_declarations(
    rules: &[Rule],
    facts: &[Fact],
    arity: &BTreeMap<String, usize>,
) -> SymlogResult<BTreeMap<String, Vec<BaseType>>> {
    let mut types: BTreeMap<String, Vec<Option<BaseType>>> = arity
        .iter()
        .map(|(name, n)| (name.clone(), vec![None; *n]))
        .collect();

    let literals = rules
        .iter()
        .flat_map(Rule::literals)
        .chain(facts.iter().map(|f| &f.head))
        .filter(|l| !is_intrinsic(&l.name));
    for lit in literals {
        if let Some(slots) = types.get_mut(&lit.name) {
            for (idx, arg) in lit.args.iter().enumerate() {
                if let Some(value) = arg.value() {
                    slots[idx] = Some(value.base_type());
                }
            }
        }
    }

    let mut changed = true;
    while changed {
        changed = false;
        for rule in rules {
            let mut occurrences: BTreeMap<&str, Vec<(&str, usize)>> = BTreeMap::new();
            for lit in rule.literals().filter(|l| !is_intrinsic(&l.name)) {
                for (idx, arg) in lit.args.iter().enumerate() {
                    if let Term::Variable(v) = arg {
                        occurrences
                            .entry(v.as_str())
                            .or_default()
                            .push((lit.name.as_str(), idx));
                    }
                }
            }

            for (var, locs) in occurrences {
                let known: BTreeSet<BaseType> = locs
                    .iter()
                    .filter_map(|(rel, idx)| types.get(*rel).and_then(|t| t[*idx]))
                    .collect();
                if known.len() > 1 {
                    return Err(SymlogError::type_error(format!(
                        "type of variable `{}` is ambiguous in `{}`",
                        var, rule
                    )));
                }
                let Some(ty) = known.into_iter().next() else { continue };
                for (rel, idx) in locs {
                    if let Some(slot) = types.get_mut(rel).map(|t| &mut t[idx]) {
                        if slot.is_none() {
                            *slot = Some(ty);
                            changed = true;
                        }
                    }
                }
            }
        }
    }

    Ok(types
        .into_iter()
        .map(|(name, slots)| {
            let resolved = slots
                .into_iter()
                .map(|t| t.unwrap_or(BaseType::Symbol))
                .collect();
            (name, resolved)
        })
        .collect())
}

/// Symbolic constants in first-occurrence order.
fn collect_symbols(facts: &[Fact]) -> SymlogResult<Vec<SymbolicConstant>> {
    let mut symbols: Vec<SymbolicConstant> = Vec::new();
    let mut names: BTreeMap<&str, &SymbolicConstant> = BTreeMap::new();
    for sym in facts.iter().flat_map(Fact::symbols) {
        match names.get(sym.name()) {
            Some(seen) if *seen == sym => continue,
            Some(_) => {
                return Err(SymlogError::DuplicateSymbol {
                    name: sym.name().to_string(),
                })
            }
            None => {
                names.insert(sym.name(), sym);
                symbols.push(sym.clone());
            }
        }
    }
    Ok(symbols)
}

#[cfg(test)]
#[path = "tests/builder.rs"]
mod tests;
