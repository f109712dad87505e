//! Boolean conditions over symbol assignments and fact presence.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Write as _};

use crate::program::Fact;
use crate::symbol::{BaseType, SymbolicConstant};
use crate::term::{Assignment, Constant, Value};

/// One way an output is derived: every equality in `assignment` holds and
/// every fact in `dependent_facts` is present.
///
/// A symbol assigned to itself stands for any value outside its admissible
/// set; `distinct_from` lists the values it must then differ from.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AtomicCondition {
    pub assignment: Assignment,
    pub dependent_facts: BTreeSet<Fact>,
    pub distinct_from: BTreeMap<SymbolicConstant, BTreeSet<Value>>,
}

impl AtomicCondition {
    pub fn new(assignment: Assignment, dependent_facts: BTreeSet<Fact>) -> Self {
        Self {
            assignment,
            dependent_facts,
            distinct_from: BTreeMap::new(),
        }
    }

    /// Holds for every assignment and every choice of present facts.
    pub fn is_unconditional(&self) -> bool {
        self.assignment.is_empty() && self.dependent_facts.is_empty()
    }

    pub fn to_formula(&self) -> Formula {
        let mut parts = Vec::new();
        for (sym, value) in &self.assignment {
            if value.as_symbolic() == Some(sym) {
                let others = self.distinct_from.get(sym).into_iter().flatten();
                parts.extend(others.map(|v| Formula::eq(sym.clone(), v.clone()).not()));
            } else {
                parts.push(Formula::eq(sym.clone(), value.clone()));
            }
        }
        parts.extend(self.dependent_facts.iter().cloned().map(Formula::Present));
        Formula::And(parts).simplify()
    }
}

/// Disjunction of the ways an output can be derived.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputCondition {
    sub_conditions: Vec<AtomicCondition>,
}

impl OutputCondition {
    pub fn new(sub_conditions: impl IntoIterator<Item = AtomicCondition>) -> Self {
        let mut out = Self::default();
        for cond in sub_conditions {
            out.push(cond);
        }
        out
    }

    /// Add an alternative unless an equal one is present.
    pub fn push(&mut self, cond: AtomicCondition) {
        if !self.sub_conditions.contains(&cond) {
            self.sub_conditions.push(cond);
        }
    }

    pub fn sub_conditions(&self) -> &[AtomicCondition] {
        &self.sub_conditions
    }

    pub fn assignments(&self) -> impl Iterator<Item = &Assignment> {
        self.sub_conditions.iter().map(|c| &c.assignment)
    }

    pub fn dependent_facts(&self) -> impl Iterator<Item = &BTreeSet<Fact>> {
        self.sub_conditions.iter().map(|c| &c.dependent_facts)
    }

    pub fn is_empty(&self) -> bool {
        self.sub_conditions.is_empty()
    }

    pub fn to_formula(&self) -> Formula {
        Formula::Or(
            self.sub_conditions
                .iter()
                .map(AtomicCondition::to_formula)
                .collect(),
        )
        .simplify()
    }

    pub fn to_smtlib(&self) -> String {
        self.to_formula().to_smtlib()
    }
}

impl fmt::Display for OutputCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_formula())
    }
}

/// Propositional formula over symbol equalities and fact atoms.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Formula {
    True,
    False,
    Eq(SymbolicConstant, Value),
    Present(Fact),
    And(Vec<Formula>),
    Or(Vec<Formula>),
    Not(Box<Formula>),
}

impl Formula {
    pub fn eq(sym: SymbolicConstant, value: Value) -> Formula {
        Formula::Eq(sym, value)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Formula {
        Formula::Not(Box::new(self))
    }

    /// Flatten, drop units, fold constants and remove duplicate operands.
    pub fn simplify(self) -> Formula {
        match self {
            Formula::Eq(sym, Value::Symbolic(other)) if sym == other => Formula::True,
            Formula::Not(inner) => match inner.simplify() {
                Formula::True => Formula::False,
                Formula::False => Formula::True,
                Formula::Not(x) => *x,
                other => Formula::Not(Box::new(other)),
            },
            Formula::And(parts) => simplify_nary(parts, true),
            Formula::Or(parts) => simplify_nary(parts, false),
            other => other,
        }
    }

    pub fn symbols(&self) -> BTreeSet<SymbolicConstant> {
        let mut out = BTreeSet::new();
        self.visit(&mut |f| {
            if let Formula::Eq(sym, value) = f {
                out.insert(sym.clone());
                if let Value::Symbolic(other) = value {
                    out.insert(other.clone());
                }
            }
        });
        out
    }

    pub fn facts(&self) -> BTreeSet<Fact> {
        let mut out = BTreeSet::new();
        self.visit(&mut |f| {
            if let Formula::Present(fact) = f {
                out.insert(fact.clone());
            }
        });
        out
    }

    fn visit(&self, f: &mut impl FnMut(&Formula)) {
        f(self);
        match self {
            Formula::And(parts) | Formula::Or(parts) => {
                for p in parts {
                    p.visit(f);
                }
            }
            Formula::Not(inner) => inner.visit(f),
            _ => {}
        }
    }

    /// SMT-LIB2 term. Symbols and fact atoms must be declared separately,
    /// see [`smt_declarations`].
    pub fn to_smtlib(&self) -> String {
        let mut out = String::new();
        self.write_smtlib(&mut out);
        out
    }

    fn write_smtlib(&self, out: &mut String) {
        match self {
            Formula::True => out.push_str("true"),
            Formula::False => out.push_str("false"),
            Formula::Eq(sym, value) => {
                let _ = write!(out, "(= {} {})", smt_symbol(sym), smt_value(value));
            }
            Formula::Present(fact) => out.push_str(&smt_fact(fact)),
            Formula::And(parts) | Formula::Or(parts) => {
                out.push_str(if matches!(self, Formula::And(_)) {
                    "(and"
                } else {
                    "(or"
                });
                for p in parts {
                    out.push(' ');
                    p.write_smtlib(out);
                }
                out.push(')');
            }
            Formula::Not(inner) => {
                out.push_str("(not ");
                inner.write_smtlib(out);
                out.push(')');
            }
        }
    }
}

fn simplify_nary(parts: Vec<Formula>, conjunction: bool) -> Formula {
    let (unit, zero) = if conjunction {
        (Formula::True, Formula::False)
    } else {
        (Formula::False, Formula::True)
    };
    let mut flat: Vec<Formula> = Vec::new();
    for part in parts.into_iter().map(Formula::simplify) {
        let nested = match part {
            Formula::And(inner) if conjunction => inner,
            Formula::Or(inner) if !conjunction => inner,
            other => vec![other],
        };
        for p in nested {
            if p == zero {
                return zero;
            }
            if p != unit && !flat.contains(&p) {
                flat.push(p);
            }
        }
    }
    match flat.len() {
        0 => unit,
        1 => flat.pop().unwrap_or(unit),
        _ if conjunction => Formula::And(flat),
        _ => Formula::Or(flat),
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Formula::True => write!(f, "true"),
            Formula::False => write!(f, "false"),
            Formula::Eq(sym, value) => write!(f, "{} = {}", sym, value),
            Formula::Present(fact) => write!(f, "{}", fact.head),
            Formula::And(parts) | Formula::Or(parts) => {
                let op = if matches!(self, Formula::And(_)) {
                    " & "
                } else {
                    " | "
                };
                write!(f, "(")?;
                for (i, p) in parts.iter().enumerate() {
                    if i > 0 {
                        write!(f, "{}", op)?;
                    }
                    write!(f, "{}", p)?;
                }
                write!(f, ")")
            }
            Formula::Not(inner) => write!(f, "!{}", inner),
        }
    }
}

/// Quote `text` as an SMT-LIB symbol. `|` and `\` cannot appear inside
/// one, so they are escaped with `#`, which escapes itself.
fn quoted_symbol(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('|');
    for c in text.chars() {
        match c {
            '#' => out.push_str("##"),
            '|' => out.push_str("#p"),
            '\\' => out.push_str("#b"),
            c => out.push(c),
        }
    }
    out.push('|');
    out
}

pub(crate) fn smt_symbol(sym: &SymbolicConstant) -> String {
    quoted_symbol(sym.name())
}

pub(crate) fn smt_fact(fact: &Fact) -> String {
    quoted_symbol(&fact.head.to_string())
}

pub(crate) fn smt_sort(kind: BaseType) -> &'static str {
    match kind {
        BaseType::Symbol => "String",
        BaseType::Number => "Int",
    }
}

fn smt_value(value: &Value) -> String {
    match value {
        Value::Symbolic(sym) => smt_symbol(sym),
        Value::Constant(Constant::String(s)) => format!("\"{}\"", s.replace('"', "\"\"")),
        Value::Constant(Constant::Number(n)) if *n < 0 => format!("(- {})", n.unsigned_abs()),
        Value::Constant(Constant::Number(n)) => n.to_string(),
    }
}

/// `declare-const` commands for every symbol and fact atom in `formulas`.
pub fn smt_declarations<'a>(formulas: impl IntoIterator<Item = &'a Formula>) -> Vec<String> {
    let mut symbols = BTreeSet::new();
    let mut facts = BTreeSet::new();
    for formula in formulas {
        symbols.extend(formula.symbols());
        facts.extend(formula.facts());
    }
    symbols
        .iter()
        .map(|s| format!("(declare-const {} {})", smt_symbol(s), smt_sort(s.kind())))
        .chain(
            facts
                .iter()
                .map(|f| format!("(declare-const {} Bool)", smt_fact(f))),
        )
        .collect()
}

#[cfg(test)]
#[path = "tests/condition.rs"]
mod tests;
