//! SMT-LIB2 queries for repairing a program's facts.
//!
//! A model of the query picks symbol values and fact presence so that every
//! wanted output is derived and no unwanted output is. Solving is left to an
//! external SMT solver.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::condition::{smt_declarations, Formula, OutputCondition};
use crate::program::Literal;

/// Assertions accumulated for one repair problem.
#[derive(Debug, Clone, Default)]
pub struct RepairQuery {
    assertions: Vec<Formula>,
}

impl RepairQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require an output. An output with no condition can never be derived,
    /// which makes the query unsatisfiable.
    pub fn want(&mut self, condition: Option<&OutputCondition>) -> &mut Self {
        let formula = condition.map_or(Formula::False, OutputCondition::to_formula);
        self.assertions.push(formula);
        self
    }

    /// Forbid an output. An output with no condition is never derived.
    pub fn forbid(&mut self, condition: Option<&OutputCondition>) -> &mut Self {
        if let Some(cond) = condition {
            self.assertions.push(cond.to_formula().not().simplify());
        }
        self
    }

    pub fn assertions(&self) -> &[Formula] {
        &self.assertions
    }

    /// Complete script: declarations, assertions, `check-sat`, `get-model`.
    pub fn to_smtlib(&self) -> String {
        let mut out = String::from("(set-logic ALL)\n");
        for decl in smt_declarations(&self.assertions) {
            out.push_str(&decl);
            out.push('\n');
        }
        for formula in &self.assertions {
            let _ = writeln!(out, "(assert {})", formula.to_smtlib());
        }
        out.push_str("(check-sat)\n(get-model)\n");
        out
    }
}

/// Build the query for `wanted` and `unwanted` outputs from the conditions
/// an executor run produced.
pub fn repair_query(
    conditions: &BTreeMap<Literal, OutputCondition>,
    wanted: &[Literal],
    unwanted: &[Literal],
) -> RepairQuery {
    let mut query = RepairQuery::new();
    for output in wanted {
        query.want(conditions.get(output));
    }
    for output in unwanted {
        query.forbid(conditions.get(output));
    }
    query
}

#[cfg(test)]
#[path = "tests/repair.rs"]
mod tests;
