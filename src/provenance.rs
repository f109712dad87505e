//! Minimal dependent-fact sets for derived tuples.
//!
//! Two strategies answer the same question: which subsets of a candidate
//! fact set, added to a base program, are minimal for deriving a target.
//! Delta debugging probes the evaluator repeatedly. Explanation asks the
//! evaluator for one proof tree per minimal set and falls back to delta
//! debugging whenever no proof is available.

use serde::Deserialize;
use std::collections::BTreeSet;

use crate::ddmin::{enumerate_minimal, try_ddmin, Outcome};
use crate::error::SymlogResult;
use crate::evaluator::Evaluator;
use crate::program::{Fact, Literal, Program};
use crate::trace::{debug, trace};

/// Marker Souffle uses for a tuple it cannot explain.
const TUPLE_NOT_FOUND: &str = "Tuple not found";

/// How dependent-fact sets are computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProvenanceMode {
    /// Probe the evaluator with shrinking subsets.
    #[default]
    DeltaDebugging,
    /// Read proof trees from the evaluator, probing only when none is given.
    Explain,
}

impl ProvenanceMode {
    /// All minimal subsets of `candidates` that, together with the facts of
    /// `base`, derive `target`. Empty if no subset does.
    pub fn witnesses<E: Evaluator + ?Sized>(
        self,
        evaluator: &E,
        base: &Program,
        target: &Literal,
        candidates: &[Fact],
    ) -> SymlogResult<Vec<BTreeSet<Fact>>> {
        let base = base.with_outputs([target.name.clone()]);
        let sets = match self {
            ProvenanceMode::DeltaDebugging => enumerate_minimal(candidates, |subset| {
                try_ddmin(subset, |probe| derives(evaluator, &base, target, probe))
            })?,
            ProvenanceMode::Explain => monotonic_all(evaluator, &base, target, candidates)?,
        };
        debug!(target = %target, witnesses = sets.len(), "provenance computed");
        Ok(sets.into_iter().map(|s| s.into_iter().collect()).collect())
    }
}

/// Outcome of one explanation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Explained {
    /// The target is not derivable from base plus candidates.
    Underivable,
    /// Candidates used by the evaluator's proof of the target.
    Witness(BTreeSet<Fact>),
    /// The evaluator gave no usable proof.
    Unavailable(String),
}

/// One node of a Souffle proof tree.
#[derive(Debug, Clone, Deserialize)]
pub struct ProofNode {
    #[serde(default)]
    pub axiom: Option<String>,
    #[serde(default)]
    pub premises: Option<String>,
    #[serde(default, rename = "rule-number")]
    pub rule_number: Option<String>,
    #[serde(default)]
    pub children: Vec<ProofNode>,
}

impl ProofNode {
    /// Leaf tuples of the proof, left to right.
    pub fn axioms(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_axioms(&mut out);
        out
    }

    fn collect_axioms<'a>(&'a self, out: &mut Vec<&'a str>) {
        if let Some(axiom) = &self.axiom {
            out.push(axiom);
        }
        for child in &self.children {
            child.collect_axioms(out);
        }
    }
}

#[derive(Deserialize)]
struct ExplainDocument {
    proof: ProofNode,
}

/// Parse the JSON an explanation session prints.
pub fn parse_explanation(json: &str) -> Result<ProofNode, serde_json::Error> {
    // Souffle escapes `;` in symbols, which is not a valid JSON escape.
    let fixed = json.replace("\\;", "\\\\;");
    serde_json::from_str::<ExplainDocument>(&fixed).map(|doc| doc.proof)
}

/// Relation name and unquoted argument texts of a printed tuple.
pub fn tuple_key(text: &str) -> Option<(String, Vec<String>)> {
    let text = text.trim().trim_end_matches('.');
    let open = text.find('(')?;
    let inner = text[open + 1..].strip_suffix(')')?;
    let name = text[..open].trim().to_string();
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '"' => quoted = !quoted,
            '\\' if quoted => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            ',' if !quoted => {
                args.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    if !inner.trim().is_empty() {
        args.push(current.trim().to_string());
    }
    Some((name, args))
}

fn fact_key(fact: &Fact) -> (String, Vec<String>) {
    let args = fact
        .head
        .args
        .iter()
        .map(|t| t.value().map(|v| v.encode().raw()).unwrap_or_default())
        .collect();
    (fact.name().to_string(), args)
}

fn derives<E: Evaluator + ?Sized>(
    evaluator: &E,
    base: &Program,
    target: &Literal,
    extra: &[Fact],
) -> SymlogResult<Outcome> {
    let program = base.with_facts(base.facts().iter().chain(extra).cloned());
    let outputs = evaluator.evaluate(&program)?;
    Ok(Outcome::from(outputs.contains(target)))
}

/// Explain `target` over `base` plus `candidates` with a single proof.
pub fn provenance<E: Evaluator + ?Sized>(
    evaluator: &E,
    base: &Program,
    target: &Literal,
    candidates: &[Fact],
) -> SymlogResult<Explained> {
    let base = base.with_outputs([target.name.clone()]);
    if derives(evaluator, &base, target, candidates)? == Outcome::DoesNotContain {
        return Ok(Explained::Underivable);
    }

    let program = base.with_facts(base.facts().iter().chain(candidates).cloned());
    let Some(json) = evaluator.explain(&program, target)? else {
        return Ok(Explained::Unavailable("no explanation produced".to_string()));
    };
    let proof = match parse_explanation(&json) {
        Ok(proof) => proof,
        Err(err) => return Ok(Explained::Unavailable(format!("bad proof JSON: {}", err))),
    };
    let axioms = proof.axioms();
    if axioms.is_empty() || axioms == [TUPLE_NOT_FOUND] {
        return Ok(Explained::Unavailable(TUPLE_NOT_FOUND.to_string()));
    }

    let used: BTreeSet<(String, Vec<String>)> =
        axioms.iter().filter_map(|a| tuple_key(a)).collect();
    let witness = candidates
        .iter()
        .filter(|f| used.contains(&fact_key(f)))
        .cloned()
        .collect();
    Ok(Explained::Witness(witness))
}

/// Every minimal witness, found by explanation with a delta-debugging
/// fallback per candidate set.
pub fn monotonic_all<E: Evaluator + ?Sized>(
    evaluator: &E,
    base: &Program,
    target: &Literal,
    candidates: &[Fact],
) -> SymlogResult<Vec<Vec<Fact>>> {
    enumerate_minimal(candidates, |subset| {
        match provenance(evaluator, base, target, subset)? {
            Explained::Underivable => Ok(None),
            Explained::Witness(facts) => Ok(Some(facts.into_iter().collect())),
            Explained::Unavailable(_reason) => {
                trace!(reason = %_reason, "explanation unavailable, probing instead");
                let base = base.with_outputs([target.name.clone()]);
                try_ddmin(subset, |probe| derives(evaluator, &base, target, probe))
            }
        }
    })
}

#[cfg(test)]
#[path = "tests/provenance.rs"]
mod tests;
