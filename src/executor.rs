//! The symbolic executor.
//!
//! Runs the meta-program once, splits its output by symbol assignment and,
//! for every assignment, finds the symbolic-sign facts each interesting
//! output depends on. The result maps each output to the disjunction of
//! the ways it can be derived.

use std::collections::{BTreeMap, BTreeSet};

use crate::analysis::Domains;
use crate::builder::build_program;
use crate::condition::{AtomicCondition, OutputCondition};
use crate::config::SymexConfig;
use crate::error::SymlogResult;
use crate::evaluator::Evaluator;
use crate::pool::{PoolConfig, WorkerPool};
use crate::program::{Fact, Literal, Program, Rule};
use crate::repair::{repair_query, RepairQuery};
use crate::symbol::SymbolicConstant;
use crate::term::{Assignment, Term, Value};
use crate::trace::{debug, info, info_span};
use crate::transform::transform;

/// Conditions per concrete output tuple.
pub type Conditions = BTreeMap<Literal, OutputCondition>;

/// Symbolic execution over an [`Evaluator`].
pub struct SymbolicExecutor<E: Evaluator> {
    evaluator: E,
    config: SymexConfig,
    pool: WorkerPool,
}

impl<E: Evaluator> SymbolicExecutor<E> {
    pub fn new(evaluator: E) -> Self {
        Self::with_config(evaluator, SymexConfig::default())
    }

    pub fn with_config(evaluator: E, config: SymexConfig) -> Self {
        let pool = WorkerPool::with_config(PoolConfig::with_workers(config.jobs));
        Self {
            evaluator,
            config,
            pool,
        }
    }

    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    pub fn config(&self) -> &SymexConfig {
        &self.config
    }

    /// Build a program from `rules` and `facts`, then run [`Self::symex_program`].
    pub fn symex(
        &self,
        rules: impl IntoIterator<Item = Rule>,
        facts: impl IntoIterator<Item = Fact>,
        interested: &[Literal],
    ) -> SymlogResult<Conditions> {
        let program = build_program(rules, facts)?;
        self.symex_program(&program, interested)
    }

    /// Conditions for every output matching one of `interested`, or for
    /// every output when `interested` is empty.
    ///
    /// Template positions holding a symbolic constant or a wildcard match
    /// anything. An output symbol matched against a concrete template value
    /// is bound to it, and the result is keyed by the concrete instance.
    pub fn symex_program(
        &self,
        program: &Program,
        interested: &[Literal],
    ) -> SymlogResult<Conditions> {
        let _span = info_span!("symex", interested = interested.len()).entered();

        let meta = transform(program)?;
        let idb = program.idb_relations();
        let mut outputs: BTreeSet<String> = program.outputs().clone();
        outputs.extend(
            interested
                .iter()
                .filter(|t| idb.contains(t.name.as_str()))
                .map(|t| t.name.clone()),
        );
        let raw = self
            .evaluator
            .evaluate(&meta.program.with_outputs(outputs))?;

        let mut groups: BTreeMap<Assignment, BTreeSet<Literal>> = BTreeMap::new();
        for tuple in raw.iter().filter(|t| idb.contains(t.name.as_str())) {
            let (output, assignment) = meta.table.split(tuple)?;
            groups.entry(assignment).or_default().insert(output);
        }
        debug!(
            tuples = raw.len(),
            groups = groups.len(),
            "meta-program output partitioned"
        );

        let ctx = GroupContext {
            program,
            domains: &meta.domains,
            interested,
        };
        let per_group = self.pool.run(groups.into_iter().collect(), |(assignment, outs)| {
            ctx.conditions(&self.evaluator, &self.config, &assignment, &outs)
        })?;

        let mut conditions = Conditions::new();
        for (output, cond) in per_group.into_iter().flatten() {
            conditions.entry(output).or_default().push(cond);
        }
        info!(outputs = conditions.len(), "symbolic execution finished");
        Ok(conditions)
    }

    /// Repair query requiring `wanted` and forbidding `unwanted`.
    pub fn repair(
        &self,
        rules: impl IntoIterator<Item = Rule>,
        facts: impl IntoIterator<Item = Fact>,
        wanted: &[Literal],
        unwanted: &[Literal],
    ) -> SymlogResult<RepairQuery> {
        let program = build_program(rules, facts)?;
        let interested: Vec<Literal> = wanted.iter().chain(unwanted).cloned().collect();
        let conditions = self.symex_program(&program, &interested)?;
        Ok(repair_query(&conditions, wanted, unwanted))
    }
}

/// Read-only state shared by every assignment group.
struct GroupContext<'a> {
    program: &'a Program,
    domains: &'a Domains,
    interested: &'a [Literal],
}

impl GroupContext<'_> {
    fn conditions<E: Evaluator + ?Sized>(
        &self,
        evaluator: &E,
        config: &SymexConfig,
        assignment: &Assignment,
        outputs: &BTreeSet<Literal>,
    ) -> SymlogResult<Vec<(Literal, AtomicCondition)>> {
        let targets: Vec<(&Literal, Vec<Assignment>)> = outputs
            .iter()
            .filter_map(|out| {
                let bindings = self.bindings(out);
                (!bindings.is_empty()).then_some((out, bindings))
            })
            .collect();
        if targets.is_empty() {
            return Ok(Vec::new());
        }

        let (ordinary, symsign): (Vec<&Fact>, Vec<&Fact>) =
            self.program.facts().iter().partition(|f| !f.symbolic_sign);
        let base = self
            .program
            .with_facts(ordinary.iter().map(|f| f.substitute(assignment)));

        let mut origins: BTreeMap<Fact, Vec<&Fact>> = BTreeMap::new();
        for fact in &symsign {
            origins.entry(fact.substitute(assignment)).or_default().push(fact);
        }
        let candidates: Vec<Fact> = origins.keys().cloned().collect();

        let ordinary_symbols: BTreeSet<&SymbolicConstant> =
            ordinary.iter().copied().flat_map(Fact::symbols).collect();

        let mut result = Vec::new();
        for (target, bindings) in targets {
            let witnesses = config
                .provenance
                .witnesses(evaluator, &base, target, &candidates)?;
            for witness in witnesses {
                for facts in expand_origins(&witness, &origins) {
                    let mut symbols = ordinary_symbols.clone();
                    symbols.extend(facts.iter().flat_map(|f| f.symbols()));
                    let cond = self.package(assignment, &symbols, &facts);
                    for binding in &bindings {
                        result.push(bind(target, &cond, binding));
                    }
                }
            }
        }
        Ok(result)
    }

    /// Bindings of `output` for each interested template it matches. An
    /// empty interest list matches everything with no bindings.
    fn bindings(&self, output: &Literal) -> Vec<Assignment> {
        if self.interested.is_empty() {
            return vec![Assignment::new()];
        }
        let mut found: Vec<Assignment> = Vec::new();
        for template in self.interested {
            if let Some(binding) = match_template(output, template) {
                if !found.contains(&binding) {
                    found.push(binding);
                }
            }
        }
        found
    }

    fn package(
        &self,
        assignment: &Assignment,
        symbols: &BTreeSet<&SymbolicConstant>,
        facts: &BTreeSet<Fact>,
    ) -> AtomicCondition {
        let restricted: Assignment = assignment
            .iter()
            .filter(|(sym, _)| symbols.contains(sym))
            .map(|(s, v)| (s.clone(), v.clone()))
            .collect();
        let mut cond = AtomicCondition::new(restricted, facts.clone());
        for (sym, value) in &cond.assignment {
            if value.as_symbolic() != Some(sym) {
                continue;
            }
            let domain = self.domains.get(sym);
            let mut others: BTreeSet<Value> = domain
                .into_iter()
                .flatten()
                .filter(|v| matches!(v, Value::Constant(_)))
                .cloned()
                .collect();
            // A symbol mapped onto `sym` is equal to it in this group.
            for (other, other_value) in &cond.assignment {
                let joined = Value::Symbolic(other.clone());
                if other != sym
                    && other_value.as_symbolic() != Some(sym)
                    && domain.is_some_and(|d| d.contains(&joined))
                {
                    others.insert(joined);
                }
            }
            if !others.is_empty() {
                cond.distinct_from.insert(sym.clone(), others);
            }
        }
        cond
    }
}

/// Every way of choosing an original fact for each concretized witness fact.
fn expand_origins(
    witness: &BTreeSet<Fact>,
    origins: &BTreeMap<Fact, Vec<&Fact>>,
) -> Vec<BTreeSet<Fact>> {
    let mut choices: Vec<BTreeSet<Fact>> = vec![BTreeSet::new()];
    for concrete in witness {
        let Some(sources) = origins.get(concrete) else {
            continue;
        };
        choices = choices
            .into_iter()
            .flat_map(|chosen| {
                sources.iter().map(move |src| {
                    let mut next = chosen.clone();
                    next.insert((*src).clone());
                    next
                })
            })
            .collect();
    }
    choices
}

/// Bind the output's symbols to the template's concrete values.
fn bind(
    target: &Literal,
    cond: &AtomicCondition,
    binding: &Assignment,
) -> (Literal, AtomicCondition) {
    if binding.is_empty() {
        return (target.clone(), cond.clone());
    }
    let mut bound = cond.clone();
    for (sym, value) in binding {
        bound.assignment.insert(sym.clone(), value.clone());
        bound.distinct_from.remove(sym);
    }
    (target.substitute(binding), bound)
}

/// Match an output tuple against an interested template.
///
/// Returns the values the output's symbolic arguments take in the template,
/// or `None` if they do not match.
pub fn match_template(output: &Literal, template: &Literal) -> Option<Assignment> {
    if output.name != template.name || output.arity() != template.arity() {
        return None;
    }
    let mut binding = Assignment::new();
    let mut variables: BTreeMap<&str, Value> = BTreeMap::new();
    for (out, tmpl) in output.args.iter().zip(&template.args) {
        let value = out.value()?;
        match tmpl {
            Term::Wildcard | Term::Symbolic(_) => {}
            Term::Variable(v) => {
                if let Some(prev) = variables.get(v.as_str()) {
                    if *prev != value {
                        return None;
                    }
                } else {
                    variables.insert(v.as_str(), value);
                }
            }
            Term::Constant(c) => match &value {
                Value::Symbolic(sym) => {
                    let concrete = Value::Constant(c.clone());
                    match binding.get(sym) {
                        Some(prev) if *prev != concrete => return None,
                        _ => {
                            binding.insert(sym.clone(), concrete);
                        }
                    }
                }
                Value::Constant(oc) if oc == c => {}
                Value::Constant(_) => return None,
            },
        }
    }
    Some(binding)
}

#[cfg(test)]
#[path = "tests/executor.rs"]
mod tests;
