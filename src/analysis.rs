//! Constant-domain analysis.
//!
//! For every symbolic constant, computes the concrete values it could
//! usefully be equal to: the constants that can ever reach a position the
//! symbol is joined against. Any other value behaves exactly like the symbol
//! itself, so the symbol stands in for all of them.

use hashbrown::{HashMap, HashSet};
use rustc_hash::FxHasher;
use std::collections::{BTreeMap, BTreeSet};
use std::hash::BuildHasherDefault;

use crate::program::{is_intrinsic, Literal, Program, Rule};
use crate::symbol::SymbolicConstant;
use crate::term::{Term, Value};
use crate::trace::trace;

pub(crate) type FxMap<K, V> = HashMap<K, V, BuildHasherDefault<FxHasher>>;
pub(crate) type FxSet<K> = HashSet<K, BuildHasherDefault<FxHasher>>;

/// An argument position of a relation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Location {
    pub relation: String,
    pub index: usize,
}

impl Location {
    pub fn new(relation: &str, index: usize) -> Self {
        Self {
            relation: relation.to_string(),
            index,
        }
    }
}

/// Admissible values per symbolic constant.
pub type Domains = BTreeMap<SymbolicConstant, BTreeSet<Value>>;

/// Run the analysis over `program`.
///
/// Every symbol in `program.symbols()` appears in the result, and its set
/// always contains the symbol itself.
pub fn analyse(program: &Program) -> Domains {
    let table = LocationTable::build(program);
    let loc_values = table.propagate();

    let mut domains: Domains = program
        .symbols()
        .iter()
        .map(|s| (s.clone(), BTreeSet::from([Value::Symbolic(s.clone())])))
        .collect();

    for (loc, symbols) in &table.symbol_locations {
        let mut reachable: BTreeSet<Value> = loc_values
            .get(loc)
            .map(|v| v.iter().cloned().collect())
            .unwrap_or_default();
        if let Some(unifiable) = table.unifiable.get(loc) {
            for other in unifiable {
                if let Some(values) = loc_values.get(other) {
                    reachable.extend(values.iter().cloned());
                }
            }
        }
        for sym in symbols {
            domains
                .entry(sym.clone())
                .or_default()
                .extend(reachable.iter().cloned());
        }
    }

    trace!(symbols = domains.len(), "constant domains computed");
    domains
}

/// Values that can appear at each location once the program has run,
/// computed by the same fixpoint [`analyse`] uses.
pub fn location_values(program: &Program) -> BTreeMap<Location, BTreeSet<Value>> {
    LocationTable::build(program)
        .propagate()
        .into_iter()
        .map(|(loc, values)| (loc, values.into_iter().collect()))
        .collect()
}

#[derive(Default)]
struct LocationTable {
    /// Seed values per location: fact arguments and rule constants.
    seeds: FxMap<Location, FxSet<Value>>,
    /// Head location to the positive body locations sharing its variable.
    head_sources: FxMap<Location, FxSet<Location>>,
    /// Fact locations holding symbolic constants.
    symbol_locations: BTreeMap<Location, BTreeSet<SymbolicConstant>>,
    /// Symbol location to the body locations its value is joined against.
    unifiable: FxMap<Location, FxSet<Location>>,
}

impl LocationTable {
    fn build(program: &Program) -> Self {
        let mut table = LocationTable::default();

        for fact in program.facts() {
            for (idx, arg) in fact.head.args.iter().enumerate() {
                let loc = Location::new(fact.name(), idx);
                if let Some(value) = arg.value() {
                    table.seeds.entry(loc.clone()).or_default().insert(value);
                }
                if let Term::Symbolic(s) = arg {
                    table
                        .symbol_locations
                        .entry(loc)
                        .or_default()
                        .insert(s.clone());
                }
            }
        }

        for rule in program.rules() {
            for lit in rule.literals() {
                for (idx, arg) in lit.args.iter().enumerate() {
                    if let Term::Constant(c) = arg {
                        table
                            .seeds
                            .entry(Location::new(&lit.name, idx))
                            .or_default()
                            .insert(Value::Constant(c.clone()));
                    }
                }
            }
            for (idx, arg) in rule.head.args.iter().enumerate() {
                if let Term::Variable(var) = arg {
                    let sources = positive_locations(var, &rule.body);
                    table
                        .head_sources
                        .entry(Location::new(&rule.head.name, idx))
                        .or_default()
                        .extend(sources);
                }
            }
        }

        let symbol_locs: Vec<Location> = table.symbol_locations.keys().cloned().collect();
        for loc in symbol_locs {
            for rule in program.rules() {
                table.add_unifiable(&loc, rule);
            }
        }
        table
    }

    fn add_unifiable(&mut self, loc: &Location, rule: &Rule) {
        for lit in rule.body.iter().filter(|l| l.name == loc.relation) {
            let Some(Term::Variable(var)) = lit.args.get(loc.index) else {
                continue;
            };
            let mut locs = positive_locations(var, &rule.body);
            locs.remove(loc);
            self.unifiable.entry(loc.clone()).or_default().extend(locs);
        }
    }

    /// Monotone union fixpoint of head locations over their body sources.
    fn propagate(&self) -> FxMap<Location, FxSet<Value>> {
        let mut values = self.seeds.clone();
        let mut changed = true;
        while changed {
            changed = false;
            for (head, sources) in &self.head_sources {
                let mut incoming: FxSet<Value> = FxSet::default();
                for src in sources {
                    if let Some(vals) = values.get(src) {
                        incoming.extend(vals.iter().cloned());
                    }
                }
                let current = values.entry(head.clone()).or_default();
                let before = current.len();
                current.extend(incoming);
                changed |= current.len() != before;
            }
        }
        values
    }
}

/// Every position where `var` occurs in a positive, non-intrinsic literal.
fn positive_locations(var: &str, body: &[Literal]) -> FxSet<Location> {
    let mut locs = FxSet::default();
    for lit in body.iter().filter(|l| l.positive && !is_intrinsic(&l.name)) {
        for (idx, arg) in lit.args.iter().enumerate() {
            if matches!(arg, Term::Variable(v) if v == var) {
                locs.insert(Location::new(&lit.name, idx));
            }
        }
    }
    locs
}

#[cfg(test)]
#[path = "tests/analysis.rs"]
mod tests;
