//! Meta-program transformation.
//!
//! Rewrites a program with symbolic constants into an ordinary program whose
//! single evaluation covers every admissible assignment at once. Each symbol
//! `x` gets a binding variable and a unary domain relation; relations carry
//! the binding variables of the symbols they depend on as extra trailing
//! columns.

use std::collections::{BTreeMap, BTreeSet};

use crate::analysis::{analyse, Domains};
use crate::error::{SymlogError, SymlogResult};
use crate::program::{is_intrinsic, Fact, Literal, Program, Rule};
use crate::symbol::{BaseType, SymbolicConstant};
use crate::term::{Assignment, Term};
use crate::trace::{debug, debug_span};

/// The appended columns of every relation, fixed once per transformation.
///
/// Rule-defined relations carry every symbol. Input relations carry only the
/// symbols their own facts mention, in global order. Intrinsics carry none.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    order: Vec<SymbolicConstant>,
    edb_columns: BTreeMap<String, Vec<SymbolicConstant>>,
    idb: BTreeSet<String>,
}

impl SymbolTable {
    pub fn new(program: &Program) -> Self {
        let order = program.symbols().to_vec();
        let idb: BTreeSet<String> = program
            .idb_relations()
            .into_iter()
            .map(str::to_string)
            .collect();

        let mut mentioned: BTreeMap<String, BTreeSet<&SymbolicConstant>> = BTreeMap::new();
        for fact in program.facts() {
            if idb.contains(fact.name()) {
                continue;
            }
            mentioned
                .entry(fact.name().to_string())
                .or_default()
                .extend(fact.symbols());
        }
        let edb_columns = mentioned
            .into_iter()
            .filter(|(_, syms)| !syms.is_empty())
            .map(|(rel, syms)| {
                let cols = order.iter().filter(|s| syms.contains(s)).cloned().collect();
                (rel, cols)
            })
            .collect();

        Self {
            order,
            edb_columns,
            idb,
        }
    }

    /// All symbols in assignment-column order.
    pub fn order(&self) -> &[SymbolicConstant] {
        &self.order
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Symbols whose binding variables are appended to `relation`.
    pub fn columns(&self, relation: &str) -> &[SymbolicConstant] {
        if is_intrinsic(relation) {
            &[]
        } else if self.idb.contains(relation) {
            &self.order
        } else {
            self.edb_columns
                .get(relation)
                .map(Vec::as_slice)
                .unwrap_or(&[])
        }
    }

    /// Separate an output tuple of a rule-defined relation into its real
    /// columns and the assignment carried in the trailing columns.
    pub fn split(&self, output: &Literal) -> SymlogResult<(Literal, Assignment)> {
        let n = self.order.len();
        if output.arity() < n {
            return Err(SymlogError::malformed(
                &output.name,
                format!(
                    "tuple has {} columns but {} symbols are in scope",
                    output.arity(),
                    n
                ),
            ));
        }
        let real = output.arity() - n;
        let mut assignment = Assignment::new();
        for (sym, arg) in self.order.iter().zip(&output.args[real..]) {
            let value = arg.value().ok_or_else(|| {
                SymlogError::malformed(&output.name, format!("non-ground column `{}`", arg))
            })?;
            assignment.insert(sym.clone(), value);
        }
        let literal = Literal {
            name: output.name.clone(),
            args: output.args[..real].iter().cloned().collect(),
            positive: output.positive,
        };
        Ok((literal, assignment))
    }

    fn binding_args(&self, relation: &str) -> impl Iterator<Item = Term> + '_ {
        self.columns(relation)
            .iter()
            .map(|s| Term::Variable(s.binding_variable()))
    }

    fn column_types(&self, relation: &str) -> impl Iterator<Item = BaseType> + '_ {
        self.columns(relation).iter().map(SymbolicConstant::kind)
    }
}

/// A transformed program together with what is needed to read its output.
#[derive(Debug, Clone)]
pub struct MetaProgram {
    pub program: Program,
    pub table: SymbolTable,
    pub domains: Domains,
}

/// Transform `program` into its meta-program.
///
/// A program without symbolic constants is returned unchanged.
pub fn transform(program: &Program) -> SymlogResult<MetaProgram> {
    let table = SymbolTable::new(program);
    if table.is_empty() {
        return Ok(MetaProgram {
            program: program.clone(),
            table,
            domains: Domains::new(),
        });
    }
    let _span = debug_span!("transform", symbols = table.order().len()).entered();

    let domains = analyse(program);

    let mut declarations: BTreeMap<String, Vec<BaseType>> = program
        .declarations()
        .iter()
        .map(|(name, types)| {
            let mut types = types.clone();
            types.extend(table.column_types(name));
            (name.clone(), types)
        })
        .collect();
    for sym in table.order() {
        declarations.insert(sym.domain_relation(), vec![sym.kind()]);
    }

    let domain_literal =
        |s: &SymbolicConstant| Literal::new(&s.domain_relation(), [Term::Variable(s.binding_variable())]);

    let mut rules: BTreeSet<Rule> = program
        .rules()
        .iter()
        .map(|rule| {
            let head = extend(&rule.head, table.binding_args(&rule.head.name));
            let body = rule
                .body
                .iter()
                .map(|lit| extend(lit, table.binding_args(&lit.name)))
                .chain(table.order().iter().map(domain_literal));
            Rule::new(head, body)
        })
        .collect();

    let mut facts: BTreeSet<Fact> = BTreeSet::new();
    for fact in program.facts() {
        let columns = table.columns(fact.name());
        if columns.is_empty() {
            facts.insert(fact.clone());
            continue;
        }
        let bound = Literal {
            args: fact
                .head
                .args
                .iter()
                .map(|t| match t {
                    Term::Symbolic(s) => Term::Variable(s.binding_variable()),
                    other => other.clone(),
                })
                .collect(),
            ..fact.head.clone()
        };
        let head = extend(&bound, table.binding_args(fact.name()));
        rules.insert(Rule::new(head, columns.iter().map(domain_literal)));
    }

    for (sym, values) in &domains {
        for value in values {
            facts.insert(Fact::new(Literal::new(
                &sym.domain_relation(),
                [Term::from(value.clone())],
            )));
        }
    }

    debug!(
        rules = rules.len(),
        facts = facts.len(),
        domain_values = domains.values().map(BTreeSet::len).sum::<usize>(),
        "meta-program built"
    );

    let meta = Program::new(
        declarations,
        program.inputs().clone(),
        program.outputs().clone(),
        rules,
        facts,
        program.symbols().to_vec(),
    )?;
    Ok(MetaProgram {
        program: meta,
        table,
        domains,
    })
}

fn extend(lit: &Literal, extra: impl Iterator<Item = Term>) -> Literal {
    let mut out = lit.clone();
    out.args.extend(extra);
    out
}

#[cfg(test)]
#[path = "tests/transform.rs"]
mod tests;
