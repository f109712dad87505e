//! Program IR: literals, rules, facts and whole programs.
//!
//! Every value here is immutable once built. Transformations return new
//! values rather than editing in place.

use smallvec::SmallVec;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Write as _};

use crate::error::{SymlogError, SymlogResult};
use crate::symbol::{BaseType, SymbolicConstant};
use crate::term::{Assignment, Constant, Term, Value};

/// Relations built into the evaluator. They need no declaration and never
/// receive appended columns.
pub const INTRINSICS: [&str; 2] = ["contains", "substr"];

pub fn is_intrinsic(name: &str) -> bool {
    INTRINSICS.contains(&name)
}

pub type Args = SmallVec<[Term; 4]>;

/// A possibly negated predicate application.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Literal {
    pub name: String,
    pub args: Args,
    pub positive: bool,
}

impl Literal {
    pub fn new(name: &str, args: impl IntoIterator<Item = Term>) -> Self {
        Self {
            name: name.to_string(),
            args: args.into_iter().collect(),
            positive: true,
        }
    }

    pub fn negated(name: &str, args: impl IntoIterator<Item = Term>) -> Self {
        Self {
            positive: false,
            ..Self::new(name, args)
        }
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }

    pub fn is_ground(&self) -> bool {
        self.args.iter().all(Term::is_ground)
    }

    /// Symbolic constants among the arguments, in argument order.
    pub fn symbols(&self) -> impl Iterator<Item = &SymbolicConstant> {
        self.args.iter().filter_map(Term::as_symbolic)
    }

    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.args.iter().filter_map(|t| match t {
            Term::Variable(v) => Some(v.as_str()),
            _ => None,
        })
    }

    /// Replace symbolic arguments bound in `assignment`.
    pub fn substitute(&self, assignment: &Assignment) -> Literal {
        let args = self
            .args
            .iter()
            .map(|t| match t {
                Term::Symbolic(s) => assignment
                    .get(s)
                    .map(|v| Term::from(v.clone()))
                    .unwrap_or_else(|| t.clone()),
                _ => t.clone(),
            })
            .collect();
        Literal {
            name: self.name.clone(),
            args,
            positive: self.positive,
        }
    }

    /// Values of a ground literal.
    pub fn values(&self) -> Option<Vec<Value>> {
        self.args.iter().map(Term::value).collect()
    }

    /// Rendering with symbolic values in their encoded form.
    pub fn encoded(&self) -> EncodedLiteral<'_> {
        EncodedLiteral(self)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.positive {
            write!(f, "!")?;
        }
        write!(f, "{}(", self.name)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", arg)?;
        }
        write!(f, ")")
    }
}

pub struct EncodedLiteral<'a>(&'a Literal);

impl fmt::Display for EncodedLiteral<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lit = self.0;
        if !lit.positive {
            write!(f, "!")?;
        }
        write!(f, "{}(", lit.name)?;
        for (i, arg) in lit.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", arg.encoded())?;
        }
        write!(f, ")")
    }
}

/// `head :- body.` with a non-empty body.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Rule {
    pub head: Literal,
    pub body: Vec<Literal>,
}

impl Rule {
    pub fn new(head: Literal, body: impl IntoIterator<Item = Literal>) -> Self {
        Self {
            head,
            body: body.into_iter().collect(),
        }
    }

    pub fn literals(&self) -> impl Iterator<Item = &Literal> {
        std::iter::once(&self.head).chain(self.body.iter())
    }

    fn write_with(
        &self,
        f: &mut fmt::Formatter<'_>,
        lit: impl Fn(&Literal, &mut fmt::Formatter<'_>) -> fmt::Result,
    ) -> fmt::Result {
        lit(&self.head, f)?;
        write!(f, " :- ")?;
        for (i, b) in self.body.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            lit(b, f)?;
        }
        write!(f, ".")
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_with(f, |l, f| write!(f, "{}", l))
    }
}

/// A ground input tuple. `symbolic_sign` marks a fact whose presence is
/// itself unknown.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fact {
    pub head: Literal,
    pub symbolic_sign: bool,
}

impl Fact {
    pub fn new(head: Literal) -> Self {
        Self {
            head,
            symbolic_sign: false,
        }
    }

    /// A fact whose presence is unknown.
    pub fn symbolic(head: Literal) -> Self {
        Self {
            head,
            symbolic_sign: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.head.name
    }

    pub fn symbols(&self) -> impl Iterator<Item = &SymbolicConstant> {
        self.head.symbols()
    }

    /// Concretize symbolic arguments bound in `assignment`.
    pub fn substitute(&self, assignment: &Assignment) -> Fact {
        Fact {
            head: self.head.substitute(assignment),
            symbolic_sign: self.symbolic_sign,
        }
    }

    /// Replace chosen concrete arguments by symbolic constants.
    pub fn substitute_constants(&self, replace: &BTreeMap<Constant, SymbolicConstant>) -> Fact {
        let args = self
            .head
            .args
            .iter()
            .map(|t| match t {
                Term::Constant(c) => replace
                    .get(c)
                    .map(|s| Term::Symbolic(s.clone()))
                    .unwrap_or_else(|| t.clone()),
                _ => t.clone(),
            })
            .collect();
        Fact {
            head: Literal {
                name: self.head.name.clone(),
                args,
                positive: true,
            },
            symbolic_sign: self.symbolic_sign,
        }
    }
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.", self.head)
    }
}

/// A complete program: declarations, I/O directives, rules, facts and the
/// symbolic constants its facts mention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    declarations: BTreeMap<String, Vec<BaseType>>,
    inputs: BTreeSet<String>,
    outputs: BTreeSet<String>,
    rules: BTreeSet<Rule>,
    facts: BTreeSet<Fact>,
    symbols: Vec<SymbolicConstant>,
}

impl Program {
    /// Assemble a program, checking every literal against the declarations.
    pub fn new(
        declarations: BTreeMap<String, Vec<BaseType>>,
        inputs: BTreeSet<String>,
        outputs: BTreeSet<String>,
        rules: BTreeSet<Rule>,
        facts: BTreeSet<Fact>,
        symbols: Vec<SymbolicConstant>,
    ) -> SymlogResult<Self> {
        let program = Self {
            declarations,
            inputs,
            outputs,
            rules,
            facts,
            symbols,
        };
        program.check_declarations()?;
        Ok(program)
    }

    fn check_declarations(&self) -> SymlogResult<()> {
        let literals = self
            .rules
            .iter()
            .flat_map(Rule::literals)
            .chain(self.facts.iter().map(|f| &f.head));
        for lit in literals {
            if is_intrinsic(&lit.name) {
                continue;
            }
            let Some(types) = self.declarations.get(&lit.name) else {
                return Err(SymlogError::Undeclared {
                    relation: lit.name.clone(),
                });
            };
            if types.len() != lit.arity() {
                return Err(SymlogError::Arity {
                    relation: lit.name.clone(),
                    expected: types.len(),
                    found: lit.arity(),
                });
            }
        }
        Ok(())
    }

    pub fn declarations(&self) -> &BTreeMap<String, Vec<BaseType>> {
        &self.declarations
    }

    pub fn declaration(&self, relation: &str) -> Option<&[BaseType]> {
        self.declarations.get(relation).map(Vec::as_slice)
    }

    pub fn inputs(&self) -> &BTreeSet<String> {
        &self.inputs
    }

    pub fn outputs(&self) -> &BTreeSet<String> {
        &self.outputs
    }

    pub fn rules(&self) -> &BTreeSet<Rule> {
        &self.rules
    }

    pub fn facts(&self) -> &BTreeSet<Fact> {
        &self.facts
    }

    pub fn symbols(&self) -> &[SymbolicConstant] {
        &self.symbols
    }

    /// Relations defined by at least one rule.
    pub fn idb_relations(&self) -> BTreeSet<&str> {
        self.rules.iter().map(|r| r.head.name.as_str()).collect()
    }

    /// Declared relations that no rule defines.
    pub fn edb_relations(&self) -> BTreeSet<&str> {
        let idb = self.idb_relations();
        self.declarations
            .keys()
            .map(String::as_str)
            .filter(|name| !idb.contains(name))
            .collect()
    }

    /// Same declarations, directives and rules over a different fact set.
    /// The symbol list keeps the existing order and follows the new facts.
    pub fn with_facts(&self, facts: impl IntoIterator<Item = Fact>) -> Program {
        let facts: BTreeSet<Fact> = facts.into_iter().collect();
        let present: BTreeSet<&SymbolicConstant> = facts.iter().flat_map(Fact::symbols).collect();
        let mut symbols: Vec<SymbolicConstant> = self
            .symbols
            .iter()
            .filter(|s| present.contains(s))
            .cloned()
            .collect();
        for sym in present {
            if !symbols.contains(sym) {
                symbols.push(sym.clone());
            }
        }
        Program {
            declarations: self.declarations.clone(),
            inputs: self.inputs.clone(),
            outputs: self.outputs.clone(),
            rules: self.rules.clone(),
            facts,
            symbols,
        }
    }

    /// Same program with a different set of output relations.
    pub fn with_outputs(&self, outputs: impl IntoIterator<Item = String>) -> Program {
        Program {
            outputs: outputs.into_iter().collect(),
            ..self.clone()
        }
    }

    /// Evaluator source text. Facts for which `inline` is false are left
    /// out, so the caller can supply them through fact files instead.
    pub fn render_souffle(&self, inline: impl Fn(&Fact) -> bool) -> String {
        let mut out = String::new();
        for (name, types) in &self.declarations {
            let _ = write!(out, ".decl {}(", name);
            for (i, ty) in types.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                let _ = write!(out, "v{}:{}", i, ty);
            }
            out.push_str(")\n");
        }
        for name in &self.inputs {
            let _ = writeln!(out, ".input {}", name);
        }
        for name in &self.outputs {
            let _ = writeln!(out, ".output {}", name);
        }
        for rule in &self.rules {
            let _ = writeln!(out, "{}", EncodedRule(rule));
        }
        for fact in self.facts.iter().filter(|f| inline(f)) {
            let _ = writeln!(out, "{}.", fact.head.encoded());
        }
        out
    }
}

struct EncodedRule<'a>(&'a Rule);

impl fmt::Display for EncodedRule<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.write_with(f, |l, f| write!(f, "{}", l.encoded()))
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_souffle(|_| true))
    }
}

#[cfg(test)]
#[path = "tests/program.rs"]
mod tests;
