use std::collections::BTreeMap;
use std::fmt;

use crate::symbol::{BaseType, SymbolicConstant};

/// A concrete value as the evaluator sees it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Constant {
    String(String),
    Number(i64),
}

impl Constant {
    pub fn base_type(&self) -> BaseType {
        match self {
            Constant::String(_) => BaseType::Symbol,
            Constant::Number(_) => BaseType::Number,
        }
    }

    /// Unquoted text, as it appears in a fact file column.
    pub fn raw(&self) -> String {
        match self {
            Constant::String(s) => s.clone(),
            Constant::Number(n) => n.to_string(),
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::String(s) => {
                write!(f, "\"")?;
                for ch in s.chars() {
                    match ch {
                        '"' => write!(f, "\\\"")?,
                        '\\' => write!(f, "\\\\")?,
                        _ => write!(f, "{}", ch)?,
                    }
                }
                write!(f, "\"")
            }
            Constant::Number(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for Constant {
    fn from(s: &str) -> Self {
        Constant::String(s.to_string())
    }
}

impl From<i64> for Constant {
    fn from(n: i64) -> Self {
        Constant::Number(n)
    }
}

/// A ground value: either concrete or a still-unresolved symbol.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Value {
    Constant(Constant),
    Symbolic(SymbolicConstant),
}

impl Value {
    pub fn base_type(&self) -> BaseType {
        match self {
            Value::Constant(c) => c.base_type(),
            Value::Symbolic(s) => s.kind(),
        }
    }

    /// The constant the evaluator stores for this value.
    pub fn encode(&self) -> Constant {
        match self {
            Value::Constant(c) => c.clone(),
            Value::Symbolic(s) => match s.kind() {
                BaseType::Symbol => Constant::String(s.encoded_string()),
                BaseType::Number => Constant::Number(s.encoded_number()),
            },
        }
    }

    pub fn as_symbolic(&self) -> Option<&SymbolicConstant> {
        match self {
            Value::Symbolic(s) => Some(s),
            Value::Constant(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Constant(c) => write!(f, "{}", c),
            Value::Symbolic(s) => write!(f, "{}", s),
        }
    }
}

impl From<Constant> for Value {
    fn from(c: Constant) -> Self {
        Value::Constant(c)
    }
}

impl From<SymbolicConstant> for Value {
    fn from(s: SymbolicConstant) -> Self {
        Value::Symbolic(s)
    }
}

/// A value chosen for each of a set of symbolic constants.
pub type Assignment = BTreeMap<SymbolicConstant, Value>;

/// Argument of a literal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Term {
    Variable(String),
    Wildcard,
    Constant(Constant),
    Symbolic(SymbolicConstant),
}

impl Term {
    pub fn var(name: &str) -> Self {
        Term::Variable(name.to_string())
    }

    pub fn string(s: &str) -> Self {
        Term::Constant(Constant::String(s.to_string()))
    }

    pub fn number(n: i64) -> Self {
        Term::Constant(Constant::Number(n))
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Term::Variable(_))
    }

    pub fn is_ground(&self) -> bool {
        matches!(self, Term::Constant(_) | Term::Symbolic(_))
    }

    /// The value of a ground term.
    pub fn value(&self) -> Option<Value> {
        match self {
            Term::Constant(c) => Some(Value::Constant(c.clone())),
            Term::Symbolic(s) => Some(Value::Symbolic(s.clone())),
            Term::Variable(_) | Term::Wildcard => None,
        }
    }

    pub fn as_symbolic(&self) -> Option<&SymbolicConstant> {
        match self {
            Term::Symbolic(s) => Some(s),
            _ => None,
        }
    }

    /// Rendering for evaluator text: symbols appear in their encoded form.
    pub fn encoded(&self) -> EncodedTerm<'_> {
        EncodedTerm(self)
    }
}

impl From<Value> for Term {
    fn from(v: Value) -> Self {
        match v {
            Value::Constant(c) => Term::Constant(c),
            Value::Symbolic(s) => Term::Symbolic(s),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Variable(name) => write!(f, "{}", name),
            Term::Wildcard => write!(f, "_"),
            Term::Constant(c) => write!(f, "{}", c),
            Term::Symbolic(s) => write!(f, "{}", s),
        }
    }
}

pub struct EncodedTerm<'a>(&'a Term);

impl fmt::Display for EncodedTerm<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Term::Symbolic(s) => write!(f, "{}", Value::Symbolic(s.clone()).encode()),
            other => write!(f, "{}", other),
        }
    }
}
