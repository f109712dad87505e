use lasso::{Key, Spur, ThreadedRodeo};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

use crate::error::{SymlogError, SymlogResult};

/// Prefix shared by every name and value the crate generates.
pub const RESERVED_PREFIX: &str = "symlog_";
/// Encoded form of a symbolic string: `symlog_symbolic_<id>`.
pub const SYMBOLIC_PREFIX: &str = "symlog_symbolic_";
/// Binding variables: `symlog_binding_<id>`.
pub const BINDING_PREFIX: &str = "symlog_binding_";
/// Domain relations: `symlog_domain_<id>`.
pub const DOMAIN_PREFIX: &str = "symlog_domain_";

/// Number of symbolic numbers a single allocator can hand out.
pub const NUMBER_POOL_SIZE: u32 = 1000;
/// First encoded symbolic number. The pool sits just above `i32::MIN`.
pub const NUMBER_POOL_BASE: i64 = i32::MIN as i64 + 1;

/// True if `n` falls inside the range used to encode symbolic numbers.
pub fn in_number_pool(n: i64) -> bool {
    (NUMBER_POOL_BASE..NUMBER_POOL_BASE + NUMBER_POOL_SIZE as i64).contains(&n)
}

/// Column type of a relation position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BaseType {
    Symbol,
    Number,
}

impl fmt::Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BaseType::Symbol => write!(f, "symbol"),
            BaseType::Number => write!(f, "number"),
        }
    }
}

/// Session-unique identity of a symbolic constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SymbolId(u32);

impl SymbolId {
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// A placeholder for an unknown string or number.
///
/// Two symbolic constants are equal only if they came from the same
/// allocation. Ordering follows allocation order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SymbolicConstant {
    id: SymbolId,
    kind: BaseType,
    slot: u32,
    name: Arc<str>,
}

impl SymbolicConstant {
    pub fn id(&self) -> SymbolId {
        self.id
    }

    pub fn kind(&self) -> BaseType {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the variable that carries this symbol's value through joins.
    pub fn binding_variable(&self) -> String {
        format!("{}{}", BINDING_PREFIX, self.id.0)
    }

    /// Name of the unary relation enumerating this symbol's admissible values.
    pub fn domain_relation(&self) -> String {
        format!("{}{}", DOMAIN_PREFIX, self.id.0)
    }

    /// Encoded string form, for symbolic strings.
    pub fn encoded_string(&self) -> String {
        format!("{}{}", SYMBOLIC_PREFIX, self.id.0)
    }

    /// Encoded number form, for symbolic numbers.
    pub fn encoded_number(&self) -> i64 {
        NUMBER_POOL_BASE + self.slot as i64
    }
}

impl fmt::Display for SymbolicConstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Mints symbolic constants for one analysis session.
///
/// Guarantees:
/// - Every constant gets a distinct id; ids are never reused
/// - User-chosen names are unique within the allocator
/// - At most [`NUMBER_POOL_SIZE`] symbolic numbers exist
pub struct SymbolAllocator {
    names: ThreadedRodeo,
    next_number: Mutex<u32>,
    alloc: Mutex<()>,
}

impl SymbolAllocator {
    pub fn new() -> Self {
        Self {
            names: ThreadedRodeo::new(),
            next_number: Mutex::new(0),
            alloc: Mutex::new(()),
        }
    }

    /// Allocate a symbolic constant with a user-chosen name.
    pub fn named(&self, name: &str, kind: BaseType) -> SymlogResult<SymbolicConstant> {
        let _guard = self.alloc.lock();
        if self.names.contains(name) {
            return Err(SymlogError::DuplicateSymbol {
                name: name.to_string(),
            });
        }
        self.mint(name, kind)
    }

    /// Allocate a symbolic constant with a generated name.
    pub fn fresh(&self, kind: BaseType) -> SymlogResult<SymbolicConstant> {
        let _guard = self.alloc.lock();
        let mut n = self.names.len();
        let mut name = format!("sym{}", n);
        while self.names.contains(name.as_str()) {
            n += 1;
            name = format!("sym{}", n);
        }
        self.mint(&name, kind)
    }

    fn mint(&self, name: &str, kind: BaseType) -> SymlogResult<SymbolicConstant> {
        let slot = match kind {
            BaseType::Symbol => 0,
            BaseType::Number => {
                let mut next = self.next_number.lock();
                if *next >= NUMBER_POOL_SIZE {
                    return Err(SymlogError::PoolExhausted {
                        capacity: NUMBER_POOL_SIZE,
                    });
                }
                *next += 1;
                *next - 1
            }
        };
        let spur: Spur = self.names.get_or_intern(name);
        Ok(SymbolicConstant {
            id: SymbolId(spur.into_usize() as u32),
            kind,
            slot,
            name: Arc::from(name),
        })
    }

    /// Name of the constant with the given id, if this allocator minted it.
    pub fn resolve(&self, id: SymbolId) -> Option<&str> {
        let spur = Spur::try_from_usize(id.0 as usize)?;
        self.names.try_resolve(&spur)
    }

    /// Number of constants allocated so far.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for SymbolAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "tests/symbol.rs"]
mod tests;
