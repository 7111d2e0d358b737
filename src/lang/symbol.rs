use serde::{Deserialize, Serialize};

use crate::lang::ast::NodeId;
use crate::runtime::value::{TimeUnit, ValueType};

/// Name of the reserved program token. The definition phase always registers
/// exactly one [`SymbolKind::Program`] symbol under this name, and the
/// evaluator resolves it to locate the entry point.
pub const PROGRAM_SYMBOL: &str = "behavior";

/// Reserved name under which the equipment-state singleton is tracked, both
/// as a symbol and as a slot in the global memory space.
pub const STATE_SYMBOL: &str = "state";

/// A named entry in a scope's symbol table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    /// Symbol name as resolvable in source.
    pub name: String,
    /// What the symbol is.
    pub kind: SymbolKind,
    /// Declared value type; [`ValueType::Void`] for kinds without one.
    pub declared_type: ValueType,
    /// Unit-of-measure tag, attributes only.
    pub unit_of_measure: Option<String>,
    /// Whether historical values are retained for time-window queries.
    pub trend: bool,
}

impl Symbol {
    /// Construct a symbol with no unit tag and no trend flag.
    pub fn new(name: impl Into<String>, kind: SymbolKind, declared_type: ValueType) -> Self {
        Self {
            name: name.into(),
            kind,
            declared_type,
            unit_of_measure: None,
            trend: false,
        }
    }

    /// True for the callable kinds.
    pub fn is_callable(&self) -> bool {
        matches!(
            self.kind,
            SymbolKind::Function { .. } | SymbolKind::Program { .. }
        )
    }
}

/// The kinds of symbols the behavior language distinguishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SymbolKind {
    /// Lexically scoped variable or parameter.
    Variable,
    /// Process-wide scalar value, always global.
    Attribute,
    /// Process-wide fixed-length array, always global.
    ArrayAttribute {
        /// Fixed length.
        len: usize,
    },
    /// Lexically scoped fixed-length array.
    Array {
        /// Fixed length.
        len: usize,
    },
    /// Unit-of-measure declaration, always global.
    UnitOfMeasure,
    /// Scheduler pack: fires the targeted behaviors after the given interval.
    Timer {
        /// Interval unit.
        unit: TimeUnit,
        /// Interval amount.
        amount: i64,
        /// True when declared with `repeat`.
        repeating: bool,
        /// Fully-qualified target segments, populated by the reference phase
        /// from the referenced import.
        targets: Vec<String>,
    },
    /// Display device binding.
    Display {
        /// Device identifier in the external catalog.
        device: String,
    },
    /// The equipment-state singleton, defined lazily on the first
    /// state-changing statement.
    State,
    /// Reference to a behavior defined on another entity.
    Import {
        /// Dotted path segments.
        path: Vec<String>,
        /// Optional visible alias.
        alias: Option<String>,
    },
    /// User-declared function.
    Function {
        /// Formal parameter signatures.
        params: Vec<ParamSig>,
        /// Declared return type, when present.
        ret: Option<ValueType>,
        /// Node id of the function body block.
        body: NodeId,
    },
    /// The behavior entry point.
    Program {
        /// Formal parameter signatures.
        params: Vec<ParamSig>,
        /// Node id of the program body block.
        body: NodeId,
    },
}

/// Signature of a formal parameter, carried on callable symbols.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSig {
    /// Parameter name.
    pub name: String,
    /// Declared type.
    pub ty: ValueType,
}
