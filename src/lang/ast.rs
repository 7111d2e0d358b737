use serde::{Deserialize, Serialize};

/// Identifier of a syntax-tree node.
///
/// Ids are assigned by the parser in visitation order and key the per-node
/// side tables built during analysis (most importantly the node→scope map).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// Source position of a token or node, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    /// Line number, starting at 1.
    pub line: u32,
    /// Column number, starting at 1.
    pub column: u32,
}

impl Span {
    /// Construct a span from a line/column pair.
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// Type annotation as written in source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeName {
    /// 64-bit signed integer.
    Int,
    /// 64-bit float.
    Float,
    /// UTF-8 string.
    Str,
    /// Boolean.
    Bool,
    /// Calendar date.
    Date,
    /// Time of day.
    Time,
    /// Combined date and time.
    DateTime,
}

/// A parsed behavior program: the formal parameter list and the top-level
/// block, plus the original source retained for error reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    /// Formal parameters declared in the behavior header.
    pub params: Vec<Param>,
    /// The single top-level block forming the program body.
    pub body: Block,
    /// Original source text.
    pub source: String,
}

/// A formal parameter of a behavior or function.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Param {
    /// Parameter name.
    pub name: String,
    /// Declared type.
    pub ty: TypeName,
    /// Position of the parameter name.
    pub span: Span,
}

/// A brace-delimited (or top-level) statement sequence. Blocks introduce
/// scopes during analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    /// Node id.
    pub id: NodeId,
    /// Statements in source order.
    pub statements: Vec<Stmt>,
    /// Position of the block's opening token.
    pub span: Span,
}

/// A statement with its node id and position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stmt {
    /// Node id.
    pub id: NodeId,
    /// Position of the statement's first token.
    pub span: Span,
    /// The statement itself.
    pub kind: StmtKind,
}

/// Statement forms of the behavior language.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StmtKind {
    /// `import a.b.c [as alias]` – reference to a behavior on another entity.
    Import {
        /// Dotted path segments.
        path: Vec<String>,
        /// Optional visible alias.
        alias: Option<String>,
    },
    /// `unit celsius` – unit-of-measure declaration.
    Unit {
        /// Unit name.
        name: String,
    },
    /// `attribute name: type[len] [in unit] [trend] [= init]` – process-wide
    /// named value, always global.
    Attribute {
        /// Attribute name.
        name: String,
        /// Declared element type.
        ty: TypeName,
        /// Array length when declaring an array attribute.
        len: Option<usize>,
        /// Unit-of-measure suffix.
        unit: Option<String>,
        /// Whether historical values are retained for time-window queries.
        trend: bool,
        /// Optional initializer (scalar attributes only).
        init: Option<Expr>,
    },
    /// `var name: type[len] [= init]` – lexically scoped variable.
    Var {
        /// Variable name.
        name: String,
        /// Declared element type.
        ty: TypeName,
        /// Array length when declaring an array variable.
        len: Option<usize>,
        /// Optional initializer (scalar variables only).
        init: Option<Expr>,
    },
    /// `timer name <amount> <unit> -> target` or `repeat …` – scheduler pack
    /// declaration. Amount and unit ride along as raw tokens: the definition
    /// phase owns their diagnostics, not the grammar.
    Timer {
        /// Timer name.
        name: String,
        /// Raw amount token.
        amount: String,
        /// Raw time-unit token, when present.
        unit: Option<String>,
        /// True for `repeat`, false for `timer`.
        repeating: bool,
        /// Name of the referenced import.
        target: String,
    },
    /// `display name on "device"` – display-device declaration.
    Display {
        /// Display name.
        name: String,
        /// Device identifier in the external catalog.
        device: String,
    },
    /// `function name(params) [: ret] { … }` – function declaration.
    Function {
        /// Function name.
        name: String,
        /// Formal parameters.
        params: Vec<Param>,
        /// Declared return type, when present.
        ret: Option<TypeName>,
        /// Function body.
        body: Block,
    },
    /// `target = expr` or `target[index] = expr`.
    Assign {
        /// Assignment target.
        target: AssignTarget,
        /// Assigned expression.
        value: Expr,
    },
    /// `state = expr` – equipment-state transition.
    StateAssign {
        /// Expression producing the state token.
        value: Expr,
    },
    /// `if … { } elsif … { } else { }` – ordered condition arms.
    If {
        /// Condition arms, evaluated in order.
        arms: Vec<IfArm>,
        /// Optional else block.
        else_block: Option<Block>,
    },
    /// `start name` – arm a declared timer for the external scheduler.
    Start {
        /// Timer name.
        name: String,
    },
    /// `show name expr` – push a message to a declared display.
    Show {
        /// Display name.
        name: String,
        /// Message expression.
        value: Expr,
    },
    /// `return [expr]`.
    Return {
        /// Returned expression, when present.
        value: Option<Expr>,
    },
    /// A bare call expression used as a statement.
    Expr {
        /// The call expression.
        expr: Expr,
    },
}

/// Left-hand side of an assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AssignTarget {
    /// Plain name target.
    Name {
        /// Target name.
        name: String,
    },
    /// Indexed array-element target.
    Index {
        /// Array name.
        name: String,
        /// Index expression.
        index: Expr,
    },
}

/// One `if`/`elsif` arm.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IfArm {
    /// Guard expression.
    pub condition: Expr,
    /// Block executed when the guard is true.
    pub block: Block,
}

/// An expression with its node id and position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expr {
    /// Node id.
    pub id: NodeId,
    /// Position of the expression's first token.
    pub span: Span,
    /// The expression itself.
    pub kind: ExprKind,
}

/// Expression forms of the behavior language.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExprKind {
    /// Integer literal.
    Int(i64),
    /// Float literal.
    Float(f64),
    /// String literal.
    Str(String),
    /// Boolean literal.
    Bool(bool),
    /// Variable or attribute read.
    Name(String),
    /// The reserved `state` read.
    State,
    /// Array-element read.
    Index {
        /// Array name.
        name: String,
        /// Index expression.
        index: Box<Expr>,
    },
    /// Unary operation.
    Unary {
        /// Operator.
        op: UnaryOp,
        /// Operand.
        operand: Box<Expr>,
    },
    /// Binary operation.
    Binary {
        /// Operator.
        op: BinaryOp,
        /// Left operand.
        lhs: Box<Expr>,
        /// Right operand.
        rhs: Box<Expr>,
    },
    /// Function or built-in call.
    Call {
        /// Callee name.
        callee: String,
        /// Argument expressions.
        args: Vec<Expr>,
    },
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    /// Numeric negation.
    Neg,
    /// Boolean negation.
    Not,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    /// Addition / string concatenation.
    Add,
    /// Subtraction.
    Sub,
    /// Multiplication.
    Mul,
    /// Division (always promotes to float).
    Div,
    /// Modulo (always promotes to float).
    Mod,
    /// Less-than.
    Lt,
    /// Less-or-equal.
    Le,
    /// Greater-than.
    Gt,
    /// Greater-or-equal.
    Ge,
    /// Equality.
    Eq,
    /// Inequality.
    Ne,
    /// Boolean conjunction.
    And,
    /// Boolean disjunction.
    Or,
}
