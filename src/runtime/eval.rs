//! Tree-walking evaluator for analyzed behavior programs.
//!
//! The interpreter consumes the syntax tree, the scope arena with its
//! node→scope map, the entity facade, and the actual parameter values. It
//! mutates the global memory space and collects the run's observable effects
//! (attribute writes, a state transition, timer registrations, display
//! messages) into an [`Outcome`].
//!
//! Analysis diagnostics accumulate; everything here fails fast: the first
//! runtime defect aborts the run with an [`EvalError`].

use std::collections::HashMap;

use thiserror::Error;

use crate::lang::ast::{
    AssignTarget, BinaryOp, Block, Expr, ExprKind, NodeId, Program, Stmt, StmtKind, UnaryOp,
};
use crate::lang::definition::Analysis;
use crate::lang::scope::GLOBAL_SCOPE;
use crate::lang::symbol::{PROGRAM_SYMBOL, ParamSig, STATE_SYMBOL, Symbol, SymbolKind};

use super::builtins;
use super::facade::{EntityFacade, EntityId};
use super::memory::{CallStack, MemorySpace};
use super::outcome::{DisplayMessage, Outcome, TimerRegistration};
use super::value::{EquipmentState, Value, ValueType, coerce_assign};

/// Tolerance for float equality.
pub const FLOAT_EQ_EPSILON: f64 = 1e-11;

/// Guard against runaway recursion through user functions.
const MAX_CALL_DEPTH: usize = 128;

/// A fatal runtime defect. The first one aborts the whole run.
#[derive(Debug, Clone, Error)]
pub enum EvalError {
    /// Operand or assignment types do not fit.
    #[error("type error: {0}")]
    Type(String),

    /// Attributes with different units of measure cannot be assigned to each
    /// other; unit conversion is not implemented.
    #[error("unit mismatch: '{left}' is in {left_unit:?} but '{right}' is in {right_unit:?}")]
    UnitMismatch {
        /// Assignment target attribute.
        left: String,
        /// Target unit tag.
        left_unit: Option<String>,
        /// Assigned attribute.
        right: String,
        /// Source unit tag.
        right_unit: Option<String>,
    },

    /// A name failed to resolve at runtime. Should not occur when the
    /// reference phase passed; checked defensively.
    #[error("'{0}' is not defined")]
    Undefined(String),

    /// The callee is not a function.
    #[error("'{0}' is not callable")]
    NotCallable(String),

    /// Wrong number of call arguments.
    #[error("call to '{name}' expected {expected} argument(s), got {got}")]
    Arity {
        /// Callee name.
        name: String,
        /// Declared parameter count.
        expected: usize,
        /// Supplied argument count.
        got: usize,
    },

    /// Array index outside `[0, len)`.
    #[error("index {index} out of range for '{name}' (length {len})")]
    IndexOutOfRange {
        /// Array name.
        name: String,
        /// Requested index.
        index: i64,
        /// Array length.
        len: usize,
    },

    /// Token index beyond the available token count.
    #[error("token index {index} out of range ({count} token(s))")]
    TokenOutOfRange {
        /// Requested index.
        index: i64,
        /// Available token count.
        count: usize,
    },

    /// A concrete value was structurally required but the operand is absent.
    #[error("missing value: {0}")]
    Absent(String),

    /// A `start` statement hit a timer whose import chain was never
    /// populated.
    #[error("timer '{0}' has no resolved targets")]
    UnresolvedTimer(String),

    /// Recursion exceeded the interpreter's call-depth guard.
    #[error("call depth exceeded ({0})")]
    CallDepth(usize),
}

/// Convenience result alias for evaluator operations.
pub type EvalResult<T> = std::result::Result<T, EvalError>;

/// Result of evaluating a block: either it ran to completion or a `return`
/// unwound through it. Explicit, so non-local return needs no exception
/// machinery.
enum Flow {
    Normal,
    Return(Value),
}

/// The tree-walking interpreter for one behavior run.
pub struct Interpreter<'a> {
    analysis: &'a Analysis,
    entity: EntityId,
    facade: &'a dyn EntityFacade,
    globals: MemorySpace,
    stack: CallStack,
    blocks: HashMap<NodeId, &'a Block>,
    timers: Vec<TimerRegistration>,
    displays: Vec<DisplayMessage>,
}

impl<'a> Interpreter<'a> {
    /// Create an interpreter for an analyzed program.
    pub fn new(
        program: &'a Program,
        analysis: &'a Analysis,
        entity: EntityId,
        facade: &'a dyn EntityFacade,
    ) -> Self {
        let mut blocks = HashMap::new();
        index_block(&program.body, &mut blocks);
        Self {
            analysis,
            entity,
            facade,
            globals: MemorySpace::new("global"),
            stack: CallStack::new(),
            blocks,
            timers: Vec::new(),
            displays: Vec::new(),
        }
    }

    /// Execute the program entry point with the given actual parameters and
    /// collect the observable effects.
    pub fn run(mut self, params: &[Value]) -> EvalResult<Outcome> {
        tracing::debug!(entity = %self.entity, "executing behavior program");
        let symbol = self
            .analysis
            .scopes
            .resolve(GLOBAL_SCOPE, PROGRAM_SYMBOL)
            .cloned()
            .ok_or_else(|| EvalError::Undefined(PROGRAM_SYMBOL.to_string()))?;
        let SymbolKind::Program {
            params: formals,
            body,
        } = symbol.kind
        else {
            return Err(EvalError::NotCallable(PROGRAM_SYMBOL.to_string()));
        };

        let space = self.bind_params(PROGRAM_SYMBOL, &formals, params)?;
        self.stack.push(space);
        let block = self.body_block(body)?;
        // A `return` inside the program body stops execution but its value
        // is discarded; the run's outputs are the observable effects only.
        let _ = self.eval_block(block)?;
        self.stack.pop();

        Ok(self.into_outcome())
    }

    fn body_block(&self, id: NodeId) -> EvalResult<&'a Block> {
        self.blocks
            .get(&id)
            .copied()
            .ok_or_else(|| EvalError::Type("callable body is missing".to_string()))
    }

    fn bind_params(
        &mut self,
        name: &str,
        formals: &[ParamSig],
        actuals: &[Value],
    ) -> EvalResult<MemorySpace> {
        if formals.len() != actuals.len() {
            return Err(EvalError::Arity {
                name: name.to_string(),
                expected: formals.len(),
                got: actuals.len(),
            });
        }
        let mut space = MemorySpace::new(name);
        for (formal, actual) in formals.iter().zip(actuals) {
            let value = coerce_assign(formal.ty, actual.clone()).ok_or_else(|| {
                EvalError::Type(format!(
                    "parameter '{}' expects {}, got {}",
                    formal.name,
                    formal.ty,
                    actual.type_name()
                ))
            })?;
            space.set(&formal.name, value);
        }
        Ok(space)
    }

    fn into_outcome(self) -> Outcome {
        let mut outcome = Outcome::default();
        for symbol in self.analysis.scopes.scope(GLOBAL_SCOPE).symbols() {
            if matches!(
                symbol.kind,
                SymbolKind::Attribute | SymbolKind::ArrayAttribute { .. }
            ) {
                if let Some(value) = self.globals.get(&symbol.name) {
                    outcome
                        .attributes
                        .insert(symbol.name.clone(), value.clone());
                }
            }
        }
        outcome.state = match self.globals.get(STATE_SYMBOL) {
            Some(Value::State(state)) => Some(*state),
            _ => None,
        };
        outcome.timers = self.timers;
        outcome.displays = self.displays;
        outcome
    }

    fn eval_block(&mut self, block: &'a Block) -> EvalResult<Flow> {
        for stmt in &block.statements {
            if let Flow::Return(value) = self.eval_stmt(stmt)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    fn eval_stmt(&mut self, stmt: &'a Stmt) -> EvalResult<Flow> {
        match &stmt.kind {
            // Declarations without runtime effect: symbols were registered
            // during analysis.
            StmtKind::Import { .. }
            | StmtKind::Unit { .. }
            | StmtKind::Timer { .. }
            | StmtKind::Display { .. }
            | StmtKind::Function { .. } => Ok(Flow::Normal),

            StmtKind::Attribute {
                name,
                ty,
                len,
                init,
                ..
            } => {
                let declared = ValueType::from_type_name(*ty);
                let value = self.declaration_value(name, declared, *len, init.as_ref())?;
                self.globals.set(name, value);
                Ok(Flow::Normal)
            }

            StmtKind::Var {
                name,
                ty,
                len,
                init,
            } => {
                let declared = ValueType::from_type_name(*ty);
                let value = self.declaration_value(name, declared, *len, init.as_ref())?;
                self.local_space_mut().set(name, value);
                Ok(Flow::Normal)
            }

            StmtKind::Assign { target, value } => {
                self.eval_assign(stmt, target, value)?;
                Ok(Flow::Normal)
            }

            StmtKind::StateAssign { value } => {
                let value = self.eval_expr(value)?;
                let state = match value {
                    Value::Str(token) => {
                        let state = EquipmentState::from_write_token(&token);
                        if state == EquipmentState::Undefined {
                            tracing::warn!(token = %token, "unknown state token, storing undefined");
                        }
                        state
                    }
                    Value::State(state) => state,
                    other => {
                        return Err(EvalError::Type(format!(
                            "state expects a state token, got {}",
                            other.type_name()
                        )));
                    }
                };
                self.globals.set(STATE_SYMBOL, Value::State(state));
                Ok(Flow::Normal)
            }

            StmtKind::If { arms, else_block } => {
                for arm in arms {
                    match self.eval_expr(&arm.condition)? {
                        Value::Bool(true) => return self.eval_block(&arm.block),
                        Value::Bool(false) => {}
                        Value::Void => {
                            return Err(EvalError::Absent("if guard has no value".to_string()));
                        }
                        other => {
                            return Err(EvalError::Type(format!(
                                "if guard expects bool, got {}",
                                other.type_name()
                            )));
                        }
                    }
                }
                if let Some(block) = else_block {
                    return self.eval_block(block);
                }
                Ok(Flow::Normal)
            }

            StmtKind::Start { name } => {
                let scope = self.analysis.scope_of(stmt.id);
                let symbol = self
                    .analysis
                    .scopes
                    .resolve(scope, name)
                    .cloned()
                    .ok_or_else(|| EvalError::Undefined(name.clone()))?;
                let SymbolKind::Timer {
                    unit,
                    amount,
                    repeating,
                    targets,
                } = symbol.kind
                else {
                    return Err(EvalError::Type(format!("'{}' is not a timer", name)));
                };
                if targets.is_empty() {
                    return Err(EvalError::UnresolvedTimer(name.clone()));
                }
                self.timers.push(TimerRegistration {
                    name: name.clone(),
                    unit,
                    amount,
                    repeating,
                    targets,
                });
                Ok(Flow::Normal)
            }

            StmtKind::Show { name, value } => {
                let scope = self.analysis.scope_of(stmt.id);
                let symbol = self
                    .analysis
                    .scopes
                    .resolve(scope, name)
                    .cloned()
                    .ok_or_else(|| EvalError::Undefined(name.clone()))?;
                let SymbolKind::Display { device } = symbol.kind else {
                    return Err(EvalError::Type(format!("'{}' is not a display", name)));
                };
                let value = self.eval_expr(value)?;
                let message = value.to_display_string().ok_or_else(|| {
                    EvalError::Type(format!("cannot display a {} value", value.type_name()))
                })?;
                self.displays.push(DisplayMessage {
                    display: name.clone(),
                    device,
                    message,
                });
                Ok(Flow::Normal)
            }

            StmtKind::Return { value } => {
                let value = match value {
                    Some(expr) => self.eval_expr(expr)?,
                    None => Value::Void,
                };
                Ok(Flow::Return(value))
            }

            StmtKind::Expr { expr } => {
                self.eval_expr(expr)?;
                Ok(Flow::Normal)
            }
        }
    }

    /// Initializer handling shared by variable and attribute declarations:
    /// evaluate the initializer or synthesize the type-appropriate zero
    /// value, then coerce to the declared type.
    fn declaration_value(
        &mut self,
        name: &str,
        declared: ValueType,
        len: Option<usize>,
        init: Option<&'a Expr>,
    ) -> EvalResult<Value> {
        if let Some(len) = len {
            return Ok(Value::Array(declared, vec![declared.zero_value(); len]));
        }
        let value = match init {
            Some(expr) => self.eval_expr(expr)?,
            None => declared.zero_value(),
        };
        coerce_assign(declared, value.clone()).ok_or_else(|| {
            EvalError::Type(format!(
                "cannot initialize '{}' of type {} with {}",
                name,
                declared,
                value.type_name()
            ))
        })
    }

    fn eval_assign(
        &mut self,
        stmt: &'a Stmt,
        target: &'a AssignTarget,
        value: &'a Expr,
    ) -> EvalResult<()> {
        let scope = self.analysis.scope_of(stmt.id);
        match target {
            AssignTarget::Name { name } => {
                let symbol = self
                    .analysis
                    .scopes
                    .resolve(scope, name)
                    .cloned()
                    .ok_or_else(|| EvalError::Undefined(name.clone()))?;
                match &symbol.kind {
                    SymbolKind::Variable => {
                        let assigned = self.eval_expr(value)?;
                        let coerced = self.coerce_for(&symbol, assigned)?;
                        self.local_space_mut().set(name, coerced);
                        Ok(())
                    }
                    SymbolKind::Attribute => {
                        self.check_unit_compatibility(&symbol, value)?;
                        let assigned = self.eval_expr(value)?;
                        let coerced = self.coerce_for(&symbol, assigned)?;
                        self.globals.set(name, coerced);
                        Ok(())
                    }
                    SymbolKind::Array { len } | SymbolKind::ArrayAttribute { len } => {
                        let len = *len;
                        if matches!(symbol.kind, SymbolKind::ArrayAttribute { .. }) {
                            self.check_unit_compatibility(&symbol, value)?;
                        }
                        let assigned = self.eval_expr(value)?;
                        let Value::Array(elem, items) = &assigned else {
                            return Err(EvalError::Type(format!(
                                "'{}' expects a {} array, got {}",
                                name,
                                symbol.declared_type,
                                assigned.type_name()
                            )));
                        };
                        if *elem != symbol.declared_type || items.len() != len {
                            return Err(EvalError::Type(format!(
                                "'{}' expects a {} array of length {}",
                                name, symbol.declared_type, len
                            )));
                        }
                        if matches!(symbol.kind, SymbolKind::ArrayAttribute { .. }) {
                            self.globals.set(name, assigned);
                        } else {
                            self.local_space_mut().set(name, assigned);
                        }
                        Ok(())
                    }
                    other => Err(EvalError::Type(format!(
                        "cannot assign to {} '{}'",
                        kind_name(other),
                        name
                    ))),
                }
            }
            AssignTarget::Index { name, index } => {
                let symbol = self
                    .analysis
                    .scopes
                    .resolve(scope, name)
                    .cloned()
                    .ok_or_else(|| EvalError::Undefined(name.clone()))?;
                let is_attribute = match &symbol.kind {
                    SymbolKind::Array { .. } => false,
                    SymbolKind::ArrayAttribute { .. } => true,
                    other => {
                        return Err(EvalError::Type(format!(
                            "cannot index {} '{}'",
                            kind_name(other),
                            name
                        )));
                    }
                };
                let index = self.expect_index(index)?;
                let assigned = self.eval_expr(value)?;
                let coerced = self.coerce_for(&symbol, assigned)?;

                let current = if is_attribute {
                    self.globals.get(name).cloned()
                } else {
                    self.read_local(name)
                };
                let Some(Value::Array(elem, mut items)) = current else {
                    return Err(EvalError::Undefined(name.clone()));
                };
                let len = items.len();
                if index < 0 || index as usize >= len {
                    return Err(EvalError::IndexOutOfRange {
                        name: name.clone(),
                        index,
                        len,
                    });
                }
                items[index as usize] = coerced;
                let updated = Value::Array(elem, items);
                if is_attribute {
                    self.globals.set(name, updated);
                } else {
                    self.local_space_mut().set(name, updated);
                }
                Ok(())
            }
        }
    }

    /// Assigning one attribute to another requires equal units of measure;
    /// conversion between units is not implemented.
    fn check_unit_compatibility(&self, target: &Symbol, value: &Expr) -> EvalResult<()> {
        let ExprKind::Name(source_name) = &value.kind else {
            return Ok(());
        };
        let scope = self.analysis.scope_of(value.id);
        let Some(source) = self.analysis.scopes.resolve(scope, source_name) else {
            return Ok(());
        };
        if !matches!(
            source.kind,
            SymbolKind::Attribute | SymbolKind::ArrayAttribute { .. }
        ) {
            return Ok(());
        }
        if target.unit_of_measure != source.unit_of_measure {
            return Err(EvalError::UnitMismatch {
                left: target.name.clone(),
                left_unit: target.unit_of_measure.clone(),
                right: source.name.clone(),
                right_unit: source.unit_of_measure.clone(),
            });
        }
        Ok(())
    }

    fn coerce_for(&self, symbol: &Symbol, value: Value) -> EvalResult<Value> {
        coerce_assign(symbol.declared_type, value.clone()).ok_or_else(|| {
            EvalError::Type(format!(
                "cannot assign {} to '{}' of type {}",
                value.type_name(),
                symbol.name,
                symbol.declared_type
            ))
        })
    }

    fn expect_index(&mut self, expr: &'a Expr) -> EvalResult<i64> {
        match self.eval_expr(expr)? {
            Value::Int(index) => Ok(index),
            Value::Void => Err(EvalError::Absent("array index has no value".to_string())),
            other => Err(EvalError::Type(format!(
                "array index expects int, got {}",
                other.type_name()
            ))),
        }
    }

    fn eval_expr(&mut self, expr: &'a Expr) -> EvalResult<Value> {
        match &expr.kind {
            ExprKind::Int(value) => Ok(Value::Int(*value)),
            ExprKind::Float(value) => Ok(Value::Float(*value)),
            ExprKind::Str(value) => Ok(Value::Str(value.clone())),
            ExprKind::Bool(value) => Ok(Value::Bool(*value)),

            ExprKind::Name(name) => self.read_name(expr, name),

            ExprKind::State => match self.globals.get(STATE_SYMBOL) {
                Some(value) => Ok(value.clone()),
                None => Ok(Value::State(self.facade.current_state(&self.entity))),
            },

            ExprKind::Index { name, index } => {
                let array = self.read_name(expr, name)?;
                let index = self.expect_index(index)?;
                // An absent array attribute propagates absence instead of
                // failing the element read.
                if array.is_void() {
                    return Ok(Value::Void);
                }
                let Value::Array(_, items) = array else {
                    return Err(EvalError::Type(format!("'{}' is not an array", name)));
                };
                if index < 0 || index as usize >= items.len() {
                    return Err(EvalError::IndexOutOfRange {
                        name: name.clone(),
                        index,
                        len: items.len(),
                    });
                }
                Ok(items[index as usize].clone())
            }

            ExprKind::Unary { op, operand } => {
                let value = self.eval_expr(operand)?;
                eval_unary(*op, value)
            }

            ExprKind::Binary { op, lhs, rhs } => {
                let lhs = self.eval_expr(lhs)?;
                let rhs = self.eval_expr(rhs)?;
                eval_binary(*op, lhs, rhs)
            }

            ExprKind::Call { callee, args } => self.eval_call(expr, callee, args),
        }
    }

    /// Resolve a plain name read through its scope, then through the right
    /// store: a variable reads from the call space (falling back to the
    /// global space); an attribute reads the entity's live value through the
    /// facade, which consults the live attribute set first and the executed
    /// object second, and is absent, not an error, when neither has one.
    /// Attribute writes staged in the global space are for persistence, not
    /// for read-back.
    fn read_name(&mut self, expr: &Expr, name: &str) -> EvalResult<Value> {
        let scope = self.analysis.scope_of(expr.id);
        let symbol = self
            .analysis
            .scopes
            .resolve(scope, name)
            .ok_or_else(|| EvalError::Undefined(name.to_string()))?;
        match &symbol.kind {
            SymbolKind::Variable | SymbolKind::Array { .. } => self
                .read_local(name)
                .ok_or_else(|| EvalError::Undefined(name.to_string())),
            SymbolKind::Attribute | SymbolKind::ArrayAttribute { .. } => {
                Ok(self.facade.latest_attribute(name).unwrap_or(Value::Void))
            }
            other => Err(EvalError::Type(format!(
                "{} '{}' cannot be used as a value",
                kind_name(other),
                name
            ))),
        }
    }

    fn read_local(&self, name: &str) -> Option<Value> {
        if let Some(space) = self.stack.current() {
            if let Some(value) = space.get(name) {
                return Some(value.clone());
            }
        }
        self.globals.get(name).cloned()
    }

    fn local_space_mut(&mut self) -> &mut MemorySpace {
        self.stack.current_mut().unwrap_or(&mut self.globals)
    }

    fn eval_call(&mut self, expr: &'a Expr, callee: &str, args: &'a [Expr]) -> EvalResult<Value> {
        if builtins::is_history_builtin(callee) {
            return self.eval_history_call(callee, args);
        }
        if builtins::is_builtin(callee) {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(self.eval_expr(arg)?);
            }
            return builtins::dispatch(callee, values);
        }

        let scope = self.analysis.scope_of(expr.id);
        let symbol = self
            .analysis
            .scopes
            .resolve(scope, callee)
            .cloned()
            .ok_or_else(|| EvalError::Undefined(callee.to_string()))?;
        let (formals, ret, body) = match symbol.kind {
            SymbolKind::Function { params, ret, body } => (params, ret, body),
            SymbolKind::Program { params, body } => (params, None, body),
            _ => return Err(EvalError::NotCallable(callee.to_string())),
        };

        if self.stack.depth() >= MAX_CALL_DEPTH {
            return Err(EvalError::CallDepth(MAX_CALL_DEPTH));
        }

        let mut actuals = Vec::with_capacity(args.len());
        for arg in args {
            actuals.push(self.eval_expr(arg)?);
        }
        let space = self.bind_params(callee, &formals, &actuals)?;
        self.stack.push(space);
        let block = self.body_block(body)?;
        let flow = self.eval_block(block);
        self.stack.pop();

        let value = match flow? {
            Flow::Return(value) => value,
            Flow::Normal => Value::Void,
        };
        match ret {
            Some(declared) => coerce_assign(declared, value.clone()).ok_or_else(|| {
                EvalError::Type(format!(
                    "'{}' declares return type {}, got {}",
                    callee,
                    declared,
                    value.type_name()
                ))
            }),
            None => Ok(value),
        }
    }

    /// History built-ins take an attribute name and a time-unit token
    /// positionally, then an evaluated amount.
    fn eval_history_call(&mut self, callee: &str, args: &'a [Expr]) -> EvalResult<Value> {
        if args.len() != 3 {
            return Err(EvalError::Arity {
                name: callee.to_string(),
                expected: 3,
                got: args.len(),
            });
        }
        let ExprKind::Name(attribute) = &args[0].kind else {
            return Err(EvalError::Type(format!(
                "{} expects an attribute name as first argument",
                callee
            )));
        };
        let unit = match &args[1].kind {
            ExprKind::Name(token) => {
                crate::runtime::value::TimeUnit::from_token(token).ok_or_else(|| {
                    EvalError::Type(format!("'{}' is not a time unit", token))
                })?
            }
            _ => {
                return Err(EvalError::Type(format!(
                    "{} expects a time unit as second argument",
                    callee
                )));
            }
        };
        let amount = match self.eval_expr(&args[2])? {
            Value::Int(amount) => amount,
            other => {
                return Err(EvalError::Type(format!(
                    "{} expects an int amount, got {}",
                    callee,
                    other.type_name()
                )));
            }
        };
        builtins::history(callee, self.facade, attribute, unit, amount)
    }
}

fn index_block<'a>(block: &'a Block, blocks: &mut HashMap<NodeId, &'a Block>) {
    blocks.insert(block.id, block);
    for stmt in &block.statements {
        match &stmt.kind {
            StmtKind::Function { body, .. } => index_block(body, blocks),
            StmtKind::If { arms, else_block } => {
                for arm in arms {
                    index_block(&arm.block, blocks);
                }
                if let Some(else_block) = else_block {
                    index_block(else_block, blocks);
                }
            }
            _ => {}
        }
    }
}

fn kind_name(kind: &SymbolKind) -> &'static str {
    match kind {
        SymbolKind::Variable => "variable",
        SymbolKind::Attribute => "attribute",
        SymbolKind::ArrayAttribute { .. } => "array attribute",
        SymbolKind::Array { .. } => "array",
        SymbolKind::UnitOfMeasure => "unit",
        SymbolKind::Timer { .. } => "timer",
        SymbolKind::Display { .. } => "display",
        SymbolKind::State => "state",
        SymbolKind::Import { .. } => "import",
        SymbolKind::Function { .. } => "function",
        SymbolKind::Program { .. } => "program",
    }
}

fn eval_unary(op: UnaryOp, value: Value) -> EvalResult<Value> {
    match op {
        // Unary operators are lenient about absence: negation of an absent
        // value substitutes zero, `not` substitutes false.
        UnaryOp::Neg => match value {
            Value::Int(v) => Ok(Value::Int(-v)),
            Value::Float(v) => Ok(Value::Float(-v)),
            Value::Void => Ok(Value::Int(0)),
            other => Err(EvalError::Type(format!(
                "cannot negate a {} value",
                other.type_name()
            ))),
        },
        UnaryOp::Not => match value {
            Value::Bool(v) => Ok(Value::Bool(!v)),
            Value::Void => Ok(Value::Bool(true)),
            other => Err(EvalError::Type(format!(
                "'not' expects bool, got {}",
                other.type_name()
            ))),
        },
    }
}

fn eval_binary(op: BinaryOp, lhs: Value, rhs: Value) -> EvalResult<Value> {
    match op {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            eval_arithmetic(op, lhs, rhs)
        }
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => eval_ordering(op, lhs, rhs),
        BinaryOp::Eq | BinaryOp::Ne => {
            let equal = values_equal(&lhs, &rhs)?;
            Ok(Value::Bool(if op == BinaryOp::Eq { equal } else { !equal }))
        }
        BinaryOp::And | BinaryOp::Or => eval_logical(op, lhs, rhs),
    }
}

fn eval_arithmetic(op: BinaryOp, lhs: Value, rhs: Value) -> EvalResult<Value> {
    // Absence propagates through arithmetic.
    if lhs.is_void() || rhs.is_void() {
        return Ok(Value::Void);
    }

    // String concatenation: one side may be any scalar, stringified.
    if op == BinaryOp::Add && (matches!(lhs, Value::Str(_)) || matches!(rhs, Value::Str(_))) {
        let left = lhs.to_display_string().ok_or_else(|| {
            EvalError::Type(format!("cannot concatenate a {} value", lhs.type_name()))
        })?;
        let right = rhs.to_display_string().ok_or_else(|| {
            EvalError::Type(format!("cannot concatenate a {} value", rhs.type_name()))
        })?;
        return Ok(Value::Str(left + &right));
    }

    match (&lhs, &rhs) {
        (Value::Int(a), Value::Int(b)) => match op {
            BinaryOp::Add => Ok(Value::Int(a + b)),
            BinaryOp::Sub => Ok(Value::Int(a - b)),
            BinaryOp::Mul => Ok(Value::Int(a * b)),
            // Division and modulo always promote to float.
            BinaryOp::Div => Ok(Value::Float(*a as f64 / *b as f64)),
            BinaryOp::Mod => Ok(Value::Float(*a as f64 % *b as f64)),
            _ => unreachable!("non-arithmetic operator"),
        },
        _ => {
            let (a, b) = match (lhs.as_f64(), rhs.as_f64()) {
                (Some(a), Some(b)) => (a, b),
                _ => {
                    return Err(EvalError::Type(format!(
                        "arithmetic expects numeric operands, got {} and {}",
                        lhs.type_name(),
                        rhs.type_name()
                    )));
                }
            };
            let result = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => a / b,
                BinaryOp::Mod => a % b,
                _ => unreachable!("non-arithmetic operator"),
            };
            Ok(Value::Float(result))
        }
    }
}

fn eval_ordering(op: BinaryOp, lhs: Value, rhs: Value) -> EvalResult<Value> {
    // Both absent: strict orderings are false, inclusive ones true.
    if lhs.is_void() && rhs.is_void() {
        return Ok(Value::Bool(matches!(op, BinaryOp::Le | BinaryOp::Ge)));
    }
    // One absent: absence orders below any present value.
    if lhs.is_void() {
        return Ok(Value::Bool(matches!(op, BinaryOp::Lt | BinaryOp::Le)));
    }
    if rhs.is_void() {
        return Ok(Value::Bool(matches!(op, BinaryOp::Gt | BinaryOp::Ge)));
    }

    let (a, b) = match (lhs.as_f64(), rhs.as_f64()) {
        (Some(a), Some(b)) => (a, b),
        _ => {
            return Err(EvalError::Type(format!(
                "comparison expects numeric operands, got {} and {}",
                lhs.type_name(),
                rhs.type_name()
            )));
        }
    };
    let result = match op {
        BinaryOp::Lt => a < b,
        BinaryOp::Le => a <= b,
        BinaryOp::Gt => a > b,
        BinaryOp::Ge => a >= b,
        _ => unreachable!("non-ordering operator"),
    };
    Ok(Value::Bool(result))
}

/// Equality over same-kind pairs, with numeric pairs compared within
/// [`FLOAT_EQ_EPSILON`]. Both-absent compares equal, exactly-one-absent
/// compares unequal.
fn values_equal(lhs: &Value, rhs: &Value) -> EvalResult<bool> {
    if lhs.is_void() && rhs.is_void() {
        return Ok(true);
    }
    if lhs.is_void() || rhs.is_void() {
        return Ok(false);
    }
    if let (Some(a), Some(b)) = (lhs.as_f64(), rhs.as_f64()) {
        return Ok((a - b).abs() < FLOAT_EQ_EPSILON);
    }
    match (lhs, rhs) {
        (Value::Str(a), Value::Str(b)) => Ok(a == b),
        (Value::Bool(a), Value::Bool(b)) => Ok(a == b),
        (Value::Date(a), Value::Date(b)) => Ok(a == b),
        (Value::Time(a), Value::Time(b)) => Ok(a == b),
        (Value::DateTime(a), Value::DateTime(b)) => Ok(a == b),
        (Value::State(a), Value::State(b)) => Ok(a == b),
        _ => Err(EvalError::Type(format!(
            "cannot compare {} with {}",
            lhs.type_name(),
            rhs.type_name()
        ))),
    }
}

fn eval_logical(op: BinaryOp, lhs: Value, rhs: Value) -> EvalResult<Value> {
    let expect_bool = |value: Value| -> EvalResult<bool> {
        match value {
            Value::Bool(v) => Ok(v),
            Value::Void => Err(EvalError::Absent(
                "logical operand has no value".to_string(),
            )),
            other => Err(EvalError::Type(format!(
                "logical operator expects bool, got {}",
                other.type_name()
            ))),
        }
    };
    let a = expect_bool(lhs)?;
    let b = expect_bool(rhs)?;
    Ok(Value::Bool(match op {
        BinaryOp::And => a && b,
        BinaryOp::Or => a || b,
        _ => unreachable!("non-logical operator"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn division_always_promotes_to_float() {
        let result = eval_binary(BinaryOp::Div, Value::Int(7), Value::Int(2)).unwrap();
        assert_eq!(result, Value::Float(3.5));
        let result = eval_binary(BinaryOp::Mod, Value::Int(7), Value::Int(2)).unwrap();
        assert_eq!(result, Value::Float(1.0));
    }

    #[test]
    fn integer_arithmetic_stays_integer() {
        let result = eval_binary(BinaryOp::Add, Value::Int(2), Value::Int(3)).unwrap();
        assert_eq!(result, Value::Int(5));
        let result = eval_binary(BinaryOp::Mul, Value::Int(2), Value::Float(3.0)).unwrap();
        assert_eq!(result, Value::Float(6.0));
    }

    #[test]
    fn string_concatenation_stringifies_scalars() {
        let result = eval_binary(
            BinaryOp::Add,
            Value::Str("count: ".into()),
            Value::Int(3),
        )
        .unwrap();
        assert_eq!(result, Value::Str("count: 3".into()));
        let result =
            eval_binary(BinaryOp::Add, Value::Bool(true), Value::Str("!".into())).unwrap();
        assert_eq!(result, Value::Str("true!".into()));
    }

    #[test]
    fn absent_operands_follow_ordering_policy() {
        let lt = eval_binary(BinaryOp::Lt, Value::Void, Value::Void).unwrap();
        assert_eq!(lt, Value::Bool(false));
        let le = eval_binary(BinaryOp::Le, Value::Void, Value::Void).unwrap();
        assert_eq!(le, Value::Bool(true));
        let lt = eval_binary(BinaryOp::Lt, Value::Void, Value::Int(-100)).unwrap();
        assert_eq!(lt, Value::Bool(true));
        let gt = eval_binary(BinaryOp::Gt, Value::Int(-100), Value::Void).unwrap();
        assert_eq!(gt, Value::Bool(true));
    }

    #[test]
    fn equality_uses_epsilon_for_floats() {
        let eq = values_equal(&Value::Float(3.0000000001), &Value::Float(3.0)).unwrap();
        assert!(eq);
        let eq = values_equal(&Value::Float(3.1), &Value::Float(3.0)).unwrap();
        assert!(!eq);
    }

    #[test]
    fn absent_equality_policy() {
        assert!(values_equal(&Value::Void, &Value::Void).unwrap());
        assert!(!values_equal(&Value::Void, &Value::Int(0)).unwrap());
    }

    #[test]
    fn unary_operators_substitute_for_absence() {
        assert_eq!(eval_unary(UnaryOp::Neg, Value::Void).unwrap(), Value::Int(0));
        assert_eq!(
            eval_unary(UnaryOp::Not, Value::Void).unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn logical_operators_reject_absence() {
        let err = eval_logical(BinaryOp::And, Value::Void, Value::Bool(true)).unwrap_err();
        assert!(matches!(err, EvalError::Absent(_)));
    }

    #[test]
    fn arithmetic_propagates_absence() {
        let result = eval_arithmetic(BinaryOp::Add, Value::Void, Value::Int(1)).unwrap();
        assert_eq!(result, Value::Void);
    }
}
