//! Definition phase: the first analysis pass.
//!
//! Walks the syntax tree top-down, creating scopes for scope-introducing
//! constructs (program, function, block), registering symbols, and recording
//! which scope every node belongs to. Defects are collected as positioned
//! diagnostics and never abort the walk, so a caller receives the complete
//! batch in one pass.

use std::collections::HashMap;

use crate::lang::ast::{Block, Expr, ExprKind, NodeId, Param, Program, Stmt, StmtKind};
use crate::lang::diagnostics::Diagnostic;
use crate::lang::scope::{GLOBAL_SCOPE, ScopeId, ScopeKind, ScopeTree};
use crate::lang::symbol::{PROGRAM_SYMBOL, ParamSig, STATE_SYMBOL, Symbol, SymbolKind};
use crate::runtime::value::{TimeUnit, ValueType};

/// The semantic artifact both later stages consume: the scope arena plus the
/// node→scope association recorded while building it.
#[derive(Debug, Clone)]
pub struct Analysis {
    /// The scope arena.
    pub scopes: ScopeTree,
    /// Scope association for every visited node.
    pub node_scopes: HashMap<NodeId, ScopeId>,
}

impl Analysis {
    /// The scope associated with a node, defaulting to the global scope for
    /// nodes the definition phase never saw.
    pub fn scope_of(&self, node: NodeId) -> ScopeId {
        self.node_scopes.get(&node).copied().unwrap_or(GLOBAL_SCOPE)
    }
}

/// Run the definition phase over a parsed program.
pub fn run(program: &Program) -> (Analysis, Vec<Diagnostic>) {
    tracing::debug!("defining symbols for behavior program");
    let mut pass = DefinitionPass {
        scopes: ScopeTree::new(),
        node_scopes: HashMap::new(),
        diagnostics: Vec::new(),
    };
    pass.define_program(program);
    (
        Analysis {
            scopes: pass.scopes,
            node_scopes: pass.node_scopes,
        },
        pass.diagnostics,
    )
}

struct DefinitionPass {
    scopes: ScopeTree,
    node_scopes: HashMap<NodeId, ScopeId>,
    diagnostics: Vec<Diagnostic>,
}

impl DefinitionPass {
    fn define_program(&mut self, program: &Program) {
        let params = param_sigs(&program.params);
        self.scopes.define(
            GLOBAL_SCOPE,
            Symbol::new(
                PROGRAM_SYMBOL,
                SymbolKind::Program {
                    params,
                    body: program.body.id,
                },
                ValueType::Void,
            ),
        );

        let program_scope = self.scopes.push_scope(ScopeKind::Program, GLOBAL_SCOPE);
        for param in &program.params {
            self.define_param(program_scope, param);
        }
        self.walk_block(&program.body, program_scope);
    }

    /// Enter a block: a fresh child scope, associated with the block node.
    fn walk_block(&mut self, block: &Block, parent: ScopeId) {
        let scope = self.scopes.push_scope(ScopeKind::Block, parent);
        self.node_scopes.insert(block.id, scope);
        for stmt in &block.statements {
            self.walk_stmt(stmt, scope);
        }
    }

    fn walk_stmt(&mut self, stmt: &Stmt, scope: ScopeId) {
        self.node_scopes.insert(stmt.id, scope);
        match &stmt.kind {
            StmtKind::Import { path, alias } => {
                let visible = alias.clone().unwrap_or_else(|| path.join("."));
                self.scopes.define(
                    scope,
                    Symbol::new(
                        visible,
                        SymbolKind::Import {
                            path: path.clone(),
                            alias: alias.clone(),
                        },
                        ValueType::Void,
                    ),
                );
            }
            StmtKind::Unit { name } => {
                if self.scopes.resolve_local(GLOBAL_SCOPE, name).is_some() {
                    self.diagnostics.push(Diagnostic::at(
                        stmt.span,
                        format!("unit '{}' is already declared", name),
                    ));
                } else {
                    self.scopes.define(
                        GLOBAL_SCOPE,
                        Symbol::new(name, SymbolKind::UnitOfMeasure, ValueType::Void),
                    );
                }
            }
            StmtKind::Attribute {
                name,
                ty,
                len,
                unit,
                trend,
                init,
            } => {
                if let Some(expr) = init {
                    self.walk_expr(expr, scope);
                }
                // Attributes are process-wide state, not lexical state: they
                // land in the global scope regardless of nesting.
                if self.scopes.resolve_local(GLOBAL_SCOPE, name).is_some() {
                    self.diagnostics.push(Diagnostic::at(
                        stmt.span,
                        format!("attribute '{}' is already declared", name),
                    ));
                    return;
                }
                let kind = match len {
                    Some(len) => SymbolKind::ArrayAttribute { len: *len },
                    None => SymbolKind::Attribute,
                };
                let mut symbol = Symbol::new(name, kind, ValueType::from_type_name(*ty));
                symbol.unit_of_measure = unit.clone();
                symbol.trend = *trend;
                self.scopes.define(GLOBAL_SCOPE, symbol);
            }
            StmtKind::Var {
                name,
                ty,
                len,
                init,
            } => {
                if let Some(expr) = init {
                    self.walk_expr(expr, scope);
                }
                self.define_variable(scope, name, ValueType::from_type_name(*ty), *len, stmt);
            }
            StmtKind::Timer {
                name,
                amount,
                unit,
                repeating,
                ..
            } => {
                let Some(unit_token) = unit else {
                    self.diagnostics.push(Diagnostic::at(
                        stmt.span,
                        format!("timer '{}' requires a time unit", name),
                    ));
                    return;
                };
                let Some(time_unit) = TimeUnit::from_token(unit_token) else {
                    self.diagnostics.push(Diagnostic::at(
                        stmt.span,
                        format!("unknown time unit '{}'", unit_token),
                    ));
                    return;
                };
                let Ok(amount) = amount.parse::<i64>() else {
                    self.diagnostics.push(Diagnostic::at(
                        stmt.span,
                        format!("invalid timer amount '{}'", amount),
                    ));
                    return;
                };
                self.scopes.define(
                    scope,
                    Symbol::new(
                        name,
                        SymbolKind::Timer {
                            unit: time_unit,
                            amount,
                            repeating: *repeating,
                            targets: Vec::new(),
                        },
                        ValueType::Void,
                    ),
                );
            }
            StmtKind::Display { name, device } => {
                // Re-declaring a known display is a silent no-op, unlike the
                // attribute and unit duplication rules.
                if self.scopes.resolve(scope, name).is_none() {
                    self.scopes.define(
                        scope,
                        Symbol::new(
                            name,
                            SymbolKind::Display {
                                device: device.clone(),
                            },
                            ValueType::Void,
                        ),
                    );
                }
            }
            StmtKind::Function {
                name,
                params,
                ret,
                body,
            } => {
                // The symbol goes into the enclosing scope so siblings can
                // call it; parameters and body live in the function's own
                // scope.
                self.scopes.define(
                    scope,
                    Symbol::new(
                        name,
                        SymbolKind::Function {
                            params: param_sigs(params),
                            ret: ret.map(ValueType::from_type_name),
                            body: body.id,
                        },
                        ValueType::Void,
                    ),
                );
                let fn_scope = self.scopes.push_scope(ScopeKind::Function, scope);
                for param in params {
                    self.define_param(fn_scope, param);
                }
                self.walk_block(body, fn_scope);
            }
            StmtKind::Assign { target, value } => {
                if let crate::lang::ast::AssignTarget::Index { index, .. } = target {
                    self.walk_expr(index, scope);
                }
                self.walk_expr(value, scope);
            }
            StmtKind::StateAssign { value } => {
                self.walk_expr(value, scope);
                if self
                    .scopes
                    .resolve_local(GLOBAL_SCOPE, STATE_SYMBOL)
                    .is_none()
                {
                    self.scopes.define(
                        GLOBAL_SCOPE,
                        Symbol::new(STATE_SYMBOL, SymbolKind::State, ValueType::State),
                    );
                }
            }
            StmtKind::If { arms, else_block } => {
                for arm in arms {
                    self.walk_expr(&arm.condition, scope);
                    self.walk_block(&arm.block, scope);
                }
                if let Some(block) = else_block {
                    self.walk_block(block, scope);
                }
            }
            StmtKind::Start { .. } => {}
            StmtKind::Show { value, .. } => {
                self.walk_expr(value, scope);
            }
            StmtKind::Return { value } => {
                if let Some(expr) = value {
                    self.walk_expr(expr, scope);
                }
            }
            StmtKind::Expr { expr } => {
                self.walk_expr(expr, scope);
            }
        }
    }

    fn define_param(&mut self, scope: ScopeId, param: &Param) {
        let stmt_like = param.span;
        let name = &param.name;
        if let Some(existing) = self.scopes.resolve(scope, name) {
            if matches!(
                existing.kind,
                SymbolKind::Attribute | SymbolKind::ArrayAttribute { .. }
            ) {
                self.diagnostics.push(Diagnostic::at(
                    stmt_like,
                    format!("parameter '{}' collides with attribute '{}'", name, name),
                ));
                return;
            }
        }
        if self.scopes.resolve_local(scope, name).is_some() {
            self.diagnostics.push(Diagnostic::at(
                stmt_like,
                format!("parameter '{}' is already declared", name),
            ));
            return;
        }
        self.scopes.define(
            scope,
            Symbol::new(
                name,
                SymbolKind::Variable,
                ValueType::from_type_name(param.ty),
            ),
        );
    }

    fn define_variable(
        &mut self,
        scope: ScopeId,
        name: &str,
        ty: ValueType,
        len: Option<usize>,
        stmt: &Stmt,
    ) {
        if let Some(existing) = self.scopes.resolve(scope, name) {
            if matches!(
                existing.kind,
                SymbolKind::Attribute | SymbolKind::ArrayAttribute { .. }
            ) {
                self.diagnostics.push(Diagnostic::at(
                    stmt.span,
                    format!("variable '{}' collides with attribute '{}'", name, name),
                ));
                return;
            }
        }
        if self.scopes.resolve_local(scope, name).is_some() {
            self.diagnostics.push(Diagnostic::at(
                stmt.span,
                format!("'{}' is already declared in this scope", name),
            ));
            return;
        }
        let kind = match len {
            Some(len) => SymbolKind::Array { len },
            None => SymbolKind::Variable,
        };
        self.scopes.define(scope, Symbol::new(name, kind, ty));
    }

    fn walk_expr(&mut self, expr: &Expr, scope: ScopeId) {
        self.node_scopes.insert(expr.id, scope);
        match &expr.kind {
            ExprKind::Index { index, .. } => self.walk_expr(index, scope),
            ExprKind::Unary { operand, .. } => self.walk_expr(operand, scope),
            ExprKind::Binary { lhs, rhs, .. } => {
                self.walk_expr(lhs, scope);
                self.walk_expr(rhs, scope);
            }
            ExprKind::Call { args, .. } => {
                for arg in args {
                    self.walk_expr(arg, scope);
                }
            }
            ExprKind::Int(_)
            | ExprKind::Float(_)
            | ExprKind::Str(_)
            | ExprKind::Bool(_)
            | ExprKind::Name(_)
            | ExprKind::State => {}
        }
    }
}

fn param_sigs(params: &[Param]) -> Vec<ParamSig> {
    params
        .iter()
        .map(|param| ParamSig {
            name: param.name.clone(),
            ty: ValueType::from_type_name(param.ty),
        })
        .collect()
}
