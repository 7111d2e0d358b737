//! Reference phase: the second analysis pass.
//!
//! Re-walks the syntax tree using the node→scope map produced by the
//! definition phase and validates every identifier *use*: imports against
//! the entity's behavior catalog, display devices against the device
//! catalog, timer targets against their imports, calls against callable
//! symbols, and plain names against non-callable ones. Like the definition
//! phase it reports every defect in one pass instead of stopping at the
//! first.

use crate::lang::ast::{AssignTarget, Block, Expr, ExprKind, Program, Stmt, StmtKind};
use crate::lang::definition::Analysis;
use crate::lang::diagnostics::Diagnostic;
use crate::lang::symbol::SymbolKind;
use crate::runtime::builtins;
use crate::runtime::facade::{EntityFacade, EntityId};
use crate::runtime::value::TimeUnit;

/// Run the reference phase. Returns the diagnostics it found; the only
/// mutation it performs on `analysis` is copying resolved import segments
/// onto timer symbols.
pub fn run(
    program: &Program,
    analysis: &mut Analysis,
    entity: &EntityId,
    facade: &dyn EntityFacade,
) -> Vec<Diagnostic> {
    tracing::debug!(entity = %entity, "validating references for behavior program");
    let mut pass = ReferencePass {
        analysis,
        entity,
        facade,
        diagnostics: Vec::new(),
    };
    pass.walk_block(&program.body);
    pass.diagnostics
}

struct ReferencePass<'a> {
    analysis: &'a mut Analysis,
    entity: &'a EntityId,
    facade: &'a dyn EntityFacade,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> ReferencePass<'a> {
    fn walk_block(&mut self, block: &Block) {
        for stmt in &block.statements {
            self.walk_stmt(stmt);
        }
    }

    fn walk_stmt(&mut self, stmt: &Stmt) {
        let scope = self.analysis.scope_of(stmt.id);
        match &stmt.kind {
            StmtKind::Import { path, .. } => {
                let dotted = path.join(".");
                if self
                    .facade
                    .behavior_source(self.entity, &dotted)
                    .is_none()
                {
                    self.diagnostics.push(Diagnostic::at(
                        stmt.span,
                        format!("import '{}' does not name a behavior on this entity", dotted),
                    ));
                }
            }
            StmtKind::Unit { .. } => {}
            StmtKind::Attribute { unit, init, .. } => {
                if let Some(unit_name) = unit {
                    match self.analysis.scopes.resolve(scope, unit_name) {
                        Some(symbol) if symbol.kind == SymbolKind::UnitOfMeasure => {}
                        Some(_) => self.diagnostics.push(Diagnostic::at(
                            stmt.span,
                            format!("'{}' is not a unit of measure", unit_name),
                        )),
                        None => self.diagnostics.push(Diagnostic::at(
                            stmt.span,
                            format!("unit '{}' is not declared", unit_name),
                        )),
                    }
                }
                if let Some(expr) = init {
                    self.walk_expr(expr);
                }
            }
            StmtKind::Var { init, .. } => {
                if let Some(expr) = init {
                    self.walk_expr(expr);
                }
            }
            StmtKind::Timer { name, target, .. } => {
                let segments = match self.analysis.scopes.resolve(scope, target) {
                    Some(symbol) => match &symbol.kind {
                        SymbolKind::Import { path, .. } => Some(path.clone()),
                        _ => {
                            self.diagnostics.push(Diagnostic::at(
                                stmt.span,
                                format!("timer target '{}' is not an import", target),
                            ));
                            None
                        }
                    },
                    None => {
                        self.diagnostics.push(Diagnostic::at(
                            stmt.span,
                            format!("timer target '{}' is not defined", target),
                        ));
                        None
                    }
                };
                // Copy the import's dotted segments onto the timer symbol so
                // the scheduler receives fully-qualified targets.
                if let Some(segments) = segments {
                    if let Some(symbol) = self.analysis.scopes.resolve_mut(scope, name) {
                        if let SymbolKind::Timer { targets, .. } = &mut symbol.kind {
                            *targets = segments;
                        }
                    }
                }
            }
            StmtKind::Display { device, .. } => {
                if self.facade.display_device(device).is_none() {
                    self.diagnostics.push(Diagnostic::at(
                        stmt.span,
                        format!("display device '{}' is not registered", device),
                    ));
                }
            }
            StmtKind::Function { body, .. } => {
                self.walk_block(body);
            }
            StmtKind::Assign { target, value } => {
                match target {
                    AssignTarget::Name { name } => self.check_assign_target(stmt, scope, name),
                    AssignTarget::Index { name, index } => {
                        self.check_assign_target(stmt, scope, name);
                        self.walk_expr(index);
                    }
                }
                self.walk_expr(value);
            }
            StmtKind::StateAssign { value } => {
                self.walk_expr(value);
            }
            StmtKind::If { arms, else_block } => {
                for arm in arms {
                    self.walk_expr(&arm.condition);
                    self.walk_block(&arm.block);
                }
                if let Some(block) = else_block {
                    self.walk_block(block);
                }
            }
            StmtKind::Start { name } => {
                if self.analysis.scopes.resolve(scope, name).is_none() {
                    self.diagnostics.push(Diagnostic::at(
                        stmt.span,
                        format!("timer '{}' is not declared", name),
                    ));
                }
            }
            StmtKind::Show { name, value } => {
                if self.analysis.scopes.resolve(scope, name).is_none() {
                    self.diagnostics.push(Diagnostic::at(
                        stmt.span,
                        format!("display '{}' is not declared", name),
                    ));
                }
                self.walk_expr(value);
            }
            StmtKind::Return { value } => {
                if let Some(expr) = value {
                    self.walk_expr(expr);
                }
            }
            StmtKind::Expr { expr } => {
                self.walk_expr(expr);
            }
        }
    }

    fn check_assign_target(&mut self, stmt: &Stmt, scope: crate::lang::scope::ScopeId, name: &str) {
        match self.analysis.scopes.resolve(scope, name) {
            None => self.diagnostics.push(Diagnostic::at(
                stmt.span,
                format!("cannot assign to undefined name '{}'", name),
            )),
            Some(symbol) if symbol.is_callable() => self.diagnostics.push(Diagnostic::at(
                stmt.span,
                format!("cannot assign to function '{}'", name),
            )),
            Some(_) => {}
        }
    }

    fn walk_expr(&mut self, expr: &Expr) {
        let scope = self.analysis.scope_of(expr.id);
        match &expr.kind {
            ExprKind::Name(name) => match self.analysis.scopes.resolve(scope, name) {
                None => self.diagnostics.push(Diagnostic::at(
                    expr.span,
                    format!("'{}' is not defined", name),
                )),
                Some(symbol) if symbol.is_callable() => self.diagnostics.push(Diagnostic::at(
                    expr.span,
                    format!("function '{}' used as a value", name),
                )),
                Some(_) => {}
            },
            ExprKind::State => {}
            ExprKind::Index { name, index } => {
                match self.analysis.scopes.resolve(scope, name) {
                    None => self.diagnostics.push(Diagnostic::at(
                        expr.span,
                        format!("'{}' is not defined", name),
                    )),
                    Some(symbol) if symbol.is_callable() => {
                        self.diagnostics.push(Diagnostic::at(
                            expr.span,
                            format!("function '{}' used as a value", name),
                        ));
                    }
                    Some(_) => {}
                }
                self.walk_expr(index);
            }
            ExprKind::Unary { operand, .. } => self.walk_expr(operand),
            ExprKind::Binary { lhs, rhs, .. } => {
                self.walk_expr(lhs);
                self.walk_expr(rhs);
            }
            ExprKind::Call { callee, args } => {
                if builtins::is_history_builtin(callee) {
                    self.check_history_call(scope, args);
                } else if builtins::is_builtin(callee) {
                    for arg in args {
                        self.walk_expr(arg);
                    }
                } else {
                    match self.analysis.scopes.resolve(scope, callee) {
                        None => self.diagnostics.push(Diagnostic::at(
                            expr.span,
                            format!("call to undefined function '{}'", callee),
                        )),
                        Some(symbol) if !symbol.is_callable() => {
                            self.diagnostics.push(Diagnostic::at(
                                expr.span,
                                format!("'{}' is not callable", callee),
                            ));
                        }
                        Some(_) => {}
                    }
                    for arg in args {
                        self.walk_expr(arg);
                    }
                }
            }
            ExprKind::Int(_) | ExprKind::Float(_) | ExprKind::Str(_) | ExprKind::Bool(_) => {}
        }
    }

    /// History built-ins name an attribute and a time unit positionally;
    /// neither is an ordinary value reference.
    fn check_history_call(&mut self, scope: crate::lang::scope::ScopeId, args: &[Expr]) {
        if let Some(first) = args.first() {
            if let ExprKind::Name(attr) = &first.kind {
                let declared = matches!(
                    self.analysis.scopes.resolve(scope, attr).map(|s| &s.kind),
                    Some(SymbolKind::Attribute) | Some(SymbolKind::ArrayAttribute { .. })
                );
                if !declared && !self.facade.is_known_attribute(attr) {
                    self.diagnostics.push(Diagnostic::at(
                        first.span,
                        format!("'{}' is not a known attribute", attr),
                    ));
                }
            } else {
                self.diagnostics.push(Diagnostic::at(
                    first.span,
                    "history queries take an attribute name as first argument".to_string(),
                ));
            }
        }
        if let Some(second) = args.get(1) {
            let is_unit_token = matches!(
                &second.kind,
                ExprKind::Name(token) if TimeUnit::from_token(token).is_some()
            );
            if !is_unit_token {
                self.diagnostics.push(Diagnostic::at(
                    second.span,
                    "history queries take a time unit (second, minute, hour) as second argument"
                        .to_string(),
                ));
            }
        }
        for arg in args.iter().skip(2) {
            self.walk_expr(arg);
        }
    }
}
