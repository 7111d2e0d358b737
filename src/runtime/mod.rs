//! Execution core for analyzed behavior programs.
//!
//! The value model, the runtime memory spaces, the entity facade boundary,
//! the built-ins, and the tree-walking evaluator live here, together with
//! [`run_behavior`], the driver that wires parsing, the two analysis passes,
//! and interpretation into one call.

/// Built-in functions of the behavior language.
pub mod builtins;
/// Tree-walking evaluator.
pub mod eval;
/// Equipment-entity facade and the in-memory fixture implementation.
pub mod facade;
/// Memory spaces and the call stack.
pub mod memory;
/// Observable effects of a run.
pub mod outcome;
/// The tagged value model.
pub mod value;

pub use eval::{EvalError, Interpreter};
pub use facade::{DeviceRef, EntityFacade, EntityId, FacadeFixture, StaticEntityFacade};
pub use memory::{CallStack, MemorySpace};
pub use outcome::{DisplayMessage, Outcome, TimerRegistration};
pub use value::{EquipmentState, TimeUnit, Value, ValueType};

use thiserror::Error;

use crate::lang::diagnostics::Diagnostic;
use crate::lang::parser::ParseError;
use crate::lang::{definition, parser, reference};

/// Failure modes of a behavior run. Callers must treat "has diagnostics" and
/// "failed during interpretation" as distinct outcomes: the former is a
/// batch of positioned messages, the latter a single terminal condition.
#[derive(Debug, Error)]
pub enum BehaviorError {
    /// The source text could not be parsed.
    #[error("behavior syntax error: {0}")]
    Syntax(#[from] ParseError),

    /// One or both analysis phases reported defects; the program was not
    /// interpreted.
    #[error("behavior analysis reported {} defect(s)", .0.len())]
    Analysis(Vec<Diagnostic>),

    /// Interpretation aborted on a runtime defect.
    #[error("behavior execution failed: {0}")]
    Eval(#[from] EvalError),
}

/// Convenience result alias for behavior runs.
pub type Result<T> = std::result::Result<T, BehaviorError>;

/// Parse, analyze, and execute a behavior against an entity facade.
///
/// The combined diagnostics of both analysis phases are returned without
/// interpreting when non-empty. On success the returned [`Outcome`] carries
/// the run's observable effects.
pub fn run_behavior(
    source: &str,
    params: &[Value],
    entity: EntityId,
    facade: &dyn EntityFacade,
) -> Result<Outcome> {
    let program = parser::parse_program(source)?;
    let (mut analysis, mut diagnostics) = definition::run(&program);
    diagnostics.extend(reference::run(&program, &mut analysis, &entity, facade));
    if !diagnostics.is_empty() {
        return Err(BehaviorError::Analysis(diagnostics));
    }
    let outcome = Interpreter::new(&program, &analysis, entity, facade).run(params)?;
    Ok(outcome)
}

/// Parse and analyze a behavior without executing it, returning the combined
/// diagnostics of both phases.
pub fn check_behavior(
    source: &str,
    entity: EntityId,
    facade: &dyn EntityFacade,
) -> Result<Vec<Diagnostic>> {
    let program = parser::parse_program(source)?;
    let (mut analysis, mut diagnostics) = definition::run(&program);
    diagnostics.extend(reference::run(&program, &mut analysis, &entity, facade));
    Ok(diagnostics)
}
