//! Conduct – a behavior-scripting language runtime for industrial monitoring equipment
//!
//! This crate implements the behavior language used to script monitoring
//! equipment (machines, production lines):
//! - A hand-written lexer/parser producing a positioned syntax tree
//! - Two-pass semantic analysis: symbol definition, then reference validation,
//!   both producing batched positioned diagnostics
//! - A typed scope hierarchy stored as an arena (flat vector, parent indices)
//! - A runtime memory model with a global space and a call stack
//! - A tree-walking evaluator executing scripts against a live
//!   equipment-entity facade: attribute reads/writes, state transitions,
//!   timers for an external scheduler, display output, and time-windowed
//!   aggregation built-ins

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// Language front end: syntax tree, parser, symbols, scopes, analysis phases
pub mod lang;
/// Execution core: value model, memory spaces, evaluator, entity facade
pub mod runtime;

// Re-export key types for convenience
pub use lang::{Analysis, Diagnostic};
pub use runtime::{
    BehaviorError, EntityFacade, EntityId, Outcome, Value, check_behavior, run_behavior,
};

/// Current version of the Conduct runtime
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
