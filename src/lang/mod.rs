//! Language front end for behavior scripts.
//!
//! Behavior source text is parsed into a positioned syntax tree and then
//! analyzed in two passes: the definition phase builds the scope arena and
//! registers symbols, the reference phase validates every identifier use
//! against the arena and the equipment-entity facade. Both passes batch
//! their findings as positioned diagnostics; interpretation is refused while
//! any exist.

/// Syntax tree definitions for the behavior language.
pub mod ast;
/// Definition phase: scope creation and symbol registration.
pub mod definition;
/// Positioned diagnostics batched by the analysis phases.
pub mod diagnostics;
/// Parser for the behavior language.
pub mod parser;
/// Reference phase: identifier-use validation.
pub mod reference;
/// Arena-backed scope tree.
pub mod scope;
/// Symbol kinds and reserved names.
pub mod symbol;

pub use ast::{Program, Span};
pub use definition::Analysis;
pub use diagnostics::Diagnostic;
pub use parser::{ParseError, parse_program};
pub use scope::{GLOBAL_SCOPE, ScopeId, ScopeKind, ScopeTree};
pub use symbol::{PROGRAM_SYMBOL, STATE_SYMBOL, Symbol, SymbolKind};
