use serde::{Deserialize, Serialize};

use super::ast::Span;

/// A positioned analysis finding.
///
/// The phases collect diagnostics instead of aborting so a caller gets the
/// complete batch for a script in one round trip; a non-empty combined list
/// means the program must not be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Human-readable description of the defect.
    pub message: String,
    /// 1-based source line.
    pub line: u32,
    /// 1-based source column.
    pub column: u32,
}

impl Diagnostic {
    /// Construct a diagnostic at the given span.
    pub fn at(span: Span, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: span.line,
            column: span.column,
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.column, self.message)
    }
}
