//! Diagnostics in the shape `textDocument/publishDiagnostics` expects.

use serde::{Serialize, Serializer};

use crate::lint::LintError;
use crate::{DIAGNOSTIC_SOURCE, ERROR_ID};

/// Severity level for a diagnostic.
///
/// JSHint only distinguishes hard errors from warnings, so only the two
/// LSP levels it can produce are modelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiagnosticSeverity {
    Error = 1,
    Warning = 2,
}

impl DiagnosticSeverity {
    /// Derive the severity from an upstream error `id`.
    ///
    /// `"(error)"` is an error; any other value (or none) is a warning.
    #[must_use]
    pub fn from_lint_id(id: Option<&str>) -> Self {
        if id == Some(ERROR_ID) {
            Self::Error
        } else {
            Self::Warning
        }
    }
}

impl Serialize for DiagnosticSeverity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

/// Zero-based line/character position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    /// A zero-width range at `position`.
    #[must_use]
    pub fn point(position: Position) -> Self {
        Self {
            start: position,
            end: position,
        }
    }
}

/// A single published problem.
///
/// Fields are private; construction goes through [`Diagnostic::new`] or
/// [`Diagnostic::from_lint`]. Start and end always coincide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    range: Range,
    severity: DiagnosticSeverity,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
    source: &'static str,
    message: String,
}

impl Diagnostic {
    #[must_use]
    pub fn new(
        severity: DiagnosticSeverity,
        message: String,
        code: Option<String>,
        position: Position,
    ) -> Self {
        Self {
            range: Range::point(position),
            severity,
            code,
            source: DIAGNOSTIC_SOURCE,
            message,
        }
    }

    /// Translate an upstream error record.
    ///
    /// Upstream positions are 1-based; they are shifted to 0-based and
    /// clamped at zero.
    #[must_use]
    pub fn from_lint(error: &LintError) -> Self {
        let position = Position {
            line: to_zero_based(error.line),
            character: to_zero_based(error.character),
        };
        Self::new(
            DiagnosticSeverity::from_lint_id(error.id.as_deref()),
            error.reason.clone().unwrap_or_default(),
            error.code_string(),
            position,
        )
    }

    #[must_use]
    pub fn severity(&self) -> DiagnosticSeverity {
        self.severity
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    #[must_use]
    pub fn range(&self) -> Range {
        self.range
    }

    /// 0-indexed line number.
    #[must_use]
    pub fn line(&self) -> u32 {
        self.range.start.line
    }

    /// 0-indexed column.
    #[must_use]
    pub fn character(&self) -> u32 {
        self.range.start.character
    }
}

fn to_zero_based(one_based: Option<i64>) -> u32 {
    let value = one_based.unwrap_or(1).saturating_sub(1);
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}
