//! Checker diagnostic codes and the span-based problem record.

use skiff_diagnostics::{Category, Diagnostic, DiagnosticCode};

use crate::span::{LineIndex, Span};

/// Unterminated string literal.
pub const UNTERMINATED_STRING: DiagnosticCode = DiagnosticCode::new(Category::Error, 1002);
/// Token expected.
pub const TOKEN_EXPECTED: DiagnosticCode = DiagnosticCode::new(Category::Error, 1005);
/// Invalid character.
pub const INVALID_CHARACTER: DiagnosticCode = DiagnosticCode::new(Category::Error, 1127);
/// Declaration or statement expected.
pub const DECLARATION_EXPECTED: DiagnosticCode = DiagnosticCode::new(Category::Error, 1128);
/// Cannot find name.
pub const CANNOT_FIND_NAME: DiagnosticCode = DiagnosticCode::new(Category::Error, 2304);
/// Module has no exported member.
pub const NO_EXPORTED_MEMBER: DiagnosticCode = DiagnosticCode::new(Category::Error, 2305);
/// Cannot find module.
pub const CANNOT_FIND_MODULE: DiagnosticCode = DiagnosticCode::new(Category::Error, 2307);
/// Type is not assignable.
pub const NOT_ASSIGNABLE: DiagnosticCode = DiagnosticCode::new(Category::Error, 2322);
/// Property does not exist on a type.
pub const NO_PROPERTY: DiagnosticCode = DiagnosticCode::new(Category::Error, 2339);
/// Argument type is not assignable to the parameter type.
pub const BAD_ARGUMENT: DiagnosticCode = DiagnosticCode::new(Category::Error, 2345);
/// Binding used before its declaration.
pub const USED_BEFORE_DECLARATION: DiagnosticCode = DiagnosticCode::new(Category::Error, 2448);
/// Binding declared twice.
pub const REDECLARED: DiagnosticCode = DiagnosticCode::new(Category::Error, 2451);
/// Enum member initializer is not a constant.
pub const NON_CONSTANT_ENUM_MEMBER: DiagnosticCode = DiagnosticCode::new(Category::Error, 2474);

/// A problem found in one file, located by byte span.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Problem {
    /// The diagnostic code.
    pub code: DiagnosticCode,
    /// The message.
    pub message: String,
    /// Where it was found.
    pub span: Span,
}

impl Problem {
    /// Creates a problem.
    pub fn new(code: DiagnosticCode, message: impl Into<String>, span: Span) -> Self {
        Self {
            code,
            message: message.into(),
            span,
        }
    }

    /// Converts to a diagnostic with a 1-based position in `path`.
    pub fn into_diagnostic(self, path: &str, lines: &LineIndex) -> Diagnostic {
        let (line, column) = lines.line_col(self.span.start);
        Diagnostic::error(self.code, self.message).at(path, line + 1, column + 1)
    }
}
