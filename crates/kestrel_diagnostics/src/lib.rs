//! kestrel_diagnostics: Diagnostic messages and error reporting infrastructure.
//!
//! Every problem found by any phase is recorded as a [`Diagnostic`] in a
//! [`DiagnosticCollection`] owned by a single compilation. Phases never stop
//! on a diagnostic; the driver inspects the collection between phases.

use kestrel_core::text::Position;
use std::fmt;

/// Diagnostic category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCategory {
    Warning,
    Error,
}

impl fmt::Display for DiagnosticCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticCategory::Warning => write!(f, "warning"),
            DiagnosticCategory::Error => write!(f, "error"),
        }
    }
}

/// The phase a diagnostic belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DiagnosticKind {
    /// Reported by the external scanner.
    Lexical,
    /// Reported by the external parser, or a tree that breaks the node contract.
    Syntactic,
    /// Reported by the semantic analyzer.
    Semantic,
    /// Engine-fatal conditions raised while generating code.
    Codegen,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::Lexical => write!(f, "lexical"),
            DiagnosticKind::Syntactic => write!(f, "syntactic"),
            DiagnosticKind::Semantic => write!(f, "semantic"),
            DiagnosticKind::Codegen => write!(f, "codegen"),
        }
    }
}

/// A diagnostic message template with a code, kind and category.
#[derive(Debug, Clone)]
pub struct DiagnosticMessage {
    /// The diagnostic code (e.g., 2001).
    pub code: u32,
    /// The phase that reports this message.
    pub kind: DiagnosticKind,
    /// The category of this diagnostic.
    pub category: DiagnosticCategory,
    /// The message template string. May contain `{0}`, `{1}`, etc. placeholders.
    pub message: &'static str,
}

/// A realized diagnostic with location information and resolved message text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Where this diagnostic occurred, if the tree carried a position.
    pub position: Option<Position>,
    /// The resolved message text.
    pub message_text: String,
    /// The diagnostic code.
    pub code: u32,
    pub kind: DiagnosticKind,
    pub category: DiagnosticCategory,
}

impl Diagnostic {
    /// Create a new diagnostic without location info.
    pub fn new(message: &DiagnosticMessage, args: &[&str]) -> Self {
        Self {
            position: None,
            message_text: format_message(message.message, args),
            code: message.code,
            kind: message.kind,
            category: message.category,
        }
    }

    /// Create a new diagnostic anchored at an optional position.
    pub fn at(position: Option<Position>, message: &DiagnosticMessage, args: &[&str]) -> Self {
        Self {
            position,
            ..Self::new(message, args)
        }
    }

    /// Whether this is an error diagnostic.
    pub fn is_error(&self) -> bool {
        self.category == DiagnosticCategory::Error
    }

    /// Whether this diagnostic was produced from the given message template.
    pub fn is(&self, message: &DiagnosticMessage) -> bool {
        self.code == message.code
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(position) = self.position {
            write!(f, "{}: ", position)?;
        }
        write!(
            f,
            "{} {} K{}: {}",
            self.kind, self.category, self.code, self.message_text
        )
    }
}

/// Format a diagnostic message template by replacing `{0}`, `{1}`, etc. with arguments.
pub fn format_message(template: &str, args: &[&str]) -> String {
    let mut result = template.to_string();
    for (i, arg) in args.iter().enumerate() {
        result = result.replace(&format!("{{{}}}", i), arg);
    }
    result
}

/// Per-kind diagnostic counts for the driver's summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiagnosticSummary {
    pub lexical: usize,
    pub syntactic: usize,
    pub semantic: usize,
    pub codegen: usize,
}

impl DiagnosticSummary {
    pub fn total(&self) -> usize {
        self.lexical + self.syntactic + self.semantic + self.codegen
    }
}

/// A collection of diagnostics accumulated during compilation.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticCollection {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollection {
    pub fn new() -> Self {
        Self {
            diagnostics: Vec::new(),
        }
    }

    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Record a problem found by the external scanner.
    pub fn add_lexical(&mut self, text: &str, line: u32, column: u32) {
        self.add(Diagnostic::at(
            Some(Position::new(line, column)),
            &messages::LEXICAL_ERROR,
            &[text],
        ));
    }

    /// Record a problem found by the external parser.
    pub fn add_syntactic(&mut self, text: &str, position: Option<Position>) {
        self.add(Diagnostic::at(position, &messages::SYNTAX_ERROR, &[text]));
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.category == DiagnosticCategory::Error)
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.category == DiagnosticCategory::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.category == DiagnosticCategory::Warning)
            .count()
    }

    pub fn count_of(&self, kind: DiagnosticKind) -> usize {
        self.diagnostics.iter().filter(|d| d.kind == kind).count()
    }

    /// Number of diagnostics produced from one message template.
    pub fn count_message(&self, message: &DiagnosticMessage) -> usize {
        self.diagnostics.iter().filter(|d| d.is(message)).count()
    }

    pub fn summary(&self) -> DiagnosticSummary {
        let mut summary = DiagnosticSummary::default();
        for d in &self.diagnostics {
            match d.kind {
                DiagnosticKind::Lexical => summary.lexical += 1,
                DiagnosticKind::Syntactic => summary.syntactic += 1,
                DiagnosticKind::Semantic => summary.semantic += 1,
                DiagnosticKind::Codegen => summary.codegen += 1,
            }
        }
        summary
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn extend(&mut self, other: DiagnosticCollection) {
        self.diagnostics.extend(other.diagnostics);
    }

    pub fn clear(&mut self) {
        self.diagnostics.clear();
    }

    /// Sort diagnostics by position. Unpositioned diagnostics keep their
    /// relative order and sort first.
    pub fn sort(&mut self) {
        self.diagnostics.sort_by_key(|d| d.position);
    }
}

// ============================================================================
// Diagnostic Messages
// ============================================================================

pub mod messages {
    use super::*;

    macro_rules! diag {
        ($code:expr, $kind:ident, Error, $msg:expr) => {
            DiagnosticMessage { code: $code, kind: DiagnosticKind::$kind, category: DiagnosticCategory::Error, message: $msg }
        };
        ($code:expr, $kind:ident, Warning, $msg:expr) => {
            DiagnosticMessage { code: $code, kind: DiagnosticKind::$kind, category: DiagnosticCategory::Warning, message: $msg }
        };
    }

    // ========================================================================
    // Boundary errors from the scanner and parser (1000-1199)
    // ========================================================================
    pub const LEXICAL_ERROR: DiagnosticMessage = diag!(1001, Lexical, Error, "{0}");
    pub const SYNTAX_ERROR: DiagnosticMessage = diag!(1101, Syntactic, Error, "{0}");
    pub const MALFORMED_TREE: DiagnosticMessage = diag!(1102, Syntactic, Error, "Malformed '{0}' node: {1}.");

    // ========================================================================
    // Semantic errors (2000-2999)
    // ========================================================================
    pub const UNDECLARED_VARIABLE: DiagnosticMessage = diag!(2001, Semantic, Error, "Undeclared variable '{0}'.");
    pub const DUPLICATE_DECLARATION: DiagnosticMessage = diag!(2002, Semantic, Error, "'{0}' is already declared in scope '{1}'.");
    pub const ASSIGNMENT_TYPE_ERROR: DiagnosticMessage = diag!(2003, Semantic, Error, "Cannot assign a value of type '{0}' to '{1}' of type '{2}'.");
    pub const OPERATOR_TYPE_ERROR: DiagnosticMessage = diag!(2004, Semantic, Error, "Operator '{0}' cannot be applied to {1}.");
    pub const EQUALITY_TYPE_MISMATCH: DiagnosticMessage = diag!(2005, Semantic, Warning, "Comparison with '{0}' between different types '{1}' and '{2}'.");
    pub const UNDECLARED_FUNCTION: DiagnosticMessage = diag!(2006, Semantic, Error, "Undeclared function '{0}'.");
    pub const ARGUMENT_COUNT_MISMATCH: DiagnosticMessage = diag!(2007, Semantic, Error, "Function '{0}' expects {1} argument(s) but received {2}.");
    pub const BREAK_OUTSIDE_CONSTRUCT: DiagnosticMessage = diag!(2008, Semantic, Error, "'break' must appear inside a loop or switch.");
    pub const EXIT_OUTSIDE_LOOP: DiagnosticMessage = diag!(2009, Semantic, Error, "'exit' must appear inside an indefinite loop.");
    pub const UNKNOWN_TYPE: DiagnosticMessage = diag!(2010, Semantic, Error, "Unknown type '{0}'.");
    pub const ARRAY_TOO_LARGE: DiagnosticMessage = diag!(2011, Semantic, Error, "Array dimensions '{0}' exceed the limit of {1} elements.");

    // ========================================================================
    // Code generation (3000-3099)
    // ========================================================================
    pub const REGISTER_EXHAUSTED: DiagnosticMessage = diag!(3001, Codegen, Error, "Expression needs more than {0} temporary registers; code generation aborted.");
    pub const CODEGEN_FAILED: DiagnosticMessage = diag!(3002, Codegen, Error, "Code generation failed: {0}.");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_message() {
        assert_eq!(
            format_message("'{0}' is already declared in scope '{1}'.", &["x", "GLOBAL"]),
            "'x' is already declared in scope 'GLOBAL'."
        );
    }

    #[test]
    fn test_display_with_position() {
        let d = Diagnostic::at(Some(Position::new(3, 7)), &messages::UNDECLARED_VARIABLE, &["z"]);
        assert_eq!(d.to_string(), "3:7: semantic error K2001: Undeclared variable 'z'.");
    }

    #[test]
    fn test_display_without_position() {
        let d = Diagnostic::new(&messages::EQUALITY_TYPE_MISMATCH, &["==", "int", "bool"]);
        assert_eq!(
            d.to_string(),
            "semantic warning K2005: Comparison with '==' between different types 'int' and 'bool'."
        );
    }

    #[test]
    fn test_collection_counts() {
        let mut diags = DiagnosticCollection::new();
        diags.add_lexical("Unexpected character '@'", 1, 4);
        diags.add_syntactic("';' expected", None);
        diags.add(Diagnostic::new(&messages::UNDECLARED_VARIABLE, &["a"]));
        diags.add(Diagnostic::new(&messages::EQUALITY_TYPE_MISMATCH, &["!=", "int", "char"]));

        assert_eq!(diags.len(), 4);
        assert_eq!(diags.error_count(), 3);
        assert_eq!(diags.warning_count(), 1);
        assert!(diags.has_errors());
        assert_eq!(diags.count_of(DiagnosticKind::Semantic), 2);
        assert_eq!(diags.count_message(&messages::UNDECLARED_VARIABLE), 1);

        let summary = diags.summary();
        assert_eq!(summary.lexical, 1);
        assert_eq!(summary.syntactic, 1);
        assert_eq!(summary.semantic, 2);
        assert_eq!(summary.codegen, 0);
        assert_eq!(summary.total(), 4);
    }

    #[test]
    fn test_warnings_alone_are_not_errors() {
        let mut diags = DiagnosticCollection::new();
        diags.add(Diagnostic::new(&messages::EQUALITY_TYPE_MISMATCH, &["==", "int", "float"]));
        assert!(!diags.has_errors());
        assert!(!diags.is_empty());
    }

    #[test]
    fn test_sort_by_position_is_stable() {
        let mut diags = DiagnosticCollection::new();
        diags.add(Diagnostic::at(Some(Position::new(5, 1)), &messages::UNDECLARED_VARIABLE, &["b"]));
        diags.add(Diagnostic::at(Some(Position::new(2, 1)), &messages::UNDECLARED_VARIABLE, &["a"]));
        diags.add(Diagnostic::new(&messages::UNDECLARED_FUNCTION, &["f"]));
        diags.sort();

        let texts: Vec<_> = diags.diagnostics().iter().map(|d| d.message_text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["Undeclared function 'f'.", "Undeclared variable 'a'.", "Undeclared variable 'b'."]
        );
    }
}
