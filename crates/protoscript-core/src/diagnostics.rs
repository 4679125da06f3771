//! Diagnostic records surfaced by the IR loader and, optionally, by an
//! embedder that wants to render a runtime exception the same way a loader
//! error is rendered.

use std::fmt;

/// Severity of a [`Diagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    Error,
    Warning,
    Info,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DiagnosticKind::Error => "error",
            DiagnosticKind::Warning => "warning",
            DiagnosticKind::Info => "info",
        };
        f.write_str(s)
    }
}

/// A single diagnostic: a message located at an (optional) source position,
/// with an optional stable code/category pair for machine consumption.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub file: Option<String>,
    pub line: u32,
    pub column: u32,
    pub code: Option<&'static str>,
    pub category: Option<&'static str>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            kind: DiagnosticKind::Error,
            message: message.into(),
            file: None,
            line: 1,
            column: 1,
            code: None,
            category: None,
        }
    }

    pub fn at(mut self, file: impl Into<String>, line: u32, column: u32) -> Self {
        self.file = Some(file.into());
        self.line = line;
        self.column = column;
        self
    }

    pub fn with_code(mut self, code: &'static str, category: &'static str) -> Self {
        self.code = Some(code);
        self.category = Some(category);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let loc = self.file.as_deref().unwrap_or("<unknown>");
        write!(f, "{}:{}:{} {}", loc, self.line, self.column, self.kind)?;
        if let (Some(code), Some(category)) = (self.code, self.category) {
            write!(f, " [{code} {category}]")?;
        }
        write!(f, ": {}", self.message)
    }
}

/// An ordered collection of diagnostics, matching the teacher's
/// `Diagnostics` accumulator: callers push as they go and query
/// `has_errors`/`has_warnings` before deciding whether to proceed.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics { items: Vec::new() }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.kind == DiagnosticKind::Error)
    }

    pub fn has_warnings(&self) -> bool {
        self.items
            .iter()
            .any(|d| d.kind == DiagnosticKind::Warning)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_with_code() {
        let d = Diagnostic::error("bad thing")
            .at("main.ps", 3, 7)
            .with_code("R1002", "RUNTIME_INDEX_OOB");
        assert_eq!(
            d.to_string(),
            "main.ps:3:7 error [R1002 RUNTIME_INDEX_OOB]: bad thing"
        );
    }

    #[test]
    fn accumulator_tracks_errors_and_warnings() {
        let mut diags = Diagnostics::new();
        assert!(!diags.has_errors());
        diags.push(Diagnostic {
            kind: DiagnosticKind::Warning,
            message: "heads up".into(),
            file: None,
            line: 1,
            column: 1,
            code: None,
            category: None,
        });
        assert!(diags.has_warnings());
        assert!(!diags.has_errors());
        diags.push(Diagnostic::error("boom"));
        assert!(diags.has_errors());
        assert_eq!(diags.len(), 2);
    }
}
