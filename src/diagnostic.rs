/// Diagnostics produced by the validators.
///
/// Every validator reports its findings as an ordered sequence of
/// [`Diagnostic`] values instead of returning early on the first problem.
use crate::error::Error;
use serde::Serialize;
use std::fmt;

/// How serious a finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Severity {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "WARNING")]
    Warning,
    #[serde(rename = "ERROR")]
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Ok => "OK",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of check produced a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// A passed check or an informational note.
    Check,
    /// The part is not well-formed XML.
    Parse,
    /// A required attribute is absent.
    MissingAttribute,
    /// A key that must be unique within its part appears more than once.
    DuplicateKey,
    /// A resolved path does not exist on disk, or an id is not declared.
    UnresolvedReference,
    /// Identifiers disagree across documents of the same package.
    CrossDocumentMismatch,
    /// The environment prevented a check (permissions, unreadable directory).
    Io,
}

/// A single finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub category: Category,
    pub message: String,
}

impl Diagnostic {
    pub fn new(severity: Severity, category: Category, message: impl Into<String>) -> Self {
        Self {
            severity,
            category,
            message: message.into(),
        }
    }

    #[inline]
    pub fn ok(message: impl Into<String>) -> Self {
        Self::new(Severity::Ok, Category::Check, message)
    }

    #[inline]
    pub fn warning(category: Category, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, category, message)
    }

    #[inline]
    pub fn error(category: Category, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, category, message)
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl From<&Error> for Diagnostic {
    fn from(err: &Error) -> Self {
        let category = match err {
            Error::Parse { .. } => Category::Parse,
            Error::Io { .. } | Error::NotADirectory(_) => Category::Io,
            Error::InvalidPackUri(_) => Category::UnresolvedReference,
            Error::Json(_) => Category::Check,
        };
        Diagnostic::error(category, err.to_string())
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.message)
    }
}

/// Appends the synthesized "clean" diagnostic when nothing else was reported.
///
/// Lets callers tell "validated, clean" apart from "not validated".
pub(crate) fn finish(mut diagnostics: Vec<Diagnostic>, clean_message: &str) -> Vec<Diagnostic> {
    if diagnostics.is_empty() {
        diagnostics.push(Diagnostic::ok(clean_message));
    }
    diagnostics
}

/// The diagnostics of one validated part or cross-reference phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartReport {
    /// What was validated: a path, or the name of a package-wide phase.
    pub subject: String,
    pub diagnostics: Vec<Diagnostic>,
}

impl PartReport {
    pub fn new(subject: impl Into<String>, diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            subject: subject.into(),
            diagnostics,
        }
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finish_only_adds_ok_when_empty() {
        let clean = finish(Vec::new(), "clean");
        assert_eq!(clean, vec![Diagnostic::ok("clean")]);

        let dirty = finish(
            vec![Diagnostic::error(Category::DuplicateKey, "dup")],
            "clean",
        );
        assert_eq!(dirty.len(), 1);
        assert!(dirty[0].is_error());
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Ok < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);

        let report = PartReport::new(
            "x",
            vec![
                Diagnostic::ok("a"),
                Diagnostic::warning(Category::Check, "b"),
            ],
        );
        assert_eq!(report.error_count(), 0);
    }

    #[test]
    fn test_parse_error_maps_to_parse_category() {
        let err = Error::parse("/pkg/a.xml", "unexpected end");
        let diag = Diagnostic::from(&err);
        assert_eq!(diag.category, Category::Parse);
        assert!(diag.is_error());
        assert!(diag.message.contains("unexpected end"));
    }
}
