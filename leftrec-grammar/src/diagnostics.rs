//! Tool and grammar diagnostics.
//!
//! An [`ErrorManager`] belongs to one tool invocation and is passed explicitly to every pass
//! that reports problems.

use std::fmt;

use log::{error, warn};

use crate::token::Token;

/// Kinds of reported problems.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorKind {
    /// An internal inconsistency of the tool.
    InternalError,
    /// An option has a value outside of its domain.
    IllegalOptionValue,
    /// A rule refers to itself on the left, but does not fit any rewritable shape.
    NonconformingLrRule,
    /// A left-recursive rule has no alternative to start from.
    NoNonLrAlts,
    /// A code generation template does not declare an argument it is given.
    CodeTemplateArgIssue,
    /// A required code generation template is missing.
    MissingCodeTemplate,
    /// Rules that are mutually left-recursive.
    LeftRecursionCycles,
}

impl ErrorKind {
    fn describe(self, args: &[String]) -> String {
        let arg = |i: usize| args.get(i).map_or("", |arg| &arg[..]);
        match self {
            ErrorKind::InternalError => format!("internal error: {}", arg(0)),
            ErrorKind::IllegalOptionValue => {
                format!("unsupported option value {}={}", arg(0), arg(1))
            }
            ErrorKind::NonconformingLrRule => {
                format!("rule {} is left recursive but doesn't conform to a pattern that can be rewritten", arg(0))
            }
            ErrorKind::NoNonLrAlts => format!(
                "left recursive rule {} must contain an alternative which is not left recursive",
                arg(0)
            ),
            ErrorKind::CodeTemplateArgIssue => {
                format!("code generation template {} has missing, misnamed, or incomplete arg list; missing {}", arg(0), arg(1))
            }
            ErrorKind::MissingCodeTemplate => {
                format!("cannot find code generation template {}", arg(0))
            }
            ErrorKind::LeftRecursionCycles => format!(
                "The following sets of rules are mutually left-recursive {}",
                arg(0)
            ),
        }
    }
}

/// Channel a diagnostic was reported through.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Severity {
    Tool,
    Grammar,
    Warning,
}

/// Source location of a grammar diagnostic.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Location {
    pub file_name: String,
    /// One-indexed.
    pub line: u32,
    /// One-indexed.
    pub col: u32,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Diagnostic {
    pub kind: ErrorKind,
    pub severity: Severity,
    pub message: String,
    pub args: Vec<String>,
    pub location: Option<Location>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let prefix = match self.severity {
            Severity::Tool | Severity::Grammar => "error",
            Severity::Warning => "warning",
        };
        match &self.location {
            Some(Location {
                file_name,
                line,
                col,
            }) => write!(f, "{}({:?}): {}:{}:{}: {}", prefix, self.kind, file_name, line, col, self.message),
            None => write!(f, "{}({:?}): {}", prefix, self.kind, self.message),
        }
    }
}

/// Collects the diagnostics of one tool invocation.
#[derive(Clone, Debug, Default)]
pub struct ErrorManager {
    file_name: String,
    warnings_are_errors: bool,
    diagnostics: Vec<Diagnostic>,
}

impl ErrorManager {
    pub fn new(file_name: impl Into<String>, warnings_are_errors: bool) -> Self {
        ErrorManager {
            file_name: file_name.into(),
            warnings_are_errors,
            diagnostics: vec![],
        }
    }

    /// Reports a problem of the tool itself, with no grammar location.
    pub fn tool_error(&mut self, kind: ErrorKind, args: &[&str]) {
        self.report(kind, Severity::Tool, args, None);
    }

    /// Reports a problem with the grammar at the given token.
    pub fn grammar_error(&mut self, kind: ErrorKind, token: Option<&Token>, args: &[&str]) {
        let location = self.location(token);
        self.report(kind, Severity::Grammar, args, location);
    }

    pub fn warning(&mut self, kind: ErrorKind, token: Option<&Token>, args: &[&str]) {
        let location = self.location(token);
        let severity = if self.warnings_are_errors {
            Severity::Grammar
        } else {
            Severity::Warning
        };
        self.report(kind, severity, args, location);
    }

    fn location(&self, token: Option<&Token>) -> Option<Location> {
        token.map(|token| Location {
            file_name: self.file_name.clone(),
            line: token.line,
            col: token.col,
        })
    }

    fn report(&mut self, kind: ErrorKind, severity: Severity, args: &[&str], location: Option<Location>) {
        let args: Vec<String> = args.iter().map(|arg| arg.to_string()).collect();
        let diagnostic = Diagnostic {
            kind,
            severity,
            message: kind.describe(&args),
            args,
            location,
        };
        match severity {
            Severity::Tool | Severity::Grammar => error!("{}", diagnostic),
            Severity::Warning => warn!("{}", diagnostic),
        }
        self.diagnostics.push(diagnostic);
    }

    pub fn num_errors(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|diagnostic| diagnostic.severity != Severity::Warning)
            .count()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn has(&self, kind: ErrorKind) -> bool {
        self.diagnostics.iter().any(|diagnostic| diagnostic.kind == kind)
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}
