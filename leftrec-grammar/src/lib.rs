//! Front end for left-recursion rewriting.
//!
//! Grammar text is split into tokens (hidden tokens included) and parsed into one syntax
//! tree per rule. Rules later rewritten by `leftrec-rewrite` keep a record of their
//! original form in [`LeftRecursion`].

#![deny(unsafe_code)]

pub mod ast;
pub mod diagnostics;
pub mod grammar;
mod lexer;
mod parser;
pub mod token;
pub mod vocabulary;

use std::fmt;

pub use crate::ast::{Ast, EbnfKind, ElementOption, Node, NodeId, NodeKind};
pub use crate::diagnostics::{Diagnostic, ErrorKind, ErrorManager, Location, Severity};
pub use crate::grammar::{Grammar, LeftRecursion, RecursiveAltInfo, Rule};
pub use crate::token::{Token, TokenKind};
pub use crate::vocabulary::{EOF, TokenType, Vocabulary};

/// Represents an error when loading grammar text.
#[derive(Debug, Clone)]
pub struct LoadError {
    /// Human-readable reason for the error.
    pub reason: String,
    /// Line where the error happened.
    ///
    /// One-indexed.
    pub line: u32,
    /// Column where the error happened.
    ///
    /// One-indexed.
    pub col: u32,
    /// Optionally, the token at which the error happened.
    pub token: Option<Token>,
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.token {
            Some(token) => write!(
                f,
                "Parse error at line {} column {}: reason: {} token: {:?}",
                self.line, self.col, self.reason, token.text
            ),
            None => write!(
                f,
                "Parse error at line {} column {}: reason: {}",
                self.line, self.col, self.reason
            ),
        }
    }
}

impl std::error::Error for LoadError {}
