//! Errors raised while interpreting a grammar.

use std::fmt;

use leftrec_atn::StateId;
use leftrec_grammar::TokenType;

/// The input doesn't match the grammar at some token.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RecognitionError {
    InputMismatch {
        token_index: usize,
        expected: TokenType,
    },
    NoViableAlt {
        token_index: usize,
        /// Where prediction started.
        start_index: usize,
        decision: usize,
    },
    FailedPredicate {
        token_index: usize,
        predicate: String,
    },
}

impl RecognitionError {
    /// Index of the token the parser was looking at.
    pub fn offending_token_index(&self) -> usize {
        match *self {
            RecognitionError::InputMismatch { token_index, .. }
            | RecognitionError::NoViableAlt { token_index, .. }
            | RecognitionError::FailedPredicate { token_index, .. } => token_index,
        }
    }
}

impl fmt::Display for RecognitionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RecognitionError::InputMismatch {
                token_index,
                expected,
            } => write!(
                f,
                "mismatched input at token {}, expecting token type {}",
                token_index, expected
            ),
            RecognitionError::NoViableAlt {
                token_index,
                start_index,
                decision,
            } => write!(
                f,
                "no viable alternative at decision {} for tokens {}..={}",
                decision, start_index, token_index
            ),
            RecognitionError::FailedPredicate {
                token_index,
                predicate,
            } => write!(f, "predicate {} failed at token {}", predicate, token_index),
        }
    }
}

impl std::error::Error for RecognitionError {}

/// A parse that didn't run to completion.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ParseError {
    /// The error strategy gave up at the first error.
    Cancelled(RecognitionError),
    InvalidStartRule(usize),
    /// The automaton has no way to leave this state.
    InvalidState(StateId),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParseError::Cancelled(error) => write!(f, "parse cancelled: {}", error),
            ParseError::InvalidStartRule(rule) => write!(f, "invalid start rule {}", rule),
            ParseError::InvalidState(state) => write!(f, "no way to leave state {}", state),
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParseError::Cancelled(error) => Some(error),
            _ => None,
        }
    }
}
