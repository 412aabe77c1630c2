//! Interpretation of rewritten grammars.
//!
//! [`ParserInterpreter`] walks the automaton of a grammar over typed tokens. Rule contexts
//! record the alternative of the rule as written, so trees of rewritten left-recursive rules
//! read as if the rules had been parsed directly. The [`reconstruct`] functions replay a
//! decision with each of its alternatives forced.

#![deny(unsafe_code)]

pub mod error;
pub mod interpreter;
pub mod reconstruct;
pub mod strategy;
pub mod token_stream;
pub mod tree;

pub use crate::error::{ParseError, RecognitionError};
pub use crate::interpreter::{DecisionOverride, InterpreterOptions, ParserInterpreter};
pub use crate::reconstruct::{
    Parser, ReconstructError, derive_temp_parser_interpreter, get_all_possible_parse_trees,
    get_lookahead_parse_trees,
};
pub use crate::strategy::{
    BailButConsumeErrorStrategy, BailErrorStrategy, DefaultErrorStrategy, ErrorStrategy,
    InlineRecovery,
};
pub use crate::token_stream::{InputToken, TokenStream, UnknownWord};
pub use crate::tree::{Interval, Node, NodeId, ParseNode, ParseTree, RuleNode};
