//! Re-parses the input under forced decisions to show how each alternative of a decision
//! reads the same tokens.

use std::fmt;
use std::rc::Rc;

use bit_vec::BitVec;
use leftrec_atn::{Atn, PredictionMode};
use leftrec_grammar::Grammar;
use log::debug;

use crate::error::ParseError;
use crate::interpreter::{InterpreterOptions, ParserInterpreter};
use crate::strategy::{BailButConsumeErrorStrategy, BailErrorStrategy};
use crate::token_stream::TokenStream;
use crate::tree::ParseTree;

/// A parser whose decisions can be replayed.
pub trait Parser {
    fn atn(&self) -> &Rc<Atn>;

    fn token_stream(&self) -> &TokenStream;

    fn as_interpreter(&self) -> Option<&ParserInterpreter> {
        None
    }
}

impl Parser for ParserInterpreter {
    fn atn(&self) -> &Rc<Atn> {
        ParserInterpreter::atn(self)
    }

    fn token_stream(&self) -> &TokenStream {
        ParserInterpreter::token_stream(self)
    }

    fn as_interpreter(&self) -> Option<&ParserInterpreter> {
        Some(self)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ReconstructError {
    /// The parser's automaton doesn't belong to the grammar.
    UnsupportedParser,
    InvalidDecision(usize),
    /// The tree of the alternative covers no rule context around the token range.
    NoEnclosingSubtree { alt: usize },
    Parse(ParseError),
}

impl fmt::Display for ReconstructError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ReconstructError::UnsupportedParser => {
                write!(f, "can't create an interpreter matching the parser")
            }
            ReconstructError::InvalidDecision(decision) => {
                write!(f, "no decision {} in the automaton", decision)
            }
            ReconstructError::NoEnclosingSubtree { alt } => {
                write!(f, "no subtree of alt {} encloses the token range", alt)
            }
            ReconstructError::Parse(error) => write!(f, "{}", error),
        }
    }
}

impl std::error::Error for ReconstructError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReconstructError::Parse(error) => Some(error),
            _ => None,
        }
    }
}

impl From<ParseError> for ReconstructError {
    fn from(error: ParseError) -> Self {
        ReconstructError::Parse(error)
    }
}

/// A fresh interpreter over the same automaton and token buffer as `original`. It bails at
/// the first error and reports every exact ambiguity. `original` is left as it is.
///
/// The automaton of `original` must have the rule names of `grammar`.
pub fn derive_temp_parser_interpreter(
    grammar: &Rc<Grammar>,
    original: &dyn Parser,
    tokens: &TokenStream,
) -> Result<ParserInterpreter, ReconstructError> {
    let options = InterpreterOptions {
        prediction_mode: PredictionMode::LlExactAmbigDetection,
        ..InterpreterOptions::default()
    };
    if original.atn().rule_names != grammar.rule_names() {
        return Err(ReconstructError::UnsupportedParser);
    }
    let mut parser = match original.as_interpreter() {
        Some(interpreter) => ParserInterpreter::with_tracker(
            Rc::clone(grammar),
            Rc::clone(interpreter.atn()),
            Rc::clone(interpreter.tracker()),
            tokens.shared(),
            InterpreterOptions {
                max_closure_depth: interpreter.options().max_closure_depth,
                ..options
            },
        ),
        None => ParserInterpreter::with_options(
            Rc::clone(grammar),
            Rc::clone(original.atn()),
            tokens.shared(),
            options,
        ),
    };
    parser.set_error_strategy(Box::new(BailErrorStrategy::new()));
    Ok(parser)
}

/// One tree per alternative in `alts`, each the smallest subtree covering
/// `start_index..=stop_index` when `decision` is forced to that alternative at
/// `start_index`.
#[allow(clippy::too_many_arguments)]
pub fn get_all_possible_parse_trees(
    grammar: &Rc<Grammar>,
    original: &dyn Parser,
    tokens: &TokenStream,
    decision: usize,
    alts: &BitVec,
    start_index: usize,
    stop_index: usize,
    start_rule: usize,
) -> Result<Vec<ParseTree>, ReconstructError> {
    let mut parser = derive_temp_parser_interpreter(grammar, original, tokens)?;
    if decision >= parser.atn().num_decisions() {
        return Err(ReconstructError::InvalidDecision(decision));
    }
    // EOF is never inside the enclosing subtree.
    let stop_index = if stop_index + 1 >= tokens.size() {
        tokens.size().saturating_sub(2)
    } else {
        stop_index
    };

    let mut trees = vec![];
    for alt in alts.iter().enumerate().filter(|&(_, bit)| bit).map(|(alt, _)| alt) {
        parser.reset();
        parser.add_decision_override(decision, start_index, alt);
        let root = parser.parse(start_rule)?;
        let tree = parser.parse_tree();
        let mut subtree = tree
            .get_root_of_subtree_enclosing_region(root, start_index, stop_index)
            .ok_or(ReconstructError::NoEnclosingSubtree { alt })?;
        let override_root = parser.override_decision_root();
        if let Some(override_root) = override_root {
            if tree.is_ancestor_of(Some(override_root), Some(subtree)) {
                subtree = override_root;
            }
        }
        debug!("decision {} alt {}: subtree {:?}", decision, alt, subtree);
        trees.push(tree.clone().with_root(subtree));
    }
    Ok(trees)
}

/// One tree per alternative of `decision`, parsed with that alternative forced at
/// `start_index`. Each tree stops at the first error of its parse, and subtrees entirely
/// outside the range are shown as `...`.
pub fn get_lookahead_parse_trees(
    grammar: &Rc<Grammar>,
    original: &dyn Parser,
    tokens: &TokenStream,
    start_rule: usize,
    decision: usize,
    start_index: usize,
    stop_index: usize,
) -> Result<Vec<ParseTree>, ReconstructError> {
    let mut parser = derive_temp_parser_interpreter(grammar, original, tokens)?;
    let num_alts = original
        .atn()
        .decision_state(decision)
        .map(|state| state.transitions.len())
        .ok_or(ReconstructError::InvalidDecision(decision))?;

    let mut trees = vec![];
    for alt in 1..=num_alts {
        parser.set_error_strategy(Box::new(BailButConsumeErrorStrategy::new()));
        parser.reset();
        parser.add_decision_override(decision, start_index, alt);
        let root = parser.parse(start_rule)?;
        let mut stop_tree_at = parser
            .error_strategy()
            .first_error_token_index()
            .unwrap_or(stop_index);
        let tree = parser.parse_tree();
        // The tree holds no node for tokens past its end, such as an unmatched EOF.
        let overall = tree.source_interval(root);
        if stop_tree_at as isize > overall.b {
            stop_tree_at = overall.b.max(0) as usize;
        }
        let mut subtree = tree
            .get_root_of_subtree_enclosing_region(root, start_index, stop_tree_at)
            .ok_or(ReconstructError::NoEnclosingSubtree { alt })?;
        let override_root = parser.override_decision_root();
        if let Some(override_root) = override_root {
            if tree.is_ancestor_of(Some(override_root), Some(subtree)) {
                subtree = override_root;
            }
        }
        let mut tree = tree.clone();
        tree.strip_children_out_of_range(subtree, override_root, start_index, stop_tree_at);
        debug!(
            "decision {} alt {}: lookahead tree up to token {}",
            decision, alt, stop_tree_at
        );
        trees.push(tree.with_root(subtree));
    }
    Ok(trees)
}
