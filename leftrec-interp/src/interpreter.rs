//! Interprets the automaton of a grammar over a token stream, building a parse tree whose
//! rule nodes carry the alternative numbers of the rules as written.
//!
//! Left-recursive rules run in their rewritten form. Each iteration of the operator loop
//! wraps the context built so far in a fresh context, so the tree comes out in the shape the
//! original left-recursive rule describes.

use std::rc::Rc;

use leftrec_atn::{
    AmbiguityInfo, Atn, OuterAltTracker, PredictionContext, PredictionMode, Predictor, State,
    StateId, StateKind, Transition,
};
use leftrec_grammar::{EOF, Grammar, TokenType};
use log::{debug, trace};

use crate::error::{ParseError, RecognitionError};
use crate::strategy::{DefaultErrorStrategy, ErrorStrategy, InlineRecovery};
use crate::token_stream::TokenStream;
use crate::tree::{NodeId, ParseTree};

pub const DEFAULT_MAX_CLOSURE_DEPTH: usize = 64;

#[derive(Copy, Clone, Debug)]
pub struct InterpreterOptions {
    pub prediction_mode: PredictionMode,
    /// Whether token and child nodes are added to rule contexts.
    pub build_parse_trees: bool,
    pub max_closure_depth: usize,
}

impl Default for InterpreterOptions {
    fn default() -> Self {
        InterpreterOptions {
            prediction_mode: PredictionMode::Ll,
            build_parse_trees: true,
            max_closure_depth: DEFAULT_MAX_CLOSURE_DEPTH,
        }
    }
}

/// Forces an alternative at one decision and token index.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DecisionOverride {
    pub decision: usize,
    pub token_index: usize,
    pub alt: usize,
}

/// Why a step of the interpreter stopped.
enum Interrupt {
    /// Recovered from by leaving the current rule.
    Recognition(RecognitionError),
    Fatal(ParseError),
}

impl From<ParseError> for Interrupt {
    fn from(error: ParseError) -> Self {
        Interrupt::Fatal(error)
    }
}

pub struct ParserInterpreter {
    grammar: Rc<Grammar>,
    atn: Rc<Atn>,
    tracker: Rc<OuterAltTracker>,
    /// Alternative numbers as written, per physical alternative, for tracked states of
    /// rewritten rules. Filled on first use.
    state_to_alts: Vec<Option<Vec<usize>>>,
    input: TokenStream,
    strategy: Box<dyn ErrorStrategy>,
    options: InterpreterOptions,
    tree: ParseTree,
    ctx: Option<NodeId>,
    state: StateId,
    /// The context a rewritten rule was called from and the state that called it.
    parent_context_stack: Vec<(Option<NodeId>, Option<StateId>)>,
    precedence_stack: Vec<usize>,
    matched_eof: bool,
    decision_override: Option<DecisionOverride>,
    override_reached: bool,
    override_root: Option<NodeId>,
    ambiguities: Vec<AmbiguityInfo>,
}

impl ParserInterpreter {
    pub fn new(grammar: Rc<Grammar>, atn: Rc<Atn>, input: TokenStream) -> Self {
        Self::with_options(grammar, atn, input, InterpreterOptions::default())
    }

    pub fn with_options(
        grammar: Rc<Grammar>,
        atn: Rc<Atn>,
        input: TokenStream,
        options: InterpreterOptions,
    ) -> Self {
        let tracker = Rc::new(OuterAltTracker::new(&atn));
        Self::with_tracker(grammar, atn, tracker, input, options)
    }

    pub(crate) fn with_tracker(
        grammar: Rc<Grammar>,
        atn: Rc<Atn>,
        tracker: Rc<OuterAltTracker>,
        input: TokenStream,
        options: InterpreterOptions,
    ) -> Self {
        ParserInterpreter {
            state_to_alts: vec![None; atn.states.len()],
            grammar,
            atn,
            tracker,
            input,
            strategy: Box::new(DefaultErrorStrategy::new()),
            options,
            tree: ParseTree::new(),
            ctx: None,
            state: 0,
            parent_context_stack: vec![],
            precedence_stack: vec![0],
            matched_eof: false,
            decision_override: None,
            override_reached: false,
            override_root: None,
            ambiguities: vec![],
        }
    }

    pub fn grammar(&self) -> &Rc<Grammar> {
        &self.grammar
    }

    pub fn atn(&self) -> &Rc<Atn> {
        &self.atn
    }

    pub(crate) fn tracker(&self) -> &Rc<OuterAltTracker> {
        &self.tracker
    }

    pub fn token_stream(&self) -> &TokenStream {
        &self.input
    }

    pub fn options(&self) -> &InterpreterOptions {
        &self.options
    }

    pub fn set_prediction_mode(&mut self, mode: PredictionMode) {
        self.options.prediction_mode = mode;
    }

    pub fn set_error_strategy(&mut self, strategy: Box<dyn ErrorStrategy>) {
        self.strategy = strategy;
    }

    pub fn error_strategy(&self) -> &dyn ErrorStrategy {
        &*self.strategy
    }

    /// The tree of the last parse.
    pub fn parse_tree(&self) -> &ParseTree {
        &self.tree
    }

    /// Ambiguities found by prediction since the last reset.
    pub fn ambiguities(&self) -> &[AmbiguityInfo] {
        &self.ambiguities
    }

    /// Makes `decision` predict `alt` the first time it is reached at `token_index`.
    pub fn add_decision_override(&mut self, decision: usize, token_index: usize, alt: usize) {
        self.decision_override = Some(DecisionOverride {
            decision,
            token_index,
            alt,
        });
    }

    pub fn decision_override(&self) -> Option<DecisionOverride> {
        self.decision_override
    }

    /// The context that was current when the overridden decision was reached.
    pub fn override_decision_root(&self) -> Option<NodeId> {
        self.override_root
    }

    /// Rewinds the input and clears the state of the last parse. The decision override
    /// stays, but can be reached again.
    pub fn reset(&mut self) {
        self.input.seek(0);
        self.strategy.reset();
        self.tree = ParseTree::new();
        self.ctx = None;
        self.matched_eof = false;
        self.parent_context_stack.clear();
        self.precedence_stack.clear();
        self.precedence_stack.push(0);
        self.override_reached = false;
        self.override_root = None;
        self.ambiguities.clear();
    }

    /// Whether an operator of precedence `precedence` may continue the current invocation.
    pub fn precpred(&self, precedence: usize) -> bool {
        precedence >= self.precedence_stack.last().copied().unwrap_or(0)
    }

    /// Parses the input from its current position with `start_rule` and returns the root
    /// of the tree.
    pub fn parse(&mut self, start_rule: usize) -> Result<NodeId, ParseError> {
        if start_rule >= self.atn.rule_to_start.len() {
            return Err(ParseError::InvalidStartRule(start_rule));
        }
        debug!(
            "parsing from rule {} at token {}",
            self.atn.rule_names[start_rule],
            self.input.index()
        );
        self.tree = ParseTree::new();
        let start_state = self.atn.rule_to_start[start_rule];
        let start_is_left_recursive = self.atn.is_left_recursive_rule(start_rule);
        let root = self.tree.add_rule(start_rule, None, None);
        if start_is_left_recursive {
            self.enter_recursion_rule(root, start_state, 0);
        } else {
            self.enter_rule(root, start_state);
        }

        loop {
            if self.atn.state(self.state).kind == StateKind::RuleStop {
                let ctx = self.current_ctx()?;
                let is_outermost = self
                    .tree
                    .rule(ctx)
                    .is_some_and(|rule| rule.invoking_state.is_none());
                if is_outermost {
                    let result = if start_is_left_recursive {
                        let (parent, _) = self
                            .parent_context_stack
                            .pop()
                            .ok_or(ParseError::InvalidState(self.state))?;
                        self.unroll_recursion_contexts(parent)?;
                        ctx
                    } else {
                        self.exit_rule()?;
                        root
                    };
                    self.tree.set_root(result);
                    debug!("parsed up to token {}", self.input.index());
                    return Ok(result);
                }
                self.visit_rule_stop_state()?;
                continue;
            }

            match self.visit_state() {
                Ok(()) => {}
                Err(Interrupt::Recognition(error)) => {
                    let rule_index = self.atn.state(self.state).rule_index;
                    self.state = self.atn.rule_to_stop[rule_index];
                    if let Some(rule) = self.ctx.and_then(|ctx| self.tree.rule_mut(ctx)) {
                        rule.exception = Some(error.clone());
                    }
                    self.strategy.report_error(&error);
                    self.recover(&error)?;
                }
                Err(Interrupt::Fatal(error)) => return Err(error),
            }
        }
    }

    fn current_ctx(&self) -> Result<NodeId, ParseError> {
        self.ctx.ok_or(ParseError::InvalidState(self.state))
    }

    fn set_start(&mut self, ctx: NodeId) {
        let start = self.input.lt(1).map(|token| token.index);
        if let Some(rule) = self.tree.rule_mut(ctx) {
            rule.start = start;
        }
    }

    fn enter_rule(&mut self, local: NodeId, state: StateId) {
        self.state = state;
        self.ctx = Some(local);
        self.set_start(local);
        if self.options.build_parse_trees {
            if let Some(parent) = self.tree.parent(local) {
                self.tree.add_child(parent, local);
            }
        }
    }

    fn exit_rule(&mut self) -> Result<(), ParseError> {
        let ctx = self.current_ctx()?;
        let stop = if self.matched_eof {
            self.input.lt(1)
        } else {
            self.input.lt_back()
        }
        .map(|token| token.index);
        let invoking_state = match self.tree.rule_mut(ctx) {
            Some(rule) => {
                rule.stop = stop;
                rule.invoking_state
            }
            None => return Err(ParseError::InvalidState(self.state)),
        };
        if let Some(state) = invoking_state {
            self.state = state;
        }
        self.ctx = self.tree.parent(ctx);
        Ok(())
    }

    fn enter_recursion_rule(&mut self, local: NodeId, state: StateId, precedence: usize) {
        let invoking_state = self.tree.rule(local).and_then(|rule| rule.invoking_state);
        self.parent_context_stack.push((self.ctx, invoking_state));
        self.state = state;
        self.precedence_stack.push(precedence);
        self.ctx = Some(local);
        self.set_start(local);
    }

    /// Makes the current context the first child of `local`, as the left operand of the
    /// operator alternative about to be parsed.
    fn push_new_recursion_context(
        &mut self,
        local: NodeId,
        state: StateId,
    ) -> Result<(), ParseError> {
        let previous = self.current_ctx()?;
        let stop = self.input.lt_back().map(|token| token.index);
        self.tree.set_parent(previous, Some(local));
        let start = match self.tree.rule_mut(previous) {
            Some(rule) => {
                rule.invoking_state = Some(state);
                rule.stop = stop;
                rule.start
            }
            None => return Err(ParseError::InvalidState(self.state)),
        };
        self.ctx = Some(local);
        if let Some(rule) = self.tree.rule_mut(local) {
            rule.start = start;
        }
        if self.options.build_parse_trees {
            self.tree.add_child(local, previous);
        }
        Ok(())
    }

    fn unroll_recursion_contexts(&mut self, parent: Option<NodeId>) -> Result<(), ParseError> {
        self.precedence_stack.pop();
        let ret = self.current_ctx()?;
        let stop = self.input.lt_back().map(|token| token.index);
        if let Some(rule) = self.tree.rule_mut(ret) {
            rule.stop = stop;
        }
        self.tree.set_parent(ret, parent);
        if let (true, Some(parent)) = (self.options.build_parse_trees, parent) {
            self.tree.add_child(parent, ret);
        }
        self.ctx = parent;
        Ok(())
    }

    fn visit_state(&mut self) -> Result<(), Interrupt> {
        let atn = Rc::clone(&self.atn);
        let p = atn.state(self.state);
        let predicted = if p.kind.is_decision_kind() {
            self.visit_decision_state(p)?
        } else {
            1
        };
        let transition = predicted
            .checked_sub(1)
            .and_then(|i| p.transition(i))
            .ok_or(ParseError::InvalidState(p.id))?;
        match *transition {
            Transition::Epsilon { target } => {
                let is_precedence_loop = matches!(
                    p.kind,
                    StateKind::StarLoopEntry {
                        precedence_decision: true,
                        ..
                    }
                );
                let exits_loop = matches!(atn.state(target).kind, StateKind::LoopEnd { .. });
                if is_precedence_loop && !exits_loop {
                    let (parent, invoking_state) = self
                        .parent_context_stack
                        .last()
                        .copied()
                        .ok_or(ParseError::InvalidState(p.id))?;
                    let ctx = self.current_ctx()?;
                    let rule_index = self
                        .tree
                        .rule(ctx)
                        .map_or(p.rule_index, |rule| rule.rule_index);
                    let local = self.tree.add_rule(rule_index, invoking_state, parent);
                    self.push_new_recursion_context(local, atn.rule_to_start[p.rule_index])?;
                }
            }
            Transition::Atom { ttype, .. } => self.match_token(ttype)?,
            Transition::Rule {
                target,
                rule_index,
                precedence,
                ..
            } => {
                let ctx = self.current_ctx()?;
                let local = self.tree.add_rule(rule_index, Some(p.id), Some(ctx));
                if atn.is_left_recursive_rule(rule_index) {
                    self.enter_recursion_rule(local, target, precedence);
                } else {
                    self.enter_rule(local, target);
                }
            }
            Transition::Predicate { .. } | Transition::Action { .. } => {}
            Transition::Precedence { precedence, .. } => {
                if !self.precpred(precedence) {
                    return Err(Interrupt::Recognition(RecognitionError::FailedPredicate {
                        token_index: self.input.index(),
                        predicate: format!("precpred(_ctx, {})", precedence),
                    }));
                }
            }
        }
        self.state = transition.target();
        Ok(())
    }

    fn visit_decision_state(&mut self, p: &State) -> Result<usize, Interrupt> {
        let mut predicted = 1;
        let index = self.input.index();
        let tracked = self.tracker.is_tracked(p.id);
        // The loop entry records the only primary alternative whatever it predicts, so the
        // context keeps it when prediction fails.
        let at_loop_entry = matches!(p.kind, StateKind::StarLoopEntry { .. });
        if tracked && at_loop_entry {
            self.reconcile(p, predicted);
        }
        if p.transitions.len() > 1 {
            self.strategy.sync(&self.input)?;
            let decision = p.decision.ok_or(ParseError::InvalidState(p.id))?;
            let forced = self
                .decision_override
                .filter(|forced| forced.decision == decision && forced.token_index == index);
            predicted = match forced {
                Some(forced) if !self.override_reached => {
                    trace!("decision {} forced to alt {} at token {}", decision, forced.alt, index);
                    self.override_reached = true;
                    forced.alt
                }
                _ => self.adaptive_predict(decision)?,
            };
            if forced.is_some() {
                self.override_root = self.ctx;
            }
        }
        if tracked && !at_loop_entry {
            self.reconcile(p, predicted);
        }
        Ok(predicted)
    }

    fn adaptive_predict(&mut self, decision: usize) -> Result<usize, Interrupt> {
        let outer_stack = self.outer_follow_states();
        let prediction = {
            let ctx = PredictionContext {
                input: self.input.types(),
                index: self.input.index(),
                outer_stack: &outer_stack,
                precedence: self.precedence_stack.last().copied().unwrap_or(0),
            };
            Predictor::new(
                &self.atn,
                self.options.prediction_mode,
                self.options.max_closure_depth,
            )
            .adaptive_predict(decision, &ctx)
        };
        match prediction {
            Ok(prediction) => {
                if let Some(ambiguity) = prediction.ambiguity {
                    self.ambiguities.push(ambiguity);
                }
                Ok(prediction.alt)
            }
            Err(error) => Err(Interrupt::Recognition(RecognitionError::NoViableAlt {
                token_index: error.offending_index,
                start_index: error.start_index,
                decision,
            })),
        }
    }

    /// Where each enclosing invocation resumes, innermost first.
    fn outer_follow_states(&self) -> Vec<StateId> {
        let mut follows = vec![];
        let mut node = self.ctx;
        while let Some(ctx) = node {
            let Some(rule) = self.tree.rule(ctx) else {
                break;
            };
            let Some(invoking_state) = rule.invoking_state else {
                break;
            };
            if let Some(follow) = self.atn.follow_state(invoking_state) {
                follows.push(follow);
            }
            node = self.tree.parent(ctx);
        }
        follows
    }

    /// Records which alternative of the rule as written the current context follows.
    fn reconcile(&mut self, p: &State, predicted: usize) {
        let Some(ctx) = self.ctx else {
            return;
        };
        let grammar = Rc::clone(&self.grammar);
        let outer_alt = match &grammar.rule(p.rule_index).recursion {
            None => Some(predicted),
            Some(recursion) => match p.kind {
                StateKind::BlockStart { .. } | StateKind::StarBlockStart { .. } => {
                    let alts = self.state_to_alts[p.id].get_or_insert_with(|| {
                        if matches!(p.kind, StateKind::BlockStart { .. }) {
                            recursion.primary_alts()
                        } else {
                            recursion.recursive_op_alts()
                        }
                    });
                    predicted.checked_sub(1).and_then(|i| alts.get(i)).copied()
                }
                // A single primary alternative has no block of its own.
                StateKind::StarLoopEntry { .. } => match recursion.primary_alts().as_slice() {
                    &[alt] => Some(alt),
                    _ => None,
                },
                _ => None,
            },
        };
        if let (Some(alt), Some(rule)) = (outer_alt, self.tree.rule_mut(ctx)) {
            if rule.set_outer_alt(alt) {
                trace!(
                    "context of rule {} follows alt {} from state {}",
                    grammar.rule(p.rule_index).name,
                    alt,
                    p.id
                );
            }
        }
    }

    fn visit_rule_stop_state(&mut self) -> Result<(), ParseError> {
        let rule_index = self.atn.state(self.state).rule_index;
        if self.atn.is_left_recursive_rule(rule_index) {
            let (parent, invoking_state) = self
                .parent_context_stack
                .pop()
                .ok_or(ParseError::InvalidState(self.state))?;
            self.unroll_recursion_contexts(parent)?;
            self.state = invoking_state.ok_or(ParseError::InvalidState(self.state))?;
        } else {
            self.exit_rule()?;
        }
        match self.atn.state(self.state).transition(0) {
            Some(&Transition::Rule { follow, .. }) => {
                self.state = follow;
                Ok(())
            }
            _ => Err(ParseError::InvalidState(self.state)),
        }
    }

    fn match_token(&mut self, ttype: TokenType) -> Result<(), Interrupt> {
        if self.input.la(1) == ttype {
            if ttype == EOF {
                self.matched_eof = true;
            }
            self.strategy.report_match();
            self.consume();
            return Ok(());
        }
        match self.strategy.recover_inline(&self.input, ttype)? {
            InlineRecovery::Deleted => {
                self.consume();
                self.strategy.report_match();
                self.consume();
                Ok(())
            }
            InlineRecovery::Mismatch(error) => Err(Interrupt::Recognition(error)),
        }
    }

    fn consume(&mut self) {
        let token = self.input.lt(1).cloned();
        self.input.consume();
        if !self.options.build_parse_trees {
            return;
        }
        if let (Some(ctx), Some(token)) = (self.ctx, token) {
            if self.strategy.in_error_recovery_mode() {
                self.tree.add_error_node(ctx, token, false);
            } else {
                self.tree.add_token_node(ctx, token);
            }
        }
    }

    fn recover(&mut self, error: &RecognitionError) -> Result<(), ParseError> {
        let index = self.input.index();
        if self.strategy.recover(&self.input, error)? {
            self.consume();
        }
        if self.input.index() == index && self.options.build_parse_trees {
            // Nothing was consumed, so the error shows up as a conjured node.
            let token = self.input.get(error.offending_token_index()).cloned();
            if let (Some(ctx), Some(token)) = (self.ctx, token) {
                self.tree.add_error_node(ctx, token, true);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leftrec_atn::build_atn;
    use leftrec_rewrite::{ToolContext, ToolOptions, translate_left_recursive_rules};

    use crate::strategy::BailErrorStrategy;

    fn interpreter(grammar: &str, input: &str) -> ParserInterpreter {
        let mut grammar = Grammar::load(grammar).unwrap();
        let mut ctx = ToolContext::new(ToolOptions::default()).unwrap();
        translate_left_recursive_rules(&mut ctx, &mut grammar);
        let atn = build_atn(&grammar).unwrap();
        let input = TokenStream::from_words(grammar.vocabulary(), input).unwrap();
        ParserInterpreter::new(Rc::new(grammar), Rc::new(atn), input)
    }

    fn parse(grammar: &str, input: &str, start_rule: usize) -> String {
        let mut parser = interpreter(grammar, input);
        parser.parse(start_rule).unwrap();
        parser.parse_tree().to_string_tree(&parser.atn().rule_names)
    }

    #[test]
    fn test_outer_alternatives_of_plain_rules() {
        let grammar = "s : a ';' | b ; a : ID | INT ; b : ID ID ;";
        assert_eq!(parse(grammar, "x ;", 0), "(s:1 (a:1 x) ;)");
        assert_eq!(parse(grammar, "1 ;", 0), "(s:1 (a:2 1) ;)");
        assert_eq!(parse(grammar, "x y", 0), "(s:2 (b:1 x y))");
    }

    #[test]
    fn test_operators_get_their_alternatives_as_written() {
        let grammar = "e : e '*' e | INT | e '+' e | ID ;";
        assert_eq!(
            parse(grammar, "1 + x * 2", 0),
            "(e:3 (e:2 1) + (e:1 (e:4 x) * (e:2 2)))"
        );
        assert_eq!(
            parse(grammar, "1 * x + 2", 0),
            "(e:3 (e:1 (e:2 1) * (e:4 x)) + (e:2 2))"
        );
    }

    #[test]
    fn test_single_primary_alternative() {
        let grammar = "s : e EOF ; e : e '!' | ID ;";
        assert_eq!(parse(grammar, "x ! !", 0), "(s:1 (e:1 (e:1 (e:2 x) !) !) <EOF>)");
        assert_eq!(parse(grammar, "x", 0), "(s:1 (e:2 x) <EOF>)");
    }

    #[test]
    fn test_single_primary_alternative_survives_failed_prediction() {
        let grammar = "s : e EOF ; e : e '*' e | INT ;";
        assert_eq!(parse(grammar, "1", 0), "(s:1 (e:2 1) <EOF>)");
        assert_eq!(parse(grammar, "1 2", 0), "(s:1 (e:2 1 <error 2>) <EOF>)");
    }

    #[test]
    fn test_prefix_and_suffix_operators() {
        let grammar = "e : '-' e | e '*' e | e '!' | INT ;";
        assert_eq!(parse(grammar, "- 1 * 2", 0), "(e:2 (e:1 - (e:4 1)) * (e:4 2))");
        assert_eq!(parse(grammar, "1 * 2 !", 0), "(e:3 (e:2 (e:4 1) * (e:4 2)) !)");
    }

    #[test]
    fn test_single_extra_token_is_deleted() {
        let mut parser = interpreter("s : 'a' 'b' EOF ;", "a a b");
        parser.parse(0).unwrap();
        assert_eq!(
            parser.parse_tree().to_string_tree(&parser.atn().rule_names),
            "(s:1 a <error a> b <EOF>)"
        );
    }

    #[test]
    fn test_mismatch_leaves_rule_with_error() {
        let mut parser = interpreter("s : a 'c' ; a : 'a' 'b' ;", "a c");
        let root = parser.parse(0).unwrap();
        let tree = parser.parse_tree();
        let a = tree.children(root)[0];
        assert!(matches!(
            tree.rule(a).unwrap().exception,
            Some(RecognitionError::InputMismatch { token_index: 1, .. })
        ));
        assert_eq!(
            tree.to_string_tree(&parser.atn().rule_names),
            "(s:1 (a:1 a <error c>) <error <EOF>>)"
        );
    }

    #[test]
    fn test_bail_strategy_cancels() {
        let mut parser = interpreter("s : 'a' 'b' ;", "a a");
        parser.set_error_strategy(Box::new(BailErrorStrategy::new()));
        assert!(matches!(parser.parse(0), Err(ParseError::Cancelled(_))));
    }

    #[test]
    fn test_invalid_start_rule() {
        let mut parser = interpreter("s : 'a' ;", "a");
        assert_eq!(parser.parse(3), Err(ParseError::InvalidStartRule(3)));
    }

    #[test]
    fn test_decision_override() {
        let grammar = "s : x+ EOF ; x : 'a' | 'a' 'b' ;";
        assert_eq!(parse(grammar, "a b", 0), "(s:1 (x:2 a b) <EOF>)");
        let mut parser = interpreter(grammar, "a b");
        parser.add_decision_override(1, 0, 1);
        let root = parser.parse(0).unwrap();
        let tree = parser.parse_tree();
        assert_eq!(parser.override_decision_root(), Some(tree.children(root)[0]));
        assert_eq!(
            tree.to_string_tree(&parser.atn().rule_names),
            "(s:1 (x:1 a) <error b>)"
        );
    }

    #[test]
    fn test_reset_rewinds() {
        let mut parser = interpreter("s : 'a' 'b' ;", "a b");
        parser.parse(0).unwrap();
        assert_eq!(parser.token_stream().index(), 2);
        parser.reset();
        assert_eq!(parser.token_stream().index(), 0);
        assert!(parser.parse_tree().is_empty());
        assert!(parser.precpred(0));
    }
}
