//! Construction of the automaton from rule trees.
//!
//! Each element becomes a pair of states joined by one edge, and sequences are chained with
//! epsilon edges. Subrules are built before the block around them, so nested decisions get
//! lower numbers than the decisions enclosing them.

use std::fmt;

use leftrec_grammar::{EbnfKind, Grammar, NodeId, NodeKind, Rule};
use leftrec_rewrite::PRECEDENCE_OPTION_NAME;
use log::{debug, trace};

use crate::atn::{Atn, StateId, StateKind, Transition};

/// The automaton can't be built from the grammar.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AtnError {
    UndefinedRule { rule: String, name: String },
    UndefinedToken { rule: String, name: String },
    /// A rule tree without the expected block structure.
    MalformedRule { rule: String },
    IllegalPrecedence { rule: String, value: String },
}

impl fmt::Display for AtnError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AtnError::UndefinedRule { rule, name } => {
                write!(f, "reference to undefined rule {} in rule {}", name, rule)
            }
            AtnError::UndefinedToken { rule, name } => {
                write!(f, "reference to undefined token {} in rule {}", name, rule)
            }
            AtnError::MalformedRule { rule } => write!(f, "malformed tree of rule {}", rule),
            AtnError::IllegalPrecedence { rule, value } => {
                write!(f, "illegal precedence {} in rule {}", value, rule)
            }
        }
    }
}

impl std::error::Error for AtnError {}

#[derive(Copy, Clone, Debug)]
struct Handle {
    left: StateId,
    right: StateId,
}

/// Builds the automaton of every rule of a grammar.
pub struct AtnBuilder<'g> {
    grammar: &'g Grammar,
    atn: Atn,
    current_rule: usize,
    num_predicates: usize,
    num_actions: usize,
}

/// Builds the automaton of a grammar, after its left-recursive rules were rewritten.
pub fn build_atn(grammar: &Grammar) -> Result<Atn, AtnError> {
    AtnBuilder::new(grammar).build()
}

impl<'g> AtnBuilder<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        AtnBuilder {
            grammar,
            atn: Atn {
                rule_names: grammar.rule_names(),
                max_token_type: grammar.vocabulary().max_token_type(),
                ..Atn::default()
            },
            current_rule: 0,
            num_predicates: 0,
            num_actions: 0,
        }
    }

    pub fn build(mut self) -> Result<Atn, AtnError> {
        self.create_rule_start_and_stop_states();
        for rule in self.grammar.rules() {
            self.rule(rule)?;
        }
        self.mark_precedence_decisions();
        debug!(
            "built automaton with {} states and {} decisions",
            self.atn.states.len(),
            self.atn.num_decisions()
        );
        trace!("automaton:\n{}", self.atn);
        Ok(self.atn)
    }

    fn create_rule_start_and_stop_states(&mut self) {
        for rule in self.grammar.rules() {
            let start = self.atn.add_state(
                rule.index,
                StateKind::RuleStart {
                    stop: 0,
                    is_left_recursive: rule.is_left_recursive(),
                },
            );
            let stop = self.atn.add_state(rule.index, StateKind::RuleStop);
            if let StateKind::RuleStart { stop: link, .. } = &mut self.atn.states[start].kind {
                *link = stop;
            }
            self.atn.rule_to_start.push(start);
            self.atn.rule_to_stop.push(stop);
        }
    }

    fn rule(&mut self, rule: &Rule) -> Result<(), AtnError> {
        self.current_rule = rule.index;
        let block = rule.block().ok_or_else(|| AtnError::MalformedRule {
            rule: rule.name.clone(),
        })?;
        let body = self.block(rule, block, None)?;
        let start = self.atn.rule_to_start[rule.index];
        let stop = self.atn.rule_to_stop[rule.index];
        self.epsilon(start, body.left);
        self.epsilon(body.right, stop);
        Ok(())
    }

    fn new_state(&mut self, kind: StateKind) -> StateId {
        self.atn.add_state(self.current_rule, kind)
    }

    fn basic(&mut self) -> StateId {
        self.new_state(StateKind::Basic)
    }

    fn epsilon(&mut self, from: StateId, to: StateId) {
        self.atn.states[from]
            .transitions
            .push(Transition::Epsilon { target: to });
    }

    fn element(&mut self, rule: &Rule, id: NodeId) -> Result<Handle, AtnError> {
        let ast = &rule.ast;
        match ast.kind(id) {
            NodeKind::Alt { .. } => self.alt(rule, id),
            NodeKind::Block => self.block(rule, id, None),
            NodeKind::Ebnf(kind) => {
                let block = ast.child(id, 0).ok_or_else(|| AtnError::MalformedRule {
                    rule: rule.name.clone(),
                })?;
                self.block(rule, block, Some(*kind))
            }
            NodeKind::Assign { .. } => match ast.child(id, 0) {
                Some(child) => self.element(rule, child),
                None => Err(AtnError::MalformedRule {
                    rule: rule.name.clone(),
                }),
            },
            NodeKind::RuleRef { name, .. } => {
                let callee = self.grammar.rule_index(name).ok_or_else(|| {
                    AtnError::UndefinedRule {
                        rule: rule.name.clone(),
                        name: name.clone(),
                    }
                })?;
                let precedence = match ast.option(id, PRECEDENCE_OPTION_NAME) {
                    Some(value) => parse_precedence(rule, value)?,
                    None => 0,
                };
                let left = self.basic();
                let right = self.basic();
                let target = self.atn.rule_to_start[callee];
                self.atn.states[left].transitions.push(Transition::Rule {
                    target,
                    rule_index: callee,
                    precedence,
                    follow: right,
                });
                Ok(Handle { left, right })
            }
            NodeKind::TokenRef { name } => {
                let vocabulary = self.grammar.vocabulary();
                let ttype = vocabulary
                    .token_type(name)
                    .ok_or_else(|| AtnError::UndefinedToken {
                        rule: rule.name.clone(),
                        name: name.clone(),
                    })?;
                Ok(self.atom(ttype))
            }
            NodeKind::StringLiteral { text } => {
                let vocabulary = self.grammar.vocabulary();
                let ttype = vocabulary
                    .literal_type(text)
                    .ok_or_else(|| AtnError::UndefinedToken {
                        rule: rule.name.clone(),
                        name: text.clone(),
                    })?;
                Ok(self.atom(ttype))
            }
            NodeKind::Sempred { .. } => {
                let left = self.basic();
                let right = self.basic();
                let transition = match ast.option(id, PRECEDENCE_OPTION_NAME) {
                    Some(value) => Transition::Precedence {
                        target: right,
                        precedence: parse_precedence(rule, value)?,
                    },
                    None => {
                        self.num_predicates += 1;
                        Transition::Predicate {
                            target: right,
                            rule_index: rule.index,
                            pred_index: self.num_predicates - 1,
                        }
                    }
                };
                self.atn.states[left].transitions.push(transition);
                Ok(Handle { left, right })
            }
            NodeKind::Action { .. } => {
                let left = self.basic();
                let right = self.basic();
                self.num_actions += 1;
                self.atn.states[left].transitions.push(Transition::Action {
                    target: right,
                    rule_index: rule.index,
                    action_index: self.num_actions - 1,
                });
                Ok(Handle { left, right })
            }
            NodeKind::Epsilon => Ok(self.empty()),
            NodeKind::Rule { .. } => Err(AtnError::MalformedRule {
                rule: rule.name.clone(),
            }),
        }
    }

    fn atom(&mut self, ttype: usize) -> Handle {
        let left = self.basic();
        let right = self.basic();
        self.atn.states[left]
            .transitions
            .push(Transition::Atom { target: right, ttype });
        Handle { left, right }
    }

    fn empty(&mut self) -> Handle {
        let left = self.basic();
        let right = self.basic();
        self.epsilon(left, right);
        Handle { left, right }
    }

    fn alt(&mut self, rule: &Rule, id: NodeId) -> Result<Handle, AtnError> {
        let mut elements = vec![];
        for &child in rule.ast.children(id) {
            elements.push(self.element(rule, child)?);
        }
        Ok(self.elem_list(&elements))
    }

    fn elem_list(&mut self, elements: &[Handle]) -> Handle {
        match (elements.first(), elements.last()) {
            (Some(first), Some(last)) => {
                for pair in elements.windows(2) {
                    self.epsilon(pair[0].right, pair[1].left);
                }
                Handle {
                    left: first.left,
                    right: last.right,
                }
            }
            _ => self.empty(),
        }
    }

    fn block(
        &mut self,
        rule: &Rule,
        id: NodeId,
        ebnf: Option<EbnfKind>,
    ) -> Result<Handle, AtnError> {
        let mut alts = vec![];
        for &alt in rule.ast.children(id) {
            alts.push(self.element(rule, alt)?);
        }
        match ebnf {
            None if alts.len() == 1 => Ok(alts[0]),
            None => {
                let start = self.new_state(StateKind::BlockStart { end: 0 });
                self.atn.define_decision(start);
                Ok(self.make_block(start, &alts))
            }
            Some(EbnfKind::Optional) => {
                let start = self.new_state(StateKind::BlockStart { end: 0 });
                self.atn.define_decision(start);
                let block = self.make_block(start, &alts);
                self.epsilon(block.left, block.right);
                Ok(block)
            }
            Some(EbnfKind::Star) => {
                let start = self.new_state(StateKind::StarBlockStart { end: 0 });
                if alts.len() > 1 {
                    self.atn.define_decision(start);
                }
                let block = self.make_block(start, &alts);
                Ok(self.star(block))
            }
            Some(EbnfKind::Plus) => {
                let start = self.new_state(StateKind::PlusBlockStart {
                    end: 0,
                    loop_back: 0,
                });
                if alts.len() > 1 {
                    self.atn.define_decision(start);
                }
                let block = self.make_block(start, &alts);
                Ok(self.plus(block))
            }
        }
    }

    fn make_block(&mut self, start: StateId, alts: &[Handle]) -> Handle {
        let end = self.new_state(StateKind::BlockEnd { start });
        match &mut self.atn.states[start].kind {
            StateKind::BlockStart { end: link }
            | StateKind::StarBlockStart { end: link }
            | StateKind::PlusBlockStart { end: link, .. } => *link = end,
            _ => {}
        }
        for alt in alts {
            self.epsilon(start, alt.left);
            self.epsilon(alt.right, end);
        }
        Handle {
            left: start,
            right: end,
        }
    }

    fn star(&mut self, block: Handle) -> Handle {
        let entry = self.new_state(StateKind::StarLoopEntry {
            loop_back: 0,
            precedence_decision: false,
        });
        self.atn.define_decision(entry);
        let loop_back = self.new_state(StateKind::StarLoopBack);
        let end = self.new_state(StateKind::LoopEnd { loop_back });
        if let StateKind::StarLoopEntry { loop_back: link, .. } = &mut self.atn.states[entry].kind {
            *link = loop_back;
        }
        self.epsilon(entry, block.left);
        self.epsilon(entry, end);
        self.epsilon(block.right, loop_back);
        self.epsilon(loop_back, entry);
        Handle {
            left: entry,
            right: end,
        }
    }

    fn plus(&mut self, block: Handle) -> Handle {
        let loop_back = self.new_state(StateKind::PlusLoopBack);
        self.atn.define_decision(loop_back);
        let end = self.new_state(StateKind::LoopEnd { loop_back });
        if let StateKind::PlusBlockStart { loop_back: link, .. } =
            &mut self.atn.states[block.left].kind
        {
            *link = loop_back;
        }
        self.epsilon(block.right, loop_back);
        self.epsilon(loop_back, block.left);
        self.epsilon(loop_back, end);
        Handle {
            left: block.left,
            right: end,
        }
    }

    /// Flags the operator loop of each rewritten rule: a star-loop entry whose exit leads
    /// through the loop end straight to the rule stop.
    fn mark_precedence_decisions(&mut self) {
        for id in 0..self.atn.states.len() {
            let state = &self.atn.states[id];
            if !matches!(state.kind, StateKind::StarLoopEntry { .. })
                || !self.atn.is_left_recursive_rule(state.rule_index)
            {
                continue;
            }
            let maybe_loop_end = match state.transitions.last() {
                Some(transition) => &self.atn.states[transition.target()],
                None => continue,
            };
            let reaches_stop = matches!(maybe_loop_end.kind, StateKind::LoopEnd { .. })
                && maybe_loop_end.only_has_epsilon_transitions()
                && maybe_loop_end.transitions.first().is_some_and(|transition| {
                    self.atn.states[transition.target()].kind == StateKind::RuleStop
                });
            if reaches_stop {
                trace!("precedence decision at state {}", id);
                if let StateKind::StarLoopEntry {
                    precedence_decision,
                    ..
                } = &mut self.atn.states[id].kind
                {
                    *precedence_decision = true;
                }
            }
        }
    }
}

fn parse_precedence(rule: &Rule, value: &str) -> Result<usize, AtnError> {
    value.parse().map_err(|_| AtnError::IllegalPrecedence {
        rule: rule.name.clone(),
        value: value.to_string(),
    })
}
