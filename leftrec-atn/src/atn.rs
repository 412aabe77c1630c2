//! The automaton built from a grammar.

use std::fmt;

use leftrec_grammar::TokenType;

/// Index of a state in [`Atn::states`].
pub type StateId = usize;

/// What a state is for. Block and loop states link to the states that close them.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StateKind {
    Basic,
    RuleStart {
        stop: StateId,
        /// Set for rules rewritten from their left-recursive form.
        is_left_recursive: bool,
    },
    RuleStop,
    /// Start of a block without a loop suffix, or of an optional block.
    BlockStart {
        end: StateId,
    },
    /// Start of the block inside `(...)*`.
    StarBlockStart {
        end: StateId,
    },
    /// Start of the block inside `(...)+`.
    PlusBlockStart {
        end: StateId,
        loop_back: StateId,
    },
    BlockEnd {
        start: StateId,
    },
    /// Chooses between entering `(...)*` and leaving it.
    StarLoopEntry {
        loop_back: StateId,
        /// Set for the operator loop of a rewritten rule.
        precedence_decision: bool,
    },
    StarLoopBack,
    /// Chooses between another iteration of `(...)+` and leaving it.
    PlusLoopBack,
    LoopEnd {
        loop_back: StateId,
    },
}

impl StateKind {
    /// States the interpreter treats as choice points, numbered or not.
    pub fn is_decision_kind(&self) -> bool {
        matches!(
            self,
            StateKind::BlockStart { .. }
                | StateKind::StarBlockStart { .. }
                | StateKind::PlusBlockStart { .. }
                | StateKind::StarLoopEntry { .. }
                | StateKind::PlusLoopBack
        )
    }
}

/// An edge of the automaton.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Transition {
    Epsilon {
        target: StateId,
    },
    Atom {
        target: StateId,
        ttype: TokenType,
    },
    /// Calls a rule. `target` is the start state of the callee, `follow` is where the caller
    /// resumes.
    Rule {
        target: StateId,
        rule_index: usize,
        precedence: usize,
        follow: StateId,
    },
    /// Holds while the precedence of the current invocation is at most `precedence`.
    Precedence {
        target: StateId,
        precedence: usize,
    },
    Predicate {
        target: StateId,
        rule_index: usize,
        pred_index: usize,
    },
    Action {
        target: StateId,
        rule_index: usize,
        action_index: usize,
    },
}

impl Transition {
    pub fn target(&self) -> StateId {
        match *self {
            Transition::Epsilon { target }
            | Transition::Atom { target, .. }
            | Transition::Rule { target, .. }
            | Transition::Precedence { target, .. }
            | Transition::Predicate { target, .. }
            | Transition::Action { target, .. } => target,
        }
    }

    /// Whether the edge can be taken without consuming a token.
    pub fn is_epsilon(&self) -> bool {
        !matches!(self, Transition::Atom { .. })
    }

    pub(crate) fn set_target(&mut self, new_target: StateId) {
        match self {
            Transition::Epsilon { target }
            | Transition::Atom { target, .. }
            | Transition::Rule { target, .. }
            | Transition::Precedence { target, .. }
            | Transition::Predicate { target, .. }
            | Transition::Action { target, .. } => *target = new_target,
        }
    }
}

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct State {
    pub id: StateId,
    pub rule_index: usize,
    pub kind: StateKind,
    pub transitions: Vec<Transition>,
    /// Decision number, for states that were given one.
    pub decision: Option<usize>,
}

impl State {
    pub fn transition(&self, index: usize) -> Option<&Transition> {
        self.transitions.get(index)
    }

    pub fn only_has_epsilon_transitions(&self) -> bool {
        self.transitions.iter().all(Transition::is_epsilon)
    }
}

/// States of all rules, with the entry points needed for interpretation.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Atn {
    pub states: Vec<State>,
    pub rule_to_start: Vec<StateId>,
    pub rule_to_stop: Vec<StateId>,
    /// Decision numbers to states, in creation order.
    pub decision_to_state: Vec<StateId>,
    pub rule_names: Vec<String>,
    pub max_token_type: TokenType,
}

impl Atn {
    pub fn state(&self, id: StateId) -> &State {
        &self.states[id]
    }

    pub fn num_decisions(&self) -> usize {
        self.decision_to_state.len()
    }

    pub fn decision_state(&self, decision: usize) -> Option<&State> {
        self.decision_to_state
            .get(decision)
            .map(|&id| &self.states[id])
    }

    pub fn rule_start(&self, rule_index: usize) -> &State {
        &self.states[self.rule_to_start[rule_index]]
    }

    pub fn is_left_recursive_rule(&self, rule_index: usize) -> bool {
        matches!(
            self.rule_start(rule_index).kind,
            StateKind::RuleStart {
                is_left_recursive: true,
                ..
            }
        )
    }

    /// The state where a caller resumes after the rule transition leaving `invoking_state`.
    pub fn follow_state(&self, invoking_state: StateId) -> Option<StateId> {
        self.states[invoking_state]
            .transitions
            .iter()
            .find_map(|transition| match *transition {
                Transition::Rule { follow, .. } => Some(follow),
                _ => None,
            })
    }

    pub(crate) fn add_state(&mut self, rule_index: usize, kind: StateKind) -> StateId {
        let id = self.states.len();
        self.states.push(State {
            id,
            rule_index,
            kind,
            transitions: vec![],
            decision: None,
        });
        id
    }

    pub(crate) fn define_decision(&mut self, state: StateId) -> usize {
        let decision = self.decision_to_state.len();
        self.decision_to_state.push(state);
        self.states[state].decision = Some(decision);
        decision
    }
}

impl fmt::Display for Atn {
    /// One line per state with its outgoing edges.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for state in &self.states {
            write!(f, "{} {:?}", state.id, state.kind)?;
            if let Some(decision) = state.decision {
                write!(f, " d={}", decision)?;
            }
            for transition in &state.transitions {
                match transition {
                    Transition::Atom { target, ttype } => write!(f, " -{}->{}", ttype, target)?,
                    Transition::Rule { target, follow, .. } => {
                        write!(f, " -call->{} ret {}", target, follow)?
                    }
                    Transition::Precedence { target, precedence } => {
                        write!(f, " -{}>=_p->{}", precedence, target)?
                    }
                    other => write!(f, " ->{}", other.target())?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
