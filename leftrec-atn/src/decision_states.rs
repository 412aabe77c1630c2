//! Decisions that choose between alternatives of a rule as written.

use bit_vec::BitVec;
use log::trace;

use crate::atn::{Atn, StateId, StateKind};

/// The set of states at which a parser records the outer alternative of a rule context.
///
/// Computed once per automaton.
#[derive(Clone, Debug)]
pub struct OuterAltTracker {
    tracked: BitVec,
}

impl OuterAltTracker {
    pub fn new(atn: &Atn) -> Self {
        OuterAltTracker {
            tracked: Self::find_outer_most_decision_states(atn),
        }
    }

    /// Records the decisions that pick an alternative of the rule as written:
    ///
    /// * the operator loop entry of a rewritten rule, together with the block start inside
    ///   the loop, which offers the operator alternatives;
    /// * any other decision that the rule start leads to directly.
    ///
    /// Other star-loop entries are never recorded.
    pub fn find_outer_most_decision_states(atn: &Atn) -> BitVec {
        let mut track = BitVec::from_elem(atn.states.len(), false);
        for (decision, &id) in atn.decision_to_state.iter().enumerate() {
            let state = atn.state(id);
            match state.kind {
                StateKind::StarLoopEntry {
                    precedence_decision,
                    ..
                } => {
                    if !precedence_decision {
                        continue;
                    }
                    if let Some(enter) = state.transition(0) {
                        trace!(
                            "tracking operator block {} of decision {}",
                            enter.target(),
                            decision
                        );
                        track.set(id, true);
                        track.set(enter.target(), true);
                    }
                }
                _ => {
                    let start = atn.rule_start(state.rule_index);
                    if start.transition(0).map(|t| t.target()) == Some(id) {
                        trace!("tracking decision {} at state {}", decision, id);
                        track.set(id, true);
                    }
                }
            }
        }
        track
    }

    pub fn is_tracked(&self, state: StateId) -> bool {
        self.tracked.get(state).unwrap_or(false)
    }

    pub fn tracked(&self) -> &BitVec {
        &self.tracked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build_atn;
    use leftrec_grammar::Grammar;
    use leftrec_rewrite::{ToolContext, ToolOptions, translate_left_recursive_rules};

    fn tracked_states(text: &str) -> (Atn, Vec<StateId>) {
        let mut grammar = Grammar::load(text).unwrap();
        let mut ctx = ToolContext::new(ToolOptions::default()).unwrap();
        translate_left_recursive_rules(&mut ctx, &mut grammar);
        let atn = build_atn(&grammar).unwrap();
        let tracked = OuterAltTracker::find_outer_most_decision_states(&atn);
        let states = (0..atn.states.len()).filter(|&id| tracked[id]).collect();
        (atn, states)
    }

    #[test]
    fn test_operator_block_of_rewritten_rule() {
        let (atn, states) = tracked_states("e : e '*' e | INT | e '+' e | ID ;");
        let kinds: Vec<&StateKind> = states.iter().map(|&id| &atn.states[id].kind).collect();
        assert_eq!(kinds.len(), 3);
        assert!(matches!(kinds[0], StateKind::BlockStart { .. }));
        assert!(matches!(kinds[1], StateKind::StarBlockStart { .. }));
        assert!(matches!(
            kinds[2],
            StateKind::StarLoopEntry {
                precedence_decision: true,
                ..
            }
        ));
    }

    #[test]
    fn test_unnumbered_operator_block_is_tracked() {
        let (atn, states) = tracked_states("e : e '!' | ID ;");
        let op_block = states
            .iter()
            .find(|&&id| matches!(atn.states[id].kind, StateKind::StarBlockStart { .. }))
            .copied()
            .unwrap();
        assert_eq!(atn.states[op_block].decision, None);
    }

    #[test]
    fn test_nested_decisions_are_untracked() {
        let (atn, states) = tracked_states("a : (B | C) D | E ; b : X (Y | Z)* ;");
        assert_eq!(states, vec![atn.decision_to_state[1]]);
    }
}
