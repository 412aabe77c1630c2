//! Adaptive prediction with full parser context.
//!
//! Configurations are simulated over the automaton one input token at a time, until the
//! surviving configurations agree on one alternative or conflict in a way that no further
//! input can resolve.

use std::collections::HashSet;
use std::fmt;

use bit_vec::BitVec;
use leftrec_grammar::{EOF, TokenType};
use log::trace;

use crate::atn::{Atn, StateId, StateKind, Transition};

/// How far conflicting configurations are followed.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PredictionMode {
    /// Stop once every conflicting subset has the same minimum alternative.
    #[default]
    Ll,
    /// Stop only once every subset conflicts and all subsets are equal, and report the
    /// ambiguity found.
    LlExactAmbigDetection,
}

/// Alternatives that matched the same input in the same context.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AmbiguityInfo {
    pub decision: usize,
    /// Index of the token where prediction started.
    pub start_index: usize,
    /// Index of the token where the conflict was found.
    pub stop_index: usize,
    /// Indexed by alternative number.
    pub ambig_alts: BitVec,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Prediction {
    pub alt: usize,
    pub ambiguity: Option<AmbiguityInfo>,
}

/// No alternative of the decision matches the input.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NoViableAlt {
    pub decision: usize,
    pub start_index: usize,
    pub offending_index: usize,
}

impl fmt::Display for NoViableAlt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "no viable alternative at decision {} for input {}..={}",
            self.decision, self.start_index, self.offending_index
        )
    }
}

impl std::error::Error for NoViableAlt {}

/// Where the parser is when it asks for a prediction.
#[derive(Copy, Clone, Debug)]
pub struct PredictionContext<'a> {
    /// Types of every token of the input, ending with EOF.
    pub input: &'a [TokenType],
    pub index: usize,
    /// Follow states of the rule invocations on the parser's stack, innermost first.
    pub outer_stack: &'a [StateId],
    /// Precedence of the innermost invocation of a rewritten rule.
    pub precedence: usize,
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
struct Config {
    state: StateId,
    alt: usize,
    /// Follow states pushed by calls made during prediction.
    stack: Vec<StateId>,
    /// Number of frames of the outer stack returned through.
    outer: usize,
}

impl Config {
    fn at(&self, state: StateId) -> Config {
        Config {
            state,
            ..self.clone()
        }
    }

    /// Predicates are evaluated only in the invocation the decision belongs to.
    fn in_context(&self) -> bool {
        self.stack.is_empty() && self.outer == 0
    }
}

#[derive(Default)]
struct ConfigSet {
    configs: Vec<Config>,
    seen: HashSet<Config>,
}

impl ConfigSet {
    fn add(&mut self, config: Config) {
        if self.seen.insert(config.clone()) {
            self.configs.push(config);
        }
    }

    fn alts(&self, num_alts: usize) -> BitVec {
        let mut alts = BitVec::from_elem(num_alts + 1, false);
        for config in &self.configs {
            alts.set(config.alt, true);
        }
        alts
    }

    /// Alternatives of configurations that share state and stack.
    fn conflicting_alt_subsets(&self, num_alts: usize) -> Vec<BitVec> {
        let mut keys: Vec<(StateId, &[StateId], usize)> = vec![];
        let mut subsets: Vec<BitVec> = vec![];
        for config in &self.configs {
            let key = (config.state, &config.stack[..], config.outer);
            let position = match keys.iter().position(|existing| *existing == key) {
                Some(position) => position,
                None => {
                    keys.push(key);
                    subsets.push(BitVec::from_elem(num_alts + 1, false));
                    keys.len() - 1
                }
            };
            subsets[position].set(config.alt, true);
        }
        subsets
    }
}

fn min_alt(alts: &BitVec) -> Option<usize> {
    alts.iter().position(|bit| bit)
}

/// The shared minimum alternative, if every subset has the same one.
fn resolves_to_just_one_viable_alt(subsets: &[BitVec]) -> Option<usize> {
    let mut result = None;
    for subset in subsets {
        let min = min_alt(subset)?;
        match result {
            None => result = Some(min),
            Some(existing) if existing != min => return None,
            Some(_) => {}
        }
    }
    result
}

fn all_subsets_conflict(subsets: &[BitVec]) -> bool {
    subsets
        .iter()
        .all(|subset| subset.iter().filter(|&bit| bit).count() > 1)
}

fn all_subsets_equal(subsets: &[BitVec]) -> bool {
    subsets.windows(2).all(|pair| pair[0] == pair[1])
}

/// Renders an alternative set like `{1, 2}`.
pub fn format_alts(alts: &BitVec) -> String {
    let alts: Vec<String> = alts
        .iter()
        .enumerate()
        .filter(|&(_, bit)| bit)
        .map(|(alt, _)| alt.to_string())
        .collect();
    format!("{{{}}}", alts.join(", "))
}

/// Predicts alternatives of one automaton.
#[derive(Copy, Clone, Debug)]
pub struct Predictor<'a> {
    atn: &'a Atn,
    mode: PredictionMode,
    /// Calls deeper than this are not followed during prediction.
    max_closure_depth: usize,
}

impl<'a> Predictor<'a> {
    pub fn new(atn: &'a Atn, mode: PredictionMode, max_closure_depth: usize) -> Self {
        Predictor {
            atn,
            mode,
            max_closure_depth,
        }
    }

    /// Chooses the alternative of `decision` that the input starting at `ctx.index` follows.
    pub fn adaptive_predict(
        &self,
        decision: usize,
        ctx: &PredictionContext,
    ) -> Result<Prediction, NoViableAlt> {
        let no_viable_alt = |offending_index| NoViableAlt {
            decision,
            start_index: ctx.index,
            offending_index,
        };
        let state = self
            .atn
            .decision_state(decision)
            .ok_or_else(|| no_viable_alt(ctx.index))?;
        let num_alts = state.transitions.len();

        let mut configs = ConfigSet::default();
        for (i, transition) in state.transitions.iter().enumerate() {
            let config = Config {
                state: state.id,
                alt: i + 1,
                stack: vec![],
                outer: 0,
            };
            if let Some(next) = self.epsilon_target(&config, transition, true, ctx) {
                self.closure(next, true, ctx, &mut configs);
            }
        }
        let alts = configs.alts(num_alts);
        match alts.iter().filter(|&bit| bit).count() {
            0 => return Err(no_viable_alt(ctx.index)),
            1 => {
                return Ok(Prediction {
                    alt: min_alt(&alts).unwrap_or(1),
                    ambiguity: None,
                });
            }
            _ => {}
        }

        let mut index = ctx.index;
        loop {
            let ttype = ctx.input.get(index).copied().unwrap_or(EOF);
            let reach = self.reach(&configs, ttype, ctx);
            let alts = reach.alts(num_alts);
            let viable = alts.iter().filter(|&bit| bit).count();
            trace!(
                "decision {} at {}: {} configurations, alts {}",
                decision,
                index,
                reach.configs.len(),
                format_alts(&alts)
            );
            if viable == 0 {
                return Err(no_viable_alt(index));
            }
            if viable == 1 {
                return Ok(Prediction {
                    alt: min_alt(&alts).unwrap_or(1),
                    ambiguity: None,
                });
            }
            let subsets = reach.conflicting_alt_subsets(num_alts);
            let resolved = match self.mode {
                PredictionMode::Ll => resolves_to_just_one_viable_alt(&subsets),
                PredictionMode::LlExactAmbigDetection => {
                    if all_subsets_conflict(&subsets) && all_subsets_equal(&subsets) {
                        min_alt(&alts)
                    } else {
                        None
                    }
                }
            };
            let resolved = match resolved {
                Some(alt) => Some(alt),
                None if ttype == EOF => min_alt(&alts),
                None => None,
            };
            if let Some(alt) = resolved {
                trace!("decision {} is ambiguous for alts {}", decision, format_alts(&alts));
                return Ok(Prediction {
                    alt,
                    ambiguity: Some(AmbiguityInfo {
                        decision,
                        start_index: ctx.index,
                        stop_index: index,
                        ambig_alts: alts,
                    }),
                });
            }
            configs = reach;
            if ttype != EOF {
                index += 1;
            }
        }
    }

    fn reach(&self, configs: &ConfigSet, ttype: TokenType, ctx: &PredictionContext) -> ConfigSet {
        let mut reach = ConfigSet::default();
        for config in &configs.configs {
            let state = self.atn.state(config.state);
            if state.kind == StateKind::RuleStop {
                // The parse can end here.
                if ttype == EOF {
                    reach.add(config.clone());
                }
                continue;
            }
            for transition in &state.transitions {
                if let Transition::Atom { target, ttype: expected } = *transition {
                    if expected == ttype {
                        self.closure(config.at(target), false, ctx, &mut reach);
                    }
                }
            }
        }
        reach
    }

    /// The configuration after an epsilon edge, if the edge can be taken.
    fn epsilon_target(
        &self,
        config: &Config,
        transition: &Transition,
        collect_predicates: bool,
        ctx: &PredictionContext,
    ) -> Option<Config> {
        match *transition {
            Transition::Atom { .. } => None,
            Transition::Epsilon { target }
            | Transition::Action { target, .. }
            | Transition::Predicate { target, .. } => Some(config.at(target)),
            Transition::Precedence { target, precedence } => {
                if collect_predicates && config.in_context() && precedence < ctx.precedence {
                    None
                } else {
                    Some(config.at(target))
                }
            }
            Transition::Rule { target, follow, .. } => {
                if config.stack.len() >= self.max_closure_depth {
                    trace!("closure depth limit reached at state {}", config.state);
                    return None;
                }
                let mut next = config.at(target);
                next.stack.push(follow);
                Some(next)
            }
        }
    }

    fn closure(
        &self,
        config: Config,
        collect_predicates: bool,
        ctx: &PredictionContext,
        out: &mut ConfigSet,
    ) {
        let mut busy = HashSet::new();
        let mut work = vec![config];
        while let Some(config) = work.pop() {
            if !busy.insert(config.clone()) {
                continue;
            }
            let state = self.atn.state(config.state);
            if state.kind == StateKind::RuleStop {
                if let Some(&follow) = config.stack.last() {
                    let mut next = config.at(follow);
                    next.stack.pop();
                    work.push(next);
                } else if let Some(&follow) = ctx.outer_stack.get(config.outer) {
                    let mut next = config.at(follow);
                    next.outer += 1;
                    work.push(next);
                } else {
                    out.add(config);
                }
                continue;
            }
            if !state.only_has_epsilon_transitions() {
                out.add(config.clone());
            }
            for transition in state.transitions.iter().rev() {
                if let Some(next) = self.epsilon_target(&config, transition, collect_predicates, ctx) {
                    work.push(next);
                }
            }
        }
    }
}
