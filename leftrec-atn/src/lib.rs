//! The automaton of a grammar whose left-recursive rules were rewritten, and the decisions
//! in it that choose alternatives of the rules as written.

#![deny(unsafe_code)]

pub mod atn;
pub mod builder;
pub mod decision_states;
pub mod predict;

pub use crate::atn::{Atn, State, StateId, StateKind, Transition};
pub use crate::builder::{AtnBuilder, AtnError, build_atn};
pub use crate::decision_states::OuterAltTracker;
pub use crate::predict::{
    AmbiguityInfo, NoViableAlt, Prediction, PredictionContext, PredictionMode, Predictor,
    format_alts,
};
