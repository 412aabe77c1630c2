//! Rewriting of directly left-recursive rules into precedence climbing.
//!
//! A rule such as `e : e '*' e | INT ;` becomes a primary block followed by a loop over
//! operator alternatives guarded by precedence predicates. The rewritten rule remembers
//! which original alternative each of its alternatives came from, see
//! [`LeftRecursion`](leftrec_grammar::LeftRecursion).

#![deny(unsafe_code)]

pub mod analyzer;
pub mod classify;
pub mod cycles;
pub mod precedence;
pub mod synthesize;
pub mod template;
pub mod tool;
pub mod transformer;

pub use crate::analyzer::{
    LeftRecursiveRuleAnalyzer, PRECEDENCE_OPTION_NAME, TOKEN_INDEX_OPTION_NAME,
};
pub use crate::classify::{AltShape, classify_alt, classify_rule, has_immediate_recursive_rule_refs};
pub use crate::cycles::detect_left_recursion_cycles;
pub use crate::precedence::{AssocConflict, Associativity, Precedence};
pub use crate::synthesize::{LeftRecursiveRuleActions, artificial_op_prec_rule, build_rule_actions};
pub use crate::template::{Template, TemplateError, TemplateGroup, Value};
pub use crate::tool::{ToolContext, ToolOptions};
pub use crate::transformer::translate_left_recursive_rules;
