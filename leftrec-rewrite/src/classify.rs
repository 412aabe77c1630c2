//! Shapes of the alternatives of a directly left-recursive rule.

use leftrec_grammar::{Ast, NodeId, NodeKind, Rule};
use log::trace;

/// How an alternative refers to its own rule.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AltShape {
    /// `e op e`
    Binary,
    /// `e op e op e`, with a further self-reference between the outer ones.
    Ternary,
    /// `op e`
    Prefix,
    /// `e op`
    Suffix,
    /// No self-reference at either end.
    Other,
}

impl AltShape {
    /// Whether the alternative starts with a self-reference that must be rewritten.
    pub fn is_left_recursive(self) -> bool {
        matches!(self, AltShape::Binary | AltShape::Ternary | AltShape::Suffix)
    }
}

/// A reference to the rule itself, or a label assignment of one.
pub fn is_recurse(ast: &Ast, id: NodeId, rule_name: &str) -> bool {
    match ast.kind(id) {
        NodeKind::RuleRef { name, .. } => name == rule_name,
        NodeKind::Assign { .. } => ast
            .child(id, 0)
            .is_some_and(|child| ast.node(child).is_rule_ref_to(rule_name)),
        _ => false,
    }
}

/// Elements that match no input.
pub fn is_epsilon_element(kind: &NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::Action { .. } | NodeKind::Sempred { .. } | NodeKind::Epsilon
    )
}

/// Classifies one alternative by its top-level elements. Patterns are tried in the order
/// binary, prefix, suffix; the first match wins.
pub fn classify_alt(ast: &Ast, alt: NodeId, rule_name: &str) -> AltShape {
    let children = ast.children(alt);
    let recurse = |id: NodeId| is_recurse(ast, id, rule_name);
    // `recurse epsilon*` closes both the binary and the prefix pattern.
    let trailing_recurse = children
        .iter()
        .rposition(|&child| !is_epsilon_element(ast.kind(child)))
        .filter(|&last| last >= 1 && recurse(children[last]));
    let leading_recurse = children.first().is_some_and(|&first| recurse(first));

    let shape = match (leading_recurse, trailing_recurse) {
        (true, Some(last)) => {
            if children[1..last].iter().any(|&child| recurse(child)) {
                AltShape::Ternary
            } else {
                AltShape::Binary
            }
        }
        (false, Some(_)) => AltShape::Prefix,
        (true, None) if children.len() >= 2 => AltShape::Suffix,
        _ => AltShape::Other,
    };
    trace!("alt {} of rule {}: {:?}", ast.to_string_tree(alt), rule_name, shape);
    shape
}

/// Classifies every alternative of a rule, in order. Returns `None` for rules that can't be
/// rewritten: rules with arguments, and rules without any left-recursive alternative.
pub fn classify_rule(rule: &Rule) -> Option<Vec<AltShape>> {
    if rule.args().is_some() {
        return None;
    }
    let shapes: Vec<AltShape> = rule
        .alts()
        .into_iter()
        .map(|alt| classify_alt(&rule.ast, alt, &rule.name))
        .collect();
    if shapes.iter().any(|shape| shape.is_left_recursive()) {
        Some(shapes)
    } else {
        None
    }
}

/// Whether any alternative of the rule starts with a reference to the rule itself.
pub fn has_immediate_recursive_rule_refs(rule: &Rule) -> bool {
    rule.alts().into_iter().any(|alt| {
        rule.ast
            .child(alt, 0)
            .is_some_and(|first| is_recurse(&rule.ast, first, &rule.name))
    })
}
