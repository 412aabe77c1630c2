//! Parse trees, stored in an arena.
//!
//! A rule node's parent link may be set before the node is added to its parent's children,
//! since the interpreter attaches rule contexts only when they are complete. The parent link
//! is used for upward traversal only.

use std::fmt::Write;

use leftrec_atn::StateId;

use crate::error::RecognitionError;
use crate::token_stream::InputToken;

/// Index of a node in its [`ParseTree`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId(u32);

impl NodeId {
    pub fn usize(self) -> usize {
        self.0 as usize
    }
}

/// A range of token indices, inclusive. Empty when `b < a`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Interval {
    pub a: isize,
    pub b: isize,
}

impl Interval {
    pub const INVALID: Interval = Interval { a: -1, b: -2 };

    fn of(a: usize, b: usize) -> Self {
        Interval {
            a: a as isize,
            b: b as isize,
        }
    }
}

/// The rule context of one rule invocation.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RuleNode {
    pub rule_index: usize,
    /// The state that called the rule. `None` for the outermost context.
    pub invoking_state: Option<StateId>,
    outer_alt: Option<usize>,
    /// Index of the first token.
    pub start: Option<usize>,
    /// Index of the last token.
    pub stop: Option<usize>,
    pub exception: Option<RecognitionError>,
}

impl RuleNode {
    /// The alternative of the rule as written that this context matched. Reads as 1 until
    /// it is recorded.
    pub fn outer_alt(&self) -> usize {
        self.outer_alt.unwrap_or(1)
    }

    pub fn has_outer_alt(&self) -> bool {
        self.outer_alt.is_some()
    }

    /// Records the outer alternative unless one was recorded already.
    pub fn set_outer_alt(&mut self, alt: usize) -> bool {
        if self.outer_alt.is_some() {
            return false;
        }
        self.outer_alt = Some(alt);
        true
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ParseNode {
    Rule(RuleNode),
    Token(InputToken),
    /// A token consumed during error recovery. `conjured` error nodes stand for input that
    /// wasn't consumed.
    Error { token: InputToken, conjured: bool },
    /// Stands for a subtree cut away from a displayed tree.
    Elided,
}

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Node {
    pub kind: ParseNode,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// A parse tree arena with a designated root.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParseTree {
    nodes: Vec<Node>,
    root: Option<NodeId>,
}

impl ParseTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn set_root(&mut self, root: NodeId) {
        self.root = Some(root);
    }

    /// The same arena, displayed from another node.
    pub fn with_root(mut self, root: NodeId) -> Self {
        self.root = Some(root);
        self
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn add(&mut self, kind: ParseNode, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            parent,
            children: vec![],
        });
        id
    }

    /// Creates a rule context pointing at `parent`, without adding it to the parent's
    /// children.
    pub fn add_rule(
        &mut self,
        rule_index: usize,
        invoking_state: Option<StateId>,
        parent: Option<NodeId>,
    ) -> NodeId {
        self.add(
            ParseNode::Rule(RuleNode {
                rule_index,
                invoking_state,
                outer_alt: None,
                start: None,
                stop: None,
                exception: None,
            }),
            parent,
        )
    }

    pub fn add_token_node(&mut self, parent: NodeId, token: InputToken) -> NodeId {
        let id = self.add(ParseNode::Token(token), Some(parent));
        self.nodes[parent.usize()].children.push(id);
        id
    }

    pub fn add_error_node(&mut self, parent: NodeId, token: InputToken, conjured: bool) -> NodeId {
        let id = self.add(ParseNode::Error { token, conjured }, Some(parent));
        self.nodes[parent.usize()].children.push(id);
        id
    }

    /// Appends `child` to the children of `parent`.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.usize()].parent = Some(parent);
        self.nodes[parent.usize()].children.push(child);
    }

    pub fn set_parent(&mut self, child: NodeId, parent: Option<NodeId>) {
        self.nodes[child.usize()].parent = parent;
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.usize()]
    }

    pub fn rule(&self, id: NodeId) -> Option<&RuleNode> {
        match &self.nodes[id.usize()].kind {
            ParseNode::Rule(rule) => Some(rule),
            _ => None,
        }
    }

    pub fn rule_mut(&mut self, id: NodeId) -> Option<&mut RuleNode> {
        match &mut self.nodes[id.usize()].kind {
            ParseNode::Rule(rule) => Some(rule),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.usize()].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.usize()].children
    }

    /// Token range covered by a node.
    pub fn source_interval(&self, id: NodeId) -> Interval {
        match &self.nodes[id.usize()].kind {
            ParseNode::Rule(rule) => match (rule.start, rule.stop) {
                (None, _) => Interval::INVALID,
                (Some(start), Some(stop)) if stop >= start => Interval::of(start, stop),
                (Some(start), _) => Interval {
                    a: start as isize,
                    b: start as isize - 1,
                },
            },
            ParseNode::Token(token)
            | ParseNode::Error {
                token,
                conjured: false,
            } => Interval::of(token.index, token.index),
            ParseNode::Error { conjured: true, .. } | ParseNode::Elided => {
                Interval { a: -1, b: -1 }
            }
        }
    }

    /// Whether `t` is a proper ancestor of `u`. A node without a parent is an ancestor of
    /// nothing.
    pub fn is_ancestor_of(&self, t: Option<NodeId>, u: Option<NodeId>) -> bool {
        let (t, u) = match (t, u) {
            (Some(t), Some(u)) => (t, u),
            _ => return false,
        };
        if self.parent(t).is_none() {
            return false;
        }
        let mut p = self.parent(u);
        while let Some(node) = p {
            if node == t {
                return true;
            }
            p = self.parent(node);
        }
        false
    }

    /// The deepest rule context under `t` whose tokens include `start..=stop`.
    pub fn get_root_of_subtree_enclosing_region(
        &self,
        t: NodeId,
        start: usize,
        stop: usize,
    ) -> Option<NodeId> {
        for &child in self.children(t) {
            if let Some(found) = self.get_root_of_subtree_enclosing_region(child, start, stop) {
                return Some(found);
            }
        }
        let rule = self.rule(t)?;
        let rule_start = rule.start?;
        // A missing stop means the parse never left this context.
        if start >= rule_start && rule.stop.is_none_or(|rule_stop| stop <= rule_stop) {
            Some(t)
        } else {
            None
        }
    }

    /// Replaces rule-context children of `t` that lie entirely outside `start..=stop` with
    /// [`ParseNode::Elided`], but only those that contain `root`.
    pub fn strip_children_out_of_range(
        &mut self,
        t: NodeId,
        root: Option<NodeId>,
        start: usize,
        stop: usize,
    ) {
        let (start, stop) = (start as isize, stop as isize);
        for i in 0..self.children(t).len() {
            let child = self.children(t)[i];
            let range = self.source_interval(child);
            let outside = range.b < start || range.a > stop;
            if self.rule(child).is_some() && outside && self.is_ancestor_of(Some(child), root) {
                let elided = self.add(ParseNode::Elided, Some(t));
                self.nodes[child.usize()].parent = None;
                self.nodes[t.usize()].children[i] = elided;
            }
        }
    }

    /// Renders the tree from its root like `(e:2 (e:1 a) + b)`.
    pub fn to_string_tree(&self, rule_names: &[String]) -> String {
        match self.root {
            Some(root) => self.to_string_subtree(root, rule_names),
            None => String::new(),
        }
    }

    pub fn to_string_subtree(&self, id: NodeId, rule_names: &[String]) -> String {
        let mut out = String::new();
        self.write_tree(&mut out, id, rule_names);
        out
    }

    fn node_text(&self, id: NodeId, rule_names: &[String]) -> String {
        match &self.nodes[id.usize()].kind {
            ParseNode::Rule(rule) => {
                let name = rule_names
                    .get(rule.rule_index)
                    .map_or("<unknown>", |name| &name[..]);
                format!("{}:{}", name, rule.outer_alt())
            }
            ParseNode::Token(token) => token.text.clone(),
            ParseNode::Error { token, .. } => format!("<error {}>", token.text),
            ParseNode::Elided => "...".to_string(),
        }
    }

    fn write_tree(&self, out: &mut String, id: NodeId, rule_names: &[String]) {
        let text = escape_whitespace(&self.node_text(id, rule_names));
        let children = self.children(id);
        if children.is_empty() {
            out.push_str(&text);
            return;
        }
        out.push('(');
        out.push_str(&text);
        for &child in children {
            out.push(' ');
            self.write_tree(out, child, rule_names);
        }
        out.push(')');
    }

    /// Whether the subtrees have the same shape, rule contexts, alternatives and tokens.
    pub fn structurally_equal(&self, id: NodeId, other: &ParseTree, other_id: NodeId) -> bool {
        let same_node = match (&self.node(id).kind, &other.node(other_id).kind) {
            (ParseNode::Rule(a), ParseNode::Rule(b)) => {
                a.rule_index == b.rule_index
                    && a.outer_alt() == b.outer_alt()
                    && a.start == b.start
                    && a.stop == b.stop
            }
            (a, b) => a == b,
        };
        let (children, other_children) = (self.children(id), other.children(other_id));
        same_node
            && children.len() == other_children.len()
            && children
                .iter()
                .zip(other_children)
                .all(|(&a, &b)| self.structurally_equal(a, other, b))
    }
}

fn escape_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => {
                // Writing into a String cannot fail.
                let _ = write!(out, "{}", ch);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(index: usize, text: &str) -> InputToken {
        InputToken {
            ttype: 1,
            text: text.to_string(),
            index,
        }
    }

    fn names() -> Vec<String> {
        vec!["s".to_string(), "e".to_string()]
    }

    /// `(s:1 (e:2 a b) c)` over tokens 0..=2.
    fn sample() -> (ParseTree, NodeId, NodeId) {
        let mut tree = ParseTree::new();
        let s = tree.add_rule(0, None, None);
        let e = tree.add_rule(1, Some(4), Some(s));
        tree.add_child(s, e);
        tree.rule_mut(e).unwrap().set_outer_alt(2);
        tree.add_token_node(e, token(0, "a"));
        tree.add_token_node(e, token(1, "b"));
        tree.add_token_node(s, token(2, "c"));
        let rule = tree.rule_mut(e).unwrap();
        rule.start = Some(0);
        rule.stop = Some(1);
        let rule = tree.rule_mut(s).unwrap();
        rule.start = Some(0);
        rule.stop = Some(2);
        tree.set_root(s);
        (tree, s, e)
    }

    #[test]
    fn test_to_string_tree() {
        let (mut tree, s, _) = sample();
        assert_eq!(tree.to_string_tree(&names()), "(s:1 (e:2 a b) c)");
        tree.add_error_node(s, token(3, "\n"), true);
        assert_eq!(tree.to_string_tree(&names()), "(s:1 (e:2 a b) c <error \\n>)");
    }

    #[test]
    fn test_outer_alt_is_recorded_once() {
        let (mut tree, _, e) = sample();
        assert!(!tree.rule_mut(e).unwrap().set_outer_alt(3));
        assert_eq!(tree.rule(e).unwrap().outer_alt(), 2);
    }

    #[test]
    fn test_enclosing_region() {
        let (tree, s, e) = sample();
        assert_eq!(tree.get_root_of_subtree_enclosing_region(s, 0, 1), Some(e));
        assert_eq!(tree.get_root_of_subtree_enclosing_region(s, 1, 2), Some(s));
        assert_eq!(tree.source_interval(e), Interval { a: 0, b: 1 });
    }

    #[test]
    fn test_ancestors() {
        let (tree, s, e) = sample();
        let a = tree.children(e)[0];
        assert!(tree.is_ancestor_of(Some(e), Some(a)));
        assert!(!tree.is_ancestor_of(Some(e), Some(e)));
        // The root has no parent.
        assert!(!tree.is_ancestor_of(Some(s), Some(a)));
        assert!(!tree.is_ancestor_of(None, Some(a)));
    }

    #[test]
    fn test_strip_children_out_of_range() {
        let (mut tree, s, e) = sample();
        let a = tree.children(e)[0];
        tree.strip_children_out_of_range(s, Some(a), 2, 2);
        assert_eq!(tree.to_string_tree(&names()), "(s:1 ... c)");
        let (mut tree, s, e) = sample();
        tree.strip_children_out_of_range(s, Some(e), 2, 2);
        assert_eq!(tree.to_string_tree(&names()), "(s:1 (e:2 a b) c)");
    }

    #[test]
    fn test_structural_equality() {
        let (a, s, _) = sample();
        let (mut b, t, _) = sample();
        assert!(a.structurally_equal(s, &b, t));
        b.add_token_node(t, token(3, "d"));
        assert!(!a.structurally_equal(s, &b, t));
    }
}
