//! Grammar syntax trees, stored in an arena.
//!
//! Every rule owns one [`Ast`]. Nodes are addressed with [`NodeId`]; the parent link is a plain
//! index used for upward traversal only.

use std::fmt::{self, Write};
use std::ops::Range;

use crate::token::Token;

/// Index of a node in its [`Ast`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId(u32);

impl NodeId {
    pub fn usize(self) -> usize {
        self.0 as usize
    }
}

/// Suffix operator of an EBNF subrule.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EbnfKind {
    /// `(...)?`
    Optional,
    /// `(...)*`
    Star,
    /// `(...)+`
    Plus,
}

/// Node kinds of the grammar syntax tree.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NodeKind {
    /// Root of a rule. Its only child is the rule block.
    Rule {
        name: String,
        /// Text of the parameter list, without brackets.
        args: Option<String>,
        /// Text of the `returns` clause, without brackets.
        returns: Option<String>,
    },
    Block,
    Alt {
        label: Option<String>,
    },
    RuleRef {
        name: String,
        /// Argument text, without brackets.
        args: Option<String>,
    },
    TokenRef {
        name: String,
    },
    StringLiteral {
        text: String,
    },
    /// `label=element` or, with `plus`, `label+=element`.
    Assign {
        label: String,
        plus: bool,
    },
    /// Its only child is a block.
    Ebnf(EbnfKind),
    Action {
        text: String,
    },
    Sempred {
        text: String,
    },
    Epsilon,
}

/// An element option such as `assoc=right` or `p=3`.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ElementOption {
    pub key: String,
    pub value: String,
    /// Token of the value, if the option comes from source text.
    pub token: Option<usize>,
}

/// A node of the syntax tree.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Node {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Live options, in insertion order.
    pub options: Vec<ElementOption>,
    /// Token range of the `<...>` block the options were written in.
    pub options_span: Option<Range<usize>>,
    /// Token range covered by this node, half-open.
    pub span: Range<usize>,
    /// The token this node was created from.
    pub token: Option<usize>,
    /// Token index in the grammar this node was rewritten from.
    pub original_token: Option<usize>,
}

impl Node {
    pub fn new(kind: NodeKind, span: Range<usize>, token: Option<usize>) -> Self {
        Node {
            kind,
            parent: None,
            children: vec![],
            options: vec![],
            options_span: None,
            span,
            token,
            original_token: None,
        }
    }

    pub fn option(&self, key: &str) -> Option<&ElementOption> {
        self.options.iter().find(|option| option.key == key)
    }

    /// Name of a referenced rule, if this node is a rule reference.
    pub fn rule_ref_name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::RuleRef { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn is_rule_ref_to(&self, rule_name: &str) -> bool {
        self.rule_ref_name() == Some(rule_name)
    }
}

/// A syntax tree arena.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ast {
    nodes: Vec<Node>,
}

impl Ast {
    pub fn new() -> Self {
        Ast { nodes: vec![] }
    }

    /// The first node added is the root.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn add(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Appends `child` to the children of `parent`.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.usize()].parent = Some(parent);
        self.nodes[parent.usize()].children.push(child);
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.usize()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.usize()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.usize()].kind
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.usize()].children
    }

    pub fn child(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.nodes[id.usize()].children.get(index).copied()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.usize()].parent
    }

    /// Detaches a child. The node stays in the arena, unreachable from its former parent.
    pub fn delete_child(&mut self, id: NodeId, index: usize) -> Option<NodeId> {
        let children = &mut self.nodes[id.usize()].children;
        if index < children.len() {
            let child = children.remove(index);
            self.nodes[child.usize()].parent = None;
            Some(child)
        } else {
            None
        }
    }

    /// All nodes of the subtree at `id`, in depth-first preorder.
    pub fn preorder(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = vec![];
        let mut work = vec![id];
        while let Some(node) = work.pop() {
            result.push(node);
            work.extend(self.children(node).iter().rev());
        }
        result
    }

    pub fn nodes_where<F>(&self, id: NodeId, mut pred: F) -> Vec<NodeId>
    where
        F: FnMut(&Node) -> bool,
    {
        self.preorder(id)
            .into_iter()
            .filter(|&node| pred(self.node(node)))
            .collect()
    }

    /// Finds the node of the subtree at `id` that was created from the given token.
    pub fn node_with_token_index(&self, id: NodeId, token_index: usize) -> Option<NodeId> {
        self.preorder(id)
            .into_iter()
            .find(|&node| self.node(node).token == Some(token_index))
    }

    /// The first child of the given kind.
    pub fn first_child_where<F>(&self, id: NodeId, mut pred: F) -> Option<NodeId>
    where
        F: FnMut(&NodeKind) -> bool,
    {
        self.children(id)
            .iter()
            .copied()
            .find(|&child| pred(self.kind(child)))
    }

    pub fn option(&self, id: NodeId, key: &str) -> Option<&str> {
        self.node(id).option(key).map(|option| &option.value[..])
    }

    /// Sets an option, replacing the value of the existing option with the same key.
    pub fn set_option(&mut self, id: NodeId, key: &str, value: impl Into<String>) {
        let value = value.into();
        let options = &mut self.nodes[id.usize()].options;
        if let Some(option) = options.iter_mut().find(|option| option.key == key) {
            option.value = value;
        } else {
            options.push(ElementOption {
                key: key.to_string(),
                value,
                token: None,
            });
        }
    }

    /// Copies the subtree at `id` into a fresh arena, whose root is the copy of `id`.
    pub fn dup_subtree(&self, id: NodeId) -> Ast {
        let mut copy = Ast::new();
        let root = self.copy_into(&mut copy, id);
        copy.nodes[root.usize()].parent = None;
        copy
    }

    fn copy_into(&self, copy: &mut Ast, id: NodeId) -> NodeId {
        let node = self.node(id);
        let new_id = copy.add(Node {
            children: vec![],
            parent: None,
            ..node.clone()
        });
        for &child in &node.children {
            let new_child = self.copy_into(copy, child);
            copy.add_child(new_id, new_child);
        }
        new_id
    }

    /// Source text covered by the node, hidden tokens included.
    pub fn source_text(&self, id: NodeId, tokens: &[Token]) -> String {
        let span = self.node(id).span.clone();
        tokens[span.start.min(tokens.len())..span.end.min(tokens.len())]
            .iter()
            .map(|token| &token.text[..])
            .collect()
    }

    /// Lisp-like rendering, e.g. `(BLOCK (ALT e '+' e))`.
    pub fn to_string_tree(&self, id: NodeId) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_tree(&mut out, id);
        out
    }

    fn write_tree(&self, out: &mut String, id: NodeId) -> fmt::Result {
        let node = self.node(id);
        let label = match &node.kind {
            NodeKind::Rule { name, .. } => format!("RULE {}", name),
            NodeKind::Block => "BLOCK".to_string(),
            NodeKind::Alt { .. } => "ALT".to_string(),
            NodeKind::RuleRef { name, .. } | NodeKind::TokenRef { name } => name.clone(),
            NodeKind::StringLiteral { text } => text.clone(),
            NodeKind::Assign { label, plus: false } => format!("= {}", label),
            NodeKind::Assign { label, plus: true } => format!("+= {}", label),
            NodeKind::Ebnf(EbnfKind::Optional) => "?".to_string(),
            NodeKind::Ebnf(EbnfKind::Star) => "*".to_string(),
            NodeKind::Ebnf(EbnfKind::Plus) => "+".to_string(),
            NodeKind::Action { text } => format!("{{{}}}", text),
            NodeKind::Sempred { text } => format!("{{{}}}?", text),
            NodeKind::Epsilon => "EPSILON".to_string(),
        };
        let mut options = String::new();
        for (i, option) in node.options.iter().enumerate() {
            if i > 0 {
                options.push(',');
            }
            write!(options, "{}={}", option.key, option.value)?;
        }
        let label = if options.is_empty() {
            label
        } else {
            format!("{}<{}>", label, options)
        };
        if node.children.is_empty() {
            out.push_str(&label);
        } else {
            write!(out, "({}", label)?;
            for &child in &node.children {
                out.push(' ');
                self.write_tree(out, child)?;
            }
            out.push(')');
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(ast: &mut Ast, parent: NodeId, name: &str, token: usize) -> NodeId {
        let id = ast.add(Node::new(
            NodeKind::RuleRef {
                name: name.to_string(),
                args: None,
            },
            token..token + 1,
            Some(token),
        ));
        ast.add_child(parent, id);
        id
    }

    fn sample() -> Ast {
        let mut ast = Ast::new();
        let alt = ast.add(Node::new(NodeKind::Alt { label: None }, 0..3, None));
        leaf(&mut ast, alt, "a", 0);
        leaf(&mut ast, alt, "b", 1);
        leaf(&mut ast, alt, "c", 2);
        ast
    }

    #[test]
    fn test_dup_subtree_is_independent() {
        let ast = sample();
        let mut copy = ast.dup_subtree(ast.root());
        copy.delete_child(copy.root(), 0);
        assert_eq!(ast.children(ast.root()).len(), 3);
        assert_eq!(copy.to_string_tree(copy.root()), "(ALT b c)");
    }

    #[test]
    fn test_set_option_replaces() {
        let mut ast = sample();
        let b = ast.child(ast.root(), 1).unwrap();
        ast.set_option(b, "p", "2");
        ast.set_option(b, "p", "3");
        assert_eq!(ast.option(b, "p"), Some("3"));
        assert_eq!(ast.node(b).options.len(), 1);
        assert_eq!(ast.to_string_tree(ast.root()), "(ALT a b<p=3> c)");
    }

    #[test]
    fn test_token_lookup() {
        let ast = sample();
        let found = ast.node_with_token_index(ast.root(), 2).unwrap();
        assert!(ast.node(found).is_rule_ref_to("c"));
        assert_eq!(ast.node_with_token_index(ast.root(), 7), None);
    }
}
