//! Strips self-references from the alternatives of a left-recursive rule and reconstructs
//! their text with precedence arguments.

use std::fmt::Write;
use std::ops::Range;

use leftrec_grammar::{Ast, ErrorManager, NodeId, NodeKind, RecursiveAltInfo, Rule, TokenKind};
use log::{debug, trace};

use crate::classify::{AltShape, classify_rule, is_recurse};
use crate::precedence::{AssocConflict, Precedence};

/// Option carrying the precedence of a rule reference or a predicate.
pub const PRECEDENCE_OPTION_NAME: &str = "p";
/// Option linking a synthesized element to its token in the grammar as written.
pub const TOKEN_INDEX_OPTION_NAME: &str = "tokenIndex";

/// Rewritten alternatives of one rule, bucketed by shape.
pub struct LeftRecursiveRuleAnalyzer<'r> {
    rule: &'r Rule,
    pub precedence: Precedence,
    pub binary_alts: Vec<RecursiveAltInfo>,
    pub ternary_alts: Vec<RecursiveAltInfo>,
    pub suffix_alts: Vec<RecursiveAltInfo>,
    pub prefix_and_other_alts: Vec<RecursiveAltInfo>,
    /// Labels of the stripped self-references, with their label tokens.
    pub left_recursive_rule_ref_labels: Vec<(String, Option<usize>)>,
}

struct StrippedLabel {
    label: String,
    is_list_label: bool,
    token: usize,
}

impl<'r> LeftRecursiveRuleAnalyzer<'r> {
    pub fn new(rule: &'r Rule) -> Self {
        LeftRecursiveRuleAnalyzer {
            rule,
            precedence: Precedence::new(rule.num_alts),
            binary_alts: vec![],
            ternary_alts: vec![],
            suffix_alts: vec![],
            prefix_and_other_alts: vec![],
            left_recursive_rule_ref_labels: vec![],
        }
    }

    pub fn rule(&self) -> &Rule {
        self.rule
    }

    /// Classifies and rewrites every alternative. Returns `false` if the rule doesn't fit
    /// any rewritable shape.
    pub fn analyze(&mut self, errors: &mut ErrorManager) -> Result<bool, AssocConflict> {
        let shapes = match classify_rule(self.rule) {
            Some(shapes) => shapes,
            None => return Ok(false),
        };
        debug!("rewriting left-recursive rule {}", self.rule.name);
        for (i, (alt_node, shape)) in self.rule.alts().into_iter().zip(shapes).enumerate() {
            let alt = i + 1;
            if shape != AltShape::Other {
                self.precedence
                    .set_alt_assoc(errors, self.rule, alt_node, alt)?;
            }
            match shape {
                AltShape::Binary | AltShape::Ternary => self.binary_alt(alt_node, alt, shape),
                AltShape::Prefix => self.prefix_alt(alt_node, alt),
                AltShape::Suffix => self.suffix_alt(alt_node, alt),
                AltShape::Other => self.other_alt(alt_node, alt),
            }
        }
        Ok(true)
    }

    /// Operator alternatives in the order of the operator loop: binary, then ternary, then
    /// suffix alternatives.
    pub fn op_alts(&self) -> impl Iterator<Item = &RecursiveAltInfo> {
        self.binary_alts
            .iter()
            .chain(&self.ternary_alts)
            .chain(&self.suffix_alts)
    }

    fn binary_alt(&mut self, original: NodeId, alt: usize, shape: AltShape) {
        let mut tree = self.rule.ast.dup_subtree(original);
        let stripped = self.strip_left_recursion(&mut tree);
        self.strip_alt_label(&mut tree);
        let next_prec = self.precedence.next_precedence(alt);
        self.add_precedence_arg_to_rules(&mut tree, next_prec);
        let info = self.alt_info(original, alt, &tree, stripped, next_prec);
        if shape == AltShape::Ternary {
            self.ternary_alts.push(info);
        } else {
            self.binary_alts.push(info);
        }
    }

    fn prefix_alt(&mut self, original: NodeId, alt: usize) {
        let mut tree = self.rule.ast.dup_subtree(original);
        self.strip_alt_label(&mut tree);
        let next_prec = self.precedence.precedence(alt);
        self.add_precedence_arg_to_rules(&mut tree, next_prec);
        let info = self.alt_info(original, alt, &tree, None, next_prec);
        self.prefix_and_other_alts.push(info);
    }

    fn suffix_alt(&mut self, original: NodeId, alt: usize) {
        let mut tree = self.rule.ast.dup_subtree(original);
        let stripped = self.strip_left_recursion(&mut tree);
        self.strip_alt_label(&mut tree);
        let info = self.alt_info(original, alt, &tree, stripped, 0);
        self.suffix_alts.push(info);
    }

    fn other_alt(&mut self, original: NodeId, alt: usize) {
        let mut tree = self.rule.ast.dup_subtree(original);
        self.strip_alt_label(&mut tree);
        // Kept with the prefix alternatives, so their relative order survives.
        let info = self.alt_info(original, alt, &tree, None, 0);
        self.prefix_and_other_alts.push(info);
    }

    fn alt_info(
        &mut self,
        original: NodeId,
        alt: usize,
        tree: &Ast,
        stripped: Option<StrippedLabel>,
        next_prec: usize,
    ) -> RecursiveAltInfo {
        let alt_label = match self.rule.ast.kind(original) {
            NodeKind::Alt { label } => label.clone(),
            _ => None,
        };
        let (label, is_list_label) = match stripped {
            Some(stripped) => {
                self.left_recursive_rule_ref_labels
                    .push((stripped.label.clone(), Some(stripped.token)));
                (Some(stripped.label), stripped.is_list_label)
            }
            None => (None, false),
        };
        let alt_text = self.text(tree, tree.root());
        trace!("alt {} of {}: {}", alt, self.rule.name, alt_text);
        RecursiveAltInfo {
            alt_num: alt,
            alt_text,
            left_recursive_rule_ref_label: label,
            is_list_label,
            alt_label,
            next_prec,
            original_alt: self.rule.ast.dup_subtree(original),
            alt_node: None,
        }
    }

    /// Deletes the leading self-reference of an alternative and moves the start of the
    /// alternative past it, skipping its options as well.
    fn strip_left_recursion(&self, tree: &mut Ast) -> Option<StrippedLabel> {
        let alt = tree.root();
        let first = tree.child(alt, 0)?;
        if !is_recurse(tree, first, &self.rule.name) {
            return None;
        }
        let stripped = match tree.kind(first) {
            NodeKind::Assign { label, plus } => Some(StrippedLabel {
                label: label.clone(),
                is_list_label: *plus,
                token: tree.node(first).span.start,
            }),
            _ => None,
        };
        tree.delete_child(alt, 0);
        if let Some(new_first) = tree.child(alt, 0) {
            let start = tree.node(new_first).span.start;
            tree.node_mut(alt).span.start = start;
        }
        stripped
    }

    /// Ends the alternative before its `# Label`.
    fn strip_alt_label(&self, tree: &mut Ast) {
        let alt = tree.root();
        let span = tree.node(alt).span.clone();
        let tokens = &self.rule.tokens;
        let pound = (span.start..span.end)
            .rev()
            .find(|&i| tokens.get(i).is_some_and(|token| token.kind == TokenKind::Pound));
        if let Some(i) = pound {
            tree.node_mut(alt).span.end = i;
        }
    }

    /// Annotates the rightmost rule reference with `p=prec` when it refers to the rule itself.
    fn add_precedence_arg_to_rules(&self, tree: &mut Ast, prec: usize) {
        let rule_refs = tree.nodes_where(tree.root(), |node| node.rule_ref_name().is_some());
        if let Some(&rightmost) = rule_refs.last() {
            if tree.node(rightmost).is_rule_ref_to(&self.rule.name) {
                tree.set_option(rightmost, PRECEDENCE_OPTION_NAME, prec.to_string());
            }
        }
    }

    /// Text of the node's token range, with element options taken from the live options
    /// instead of the source.
    pub fn text(&self, tree: &Ast, id: NodeId) -> String {
        let tokens = &self.rule.tokens;
        let span = tree.node(id).span.clone();
        let subtree = tree.preorder(id);
        let ignore: Vec<Range<usize>> = subtree
            .iter()
            .filter_map(|&node| tree.node(node).options_span.clone())
            .collect();
        // Label tokens of `x=elem` take no options.
        let no_options: Vec<usize> = subtree
            .iter()
            .filter(|&&node| matches!(tree.kind(node), NodeKind::Assign { .. }))
            .map(|&node| tree.node(node).span.start)
            .collect();

        let mut buf = String::new();
        let mut i = span.start;
        let end = span.end.min(tokens.len());
        while i < end {
            if ignore.iter().any(|range| range.contains(&i)) {
                i += 1;
                continue;
            }
            let token = &tokens[i];
            let mut element_options = String::new();
            if !no_options.contains(&i) {
                let node = tree.node_with_token_index(id, i);
                if node.is_some()
                    && matches!(
                        token.kind,
                        TokenKind::TokenRef | TokenKind::StringLiteral | TokenKind::RuleRef
                    )
                {
                    let _ = write!(element_options, "{}={}", TOKEN_INDEX_OPTION_NAME, i);
                }
                for option in node.iter().flat_map(|&node| &tree.node(node).options) {
                    if !element_options.is_empty() {
                        element_options.push(',');
                    }
                    let _ = write!(element_options, "{}={}", option.key, option.value);
                }
            }
            buf.push_str(&token.text);
            i += 1;
            if token.kind == TokenKind::RuleRef
                && i < end
                && tokens[i].kind == TokenKind::ArgAction
            {
                buf.push_str(&tokens[i].text);
                i += 1;
            }
            if !element_options.is_empty() {
                let _ = write!(buf, "<{}>", element_options);
            }
        }
        buf.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leftrec_grammar::Grammar;

    fn analyze(text: &str) -> (Grammar, ErrorManager) {
        let grammar = Grammar::load(text).unwrap();
        (grammar, ErrorManager::new("T.g4", false))
    }

    fn texts(alts: &[RecursiveAltInfo]) -> Vec<(usize, &str)> {
        alts.iter().map(|info| (info.alt_num, &info.alt_text[..])).collect()
    }

    #[test]
    fn test_binary_alts() {
        let (grammar, mut errors) = analyze("e : e '*' e | INT | e '+' e | ID ;");
        let mut analyzer = LeftRecursiveRuleAnalyzer::new(grammar.rule(0));
        assert_eq!(analyzer.analyze(&mut errors), Ok(true));
        assert_eq!(
            texts(&analyzer.binary_alts),
            vec![
                (1, "'*'<tokenIndex=6> e<tokenIndex=8,p=5>"),
                (3, "'+'<tokenIndex=18> e<tokenIndex=20,p=3>"),
            ]
        );
        assert_eq!(
            texts(&analyzer.prefix_and_other_alts),
            vec![(2, "INT<tokenIndex=12>"), (4, "ID<tokenIndex=24>")]
        );
    }

    #[test]
    fn test_label_stripping() {
        let (grammar, mut errors) = analyze("e : a=e '*' b=e # Mul | xs+=e '!' # Bang | INT ;");
        let mut analyzer = LeftRecursiveRuleAnalyzer::new(grammar.rule(0));
        assert_eq!(analyzer.analyze(&mut errors), Ok(true));
        let mul = &analyzer.binary_alts[0];
        assert_eq!(mul.alt_label.as_deref(), Some("Mul"));
        assert_eq!(mul.left_recursive_rule_ref_label.as_deref(), Some("a"));
        assert!(!mul.is_list_label);
        assert_eq!(mul.alt_text, "'*'<tokenIndex=8> b=e<tokenIndex=12,p=4>");
        let bang = &analyzer.suffix_alts[0];
        assert_eq!(bang.alt_label.as_deref(), Some("Bang"));
        assert!(bang.is_list_label);
        assert_eq!(bang.alt_text, "'!'<tokenIndex=24>");
        assert_eq!(
            analyzer
                .left_recursive_rule_ref_labels
                .iter()
                .map(|(label, _)| &label[..])
                .collect::<Vec<_>>(),
            vec!["a", "xs"]
        );
    }

    #[test]
    fn test_prefix_and_right_assoc() {
        let (grammar, mut errors) = analyze("e : <assoc=right> e '^' e | '-' e | ID ;");
        let mut analyzer = LeftRecursiveRuleAnalyzer::new(grammar.rule(0));
        assert_eq!(analyzer.analyze(&mut errors), Ok(true));
        // right-associative operands recurse at their own level
        assert_eq!(analyzer.binary_alts[0].next_prec, 3);
        assert!(analyzer.binary_alts[0].alt_text.ends_with("e<tokenIndex=14,p=3>"));
        assert_eq!(analyzer.prefix_and_other_alts[0].next_prec, 2);
        assert_eq!(
            analyzer.prefix_and_other_alts[0].alt_text,
            "'-'<tokenIndex=18> e<tokenIndex=20,p=2>"
        );
    }

    #[test]
    fn test_suffix_keeps_inner_reference_unrestricted() {
        let (grammar, mut errors) = analyze("e : e '[' e ']' | ID ;");
        let mut analyzer = LeftRecursiveRuleAnalyzer::new(grammar.rule(0));
        assert_eq!(analyzer.analyze(&mut errors), Ok(true));
        assert_eq!(
            analyzer.suffix_alts[0].alt_text,
            "'['<tokenIndex=6> e<tokenIndex=8> ']'<tokenIndex=10>"
        );
    }

    #[test]
    fn test_args_and_predicates_are_kept() {
        let (grammar, mut errors) = analyze("e : e '.' f[1] {x}? | ID ;");
        let mut analyzer = LeftRecursiveRuleAnalyzer::new(grammar.rule(0));
        assert_eq!(analyzer.analyze(&mut errors), Ok(true));
        assert_eq!(
            analyzer.suffix_alts[0].alt_text,
            "'.'<tokenIndex=6> f[1]<tokenIndex=8> {x}?"
        );
    }

    #[test]
    fn test_nonconforming() {
        let (grammar, mut errors) = analyze("e : e | ID ;");
        let mut analyzer = LeftRecursiveRuleAnalyzer::new(grammar.rule(0));
        assert_eq!(analyzer.analyze(&mut errors), Ok(false));
    }
}
