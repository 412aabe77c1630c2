//! Grammars and rules.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::LoadError;
use crate::ast::{Ast, NodeId, NodeKind};
use crate::lexer::Lexer;
use crate::parser::Parser;
use crate::token::Token;
use crate::vocabulary::Vocabulary;

/// A parsed grammar.
#[derive(Clone, Debug)]
pub struct Grammar {
    name: Option<String>,
    rules: Vec<Rule>,
    vocabulary: Vocabulary,
    tokens: Rc<[Token]>,
}

/// A grammar rule. Its syntax tree is replaced when the rule is rewritten.
#[derive(Clone, Debug)]
pub struct Rule {
    pub name: String,
    pub index: usize,
    pub ast: Ast,
    /// Tokens that node spans of `ast` refer to.
    pub tokens: Rc<[Token]>,
    pub num_alts: usize,
    /// Present once the rule has been rewritten from its left-recursive form.
    pub recursion: Option<LeftRecursion>,
}

/// What a rewritten left-recursive rule remembers about its original form.
#[derive(Clone, Debug)]
pub struct LeftRecursion {
    /// Alternatives of the leading block, in physical order.
    pub primary_alts: Vec<RecursiveAltInfo>,
    /// Alternatives of the operator loop, in physical order.
    pub op_alts: Vec<RecursiveAltInfo>,
    /// The rule tree before rewriting.
    pub original_ast: Ast,
    pub original_tokens: Rc<[Token]>,
    /// Labels of deleted left-recursive references, e.g. `a` from `a=e '*' e`, with the
    /// index of the original label token.
    pub left_recursive_rule_ref_labels: Vec<(String, Option<usize>)>,
}

/// One rewritten alternative.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RecursiveAltInfo {
    /// Alternative number in the rule as written.
    pub alt_num: usize,
    pub alt_text: String,
    pub left_recursive_rule_ref_label: Option<String>,
    pub is_list_label: bool,
    pub alt_label: Option<String>,
    /// Precedence a trailing recursive reference must carry.
    pub next_prec: usize,
    /// Copy of the alternative as written.
    pub original_alt: Ast,
    /// The alternative in the rewritten rule tree.
    pub alt_node: Option<NodeId>,
}

impl Grammar {
    /// Parses grammar text.
    pub fn load(text: &str) -> Result<Self, LoadError> {
        let tokens: Rc<[Token]> = Lexer::tokenize(text)?.into();
        let (name, trees) = Parser::new(&tokens).grammar()?;
        let vocabulary = Vocabulary::from_rules(&trees);
        let rules = trees
            .into_iter()
            .enumerate()
            .map(|(index, ast)| Rule::new(index, ast, tokens.clone()))
            .collect();
        Ok(Grammar {
            name,
            rules,
            vocabulary,
            tokens,
        })
    }

    /// Parses the text of a single rule.
    pub fn parse_rule(text: &str) -> Result<(Ast, Rc<[Token]>), LoadError> {
        let tokens: Rc<[Token]> = Lexer::tokenize(text)?.into();
        let ast = Parser::new(&tokens).single_rule()?;
        Ok((ast, tokens))
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn rules_mut(&mut self) -> &mut [Rule] {
        &mut self.rules
    }

    pub fn num_rules(&self) -> usize {
        self.rules.len()
    }

    pub fn rule(&self, index: usize) -> &Rule {
        &self.rules[index]
    }

    pub fn rule_mut(&mut self, index: usize) -> &mut Rule {
        &mut self.rules[index]
    }

    /// Installs a rewritten syntax tree for the rule at `index`.
    pub fn replace_rule_ast(&mut self, index: usize, ast: Ast, tokens: Rc<[Token]>) {
        self.rules[index].replace_ast(ast, tokens);
    }

    pub fn rule_index(&self, name: &str) -> Option<usize> {
        self.rules.iter().position(|rule| rule.name == name)
    }

    pub fn rule_by_name(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.name == name)
    }

    pub fn rule_names(&self) -> Vec<String> {
        self.rules.iter().map(|rule| rule.name.clone()).collect()
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Tokens of the grammar text as written.
    pub fn tokens(&self) -> &Rc<[Token]> {
        &self.tokens
    }
}

impl Rule {
    pub fn new(index: usize, ast: Ast, tokens: Rc<[Token]>) -> Self {
        let name = match ast.kind(ast.root()) {
            NodeKind::Rule { name, .. } => name.clone(),
            _ => String::new(),
        };
        let mut rule = Rule {
            name,
            index,
            ast,
            tokens,
            num_alts: 0,
            recursion: None,
        };
        rule.num_alts = rule.alts().len();
        rule
    }

    /// The block holding the rule's alternatives.
    pub fn block(&self) -> Option<NodeId> {
        self.ast
            .first_child_where(self.ast.root(), |kind| *kind == NodeKind::Block)
    }

    pub fn alts(&self) -> Vec<NodeId> {
        self.block()
            .map_or(vec![], |block| self.ast.children(block).to_vec())
    }

    /// The alternative with the given one-indexed number.
    pub fn alt(&self, alt_num: usize) -> Option<NodeId> {
        let block = self.block()?;
        alt_num
            .checked_sub(1)
            .and_then(|index| self.ast.child(block, index))
    }

    pub fn args(&self) -> Option<&str> {
        match self.ast.kind(self.ast.root()) {
            NodeKind::Rule { args, .. } => args.as_deref(),
            _ => None,
        }
    }

    pub fn returns(&self) -> Option<&str> {
        match self.ast.kind(self.ast.root()) {
            NodeKind::Rule { returns, .. } => returns.as_deref(),
            _ => None,
        }
    }

    /// The token naming this rule.
    pub fn name_token(&self) -> Option<&Token> {
        self.ast
            .node(self.ast.root())
            .token
            .and_then(|index| self.tokens.get(index))
    }

    pub fn is_left_recursive(&self) -> bool {
        self.recursion.is_some()
    }

    /// Installs a new syntax tree, e.g. after rewriting.
    pub fn replace_ast(&mut self, ast: Ast, tokens: Rc<[Token]>) {
        self.ast = ast;
        self.tokens = tokens;
        self.num_alts = self.alts().len();
    }

    /// Number of alternatives as written, before any rewriting.
    pub fn original_number_of_alts(&self) -> usize {
        match &self.recursion {
            Some(recursion) => recursion.original_number_of_alts(),
            None => self.num_alts,
        }
    }

    /// Maps alt labels to the alternatives that carry them.
    pub fn alt_labels(&self) -> BTreeMap<String, Vec<usize>> {
        if let Some(recursion) = &self.recursion {
            return recursion.alt_labels();
        }
        let mut labels: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (i, alt) in self.alts().into_iter().enumerate() {
            if let NodeKind::Alt { label: Some(label) } = self.ast.kind(alt) {
                labels.entry(label.clone()).or_default().push(i + 1);
            }
        }
        labels
    }

    /// Line and column of the token a node was created from. Nodes of a rewritten rule
    /// report the position in the grammar as written.
    pub fn token_position(&self, node: NodeId) -> Option<(u32, u32)> {
        let node = self.ast.node(node);
        let token = match (&self.recursion, node.original_token) {
            (Some(recursion), Some(original)) => recursion.original_tokens.get(original),
            _ => node.token.and_then(|index| self.tokens.get(index)),
        };
        token.map(|token| (token.line, token.col))
    }
}

impl LeftRecursion {
    /// Logical alternative numbers of the primary block, one per physical alternative.
    pub fn primary_alts(&self) -> Vec<usize> {
        self.primary_alts.iter().map(|info| info.alt_num).collect()
    }

    /// Logical alternative numbers of the operator block, one per physical alternative.
    pub fn recursive_op_alts(&self) -> Vec<usize> {
        self.op_alts.iter().map(|info| info.alt_num).collect()
    }

    pub fn original_number_of_alts(&self) -> usize {
        self.primary_alts.len() + self.op_alts.len()
    }

    /// Alt labels of the original alternatives, with the alternative numbers carrying them.
    pub fn alt_labels(&self) -> BTreeMap<String, Vec<usize>> {
        let mut labels: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for info in self.primary_alts.iter().chain(&self.op_alts) {
            if let Some(label) = &info.alt_label {
                labels.entry(label.clone()).or_default().push(info.alt_num);
            }
        }
        for alts in labels.values_mut() {
            alts.sort_unstable();
        }
        labels
    }

    /// Original alternatives without an alt label.
    pub fn unlabeled_alts(&self) -> Vec<&Ast> {
        self.primary_alts
            .iter()
            .chain(&self.op_alts)
            .filter(|info| info.alt_label.is_none())
            .map(|info| &info.original_alt)
            .collect()
    }
}
