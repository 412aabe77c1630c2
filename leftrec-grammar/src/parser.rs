//! Recursive descent parser for the grammar notation.
//!
//! Node spans are absolute token ranges, so hidden tokens between the first and the last token
//! of a node belong to it.

use crate::LoadError;
use crate::ast::{Ast, EbnfKind, ElementOption, Node, NodeId, NodeKind};
use crate::token::{Token, TokenKind};

pub(crate) struct Parser<'t> {
    tokens: &'t [Token],
    visible: Vec<usize>,
    pos: usize,
    last: usize,
}

impl<'t> Parser<'t> {
    pub(crate) fn new(tokens: &'t [Token]) -> Self {
        let visible = tokens
            .iter()
            .filter(|token| !token.kind.is_hidden())
            .map(|token| token.index)
            .collect();
        Parser {
            tokens,
            visible,
            pos: 0,
            last: 0,
        }
    }

    /// Parses `('grammar' ID ';')? rule*`.
    pub(crate) fn grammar(&mut self) -> Result<(Option<String>, Vec<Ast>), LoadError> {
        let mut name = None;
        if self.peek_kind() == Some(TokenKind::Grammar) {
            self.bump();
            let id = self.expect_one_of(&[TokenKind::TokenRef, TokenKind::RuleRef], "grammar name")?;
            name = Some(self.tokens[id].text.clone());
            self.expect(TokenKind::Semi, "';'")?;
        }
        let mut rules = vec![];
        while !self.at_end() {
            rules.push(self.rule()?);
        }
        Ok((name, rules))
    }

    /// Parses a single rule that must span the entire input.
    pub(crate) fn single_rule(&mut self) -> Result<Ast, LoadError> {
        let ast = self.rule()?;
        if !self.at_end() {
            return Err(self.error("extra input after rule"));
        }
        Ok(ast)
    }

    fn rule(&mut self) -> Result<Ast, LoadError> {
        let name_token = self.expect(TokenKind::RuleRef, "rule name")?;
        let args = if self.peek_kind() == Some(TokenKind::ArgAction) {
            let token = self.bump();
            Some(self.tokens[token].inner_text().to_string())
        } else {
            None
        };
        let returns = if self.peek_kind() == Some(TokenKind::Returns) {
            self.bump();
            let token = self.expect(TokenKind::ArgAction, "return values")?;
            Some(self.tokens[token].inner_text().to_string())
        } else {
            None
        };
        self.expect(TokenKind::Colon, "':'")?;
        let mut ast = Ast::new();
        let root = ast.add(Node::new(
            NodeKind::Rule {
                name: self.tokens[name_token].text.clone(),
                args,
                returns,
            },
            name_token..name_token + 1,
            Some(name_token),
        ));
        let block = self.block(&mut ast)?;
        ast.add_child(root, block);
        let semi = self.expect(TokenKind::Semi, "';'")?;
        ast.node_mut(root).span.end = semi + 1;
        Ok(ast)
    }

    /// Parses alternatives up to `)` or `;`, which is left unconsumed.
    fn block(&mut self, ast: &mut Ast) -> Result<NodeId, LoadError> {
        let start = self.current_index();
        let block = ast.add(Node::new(NodeKind::Block, start..start, None));
        loop {
            let alt = self.alt(ast)?;
            ast.add_child(block, alt);
            if self.peek_kind() == Some(TokenKind::Or) {
                self.bump();
            } else {
                break;
            }
        }
        let end = ast
            .children(block)
            .last()
            .map_or(start, |&alt| ast.node(alt).span.end);
        ast.node_mut(block).span = start..end;
        Ok(block)
    }

    fn alt(&mut self, ast: &mut Ast) -> Result<NodeId, LoadError> {
        let start = self.current_index();
        let alt = ast.add(Node::new(NodeKind::Alt { label: None }, start..start, None));
        let mut end = start;
        if self.peek_kind() == Some(TokenKind::Lt) {
            end = self.options(ast, alt)?;
        }
        while let Some(kind) = self.peek_kind() {
            match kind {
                TokenKind::Or | TokenKind::RParen | TokenKind::Semi | TokenKind::Pound => break,
                _ => {
                    let element = self.element(ast)?;
                    ast.add_child(alt, element);
                    end = self.last + 1;
                }
            }
        }
        if self.peek_kind() == Some(TokenKind::Pound) {
            self.bump();
            let label = self.expect_one_of(&[TokenKind::RuleRef, TokenKind::TokenRef], "alt label")?;
            let text = self.tokens[label].text.clone();
            ast.node_mut(alt).kind = NodeKind::Alt { label: Some(text) };
            end = label + 1;
        }
        if ast.children(alt).is_empty() {
            let epsilon = ast.add(Node::new(NodeKind::Epsilon, end..end, None));
            ast.add_child(alt, epsilon);
        }
        ast.node_mut(alt).span = start..end;
        Ok(alt)
    }

    fn element(&mut self, ast: &mut Ast) -> Result<NodeId, LoadError> {
        let node = match self.peek_kind() {
            Some(TokenKind::RuleRef | TokenKind::TokenRef)
                if matches!(
                    self.peek_kind_nth(1),
                    Some(TokenKind::Assign | TokenKind::PlusAssign)
                ) =>
            {
                let label = self.bump();
                let op = self.bump();
                let assign = ast.add(Node::new(
                    NodeKind::Assign {
                        label: self.tokens[label].text.clone(),
                        plus: self.tokens[op].kind == TokenKind::PlusAssign,
                    },
                    label..op + 1,
                    Some(op),
                ));
                let atom = self.atom(ast)?;
                ast.add_child(assign, atom);
                ast.node_mut(assign).span.end = ast.node(atom).span.end;
                assign
            }
            Some(TokenKind::Action) => {
                let token = self.bump();
                let text = self.tokens[token].inner_text().to_string();
                return Ok(ast.add(Node::new(
                    NodeKind::Action { text },
                    token..token + 1,
                    Some(token),
                )));
            }
            Some(TokenKind::Sempred) => {
                let token = self.bump();
                let text = self.tokens[token].inner_text().to_string();
                let pred = ast.add(Node::new(
                    NodeKind::Sempred { text },
                    token..token + 1,
                    Some(token),
                ));
                if self.peek_kind() == Some(TokenKind::Lt) {
                    self.options(ast, pred)?;
                }
                return Ok(pred);
            }
            _ => self.atom(ast)?,
        };
        let ebnf_kind = match self.peek_kind() {
            Some(TokenKind::Question) => EbnfKind::Optional,
            Some(TokenKind::Star) => EbnfKind::Star,
            Some(TokenKind::Plus) => EbnfKind::Plus,
            _ => return Ok(node),
        };
        let suffix = self.bump();
        let span = ast.node(node).span.clone();
        let block = if *ast.kind(node) == NodeKind::Block {
            node
        } else {
            let block = ast.add(Node::new(NodeKind::Block, span.clone(), None));
            let alt = ast.add(Node::new(NodeKind::Alt { label: None }, span.clone(), None));
            ast.add_child(alt, node);
            ast.add_child(block, alt);
            block
        };
        let ebnf = ast.add(Node::new(
            NodeKind::Ebnf(ebnf_kind),
            span.start..suffix + 1,
            Some(suffix),
        ));
        ast.add_child(ebnf, block);
        Ok(ebnf)
    }

    fn atom(&mut self, ast: &mut Ast) -> Result<NodeId, LoadError> {
        let node = match self.peek_kind() {
            Some(TokenKind::RuleRef) => {
                let token = self.bump();
                let mut end = token + 1;
                let args = if self.peek_kind() == Some(TokenKind::ArgAction) {
                    let args = self.bump();
                    end = args + 1;
                    Some(self.tokens[args].inner_text().to_string())
                } else {
                    None
                };
                ast.add(Node::new(
                    NodeKind::RuleRef {
                        name: self.tokens[token].text.clone(),
                        args,
                    },
                    token..end,
                    Some(token),
                ))
            }
            Some(TokenKind::TokenRef) => {
                let token = self.bump();
                ast.add(Node::new(
                    NodeKind::TokenRef {
                        name: self.tokens[token].text.clone(),
                    },
                    token..token + 1,
                    Some(token),
                ))
            }
            Some(TokenKind::StringLiteral) => {
                let token = self.bump();
                ast.add(Node::new(
                    NodeKind::StringLiteral {
                        text: self.tokens[token].text.clone(),
                    },
                    token..token + 1,
                    Some(token),
                ))
            }
            Some(TokenKind::LParen) => {
                let open = self.bump();
                let block = self.block(ast)?;
                let close = self.expect(TokenKind::RParen, "')'")?;
                let node = ast.node_mut(block);
                node.span = open..close + 1;
                node.token = Some(open);
                return Ok(block);
            }
            _ => return Err(self.error("expected a grammar element")),
        };
        if self.peek_kind() == Some(TokenKind::Lt) {
            self.options(ast, node)?;
        }
        Ok(node)
    }

    /// Parses `<key=value, ...>` onto `node`. Returns the end of the option block.
    fn options(&mut self, ast: &mut Ast, node: NodeId) -> Result<usize, LoadError> {
        let lt = self.expect(TokenKind::Lt, "'<'")?;
        let mut options = vec![];
        loop {
            let key = self.expect_one_of(&[TokenKind::RuleRef, TokenKind::TokenRef], "option name")?;
            self.expect(TokenKind::Assign, "'='")?;
            let value = self.expect_one_of(
                &[
                    TokenKind::RuleRef,
                    TokenKind::TokenRef,
                    TokenKind::Int,
                    TokenKind::StringLiteral,
                ],
                "option value",
            )?;
            options.push(ElementOption {
                key: self.tokens[key].text.clone(),
                value: self.tokens[value].text.clone(),
                token: Some(value),
            });
            if self.peek_kind() == Some(TokenKind::Comma) {
                self.bump();
            } else {
                break;
            }
        }
        let gt = self.expect(TokenKind::Gt, "'>'")?;
        let node = ast.node_mut(node);
        node.options.extend(options);
        node.options_span = Some(lt..gt + 1);
        node.span.start = node.span.start.min(lt);
        node.span.end = node.span.end.max(gt + 1);
        Ok(gt + 1)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.visible.len()
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek_kind_nth(0)
    }

    fn peek_kind_nth(&self, n: usize) -> Option<TokenKind> {
        self.visible
            .get(self.pos + n)
            .map(|&index| self.tokens[index].kind)
    }

    /// Absolute index of the next visible token, or the end of input.
    fn current_index(&self) -> usize {
        self.visible
            .get(self.pos)
            .copied()
            .unwrap_or(self.tokens.len())
    }

    fn bump(&mut self) -> usize {
        let index = self.current_index();
        self.pos += 1;
        self.last = index;
        index
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<usize, LoadError> {
        self.expect_one_of(&[kind], what)
    }

    fn expect_one_of(&mut self, kinds: &[TokenKind], what: &str) -> Result<usize, LoadError> {
        match self.peek_kind() {
            Some(kind) if kinds.contains(&kind) => Ok(self.bump()),
            _ => Err(self.error(&format!("expected {}", what))),
        }
    }

    fn error(&self, reason: &str) -> LoadError {
        let token = self
            .visible
            .get(self.pos)
            .or(self.visible.last())
            .map(|&index| &self.tokens[index]);
        LoadError {
            reason: reason.to_string(),
            line: token.map_or(1, |token| token.line),
            col: token.map_or(1, |token| token.col),
            token: token.cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse(text: &str) -> (Vec<Token>, Vec<Ast>) {
        let tokens = Lexer::tokenize(text).unwrap();
        let (_, rules) = Parser::new(&tokens).grammar().unwrap();
        (tokens, rules)
    }

    fn tree(text: &str) -> String {
        let (_, rules) = parse(text);
        rules[0].to_string_tree(rules[0].root())
    }

    #[test]
    fn test_binary_rule_tree() {
        assert_eq!(
            tree("e : e '*' e # Mul | INT ;"),
            "(RULE e (BLOCK (ALT e '*' e) (ALT INT)))"
        );
    }

    #[test]
    fn test_labels_and_suffixes() {
        assert_eq!(
            tree("s : x=a ys+=b* (c | D)? ;"),
            "(RULE s (BLOCK (ALT (= x a) (* (BLOCK (ALT (+= ys b)))) (? (BLOCK (ALT c) (ALT D))))))"
        );
    }

    #[test]
    fn test_options_and_predicates() {
        assert_eq!(
            tree("e : <assoc=right> e '^' e | {precpred(_ctx, 2)}?<p=2> e<p=3> | ;"),
            "(RULE e (BLOCK (ALT<assoc=right> e '^' e) (ALT {precpred(_ctx, 2)}?<p=2> e<p=3>) (ALT EPSILON)))"
        );
    }

    #[test]
    fn test_alt_spans_include_label() {
        let (tokens, rules) = parse("e : e '*' e # Mul | INT ;");
        let ast = &rules[0];
        let block = ast.child(ast.root(), 0).unwrap();
        let first = ast.child(block, 0).unwrap();
        assert_eq!(ast.source_text(first, &tokens), "e '*' e # Mul");
        assert_eq!(
            ast.kind(first),
            &NodeKind::Alt {
                label: Some("Mul".to_string())
            }
        );
    }

    #[test]
    fn test_rule_header() {
        let (_, rules) = parse("grammar T; e[int x] returns [int v] : INT ;");
        assert_eq!(
            rules[0].kind(rules[0].root()),
            &NodeKind::Rule {
                name: "e".to_string(),
                args: Some("int x".to_string()),
                returns: Some("int v".to_string()),
            }
        );
    }

    #[test]
    fn test_missing_semicolon() {
        let tokens = Lexer::tokenize("a : B\nb : C ;").unwrap();
        let error = Parser::new(&tokens).grammar().unwrap_err();
        assert_eq!(error.line, 2);
    }
}
