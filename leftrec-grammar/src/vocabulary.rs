//! Token types of a grammar.

use std::collections::HashMap;

use crate::ast::{Ast, NodeKind};

/// A token type. [`EOF`] is always zero.
pub type TokenType = usize;

/// The end-of-file token type.
pub const EOF: TokenType = 0;

/// Assigns token types to token names and literals in order of first appearance.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vocabulary {
    display_names: Vec<String>,
    names: HashMap<String, TokenType>,
    literals: HashMap<String, TokenType>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::new()
    }
}

impl Vocabulary {
    pub fn new() -> Self {
        let mut names = HashMap::new();
        names.insert("EOF".to_string(), EOF);
        Vocabulary {
            display_names: vec!["EOF".to_string()],
            names,
            literals: HashMap::new(),
        }
    }

    /// Collects the token references and literals of the given rule trees.
    pub fn from_rules<'a>(rules: impl IntoIterator<Item = &'a Ast>) -> Self {
        let mut vocabulary = Self::new();
        for ast in rules {
            for id in ast.preorder(ast.root()) {
                match ast.kind(id) {
                    NodeKind::TokenRef { name } => {
                        vocabulary.define_token(name);
                    }
                    NodeKind::StringLiteral { text } => {
                        vocabulary.define_literal(text);
                    }
                    _ => {}
                }
            }
        }
        vocabulary
    }

    pub fn define_token(&mut self, name: &str) -> TokenType {
        if let Some(&ttype) = self.names.get(name) {
            return ttype;
        }
        let ttype = self.display_names.len();
        self.display_names.push(name.to_string());
        self.names.insert(name.to_string(), ttype);
        ttype
    }

    /// Defines a quoted literal such as `'+'`.
    pub fn define_literal(&mut self, quoted: &str) -> TokenType {
        let key = unquote(quoted);
        if let Some(&ttype) = self.literals.get(&key) {
            return ttype;
        }
        let ttype = self.display_names.len();
        self.display_names.push(quoted.to_string());
        self.literals.insert(key, ttype);
        ttype
    }

    /// Looks up a token name.
    pub fn token_type(&self, name: &str) -> Option<TokenType> {
        self.names.get(name).copied()
    }

    /// Looks up a literal, given either quoted (`'+'`) or bare (`+`).
    pub fn literal_type(&self, text: &str) -> Option<TokenType> {
        let key = if text.len() >= 2 && text.starts_with('\'') && text.ends_with('\'') {
            unquote(text)
        } else {
            text.to_string()
        };
        self.literals.get(&key).copied()
    }

    pub fn display_name(&self, ttype: TokenType) -> &str {
        self.display_names
            .get(ttype)
            .map_or("<INVALID>", |name| &name[..])
    }

    pub fn max_token_type(&self) -> TokenType {
        self.display_names.len() - 1
    }
}

fn unquote(quoted: &str) -> String {
    let inner = if quoted.len() >= 2 {
        &quoted[1..quoted.len() - 1]
    } else {
        quoted
    };
    let mut result = String::new();
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('t') => result.push('\t'),
                Some(other) => result.push(other),
                None => {}
            }
        } else {
            result.push(ch);
        }
    }
    result
}
