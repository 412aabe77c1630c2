//! Splits grammar text into tokens. Whitespace and comments are kept as hidden tokens, so
//! any token range can be turned back into its source text.

use std::str::Chars;

use crate::LoadError;
use crate::token::{Token, TokenKind};

pub(crate) struct Lexer<'a> {
    chars: Chars<'a>,
    line_no: u32,
    col_no: u32,
}

impl<'a> Lexer<'a> {
    pub(crate) fn tokenize(text: &'a str) -> Result<Vec<Token>, LoadError> {
        let mut lexer = Lexer {
            chars: text.chars(),
            line_no: 1,
            col_no: 1,
        };
        let mut result = vec![];
        loop {
            let (line, col) = (lexer.line_no, lexer.col_no);
            let rest = lexer.chars.as_str();
            let kind = match lexer.eat_token() {
                Some(Ok(kind)) => kind,
                Some(Err(reason)) => {
                    return Err(LoadError {
                        reason,
                        line,
                        col,
                        token: None,
                    });
                }
                None => break,
            };
            let text = rest[..rest.len() - lexer.chars.as_str().len()].to_string();
            result.push(Token {
                kind,
                text,
                index: result.len(),
                line,
                col,
            });
        }
        Ok(result)
    }

    fn eat_token(&mut self) -> Option<Result<TokenKind, String>> {
        self.peek().map(|ch| self.eat(ch))
    }

    fn eat(&mut self, ch: char) -> Result<TokenKind, String> {
        let kind = match ch {
            'a'..='z' | 'A'..='Z' | '_' => {
                let substring = self.chars.as_str();
                while let Some('a'..='z' | 'A'..='Z' | '_' | '0'..='9') = self.peek() {
                    self.advance();
                }
                let ident = &substring[..substring.len() - self.chars.as_str().len()];
                match ident {
                    "returns" => TokenKind::Returns,
                    "grammar" => TokenKind::Grammar,
                    _ if ch.is_ascii_uppercase() => TokenKind::TokenRef,
                    _ => TokenKind::RuleRef,
                }
            }
            '0'..='9' => {
                while let Some('0'..='9') = self.peek() {
                    self.advance();
                }
                TokenKind::Int
            }
            ' ' | '\n' | '\t' | '\r' => {
                while let Some(' ' | '\n' | '\t' | '\r') = self.peek() {
                    self.advance();
                }
                TokenKind::Whitespace
            }
            '/' => {
                self.advance();
                match self.peek() {
                    Some('/') => {
                        while self.peek().is_some_and(|ch| ch != '\n') {
                            self.advance();
                        }
                    }
                    Some('*') => {
                        self.advance();
                        loop {
                            if self.chars.as_str().starts_with("*/") {
                                self.advance();
                                self.advance();
                                break;
                            }
                            if self.peek().is_none() {
                                return Err("unterminated comment".to_string());
                            }
                            self.advance();
                        }
                    }
                    _ => return Err("unexpected character '/'".to_string()),
                }
                TokenKind::Comment
            }
            '\'' => {
                self.advance();
                loop {
                    match self.peek() {
                        None | Some('\n') => return Err("unterminated string literal".to_string()),
                        Some('\\') => {
                            self.advance();
                            self.advance();
                        }
                        Some('\'') => {
                            self.advance();
                            break;
                        }
                        Some(_) => self.advance(),
                    }
                }
                TokenKind::StringLiteral
            }
            '{' => {
                self.eat_nested('{', '}')?;
                if self.peek() == Some('?') {
                    self.advance();
                    TokenKind::Sempred
                } else {
                    TokenKind::Action
                }
            }
            '[' => {
                self.eat_nested('[', ']')?;
                TokenKind::ArgAction
            }
            '=' => {
                self.advance();
                if self.peek() == Some('>') {
                    self.advance();
                    TokenKind::Pound
                } else {
                    TokenKind::Assign
                }
            }
            '+' => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                    TokenKind::PlusAssign
                } else {
                    TokenKind::Plus
                }
            }
            _ => {
                let kind = match ch {
                    ':' => TokenKind::Colon,
                    ';' => TokenKind::Semi,
                    '|' => TokenKind::Or,
                    '(' => TokenKind::LParen,
                    ')' => TokenKind::RParen,
                    '?' => TokenKind::Question,
                    '*' => TokenKind::Star,
                    '<' => TokenKind::Lt,
                    '>' => TokenKind::Gt,
                    ',' => TokenKind::Comma,
                    '#' => TokenKind::Pound,
                    other => return Err(format!("unexpected character {:?}", other)),
                };
                self.advance();
                kind
            }
        };
        Ok(kind)
    }

    /// Consumes a bracketed chunk, honoring nesting, quotes and escapes.
    fn eat_nested(&mut self, open: char, close: char) -> Result<(), String> {
        let mut depth = 0usize;
        loop {
            match self.peek() {
                None => return Err(format!("unterminated {}...{}", open, close)),
                Some('\\') => {
                    self.advance();
                    self.advance();
                }
                Some(quote @ ('"' | '\'')) => {
                    self.advance();
                    while let Some(ch) = self.peek() {
                        self.advance();
                        if ch == '\\' {
                            self.advance();
                        } else if ch == quote {
                            break;
                        }
                    }
                }
                Some(ch) => {
                    self.advance();
                    if ch == open {
                        depth += 1;
                    } else if ch == close {
                        depth -= 1;
                        if depth == 0 {
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    fn advance(&mut self) {
        match self.chars.next() {
            Some('\n') => {
                self.line_no += 1;
                self.col_no = 1;
            }
            Some(_) => {
                self.col_no += 1;
            }
            None => {}
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.as_str().chars().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;
    use TokenKind::*;

    fn kinds(text: &str) -> Vec<TokenKind> {
        Lexer::tokenize(text)
            .unwrap()
            .into_iter()
            .map(|token| token.kind)
            .filter(|kind| !kind.is_hidden())
            .collect()
    }

    #[test]
    fn test_rule_tokens() {
        assert_eq!(
            kinds("e : e '*' e # Mul | INT ;"),
            vec![RuleRef, Colon, RuleRef, StringLiteral, RuleRef, Pound, TokenRef, Or, TokenRef, Semi]
        );
    }

    #[test]
    fn test_actions_and_options() {
        assert_eq!(
            kinds("{precpred(_ctx, 3)}?<p=3> x+=e[1] {$v = 1;}"),
            vec![Sempred, Lt, RuleRef, Assign, Int, Gt, RuleRef, PlusAssign, RuleRef, ArgAction, Action]
        );
    }

    #[test_case("a => Foo", &[RuleRef, Pound, TokenRef] ; "arrow label")]
    #[test_case("(a | B)*", &[LParen, RuleRef, Or, TokenRef, RParen, Star] ; "star block")]
    #[test_case("x? y+", &[RuleRef, Question, RuleRef, Plus] ; "suffixes")]
    #[test_case("grammar T ;", &[Grammar, TokenRef, Semi] ; "grammar header")]
    fn test_punctuation(text: &str, expected: &[TokenKind]) {
        assert_eq!(kinds(text), expected);
    }

    #[test]
    fn test_hidden_tokens_are_kept() {
        let tokens = Lexer::tokenize("a /* c */ b // d\n").unwrap();
        let text: String = tokens.iter().map(|token| &token.text[..]).collect();
        assert_eq!(text, "a /* c */ b // d\n");
        assert_eq!(tokens[2].kind, Comment);
        assert_eq!(tokens[4].index, 4);
    }

    #[test]
    fn test_error_position() {
        let error = Lexer::tokenize("a :\n  @").unwrap_err();
        assert_eq!((error.line, error.col), (2, 3));
    }
}
