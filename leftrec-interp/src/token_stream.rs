//! Typed input tokens.

use std::fmt;
use std::rc::Rc;

use leftrec_grammar::{EOF, TokenType, Vocabulary};

/// A token of the input being parsed.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InputToken {
    pub ttype: TokenType,
    pub text: String,
    /// Position in the token buffer.
    pub index: usize,
}

/// A word that maps to no token type.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UnknownWord(pub String);

impl fmt::Display for UnknownWord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "no token type for word {:?}", self.0)
    }
}

impl std::error::Error for UnknownWord {}

/// A token buffer ending with EOF, and a cursor into it.
///
/// Clones made with [`TokenStream::shared`] read the same buffer with a cursor of their own.
#[derive(Clone, Debug)]
pub struct TokenStream {
    tokens: Rc<[InputToken]>,
    types: Rc<[TokenType]>,
    index: usize,
}

impl TokenStream {
    /// Appends an EOF token unless the tokens already end with one, and renumbers them.
    pub fn new(tokens: impl IntoIterator<Item = (TokenType, String)>) -> Self {
        let mut tokens: Vec<InputToken> = tokens
            .into_iter()
            .enumerate()
            .map(|(index, (ttype, text))| InputToken { ttype, text, index })
            .collect();
        if tokens.last().is_none_or(|token| token.ttype != EOF) {
            tokens.push(InputToken {
                ttype: EOF,
                text: "<EOF>".to_string(),
                index: tokens.len(),
            });
        }
        let types: Vec<TokenType> = tokens.iter().map(|token| token.ttype).collect();
        TokenStream {
            tokens: tokens.into(),
            types: types.into(),
            index: 0,
        }
    }

    /// Splits the text at whitespace. A word is a literal of the grammar if there is one,
    /// otherwise `INT` if it is all digits, otherwise `ID`.
    pub fn from_words(vocabulary: &Vocabulary, text: &str) -> Result<Self, UnknownWord> {
        let mut tokens = vec![];
        for word in text.split_whitespace() {
            let ttype = vocabulary
                .literal_type(word)
                .or_else(|| {
                    if word.chars().all(|ch| ch.is_ascii_digit()) {
                        vocabulary.token_type("INT")
                    } else {
                        None
                    }
                })
                .or_else(|| vocabulary.token_type("ID"))
                .ok_or_else(|| UnknownWord(word.to_string()))?;
            tokens.push((ttype, word.to_string()));
        }
        Ok(Self::new(tokens))
    }

    /// A stream over the same buffer, positioned at the start.
    pub fn shared(&self) -> Self {
        TokenStream {
            tokens: self.tokens.clone(),
            types: self.types.clone(),
            index: 0,
        }
    }

    /// Whether both streams read the same buffer.
    pub fn shares_buffer_with(&self, other: &TokenStream) -> bool {
        Rc::ptr_eq(&self.tokens, &other.tokens)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn size(&self) -> usize {
        self.tokens.len()
    }

    pub fn get(&self, index: usize) -> Option<&InputToken> {
        self.tokens.get(index)
    }

    /// Token types of the whole buffer.
    pub fn types(&self) -> &[TokenType] {
        &self.types
    }

    /// Type of the `i`-th token ahead, one-indexed. Past the end, this is EOF.
    pub fn la(&self, i: usize) -> TokenType {
        self.lt(i).map_or(EOF, |token| token.ttype)
    }

    /// The `i`-th token ahead, one-indexed. Past the end, this is the EOF token.
    pub fn lt(&self, i: usize) -> Option<&InputToken> {
        let index = (self.index + i.saturating_sub(1)).min(self.tokens.len().saturating_sub(1));
        self.tokens.get(index)
    }

    /// The last token consumed.
    pub fn lt_back(&self) -> Option<&InputToken> {
        self.index
            .checked_sub(1)
            .and_then(|index| self.tokens.get(index))
    }

    /// Moves past the current token. The cursor never moves past EOF.
    pub fn consume(&mut self) {
        if self.la(1) != EOF {
            self.index += 1;
        }
    }

    pub fn seek(&mut self, index: usize) {
        self.index = index.min(self.tokens.len().saturating_sub(1));
    }

    pub fn reset(&mut self) {
        self.seek(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leftrec_grammar::Grammar;

    #[test]
    fn test_from_words() {
        let grammar = Grammar::load("e : e '+' e | INT | ID ;").unwrap();
        let vocabulary = grammar.vocabulary();
        let stream = TokenStream::from_words(vocabulary, "x + 12").unwrap();
        let types: Vec<&str> = stream
            .types()
            .iter()
            .map(|&ttype| vocabulary.display_name(ttype))
            .collect();
        assert_eq!(types, vec!["ID", "'+'", "INT", "EOF"]);
        assert_eq!(stream.get(3).unwrap().text, "<EOF>");
    }

    #[test]
    fn test_unknown_word() {
        let grammar = Grammar::load("s : 'a' ;").unwrap();
        assert_eq!(
            TokenStream::from_words(grammar.vocabulary(), "a b").unwrap_err(),
            UnknownWord("b".to_string())
        );
    }

    #[test]
    fn test_cursor_stops_at_eof() {
        let mut stream = TokenStream::new(vec![(1, "a".to_string())]);
        assert_eq!(stream.lt_back(), None);
        stream.consume();
        stream.consume();
        assert_eq!(stream.index(), 1);
        assert_eq!(stream.la(1), EOF);
        assert_eq!(stream.la(5), EOF);
        assert_eq!(stream.lt_back().unwrap().text, "a");
        let shared = stream.shared();
        assert_eq!(shared.index(), 0);
        assert!(shared.shares_buffer_with(&stream));
    }
}
