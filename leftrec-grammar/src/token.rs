//! Tokens of the grammar notation.

/// The kind of a grammar token.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TokenKind {
    /// An identifier starting with a lower-case letter.
    RuleRef,
    /// An identifier starting with an upper-case letter.
    TokenRef,
    /// A quoted literal such as `'+'`.
    StringLiteral,
    /// An embedded action `{...}`.
    Action,
    /// A semantic predicate `{...}?`.
    Sempred,
    /// An argument action `[...]`.
    ArgAction,
    Colon,
    Semi,
    Or,
    LParen,
    RParen,
    Question,
    Star,
    Plus,
    Assign,
    PlusAssign,
    Lt,
    Gt,
    Comma,
    /// Alt label marker, either `#` or `=>`.
    Pound,
    /// The `returns` keyword.
    Returns,
    /// The `grammar` keyword.
    Grammar,
    Int,
    Whitespace,
    Comment,
}

impl TokenKind {
    /// Hidden tokens are kept in the token vector, but skipped by the parser.
    pub fn is_hidden(self) -> bool {
        matches!(self, TokenKind::Whitespace | TokenKind::Comment)
    }
}

/// A grammar token with its verbatim source text.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// Absolute position in the token vector, hidden tokens included.
    pub index: usize,
    /// One-indexed.
    pub line: u32,
    /// One-indexed.
    pub col: u32,
}

impl Token {
    /// Returns the text without its delimiters. For actions and argument actions these are
    /// the brackets, for predicates `{` and `}?`, for literals the quotes.
    pub fn inner_text(&self) -> &str {
        let text = &self.text[..];
        match self.kind {
            TokenKind::Action | TokenKind::ArgAction | TokenKind::StringLiteral => {
                if text.len() >= 2 {
                    &text[1..text.len() - 1]
                } else {
                    text
                }
            }
            TokenKind::Sempred => {
                if text.len() >= 3 {
                    &text[1..text.len() - 2]
                } else {
                    text
                }
            }
            _ => text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(kind: TokenKind, text: &str) -> Token {
        Token {
            kind,
            text: text.to_string(),
            index: 0,
            line: 1,
            col: 1,
        }
    }

    #[test]
    fn test_inner_text() {
        assert_eq!(token(TokenKind::Sempred, "{x > 1}?").inner_text(), "x > 1");
        assert_eq!(token(TokenKind::ArgAction, "[int v]").inner_text(), "int v");
        assert_eq!(token(TokenKind::StringLiteral, "'+'").inner_text(), "+");
        assert_eq!(token(TokenKind::RuleRef, "expr").inner_text(), "expr");
    }
}
