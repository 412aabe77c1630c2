//! Precedence levels of rewritten alternatives.

use std::collections::BTreeMap;
use std::fmt;

use leftrec_grammar::{ErrorKind, ErrorManager, NodeId, Rule};

/// Operator associativity, declared with `<assoc=right>` on an alternative.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Associativity {
    #[default]
    Left,
    Right,
}

impl fmt::Display for Associativity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Associativity::Left => write!(f, "left"),
            Associativity::Right => write!(f, "right"),
        }
    }
}

/// An alternative was given two different associativities.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct AssocConflict {
    pub alt: usize,
}

/// Precedence of each alternative of one rule. The first alternative binds tightest.
#[derive(Clone, Debug)]
pub struct Precedence {
    num_alts: usize,
    assoc: BTreeMap<usize, Associativity>,
}

impl Precedence {
    pub fn new(num_alts: usize) -> Self {
        Precedence {
            num_alts,
            assoc: BTreeMap::new(),
        }
    }

    pub fn num_alts(&self) -> usize {
        self.num_alts
    }

    pub fn precedence(&self, alt: usize) -> usize {
        self.num_alts - alt + 1
    }

    /// Precedence the trailing self-reference of an alternative calls with.
    pub fn next_precedence(&self, alt: usize) -> usize {
        let p = self.precedence(alt);
        match self.associativity(alt) {
            Associativity::Right => p,
            Associativity::Left => p + 1,
        }
    }

    pub fn associativity(&self, alt: usize) -> Associativity {
        self.assoc.get(&alt).copied().unwrap_or_default()
    }

    /// Records the `assoc` option of the alternative node `alt_node`. An unknown value is
    /// reported against the option token and left associativity is used instead.
    pub fn set_alt_assoc(
        &mut self,
        errors: &mut ErrorManager,
        rule: &Rule,
        alt_node: NodeId,
        alt: usize,
    ) -> Result<(), AssocConflict> {
        let mut assoc = Associativity::Left;
        if let Some(option) = rule.ast.node(alt_node).option("assoc") {
            match &option.value[..] {
                "right" => assoc = Associativity::Right,
                "left" => {}
                value => {
                    let token = option.token.and_then(|index| rule.tokens.get(index));
                    errors.grammar_error(ErrorKind::IllegalOptionValue, token, &["assoc", value]);
                }
            }
        }
        if self.assoc.get(&alt).is_some_and(|&previous| previous != assoc) {
            let message = format!(
                "all operators of alt {} of left-recursive rule must have same associativity",
                alt
            );
            errors.tool_error(ErrorKind::InternalError, &[&message]);
            return Err(AssocConflict { alt });
        }
        self.assoc.insert(alt, assoc);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leftrec_grammar::Grammar;
    use test_case::test_case;

    #[test_case(1)]
    #[test_case(2)]
    #[test_case(7)]
    fn test_precedence_decreases(n: usize) {
        let precedence = Precedence::new(n);
        assert_eq!(precedence.precedence(1), n);
        assert_eq!(precedence.precedence(n), 1);
        for alt in 1..n {
            assert!(precedence.precedence(alt) > precedence.precedence(alt + 1));
        }
    }

    #[test]
    fn test_next_precedence() {
        let grammar = Grammar::load("e : e '*' e | <assoc=right> e '^' e | INT ;").unwrap();
        let rule = grammar.rule(0);
        let mut errors = ErrorManager::new("T.g4", false);
        let mut precedence = Precedence::new(rule.num_alts);
        for (i, alt) in rule.alts().into_iter().enumerate() {
            precedence.set_alt_assoc(&mut errors, rule, alt, i + 1).unwrap();
        }
        assert_eq!(precedence.next_precedence(1), precedence.precedence(1) + 1);
        assert_eq!(precedence.associativity(2), Associativity::Right);
        assert_eq!(precedence.next_precedence(2), precedence.precedence(2));
        assert_eq!(errors.num_errors(), 0);
    }

    #[test]
    fn test_illegal_assoc_falls_back_to_left() {
        let grammar = Grammar::load("e : <assoc=middle> e '^' e | INT ;").unwrap();
        let rule = grammar.rule(0);
        let mut errors = ErrorManager::new("T.g4", false);
        let mut precedence = Precedence::new(rule.num_alts);
        let alt = rule.alt(1).unwrap();
        precedence.set_alt_assoc(&mut errors, rule, alt, 1).unwrap();
        assert_eq!(precedence.associativity(1), Associativity::Left);
        let diagnostic = &errors.diagnostics()[0];
        assert_eq!(diagnostic.kind, ErrorKind::IllegalOptionValue);
        assert_eq!(diagnostic.location.as_ref().map(|l| (l.line, l.col)), Some((1, 12)));
    }

    #[test]
    fn test_conflicting_assoc() {
        let grammar = Grammar::load("e : e '*' e | <assoc=right> e '^' e | INT ;").unwrap();
        let rule = grammar.rule(0);
        let mut errors = ErrorManager::new("T.g4", false);
        let mut precedence = Precedence::new(rule.num_alts);
        precedence.set_alt_assoc(&mut errors, rule, rule.alt(1).unwrap(), 1).unwrap();
        let result = precedence.set_alt_assoc(&mut errors, rule, rule.alt(2).unwrap(), 1);
        assert_eq!(result, Err(AssocConflict { alt: 1 }));
        assert!(errors.has(ErrorKind::InternalError));
    }
}
