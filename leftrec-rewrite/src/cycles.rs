//! Detection of rules that are left-recursive through other rules.

use bit_matrix::BitMatrix;
use bit_vec::BitVec;
use leftrec_grammar::{Ast, EbnfKind, ErrorKind, Grammar, NodeId, NodeKind};
use log::debug;

use crate::tool::ToolContext;

/// Computes which rules can derive the empty string.
pub fn nullable_rules(grammar: &Grammar) -> BitVec {
    let mut nullable = BitVec::from_elem(grammar.num_rules(), false);
    let mut changed = true;
    while changed {
        changed = false;
        for (index, rule) in grammar.rules().iter().enumerate() {
            if !nullable[index] && is_nullable(grammar, &nullable, &rule.ast, rule.ast.root()) {
                nullable.set(index, true);
                changed = true;
            }
        }
    }
    nullable
}

fn is_nullable(grammar: &Grammar, nullable: &BitVec, ast: &Ast, id: NodeId) -> bool {
    match ast.kind(id) {
        NodeKind::Rule { .. } | NodeKind::Assign { .. } => ast
            .children(id)
            .iter()
            .all(|&child| is_nullable(grammar, nullable, ast, child)),
        NodeKind::Block => ast
            .children(id)
            .iter()
            .any(|&alt| is_nullable(grammar, nullable, ast, alt)),
        NodeKind::Alt { .. } => ast
            .children(id)
            .iter()
            .all(|&child| is_nullable(grammar, nullable, ast, child)),
        NodeKind::Ebnf(EbnfKind::Optional | EbnfKind::Star) => true,
        NodeKind::Ebnf(EbnfKind::Plus) => ast
            .children(id)
            .iter()
            .all(|&child| is_nullable(grammar, nullable, ast, child)),
        NodeKind::RuleRef { name, .. } => grammar
            .rule_index(name)
            .is_some_and(|index| nullable[index]),
        NodeKind::TokenRef { .. } | NodeKind::StringLiteral { .. } => false,
        NodeKind::Action { .. } | NodeKind::Sempred { .. } | NodeKind::Epsilon => true,
    }
}

/// Collects rules the element can start with. Returns whether the element is nullable, i.e.
/// whether the elements after it can start the sequence as well.
fn leading_rule_refs(
    grammar: &Grammar,
    nullable: &BitVec,
    ast: &Ast,
    id: NodeId,
    out: &mut Vec<usize>,
) -> bool {
    match ast.kind(id) {
        NodeKind::Alt { .. } | NodeKind::Assign { .. } | NodeKind::Ebnf(_) | NodeKind::Rule { .. } => {
            for &child in ast.children(id) {
                if !leading_rule_refs(grammar, nullable, ast, child, out) {
                    return matches!(
                        ast.kind(id),
                        NodeKind::Ebnf(EbnfKind::Optional | EbnfKind::Star)
                    );
                }
            }
            true
        }
        NodeKind::Block => {
            let mut any_nullable = false;
            for &alt in ast.children(id) {
                any_nullable |= leading_rule_refs(grammar, nullable, ast, alt, out);
            }
            any_nullable
        }
        NodeKind::RuleRef { name, .. } => match grammar.rule_index(name) {
            Some(index) => {
                out.push(index);
                nullable[index]
            }
            None => false,
        },
        _ => is_nullable(grammar, nullable, ast, id),
    }
}

/// Finds groups of rules that can reach each other without consuming input, and reports each
/// group once. Meant to run after direct left recursion was rewritten, so every reported group
/// is left recursion the rewriting can't remove.
pub fn detect_left_recursion_cycles(ctx: &mut ToolContext, grammar: &Grammar) -> Vec<Vec<String>> {
    let num_rules = grammar.num_rules();
    let nullable = nullable_rules(grammar);
    let mut begins_with = BitMatrix::new(num_rules, num_rules);
    for (index, rule) in grammar.rules().iter().enumerate() {
        let mut refs = vec![];
        leading_rule_refs(grammar, &nullable, &rule.ast, rule.ast.root(), &mut refs);
        for target in refs {
            begins_with.set(index, target, true);
        }
    }
    begins_with.transitive_closure();

    let mut reported = BitVec::from_elem(num_rules, false);
    let mut cycles = vec![];
    for index in 0..num_rules {
        if reported[index] || !begins_with[(index, index)] {
            continue;
        }
        let members: Vec<usize> = (index..num_rules)
            .filter(|&other| begins_with[(index, other)] && begins_with[(other, index)])
            .collect();
        for &member in &members {
            reported.set(member, true);
        }
        let names: Vec<String> = members
            .iter()
            .map(|&member| grammar.rule(member).name.clone())
            .collect();
        debug!("left recursion cycle: {:?}", names);
        let list = format!("[{}]", names.join(", "));
        ctx.errors.grammar_error(
            ErrorKind::LeftRecursionCycles,
            grammar.rule(index).name_token(),
            &[&list],
        );
        cycles.push(names);
    }
    cycles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::{ToolContext, ToolOptions};
    use crate::transformer::translate_left_recursive_rules;

    fn cycles(text: &str) -> (Vec<Vec<String>>, ToolContext) {
        let mut grammar = Grammar::load(text).unwrap();
        let mut ctx = ToolContext::new(ToolOptions::default()).unwrap();
        translate_left_recursive_rules(&mut ctx, &mut grammar);
        let cycles = detect_left_recursion_cycles(&mut ctx, &grammar);
        (cycles, ctx)
    }

    #[test]
    fn test_indirect_cycle() {
        let (cycles, ctx) = cycles("s : a ; a : b X | Y ; b : a Z ;");
        assert_eq!(cycles, vec![vec!["a".to_string(), "b".to_string()]]);
        assert_eq!(ctx.errors.diagnostics()[0].args, vec!["[a, b]"]);
    }

    #[test]
    fn test_cycle_through_nullable_prefix() {
        let (cycles, _) = cycles("a : n b ; b : {act} X? a | Y ; n : ;");
        assert_eq!(cycles, vec![vec!["a".to_string(), "b".to_string()]]);
    }

    #[test]
    fn test_rewritten_rules_are_no_cycles() {
        let (cycles, ctx) = cycles("s : e ';' ; e : e '*' e | '(' e ')' | INT ;");
        assert!(cycles.is_empty());
        assert_eq!(ctx.errors.num_errors(), 0);
    }

    #[test]
    fn test_nullable_rules() {
        let grammar = Grammar::load("a : b c ; b : X* ; c : {act} | Y ; d : X ;").unwrap();
        let nullable = nullable_rules(&grammar);
        assert_eq!(
            nullable.iter().collect::<Vec<_>>(),
            vec![true, true, true, false]
        );
    }
}
