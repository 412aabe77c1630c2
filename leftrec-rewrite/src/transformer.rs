//! Replaces directly left-recursive rules of a grammar by their rewritten form.

use leftrec_grammar::{Ast, ErrorKind, Grammar, LeftRecursion, NodeKind, RecursiveAltInfo};
use log::debug;

use crate::analyzer::{LeftRecursiveRuleAnalyzer, PRECEDENCE_OPTION_NAME, TOKEN_INDEX_OPTION_NAME};
use crate::classify::has_immediate_recursive_rule_refs;
use crate::synthesize::artificial_op_prec_rule;
use crate::tool::ToolContext;

struct Rewrite {
    text: String,
    primary_alts: Vec<RecursiveAltInfo>,
    op_alts: Vec<RecursiveAltInfo>,
    left_recursive_rule_ref_labels: Vec<(String, Option<usize>)>,
}

/// Rewrites every rule that starts an alternative with a reference to itself. Returns the
/// names of the rewritten rules.
///
/// Afterwards, each reference to a rewritten rule that carries no precedence is given `p=0`,
/// so it accepts every operator.
pub fn translate_left_recursive_rules(ctx: &mut ToolContext, grammar: &mut Grammar) -> Vec<String> {
    let mut rewritten = vec![];
    for index in 0..grammar.num_rules() {
        if !has_immediate_recursive_rule_refs(grammar.rule(index)) {
            continue;
        }
        if translate_left_recursive_rule(ctx, grammar, index) {
            rewritten.push(grammar.rule(index).name.clone());
        }
    }
    for rule in grammar.rules_mut() {
        let refs = rule.ast.nodes_where(rule.ast.root(), |node| {
            node.rule_ref_name()
                .is_some_and(|name| rewritten.iter().any(|r| r == name))
                && node.option(PRECEDENCE_OPTION_NAME).is_none()
        });
        for id in refs {
            rule.ast.set_option(id, PRECEDENCE_OPTION_NAME, "0");
        }
    }
    rewritten
}

fn analyze(ctx: &mut ToolContext, grammar: &Grammar, index: usize) -> Option<Rewrite> {
    let rule = grammar.rule(index);
    let mut analyzer = LeftRecursiveRuleAnalyzer::new(rule);
    match analyzer.analyze(&mut ctx.errors) {
        Ok(true) => {}
        Ok(false) => {
            ctx.errors.grammar_error(
                ErrorKind::NonconformingLrRule,
                rule.name_token(),
                &[&rule.name],
            );
            return None;
        }
        Err(conflict) => {
            debug!("abandoned rule {}: conflict in alt {}", rule.name, conflict.alt);
            return None;
        }
    }
    let text = artificial_op_prec_rule(ctx, &analyzer)?;
    Some(Rewrite {
        text,
        primary_alts: analyzer.prefix_and_other_alts.clone(),
        op_alts: analyzer.op_alts().cloned().collect(),
        left_recursive_rule_ref_labels: analyzer.left_recursive_rule_ref_labels.clone(),
    })
}

fn translate_left_recursive_rule(ctx: &mut ToolContext, grammar: &mut Grammar, index: usize) -> bool {
    let rewrite = match analyze(ctx, grammar, index) {
        Some(rewrite) => rewrite,
        None => return false,
    };
    let rule = grammar.rule_mut(index);
    if rewrite.primary_alts.is_empty() {
        ctx.errors
            .grammar_error(ErrorKind::NoNonLrAlts, rule.name_token(), &[&rule.name]);
        return false;
    }
    let (mut ast, tokens) = match Grammar::parse_rule(&rewrite.text) {
        Ok(parsed) => parsed,
        Err(error) => {
            let message = format!(
                "error parsing rule created during left-recursion detection: {}: {}",
                rewrite.text, error
            );
            ctx.errors.tool_error(ErrorKind::InternalError, &[&message]);
            return false;
        }
    };
    augment_tokens_with_original_position(&mut ast);
    let root = ast.root();
    ast.node_mut(root).original_token = rule.ast.node(rule.ast.root()).token;

    let mut recursion = LeftRecursion {
        primary_alts: rewrite.primary_alts,
        op_alts: rewrite.op_alts,
        original_ast: rule.ast.clone(),
        original_tokens: rule.tokens.clone(),
        left_recursive_rule_ref_labels: rewrite.left_recursive_rule_ref_labels,
    };
    if !set_alt_ast_pointers(&ast, &mut recursion) {
        ctx.errors.tool_error(
            ErrorKind::InternalError,
            &[&format!("unexpected shape of rewritten rule {}", rule.name)],
        );
        return false;
    }
    rule.replace_ast(ast, tokens);
    rule.recursion = Some(recursion);
    true
}

/// Nodes built from text with `tokenIndex` options remember the token they came from.
fn augment_tokens_with_original_position(ast: &mut Ast) {
    for id in ast.preorder(ast.root()) {
        let original = ast
            .option(id, TOKEN_INDEX_OPTION_NAME)
            .and_then(|value| value.parse().ok());
        if original.is_some() {
            ast.node_mut(id).original_token = original;
        }
    }
}

/// Links each alt info to its alternative in the rewritten tree: primary alternatives sit in
/// the first block of the rule's only alternative, operator alternatives in the loop after it.
fn set_alt_ast_pointers(ast: &Ast, recursion: &mut LeftRecursion) -> bool {
    let main_alt = match ast.child(ast.root(), 0).and_then(|block| ast.child(block, 0)) {
        Some(alt) => alt,
        None => return false,
    };
    let primary_block = ast.child(main_alt, 0);
    let ops_block = ast.child(main_alt, 1).and_then(|ebnf| match ast.kind(ebnf) {
        NodeKind::Ebnf(_) => ast.child(ebnf, 0),
        _ => None,
    });
    let (primary_block, ops_block) = match (primary_block, ops_block) {
        (Some(primary), Some(ops)) => (primary, ops),
        _ => return false,
    };
    let primary = ast.children(primary_block);
    let ops = ast.children(ops_block);
    if primary.len() != recursion.primary_alts.len() || ops.len() != recursion.op_alts.len() {
        return false;
    }
    for (info, &alt) in recursion.primary_alts.iter_mut().zip(primary) {
        info.alt_node = Some(alt);
    }
    for (info, &alt) in recursion.op_alts.iter_mut().zip(ops) {
        info.alt_node = Some(alt);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::ToolOptions;
    use test_case::test_case;

    fn translate(text: &str) -> (Grammar, ToolContext, Vec<String>) {
        let mut grammar = Grammar::load(text).unwrap();
        let mut ctx = ToolContext::new(ToolOptions::default()).unwrap();
        let rewritten = translate_left_recursive_rules(&mut ctx, &mut grammar);
        (grammar, ctx, rewritten)
    }

    #[test_case("e : e '*' e | INT | e '+' e | ID ;", &[2, 4], &[1, 3] ; "interleaved")]
    #[test_case("e : INT | e '*' e | ID ;", &[1, 3], &[2] ; "primary first")]
    #[test_case("e : '--' e | e '*' e | e '+' e | e '--' | ID ;", &[1, 5], &[2, 3, 4] ; "prefix and suffix")]
    #[test_case("e : e '[' e ']' | e '?' e ':' e | e '+' e | ID ;", &[4], &[3, 2, 1] ; "op order")]
    fn test_alt_numbers(text: &str, primary: &[usize], op: &[usize]) {
        let (grammar, ctx, rewritten) = translate(text);
        assert_eq!(rewritten, vec!["e"]);
        assert_eq!(ctx.errors.num_errors(), 0);
        let rule = grammar.rule(0);
        let recursion = rule.recursion.as_ref().unwrap();
        assert_eq!(recursion.primary_alts(), primary);
        assert_eq!(recursion.recursive_op_alts(), op);
        assert_eq!(rule.num_alts, 1);
        assert_eq!(rule.original_number_of_alts(), primary.len() + op.len());
    }

    #[test]
    fn test_rewritten_tree() {
        let (grammar, _, _) = translate("e : e '*' e | INT | e '+' e | ID ;");
        let rule = grammar.rule(0);
        assert_eq!(
            rule.ast.to_string_tree(rule.ast.root()),
            "(RULE e (BLOCK (ALT (BLOCK (ALT {} INT<tokenIndex=12>) (ALT ID<tokenIndex=24>)) \
             (* (BLOCK (ALT {precpred(_ctx, 4)}?<p=4> '*'<tokenIndex=6> e<tokenIndex=8,p=5>) \
             (ALT {precpred(_ctx, 2)}?<p=2> '+'<tokenIndex=18> e<tokenIndex=20,p=3>))))))"
        );
    }

    #[test]
    fn test_alt_pointers_and_positions() {
        let (grammar, _, _) = translate("e : e '*' e | INT ;");
        let rule = grammar.rule(0);
        let recursion = rule.recursion.as_ref().unwrap();
        let op = recursion.op_alts[0].alt_node.unwrap();
        assert!(matches!(rule.ast.kind(op), NodeKind::Alt { .. }));
        let star = rule.ast.nodes_where(op, |node| {
            node.kind == NodeKind::StringLiteral { text: "'*'".to_string() }
        });
        assert_eq!(rule.token_position(star[0]), Some((1, 7)));
        assert_eq!(rule.token_position(rule.ast.root()), Some((1, 1)));
    }

    #[test]
    fn test_outside_references_accept_every_operator() {
        let (grammar, _, _) = translate("s : e ';' ; e : e '[' e ']' | e '*' e | ID ;");
        let s = grammar.rule(0);
        let refs = s.ast.nodes_where(s.ast.root(), |node| node.is_rule_ref_to("e"));
        assert_eq!(s.ast.option(refs[0], "p"), Some("0"));
        let e = grammar.rule(1);
        let inner = &e.recursion.as_ref().unwrap().op_alts[1];
        assert_eq!(inner.alt_text, "'['<tokenIndex=16> e<tokenIndex=18> ']'<tokenIndex=20>");
        let inner_refs = e.ast.nodes_where(inner.alt_node.unwrap(), |node| node.is_rule_ref_to("e"));
        assert_eq!(e.ast.option(inner_refs[0], "p"), Some("0"));
    }

    #[test]
    fn test_labels_survive() {
        let (grammar, _, _) = translate("e returns [int v] : e '*' e # Mul | INT # Int ;");
        let rule = grammar.rule(0);
        assert_eq!(rule.returns(), Some("int v"));
        let labels = rule.alt_labels();
        assert_eq!(labels.get("Mul"), Some(&vec![1]));
        assert_eq!(labels.get("Int"), Some(&vec![2]));
        assert!(rule.recursion.as_ref().unwrap().unlabeled_alts().is_empty());
    }

    #[test]
    fn test_all_alts_left_recursive() {
        let (grammar, ctx, rewritten) = translate("e : e '*' e | e '+' e ;");
        assert!(rewritten.is_empty());
        assert!(ctx.errors.has(ErrorKind::NoNonLrAlts));
        assert!(!grammar.rule(0).is_left_recursive());
    }

    #[test]
    fn test_nonconforming_rule() {
        let (grammar, ctx, rewritten) = translate("e : e | ID ;");
        assert!(rewritten.is_empty());
        let diagnostic = &ctx.errors.diagnostics()[0];
        assert_eq!(diagnostic.kind, ErrorKind::NonconformingLrRule);
        assert_eq!(diagnostic.args, vec!["e"]);
        assert_eq!(grammar.rule(0).num_alts, 2);
    }
}
