use leftrec::atn::AtnError;
use leftrec::rewrite::{ToolContext, ToolOptions};
use leftrec::{ErrorKind, Tool, ToolError};

mod support;

fn context() -> ToolContext {
    support::init_logging();
    ToolContext::new(ToolOptions::default()).unwrap()
}

#[test]
fn test_rewritten_rules_are_listed() {
    let processed = support::process("s : e ';' ; e : e '*' e | '(' e ')' | INT ; t : ID ;");
    assert_eq!(processed.rewritten, vec!["e".to_string()]);
    assert!(processed.cycles.is_empty());
    assert!(processed.atn.is_left_recursive_rule(support::start_rule(&processed, "e")));
    assert!(!processed.atn.is_left_recursive_rule(support::start_rule(&processed, "t")));
}

#[test]
fn test_rewritten_rules_come_with_their_actions() {
    let processed = support::process("s : e ';' ; e : e '*' e # Mul | INT # Int ; t : ID ;");
    assert_eq!(processed.actions.keys().collect::<Vec<_>>(), vec!["e"]);
    let actions = &processed.actions["e"];
    assert_eq!(actions.set_stop_token, "_ctx.stop = _input.LT(-1);");
    assert_eq!(actions.primary_alt_prefixes.len(), 1);
    assert_eq!(actions.op_alt_prefixes.len(), 1);
    assert!(actions.op_alt_prefixes[0].starts_with("_localctx = new MulContext("));
}

#[test]
fn test_rejected_rule_stays_as_written() {
    let mut ctx = context();
    let processed = Tool::process(&mut ctx, "e : e | ID ;").unwrap();
    assert!(processed.rewritten.is_empty());
    assert!(ctx.errors.has(ErrorKind::NonconformingLrRule));
    assert_eq!(processed.cycles, vec![vec!["e".to_string()]]);
}

#[test]
fn test_load_error() {
    let mut ctx = context();
    let error = Tool::process(&mut ctx, "a : B\nb : C ;").unwrap_err();
    assert!(matches!(error, ToolError::Load(ref load) if load.line == 2));
}

#[test]
fn test_undefined_rule() {
    let mut ctx = context();
    assert!(matches!(
        Tool::process(&mut ctx, "a : b ;"),
        Err(ToolError::Automaton(AtnError::UndefinedRule { .. }))
    ));
}
