use leftrec::atn::{OuterAltTracker, StateKind};
use test_case::test_case;

mod support;

#[test_case("s : ID | INT {;} ;", "a", "(s:1 a)" ; "first alternative")]
#[test_case("s : ID | INT {;} ;", "3", "(s:2 3)" ; "second alternative")]
#[test_case("s : ID # foo | INT # bar ;", "3", "(s:2 3)" ; "labeled alternatives")]
#[test_case("s : ID ;", "a", "(s:1 a)" ; "one alternative")]
fn test_plain_rules(grammar: &str, input: &str, expected: &str) {
    let processed = support::process(grammar);
    assert_eq!(support::parse(&processed, "s", input), expected);
}

#[test_case("s", "a", "(s:1 (e:4 a) <EOF>)")]
#[test_case("e", "a", "(e:4 a)")]
#[test_case("e", "34", "(e:3 34)")]
#[test_case("e", "a + 1", "(e:2 (e:4 a) + (e:3 1))")]
#[test_case("e", "1 + 2 * a", "(e:2 (e:3 1) + (e:1 (e:3 2) * (e:4 a)))")]
fn test_multiple_primary_and_recursive_operators(start: &str, input: &str, expected: &str) {
    let processed = support::process("s : e EOF ; e : e '*' e | e '+' e | INT | ID ;");
    assert_eq!(support::parse(&processed, start, input), expected);
}

/// The tracked decisions of the rewritten rule record every alternative under its number as
/// written.
#[test_case(
    "e : e '*' e | INT | e '+' e | ID ;",
    &[2, 4],
    &[1, 3],
    &[
        ("1", "(e:2 1)"),
        ("x", "(e:4 x)"),
        ("1 * x", "(e:1 (e:2 1) * (e:4 x))"),
        ("x + 1", "(e:3 (e:4 x) + (e:2 1))"),
    ] ; "scenario a"
)]
#[test_case(
    "e : INT | e '*' e | ID ;",
    &[1, 3],
    &[2],
    &[
        ("1", "(e:1 1)"),
        ("x", "(e:3 x)"),
        ("1 * x", "(e:2 (e:1 1) * (e:3 x))"),
    ] ; "scenario b"
)]
#[test_case(
    "e : '--' e | e '*' e | e '+' e | e '--' | ID ;",
    &[1, 5],
    &[2, 3, 4],
    &[
        ("x", "(e:5 x)"),
        ("-- x", "(e:1 -- (e:5 x))"),
        ("x * x", "(e:2 (e:5 x) * (e:5 x))"),
        ("x + x", "(e:3 (e:5 x) + (e:5 x))"),
        ("x --", "(e:4 (e:5 x) --)"),
    ] ; "scenario c"
)]
fn test_reconciled_alternatives_round_trip(
    grammar: &str,
    primary: &[usize],
    op: &[usize],
    parses: &[(&str, &str)],
) {
    let processed = support::process(grammar);
    let rule = processed.grammar.rule_by_name("e").unwrap();
    let recursion = rule.recursion.as_ref().unwrap();
    assert_eq!(recursion.primary_alts(), primary);
    assert_eq!(recursion.recursive_op_alts(), op);

    let tracker = OuterAltTracker::new(&processed.atn);
    let tracked: Vec<&StateKind> = (0..processed.atn.states.len())
        .filter(|&id| tracker.is_tracked(id))
        .map(|id| &processed.atn.states[id].kind)
        .collect();
    assert!(tracked.iter().any(|kind| matches!(kind, StateKind::StarBlockStart { .. })));
    assert_eq!(
        tracked.iter().any(|kind| matches!(kind, StateKind::BlockStart { .. })),
        primary.len() > 1
    );

    for &(input, expected) in parses {
        assert_eq!(support::parse(&processed, "e", input), expected, "input {:?}", input);
    }
}

#[test_case(1, "(s:1 a (x:1 b) c)")]
#[test_case(2, "(s:2 a b c)")]
fn test_interpret_at_specific_alternative(alt: usize, expected: &str) {
    let processed = support::process("s : 'a' x 'c' | 'a' 'b' 'c' ; x : 'b' ;");
    let start = support::start_rule(&processed, "s");
    let first = processed.atn.rule_start(start).transitions[0].target();
    let state = processed.atn.state(first);
    assert!(matches!(state.kind, StateKind::BlockStart { .. }));
    let decision = state.decision.unwrap();

    let mut parser = support::interpreter(&processed, "a b c");
    parser.add_decision_override(decision, 0, alt);
    parser.parse(start).unwrap();
    assert_eq!(support::render(parser.parse_tree(), &processed), expected);
}
