use leftrec::atn::{AmbiguityInfo, PredictionMode, format_alts};
use leftrec::interp::{InterpreterOptions, ParserInterpreter, get_all_possible_parse_trees};
use leftrec::ProcessedGrammar;
use test_case::test_case;

mod support;

fn exact_interpreter(processed: &ProcessedGrammar, input: &str) -> ParserInterpreter {
    let options = InterpreterOptions {
        prediction_mode: PredictionMode::LlExactAmbigDetection,
        ..InterpreterOptions::default()
    };
    support::interpreter_with_options(processed, input, options)
}

fn only_ambiguity(parser: &ParserInterpreter, decision: usize) -> AmbiguityInfo {
    let found: Vec<&AmbiguityInfo> = parser
        .ambiguities()
        .iter()
        .filter(|info| info.decision == decision)
        .collect();
    assert_eq!(found.len(), 1, "{:?}", parser.ambiguities());
    found[0].clone()
}

#[test_case(
    "s : 'a' x 'c' | 'a' 'b' 'c' ; x : 'b' ;",
    "s",
    0,
    "(s:1 a (x:1 b) c)",
    &["(s:1 a (x:1 b) c)", "(s:2 a b c)"] ;
    "ambiguous at the root"
)]
#[test_case(
    "s : x ; x : y ; y : 'a' z 'c' | 'a' 'b' 'c' ; z : 'b' ;",
    "s",
    0,
    "(s:1 (x:1 (y:1 a (z:1 b) c)))",
    &["(y:1 a (z:1 b) c)", "(y:2 a b c)"] ;
    "ambiguous below the root"
)]
fn test_ambiguous_abc(
    grammar: &str,
    start: &str,
    decision: usize,
    overall: &str,
    expected: &[&str],
) {
    check_ambiguity(grammar, "a b c", start, decision, overall, expected);
}

#[test_case(
    "e : p ('.' ID)* ; p : 'self' | 'self' '.' ID ;",
    "e",
    1,
    "(e:1 (p:1 self) . x)",
    &["(e:1 (p:1 self) . x)", "(p:2 self . x)"] ;
    "loop after rule call"
)]
#[test_case(
    "s : e ; e : p ('.' ID)* ; p : 'self' | 'self' '.' ID ;",
    "s",
    1,
    "(s:1 (e:1 (p:1 self) . x))",
    &["(e:1 (p:1 self) . x)", "(p:2 self . x)"] ;
    "loop after rule call below the root"
)]
#[test_case(
    "s : e ; e : p | e '.' ID ; p : 'self' | 'self' '.' ID ;",
    "s",
    1,
    "(s:1 (e:2 (e:1 (p:1 self)) . x))",
    &["(e:2 (e:1 (p:1 self)) . x)", "(p:2 self . x)"] ;
    "left-recursive rule below the root"
)]
#[test_case(
    "s : e ; e : p | e '.' ID ; p : 'self' | 'self' '.' ID ;",
    "e",
    1,
    "(e:2 (e:1 (p:1 self)) . x)",
    &["(e:2 (e:1 (p:1 self)) . x)", "(p:2 self . x)"] ;
    "left-recursive start rule"
)]
fn test_ambiguous_self_reference(
    grammar: &str,
    start: &str,
    decision: usize,
    overall: &str,
    expected: &[&str],
) {
    check_ambiguity(grammar, "self . x", start, decision, overall, expected);
}

fn check_ambiguity(
    grammar: &str,
    input: &str,
    start: &str,
    decision: usize,
    overall: &str,
    expected: &[&str],
) {
    let processed = support::process(grammar);
    let start_rule = support::start_rule(&processed, start);
    let mut parser = exact_interpreter(&processed, input);
    let root = parser.parse(start_rule).unwrap();
    assert_eq!(support::render(parser.parse_tree(), &processed), overall);

    let info = only_ambiguity(&parser, decision);
    assert_eq!(format_alts(&info.ambig_alts), "{1, 2}");

    let tokens = parser.token_stream().clone();
    let trees = get_all_possible_parse_trees(
        &processed.grammar,
        &parser,
        &tokens,
        decision,
        &info.ambig_alts,
        info.start_index,
        info.stop_index,
        start_rule,
    )
    .unwrap();
    assert_eq!(support::render_all(&trees, &processed), expected);

    // The first alternative is the one the parse chose.
    let tree = parser.parse_tree();
    let first = trees[0].root().unwrap();
    let stop = trees[0].source_interval(first).b as usize;
    let chosen = tree
        .get_root_of_subtree_enclosing_region(root, info.start_index, stop)
        .unwrap();
    assert!(trees[0].structurally_equal(first, tree, chosen));

    let again = get_all_possible_parse_trees(
        &processed.grammar,
        &parser,
        &tokens,
        decision,
        &info.ambig_alts,
        info.start_index,
        info.stop_index,
        start_rule,
    )
    .unwrap();
    assert_eq!(support::render_all(&again, &processed), expected);
}
