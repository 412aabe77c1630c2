#![allow(dead_code)]

use leftrec::interp::{InterpreterOptions, ParserInterpreter, ParseTree, TokenStream};
use leftrec::rewrite::{ToolContext, ToolOptions};
use leftrec::{ProcessedGrammar, Tool};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Runs the whole pipeline, asserting that no rule was rejected.
pub fn process(text: &str) -> ProcessedGrammar {
    init_logging();
    let mut ctx = ToolContext::new(ToolOptions::default()).unwrap();
    let processed = Tool::process(&mut ctx, text).unwrap();
    assert_eq!(ctx.errors.num_errors(), 0, "{:?}", ctx.errors.diagnostics());
    processed
}

pub fn interpreter(processed: &ProcessedGrammar, input: &str) -> ParserInterpreter {
    processed.interpreter(processed.tokens(input).unwrap())
}

pub fn interpreter_with_options(
    processed: &ProcessedGrammar,
    input: &str,
    options: InterpreterOptions,
) -> ParserInterpreter {
    processed.interpreter_with_options(processed.tokens(input).unwrap(), options)
}

pub fn start_rule(processed: &ProcessedGrammar, name: &str) -> usize {
    processed.rule_index(name).unwrap()
}

/// Parses the input from the named rule and renders the tree.
pub fn parse(processed: &ProcessedGrammar, start: &str, input: &str) -> String {
    let mut parser = interpreter(processed, input);
    parser.parse(start_rule(processed, start)).unwrap();
    render(parser.parse_tree(), processed)
}

pub fn render(tree: &ParseTree, processed: &ProcessedGrammar) -> String {
    tree.to_string_tree(&processed.atn.rule_names)
}

pub fn render_all(trees: &[ParseTree], processed: &ProcessedGrammar) -> Vec<String> {
    trees.iter().map(|tree| render(tree, processed)).collect()
}

pub fn tokens(processed: &ProcessedGrammar, input: &str) -> TokenStream {
    processed.tokens(input).unwrap()
}
