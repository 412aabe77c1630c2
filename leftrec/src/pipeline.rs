//! Grammar text to interpreter, in one call.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use leftrec_atn::{Atn, AtnError, build_atn};
use leftrec_grammar::{Grammar, LoadError};
use leftrec_interp::{InterpreterOptions, ParserInterpreter, TokenStream, UnknownWord};
use leftrec_rewrite::{
    LeftRecursiveRuleActions, ToolContext, build_rule_actions, detect_left_recursion_cycles,
    translate_left_recursive_rules,
};
use log::debug;

#[derive(Clone, Debug)]
pub enum ToolError {
    Load(LoadError),
    Automaton(AtnError),
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ToolError::Load(error) => write!(f, "{}", error),
            ToolError::Automaton(error) => write!(f, "{}", error),
        }
    }
}

impl std::error::Error for ToolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ToolError::Load(error) => Some(error),
            ToolError::Automaton(error) => Some(error),
        }
    }
}

impl From<LoadError> for ToolError {
    fn from(error: LoadError) -> Self {
        ToolError::Load(error)
    }
}

impl From<AtnError> for ToolError {
    fn from(error: AtnError) -> Self {
        ToolError::Automaton(error)
    }
}

pub struct Tool;

impl Tool {
    /// Loads grammar text, rewrites its left-recursive rules, checks it for left recursion
    /// through other rules and builds its automaton. The bookkeeping actions of each
    /// rewritten rule are rendered along the way.
    ///
    /// Problems with individual rules go to `ctx.errors` and don't stop the pipeline.
    pub fn process(ctx: &mut ToolContext, text: &str) -> Result<ProcessedGrammar, ToolError> {
        let mut grammar = Grammar::load(text)?;
        let rewritten = translate_left_recursive_rules(ctx, &mut grammar);
        let mut actions = BTreeMap::new();
        for name in &rewritten {
            let rendered = grammar
                .rule_by_name(name)
                .and_then(|rule| build_rule_actions(ctx, rule));
            if let Some(rendered) = rendered {
                actions.insert(name.clone(), rendered);
            }
        }
        let cycles = detect_left_recursion_cycles(ctx, &grammar);
        let atn = build_atn(&grammar)?;
        debug!(
            "processed grammar {:?}: rewrote {:?}, {} errors",
            grammar.name(),
            rewritten,
            ctx.errors.num_errors()
        );
        Ok(ProcessedGrammar {
            grammar: Rc::new(grammar),
            atn: Rc::new(atn),
            rewritten,
            actions,
            cycles,
        })
    }
}

/// A grammar ready to interpret.
#[derive(Clone, Debug)]
pub struct ProcessedGrammar {
    pub grammar: Rc<Grammar>,
    pub atn: Rc<Atn>,
    /// Names of the rules rewritten from their left-recursive form.
    pub rewritten: Vec<String>,
    /// Actions a generated parser runs in each rewritten rule, by rule name. Placing them in
    /// the rule body is up to the code generator.
    pub actions: BTreeMap<String, LeftRecursiveRuleActions>,
    /// Groups of mutually left-recursive rules.
    pub cycles: Vec<Vec<String>>,
}

impl ProcessedGrammar {
    pub fn rule_index(&self, name: &str) -> Option<usize> {
        self.grammar.rule_index(name)
    }

    /// Tokens for whitespace-separated words, see [`TokenStream::from_words`].
    pub fn tokens(&self, text: &str) -> Result<TokenStream, UnknownWord> {
        TokenStream::from_words(self.grammar.vocabulary(), text)
    }

    pub fn interpreter(&self, input: TokenStream) -> ParserInterpreter {
        ParserInterpreter::new(Rc::clone(&self.grammar), Rc::clone(&self.atn), input)
    }

    pub fn interpreter_with_options(
        &self,
        input: TokenStream,
        options: InterpreterOptions,
    ) -> ParserInterpreter {
        ParserInterpreter::with_options(
            Rc::clone(&self.grammar),
            Rc::clone(&self.atn),
            input,
            options,
        )
    }
}
