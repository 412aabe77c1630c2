//! Renders rewritten rules and the bookkeeping actions a generated parser runs in them.
//!
//! The actions are rendered apart from the rule text; a code generator places them around the
//! blocks of the rewritten rule.

use std::collections::BTreeMap;

use leftrec_grammar::{ErrorKind, RecursiveAltInfo, Rule};
use log::debug;

use crate::analyzer::{LeftRecursiveRuleAnalyzer, PRECEDENCE_OPTION_NAME};
use crate::template::{TemplateError, Value, capitalize};
use crate::tool::ToolContext;

/// Rendered actions of one rewritten rule.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LeftRecursiveRuleActions {
    /// Declaration of the precedence parameter.
    pub rule_arg: String,
    pub set_result: String,
    /// One per primary alternative; labeled alternatives replace the rule context.
    pub primary_alt_prefixes: Vec<Option<String>>,
    /// Runs after the primary block.
    pub set_stop_token: String,
    /// Runs at the top of each operator loop iteration.
    pub set_prev_ctx: String,
    /// One per operator alternative.
    pub op_alt_prefixes: Vec<String>,
}

fn alt_record(info: &RecursiveAltInfo) -> Value {
    let mut fields = BTreeMap::new();
    fields.insert("altNum".to_string(), Value::from(info.alt_num));
    fields.insert("altText".to_string(), Value::from(&info.alt_text[..]));
    if let Some(label) = &info.alt_label {
        fields.insert("altLabel".to_string(), Value::from(&label[..]));
    }
    if let Some(label) = &info.left_recursive_rule_ref_label {
        fields.insert("leftRecursiveRuleRefLabel".to_string(), Value::from(&label[..]));
    }
    fields.insert("isListLabel".to_string(), Value::from(info.is_list_label));
    Value::Record(fields)
}

fn report(ctx: &mut ToolContext, error: TemplateError) {
    match error {
        TemplateError::UnknownTemplate(name) => {
            ctx.errors.tool_error(ErrorKind::MissingCodeTemplate, &[&name])
        }
        other => ctx.errors.tool_error(ErrorKind::InternalError, &[&other.to_string()]),
    }
}

/// The text of the rewritten rule: a primary block followed by a loop over the operator
/// alternatives, each guarded by a precedence predicate. Returns `None` after reporting
/// a template problem.
pub fn artificial_op_prec_rule(
    ctx: &mut ToolContext,
    analyzer: &LeftRecursiveRuleAnalyzer,
) -> Option<String> {
    match render_rule(ctx, analyzer) {
        Ok(text) => {
            debug!("synthesized rule {}:\n{}", analyzer.rule().name, text);
            Some(text)
        }
        Err(error) => {
            report(ctx, error);
            None
        }
    }
}

fn render_rule(
    ctx: &ToolContext,
    analyzer: &LeftRecursiveRuleAnalyzer,
) -> Result<String, TemplateError> {
    let rule = analyzer.rule();
    let arg = ctx.codegen_templates.instance_of("recRuleArg")?.render()?;
    let set_result = ctx
        .codegen_templates
        .instance_of("recRuleSetResultAction")?
        .render()?;

    let mut rule_template = ctx.rec_rule_templates.instance_of("recRule")?;
    rule_template
        .add("ruleName", &rule.name[..])?
        .add("argName", arg)?
        .add("setResultAction", set_result)?;
    if let Some(returns) = rule.returns() {
        rule_template.add("userRetvals", returns)?;
    }
    for (label, _) in &analyzer.left_recursive_rule_ref_labels {
        rule_template.add("leftRecursiveRuleRefLabels", &label[..])?;
    }
    for info in &analyzer.prefix_and_other_alts {
        rule_template.add("primaryAlts", alt_record(info))?;
    }
    for info in analyzer.op_alts() {
        let op_prec = analyzer.precedence.precedence(info.alt_num);
        let mut predicate = ctx.codegen_templates.instance_of("recRuleAltPredicate")?;
        predicate
            .add("ruleName", &rule.name[..])?
            .add("opPrec", op_prec)?;
        let mut alt = ctx.rec_rule_templates.instance_of("recRuleAlt")?;
        alt.add("alt", alt_record(info))?
            .add("precOption", PRECEDENCE_OPTION_NAME)?
            .add("opPrec", op_prec)?
            .add("pred", predicate.render()?)?;
        rule_template.add("opAlts", alt.render()?)?;
    }
    rule_template.render()
}

/// Renders the bookkeeping actions of a rule rewritten by the transformer. Returns `None` for
/// rules that weren't rewritten and after reporting a missing template.
pub fn build_rule_actions(ctx: &mut ToolContext, rule: &Rule) -> Option<LeftRecursiveRuleActions> {
    if rule.recursion.is_none() {
        return None;
    }
    let mut list_label_issues = vec![];
    let result = render_actions(ctx, rule, &mut list_label_issues);
    for template in list_label_issues {
        ctx.errors
            .tool_error(ErrorKind::CodeTemplateArgIssue, &[&template, "isListLabel"]);
    }
    match result {
        Ok(actions) => Some(actions),
        Err(error) => {
            report(ctx, error);
            None
        }
    }
}

fn render_actions(
    ctx: &ToolContext,
    rule: &Rule,
    list_label_issues: &mut Vec<String>,
) -> Result<LeftRecursiveRuleActions, TemplateError> {
    let templates = &ctx.codegen_templates;
    let recursion = match &rule.recursion {
        Some(recursion) => recursion,
        None => return Ok(LeftRecursiveRuleActions::default()),
    };
    let mut actions = LeftRecursiveRuleActions {
        rule_arg: templates.instance_of("recRuleArg")?.render()?,
        set_result: templates.instance_of("recRuleSetResultAction")?.render()?,
        set_stop_token: templates.instance_of("recRuleSetStopToken")?.render()?,
        set_prev_ctx: templates.instance_of("recRuleSetPrevCtx")?.render()?,
        ..Default::default()
    };

    for info in &recursion.primary_alts {
        let prefix = match &info.alt_label {
            Some(label) => {
                let mut replace = templates.instance_of("recRuleReplaceContext")?;
                replace.add("ctxName", capitalize(label))?;
                Some(replace.render()?)
            }
            None => None,
        };
        actions.primary_alt_prefixes.push(prefix);
    }

    for info in &recursion.op_alts {
        let mut start = match &info.alt_label {
            Some(label) => {
                let mut start = templates.instance_of("recRuleLabeledAltStartAction")?;
                start.add("currentAltLabel", &label[..])?;
                start
            }
            None => {
                let mut start = templates.instance_of("recRuleAltStartAction")?;
                start.add("ctxName", capitalize(&rule.name))?;
                start
            }
        };
        start.add("ruleName", &rule.name[..])?;
        if let Some(label) = &info.left_recursive_rule_ref_label {
            start.add("label", &label[..])?;
        }
        if start.has_formal_arg("isListLabel") {
            start.add("isListLabel", info.is_list_label)?;
        } else if info.is_list_label {
            list_label_issues.push(start.name().to_string());
        }
        actions.op_alt_prefixes.push(start.render()?);
    }
    Ok(actions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{CODEGEN_TEMPLATES, TemplateGroup};
    use crate::tool::ToolOptions;
    use crate::transformer::translate_left_recursive_rules;
    use leftrec_grammar::Grammar;

    const LABELED: &str = "e : a=e '*' e # Mul | xs+=e '!' | INT # Int ;";

    fn rewritten(text: &str) -> (Grammar, ToolContext) {
        let mut grammar = Grammar::load(text).unwrap();
        let mut ctx = ToolContext::new(ToolOptions::default()).unwrap();
        assert_eq!(translate_left_recursive_rules(&mut ctx, &mut grammar), vec!["e"]);
        (grammar, ctx)
    }

    #[test]
    fn test_rule_actions() {
        let (grammar, mut ctx) = rewritten(LABELED);
        let actions = build_rule_actions(&mut ctx, grammar.rule(0)).unwrap();
        assert_eq!(actions.rule_arg, "int _p");
        assert_eq!(actions.set_stop_token, "_ctx.stop = _input.LT(-1);");
        assert_eq!(
            actions.primary_alt_prefixes,
            vec![Some(
                "_localctx = new IntContext(_localctx);\n_ctx = _localctx;\n_prevctx = _localctx;"
                    .to_string()
            )]
        );
        assert_eq!(
            actions.op_alt_prefixes,
            vec![
                "_localctx = new MulContext(new EContext(_parentctx, _parentState));\n\
                 ((MulContext)_localctx).a = _prevctx;\n\
                 pushNewRecursionContext(_localctx, _startState, RULE_e);",
                "_localctx = new EContext(_parentctx, _parentState);\n\
                 _localctx.xs.add(_prevctx);\n\
                 pushNewRecursionContext(_localctx, _startState, RULE_e);",
            ]
        );
        assert_eq!(ctx.errors.num_errors(), 0);
    }

    #[test]
    fn test_template_without_list_label_arg() {
        let (grammar, mut ctx) = rewritten(LABELED);
        let text = format!(
            "{}\nrecRuleAltStartAction(ruleName, ctxName, label) ::= \"start <label>\"",
            CODEGEN_TEMPLATES
        );
        ctx.codegen_templates = TemplateGroup::parse(&text).unwrap();
        let actions = build_rule_actions(&mut ctx, grammar.rule(0)).unwrap();
        assert_eq!(actions.op_alt_prefixes[1], "start xs");
        let diagnostic = &ctx.errors.diagnostics()[0];
        assert_eq!(diagnostic.kind, ErrorKind::CodeTemplateArgIssue);
        assert_eq!(diagnostic.args, vec!["recRuleAltStartAction", "isListLabel"]);
    }

    #[test]
    fn test_missing_template() {
        let (grammar, mut ctx) = rewritten("e : e '*' e | INT ;");
        ctx.codegen_templates = TemplateGroup::parse("recRuleArg() ::= \"int _p\"").unwrap();
        assert_eq!(build_rule_actions(&mut ctx, grammar.rule(0)), None);
        assert_eq!(ctx.errors.diagnostics()[0].kind, ErrorKind::MissingCodeTemplate);
        assert_eq!(ctx.errors.diagnostics()[0].args, vec!["recRuleSetResultAction"]);
    }

    #[test]
    fn test_missing_template_abandons_rewrite() {
        let mut grammar = Grammar::load("e : e '*' e | INT ;").unwrap();
        let mut ctx = ToolContext::new(ToolOptions::default()).unwrap();
        ctx.codegen_templates = TemplateGroup::default();
        assert!(translate_left_recursive_rules(&mut ctx, &mut grammar).is_empty());
        assert!(ctx.errors.has(ErrorKind::MissingCodeTemplate));
        assert!(!grammar.rule(0).is_left_recursive());
    }

    #[test]
    fn test_unrewritten_rule_has_no_actions() {
        let grammar = Grammar::load("a : B ;").unwrap();
        let mut ctx = ToolContext::new(ToolOptions::default()).unwrap();
        assert_eq!(build_rule_actions(&mut ctx, grammar.rule(0)), None);
    }
}
