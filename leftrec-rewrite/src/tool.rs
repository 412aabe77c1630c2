//! Per-invocation state shared by the rewriting passes.

use leftrec_grammar::ErrorManager;

use crate::template::{CODEGEN_TEMPLATES, REC_RULE_TEMPLATES, TemplateError, TemplateGroup};

#[derive(Clone, Debug)]
pub struct ToolOptions {
    /// Reported in diagnostic locations.
    pub grammar_file_name: String,
    pub warnings_are_errors: bool,
}

impl Default for ToolOptions {
    fn default() -> Self {
        ToolOptions {
            grammar_file_name: "<string>".to_string(),
            warnings_are_errors: false,
        }
    }
}

/// Diagnostics, options and template groups of one tool run.
#[derive(Clone, Debug)]
pub struct ToolContext {
    pub errors: ErrorManager,
    pub options: ToolOptions,
    /// Templates shaping rewritten rule text.
    pub rec_rule_templates: TemplateGroup,
    /// Templates of the bookkeeping actions.
    pub codegen_templates: TemplateGroup,
}

impl ToolContext {
    pub fn new(options: ToolOptions) -> Result<Self, TemplateError> {
        let rec_rule_templates = TemplateGroup::parse(REC_RULE_TEMPLATES)?;
        let codegen_templates = TemplateGroup::parse(CODEGEN_TEMPLATES)?;
        Ok(Self::with_templates(options, rec_rule_templates, codegen_templates))
    }

    pub fn with_templates(
        options: ToolOptions,
        rec_rule_templates: TemplateGroup,
        codegen_templates: TemplateGroup,
    ) -> Self {
        ToolContext {
            errors: ErrorManager::new(
                options.grammar_file_name.clone(),
                options.warnings_are_errors,
            ),
            options,
            rec_rule_templates,
            codegen_templates,
        }
    }
}
