//! Named text templates with attribute slots.
//!
//! A group is a sequence of definitions, each either a one-line string or a `<<...>>` block:
//!
//! ```text
//! recRuleArg() ::= "int _p"
//! recRuleAlt(alt, precOption, opPrec, pred) ::= <<
//! {<pred>}?\<<precOption>=<opPrec>\> <alt.altText>
//! >>
//! ```
//!
//! Inside a template, `<name>` renders an attribute, `<name.prop>` a property of a record
//! (mapped over lists), `<list; separator=", ">` joins a list and `<name; format="cap">`
//! capitalizes. `<if(name)>...<else>...<endif>` tests presence. A line holding only a
//! conditional tag renders no line of its own.

use std::collections::BTreeMap;
use std::fmt;
use std::str::Chars;

/// An attribute value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Text(String),
    Bool(bool),
    List(Vec<Value>),
    Record(BTreeMap<String, Value>),
}

impl Value {
    fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::List(items) => !items.is_empty(),
            Value::Text(_) | Value::Record(_) => true,
        }
    }

    fn property(&self, name: &str) -> Option<Value> {
        match self {
            Value::Record(fields) => fields.get(name).cloned(),
            Value::List(items) => Some(Value::List(
                items.iter().filter_map(|item| item.property(name)).collect(),
            )),
            _ => None,
        }
    }

    fn render(&self, out: &mut String, separator: &str, format: Option<Format>) {
        match self {
            Value::Text(text) => match format {
                Some(Format::Cap) => out.push_str(&capitalize(text)),
                None => out.push_str(text),
            },
            Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Value::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(separator);
                    }
                    item.render(out, separator, format);
                }
            }
            Value::Record(_) => {}
        }
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Text(text.to_string())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::Text(text)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Text(n.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

/// Upper-cases the first character.
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TemplateError {
    UnknownTemplate(String),
    UndeclaredAttribute { template: String, attribute: String },
    Syntax { template: String, reason: String },
    Group { line: u32, reason: String },
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TemplateError::UnknownTemplate(name) => write!(f, "no such template: {}", name),
            TemplateError::UndeclaredAttribute {
                template,
                attribute,
            } => write!(f, "attribute {} isn't defined in template {}", attribute, template),
            TemplateError::Syntax { template, reason } => {
                write!(f, "template {}: {}", template, reason)
            }
            TemplateError::Group { line, reason } => {
                write!(f, "template group, line {}: {}", line, reason)
            }
        }
    }
}

impl std::error::Error for TemplateError {}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Format {
    Cap,
}

#[derive(Clone, Debug, PartialEq)]
enum Part {
    Text(String),
    Expr {
        path: Vec<String>,
        separator: String,
        format: Option<Format>,
    },
    If {
        cond: Vec<String>,
        then: Vec<Part>,
        otherwise: Vec<Part>,
    },
}

#[derive(Clone, Debug)]
struct TemplateDef {
    name: String,
    formal_args: Vec<String>,
    body: Vec<Part>,
}

/// A set of named templates.
#[derive(Clone, Debug, Default)]
pub struct TemplateGroup {
    templates: BTreeMap<String, TemplateDef>,
}

/// A template with bound attributes.
#[derive(Clone, Debug)]
pub struct Template<'g> {
    def: &'g TemplateDef,
    attributes: BTreeMap<String, Value>,
}

impl TemplateGroup {
    pub fn parse(text: &str) -> Result<Self, TemplateError> {
        let mut parser = GroupParser {
            chars: text.chars(),
            line: 1,
        };
        let mut templates = BTreeMap::new();
        while let Some(def) = parser.definition()? {
            templates.insert(def.name.clone(), def);
        }
        Ok(TemplateGroup { templates })
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    pub fn instance_of(&self, name: &str) -> Result<Template<'_>, TemplateError> {
        self.templates
            .get(name)
            .map(|def| Template {
                def,
                attributes: BTreeMap::new(),
            })
            .ok_or_else(|| TemplateError::UnknownTemplate(name.to_string()))
    }
}

impl<'g> Template<'g> {
    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn has_formal_arg(&self, name: &str) -> bool {
        self.def.formal_args.iter().any(|arg| arg == name)
    }

    /// Binds an attribute. Adding to an attribute that is already bound turns it into a list.
    pub fn add(&mut self, name: &str, value: impl Into<Value>) -> Result<&mut Self, TemplateError> {
        if !self.has_formal_arg(name) {
            return Err(TemplateError::UndeclaredAttribute {
                template: self.def.name.clone(),
                attribute: name.to_string(),
            });
        }
        let value = value.into();
        match self.attributes.remove(name) {
            None => {
                self.attributes.insert(name.to_string(), value);
            }
            Some(Value::List(mut items)) => {
                items.push(value);
                self.attributes.insert(name.to_string(), Value::List(items));
            }
            Some(previous) => {
                self.attributes
                    .insert(name.to_string(), Value::List(vec![previous, value]));
            }
        }
        Ok(self)
    }

    pub fn render(&self) -> Result<String, TemplateError> {
        let mut out = String::new();
        self.render_parts(&self.def.body, &mut out)?;
        Ok(out)
    }

    fn lookup(&self, path: &[String]) -> Result<Option<Value>, TemplateError> {
        let (first, rest) = match path.split_first() {
            Some(split) => split,
            None => return Ok(None),
        };
        if !self.has_formal_arg(first) {
            return Err(TemplateError::UndeclaredAttribute {
                template: self.def.name.clone(),
                attribute: first.clone(),
            });
        }
        let mut value = self.attributes.get(first).cloned();
        for prop in rest {
            value = value.and_then(|value| value.property(prop));
        }
        Ok(value)
    }

    fn render_parts(&self, parts: &[Part], out: &mut String) -> Result<(), TemplateError> {
        for part in parts {
            match part {
                Part::Text(text) => out.push_str(text),
                Part::Expr {
                    path,
                    separator,
                    format,
                } => {
                    if let Some(value) = self.lookup(path)? {
                        value.render(out, separator, *format);
                    }
                }
                Part::If {
                    cond,
                    then,
                    otherwise,
                } => {
                    let holds = self.lookup(cond)?.is_some_and(|value| value.is_truthy());
                    self.render_parts(if holds { then } else { otherwise }, out)?;
                }
            }
        }
        Ok(())
    }
}

struct GroupParser<'a> {
    chars: Chars<'a>,
    line: u32,
}

impl<'a> GroupParser<'a> {
    fn peek(&self) -> Option<char> {
        self.chars.clone().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.chars.next();
        if ch == Some('\n') {
            self.line += 1;
        }
        ch
    }

    fn error(&self, reason: &str) -> TemplateError {
        TemplateError::Group {
            line: self.line,
            reason: reason.to_string(),
        }
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(ch) if ch.is_whitespace() => {
                    self.advance();
                }
                Some('/') if self.chars.as_str().starts_with("//") => {
                    while !matches!(self.peek(), Some('\n') | None) {
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn eat_str(&mut self, expected: &str) -> Result<(), TemplateError> {
        self.skip_trivia();
        if self.chars.as_str().starts_with(expected) {
            for _ in expected.chars() {
                self.advance();
            }
            Ok(())
        } else {
            Err(self.error(&format!("expected `{}`", expected)))
        }
    }

    fn ident(&mut self) -> Option<String> {
        self.skip_trivia();
        let rest = self.chars.as_str();
        let len = rest
            .find(|ch: char| !(ch.is_alphanumeric() || ch == '_'))
            .unwrap_or(rest.len());
        if len == 0 {
            return None;
        }
        for _ in rest[..len].chars() {
            self.advance();
        }
        Some(rest[..len].to_string())
    }

    fn definition(&mut self) -> Result<Option<TemplateDef>, TemplateError> {
        self.skip_trivia();
        if self.peek().is_none() {
            return Ok(None);
        }
        let name = self
            .ident()
            .ok_or_else(|| self.error("expected template name"))?;
        self.eat_str("(")?;
        let mut formal_args = vec![];
        self.skip_trivia();
        if self.peek() != Some(')') {
            loop {
                let arg = self
                    .ident()
                    .ok_or_else(|| self.error("expected argument name"))?;
                formal_args.push(arg);
                self.skip_trivia();
                if self.peek() == Some(',') {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.eat_str(")")?;
        self.eat_str("::=")?;
        self.skip_trivia();
        let raw = if self.chars.as_str().starts_with("<<") {
            self.big_string()?
        } else if self.peek() == Some('"') {
            self.string()?
        } else {
            return Err(self.error("expected template body"));
        };
        let body = parse_template(&name, &strip_conditional_lines(&raw))?;
        Ok(Some(TemplateDef {
            name,
            formal_args,
            body,
        }))
    }

    /// `<<...>>`, without the newline right after `<<` and the one right before `>>`.
    fn big_string(&mut self) -> Result<String, TemplateError> {
        self.eat_str("<<")?;
        let rest = self.chars.as_str();
        let end = rest
            .find(">>")
            .ok_or_else(|| self.error("unterminated `<<`"))?;
        let mut body = &rest[..end];
        for _ in rest[..end + 2].chars() {
            self.advance();
        }
        if let Some(stripped) = body.strip_prefix('\n') {
            body = stripped;
        }
        if let Some(stripped) = body.strip_suffix('\n') {
            body = stripped;
        }
        Ok(body.to_string())
    }

    fn string(&mut self) -> Result<String, TemplateError> {
        self.advance();
        let mut body = String::new();
        loop {
            match self.advance() {
                Some('"') => return Ok(body),
                Some('\\') => match self.advance() {
                    Some('"') => body.push('"'),
                    Some('n') => body.push('\n'),
                    // Template escapes are resolved when the body is parsed.
                    Some(other) => {
                        body.push('\\');
                        body.push(other);
                    }
                    None => break,
                },
                Some('\n') | None => break,
                Some(ch) => body.push(ch),
            }
        }
        Err(self.error("unterminated string"))
    }
}

fn is_conditional_tag(line: &str) -> bool {
    let line = line.trim();
    line == "<else>"
        || line == "<endif>"
        || (line.starts_with("<if(") && line.ends_with(")>") && line.matches('<').count() == 1)
}

fn strip_conditional_lines(raw: &str) -> String {
    let mut result = String::new();
    let mut lines = raw.split('\n').peekable();
    while let Some(line) = lines.next() {
        let last = lines.peek().is_none();
        if is_conditional_tag(line) {
            result.push_str(line.trim());
        } else {
            result.push_str(line);
            if !last {
                result.push('\n');
            }
        }
    }
    result
}

fn parse_template(name: &str, text: &str) -> Result<Vec<Part>, TemplateError> {
    let error = |reason: &str| TemplateError::Syntax {
        template: name.to_string(),
        reason: reason.to_string(),
    };
    // Each open conditional keeps the parts before it, its condition and its `then` parts.
    let mut stack: Vec<(Vec<Part>, Vec<String>, Option<Vec<Part>>)> = vec![];
    let mut parts = vec![];
    let mut literal = String::new();
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' if matches!(chars.peek(), Some('<' | '>')) => {
                literal.extend(chars.next());
            }
            '<' => {
                let mut tag = String::new();
                loop {
                    match chars.next() {
                        Some('>') => break,
                        Some('"') => {
                            tag.push('"');
                            while let Some(ch) = chars.next() {
                                tag.push(ch);
                                if ch == '\\' {
                                    tag.extend(chars.next());
                                } else if ch == '"' {
                                    break;
                                }
                            }
                        }
                        Some(ch) => tag.push(ch),
                        None => return Err(error("unterminated expression")),
                    }
                }
                if !literal.is_empty() {
                    parts.push(Part::Text(std::mem::take(&mut literal)));
                }
                let tag = tag.trim();
                if let Some(cond) = tag.strip_prefix("if(").and_then(|t| t.strip_suffix(')')) {
                    let cond = parse_path(cond).ok_or_else(|| error("bad condition"))?;
                    stack.push((std::mem::take(&mut parts), cond, None));
                } else if tag == "else" {
                    let top = stack.last_mut().ok_or_else(|| error("`else` outside `if`"))?;
                    if top.2.is_some() {
                        return Err(error("duplicate `else`"));
                    }
                    top.2 = Some(std::mem::take(&mut parts));
                } else if tag == "endif" {
                    let (before, cond, then) =
                        stack.pop().ok_or_else(|| error("`endif` outside `if`"))?;
                    let (then, otherwise) = match then {
                        Some(then) => (then, std::mem::take(&mut parts)),
                        None => (std::mem::take(&mut parts), vec![]),
                    };
                    parts = before;
                    parts.push(Part::If {
                        cond,
                        then,
                        otherwise,
                    });
                } else {
                    parts.push(parse_expr(tag).ok_or_else(|| error("bad expression"))?);
                }
            }
            ch => literal.push(ch),
        }
    }
    if !stack.is_empty() {
        return Err(error("missing `endif`"));
    }
    if !literal.is_empty() {
        parts.push(Part::Text(literal));
    }
    Ok(parts)
}

fn parse_path(text: &str) -> Option<Vec<String>> {
    let path: Vec<String> = text.trim().split('.').map(|s| s.to_string()).collect();
    let valid = path.iter().all(|segment| {
        !segment.is_empty() && segment.chars().all(|ch| ch.is_alphanumeric() || ch == '_')
    });
    if valid { Some(path) } else { None }
}

fn parse_expr(tag: &str) -> Option<Part> {
    let (path, options) = match tag.split_once(';') {
        Some((path, options)) => (path, options),
        None => (tag, ""),
    };
    let path = parse_path(path)?;
    let mut separator = String::new();
    let mut format = None;
    for option in split_options(options) {
        let (key, value) = option.split_once('=')?;
        let value = unquote(value.trim())?;
        match key.trim() {
            "separator" => separator = value,
            "format" if value == "cap" => format = Some(Format::Cap),
            _ => return None,
        }
    }
    Some(Part::Expr {
        path,
        separator,
        format,
    })
}

/// Splits `a="x", b="y"` at commas outside quotes.
fn split_options(options: &str) -> Vec<&str> {
    let mut result = vec![];
    let mut in_string = false;
    let mut escaped = false;
    let mut start = 0;
    for (i, ch) in options.char_indices() {
        match ch {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => in_string = !in_string,
            ',' if !in_string => {
                result.push(&options[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if !options[start..].trim().is_empty() {
        result.push(&options[start..]);
    }
    result
}

fn unquote(text: &str) -> Option<String> {
    let inner = text.strip_prefix('"')?.strip_suffix('"')?;
    let mut result = String::new();
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next()? {
                'n' => result.push('\n'),
                't' => result.push('\t'),
                other => result.push(other),
            }
        } else {
            result.push(ch);
        }
    }
    Some(result)
}

/// Templates that shape the text of a rewritten rule.
pub const REC_RULE_TEMPLATES: &str = r#"
recRule(ruleName, argName, primaryAlts, opAlts, setResultAction, userRetvals, leftRecursiveRuleRefLabels) ::= <<
<ruleName><if(userRetvals)> returns [<userRetvals>]<endif>
    :   ( {} <primaryAlts.altText; separator="\n        | ">
        )
        (
          <opAlts; separator="\n        | ">
        )*
    ;
>>

recRuleAlt(alt, precOption, opPrec, pred) ::= <<
{<pred>}?\<<precOption>=<opPrec>\> <alt.altText>
>>
"#;

/// Bookkeeping actions a generated parser runs in a rewritten rule.
pub const CODEGEN_TEMPLATES: &str = r#"
recRuleAltPredicate(ruleName, opPrec) ::= "precpred(_ctx, <opPrec>)"
recRuleSetReturnAction(src, name) ::= "$<name>=$<src>.<name>;"
recRuleSetStopToken() ::= "_ctx.stop = _input.LT(-1);"
recRuleArg() ::= "int _p"
recRuleSetResultAction() ::= "$tree=$result.tree;"

recRuleAltStartAction(ruleName, ctxName, label, isListLabel) ::= <<
_localctx = new <ctxName>Context(_parentctx, _parentState);
<if(label)>
<if(isListLabel)>
_localctx.<label>.add(_prevctx);
<else>
_localctx.<label> = _prevctx;
<endif>
<endif>
pushNewRecursionContext(_localctx, _startState, RULE_<ruleName>);
>>

recRuleLabeledAltStartAction(ruleName, currentAltLabel, label, isListLabel) ::= <<
_localctx = new <currentAltLabel; format="cap">Context(new <ruleName; format="cap">Context(_parentctx, _parentState));
<if(label)>
<if(isListLabel)>
((<currentAltLabel; format="cap">Context)_localctx).<label>.add(_prevctx);
<else>
((<currentAltLabel; format="cap">Context)_localctx).<label> = _prevctx;
<endif>
<endif>
pushNewRecursionContext(_localctx, _startState, RULE_<ruleName>);
>>

recRuleReplaceContext(ctxName) ::= <<
_localctx = new <ctxName>Context(_localctx);
_ctx = _localctx;
_prevctx = _localctx;
>>

recRuleSetPrevCtx() ::= <<
if ( _parseListeners!=null ) triggerExitRuleEvent();
_prevctx = _localctx;
>>
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn group(text: &str) -> TemplateGroup {
        TemplateGroup::parse(text).unwrap()
    }

    #[test]
    fn test_attributes_and_escapes() {
        let group = group(r#"alt(pred, p, text) ::= "{<pred>}?\<p=<p>\> <text>""#);
        let mut template = group.instance_of("alt").unwrap();
        template.add("pred", "precpred(_ctx, 2)").unwrap();
        template.add("p", 2usize).unwrap();
        template.add("text", "'+' e").unwrap();
        assert_eq!(template.render().unwrap(), "{precpred(_ctx, 2)}?<p=2> '+' e");
    }

    #[test]
    fn test_lists_and_separators() {
        let group = group("list(items) ::= <<\n[<items; separator=\", \">]\n>>");
        let mut template = group.instance_of("list").unwrap();
        for item in ["a", "b", "c"] {
            template.add("items", item).unwrap();
        }
        assert_eq!(template.render().unwrap(), "[a, b, c]");
    }

    #[test]
    fn test_conditional_lines_vanish() {
        let group = group("t(x, y) ::= <<\nstart\n<if(x)>\nx is <x>\n<else>\nno x\n<endif>\nend <y; format=\"cap\">\n>>");
        let mut with_x = group.instance_of("t").unwrap();
        with_x.add("x", "set").unwrap().add("y", "expr").unwrap();
        assert_eq!(with_x.render().unwrap(), "start\nx is set\nend Expr");
        let without_x = group.instance_of("t").unwrap();
        assert_eq!(without_x.render().unwrap(), "start\nno x\nend ");
    }

    #[test]
    fn test_properties_of_records() {
        let group = group("alts(alts) ::= \"<alts.altText; separator=\\\" | \\\">\"");
        let mut template = group.instance_of("alts").unwrap();
        for text in ["INT", "ID"] {
            let mut record = BTreeMap::new();
            record.insert("altText".to_string(), Value::from(text));
            template.add("alts", Value::Record(record)).unwrap();
        }
        assert_eq!(template.render().unwrap(), "INT | ID");
    }

    #[test]
    fn test_errors() {
        let group = group("t(x) ::= \"<x><z>\"");
        let mut template = group.instance_of("t").unwrap();
        assert!(matches!(
            template.add("y", "1"),
            Err(TemplateError::UndeclaredAttribute { .. })
        ));
        assert!(matches!(
            template.render(),
            Err(TemplateError::UndeclaredAttribute { .. })
        ));
        assert!(matches!(
            group.instance_of("missing"),
            Err(TemplateError::UnknownTemplate(_))
        ));
        assert!(matches!(
            TemplateGroup::parse("t(x) ::= \"<if(x)>\""),
            Err(TemplateError::Syntax { .. })
        ));
    }

    #[test]
    fn test_default_groups_parse() {
        let rec_rules = TemplateGroup::parse(REC_RULE_TEMPLATES).unwrap();
        assert!(rec_rules.is_defined("recRule"));
        assert!(rec_rules.is_defined("recRuleAlt"));
        let codegen = TemplateGroup::parse(CODEGEN_TEMPLATES).unwrap();
        let template = codegen.instance_of("recRuleAltStartAction").unwrap();
        assert!(template.has_formal_arg("isListLabel"));
    }
}
