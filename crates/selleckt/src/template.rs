//! Mustache templates.
//!
//! Supports the subset widget templates use: escaped and raw variables,
//! sections, inverted sections, comments, partials and dotted names. Set
//! delimiter tags are not supported.

use std::collections::HashMap;

use serde_json::Value;

use selleckt_core::logging::targets;

use crate::config::SellecktConfig;
use crate::error::{ConfigurationError, TemplateKind};

/// Name under which the item template is available as a partial.
pub const ITEM_PARTIAL: &str = "item";

/// Partials nested deeper than this render nothing.
const MAX_PARTIAL_DEPTH: usize = 32;

/// A template compilation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub message: String,
    /// Byte offset into the source.
    pub offset: usize,
}

impl SyntaxError {
    fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Text(String),
    Variable { name: String, escape: bool },
    Section {
        name: String,
        inverted: bool,
        children: Vec<Node>,
    },
    Partial(String),
}

/// A compiled template.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    source: String,
    nodes: Vec<Node>,
}

impl Template {
    /// Compile a template source.
    pub fn compile(source: &str) -> Result<Self, SyntaxError> {
        let mut parser = Parser { source, pos: 0 };
        let nodes = parser.parse_nodes(None)?;
        Ok(Self {
            source: source.to_string(),
            nodes,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Render with no partials.
    pub fn render(&self, data: &Value) -> String {
        self.render_with(data, &HashMap::new())
    }

    /// Render with named partials available to `{{> name}}` tags.
    pub fn render_with(&self, data: &Value, partials: &HashMap<String, Template>) -> String {
        let mut out = String::new();
        let mut stack = vec![data];
        render_nodes(&self.nodes, &mut stack, partials, 0, &mut out);
        out
    }

    /// Render with `inner` looked up before `outer`.
    fn render_nested(
        &self,
        outer: &Value,
        inner: &Value,
        partials: &HashMap<String, Template>,
    ) -> String {
        let mut out = String::new();
        let mut stack = vec![outer, inner];
        render_nodes(&self.nodes, &mut stack, partials, 0, &mut out);
        out
    }
}

struct Parser<'s> {
    source: &'s str,
    pos: usize,
}

impl<'s> Parser<'s> {
    /// Parse until end of input, or until the closing tag of `open` (name, offset).
    fn parse_nodes(&mut self, open: Option<(&str, usize)>) -> Result<Vec<Node>, SyntaxError> {
        let source = self.source;
        let mut nodes = Vec::new();

        loop {
            let rest = &source[self.pos..];
            let Some(tag_at) = rest.find("{{") else {
                if !rest.is_empty() {
                    nodes.push(Node::Text(rest.to_string()));
                }
                self.pos = source.len();
                return match open {
                    Some((name, offset)) => {
                        Err(SyntaxError::new(format!("unclosed section '{name}'"), offset))
                    }
                    None => Ok(nodes),
                };
            };

            if tag_at > 0 {
                nodes.push(Node::Text(rest[..tag_at].to_string()));
            }
            let tag_start = self.pos + tag_at;
            self.pos = tag_start + 2;

            if source[self.pos..].starts_with('{') {
                self.pos += 1;
                let name = self.read_tag_body(tag_start, "}}}")?;
                nodes.push(Node::Variable {
                    name: checked_name(name, tag_start)?,
                    escape: false,
                });
                continue;
            }

            let body = self.read_tag_body(tag_start, "}}")?;
            let (sigil, name) = match body.chars().next() {
                Some(c @ ('#' | '^' | '/' | '!' | '>' | '&' | '=')) => (Some(c), body[1..].trim()),
                _ => (None, body.trim()),
            };

            match sigil {
                Some('!') => {}
                Some('=') => {
                    return Err(SyntaxError::new("set delimiter tags are not supported", tag_start));
                }
                Some('#') | Some('^') => {
                    let name = checked_name(name, tag_start)?;
                    let children = self.parse_nodes(Some((&name, tag_start)))?;
                    nodes.push(Node::Section {
                        name,
                        inverted: sigil == Some('^'),
                        children,
                    });
                }
                Some('/') => {
                    return match open {
                        Some((expected, _)) if expected == name => Ok(nodes),
                        Some((expected, _)) => Err(SyntaxError::new(
                            format!("expected closing tag for '{expected}', found '{name}'"),
                            tag_start,
                        )),
                        None => Err(SyntaxError::new(
                            format!("closing tag '{name}' has no open section"),
                            tag_start,
                        )),
                    };
                }
                Some('>') => nodes.push(Node::Partial(checked_name(name, tag_start)?)),
                Some('&') => nodes.push(Node::Variable {
                    name: checked_name(name, tag_start)?,
                    escape: false,
                }),
                _ => nodes.push(Node::Variable {
                    name: checked_name(name, tag_start)?,
                    escape: true,
                }),
            }
        }
    }

    /// Consume a tag body up to and including `close`.
    fn read_tag_body(&mut self, tag_start: usize, close: &str) -> Result<&'s str, SyntaxError> {
        let source = self.source;
        let end = source[self.pos..]
            .find(close)
            .ok_or_else(|| SyntaxError::new("unterminated tag", tag_start))?;
        let body = &source[self.pos..self.pos + end];
        self.pos += end + close.len();
        Ok(body)
    }
}

fn checked_name(name: &str, offset: usize) -> Result<String, SyntaxError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(SyntaxError::new("empty tag name", offset));
    }
    Ok(name.to_string())
}

fn render_nodes<'v>(
    nodes: &[Node],
    stack: &mut Vec<&'v Value>,
    partials: &HashMap<String, Template>,
    depth: usize,
    out: &mut String,
) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Variable { name, escape } => {
                let text = lookup(stack, name).map(to_text).unwrap_or_default();
                if *escape {
                    out.push_str(&html_escape::encode_safe(&text));
                } else {
                    out.push_str(&text);
                }
            }
            Node::Section {
                name,
                inverted,
                children,
            } => {
                let value = lookup(stack, name);
                let truthy = value.is_some_and(is_truthy);
                if *inverted {
                    if !truthy {
                        render_nodes(children, stack, partials, depth, out);
                    }
                    continue;
                }
                let Some(value) = value.filter(|v| is_truthy(v)) else {
                    continue;
                };
                match value {
                    Value::Array(elements) => {
                        for element in elements {
                            stack.push(element);
                            render_nodes(children, stack, partials, depth, out);
                            stack.pop();
                        }
                    }
                    other => {
                        stack.push(other);
                        render_nodes(children, stack, partials, depth, out);
                        stack.pop();
                    }
                }
            }
            Node::Partial(name) => {
                if depth >= MAX_PARTIAL_DEPTH {
                    tracing::warn!(target: targets::TEMPLATE, partial = %name, "partial nesting too deep");
                    continue;
                }
                if let Some(partial) = partials.get(name) {
                    render_nodes(&partial.nodes, stack, partials, depth + 1, out);
                }
            }
        }
    }
}

/// Resolve a possibly dotted name against the context stack, innermost first.
fn lookup<'v>(stack: &[&'v Value], name: &str) -> Option<&'v Value> {
    if name == "." {
        return stack.last().copied();
    }
    let mut segments = name.split('.');
    let first = segments.next()?;
    let mut value = stack
        .iter()
        .rev()
        .find_map(|context| context.as_object().and_then(|o| o.get(first)))?;
    for segment in segments {
        value = value.as_object()?.get(segment)?;
    }
    Some(value)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(_) => true,
    }
}

fn to_text(value: &Value) -> String {
    match value {
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
    }
}

/// The main and item templates of one widget.
#[derive(Debug, Clone)]
pub struct TemplateSet {
    main: Template,
    partials: HashMap<String, Template>,
}

impl TemplateSet {
    /// Compile both templates from a configuration.
    pub fn from_config(config: &SellecktConfig) -> Result<Self, ConfigurationError> {
        let main = Template::compile(&config.main_template).map_err(|e| {
            ConfigurationError::template_syntax(TemplateKind::Main, e.message, e.offset)
        })?;
        let item = Template::compile(&config.item_template).map_err(|e| {
            ConfigurationError::template_syntax(TemplateKind::Item, e.message, e.offset)
        })?;
        let mut partials = HashMap::new();
        partials.insert(ITEM_PARTIAL.to_string(), item);
        Ok(Self { main, partials })
    }

    /// Render the whole widget from its view-model.
    pub fn render_main(&self, view: &Value) -> String {
        self.main.render_with(view, &self.partials)
    }

    /// Render one item with the view-model as the outer context.
    pub fn render_item(&self, view: &Value, item: &Value) -> String {
        match self.partials.get(ITEM_PARTIAL) {
            Some(template) => template.render_nested(view, item, &self.partials),
            None => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(source: &str, data: Value) -> String {
        Template::compile(source).unwrap().render(&data)
    }

    #[test]
    fn test_variables_escape() {
        assert_eq!(
            render("<b>{{name}}</b>", json!({"name": "<i>&"})),
            "<b>&lt;i&gt;&amp;</b>"
        );
        assert_eq!(render("{{{name}}}", json!({"name": "<i>"})), "<i>");
        assert_eq!(render("{{& name}}", json!({"name": "<i>"})), "<i>");
        assert_eq!(render("[{{missing}}]", json!({})), "[]");
        assert_eq!(render("{{n}} {{b}}", json!({"n": 3, "b": false})), "3 false");
    }

    #[test]
    fn test_sections() {
        let data = json!({"items": [{"v": 1}, {"v": 2}], "show": true, "none": []});
        assert_eq!(render("{{#items}}<{{v}}>{{/items}}", data.clone()), "<1><2>");
        assert_eq!(render("{{#show}}yes{{/show}}", data.clone()), "yes");
        assert_eq!(render("{{#none}}x{{/none}}{{^none}}empty{{/none}}", data), "empty");
    }

    #[test]
    fn test_context_stack_lookup() {
        let data = json!({"cls": "item", "items": [{"label": "a"}, {"label": "b", "cls": "own"}]});
        assert_eq!(
            render("{{#items}}{{cls}}:{{label}} {{/items}}", data),
            "item:a own:b "
        );
    }

    #[test]
    fn test_dotted_names_and_comments() {
        let data = json!({"item": {"data": {"colour": "red"}}});
        assert_eq!(render("{{! note }}{{item.data.colour}}", data.clone()), "red");
        assert_eq!(render("{{#item.data}}{{colour}}{{/item.data}}", data), "red");
    }

    #[test]
    fn test_partials() {
        let mut partials = HashMap::new();
        partials.insert(
            "item".to_string(),
            Template::compile("<li>{{label}}</li>").unwrap(),
        );
        let main = Template::compile("<ul>{{#items}}{{> item}}{{/items}}</ul>").unwrap();
        let out = main.render_with(&json!({"items": [{"label": "x"}, {"label": "y"}]}), &partials);
        assert_eq!(out, "<ul><li>x</li><li>y</li></ul>");
    }

    #[test]
    fn test_recursive_partial_is_bounded() {
        let mut partials = HashMap::new();
        partials.insert("loop".to_string(), Template::compile("x{{> loop}}").unwrap());
        let out = Template::compile("{{> loop}}")
            .unwrap()
            .render_with(&json!({}), &partials);
        assert_eq!(out.len(), MAX_PARTIAL_DEPTH);
    }

    #[test]
    fn test_syntax_errors() {
        assert_eq!(
            Template::compile("{{#a}}x").unwrap_err().message,
            "unclosed section 'a'"
        );
        assert!(Template::compile("{{#a}}{{/b}}").is_err());
        assert!(Template::compile("{{/a}}").is_err());
        assert!(Template::compile("{{name").is_err());
        assert!(Template::compile("{{}}").is_err());
        assert!(Template::compile("{{=<% %>=}}").is_err());
    }

    #[test]
    fn test_template_set_renders_item_in_outer_context() {
        let config = SellecktConfig::default();
        let set = TemplateSet::from_config(&config).unwrap();
        let view = json!({"itemClass": "option", "itemTextClass": "text"});
        let item = json!({"value": "1", "label": "One"});
        let out = set.render_item(&view, &item);
        assert!(out.contains("class=\"option\""));
        assert!(out.contains("data-value=\"1\""));
        assert!(out.contains(">One<"));
    }
}
