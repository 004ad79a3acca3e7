//! Minimal stylesheet tree: enough structure to find directives, replace
//! them with generated nodes, and print the result back out.
//!
//! Parsing is built on `cssparser`, so escapes, strings and nested blocks
//! follow the CSS syntax spec. Selectors, at-rule preludes and declaration
//! values are kept as their source text.

use cssparser::{
    AtRuleParser, CowRcStr, DeclarationParser, ParseError as CssParseError, Parser, ParserInput,
    ParserState, QualifiedRuleParser, RuleBodyItemParser, RuleBodyParser,
};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Stylesheet {
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Rule(Rule),
    AtRule(AtRule),
    Declaration(Declaration),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub selector: String,
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtRule {
    pub name: String,
    pub params: String,
    /// `None` for statement at-rules ending in `;`.
    pub nodes: Option<Vec<Node>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub property: String,
    pub value: String,
    pub important: bool,
}

impl Declaration {
    pub fn new(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            value: value.into(),
            important: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} at line {line}, column {column}")]
pub struct ParseError {
    pub message: String,
    pub line: u32,
    pub column: u32,
}

/// At-rules whose block holds descriptors rather than rules.
const DESCRIPTOR_AT_RULES: &[&str] = &[
    "font-face",
    "page",
    "property",
    "counter-style",
    "font-palette-values",
];

pub fn parse(css: &str) -> Result<Stylesheet, ParseError> {
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);
    let mut builder = TreeBuilder {
        body: BodyKind::Rules,
    };

    let mut nodes = Vec::new();
    for item in cssparser::StyleSheetParser::new(&mut parser, &mut builder) {
        nodes.push(item.map_err(|(err, text)| syntax_error(&err, text))?);
    }
    Ok(Stylesheet { nodes })
}

fn syntax_error(err: &CssParseError<'_, ()>, text: &str) -> ParseError {
    let snippet = text.lines().next().unwrap_or_default().trim();
    ParseError {
        message: format!("invalid CSS \"{}\"", snippet),
        line: err.location.line + 1,
        column: err.location.column,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    /// Top level, `@media`, `@supports` and friends.
    Rules,
    /// Style rule bodies: declarations plus nested rules.
    Mixed,
    /// `@font-face` and other descriptor blocks.
    Declarations,
}

impl BodyKind {
    fn for_at_rule(self, name: &str) -> BodyKind {
        if self == BodyKind::Mixed {
            return BodyKind::Mixed;
        }
        let name = name.to_ascii_lowercase();
        if DESCRIPTOR_AT_RULES.contains(&name.as_str()) {
            BodyKind::Declarations
        } else {
            BodyKind::Rules
        }
    }
}

struct TreeBuilder {
    body: BodyKind,
}

fn parse_body<'i>(
    input: &mut Parser<'i, '_>,
    body: BodyKind,
) -> Result<Vec<Node>, CssParseError<'i, ()>> {
    let mut builder = TreeBuilder { body };
    let mut nodes = Vec::new();
    for item in RuleBodyParser::new(input, &mut builder) {
        nodes.push(item.map_err(|(err, _)| err)?);
    }
    Ok(nodes)
}

/// Consumes the rest of `input` and returns its source text.
fn consume_source<'i>(input: &mut Parser<'i, '_>) -> String {
    let start = input.position();
    while input.next().is_ok() {}
    input.slice_from(start).trim().to_string()
}

impl<'i> QualifiedRuleParser<'i> for TreeBuilder {
    type Prelude = String;
    type QualifiedRule = Node;
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, CssParseError<'i, Self::Error>> {
        Ok(consume_source(input))
    }

    fn parse_block<'t>(
        &mut self,
        selector: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::QualifiedRule, CssParseError<'i, Self::Error>> {
        let nodes = parse_body(input, BodyKind::Mixed)?;
        Ok(Node::Rule(Rule { selector, nodes }))
    }
}

impl<'i> AtRuleParser<'i> for TreeBuilder {
    type Prelude = (String, String);
    type AtRule = Node;
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, CssParseError<'i, Self::Error>> {
        Ok((name.to_string(), consume_source(input)))
    }

    fn rule_without_block(
        &mut self,
        (name, params): Self::Prelude,
        _start: &ParserState,
    ) -> Result<Self::AtRule, ()> {
        Ok(Node::AtRule(AtRule {
            name,
            params,
            nodes: None,
        }))
    }

    fn parse_block<'t>(
        &mut self,
        (name, params): Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::AtRule, CssParseError<'i, Self::Error>> {
        let nodes = parse_body(input, self.body.for_at_rule(&name))?;
        Ok(Node::AtRule(AtRule {
            name,
            params,
            nodes: Some(nodes),
        }))
    }
}

impl<'i> DeclarationParser<'i> for TreeBuilder {
    type Declaration = Node;
    type Error = ();

    fn parse_value<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Declaration, CssParseError<'i, Self::Error>> {
        let start = input.position();
        let mut end = start;
        let mut important = false;

        while !input.is_exhausted() {
            let trailing_important = input.try_parse(|input| {
                cssparser::parse_important(input)?;
                input.expect_exhausted()
            });
            if trailing_important.is_ok() {
                important = true;
                break;
            }
            input.next()?;
            end = input.position();
        }

        Ok(Node::Declaration(Declaration {
            property: name.to_string(),
            value: input.slice(start..end).trim().to_string(),
            important,
        }))
    }
}

impl<'i> RuleBodyItemParser<'i, Node, ()> for TreeBuilder {
    fn parse_declarations(&self) -> bool {
        self.body != BodyKind::Rules
    }

    fn parse_qualified(&self) -> bool {
        self.body != BodyKind::Declarations
    }
}

impl Stylesheet {
    pub fn to_css(&self, minify: bool) -> String {
        let mut out = String::new();
        if minify {
            write_minified(&mut out, &self.nodes);
        } else {
            write_pretty(&mut out, &self.nodes, 0);
        }
        out
    }
}

fn at_rule_header(at_rule: &AtRule) -> String {
    if at_rule.params.is_empty() {
        format!("@{}", at_rule.name)
    } else {
        format!("@{} {}", at_rule.name, at_rule.params)
    }
}

fn write_pretty(out: &mut String, nodes: &[Node], depth: usize) {
    let indent = "  ".repeat(depth);
    for node in nodes {
        match node {
            Node::Rule(rule) => {
                write_pretty_block(out, &indent, &rule.selector, &rule.nodes, depth);
            }
            Node::AtRule(at_rule) => {
                let header = at_rule_header(at_rule);
                match &at_rule.nodes {
                    Some(children) => write_pretty_block(out, &indent, &header, children, depth),
                    None => out.push_str(&format!("{}{};\n", indent, header)),
                }
            }
            Node::Declaration(decl) => {
                out.push_str(&format!(
                    "{}{}: {}{};\n",
                    indent,
                    decl.property,
                    decl.value,
                    if decl.important { " !important" } else { "" }
                ));
            }
        }
    }
}

fn write_pretty_block(out: &mut String, indent: &str, header: &str, children: &[Node], depth: usize) {
    if children.is_empty() {
        out.push_str(&format!("{}{} {{}}\n", indent, header));
        return;
    }
    out.push_str(&format!("{}{} {{\n", indent, header));
    write_pretty(out, children, depth + 1);
    out.push_str(&format!("{}}}\n", indent));
}

fn write_minified(out: &mut String, nodes: &[Node]) {
    let mut parts = Vec::<String>::new();
    for node in nodes {
        match node {
            Node::Rule(rule) => {
                let mut body = String::new();
                write_minified(&mut body, &rule.nodes);
                parts.push(format!("{}{{{}}}", rule.selector, body));
            }
            Node::AtRule(at_rule) => {
                let header = at_rule_header(at_rule);
                match &at_rule.nodes {
                    Some(children) => {
                        let mut body = String::new();
                        write_minified(&mut body, children);
                        parts.push(format!("{}{{{}}}", header, body));
                    }
                    None => parts.push(format!("{};", header)),
                }
            }
            Node::Declaration(decl) => {
                parts.push(format!(
                    "{}:{}{};",
                    decl.property,
                    decl.value,
                    if decl.important { "!important" } else { "" }
                ));
            }
        }
    }
    let joined = parts.concat();
    out.push_str(joined.strip_suffix(';').unwrap_or(&joined));
}
