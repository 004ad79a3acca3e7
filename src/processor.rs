//! One processing run: run options plus the scale registry, applied to
//! stylesheets in document order.

use crate::config::{Config, RunOptions};
use crate::error::{RulerError, RulerResult};
use crate::params::{extract_scale_params, extract_utility_params, parse_params};
use crate::rewrite::{FLUID_CALL_MARKER, rewrite_fluid_calls};
use crate::scale::{ScaleConfig, ScaleRegistry};
use crate::stylesheet::{self, AtRule, Node, Stylesheet};
use crate::tokenizer::{TokenKind, tokenize};
use crate::utility;

pub const DIRECTIVE_NAME: &str = "ruler";

/// Scales defined by one stylesheet stay visible to the stylesheets
/// processed after it by the same `Processor`.
#[derive(Debug, Clone)]
pub struct Processor {
    options: RunOptions,
    registry: ScaleRegistry,
}

impl Processor {
    /// Starts a run, compiling every configured scale into the registry.
    pub fn new(config: &Config) -> RulerResult<Self> {
        let mut registry = ScaleRegistry::new();
        for scale in config.scale_configs()? {
            registry.compile(&scale)?;
        }
        if !registry.is_empty() {
            tracing::debug!(scales = registry.len(), "pre-seeded configured scales");
        }
        Ok(Self {
            options: config.run_options(),
            registry,
        })
    }

    pub fn with_options(options: RunOptions) -> Self {
        Self {
            options,
            registry: ScaleRegistry::new(),
        }
    }

    pub fn registry(&self) -> &ScaleRegistry {
        &self.registry
    }

    pub fn process_css(&mut self, css: &str, minify: bool) -> RulerResult<String> {
        let mut sheet = stylesheet::parse(css)?;
        self.process(&mut sheet)?;
        Ok(sheet.to_css(minify))
    }

    pub fn process(&mut self, sheet: &mut Stylesheet) -> RulerResult<()> {
        self.process_nodes(&mut sheet.nodes)
    }

    fn process_nodes(&mut self, nodes: &mut Vec<Node>) -> RulerResult<()> {
        let mut idx = 0usize;
        while idx < nodes.len() {
            let replacement = match &mut nodes[idx] {
                Node::AtRule(at_rule) if at_rule.name == DIRECTIVE_NAME => {
                    Some(self.run_directive(at_rule)?)
                }
                Node::AtRule(at_rule) => {
                    if let Some(children) = at_rule.nodes.as_mut() {
                        self.process_nodes(children)?;
                    }
                    None
                }
                Node::Rule(rule) => {
                    self.process_nodes(&mut rule.nodes)?;
                    None
                }
                Node::Declaration(decl) => {
                    if decl.value.contains(FLUID_CALL_MARKER) {
                        if let Some(value) = rewrite_fluid_calls(&decl.value, &self.options)? {
                            decl.value = value;
                        }
                    }
                    None
                }
            };

            match replacement {
                Some(generated) => {
                    let count = generated.len();
                    nodes.splice(idx..=idx, generated);
                    idx += count;
                }
                None => idx += 1,
            }
        }
        Ok(())
    }

    fn run_directive(&mut self, at_rule: &AtRule) -> RulerResult<Vec<Node>> {
        let tokens = tokenize(&at_rule.params);
        let Some(call) = tokens
            .into_iter()
            .find(|token| token.kind == TokenKind::Function)
        else {
            return Err(RulerError::configuration(format!(
                "@{} expects scale() or utility(), got \"{}\"",
                DIRECTIVE_NAME, at_rule.params
            )));
        };
        let params = parse_params(&call.nodes);

        match call.value.as_str() {
            "scale" => {
                let scale = ScaleConfig::from_params(extract_scale_params(&params)?, &self.options)?;
                let declarations = self.registry.compile(&scale)?;
                Ok(declarations.into_iter().map(Node::Declaration).collect())
            }
            "utility" => {
                let config = extract_utility_params(&params);
                let rules = utility::expand(&config, &self.registry, &self.options)?;
                Ok(rules.into_iter().map(Node::Rule).collect())
            }
            other => Err(RulerError::configuration(format!(
                "unknown @{} directive \"{}\"",
                DIRECTIVE_NAME, other
            ))),
        }
    }
}
