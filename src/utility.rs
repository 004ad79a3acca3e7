use crate::config::RunOptions;
use crate::error::{RulerError, RulerResult};
use crate::scale::{ScaleEntry, ScaleRegistry};
use crate::stylesheet::{Declaration, Node, Rule};

/// Parameters of one `utility()` directive. `None` flags inherit the run
/// options.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UtilityConfig {
    pub selector_pattern: Option<String>,
    pub attribute: Option<String>,
    pub properties: Vec<String>,
    pub scale_name: Option<String>,
    pub generate_all_cross_pairs: Option<bool>,
    pub low_specificity: Option<bool>,
}

/// How a utility turns an entry label into a selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorKind<'a> {
    /// `[data-x="label"]`, optionally prefixed by the selector pattern.
    /// Values reference the scale's custom properties.
    Attribute {
        base: Option<&'a str>,
        attribute: &'a str,
    },
    /// Pattern ending in ` &`: the entry selector nests under the parent.
    ParentContext { parent: &'a str },
    /// Class, id or element pattern suffixed with `-label`.
    Suffixed { pattern: &'a str },
}

impl<'a> SelectorKind<'a> {
    pub fn classify(selector_pattern: Option<&'a str>, attribute: Option<&'a str>) -> Option<Self> {
        if let Some(attribute) = attribute {
            return Some(SelectorKind::Attribute {
                base: selector_pattern,
                attribute,
            });
        }
        let pattern = selector_pattern?;
        if let Some(parent) = pattern.strip_suffix('&') {
            if parent.ends_with(char::is_whitespace) {
                return Some(SelectorKind::ParentContext { parent });
            }
        }
        Some(SelectorKind::Suffixed { pattern })
    }

    pub fn render(&self, label: &str, low_specificity: bool) -> String {
        match self {
            SelectorKind::Attribute { base, attribute } => {
                let selector = format!(
                    "{}[{}=\"{}\"]",
                    base.unwrap_or_default(),
                    attribute,
                    label
                );
                wrap_where(selector, low_specificity)
            }
            SelectorKind::ParentContext { parent } => {
                let nested = wrap_where(format!("&-{}", label), low_specificity);
                format!("{}{}", parent, nested)
            }
            SelectorKind::Suffixed { pattern } => {
                wrap_where(format!("{}-{}", pattern, label), low_specificity)
            }
        }
    }

    pub fn value(&self, scale_name: &str, entry: &ScaleEntry) -> String {
        match self {
            SelectorKind::Attribute { .. } => format!("var(--{}-{})", scale_name, entry.label),
            _ => entry.rendered.clone(),
        }
    }
}

fn wrap_where(selector: String, low_specificity: bool) -> String {
    if low_specificity {
        format!(":where({})", selector)
    } else {
        selector
    }
}

/// Generates one rule per selected scale entry, each carrying one
/// declaration per property in the given order.
pub fn expand(
    config: &UtilityConfig,
    registry: &ScaleRegistry,
    options: &RunOptions,
) -> RulerResult<Vec<Rule>> {
    validate(config)?;

    let scale_name = config.scale_name.as_deref().unwrap_or_default();
    let entries = registry.get(scale_name).ok_or_else(|| {
        RulerError::configuration(format!(
            "Scale \"{}\" not found. Define it with scale() first.",
            scale_name
        ))
    })?;

    let kind = SelectorKind::classify(config.selector_pattern.as_deref(), config.attribute.as_deref())
        .ok_or_else(missing_selector)?;
    let low_specificity = config.low_specificity.unwrap_or(options.low_specificity);
    let include_cross_pairs = config
        .generate_all_cross_pairs
        .unwrap_or(options.generate_all_cross_pairs);

    let rules = entries
        .iter()
        .filter(|entry| include_cross_pairs || !entry.is_cross_pair())
        .map(|entry| {
            let value = kind.value(scale_name, entry);
            let nodes = config
                .properties
                .iter()
                .map(|property| Node::Declaration(Declaration::new(property.clone(), value.clone())))
                .collect();
            Rule {
                selector: kind.render(&entry.label, low_specificity),
                nodes,
            }
        })
        .collect::<Vec<_>>();

    tracing::debug!(
        scale = scale_name,
        rules = rules.len(),
        "expanded utility"
    );
    Ok(rules)
}

fn validate(config: &UtilityConfig) -> RulerResult<()> {
    if let Some(attribute) = config.attribute.as_deref() {
        if attribute.is_empty() {
            return Err(RulerError::configuration(
                "utility() attribute parameter cannot be empty",
            ));
        }
        if !attribute
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
        {
            return Err(RulerError::configuration(format!(
                "utility() attribute \"{}\" must contain only letters, numbers, hyphens, and underscores",
                attribute
            )));
        }
    }
    if config.selector_pattern.is_none() && config.attribute.is_none() {
        return Err(missing_selector());
    }
    if config.properties.is_empty() {
        return Err(RulerError::configuration(
            "utility() requires a property parameter",
        ));
    }
    if config.scale_name.is_none() {
        return Err(RulerError::configuration(
            "utility() requires a scale parameter",
        ));
    }
    Ok(())
}

fn missing_selector() -> RulerError {
    RulerError::configuration("utility() requires either selector or attribute parameter")
}
