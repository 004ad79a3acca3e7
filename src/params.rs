//! Directive parameter parsing.
//!
//! Parameter blocks are loose, JSON-like objects written inside a directive
//! call, e.g. `scale({ prefix: "gap", pairs: { "sm": [16, 24] } })`. The
//! parser builds a [`ParamMap`] from the token stream and the typed
//! extractors below read the keys they know. Unknown keys are kept in the
//! map and never raise an error.

use crate::error::{RulerError, RulerResult};
use crate::scale::SizePair;
use crate::tokenizer::{Token, TokenKind};
use crate::utility::UtilityConfig;

#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// Bare word: numbers, `true`/`false`, identifiers.
    Word(String),
    /// Quoted string with the quotes removed.
    Text(String),
    List(Vec<ParamValue>),
    Map(ParamMap),
}

impl ParamValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Word(value) | ParamValue::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        parse_number(self.as_str()?)
    }

    /// Only the literal text `true` counts as true.
    pub fn is_true(&self) -> bool {
        self.as_str() == Some("true")
    }
}

/// Insertion-ordered key/value pairs. Re-inserting a key keeps its first
/// position and replaces the value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParamMap {
    entries: Vec<(String, ParamValue)>,
}

impl ParamMap {
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }

    pub fn insert(&mut self, key: String, value: ParamValue) {
        if let Some(slot) = self.entries.iter_mut().find(|(name, _)| *name == key) {
            slot.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }
}

/// Parses the arguments of a directive call into a map. Accepts either a
/// braced object or bare `key: value` members.
pub fn parse_params(tokens: &[Token]) -> ParamMap {
    let mut parser = ParamParser { tokens, pos: 0 };
    parser.parse_document()
}

struct ParamParser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> ParamParser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn skip_dividers(&mut self) {
        while self
            .peek()
            .is_some_and(|token| token.kind == TokenKind::Div)
        {
            self.pos += 1;
        }
    }

    fn parse_document(&mut self) -> ParamMap {
        let mut map = ParamMap::default();
        self.skip_dividers();
        if self.peek().is_some_and(|token| token.is_punct('{')) {
            self.pos += 1;
            self.parse_members(&mut map, Some('}'));
        }
        self.parse_members(&mut map, None);
        map
    }

    fn parse_members(&mut self, map: &mut ParamMap, close: Option<char>) {
        loop {
            self.skip_dividers();
            let Some(token) = self.peek() else {
                return;
            };
            if let Some(close) = close {
                if token.is_punct(close) {
                    self.pos += 1;
                    return;
                }
            }

            self.pos += 1;
            let key = match token.kind {
                TokenKind::Word | TokenKind::String => token.value.clone(),
                _ => continue,
            };

            while self.peek().is_some_and(|token| token.is_div(':')) {
                self.pos += 1;
            }

            if let Some(value) = self.parse_value() {
                map.insert(key, value);
            }
        }
    }

    fn parse_value(&mut self) -> Option<ParamValue> {
        let token = self.peek()?;
        let value = match token.kind {
            TokenKind::Word => ParamValue::Word(token.value.clone()),
            TokenKind::String => ParamValue::Text(token.value.clone()),
            TokenKind::Function => ParamValue::Word(token.to_text()),
            TokenKind::Div => return None,
            TokenKind::Punct => {
                if token.is_punct('{') {
                    self.pos += 1;
                    let mut nested = ParamMap::default();
                    self.parse_members(&mut nested, Some('}'));
                    return Some(ParamValue::Map(nested));
                }
                if token.is_punct('[') {
                    self.pos += 1;
                    return Some(ParamValue::List(self.parse_list()));
                }
                return None;
            }
        };
        self.pos += 1;
        Some(value)
    }

    fn parse_list(&mut self) -> Vec<ParamValue> {
        let mut items = Vec::new();
        loop {
            self.skip_dividers();
            let Some(token) = self.peek() else {
                return items;
            };
            if token.is_punct(']') {
                self.pos += 1;
                return items;
            }
            if token.is_punct('}') {
                return items;
            }
            match self.parse_value() {
                Some(value) => items.push(value),
                None => self.pos += 1,
            }
        }
    }
}

pub fn parse_number(text: &str) -> Option<f64> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Scale directive keys as written; width and cross-pair defaults are
/// resolved against the run options later.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScaleParams {
    pub min_width: Option<f64>,
    pub max_width: Option<f64>,
    pub prefix: Option<String>,
    pub generate_all_cross_pairs: Option<bool>,
    pub pairs: Vec<SizePair>,
}

pub fn extract_scale_params(map: &ParamMap) -> RulerResult<ScaleParams> {
    Ok(ScaleParams {
        min_width: extract_width(map, "minWidth")?,
        max_width: extract_width(map, "maxWidth")?,
        prefix: map
            .get("prefix")
            .and_then(ParamValue::as_str)
            .filter(|prefix| !prefix.is_empty())
            .map(str::to_string),
        generate_all_cross_pairs: map.get("generateAllCrossPairs").map(ParamValue::is_true),
        pairs: map.get("pairs").map(extract_pairs).unwrap_or_default(),
    })
}

fn extract_width(map: &ParamMap, key: &str) -> RulerResult<Option<f64>> {
    let Some(value) = map.get(key) else {
        return Ok(None);
    };
    value.as_number().map(Some).ok_or_else(|| {
        RulerError::configuration(format!(
            "{} must be a number, got {}",
            key,
            describe_value(value)
        ))
    })
}

/// Each pair keeps its first two numbers. Extra numbers are dropped and
/// entries with fewer than two are skipped.
pub fn extract_pairs(value: &ParamValue) -> Vec<SizePair> {
    let ParamValue::Map(map) = value else {
        return Vec::new();
    };

    let mut pairs = Vec::new();
    for (name, value) in map.iter() {
        let mut numbers = Vec::with_capacity(2);
        collect_numbers(value, &mut numbers);
        if let &[min, max, ..] = numbers.as_slice() {
            pairs.push(SizePair::new(name, min, max));
        }
    }
    pairs
}

fn collect_numbers(value: &ParamValue, out: &mut Vec<f64>) {
    match value {
        ParamValue::List(items) => {
            for item in items {
                collect_numbers(item, out);
            }
        }
        ParamValue::Map(_) => {}
        scalar => {
            if let Some(number) = scalar.as_number() {
                out.push(number);
            }
        }
    }
}

pub fn extract_utility_params(map: &ParamMap) -> UtilityConfig {
    let properties = match map.get("property") {
        Some(ParamValue::List(items)) => items
            .iter()
            .filter_map(ParamValue::as_str)
            .filter(|property| !property.is_empty())
            .map(str::to_string)
            .collect(),
        Some(value) => value
            .as_str()
            .filter(|property| !property.is_empty())
            .map(|property| vec![property.to_string()])
            .unwrap_or_default(),
        None => Vec::new(),
    };

    UtilityConfig {
        selector_pattern: non_empty_string(map, "selector"),
        attribute: map
            .get("attribute")
            .map(|value| value.as_str().unwrap_or_default().to_string()),
        properties,
        scale_name: non_empty_string(map, "scale"),
        generate_all_cross_pairs: map.get("generateAllCrossPairs").map(ParamValue::is_true),
        low_specificity: map.get("lowSpecificity").map(ParamValue::is_true),
    }
}

fn non_empty_string(map: &ParamMap, key: &str) -> Option<String> {
    map.get(key)
        .and_then(ParamValue::as_str)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn describe_value(value: &ParamValue) -> String {
    match value {
        ParamValue::Word(text) => text.clone(),
        ParamValue::Text(text) => format!("\"{}\"", text),
        ParamValue::List(_) => "a list".to_string(),
        ParamValue::Map(_) => "an object".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ParamValue, extract_scale_params, extract_utility_params, parse_number, parse_params,
    };
    use crate::scale::SizePair;
    use crate::tokenizer::tokenize;

    fn params(text: &str) -> super::ParamMap {
        parse_params(&tokenize(text))
    }

    #[test]
    fn parses_braced_object_with_nested_pairs() {
        let map = params(
            r#"{ minWidth: 320, maxWidth: 1760, prefix: "space", pairs: { "xs": [8, 16], "sm": [16, 24] } }"#,
        );
        assert_eq!(map.get("minWidth"), Some(&ParamValue::Word("320".to_string())));
        assert_eq!(map.get("prefix"), Some(&ParamValue::Text("space".to_string())));
        let Some(ParamValue::Map(pairs)) = map.get("pairs") else {
            panic!("pairs should be a map");
        };
        assert_eq!(
            pairs.iter().map(|(name, _)| name).collect::<Vec<_>>(),
            vec!["xs", "sm"]
        );
    }

    #[test]
    fn accepts_members_without_braces() {
        let map = params(r#"selector: ".p", scale: "space""#);
        assert_eq!(map.get("selector").and_then(ParamValue::as_str), Some(".p"));
        assert_eq!(map.get("scale").and_then(ParamValue::as_str), Some("space"));
    }

    #[test]
    fn duplicate_keys_keep_first_position_and_last_value() {
        let map = params("{ a: 1, b: 2, a: 3 }");
        let keys = map.iter().map(|(key, _)| key).collect::<Vec<_>>();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(map.get("a").and_then(ParamValue::as_number), Some(3.0));
    }

    #[test]
    fn stray_separators_are_ignored() {
        let map = params("{ , minWidth:: 400,, maxWidth 900 , }");
        assert_eq!(map.get("minWidth").and_then(ParamValue::as_number), Some(400.0));
        assert_eq!(map.get("maxWidth").and_then(ParamValue::as_number), Some(900.0));
    }

    #[test]
    fn scale_params_ignore_unknown_keys() {
        let map = params(
            r#"{ prefix: "gap", futureOption: [1, 2, 3], pairs: { "sm": [16, 24] }, flavour: "x" }"#,
        );
        let scale = extract_scale_params(&map).expect("scale params should parse");
        assert_eq!(scale.prefix.as_deref(), Some("gap"));
        assert_eq!(scale.pairs, vec![SizePair::new("sm", 16.0, 24.0)]);
        assert_eq!(scale.min_width, None);
        assert_eq!(scale.generate_all_cross_pairs, None);
    }

    #[test]
    fn pairs_truncate_extra_numbers_and_drop_short_entries() {
        let map = params(r#"{ pairs: { "a": [1, 2, 3], "b": [4], "c": [x, 5, 6], "d": [7, 8] } }"#);
        let scale = extract_scale_params(&map).expect("scale params should parse");
        assert_eq!(
            scale.pairs,
            vec![
                SizePair::new("a", 1.0, 2.0),
                SizePair::new("c", 5.0, 6.0),
                SizePair::new("d", 7.0, 8.0),
            ]
        );
    }

    #[test]
    fn missing_pairs_yield_empty_list() {
        let map = params("{ minWidth: 320 }");
        let scale = extract_scale_params(&map).expect("scale params should parse");
        assert!(scale.pairs.is_empty());
    }

    #[test]
    fn non_numeric_width_is_rejected() {
        let map = params(r#"{ minWidth: "wide", pairs: { "a": [1, 2] } }"#);
        let err = extract_scale_params(&map).expect_err("width must be numeric");
        assert!(err.to_string().contains("minWidth must be a number"));
    }

    #[test]
    fn boolean_flags_only_accept_literal_true() {
        let map = params(r#"{ generateAllCrossPairs: true, lowSpecificity: yes }"#);
        let utility = extract_utility_params(&map);
        assert_eq!(utility.generate_all_cross_pairs, Some(true));
        assert_eq!(utility.low_specificity, Some(false));

        let quoted = params(r#"{ generateAllCrossPairs: "true" }"#);
        let scale = extract_scale_params(&quoted).expect("scale params should parse");
        assert_eq!(scale.generate_all_cross_pairs, Some(true));
    }

    #[test]
    fn utility_property_accepts_scalar_or_list() {
        let single = extract_utility_params(&params(r#"{ property: "gap" }"#));
        assert_eq!(single.properties, vec!["gap".to_string()]);

        let many = extract_utility_params(&params(
            r#"{ property: ["padding-inline", "padding-block"], selector: ".p" }"#,
        ));
        assert_eq!(
            many.properties,
            vec!["padding-inline".to_string(), "padding-block".to_string()]
        );
        assert_eq!(many.selector_pattern.as_deref(), Some(".p"));
    }

    #[test]
    fn utility_keeps_empty_attribute_for_validation() {
        let utility = extract_utility_params(&params(r#"{ attribute: "", scale: "space" }"#));
        assert_eq!(utility.attribute.as_deref(), Some(""));
        assert_eq!(utility.selector_pattern, None);
    }

    #[test]
    fn parse_number_rejects_non_finite_text() {
        assert_eq!(parse_number(" 12.5 "), Some(12.5));
        assert_eq!(parse_number("-3"), Some(-3.0));
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("12px"), None);
    }
}
