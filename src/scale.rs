use std::collections::BTreeMap;

use crate::config::RunOptions;
use crate::error::{RulerError, RulerResult};
use crate::fluid::{ClampRange, calculate_clamp};
use crate::params::ScaleParams;
use crate::stylesheet::Declaration;

pub const DEFAULT_PREFIX: &str = "space";

/// A named min/max size in pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct SizePair {
    pub name: String,
    pub min_size: f64,
    pub max_size: f64,
}

impl SizePair {
    pub fn new(name: impl Into<String>, min_size: f64, max_size: f64) -> Self {
        Self {
            name: name.into(),
            min_size,
            max_size,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScaleConfig {
    pub min_width: f64,
    pub max_width: f64,
    pub prefix: String,
    pub generate_all_cross_pairs: bool,
    pub pairs: Vec<SizePair>,
}

impl ScaleConfig {
    /// Fills unset keys from the run options. A scale without pairs is an
    /// error.
    pub fn from_params(params: ScaleParams, options: &RunOptions) -> RulerResult<Self> {
        if params.pairs.is_empty() {
            return Err(RulerError::configuration(
                "scale() requires a pairs parameter: no pairs defined",
            ));
        }

        Ok(Self {
            min_width: params.min_width.unwrap_or(options.min_width),
            max_width: params.max_width.unwrap_or(options.max_width),
            prefix: params
                .prefix
                .unwrap_or_else(|| DEFAULT_PREFIX.to_string()),
            generate_all_cross_pairs: params
                .generate_all_cross_pairs
                .unwrap_or(options.generate_all_cross_pairs),
            pairs: params.pairs,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaleEntry {
    pub label: String,
    pub rendered: String,
}

impl ScaleEntry {
    /// Cross pair labels are `<smaller>-<larger>`, so any hyphen marks one.
    /// Pair names containing a hyphen are indistinguishable from cross pairs.
    pub fn is_cross_pair(&self) -> bool {
        self.label.contains('-')
    }
}

/// Base entries in definition order, then (when enabled) one entry per
/// unordered pair spanning the smaller pair's minimum to the larger pair's
/// maximum.
pub fn generate_clamps(config: &ScaleConfig) -> RulerResult<Vec<ScaleEntry>> {
    let clamp = |min_size: f64, max_size: f64| {
        calculate_clamp(ClampRange::new(
            min_size,
            max_size,
            config.min_width,
            config.max_width,
        ))
    };

    let mut entries = Vec::with_capacity(config.pairs.len());
    for pair in &config.pairs {
        entries.push(ScaleEntry {
            label: pair.name.clone(),
            rendered: clamp(pair.min_size, pair.max_size)?,
        });
    }

    if config.generate_all_cross_pairs {
        for (idx, first) in config.pairs.iter().enumerate() {
            for second in &config.pairs[idx + 1..] {
                let (smaller, larger) = if second.min_size < first.min_size {
                    (second, first)
                } else {
                    (first, second)
                };
                entries.push(ScaleEntry {
                    label: format!("{}-{}", smaller.name, larger.name),
                    rendered: clamp(smaller.min_size, larger.max_size)?,
                });
            }
        }
    }

    Ok(entries)
}

/// Scales known to one run, keyed by prefix.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScaleRegistry {
    scales: BTreeMap<String, Vec<ScaleEntry>>,
}

impl ScaleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, prefix: &str) -> Option<&[ScaleEntry]> {
        self.scales.get(prefix).map(Vec::as_slice)
    }

    pub fn contains(&self, prefix: &str) -> bool {
        self.scales.contains_key(prefix)
    }

    /// Stores `entries` under `prefix`, replacing any earlier scale.
    pub fn register(&mut self, prefix: impl Into<String>, entries: Vec<ScaleEntry>) {
        self.scales.insert(prefix.into(), entries);
    }

    /// Compiles and registers a scale, returning one `--<prefix>-<label>`
    /// custom property per entry.
    pub fn compile(&mut self, config: &ScaleConfig) -> RulerResult<Vec<Declaration>> {
        let entries = generate_clamps(config)?;
        let declarations = entries
            .iter()
            .map(|entry| {
                Declaration::new(
                    format!("--{}-{}", config.prefix, entry.label),
                    entry.rendered.clone(),
                )
            })
            .collect();
        tracing::debug!(
            prefix = %config.prefix,
            entries = entries.len(),
            "compiled scale"
        );
        self.register(config.prefix.clone(), entries);
        Ok(declarations)
    }

    pub fn len(&self) -> usize {
        self.scales.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scales.is_empty()
    }
}
