use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{RulerError, RulerResult};
use crate::params::parse_number;
use crate::scale::{ScaleConfig, SizePair};

pub const DEFAULT_MIN_WIDTH: f64 = 320.0;
pub const DEFAULT_MAX_WIDTH: f64 = 1760.0;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    #[serde(default = "default_min_width", alias = "minWidth")]
    pub min_width: f64,
    #[serde(default = "default_max_width", alias = "maxWidth")]
    pub max_width: f64,
    #[serde(default, alias = "generateAllCrossPairs")]
    pub generate_all_cross_pairs: bool,
    #[serde(default, alias = "lowSpecificity")]
    pub low_specificity: bool,
    /// Scales available to every stylesheet before any directive runs.
    #[serde(default)]
    pub scales: BTreeMap<String, ScaleDefinition>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct ScaleDefinition {
    #[serde(default, alias = "minWidth")]
    pub min_width: Option<f64>,
    #[serde(default, alias = "maxWidth")]
    pub max_width: Option<f64>,
    #[serde(default, alias = "generateAllCrossPairs")]
    pub generate_all_cross_pairs: Option<bool>,
    /// `name = [min, max]`, kept in file order.
    #[serde(default)]
    pub pairs: toml::Table,
}

/// Run-level defaults consulted by every directive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunOptions {
    pub min_width: f64,
    pub max_width: f64,
    pub generate_all_cross_pairs: bool,
    pub low_specificity: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

impl Config {
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            min_width: self.min_width,
            max_width: self.max_width,
            generate_all_cross_pairs: self.generate_all_cross_pairs,
            low_specificity: self.low_specificity,
        }
    }

    /// Resolves every configured scale against the run options.
    pub fn scale_configs(&self) -> RulerResult<Vec<ScaleConfig>> {
        let options = self.run_options();
        self.scales
            .iter()
            .map(|(prefix, definition)| definition.to_scale_config(prefix, &options))
            .collect()
    }
}

impl ScaleDefinition {
    pub fn to_scale_config(&self, prefix: &str, options: &RunOptions) -> RulerResult<ScaleConfig> {
        let mut pairs = Vec::with_capacity(self.pairs.len());
        for (name, value) in &self.pairs {
            let numbers: Vec<f64> = match value {
                toml::Value::Array(items) => items.iter().filter_map(toml_number).collect(),
                _ => Vec::new(),
            };
            if let &[min, max, ..] = numbers.as_slice() {
                pairs.push(SizePair::new(name.as_str(), min, max));
            }
        }
        if pairs.is_empty() {
            return Err(RulerError::configuration(format!(
                "configured scale \"{}\" has no pairs defined",
                prefix
            )));
        }

        Ok(ScaleConfig {
            min_width: self.min_width.unwrap_or(options.min_width),
            max_width: self.max_width.unwrap_or(options.max_width),
            prefix: prefix.to_string(),
            generate_all_cross_pairs: self
                .generate_all_cross_pairs
                .unwrap_or(options.generate_all_cross_pairs),
            pairs,
        })
    }
}

fn toml_number(value: &toml::Value) -> Option<f64> {
    match value {
        toml::Value::Integer(number) => Some(*number as f64),
        toml::Value::Float(number) => Some(*number).filter(|n| n.is_finite()),
        toml::Value::String(text) => parse_number(text),
        _ => None,
    }
}

fn default_min_width() -> f64 {
    DEFAULT_MIN_WIDTH
}

fn default_max_width() -> f64 {
    DEFAULT_MAX_WIDTH
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_width: DEFAULT_MIN_WIDTH,
            max_width: DEFAULT_MAX_WIDTH,
            generate_all_cross_pairs: false,
            low_specificity: false,
            scales: BTreeMap::new(),
        }
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Config::default().run_options()
    }
}

#[cfg(test)]
mod tests {
    use super::{Config, ConfigError, RunOptions, load};
    use crate::scale::SizePair;
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn loads_toml_config() {
        let path = temp_path("ruler_config");
        let _ = fs::write(&path, "min_width = 375\nmaxWidth = 1440\nlow_specificity = true");
        let config = load(&path).expect("config should parse");
        assert_eq!(config.min_width, 375.0);
        assert_eq!(config.max_width, 1440.0);
        assert!(config.low_specificity);
        assert!(!config.generate_all_cross_pairs);
    }

    #[test]
    fn defaults_when_empty() {
        let path = temp_path("ruler_config_default");
        let _ = fs::write(&path, "");
        let config = load(&path).expect("config should parse");
        assert_eq!(config, Config::default());
        assert_eq!(
            config.run_options(),
            RunOptions {
                min_width: 320.0,
                max_width: 1760.0,
                generate_all_cross_pairs: false,
                low_specificity: false,
            }
        );
    }

    #[test]
    fn scale_pairs_keep_file_order() {
        let path = temp_path("ruler_config_scales");
        let _ = fs::write(
            &path,
            r#"
generate_all_cross_pairs = true

[scales.space]
pairs = { xl = [32, 48], xs = [8, 16], sm = [16, 24, 99], bad = [1] }

[scales.text]
min_width = 400
generateAllCrossPairs = false
pairs = { body = [16.5, 18] }
"#,
        );
        let config = load(&path).expect("config should parse");
        let scales = config.scale_configs().expect("scales should resolve");
        assert_eq!(scales.len(), 2);

        let space = &scales[0];
        assert_eq!(space.prefix, "space");
        assert!(space.generate_all_cross_pairs);
        assert_eq!(
            space.pairs,
            vec![
                SizePair::new("xl", 32.0, 48.0),
                SizePair::new("xs", 8.0, 16.0),
                SizePair::new("sm", 16.0, 24.0),
            ]
        );

        let text = &scales[1];
        assert_eq!(text.min_width, 400.0);
        assert_eq!(text.max_width, 1760.0);
        assert!(!text.generate_all_cross_pairs);
        assert_eq!(text.pairs, vec![SizePair::new("body", 16.5, 18.0)]);
    }

    #[test]
    fn scale_without_pairs_is_rejected() {
        let config: Config = toml::from_str("[scales.empty]\nmin_width = 300").expect("toml");
        let err = config.scale_configs().expect_err("empty scale must fail");
        assert!(err.to_string().contains("\"empty\" has no pairs defined"));
    }

    #[test]
    fn missing_file_reports_path() {
        let path = temp_path("ruler_config_missing");
        let err = load(&path).expect_err("missing file must fail");
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("failed to read config"));
    }

    fn temp_path(prefix: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        std::env::temp_dir().join(format!("{}_{}.toml", prefix, nanos))
    }
}
