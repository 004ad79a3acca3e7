use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct SourceError {
    pub message: String,
}

/// Walks honor `.gitignore` and never descend into `node_modules`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceOptions {
    pub base_path: PathBuf,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("."),
        }
    }
}

/// Resolves input patterns to stylesheet paths in sorted order. Literal
/// file paths are taken as given; directories and glob patterns only yield
/// stylesheet files.
pub fn collect_stylesheets(
    patterns: &[String],
    ignore_patterns: &[String],
    options: &SourceOptions,
) -> Result<Vec<PathBuf>, SourceError> {
    if patterns.is_empty() {
        return Err(SourceError {
            message: "at least one input stylesheet or glob is required".to_string(),
        });
    }

    let ignore_set = build_globset(ignore_patterns)?;
    let mut paths = BTreeSet::new();
    let mut globs = Vec::new();

    for pattern in patterns {
        if contains_glob_meta(pattern) {
            globs.push(pattern.clone());
            continue;
        }
        let path = options.base_path.join(pattern);
        if path.is_file() {
            if !ignore_set.is_match(Path::new(pattern)) {
                paths.insert(path);
            }
        } else if path.is_dir() {
            globs.push(format!("{}/**/*", pattern.trim_end_matches(['/', '\\'])));
        } else {
            return Err(SourceError {
                message: format!("path not found: {}", path.display()),
            });
        }
    }

    if !globs.is_empty() {
        walk_globs(&globs, &ignore_set, options, &mut paths)?;
    }

    Ok(paths.into_iter().collect())
}

fn walk_globs(
    patterns: &[String],
    ignore_set: &GlobSet,
    options: &SourceOptions,
    paths: &mut BTreeSet<PathBuf>,
) -> Result<(), SourceError> {
    let globset = build_globset(patterns)?;

    let mut builder = WalkBuilder::new(&options.base_path);
    builder
        .hidden(false)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true);

    for entry in builder.build() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::debug!(%err, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
            continue;
        }
        let path = entry.path();
        let relative_path = path.strip_prefix(&options.base_path).unwrap_or(path);
        if !globset.is_match(relative_path) && !globset.is_match(path) {
            continue;
        }
        if ignore_set.is_match(relative_path) || ignore_set.is_match(path) {
            continue;
        }
        if should_skip_file(path) {
            continue;
        }
        paths.insert(path.to_path_buf());
    }

    Ok(())
}

fn should_skip_file(path: &Path) -> bool {
    if path
        .components()
        .any(|component| component.as_os_str() == "node_modules")
    {
        return true;
    }

    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase());
    !ext.as_deref().is_some_and(is_stylesheet_extension)
}

fn is_stylesheet_extension(ext: &str) -> bool {
    matches!(ext, "css" | "pcss" | "postcss")
}

pub fn contains_glob_meta(input: &str) -> bool {
    input.contains(['*', '?', '[', '{'])
}

pub fn build_globset(patterns: &[String]) -> Result<GlobSet, SourceError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|err| SourceError {
            message: format!("invalid glob pattern '{}': {}", pattern, err),
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|err| SourceError {
        message: format!("failed to build glob set: {}", err),
    })
}

#[cfg(test)]
mod tests {
    use super::{SourceOptions, collect_stylesheets, contains_glob_meta};
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn file_names(paths: &[PathBuf], base: &PathBuf) -> Vec<String> {
        paths
            .iter()
            .map(|path| {
                path.strip_prefix(base)
                    .unwrap_or(path)
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn globs_only_match_stylesheets_outside_node_modules() {
        let base = temp_dir("ruler_sources_glob");
        let _ = fs::create_dir_all(base.join("src/components"));
        let _ = fs::create_dir_all(base.join("node_modules/lib"));
        let _ = fs::write(base.join("src/app.css"), ":root {}");
        let _ = fs::write(base.join("src/components/card.pcss"), ".card {}");
        let _ = fs::write(base.join("src/index.html"), "<div></div>");
        let _ = fs::write(base.join("node_modules/lib/vendor.css"), ".v {}");

        let options = SourceOptions {
            base_path: base.clone(),
        };
        let paths = collect_stylesheets(&["src/**/*".to_string()], &[], &options)
            .expect("collect_stylesheets should succeed");
        assert_eq!(
            file_names(&paths, &base),
            vec!["src/app.css".to_string(), "src/components/card.pcss".to_string()]
        );

        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn literal_paths_and_ignores() {
        let base = temp_dir("ruler_sources_literal");
        let _ = fs::create_dir_all(base.join("styles/generated"));
        let _ = fs::write(base.join("styles/a.css"), "");
        let _ = fs::write(base.join("styles/generated/b.css"), "");

        let options = SourceOptions {
            base_path: base.clone(),
        };
        let paths = collect_stylesheets(
            &["styles".to_string()],
            &["**/generated/**".to_string()],
            &options,
        )
        .expect("collect_stylesheets should succeed");
        assert_eq!(file_names(&paths, &base), vec!["styles/a.css".to_string()]);

        let err = collect_stylesheets(&["missing.css".to_string()], &[], &options)
            .expect_err("missing file must fail");
        assert!(err.message.starts_with("path not found"));

        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn requires_at_least_one_input() {
        let err = collect_stylesheets(&[], &[], &SourceOptions::default())
            .expect_err("empty inputs must fail");
        assert!(err.message.contains("at least one input"));
    }

    #[test]
    fn detects_glob_meta() {
        assert!(contains_glob_meta("src/**/*.css"));
        assert!(contains_glob_meta("src/{a,b}.css"));
        assert!(!contains_glob_meta("src/app.css"));
    }

    fn temp_dir(prefix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        std::env::temp_dir().join(format!("{}_{}", prefix, nanos))
    }
}
