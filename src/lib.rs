pub mod config;
pub mod error;
pub mod fluid;
pub mod params;
pub mod processor;
pub mod rewrite;
pub mod scale;
pub mod sources;
pub mod stylesheet;
pub mod tokenizer;
pub mod utility;

pub use config::{Config, RunOptions};
pub use error::{RangeContext, RulerError, RulerResult};
pub use fluid::{ClampRange, calculate_clamp, px_to_rem};
pub use processor::Processor;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{RecvTimeoutError, channel};
use std::time::{Duration, Instant};

use globset::GlobSet;

const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
const WATCH_DEBOUNCE: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    pub inputs: Vec<String>,
    pub out: Option<String>,
    pub minify: bool,
    pub config: Option<String>,
    pub ignore: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Build(BuildOptions),
    Watch {
        build: BuildOptions,
        poll: bool,
        poll_interval_ms: u64,
    },
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliError {
    pub message: String,
}

impl From<RulerError> for CliError {
    fn from(err: RulerError) -> Self {
        Self {
            message: err.to_string(),
        }
    }
}

impl From<config::ConfigError> for CliError {
    fn from(err: config::ConfigError) -> Self {
        Self {
            message: err.to_string(),
        }
    }
}

impl From<sources::SourceError> for CliError {
    fn from(err: sources::SourceError) -> Self {
        Self {
            message: err.message,
        }
    }
}

pub fn run(command: Command) -> Result<(), CliError> {
    match command {
        Command::Build(options) => run_build(&options),
        Command::Watch {
            build,
            poll,
            poll_interval_ms,
        } => run_watch(&build, poll, poll_interval_ms),
        Command::Help => {
            print_help();
            Ok(())
        }
    }
}

pub fn run_from_env() -> Result<(), CliError> {
    let command = parse_args(env::args().skip(1))?;
    run(command)
}

pub fn parse_args<I>(args: I) -> Result<Command, CliError>
where
    I: IntoIterator<Item = String>,
{
    let mut iter = args.into_iter();
    let Some(cmd) = iter.next() else {
        return Ok(Command::Help);
    };

    match cmd.as_str() {
        "build" => {
            let (build, _) = parse_build_args("build", iter.collect(), false)?;
            Ok(Command::Build(build))
        }
        "watch" => {
            let (build, poll) = parse_build_args("watch", iter.collect(), true)?;
            let (poll, poll_interval_ms) = poll.unwrap_or((false, DEFAULT_POLL_INTERVAL_MS));
            Ok(Command::Watch {
                build,
                poll,
                poll_interval_ms,
            })
        }
        "-h" | "--help" | "help" => Ok(Command::Help),
        _ => Err(CliError {
            message: format!("unknown command: {}", cmd),
        }),
    }
}

/// Shared flag parsing for `build` and `watch`. Poll settings are only
/// returned (and only accepted) for `watch`.
fn parse_build_args(
    command: &str,
    args: Vec<String>,
    allow_poll: bool,
) -> Result<(BuildOptions, Option<(bool, u64)>), CliError> {
    let mut build = BuildOptions {
        inputs: Vec::new(),
        out: None,
        minify: false,
        config: None,
        ignore: Vec::new(),
    };
    let mut poll = false;
    let mut poll_interval_ms = DEFAULT_POLL_INTERVAL_MS;
    let mut idx = 0;

    let take_value = |idx: &mut usize, flag: &str| -> Result<String, CliError> {
        *idx += 1;
        args.get(*idx).cloned().ok_or_else(|| CliError {
            message: format!("{} requires a value for {}", command, flag),
        })
    };

    while idx < args.len() {
        match args[idx].as_str() {
            "--out" | "--output" | "-o" => {
                build.out = Some(take_value(&mut idx, "--output")?);
            }
            "--config" | "-c" => {
                build.config = Some(take_value(&mut idx, "--config")?);
            }
            "--ignore" | "-I" => {
                build.ignore.push(take_value(&mut idx, "--ignore")?);
            }
            "--minify" => {
                build.minify = true;
            }
            "--poll" | "--poll-interval" if !allow_poll => {
                return Err(CliError {
                    message: "--poll is only supported with watch".to_string(),
                });
            }
            "--poll" => {
                poll = true;
            }
            "--poll-interval" => {
                let value = take_value(&mut idx, "--poll-interval")?;
                poll = true;
                poll_interval_ms = parse_u64_arg(&value, "--poll-interval")?;
            }
            value => {
                build.inputs.push(value.to_string());
            }
        }
        idx += 1;
    }

    if build.inputs.is_empty() {
        return Err(CliError {
            message: format!("{} requires at least one stylesheet path or glob pattern", command),
        });
    }

    let poll = allow_poll.then_some((poll, poll_interval_ms));
    Ok((build, poll))
}

fn run_build(options: &BuildOptions) -> Result<(), CliError> {
    let started = Instant::now();
    let mut ignore = options.ignore.clone();
    if let Some(out_path) = options.out.as_ref() {
        ignore.push(out_path.clone());
    }

    let config = match options.config.as_deref() {
        Some(path) => config::load(Path::new(path))?,
        None => Config::default(),
    };
    let stylesheets = sources::collect_stylesheets(
        &options.inputs,
        &ignore,
        &sources::SourceOptions::default(),
    )?;

    let mut processor = Processor::new(&config)?;
    let mut outputs = Vec::with_capacity(stylesheets.len());
    for path in &stylesheets {
        let css = fs::read_to_string(path).map_err(|err| CliError {
            message: format!("failed to read stylesheet {}: {}", path.display(), err),
        })?;
        let processed = processor
            .process_css(&css, options.minify)
            .map_err(|err| CliError {
                message: format!("{}: {}", path.display(), err),
            })?;
        tracing::debug!(path = %path.display(), "processed stylesheet");
        outputs.push(processed);
    }

    let css = if options.minify {
        outputs.concat()
    } else {
        outputs.join("\n")
    };

    if let Some(out_path) = options.out.as_ref() {
        if let Some(parent) = Path::new(out_path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|err| CliError {
                    message: format!("failed to create output directory {}: {}", parent.display(), err),
                })?;
            }
        }
        fs::write(out_path, css).map_err(|err| CliError {
            message: format!("failed to write output {}: {}", out_path, err),
        })?;
    } else {
        print!("{}", css);
    }

    tracing::info!(
        stylesheets = stylesheets.len(),
        scales = processor.registry().len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "build finished"
    );
    Ok(())
}

fn run_watch(options: &BuildOptions, poll: bool, poll_interval_ms: u64) -> Result<(), CliError> {
    run_build(options)?;

    let (tx, rx) = channel();
    let ignore_set = build_ignore_set(options);
    let mut watcher: Box<dyn notify::Watcher> = if poll {
        Box::new(
            notify::PollWatcher::new(
                tx,
                notify::Config::default()
                    .with_poll_interval(Duration::from_millis(poll_interval_ms)),
            )
            .map_err(|err| CliError {
                message: format!("failed to start poll watcher: {}", err),
            })?,
        )
    } else {
        Box::new(notify::recommended_watcher(tx).map_err(|err| CliError {
            message: format!("failed to start watcher: {}", err),
        })?)
    };

    for root in watch_roots(&options.inputs, options.config.as_deref()) {
        watcher
            .watch(&root, notify::RecursiveMode::Recursive)
            .map_err(|err| CliError {
                message: format!("failed to watch {}: {}", root.display(), err),
            })?;
    }

    tracing::info!(poll, "watching for changes (press Ctrl+C to stop)");

    let mut debounce = Debounce::new(WATCH_DEBOUNCE);
    loop {
        match rx.recv_timeout(WATCH_DEBOUNCE) {
            Ok(Ok(event)) => {
                if !should_ignore_event(&event, ignore_set.as_ref()) {
                    debounce.record(Instant::now());
                }
            }
            Ok(Err(err)) => {
                tracing::warn!("watch error: {}", err);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        if debounce.take_ready(Instant::now()) {
            tracing::info!("change detected, rebuilding");
            if let Err(err) = run_build(options) {
                tracing::error!("build failed: {}", err.message);
            }
        }
    }

    Ok(())
}

/// Holds a rebuild until no change has arrived for `quiet`. Changes that
/// land while a rebuild is pending only push it back.
#[derive(Debug, Clone, Copy)]
struct Debounce {
    quiet: Duration,
    last_change: Option<Instant>,
}

impl Debounce {
    fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            last_change: None,
        }
    }

    fn record(&mut self, at: Instant) {
        self.last_change = Some(at);
    }

    fn take_ready(&mut self, now: Instant) -> bool {
        match self.last_change {
            Some(at) if now.saturating_duration_since(at) >= self.quiet => {
                self.last_change = None;
                true
            }
            _ => false,
        }
    }
}

fn print_help() {
    println!("ruler");
    println!();
    println!("USAGE:");
    println!(
        "  ruler build [--output <path>] [--minify] [--config <path>] [--ignore <glob>] <path-or-glob...>"
    );
    println!(
        "  ruler watch [--output <path>] [--minify] [--config <path>] [--ignore <glob>] [--poll] [--poll-interval <ms>] <path-or-glob...>"
    );
    println!();
    println!("DIRECTIVES:");
    println!("  @ruler scale({{ prefix: \"space\", pairs: {{ \"sm\": [16, 24] }} }});");
    println!("  @ruler utility({{ selector: \".p\", property: \"padding\", scale: \"space\" }});");
    println!("  margin: ruler.fluid(16, 24);");
    println!();
    println!("EXAMPLES:");
    println!("  ruler build src/app.css");
    println!("  ruler build -c ruler.toml -o dist/app.css \"src/**/*.css\"");
    println!("  ruler watch --poll --poll-interval 250 -o dist/app.css src/styles");
    println!();
    println!("Set RULER_LOG=debug for per-directive logging.");
}

/// Directories to watch: the literal prefix of each input pattern plus the
/// config file's directory.
fn watch_roots(patterns: &[String], config: Option<&str>) -> Vec<PathBuf> {
    let mut roots = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for pattern in patterns.iter().map(String::as_str).chain(config) {
        let root = glob_root(pattern);
        let normalized = if root.as_os_str().is_empty() {
            PathBuf::from(".")
        } else {
            root
        };
        if seen.insert(normalized.clone()) {
            roots.push(normalized);
        }
    }

    roots
}

fn glob_root(pattern: &str) -> PathBuf {
    let Some(first_meta) = pattern.find(['*', '?', '[', '{']) else {
        if pattern.ends_with('/') || pattern.ends_with('\\') {
            return PathBuf::from(pattern);
        }
        let path = Path::new(pattern);
        if path.extension().is_some() {
            return path.parent().unwrap_or(Path::new(".")).to_path_buf();
        }
        return path.to_path_buf();
    };

    let prefix = &pattern[..first_meta];
    match prefix.rfind(['/', '\\']) {
        Some(idx) => PathBuf::from(&prefix[..=idx]),
        None => PathBuf::from("."),
    }
}

fn parse_u64_arg(value: &str, flag: &str) -> Result<u64, CliError> {
    value.parse::<u64>().map_err(|_| CliError {
        message: format!("{} requires a positive integer, got '{}'", flag, value),
    })
}

fn build_ignore_set(options: &BuildOptions) -> Option<GlobSet> {
    let mut patterns = options.ignore.clone();
    if let Some(out_path) = options.out.as_ref() {
        patterns.push(format!("**/{}", out_path.trim_start_matches("./")));
    }
    sources::build_globset(&patterns).ok()
}

fn should_ignore_event(event: &notify::Event, ignore_set: Option<&GlobSet>) -> bool {
    let Some(ignore_set) = ignore_set else {
        return false;
    };
    if event.paths.is_empty() {
        return false;
    }
    event.paths.iter().all(|path| ignore_set.is_match(path))
}

#[cfg(test)]
mod tests {
    use super::{BuildOptions, Command, Debounce, glob_root, parse_args, watch_roots};
    use std::path::PathBuf;
    use std::time::{Duration, Instant};

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn no_arguments_prints_help() {
        assert_eq!(parse_args(Vec::new()).expect("help"), Command::Help);
        assert_eq!(parse_args(args(&["--help"])).expect("help"), Command::Help);
    }

    #[test]
    fn parse_build_supports_all_flags() {
        let command = parse_args(args(&[
            "build",
            "-c",
            "ruler.toml",
            "--output",
            "dist/app.css",
            "--minify",
            "-I",
            "**/vendor/**",
            "src/**/*.css",
        ]))
        .expect("build args should parse");

        assert_eq!(
            command,
            Command::Build(BuildOptions {
                inputs: vec!["src/**/*.css".to_string()],
                out: Some("dist/app.css".to_string()),
                minify: true,
                config: Some("ruler.toml".to_string()),
                ignore: vec!["**/vendor/**".to_string()],
            })
        );
    }

    #[test]
    fn parse_watch_defaults_and_poll_interval() {
        let command = parse_args(args(&["watch", "-o", "out.css", "src/app.css"]))
            .expect("watch args should parse");
        assert_eq!(
            command,
            Command::Watch {
                build: BuildOptions {
                    inputs: vec!["src/app.css".to_string()],
                    out: Some("out.css".to_string()),
                    minify: false,
                    config: None,
                    ignore: vec![],
                },
                poll: false,
                poll_interval_ms: 500,
            }
        );

        let command = parse_args(args(&["watch", "--poll-interval", "250", "src"]))
            .expect("watch args should parse");
        assert!(matches!(
            command,
            Command::Watch {
                poll: true,
                poll_interval_ms: 250,
                ..
            }
        ));
    }

    #[test]
    fn rejects_bad_arguments() {
        let err = parse_args(args(&["build", "--poll", "a.css"])).expect_err("poll on build");
        assert_eq!(err.message, "--poll is only supported with watch");

        let err = parse_args(args(&["build", "--output"])).expect_err("missing value");
        assert_eq!(err.message, "build requires a value for --output");

        let err = parse_args(args(&["watch", "--minify"])).expect_err("missing inputs");
        assert!(err.message.contains("watch requires at least one"));

        let err = parse_args(args(&["watch", "--poll-interval", "soon", "a.css"]))
            .expect_err("bad interval");
        assert!(err.message.contains("requires a positive integer"));

        let err = parse_args(args(&["compile"])).expect_err("unknown command");
        assert_eq!(err.message, "unknown command: compile");
    }

    #[test]
    fn watch_roots_include_inputs_and_config() {
        let roots = watch_roots(
            &["packages/app/styles/**/*.css".to_string(), "theme.css".to_string()],
            Some("config/ruler.toml"),
        );
        assert_eq!(
            roots,
            vec![
                PathBuf::from("packages/app/styles/"),
                PathBuf::from("."),
                PathBuf::from("config"),
            ]
        );
    }

    #[test]
    fn glob_root_handles_literal_paths() {
        assert_eq!(glob_root("src/styles/"), PathBuf::from("src/styles/"));
        assert_eq!(glob_root("src/styles"), PathBuf::from("src/styles"));
        assert_eq!(glob_root("**/*.css"), PathBuf::from("."));
    }

    #[test]
    fn debounce_defers_changes_until_quiet() {
        let quiet = Duration::from_millis(200);
        let start = Instant::now();
        let mut debounce = Debounce::new(quiet);
        assert!(!debounce.take_ready(start));

        debounce.record(start);
        assert!(!debounce.take_ready(start + Duration::from_millis(100)));

        // A second write inside the window pushes the rebuild back.
        debounce.record(start + Duration::from_millis(120));
        assert!(!debounce.take_ready(start + Duration::from_millis(250)));
        assert!(debounce.take_ready(start + Duration::from_millis(320)));
        assert!(!debounce.take_ready(start + Duration::from_millis(900)));
    }
}
