//! fileconv CLI - convert files between formats

mod config;
mod errors;
mod sniff;

use anyhow::{Context, Result, anyhow, bail};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use config::Config;
use fileconv_core::{Dispatcher, FileTypeKind, Outcome, Registry, Request, TypeResolver};
use serde::Serialize;
use sniff::MagicSniffer;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error, warn};
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "fileconv")]
#[command(about = "Convert files between formats", long_about = None)]
struct Cli {
    /// Verbose output (debug logs)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet output (only errors)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Override log level (trace/debug/info/warn/error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Path to config file (default: ~/.config/fileconv/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert one or more files
    Convert {
        /// Input file(s), directories or glob patterns. All must share one type.
        #[arg(required = true)]
        input: Vec<String>,
        /// Output file or directory (default: first input with the target suffix)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Declared input type, as a suffix (overrides detection)
        #[arg(short, long)]
        from: Option<String>,
        /// Output type, as a suffix (required without --output)
        #[arg(short, long)]
        to: Option<String>,
        /// Recursively collect files from directories
        #[arg(short = 'r', long)]
        recursive: bool,
        /// Trust suffixes and declared types without inspecting content
        #[arg(long)]
        no_sniff: bool,
    },

    /// List available converters
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// List known file types
    Types,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Generate man page
    Manpage,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config_path = cli.config.clone().or_else(Config::default_path);
    let (config, config_error) = match Config::load_from_path(config_path) {
        Ok(config) => (config, None),
        Err(err) => (Config::default(), Some(err)),
    };

    if let Err(err) = init_logging(&cli, &config) {
        eprintln!("warning: {err:#}");
    }
    if let Some(err) = config_error {
        warn!("{:#}; using defaults", err);
    }

    let mut registry = Registry::new();
    fileconv_formats::register_all(&mut registry);

    match run(cli, &config, &registry) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            error!("{:#}", err);
            if let Some(hint) = err
                .downcast_ref::<fileconv_core::Error>()
                .and_then(errors::type_detection_hint)
            {
                eprintln!("\n{hint}");
            }
            ExitCode::from(errors::exit_code(&err))
        }
    }
}

fn run(cli: Cli, config: &Config, registry: &Registry) -> Result<u8> {
    match cli.command {
        Commands::Convert {
            input,
            output,
            from,
            to,
            recursive,
            no_sniff,
        } => {
            let from = from.map(|name| config.resolve_type(&name));
            let to = to.map(|name| config.resolve_type(&name));

            let files = collect_files(input, recursive, from.as_deref());
            if files.is_empty() {
                bail!("No input files found");
            }

            let read_content = config.defaults.sniff_content && !no_sniff;
            let mut request = Request::new(files).read_content(read_content);
            request.input_type = from;
            request.output = output;
            request.output_type = to;

            cmd_convert(registry, &request, cli.quiet || config.defaults.quiet)
        }
        Commands::List { json } => cmd_list(registry, json).map(|()| 0),
        Commands::Types => {
            cmd_types();
            Ok(0)
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "fileconv", &mut std::io::stdout());
            Ok(0)
        }
        Commands::Manpage => {
            let cmd = Cli::command();
            let man = clap_mangen::Man::new(cmd);
            man.render(&mut std::io::stdout())?;
            Ok(0)
        }
    }
}

/// Install the tracing subscriber. Logs go to stderr.
fn init_logging(cli: &Cli, config: &Config) -> Result<()> {
    let level = if let Some(level) = cli.log_level.as_deref() {
        level
    } else if cli.quiet || config.defaults.quiet {
        "error"
    } else if cli.verbose || config.defaults.verbose {
        "debug"
    } else {
        config.defaults.log_level.as_deref().unwrap_or("warn")
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let layer = if config.defaults.json_logs {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(std::io::stderr().is_terminal())
            .with_target(false)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))
}

/// Collect files from patterns, directories, and globs.
///
/// When `recursive` is true, directories are walked recursively.
/// When `from` is given, files found in directories or through globs are kept
/// only if their suffix belongs to that type.
fn collect_files(patterns: Vec<String>, recursive: bool, from: Option<&str>) -> Vec<PathBuf> {
    let from_kind = from.map(FileTypeKind::lookup_suffix);
    let wanted = |path: &std::path::Path| match from_kind {
        Some(kind) if kind.is_true_type() => path
            .extension()
            .map(|ext| FileTypeKind::lookup_suffix(&ext.to_string_lossy()) == kind)
            .unwrap_or(false),
        _ => true,
    };

    let mut files = Vec::new();
    for pattern in patterns {
        let path = PathBuf::from(&pattern);

        if path.is_dir() {
            if recursive {
                files.extend(
                    walkdir::WalkDir::new(&path)
                        .into_iter()
                        .filter_map(|e| e.ok())
                        .filter(|e| e.file_type().is_file())
                        .map(|e| e.into_path())
                        .filter(|p| wanted(p)),
                );
            } else if let Ok(entries) = std::fs::read_dir(&path) {
                files.extend(
                    entries
                        .flatten()
                        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
                        .map(|e| e.path())
                        .filter(|p| wanted(p)),
                );
            }
        } else if pattern.contains(['*', '?', '[']) {
            files.extend(expand_glob_pattern(&pattern).into_iter().filter(|p| wanted(p)));
        } else {
            // Plain paths are passed through; resolution reports missing ones.
            files.push(path);
        }
    }

    files.sort();
    files
}

/// Expand a single glob pattern.
fn expand_glob_pattern(pattern: &str) -> Vec<PathBuf> {
    match glob::glob(pattern) {
        Ok(paths) => {
            let files: Vec<PathBuf> = paths.flatten().filter(|p| p.is_file()).collect();
            if files.is_empty() {
                warn!(pattern, "pattern matched no files");
            }
            files
        }
        Err(e) => {
            warn!(pattern, error = %e, "invalid glob pattern");
            Vec::new()
        }
    }
}

fn cmd_convert(registry: &Registry, request: &Request, quiet: bool) -> Result<u8> {
    debug!(inputs = request.inputs.len(), read_content = request.read_content, "convert");

    let dispatcher = Dispatcher::new(registry, TypeResolver::new(MagicSniffer));
    match dispatcher.dispatch(request)? {
        Outcome::Converted { output, pair } => {
            if !quiet {
                println!("{} -> {}: {}", pair.0, pair.1, output.display());
            }
            Ok(0)
        }
        Outcome::Unsupported(missing) => {
            eprintln!("{}", errors::unsupported_conversion(&missing, registry));
            Ok(errors::EXIT_UNSUPPORTED)
        }
    }
}

#[derive(Serialize)]
struct ConverterInfo<'a> {
    id: &'a str,
    input: FileTypeKind,
    output: FileTypeKind,
    strategy: &'static str,
    description: &'a str,
}

fn cmd_list(registry: &Registry, json: bool) -> Result<()> {
    let infos: Vec<ConverterInfo> = registry
        .descriptors()
        .map(|d| ConverterInfo {
            id: d.id(),
            input: d.input(),
            output: d.output(),
            strategy: d.strategy().name(),
            description: d.describe(),
        })
        .collect();

    if json {
        let text = serde_json::to_string_pretty(&infos).context("failed to serialize converters")?;
        println!("{text}");
        return Ok(());
    }

    println!("Available converters:\n");
    for info in &infos {
        println!("  {}", info.id);
        if !info.description.is_empty() {
            println!("    {}", info.description);
        }
        println!("    {} -> {} ({})", info.input, info.output, info.strategy);
        println!();
    }
    println!("Total: {} converters", infos.len());
    Ok(())
}

fn cmd_types() {
    println!("Known file types:\n");
    for kind in FileTypeKind::true_types() {
        println!("  {}", kind);
        println!("    suffixes: {}", kind.suffixes().join(", "));
        println!("    mime:     {}", kind.mime_types().join(", "));
        if !kind.alt_mime_types().is_empty() {
            println!("    also:     {}", kind.alt_mime_types().join(", "));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_collect_files_filters_directories_by_type() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        fs::write(dir.path().join("b.csv"), "b").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("c.txt"), "c").unwrap();

        let root = dir.path().to_string_lossy().to_string();

        let flat = collect_files(vec![root.clone()], false, Some("txt"));
        assert_eq!(flat, vec![dir.path().join("a.txt")]);

        let deep = collect_files(vec![root], true, Some("txt"));
        assert_eq!(
            deep,
            vec![dir.path().join("a.txt"), dir.path().join("nested").join("c.txt")]
        );
    }

    #[test]
    fn test_collect_files_expands_globs() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("one.txt"), "1").unwrap();
        fs::write(dir.path().join("two.txt"), "2").unwrap();
        fs::write(dir.path().join("three.md"), "3").unwrap();

        let pattern = dir.path().join("*.txt").to_string_lossy().to_string();
        let files = collect_files(vec![pattern], false, None);
        assert_eq!(
            files,
            vec![dir.path().join("one.txt"), dir.path().join("two.txt")]
        );
    }

    #[test]
    fn test_collect_files_keeps_plain_paths() {
        let files = collect_files(vec!["missing.txt".into()], false, Some("csv"));
        assert_eq!(files, vec![PathBuf::from("missing.txt")]);
    }
}
