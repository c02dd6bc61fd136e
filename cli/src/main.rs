use std::path::{Component, Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use drl_core::{Diagnostic, DrlEngine, Settings, Severity};
use serde::Serialize;
use tracing::debug;

#[cfg(test)]
mod main_test;

const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Parser)]
#[command(name = "drl", author, version, about = "Check Drools rule files", long_about = None)]
struct CliArgs {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Report diagnostics for one or more rule files.
    Check {
        #[arg(value_name = "FILE", required = true, value_parser = parse_sanitized_path)]
        files: Vec<PathBuf>,
        /// Print diagnostics as JSON
        #[arg(long)]
        json: bool,
        /// Only report errors
        #[arg(long)]
        errors_only: bool,
        /// Settings file (JSON, same keys as the editor `drl` section)
        #[arg(long, value_name = "PATH", value_parser = parse_sanitized_path)]
        config: Option<PathBuf>,
    },
    /// Print the syntax tree of a rule file as JSON.
    Tree {
        #[arg(value_name = "FILE", value_parser = parse_sanitized_path)]
        file: PathBuf,
        #[arg(long, value_name = "PATH", value_parser = parse_sanitized_path)]
        config: Option<PathBuf>,
    },
}

fn sanitize_path(raw: &str) -> anyhow::Result<PathBuf> {
    let p = Path::new(raw);

    for comp in p.components() {
        if matches!(comp, Component::ParentDir) {
            return Err(anyhow::anyhow!(
                "Parent directory components ('..') are not allowed in file paths."
            ));
        }
    }

    Ok(p.to_path_buf())
}

fn parse_sanitized_path(raw: &str) -> Result<PathBuf, String> {
    sanitize_path(raw).map_err(|e| e.to_string())
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init();
}

fn read_source(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read '{}'", path.display()))
}

fn load_settings(config: Option<&Path>) -> anyhow::Result<Settings> {
    let Some(path) = config else {
        return Ok(Settings::default());
    };
    let raw = std::fs::read_to_string(path).with_context(|| format!("failed to read config '{}'", path.display()))?;
    Settings::from_json_str(&raw).with_context(|| format!("invalid config '{}'", path.display()))
}

pub(crate) fn format_diagnostic(path: &Path, diagnostic: &Diagnostic) -> String {
    format!(
        "{}:{}: {} [{}] {}",
        path.display(),
        diagnostic.range.start,
        diagnostic.severity,
        diagnostic.category,
        diagnostic.message
    )
}

#[derive(Serialize)]
struct FileReport<'a> {
    file: String,
    diagnostics: Vec<&'a Diagnostic>,
}

fn check(files: &[PathBuf], json: bool, errors_only: bool, settings: Settings) -> anyhow::Result<ExitCode> {
    let engine = DrlEngine::new(Settings {
        enable_caching: false,
        ..settings
    });

    let mut results = Vec::with_capacity(files.len());
    for path in files {
        let text = read_source(path)?;
        let analysis = engine.analyze(&path.to_string_lossy(), 0, &text);
        debug!(file = %path.display(), outcome = ?analysis.parse.outcome, "checked");
        results.push((path, analysis.diagnostics));
    }

    let keep = |d: &&Diagnostic| !errors_only || d.severity == Severity::Error;
    let errors: usize = results.iter().map(|(_, ds)| ds.iter().filter(|d| d.is_error()).count()).sum();

    if json {
        let reports: Vec<FileReport> = results
            .iter()
            .map(|(path, ds)| FileReport {
                file: path.display().to_string(),
                diagnostics: ds.iter().filter(keep).collect(),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        let mut warnings = 0usize;
        for (path, ds) in &results {
            for d in ds.iter().filter(keep) {
                if d.severity == Severity::Warning {
                    warnings += 1;
                }
                println!("{}", format_diagnostic(path, d));
            }
        }
        println!("{errors} error(s), {warnings} warning(s) in {} file(s)", results.len());
    }

    Ok(if errors > 0 { ExitCode::from(1) } else { ExitCode::SUCCESS })
}

fn tree(file: &Path, settings: Settings) -> anyhow::Result<ExitCode> {
    let text = read_source(file)?;
    let result = drl_core::Parser::new(settings.parser_options()).parse(&text);
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(ExitCode::SUCCESS)
}

fn run(args: CliArgs) -> anyhow::Result<ExitCode> {
    match args.command {
        Commands::Check {
            files,
            json,
            errors_only,
            config,
        } => check(&files, json, errors_only, load_settings(config.as_deref())?),
        Commands::Tree { file, config } => tree(&file, load_settings(config.as_deref())?),
    }
}

fn main() -> ExitCode {
    init_tracing();

    match run(CliArgs::parse()) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(2)
        }
    }
}
