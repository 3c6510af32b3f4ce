//! CLI: check JSON/NDJSON documents against a schema document.
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use rayon::prelude::*;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use json_decode::{draw_tree, to_tree, DecodeError, Decoder, Outcome, Schema};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// decode JSON/NDJSON documents against a JSON schema and report every problem found
#[derive(Parser, Debug)]
#[command(name = "json-decode")]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// decode each document and print a report per document
    Check(CheckCmd),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select a subnode in each document (e.g. /data/items/0/payload)
    #[arg(long)]
    json_pointer: Option<String>,

    /// JQ pre-process filter for each document; every output is checked
    #[arg(long)]
    jq_expr: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum ReportFormat {
    Text,
    Json,
}

#[derive(clap::Parser, Debug)]
struct CheckCmd {
    #[command(flatten)]
    input_settings: InputSettings,

    /// schema document (JSON)
    #[arg(long, short)]
    schema: PathBuf,

    /// treat warnings (extra keys, NaN, ...) as failures for the exit status
    #[arg(long, default_value_t = false)]
    deny_warnings: bool,

    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    format: ReportFormat,

    /// also print the decoded value of every document that produced one
    #[arg(long, default_value_t = false)]
    emit: bool,

    /// output file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

/// One document to check, labelled with where it came from.
#[derive(Debug)]
struct Document {
    source: String,
    value: Value,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
enum Status {
    Ok,
    Warning,
    Failure,
}

#[derive(Serialize, Debug)]
struct Report<'a> {
    source: &'a str,
    status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<DecodeError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<Value>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn load_documents(&self) -> Result<Vec<Document>> {
        let source_paths =
            resolve_file_path_patterns(&self.input).context("failed to resolve input file paths")?;
        debug!(paths = source_paths.len(), "resolved inputs");
        let mut documents = Vec::new();
        for source_path in source_paths {
            let source_path_str = source_path.to_string_lossy().to_string();
            let source = std::fs::read_to_string(&source_path)
                .with_context(|| format!("failed to read source file ({source_path_str})"))?;
            if self.ndjson {
                for (line_no, line) in source.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let label = format!("{source_path_str}:{}", line_no + 1);
                    let value = serde_json::from_str::<Value>(line)
                        .with_context(|| format!("failed to parse NDJSON line ({label})"))?;
                    self.select(label, value, &mut documents)?;
                }
            } else {
                let value = serde_json::from_str::<Value>(&source)
                    .with_context(|| format!("failed to parse JSON source file ({source_path_str})"))?;
                self.select(source_path_str, value, &mut documents)?;
            }
        }
        debug!(documents = documents.len(), "loaded documents");
        Ok(documents)
    }

    /// Applies the JSON pointer and the jq filter, in that order.
    fn select(&self, source: String, value: Value, out: &mut Vec<Document>) -> Result<()> {
        let value = match self.json_pointer.as_deref() {
            None => value,
            Some(pointer) => match value.pointer(pointer) {
                Some(node) => node.clone(),
                None => {
                    warn!(%source, pointer, "json pointer matched nothing; skipping");
                    return Ok(());
                }
            },
        };
        match self.jq_expr.as_deref() {
            None => out.push(Document { source, value }),
            Some(jq_expr) => {
                let results = crate::jq_exec::run_jaq(jq_expr, &value)
                    .with_context(|| format!("failed to apply jq expression to {source}"))?;
                let single = results.len() == 1;
                for (index, value) in results.into_iter().enumerate() {
                    let source = if single { source.clone() } else { format!("{source}#{index}") };
                    out.push(Document { source, value });
                }
            }
        }
        Ok(())
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> Result<ExitCode> {
        match &self.cmd {
            Command::Check(target) => target.run(),
        }
    }
}

impl CheckCmd {
    fn run(&self) -> Result<ExitCode> {
        let schema = load_schema(&self.schema)?;
        let documents = self.input_settings.load_documents()?;

        let outcomes: Vec<Outcome<DecodeError, Value>> =
            documents.par_iter().map(|doc| schema.decode(&doc.value)).collect();

        let reports: Vec<Report<'_>> = documents
            .iter()
            .zip(outcomes)
            .map(|(doc, outcome)| Report::new(&doc.source, outcome, self.emit))
            .collect();

        let failed = reports.iter().filter(|r| r.status == Status::Failure).count();
        let warned = reports.iter().filter(|r| r.status == Status::Warning).count();
        debug!(documents = reports.len(), failed, warned, "checked documents");

        if self.out.is_some() {
            colored::control::set_override(false);
        }
        let rendered = match self.format {
            ReportFormat::Text => render_text(&reports),
            ReportFormat::Json => serde_json::to_string_pretty(&reports).context("failed to serialize reports")?,
        };
        write_output(self.out.as_deref(), &rendered)?;

        let is_ok = failed == 0 && (!self.deny_warnings || warned == 0);
        Ok(if is_ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
    }
}

impl<'a> Report<'a> {
    fn new(source: &'a str, outcome: Outcome<DecodeError, Value>, emit: bool) -> Self {
        let (status, error, value) = match outcome {
            Outcome::Success { value } => (Status::Ok, None, Some(value)),
            Outcome::Warning { error, value } => (Status::Warning, Some(error), Some(value)),
            Outcome::Failure { error } => (Status::Failure, Some(error), None),
        };
        Report { source, status, error, value: value.filter(|_| emit) }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn load_schema(path: &Path) -> Result<Schema> {
    let source =
        std::fs::read_to_string(path).with_context(|| format!("failed to read schema ({})", path.display()))?;
    let doc = serde_json::from_str::<Value>(&source)
        .with_context(|| format!("failed to parse schema ({})", path.display()))?;
    let schema = Schema::compile(&doc).with_context(|| format!("invalid schema ({})", path.display()))?;
    debug!(schema = %path.display(), "loaded schema");
    Ok(schema)
}

fn render_text(reports: &[Report<'_>]) -> String {
    let mut out = String::new();
    for report in reports {
        let status = match report.status {
            Status::Ok => "ok".green().bold(),
            Status::Warning => "warning".yellow().bold(),
            Status::Failure => "failure".red().bold(),
        };
        out.push_str(&format!("{status} {}\n", report.source));
        if let Some(error) = &report.error {
            for line in draw_tree(&to_tree(error)).lines() {
                out.push_str(&format!("  {line}\n"));
            }
        }
        if let Some(value) = &report.value {
            let pretty = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
            out.push_str(&format!("{pretty}\n"));
        }
    }
    out
}

fn write_output(out: Option<&Path>, rendered: &str) -> Result<()> {
    match out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create output directory ({})", parent.display()))?;
            }
            std::fs::write(out, rendered).with_context(|| format!("failed to write output ({})", out.display()))
        }
        None => {
            print!("{rendered}");
            Ok(())
        }
    }
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'['))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern).with_context(|| format!("invalid glob pattern: {pattern}"))? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}

// ------------------------------- Tests ------------------------------------ //
