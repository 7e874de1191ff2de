//! Minimal CLI: schema → (check | apply) over JSON/NDJSON inputs
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use rayon::prelude::*;
use serde::Serialize;
use serde_json::Value;

use json_shape::{ApplyOptions, FormatRegistry, Initializer, SchemaNode, TypeName, ValidationReport, Validator};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// compile a JSON schema once, then validate documents against it or initialize targets from them
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// validate every input document and report all violations
    Check(CheckOut),
    /// merge every input document into a target, applying schema defaults
    Apply(ApplyOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// schema document (JSON)
    #[arg(long, short)]
    schema: PathBuf,

    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select a subnode in each document (e.g. /data/items/0/payload)
    #[arg(long)]
    json_pointer: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct CheckOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// extra named formats, as NAME=REGEX
    #[arg(long = "format", value_parser = parse_format)]
    formats: Vec<(String, String)>,

    /// print reports as JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(clap::Parser, Debug)]
struct ApplyOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// starting target document (an empty object or array if omitted)
    #[arg(long)]
    target: Option<PathBuf>,

    /// do not write schema defaults
    #[arg(long)]
    no_defaults: bool,

    /// ignore the schema and deep-copy each source
    #[arg(long)]
    no_filter: bool,

    /// include members marked private
    #[arg(long)]
    private: bool,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

/// One input document, labelled for reporting.
struct Document {
    label: String,
    value: Value,
}

#[derive(Serialize)]
struct LabelledReport<'a> {
    input: &'a str,
    #[serde(flatten)]
    report: &'a ValidationReport,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn load_schema(&self) -> Result<SchemaNode> {
        let bytes = std::fs::read(&self.schema)
            .with_context(|| format!("failed to read schema file {}", self.schema.display()))?;
        SchemaNode::from_slice(&bytes).with_context(|| format!("failed to parse schema {}", self.schema.display()))
    }

    fn load_documents(&self) -> Result<Vec<Document>> {
        let source_paths = resolve_file_path_patterns(&self.input)?;
        let mut out = Vec::new();
        for source_path in source_paths {
            let source_path_str = source_path.to_string_lossy().to_string();
            let source = std::fs::read_to_string(&source_path)
                .with_context(|| format!("failed to read source file {source_path_str}"))?;
            if self.ndjson {
                for (line_no, line) in source.lines().enumerate().filter(|(_, l)| !l.trim().is_empty()) {
                    let value = serde_json::from_str::<Value>(line)
                        .with_context(|| format!("failed to parse JSON ({source_path_str}:{})", line_no + 1))?;
                    out.push(self.select(format!("{source_path_str}:{}", line_no + 1), value)?);
                }
            } else {
                let value = serde_json::from_str::<Value>(&source)
                    .with_context(|| format!("failed to parse JSON source file ({source_path_str})"))?;
                out.push(self.select(source_path_str, value)?);
            }
        }
        log::debug!("loaded {} input documents", out.len());
        Ok(out)
    }

    fn select(&self, label: String, value: Value) -> Result<Document> {
        match self.json_pointer.as_deref() {
            None => Ok(Document { label, value }),
            Some(pointer) => match value.pointer(pointer) {
                Some(selected) => Ok(Document { label, value: selected.clone() }),
                None => bail!("JSON pointer {pointer} selects nothing in {label}"),
            },
        }
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    /// Returns `Ok(false)` when some document failed validation.
    pub fn run(&self) -> Result<bool> {
        match &self.cmd {
            Command::Check(target) => target.run(),
            Command::Apply(target) => target.run(),
        }
    }
}

impl CheckOut {
    fn run(&self) -> Result<bool> {
        let schema = self.input_settings.load_schema()?;
        let validator = if self.formats.is_empty() {
            Validator::compile(&schema)?
        } else {
            let mut registry = FormatRegistry::with_defaults();
            for (name, pattern) in &self.formats {
                registry.register(name, pattern)?;
            }
            Validator::compile_with(&schema, &registry)?
        };
        let documents = self.input_settings.load_documents()?;

        // the compiled validator is shared read-only across workers
        let reports = documents
            .par_iter()
            .map(|doc| validator.check(&doc.value))
            .collect::<Vec<_>>();

        let all_valid = reports.iter().all(|r| r.valid);
        if self.json {
            let labelled = documents
                .iter()
                .zip(&reports)
                .map(|(doc, report)| LabelledReport { input: &doc.label, report })
                .collect::<Vec<_>>();
            println!("{}", serde_json::to_string_pretty(&labelled)?);
        } else {
            for (doc, report) in documents.iter().zip(&reports) {
                print_report(&doc.label, report);
            }
            let failed = reports.iter().filter(|r| !r.valid).count();
            let summary = format!("{} documents, {} invalid", reports.len(), failed);
            if failed == 0 { println!("{}", summary.green()) } else { println!("{}", summary.red()) }
        }
        Ok(all_valid)
    }
}

impl ApplyOut {
    fn run(&self) -> Result<bool> {
        let schema = self.input_settings.load_schema()?;
        let initializer = Initializer::compile(&schema)?;
        let options = ApplyOptions {
            defaults: !self.no_defaults,
            filter: !self.no_filter,
            private: self.private,
        };
        let base = match &self.target {
            Some(path) => {
                let src = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read target file {}", path.display()))?;
                serde_json::from_str::<Value>(&src)
                    .with_context(|| format!("failed to parse target file {}", path.display()))?
            }
            None => match initializer.root_kind() {
                TypeName::Array => Value::Array(Vec::new()),
                _ => Value::Object(serde_json::Map::new()),
            },
        };

        let mut results = Vec::new();
        for doc in self.input_settings.load_documents()? {
            let mut target = base.clone();
            initializer
                .apply(&mut target, &doc.value, &options)
                .with_context(|| format!("failed to apply {}", doc.label))?;
            results.push(target);
        }
        let output = match results.len() {
            1 => results.remove(0),
            _ => Value::Array(results),
        };
        let rendered = serde_json::to_string_pretty(&output)?;
        match self.out.as_ref() {
            Some(out) => write_output(out, &rendered)?,
            None => println!("{rendered}"),
        }
        Ok(true)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn print_report(label: &str, report: &ValidationReport) {
    if report.valid {
        println!("{} {label}", "✓".green());
        return;
    }
    println!("{} {label}", "✗".red().bold());
    for error in &report.errors {
        let address = if error.address.is_empty() { "(root)" } else { error.address.as_str() };
        println!("    {} {} {}", address.yellow(), format!("[{}]", error.keyword).dimmed(), error.message);
    }
}

fn write_output(out: &Path, rendered: &str) -> Result<()> {
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(out, rendered).with_context(|| format!("failed to write {}", out.display()))
}

fn parse_format(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, pattern)) if !name.is_empty() => Ok((name.to_string(), pattern.to_string())),
        _ => Err(format!("expected NAME=REGEX, got `{raw}`")),
    }
}

/// Expand `--input` arguments. Arguments with glob syntax must match at least
/// one file; anything else is taken as a literal path. Each glob's matches
/// come back sorted, and a file named twice is loaded once.
fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut out = Vec::<PathBuf>::new();
    for raw in patterns {
        let pattern = raw.as_ref();
        if !pattern.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{')) {
            push_unique(&mut out, PathBuf::from(pattern));
            continue;
        }
        let mut matched = glob::glob(pattern)?.collect::<Result<Vec<_>, _>>()?;
        if matched.is_empty() {
            bail!("glob pattern matched no files: {pattern}");
        }
        matched.sort();
        for path in matched {
            push_unique(&mut out, path);
        }
    }
    Ok(out)
}

fn push_unique(out: &mut Vec<PathBuf>, path: PathBuf) {
    if !out.contains(&path) {
        out.push(path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_flag_parsing() {
        assert_eq!(parse_format("zip=^\\d{5}$").unwrap(), ("zip".to_string(), "^\\d{5}$".to_string()));
        assert!(parse_format("=x").is_err());
        assert!(parse_format("nope").is_err());
    }

    #[test]
    fn cli_parses_check_arguments() {
        let cli = CommandLineInterface::try_parse_from([
            "json-shape", "check", "--schema", "s.json", "--input", "a.json", "b.json", "--format", "zip=^\\d+$", "--json",
        ])
        .unwrap();
        match cli.cmd {
            Command::Check(check) => {
                assert_eq!(check.input_settings.input, ["a.json", "b.json"]);
                assert_eq!(check.formats.len(), 1);
                assert!(check.json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn input_patterns_expand_and_dedupe() {
        let dir = std::env::temp_dir().join(format!("json-shape-cli-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        for name in ["b.json", "a.json", "c.txt"] {
            std::fs::write(dir.join(name), "{}").unwrap();
        }
        let glob = format!("{}/*.json", dir.display());
        let literal = dir.join("a.json").to_string_lossy().to_string();
        let paths = resolve_file_path_patterns([glob.as_str(), literal.as_str()]).unwrap();
        assert_eq!(paths, [dir.join("a.json"), dir.join("b.json")]);

        let missing = format!("{}/*.yaml", dir.display());
        assert!(resolve_file_path_patterns([missing]).is_err());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn json_pointer_selects_subdocument() {
        let settings = InputSettings {
            schema: PathBuf::from("s.json"),
            ndjson: false,
            json_pointer: Some("/data/0".into()),
            input: vec![],
        };
        let doc = settings.select("x".into(), serde_json::json!({ "data": [{ "a": 1 }] })).unwrap();
        assert_eq!(doc.value, serde_json::json!({ "a": 1 }));
        assert!(settings.select("y".into(), serde_json::json!({})).is_err());
    }
}
