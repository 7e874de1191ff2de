//! Runs the JSON fixture suites under `fixtures/` against the compiled
//! validator and initializer.
//!
//! Usage: `dev-test-runner [FIXTURE_DIR] [FILTER_REGEX]`
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use colored::Colorize;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use json_shape::path_de::from_str_with_path;
use json_shape::{ApplyOptions, Initializer, SchemaNode, Validator};

#[derive(Debug, Deserialize)]
struct Suite {
    description: String,
    schema: Value,
    #[serde(default)]
    tests: Vec<CheckCase>,
    #[serde(default)]
    apply: Vec<ApplyCase>,
}

#[derive(Debug, Deserialize)]
struct CheckCase {
    description: String,
    data: Value,
    valid: bool,
}

#[derive(Debug, Deserialize)]
struct ApplyCase {
    description: String,
    #[serde(default)]
    target: Option<Value>,
    source: Value,
    #[serde(default)]
    options: ApplyOptions,
    expected: Value,
}

#[derive(Default)]
struct Tally {
    passed: usize,
    failed: usize,
}

fn main() -> ExitCode {
    match run() {
        Ok(tally) if tally.failed == 0 => {
            println!("{}", format!("all {} cases passed", tally.passed).green().bold());
            ExitCode::SUCCESS
        }
        Ok(tally) => {
            println!("{}", format!("{} passed, {} failed", tally.passed, tally.failed).red().bold());
            ExitCode::from(1)
        }
        Err(error) => {
            eprintln!("{} {error:#}", "error:".red().bold());
            ExitCode::from(2)
        }
    }
}

fn run() -> Result<Tally> {
    let mut args = std::env::args().skip(1);
    let dir = args.next().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("fixtures"));
    let filter = args.next().map(|raw| Regex::new(&raw)).transpose().context("invalid filter regex")?;

    let mut files = std::fs::read_dir(&dir)
        .with_context(|| format!("failed to read fixture directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect::<Vec<_>>();
    files.sort();

    let mut tally = Tally::default();
    for file in files {
        run_file(&file, filter.as_ref(), &mut tally)?;
    }
    Ok(tally)
}

fn run_file(file: &Path, filter: Option<&Regex>, tally: &mut Tally) -> Result<()> {
    let src = std::fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))?;
    let suites = from_str_with_path::<Vec<Suite>>(&src).with_context(|| format!("malformed fixture {}", file.display()))?;
    println!("{}", file.display().to_string().bold());

    for suite in suites {
        if filter.is_some_and(|rx| !rx.is_match(&suite.description)) {
            continue;
        }
        let schema = SchemaNode::from_value(&suite.schema)
            .with_context(|| format!("{}: schema does not parse", suite.description))?;
        let validator = Validator::compile(&schema)
            .with_context(|| format!("{}: schema does not compile", suite.description))?;
        println!("  {}", suite.description);

        for case in &suite.tests {
            let report = validator.check(&case.data);
            let ok = report.valid == case.valid;
            record(tally, ok, &case.description);
            if !ok {
                for error in &report.errors {
                    println!("        {}", error.to_string().dimmed());
                }
            }
        }

        if suite.apply.is_empty() {
            continue;
        }
        let initializer = Initializer::compile(&schema)
            .with_context(|| format!("{}: schema has no initializer", suite.description))?;
        for case in &suite.apply {
            let mut target = case.target.clone().unwrap_or_else(|| Value::Object(Default::default()));
            let outcome = initializer.apply(&mut target, &case.source, &case.options);
            let ok = outcome.is_ok() && target == case.expected;
            record(tally, ok, &case.description);
            if !ok {
                println!("        expected {}", case.expected.to_string().dimmed());
                match outcome {
                    Ok(()) => println!("        got      {}", target.to_string().dimmed()),
                    Err(error) => println!("        error    {}", error.to_string().dimmed()),
                }
            }
        }
    }
    Ok(())
}

fn record(tally: &mut Tally, ok: bool, description: &str) {
    if ok {
        tally.passed += 1;
        println!("    {} {description}", "✓".green());
    } else {
        tally.failed += 1;
        println!("    {} {description}", "✗".red().bold());
    }
}
