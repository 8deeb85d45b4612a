// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! hexmass - parametric exploded-hexagon massing generator.
//!
//! # Commands
//!
//! - `generate` - build, validate and export GLB, SVG, report and summary
//! - `plan` - render the plan SVG only
//! - `validate` - validate a written GLB, or a fresh generation
//! - `config` - print the effective configuration
//!
//! Configuration comes from `--config <file.json>` with `--set key=value`
//! overrides applied on top. Values are parsed as JSON when possible, so
//! `--set courtyard_enabled=true` sets a boolean and
//! `--set edge_overrides.atrium_facade.3=open` a nested entry.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use hexmass_core::GeneratorConfig;
use hexmass_engine::{ExportPolicy, ExportRequest};
use hexmass_export::SvgOptions;
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Parametric exploded-hexagon massing generator
#[derive(Parser, Debug)]
#[command(name = "hexmass", version)]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override one configuration key, e.g. `side_length=30`
    #[arg(long = "set", value_name = "KEY=VALUE", global = true)]
    overrides: Vec<String>,

    /// Print machine-readable JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate, validate and export all artifacts
    Generate {
        /// Output directory
        #[arg(long, default_value = "out")]
        out: PathBuf,

        /// Export even when validation reports failures
        #[arg(long)]
        allow_violations: bool,
    },
    /// Render the plan SVG without building the model
    Plan {
        /// Output file; stdout when omitted
        #[arg(long)]
        out: Option<PathBuf>,

        /// Outlines only, without labels, dimensions or legend
        #[arg(long)]
        bare: bool,
    },
    /// Validate a GLB file, or a fresh generation when no file is given
    Validate {
        /// GLB written by `generate`
        file: Option<PathBuf>,
    },
    /// Print the effective configuration
    Config,
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Parse `KEY=VALUE`; the value is JSON when it parses, a string otherwise.
fn parse_override(raw: &str) -> Result<(Vec<&str>, Value)> {
    let (key, value) = raw
        .split_once('=')
        .with_context(|| format!("override `{}` is not KEY=VALUE", raw))?;
    let path: Vec<&str> = key.split('.').collect();
    if path.iter().any(|k| k.is_empty()) {
        bail!("override `{}` has an empty key segment", raw);
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((path, value))
}

fn apply_override(root: &mut Value, path: &[&str], value: Value) -> Result<()> {
    let mut node = root;
    for (i, key) in path.iter().enumerate() {
        let Value::Object(map) = node else {
            bail!("`{}` is not an object", path[..i].join("."));
        };
        if i + 1 == path.len() {
            map.insert(key.to_string(), value);
            return Ok(());
        }
        node = map
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    Ok(())
}

/// Config file plus overrides, validated.
fn load_config(file: Option<&PathBuf>, overrides: &[String]) -> Result<GeneratorConfig> {
    let mut value = match file {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => Value::Object(Map::new()),
    };
    for raw in overrides {
        let (path, v) = parse_override(raw)?;
        apply_override(&mut value, &path, v)?;
    }
    GeneratorConfig::from_json_value(value).context("invalid configuration")
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = load_config(cli.config.as_ref(), &cli.overrides)?;

    match cli.command {
        Command::Generate {
            out,
            allow_violations,
        } => {
            let generation = hexmass_engine::generate(&config)?;
            let policy = if allow_violations {
                ExportPolicy::AllowViolations
            } else {
                ExportPolicy::Strict
            };
            let request = ExportRequest::new(out).with_policy(policy);
            let paths = match hexmass_engine::export(&generation, &request) {
                Ok(paths) => paths,
                Err(e) if e.is_validation_failure() => {
                    eprint!("{}", generation.report());
                    return Err(e).context("model failed validation; nothing was written");
                }
                Err(e) => return Err(e.into()),
            };
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&paths)?);
            } else {
                print!("{}", hexmass_engine::summary(&generation));
                for path in [&paths.glb, &paths.svg, &paths.report, &paths.summary] {
                    println!("wrote {}", path.display());
                }
            }
            Ok(if generation.is_clean() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            })
        }
        Command::Plan { out, bare } => {
            let plan = hexmass_core::generate_plan(&config)?;
            let options = if bare {
                SvgOptions::outlines_only()
            } else {
                SvgOptions::default()
            };
            match out {
                Some(path) => hexmass_export::write_svg_file(&plan, None, &options, &path)?,
                None => print!("{}", hexmass_export::render_plan_svg(&plan, None, &options)),
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Validate { file } => {
            let report = match file {
                Some(path) => hexmass_engine::validate_glb_file(&path)?,
                None => hexmass_engine::generate(&config)?.into_report(),
            };
            if cli.json {
                println!("{}", report.to_json()?);
            } else {
                print!("{}", report);
            }
            Ok(if report.is_clean() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            })
        }
        Command::Config => {
            println!("{}", config.to_json_pretty()?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_overrides_merge_into_config() {
        let overrides = vec![
            "side_length=30".to_string(),
            "courtyard_enabled=true".to_string(),
            "courtyard_mode=exterior_hex".to_string(),
            "edge_overrides.atrium_facade.3=open".to_string(),
        ];
        let config = load_config(None, &overrides).unwrap();
        assert_eq!(config.side_length, 30.0);
        assert!(config.courtyard_enabled);
        assert_eq!(config.edge_overrides["atrium_facade"][&3], "open");
    }

    #[test]
    fn test_unknown_override_rejected() {
        let overrides = vec!["side_lenght=30".to_string()];
        assert!(load_config(None, &overrides).is_err());
    }

    #[test]
    fn test_malformed_override_rejected() {
        assert!(parse_override("side_length").is_err());
        assert!(parse_override("edge_overrides..x=1").is_err());
    }

    #[test]
    fn test_invalid_value_rejected() {
        let overrides = vec!["side_length=-4".to_string()];
        assert!(load_config(None, &overrides).is_err());
    }
}
