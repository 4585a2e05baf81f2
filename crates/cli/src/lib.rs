//! # Metamorph CLI
//!
//! Command-line tooling around catalog files and engine configuration.
//!
//! ## Commands
//!
//! - `validate` - Load a catalog file or directory and report problems
//! - `info` - List projections, entities and fields of a catalog
//! - `check-config` - Parse an engine config file and print the effective settings
//!
//! Rendering is kept in plain functions returning `String` so the binary only
//! prints, and tests can inspect the text.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use metamorph_engine::EngineConfig;
use metamorph_meta::{
    FieldMetadata, MappingKind, MetadataCatalog, ProjectionMetadata, ValidationResult,
    load_catalog_path, validate_catalog,
};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// CLI version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Arguments
// ============================================================================

#[derive(Debug, Parser)]
#[command(name = "metamorph")]
#[command(version)]
#[command(about = "Inspect and validate Metamorph metadata catalogs")]
pub struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Validate a catalog file or a directory of catalog files
    Validate {
        /// Catalog file or directory
        path: PathBuf,
    },

    /// Describe the projections of a catalog
    Info {
        /// Catalog file or directory
        path: PathBuf,

        /// Only show this projection
        #[arg(long, short)]
        projection: Option<String>,

        /// Print the selected projections as JSON
        #[arg(long)]
        json: bool,
    },

    /// Parse an engine config file and print the effective settings
    CheckConfig {
        /// TOML config file
        path: PathBuf,
    },
}

// ============================================================================
// Dispatch
// ============================================================================

/// Run a parsed command, printing its report to stdout
pub fn run(cli: &Cli) -> Result<ExitCode> {
    match &cli.command {
        Command::Validate { path } => {
            let catalog = load(path)?;
            let result = validate_catalog(&catalog);
            print!("{}", render_validation(&result, path));
            Ok(if result.has_errors() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }
        Command::Info {
            path,
            projection,
            json,
        } => {
            let catalog = load(path)?;
            let selected = select(&catalog, projection.as_deref())?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&selected)?);
            } else {
                print!("{}", render_info(&selected));
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::CheckConfig { path } => {
            let config = EngineConfig::load(path)
                .with_context(|| format!("invalid engine config {}", path.display()))?;
            print!("{}", render_config(&config));
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load(path: &Path) -> Result<MetadataCatalog> {
    let catalog = load_catalog_path(path)
        .with_context(|| format!("failed to load catalog from {}", path.display()))?;
    tracing::debug!(
        path = %path.display(),
        projections = catalog.projection_count(),
        entities = catalog.entity_count(),
        "catalog loaded"
    );
    Ok(catalog)
}

/// Projections to show; all of them when no name is given
pub fn select<'a>(
    catalog: &'a MetadataCatalog,
    projection: Option<&str>,
) -> Result<Vec<&'a ProjectionMetadata>> {
    match projection {
        Some(name) => {
            let found = catalog
                .get_projection(name)
                .with_context(|| format!("projection '{}' not found", name))?;
            Ok(vec![found])
        }
        None => Ok(catalog.projections().iter().collect()),
    }
}

// ============================================================================
// Rendering
// ============================================================================

/// Validation report for a loaded catalog
pub fn render_validation(result: &ValidationResult, path: &Path) -> String {
    let mut out = String::new();
    for error in &result.errors {
        let _ = writeln!(out, "{} {}", "error:".red().bold(), error);
    }
    for warning in &result.warnings {
        let _ = writeln!(out, "{} {}", "warning:".yellow().bold(), warning);
    }

    let summary = format!(
        "{} error(s), {} warning(s)",
        result.errors.len(),
        result.warnings.len()
    );
    if result.has_errors() {
        let _ = writeln!(out, "{} {}: {}", "✗".red(), path.display(), summary);
    } else {
        let _ = writeln!(out, "{} {}: {}", "✓".green(), path.display(), summary);
    }
    out
}

/// Tree listing of projections, entities and fields
pub fn render_info(projections: &[&ProjectionMetadata]) -> String {
    let mut out = String::new();
    for projection in projections {
        let _ = writeln!(
            out,
            "{} {} ({} entities)",
            projection.name.bold(),
            format!("[{}]", projection.id).dimmed(),
            projection.entities.len()
        );

        for entity in &projection.entities {
            let endpoint = if entity.rest_endpoint {
                String::new()
            } else {
                format!(" {}", "no endpoint".yellow())
            };
            let _ = writeln!(
                out,
                "  {} {} table {}{}",
                entity.name.cyan(),
                format!("[{}]", entity.id).dimmed(),
                entity.table_id,
                endpoint
            );

            for field in &entity.fields {
                let marker = if field.mandatory { "*" } else { " " };
                let _ = writeln!(
                    out,
                    "    {}{:<24} {:<18} {}",
                    marker,
                    field.name,
                    field.mapping_kind.to_string(),
                    describe_field(field)
                );
            }
        }
    }
    out
}

/// Kind-specific data of a field, for listings
pub fn describe_field(field: &FieldMetadata) -> String {
    let or_missing = |value: &Option<String>| value.clone().unwrap_or_else(|| "?".to_string());
    match &field.mapping_kind {
        MappingKind::Direct => field.property.clone(),
        MappingKind::ConstantValue | MappingKind::ComputedConstant => {
            format!("constant {}", or_missing(&field.constant_id))
        }
        MappingKind::EntityReference => {
            format!("{} -> {}", field.property, or_missing(&field.related_entity_id))
        }
        MappingKind::CustomMapping => {
            format!("qualifier {}", or_missing(&field.custom_mapping_qualifier))
        }
        MappingKind::PathExtraction => {
            format!("{} {}", field.property, or_missing(&field.json_path))
        }
        MappingKind::Unknown(raw) => format!("unsupported kind '{}'", raw),
    }
}

/// Effective engine settings
pub fn render_config(config: &EngineConfig) -> String {
    let rows = [
        ("external_id_mode", config.external_id_mode.to_string()),
        ("date_format", config.date_format.clone()),
        ("datetime_format", config.datetime_format.clone()),
        ("validate_catalog", config.validate_catalog.to_string()),
        ("audit_user", config.audit_user.clone()),
    ];

    let mut out = String::new();
    for (key, value) in rows {
        let _ = writeln!(out, "{:<18} {}", key.bold(), value);
    }
    out
}

// ============================================================================
// Tests
// ============================================================================
