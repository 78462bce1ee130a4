// SPDX-License-Identifier: MIT OR Apache-2.0
//! `OrdoPlay` material baker.
//!
//! Reads a RON material manifest, instantiates each entry's shader from
//! the VFX library, applies parameter overrides, builds the materials and
//! prints a summary of each one.
//!
//! ```text
//! ordoplay_shader_tool [--format ron|json] <manifest.ron>
//! ```
//!
//! Logging goes to stderr and is controlled by `RUST_LOG`.

mod bake;
mod manifest;

use bake::{BakeReport, Baker};
use clap::{Parser, ValueEnum};
use manifest::{ManifestError, MaterialManifest};
use ordoplay_shader_vfx::create_vfx_library;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Summary output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
enum OutputFormat {
    /// Pretty RON with struct names
    #[default]
    Ron,
    /// Pretty JSON
    Json,
}

/// Build the materials of a manifest and print a summary
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the RON material manifest. Example: demos/materials.ron
    manifest: PathBuf,

    /// Summary format
    #[arg(long, short, value_enum, default_value_t)]
    format: OutputFormat,
}

/// Command line failure
#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("Could not write summary: {0}")]
    Output(String),
}

fn render(report: &BakeReport, format: OutputFormat) -> Result<String, CliError> {
    match format {
        OutputFormat::Ron => {
            let config = ron::ser::PrettyConfig::default().struct_names(true);
            ron::ser::to_string_pretty(report, config).map_err(|e| CliError::Output(e.to_string()))
        }
        OutputFormat::Json => {
            serde_json::to_string_pretty(report).map_err(|e| CliError::Output(e.to_string()))
        }
    }
}

fn run(args: Args) -> Result<bool, CliError> {
    let manifest = MaterialManifest::load(&args.manifest)?;
    let report = Baker::new(create_vfx_library()).bake(&manifest);
    println!("{}", render(&report, args.format)?);
    Ok(report.is_success())
}

fn main() -> ExitCode {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("ordoplay_shader_tool=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("ordoplay_shader_tool v{}", env!("CARGO_PKG_VERSION"));

    match run(Args::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
