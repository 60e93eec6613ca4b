#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line exporter for `ArcGIS` feature layers.
//!
//! ```text
//! arcgis_export --url <URL> [--format geojson|kml|kmz|gpx|csv|json|txt]
//!               [--output DIR] [--select-all] [--overwrite | --skip-existing]
//!               [--prefix P] [--timeout SECS] [--exclude-symbols] [--save-symbols]
//! ```
//!
//! Accepts a single layer, a `FeatureServer`, a `MapServer`, or an
//! `ArcGIS` Online item (including web maps), discovers every feature
//! layer behind it, lets the operator pick which to export, and writes
//! one file per layer.
//!
//! Log output is routed through [`arcgis_export_cli_utils::init_logger`]
//! so it prints above the layer progress bar.

use std::path::PathBuf;
use std::time::Duration;

use arcgis_export_arcgis::client::{DEFAULT_PORTAL_URL, DEFAULT_TIMEOUT};
use arcgis_export_arcgis::discover::DEFAULT_MAX_DEPTH;
use arcgis_export_arcgis::normalize::{is_valid_http_url, normalize};
use arcgis_export_arcgis::{
    ArcGisClient, ClientOptions, DiscoveryOptions, LayerDescriptor, discover,
};
use arcgis_export_cli_utils::LayerProgress;
use arcgis_export_export::OutputFormat;
use arcgis_export_pipeline::selection::{SELECTION_PROMPT, listing_line};
use arcgis_export_pipeline::{
    ExistingFilePolicy, ExportOptions, ProcessingOutcome, RunSummary, WorkSet, parse_selection,
    run, select_all,
};
use clap::Parser;
use console::style;
use dialoguer::Input;
use strum::IntoEnumIterator as _;

/// Export ArcGIS feature layers to GeoJSON, KML, KMZ, GPX, CSV, JSON, or text.
#[derive(Parser)]
#[command(name = "arcgis_export")]
#[command(about = "Export ArcGIS feature layers to common geospatial formats")]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    /// Layer, `FeatureServer`, `MapServer`, or `ArcGIS` Online item URL.
    #[arg(long)]
    url: String,

    /// Output format.
    #[arg(long, default_value = "geojson", value_parser = parse_format)]
    format: OutputFormat,

    /// Directory receiving the output files.
    #[arg(long, default_value = ".")]
    output: PathBuf,

    /// Export every discovered layer without prompting.
    #[arg(long)]
    select_all: bool,

    /// Replace existing output files.
    #[arg(long)]
    overwrite: bool,

    /// Leave existing output files alone and report them as skipped.
    #[arg(long)]
    skip_existing: bool,

    /// Prefix for every output file name.
    #[arg(long, default_value = "")]
    prefix: String,

    /// Request timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT.as_secs())]
    timeout: u64,

    /// Do not attach renderer symbols to features.
    #[arg(long)]
    exclude_symbols: bool,

    /// Save symbol images and metadata under `symbols/`.
    #[arg(long)]
    save_symbols: bool,

    /// Disable colored output.
    #[arg(long)]
    no_color: bool,

    /// Portal root used for item lookups.
    #[arg(long, default_value = DEFAULT_PORTAL_URL)]
    portal_url: String,

    /// Maximum web map nesting depth.
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,
}

/// Parses `--format` case-insensitively (`txt` and `text` both map to text).
fn parse_format(value: &str) -> Result<OutputFormat, String> {
    value.parse::<OutputFormat>().map_err(|e| {
        let known: Vec<_> = OutputFormat::iter().map(|f| f.to_string()).collect();
        format!("{e}: '{value}' (expected one of {})", known.join(", "))
    })
}

impl Cli {
    fn export_options(&self) -> ExportOptions {
        ExportOptions {
            format: self.format,
            output_dir: self.output.clone(),
            prefix: self.prefix.clone(),
            existing: ExistingFilePolicy::from_flags(self.overwrite, self.skip_existing),
            include_symbols: !self.exclude_symbols,
            save_symbols: self.save_symbols,
        }
    }
}

/// Lists the candidates and reads the operator's choice.
fn prompt_selection(candidates: &[LayerDescriptor]) -> Result<WorkSet, dialoguer::Error> {
    println!();
    println!("{}", style("Available layers:").bold());
    for (i, descriptor) in candidates.iter().enumerate() {
        println!("{}", listing_line(i + 1, descriptor));
    }
    println!();

    let input: String = Input::new()
        .with_prompt(SELECTION_PROMPT)
        .allow_empty(true)
        .interact_text()?;

    Ok(parse_selection(&input, candidates))
}

fn print_summary(summary: &RunSummary) {
    let message = summary.message();
    let styled = if summary.failed > 0 {
        style(message).red()
    } else if summary.skipped > 0 {
        style(message).yellow()
    } else {
        style(message).green()
    };
    println!();
    println!("{styled}");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let multi = arcgis_export_cli_utils::init_logger(log::LevelFilter::Info);

    if cli.no_color {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    let url = normalize(&cli.url);
    if !is_valid_http_url(&url) {
        eprintln!("{}", style(format!("Invalid URL: {}", cli.url)).red());
        std::process::exit(1);
    }
    log::info!("Using URL: {url}");

    let client = ArcGisClient::new(&ClientOptions {
        timeout: Duration::from_secs(cli.timeout),
        portal_url: cli.portal_url.clone(),
    })?;
    let discovery = DiscoveryOptions {
        max_depth: cli.max_depth,
    };

    let candidates = match discover(&client, &url, &discovery).await {
        Ok(candidates) => candidates,
        Err(e) => {
            eprintln!("{}", style(format!("Error: {e}")).red());
            std::process::exit(1);
        }
    };

    if candidates.is_empty() {
        println!("{}", style("No feature layers found.").yellow());
        return Ok(());
    }

    let work = if cli.select_all {
        select_all(&candidates)
    } else {
        prompt_selection(&candidates)?
    };

    if work.is_empty() {
        println!("{}", style("No layers selected.").yellow());
        return Ok(());
    }

    let progress = LayerProgress::attach(&multi, "Exporting");
    let summary = run(&client, work, &cli.export_options(), progress).await;

    for (descriptor, outcome) in &summary.outcomes {
        if let ProcessingOutcome::Failed(reason) = outcome {
            eprintln!("{}", style(format!("{}: {reason}", descriptor.name)).red());
        }
    }
    print_summary(&summary);

    std::process::exit(summary.exit_code());
}
