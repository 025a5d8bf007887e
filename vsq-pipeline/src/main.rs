//! vsq-pipeline - drive one image through identification and valuation
//!
//! Reads an image (a file, or an entry of the example gallery), identifies
//! the vehicle, prints the parsed attributes and catalog specifications,
//! applies `--set FIELD=VALUE` edits, and optionally requests a price.

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};
use vsq_common::config::TomlConfig;
use vsq_pipeline::catalog::SpecRecord;
use vsq_pipeline::config::{CliOverrides, PipelineConfig};
use vsq_pipeline::events::PipelineEvent;
use vsq_pipeline::form::FormField;
use vsq_pipeline::intake::{ExampleGallery, UploadedImage};
use vsq_pipeline::parser::ParseOutcome;
use vsq_pipeline::PipelineError;

/// Command-line arguments for vsq-pipeline
#[derive(Parser, Debug)]
#[command(name = "vsq-pipeline")]
#[command(about = "Identify a vehicle from an image and estimate its price")]
#[command(version)]
struct Args {
    /// Image file to identify
    #[arg(conflicts_with = "example")]
    image: Option<PathBuf>,

    /// Use example image N from the gallery instead of a file
    #[arg(short, long)]
    example: Option<usize>,

    /// Config file (defaults to VSQ_CONFIG, then ~/.config/vsq/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Backend base URL
    #[arg(long)]
    api_base_url: Option<String>,

    /// Specification catalog JSON file
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Example gallery directory
    #[arg(long)]
    gallery_dir: Option<PathBuf>,

    /// Per-request timeout in seconds (default: none)
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Form edit, e.g. --set Kilometers=50000 (repeatable)
    #[arg(long = "set", value_name = "FIELD=VALUE")]
    edits: Vec<String>,

    /// Request a price estimate after identification
    #[arg(long)]
    estimate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (toml_config, config_source) = TomlConfig::discover(args.config.as_deref())
        .context("Failed to load configuration")?;
    vsq_common::logging::init_tracing(&toml_config.logging);

    info!("Starting vsq-pipeline");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    config_source.log();

    let cli = CliOverrides {
        api_base_url: args.api_base_url.clone(),
        catalog_path: args.catalog.clone(),
        gallery_dir: args.gallery_dir.clone(),
        request_timeout_secs: args.timeout_secs,
    };
    let config = PipelineConfig::resolve(&cli, &toml_config)?;

    let edits = args
        .edits
        .iter()
        .map(|edit| parse_edit(edit))
        .collect::<Result<Vec<_>>>()?;

    let image = load_image(&args, &config).await?;

    let (event_tx, mut event_rx) = mpsc::channel::<PipelineEvent>(32);
    let session = Arc::new(vsq_pipeline::build_session(&config)?.with_events(event_tx));
    let event_logger = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            debug!(event = ?event, "Pipeline event");
        }
    });

    println!("Preview: {} ({} bytes, {})", image.file_name(), image.len(), image.content_type());

    let outcome = session.process(image).await.map_err(report)?;

    println!();
    match outcome.identity.confidence_percent() {
        Some(percent) => println!("Identified: {} ({})", outcome.identity.label, percent),
        None => println!("Identified: {}", outcome.identity.label),
    }
    if let ParseOutcome::Unparseable { raw } = &outcome.parse {
        println!("Could not split {:?} into make/model/body/year; fill the form manually.", raw);
    }
    match &outcome.enrichment {
        Some(record) => print_specs(record),
        None => println!("No catalog specifications for this vehicle."),
    }

    for (field, value) in edits {
        session.set_field(field, value).await?;
    }

    if let Some(form) = session.form().await {
        println!();
        println!("Form:");
        for field in FormField::ALL {
            let marker = if field.is_required() { "*" } else { " " };
            println!("  {}{:<17} {}", marker, field.name(), form.get(field));
        }
    }

    if args.estimate {
        let quote = session.submit().await.map_err(report)?;
        println!();
        println!("Predicted price: EGP {:.2}", quote.price);
        println!("{}", quote.comment.text());
    }

    drop(session);
    let _ = event_logger.await;
    Ok(())
}

async fn load_image(args: &Args, config: &PipelineConfig) -> Result<UploadedImage> {
    if let Some(path) = &args.image {
        return Ok(UploadedImage::from_path(path).await?);
    }

    let Some(index) = args.example else {
        bail!("Provide an image path or --example <N>");
    };
    let dir = config
        .gallery_dir
        .as_ref()
        .ok_or_else(|| anyhow!("--example needs a gallery directory (--gallery-dir or VSQ_GALLERY_DIR)"))?;
    let gallery = ExampleGallery::open(dir)?;
    Ok(gallery.load(index).await?)
}

/// Parse `FIELD=VALUE`
fn parse_edit(edit: &str) -> Result<(FormField, String)> {
    let (name, value) = edit
        .split_once('=')
        .ok_or_else(|| anyhow!("Expected FIELD=VALUE, got {:?}", edit))?;
    let field = name.trim().parse::<FormField>()?;
    Ok((field, value.to_string()))
}

fn report(err: PipelineError) -> anyhow::Error {
    eprintln!("{}", err.user_message());
    anyhow::Error::new(err)
}

fn print_specs(record: &SpecRecord) {
    println!();
    println!("Key Specifications ({}):", record.title);
    for (name, value) in record.key_spec_rows() {
        println!("  {:<17} {}", name, value);
    }
    if let Some(colors) = &record.color_options {
        println!("Exterior colors: {}", colors.exterior.join(", "));
        println!("Interior colors: {}", colors.interior.join(", "));
    }
}
