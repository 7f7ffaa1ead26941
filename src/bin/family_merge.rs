//! Family Merge Binary - combine detection-record files of one template
//!
//! Reads every input file into a family, merges them, optionally deduplicates
//! and sorts, then writes the result through the configured backend.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release --bin family_merge -- --template 2012_03_26 day1.csv day2.csv
//! cargo run --release --bin family_merge -- --backend sqlite day1.csv
//! ```
//!
//! Without `--template` the template name is taken from the first file's stem.
//!
//! ## Environment Variables
//!
//! - FAMILY_BACKEND - text or sqlite (default: text), overridden by --backend
//! - FAMILY_OUTPUT_PATH - Directory for detection-record files (default: families)
//! - FAMILY_DB_PATH - SQLite database path (default: data/families.db) - used when --backend sqlite
//! - FAMILY_ENCODING - utf8 or latin1 (default: utf8)
//! - FAMILY_ESTIMATE_ORIGIN - Shift the template origin onto regenerated events (default: true)
//! - FAMILY_DEDUPLICATE - Drop repeated detections after merging (default: true)
//! - FAMILY_SORT - Order detections by trigger time (default: true)
//! - RUST_LOG - Logging level (optional, default: info)

use detection_family::config::{BackendType, FamilyConfig};
use detection_family::family_core::{
    merge_family_files, EventCatalog, FamilyWriter, ReadOptions, Template, TemplateEventBuilder,
};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

struct MergeArgs {
    backend: Option<BackendType>,
    template: Option<String>,
    inputs: Vec<PathBuf>,
}

fn parse_args() -> Result<MergeArgs, Box<dyn std::error::Error>> {
    let mut args = env::args().skip(1);
    let mut parsed = MergeArgs {
        backend: None,
        template: None,
        inputs: Vec::new(),
    };

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--backend" => {
                let value = args.next().ok_or("--backend needs a value")?;
                let backend: BackendType = value.parse()?;
                parsed.backend = Some(backend);
            }
            "--template" => {
                parsed.template = Some(args.next().ok_or("--template needs a value")?);
            }
            _ => parsed.inputs.push(PathBuf::from(arg)),
        }
    }

    if parsed.inputs.is_empty() {
        return Err("No input files given".into());
    }
    Ok(parsed)
}

fn template_name_from(path: &Path) -> Option<String> {
    path.file_stem().map(|s| s.to_string_lossy().into_owned())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    dotenv::dotenv().ok();

    let args = parse_args()?;
    let mut config = FamilyConfig::from_env();
    if let Some(backend) = args.backend {
        config.backend = backend;
    }

    let template_name = args
        .template
        .or_else(|| args.inputs.first().and_then(|p| template_name_from(p)))
        .ok_or("Could not determine template name")?;
    let template = Arc::new(Template::new(template_name));

    log::info!("🚀 Starting Family Merge");
    log::info!("   Template: {}", template.name());
    log::info!("   Inputs: {}", args.inputs.len());
    log::info!("   Output: {}", config.output_target().display());
    log::info!("   Deduplicate: {}, sort: {}", config.deduplicate, config.sort);

    let catalog = EventCatalog::new();
    let builder = TemplateEventBuilder;
    let options = ReadOptions {
        catalog: &catalog,
        encoding: config.encoding,
        estimate_origin: config.estimate_origin,
        builder: Some(&builder),
    };

    // A detection from another template aborts the merge before anything is written
    let mut merged = merge_family_files(&args.inputs, template, &options)?;

    if config.deduplicate {
        merged.deduplicate();
    }
    if config.sort {
        merged.sort();
    }

    let mut writer = FamilyWriter::new(config.backend, config.output_target(), config.encoding)?;
    log::info!("📊 Backend: {}", writer.backend_type());

    writer.write_family(&merged).await?;
    writer.flush().await?;

    log::info!("✅ Wrote {}", merged);
    Ok(())
}
