//! rasterhub - multi-format image access from the command line.
//!
//! This binary wires the format registry, session controller, metadata
//! normalizer and region composer into four small workflows.

use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rasterhub::config::{Cli, Command, ConvertConfig, FormatsConfig, InfoConfig, RegionConfig};
use rasterhub::io::FileStream;
use rasterhub::meta::TagValue;
use rasterhub::{FormatRegistry, MetaSession, RegionReader, Session};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Formats(config) => run_formats(config),
        Command::Info(config) => run_info(config),
        Command::Convert(config) => run_convert(config),
        Command::Region(config) => run_region(config),
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "rasterhub=debug"
    } else {
        "rasterhub=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

// =============================================================================
// Formats Command
// =============================================================================

/// One row of `formats` output.
#[derive(Debug, Serialize)]
struct FormatReport {
    name: &'static str,
    long_name: &'static str,
    codec: &'static str,
    version: &'static str,
    extensions: Vec<&'static str>,
    read: bool,
    write: bool,
    multipage_write: bool,
}

fn run_formats(config: FormatsConfig) -> ExitCode {
    let registry = FormatRegistry::with_default_codecs();

    if config.json {
        let formats: Vec<FormatReport> = registry
            .codecs()
            .flat_map(|codec| {
                let descriptor = codec.descriptor();
                descriptor.sub_formats.iter().map(move |sf| FormatReport {
                    name: sf.name,
                    long_name: sf.long_name,
                    codec: descriptor.name,
                    version: descriptor.version,
                    extensions: sf.extension_list().collect(),
                    read: sf.can_read,
                    write: sf.can_write,
                    multipage_write: sf.can_write_multipage,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&formats).unwrap_or_default());
        return ExitCode::SUCCESS;
    }

    println!("{:<8} {:<32} {:<16} {}", "name", "long name", "extensions", "capabilities");
    for codec in registry.codecs() {
        for sf in &codec.descriptor().sub_formats {
            let mut caps = Vec::new();
            if sf.can_read {
                caps.push("read");
            }
            if sf.can_write {
                caps.push("write");
            }
            if sf.can_write_multipage {
                caps.push("multipage");
            }
            println!(
                "{:<8} {:<32} {:<16} {}",
                sf.name,
                sf.long_name,
                sf.extensions,
                caps.join(",")
            );
        }
    }
    ExitCode::SUCCESS
}

// =============================================================================
// Info Command
// =============================================================================

fn run_info(config: InfoConfig) -> ExitCode {
    let mut meta = MetaSession::with_default_codecs();
    if let Err(e) = open_input(
        meta.session_mut(),
        &config.input,
        config.input_format.as_deref(),
        config.input_options.clone(),
    ) {
        error!("Failed to open '{}': {}", config.input, e);
        return ExitCode::FAILURE;
    }

    let map = match meta.metadata(config.page) {
        Ok(map) => map,
        Err(e) => {
            error!("Failed to parse page {}: {}", config.page, e);
            return ExitCode::FAILURE;
        }
    };

    if config.json {
        let mut object = serde_json::Map::new();
        for (key, value) in map.iter() {
            object.insert(key.to_string(), tag_to_json(value));
        }
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::Value::Object(object)).unwrap_or_default()
        );
    } else {
        for (key, value) in map.iter() {
            println!("{key}: {value}");
        }
    }
    ExitCode::SUCCESS
}

fn tag_to_json(value: &TagValue) -> serde_json::Value {
    match value {
        TagValue::Str(s) => serde_json::Value::String(s.clone()),
        TagValue::Int(v) => serde_json::Value::from(*v),
        TagValue::Float(v) => serde_json::Value::from(*v),
    }
}

// =============================================================================
// Convert Command
// =============================================================================

fn run_convert(config: ConvertConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let registry = FormatRegistry::with_default_codecs();
    let mut reader = Session::new(registry.clone());
    if let Err(e) = open_input(
        &mut reader,
        &config.input,
        config.input_format.as_deref(),
        config.input_options.clone(),
    ) {
        error!("Failed to open '{}': {}", config.input, e);
        return ExitCode::FAILURE;
    }

    let pages = match reader.page_count() {
        Ok(pages) => pages,
        Err(e) => {
            error!("Failed to read page count: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let pages = if pages > 1 && !registry.supports_multipage_writing(&config.format) {
        warn!(
            "'{}' cannot hold {} pages; writing page 0 only",
            config.format, pages
        );
        1
    } else {
        pages
    };

    let mut writer = Session::new(registry);
    if let Err(e) = writer.create_file(
        &config.output,
        &config.format,
        config.output_options.clone(),
        config.quality,
    ) {
        error!("Failed to create '{}': {}", config.output, e);
        return ExitCode::FAILURE;
    }

    for page in 0..pages {
        let image = match reader.read_image(page) {
            Ok(image) => image,
            Err(e) => {
                error!("Failed to read page {}: {}", page, e);
                return ExitCode::FAILURE;
            }
        };
        if let Err(e) = writer.write_image(&image, page) {
            error!("Failed to write page {}: {}", page, e);
            return ExitCode::FAILURE;
        }
        info!(
            "page {}: {}x{}, {} channel(s), {} bit",
            page,
            image.info().width,
            image.info().height,
            image.info().samples,
            image.info().depth
        );
    }
    writer.end();
    reader.end();

    info!("Wrote {} page(s) to '{}'", pages, config.output);
    ExitCode::SUCCESS
}

// =============================================================================
// Region Command
// =============================================================================

fn run_region(config: RegionConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let mut reader = match RegionReader::open(&config.input) {
        Ok(reader) => reader,
        Err(e) => {
            error!("Failed to open '{}': {}", config.input, e);
            return ExitCode::FAILURE;
        }
    };

    let region = match reader.read_region(
        config.page,
        config.x,
        config.y,
        config.x + config.width,
        config.y + config.height,
        config.level,
    ) {
        Ok(region) => region,
        Err(e) => {
            error!(
                "Failed to read {}x{} region at ({}, {}) level {}: {}",
                config.width, config.height, config.x, config.y, config.level, e
            );
            return ExitCode::FAILURE;
        }
    };

    let mut writer = Session::with_default_codecs();
    let written = writer
        .create_file(&config.output, &config.format, None, config.quality)
        .and_then(|_| writer.write_image(&region, 0));
    if let Err(e) = written {
        error!("Failed to write '{}': {}", config.output, e);
        return ExitCode::FAILURE;
    }
    writer.end();

    info!(
        "Extracted {}x{} region at ({}, {}) level {} into '{}'",
        region.info().width,
        region.info().height,
        config.x,
        config.y,
        config.level,
        config.output
    );
    ExitCode::SUCCESS
}

// =============================================================================
// Shared helpers
// =============================================================================

/// Open the input file, by forced format name when given, by content
/// detection otherwise.
fn open_input(
    session: &mut Session,
    input: &str,
    format: Option<&str>,
    options: Option<String>,
) -> rasterhub::Result<()> {
    match format {
        Some(format) => {
            let stream = FileStream::open(input)?;
            session.start_read_as(Box::new(stream), format, options)
        }
        None => session.open_file(input),
    }
}
