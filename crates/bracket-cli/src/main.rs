//! bracket CLI - parametric PSU mounting bracket generator
//!
//! Reads parameters from a TOML/JSON file and `--set` overrides, builds the
//! bracket and writes it as STL or 3MF.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use bracket::export::{self, Format};
use bracket::plate::{self, PlateSize};
use bracket::{BracketParams, Engine, EngineConfig, FIELDS};

#[derive(Parser)]
#[command(name = "bracket", version)]
#[command(about = "Parametric PSU mounting bracket generator", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Default)]
struct ParamArgs {
    /// Parameter file (.toml or .json); missing keys use defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override one parameter, e.g. `--set width=150 --set keyHole=on`
    #[arg(long = "set", value_name = "KEY=VALUE")]
    overrides: Vec<String>,

    /// Build plate as WIDTHxDEPTH or a preset name (x1c, a1-mini, mk4, ...)
    #[arg(long, default_value_t = PlateSize::default())]
    plate: PlateSize,

    /// Reduce the width so the bracket fits across the plate
    #[arg(long)]
    clamp_to_plate: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a bracket and export it
    Build {
        #[command(flatten)]
        params: ParamArgs,

        /// Output file (default: bracket-WxDxH.<format> in the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format (default: from the output extension, else 3mf)
        #[arg(short, long)]
        format: Option<Format>,

        /// Segments per full circle for holes and rounded corners
        #[arg(long, default_value_t = EngineConfig::default().circular_segments)]
        segments: u32,
    },
    /// Print validated parameters and derived dimensions as JSON
    Info {
        #[command(flatten)]
        params: ParamArgs,
    },
    /// Print the default parameters
    Defaults {
        /// Document format
        #[arg(long, value_enum, default_value_t = DocFormat::Toml)]
        format: DocFormat,
    },
    /// List the parameter schema
    Fields,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum DocFormat {
    Toml,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Build {
            params,
            output,
            format,
            segments,
        } => build(&params, output, format, segments),
        Commands::Info { params } => info(&params),
        Commands::Defaults { format } => {
            println!("{}", render_defaults(format)?);
            Ok(())
        }
        Commands::Fields => {
            println!("{}", serde_json::to_string_pretty(&FIELDS)?);
            Ok(())
        }
    }
}

fn init_logging(verbose: u8) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let env_filter = log_filter(verbose, std::env::var(EnvFilter::DEFAULT_ENV).ok());
    let fmt_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

/// Filter from `RUST_LOG` when it is set and parses, else a level picked by
/// the `-v` count.
fn log_filter(verbose: u8, rust_log: Option<String>) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| {
            let level = match verbose {
                0 => tracing::Level::WARN,
                1 => tracing::Level::INFO,
                _ => tracing::Level::DEBUG,
            };
            EnvFilter::default().add_directive(level.into())
        })
}

/// Parameters from file and overrides, clamped to the plate if requested.
/// Also returns the original width when clamping changed it.
fn load_params(args: &ParamArgs) -> Result<(BracketParams, Option<f64>)> {
    let mut params = match &args.config {
        Some(path) => read_config(path)?,
        None => BracketParams::default(),
    };
    for kv in &args.overrides {
        let (key, value) = kv
            .split_once('=')
            .with_context(|| format!("expected KEY=VALUE, got `{kv}`"))?;
        params.set(key.trim(), value)?;
    }
    let clamped = if args.clamp_to_plate {
        plate::clamp_to_plate(&mut params, &args.plate)
    } else {
        None
    };
    Ok((params, clamped))
}

fn read_config(path: &Path) -> Result<BracketParams> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    let params = if is_json {
        BracketParams::from_json(&text).with_context(|| format!("parsing {}", path.display()))?
    } else {
        BracketParams::from_toml(&text).with_context(|| format!("parsing {}", path.display()))?
    };
    Ok(params)
}

fn build(
    args: &ParamArgs,
    output: Option<PathBuf>,
    format: Option<Format>,
    segments: u32,
) -> Result<()> {
    let (params, clamped) = load_params(args)?;
    if let Some(original) = clamped {
        println!(
            "Width reduced from {original} to {} to fit the {} plate",
            params.width, args.plate
        );
    }
    let valid = params.validate()?;
    if !plate::fits(&params, &args.plate) {
        tracing::warn!(
            total_width = params.total_width(),
            depth = params.depth,
            plate = %args.plate,
            "bracket does not fit the build plate"
        );
    }

    let format = format
        .or_else(|| output.as_deref().and_then(Format::from_path))
        .unwrap_or_default();
    let output = output.unwrap_or_else(|| PathBuf::from(export::file_name(&params, format)));

    let engine = Engine::init(EngineConfig {
        circular_segments: segments,
        ..EngineConfig::default()
    })?;
    let (_, mesh) = bracket::build_mesh(&engine, &valid)?;
    export::write(&mesh, format, &params, &output)
        .with_context(|| format!("writing {}", output.display()))?;

    println!(
        "Exported {} ({} triangles, total width {} mm) to {}",
        format.extension().to_uppercase(),
        mesh.num_triangles(),
        valid.dimensions().total_width,
        output.display()
    );
    Ok(())
}

fn info(args: &ParamArgs) -> Result<()> {
    let (params, clamped) = load_params(args)?;
    println!("{}", serde_json::to_string_pretty(&info_report(&params, clamped, &args.plate)?)?);
    Ok(())
}

fn info_report(
    params: &BracketParams,
    clamped_from: Option<f64>,
    plate: &PlateSize,
) -> Result<serde_json::Value> {
    let valid = params.validate()?;
    Ok(serde_json::json!({
        "params": params,
        "dimensions": valid.dimensions(),
        "plate": plate,
        "maxInnerWidth": plate::max_inner_width(params.ear_width, params.bracket_thickness, plate.width),
        "fitsPlate": plate::fits(params, plate),
        "widthClampedFrom": clamped_from,
    }))
}

fn render_defaults(format: DocFormat) -> Result<String> {
    let defaults = BracketParams::default();
    Ok(match format {
        DocFormat::Toml => toml::to_string_pretty(&defaults)?,
        DocFormat::Json => serde_json::to_string_pretty(&defaults)?,
    })
}
