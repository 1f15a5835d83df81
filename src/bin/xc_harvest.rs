use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use xc_harvest::catalog::XenoCantoClient;
use xc_harvest::config::{ConfigLoader, ConfigOverrides};
use xc_harvest::domain::SpeciesQuery;
use xc_harvest::download::HttpDownloader;
use xc_harvest::error::HarvestError;
use xc_harvest::output::{JsonOutput, LogSink, OutputMode, print_summary};
use xc_harvest::pacing::FixedDelay;
use xc_harvest::pipeline::{Pipeline, ProgressSink, RunOptions};
use xc_harvest::sanitize::{DEFAULT_MAX_COMPONENT_LENGTH, file_stem, sanitize};
use xc_harvest::spectrogram::{MelSpectrogramRenderer, SpectrogramRenderer};
use xc_harvest::store::SPECTROGRAM_SUFFIX;

#[derive(Parser)]
#[command(name = "xc-harvest")]
#[command(about = "Fetch xeno-canto recordings per species and render mel-spectrograms")]
#[command(version, author)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Download recordings and render spectrograms for the configured species")]
    Fetch(FetchArgs),
    #[command(about = "Print the catalog query for one species")]
    Query(QueryArgs),
    #[command(about = "Render a mel-spectrogram for a local audio file")]
    Render(RenderArgs),
    #[command(about = "Print the sanitized form of a file or directory name")]
    Sanitize(SanitizeArgs),
}

#[derive(Args)]
struct FetchArgs {
    #[arg(long)]
    config: Option<String>,

    #[arg(long)]
    country: Option<String>,

    #[arg(long)]
    quality: Option<String>,

    #[arg(long)]
    output_dir: Option<String>,

    #[arg(long)]
    dry_run: bool,

    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct QueryArgs {
    species: String,

    #[arg(long)]
    country: Option<String>,

    #[arg(long)]
    quality: Option<String>,
}

#[derive(Args)]
struct RenderArgs {
    audio: PathBuf,

    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct SanitizeArgs {
    name: String,

    #[arg(long, default_value_t = DEFAULT_MAX_COMPONENT_LENGTH)]
    max_len: usize,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<HarvestError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &HarvestError) -> u8 {
    match error {
        err if err.is_fatal() => 2,
        HarvestError::CatalogHttp(_)
        | HarvestError::CatalogStatus { .. }
        | HarvestError::DownloadHttp(_)
        | HarvestError::DownloadStatus { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Fetch(args) => run_fetch(args),
        Commands::Query(args) => run_query(args),
        Commands::Render(args) => run_render(args),
        Commands::Sanitize(args) => {
            println!("{}", sanitize(&args.name, args.max_len));
            Ok(())
        }
    }
}

fn run_fetch(args: FetchArgs) -> miette::Result<()> {
    let overrides = ConfigOverrides {
        country: args.country,
        quality: args.quality,
        output_dir: args.output_dir,
        api_key: None,
    };
    let config = ConfigLoader::resolve(args.config.as_deref(), overrides)?;
    let output_mode = if args.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };
    let options = RunOptions {
        dry_run: args.dry_run,
    };

    let catalog = XenoCantoClient::new(config.endpoint.clone())?;
    let downloader = HttpDownloader::new()?;
    let pacer = FixedDelay::new(config.request_delay);
    let pipeline = Pipeline::new(
        config,
        catalog,
        downloader,
        MelSpectrogramRenderer::new(),
        pacer,
    );

    let sink: &dyn ProgressSink = match output_mode {
        OutputMode::Json => &JsonOutput,
        OutputMode::Human => &LogSink,
    };
    let summary = pipeline.run(&options, sink)?;
    match output_mode {
        OutputMode::Json => JsonOutput::print_summary(&summary).into_diagnostic()?,
        OutputMode::Human => print_summary(&summary),
    }
    Ok(())
}

fn run_query(args: QueryArgs) -> miette::Result<()> {
    let query = SpeciesQuery::new(
        &args.species,
        args.country.as_deref(),
        args.quality.as_deref(),
    )?;
    println!("{}", query.query_string());
    Ok(())
}

fn run_render(args: RenderArgs) -> miette::Result<()> {
    let file_name = args
        .audio
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| miette::Report::msg("audio path has no file name"))?
        .to_string();
    let output = args.output.unwrap_or_else(|| {
        let base = sanitize(file_stem(&file_name), DEFAULT_MAX_COMPONENT_LENGTH);
        args.audio
            .with_file_name(format!("{base}{SPECTROGRAM_SUFFIX}"))
    });
    let summary = MelSpectrogramRenderer::new().render(&args.audio, &output, &file_name)?;
    println!(
        "{} (sr={}Hz, n_fft={}, hop={}, n_mels={}, {:.1}s)",
        output.display(),
        summary.sample_rate,
        summary.n_fft,
        summary.hop_length,
        summary.n_mels,
        summary.duration_secs
    );
    Ok(())
}
