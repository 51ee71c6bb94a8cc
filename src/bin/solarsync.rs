use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use solarsync::app::{App, FetchOptions, ProgressSink};
use solarsync::config::{ConfigLoader, ResolvedConfig};
use solarsync::domain::CalendarDate;
use solarsync::error::SolarError;
use solarsync::fetch::HttpFetcher;
use solarsync::manifest::Manifest;
use solarsync::output::{JsonOutput, LogSink, OutputMode, print_summary};
use solarsync::store::Store;
use solarsync::window::DateWindow;

#[derive(Parser)]
#[command(name = "solarsync")]
#[command(about = "Fetch daily solar imagery and publish a slider manifest")]
#[command(version, author)]
struct Cli {
    /// Print machine-readable JSON to stdout
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Fetch missing images for the window and write the manifest (default)")]
    Fetch(FetchArgs),
    #[command(about = "Write the manifest only")]
    Manifest(CommonArgs),
    #[command(about = "Print the window frames without touching disk")]
    Window(CommonArgs),
}

#[derive(Args, Clone, Default)]
struct CommonArgs {
    #[arg(long)]
    config: Option<String>,

    /// Anchor day as YYYYMMDD (defaults to today, UTC)
    #[arg(long)]
    anchor: Option<String>,
}

#[derive(Args, Clone, Default)]
struct FetchArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Restrict the run to the named source; repeatable
    #[arg(long = "source")]
    sources: Vec<String>,

    #[arg(long)]
    dry_run: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<SolarError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &SolarError) -> u8 {
    match error {
        SolarError::NothingUsable { .. }
        | SolarError::ManifestRead(_)
        | SolarError::ManifestParse { .. } => 2,
        SolarError::Transport { .. }
        | SolarError::TransportStatus { .. }
        | SolarError::DeadlineExceeded { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    match cli.command.unwrap_or(Commands::Fetch(FetchArgs::default())) {
        Commands::Fetch(args) => run_fetch(args, output_mode),
        Commands::Manifest(args) => run_manifest(args, output_mode),
        Commands::Window(args) => run_window(args, output_mode),
    }
}

fn load(args: &CommonArgs) -> miette::Result<(ResolvedConfig, CalendarDate)> {
    let config = ConfigLoader::resolve(args.config.as_deref())?;
    let anchor = match &args.anchor {
        Some(raw) => raw.parse::<CalendarDate>()?,
        None => CalendarDate::today_utc(),
    };
    Ok((config, anchor))
}

fn sink(output_mode: OutputMode) -> &'static dyn ProgressSink {
    match output_mode {
        OutputMode::Json => &JsonOutput,
        OutputMode::Human => &LogSink,
    }
}

fn run_fetch(args: FetchArgs, output_mode: OutputMode) -> miette::Result<()> {
    let (config, anchor) = load(&args.common)?;
    let store = Store::from_current_dir(&config.out_dir)?;
    let fetcher = HttpFetcher::new(config.timeout)?;
    let options = FetchOptions::with_budget(args.dry_run, config.deadline);
    let app = App::new(store, fetcher, config);

    let report = app.run(anchor, &args.sources, options, sink(output_mode))?;
    match output_mode {
        OutputMode::Json => JsonOutput::print_report(&report).into_diagnostic()?,
        OutputMode::Human => print_summary(&report),
    }
    Ok(())
}

fn run_manifest(args: CommonArgs, output_mode: OutputMode) -> miette::Result<()> {
    let (config, anchor) = load(&args)?;
    let store = Store::from_current_dir(&config.out_dir)?;
    let path = store.manifest_path(&config.manifest);
    Manifest::build(&DateWindow::new(anchor, config.window)).write(&path)?;
    if matches!(output_mode, OutputMode::Human) {
        println!("manifest: {path}");
    }
    Ok(())
}

fn run_window(args: CommonArgs, output_mode: OutputMode) -> miette::Result<()> {
    let (config, anchor) = load(&args)?;
    let window = DateWindow::new(anchor, config.window);
    match output_mode {
        OutputMode::Json => JsonOutput::print_manifest(&Manifest::build(&window)).into_diagnostic()?,
        OutputMode::Human => {
            for entry in window.entries() {
                match window.proxy_date_for(entry) {
                    Some(proxy) => println!(
                        "{:+4} {} {} (shows {proxy})",
                        entry.offset, entry.date, entry.kind
                    ),
                    None => println!("{:+4} {} {}", entry.offset, entry.date, entry.kind),
                }
            }
        }
    }
    Ok(())
}
