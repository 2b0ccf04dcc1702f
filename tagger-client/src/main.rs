//! Event tagger command-line client
//!
//! Each invocation loads configuration, opens local storage, performs one
//! action against the backend and exits. `clock watch` keeps running until
//! Ctrl+C.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tagger_client::api::{HttpTaggerApi, TaggerApi};
use tagger_client::app::{AppSettings, TaggerApp};
use tagger_client::stopwatch::POLL_PERIOD;
use tagger_common::clip::{clip_window, embed_url, extract_video_id, CsvTable, DEFAULT_OFFSET_SECS};
use tagger_common::config::{
    default_config_path, resolve_settings, write_toml_config, CliOverrides, LoggingConfig,
    ResolvedSettings, TomlConfig, API_URL_ENV,
};
use tagger_common::match_clock::format_match_clock;
use tagger_common::model::{CrossOutcome, Event, ExportKind, PitchOptions, ShotOutcome, Team};
use tagger_common::storage::{FileStore, LocalStore};
use tagger_common::zone::{select_zone, Grid, Point, Surface};
use tokio::signal;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "tagger")]
#[command(about = "Live match event tagging client")]
#[command(version)]
struct Cli {
    /// Config file (default: <config_dir>/event-tagger/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backend base URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Local storage directory (session id, tags)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Directory exported files are saved into
    #[arg(long, global = true)]
    download_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Session identity
    #[command(subcommand)]
    Session(SessionCommand),

    /// Match clock
    #[command(subcommand)]
    Clock(ClockCommand),

    /// Tagged events
    #[command(subcommand)]
    Events(EventsCommand),

    /// Tag an event at the current clock time
    Tag(TagArgs),

    /// Event-type tag configuration
    #[command(subcommand)]
    Tags(TagsCommand),

    /// Compute the pitch zone for a click (no backend needed)
    Zone(ZoneArgs),

    /// Download an export
    Export {
        /// csv, xml or zip
        kind: ExportKind,
        #[arg(long)]
        filename: Option<String>,
    },

    /// Pitch zones and hot-zone counts
    Pitch,

    /// Heatmap figure as JSON
    Heatmap {
        #[arg(long)]
        event_type: Option<String>,
    },

    /// Home vs away comparison figure as JSON
    Chart,

    /// Derive a video clip window from a CSV row (no backend needed)
    Clip(ClipArgs),

    /// Local configuration file
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write the effective settings to the config file
    Init {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
enum SessionCommand {
    Show,
    /// Clear this session's events and clock, then start a new session
    Reset {
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ClockCommand {
    Start,
    Stop,
    Reset,
    Status,
    /// Print the clock every poll until Ctrl+C
    Watch,
}

#[derive(Subcommand, Debug)]
enum EventsCommand {
    List,
    Stats,
    Delete { id: u64 },
    /// Delete every event of the session
    Clear {
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
enum TagsCommand {
    List,
    /// Add a tag; a prefix of a known name snaps to that name
    Add { name: String },
    Remove { name: String },
    /// Known names not yet configured
    Suggest,
}

#[derive(Args, Debug)]
struct TagArgs {
    event_type: String,

    #[arg(long, default_value = "home")]
    team: Team,

    #[arg(long)]
    cross: Option<CrossOutcome>,

    #[arg(long)]
    shot: Option<ShotOutcome>,

    /// Zone index
    #[arg(long, conflicts_with = "click")]
    zone: Option<u32>,

    /// Click position `x,y`
    #[arg(long, requires = "surface", value_parser = parse_point)]
    click: Option<Point>,

    /// Pitch surface `left,top,width,height`
    #[arg(long, requires = "click", value_parser = parse_surface)]
    surface: Option<Surface>,
}

#[derive(Args, Debug)]
struct ZoneArgs {
    /// Click position `x,y`
    #[arg(long, value_parser = parse_point)]
    click: Point,

    /// Pitch surface `left,top,width,height`
    #[arg(long, value_parser = parse_surface)]
    surface: Surface,

    #[arg(long)]
    rows: Option<u32>,

    #[arg(long)]
    columns: Option<u32>,
}

#[derive(Args, Debug)]
struct ClipArgs {
    csv: PathBuf,

    /// Zero-based data row
    #[arg(long)]
    row: usize,

    #[arg(long, default_value = "time_in_second")]
    start_column: String,

    #[arg(long)]
    end_column: Option<String>,

    /// Seconds either side of the start when no end column is used
    #[arg(long, default_value_t = DEFAULT_OFFSET_SECS)]
    offset: f64,

    /// Video URL to build an embed link for
    #[arg(long)]
    url: Option<String>,
}

fn parse_numbers<const N: usize>(s: &str) -> std::result::Result<[f64; N], String> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse::<f64>().map_err(|e| format!("{}: {}", p.trim(), e)))
        .collect::<std::result::Result<_, _>>()?;
    parts
        .try_into()
        .map_err(|v: Vec<f64>| format!("expected {} comma-separated numbers, got {}", N, v.len()))
}

fn parse_point(s: &str) -> std::result::Result<Point, String> {
    let [x, y] = parse_numbers::<2>(s)?;
    Ok(Point::new(x, y))
}

fn parse_surface(s: &str) -> std::result::Result<Surface, String> {
    let [left, top, width, height] = parse_numbers::<4>(s)?;
    Ok(Surface::new(left, top, width, height))
}

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "tagger={level},tagger_client={level},tagger_common={level}",
            level = logging.level
        ))
    });

    // Command output owns stdout; logs go to the file or stderr
    let (file_layer, stderr_layer) = match &logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file));
            (Some(layer), None)
        }
        None => (
            None,
            Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
        ),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();
    Ok(())
}

fn build_app(settings: &ResolvedSettings) -> Result<TaggerApp> {
    let api: Arc<dyn TaggerApi> =
        Arc::new(HttpTaggerApi::new(&settings.api_url).context("Failed to create HTTP client")?);
    let store: Arc<dyn LocalStore> = Arc::new(FileStore::in_dir(&settings.data_dir));
    let app = TaggerApp::new(
        api,
        store,
        AppSettings {
            download_dir: settings.download_dir.clone(),
            pitch: settings.pitch.into(),
        },
    )?;
    Ok(app)
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        if is_backend_failure(&e) {
            eprintln!(
                "Check that the tagging backend is reachable (--api-url or {})",
                API_URL_ENV
            );
        }
        std::process::exit(1);
    }
}

/// Whether any error in the chain came from the backend or the transport
fn is_backend_failure(e: &anyhow::Error) -> bool {
    e.chain()
        .filter_map(|cause| cause.downcast_ref::<tagger_client::Error>())
        .any(|cause| cause.is_remote())
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let toml = TomlConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let settings = resolve_settings(
        &CliOverrides {
            api_url: cli.api_url.clone(),
            data_dir: cli.data_dir.clone(),
            download_dir: cli.download_dir.clone(),
            log_level: cli.log_level.clone(),
        },
        &toml,
    );
    init_logging(&settings.logging)?;
    debug!(api_url = %settings.api_url, data_dir = %settings.data_dir.display(), "Settings resolved");

    match cli.command {
        Command::Zone(args) => run_zone(args, settings.pitch.into()),
        Command::Clip(args) => run_clip(args),
        Command::Config(ConfigCommand::Init { force }) => {
            let path = match cli.config.clone().or_else(default_config_path) {
                Some(path) => path,
                None => bail!("Could not determine config directory; pass --config"),
            };
            init_config(&path, &settings, force)
        }
        command => {
            let mut app = build_app(&settings)?;
            run_remote(&mut app, command).await
        }
    }
}

async fn run_remote(app: &mut TaggerApp, command: Command) -> Result<()> {
    match command {
        Command::Session(SessionCommand::Show) => {
            println!("{}", app.session_id());
        }
        Command::Session(SessionCommand::Reset { yes }) => {
            if !yes {
                bail!("This deletes all events of the session; pass --yes to confirm");
            }
            app.stopwatch().mount().await?;
            let fresh = app.reset_everything().await?;
            println!("New session: {}", fresh);
        }
        Command::Clock(clock) => run_clock(app, clock).await?,
        Command::Events(events) => run_events(app, events).await?,
        Command::Tag(args) => run_tag(app, args).await?,
        Command::Tags(tags) => run_tags(app, tags)?,
        Command::Export { kind, filename } => {
            let path = app.export(kind, filename.as_deref()).await?;
            println!("Saved {}", path.display());
        }
        Command::Pitch => {
            let data = app.refresh_pitch().await?;
            println!("Grid {}x{}", data.rows, data.columns);
            for (zone, center) in &data.zone_dict {
                let count = app.hot_zones().get(zone).copied().unwrap_or(0.0);
                println!("zone {:>3}  center {:?}  events {}", zone, center, count);
            }
        }
        Command::Heatmap { event_type } => {
            let figure = app.heatmap(event_type).await?;
            println!("{}", serde_json::to_string_pretty(&figure)?);
        }
        Command::Chart => {
            let figure = app.divergent_chart().await?;
            println!("{}", serde_json::to_string_pretty(&figure)?);
        }
        Command::Zone(args) => run_zone(args, app.pitch())?,
        Command::Clip(args) => run_clip(args)?,
        Command::Config(_) => bail!("Config commands run without the backend"),
    }
    Ok(())
}

async fn run_clock(app: &TaggerApp, command: ClockCommand) -> Result<()> {
    let clock = app.stopwatch();
    let snapshot = clock.mount().await.context("Failed to sync stopwatch")?;

    let snapshot = match command {
        ClockCommand::Start => clock.start().await?,
        ClockCommand::Stop => clock.stop().await?,
        ClockCommand::Reset => clock.reset().await?,
        ClockCommand::Status => snapshot,
        ClockCommand::Watch => return watch_clock(app).await,
    };

    let state = if snapshot.running { "running" } else { "stopped" };
    println!("{} ({})", snapshot.display(), state);
    Ok(())
}

async fn watch_clock(app: &TaggerApp) -> Result<()> {
    let mut ticker = tokio::time::interval(POLL_PERIOD);
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                let snapshot = app.stopwatch().snapshot().await;
                let state = if snapshot.running { "running" } else { "stopped" };
                println!("{} ({})", snapshot.display(), state);
            }
        }
    }

    app.stopwatch().discard().await;
    info!("Clock watch stopped");
    Ok(())
}

async fn run_events(app: &mut TaggerApp, command: EventsCommand) -> Result<()> {
    match command {
        EventsCommand::List => {
            let list = app.events().fetch_events().await?;
            if list.is_empty() {
                println!("No events");
            }
            for event in &list {
                print_event(event);
            }
        }
        EventsCommand::Stats => {
            println!(
                "{:<6} {:>5} {:>5} {:>9} {:>7} {:>9} {:>11}",
                "team", "goals", "shots", "on target", "crosses", "completed", "transitions"
            );
            for row in app.events().fetch_stats().await? {
                println!(
                    "{:<6} {:>5} {:>5} {:>9} {:>7} {:>9} {:>11}",
                    row.team,
                    row.goals,
                    row.shots,
                    row.shots_on_target,
                    row.cross_attempts,
                    row.cross_completed,
                    row.transitions
                );
            }
        }
        EventsCommand::Delete { id } => {
            app.events().fetch_events().await?;
            app.delete_event(id).await?;
            println!("Deleted event {}", id);
        }
        EventsCommand::Clear { yes } => {
            if !yes {
                bail!("This deletes all events of the session; pass --yes to confirm");
            }
            app.events().clear_all_events().await?;
            println!("All events deleted");
        }
    }
    Ok(())
}

fn print_event(event: &Event) {
    let outcome = |o: Option<String>| o.unwrap_or_else(|| "-".to_string());
    println!(
        "{:>4}  {:>6}  {:<4}  {:<14}  cross {:<11}  shot {:<7}  zone {}",
        event.id,
        format_match_clock(event.time_in_second),
        event.team,
        event.event_type,
        outcome(event.cross_outcome.map(|c| c.to_string())),
        outcome(event.shot_outcome.map(|s| s.to_string())),
        outcome(event.zone.map(|z| z.to_string())),
    );
}

async fn run_tag(app: &mut TaggerApp, args: TagArgs) -> Result<()> {
    app.mount().await.context("Failed to sync with backend")?;

    if !app.tags().iter().any(|t| t == &args.event_type) {
        bail!(
            "Unknown event type '{}'; add it with `tagger tags add`",
            args.event_type
        );
    }

    let form = app.form_mut();
    form.set_team(args.team);
    form.set_event_type(&args.event_type);
    if let Some(cross) = args.cross {
        form.set_cross_outcome(cross);
    }
    if let Some(shot) = args.shot {
        form.set_shot_outcome(shot)?;
    }

    match (args.zone, args.click, args.surface) {
        (Some(zone), _, _) => {
            if app.select_zone(zone).is_none() {
                bail!("Zone {} is outside the {}-zone grid", zone, app.grid().zone_count());
            }
        }
        (None, Some(point), Some(surface)) => {
            if app.click_zone(surface, point).is_none() {
                bail!("Click is outside the pitch surface");
            }
        }
        _ => {}
    }

    let event = app.tag_event().await?;
    print_event(&event);
    Ok(())
}

fn run_tags(app: &mut TaggerApp, command: TagsCommand) -> Result<()> {
    match command {
        TagsCommand::List => {
            for tag in app.tags() {
                println!("{}", tag);
            }
        }
        TagsCommand::Add { name } => match app.add_tag(&name)? {
            Some(added) => println!("Added {}", added),
            None => println!("Nothing to add"),
        },
        TagsCommand::Remove { name } => {
            if app.remove_tag(&name)? {
                println!("Removed {}", name);
            } else {
                println!("No tag named {}", name);
            }
        }
        TagsCommand::Suggest => {
            for tag in app.tag_suggestions() {
                println!("{}", tag);
            }
        }
    }
    Ok(())
}

/// Persist the effective settings so later runs need no flags
fn init_config(path: &Path, settings: &ResolvedSettings, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists; pass --force to replace it", path.display());
    }

    let config = TomlConfig {
        api_url: Some(settings.api_url.clone()),
        data_dir: Some(settings.data_dir.clone()),
        download_dir: Some(settings.download_dir.clone()),
        logging: settings.logging.clone(),
        pitch: settings.pitch,
    };
    write_toml_config(&config, path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    info!(path = %path.display(), "Config written");
    println!("Wrote {}", path.display());
    Ok(())
}

fn run_zone(args: ZoneArgs, pitch: PitchOptions) -> Result<()> {
    let grid = Grid::new(
        args.rows.unwrap_or(pitch.rows),
        args.columns.unwrap_or(pitch.columns),
    )?;
    match select_zone(args.surface, args.click, grid) {
        Some(zone) => println!("{}", zone),
        None => println!("no selection"),
    }
    Ok(())
}

fn run_clip(args: ClipArgs) -> Result<()> {
    let table = read_table(&args.csv)?;
    let window = clip_window(
        &table,
        args.row,
        &args.start_column,
        args.end_column.as_deref(),
        args.offset,
    )?;
    println!("start {}s  end {}s", window.start, window.end);

    if let Some(url) = &args.url {
        let video_id = extract_video_id(url)?;
        println!("{}", embed_url(&video_id, Some(window)));
    }
    Ok(())
}

fn read_table(path: &Path) -> Result<CsvTable> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(CsvTable::parse(&text)?)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received terminate signal"),
    }
}
