use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use heatmap_cli::config::Config;
use heatmap_cli::http::{AppState, build_router};
use heatmap_cli::scheduler::{IntervalTicker, Scheduler};
use heatmap_cli::source::FeedSource;
use heatmap_core::{DurationSelector, FrameType, now_unix_secs, unix_to_iso8601};
use heatmap_store::{DataDir, ExactFetch};

#[derive(Parser)]
#[command(name = "heatmap", about = "Traffic-density heatmap engine")]
struct Cli {
    /// TOML config file (defaults apply when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll, render and serve until Ctrl-C
    Run,

    /// Serve the existing frame history over HTTP
    Serve,

    /// Run exactly one poll/render cycle and exit
    Tick,

    /// List frames captured in the past N minutes
    Frames {
        /// 30, 60, 360 or 1440
        #[arg(long)]
        duration: DurationSelector,

        #[arg(long = "type", default_value = "rolling")]
        frame_type: FrameType,
    },

    /// Print the image path of one frame
    Frame {
        #[arg(long = "type")]
        frame_type: FrameType,

        /// Capture time, unix seconds
        #[arg(long)]
        at: i64,
    },

    /// Show per-window frame counts
    Stats,
}

fn init_tracing(verbose: bool, default_level: tracing::Level) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(default_level.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = match cli.command {
        Commands::Run | Commands::Serve => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };
    init_tracing(cli.verbose, default_level);

    let config = Config::load(cli.config.as_deref())?;
    let data = open_data_dir(&cli, &config)?;

    match &cli.command {
        Commands::Run => cmd_run(&config, &data).await,
        Commands::Serve => cmd_serve(&config, &data).await,
        Commands::Tick => cmd_tick(&config, &data).await,
        Commands::Frames {
            duration,
            frame_type,
        } => cmd_frames(&data, *duration, *frame_type),
        Commands::Frame { frame_type, at } => cmd_frame(&data, *frame_type, *at),
        Commands::Stats => cmd_stats(&data),
    }
}

fn open_data_dir(cli: &Cli, config: &Config) -> Result<DataDir> {
    let base_dir = config.resolve_data_dir(cli.data_dir.as_deref());
    DataDir::open(base_dir.as_deref()).context("failed to open data directory")
}

fn build_scheduler(config: &Config, data: &DataDir) -> Result<Scheduler<FeedSource>> {
    let source = FeedSource::new(&config.feed_url).context("failed to build feed client")?;
    let index = data.open_index().context("failed to open frame index")?;
    Ok(Scheduler::new(
        source,
        config.binner()?,
        config.build_windows()?,
        data.renderer(config.grid.pixel_scale),
        index,
    ))
}

/// Resolves on Ctrl-C, or when something else cancels the token first.
async fn shutdown_signal(cancel: CancellationToken) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::warn!("failed to listen for Ctrl-C: {e}");
                cancel.cancelled().await;
            }
        }
        _ = cancel.cancelled() => {}
    }
    tracing::info!("shutdown requested");
    cancel.cancel();
}

async fn serve_until(config: &Config, data: &DataDir, cancel: CancellationToken) -> Result<()> {
    let index = data.open_reader().context("failed to open frame index")?;
    let router = build_router(Arc::new(AppState::new(index)));

    let listener = tokio::net::TcpListener::bind(&config.listen)
        .await
        .with_context(|| format!("failed to bind {}", config.listen))?;
    tracing::info!("serving frames from {} on {}", data.base().display(), config.listen);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(cancel))
        .await
        .context("HTTP server failed")
}

async fn cmd_run(config: &Config, data: &DataDir) -> Result<()> {
    let mut scheduler = build_scheduler(config, data)?;
    let cancel = CancellationToken::new();

    let period = Duration::from_secs(config.poll_interval_secs);
    let mut ticker = IntervalTicker::new(period, cancel.clone());
    tracing::info!(
        "polling {} every {}s over {:?}",
        config.feed_url,
        config.poll_interval_secs,
        config.bounds
    );
    let scheduler_task = tokio::spawn(async move {
        let ticks = scheduler.run(&mut ticker).await;
        if let Err(e) = scheduler.index().checkpoint_truncate() {
            tracing::warn!("WAL checkpoint on shutdown failed: {e}");
        }
        ticks
    });

    let served = serve_until(config, data, cancel.clone()).await;
    cancel.cancel();
    let ticks = scheduler_task.await.context("scheduler task panicked")?;
    tracing::info!("stopped after {ticks} ticks");
    served
}

async fn cmd_serve(config: &Config, data: &DataDir) -> Result<()> {
    serve_until(config, data, CancellationToken::new()).await
}

async fn cmd_tick(config: &Config, data: &DataDir) -> Result<()> {
    let mut scheduler = build_scheduler(config, data)?;
    let summary = scheduler.tick(now_unix_secs()).await;

    println!("at:       {} ({})", summary.at, unix_to_iso8601(summary.at));
    println!(
        "fetched:  {}{}",
        summary.fetched,
        if summary.fetch_failed { " (fetch failed)" } else { "" }
    );
    println!("binned:   {}", summary.binned);
    println!("dropped:  {}", summary.dropped);
    println!("frames:   {}", summary.frames_written);
    if summary.failures > 0 {
        bail!("{} frame(s) failed to render or index", summary.failures);
    }
    Ok(())
}

fn cmd_frames(data: &DataDir, duration: DurationSelector, frame_type: FrameType) -> Result<()> {
    let index = data.open_reader().context("failed to open frame index")?;
    let frames = index
        .frames_for_duration(duration, frame_type, now_unix_secs())
        .context("frame range query failed")?;

    if frames.is_empty() {
        eprintln!("(no {frame_type} frames in the past {} minutes)", duration.minutes());
    }
    for frame in frames {
        println!("{}\t{}", frame.timestamp, frame.path);
    }
    Ok(())
}

fn cmd_frame(data: &DataDir, frame_type: FrameType, at: i64) -> Result<()> {
    let index = data.open_reader().context("failed to open frame index")?;
    match index
        .fetch_exact(frame_type, at)
        .context("frame lookup failed")?
    {
        ExactFetch::Found { frame, .. } => {
            println!("{}", frame.file_path.display());
            Ok(())
        }
        ExactFetch::NotIndexed => bail!("no {frame_type} frame indexed at {at}"),
        ExactFetch::FileMissing(frame) => bail!(
            "{frame_type} frame at {at} is indexed but missing on disk: {}",
            frame.file_path.display()
        ),
    }
}

fn cmd_stats(data: &DataDir) -> Result<()> {
    let index = data.open_reader().context("failed to open frame index")?;
    let stats = index.stats().context("failed to read frame stats")?;

    println!("data_dir:     {}", data.base().display());
    for s in stats {
        let latest = match s.latest {
            Some(at) => format!("{at} ({})", unix_to_iso8601(at)),
            None => "-".to_string(),
        };
        println!("{:<13} frames={} latest={latest}", format!("{}:", s.frame_type), s.count);
    }
    Ok(())
}
