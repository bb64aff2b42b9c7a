#![warn(missing_docs)]
//! # gut-log binary
//!
//! Command-line shell for gut-log. Each subcommand plays one screen focus or
//! user action against the configured backend.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use gut_log_app::{
    AppConfig, AppError, CaptureController, DEFAULT_BASE_URL, DEFAULT_LOG_LEVEL,
    DEFAULT_TIMEOUT_SECS, Dashboard, app_version, init_logging, summarize_capture,
};
use gut_log_capture::{CameraBackend, FileCamera, SyntheticCamera};
use gut_log_core::{FeedKind, format_clock_time, format_display_date};
use gut_log_permission::{PermissionGate, PermissionState, StaticPermissionProvider};
use gut_log_sync::{FeedSource, HttpFeedSource, fetch_archive, fetch_health};
use gut_log_ui::{ScreenId, UserNotice, format_confidence};
use gut_log_upload::UploadClient;

#[derive(Debug, Parser)]
#[command(name = "gut-log", version = app_version(), about = "Stool log client")]
struct Cli {
    /// Backend origin.
    #[arg(long, env = "GUT_LOG_API_BASE_URL", default_value = DEFAULT_BASE_URL, global = true)]
    api_base_url: String,
    /// Per-request timeout in seconds.
    #[arg(long, env = "GUT_LOG_HTTP_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS, global = true)]
    http_timeout_secs: u64,
    /// JPEG compression factor in (0, 1].
    #[arg(long, env = "GUT_LOG_CAPTURE_QUALITY", default_value_t = 0.5, global = true)]
    capture_quality: f32,
    /// Log level for gut_log targets when RUST_LOG is unset.
    #[arg(long, env = "GUT_LOG_LOG_LEVEL", default_value = DEFAULT_LOG_LEVEL, global = true)]
    log_level: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Focus the home screen: weekly summary and tip.
    Home,
    /// Focus the history screen: weekly rows and calendar dots.
    History,
    /// Capture one still and classify it.
    Capture(CaptureArgs),
    /// List every archived log.
    Archive,
    /// Probe backend health and print configuration.
    Status,
}

#[derive(Debug, Args)]
struct CaptureArgs {
    /// Image file used as the camera.
    #[arg(long, conflicts_with = "synthetic", required_unless_present = "synthetic")]
    image: Option<PathBuf>,
    /// Use a generated test pattern as the camera.
    #[arg(long)]
    synthetic: bool,
    /// Answer the camera prompt with a refusal.
    #[arg(long)]
    deny_camera: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(error) = init_logging(&cli.log_level) {
        eprintln!("failed to start gut-log: {error}");
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(code) => code,
        Err(error) => {
            eprintln!("gut-log: {error}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, AppError> {
    let config = AppConfig::new(
        &cli.api_base_url,
        cli.http_timeout_secs,
        cli.capture_quality,
    )?;
    let source: Arc<dyn FeedSource> = Arc::new(HttpFeedSource::new(config.api.clone())?);

    match cli.command {
        Command::Home => show_home(source).await?,
        Command::History => show_history(source).await?,
        Command::Capture(args) => return run_capture(&config, args).await,
        Command::Archive => show_archive(source.as_ref()).await?,
        Command::Status => show_status(&config, source.as_ref()).await?,
    }
    Ok(ExitCode::SUCCESS)
}

async fn show_home(source: Arc<dyn FeedSource>) -> Result<(), AppError> {
    let dashboard = Dashboard::new(source);
    let report = dashboard.on_focus(ScreenId::Home).await;
    let view = dashboard.home();

    println!("{}", view.greeting);
    println!("{}", view.summary);
    println!("[{}] {}", view.tip.status, view.tip.tip);
    print_degraded(&report.degraded());
    Ok(())
}

async fn show_history(source: Arc<dyn FeedSource>) -> Result<(), AppError> {
    let dashboard = Dashboard::new(source);
    let report = dashboard.on_focus(ScreenId::History).await;
    let view = dashboard.history();

    for row in &view.rows {
        match &row.time {
            Some(time) => println!("{:<14} {:<12} {time}", row.date, row.label),
            None => println!("{:<14} {}", row.date, row.label),
        }
    }
    if !view.marking.is_empty() {
        println!();
    }
    for (date, markers) in &view.marking {
        println!("{date} {}", "●".repeat(markers.len()));
    }
    print_degraded(&report.degraded());
    Ok(())
}

fn print_degraded(kinds: &[FeedKind]) {
    for kind in kinds {
        eprintln!("note: {} could not be refreshed", kind.as_str());
    }
}

async fn run_capture(config: &AppConfig, args: CaptureArgs) -> Result<ExitCode, AppError> {
    let answer = if args.deny_camera {
        PermissionState::Denied
    } else {
        PermissionState::Granted
    };
    let gate = PermissionGate::new(Arc::new(StaticPermissionProvider::new(
        PermissionState::Unknown,
        answer,
    )));
    let camera: Arc<dyn CameraBackend> = match args.image {
        Some(path) => Arc::new(FileCamera::new(path)),
        None => Arc::new(SyntheticCamera::new()),
    };
    let controller = CaptureController::new(
        gate,
        camera,
        UploadClient::http(&config.api)?,
        config.capture_quality,
    );

    let summary = summarize_capture(&controller.capture_after_prompt().await);
    if let Some(notice) = &summary.notice {
        print_notice(notice);
    }

    Ok(if summary.succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_notice(notice: &UserNotice) {
    println!("{}: {}", notice.title(), notice.message());
}

async fn show_archive(source: &dyn FeedSource) -> Result<(), AppError> {
    let logs = fetch_archive(source).await?;
    if logs.is_empty() {
        println!("No logs yet.");
    }
    for log in logs {
        println!(
            "#{:<4} {:<14} {} {:<12} {}",
            log.id,
            format_display_date(log.timestamp.date()),
            format_clock_time(log.timestamp.time()),
            log.label,
            format_confidence(log.confidence)
        );
    }
    Ok(())
}

async fn show_status(config: &AppConfig, source: &dyn FeedSource) -> Result<(), AppError> {
    println!("gut-log {}", app_version());
    println!("api_base_url={}", config.api.base_url());
    println!("http_timeout_secs={}", config.api.timeout().as_secs());
    println!("capture_quality={}", config.capture_quality.factor());
    let health = fetch_health(source).await?;
    println!("backend={}", health.status);
    Ok(())
}
