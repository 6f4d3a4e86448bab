//! CLI parsing and orchestration. Parses args, authenticates, fetches, and writes each
//! requested export format. Maps errors to exit codes.

use crate::api::{
    parse_api_base, ApiError, AuthError, Authenticator, Credentials, PoliteClient, ReaderClient,
    XAuthAuthenticator, DEFAULT_API_BASE,
};
use crate::config::{self, Config};
use crate::export::writer::{
    expand_filename, filename_timestamp, format_file_size, DEFAULT_HTML_FILENAME,
    DEFAULT_JSON_FILENAME, DEFAULT_RAW_FILENAME,
};
use crate::export::{
    fetch_bookmarks, fetch_total, target_for, write_export, BadDateBehavior, ExportError,
    ExportFormat, ExportPayload, FetchOptions, FormatSet, PageError, PagePlan, PageProgress,
    ProgressObserver, StopReason, WriteError,
};
use crate::logging;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_BOOKMARKS: u32 = 15;
const DEFAULT_HTTP_ERROR_THRESHOLD: u32 = 5;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_DELAY_SECS: u64 = 0;
const DEFAULT_RETRY_COUNT: u32 = 3;

/// CLI error carrying exit code and message.
#[derive(Debug, Error)]
pub enum CliRunError {
    #[error("{0}")]
    InvalidInput(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Write(#[from] WriteError),
}

impl CliRunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliRunError::InvalidInput(_) => 1,
            CliRunError::Auth(_) => 2,
            CliRunError::Api(_) | CliRunError::Export(_) => 3,
            CliRunError::Write(_) => 4,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "readability-export", version)]
#[command(
    about = "Export your Readability bookmarks as JSON, a Netscape HTML bookmark file, or a raw API dump"
)]
#[command(
    after_help = "Config file keys (export_dir, bookmarks, http_error_threshold, formats, bad_dates, api_base_url, user_agent, request_delay_secs, timeout_secs, retry_count, retry_backoff_secs) are read from ./readability-export.toml or the user config directory. CLI flags override config."
)]
pub struct Args {
    /// Readability API key.
    #[arg(long, env = "READABILITY_CONSUMER_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Readability API secret.
    #[arg(long, env = "READABILITY_CONSUMER_SECRET", hide_env_values = true)]
    pub api_secret: Option<String>,

    /// Readability web login username.
    #[arg(long, env = "READABILITY_USERNAME")]
    pub login_user: Option<String>,

    /// Readability web login password.
    #[arg(long, env = "READABILITY_PASSWORD", hide_env_values = true)]
    pub login_pw: Option<String>,

    /// Number of bookmarks to export, 0 to export all bookmarks (default 15).
    #[arg(short, long)]
    pub bookmarks: Option<u32>,

    /// Where the export files are saved. Default: current working directory.
    #[arg(short = 'd', long)]
    pub export_directory: Option<PathBuf>,

    /// Filename for the JSON export; {timestamp} is replaced.
    #[arg(short = 'j', long, default_value = DEFAULT_JSON_FILENAME)]
    pub export_json_filename: String,

    /// Filename for the HTML export; {timestamp} is replaced.
    #[arg(long, default_value = DEFAULT_HTML_FILENAME)]
    pub export_html_filename: String,

    /// Filename for the raw API export; {timestamp} is replaced.
    #[arg(long, default_value = DEFAULT_RAW_FILENAME)]
    pub export_raw_filename: String,

    /// Export formats, comma separated: json, html, raw. Default: json.
    #[arg(short, long, value_delimiter = ',', value_parser = parse_format)]
    pub format: Vec<ExportFormat>,

    /// Also write the raw data the Reader API provides (same as adding raw to --format).
    #[arg(long)]
    pub raw_export: bool,

    /// Failed page requests tolerated before the export stops early (default 5).
    #[arg(short = 'e', long)]
    pub http_error_threshold: Option<u32>,

    /// Bookmarks without a usable added date in HTML export: skip (default), epoch, or fail.
    #[arg(long, value_parser = parse_bad_dates)]
    pub bad_dates: Option<BadDateBehavior>,

    /// Reader API root URL (overrides config).
    #[arg(long)]
    pub api_base_url: Option<String>,

    /// HTTP User-Agent (overrides config).
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Delay between requests in seconds (overrides config; default 0).
    #[arg(long)]
    pub delay: Option<u64>,

    /// Request timeout in seconds (overrides config; default 30).
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Authenticate and print how many bookmarks and pages would be fetched, without
    /// fetching or writing.
    #[arg(long)]
    pub dry_run: bool,

    /// Suppress progress output (errors only).
    #[arg(short, long)]
    pub quiet: bool,

    /// Debug logging and the full error chain.
    #[arg(long)]
    pub verbose: bool,
}

fn parse_format(s: &str) -> Result<ExportFormat, String> {
    match s.trim().to_lowercase().as_str() {
        "json" => Ok(ExportFormat::Json),
        "html" | "netscape" => Ok(ExportFormat::Html),
        "raw" | "json_raw" => Ok(ExportFormat::Raw),
        _ => Err(format!("Invalid format: '{}'. Use json, html, or raw.", s)),
    }
}

fn parse_bad_dates(s: &str) -> Result<BadDateBehavior, String> {
    match s.to_lowercase().as_str() {
        "skip" => Ok(BadDateBehavior::Skip),
        "epoch" => Ok(BadDateBehavior::Epoch),
        "fail" => Ok(BadDateBehavior::Fail),
        _ => Err(format!(
            "Invalid --bad-dates value: '{}'. Use skip, epoch, or fail.",
            s
        )),
    }
}

/// Formats from flags, else config, else JSON; `--raw-export` always adds raw.
fn resolve_formats(
    flags: &[ExportFormat],
    raw_export: bool,
    config: Option<&Config>,
) -> Result<FormatSet, CliRunError> {
    let mut set = if !flags.is_empty() {
        FormatSet::new(flags)
    } else if let Some(names) = config.and_then(|c| c.formats.as_ref()) {
        let parsed = names
            .iter()
            .map(|n| parse_format(n))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| CliRunError::InvalidInput(format!("Config formats: {}", e)))?;
        FormatSet::new(&parsed)
    } else {
        FormatSet::new(&[ExportFormat::Json])
    };
    if raw_export {
        set.insert(ExportFormat::Raw);
    }
    if set.is_empty() {
        return Err(CliRunError::InvalidInput(
            "No export format selected. Use --format json,html,raw.".to_string(),
        ));
    }
    Ok(set)
}

fn filename_template(args: &Args, format: ExportFormat) -> &str {
    match format {
        ExportFormat::Json => &args.export_json_filename,
        ExportFormat::Html => &args.export_html_filename,
        ExportFormat::Raw => &args.export_raw_filename,
    }
}

/// The export directory must already exist and be a directory.
fn validate_export_dir(path: &Path) -> Result<PathBuf, CliRunError> {
    if !path.is_dir() {
        return Err(CliRunError::InvalidInput(format!(
            "Cannot write exports: {}: not an existing directory.",
            path.display()
        )));
    }
    std::fs::canonicalize(path).map_err(|e| {
        CliRunError::InvalidInput(format!("Cannot resolve {}: {}", path.display(), e))
    })
}

fn credentials_from(args: &Args) -> Credentials {
    Credentials {
        api_key: args.api_key.clone().unwrap_or_default(),
        api_secret: args.api_secret.clone().unwrap_or_default(),
        username: args.login_user.clone().unwrap_or_default(),
        password: args.login_pw.clone().unwrap_or_default(),
    }
}

/// Progress bar over records, plus user-facing page failure messages.
struct TerminalProgress {
    enabled: bool,
    tolerance: u32,
    bar: Option<indicatif::ProgressBar>,
}

impl TerminalProgress {
    fn new(enabled: bool, tolerance: u32) -> Self {
        Self {
            enabled,
            tolerance,
            bar: None,
        }
    }

    fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.disable_steady_tick();
            bar.finish_and_clear();
        }
    }
}

impl ProgressObserver for TerminalProgress {
    fn on_start(&mut self, plan: &PagePlan) {
        if !self.enabled || plan.target == 0 {
            return;
        }
        let bar = indicatif::ProgressBar::new(u64::from(plan.target));
        if let Ok(style) = indicatif::ProgressStyle::default_bar()
            .template("{spinner} {msg} [{bar:40}] {pos}/{len} ({percent}%)")
        {
            bar.set_style(
                style
                    .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
                    .progress_chars("█▉▊▋▌▍▎▏ "),
            );
        }
        bar.set_message("Exporting links...");
        bar.enable_steady_tick(Duration::from_millis(80));
        self.bar = Some(bar);
    }

    fn on_page(&mut self, progress: &PageProgress) {
        if let Some(bar) = &self.bar {
            bar.set_position(u64::from(progress.records));
            bar.set_message(format!("Page {}/{}", progress.page, progress.pages));
        }
    }

    fn on_page_error(&mut self, error: &PageError) {
        if !self.enabled {
            return;
        }
        let message = format!(
            "Sorry! The Readability API could not deliver page {}: {}. Up to {} failed pages are tolerated.",
            error.page,
            match error.status {
                Some(status) => format!("error code {} {}", status, error.reason),
                None => error.reason.clone(),
            },
            self.tolerance
        );
        let url = error.url.clone();
        let print = || {
            eprintln!("{}", message);
            if let Some(url) = &url {
                eprintln!("  (Debug details: page {}, URL {})", error.page, url);
            }
        };
        match &self.bar {
            Some(bar) => bar.suspend(print),
            None => print(),
        }
    }
}

/// Entry point for the CLI. Returns Ok(()) on success; Err with exit code and message on failure.
pub fn run(args: &Args) -> Result<(), CliRunError> {
    logging::initialize(logging::level_for(args.quiet, args.verbose));

    let config = config::load_config().map_err(CliRunError::InvalidInput)?;
    let cfg = config.as_ref();

    let requested = args
        .bookmarks
        .or_else(|| cfg.and_then(|c| c.bookmarks))
        .unwrap_or(DEFAULT_BOOKMARKS);
    let tolerance = args
        .http_error_threshold
        .or_else(|| cfg.and_then(|c| c.http_error_threshold))
        .unwrap_or(DEFAULT_HTTP_ERROR_THRESHOLD);
    let formats = resolve_formats(&args.format, args.raw_export, cfg)?;
    let bad_dates = match args.bad_dates {
        Some(b) => b,
        None => match cfg.and_then(|c| c.bad_dates.as_deref()) {
            Some(s) => parse_bad_dates(s).map_err(CliRunError::InvalidInput)?,
            None => BadDateBehavior::default(),
        },
    };
    let export_dir = validate_export_dir(
        &args
            .export_directory
            .clone()
            .or_else(|| cfg.and_then(|c| c.export_dir.clone()))
            .unwrap_or_else(|| PathBuf::from(".")),
    )?;
    let api_base = args
        .api_base_url
        .clone()
        .or_else(|| cfg.and_then(|c| c.api_base_url.clone()))
        .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
    let api_base = parse_api_base(&api_base)
        .map_err(|e| CliRunError::InvalidInput(e.to_string()))?;

    let credentials = credentials_from(args);
    credentials.validate()?;

    let mut builder = PoliteClient::builder()
        .delay_secs(
            args.delay
                .or_else(|| cfg.and_then(|c| c.request_delay_secs))
                .unwrap_or(DEFAULT_DELAY_SECS),
        )
        .timeout_secs(
            args.timeout
                .or_else(|| cfg.and_then(|c| c.timeout_secs))
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        )
        .retry_count(
            cfg.and_then(|c| c.retry_count)
                .unwrap_or(DEFAULT_RETRY_COUNT),
        );
    if let Some(backoff) = cfg.and_then(|c| c.retry_backoff_secs.clone()) {
        builder = builder.retry_backoff_secs(backoff);
    }
    if let Some(ua) = args
        .user_agent
        .clone()
        .or_else(|| cfg.and_then(|c| c.user_agent.clone()))
    {
        builder = builder.user_agent(ua);
    }
    let mut http = builder
        .build()
        .map_err(|e| CliRunError::InvalidInput(format!("Failed to create HTTP client: {}", e)))?;

    let say = |line: String| {
        if !args.quiet {
            eprintln!("{}", line);
        }
    };
    say("Readability Exporter".to_string());

    let token = XAuthAuthenticator::new(&mut http, &api_base).authenticate(&credentials)?;
    log::info!("authenticated as {}", credentials.username);
    let mut reader = ReaderClient::new(&mut http, api_base.clone(), &credentials, token);

    let total = fetch_total(&mut reader)?;
    say(format!("* You have saved {} links on Readability", total));
    let target = target_for(requested, total);
    say(format!(
        "* We are now going to export the latest {} of your links",
        target
    ));

    let plan = PagePlan::for_target(target);
    if args.dry_run {
        let timestamp = filename_timestamp();
        eprintln!(
            "Pages: {} (up to {} bookmarks per page)",
            plan.pages, plan.per_page
        );
        for format in formats.iter() {
            eprintln!(
                "Output: {}",
                export_dir
                    .join(expand_filename(filename_template(args, format), &timestamp))
                    .display()
            );
        }
        return Ok(());
    }

    let options = FetchOptions {
        formats: formats.clone(),
        tolerance,
        bad_dates,
    };
    let mut progress = TerminalProgress::new(!args.quiet, tolerance);
    let outcome = fetch_bookmarks(&mut reader, &plan, &options, &mut progress);
    progress.finish();
    let outcome = outcome?;

    if outcome.stop_reason == StopReason::ToleranceExceeded {
        eprintln!(
            "Sorry! We could not export all your data. We gave up after {} failed page requests.",
            outcome.page_errors.len()
        );
    }
    if outcome.html_skipped > 0 {
        say(format!(
            "{} bookmarks without a usable added date were left out of the HTML export.",
            outcome.html_skipped
        ));
    }

    say("Bear with us, we are almost there. We are now writing your export files.".to_string());
    let records = outcome.records_emitted;
    let finished = outcome.aggregate.finish();
    let timestamp = filename_timestamp();
    for format in formats.iter() {
        let Some(payload) = ExportPayload::from_finished(&finished, format) else {
            continue;
        };
        let filename = expand_filename(filename_template(args, format), &timestamp);
        let written = write_export(format, &export_dir, &filename, payload)?;
        say(format!(
            "You can find your {} export in\n  {}\n  (~{})",
            format.tag(),
            written.path.display(),
            format_file_size(written.size)
        ));
    }

    say(format!(
        "Good news! We have successfully exported {} bookmarks for you.",
        records
    ));
    Ok(())
}
