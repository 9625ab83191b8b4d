use crate::engine::WebhookClient;
use crate::error::SubmitError;
use crate::model::{AnalysisResponse, SubmitConfig, TUMOR_MARKER};
use crate::orchestrator::{self, ExportTargets, SubmissionController};
use crate::view::PageState;
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "mri-webhook-cli",
    version,
    about = "Submit an MRI scan to an analysis webhook and show the diagnosis"
)]
pub struct Cli {
    /// Webhook URL that performs the analysis
    #[arg(
        long,
        env = "MRI_WEBHOOK_URL",
        default_value = "http://localhost:5678/webhook/mri-analysis"
    )]
    pub endpoint: String,

    /// Image to submit (pre-selected in the TUI)
    #[arg(long, short = 'i')]
    pub image: Option<PathBuf>,

    /// Multipart field name the webhook reads the file from
    #[arg(long, default_value = "image")]
    pub field_name: String,

    /// Overall request timeout
    #[arg(long, default_value = "30s")]
    pub timeout: humantime::Duration,

    /// Timeout for fetching panel images given as URLs
    #[arg(long, default_value = "10s")]
    pub image_timeout: humantime::Duration,

    /// How long error messages stay on screen
    #[arg(long, default_value = "5s")]
    pub banner_timeout: humantime::Duration,

    /// Substring of the result label that marks a positive finding
    #[arg(long, default_value = TUMOR_MARKER)]
    pub positive_marker: String,

    /// Print JSON report and exit (no TUI)
    #[arg(long)]
    pub json: bool,

    /// Print text summary and exit (no TUI)
    #[arg(long)]
    pub text: bool,

    /// Run silently: suppress all output except errors (for scripted usage)
    #[arg(long)]
    pub silent: bool,

    /// Export the report as JSON
    #[arg(long)]
    pub export_json: Option<PathBuf>,

    /// Write decoded panel images into this directory
    #[arg(long)]
    pub save_images: Option<PathBuf>,

    /// Write logs to this file (TUI mode discards them otherwise)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn is_tui(&self) -> bool {
        cfg!(feature = "tui") && !self.json && !self.text && !self.silent
    }
}

pub async fn run(args: Cli) -> Result<()> {
    if args.silent && !args.json {
        return Err(anyhow::anyhow!(
            "--silent can only be used with --json. Use --silent --json together."
        ));
    }

    if args.silent {
        return run_json(args, true).await;
    }

    if !args.json && !args.text {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(args).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            return run_text(args).await;
        }
    }

    if args.json {
        return run_json(args, false).await;
    }

    run_text(args).await
}

/// Build a `SubmitConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> SubmitConfig {
    SubmitConfig {
        endpoint: args.endpoint.clone(),
        field_name: args.field_name.clone(),
        request_timeout: Duration::from(args.timeout),
        image_timeout: Duration::from(args.image_timeout),
        banner_timeout: Duration::from(args.banner_timeout),
        positive_marker: args.positive_marker.clone(),
        ..SubmitConfig::default()
    }
}

pub(crate) fn export_targets(args: &Cli) -> ExportTargets {
    ExportTargets {
        json: args.export_json.clone(),
        images_dir: args.save_images.clone(),
    }
}

struct OneShot {
    cfg: SubmitConfig,
    file: Option<String>,
    page: PageState,
    outcome: Result<AnalysisResponse, SubmitError>,
}

/// Select `--image` (if any) and run a single submission against a page model.
async fn submit_once(args: &Cli) -> Result<OneShot> {
    let cfg = build_config(args);
    let transport = WebhookClient::new(&cfg)?;
    let mut controller = SubmissionController::new(cfg.clone(), transport, PageState::default());

    let outcome = match args.image.as_deref() {
        Some(path) => match orchestrator::read_selection(path).await {
            Ok(file) => {
                controller.select_file(Some(file));
                controller.submit().await
            }
            Err(e) => {
                controller.report_error(&e);
                Err(e)
            }
        },
        None => controller.submit().await,
    };

    tracing::debug!(state = ?controller.state(), "one-shot submission finished");
    let file = controller.selected().map(|f| f.name.clone());
    Ok(OneShot {
        cfg,
        file,
        page: controller.view().clone(),
        outcome,
    })
}

fn failure(page: &PageState, err: &SubmitError) -> anyhow::Error {
    let msg = page
        .error_banner
        .clone()
        .unwrap_or_else(|| err.user_message());
    anyhow::Error::new(err.clone()).context(msg)
}

async fn run_json(args: Cli, silent: bool) -> Result<()> {
    let shot = submit_once(&args).await?;
    let processed = orchestrator::process_submission(
        &shot.cfg,
        &export_targets(&args),
        shot.file.as_deref(),
        &shot.page,
        &shot.outcome,
    );

    if !silent {
        let (out_tx, out_handle) = spawn_output_writer();
        let out = serde_json::to_string_pretty(&processed.report)?;
        let _ = out_tx.send(OutputLine::Stdout(out));
        for msg in &processed.export_messages {
            let _ = out_tx.send(OutputLine::Stderr(msg.clone()));
        }
        drop(out_tx);
        let _ = out_handle.await;
    }

    if let Err(e) = &shot.outcome {
        return Err(failure(&shot.page, e));
    }
    if processed.export_failed {
        anyhow::bail!("{}", processed.export_messages.join("; "));
    }
    Ok(())
}

async fn run_text(args: Cli) -> Result<()> {
    let (out_tx, out_handle) = spawn_output_writer();
    if let Some(path) = args.image.as_deref() {
        let _ = out_tx.send(OutputLine::Stderr(format!(
            "Analyzing {} via {}…",
            path.display(),
            args.endpoint
        )));
    }

    let shot = submit_once(&args)
        .await
        .context("failed to set up submission")?;
    let processed = orchestrator::process_submission(
        &shot.cfg,
        &export_targets(&args),
        shot.file.as_deref(),
        &shot.page,
        &shot.outcome,
    );

    if shot.outcome.is_ok() {
        let summary = crate::text_summary::build_text_summary(&processed.report);
        for line in summary.lines {
            let _ = out_tx.send(OutputLine::Stdout(line));
        }
    }
    for msg in processed.export_messages {
        let _ = out_tx.send(OutputLine::Stderr(msg));
    }
    drop(out_tx);
    let _ = out_handle.await;

    match &shot.outcome {
        Ok(_) => Ok(()),
        Err(e) => Err(failure(&shot.page, e)),
    }
}
