//! Install command

use crate::cli::InstallArgs;
use crate::output;
use anyhow::{Context, Result};
use camino::Utf8Path;
use indicatif::ProgressBar;
use keystone_core::TrustPolicy;
use keystone_update::{
    ArchiveFetcher, EventEnvelope, EventSink, InstallError, InstallOutcome, InstallPlan,
    UpdateEvent, UpdateStage, Updater,
};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::debug;

pub async fn run(args: InstallArgs, config: Option<&Utf8Path>) -> Result<()> {
    let mut config = super::load_config_for(config, args.bundle_dir.as_deref())?;
    if args.insecure {
        config.network.tls = TrustPolicy::AcceptInvalidCerts;
    }
    if config.network.tls == TrustPolicy::AcceptInvalidCerts && !args.json {
        output::warning("TLS certificate validation is disabled for this download");
    }

    let plan = InstallPlan::from_config(&config)?;
    let fetcher = ArchiveFetcher::new(&config.network).context("Failed to create HTTP client")?;

    let (sink, rx) = EventSink::channel();
    let updater = Updater::new(fetcher).with_events(sink);

    let cancel = updater.cancellation_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Interrupt received, cancelling install");
            cancel.cancel();
        }
    });

    let render = if args.json {
        tokio::spawn(print_json(rx))
    } else {
        tokio::spawn(render_progress(rx))
    };

    let result = updater.install_if_needed(&plan).await;
    interrupt.abort();

    // The updater owns the last sender; dropping it ends the render task.
    drop(updater);
    let _ = render.await;

    exit_result(result, args.json)
}

/// The progress renderer has already printed the failure, so only JSON
/// mode carries the full error through to stderr
fn exit_result(result: Result<InstallOutcome, InstallError>, json: bool) -> Result<()> {
    match result {
        Ok(InstallOutcome::AlreadyInstalled | InstallOutcome::Installed) => Ok(()),
        Err(err) if err.is_cancelled() => Err(anyhow::anyhow!("Install cancelled")),
        Err(err) if json => Err(err.into()),
        Err(_) => Err(anyhow::anyhow!("Install failed")),
    }
}

async fn print_json(mut rx: UnboundedReceiver<EventEnvelope>) {
    while let Some(envelope) = rx.recv().await {
        match serde_json::to_string(&envelope) {
            Ok(line) => println!("{}", line),
            Err(e) => debug!("Failed to serialize event: {}", e),
        }
    }
}

async fn render_progress(mut rx: UnboundedReceiver<EventEnvelope>) {
    let mut renderer = ProgressRenderer::default();
    while let Some(envelope) = rx.recv().await {
        renderer.handle(envelope.event);
    }
    renderer.clear();
}

/// Maps pipeline events onto a single terminal progress indicator
#[derive(Default)]
struct ProgressRenderer {
    bar: Option<ProgressBar>,
}

impl ProgressRenderer {
    fn handle(&mut self, event: UpdateEvent) {
        match event {
            UpdateEvent::StageChanged { to, .. } => self.stage(to),
            UpdateEvent::AlreadyInstalled { version } => {
                output::success(&format!("Bundle {} is already installed", version));
            }
            UpdateEvent::WillDownload { version, .. } => {
                output::info(&format!("Installing bundle {}", version));
            }
            UpdateEvent::DownloadStarted { total_bytes } => {
                self.clear();
                self.bar = Some(if total_bytes > 0 {
                    output::download_bar(total_bytes, "Downloading")
                } else {
                    output::spinner("Downloading (size unknown)")
                });
            }
            UpdateEvent::DownloadProgressed { delta_bytes } => {
                if let Some(bar) = &self.bar {
                    bar.inc(delta_bytes);
                }
            }
            UpdateEvent::Installed { version } => {
                self.clear();
                output::success(&format!("Bundle {} installed", version));
            }
            UpdateEvent::InstallFailed { message, .. } => {
                self.clear();
                output::error(&message);
            }
        }
    }

    fn stage(&mut self, stage: UpdateStage) {
        match stage {
            UpdateStage::Preparing => {
                self.clear();
                self.bar = Some(output::spinner("Removing stale artifacts"));
            }
            UpdateStage::Finalizing => {
                self.clear();
                self.bar = Some(output::spinner("Deploying bundle"));
            }
            _ => {}
        }
    }

    fn clear(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}
