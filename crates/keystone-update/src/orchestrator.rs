//! Install state machine
//!
//! ```text
//! Idle -> Checking -> Installed
//!                  -> Preparing -> Downloading -> Extracting -> Finalizing -> Installed
//!                                                                          -> Failed
//! ```
//!
//! Every attempt ends with exactly one of `AlreadyInstalled`, `Installed`
//! or `InstallFailed` on the event sink. Failures after the cleaning stage
//! run the cleaner once more, best-effort, so the next attempt starts from
//! a clean workspace.

use keystone_core::{BundleLayout, InstallerConfig};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::InstallError;
use crate::events::{EventSink, UpdateEvent, UpdateStage};
use crate::fetch::ArchiveFetcher;
use crate::{cleaner, finalize, probe, BUNDLE_VERSION};

/// What to install and where
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPlan {
    /// Target bundle layout
    pub layout: BundleLayout,

    /// Version the bundle must end up at
    pub version: String,

    /// Archive to download when an install is needed
    pub download_url: String,
}

impl InstallPlan {
    /// Build a plan for the baked-in bundle version
    pub fn from_config(config: &InstallerConfig) -> keystone_core::Result<Self> {
        let layout = config.layout().ok_or_else(|| {
            keystone_core::Error::invalid_config(
                "could not determine a bundle directory; set bundle.root",
            )
        })?;

        Ok(Self {
            layout,
            version: BUNDLE_VERSION.to_string(),
            download_url: config.release.download_url(BUNDLE_VERSION),
        })
    }
}

/// Successful outcome of [`Updater::install_if_needed`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The bundle was already current; nothing was touched
    AlreadyInstalled,

    /// A fresh install completed and validated
    Installed,
}

/// Runs install attempts against a plan.
///
/// The updater holds no bundle state between attempts. Callers must not
/// run two attempts against the same layout at once.
///
/// Cancellation is scoped to one attempt: once an attempt has observed a
/// cancelled token, the updater issues a fresh one for the next attempt.
#[derive(Debug)]
pub struct Updater {
    fetcher: ArchiveFetcher,
    events: EventSink,
    cancel: Mutex<CancellationToken>,
    stage: Mutex<UpdateStage>,
}

impl Updater {
    /// Create an updater that discards events
    pub fn new(fetcher: ArchiveFetcher) -> Self {
        Self {
            fetcher,
            events: EventSink::disabled(),
            cancel: Mutex::new(CancellationToken::new()),
            stage: Mutex::new(UpdateStage::Idle),
        }
    }

    /// Publish lifecycle and progress events to `events`
    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    /// Token that aborts the in-flight attempt, or the next one if none
    /// is running
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel
            .lock()
            .map_or_else(|poisoned| poisoned.into_inner().clone(), |token| token.clone())
    }

    /// Stage the most recent attempt reached
    pub fn stage(&self) -> UpdateStage {
        self.stage.lock().map_or(UpdateStage::Idle, |stage| *stage)
    }

    /// Install the bundle described by `plan` unless it is already current
    pub async fn install_if_needed(
        &self,
        plan: &InstallPlan,
    ) -> Result<InstallOutcome, InstallError> {
        let cancel = self.cancellation_token();
        let result = self.attempt(plan, &cancel).await;
        if cancel.is_cancelled() {
            self.renew_cancellation();
        }
        result
    }

    async fn attempt(
        &self,
        plan: &InstallPlan,
        cancel: &CancellationToken,
    ) -> Result<InstallOutcome, InstallError> {
        self.transition(UpdateStage::Checking);
        if probe::is_installed(&plan.layout, &plan.version) {
            info!("Bundle {} already installed at {:?}", plan.version, plan.layout.root);
            self.transition(UpdateStage::Installed);
            self.events.emit(UpdateEvent::AlreadyInstalled {
                version: plan.version.clone(),
            });
            return Ok(InstallOutcome::AlreadyInstalled);
        }

        if cancel.is_cancelled() {
            info!("Install cancelled before touching {:?}", plan.layout.root);
            return Err(self.fail(InstallError::Cancelled));
        }

        self.events.emit(UpdateEvent::WillDownload {
            version: plan.version.clone(),
            url: plan.download_url.clone(),
        });

        self.transition(UpdateStage::Preparing);
        if let Err(err) = cleaner::clean(&plan.layout).await {
            return Err(self.fail(err.into()));
        }

        match self.install(plan, cancel).await {
            Ok(()) => {
                info!("Bundle {} installed at {:?}", plan.version, plan.layout.root);
                self.transition(UpdateStage::Installed);
                self.events.emit(UpdateEvent::Installed {
                    version: plan.version.clone(),
                });
                Ok(InstallOutcome::Installed)
            }
            Err(err) => {
                if let Err(cleanup) = cleaner::clean(&plan.layout).await {
                    warn!("Cleanup after failed install did not complete: {}", cleanup);
                }
                Err(self.fail(err))
            }
        }
    }

    async fn install(
        &self,
        plan: &InstallPlan,
        cancel: &CancellationToken,
    ) -> Result<(), InstallError> {
        self.transition(UpdateStage::Downloading);
        let download = self.fetcher.open(&plan.download_url).await?;
        self.events.emit(UpdateEvent::DownloadStarted {
            total_bytes: download.total_bytes(),
        });

        self.transition(UpdateStage::Extracting);
        let summary = download
            .extract_into(&plan.layout.temp_dir, &self.events, cancel)
            .await?;
        debug!(
            "Extracted {} entries from {} bytes",
            summary.entries, summary.received_bytes
        );

        self.transition(UpdateStage::Finalizing);
        finalize::finalize(&plan.layout, &plan.version, cancel).await?;
        Ok(())
    }

    fn renew_cancellation(&self) {
        let mut current = match self.cancel.lock() {
            Ok(current) => current,
            Err(poisoned) => poisoned.into_inner(),
        };
        if current.is_cancelled() {
            debug!("Cancellation consumed; issuing a fresh token");
            *current = CancellationToken::new();
        }
    }

    fn fail(&self, err: InstallError) -> InstallError {
        error!("Install failed: {}", err);
        self.transition(UpdateStage::Failed);
        self.events.emit(UpdateEvent::InstallFailed {
            stage: err.stage(),
            message: err.to_string(),
        });
        err
    }

    fn transition(&self, to: UpdateStage) {
        let from = match self.stage.lock() {
            Ok(mut stage) => {
                let from = if stage.is_terminal() {
                    UpdateStage::Idle
                } else {
                    *stage
                };
                *stage = to;
                from
            }
            Err(_) => UpdateStage::Idle,
        };
        debug!("Update stage: {} -> {}", from, to);
        self.events.emit(UpdateEvent::StageChanged { from, to });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keystone_core::types::NetworkConfig;
    use std::path::PathBuf;

    #[test]
    fn test_plan_from_config_uses_baked_version() {
        let mut config = InstallerConfig::default();
        config.bundle.root = Some(PathBuf::from("/opt/keystone/core"));
        config.release.base_url = "https://mirror.example/releases/".to_string();

        let plan = InstallPlan::from_config(&config).unwrap();

        assert_eq!(plan.version, BUNDLE_VERSION);
        assert_eq!(plan.layout.root, PathBuf::from("/opt/keystone/core"));
        assert_eq!(
            plan.download_url,
            format!("https://mirror.example/releases/{BUNDLE_VERSION}/keystone-core.tar.gz")
        );
    }

    #[tokio::test]
    async fn test_already_installed_transitions() {
        let temp = tempfile::TempDir::new().unwrap();
        let layout = BundleLayout::new(temp.path().join("core"));
        std::fs::create_dir_all(&layout.clients_dir).unwrap();
        std::fs::create_dir_all(&layout.archived_torrents_dir).unwrap();
        std::fs::write(layout.root.join("core.jar"), b"jar").unwrap();
        std::fs::write(layout.clients_dir.join("a.client"), b"{}").unwrap();
        std::fs::write(&layout.config_file, b"{}").unwrap();
        std::fs::write(&layout.version_file, BUNDLE_VERSION).unwrap();

        let plan = InstallPlan {
            layout,
            version: BUNDLE_VERSION.to_string(),
            download_url: "http://127.0.0.1:9/unreachable.tar.gz".to_string(),
        };
        let (sink, mut rx) = EventSink::channel();
        let updater =
            Updater::new(ArchiveFetcher::new(&NetworkConfig::default()).unwrap()).with_events(sink);

        let outcome = updater.install_if_needed(&plan).await.unwrap();
        assert_eq!(outcome, InstallOutcome::AlreadyInstalled);
        assert_eq!(updater.stage(), UpdateStage::Installed);

        let mut events = Vec::new();
        while let Ok(envelope) = rx.try_recv() {
            events.push(envelope.event);
        }
        assert_eq!(
            events,
            vec![
                UpdateEvent::StageChanged {
                    from: UpdateStage::Idle,
                    to: UpdateStage::Checking
                },
                UpdateEvent::StageChanged {
                    from: UpdateStage::Checking,
                    to: UpdateStage::Installed
                },
                UpdateEvent::AlreadyInstalled {
                    version: BUNDLE_VERSION.to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_cancellation_is_scoped_to_one_attempt() {
        let temp = tempfile::TempDir::new().unwrap();
        let plan = InstallPlan {
            layout: BundleLayout::new(temp.path().join("core")),
            version: BUNDLE_VERSION.to_string(),
            download_url: "http://127.0.0.1:9/unreachable.tar.gz".to_string(),
        };
        let updater = Updater::new(ArchiveFetcher::new(&NetworkConfig::default()).unwrap());

        let cancelled = updater.cancellation_token();
        cancelled.cancel();
        let err = updater.install_if_needed(&plan).await.unwrap_err();

        assert!(matches!(err, InstallError::Cancelled));
        assert!(!plan.layout.root.exists());
        assert!(cancelled.is_cancelled());
        assert!(!updater.cancellation_token().is_cancelled());
    }
}
