//! Event collection and bundle assertions

use keystone_core::{BundleLayout, BundleState};
use keystone_update::{probe, EventEnvelope, UpdateEvent, UpdateStage};
use tokio::sync::mpsc::UnboundedReceiver;

/// Drain every event already emitted on `rx`
pub fn drain_events(rx: &mut UnboundedReceiver<EventEnvelope>) -> Vec<UpdateEvent> {
    let mut events = Vec::new();
    while let Ok(envelope) = rx.try_recv() {
        events.push(envelope.event);
    }
    events
}

/// Target stages of every `StageChanged` event, in order
pub fn stage_path(events: &[UpdateEvent]) -> Vec<UpdateStage> {
    events
        .iter()
        .filter_map(|event| match event {
            UpdateEvent::StageChanged { to, .. } => Some(*to),
            _ => None,
        })
        .collect()
}

/// Sum of all progress deltas
pub fn progress_total(events: &[UpdateEvent]) -> u64 {
    events
        .iter()
        .filter_map(|event| match event {
            UpdateEvent::DownloadProgressed { delta_bytes } => Some(*delta_bytes),
            _ => None,
        })
        .sum()
}

/// Number of terminal outcome events
pub fn outcome_count(events: &[UpdateEvent]) -> usize {
    events
        .iter()
        .filter(|event| {
            matches!(
                event,
                UpdateEvent::AlreadyInstalled { .. }
                    | UpdateEvent::Installed { .. }
                    | UpdateEvent::InstallFailed { .. }
            )
        })
        .count()
}

pub fn assert_installed(layout: &BundleLayout, version: &str) {
    let state = probe::inspect(layout, version);
    assert_eq!(
        state,
        BundleState::Current,
        "bundle at {:?} is not installed at {}",
        layout.root,
        version
    );
}

/// After a failed attempt nothing half-installed may remain live
pub fn assert_rolled_back(layout: &BundleLayout) {
    assert!(
        !layout.temp_dir.exists(),
        "temp workspace left behind at {:?}",
        layout.temp_dir
    );
    assert!(
        !layout.clients_dir.exists(),
        "client directory left live at {:?}",
        layout.clients_dir
    );
    assert!(
        !layout.version_file.exists(),
        "version marker left behind at {:?}",
        layout.version_file
    );
}
