//! Owned scoring context
//!
//! One lifecycled object replaces process-wide registries: the device
//! provider, the event bus, the log writer, the active aggregator handles,
//! the contestant tag, and a read snapshot of current scores all live here.
//! Reconfiguration tears the prior set down fully (closing its delivery
//! channels, which discards superseded in-flight events) before installing
//! the new one.

use futures::future::join_all;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::{info, warn};

use reftally_common::events::EventBus;
use reftally_common::model::{DeviceRole, RefereeMode, RefereeSpec, Score};

use crate::device::{DeviceProvider, DeviceSession, EventSender};
use crate::error::{Error, Result};
use crate::referee::{control_channel, Referee, RefereeHandle, RefereeState, EVENT_QUEUE_CAPACITY};
use crate::storage::EventLogWriter;

/// Accepted bindings for one referee slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotSummary {
    pub index: u32,
    pub name: String,
    pub mode: RefereeMode,
    /// Bound device id, `None` when the slot was left unbound
    pub primary: Option<String>,
    pub secondary: Option<String>,
}

/// Result of installing a judging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetupSummary {
    pub group: String,
    pub referees: Vec<SlotSummary>,
}

pub struct ScoringContext {
    provider: Arc<dyn DeviceProvider>,
    bus: EventBus,
    writer: EventLogWriter,
    contestant: Arc<RwLock<String>>,
    scores: Arc<RwLock<HashMap<u32, Score>>>,
    group: RwLock<String>,
    active: Mutex<Vec<RefereeHandle>>,
}

impl ScoringContext {
    pub fn new(provider: Arc<dyn DeviceProvider>, bus: EventBus, writer: EventLogWriter) -> Self {
        Self {
            provider,
            bus,
            writer,
            contestant: Arc::new(RwLock::new(String::new())),
            scores: Arc::new(RwLock::new(HashMap::new())),
            group: RwLock::new(String::new()),
            active: Mutex::new(Vec::new()),
        }
    }

    /// Install a judging configuration, replacing the prior one wholesale
    ///
    /// Unknown device ids leave that binding empty rather than failing the
    /// setup. Duplicate referee indices or an empty group name reject the
    /// whole request. Device connections proceed inside the aggregator
    /// tasks; their outcomes surface as status events.
    pub async fn setup(&self, group: &str, specs: &[RefereeSpec]) -> Result<SetupSummary> {
        if group.trim().is_empty() {
            return Err(Error::InvalidInput("group name required".to_string()));
        }
        let mut seen = HashSet::new();
        for spec in specs {
            if !seen.insert(spec.index) {
                return Err(Error::InvalidInput(format!(
                    "duplicate referee index {}",
                    spec.index
                )));
            }
        }

        let mut active = self.active.lock().await;
        Self::shutdown_all(&mut active).await;
        self.scores.write().await.clear();
        *self.group.write().await = group.to_string();

        let mut summary = SetupSummary {
            group: group.to_string(),
            referees: Vec::new(),
        };
        for spec in specs {
            let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
            let (control_tx, control_rx) = control_channel();
            let mut referee = Referee::new(
                RefereeState::new(spec.index, spec.name.clone(), spec.mode),
                group.to_string(),
                Arc::clone(&self.contestant),
                self.writer.clone(),
                self.bus.clone(),
                Arc::clone(&self.scores),
                events_rx,
                control_rx,
            );

            let primary = self
                .open_session(group, spec.primary.as_deref(), spec.index, DeviceRole::Primary, &events_tx)
                .await;
            let secondary = match spec.mode {
                RefereeMode::Dual => {
                    self.open_session(
                        group,
                        spec.secondary.as_deref(),
                        spec.index,
                        DeviceRole::Secondary,
                        &events_tx,
                    )
                    .await
                }
                RefereeMode::Single => {
                    if spec.secondary.is_some() {
                        warn!(index = spec.index, "secondary device ignored in single mode");
                    }
                    None
                }
            };

            summary.referees.push(SlotSummary {
                index: spec.index,
                name: spec.name.clone(),
                mode: spec.mode,
                primary: primary.as_ref().map(|s| s.device_id().to_string()),
                secondary: secondary.as_ref().map(|s| s.device_id().to_string()),
            });

            referee.bind_devices(primary, secondary);
            self.scores.write().await.insert(spec.index, Score::default());
            active.push(referee.spawn(control_tx));
        }

        info!(group, referees = specs.len(), "scoring configuration installed");
        Ok(summary)
    }

    /// Destroy the active configuration, disconnecting all sessions
    pub async fn teardown(&self) {
        let mut active = self.active.lock().await;
        Self::shutdown_all(&mut active).await;
        self.scores.write().await.clear();
        info!("scoring configuration torn down");
    }

    /// Fan a reset out to every active referee concurrently
    ///
    /// Waits for all to finish; per-referee `false` means a bound device
    /// did not accept its reset command.
    pub async fn reset_all(&self) -> BTreeMap<u32, bool> {
        let active = self.active.lock().await;
        join_all(
            active
                .iter()
                .map(|handle| async move { (handle.index, handle.request_reset().await) }),
        )
        .await
        .into_iter()
        .collect()
    }

    /// Set the contestant tag applied to subsequently logged records
    pub async fn set_contestant(&self, name: &str) {
        *self.contestant.write().await = name.to_string();
    }

    pub async fn contestant(&self) -> String {
        self.contestant.read().await.clone()
    }

    /// Snapshot of current scores per referee slot
    pub async fn scores(&self) -> BTreeMap<u32, Score> {
        self.scores
            .read()
            .await
            .iter()
            .map(|(&index, &score)| (index, score))
            .collect()
    }

    pub async fn group(&self) -> String {
        self.group.read().await.clone()
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn provider(&self) -> &Arc<dyn DeviceProvider> {
        &self.provider
    }

    pub fn writer(&self) -> &EventLogWriter {
        &self.writer
    }

    async fn shutdown_all(active: &mut Vec<RefereeHandle>) {
        let handles = std::mem::take(active);
        if handles.is_empty() {
            return;
        }
        join_all(handles.into_iter().map(|handle| handle.shutdown())).await;
    }

    async fn open_session(
        &self,
        group: &str,
        device_id: Option<&str>,
        index: u32,
        role: DeviceRole,
        events_tx: &EventSender,
    ) -> Option<DeviceSession> {
        let device_id = device_id?;
        let Some(transport) = self.provider.open(device_id) else {
            warn!(
                device = device_id,
                index,
                role = %role,
                "unknown device, slot left unbound"
            );
            return None;
        };
        if let Err(e) = self.writer.init_log(group, index, role).await {
            warn!(group, index, role = %role, "event log init failed: {}", e);
        }
        let mut session = DeviceSession::new(transport, index, role, self.bus.clone());
        session.bind(events_tx.clone());
        Some(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::SimHub;

    fn context_with(hub: SimHub, dir: &std::path::Path) -> ScoringContext {
        ScoringContext::new(
            Arc::new(hub),
            EventBus::new(64),
            EventLogWriter::new(dir),
        )
    }

    fn spec(index: u32, mode: RefereeMode, primary: Option<&str>, secondary: Option<&str>) -> RefereeSpec {
        RefereeSpec {
            index,
            name: format!("Referee {index}"),
            mode,
            primary: primary.map(str::to_string),
            secondary: secondary.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn setup_rejects_duplicate_indices() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context_with(SimHub::new(), dir.path());
        let specs = [
            spec(0, RefereeMode::Single, None, None),
            spec(0, RefereeMode::Single, None, None),
        ];
        assert!(ctx.setup("finals", &specs).await.is_err());
    }

    #[tokio::test]
    async fn setup_rejects_empty_group() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context_with(SimHub::new(), dir.path());
        assert!(ctx.setup("  ", &[]).await.is_err());
    }

    #[tokio::test]
    async fn unknown_devices_leave_slots_unbound() {
        let dir = tempfile::tempdir().unwrap();
        let hub = SimHub::new();
        hub.register("Counter-A");
        let ctx = context_with(hub, dir.path());

        let specs = [spec(
            0,
            RefereeMode::Dual,
            Some("Counter-A"),
            Some("Counter-MISSING"),
        )];
        let summary = ctx.setup("finals", &specs).await.unwrap();
        assert_eq!(summary.referees[0].primary.as_deref(), Some("Counter-A"));
        assert_eq!(summary.referees[0].secondary, None);

        ctx.teardown().await;
    }

    #[tokio::test]
    async fn teardown_clears_score_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let hub = SimHub::new();
        hub.register("Counter-A");
        let ctx = context_with(hub, dir.path());

        ctx.setup("finals", &[spec(0, RefereeMode::Single, Some("Counter-A"), None)])
            .await
            .unwrap();
        assert_eq!(ctx.scores().await.len(), 1);

        ctx.teardown().await;
        assert!(ctx.scores().await.is_empty());
    }

    #[tokio::test]
    async fn secondary_is_ignored_in_single_mode() {
        let dir = tempfile::tempdir().unwrap();
        let hub = SimHub::new();
        hub.register("Counter-A");
        hub.register("Counter-B");
        let ctx = context_with(hub, dir.path());

        let summary = ctx
            .setup(
                "finals",
                &[spec(0, RefereeMode::Single, Some("Counter-A"), Some("Counter-B"))],
            )
            .await
            .unwrap();
        assert_eq!(summary.referees[0].secondary, None);

        ctx.teardown().await;
    }
}
