//! Per-referee scoring aggregator
//!
//! Each referee slot runs as one task that exclusively owns its
//! [`RefereeState`]. Sessions deliver decoded events over a bounded
//! channel; control commands (reset, shutdown) arrive on a second channel
//! and therefore serialize against event application. Every received event
//! is appended to the event log before its score update is published.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, warn};

use reftally_common::events::{EventBus, TallyEvent};
use reftally_common::model::{DeviceRole, RefereeMode, Score};
use reftally_common::protocol::ClickEvent;

use crate::device::{DeviceSession, SessionEvent};
use crate::storage::EventLogWriter;

/// Bound on events queued per referee between sessions and the aggregator
pub const EVENT_QUEUE_CAPACITY: usize = 256;

const CONTROL_QUEUE_CAPACITY: usize = 8;
const RESET_ACK_TIMEOUT: Duration = Duration::from_secs(15);
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Scoring state for one judge slot, owned by exactly one task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefereeState {
    pub index: u32,
    pub name: String,
    pub mode: RefereeMode,
    pri_plus: i32,
    pri_minus: i32,
    sec_plus: i32,
    sec_minus: i32,
    last_total: i32,
    last_plus: i32,
    last_minus: i32,
}

impl RefereeState {
    pub fn new(index: u32, name: String, mode: RefereeMode) -> Self {
        Self {
            index,
            name,
            mode,
            pri_plus: 0,
            pri_minus: 0,
            sec_plus: 0,
            sec_minus: 0,
            last_total: 0,
            last_plus: 0,
            last_minus: 0,
        }
    }

    /// Cache one device's cumulative counters
    fn apply(&mut self, role: DeviceRole, event: &ClickEvent) {
        match role {
            DeviceRole::Primary => {
                self.pri_plus = event.total_plus;
                self.pri_minus = event.total_minus;
            }
            DeviceRole::Secondary => {
                self.sec_plus = event.total_plus;
                self.sec_minus = event.total_minus;
            }
        }
    }

    /// Recompute the authoritative score from the cached counters
    ///
    /// DUAL nets the primary's positive count against the secondary's
    /// positive count, while both negative counts accumulate as combined
    /// penalty. Reading only cached counters makes the result correct
    /// under any interleaving of the two sessions.
    fn recompute(&mut self) -> Score {
        let score = match self.mode {
            RefereeMode::Single => Score {
                total: self.pri_plus - self.pri_minus,
                plus: self.pri_plus,
                minus: self.pri_minus,
            },
            RefereeMode::Dual => Score {
                total: self.pri_plus - self.sec_plus,
                plus: self.pri_plus,
                minus: self.pri_minus + self.sec_minus,
            },
        };
        self.last_total = score.total;
        self.last_plus = score.plus;
        self.last_minus = score.minus;
        score
    }

    fn zero(&mut self) {
        self.pri_plus = 0;
        self.pri_minus = 0;
        self.sec_plus = 0;
        self.sec_minus = 0;
        self.last_total = 0;
        self.last_plus = 0;
        self.last_minus = 0;
    }

    pub fn score(&self) -> Score {
        Score {
            total: self.last_total,
            plus: self.last_plus,
            minus: self.last_minus,
        }
    }
}

pub enum RefereeControl {
    /// Reset both devices, then clear the cached counters
    Reset { done: oneshot::Sender<bool> },
    /// Disconnect sessions and end the task
    Shutdown { done: oneshot::Sender<()> },
}

/// Owner-side handle to a running aggregator task
pub struct RefereeHandle {
    pub index: u32,
    control: mpsc::Sender<RefereeControl>,
    task: JoinHandle<()>,
}

impl RefereeHandle {
    /// Request a serialized reset; `true` iff every bound device accepted
    /// its reset command
    pub async fn request_reset(&self) -> bool {
        let (done, ack) = oneshot::channel();
        if self
            .control
            .send(RefereeControl::Reset { done })
            .await
            .is_err()
        {
            warn!(index = self.index, "reset request dropped, task gone");
            return false;
        }
        match timeout(RESET_ACK_TIMEOUT, ack).await {
            Ok(Ok(ok)) => ok,
            _ => {
                warn!(index = self.index, "reset acknowledgment missing");
                false
            }
        }
    }

    /// Stop the task, disconnecting its sessions first
    pub async fn shutdown(self) {
        let (done, ack) = oneshot::channel();
        if self
            .control
            .send(RefereeControl::Shutdown { done })
            .await
            .is_ok()
        {
            let _ = timeout(SHUTDOWN_TIMEOUT, ack).await;
        }
        self.task.abort();
        let _ = self.task.await;
    }
}

/// One judge slot: state machine plus its bound sessions
pub struct Referee {
    state: RefereeState,
    primary: Option<DeviceSession>,
    secondary: Option<DeviceSession>,
    group: String,
    contestant: Arc<RwLock<String>>,
    writer: EventLogWriter,
    bus: EventBus,
    scores: Arc<RwLock<HashMap<u32, Score>>>,
    events_rx: mpsc::Receiver<SessionEvent>,
    control_rx: mpsc::Receiver<RefereeControl>,
}

impl Referee {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        state: RefereeState,
        group: String,
        contestant: Arc<RwLock<String>>,
        writer: EventLogWriter,
        bus: EventBus,
        scores: Arc<RwLock<HashMap<u32, Score>>>,
        events_rx: mpsc::Receiver<SessionEvent>,
        control_rx: mpsc::Receiver<RefereeControl>,
    ) -> Self {
        Self {
            state,
            primary: None,
            secondary: None,
            group,
            contestant,
            writer,
            bus,
            scores,
            events_rx,
            control_rx,
        }
    }

    /// Atomically replace both device references
    ///
    /// Only callable before the task starts; a running configuration is
    /// replaced wholesale, never rebound in place.
    pub fn bind_devices(
        &mut self,
        primary: Option<DeviceSession>,
        secondary: Option<DeviceSession>,
    ) {
        self.primary = primary;
        self.secondary = secondary;
    }

    /// Spawn the aggregator task, transferring ownership of state and
    /// sessions into it
    pub fn spawn(self, control: mpsc::Sender<RefereeControl>) -> RefereeHandle {
        let index = self.state.index;
        RefereeHandle {
            index,
            control,
            task: tokio::spawn(self.run()),
        }
    }

    async fn run(mut self) {
        self.connect_sessions().await;
        loop {
            tokio::select! {
                Some(cmd) = self.control_rx.recv() => match cmd {
                    RefereeControl::Reset { done } => {
                        let ok = self.handle_reset().await;
                        let _ = done.send(ok);
                    }
                    RefereeControl::Shutdown { done } => {
                        self.teardown_sessions().await;
                        let _ = done.send(());
                        break;
                    }
                },
                Some(ev) = self.events_rx.recv() => self.handle_event(ev).await,
                else => break,
            }
        }
        debug!(index = self.state.index, "aggregator task ended");
    }

    async fn connect_sessions(&mut self) {
        let index = self.state.index;
        let (primary, secondary) = (self.primary.as_mut(), self.secondary.as_mut());
        tokio::join!(
            async {
                if let Some(session) = primary {
                    if !session.connect().await {
                        warn!(index, "primary device connect failed");
                    }
                }
            },
            async {
                if let Some(session) = secondary {
                    if !session.connect().await {
                        warn!(index, "secondary device connect failed");
                    }
                }
            },
        );
    }

    async fn teardown_sessions(&mut self) {
        if let Some(mut session) = self.primary.take() {
            session.disconnect().await;
        }
        if let Some(mut session) = self.secondary.take() {
            session.disconnect().await;
        }
    }

    /// Log, apply, recompute, publish; in that order, for every event
    async fn handle_event(&mut self, ev: SessionEvent) {
        let contestant = self.contestant.read().await.clone();
        self.writer
            .append(
                &self.group,
                self.state.index,
                ev.role,
                &ev.event,
                &contestant,
            )
            .await;
        self.state.apply(ev.role, &ev.event);
        let score = self.state.recompute();
        self.scores.write().await.insert(self.state.index, score);
        self.bus.emit_lossy(TallyEvent::ScoreUpdate {
            index: self.state.index,
            total: score.total,
            plus: score.plus,
            minus: score.minus,
        });
    }

    /// Reset both devices concurrently, drain pre-reset traffic, then
    /// clear the counters and publish the zeroed score once
    async fn handle_reset(&mut self) -> bool {
        let (pri_ok, sec_ok) = tokio::join!(
            Self::reset_session(self.primary.as_ref()),
            Self::reset_session(self.secondary.as_ref()),
        );

        // Events already queued were produced before the devices zeroed
        // themselves; apply them now so they cannot overwrite the cleared
        // counters afterwards.
        while let Ok(ev) = self.events_rx.try_recv() {
            self.handle_event(ev).await;
        }

        self.state.zero();
        self.scores
            .write()
            .await
            .insert(self.state.index, Score::default());
        self.bus.emit_lossy(TallyEvent::ScoreUpdate {
            index: self.state.index,
            total: 0,
            plus: 0,
            minus: 0,
        });
        pri_ok && sec_ok
    }

    async fn reset_session(session: Option<&DeviceSession>) -> bool {
        match session {
            Some(session) => session.send_reset().await,
            None => true,
        }
    }
}

/// Build the control channel pair for one aggregator task
pub fn control_channel() -> (mpsc::Sender<RefereeControl>, mpsc::Receiver<RefereeControl>) {
    mpsc::channel(CONTROL_QUEUE_CAPACITY)
}
