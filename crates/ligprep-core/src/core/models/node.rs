use serde::Serialize;
use std::time::Duration;
use tracing::warn;

/// Lifecycle status of a ligand, stereoisomer or tautomer node.
///
/// Every node starts as [`NodeStatus::Pending`] and is moved to a terminal
/// value exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    #[default]
    Pending,
    Success,
    Failed,
}

impl NodeStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, NodeStatus::Pending)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventState {
    Success,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventDetail {
    pub state: EventState,
    pub text: String,
}

/// One entry of a node's status sub-log, serialized as `[stage, {state, text}]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusEvent(pub String, pub EventDetail);

impl StatusEvent {
    pub fn stage(&self) -> &str {
        &self.0
    }

    pub fn state(&self) -> EventState {
        self.1.state
    }

    pub fn text(&self) -> &str {
        &self.1.text
    }
}

/// A named stage timing in seconds, serialized as `[name, seconds]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Timer(pub String, pub f64);

impl Timer {
    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn seconds(&self) -> f64 {
        self.1
    }
}

/// Bookkeeping shared by every node of the fan-out tree.
///
/// Timers and status events are append-only. The status is written once.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NodeLog {
    pub status: NodeStatus,
    pub status_sub: Vec<StatusEvent>,
    pub timers: Vec<Timer>,
}

impl NodeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn succeeded(&mut self, stage: impl Into<String>, text: impl Into<String>) {
        self.push_event(stage.into(), EventState::Success, text.into());
    }

    pub fn failed(&mut self, stage: impl Into<String>, text: impl Into<String>) {
        self.push_event(stage.into(), EventState::Failed, text.into());
    }

    pub fn time(&mut self, name: impl Into<String>, elapsed: Duration) {
        self.timers.push(Timer(name.into(), elapsed.as_secs_f64()));
    }

    /// Moves the node to its terminal status.
    ///
    /// Returns `false` and leaves the log untouched if a terminal status was
    /// already recorded, or if `status` is [`NodeStatus::Pending`].
    pub fn finish(&mut self, status: NodeStatus) -> bool {
        if self.status.is_terminal() || !status.is_terminal() {
            warn!(
                current = ?self.status,
                requested = ?status,
                "Ignoring repeated or non-terminal status transition."
            );
            return false;
        }
        self.status = status;
        true
    }

    pub fn events_for<'a>(&'a self, stage: &'a str) -> impl Iterator<Item = &'a StatusEvent> {
        self.status_sub.iter().filter(move |e| e.stage() == stage)
    }

    fn push_event(&mut self, stage: String, state: EventState, text: String) {
        self.status_sub
            .push(StatusEvent(stage, EventDetail { state, text }));
    }
}
