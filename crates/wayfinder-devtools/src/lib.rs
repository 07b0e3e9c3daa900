//! A bridge between a running [`NavigationContainer`] and an external
//! inspector.
//!
//! The container side attaches a [`DevtoolsBridge`] as an action observer.
//! It emits one `init` message when attached and one `action` message per
//! handled dispatch. The inspector side feeds those messages into an
//! [`ActionLog`], which can later pick an entry and produce an
//! [`Inbound::ResetRoot`] message to travel back to the container.

use std::sync::mpsc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;
use wayfinder::{Action, ActionObserver, NavigationContainer, NavigationState, Result};

/// Messages sent from the container to the inspector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DevtoolsMessage {
    /// Sent once when the bridge is attached.
    Init {
        /// Message id.
        id: Uuid,
        /// The state at attach time.
        state: NavigationState,
    },
    /// Sent after every handled action.
    Action {
        /// Message id.
        id: Uuid,
        /// The dispatched action.
        action: Action,
        /// The state after the action.
        state: NavigationState,
    },
}

impl DevtoolsMessage {
    /// Message id.
    pub fn id(&self) -> Uuid {
        match self {
            Self::Init { id, .. } | Self::Action { id, .. } => *id,
        }
    }

    /// The state carried by the message.
    pub fn state(&self) -> &NavigationState {
        match self {
            Self::Init { state, .. } | Self::Action { state, .. } => state,
        }
    }

    /// Encode as a JSON line.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a JSON message.
    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }
}

/// Messages sent from the inspector back to the container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Inbound {
    /// Replace the container's whole tree.
    ResetRoot {
        /// The state to restore.
        state: NavigationState,
    },
}

impl Inbound {
    /// Apply the message to a container.
    pub fn apply(self, container: &mut NavigationContainer) -> Result<()> {
        match self {
            Self::ResetRoot { state } => container.reset_root(state),
        }
    }
}

/// An [`ActionObserver`] that forwards container activity over a channel.
#[derive(Debug)]
pub struct DevtoolsBridge {
    /// Outbound channel to the inspector.
    tx: mpsc::Sender<DevtoolsMessage>,
}

impl DevtoolsBridge {
    /// A bridge and the receiving end of its channel.
    pub fn channel() -> (Self, mpsc::Receiver<DevtoolsMessage>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx }, rx)
    }

    /// A bridge sending on an existing channel.
    pub fn new(tx: mpsc::Sender<DevtoolsMessage>) -> Self {
        Self { tx }
    }

    /// Send a message. A disconnected inspector is not an error for the
    /// application.
    fn send(&self, msg: DevtoolsMessage) {
        if self.tx.send(msg).is_err() {
            warn!("devtools receiver disconnected");
        }
    }
}

impl ActionObserver for DevtoolsBridge {
    fn on_init(&mut self, state: &NavigationState) {
        self.send(DevtoolsMessage::Init {
            id: Uuid::new_v4(),
            state: state.clone(),
        });
    }

    fn on_action(&mut self, action: &Action, state: &NavigationState) {
        self.send(DevtoolsMessage::Action {
            id: Uuid::new_v4(),
            action: action.clone(),
            state: state.clone(),
        });
    }
}

/// One recorded step.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    /// Id of the message that produced the entry.
    pub id: Uuid,
    /// The action, or `None` for the initial state.
    pub action: Option<Action>,
    /// The state after the step.
    pub state: NavigationState,
}

/// The inspector's replayable history of a session.
#[derive(Debug, Clone, Default)]
pub struct ActionLog {
    /// Recorded steps, oldest first.
    entries: Vec<LogEntry>,
    /// The step currently shown. New actions discard the steps after it.
    selected: Option<usize>,
}

impl ActionLog {
    /// An empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message from the container.
    pub fn record(&mut self, msg: DevtoolsMessage) {
        match msg {
            DevtoolsMessage::Init { id, state } => {
                self.entries.clear();
                self.entries.push(LogEntry {
                    id,
                    action: None,
                    state,
                });
            }
            DevtoolsMessage::Action { id, action, state } => {
                if let Some(sel) = self.selected {
                    self.entries.truncate(sel + 1);
                }
                debug!(action = action.kind(), "recorded");
                self.entries.push(LogEntry {
                    id,
                    action: Some(action),
                    state,
                });
            }
        }
        self.selected = self.entries.len().checked_sub(1);
    }

    /// Recorded steps, oldest first.
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// The selected step.
    pub fn selected(&self) -> Option<&LogEntry> {
        self.entries.get(self.selected?)
    }

    /// Select the step with message `id` and produce the message that puts
    /// the container back in that state.
    pub fn reset_to(&mut self, id: Uuid) -> Option<Inbound> {
        let idx = self.entries.iter().position(|e| e.id == id)?;
        self.selected = Some(idx);
        Some(Inbound::ResetRoot {
            state: self.entries[idx].state.clone(),
        })
    }
}
