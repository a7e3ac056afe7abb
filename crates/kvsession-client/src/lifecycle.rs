//! Client lifecycle state.
//!
//! `Uninitialized --establish--> Established --shutdown--> ShutDown --establish--> ...`

use parking_lot::RwLock;
use tracing::debug;

use crate::error::{ClientError, Result};

/// Lifecycle state of a key-value client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClientState {
    /// Never established.
    #[default]
    Uninitialized,
    /// Connected; data operations allowed.
    Established,
    /// Shut down; may be re-established.
    ShutDown,
}

impl std::fmt::Display for ClientState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientState::Uninitialized => write!(f, "uninitialized"),
            ClientState::Established => write!(f, "established"),
            ClientState::ShutDown => write!(f, "shut down"),
        }
    }
}

/// Shared lifecycle bookkeeping for adapters.
///
/// Adapters compose this rather than inheriting it: they decide what
/// connecting means and call [`LifecycleCell::mark_established`] once done.
#[derive(Debug, Default)]
pub struct LifecycleCell {
    state: RwLock<ClientState>,
}

impl LifecycleCell {
    /// Create a cell in the `Uninitialized` state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn state(&self) -> ClientState {
        *self.state.read()
    }

    /// Returns true while established.
    pub fn is_established(&self) -> bool {
        self.state() == ClientState::Established
    }

    /// Fail fast with [`ClientError::NotEstablished`] unless established.
    pub fn ensure_established(&self) -> Result<()> {
        match self.state() {
            ClientState::Established => Ok(()),
            state => Err(ClientError::NotEstablished { state }),
        }
    }

    /// Transition to `Established`, returning the previous state.
    pub fn mark_established(&self) -> ClientState {
        let mut state = self.state.write();
        let previous = std::mem::replace(&mut *state, ClientState::Established);
        debug!(from = %previous, "client established");
        previous
    }

    /// Transition to `ShutDown`, returning the previous state.
    pub fn mark_shut_down(&self) -> ClientState {
        let mut state = self.state.write();
        let previous = std::mem::replace(&mut *state, ClientState::ShutDown);
        debug!(from = %previous, "client shut down");
        previous
    }
}
