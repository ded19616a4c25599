use dashmap::DashMap;
use tracing::warn;

/// Per-queue "keep polling" flags.
///
/// Written by the lifecycle operations, read by every polling loop before each
/// receive and before each group dispatch.
#[derive(Debug, Default)]
pub struct RunningStateTracker {
    states: DashMap<String, bool>,
}

impl RunningStateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracks `names`, all stopped.
    pub fn initialize<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            self.states.insert(name.into(), false);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.states.contains_key(name)
    }

    pub fn set_running(&self, name: &str, running: bool) {
        match self.states.get_mut(name) {
            Some(mut state) => *state = running,
            None => warn!(queue = name, "Ignoring state change of unknown queue"),
        }
    }

    /// Unknown queues read as stopped so that a lookup racing a shutdown does
    /// not fail.
    pub fn is_running(&self, name: &str) -> bool {
        match self.states.get(name) {
            Some(state) => *state,
            None => {
                warn!(
                    queue = name,
                    "Stopped queue because it was not listed as running queue"
                );
                false
            }
        }
    }

    pub fn running_queues(&self) -> Vec<String> {
        let mut running: Vec<String> = self
            .states
            .iter()
            .filter(|entry| *entry.value())
            .map(|entry| entry.key().clone())
            .collect();
        running.sort();
        running
    }
}
