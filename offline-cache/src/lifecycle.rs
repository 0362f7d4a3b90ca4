//! Worker Lifecycle
//!
//! Worker states, the transitions allowed between them, and a log of the
//! lifecycle events each transition produced.

use std::fmt;

/// Worker states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkerState {
    /// Constructed, install not yet attempted
    #[default]
    Parsed,
    /// Pre-caching shell assets
    Installing,
    /// Installed, waiting to activate
    Installed,
    /// Purging stale generations and claiming clients
    Activating,
    /// Intercepting fetches
    Activated,
    /// Failed install or superseded
    Redundant,
}

impl WorkerState {
    /// Check if this state allows fetch interception
    pub fn can_intercept_fetch(&self) -> bool {
        matches!(self, Self::Activated)
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Parsed => "parsed",
            Self::Installing => "installing",
            Self::Installed => "installed",
            Self::Activating => "activating",
            Self::Activated => "activated",
            Self::Redundant => "redundant",
        };
        f.write_str(s)
    }
}

/// Check if a state transition is valid
pub fn is_valid_transition(from: WorkerState, to: WorkerState) -> bool {
    use WorkerState::*;

    matches!(
        (from, to),
        (Parsed, Installing)
            | (Installing, Installed)
            | (Installing, Redundant) // Install failed
            | (Installed, Activating)
            | (Installed, Redundant) // Discarded while waiting
            | (Activating, Activated)
            | (Activating, Redundant)
            | (Activated, Redundant) // Replaced by new worker
    )
}

/// Lifecycle events, recorded in the order they happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    StateChange { from: WorkerState, to: WorkerState },
    /// Shell assets committed to the static generation
    Installed { assets: usize },
    /// Stale generations deleted during activation
    CachesPurged { deleted: Vec<String> },
    /// Open pages taken over
    ClientsClaimed { count: usize },
    /// Every generation deleted on request
    CachesCleared { deleted: Vec<String> },
}

/// Events kept per worker; older ones are dropped first
pub const MAX_LIFECYCLE_EVENTS: usize = 256;

/// Diagnostic event log, bounded to the most recent
/// [`MAX_LIFECYCLE_EVENTS`] events
#[derive(Debug, Default, Clone)]
pub struct LifecycleLog {
    events: Vec<LifecycleEvent>,
    dropped: usize,
}

impl LifecycleLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: LifecycleEvent) {
        self.events.push(event);
        if self.events.len() > MAX_LIFECYCLE_EVENTS {
            let excess = self.events.len() - MAX_LIFECYCLE_EVENTS;
            self.events.drain(..excess);
            self.dropped += excess;
        }
    }

    /// Number of events discarded to stay within the bound
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn events(&self) -> &[LifecycleEvent] {
        &self.events
    }

    /// Every state still on record, starting with the state the oldest
    /// kept transition left (`Parsed` for a fresh worker)
    pub fn states(&self) -> Vec<WorkerState> {
        let mut changes = self.events.iter().filter_map(|e| match e {
            LifecycleEvent::StateChange { from, to } => Some((*from, *to)),
            _ => None,
        });
        let Some((first, to)) = changes.next() else {
            return vec![WorkerState::Parsed];
        };
        let mut states = vec![first, to];
        states.extend(changes.map(|(_, to)| to));
        states
    }

    /// Position of the first event matching `pred`
    pub fn position(&self, pred: impl Fn(&LifecycleEvent) -> bool) -> Option<usize> {
        self.events.iter().position(pred)
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
