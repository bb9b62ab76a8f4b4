//! State publishers: where trader updates leave the process.

use log::{debug, info, warn};
use paper_api::{DatumKind, ReplayHook, StatePublisher, StateUpdate};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Writes every update to the log as one JSON line.
#[derive(Debug, Default)]
pub struct LogPublisher;

impl StatePublisher for LogPublisher {
    fn publish(&self, update: StateUpdate) {
        match serde_json::to_string(&update) {
            Ok(line) => info!("[publish] {}", line),
            Err(e) => warn!("[publish] Could not serialize {:?} update: {}", update.kind(), e),
        }
    }

    fn on_first_subscriber(&self, kind: DatumKind, _hook: ReplayHook) {
        debug!("[publish] Log output has no subscribers, ignoring replay hook for {:?}", kind);
    }
}

type SharedHook = Arc<dyn Fn() + Send + Sync>;

/// Fans updates out over one broadcast channel per datum kind.
///
/// When a kind goes from zero to one receiver, the replay hook registered for
/// it runs after the receiver exists, so the new consumer sees the current
/// state before live updates.
pub struct BroadcastPublisher {
    channels: HashMap<DatumKind, broadcast::Sender<StateUpdate>>,
    hooks: Mutex<HashMap<DatumKind, SharedHook>>,
}

impl BroadcastPublisher {
    /// `capacity` bounds each channel. Slow receivers skip old updates (lagging).
    pub fn new(capacity: usize) -> Self {
        let channels = DatumKind::ALL
            .into_iter()
            .map(|kind| (kind, broadcast::channel(capacity).0))
            .collect();
        Self {
            channels,
            hooks: Mutex::new(HashMap::new()),
        }
    }

    /// Attaches a consumer to `kind`.
    pub fn subscribe(&self, kind: DatumKind) -> broadcast::Receiver<StateUpdate> {
        let sender = self.sender(kind);
        let receiver = sender.subscribe();
        if sender.receiver_count() == 1 {
            let hook = guard(&self.hooks).get(&kind).cloned();
            if let Some(hook) = hook {
                debug!("[publish] First subscriber for {:?}, replaying state", kind);
                hook();
            }
        }
        receiver
    }

    pub fn subscriber_count(&self, kind: DatumKind) -> usize {
        self.sender(kind).receiver_count()
    }

    fn sender(&self, kind: DatumKind) -> &broadcast::Sender<StateUpdate> {
        // Every kind gets a channel in `new`.
        &self.channels[&kind]
    }
}

impl StatePublisher for BroadcastPublisher {
    fn publish(&self, update: StateUpdate) {
        // No receivers is not an error, the update is simply not observed.
        let _ = self.sender(update.kind()).send(update);
    }

    fn on_first_subscriber(&self, kind: DatumKind, hook: ReplayHook) {
        guard(&self.hooks).insert(kind, Arc::from(hook));
    }
}

/// Keeps every published update in memory. Useful to embed the trader in
/// tests or tools that inspect the update stream afterwards.
#[derive(Default)]
pub struct RecordingPublisher {
    updates: Mutex<Vec<StateUpdate>>,
    hooks: Mutex<HashMap<DatumKind, ReplayHook>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates(&self) -> Vec<StateUpdate> {
        guard(&self.updates).clone()
    }

    pub fn of_kind(&self, kind: DatumKind) -> Vec<StateUpdate> {
        guard(&self.updates)
            .iter()
            .filter(|update| update.kind() == kind)
            .cloned()
            .collect()
    }

    /// Drains the recorded updates.
    pub fn take(&self) -> Vec<StateUpdate> {
        std::mem::take(&mut *guard(&self.updates))
    }

    /// Acts as a consumer attaching to `kind`: runs the registered replay
    /// hook, if any. Returns false when no hook was registered.
    pub fn attach(&self, kind: DatumKind) -> bool {
        let hooks = guard(&self.hooks);
        match hooks.get(&kind) {
            Some(hook) => {
                hook();
                true
            }
            None => false,
        }
    }
}

impl StatePublisher for RecordingPublisher {
    fn publish(&self, update: StateUpdate) {
        guard(&self.updates).push(update);
    }

    fn on_first_subscriber(&self, kind: DatumKind, hook: ReplayHook) {
        guard(&self.hooks).insert(kind, hook);
    }
}
