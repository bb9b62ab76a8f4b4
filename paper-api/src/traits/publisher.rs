use crate::model::update::{DatumKind, StateUpdate};

/// Callback run when the first consumer of a datum kind attaches.
pub type ReplayHook = Box<dyn Fn() + Send + Sync>;

/// Outbound fan-out of trader state.
///
/// The trader only ever calls `publish`. Subscriber bookkeeping, filtering
/// and delivery belong to the implementation.
pub trait StatePublisher: Send + Sync {
    fn publish(&self, update: StateUpdate);

    /// Registers `hook` to run the first time a consumer attaches to `kind`,
    /// so late consumers can be brought up to date.
    fn on_first_subscriber(&self, kind: DatumKind, hook: ReplayHook);
}
