/// Seam between mutation services and the realtime transport
///
/// Services hand every committed change to an [`EventPublisher`] and move on.
/// Publishing never blocks and never fails from the caller's point of view;
/// delivery problems are logged by the implementation.
///
/// - [`LocalPublisher`]: single instance, straight into the local registry
/// - `RedisPublisher` (in [`crate::redis::fanout`]): every instance's registry,
///   via Redis pub/sub

use tracing::debug;

use super::events::BoardEvent;
use super::registry::ConnectionRegistry;

/// Fire-and-forget sink for board events
pub trait EventPublisher: Send + Sync + 'static {
    fn publish(&self, event: BoardEvent);
}

/// Delivers to this process's connections only
#[derive(Clone)]
pub struct LocalPublisher {
    registry: ConnectionRegistry,
}

impl LocalPublisher {
    pub fn new(registry: ConnectionRegistry) -> Self {
        Self { registry }
    }
}

impl EventPublisher for LocalPublisher {
    fn publish(&self, event: BoardEvent) {
        let delivered = self.registry.deliver(&event);
        debug!(board_id = %event.board_id, event = %event.event, delivered, "Published locally");
    }
}
