/// Realtime broadcast gateway
///
/// Connections authenticate once at the handshake, then join and leave board
/// rooms. Mutation services publish committed changes as [`BoardEvent`]s;
/// the registry routes them to the room, skipping the actor's connections
/// unless the event's audience says otherwise.
///
/// # Modules
///
/// - `events`: event names, audience policy, the event envelope
/// - `registry`: connection, identity and room indexes plus emission
/// - `publisher`: the service-facing publishing trait and local delivery
/// - `protocol`: JSON frames and handshake credential extraction
///
/// The socket transport itself lives in the API crate.

pub mod events;
pub mod protocol;
pub mod publisher;
pub mod registry;

pub use events::{Audience, BoardEvent, EventName};
pub use publisher::{EventPublisher, LocalPublisher};
pub use registry::{ConnectionId, ConnectionRegistry};
