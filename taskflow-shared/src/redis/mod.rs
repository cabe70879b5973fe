/// Redis integration for multi-instance broadcast
///
/// A single API instance delivers board events straight into its own
/// connection registry. Behind a load balancer, a client's socket and the
/// request that changed the board usually land on different instances, so
/// events travel through a Redis pub/sub channel instead:
///
/// ```text
/// ┌────────────┐  PUBLISH   ┌────────────────────────┐  SUBSCRIBE  ┌────────────┐
/// │ instance A │ ─────────> │ taskflow:board-events  │ ──────────> │ instance B │
/// │ (mutation) │            └────────────────────────┘             │  registry  │
/// └────────────┘                        │                          └────────────┘
///                                       └──────────> instance A registry
/// ```
///
/// # Example
///
/// ```no_run
/// use taskflow_shared::redis::client::{RedisClient, RedisConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = RedisClient::new(RedisConfig::new("redis://localhost:6379")).await?;
/// assert!(client.ping().await?);
/// # Ok(())
/// # }
/// ```

pub mod client;
pub mod fanout;

pub use client::{RedisClient, RedisClientError, RedisConfig};
pub use fanout::{run_relay, RedisPublisher, BOARD_EVENTS_CHANNEL};
