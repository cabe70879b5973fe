/// Cross-instance board event fan-out over Redis pub/sub
///
/// [`RedisPublisher`] queues events and a background task PUBLISHes them as
/// JSON on [`BOARD_EVENTS_CHANNEL`]. Every instance (the publishing one
/// included) runs [`run_relay`], which SUBSCRIBEs to the channel and hands
/// each decoded event to its local [`ConnectionRegistry`]. Events therefore
/// reach the local registry exactly once, via Redis.
///
/// Publishing never blocks a request: a full queue drops the event with a
/// warning, and the database commit that produced it stands.

use std::time::Duration;

use redis::AsyncCommands;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::client::{RedisClient, RedisClientError};
use crate::realtime::{BoardEvent, ConnectionRegistry, EventPublisher};

/// Pub/sub channel shared by all instances
pub const BOARD_EVENTS_CHANNEL: &str = "taskflow:board-events";

/// Events waiting for the publish task
const PUBLISH_QUEUE: usize = 1024;

/// Longest wait between relay reconnect attempts
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Publishes board events to Redis for every instance to deliver
#[derive(Clone)]
pub struct RedisPublisher {
    queue: mpsc::Sender<BoardEvent>,
}

impl RedisPublisher {
    /// Starts the publish task; it runs until `cancel` fires or every
    /// publisher clone is dropped
    pub fn spawn(client: RedisClient, cancel: CancellationToken) -> (Self, JoinHandle<()>) {
        let (queue, rx) = mpsc::channel(PUBLISH_QUEUE);
        let handle = tokio::spawn(publish_loop(client, rx, cancel));
        (Self { queue }, handle)
    }
}

impl EventPublisher for RedisPublisher {
    fn publish(&self, event: BoardEvent) {
        if let Err(e) = self.queue.try_send(event) {
            warn!(error = %e, "Dropping board event; publish queue unavailable");
        }
    }
}

async fn publish_loop(
    client: RedisClient,
    mut rx: mpsc::Receiver<BoardEvent>,
    cancel: CancellationToken,
) {
    let mut conn = client.get_connection();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Board event publisher stopping");
                break;
            }
            next = rx.recv() => {
                let Some(event) = next else { break };

                let payload = match encode_event(&event) {
                    Ok(payload) => payload,
                    Err(e) => {
                        error!(error = %e, event = %event.event, "Failed to serialize board event");
                        continue;
                    }
                };

                let published: Result<i64, _> = conn.publish(BOARD_EVENTS_CHANNEL, payload).await;
                match published {
                    Ok(receivers) => debug!(
                        event = %event.event,
                        board_id = %event.board_id,
                        receivers,
                        "Published board event"
                    ),
                    Err(e) => error!(
                        error = %e,
                        event = %event.event,
                        board_id = %event.board_id,
                        "Failed to publish board event"
                    ),
                }
            }
        }
    }
}

/// Subscribes to the channel and delivers events into `registry` until
/// cancelled, reconnecting with capped exponential backoff
pub async fn run_relay(client: RedisClient, registry: ConnectionRegistry, cancel: CancellationToken) {
    let mut backoff = Duration::from_secs(1);

    while !cancel.is_cancelled() {
        match relay_once(&client, &registry, &cancel).await {
            Ok(()) => break,
            Err(e) => {
                warn!(
                    error = %e,
                    url = %client.display_url(),
                    retry_in_secs = backoff.as_secs(),
                    "Board event relay disconnected"
                );
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(backoff) => {}
        }
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }

    info!("Board event relay stopped");
}

/// One subscription lifetime. `Ok` only on cancellation.
async fn relay_once(
    client: &RedisClient,
    registry: &ConnectionRegistry,
    cancel: &CancellationToken,
) -> Result<(), RedisClientError> {
    let mut pubsub = client.pubsub().await?;
    pubsub.subscribe(BOARD_EVENTS_CHANNEL).await?;
    info!(channel = BOARD_EVENTS_CHANNEL, "Board event relay subscribed");

    let mut stream = pubsub.on_message();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            msg = stream.next() => {
                let Some(msg) = msg else {
                    return Err(RedisClientError::ConnectionError(
                        "Subscription stream ended".to_string(),
                    ));
                };

                let payload: String = match msg.get_payload() {
                    Ok(payload) => payload,
                    Err(e) => {
                        error!(error = %e, "Failed to read relay payload");
                        continue;
                    }
                };

                match decode_event(&payload) {
                    Ok(event) => {
                        let delivered = registry.deliver(&event);
                        debug!(event = %event.event, board_id = %event.board_id, delivered, "Relayed board event");
                    }
                    Err(e) => warn!(error = %e, "Ignoring malformed board event"),
                }
            }
        }
    }
}

fn encode_event(event: &BoardEvent) -> Result<String, serde_json::Error> {
    serde_json::to_string(event)
}

fn decode_event(payload: &str) -> Result<BoardEvent, serde_json::Error> {
    serde_json::from_str(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::EventName;
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn test_channel_payload_keeps_exclusion() {
        let board_id = Uuid::new_v4();
        let actor = Uuid::new_v4();
        let event = BoardEvent::new(board_id, EventName::TaskCreated, json!({"title": "Write docs"}), actor);

        let payload = encode_event(&event).unwrap();
        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(value["event"], "task:created");
        assert_eq!(value["boardId"], board_id.to_string());
        assert_eq!(value["excludeUser"], actor.to_string());

        assert_eq!(decode_event(&payload).unwrap(), event);
    }

    #[test]
    fn test_board_deleted_payload_has_no_exclusion() {
        let event = BoardEvent::new(
            Uuid::new_v4(),
            EventName::BoardDeleted,
            json!({"boardId": "x"}),
            Uuid::new_v4(),
        );
        let decoded = decode_event(&encode_event(&event).unwrap()).unwrap();
        assert_eq!(decoded.exclude_user, None);
    }

    #[test]
    fn test_malformed_payload_rejected() {
        assert!(decode_event("not json").is_err());
        assert!(decode_event(r#"{"event":"task:exploded"}"#).is_err());
    }

    #[tokio::test]
    #[ignore] // Requires running Redis instance
    async fn test_relay_delivers_published_event() {
        use crate::redis::client::RedisConfig;

        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        let client = RedisClient::new(RedisConfig::new(url)).await.unwrap();
        let registry = ConnectionRegistry::default();
        let cancel = CancellationToken::new();

        let (tx, mut rx) = mpsc::channel(8);
        let board_id = Uuid::new_v4();
        let conn = registry.register(Uuid::new_v4(), tx);
        registry.join(conn, board_id);

        let relay = tokio::spawn(run_relay(client.clone(), registry.clone(), cancel.clone()));
        tokio::time::sleep(Duration::from_millis(200)).await;

        let (publisher, publish_task) = RedisPublisher::spawn(client, cancel.clone());
        publisher.publish(BoardEvent::new(
            board_id,
            EventName::ListCreated,
            json!({"title": "Todo"}),
            Uuid::new_v4(),
        ));

        let frame = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(frame.contains("list:created"));

        cancel.cancel();
        relay.await.unwrap();
        publish_task.await.unwrap();
    }
}
