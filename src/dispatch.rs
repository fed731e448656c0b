//! Dispatch loop tying broker I/O, the device interface and the two message
//! queues together.
//!
//! ```text
//!             broker ──► ConnectionManager.poll ──► decode ──► inbound queue
//!                                                                  │
//!                                                          interface adapter
//!                                                                  │
//!             broker ◄── publish ◄── encode ◄──────── outbound queue
//! ```
//!
//! Two mutually exclusive scheduling modes exist, chosen by the adapter
//! capability declared at construction time:
//!
//! - **Cooperative**: one thread round-robins broker poll, adapter `step()`
//!   and a non-blocking drain of the outbound queue, forever. There is no
//!   graceful shutdown; the process is killed.
//! - **Threaded**: the broker network loop and the publisher run as blocking
//!   tokio tasks, the adapter manages its own threads, and the main task
//!   waits for an interrupt to orchestrate an orderly stop.
//!
//! Translation failures in either direction drop the message with an info
//! log and processing continues. Adapter failures are never swallowed: they
//! propagate out and terminate the process so interface bugs stay visible.

use std::sync::Arc;
use std::time::Duration;

use rumqttc::{Client, QoS};
use thiserror::Error;
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::mapping::{InternalMessage, MessageMap};
use crate::mqtt::ConnectionManager;
use crate::queue::{MessageQueue, QueueItem};

/// Grace period granted to background tasks on shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Error type interface adapters report through.
pub type AdapterError = Box<dyn std::error::Error + Send + Sync>;

/// A device interface driven by the cooperative loop.
///
/// `step()` is called once per cycle and must return promptly; it reads from
/// the inbound queue and writes to the outbound queue it was constructed
/// with.
pub trait CooperativeAdapter: Send {
    fn step(&mut self) -> Result<(), AdapterError>;
}

/// A device interface running on its own threads.
pub trait ThreadedAdapter: Send {
    /// Starts the interface's background execution.
    fn start(&mut self) -> Result<(), AdapterError>;
    /// Stops the interface and waits for its threads.
    fn stop(&mut self);
}

#[derive(Debug, Error)]
pub enum DispatchError {
    /// The interface failed; by design this aborts the gateway.
    #[error("interface failure: {0}")]
    Adapter(String),
}

/// Orchestrates ConnectionManager, MessageMap, the two queues and an
/// interface adapter.
pub struct DispatchLoop {
    manager: ConnectionManager,
    map: Arc<MessageMap>,
    inbound: MessageQueue,
    outbound: MessageQueue,
    poll_timeout: Duration,
}

impl DispatchLoop {
    pub fn new(
        manager: ConnectionManager,
        map: Arc<MessageMap>,
        inbound: MessageQueue,
        outbound: MessageQueue,
        poll_timeout: Duration,
    ) -> Self {
        Self {
            manager,
            map,
            inbound,
            outbound,
            poll_timeout,
        }
    }

    /// Single-threaded round-robin loop. Never returns except on adapter
    /// failure.
    pub fn run_cooperative(
        mut self,
        mut adapter: Box<dyn CooperativeAdapter>,
    ) -> Result<(), DispatchError> {
        info!("Dispatch loop started, cooperative mode");
        loop {
            if let Some(received) = self.manager.poll(self.poll_timeout) {
                ingest(&self.map, &self.inbound, &received.topic, &received.payload);
            }
            adapter
                .step()
                .map_err(|err| DispatchError::Adapter(err.to_string()))?;
            self.drain_outbound();
        }
    }

    /// Empties the outbound queue, publishing every message. Non-blocking.
    fn drain_outbound(&mut self) {
        let client = self.manager.handle();
        while let Some(item) = self.outbound.try_pull() {
            match item {
                QueueItem::Message(msg) => publish_one(&client, &self.map, &msg),
                QueueItem::Shutdown => break,
            }
        }
    }

    /// Multi-threaded mode: broker network loop and publisher as blocking
    /// tasks, adapter on its own threads, main task waiting for an
    /// interrupt.
    pub async fn run_threaded(
        self,
        mut adapter: Box<dyn ThreadedAdapter>,
    ) -> Result<(), DispatchError> {
        let DispatchLoop {
            mut manager,
            map,
            inbound,
            outbound,
            poll_timeout,
        } = self;

        info!("Dispatch loop started, threaded mode");
        adapter
            .start()
            .map_err(|err| DispatchError::Adapter(err.to_string()))?;

        let cancel = CancellationToken::new();
        let stop_client = manager.handle();

        let net_cancel = cancel.clone();
        let net_map = map.clone();
        let net_inbound = inbound.clone();
        let network = task::spawn_blocking(move || {
            while !net_cancel.is_cancelled() {
                if let Some(received) = manager.poll(poll_timeout) {
                    ingest(&net_map, &net_inbound, &received.topic, &received.payload);
                }
            }
            info!("Broker network task stopped");
        });

        let publish_client = stop_client.clone();
        let publish_map = map.clone();
        let publish_outbound = outbound.clone();
        let publisher = task::spawn_blocking(move || {
            loop {
                match publish_outbound.pull(None) {
                    Some(QueueItem::Message(msg)) => {
                        publish_one(&publish_client, &publish_map, &msg)
                    }
                    Some(QueueItem::Shutdown) | None => break,
                }
            }
            info!("Publisher task stopped");
        });

        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("Cannot listen for the shutdown signal: {}", err);
        }
        info!("Shutdown signal received");

        // Orderly stop: sentinel for the publisher, disconnect and cancel
        // for the network loop, then the adapter, then a bounded wait.
        outbound.push(QueueItem::Shutdown);
        stop_client.disconnect().ok();
        cancel.cancel();
        adapter.stop();

        for (name, handle) in [("network", network), ("publisher", publisher)] {
            match tokio::time::timeout(SHUTDOWN_GRACE, handle).await {
                Ok(Ok(())) => debug!("Task <{}> exited", name),
                Ok(Err(err)) => error!("Task <{}> panicked: {}", name, err),
                Err(_) => warn!("Task <{}> did not exit within the grace period", name),
            }
        }
        Ok(())
    }
}

/// Decodes one received broker message and queues it for the interface.
///
/// Decode failures drop the message with an info log. A message whose sender
/// is this gateway itself is an echo of our own publish and is dropped
/// before it reaches the inbound queue.
fn ingest(map: &MessageMap, inbound: &MessageQueue, topic: &str, payload: &[u8]) {
    let msg = match map.decode(topic, payload) {
        Ok(msg) => msg,
        Err(err) => {
            info!("Dropping received message: {}", err);
            return;
        }
    };
    if msg.sender == map.own_sender() {
        debug!("Echo suppressed for message on <{}>", topic);
        return;
    }
    inbound.push_message(msg);
}

/// Encodes and publishes one outgoing message. A message that fails to
/// encode is dropped with its reason, never retried.
fn publish_one(client: &Client, map: &MessageMap, msg: &InternalMessage) {
    let (topic, payload) = match map.encode(msg) {
        Ok(encoded) => encoded,
        Err(err) => {
            info!("Dropping outgoing message: {}", err);
            return;
        }
    };
    match client.publish(topic.clone(), QoS::AtMostOnce, false, payload) {
        Ok(()) => debug!("Published to <{}>", topic),
        Err(err) => info!("Publish to <{}> failed: {}", topic, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::MapData;

    fn map() -> MessageMap {
        MessageMap::new(MapData::no_map("home", vec![]), "mqttbridge").expect("map must build")
    }

    #[test]
    fn ingest_queues_decoded_message() {
        let map = map();
        let inbound = MessageQueue::new();
        ingest(&map, &inbound, "home/lighting/gw/office/lamp1/me/C", b"light_on");
        match inbound.try_pull() {
            Some(QueueItem::Message(msg)) => {
                assert!(msg.is_command);
                assert_eq!(msg.action, "light_on");
            }
            other => panic!("unexpected item: {other:?}"),
        }
    }

    #[test]
    fn ingest_suppresses_own_echo() {
        let map = map();
        let inbound = MessageQueue::new();
        ingest(
            &map,
            &inbound,
            "home/lighting/gw/office/lamp1/mqttbridge/C",
            b"light_on",
        );
        assert!(inbound.is_empty());
    }

    #[test]
    fn ingest_drops_undecodable_message() {
        let map = map();
        let inbound = MessageQueue::new();
        ingest(&map, &inbound, "home/short/topic", b"light_on");
        ingest(&map, &inbound, "home/lighting/gw/office/lamp1/me/X", b"go");
        ingest(
            &map,
            &inbound,
            "home/lighting/gw/office/lamp1/me/C",
            br#"{"no_action":"here"}"#,
        );
        assert!(inbound.is_empty());
    }
}
