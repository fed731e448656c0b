//! An interface that does nothing useful but lets an installation be tested.
//!
//! Use it as a template: it shows how to read the parameter table, drain the
//! inbound queue and emit messages on the outbound queue.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error, info};

use crate::dispatch::{AdapterError, CooperativeAdapter, ThreadedAdapter};
use crate::mapping::InternalMessage;
use crate::queue::{MessageQueue, QueueItem};

const DEFAULT_PERIOD: Duration = Duration::from_secs(30);

/// Logs every inbound message and emits a demo command periodically.
pub struct DummyAdapter {
    inbound: MessageQueue,
    outbound: MessageQueue,
    period: Duration,
    last_emit: Instant,
}

impl DummyAdapter {
    /// Builds the adapter from the `[interface]` parameter table. The only
    /// recognised parameter is `period_secs`, the demo emission period.
    pub fn new(
        params: &HashMap<String, String>,
        inbound: MessageQueue,
        outbound: MessageQueue,
    ) -> Result<Self, AdapterError> {
        let period = match params.get("period_secs") {
            Some(text) => Duration::from_secs(
                text.parse()
                    .map_err(|err| format!("bad period_secs <{text}>: {err}"))?,
            ),
            None => DEFAULT_PERIOD,
        };
        info!("Dummy interface started, emitting every {:?}", period);
        Ok(Self {
            inbound,
            outbound,
            period,
            // Start in the past so the first emission fires quickly.
            last_emit: Instant::now() - DEFAULT_PERIOD,
        })
    }
}

impl CooperativeAdapter for DummyAdapter {
    fn step(&mut self) -> Result<(), AdapterError> {
        while let Some(item) = self.inbound.try_pull() {
            match item {
                QueueItem::Message(msg) => debug!("Internal message received: {}", msg),
                QueueItem::Shutdown => break,
            }
        }
        if self.last_emit.elapsed() >= self.period {
            let msg = InternalMessage::command()
                .with_function("DummyFunction")
                .with_location("Office")
                .with_action("MUTE_ON");
            self.outbound.push_message(msg);
            self.last_emit = Instant::now();
        }
        Ok(())
    }
}

/// Threaded wrapper driving a [`DummyAdapter`] from a background thread.
pub struct DummyWorker {
    adapter: Option<DummyAdapter>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl DummyWorker {
    pub fn new(
        params: &HashMap<String, String>,
        inbound: MessageQueue,
        outbound: MessageQueue,
    ) -> Result<Self, AdapterError> {
        Ok(Self {
            adapter: Some(DummyAdapter::new(params, inbound, outbound)?),
            stop: Arc::new(AtomicBool::new(false)),
            handle: None,
        })
    }
}

impl ThreadedAdapter for DummyWorker {
    fn start(&mut self) -> Result<(), AdapterError> {
        let mut adapter = self
            .adapter
            .take()
            .ok_or_else(|| AdapterError::from("dummy interface already started"))?;
        let stop = self.stop.clone();
        self.handle = Some(thread::spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                if let Err(err) = adapter.step() {
                    error!("Dummy interface failure: {}", err);
                    break;
                }
                thread::sleep(Duration::from_millis(50));
            }
        }));
        Ok(())
    }

    fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Dummy interface thread panicked");
            }
        }
    }
}
