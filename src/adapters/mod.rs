//! Example device interface adapters.
//!
//! An adapter is the device-facing side of the gateway. It is constructed
//! with the `[interface]` parameter table and the two message queues, then
//! driven either cooperatively through `step()` or on its own threads
//! through `start()`/`stop()`. The dummy adapter here is a template and an
//! installation test; real adapters live in their own crates.

pub mod dummy;

pub use dummy::{DummyAdapter, DummyWorker};
