use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use tokio::task;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use mqttbridge::adapters::{DummyAdapter, DummyWorker};
use mqttbridge::config::{Config, RunMode};
use mqttbridge::dispatch::DispatchLoop;
use mqttbridge::mapping::{MapData, MessageMap};
use mqttbridge::mqtt::ConnectionManager;
use mqttbridge::queue::MessageQueue;
use mqttbridge::APP_NAME;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;
    let result = run().await;
    if let Err(ref err) = result {
        // Make sure the failure reaches the log before the process exits.
        error!("Fatal error: {:?}", err);
    }
    result
}

async fn run() -> Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = Config::load(config_path.as_deref())?;
    info!("=== {} started ===", APP_NAME);
    info!("Broker: {}:{}", config.broker.host, config.broker.port);

    let map_data = match &config.gateway.map_file {
        Some(path) => {
            let text = fs::read_to_string(path)
                .wrap_err_with(|| format!("cannot read map file <{}>", path.display()))?;
            MapData::from_json(&text)?
        }
        None => MapData::no_map(config.gateway.root.clone(), config.gateway.topics.clone()),
    };
    let client_id = config.broker.effective_client_id(APP_NAME);
    let map = Arc::new(MessageMap::new(map_data, client_id.clone())?);

    let inbound = MessageQueue::new();
    let outbound = MessageQueue::new();
    let manager = ConnectionManager::new(&config.broker, &client_id, map.topics().to_vec());
    let dispatch = DispatchLoop::new(
        manager,
        map,
        inbound.clone(),
        outbound.clone(),
        Duration::from_millis(config.broker.timeout_ms),
    );

    match config.gateway.mode {
        RunMode::Cooperative => {
            let adapter = DummyAdapter::new(&config.interface, inbound, outbound)
                .map_err(|err| color_eyre::eyre::eyre!("interface failure: {err}"))?;
            task::spawn_blocking(move || dispatch.run_cooperative(Box::new(adapter))).await??;
        }
        RunMode::Threaded => {
            let worker = DummyWorker::new(&config.interface, inbound, outbound)
                .map_err(|err| color_eyre::eyre::eyre!("interface failure: {err}"))?;
            dispatch.run_threaded(Box::new(worker)).await?;
        }
    }
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
    Ok(())
}
