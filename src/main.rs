use std::sync::Arc;

use anyhow::{anyhow, Error};
use log::{info, warn};
use meshlink::prelude::*;
use meshlink::logging;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load the config file
    let config = Config::load()?;
    logging::init(&config.log_filter);
    info!("Starting meshlink on {}", config.interface_name);

    // Objects visible through the root directory
    let registry = Arc::new(ObjectRegistry::new());
    let root = FileSystemLike::new(registry.clone(), "net");
    registry.register(&config.interface_name, PathType::File);
    let dir = root.opendir();
    for entry in dir.entries() {
        info!("/{}/{}", root.name(), entry.name());
    }
    dir.closedir();

    let event_loop = EventLoop::new(config.max_handlers);
    let stack = Arc::new(SimulatedStack::new(event_loop.clone(), &config.sim));
    let tasklet = EnetTasklet::new(Arc::new(event_loop.clone()), stack, &config);
    tasklet.initialize();

    let interface_id = tasklet
        .network_init(config.device_id)
        .map_err(|e| anyhow!("network init failed ({}): {}", e.code(), e))?;

    // Connectivity changes arrive on the loop, hand them to main
    let (status_tx, mut status_rx) = mpsc::unbounded_channel();
    tasklet.connect(
        move |status| {
            let _ = status_tx.send(status);
        },
        interface_id,
    )?;

    let runner = event_loop.clone();
    let handle = tokio::spawn(async move { runner.run().await });

    let mut buffer = [0u8; MIN_ADDRESS_BUFFER_LEN];
    loop {
        tokio::select! {
            status = status_rx.recv() => match status {
                Some(ConnectionStatus::Connected) => match tasklet.get_ip_address(&mut buffer) {
                    Ok(len) => info!("Connected, address {}", String::from_utf8_lossy(&buffer[..len])),
                    Err(e) => warn!("Connected, but no address: {}", e),
                },
                Some(ConnectionStatus::Disconnected) => info!("Disconnected"),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }
    }

    if let Err(e) = tasklet.disconnect(true) {
        warn!("Disconnect failed ({}): {}", e.code(), e);
    }
    handle.abort();

    Ok(())
}
