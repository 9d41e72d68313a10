//! The facility-booking directory server: a small booking application
//! served over the reliable-UDP engine, with a TCP admin shell for poking
//! the engine tunables at runtime.

mod admin;
mod booking;
mod dispatch;
mod error;
mod rpc;

use std::sync::Arc;

use anyhow::Result;
use rudp::config::Config;
use rudp::engine::{Engine, MessageHandler};

use booking::Manager;
use dispatch::Dispatcher;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Arc::new(Config::from_env()?);

    let manager = Arc::new(Manager::new());
    let handler: Arc<dyn MessageHandler + Send + Sync> =
        Arc::new(Dispatcher::new(Arc::clone(&manager)));

    let engine = Engine::bind(Arc::clone(&config), handler).await?;
    log::info!("udp server listening on port {}", config.server_port());

    let admin_port = config.server_log_port();
    let admin_config = Arc::clone(&config);
    let admin_stats = engine.stats();
    tokio::spawn(async move {
        if let Err(err) = admin::serve(admin_port, admin_config, admin_stats).await {
            log::error!("admin shell failed: {err}");
        }
    });

    engine.run().await?;
    Ok(())
}
