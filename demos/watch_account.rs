//! Watch an account and a market in real time.
//!
//! ```bash
//! EXCHANGE_WS_URL=wss://api.example.com EXCHANGE_SYMBOL=btc-eur EXCHANGE_TOKEN=... \
//!     RUST_LOG=exchange_sync=debug cargo run --example watch_account
//! ```
//!
//! Pass a JSON config file as the first argument to override the defaults.

use std::sync::Arc;

use exchange_sync::prelude::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "exchange_sync=info,watch_account=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = match std::env::args().nth(1) {
        Some(path) => SyncConfig::from_json_str(&std::fs::read_to_string(path)?)?,
        None => SyncConfig::default(),
    };
    if let Ok(url) = std::env::var("EXCHANGE_WS_URL") {
        config.ws_url = url;
    }
    if let Ok(symbol) = std::env::var("EXCHANGE_SYMBOL") {
        config.symbol = Symbol::from(symbol);
    }

    let session = match std::env::var("EXCHANGE_TOKEN") {
        Ok(token) => StaticSession::new(token),
        Err(_) => StaticSession::anonymous(),
    };

    let (mut engine, mut notifications) = SyncEngine::new(config, Arc::new(session))?;
    engine.start()?;

    let account = engine.account();
    let market = engine.market();

    tokio::spawn(async move {
        while let Some(notification) = notifications.recv().await {
            tracing::info!(category = ?notification.category, "{}", notification.message);
        }
    });

    loop {
        tokio::select! {
            update = engine.next_update() => {
                let Some(update) = update else { break };
                match update {
                    SyncUpdate::Applied { outcome: Applied::Changed, kind, .. } => {
                        let market = market.borrow();
                        let account = account.borrow();
                        tracing::info!(
                            kind,
                            best_bid = ?market.orderbook.best_bid(),
                            best_ask = ?market.orderbook.best_ask(),
                            open_orders = account.orders.len(),
                            "State updated"
                        );
                    }
                    SyncUpdate::SessionTerminated { reason } => {
                        tracing::warn!("Logged out: {}", reason);
                    }
                    other => tracing::debug!(?other, "Update"),
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    engine.shutdown();
    Ok(())
}
