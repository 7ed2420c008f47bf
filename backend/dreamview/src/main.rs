//! Dream card service — entry point.
//!
//! Starts a card for the configured dream, a background task that tells the
//! card whether the RPC node is reachable, and a small Axum REST API through
//! which a frontend reads the card and pushes wallet/session inputs.
//!
//! The card starts with a session open for `CALLER_ADDRESS` (or an anonymous
//! viewer), so the dream loads as soon as the node answers. A frontend can
//! close or replace that session through `PUT /card/session`.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio::sync::broadcast::error::RecvError;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use dreamview::api::{self, ApiState};
use dreamview::card::{self, CardHandle};
use dreamview::config::Config;
use dreamview::controller::Notice;
use dreamview::rpc::RpcDreamSource;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;

    let client = Client::builder()
        .timeout(Duration::from_secs(config.rpc_timeout_secs))
        .build()?;
    let source = Arc::new(RpcDreamSource::new(
        client,
        config.rpc_url.clone(),
        config.contract_address,
        config.rpc_max_retries,
    ));

    // ─── Card ─────────────────────────────────────────────
    let card = card::spawn(Arc::clone(&source), config.dream_id);
    card.set_session(true, config.caller_address)?;
    info!(
        "Showing dream {} from contract {}",
        config.dream_id, config.contract_address
    );

    tokio::spawn(watch_reachability(
        source,
        card.clone(),
        Duration::from_secs(config.probe_interval_secs),
    ));
    tokio::spawn(log_notices(card.clone()));

    // ─── REST API ─────────────────────────────────────────
    let app = api::router(ApiState { card })
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", config.api_port);
    info!("API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Push RPC reachability into the card on every tick. The card only re-reads
/// when reachability and the session are both up again.
async fn watch_reachability(source: Arc<RpcDreamSource>, card: CardHandle, every: Duration) {
    let mut reachable = false;
    loop {
        let now = match source.chain_id().await {
            Ok(chain_id) => {
                if !reachable {
                    info!("RPC reachable (chain id {chain_id})");
                }
                true
            }
            Err(e) => {
                if reachable {
                    warn!("RPC unreachable: {e}");
                }
                false
            }
        };
        reachable = now;
        if card.set_reachable(reachable).is_err() {
            break;
        }
        tokio::time::sleep(every).await;
    }
}

async fn log_notices(card: CardHandle) {
    let mut notices = card.subscribe_notices();
    loop {
        match notices.recv().await {
            Ok(Notice::Sent {
                dream_id,
                action,
                tx_hash,
            }) => info!("Dream {dream_id}: {action} sent ({tx_hash})"),
            Ok(Notice::Failed {
                dream_id,
                action,
                reason,
            }) => warn!("Dream {dream_id}: {action} failed: {reason}"),
            Err(RecvError::Lagged(n)) => warn!("Dropped {n} notices"),
            Err(RecvError::Closed) => break,
        }
    }
}
