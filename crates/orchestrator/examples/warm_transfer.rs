//! Warm transfer example.
//!
//! Places an attended transfer for an existing caller channel and feeds
//! platform events, one JSON object per line on stdin, into the
//! orchestrator.
//!
//! Run with: cargo run -p orchestrator --example warm_transfer
//!
//! Configuration via .env file or environment variables:
//!   ARI_URL            - REST base URL (default: http://127.0.0.1:8088/ari)
//!   ARI_USERNAME       - REST user
//!   ARI_PASSWORD       - REST password
//!   TELEPHONY_CONFIG   - Config file (default: config/telephony.json)
//!   CALLER_CHANNEL     - Channel id of the caller (required)
//!   CALL_ID            - Call id (default: the caller channel id)
//!   DESTINATION        - Destination key (default: support_agent)

use std::env;
use std::sync::Arc;

use agent_tools::ToolArgs;
use ari_client::{AriClient, AriConfig, CallControl};
use call_core::{CallSession, InMemorySessionStore, SessionStore, TelephonyConfig};
use orchestrator::{
    transfer_registry, CallContext, InMemoryDtmfRouter, TokioTimeoutScheduler, TransferEvent,
    TransferOrchestrator,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("orchestrator=debug".parse()?)
                .add_directive("agent_tools=info".parse()?)
                .add_directive("ari_client=info".parse()?),
        )
        .init();

    let caller_channel = env::var("CALLER_CHANNEL").map_err(|_| "CALLER_CHANNEL is required")?;
    let call_id = env::var("CALL_ID").unwrap_or_else(|_| caller_channel.clone());
    let destination = env::var("DESTINATION").unwrap_or_else(|_| "support_agent".to_string());

    let config = Arc::new(TelephonyConfig::from_env()?);
    let client = AriClient::connect(AriConfig::from_env()?).await?;
    println!("Connected to {}", client.config().base_url);
    let gateway: Arc<dyn CallControl> = Arc::new(client);

    let sessions = Arc::new(InMemorySessionStore::new());
    sessions
        .upsert(CallSession::new(&call_id, &caller_channel))
        .await?;

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let orchestrator = Arc::new(
        TransferOrchestrator::new(config.clone(), gateway.clone(), sessions.clone())
            .with_dtmf_router(Arc::new(InMemoryDtmfRouter::new()))
            .with_timeout_scheduler(Arc::new(TokioTimeoutScheduler::new(events_tx.clone()))),
    );
    tokio::spawn(orchestrator.clone().run(events_rx));

    let registry = transfer_registry(orchestrator, gateway, config.clone());
    for (name, description) in registry.get_descriptions() {
        debug!("Tool {}: {}", name, description);
    }

    if let Some(target) = config.destination(&destination).map(|d| d.target.clone()) {
        let status = registry
            .dispatch(
                "check_extension_status",
                ToolArgs::default().param("extension", target),
            )
            .await;
        println!("Extension status: {}", status.to_json());
    }

    let mut args = ToolArgs::default().param("destination", destination.as_str());
    args.call = Some(CallContext::new(&call_id, &caller_channel));
    let output = registry.dispatch("attended_transfer", args).await;
    println!("Transfer: {}", output.to_json());
    if !output.is_success() {
        return Ok(());
    }

    println!("\nPaste platform events (one JSON object per line). Press Ctrl+C to stop.\n");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match TransferEvent::from_json_str(&line) {
                    Some(event) => {
                        info!("Event: {:?}", event);
                        if events_tx.send(event).is_err() {
                            warn!("Event loop has stopped");
                            break;
                        }
                    }
                    None => debug!("Ignoring line: {}", line),
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }

        if let Some(session) = sessions.get(&call_id).await? {
            if let Some(last) = session.last_transfer {
                println!("Transfer finished: {}", last.decision);
            }
        }
    }

    Ok(())
}
