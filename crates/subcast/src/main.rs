//! CLI for subcast
//!
//! Subcommands:
//! - `server`: run the broker (REST surface and WebSocket on one listener)
//! - `client`: run a simple smoke-test client (subscribe, publish, print
//!   incoming frames) against a running server

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use subcast_broker::Registry;
use subcast_config::load_config;
use subcast_server::{build_router, AppState};
use tokio::net::TcpListener;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "subcast")]
enum Command {
    /// Start the broker server
    Server,
    /// Run the smoke-test client (subscribe with replay, publish once,
    /// print whatever arrives)
    Client {
        /// WebSocket URL to connect to
        #[arg(long, default_value = "ws://127.0.0.1:8080/ws")]
        url: String,
        /// Topic to exercise; create it first with POST /topics
        #[arg(long, default_value = "demo")]
        topic: String,
    },
}

#[tokio::main]
async fn main() {
    subcast_utils::logging::init("info");

    match Command::parse() {
        Command::Server => {
            if let Err(err) = run_server().await {
                error!("server failed: {err}");
                std::process::exit(1);
            }
        }
        Command::Client { url, topic } => {
            if let Err(err) = run_client(&url, &topic).await {
                error!("client failed: {err}");
                std::process::exit(1);
            }
        }
    }
}

async fn run_server() -> Result<(), Box<dyn std::error::Error>> {
    let settings = load_config()?;
    let registry = Arc::new(Registry::new(settings.broker.ring_buffer_size));
    let drain_window = Duration::from_secs(settings.broker.shutdown_timeout_secs);

    let app = build_router(AppState::new(Arc::clone(&registry), settings.clone()));
    let listener = TcpListener::bind(settings.server.bind_addr()).await?;
    info!("listening on {}", listener.local_addr()?);

    tokio::select! {
        result = axum::serve(listener, app).into_future() => {
            result?;
            error!("server exited unexpectedly");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received, draining subscribers");
            registry.close_all_gracefully(drain_window).await;
        }
    }

    info!("shutdown complete");
    Ok(())
}

async fn run_client(url: &str, topic: &str) -> Result<(), Box<dyn std::error::Error>> {
    use futures_util::{SinkExt, StreamExt};
    use serde_json::json;
    use tokio_tungstenite::connect_async;
    use tokio_tungstenite::tungstenite::Message as WsMessage;

    let (mut ws, _response) = connect_async(url).await?;

    let subscribe = json!({
        "type": "subscribe",
        "topic": topic,
        "client_id": "smoke",
        "last_n": 5,
        "request_id": "sub-1",
    });
    ws.send(WsMessage::Text(subscribe.to_string())).await?;

    if let Some(Ok(WsMessage::Text(reply))) = ws.next().await {
        println!("subscribe reply: {reply}");
        let value: serde_json::Value = serde_json::from_str(&reply)?;
        if value["error"]["code"] == "TOPIC_NOT_FOUND" {
            println!("hint: create the topic first, e.g.");
            println!("  curl -X POST -d '{{\"name\":\"{topic}\"}}' http://<server>/topics");
            return Ok(());
        }
    }

    let publish = json!({
        "type": "publish",
        "topic": topic,
        "message": { "id": "smoke-1", "payload": { "hello": "from subcast client" } },
        "request_id": "pub-1",
    });
    ws.send(WsMessage::Text(publish.to_string())).await?;

    // Print a few frames (the publish ack and our own event included).
    for _ in 0..3 {
        match tokio::time::timeout(Duration::from_secs(5), ws.next()).await {
            Ok(Some(Ok(WsMessage::Text(incoming)))) => println!("incoming: {incoming}"),
            Ok(Some(Ok(_))) => {}
            _ => break,
        }
    }

    Ok(())
}
