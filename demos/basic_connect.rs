//! Basic connect, subscribe, and message handling.
//!
//! Demonstrates:
//! - Creating a client with custom options
//! - Subscribing to connection-state changes
//! - Registering typed message handlers
//! - Sending envelopes and heartbeats
//!
//! Usage:
//!   cargo run --example basic_connect
//!   NYX_WS_URL=ws://localhost:3000/ws NYX_TOKEN=secret cargo run --example basic_connect

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use anyhow::Result;
use nyx_realtime::{Envelope, MessageType, RealtimeClient, RealtimeOptions};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Constants
// ============================================================================

const DEFAULT_URL: &str = "ws://localhost:3000/ws";

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let url = std::env::var("NYX_WS_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
    let token = std::env::var("NYX_TOKEN").ok();

    println!("=== basic_connect ===\n");

    // ========================================================================
    // Create Client
    // ========================================================================

    println!("[1] Creating client for {url}...");

    let options = RealtimeOptions::new(&url)
        .with_reconnect_interval(Duration::from_secs(2))
        .with_ping_interval(Duration::from_secs(15));
    let client = RealtimeClient::new(options)?;

    println!("    ✓ Client ready\n");

    // ========================================================================
    // Subscribe & Register
    // ========================================================================

    println!("[2] Wiring handlers...");

    client.subscribe(|state| println!("    [status] {state}"));

    client.register(MessageType::Alert, |envelope| {
        println!("    [alert] {}", envelope.get_str("message"));
    });
    client.register(MessageType::StatusUpdate, |envelope| {
        println!(
            "    [status_update] entity={} status={}",
            envelope.get_str("entityId"),
            envelope.get_str("status"),
        );
    });

    println!("    ✓ Handlers wired\n");

    // ========================================================================
    // Connect
    // ========================================================================

    println!("[3] Connecting...");
    client.connect(token.as_deref());

    // Give the handshake a moment, then say hello.
    tokio::time::sleep(Duration::from_secs(1)).await;
    let greeted = client
        .send(Envelope::new(MessageType::Auth).with_field("client", "basic_connect"))
        .await;
    println!("    greeting delivered: {greeted}\n");

    println!("[4] Running until Ctrl-C; transient drops reconnect automatically.\n");
    tokio::signal::ctrl_c().await?;

    // ========================================================================
    // Cleanup
    // ========================================================================

    println!("\n[Cleanup] Disconnecting...");
    client.disconnect();
    println!("          ✓ Done");

    Ok(())
}
