// ABOUTME: Chat server binary loading configuration and serving the streaming API
// ABOUTME: Supports port and database overrides and stops cleanly on Ctrl-C
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Chatline Contributors

//! # Chatline Server Binary
//!
//! Starts the HTTP API that streams model replies for multi-user chats.

use anyhow::Result;
use chatline_server::{config::ServerConfig, logging, server};
use clap::Parser;
use tracing::{info, warn};

/// Command-line overrides applied on top of the environment configuration
#[derive(Parser)]
#[command(name = "chatline-server")]
#[command(about = "Chatline - multi-user chat backend streaming LLM replies over SSE")]
pub struct Args {
    /// Override HTTP port
    #[arg(long)]
    port: Option<u16>,

    /// Override database URL
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ServerConfig::from_env()?;
    if let Some(port) = args.port {
        config.http_port = port;
    }
    if let Some(database_url) = args.database_url {
        config.database_url = database_url;
    }
    config.validate()?;

    logging::init_from_env()?;
    info!("Starting Chatline server");
    info!("{}", config.summary());

    let resources = server::ServerResources::from_config(&config).await?;
    server::serve(resources, config.http_port, shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl-C, shutting down"),
        Err(e) => warn!("Failed to listen for Ctrl-C: {e}"),
    }
}
