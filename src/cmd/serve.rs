//! Demo feed server (`tableside serve`).

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use console::style;
use tableside::config::TablesideConfig;
use tableside::server::{FeedServer, ServerConfig, shutdown_signal};

use super::replay::read_frames;

pub struct ServeArgs<'a> {
    pub host: &'a str,
    pub port: u16,
    pub orders: Option<&'a Path>,
    pub bills: Option<&'a Path>,
    pub interval_ms: u64,
}

fn load_script(path: Option<&Path>) -> Result<Vec<String>> {
    match path {
        Some(path) => read_frames(path),
        None => Ok(Vec::new()),
    }
}

pub async fn cmd_serve(config: &TablesideConfig, args: ServeArgs<'_>) -> Result<()> {
    let server_config = ServerConfig {
        host: args.host.to_string(),
        port: args.port,
        orders_path: config.toml.server.orders_path.clone(),
        bills_path: config.toml.server.bills_path.clone(),
        orders: load_script(args.orders)?,
        bills: load_script(args.bills)?,
        interval: Duration::from_millis(args.interval_ms),
    };
    let orders_path = server_config.orders_path.clone();
    let bills_path = server_config.bills_path.clone();
    let scripted = (server_config.orders.len(), server_config.bills.len());

    let server = FeedServer::bind(server_config).await?;
    let base = server.ws_url();

    println!(
        "Tableside demo feed running at {}",
        style(&base).cyan().bold()
    );
    println!(
        "  orders: {}{}?token=<any>  ({} scripted frame(s))",
        base, orders_path, scripted.0
    );
    println!(
        "  bills:  {}{}?token=<any>  ({} scripted frame(s))",
        base, bills_path, scripted.1
    );

    shutdown_signal().await;
    println!("\nShutting down...");
    server.shutdown().await?;
    println!("Server shut down gracefully.");
    Ok(())
}
