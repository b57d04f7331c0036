//! Configuration view and validation commands (`tableside config`).

use anyhow::Result;
use console::style;
use tableside::config::{CONFIG_FILE, TablesideConfig, TablesideToml, TOKEN_ENV, WS_URL_ENV};

use super::super::ConfigCommands;

fn print_toml(toml: &TablesideToml) {
    println!("[server]");
    println!("  ws_url = \"{}\"", toml.server.ws_url);
    println!("  orders_path = \"{}\"", toml.server.orders_path);
    println!("  bills_path = \"{}\"", toml.server.bills_path);
    println!();

    println!("[connection]");
    println!("  reconnect_attempts = {}", toml.connection.reconnect_attempts);
    println!(
        "  reconnect_interval_ms = {}",
        toml.connection.reconnect_interval_ms
    );
    println!("  connect_timeout_ms = {}", toml.connection.connect_timeout_ms);
    println!("  frame_buffer = {}", toml.connection.frame_buffer);
    println!();

    println!("[logging]");
    println!("  level = \"{}\"", toml.logging.level);
    println!("  format = \"{}\"", toml.logging.format);
    if let Some(dir) = &toml.logging.directory {
        println!("  directory = \"{}\"", dir.display());
    }
    println!();

    println!("[kitchen]");
    println!("  statuses = {:?}", toml.kitchen.statuses);
    println!();
}

pub fn cmd_config(config: &TablesideConfig, command: Option<ConfigCommands>) -> Result<()> {
    let config_path = &config.config_path;

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("{}", style("Tableside Configuration").bold());
            println!("=======================");
            println!();

            if config_path.exists() {
                println!("Config file: {}", config_path.display());
            } else {
                println!("No {} found at {}", CONFIG_FILE, config_path.display());
                println!("Using default configuration:");
            }
            println!();
            print_toml(&config.toml);

            println!("Effective values (with env/CLI overrides):");
            println!("  ws_url = \"{}\"", config.ws_url());
            let token = match config.token() {
                Some(_) => style("set").green().to_string(),
                None => style(format!("not set (pass --token or {})", TOKEN_ENV))
                    .yellow()
                    .to_string(),
            };
            println!("  token = {}", token);
            println!("  ({} overrides server.ws_url)", WS_URL_ENV);
            println!();

            if !config_path.exists() {
                println!("Run 'tableside config init' to create a {} file.", CONFIG_FILE);
                println!();
            }
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            if !config_path.exists() {
                println!("No {} found. Using defaults (valid).", CONFIG_FILE);
                return Ok(());
            }

            let warnings = config.validate();
            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("{} already exists at {}", CONFIG_FILE, config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            TablesideToml::default().save(config_path)?;

            println!("Created {} at {}", CONFIG_FILE, config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [server] ws_url, orders_path, bills_path");
            println!("  - [connection] reconnect_attempts, reconnect_interval_ms");
            println!("  - [kitchen] statuses shown on the kitchen dashboard");
            println!();
        }
    }

    Ok(())
}
