use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tableside::config::TablesideConfig;
use tableside::logging;
use tableside::ui::UiMode;

mod cmd;

#[derive(Parser)]
#[command(name = "tableside")]
#[command(version, about = "Live order and bill dashboards for restaurant staff")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Path to tableside.toml. Defaults to .tableside/tableside.toml in the project dir.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// WebSocket base URL. Overrides TABLESIDE_WS_URL and server.ws_url.
    #[arg(long, global = true)]
    pub ws_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Live kitchen dashboard (orders feed)
    Kitchen {
        /// Session token. Overrides TABLESIDE_TOKEN.
        #[arg(long)]
        token: Option<String>,

        /// UI output mode: full, json
        #[arg(long, default_value = "full")]
        ui: String,
    },
    /// Live waiter dashboard (bills feed)
    Waiter {
        /// Session token. Overrides TABLESIDE_TOKEN.
        #[arg(long)]
        token: Option<String>,

        /// Only show bills for this table
        #[arg(long)]
        table: Option<u32>,

        /// UI output mode: full, json
        #[arg(long, default_value = "full")]
        ui: String,
    },
    /// Apply a recorded frame file offline and print the resulting list as JSON
    Replay {
        feed: FeedArg,

        /// File with one JSON frame per line
        file: PathBuf,

        #[arg(long, value_enum, default_value_t = ReplayView::All)]
        view: ReplayView,

        /// Only bills for this table
        #[arg(long)]
        table: Option<u32>,
    },
    /// Run a demo feed server that replays frame files to every client
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to serve on (0 picks a free port)
        #[arg(short, long, default_value = "8080")]
        port: u16,

        /// Frame file replayed on the orders feed
        #[arg(long)]
        orders: Option<PathBuf>,

        /// Frame file replayed on the bills feed
        #[arg(long)]
        bills: Option<PathBuf>,

        /// Delay between replayed frames
        #[arg(long, default_value = "500")]
        interval_ms: u64,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeedArg {
    Orders,
    Bills,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplayView {
    All,
    Kitchen,
    FrontDesk,
    Ready,
    Delivery,
    Open,
    Closed,
}

impl std::fmt::Display for ReplayView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.to_possible_value() {
            Some(value) => f.write_str(value.get_name()),
            None => write!(f, "{:?}", self),
        }
    }
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Initialize a default tableside.toml file
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    let token = match &cli.command {
        Commands::Kitchen { token, .. } | Commands::Waiter { token, .. } => token.clone(),
        _ => None,
    };
    let config = TablesideConfig::load(&project_dir, cli.config.as_deref())?
        .with_cli_args(cli.ws_url.clone(), token);
    let _log_guard = logging::init_logging(&config.toml.logging, cli.verbose)?;

    match &cli.command {
        Commands::Kitchen { ui, .. } => {
            let ui: UiMode = ui.parse().unwrap_or_default();
            cmd::cmd_kitchen(&config, ui).await?;
        }
        Commands::Waiter { table, ui, .. } => {
            let ui: UiMode = ui.parse().unwrap_or_default();
            cmd::cmd_waiter(&config, *table, ui).await?;
        }
        Commands::Replay {
            feed,
            file,
            view,
            table,
        } => cmd::cmd_replay(&config, *feed, file, *view, *table)?,
        Commands::Serve {
            host,
            port,
            orders,
            bills,
            interval_ms,
        } => {
            let args = cmd::serve::ServeArgs {
                host,
                port: *port,
                orders: orders.as_deref(),
                bills: bills.as_deref(),
                interval_ms: *interval_ms,
            };
            cmd::cmd_serve(&config, args).await?;
        }
        Commands::Config { command } => cmd::cmd_config(&config, command.clone())?,
    }

    Ok(())
}
