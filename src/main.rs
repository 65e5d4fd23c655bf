//! Strands relay - multiplayer WebSocket relay for cooperative Strands
//!
//! Issues pseudonymous identities, groups them into rooms around a shared
//! board, and relays gameplay events between room members. Daily puzzles
//! are fetched from the upstream puzzle source and cached on disk.
//!
//! Usage:
//!   strands-relay                                # Default port 8802
//!   strands-relay --port 9000                    # Custom port
//!   strands-relay --board-cache /var/lib/strands/boards.json
//!   strands-relay --identity-ttl-secs 0          # Never forget identities

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use strands_boards::{BoardCache, BoardCacheConfig};
use strands_hub::{Hub, HubConfig};
use strands_transport::{TransportConfig, TransportServer};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "strands-relay", about = "Strands relay - multiplayer room server for Strands")]
struct Cli {
    /// Port to listen on (0 for OS-assigned)
    #[arg(long, default_value = "8802")]
    port: u16,

    /// Hostname to bind to
    #[arg(long, default_value = "0.0.0.0")]
    hostname: String,

    /// Maximum concurrent connections
    #[arg(long, default_value = "256")]
    max_connections: usize,

    /// Board cache file
    #[arg(long, default_value = "boards.json")]
    board_cache: PathBuf,

    /// Upstream puzzle base URL (boards are fetched from <url>/<date>.json)
    #[arg(long, default_value = "https://www.nytimes.com/games-assets/strands")]
    board_url: String,

    /// Number of days listed by BOARDSUMMARIES
    #[arg(long, default_value = "30")]
    summary_days: usize,

    /// Forget idle identities after this many seconds (0 to keep them forever)
    #[arg(long, default_value = "86400")]
    identity_ttl_secs: u64,

    /// Seconds between idle identity sweeps
    #[arg(long, default_value = "300")]
    reap_interval_secs: u64,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,

    /// Write logs to a file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Cli {
    fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            port: self.port,
            hostname: self.hostname.clone(),
            max_connections: Some(self.max_connections),
            verbose_logging: self.verbose,
        }
    }

    fn hub_config(&self) -> HubConfig {
        HubConfig {
            summary_days: self.summary_days,
            identity_ttl: (self.identity_ttl_secs > 0)
                .then(|| Duration::from_secs(self.identity_ttl_secs)),
            reap_interval: Duration::from_secs(self.reap_interval_secs.max(1)),
        }
    }

    fn board_cache_config(&self) -> BoardCacheConfig {
        BoardCacheConfig {
            path: Some(self.board_cache.clone()),
            base_url: self.board_url.clone(),
        }
    }
}

fn init_tracing(cli: &Cli) {
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    let Some(log_path) = &cli.log_file else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
        return;
    };

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
    {
        Ok(file) => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false)
                .init();
            eprintln!("Logging to {}", log_path.display());
        }
        Err(e) => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
            error!("Failed to open log file {}: {e}", log_path.display());
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);

    let boards = Arc::new(BoardCache::open(&cli.board_cache_config()));
    info!(
        "Board cache {} ({} boards)",
        cli.board_cache.display(),
        boards.len()
    );

    let hub = Arc::new(Hub::new(cli.hub_config(), boards));
    let reaper = hub.start_reaper();

    let mut transport = match TransportServer::start_shared(cli.transport_config(), hub).await {
        Ok(t) => t,
        Err(e) => {
            error!("Failed to start transport: {e}");
            std::process::exit(1);
        }
    };

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                        Strands Relay                         ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
    println!("  WebSocket:    ws://{}:{}/", cli.hostname, transport.port());
    println!("  Health:       http://{}:{}/health", cli.hostname, transport.port());
    println!("  Board cache:  {}", cli.board_cache.display());
    match cli.identity_ttl_secs {
        0 => println!("  Identities:   kept forever"),
        ttl => println!("  Identities:   forgotten after {ttl}s idle"),
    }
    println!();
    println!("  Press Ctrl+C to stop.");
    println!();

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {e}");
    }

    println!();
    println!("  Shutting down...");
    if let Some(reaper) = reaper {
        reaper.abort();
    }
    transport.stop().await;
    println!("  Server stopped.");
}
