// Auction console entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not terminal)
// 2. Ensure config files exist, load config
// 3. Open database, seed teams
// 4. Optional roster import (--roster <csv>)
// 5. Startup reconciliation sweep
// 6. Spawn WebSocket server task
// 7. Wait for Ctrl+C, then shut down

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};

use auction_console::app::Auctioneer;
use auction_console::auction::bid::BidRules;
use auction_console::config;
use auction_console::protocol::LeagueInfo;
use auction_console::roster_import;
use auction_console::server;
use auction_console::store::Store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing (log to file, not terminal)
    init_tracing()?;
    info!("Auction console starting up");

    // 2. Ensure config files exist, load config
    config::ensure_config_files(&std::env::current_dir()?)?;
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: league={}, {} teams, ws port {}",
        config.league.name,
        config.league.teams.len(),
        config.ws_port
    );

    // 3. Open database, seed teams
    let store = Arc::new(Store::open(&config.db_path).context("failed to open database")?);
    let seeded = store
        .seed_teams(&config.league.teams)
        .context("failed to seed teams")?;
    info!("Database opened at {} ({} teams seeded)", config.db_path, seeded);

    // 4. Optional roster import
    if let Some(path) = roster_arg() {
        let imported = roster_import::import_roster(&store, std::path::Path::new(&path))
            .with_context(|| format!("roster import from {path} failed"))?;
        info!("Imported {} players from {}", imported, path);
    }

    let rules = BidRules::from_config(&config.rules);
    let league = LeagueInfo {
        name: config.league.name.clone(),
        currency: config.league.currency.clone(),
    };
    let app = Arc::new(Auctioneer::new(Arc::clone(&store), rules, league));

    // 5. Startup reconciliation sweep
    match app.reconcile() {
        Ok(0) => info!("Reconciliation sweep: nothing to repair"),
        Ok(n) => info!("Reconciliation sweep assigned {} player(s)", n),
        Err(e) => warn!("Reconciliation sweep failed: {}", e),
    }

    // 6. Spawn WebSocket server task
    let addr = format!("127.0.0.1:{}", config.ws_port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind WebSocket server on {addr}"))?;
    info!("WebSocket server listening on {}", addr);
    println!("auction-console ready on ws://{addr}");

    let admin_token = config.credentials.admin_token.clone();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = server::run(listener, app, store, admin_token).await {
            tracing::error!("WebSocket server error: {}", e);
        }
    });

    // 7. Wait for Ctrl+C, then shut down
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    // The accept loop runs forever; abort it.
    server_handle.abort();
    info!("Auction console shut down cleanly");
    Ok(())
}

/// Parse `--roster <path>` from the command line, if present.
fn roster_arg() -> Option<String> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--roster" {
            return args.next();
        }
    }
    None
}

/// Initialize tracing to log to a file, keeping the terminal clean for
/// operator output.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("auction-console.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("auction_console=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
