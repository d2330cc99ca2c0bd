//! Carrel - moderation and audit core for a student note-sharing platform

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use carrel::config::Args;
use carrel::db::store::EntityStore;
use carrel::db::{MemoryStore, MongoStore};
use carrel::server::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("carrel={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Carrel - moderation & audit core");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!(
        "Mode: {}",
        if args.dev_mode {
            "DEVELOPMENT"
        } else {
            "PRODUCTION"
        }
    );
    info!("MongoDB: {}", args.mongodb_uri);
    info!("Audit feed limit: {}", args.audit_feed_limit);
    info!("Notification feed limit: {}", args.notification_feed_limit);
    info!("======================================");

    let store: Arc<dyn EntityStore> =
        match MongoStore::connect(&args.mongodb_uri, &args.mongodb_db).await {
            Ok(store) => Arc::new(store),
            Err(e) => {
                if args.dev_mode {
                    warn!("MongoDB connection failed: {}", e);
                    warn!("Dev mode: continuing with the in-memory store");
                    Arc::new(MemoryStore::new())
                } else {
                    error!("MongoDB connection failed: {}", e);
                    error!("Set DEV_MODE=true to run without MongoDB");
                    std::process::exit(1);
                }
            }
        };

    let state = Arc::new(AppState::new(args, store));

    if let Err(e) = server::run(state).await {
        error!("Server error: {:?}", e);
        std::process::exit(1);
    }

    Ok(())
}
