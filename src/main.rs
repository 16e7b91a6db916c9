use tracing::{error, info};

use lumina::{Config, Database, ShareReaper};

const CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() {
    let config = match Config::load_with_env(CONFIG_PATH) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {CONFIG_PATH}: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    if let Err(e) = lumina::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        lumina::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    info!("Lumina access core starting");

    let db = match Database::open_with_max_connections(
        &config.database.path,
        config.database.max_connections,
    )
    .await
    {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to open database {}: {}", config.database.path, e);
            std::process::exit(1);
        }
    };

    match db.schema_version().await {
        Ok(version) => info!("Database ready at {} (schema v{})", config.database.path, version),
        Err(e) => error!("Failed to read schema version: {}", e),
    }

    let reaper_task = if config.shares.reaper_enabled {
        let reaper = ShareReaper::with_interval(db.clone(), config.shares.reap_interval_secs);
        Some(tokio::spawn(async move { reaper.run().await }))
    } else {
        info!("Share reaper disabled");
        None
    };

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }

    info!("Shutting down");
    if let Some(task) = reaper_task {
        task.abort();
    }
    db.close().await;
}
