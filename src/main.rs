use anyhow::{Context, Result};
use std::sync::Arc;

use prompt_transformer::{
    config,
    dispatcher::{Dispatcher, DispatcherSettings},
    frameworks, http_client, routes,
    store::{Database, SqliteCredentialStore, SqliteHistoryStore, SqliteInstructionStore},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Check if interactive setup is needed (no .env and missing required values)
    if config::needs_interactive_setup() {
        let interactive_config = config::run_interactive_setup()?;

        // Set environment variables from interactive config so Config::load() can use them
        std::env::set_var("PROXY_API_KEY", &interactive_config.proxy_api_key);
        if !interactive_config.openrouter_api_key.is_empty() {
            std::env::set_var("OPENROUTER_API_KEY", &interactive_config.openrouter_api_key);
        }
        std::env::set_var("SERVER_PORT", &interactive_config.server_port);
    }

    // Load configuration first (for log level)
    let config = config::Config::load()?;

    // Initialize logging with a configured level
    let log_level = config.log_level.to_lowercase();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    config.validate()?;

    tracing::info!("Prompt Transformer starting...");
    tracing::info!(
        "Server configured: {}:{}",
        config.server_host,
        config.server_port
    );

    let db = Database::open(&config.database_file).with_context(|| {
        format!(
            "Failed to open database: {}",
            config.database_file.display()
        )
    })?;
    tracing::info!("Storage initialized");

    let http_client = Arc::new(http_client::ProviderHttpClient::new(
        config.http_connect_timeout,
        config.http_request_timeout,
    )?);
    let dispatcher = Arc::new(Dispatcher::new(
        http_client,
        DispatcherSettings::from_config(&config),
    ));
    tracing::info!("Dispatcher initialized");

    let app_state = routes::AppState {
        proxy_api_key: config.proxy_api_key.clone(),
        dispatcher,
        credentials: Arc::new(SqliteCredentialStore::new(db.clone())),
        history: Arc::new(SqliteHistoryStore::new(db.clone())),
        instructions: SqliteInstructionStore::new(db),
    };

    let app = routes::build_app(app_state);

    // Bind to configured host and port
    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    print_startup_banner(&config);

    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}

/// Print startup banner
fn print_startup_banner(config: &config::Config) {
    let names: Vec<&str> = frameworks::list_frameworks()
        .iter()
        .map(|f| f.name)
        .collect();

    println!();
    println!("  Prompt Transformer");
    println!();
    println!("  Version:     {}", env!("CARGO_PKG_VERSION"));
    println!(
        "  Server:      http://{}:{}",
        config.server_host, config.server_port
    );
    println!("  Database:    {}", config.database_file.display());
    println!("  Frameworks:  {}", names.join(", "));
    println!(
        "  OpenRouter:  {}",
        if config.deployment_keys.openrouter.is_some() {
            "configured"
        } else {
            "not configured"
        }
    );
    println!("  Log Level:   {}", config.log_level);
    println!();
}

/// Handle graceful shutdown signal
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown...");
        },
    }
}
