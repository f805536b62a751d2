pub mod api;
pub mod apps;
pub mod config;
pub mod error;
pub mod framework;
pub mod logging;
pub mod logic;
pub mod model;
pub mod store;

// Export API types
pub use api::{create_router, Controller, HandlerRegistry, Invocation};

pub use error::{Error, Result};
pub use framework::Framework;

// Export logic types
pub use logic::{
    DiskOracle, FileExistenceOracle, HtmlEscape, MemoryOracle, PathResolver, RequestParser,
    Sanitizer,
};

// Export all model types
pub use model::*;

// Export store types
pub use store::{
    ConnectionSpec, Dialect, Record, Repository, RepositoryPool, SqlRepository, Statement,
};

/// Serves `framework` on `listener` until the process stops.
pub async fn serve(
    framework: std::sync::Arc<Framework>,
    listener: tokio::net::TcpListener,
) -> anyhow::Result<()> {
    use std::net::SocketAddr;

    let resources = framework
        .apps
        .default_paths(framework.resolver.oracle())
        .resources_dir();
    let app = create_router(resources).with_state(framework);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Loads the configuration, opens the optional connection pool and serves
/// the handlers in `registry`.
pub async fn run_server(registry: HandlerRegistry) -> anyhow::Result<()> {
    use std::sync::Arc;
    use tokio::net::TcpListener;

    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    logging::init_logging();

    // Load configuration
    let config = crate::config::AppConfig::load()?;
    log::info!(
        "Configuration loaded: server={}:{}, webapps={}, {} handlers",
        config.server.host,
        config.server.port,
        config.framework.webapps_dir,
        registry.len()
    );

    let mut framework = Framework::new(config.clone(), registry);
    match config.connection_string() {
        Some(spec) => {
            let max_connections = config.database.max_connections.unwrap_or(20);
            framework = framework.with_pool(RepositoryPool::connect(spec, max_connections).await?);
        }
        None => log::warn!("No connection string configured; repositories are unavailable"),
    }

    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;
    log::info!("runrs server running on http://{}", bind_address);

    serve(Arc::new(framework), listener).await
}
