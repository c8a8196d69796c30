pub mod api;
pub mod catalog;
pub mod config;
pub mod db;
pub mod logging;
pub mod middleware;
pub mod server;

use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use catalog::{ImportSummary, Importer, MokaListingCache};
use config::Config;
use db::SqliteRepository;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Database error: {0}")]
    Database(#[from] db::DbError),
    #[error("Import error: {0}")]
    Import(#[from] catalog::ImportError),
    #[error("Server error: {0}")]
    Server(String),
}

async fn open_database(config: &Config) -> Result<Arc<SqliteRepository>, ServerError> {
    let db_path = config
        .get_database_path()
        .unwrap_or_else(|| "starwars.db".to_string());

    info!("Opening database at {}", db_path);
    Ok(Arc::new(SqliteRepository::new(&db_path).await?))
}

/// Fetch the external catalog into the local database.
pub async fn load_data(config: Config) -> Result<ImportSummary, ServerError> {
    let db = open_database(&config).await?;
    info!(
        planets = %config.catalog.planet_data_url,
        movies = %config.catalog.movie_data_url,
        "Importing catalog"
    );

    let importer = Importer::new(db.clone(), config.catalog.clone())?;
    let summary = importer.run().await?;
    db.close().await;
    Ok(summary)
}

pub async fn run(config: Config) -> Result<(), ServerError> {
    let db = open_database(&config).await?;

    let cache = Arc::new(MokaListingCache::new(
        config.cache.max_capacity,
        config.cache.ttl(),
    ));
    info!(
        ttl_secs = config.cache.ttl_secs,
        max_capacity = config.cache.max_capacity,
        "Listing cache ready"
    );

    let address = config.listen.address.as_deref().unwrap_or("[::]");
    let port = &config.listen.port;
    let addr: SocketAddr = format!("{}:{}", address, port)
        .parse()
        .map_err(|e| ServerError::Server(format!("Invalid address: {}", e)))?;

    let state = server::AppState::new(db, cache);
    let app = server::build_router(state);

    match (&config.listen.tlscert, &config.listen.tlskey) {
        (Some(cert_path), Some(key_path)) => {
            info!("Loading TLS certificate from {}", cert_path);
            info!("Loading TLS key from {}", key_path);

            let tls_config =
                axum_server::tls_rustls::RustlsConfig::from_pem_file(cert_path, key_path)
                    .await
                    .map_err(|e| ServerError::Server(format!("Failed to load TLS config: {}", e)))?;

            info!("Serving HTTPS on {}", addr);

            axum_server::bind_rustls(addr, tls_config)
                .serve(app.into_make_service())
                .await
                .map_err(|e| ServerError::Server(format!("Server error: {}", e)))?;
        }
        _ => {
            info!("Serving HTTP on {}", addr);

            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .map_err(|e| ServerError::Server(format!("Failed to bind: {}", e)))?;

            axum::serve(listener, app)
                .await
                .map_err(|e| ServerError::Server(format!("Server error: {}", e)))?;
        }
    }

    Ok(())
}
