use std::{sync::Arc, time::Duration};

use moviedex::{
    AppState,
    catalog::CatalogService,
    config::Config,
    coordinator::SearchCoordinator,
    db,
    omdb::OmdbClient,
    routes,
    store::MovieStore,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,moviedex=debug,sqlx=warn".to_string()),
        )
        .init();

    let config = Config::from_env()?;

    let http = reqwest::Client::builder()
        .user_agent("moviedex/0.1")
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .build()?;

    let db = db::connect_and_migrate(&config.database_url).await?;
    let store = MovieStore::new(db);

    let omdb = OmdbClient::new(http, config.omdb_api_key.clone(), config.omdb_base_url.clone());
    let catalog = Arc::new(CatalogService::new(store, Arc::new(omdb), config.detail_concurrency));
    let coordinator = SearchCoordinator::new(catalog.clone());

    let state = Arc::new(AppState { catalog, coordinator });

    let app = routes::router(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(addr = %config.addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
