use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pantry_api::{
    config::Config,
    db::{create_pool, create_redis_client, Cache, InMemoryStore, PgRecipeStore, RecipeStore},
    routes::{create_router, AppDependencies, AppState},
    services::{
        enhancement::HttpEnhancementClient, providers::SpoonacularProvider, BackgroundTasks,
        CacheSettings, EnhancementGateway,
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("pantry_api=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let store: Arc<dyn RecipeStore> = match &config.database_url {
        Some(url) => {
            let pool = create_pool(url).await?;
            tracing::info!("Using PostgreSQL recipe store");
            Arc::new(PgRecipeStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, recipes will not survive a restart");
            Arc::new(InMemoryStore::new())
        }
    };

    let (cache, cache_handle) = match &config.redis_url {
        Some(url) => Cache::new(create_redis_client(url)?),
        None => {
            tracing::info!("REDIS_URL not set, using in-process search cache");
            Cache::in_memory()
        }
    };

    let (tasks, tasks_handle) = BackgroundTasks::with_capacity(
        config.background_concurrency,
        config.background_queue_capacity,
    );

    let provider = SpoonacularProvider::new(
        config.recipe_api_key.clone(),
        config.recipe_api_url.clone(),
        Duration::from_millis(config.recipe_api_timeout_ms),
        config.retry_policy(),
    )?;

    let gateway = match &config.enhancement_api_url {
        Some(url) => {
            let client = HttpEnhancementClient::new(
                url.clone(),
                config.enhancement_api_key.clone(),
                Duration::from_millis(config.enhancement_timeout_ms),
            )?;
            tracing::info!(url = %url, "Recipe enhancement enabled");
            EnhancementGateway::new(Arc::new(client), config.retry_policy(), tasks.clone())
        }
        None => {
            tracing::info!("ENHANCEMENT_API_URL not set, serving local fallbacks only");
            EnhancementGateway::disabled(tasks.clone())
        }
    };

    let state = AppState::new(AppDependencies {
        store,
        provider: Arc::new(provider),
        gateway,
        cache,
        tasks,
        cache_settings: CacheSettings::from_config(&config),
        search_history_limit: config.search_history_limit,
    });

    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server running on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tasks_handle.shutdown().await;
    cache_handle.shutdown().await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
