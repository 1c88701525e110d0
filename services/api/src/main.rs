use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod middleware;
mod models;
mod properties;
mod repositories;
mod routes;
mod state;
mod validation;

use common::broker::{RedisConfig, RedisPool};
use common::database;
use common::jwt::{JwtConfig, JwtService};
use common::mail::RedisMailQueue;
use common::token::EmailTokenService;
use tokio::net::TcpListener;

use crate::{
    config::ApiConfig,
    properties::PropertyService,
    repositories::{
        PgFavoriteRepository, PgImageRepository, PgPropertyRepository, PgUserRepository,
    },
    state::AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting API service");

    let config = ApiConfig::from_env()?;

    // Initialize database connection pool
    let db_config = database::DatabaseConfig::from_env()?;
    let pool = database::init_pool(&db_config).await?;

    // Check database connectivity
    if database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    database::run_migrations(&pool).await?;

    // Access tokens are issued by the auth service and only verified here
    let jwt_service = JwtService::new(JwtConfig::from_env()?)?;
    let email_tokens = EmailTokenService::from_env()?;

    let redis_config = RedisConfig::from_env();
    let redis_pool = RedisPool::new(&redis_config)?;
    let mail_queue = RedisMailQueue::new(redis_pool, redis_config.mail_queue_key.clone());

    let properties = PropertyService::new(
        Arc::new(PgPropertyRepository::new(pool.clone())),
        Arc::new(PgImageRepository::new(pool.clone())),
        Arc::new(PgFavoriteRepository::new(pool.clone())),
        Arc::new(PgUserRepository::new(pool)),
        Arc::new(mail_queue),
        email_tokens,
        config.public_url.clone(),
    );

    let app_state = AppState {
        properties,
        jwt_service,
    };

    info!("API service initialized successfully");

    // Start the web server
    let app = routes::create_router(app_state);

    let listener = TcpListener::bind(&config.bind_address).await?;
    info!("API service listening on {}", config.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
