use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod accounts;
mod config;
mod error;
mod middleware;
mod models;
mod password;
mod rate_limiter;
mod repositories;
mod routes;
mod users;
mod validation;

use common::broker::{RedisConfig, RedisPool};
use common::database;
use common::jwt::{JwtConfig, JwtService};
use common::mail::RedisMailQueue;
use common::token::EmailTokenService;
use tokio::net::TcpListener;

use crate::{
    accounts::AccountService,
    config::AuthConfig,
    rate_limiter::{RateLimiter, RateLimiterConfig},
    repositories::{PgConfCodeRepository, PgUserRepository, UserRepository},
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub accounts: AccountService,
    pub users: Arc<dyn UserRepository>,
    pub jwt_service: JwtService,
    pub rate_limiter: RateLimiter,
    pub public_url: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting authentication service");

    let config = AuthConfig::from_env()?;

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

    // Initialize JWT and email token signing
    let jwt_service = JwtService::new(JwtConfig::from_env()?)?;
    let email_tokens = EmailTokenService::from_env()?;

    // Mail jobs go to the Redis list drained by the mailer
    let redis_config = RedisConfig::from_env();
    let redis_pool = RedisPool::new(&redis_config)?;
    let mail_queue = RedisMailQueue::new(redis_pool, redis_config.mail_queue_key.clone());

    let users: Arc<dyn UserRepository> = Arc::new(PgUserRepository::new(pool.clone()));
    let conf_codes = Arc::new(PgConfCodeRepository::new(pool));

    let accounts = AccountService::new(
        users.clone(),
        conf_codes,
        Arc::new(mail_queue),
        email_tokens,
        jwt_service.clone(),
        config.public_url.clone(),
    );

    let app_state = AppState {
        accounts,
        users,
        jwt_service,
        rate_limiter: RateLimiter::new(RateLimiterConfig::default()),
        public_url: config.public_url.trim_end_matches('/').to_string(),
    };

    info!("Authentication service initialized successfully");

    // Start the web server
    let app = routes::create_router(app_state);

    let listener = TcpListener::bind(&config.bind_address).await?;
    info!("Authentication service listening on {}", config.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
