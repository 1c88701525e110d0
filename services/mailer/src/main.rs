use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod smtp;
mod templates;
mod worker;

use common::broker::{RedisConfig, RedisPool};
use common::mail::RedisMailQueue;

use crate::{
    config::MailerConfig,
    smtp::{SmtpSender, smtp_transport},
    templates::MailTemplates,
    worker::MailWorker,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting mail worker");

    let config = MailerConfig::from_env()?;

    let redis_config = RedisConfig::from_env();
    let redis_pool = RedisPool::new(&redis_config)?;
    if !redis_pool.health_check().await.unwrap_or(false) {
        warn!("Redis is not reachable yet, the worker will keep polling");
    }
    let queue = RedisMailQueue::new(redis_pool, redis_config.mail_queue_key.clone());

    let templates = MailTemplates::new(config.website_name.clone())?;
    let sender = SmtpSender::new(Box::new(smtp_transport(&config)?), &config.from_email)?;

    let worker = MailWorker::new(Arc::new(queue), templates, sender, config.max_attempts);

    info!(
        "Mail worker consuming {} (max {} attempts per mail)",
        redis_config.mail_queue_key, config.max_attempts
    );

    // Finish the mail in hand, then stop on interrupt
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
        }
        info!("Shutting down mail worker");
    };
    worker.run(shutdown).await;

    Ok(())
}
