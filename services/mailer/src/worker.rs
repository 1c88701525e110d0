//! Queue consumer
//!
//! Pops one job at a time, renders it and hands it to SMTP. A failed
//! delivery goes back on the queue with its attempt counter raised until
//! the configured limit; render and address errors are dropped at once.
//! A job is acknowledged only after its outcome is settled, so a crash or a
//! broker error leaves it in flight for the next start to recover.

use common::mail::{MailQueue, QueuedMail};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{Instrument, error, info, info_span, warn};

use crate::error::MailerResult;
use crate::smtp::SmtpSender;
use crate::templates::MailTemplates;

/// How long one blocking pop waits for a job
pub const POLL_TIMEOUT: Duration = Duration::from_secs(5);

/// Pause after a broker error before polling again
const BROKER_BACKOFF: Duration = Duration::from_secs(1);

/// What happened to a popped job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Sent,
    Requeued,
    Dropped,
}

pub struct MailWorker {
    queue: Arc<dyn MailQueue>,
    templates: MailTemplates,
    sender: SmtpSender,
    max_attempts: u32,
}

impl MailWorker {
    pub fn new(
        queue: Arc<dyn MailQueue>,
        templates: MailTemplates,
        sender: SmtpSender,
        max_attempts: u32,
    ) -> Self {
        Self {
            queue,
            templates,
            sender,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Put jobs a previous run left in flight back on the queue
    pub async fn recover(&self) -> MailerResult<usize> {
        let recovered = self.queue.recover().await?;
        if recovered > 0 {
            warn!("Requeued {} mails left in flight", recovered);
        }
        Ok(recovered)
    }

    /// Process jobs until `shutdown` completes
    ///
    /// Shutdown is only observed between jobs; a delivery in progress is
    /// always finished and acknowledged first.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) {
        info!("Mail worker started");
        if let Err(e) = self.recover().await {
            error!("Failed to recover in-flight mail: {}", e);
        }

        tokio::pin!(shutdown);
        loop {
            let popped = tokio::select! {
                biased;
                _ = &mut shutdown => break,
                popped = self.queue.pop(POLL_TIMEOUT) => popped,
            };

            let handled = match popped {
                Ok(Some(mail)) => self.handle(mail).await.map(|_| ()),
                Ok(None) => Ok(()),
                Err(e) => Err(e.into()),
            };
            if let Err(e) = handled {
                error!("Mail queue error: {}", e);
                sleep(BROKER_BACKOFF).await;
            }
        }

        info!("Mail worker stopped");
    }

    /// Handle at most one job; `None` when the queue stayed empty
    pub async fn run_once(&self, timeout: Duration) -> MailerResult<Option<Outcome>> {
        match self.queue.pop(timeout).await? {
            Some(mail) => Ok(Some(self.handle(mail).await?)),
            None => Ok(None),
        }
    }

    /// Settle one popped job, then acknowledge it
    async fn handle(&self, mail: QueuedMail) -> MailerResult<Outcome> {
        let span = info_span!(
            "mail_job",
            kind = mail.job.kind(),
            attempt = mail.attempts + 1
        );
        let outcome = self.process(&mail).instrument(span).await?;
        self.queue.ack(&mail).await?;
        Ok(outcome)
    }

    async fn process(&self, mail: &QueuedMail) -> MailerResult<Outcome> {
        let delivery = match self.templates.render(&mail.job) {
            Ok(rendered) => self.sender.deliver(&rendered).await,
            Err(e) => Err(e),
        };

        let e = match delivery {
            Ok(()) => {
                info!("Mail sent to {}", mail.job.recipient());
                return Ok(Outcome::Sent);
            }
            Err(e) => e,
        };

        if !e.is_transient() {
            error!("Dropping mail to {}: {}", mail.job.recipient(), e);
            return Ok(Outcome::Dropped);
        }

        let mail = mail.clone().retried();
        if mail.attempts >= self.max_attempts {
            error!(
                "Giving up on mail to {} after {} attempts: {}",
                mail.job.recipient(),
                mail.attempts,
                e
            );
            return Ok(Outcome::Dropped);
        }

        warn!("Delivery failed, requeueing: {}", e);
        self.queue.push(mail).await?;
        Ok(Outcome::Requeued)
    }
}
