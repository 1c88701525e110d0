//! Mail jobs and the queue that carries them to the mail worker
//!
//! HTTP handlers never talk to SMTP. They push a [`MailJob`] onto a
//! [`MailQueue`] and return; the mailer service pops jobs, renders them and
//! delivers them. Delivery is at-least-once: a popped job stays in flight
//! until it is acknowledged, and jobs left in flight by a stopped worker are
//! put back with [`MailQueue::recover`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

use crate::broker::RedisPool;
use crate::error::QueueError;

/// One email to send
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MailJob {
    /// Account activation link plus the confirmation code
    Activation {
        username: String,
        email: String,
        activation_link: String,
        code: String,
    },
    /// Password reset link
    PasswordReset {
        username: String,
        email: String,
        reset_link: String,
    },
    /// Ask an agent to take a property into management
    AgentAssignment {
        agent_username: String,
        agent_email: String,
        owner_username: String,
        property_title: String,
        confirm_link: String,
    },
    /// Tell the owner the agent accepted
    AgentAccepted {
        owner_username: String,
        owner_email: String,
        agent_username: String,
        property_title: String,
    },
    /// Tell the owner the agent declined
    AgentDeclined {
        owner_username: String,
        owner_email: String,
        agent_username: String,
        property_title: String,
    },
}

impl MailJob {
    /// Address the mail is delivered to
    pub fn recipient(&self) -> &str {
        match self {
            MailJob::Activation { email, .. } | MailJob::PasswordReset { email, .. } => email,
            MailJob::AgentAssignment { agent_email, .. } => agent_email,
            MailJob::AgentAccepted { owner_email, .. }
            | MailJob::AgentDeclined { owner_email, .. } => owner_email,
        }
    }

    /// Stable name of the job type, also the template name
    pub fn kind(&self) -> &'static str {
        match self {
            MailJob::Activation { .. } => "activation",
            MailJob::PasswordReset { .. } => "password_reset",
            MailJob::AgentAssignment { .. } => "agent_assignment",
            MailJob::AgentAccepted { .. } => "agent_accepted",
            MailJob::AgentDeclined { .. } => "agent_declined",
        }
    }
}

/// A job as stored on the queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedMail {
    /// Delivery attempts already made
    pub attempts: u32,
    pub job: MailJob,
}

impl QueuedMail {
    pub fn new(job: MailJob) -> Self {
        Self { attempts: 0, job }
    }

    /// The same job with one more recorded attempt
    pub fn retried(self) -> Self {
        Self {
            attempts: self.attempts + 1,
            job: self.job,
        }
    }
}

/// Queue of outbound mail
#[async_trait]
pub trait MailQueue: Send + Sync {
    /// Push a job onto the queue
    async fn push(&self, mail: QueuedMail) -> Result<(), QueueError>;

    /// Take the oldest job, waiting up to `timeout` for one to arrive
    ///
    /// The job stays in flight until [`MailQueue::ack`] is called for it.
    async fn pop(&self, timeout: Duration) -> Result<Option<QueuedMail>, QueueError>;

    /// Mark a popped job as done
    async fn ack(&self, mail: &QueuedMail) -> Result<(), QueueError>;

    /// Put every job still in flight back on the queue; returns how many
    async fn recover(&self) -> Result<usize, QueueError>;

    /// Queue a fresh job
    async fn enqueue(&self, job: MailJob) -> Result<(), QueueError> {
        info!("Queueing {} mail", job.kind());
        self.push(QueuedMail::new(job)).await
    }
}

/// Mail queue stored in a Redis list
///
/// Popped jobs wait in `<key>:processing` until they are acknowledged.
#[derive(Clone)]
pub struct RedisMailQueue {
    pool: RedisPool,
    key: String,
    processing_key: String,
}

impl RedisMailQueue {
    pub fn new(pool: RedisPool, key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            pool,
            processing_key: format!("{}:processing", key),
            key,
        }
    }

    /// Jobs waiting in the list
    pub async fn len(&self) -> Result<usize, QueueError> {
        Ok(self.pool.len(&self.key).await?)
    }
}

#[async_trait]
impl MailQueue for RedisMailQueue {
    async fn push(&self, mail: QueuedMail) -> Result<(), QueueError> {
        let payload = serde_json::to_string(&mail)?;
        self.pool.push(&self.key, &payload).await?;
        Ok(())
    }

    async fn pop(&self, timeout: Duration) -> Result<Option<QueuedMail>, QueueError> {
        let Some(payload) = self
            .pool
            .pop_into(&self.key, &self.processing_key, timeout)
            .await?
        else {
            return Ok(None);
        };

        match serde_json::from_str(&payload) {
            Ok(mail) => Ok(Some(mail)),
            Err(e) => {
                // An undecodable payload would be recovered forever
                self.pool.remove(&self.processing_key, &payload).await?;
                Err(e.into())
            }
        }
    }

    async fn ack(&self, mail: &QueuedMail) -> Result<(), QueueError> {
        let payload = serde_json::to_string(mail)?;
        self.pool.remove(&self.processing_key, &payload).await?;
        Ok(())
    }

    async fn recover(&self) -> Result<usize, QueueError> {
        let moved = self.pool.move_all(&self.processing_key, &self.key).await?;
        if moved > 0 {
            info!("Recovered {} in-flight mail jobs", moved);
        }
        Ok(moved)
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use memory::MemoryMailQueue;

#[cfg(any(test, feature = "test-support"))]
mod memory {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// In-process queue that keeps every pushed job for inspection
    #[derive(Clone, Default)]
    pub struct MemoryMailQueue {
        pending: Arc<Mutex<VecDeque<QueuedMail>>>,
        in_flight: Arc<Mutex<Vec<QueuedMail>>>,
        pushed: Arc<Mutex<Vec<MailJob>>>,
    }

    impl MemoryMailQueue {
        pub fn new() -> Self {
            Self::default()
        }

        /// Every job pushed so far, oldest first
        pub fn sent(&self) -> Vec<MailJob> {
            self.pushed.lock().expect("mail outbox poisoned").clone()
        }

        /// Number of jobs pushed so far
        pub fn sent_count(&self) -> usize {
            self.pushed.lock().expect("mail outbox poisoned").len()
        }

        /// Jobs popped but not acknowledged yet
        pub fn in_flight(&self) -> usize {
            self.in_flight.lock().expect("mail queue poisoned").len()
        }
    }

    #[async_trait]
    impl MailQueue for MemoryMailQueue {
        async fn push(&self, mail: QueuedMail) -> Result<(), QueueError> {
            self.pushed
                .lock()
                .expect("mail outbox poisoned")
                .push(mail.job.clone());
            self.pending
                .lock()
                .expect("mail queue poisoned")
                .push_back(mail);
            Ok(())
        }

        async fn pop(&self, _timeout: Duration) -> Result<Option<QueuedMail>, QueueError> {
            let popped = self.pending.lock().expect("mail queue poisoned").pop_front();
            if let Some(mail) = &popped {
                self.in_flight
                    .lock()
                    .expect("mail queue poisoned")
                    .push(mail.clone());
            }
            Ok(popped)
        }

        async fn ack(&self, mail: &QueuedMail) -> Result<(), QueueError> {
            let mut in_flight = self.in_flight.lock().expect("mail queue poisoned");
            if let Some(index) = in_flight.iter().position(|m| m == mail) {
                in_flight.remove(index);
            }
            Ok(())
        }

        async fn recover(&self) -> Result<usize, QueueError> {
            let recovered: Vec<QueuedMail> = self
                .in_flight
                .lock()
                .expect("mail queue poisoned")
                .drain(..)
                .collect();
            let mut pending = self.pending.lock().expect("mail queue poisoned");
            // oldest in-flight job first
            for mail in recovered.iter().rev() {
                pending.push_front(mail.clone());
            }
            Ok(recovered.len())
        }
    }
}
