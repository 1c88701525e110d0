//! SMTP delivery

use async_trait::async_trait;
use lettre::message::{Mailbox, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

use crate::config::MailerConfig;
use crate::error::{MailerError, MailerResult};
use crate::templates::RenderedMail;

/// Anything that can deliver a built message
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: Message) -> MailerResult<()>;
}

#[async_trait]
impl Mailer for AsyncSmtpTransport<Tokio1Executor> {
    async fn send(&self, message: Message) -> MailerResult<()> {
        AsyncTransport::send(self, message)
            .await
            .map(|_response| ())
            .map_err(|e| MailerError::Delivery(e.to_string()))
    }
}

/// Build the SMTP transport described by `config`
pub fn smtp_transport(config: &MailerConfig) -> MailerResult<AsyncSmtpTransport<Tokio1Executor>> {
    let builder = if config.smtp_tls {
        AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)?
    } else {
        // Local catchers (Mailpit, MailHog) speak plain SMTP
        AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
    };
    let builder = builder.port(config.smtp_port);

    let builder = match &config.smtp_username {
        Some(username) => builder.credentials(Credentials::new(
            username.clone(),
            config.smtp_password.clone().unwrap_or_default(),
        )),
        None => builder,
    };

    info!(
        "SMTP transport configured for {}:{}",
        config.smtp_host, config.smtp_port
    );
    Ok(builder.build())
}

/// Turns rendered mails into messages from a fixed sender
pub struct SmtpSender {
    mailer: Box<dyn Mailer>,
    from: Mailbox,
}

impl SmtpSender {
    pub fn new(mailer: Box<dyn Mailer>, from_email: &str) -> MailerResult<Self> {
        Ok(Self {
            mailer,
            from: from_email.parse()?,
        })
    }

    pub async fn deliver(&self, mail: &RenderedMail) -> MailerResult<()> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(mail.to.parse()?)
            .subject(mail.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(mail.body.clone())?;

        self.mailer.send(message).await
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Records envelope recipients; fails the first `failures` sends
    #[derive(Clone, Default)]
    pub struct RecordingMailer {
        delivered: Arc<Mutex<Vec<String>>>,
        failures: Arc<Mutex<u32>>,
    }

    impl RecordingMailer {
        pub fn failing(failures: u32) -> Self {
            Self {
                delivered: Arc::default(),
                failures: Arc::new(Mutex::new(failures)),
            }
        }

        pub fn delivered(&self) -> Vec<String> {
            self.delivered.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, message: Message) -> MailerResult<()> {
            {
                let mut failures = self.failures.lock().unwrap();
                if *failures > 0 {
                    *failures -= 1;
                    return Err(MailerError::Delivery("connection refused".to_string()));
                }
            }

            let to = message
                .envelope()
                .to()
                .iter()
                .map(|address| address.to_string());
            self.delivered.lock().unwrap().extend(to);
            Ok(())
        }
    }
}
