//! Subjects and bodies for each mail job
//!
//! Bodies are plain-text Tera templates compiled into the binary, one per
//! job kind. The job's fields are the template context.

use common::mail::MailJob;
use tera::{Context, Tera};

use crate::error::MailerResult;

const TEMPLATES: &[(&str, &str)] = &[
    ("activation", include_str!("../templates/activation.txt")),
    ("password_reset", include_str!("../templates/password_reset.txt")),
    ("agent_assignment", include_str!("../templates/agent_assignment.txt")),
    ("agent_accepted", include_str!("../templates/agent_accepted.txt")),
    ("agent_declined", include_str!("../templates/agent_declined.txt")),
];

/// A mail ready to hand to the SMTP sender
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

pub struct MailTemplates {
    tera: Tera,
    website_name: String,
}

impl MailTemplates {
    pub fn new(website_name: impl Into<String>) -> MailerResult<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(TEMPLATES.iter().copied())?;

        Ok(Self {
            tera,
            website_name: website_name.into(),
        })
    }

    fn subject(&self, job: &MailJob) -> String {
        match job {
            MailJob::Activation { .. } => {
                format!("Your {} activation link", self.website_name)
            }
            MailJob::PasswordReset { .. } => {
                format!("Your {} reset password link", self.website_name)
            }
            MailJob::AgentAssignment { .. } => {
                "The owner of this property has asked you to take it into management as agent"
                    .to_string()
            }
            MailJob::AgentAccepted { agent_username, .. } => format!(
                "The agent {} has accepted your request to take this property into management",
                agent_username
            ),
            MailJob::AgentDeclined { agent_username, .. } => format!(
                "The agent {} has declined your request to take this property into management",
                agent_username
            ),
        }
    }

    pub fn render(&self, job: &MailJob) -> MailerResult<RenderedMail> {
        let mut context = Context::from_serialize(job)?;
        context.insert("website_name", &self.website_name);

        Ok(RenderedMail {
            to: job.recipient().to_string(),
            subject: self.subject(job),
            body: self.tera.render(job.kind(), &context)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn templates() -> MailTemplates {
        MailTemplates::new("Housing").unwrap()
    }

    #[test]
    fn test_every_job_kind_has_a_template() {
        let binding = templates();
        let names: Vec<&str> = binding.tera.get_template_names().collect();
        for (kind, _) in TEMPLATES {
            assert!(names.contains(kind));
        }
    }

    #[test]
    fn test_activation_mail() {
        let mail = templates()
            .render(&MailJob::Activation {
                username: "test_user".to_string(),
                email: "testuser@something.com".to_string(),
                activation_link: "http://localhost/api/v1/auth/activate/?token=abc".to_string(),
                code: "a1b2c3".to_string(),
            })
            .unwrap();

        assert_eq!(mail.to, "testuser@something.com");
        assert_eq!(mail.subject, "Your Housing activation link");
        assert!(mail.body.starts_with("Hello test_user,"));
        assert!(
            mail.body
                .contains("http://localhost/api/v1/auth/activate/?token=abc")
        );
        assert!(mail.body.contains("a1b2c3"));
    }

    #[test]
    fn test_links_are_not_escaped() {
        let mail = templates()
            .render(&MailJob::PasswordReset {
                username: "test_user".to_string(),
                email: "testuser@something.com".to_string(),
                reset_link: "http://localhost/reset/?token=a&b".to_string(),
            })
            .unwrap();

        assert_eq!(mail.subject, "Your Housing reset password link");
        assert!(mail.body.contains("http://localhost/reset/?token=a&b"));
    }

    #[test]
    fn test_agent_mails() {
        let templates = templates();

        let request = templates
            .render(&MailJob::AgentAssignment {
                agent_username: "agent".to_string(),
                agent_email: "agent@example.com".to_string(),
                owner_username: "owner".to_string(),
                property_title: "Sunny flat".to_string(),
                confirm_link: "http://localhost/confirm".to_string(),
            })
            .unwrap();
        assert_eq!(request.to, "agent@example.com");
        assert!(request.body.contains("owner has asked you"));
        assert!(request.body.contains("\"Sunny flat\""));

        let declined = templates
            .render(&MailJob::AgentDeclined {
                owner_username: "owner".to_string(),
                owner_email: "owner@example.com".to_string(),
                agent_username: "agent".to_string(),
                property_title: "Sunny flat".to_string(),
            })
            .unwrap();
        assert_eq!(declined.to, "owner@example.com");
        assert_eq!(
            declined.subject,
            "The agent agent has declined your request to take this property into management"
        );
    }
}
