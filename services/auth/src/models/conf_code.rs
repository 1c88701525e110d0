//! Confirmation code model

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use uuid::Uuid;

/// Codes expire together with the activation token
pub const CONF_CODE_LIFETIME_MINUTES: i64 = 60;

/// One-time code sent with the activation mail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfCode {
    pub id: Uuid,
    pub user_id: Uuid,
    pub code: String,
    pub created_at: DateTime<Utc>,
}

impl ConfCode {
    /// Six lowercase hex characters
    pub fn generate() -> String {
        let value: u32 = rand::thread_rng().gen_range(0..=0xff_ffff);
        format!("{:06x}", value)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now - self.created_at > Duration::minutes(CONF_CODE_LIFETIME_MINUTES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_code_is_six_lowercase_hex() {
        for _ in 0..100 {
            let code = ConfCode::generate();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
        }
    }

    #[test]
    fn test_expiry() {
        let now = Utc::now();
        let code = ConfCode {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            code: "a1b2c3".to_string(),
            created_at: now - Duration::minutes(59),
        };
        assert!(!code.is_expired_at(now));
        assert!(code.is_expired_at(now + Duration::minutes(2)));
    }
}
