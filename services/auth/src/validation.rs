//! Input validation for account fields
//!
//! Every validator returns the full list of messages for its field so the
//! caller can report them together in a [`FieldErrors`] map.
//!
//! [`FieldErrors`]: common::validation::FieldErrors

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

pub use common::validation::REQUIRED;
pub const INVALID_EMAIL: &str = "Enter a valid email address.";

const EMAIL_MAX_LENGTH: usize = 254;
const USERNAME_MAX_LENGTH: usize = 30;
const PHONE_MAX_LENGTH: usize = 20;
const PASSWORD_MIN_LENGTH: usize = 8;
const MAX_SIMILARITY: f64 = 0.7;

const COMMON_PASSWORDS: &[&str] = &[
    "123456", "password", "12345678", "qwerty", "123456789", "12345", "1234", "111111",
    "1234567", "dragon", "123123", "baseball", "abc123", "football", "monkey", "letmein",
    "696969", "shadow", "master", "666666", "qwertyuiop", "123321", "mustang", "1234567890",
    "michael", "654321", "superman", "1qaz2wsx", "7777777", "121212", "000000", "qazwsx",
    "123qwe", "killer", "trustno1", "jordan", "jennifer", "zxcvbnm", "asdfgh", "hunter",
    "buster", "soccer", "harley", "batman", "andrew", "tigger", "sunshine", "iloveyou",
    "2000", "charlie", "robert", "thomas", "hockey", "ranger", "daniel", "starwars",
    "klaster", "112233", "george", "computer", "michelle", "jessica", "pepper", "1111",
    "zxcvbn", "555555", "11111111", "131313", "freedom", "777777", "pass", "maggie",
    "159753", "aaaaaa", "ginger", "princess", "joshua", "cheese", "amanda", "summer",
    "love", "ashley", "nicole", "chelsea", "biteme", "matthew", "access", "yankees",
    "987654321", "dallas", "austin", "thunder", "taylor", "matrix", "password1",
    "password123", "welcome", "admin", "qwerty123", "passw0rd",
];

fn length_error(max: usize) -> String {
    format!("Ensure this field has no more than {} characters.", max)
}

/// Validate email
pub fn validate_email(email: &str) -> Result<(), Vec<String>> {
    if email.is_empty() {
        return Err(vec![REQUIRED.to_string()]);
    }

    if email.chars().count() > EMAIL_MAX_LENGTH {
        return Err(vec![length_error(EMAIL_MAX_LENGTH)]);
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9-]+(\.[a-zA-Z0-9-]+)*\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(email) {
        return Err(vec![INVALID_EMAIL.to_string()]);
    }

    Ok(())
}

/// Validate username
pub fn validate_username(username: &str) -> Result<(), Vec<String>> {
    if username.is_empty() {
        return Err(vec![REQUIRED.to_string()]);
    }

    if username.chars().count() > USERNAME_MAX_LENGTH {
        return Err(vec![length_error(USERNAME_MAX_LENGTH)]);
    }

    if username.to_lowercase() == "me" {
        return Err(vec!["Invalid username".to_string()]);
    }

    static USERNAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex =
        USERNAME_REGEX.get_or_init(|| Regex::new(r"^\w+$").expect("Failed to compile username regex"));

    if !regex.is_match(username) {
        return Err(vec![
            "Username must contain only letters, numbers and underscores".to_string(),
        ]);
    }

    Ok(())
}

/// Validate phone number (length only)
pub fn validate_phone_number(phone_number: &str) -> Result<(), Vec<String>> {
    if phone_number.chars().count() > PHONE_MAX_LENGTH {
        return Err(vec![length_error(PHONE_MAX_LENGTH)]);
    }
    Ok(())
}

/// Account attributes a password must not resemble
#[derive(Debug, Default, Clone, Copy)]
pub struct UserAttributes<'a> {
    pub username: Option<&'a str>,
    pub email: Option<&'a str>,
    pub first_name: Option<&'a str>,
    pub last_name: Option<&'a str>,
}

/// Validate password
///
/// Applies the minimum length, similarity, common password and numeric
/// checks, reporting every failure.
pub fn validate_password(password: &str, attributes: UserAttributes<'_>) -> Result<(), Vec<String>> {
    if password.is_empty() {
        return Err(vec![REQUIRED.to_string()]);
    }

    let mut errors = Vec::new();

    if password.chars().count() < PASSWORD_MIN_LENGTH {
        errors.push(format!(
            "This password is too short. It must contain at least {} characters.",
            PASSWORD_MIN_LENGTH
        ));
    }

    let attributes = [
        ("username", attributes.username),
        ("email address", attributes.email),
        ("first name", attributes.first_name),
        ("last name", attributes.last_name),
    ];
    for (name, value) in attributes {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            if is_too_similar(password, value) {
                errors.push(format!("The password is too similar to the {}.", name));
                break;
            }
        }
    }

    let lowered = password.trim().to_lowercase();
    if COMMON_PASSWORDS.contains(&lowered.as_str()) {
        errors.push("This password is too common.".to_string());
    }

    if password.chars().all(|c| c.is_ascii_digit()) {
        errors.push("This password is entirely numeric.".to_string());
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// Compare the password with the attribute and each of its word-separated
/// parts using a character-multiset similarity ratio.
fn is_too_similar(password: &str, value: &str) -> bool {
    static SEPARATOR: OnceLock<Regex> = OnceLock::new();
    let separator =
        SEPARATOR.get_or_init(|| Regex::new(r"\W+").expect("Failed to compile separator regex"));

    let password = password.to_lowercase();
    let value = value.to_lowercase();
    let password_len = password.chars().count();

    separator
        .split(&value)
        .chain(std::iter::once(value.as_str()))
        .filter(|part| !part.is_empty())
        .any(|part| {
            let part_len = part.chars().count();
            // a short part inside a much longer password is never similar
            let length_bound = MAX_SIMILARITY / 2.0 * password_len as f64;
            if password_len >= 10 * part_len && (part_len as f64) < length_bound {
                return false;
            }
            quick_ratio(&password, part) >= MAX_SIMILARITY
        })
}

fn quick_ratio(a: &str, b: &str) -> f64 {
    let total = a.chars().count() + b.chars().count();
    if total == 0 {
        return 1.0;
    }

    let mut available: HashMap<char, usize> = HashMap::new();
    for c in b.chars() {
        *available.entry(c).or_default() += 1;
    }

    let mut matches = 0;
    for c in a.chars() {
        if let Some(count) = available.get_mut(&c) {
            if *count > 0 {
                *count -= 1;
                matches += 1;
            }
        }
    }

    2.0 * matches as f64 / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("testuser@something.com").is_ok());
        assert!(validate_email("first.last+tag@mail.example.org").is_ok());
        assert_eq!(validate_email("testuser").unwrap_err(), vec![INVALID_EMAIL]);
        assert_eq!(validate_email("").unwrap_err(), vec![REQUIRED]);

        let long = format!("{}@example.com", "a".repeat(250));
        assert_eq!(
            validate_email(&long).unwrap_err(),
            vec!["Ensure this field has no more than 254 characters."]
        );
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("test_user").is_ok());
        assert_eq!(validate_username("me").unwrap_err(), vec!["Invalid username"]);
        assert_eq!(validate_username("ME").unwrap_err(), vec!["Invalid username"]);
        assert_eq!(
            validate_username("|-|aTa|_|_|a").unwrap_err(),
            vec!["Username must contain only letters, numbers and underscores"]
        );
        assert!(validate_username(&"a".repeat(31)).is_err());
        assert!(validate_username(&"a".repeat(30)).is_ok());
    }

    #[test]
    fn test_short_password() {
        assert_eq!(
            validate_password("bad", UserAttributes::default()).unwrap_err(),
            vec!["This password is too short. It must contain at least 8 characters."]
        );
    }

    #[test]
    fn test_numeric_and_common_passwords() {
        let errors = validate_password("12345678", UserAttributes::default()).unwrap_err();
        assert!(errors.contains(&"This password is too common.".to_string()));
        assert!(errors.contains(&"This password is entirely numeric.".to_string()));

        let errors = validate_password("93715842", UserAttributes::default()).unwrap_err();
        assert_eq!(errors, vec!["This password is entirely numeric."]);
    }

    #[test]
    fn test_password_similar_to_username() {
        let attributes = UserAttributes {
            username: Some("johnsmith"),
            ..Default::default()
        };
        assert_eq!(
            validate_password("johnsmith1", attributes).unwrap_err(),
            vec!["The password is too similar to the username."]
        );
    }

    #[test]
    fn test_strong_password_passes() {
        let attributes = UserAttributes {
            username: Some("test_user"),
            email: Some("testuser@something.com"),
            ..Default::default()
        };
        assert!(validate_password("test!passwordQSC", attributes).is_ok());
    }

    #[test]
    fn test_quick_ratio() {
        assert_eq!(quick_ratio("abcd", "abcd"), 1.0);
        assert_eq!(quick_ratio("abcd", "wxyz"), 0.0);
        assert_eq!(quick_ratio("aab", "ab"), 0.8);
    }
}
