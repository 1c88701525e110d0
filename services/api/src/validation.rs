//! Field checks shared by the listing payloads

use common::validation::{FieldErrors, REQUIRED};

pub const TEXT_MAX_LENGTH: usize = 255;

/// The value of a required field, recording an error when it is absent
pub fn required<T>(errors: &mut FieldErrors, field: &str, value: Option<T>) -> Option<T> {
    if value.is_none() {
        errors.add(field, REQUIRED);
    }
    value
}

/// Non-blank text no longer than `max`
pub fn required_text(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<String>,
    max: usize,
) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => {
            check_length(errors, field, &v, max);
            v
        }
        _ => {
            errors.add(field, REQUIRED);
            String::new()
        }
    }
}

pub fn check_length(errors: &mut FieldErrors, field: &str, value: &str, max: usize) {
    if value.chars().count() > max {
        errors.add(
            field,
            format!("Ensure this field has no more than {} characters.", max),
        );
    }
}

pub fn check_min(errors: &mut FieldErrors, field: &str, value: i64, min: i64) {
    if value < min {
        errors.add(
            field,
            format!("Ensure this value is greater than or equal to {}.", min),
        );
    }
}

pub fn check_range(errors: &mut FieldErrors, field: &str, value: f64, min: f64, max: f64) {
    if !(min..=max).contains(&value) {
        errors.add(
            field,
            format!("Ensure this value is between {} and {}.", min, max),
        );
    }
}

/// Re-key nested errors under `prefix`, e.g. `city` becomes `location.city`
pub fn nested(prefix: &str, errors: FieldErrors) -> FieldErrors {
    let mut out = FieldErrors::new();
    for (field, messages) in errors.into_iter() {
        for message in messages {
            out.add(&format!("{}.{}", prefix, field), message);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_text_rejects_blank() {
        let mut errors = FieldErrors::new();
        assert_eq!(required_text(&mut errors, "title", Some("  ".to_string()), 10), "");
        assert_eq!(errors.get("title").unwrap(), [REQUIRED]);
    }

    #[test]
    fn test_length_and_bounds() {
        let mut errors = FieldErrors::new();
        required_text(&mut errors, "city", Some("x".repeat(11)), 10);
        check_min(&mut errors, "bedrooms", -1, 0);
        check_range(&mut errors, "latitude", 91.0, -90.0, 90.0);

        assert_eq!(
            errors.get("city").unwrap(),
            ["Ensure this field has no more than 10 characters."]
        );
        assert_eq!(
            errors.get("bedrooms").unwrap(),
            ["Ensure this value is greater than or equal to 0."]
        );
        assert_eq!(
            errors.get("latitude").unwrap(),
            ["Ensure this value is between -90 and 90."]
        );
    }

    #[test]
    fn test_nested_prefixes_fields() {
        let errors = nested("location", FieldErrors::single("city", REQUIRED));
        assert_eq!(errors.get("location.city").unwrap(), [REQUIRED]);
    }
}
