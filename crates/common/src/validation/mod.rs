//! Custom field rules for request validation
//!
//! Each rule is usable as `#[validate(custom(function = "..."))]` with
//! the `validator` derive, and as a plain predicate.

use regex_lite::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;
use validator::ValidationError;

/// Extensions accepted for stored files
const ALLOWED_EXTENSIONS: &str = "pdf|jpg|png|doc|docx|xls|xlsx|zip|rar";

fn digits(value: &str) -> Option<Vec<u32>> {
    value.chars().map(|c| c.to_digit(10)).collect()
}

fn rule_error(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

/// Check a personal national identification number.
///
/// Accepts 8 to 10 digits, left-padded with zeros to 10. The last digit
/// is a mod-11 check over the first nine with weights 10 down to 2.
pub fn is_valid_national_code(value: &str) -> bool {
    let Some(raw) = digits(value) else {
        return false;
    };
    if !(8..=10).contains(&raw.len()) {
        return false;
    }

    let mut code = vec![0; 10 - raw.len()];
    code.extend(raw);

    if code.iter().all(|d| *d == code[0]) {
        return false;
    }

    let sum: u32 = code[..9]
        .iter()
        .enumerate()
        .map(|(i, d)| d * (10 - i as u32))
        .sum();
    let remainder = sum % 11;
    let control = if remainder < 2 { remainder } else { 11 - remainder };

    control == code[9]
}

fn file_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        let pattern = format!(
            r"(?i)^([a-z0-9_\-]+/)?[a-z0-9_\-]+\.({})$",
            ALLOWED_EXTENSIONS
        );
        Regex::new(&pattern).expect("static file name pattern")
    })
}

/// Check a stored file reference: at most one directory level, no
/// traversal sequences, and an allowed extension.
pub fn is_safe_file_name(value: &str) -> bool {
    const FORBIDDEN: [&str; 4] = ["..", "./", "\\", "//"];

    if FORBIDDEN.iter().any(|seq| value.contains(seq)) {
        return false;
    }

    file_name_pattern().is_match(value)
}

/// Validator rule for personal national codes
pub fn national_code(value: &str) -> Result<(), ValidationError> {
    if is_valid_national_code(value) {
        Ok(())
    } else {
        Err(rule_error("national_code", "The national code is not valid."))
    }
}

/// Validator rule for stored file references
pub fn safe_file_name(value: &str) -> Result<(), ValidationError> {
    if is_safe_file_name(value) {
        Ok(())
    } else {
        Err(rule_error("safe_file_name", "The file name is not allowed."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn test_national_code_checksum() {
        assert!(is_valid_national_code("0084575948"));
        assert!(is_valid_national_code("0499370899"));
        assert!(!is_valid_national_code("0084575947"));
    }

    #[test]
    fn test_national_code_short_input_is_padded() {
        assert!(is_valid_national_code("123456789"));
        assert!(!is_valid_national_code("1234567"));
        assert!(!is_valid_national_code("12345678901"));
    }

    #[test]
    fn test_national_code_rejects_repeated_digits() {
        assert!(!is_valid_national_code("1111111111"));
        assert!(!is_valid_national_code("0000000000"));
    }

    #[test]
    fn test_national_code_rejects_non_digits() {
        assert!(!is_valid_national_code("00845759a8"));
        assert!(!is_valid_national_code(""));
    }

    #[test]
    fn test_safe_file_name() {
        assert!(is_safe_file_name("papers/report_2024.pdf"));
        assert!(is_safe_file_name("cover-image.PNG"));
        assert!(!is_safe_file_name("../etc/passwd.pdf"));
        assert!(!is_safe_file_name("a/b/c.pdf"));
        assert!(!is_safe_file_name("papers//x.pdf"));
        assert!(!is_safe_file_name("papers\\x.pdf"));
        assert!(!is_safe_file_name("papers/run.exe"));
        assert!(!is_safe_file_name("my paper.pdf"));
    }

    #[derive(Validate)]
    struct PersonInput {
        #[validate(custom(function = "national_code"))]
        national_code: String,
        #[validate(custom(function = "safe_file_name"))]
        photo: Option<String>,
    }

    #[test]
    fn test_derive_integration() {
        let ok = PersonInput {
            national_code: "0084575948".into(),
            photo: Some("people/photo.jpg".into()),
        };
        assert!(ok.validate().is_ok());

        let bad = PersonInput {
            national_code: "0084575947".into(),
            photo: None,
        };
        let errors = bad.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("national_code"));
    }
}
