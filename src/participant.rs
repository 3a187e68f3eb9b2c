use std::sync::OnceLock;

use regex::Regex;

use crate::errors::AppError;
use crate::models::ParticipantDetails;

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .unwrap_or_else(|e| panic!("invalid email regex: {}", e))
    })
}

/// Placeholder domains that show up in contact forms but never pay out.
const FAKE_EMAIL_DOMAINS: &[&str] = &["example.com", "example.org", "test.com", "mailinator.com"];

pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    if !email_regex().is_match(email) {
        return false;
    }
    let domain = match email.rsplit('@').next() {
        Some(domain) => domain.to_ascii_lowercase(),
        None => return false,
    };
    !FAKE_EMAIL_DOMAINS.contains(&domain.as_str())
}

/// Parses and validates a phone number against the configured default
/// region. International-format input overrides the region.
pub fn is_valid_phone(phone: &str, region: &str) -> bool {
    let region_id = region.parse::<phonenumber::country::Id>().ok();
    match phonenumber::parse(region_id, phone.trim()) {
        Ok(number) => phonenumber::is_valid(&number),
        Err(_) => false,
    }
}

/// Validates reward-claim contact details before registration. The phone
/// number is the payout channel and is mandatory; email is optional but
/// must be plausible when present.
pub fn validate_claim(details: &ParticipantDetails, region: &str) -> Result<(), AppError> {
    if details.full_name.trim().len() < 2 {
        return Err(AppError::Validation("Full name is required".to_string()));
    }
    if !is_valid_phone(&details.phone_number, region) {
        return Err(AppError::Validation(format!(
            "'{}' is not a valid phone number",
            details.phone_number
        )));
    }
    if let Some(email) = details.email.as_deref() {
        if !email.trim().is_empty() && !is_valid_email(email) {
            return Err(AppError::Validation(format!(
                "'{}' is not a valid email address",
                email
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_emails() {
        assert!(is_valid_email("amina.w@company.co.ke"));
        assert!(is_valid_email("user+tag@gmail.com"));
    }

    #[test]
    fn rejects_malformed_and_placeholder_emails() {
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("user@"));
        assert!(!is_valid_email("someone@example.com"));
        assert!(!is_valid_email("throwaway@mailinator.com"));
    }

    #[test]
    fn kenyan_numbers_parse_with_default_region() {
        assert!(is_valid_phone("0712345678", "KE"));
        assert!(is_valid_phone("+254712345678", "KE"));
        assert!(!is_valid_phone("12345", "KE"));
    }

    #[test]
    fn claim_requires_name_and_phone() {
        let mut details = ParticipantDetails {
            full_name: "Amina Wanjiru".to_string(),
            phone_number: "0712345678".to_string(),
            email: None,
        };
        assert!(validate_claim(&details, "KE").is_ok());

        details.full_name = " ".to_string();
        assert!(validate_claim(&details, "KE").is_err());

        details.full_name = "Amina Wanjiru".to_string();
        details.phone_number = "banana".to_string();
        assert!(validate_claim(&details, "KE").is_err());
    }

    #[test]
    fn optional_email_validated_when_present() {
        let details = ParticipantDetails {
            full_name: "Amina Wanjiru".to_string(),
            phone_number: "0712345678".to_string(),
            email: Some("nope".to_string()),
        };
        assert!(validate_claim(&details, "KE").is_err());
    }
}
