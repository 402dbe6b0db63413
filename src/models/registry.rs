//! Participant registration: validation rules and the in-memory registry of candidates.

use crate::models::candidate::{Candidate, CandidateId};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

const EMAIL_MIN_LEN: usize = 5;
const EMAIL_MAX_LEN: usize = 254;
const NAME_MIN_LEN: usize = 2;
const NAME_MAX_LEN: usize = 100;

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"#,
    )
    .expect("email pattern is valid")
});

static NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-ZÀ-ÿñÑ\s'.-]+$").expect("name pattern is valid"));

/// At least one letter somewhere in the name.
static NAME_LETTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[a-zA-ZÀ-ÿñÑ]").expect("letter pattern is valid"));

/// Digits only, after separators were stripped; optional leading `+`.
static PHONE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9]{9,15}$").expect("phone pattern is valid"));

/// Why a registration was refused.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum RegistrationError {
    #[error("{0} is required")]
    RequiredField(&'static str),
    #[error("Please enter a valid email")]
    InvalidEmail,
    #[error("The email must be between 5 and 254 characters")]
    EmailLength,
    #[error("The email cannot contain consecutive dots")]
    ConsecutiveDots,
    #[error("The email cannot start or end with a dot")]
    EdgeDot,
    #[error("The name must be between 2 and 100 characters")]
    NameLength,
    #[error("Please enter your first and last name")]
    IncompleteName,
    #[error("The name contains invalid characters")]
    InvalidName,
    #[error("The name must contain at least one letter")]
    NameWithoutLetters,
    #[error("Please enter a valid phone number")]
    InvalidPhone,
    #[error("This email is already registered for the raffle")]
    DuplicateEmail,
}

/// Registration form as posted by a visitor.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub email: String,
    pub full_name: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl Registration {
    /// Trim everything, lowercase the email, and drop a blank phone.
    pub fn sanitized(&self) -> Self {
        Self {
            email: self.email.trim().to_lowercase(),
            full_name: self.full_name.split_whitespace().collect::<Vec<_>>().join(" "),
            phone: self
                .phone
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string),
        }
    }

    /// Check the (already sanitized) fields against the registration rules.
    pub fn validate(&self) -> Result<(), RegistrationError> {
        if self.email.is_empty() {
            return Err(RegistrationError::RequiredField("Email"));
        }
        if !(EMAIL_MIN_LEN..=EMAIL_MAX_LEN).contains(&self.email.len()) {
            return Err(RegistrationError::EmailLength);
        }
        if !EMAIL_PATTERN.is_match(&self.email) {
            return Err(RegistrationError::InvalidEmail);
        }
        if self.email.contains("..") {
            return Err(RegistrationError::ConsecutiveDots);
        }
        if self.email.starts_with('.') || self.email.ends_with('.') {
            return Err(RegistrationError::EdgeDot);
        }

        if self.full_name.is_empty() {
            return Err(RegistrationError::RequiredField("Full name"));
        }
        let name_len = self.full_name.chars().count();
        if !(NAME_MIN_LEN..=NAME_MAX_LEN).contains(&name_len) {
            return Err(RegistrationError::NameLength);
        }
        if self.full_name.split_whitespace().count() < 2 {
            return Err(RegistrationError::IncompleteName);
        }
        if !NAME_PATTERN.is_match(&self.full_name) {
            return Err(RegistrationError::InvalidName);
        }
        if !NAME_LETTER.is_match(&self.full_name) {
            return Err(RegistrationError::NameWithoutLetters);
        }

        if let Some(phone) = &self.phone {
            let digits: String = phone
                .chars()
                .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
                .collect();
            if !PHONE_PATTERN.is_match(&digits) {
                return Err(RegistrationError::InvalidPhone);
            }
        }
        Ok(())
    }
}

/// Registered candidates in sign-up order. Emails are unique (case-insensitive).
#[derive(Clone, Debug, Default)]
pub struct Registry {
    candidates: Vec<Candidate>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sanitize, validate and store a registration. Returns the stored candidate.
    pub fn register(&mut self, registration: &Registration) -> Result<&Candidate, RegistrationError> {
        let reg = registration.sanitized();
        reg.validate()?;
        let is_duplicate = self
            .candidates
            .iter()
            .any(|c| c.email.eq_ignore_ascii_case(&reg.email));
        if is_duplicate {
            return Err(RegistrationError::DuplicateEmail);
        }
        self.candidates
            .push(Candidate::new(reg.email, reg.full_name, reg.phone));
        log::info!("Registered participant #{}", self.candidates.len());
        Ok(&self.candidates[self.candidates.len() - 1])
    }

    /// All candidates, oldest first. This is the draw input.
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn get(&self, id: &CandidateId) -> Option<&Candidate> {
        self.candidates.iter().find(|c| &c.id == id)
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reg(email: &str, name: &str, phone: Option<&str>) -> Registration {
        Registration {
            email: email.into(),
            full_name: name.into(),
            phone: phone.map(Into::into),
        }
    }

    #[test]
    fn sanitizes_before_validating() {
        let r = reg("  Ana@Example.COM ", "  Ana   María ", Some("   ")).sanitized();
        assert_eq!(r.email, "ana@example.com");
        assert_eq!(r.full_name, "Ana María");
        assert_eq!(r.phone, None);
        assert_eq!(r.validate(), Ok(()));
    }

    #[test]
    fn rejects_bad_fields() {
        let cases = [
            (reg("", "Ana Díaz", None), RegistrationError::RequiredField("Email")),
            (reg("a@b", "Ana Díaz", None), RegistrationError::EmailLength),
            (reg("not-an-email", "Ana Díaz", None), RegistrationError::InvalidEmail),
            (reg("ana@example.com", "A", None), RegistrationError::NameLength),
            (reg("ana@example.com", "Ana 3000", None), RegistrationError::InvalidName),
            (reg("ana@example.com", "Ana Díaz", Some("12345")), RegistrationError::InvalidPhone),
        ];
        for (r, want) in cases {
            assert_eq!(r.sanitized().validate(), Err(want));
        }
    }

    #[test]
    fn accepts_formatted_phone_numbers() {
        let r = reg("ana@example.com", "Ana Díaz", Some("+51 (999) 888-777"));
        assert_eq!(r.sanitized().validate(), Ok(()));
    }

    #[test]
    fn first_and_last_name_are_required() {
        let r = reg("ana@example.com", "Ana", None).sanitized();
        assert_eq!(r.validate(), Err(RegistrationError::IncompleteName));
        let r = reg("ana@example.com", "  Ana   ", None).sanitized();
        assert_eq!(r.validate(), Err(RegistrationError::IncompleteName));
    }

    #[test]
    fn name_needs_a_letter() {
        let r = reg("ana@example.com", "-- ''", None).sanitized();
        assert_eq!(r.validate(), Err(RegistrationError::NameWithoutLetters));
        let mut registry = Registry::new();
        assert!(registry.register(&reg("ana@example.com", "--", None)).is_err());
    }

    #[test]
    fn email_dots_must_separate_parts() {
        assert_eq!(
            reg("a..b@example.com", "Ana Díaz", None).sanitized().validate(),
            Err(RegistrationError::ConsecutiveDots)
        );
        assert_eq!(
            reg(".c@example.com", "Ana Díaz", None).sanitized().validate(),
            Err(RegistrationError::EdgeDot)
        );
        let mut registry = Registry::new();
        assert!(registry.register(&reg("a..b@example.com", "Ana Díaz", None)).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn registered_candidates_can_be_looked_up_by_id() {
        let mut registry = Registry::new();
        let id = registry
            .register(&reg("ana@example.com", "Ana Díaz", None))
            .unwrap()
            .id
            .clone();
        let found = registry.get(&id).expect("stored candidate");
        assert_eq!(found.full_name, "Ana Díaz");
        assert!(registry.get(&"missing".to_string()).is_none());
    }

    #[test]
    fn duplicate_email_is_refused() {
        let mut registry = Registry::new();
        registry.register(&reg("ana@example.com", "Ana Díaz", None)).unwrap();
        let err = registry
            .register(&reg("ANA@example.com", "Ana Torres", None))
            .unwrap_err();
        assert_eq!(err, RegistrationError::DuplicateEmail);
        assert_eq!(registry.len(), 1);
    }
}
