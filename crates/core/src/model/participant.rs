use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

static SSO_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{9}$").expect("sso pattern should compile"));

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@([A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,})$")
        .expect("email pattern should compile")
});

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum IdentityError {
    #[error("SSO must be exactly 9 digits")]
    InvalidSso,

    #[error("name cannot be empty")]
    EmptyName,

    #[error("email address is not valid")]
    InvalidEmail,

    #[error("email must be an address at {expected}")]
    EmailDomainNotAllowed { expected: String },

    #[error("location cannot be empty")]
    EmptyLocation,
}

//
// ─── VALUE TYPES ───────────────────────────────────────────────────────────────
//

/// Participant identifier: exactly nine ASCII digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Sso(String);

impl Sso {
    /// # Errors
    ///
    /// Returns `IdentityError::InvalidSso` unless the trimmed value is nine digits.
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, IdentityError> {
        let trimmed = raw.as_ref().trim();
        if !SSO_PATTERN.is_match(trimmed) {
            return Err(IdentityError::InvalidSso);
        }
        Ok(Self(trimmed.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sso {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Site a quiz is run for. Questions and open/closed status are scoped per location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Location(String);

impl Location {
    /// # Errors
    ///
    /// Returns `IdentityError::EmptyLocation` for blank input.
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, IdentityError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(IdentityError::EmptyLocation);
        }
        Ok(Self(trimmed.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

//
// ─── REGISTRATION ──────────────────────────────────────────────────────────────
//

/// Rules applied to registration input before anything is sent to the server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationPolicy {
    email_domain: Option<String>,
}

impl RegistrationPolicy {
    /// Accept any syntactically valid email address.
    #[must_use]
    pub fn open() -> Self {
        Self::default()
    }

    /// Only accept addresses at `domain` (compared case-insensitively).
    #[must_use]
    pub fn with_email_domain(mut self, domain: impl Into<String>) -> Self {
        let domain = domain.into();
        let domain = domain.trim().trim_start_matches('@');
        self.email_domain = (!domain.is_empty()).then(|| domain.to_ascii_lowercase());
        self
    }

    /// Build a policy from `QUIZ_EMAIL_DOMAIN`, open when unset or blank.
    #[must_use]
    pub fn from_env() -> Self {
        match std::env::var("QUIZ_EMAIL_DOMAIN") {
            Ok(domain) => Self::open().with_email_domain(domain),
            Err(_) => Self::open(),
        }
    }

    #[must_use]
    pub fn email_domain(&self) -> Option<&str> {
        self.email_domain.as_deref()
    }

    fn check_email(&self, email: &str) -> Result<(), IdentityError> {
        let captures = EMAIL_PATTERN
            .captures(email)
            .ok_or(IdentityError::InvalidEmail)?;
        if let Some(expected) = &self.email_domain {
            let domain = captures.get(1).map_or("", |m| m.as_str());
            if !domain.eq_ignore_ascii_case(expected) {
                return Err(IdentityError::EmailDomainNotAllowed {
                    expected: expected.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Raw registration form input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParticipantDraft {
    pub sso: String,
    pub name: String,
    pub email: String,
    pub location: String,
}

impl ParticipantDraft {
    /// Validate and trim the form input.
    ///
    /// # Errors
    ///
    /// Returns the first `IdentityError` found, checking sso, name, email, then location.
    pub fn validate(self, policy: &RegistrationPolicy) -> Result<Participant, IdentityError> {
        let sso = Sso::parse(&self.sso)?;
        let name = self.name.trim();
        if name.is_empty() {
            return Err(IdentityError::EmptyName);
        }
        let email = self.email.trim();
        policy.check_email(email)?;
        let location = Location::parse(&self.location)?;

        Ok(Participant {
            sso,
            name: name.to_owned(),
            email: email.to_owned(),
            location,
        })
    }
}

/// Registered participant identity. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Participant {
    sso: Sso,
    name: String,
    email: String,
    location: Location,
}

impl Participant {
    #[must_use]
    pub fn sso(&self) -> &Sso {
        &self.sso
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[must_use]
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Same person, assigned to another location.
    ///
    /// Used when the server resumes an attempt at the location it has on record.
    #[must_use]
    pub fn relocated(self, location: Location) -> Self {
        Self { location, ..self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> ParticipantDraft {
        ParticipantDraft {
            sso: " 123456789 ".into(),
            name: " Ada Lovelace ".into(),
            email: "ada@example.com".into(),
            location: "Pune".into(),
        }
    }

    #[test]
    fn valid_draft_is_trimmed() {
        let participant = draft().validate(&RegistrationPolicy::open()).unwrap();
        assert_eq!(participant.sso().as_str(), "123456789");
        assert_eq!(participant.name(), "Ada Lovelace");
        assert_eq!(participant.location().as_str(), "Pune");
    }

    #[test]
    fn sso_must_be_nine_digits() {
        for raw in ["12345678", "1234567890", "12345678a", ""] {
            assert_eq!(Sso::parse(raw), Err(IdentityError::InvalidSso), "{raw}");
        }
    }

    #[test]
    fn empty_fields_are_rejected() {
        let policy = RegistrationPolicy::open();

        let mut no_name = draft();
        no_name.name = "   ".into();
        assert_eq!(no_name.validate(&policy), Err(IdentityError::EmptyName));

        let mut no_location = draft();
        no_location.location = String::new();
        assert_eq!(
            no_location.validate(&policy),
            Err(IdentityError::EmptyLocation)
        );

        let mut bad_email = draft();
        bad_email.email = "ada.example.com".into();
        assert_eq!(bad_email.validate(&policy), Err(IdentityError::InvalidEmail));
    }

    #[test]
    fn pinned_email_domain_is_enforced() {
        let policy = RegistrationPolicy::open().with_email_domain("@Example.com");
        assert_eq!(policy.email_domain(), Some("example.com"));
        assert!(draft().validate(&policy).is_ok());

        let mut other = draft();
        other.email = "ada@elsewhere.org".into();
        assert_eq!(
            other.validate(&policy),
            Err(IdentityError::EmailDomainNotAllowed {
                expected: "example.com".into()
            })
        );
    }

    #[test]
    fn relocated_keeps_identity() {
        let participant = draft().validate(&RegistrationPolicy::open()).unwrap();
        let moved = participant
            .clone()
            .relocated(Location::parse("Bengaluru").unwrap());
        assert_eq!(moved.sso(), participant.sso());
        assert_eq!(moved.location().as_str(), "Bengaluru");
    }
}
