//! Candidate: a registered participant eligible for the draw.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a candidate. Opaque string (UUID for candidates registered here,
/// anything for candidates supplied by another backend).
pub type CandidateId = String;

/// A raffle participant. Never mutated by the draw, only cloned into working sets.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: CandidateId,
    pub email: String,
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Candidate {
    /// Create a candidate with a fresh UUID and both timestamps set to now.
    pub fn new(email: impl Into<String>, full_name: impl Into<String>, phone: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.into(),
            full_name: full_name.into(),
            phone,
            created_at: now,
            updated_at: now,
        }
    }

    /// Same as [`Candidate::new`] but with a caller-chosen id (fixtures, imported lists).
    pub fn with_id(id: impl Into<CandidateId>, email: impl Into<String>, full_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::new(email, full_name, None)
        }
    }

    /// First letter of the name, uppercased, for avatar bubbles.
    pub fn initial(&self) -> Option<char> {
        self.full_name.chars().next().map(|c| c.to_uppercase().next().unwrap_or(c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_participant_api_field_names() {
        let c = Candidate::with_id("C1", "ana@example.com", "Ana Pérez");
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["id"], "C1");
        assert_eq!(json["fullName"], "Ana Pérez");
        assert!(json.get("createdAt").is_some());
        assert!(json.get("phone").is_none());
    }

    #[test]
    fn initial_is_uppercased() {
        let c = Candidate::with_id("C1", "e@x.io", "élodie");
        assert_eq!(c.initial(), Some('É'));
    }
}
