//! Principals
//!
//! A principal is the account a verified identity resolves to. The core only needs
//! its identifier and identity; richer profile data belongs to the application.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    id::{generate_prefixed_id, validate_prefixed_id},
};

/// A unique, stable identifier for a principal
/// This value should be treated as opaque
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrincipalId(String);

impl PrincipalId {
    pub fn new(id: &str) -> Self {
        PrincipalId(id.to_string())
    }

    pub fn new_random() -> Result<Self, Error> {
        Ok(PrincipalId(generate_prefixed_id("prn")?))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    /// Validate that this ID has the correct format for a principal ID
    pub fn is_valid(&self) -> bool {
        validate_prefixed_id(&self.0, "prn")
    }
}

impl From<String> for PrincipalId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    pub identity: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_principal_id_random_is_valid() {
        let id = PrincipalId::new_random().unwrap();
        assert!(id.is_valid());
        assert!(!PrincipalId::new("usr_abc").is_valid());
    }
}
