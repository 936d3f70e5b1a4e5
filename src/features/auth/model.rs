use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::shared::constants::UNKNOWN_UPLOADER;

/// Identity resolved from a validated bearer token.
///
/// File queries need both `sub` and `email`: ownership is keyed on `sub`
/// while the shared-with predicate matches on `email`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    pub sub: String,
    /// Email claim; may be absent for machine tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Display name claim
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl AuthenticatedUser {
    /// Display identity recorded on uploaded files.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(UNKNOWN_UPLOADER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_falls_back_to_unknown() {
        let user = AuthenticatedUser {
            sub: "u1".to_string(),
            email: Some("u1@example.com".to_string()),
            name: None,
        };
        assert_eq!(user.display_name(), "Unknown");

        let blank = AuthenticatedUser {
            name: Some(String::new()),
            ..user.clone()
        };
        assert_eq!(blank.display_name(), "Unknown");
    }

    #[test]
    fn display_name_uses_name_claim() {
        let user = AuthenticatedUser {
            sub: "u1".to_string(),
            email: None,
            name: Some("Ada Lovelace".to_string()),
        };
        assert_eq!(user.display_name(), "Ada Lovelace");
    }
}
