use super::model::AuthenticatedUser;
use crate::core::error::AppError;
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use super::jwks::JwksClient;

/// Validates bearer tokens against the issuer's JWKS.
pub struct JwtValidator {
    jwks_client: Arc<JwksClient>,
    issuer: String,
    audience: String,
    leeway: u64,
}

/// Claims this service reads from an access token. Standard registered
/// claims (exp, nbf, iss, aud) are checked by the jsonwebtoken library.
#[derive(Debug, Clone, Deserialize)]
struct Claims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

impl JwtValidator {
    pub fn new(
        jwks_client: Arc<JwksClient>,
        issuer: String,
        audience: String,
        leeway: Duration,
    ) -> Self {
        Self {
            jwks_client,
            issuer,
            audience,
            leeway: leeway.as_secs(),
        }
    }

    pub async fn validate_token(&self, token: &str) -> Result<AuthenticatedUser, AppError> {
        // Decode header to get kid
        let header = decode_header(token).map_err(|e| AppError::Auth(e.to_string()))?;

        let kid = header
            .kid
            .ok_or_else(|| AppError::Auth("Missing kid in token header".to_string()))?;

        // Only RS256 tokens are accepted; reject before touching the JWKS
        if header.alg != Algorithm::RS256 {
            return Err(AppError::Auth(format!(
                "Unsupported algorithm: {:?}. Only RS256 is allowed",
                header.alg
            )));
        }

        let decoding_key = self
            .jwks_client
            .get_key(&kid)
            .await
            .map_err(|e| AppError::Auth(e.to_string()))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.leeway = self.leeway;
        validation.validate_nbf = true;

        let token_data = decode::<Claims>(token, &decoding_key, &validation)
            .map_err(|e| AppError::Auth(e.to_string()))?;

        let claims = token_data.claims;

        Ok(AuthenticatedUser {
            sub: claims.sub,
            email: claims.email,
            name: claims.name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    fn validator() -> JwtValidator {
        let jwks = Arc::new(JwksClient::new(
            "https://issuer.invalid/oidc",
            Duration::from_secs(60),
        ));
        JwtValidator::new(
            jwks,
            "https://issuer.invalid/oidc".to_string(),
            "sharebox".to_string(),
            Duration::from_secs(30),
        )
    }

    #[tokio::test]
    async fn token_without_kid_is_rejected() {
        // HS256 token with a default header: no kid, wrong algorithm
        let token = encode(
            &Header::default(),
            &json!({ "sub": "u1", "exp": 4102444800u64 }),
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        let err = validator().validate_token(&token).await.unwrap_err();
        assert!(matches!(err, AppError::Auth(ref msg) if msg.contains("kid")));
    }

    #[tokio::test]
    async fn garbage_token_is_rejected() {
        let err = validator()
            .validate_token("not-a-jwt")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Auth(_)));
    }
}
