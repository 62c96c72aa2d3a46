use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config;
use crate::filters::FilterInput;

/// Signed session claims as issued by the login flow
///
/// Opaque to everything except the permission resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sga_filter: Option<FilterInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sgm_filter: Option<FilterInput>,
    pub exp: i64,
    pub iat: i64,
}

impl SessionClaims {
    pub fn new(email: impl Into<String>, role: impl Into<String>) -> Self {
        let now = Utc::now();
        let expiry_hours = config::config().security.jwt_expiry_hours;
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            email: email.into(),
            role: role.into(),
            sga_filter: None,
            sgm_filter: None,
            exp,
            iat: now.timestamp(),
        }
    }

    pub fn with_sga_filter(mut self, filter: Option<FilterInput>) -> Self {
        self.sga_filter = filter;
        self
    }

    pub fn with_sgm_filter(mut self, filter: Option<FilterInput>) -> Self {
        self.sgm_filter = filter;
        self
    }
}

#[derive(Debug)]
pub enum JwtError {
    TokenGeneration(String),
    InvalidToken(String),
    InvalidSecret,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::TokenGeneration(msg) => write!(f, "JWT generation error: {}", msg),
            JwtError::InvalidToken(msg) => write!(f, "Invalid JWT token: {}", msg),
            JwtError::InvalidSecret => write!(f, "Invalid JWT secret"),
        }
    }
}

impl std::error::Error for JwtError {}

pub fn generate_jwt(claims: &SessionClaims, secret: &str) -> Result<String, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    let header = Header::default();

    encode(&header, claims, &encoding_key).map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

/// Verify the signature and expiry of a session token
pub fn decode_jwt(token: &str, secret: &str) -> Result<SessionClaims, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::default();

    decode::<SessionClaims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| JwtError::InvalidToken(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trips_scope_claims() {
        let claims = SessionClaims::new("rep@example.com", "sga")
            .with_sga_filter(Some(FilterInput::Many(vec!["west".into(), "north".into()])));
        let token = generate_jwt(&claims, "secret").unwrap();

        let decoded = decode_jwt(&token, "secret").unwrap();
        assert_eq!(decoded, claims);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = generate_jwt(&SessionClaims::new("a@example.com", "admin"), "secret").unwrap();
        assert!(matches!(decode_jwt(&token, "other"), Err(JwtError::InvalidToken(_))));
    }

    #[test]
    fn empty_secret_is_refused() {
        let claims = SessionClaims::new("a@example.com", "admin");
        assert!(matches!(generate_jwt(&claims, ""), Err(JwtError::InvalidSecret)));
    }

    #[test]
    fn claims_use_camel_case_scope_fields() {
        let json = serde_json::json!({
            "email": "m@example.com",
            "role": "sgm",
            "sgmFilter": "Jane Doe",
            "exp": 0,
            "iat": 0
        });
        let claims: SessionClaims = serde_json::from_value(json).unwrap();
        assert_eq!(claims.sgm_filter, Some(FilterInput::One("Jane Doe".into())));
        assert_eq!(claims.sga_filter, None);
    }
}
