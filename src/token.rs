// src/token.rs

use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Role;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    /// Hex ObjectId of the user.
    pub sub: String,
    pub role: String,
    pub iat: usize,
    pub exp: usize,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token encode error: {0}")]
    Encode(jsonwebtoken::errors::Error),

    #[error("token decode error: {0}")]
    Decode(jsonwebtoken::errors::Error),

    #[error("token subject is not a valid id")]
    BadSubject,

    #[error("token carries unknown role {0}")]
    BadRole(String),
}

/// Identity recovered from a verified token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub id: ObjectId,
    pub role: Role,
}

/// Issues and verifies HS256 bearer tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: StdDuration,
}

impl TokenService {
    pub fn new(secret: &str, ttl: StdDuration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn issue(&self, user_id: &ObjectId, role: Role) -> Result<String, TokenError> {
        let now = Utc::now();
        let ttl = Duration::from_std(self.ttl).unwrap_or_else(|_| Duration::days(7));
        let claims = Claims {
            sub: user_id.to_hex(),
            role: role.as_str().to_string(),
            iat: now.timestamp() as usize,
            exp: (now + ttl).timestamp() as usize,
        };
        self.encode(&claims)
    }

    pub fn encode(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::default(), claims, &self.encoding).map_err(TokenError::Encode)
    }

    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(TokenError::Decode)
    }

    /// Checks signature and expiry, then maps the claims onto a typed identity.
    pub fn verify(&self, token: &str) -> Result<Identity, TokenError> {
        let claims = self.decode(token)?;
        let id = ObjectId::parse_str(&claims.sub).map_err(|_| TokenError::BadSubject)?;
        let role = claims
            .role
            .parse::<Role>()
            .map_err(|_| TokenError::BadRole(claims.role.clone()))?;
        Ok(Identity { id, role })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new("test-secret", StdDuration::from_secs(7 * 24 * 3600))
    }

    #[test]
    fn issued_token_round_trips_identity() {
        let svc = service();
        let id = ObjectId::new();
        let token = svc.issue(&id, Role::TeamLeader).unwrap();
        let identity = svc.verify(&token).unwrap();
        assert_eq!(identity, Identity { id, role: Role::TeamLeader });
    }

    #[test]
    fn expired_token_is_rejected() {
        let svc = service();
        let past = (Utc::now() - Duration::hours(2)).timestamp() as usize;
        let token = svc
            .encode(&Claims {
                sub: ObjectId::new().to_hex(),
                role: "employee".into(),
                iat: past,
                exp: past,
            })
            .unwrap();
        assert!(matches!(svc.verify(&token), Err(TokenError::Decode(_))));
    }

    #[test]
    fn tampered_token_is_rejected() {
        let svc = service();
        let token = svc.issue(&ObjectId::new(), Role::Employee).unwrap();
        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        // Swap the payload for one claiming a different role.
        let other = svc.issue(&ObjectId::new(), Role::TeamLeader).unwrap();
        parts[1] = other.split('.').nth(1).unwrap().to_string();
        assert!(svc.verify(&parts.join(".")).is_err());
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let other = TokenService::new("another-secret", StdDuration::from_secs(60));
        let token = other.issue(&ObjectId::new(), Role::Employee).unwrap();
        assert!(service().verify(&token).is_err());
    }

    #[test]
    fn unknown_role_claim_is_rejected() {
        let svc = service();
        let exp = (Utc::now() + Duration::hours(1)).timestamp() as usize;
        let token = svc
            .encode(&Claims {
                sub: ObjectId::new().to_hex(),
                role: "admin".into(),
                iat: exp,
                exp,
            })
            .unwrap();
        assert!(matches!(svc.verify(&token), Err(TokenError::BadRole(_))));
    }
}
