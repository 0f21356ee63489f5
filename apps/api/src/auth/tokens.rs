use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::errors::AppError;

/// Company password-reset tokens are short-lived.
const RESET_TOKEN_MINUTES: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    Refresh,
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    User,
    Company,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Account id as a decimal string.
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    pub token_type: TokenType,
    pub kind: AccountKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
}

/// HS256 signing keys plus token lifetimes.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
    reset_ttl: Duration,
}

impl JwtKeys {
    pub fn from_config(config: &Config) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.secret_key.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret_key.as_bytes()),
            access_ttl: Duration::minutes(config.access_token_minutes),
            refresh_ttl: Duration::days(config.refresh_token_days),
            reset_ttl: Duration::minutes(RESET_TOKEN_MINUTES),
        }
    }

    pub fn issue(
        &self,
        kind: AccountKind,
        account_id: i64,
        token_type: TokenType,
    ) -> Result<String, AppError> {
        let ttl = match token_type {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
            TokenType::Reset => self.reset_ttl,
        };
        let now = Utc::now();
        let claims = Claims {
            sub: account_id.to_string(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            token_type,
            kind,
        };
        self.sign(&claims)
    }

    pub fn issue_pair(&self, kind: AccountKind, account_id: i64) -> Result<TokenPair, AppError> {
        Ok(TokenPair {
            access_token: self.issue(kind, account_id, TokenType::Access)?,
            refresh_token: self.issue(kind, account_id, TokenType::Refresh)?,
            token_type: "bearer".to_string(),
        })
    }

    fn sign(&self, claims: &Claims) -> Result<String, AppError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Token signing failed: {e}")))
    }

    /// Checks signature, expiry and both kinds, returning the account id.
    pub fn verify(
        &self,
        token: &str,
        kind: AccountKind,
        token_type: TokenType,
    ) -> Result<i64, AppError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;
        let claims = data.claims;

        if claims.kind != kind || claims.token_type != token_type {
            return Err(AppError::Unauthorized(
                "Token is not valid for this operation".to_string(),
            ));
        }

        claims
            .sub
            .parse::<i64>()
            .map_err(|_| AppError::Unauthorized("Malformed token subject".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> JwtKeys {
        JwtKeys::from_config(&Config::for_tests())
    }

    #[test]
    fn test_issue_and_verify_round_trip() {
        let keys = keys();
        let token = keys.issue(AccountKind::User, 42, TokenType::Access).unwrap();
        let id = keys
            .verify(&token, AccountKind::User, TokenType::Access)
            .unwrap();
        assert_eq!(id, 42);
    }

    #[test]
    fn test_wrong_account_kind_is_unauthorized() {
        let keys = keys();
        let token = keys.issue(AccountKind::User, 7, TokenType::Access).unwrap();
        let err = keys
            .verify(&token, AccountKind::Company, TokenType::Access)
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn test_refresh_token_cannot_be_used_as_access() {
        let keys = keys();
        let pair = keys.issue_pair(AccountKind::Company, 3).unwrap();
        assert!(keys
            .verify(&pair.refresh_token, AccountKind::Company, TokenType::Access)
            .is_err());
        assert_eq!(
            keys.verify(&pair.refresh_token, AccountKind::Company, TokenType::Refresh)
                .unwrap(),
            3
        );
    }

    #[test]
    fn test_expired_token_rejected() {
        let keys = keys();
        let past = Utc::now() - Duration::minutes(10);
        let claims = Claims {
            sub: "1".to_string(),
            exp: past.timestamp(),
            iat: (past - Duration::minutes(60)).timestamp(),
            token_type: TokenType::Access,
            kind: AccountKind::User,
        };
        let token = keys.sign(&claims).unwrap();
        assert!(keys
            .verify(&token, AccountKind::User, TokenType::Access)
            .is_err());
    }

    #[test]
    fn test_token_signed_with_other_secret_rejected() {
        let mut config = Config::for_tests();
        config.secret_key = "another-secret".to_string();
        let foreign = JwtKeys::from_config(&config)
            .issue(AccountKind::User, 1, TokenType::Access)
            .unwrap();
        assert!(keys()
            .verify(&foreign, AccountKind::User, TokenType::Access)
            .is_err());
    }

    #[test]
    fn test_garbage_token_rejected() {
        let err = keys()
            .verify("not.a.token", AccountKind::User, TokenType::Access)
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }
}
