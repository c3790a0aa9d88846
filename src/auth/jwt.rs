use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use crate::auth::{AuthConfig, AuthError, AuthResult};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AccessTokenClaims {
    pub sub: String,
    pub iss: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
    pub nbf: i64,
    pub jti: String,
    pub email: String,
    pub role: String,
}

#[derive(Debug, Clone)]
pub struct SignedAccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    audience: String,
    access_token_ttl: Duration,
    kid: Option<String>,
}

impl JwtService {
    pub fn from_config(config: &AuthConfig) -> AuthResult<Self> {
        let secret = config
            .jwt_secret
            .as_deref()
            .ok_or_else(|| AuthError::Config("JWT secret is not configured".into()))?;
        let secret_bytes = secret.as_bytes();
        let encoding_key = EncodingKey::from_secret(secret_bytes);
        let decoding_key = DecodingKey::from_secret(secret_bytes);

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[config.audience.clone()]);
        validation.set_issuer(&[config.issuer.clone()]);
        validation.validate_nbf = true;
        validation.leeway = 30;

        Ok(Self {
            encoding_key,
            decoding_key,
            validation,
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            access_token_ttl: Duration::seconds(config.access_token_ttl_secs),
            kid: config.jwt_kid.clone(),
        })
    }

    pub fn issue_access_token(
        &self,
        user_id: i32,
        email: &str,
        role: &str,
    ) -> AuthResult<SignedAccessToken> {
        let now = Utc::now();
        let expires_at = now + self.access_token_ttl;
        let jti = Uuid::new_v4().to_string();

        let mut header = Header::new(Algorithm::HS256);
        header.kid = self.kid.clone();

        let claims = AccessTokenClaims {
            sub: user_id.to_string(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            jti,
            email: email.to_string(),
            role: role.to_string(),
        };

        let token = encode(&header, &claims, &self.encoding_key)?;

        Ok(SignedAccessToken { token, expires_at })
    }

    /// Decode and validate a bearer token. Verification failures map to
    /// the caller-facing token errors rather than surfacing library
    /// details.
    pub fn decode_access_token(&self, token: &str) -> AuthResult<AccessTokenClaims> {
        match decode::<AccessTokenClaims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => Ok(data.claims),
            Err(err) => match err.kind() {
                ErrorKind::ExpiredSignature => Err(AuthError::TokenExpired),
                _ => Err(AuthError::TokenInvalid),
            },
        }
    }

    pub fn access_token_ttl_secs(&self) -> i64 {
        self.access_token_ttl.num_seconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::config::VerifierBackend;
    use crate::auth::AuthConfig;

    fn make_test_config(secret: &str) -> AuthConfig {
        AuthConfig {
            issuer: "https://rollcall.test".into(),
            audience: "rollcall-api".into(),
            access_token_ttl_secs: 3600,
            jwt_secret: Some(secret.into()),
            jwt_kid: Some("test-kid".into()),
            backend: VerifierBackend::Local,
            provider_project_id: None,
            provider_jwks_url: String::new(),
        }
    }

    #[test]
    fn issues_and_decodes_access_tokens() {
        let config = make_test_config("super-secret-test-key");
        let service = JwtService::from_config(&config).expect("jwt service");

        let token = service
            .issue_access_token(7, "teacher@example.com", "teacher")
            .expect("issue token");

        let claims = service
            .decode_access_token(&token.token)
            .expect("decode token");

        assert_eq!(claims.sub, "7");
        assert_eq!(claims.email, "teacher@example.com");
        assert_eq!(claims.role, "teacher");
        assert!(claims.exp > claims.iat);
        assert_eq!(claims.nbf, claims.iat);
    }

    #[test]
    fn rejects_tokens_signed_with_another_secret() {
        let service = JwtService::from_config(&make_test_config("secret-a")).expect("jwt service");
        let other = JwtService::from_config(&make_test_config("secret-b")).expect("jwt service");

        let token = other
            .issue_access_token(1, "student@example.com", "student")
            .expect("issue token");

        match service.decode_access_token(&token.token) {
            Err(AuthError::TokenInvalid) => {}
            other => panic!("expected TokenInvalid, got {other:?}"),
        }
    }
}
