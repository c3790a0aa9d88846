use crate::auth::{AuthError, AuthResult};

/// Which backend verifies bearer tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifierBackend {
    /// HS256 tokens minted by this server.
    Local,
    /// RS256 ID tokens verified against the identity provider's JWKS.
    Firebase,
}

/// Authentication configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub issuer: String,
    pub audience: String,
    pub access_token_ttl_secs: i64,
    pub jwt_secret: Option<String>,
    pub jwt_kid: Option<String>,
    pub backend: VerifierBackend,
    pub provider_project_id: Option<String>,
    pub provider_jwks_url: String,
}

const DEFAULT_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

impl AuthConfig {
    pub fn from_env() -> AuthResult<Self> {
        let issuer =
            std::env::var("ROLLCALL_JWT_ISSUER").unwrap_or_else(|_| "http://localhost".into());
        let audience =
            std::env::var("ROLLCALL_JWT_AUDIENCE").unwrap_or_else(|_| "rollcall-api".into());
        let access_token_ttl_secs = std::env::var("ROLLCALL_ACCESS_TOKEN_TTL_SECS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(60 * 60);
        let jwt_secret = std::env::var("ROLLCALL_JWT_SECRET").ok();
        let jwt_kid = std::env::var("ROLLCALL_JWT_KID").ok();

        let backend = match std::env::var("ROLLCALL_AUTH_BACKEND") {
            Ok(value) => match value.trim().to_lowercase().as_str() {
                "local" | "" => VerifierBackend::Local,
                "firebase" => VerifierBackend::Firebase,
                other => {
                    return Err(AuthError::Config(format!(
                        "unsupported ROLLCALL_AUTH_BACKEND '{other}' (use 'local' or 'firebase')"
                    )));
                }
            },
            Err(_) => VerifierBackend::Local,
        };

        let provider_project_id = std::env::var("ROLLCALL_FIREBASE_PROJECT_ID").ok();
        let provider_jwks_url = std::env::var("ROLLCALL_FIREBASE_JWKS_URL")
            .unwrap_or_else(|_| DEFAULT_JWKS_URL.into());

        if backend == VerifierBackend::Local && jwt_secret.is_none() {
            return Err(AuthError::Config(
                "ROLLCALL_JWT_SECRET is required for the local auth backend".into(),
            ));
        }

        if backend == VerifierBackend::Firebase && provider_project_id.is_none() {
            return Err(AuthError::Config(
                "ROLLCALL_FIREBASE_PROJECT_ID is required for the firebase auth backend".into(),
            ));
        }

        Ok(Self {
            issuer,
            audience,
            access_token_ttl_secs,
            jwt_secret,
            jwt_kid,
            backend,
            provider_project_id,
            provider_jwks_url,
        })
    }
}
