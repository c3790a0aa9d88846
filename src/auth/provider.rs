//! Identity provider delegation.
//!
//! Instead of minting tokens locally, deployments may accept ID tokens
//! issued by an external provider (Firebase Authentication). Tokens are
//! RS256 JWTs; the signing keys are published as a JWK set which is
//! fetched over HTTPS and cached by key id.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use parking_lot::Mutex;
use serde::Deserialize;

use crate::auth::responses::Role;
use crate::auth::{AuthConfig, AuthError, AuthResult};

const KEY_REFRESH_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// One RSA public key from the provider's JWK set.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderKey {
    pub kid: String,
    /// Base64url-encoded modulus.
    pub n: String,
    /// Base64url-encoded public exponent.
    pub e: String,
}

#[derive(Debug, Deserialize)]
struct JwkSet {
    keys: Vec<ProviderKey>,
}

#[derive(Debug, Deserialize)]
struct ProviderClaims {
    sub: String,
    email: Option<String>,
    role: Option<String>,
}

/// A verified identity as asserted by the provider.
#[derive(Debug, Clone)]
pub struct ProviderIdentity {
    pub subject: String,
    pub email: String,
    pub role: Role,
}

pub struct IdentityProvider {
    http: reqwest::Client,
    jwks_url: String,
    keys: DashMap<String, ProviderKey>,
    last_refresh: Mutex<Option<Instant>>,
    validation: Validation,
}

impl IdentityProvider {
    pub fn from_config(config: &AuthConfig) -> AuthResult<Self> {
        let project_id = config.provider_project_id.as_deref().ok_or_else(|| {
            AuthError::Config("identity provider project id is not configured".into())
        })?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[project_id.to_string()]);
        validation.set_issuer(&[format!("https://securetoken.google.com/{project_id}")]);
        validation.leeway = 30;

        Ok(Self {
            http: reqwest::Client::new(),
            jwks_url: config.provider_jwks_url.clone(),
            keys: DashMap::new(),
            last_refresh: Mutex::new(None),
            validation,
        })
    }

    /// Verify an ID token and map its claims to a provider identity.
    ///
    /// The JWK set is re-fetched when the token references an unknown
    /// key id or the cached set is older than [`KEY_REFRESH_INTERVAL`],
    /// which covers routine provider key rotation.
    pub async fn verify_id_token(&self, token: &str) -> AuthResult<ProviderIdentity> {
        let header = decode_header(token).map_err(|_| AuthError::TokenInvalid)?;
        let kid = header.kid.ok_or(AuthError::TokenInvalid)?;

        if self.needs_refresh(&kid) {
            self.refresh_keys().await?;
        }

        let decoding_key = {
            let key = self.keys.get(&kid).ok_or(AuthError::TokenInvalid)?;
            DecodingKey::from_rsa_components(&key.n, &key.e)
                .map_err(|err| AuthError::Provider(format!("unusable signing key: {err}")))?
        };

        let data = match decode::<ProviderClaims>(token, &decoding_key, &self.validation) {
            Ok(data) => data,
            Err(err) => {
                return Err(match err.kind() {
                    ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                    _ => AuthError::TokenInvalid,
                });
            }
        };

        identity_from_claims(data.claims)
    }

    fn needs_refresh(&self, kid: &str) -> bool {
        if !self.keys.contains_key(kid) {
            return true;
        }
        match *self.last_refresh.lock() {
            Some(at) => at.elapsed() > KEY_REFRESH_INTERVAL,
            None => true,
        }
    }

    async fn refresh_keys(&self) -> AuthResult<()> {
        let set: JwkSet = self
            .http
            .get(&self.jwks_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        self.install_keys(set);
        Ok(())
    }

    fn install_keys(&self, set: JwkSet) {
        self.keys.clear();
        for key in set.keys {
            self.keys.insert(key.kid.clone(), key);
        }
        *self.last_refresh.lock() = Some(Instant::now());
        log::debug!("installed {} provider signing keys", self.keys.len());
    }
}

fn identity_from_claims(claims: ProviderClaims) -> AuthResult<ProviderIdentity> {
    let email = claims
        .email
        .map(|email| email.trim().to_lowercase())
        .filter(|email| !email.is_empty())
        .ok_or_else(|| AuthError::Provider("ID token carries no email claim".into()))?;

    // Role comes from a custom claim; unrecognized or absent values fall
    // back to the least-privileged role.
    let role = claims
        .role
        .as_deref()
        .map(Role::from_str)
        .unwrap_or(Role::Student);

    Ok(ProviderIdentity {
        subject: claims.sub,
        email,
        role,
    })
}
