//! Authentication module: configuration, credential handling, token
//! minting/verification, Rocket request guards, and HTTP route handlers.
//!
//! Two verification backends exist. The default mints and verifies HS256
//! access tokens locally; the alternative delegates bearer-token
//! verification to an external identity provider and disables the local
//! signup/login routes.

use std::sync::Arc;

pub mod config;
pub mod error;
pub mod guards;
pub mod jwt;
pub mod passwords;
pub mod provider;
pub mod responses;
pub mod routes;

pub use config::{AuthConfig, VerifierBackend};
pub use error::{AuthError, AuthResult};
pub use guards::{AuthUser, RequireAdmin, RequireTeacher};
pub use jwt::JwtService;
pub use passwords::PasswordService;
pub use provider::IdentityProvider;
pub use responses::Role;

/// Token verification strategy selected at startup.
pub enum TokenVerifier {
    /// Verify HS256 tokens minted by this server.
    Local(JwtService),
    /// Delegate verification to the external identity provider.
    Provider(IdentityProvider),
}

#[derive(Clone)]
pub struct AuthState {
    pub config: AuthConfig,
    pub password_service: Arc<PasswordService>,
    pub verifier: Arc<TokenVerifier>,
}

impl AuthState {
    pub fn new(
        config: AuthConfig,
        password_service: PasswordService,
        verifier: TokenVerifier,
    ) -> Self {
        Self {
            config,
            password_service: Arc::new(password_service),
            verifier: Arc::new(verifier),
        }
    }

    /// Build the full auth state from environment configuration.
    pub fn from_env() -> AuthResult<Self> {
        let config = AuthConfig::from_env()?;
        let password_service = PasswordService::new()?;
        let verifier = match config.backend {
            VerifierBackend::Local => TokenVerifier::Local(JwtService::from_config(&config)?),
            VerifierBackend::Firebase => {
                TokenVerifier::Provider(IdentityProvider::from_config(&config)?)
            }
        };
        Ok(Self::new(config, password_service, verifier))
    }

    /// The local JWT service, or an error when tokens are provider-managed.
    pub fn jwt_service(&self) -> AuthResult<&JwtService> {
        match self.verifier.as_ref() {
            TokenVerifier::Local(service) => Ok(service),
            TokenVerifier::Provider(_) => Err(AuthError::ProviderManaged),
        }
    }
}
