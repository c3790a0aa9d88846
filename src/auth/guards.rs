use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use rocket::{Request, State};
use rocket_db_pools::sqlx::{self, Row};
use rocket_okapi::request::OpenApiFromRequest;

use crate::auth::responses::Role;
use crate::auth::{AuthError, AuthResult, AuthState, TokenVerifier};

/// The authenticated caller, resolved from the bearer token and the
/// current `users` row. The row's role wins over whatever the token
/// claims, so role changes take effect without re-issuing tokens.
#[derive(Debug, Clone, OpenApiFromRequest)]
pub struct AuthUser {
    pub id: i32,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }

    /// Teachers and admins may manage classes and attendance.
    pub fn can_manage(&self) -> bool {
        matches!(self.role, Role::Admin | Role::Teacher)
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthUser {
    type Error = AuthError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match extract_user(request).await {
            Ok(user) => Outcome::Success(user),
            Err(err) => Outcome::Error((err.status(), err)),
        }
    }
}

/// Guard admitting teachers and admins.
#[derive(Debug, Clone, OpenApiFromRequest)]
pub struct RequireTeacher(pub AuthUser);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for RequireTeacher {
    type Error = AuthError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match AuthUser::from_request(request).await {
            Outcome::Success(user) => {
                if user.can_manage() {
                    Outcome::Success(RequireTeacher(user))
                } else {
                    Outcome::Error((Status::Forbidden, AuthError::Forbidden))
                }
            }
            Outcome::Error(err) => Outcome::Error(err),
            Outcome::Forward(_) => Outcome::Error((Status::Unauthorized, AuthError::Unauthorized)),
        }
    }
}

/// Guard admitting admins only.
#[derive(Debug, Clone, OpenApiFromRequest)]
pub struct RequireAdmin(pub AuthUser);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for RequireAdmin {
    type Error = AuthError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match AuthUser::from_request(request).await {
            Outcome::Success(user) => {
                if user.is_admin() {
                    Outcome::Success(RequireAdmin(user))
                } else {
                    Outcome::Error((Status::Forbidden, AuthError::Forbidden))
                }
            }
            Outcome::Error(err) => Outcome::Error(err),
            Outcome::Forward(_) => Outcome::Error((Status::Unauthorized, AuthError::Unauthorized)),
        }
    }
}

async fn extract_user(request: &Request<'_>) -> AuthResult<AuthUser> {
    let token = bearer_token_from_request(request)?;

    let auth_state = request
        .guard::<&State<AuthState>>()
        .await
        .succeeded()
        .ok_or_else(|| AuthError::Config("AuthState missing from state".into()))?;

    let pool = request
        .guard::<&State<sqlx::PgPool>>()
        .await
        .succeeded()
        .ok_or_else(|| AuthError::Config("database pool missing from state".into()))?;

    match auth_state.verifier.as_ref() {
        TokenVerifier::Local(jwt_service) => {
            let claims = jwt_service.decode_access_token(token)?;
            let user_id: i32 = claims.sub.parse().map_err(|_| AuthError::Unauthorized)?;

            let row = sqlx::query("SELECT id, email, name, role FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(pool.inner())
                .await?;

            row_to_user(row.ok_or(AuthError::Unauthorized)?)
        }
        TokenVerifier::Provider(provider) => {
            let identity = provider.verify_id_token(token).await?;

            // Provider identities map onto provisioned user rows by email.
            let row = sqlx::query("SELECT id, email, name, role FROM users WHERE lower(email) = $1")
                .bind(&identity.email)
                .fetch_optional(pool.inner())
                .await?;

            row_to_user(row.ok_or(AuthError::Unauthorized)?)
        }
    }
}

fn row_to_user(row: sqlx::postgres::PgRow) -> AuthResult<AuthUser> {
    let id: i32 = row.try_get("id")?;
    let email: String = row.try_get("email")?;
    let name: Option<String> = row.try_get("name")?;
    let role_str: String = row.try_get("role")?;

    Ok(AuthUser {
        id,
        email,
        name,
        role: Role::from_str(&role_str),
    })
}

fn bearer_token_from_request<'a>(request: &'a Request<'_>) -> AuthResult<&'a str> {
    let header = request
        .headers()
        .get_one("Authorization")
        .ok_or(AuthError::Unauthorized)?;
    let mut parts = header.splitn(2, ' ');
    let scheme = parts.next().unwrap_or_default();
    let token = parts.next().unwrap_or_default();
    if scheme.eq_ignore_ascii_case("Bearer") && !token.is_empty() {
        Ok(token)
    } else {
        Err(AuthError::Unauthorized)
    }
}
