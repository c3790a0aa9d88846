use std::ops::DerefMut;
use std::sync::OnceLock;

use regex::Regex;
use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::{State, get, post};
use rocket_db_pools::sqlx::{self, Row};
use rocket_okapi::okapi::schemars::JsonSchema;
use rocket_okapi::openapi;

use crate::auth::guards::{AuthUser, RequireAdmin};
use crate::auth::responses::{
    LoginRequest, MeResponse, Role, SignupRequest, TokenResponse, UserSummary,
};
use crate::auth::{AuthError, AuthState};

type AuthRouteResult<T> = Result<status::Custom<Json<T>>, status::Custom<Json<AuthErrorResponse>>>;

#[derive(Debug, serde::Serialize, serde::Deserialize, JsonSchema)]
pub struct AuthErrorResponse {
    pub status: u16,
    pub message: String,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, JsonSchema)]
pub struct PingResponse {
    pub message: String,
}

const MIN_PASSWORD_LEN: usize = 8;

fn email_regex() -> &'static Regex {
    static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
    EMAIL_RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"))
}

/// Create an account and return a signed access token.
///
/// Only `student` and `teacher` roles can be self-assigned; admins are
/// provisioned with the `create_user` binary. Responds 403 when account
/// management is delegated to the identity provider.
#[openapi(tag = "Auth")]
#[post("/auth/signup", data = "<payload>")]
pub async fn signup(
    state: &State<AuthState>,
    pool: &State<sqlx::PgPool>,
    payload: Json<SignupRequest>,
) -> AuthRouteResult<TokenResponse> {
    let jwt_service = state.jwt_service().map_err(respond_error)?;

    let email = payload.email.trim().to_lowercase();
    if !email_regex().is_match(&email) {
        return Err(respond_message(
            Status::BadRequest,
            "A valid email address is required",
        ));
    }

    if payload.password.len() < MIN_PASSWORD_LEN {
        return Err(respond_message(
            Status::BadRequest,
            "Password must be at least 8 characters",
        ));
    }

    if payload.role == Role::Admin {
        return Err(respond_message(
            Status::BadRequest,
            "Role must be one of: student, teacher",
        ));
    }

    let name = payload
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty());

    let password_hash = state
        .password_service
        .hash_password(&payload.password)
        .map_err(respond_error)?;

    let mut tx = pool
        .begin()
        .await
        .map_err(|err| respond_error(AuthError::from(err)))?;

    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE lower(email) = $1")
        .bind(&email)
        .fetch_one(tx.deref_mut())
        .await
        .map_err(|err| respond_error(AuthError::from(err)))?;

    if existing > 0 {
        return Err(respond_error(AuthError::EmailTaken));
    }

    let user_id: i32 = sqlx::query_scalar(
        "INSERT INTO users (email, name, role, password_hash) VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(&email)
    .bind(name)
    .bind(payload.role.as_str())
    .bind(&password_hash)
    .fetch_one(tx.deref_mut())
    .await
    .map_err(|err| respond_error(AuthError::from(err)))?;

    tx.commit()
        .await
        .map_err(|err| respond_error(AuthError::from(err)))?;

    let access_token = jwt_service
        .issue_access_token(user_id, &email, payload.role.as_str())
        .map_err(respond_error)?;

    let response = TokenResponse {
        access_token: access_token.token,
        expires_at: access_token.expires_at,
        user: UserSummary {
            id: user_id,
            email,
            name: name.map(|value| value.to_string()),
            role: payload.role,
        },
    };

    Ok(status::Custom(Status::Created, Json(response)))
}

/// Authenticate with email and password, returning a signed access token.
#[openapi(tag = "Auth")]
#[post("/auth/login", data = "<payload>")]
pub async fn login(
    state: &State<AuthState>,
    pool: &State<sqlx::PgPool>,
    payload: Json<LoginRequest>,
) -> AuthRouteResult<TokenResponse> {
    let jwt_service = state.jwt_service().map_err(respond_error)?;

    let email = payload.email.trim().to_lowercase();
    if email.is_empty() || payload.password.is_empty() {
        return Err(respond_message(
            Status::BadRequest,
            "Email and password are required",
        ));
    }

    let row = sqlx::query(
        "SELECT id, email, name, role, password_hash FROM users WHERE lower(email) = $1",
    )
    .bind(&email)
    .fetch_optional(pool.inner())
    .await
    .map_err(|err| respond_error(AuthError::from(err)))?;

    let row = match row {
        Some(row) => row,
        None => return Err(invalid_credentials()),
    };

    let user_id: i32 = row
        .try_get("id")
        .map_err(|err| respond_error(AuthError::from(err)))?;
    let db_email: String = row
        .try_get("email")
        .map_err(|err| respond_error(AuthError::from(err)))?;
    let name: Option<String> = row
        .try_get("name")
        .map_err(|err| respond_error(AuthError::from(err)))?;
    let role_str: String = row
        .try_get("role")
        .map_err(|err| respond_error(AuthError::from(err)))?;
    let password_hash: Option<String> = row
        .try_get("password_hash")
        .map_err(|err| respond_error(AuthError::from(err)))?;

    // Provider-managed rows have no local credential.
    let password_hash = match password_hash {
        Some(hash) => hash,
        None => return Err(invalid_credentials()),
    };

    let verified = state
        .password_service
        .verify_password(&payload.password, &password_hash)
        .map_err(respond_error)?;

    if !verified {
        return Err(invalid_credentials());
    }

    let role = Role::from_str(&role_str);
    let access_token = jwt_service
        .issue_access_token(user_id, &db_email, role.as_str())
        .map_err(respond_error)?;

    let response = TokenResponse {
        access_token: access_token.token,
        expires_at: access_token.expires_at,
        user: UserSummary {
            id: user_id,
            email: db_email,
            name,
            role,
        },
    };

    Ok(status::Custom(Status::Ok, Json(response)))
}

/// Return the authenticated caller's profile.
#[openapi(tag = "Auth")]
#[get("/auth/me")]
pub async fn me(user: AuthUser) -> Json<MeResponse> {
    Json(MeResponse {
        user: UserSummary {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
        },
    })
}

/// Role-check probe restricted to admins.
#[openapi(tag = "Auth")]
#[get("/auth/admin/ping")]
pub async fn admin_ping(_admin: RequireAdmin) -> Json<PingResponse> {
    Json(PingResponse {
        message: "admin pong".to_string(),
    })
}

fn respond_error(err: AuthError) -> status::Custom<Json<AuthErrorResponse>> {
    let status = err.status();
    status::Custom(
        status,
        Json(AuthErrorResponse {
            status: status.code,
            message: err.to_string(),
        }),
    )
}

fn respond_message(
    status: Status,
    message: impl Into<String>,
) -> status::Custom<Json<AuthErrorResponse>> {
    status::Custom(
        status,
        Json(AuthErrorResponse {
            status: status.code,
            message: message.into(),
        }),
    )
}

fn invalid_credentials() -> status::Custom<Json<AuthErrorResponse>> {
    respond_error(AuthError::InvalidCredentials)
}
