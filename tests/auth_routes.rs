use rocket::http::{ContentType, Header, Status};
use rocket::routes;
use rollcall_server::auth::responses::{MeResponse, Role, TokenResponse};
use rollcall_server::auth::routes::{login, me, signup};
use rollcall_server::test_support::{
    TestDatabase, TestDatabaseError, TestRocketBuilder, test_auth_state,
};
use serde_json::json;

#[tokio::test]
async fn signup_login_and_me_flow() {
    let test_db = match TestDatabase::new_from_env().await {
        Ok(db) => db,
        Err(TestDatabaseError::MissingUrl) => {
            eprintln!("skipping auth integration test: TEST_DATABASE_URL not set");
            return;
        }
        Err(err) => panic!("failed to provision test database: {err:?}"),
    };

    let pool = test_db.pool_clone();

    let client = TestRocketBuilder::new()
        .manage_pg_pool(pool.clone())
        .manage_auth_state(test_auth_state("integration-test-secret"))
        .mount_api_routes(routes![signup, login, me])
        .async_client()
        .await;

    // Signup normalizes the email and returns a usable token.
    let mut response = client
        .post("/api/v1/auth/signup")
        .header(ContentType::JSON)
        .body(
            json!({
                "email": "Teacher@Example.com",
                "name": "Pat Jones",
                "password": "correct-horse-battery",
                "role": "teacher"
            })
            .to_string(),
        )
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Created);

    let signup_payload: TokenResponse = response
        .into_json()
        .await
        .expect("signup payload deserializes");
    assert_eq!(signup_payload.user.email, "teacher@example.com");
    assert_eq!(signup_payload.user.role, Role::Teacher);

    // A second signup with the same email (any casing) conflicts.
    response = client
        .post("/api/v1/auth/signup")
        .header(ContentType::JSON)
        .body(
            json!({
                "email": "teacher@example.com",
                "password": "another-password",
                "role": "student"
            })
            .to_string(),
        )
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Conflict);

    // Wrong password is a uniform 401.
    response = client
        .post("/api/v1/auth/login")
        .header(ContentType::JSON)
        .body(json!({"email": "teacher@example.com", "password": "nope"}).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Unauthorized);

    // Unknown email is indistinguishable from a wrong password.
    response = client
        .post("/api/v1/auth/login")
        .header(ContentType::JSON)
        .body(json!({"email": "ghost@example.com", "password": "whatever"}).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Unauthorized);

    // Correct credentials log in and the token authenticates /auth/me.
    response = client
        .post("/api/v1/auth/login")
        .header(ContentType::JSON)
        .body(
            json!({"email": "Teacher@Example.com", "password": "correct-horse-battery"})
                .to_string(),
        )
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let login_payload: TokenResponse = response
        .into_json()
        .await
        .expect("login payload deserializes");

    response = client
        .get("/api/v1/auth/me")
        .header(Header::new(
            "Authorization",
            format!("Bearer {}", login_payload.access_token),
        ))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let me_payload: MeResponse = response.into_json().await.expect("me payload deserializes");
    assert_eq!(me_payload.user.email, "teacher@example.com");
    assert_eq!(me_payload.user.name.as_deref(), Some("Pat Jones"));

    // Garbage tokens are rejected.
    response = client
        .get("/api/v1/auth/me")
        .header(Header::new("Authorization", "Bearer not-a-token"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Unauthorized);

    drop(response);
    drop(client);

    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn signup_rejects_bad_payloads() {
    let test_db = match TestDatabase::new_from_env().await {
        Ok(db) => db,
        Err(TestDatabaseError::MissingUrl) => {
            eprintln!("skipping auth validation test: TEST_DATABASE_URL not set");
            return;
        }
        Err(err) => panic!("failed to provision test database: {err:?}"),
    };

    let pool = test_db.pool_clone();

    let client = TestRocketBuilder::new()
        .manage_pg_pool(pool.clone())
        .manage_auth_state(test_auth_state("integration-test-secret"))
        .mount_api_routes(routes![signup])
        .async_client()
        .await;

    for (body, reason) in [
        (
            json!({"email": "not-an-email", "password": "long-enough-pw", "role": "student"}),
            "malformed email",
        ),
        (
            json!({"email": "kid@example.com", "password": "short", "role": "student"}),
            "short password",
        ),
        (
            json!({"email": "boss@example.com", "password": "long-enough-pw", "role": "admin"}),
            "self-assigned admin role",
        ),
    ] {
        let response = client
            .post("/api/v1/auth/signup")
            .header(ContentType::JSON)
            .body(body.to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest, "expected 400 for {reason}");
    }

    drop(client);

    test_db.close().await.expect("failed to drop test database");
}
