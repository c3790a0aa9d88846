use rocket::http::{ContentType, Header, Status};
use rocket::routes;
use rollcall_server::events::{EventBroker, EventKind};
use rollcall_server::models::{ClassRoom, DataResponse, Enrollment, RosterEntry};
use rollcall_server::routes::classes::{
    add_class_member, create_class, list_class_members, list_classes,
};
use rollcall_server::test_support::{
    TestDatabase, TestDatabaseError, TestFixtures, TestRocketBuilder, test_auth_state,
};
use serde_json::json;
use std::time::Duration;
use tokio::time::timeout;

fn bearer(token: &str) -> Header<'static> {
    Header::new("Authorization", format!("Bearer {token}"))
}

#[tokio::test]
async fn teacher_creates_and_lists_classes() {
    let test_db = match TestDatabase::new_from_env().await {
        Ok(db) => db,
        Err(TestDatabaseError::MissingUrl) => {
            eprintln!("skipping classes integration test: TEST_DATABASE_URL not set");
            return;
        }
        Err(err) => panic!("failed to provision test database: {err:?}"),
    };

    let pool = test_db.pool_clone();
    let fixtures = TestFixtures::new(&pool);

    let teacher_id = fixtures
        .insert_user("teacher@example.com", Some("Pat"), "teacher", None)
        .await
        .expect("insert teacher");
    let other_teacher_id = fixtures
        .insert_user("other@example.com", Some("Sam"), "teacher", None)
        .await
        .expect("insert other teacher");

    let auth_state = test_auth_state("integration-test-secret");
    let token = auth_state
        .jwt_service()
        .expect("local jwt service")
        .issue_access_token(teacher_id, "teacher@example.com", "teacher")
        .expect("issue token")
        .token;

    let broker = EventBroker::new();
    let mut subscription = broker.subscribe();

    let client = TestRocketBuilder::new()
        .manage_pg_pool(pool.clone())
        .manage_auth_state(auth_state)
        .manage_event_broker(broker)
        .mount_api_routes(routes![create_class, list_classes])
        .async_client()
        .await;

    let response = client
        .post("/api/v1/classes")
        .header(ContentType::JSON)
        .header(bearer(&token))
        .body(json!({"name": "Algebra I"}).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Created);

    let created: ClassRoom = response.into_json().await.expect("class deserializes");
    assert_eq!(created.name, "Algebra I");
    assert_eq!(created.teacher_id, teacher_id);

    // The creation was announced on the broker.
    let event = timeout(Duration::from_secs(5), subscription.recv())
        .await
        .expect("event within deadline")
        .expect("class_created event");
    assert_eq!(event.kind, EventKind::ClassCreated);
    assert_eq!(event.payload["name"], "Algebra I");

    // Listing defaults to the caller's classes.
    let response = client
        .get("/api/v1/classes")
        .header(bearer(&token))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let listed: DataResponse<Vec<ClassRoom>> =
        response.into_json().await.expect("list deserializes");
    assert_eq!(listed.data.len(), 1);
    assert_eq!(listed.data[0].id, created.id);

    // Another teacher's listing is empty.
    let response = client
        .get(format!("/api/v1/classes?teacher_id={other_teacher_id}"))
        .header(bearer(&token))
        .dispatch()
        .await;
    let listed: DataResponse<Vec<ClassRoom>> =
        response.into_json().await.expect("list deserializes");
    assert!(listed.data.is_empty());

    drop(client);

    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn roster_management_and_permissions() {
    let test_db = match TestDatabase::new_from_env().await {
        Ok(db) => db,
        Err(TestDatabaseError::MissingUrl) => {
            eprintln!("skipping roster integration test: TEST_DATABASE_URL not set");
            return;
        }
        Err(err) => panic!("failed to provision test database: {err:?}"),
    };

    let pool = test_db.pool_clone();
    let fixtures = TestFixtures::new(&pool);

    let teacher_id = fixtures
        .insert_user("teacher@example.com", Some("Pat"), "teacher", None)
        .await
        .expect("insert teacher");
    let student_id = fixtures
        .insert_user("student@example.com", Some("Alex"), "student", None)
        .await
        .expect("insert student");
    let class_id = fixtures
        .insert_class("Biology", teacher_id)
        .await
        .expect("insert class");

    let auth_state = test_auth_state("integration-test-secret");
    let jwt_service = auth_state.jwt_service().expect("local jwt service");
    let teacher_token = jwt_service
        .issue_access_token(teacher_id, "teacher@example.com", "teacher")
        .expect("issue token")
        .token;
    let student_token = jwt_service
        .issue_access_token(student_id, "student@example.com", "student")
        .expect("issue token")
        .token;

    let client = TestRocketBuilder::new()
        .manage_pg_pool(pool.clone())
        .manage_auth_state(auth_state)
        .manage_event_broker(EventBroker::new())
        .mount_api_routes(routes![create_class, add_class_member, list_class_members])
        .async_client()
        .await;

    // Students cannot create classes.
    let mut response = client
        .post("/api/v1/classes")
        .header(ContentType::JSON)
        .header(bearer(&student_token))
        .body(json!({"name": "Shadow School"}).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Forbidden);

    // Enroll the student; the second attempt is an idempotent no-op.
    let body = json!({"user_id": student_id}).to_string();
    response = client
        .post(format!("/api/v1/classes/{class_id}/members"))
        .header(ContentType::JSON)
        .header(bearer(&teacher_token))
        .body(body.clone())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Created);
    let enrollment: Enrollment = response.into_json().await.expect("enrollment deserializes");
    assert!(!enrollment.already_enrolled);

    response = client
        .post(format!("/api/v1/classes/{class_id}/members"))
        .header(ContentType::JSON)
        .header(bearer(&teacher_token))
        .body(body)
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Created);
    let enrollment: Enrollment = response.into_json().await.expect("enrollment deserializes");
    assert!(enrollment.already_enrolled);

    // Roster shows the enrolled student.
    response = client
        .get(format!("/api/v1/classes/{class_id}/members"))
        .header(bearer(&teacher_token))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let roster: DataResponse<Vec<RosterEntry>> =
        response.into_json().await.expect("roster deserializes");
    assert_eq!(roster.data.len(), 1);
    assert_eq!(roster.data[0].user_id, student_id);
    assert_eq!(roster.data[0].email, "student@example.com");

    // Unknown class is a 404.
    response = client
        .post("/api/v1/classes/999999/members")
        .header(ContentType::JSON)
        .header(bearer(&teacher_token))
        .body(json!({"user_id": student_id}).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NotFound);

    // Unknown student is a 404.
    response = client
        .post(format!("/api/v1/classes/{class_id}/members"))
        .header(ContentType::JSON)
        .header(bearer(&teacher_token))
        .body(json!({"user_id": 999999}).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NotFound);

    drop(response);
    drop(client);

    test_db.close().await.expect("failed to drop test database");
}
