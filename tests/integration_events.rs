mod common;

use axum::http::StatusCode;
use axum::Router;
use common::{delete, get, send_json, setup_test_app};
use serde_json::{Value, json};
use sqlx::PgPool;

fn event_body(title: &str, capacity: Option<i32>) -> Value {
    json!({
        "title": title,
        "description": "Bring a chair",
        "category": "music",
        "location": "Riverside park",
        "starts_at": "2030-06-01T18:00:00Z",
        "ends_at": "2030-06-01T21:00:00Z",
        "capacity": capacity,
    })
}

async fn create_event(app: &Router, title: &str, capacity: Option<i32>) -> String {
    let response = send_json(app, "POST", "/api/events", event_body(title, capacity)).await;
    assert_eq!(response.status, StatusCode::CREATED);
    response.body["id"].as_str().unwrap().to_string()
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires Postgres"]
async fn test_create_and_get_event(pool: PgPool) {
    let (app, _cache) = setup_test_app(pool).await;
    let id = create_event(&app, "Open air concert", Some(100)).await;

    let response = get(&app, &format!("/api/events/{id}")).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["title"], "Open air concert");
    assert_eq!(response.body["registration_count"], 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires Postgres"]
async fn test_create_rejects_inverted_time_range(pool: PgPool) {
    let (app, _cache) = setup_test_app(pool).await;
    let mut body = event_body("Backwards", None);
    body["ends_at"] = json!("2030-06-01T17:00:00Z");

    let response = send_json(&app, "POST", "/api/events", body).await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires Postgres"]
async fn test_second_read_is_a_hit(pool: PgPool) {
    let (app, _cache) = setup_test_app(pool).await;
    create_event(&app, "Book swap", None).await;

    let first = get(&app, "/api/events?page=1&limit=10").await;
    assert_eq!(first.x_cache.as_deref(), Some("MISS"));

    let second = get(&app, "/api/events?limit=10&page=1").await;
    assert_eq!(second.x_cache.as_deref(), Some("HIT"));
    assert_eq!(second.body, first.body);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires Postgres"]
async fn test_update_invalidates_cached_detail(pool: PgPool) {
    let (app, _cache) = setup_test_app(pool).await;
    let id = create_event(&app, "Chess club", None).await;
    let uri = format!("/api/events/{id}");

    get(&app, &uri).await;
    assert_eq!(get(&app, &uri).await.x_cache.as_deref(), Some("HIT"));

    let updated = send_json(&app, "PUT", &uri, json!({"title": "Chess and go club"})).await;
    assert_eq!(updated.status, StatusCode::OK);

    let response = get(&app, &uri).await;
    assert_eq!(response.x_cache.as_deref(), Some("MISS"));
    assert_eq!(response.body["title"], "Chess and go club");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires Postgres"]
async fn test_create_invalidates_cached_list(pool: PgPool) {
    let (app, _cache) = setup_test_app(pool).await;
    create_event(&app, "First", None).await;

    let before = get(&app, "/api/events").await;
    assert_eq!(before.body["meta"]["total"], 1);

    create_event(&app, "Second", None).await;

    let after = get(&app, "/api/events").await;
    assert_eq!(after.x_cache.as_deref(), Some("MISS"));
    assert_eq!(after.body["meta"]["total"], 2);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires Postgres"]
async fn test_search_matches_text_and_category(pool: PgPool) {
    let (app, _cache) = setup_test_app(pool).await;
    create_event(&app, "Jazz in the park", None).await;
    create_event(&app, "Quiz night", None).await;

    let response = get(&app, "/api/events/search?q=JAZZ&category=music").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["meta"]["total"], 1);
    assert_eq!(response.body["data"][0]["title"], "Jazz in the park");

    let none = get(&app, "/api/events/search?q=100%25").await;
    assert_eq!(none.body["meta"]["total"], 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires Postgres"]
async fn test_delete_event(pool: PgPool) {
    let (app, _cache) = setup_test_app(pool).await;
    let id = create_event(&app, "Cancelled", None).await;
    let uri = format!("/api/events/{id}");

    assert_eq!(delete(&app, &uri).await.status, StatusCode::NO_CONTENT);
    assert_eq!(get(&app, &uri).await.status, StatusCode::NOT_FOUND);
    assert_eq!(delete(&app, &uri).await.status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires Postgres"]
async fn test_registration_is_idempotent(pool: PgPool) {
    let (app, _cache) = setup_test_app(pool).await;
    let id = create_event(&app, "Pottery workshop", Some(10)).await;
    let uri = format!("/api/events/{id}/registrations");

    let first = send_json(&app, "POST", &uri, json!({"name": "Ada", "email": "ada@example.org"})).await;
    assert_eq!(first.status, StatusCode::CREATED);

    let replay = send_json(&app, "POST", &uri, json!({"name": "Ada", "email": "ADA@example.org"})).await;
    assert_eq!(replay.status, StatusCode::OK);
    assert_eq!(replay.body["id"], first.body["id"]);

    let list = get(&app, &uri).await;
    assert_eq!(list.body.as_array().unwrap().len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires Postgres"]
async fn test_registration_list_is_never_cached(pool: PgPool) {
    let (app, _cache) = setup_test_app(pool).await;
    let id = create_event(&app, "Garden tour", None).await;
    let uri = format!("/api/events/{id}/registrations");
    send_json(&app, "POST", &uri, json!({"name": "Ada", "email": "ada@example.org"})).await;

    let first = get(&app, &uri).await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.x_cache.as_deref(), Some("MISS"));
    assert_eq!(first.cache_control.as_deref(), Some("private, no-store"));

    let second = get(&app, &uri).await;
    assert_eq!(second.x_cache.as_deref(), Some("MISS"));
    assert_eq!(second.body[0]["email"], "ada@example.org");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires Postgres"]
async fn test_registration_rejected_when_full(pool: PgPool) {
    let (app, _cache) = setup_test_app(pool).await;
    let id = create_event(&app, "Tiny dinner", Some(1)).await;
    let uri = format!("/api/events/{id}/registrations");

    let first = send_json(&app, "POST", &uri, json!({"name": "Ada", "email": "ada@example.org"})).await;
    assert_eq!(first.status, StatusCode::CREATED);

    let second = send_json(&app, "POST", &uri, json!({"name": "Bob", "email": "bob@example.org"})).await;
    assert_eq!(second.status, StatusCode::CONFLICT);

    let detail = get(&app, &format!("/api/events/{id}")).await;
    assert_eq!(detail.body["registration_count"], 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires Postgres"]
async fn test_registration_for_missing_event(pool: PgPool) {
    let (app, _cache) = setup_test_app(pool).await;
    let uri = "/api/events/00000000-0000-0000-0000-000000000000/registrations";

    let response = send_json(&app, "POST", uri, json!({"name": "Ada", "email": "ada@example.org"})).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(get(&app, uri).await.status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires Postgres"]
async fn test_health_ok(pool: PgPool) {
    let (app, _cache) = setup_test_app(pool).await;

    let response = get(&app, "/health").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
}
