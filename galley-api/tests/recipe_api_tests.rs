//! HTTP-level tests for the recipe routes over in-memory gateways.


use axum::http::{Method, StatusCode};
use galley_test_utils::fixtures::{soup_draft, tea_draft};
use serde_json::json;
use test_support::{create, create_draft, list, names, send, test_app, uncached_app};
use uuid::Uuid;

#[tokio::test]
async fn create_returns_record_and_lists_it() {
    let app = test_app();

    let created = create_draft(&app.router, &tea_draft()).await;

    let id = created["id"].as_str().unwrap();
    assert!(Uuid::parse_str(id).is_ok());
    assert!(created["publishedAt"].is_string());
    assert_eq!(created["tags"], json!(["drink", "hot"]));
    assert_eq!(created["ingredients"], json!(["water", "tea leaves"]));

    let all = list(&app.router).await;
    assert_eq!(all, vec![created]);
}

#[tokio::test]
async fn repeated_listing_is_served_from_cache() {
    let app = test_app();
    create(&app.router, json!({ "name": "Tea" })).await;

    let first = list(&app.router).await;
    let second = list(&app.router).await;

    assert_eq!(first, second);
    assert_eq!(app.store_list_queries(), 1);
    assert_eq!(app.cache.get_calls(), 2);
}

#[tokio::test]
async fn write_after_cached_listing_is_visible() {
    let app = test_app();
    create(&app.router, json!({ "name": "A" })).await;
    assert_eq!(names(&list(&app.router).await), vec!["A"]);

    create(&app.router, json!({ "name": "B" })).await;

    assert_eq!(names(&list(&app.router).await), vec!["A", "B"]);
}

#[tokio::test]
async fn update_replaces_cached_name() {
    let app = test_app();
    let created = create(&app.router, json!({ "name": "Tea", "tags": ["hot"] })).await;
    let uri = format!("/recipes/{}", created["id"].as_str().unwrap());
    list(&app.router).await;

    let (status, body) = send(
        &app.router,
        Method::PUT,
        &uri,
        Some(r#"{"name":"Green tea","tags":["hot","green"]}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "Recipe has been updated" }));

    let all = list(&app.router).await;
    assert_eq!(names(&all), vec!["Green tea"]);
    assert_eq!(all[0]["id"], created["id"]);
    assert_eq!(all[0]["publishedAt"], created["publishedAt"]);
    assert_eq!(all[0]["tags"], json!(["hot", "green"]));
}

#[tokio::test]
async fn update_ignores_id_in_body() {
    let app = test_app();
    let created = create(&app.router, json!({ "name": "Tea" })).await;
    let uri = format!("/recipes/{}", created["id"].as_str().unwrap());
    let other = Uuid::now_v7().to_string();

    let body = json!({ "id": other, "name": "Chai" }).to_string();
    let (status, _) = send(&app.router, Method::PUT, &uri, Some(&body)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, fetched) = send(&app.router, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], created["id"]);
    assert_eq!(fetched["name"], "Chai");
}

#[tokio::test]
async fn cache_read_failure_is_a_server_error() {
    let app = test_app();
    create(&app.router, json!({ "name": "Tea" })).await;
    app.cache.fail_gets(true);

    let (status, body) = send(&app.router, Method::GET, "/recipes", None).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "CACHE_UNAVAILABLE");
    assert_eq!(app.store_list_queries(), 0);
}

#[tokio::test]
async fn cache_write_failures_do_not_fail_requests() {
    let app = test_app();
    app.cache.fail_sets(true);
    app.cache.fail_deletes(true);

    create(&app.router, json!({ "name": "Tea" })).await;
    let all = list(&app.router).await;

    assert_eq!(names(&all), vec!["Tea"]);
    assert!(app.cache.set_calls() >= 1);
    assert!(app.cache.delete_calls() >= 1);
}

#[tokio::test]
async fn store_failure_is_internal_error() {
    let app = test_app();
    app.store.set_down(true);

    let (status, body) = send(&app.router, Method::GET, "/recipes", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "DATABASE_ERROR");

    let (status, _) = send(&app.router, Method::POST, "/recipes", Some(r#"{"name":"Tea"}"#)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn invalid_bodies_are_bad_requests() {
    let app = test_app();

    let (status, body) = send(&app.router, Method::POST, "/recipes", Some(r#"{"name":"   "}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "MISSING_FIELD");

    let (status, body) = send(&app.router, Method::POST, "/recipes", Some(r#"{"tags":["x"]}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_INPUT");

    let (status, _) = send(&app.router, Method::POST, "/recipes", Some("{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(list(&app.router).await.is_empty());
}

#[tokio::test]
async fn malformed_id_is_bad_request() {
    let app = test_app();

    for method in [Method::GET, Method::DELETE] {
        let (status, body) = send(&app.router, method, "/recipes/not-a-uuid", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_FORMAT");
    }
}

#[tokio::test]
async fn missing_recipe_is_not_found() {
    let app = test_app();
    let uri = format!("/recipes/{}", Uuid::now_v7());

    let (status, body) = send(&app.router, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "RECIPE_NOT_FOUND");

    let (status, _) = send(&app.router, Method::PUT, &uri, Some(r#"{"name":"Tea"}"#)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_twice_reports_not_found() {
    let app = test_app();
    let created = create_draft(&app.router, &tea_draft()).await;
    create_draft(&app.router, &soup_draft()).await;
    let uri = format!("/recipes/{}", created["id"].as_str().unwrap());
    list(&app.router).await;

    let (status, body) = send(&app.router, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "Recipe has been deleted" }));
    assert_eq!(names(&list(&app.router).await), vec!["Soup"]);

    let (status, _) = send(&app.router, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn uncached_listing_always_queries_store() {
    let (router, store) = uncached_app();
    create(&router, json!({ "name": "Tea" })).await;

    list(&router).await;
    list(&router).await;

    assert_eq!(store.find_all_calls(), 2);
}
