use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, app_with, Blog, Post, BLANK};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn get(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

// --- index ---

#[tokio::test]
async fn list_posts_empty_is_namespaced() {
    let resp = app().oneshot(get("/posts.json")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body, json!({ "posts": [] }));
}

#[tokio::test]
async fn seeded_posts_carry_author() {
    let resp = app_with(Blog::seeded()).oneshot(get("/posts.json")).await.unwrap();

    let body: Value = body_json(resp).await;
    assert_eq!(body["posts"][0]["author"]["name"], "Babaji");
}

#[tokio::test]
async fn enveloped_list_is_under_data() {
    let resp = app_with(Blog::seeded())
        .oneshot(get("/envelope/posts.json"))
        .await
        .unwrap();

    let body: Value = body_json(resp).await;
    assert_eq!(body["data"]["posts"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn list_authors_is_namespaced() {
    let resp = app_with(Blog::seeded()).oneshot(get("/authors.json")).await.unwrap();

    let body: Value = body_json(resp).await;
    assert_eq!(body, json!({ "authors": [{ "id": "1", "name": "Babaji" }] }));
}

// --- create ---

#[tokio::test]
async fn create_post_returns_201() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/posts.json",
            r#"{"post":{"title":"Hello","contents":"World"}}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = body_json(resp).await;
    let post: Post = serde_json::from_value(body["post"].clone()).unwrap();
    assert_eq!(post.title, "Hello");
    assert!(!post.id.is_empty());
}

#[tokio::test]
async fn create_blank_post_returns_field_errors() {
    let resp = app()
        .oneshot(json_request("POST", "/posts.json", r#"{"post":{}}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = body_json(resp).await;
    assert_eq!(body, json!({ "errors": [{ "title": BLANK }, { "contents": BLANK }] }));
}

#[tokio::test]
async fn legacy_create_embeds_errors_in_resource() {
    let resp = app()
        .oneshot(json_request("POST", "/legacy/posts.json", r#"{"post":{"contents":"x"}}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["post"]["errors"]["title"], json!(["can't be blank"]));
    assert_eq!(body["post"]["errors"]["base"], json!(["Post is invalid"]));
}

// --- show / update / destroy ---

#[tokio::test]
async fn show_post_strips_format_suffix() {
    let resp = app_with(Blog::seeded()).oneshot(get("/posts/1.json")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["post"]["id"], "1");
}

#[tokio::test]
async fn show_post_not_found() {
    let resp = app().oneshot(get("/posts/404.json")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_with_blank_title_echoes_stored_post() {
    let resp = app_with(Blog::seeded())
        .oneshot(json_request(
            "PUT",
            "/posts/1.json",
            r#"{"post":{"title":"","contents":"changed"}}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = body_json(resp).await;
    assert_eq!(body["post"]["title"], "First post");
    assert_eq!(body["errors"], json!([{ "title": BLANK }]));
}

#[tokio::test]
async fn update_post_not_found() {
    let resp = app()
        .oneshot(json_request(
            "PUT",
            "/posts/404.json",
            r#"{"post":{"title":"Nope","contents":"Nope"}}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_post_not_found() {
    let resp = app()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/posts/404.json")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- failures ---

#[tokio::test]
async fn server_failure_has_error_entries() {
    let resp = app().oneshot(get("/failures/server.json")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = body_json(resp).await;
    assert_eq!(body["errors"][0]["code"], "ServerError");
}

#[tokio::test]
async fn plain_failure_is_not_json() {
    let resp = app().oneshot(get("/failures/plain")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_bytes(resp).await;
    assert_eq!(&body[..], b"Something went wrong!");
}

#[tokio::test]
async fn unauthorized_returns_401() {
    let resp = app().oneshot(get("/failures/unauthorized.json")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// --- full lifecycle ---

#[tokio::test]
async fn post_lifecycle() {
    use tower::Service;

    let mut app = app().into_service();

    // create
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "POST",
            "/posts.json",
            r#"{"post":{"title":"Walk dog","contents":"Twice"}}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = body_json(resp).await;
    let id = body["post"]["id"].as_str().unwrap().to_string();

    // update
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "PUT",
            &format!("/posts/{id}.json"),
            r#"{"post":{"title":"Walk cat","contents":"Once"}}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["post"]["title"], "Walk cat");

    // list contains the one post
    let resp = ServiceExt::ready(&mut app).await.unwrap().call(get("/posts.json")).await.unwrap();
    let body: Value = body_json(resp).await;
    assert_eq!(body["posts"].as_array().unwrap().len(), 1);
    assert_eq!(body["posts"][0]["id"], id.as_str());

    // delete
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(
            Request::builder()
                .method("DELETE")
                .uri(&format!("/posts/{id}.json"))
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());

    // list after delete is empty
    let resp = ServiceExt::ready(&mut app).await.unwrap().call(get("/posts.json")).await.unwrap();
    let body: Value = body_json(resp).await;
    assert_eq!(body, json!({ "posts": [] }));
}

#[tokio::test]
async fn delete_records_its_parameters() {
    use tower::Service;

    let mut app = app_with(Blog::seeded()).into_service();

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("DELETE", "/posts/1.json", r#"{"reason":"spam"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get("/deletions.json"))
        .await
        .unwrap();
    let body: Value = body_json(resp).await;
    assert_eq!(body, json!({ "deletions": [{ "reason": "spam" }] }));
}
