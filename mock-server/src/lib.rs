use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const BLANK: &str = "must not be blank!";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub contents: String,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<Author>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PostInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub contents: String,
}

#[derive(Deserialize)]
pub struct PostEnvelope {
    pub post: PostInput,
}

impl PostInput {
    /// Field errors in the `[{"field": "message"}]` shape.
    fn errors(&self) -> Vec<Value> {
        let mut errors = Vec::new();
        if self.title.trim().is_empty() {
            errors.push(json!({ "title": BLANK }));
        }
        if self.contents.trim().is_empty() {
            errors.push(json!({ "contents": BLANK }));
        }
        errors
    }
}

#[derive(Debug, Default)]
pub struct Blog {
    pub posts: Vec<Post>,
    pub authors: Vec<Author>,
    /// Parameters sent with each successful delete, in arrival order.
    pub deletions: Vec<Value>,
}

impl Blog {
    pub fn seeded() -> Self {
        let author = Author {
            id: "1".to_string(),
            name: "Babaji".to_string(),
        };
        Self {
            posts: vec![Post {
                id: "1".to_string(),
                title: "First post".to_string(),
                contents: "Hello from the mock server".to_string(),
                created_at: "2016-01-25T00:00:00Z".to_string(),
                author: Some(author.clone()),
            }],
            authors: vec![author],
            deletions: Vec::new(),
        }
    }
}

pub type Db = Arc<RwLock<Blog>>;

pub fn app() -> Router {
    app_with(Blog::default())
}

pub fn app_with(blog: Blog) -> Router {
    let db: Db = Arc::new(RwLock::new(blog));
    Router::new()
        .route("/posts.json", get(list_posts).post(create_post))
        .route("/posts/{file}", get(show_post).put(update_post).delete(delete_post))
        .route("/authors.json", get(list_authors))
        .route("/deletions.json", get(list_deletions))
        .route("/legacy/posts.json", post(create_post_legacy))
        .route("/envelope/posts.json", get(list_posts_enveloped))
        .route("/failures/server.json", get(server_failure).post(server_failure))
        .route("/failures/plain", get(plain_failure).post(plain_failure))
        .route("/failures/unauthorized.json", get(unauthorized))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(Blog::seeded())).await
}

/// `"12.json"` to `"12"`.
fn post_id(file: &str) -> &str {
    file.strip_suffix(".json").unwrap_or(file)
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "errors": ["Not found"] }))).into_response()
}

fn unprocessable(echo: Option<&Post>, errors: Vec<Value>) -> Response {
    let mut body = Map::new();
    if let Some(post) = echo {
        body.insert("post".to_string(), json!(post));
    }
    body.insert("errors".to_string(), Value::Array(errors));
    (StatusCode::UNPROCESSABLE_ENTITY, Json(Value::Object(body))).into_response()
}

async fn list_posts(State(db): State<Db>) -> Json<Value> {
    let blog = db.read().await;
    Json(json!({ "posts": blog.posts }))
}

async fn list_posts_enveloped(State(db): State<Db>) -> Json<Value> {
    let blog = db.read().await;
    Json(json!({ "data": { "posts": blog.posts } }))
}

async fn list_deletions(State(db): State<Db>) -> Json<Value> {
    let blog = db.read().await;
    Json(json!({ "deletions": blog.deletions }))
}

async fn list_authors(State(db): State<Db>) -> Json<Value> {
    let blog = db.read().await;
    Json(json!({ "authors": blog.authors }))
}

async fn create_post(State(db): State<Db>, Json(input): Json<PostEnvelope>) -> Response {
    let errors = input.post.errors();
    if !errors.is_empty() {
        return unprocessable(None, errors);
    }

    let post = Post {
        id: Uuid::new_v4().to_string(),
        title: input.post.title,
        contents: input.post.contents,
        created_at: "2016-01-25T00:00:00Z".to_string(),
        author: None,
    };
    db.write().await.posts.push(post.clone());
    (StatusCode::CREATED, Json(json!({ "post": post }))).into_response()
}

/// Older servers embed field errors in the resource and answer 200.
async fn create_post_legacy(Json(input): Json<PostEnvelope>) -> Json<Value> {
    let mut errors = Map::new();
    if input.post.title.trim().is_empty() {
        errors.insert("title".to_string(), json!(["can't be blank"]));
        errors.insert("base".to_string(), json!(["Post is invalid"]));
    }
    Json(json!({
        "post": {
            "title": input.post.title,
            "contents": input.post.contents,
            "errors": errors,
        }
    }))
}

async fn show_post(State(db): State<Db>, Path(file): Path<String>) -> Response {
    let blog = db.read().await;
    match blog.posts.iter().find(|p| p.id == post_id(&file)) {
        Some(post) => Json(json!({ "post": post })).into_response(),
        None => not_found(),
    }
}

async fn update_post(State(db): State<Db>, Path(file): Path<String>, Json(input): Json<PostEnvelope>) -> Response {
    let mut blog = db.write().await;
    let Some(post) = blog.posts.iter_mut().find(|p| p.id == post_id(&file)) else {
        return not_found();
    };

    let errors = input.post.errors();
    if !errors.is_empty() {
        return unprocessable(Some(post), errors);
    }

    post.title = input.post.title;
    post.contents = input.post.contents;
    Json(json!({ "post": post })).into_response()
}

async fn delete_post(State(db): State<Db>, Path(file): Path<String>, body: String) -> StatusCode {
    let mut blog = db.write().await;
    let before = blog.posts.len();
    blog.posts.retain(|p| p.id != post_id(&file));
    if blog.posts.len() == before {
        return StatusCode::NOT_FOUND;
    }
    let parameters = serde_json::from_str(&body).unwrap_or(Value::Null);
    blog.deletions.push(parameters);
    StatusCode::NO_CONTENT
}

async fn server_failure() -> Response {
    let body = json!({
        "errors": [{
            "status": "500",
            "code": "ServerError",
            "detail": "A fatal error has occurred."
        }]
    });
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

async fn plain_failure() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong!")
}

async fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "errors": ["Not authenticated"] }))).into_response()
}
