//! Blog Backend - library for app logic and testing

pub mod auth;
pub mod config;
pub mod credentials;
pub mod db;
pub mod error;
pub mod logging;
pub mod routes;
pub mod sanitize;

use axum::{
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use sqlx::SqlitePool;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer,
};

use crate::auth::{Guard, SessionManager};
use crate::config::AppConfig;
use crate::credentials::CredentialStore;
use crate::db::Repository;

/// Everything a handler needs. Identity is not in here: it is resolved per
/// request by the `CurrentIdentity` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    pub repo: Repository,
    pub sessions: SessionManager,
    pub guard: Guard,
    pub credentials: CredentialStore,
    pub secure_cookies: bool,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: &AppConfig) -> Self {
        let repo = Repository::new(pool);
        Self {
            sessions: SessionManager::new(repo.clone()),
            repo,
            guard: Guard::new(config.admin_user_id),
            credentials: CredentialStore::new(config.bcrypt_cost),
            secure_cookies: config.is_production(),
        }
    }
}

/// Configure CORS from environment variables.
/// Uses ALLOWED_ORIGINS (comma-separated) or FRONTEND_ORIGIN.
pub fn configure_cors() -> CorsLayer {
    let allowed_origins: Vec<HeaderValue> = std::env::var("ALLOWED_ORIGINS")
        .ok()
        .map(|s| {
            s.split(',')
                .filter_map(|origin| origin.trim().parse().ok())
                .collect::<Vec<HeaderValue>>()
        })
        .filter(|origins| !origins.is_empty())
        .or_else(|| {
            std::env::var("FRONTEND_ORIGIN")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(|origin| vec![origin])
        })
        .unwrap_or_else(|| {
            vec![
                HeaderValue::from_static("http://localhost:3000"),
                HeaderValue::from_static("http://127.0.0.1:3000"),
            ]
        });

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
        ])
        .allow_credentials(true)
}

/// Create and configure the application router.
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/api/auth/register", post(routes::auth::register))
        .route("/api/auth/login", post(routes::auth::login))
        .route("/api/auth/logout", post(routes::auth::logout))
        .route("/api/auth/me", get(routes::auth::me))
        .route(
            "/api/posts",
            get(routes::blog::list_posts).post(routes::blog::create_post),
        )
        .route(
            "/api/posts/{id}",
            get(routes::blog::show_post)
                .put(routes::blog::edit_post)
                .delete(routes::blog::delete_post),
        )
        .route("/api/posts/{id}/comments", post(routes::blog::add_comment))
        .route("/api/contact", post(routes::contact::submit_contact))
        .route("/health", get(routes::health::health_ping))
        .route("/health/database", get(routes::health::health_database))
        .route("/health/ready", get(routes::health::health_ready))
        .with_state(state)
        .layer(logging::middleware::propagate_request_id_layer())
        .layer(middleware::from_fn(logging::middleware::log_request))
        .layer(logging::middleware::request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        // Global 2 MB request body cap
        .layer(RequestBodyLimitLayer::new(2 * 1024 * 1024))
        .layer(configure_cors())
}

/// Run the server (used by main).
pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env();

    // Dropping these stops the background log writers.
    let _log_guards = logging::init(&config);

    routes::health::init_start_time();

    let pool = db::init_pool(&db::DbConfig::from(&config)).await?;
    db::run_migrations(&pool).await?;

    tracing::info!(
        admin_user_id = config.admin_user_id,
        bcrypt_cost = config.bcrypt_cost,
        "authorization configured"
    );

    let app = create_app(AppState::new(pool, &config));

    let addr = config.bind_addr()?;
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}


#[cfg(test)]
mod tests {
    use super::test_support::{call, test_state};
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};

    fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&json).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn json_call(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let res = call(app, request(method, uri, token, body)).await;
        let value = if res.body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&res.body).unwrap()
        };
        (res.status, value)
    }

    fn post_body(title: &str) -> Value {
        json!({
            "title": title,
            "subtitle": "First words",
            "imgUrl": "https://images.example.com/hello.jpg",
            "body": "<p>Hello world</p>"
        })
    }

    #[tokio::test]
    async fn test_login_logout_state_machine_with_replay() {
        let app = create_app(test_state().await);
        let creds = json!({ "email": "a@x.com", "password": "pw-a", "name": "A" });
        json_call(&app, "POST", "/api/auth/register", None, Some(creds)).await;

        let (status, body) = json_call(
            &app,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "a@x.com", "password": "pw-a" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let token = body["token"].as_str().unwrap().to_string();

        let (_, me) = json_call(&app, "GET", "/api/auth/me", Some(&token), None).await;
        assert_eq!(me["isAnonymous"], false);
        assert_eq!(me["user"]["email"], "a@x.com");

        let (status, _) = json_call(&app, "POST", "/api/auth/logout", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);

        let (_, me) = json_call(&app, "GET", "/api/auth/me", Some(&token), None).await;
        assert_eq!(me["isAnonymous"], true);

        let (status, _) = json_call(&app, "POST", "/api/auth/logout", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_session_cookie_authenticates() {
        let app = create_app(test_state().await);
        let res = call(
            &app,
            request(
                "POST",
                "/api/auth/register",
                None,
                Some(json!({ "email": "a@x.com", "password": "pw", "name": "A" })),
            ),
        )
        .await;
        let cookie = res.set_cookie.unwrap();
        let pair = cookie.split(';').next().unwrap().to_string();

        let req = Request::get("/api/auth/me")
            .header("cookie", pair)
            .body(Body::empty())
            .unwrap();
        let me: Value = serde_json::from_slice(&call(&app, req).await.body).unwrap();
        assert_eq!(me["isAnonymous"], false);
    }

    #[tokio::test]
    async fn test_end_to_end_publishing_and_moderation() {
        let state = test_state().await;
        let app = create_app(state.clone());

        // A registers first and is therefore the admin (id 1).
        let (status, a) = json_call(
            &app,
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "email": "a@x.com", "password": "pw-a", "name": "Alice" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(a["user"]["id"], 1);

        let (_, login) = json_call(
            &app,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "a@x.com", "password": "pw-a" })),
        )
        .await;
        let a_token = login["token"].as_str().unwrap().to_string();

        let (status, p1) =
            json_call(&app, "POST", "/api/posts", Some(&a_token), Some(post_body("Hello"))).await;
        assert_eq!(status, StatusCode::CREATED);
        let p1_id = p1["id"].as_i64().unwrap();

        json_call(&app, "POST", "/api/auth/logout", Some(&a_token), None).await;

        let (status, _) = json_call(
            &app,
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "email": "b@x.com", "password": "pw-b", "name": "Bob" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, login) = json_call(
            &app,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "b@x.com", "password": "pw-b" })),
        )
        .await;
        let b_token = login["token"].as_str().unwrap().to_string();

        // B comments, then tries to edit and delete.
        let (status, _) = json_call(
            &app,
            "POST",
            &format!("/api/posts/{p1_id}/comments"),
            Some(&b_token),
            Some(json!({ "text": "<p>First!</p>\r\n" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, _) = json_call(
            &app,
            "PUT",
            &format!("/api/posts/{p1_id}"),
            Some(&b_token),
            Some(post_body("Hijacked")),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) =
            json_call(&app, "DELETE", &format!("/api/posts/{p1_id}"), Some(&b_token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(state.repo.get_post_or_fail(p1_id).await.unwrap().title, "Hello");

        let (_, view) = json_call(&app, "GET", &format!("/api/posts/{p1_id}"), Some(&b_token), None).await;
        assert_eq!(view["isOwnerOrAdmin"], false);
        assert_eq!(view["comments"][0]["text"], "First!");

        // Admin logs back in and edits.
        let (_, login) = json_call(
            &app,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "a@x.com", "password": "pw-a" })),
        )
        .await;
        let admin_token = login["token"].as_str().unwrap().to_string();

        let (status, edited) = json_call(
            &app,
            "PUT",
            &format!("/api/posts/{p1_id}"),
            Some(&admin_token),
            Some(post_body("Hello, edited")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(edited["title"], "Hello, edited");
        assert_eq!(edited["date"], p1["date"]);

        let (status, deleted) = json_call(
            &app,
            "DELETE",
            &format!("/api/posts/{p1_id}"),
            Some(&admin_token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(deleted["deletedComments"], 1);

        let (_, listing) = json_call(&app, "GET", "/api/posts", None, None).await;
        assert!(listing["posts"].as_array().unwrap().is_empty());
        assert!(state.repo.list_comments_for_post(p1_id).await.unwrap().is_empty());

        let (status, _) = json_call(&app, "GET", &format!("/api/posts/{p1_id}"), None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_listing_payload_shape() {
        let state = test_state().await;
        let app = create_app(state.clone());
        let admin = test_support::login_as(&state, test_support::ADMIN).await;
        json_call(&app, "POST", "/api/posts", Some(&admin), Some(post_body("One"))).await;
        json_call(&app, "POST", "/api/posts", Some(&admin), Some(post_body("Two"))).await;

        let (_, listing) = json_call(&app, "GET", "/api/posts", Some(&admin), None).await;
        assert_eq!(listing["isAnonymous"], false);
        let posts = listing["posts"].as_array().unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0]["title"], "One");
        assert_eq!(posts[0]["authorName"], "Admin");
        assert!(posts[0].get("body").is_none());
        assert!(posts[1]["date"].is_string());
    }

    #[tokio::test]
    async fn test_duplicate_title_conflicts() {
        let state = test_state().await;
        let app = create_app(state.clone());
        let admin = test_support::login_as(&state, test_support::ADMIN).await;
        json_call(&app, "POST", "/api/posts", Some(&admin), Some(post_body("Same"))).await;
        let (status, _) =
            json_call(&app, "POST", "/api/posts", Some(&admin), Some(post_body("Same"))).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }
}
