//! api-server — HTTP API for the record catalog.
//!
//! Serves album CRUD and a proxy to the iTunes catalog search:
//! - Storage: PostgreSQL or Cassandra, chosen by `DB_BACKEND` (each behind a cargo feature).
//! - Search: iTunes Search API, overridable with `ITUNES_BASE_URL`.
//! - CORS: Configurable via CORS_ALLOW_ORIGIN (origin string) for the frontend.
//!
//! Run:
//! ```bash
//! # pretty logs (default); PORT optional
//! POSTGRES_URL=postgres://postgres@localhost:5432/postgres cargo run -p api-server
//!
//! # Cassandra backend
//! DB_BACKEND=cassandra CASSANDRA_HOSTS=127.0.0.1:9042 cargo run -p api-server
//! ```
//!
//! Configuration: See `config.rs` for all environment variables.
//!

mod backend;
mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::http::HeaderValue;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use domain::service::CatalogService;
use domain::{Album, AlbumId, AlbumRepository, AlbumResponse, AlbumSearch, CoreError, NewAlbum};
use itunes_search::ItunesClient;
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

type Catalog = CatalogService<dyn AlbumRepository, dyn AlbumSearch>;

#[derive(Clone)]
struct AppState {
    catalog: Catalog,
}

#[tokio::main]
async fn main() {
    // Load and validate config first (fail fast on misconfiguration)
    let cfg = match config::Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(&cfg);

    let repo = match backend::connect(&cfg.backend) {
        Ok(r) => r,
        Err(e) => {
            error!(backend = cfg.backend.name(), err = %e, "failed to initialise album repository");
            std::process::exit(1);
        }
    };
    let search: Arc<dyn AlbumSearch> = match ItunesClient::new(&cfg.itunes_base_url) {
        Ok(c) => Arc::new(c),
        Err(e) => {
            error!(err = %e, "failed to initialise search client");
            std::process::exit(1);
        }
    };
    let state = AppState {
        catalog: CatalogService::new(repo, search),
    };

    let app = build_router(state.clone()).layer(cors_layer(&cfg.cors_allow_origin));

    let addr: SocketAddr = ([0, 0, 0, 0], cfg.port).into();
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!(%addr, err = %e, "failed to bind");
            std::process::exit(1);
        }
    };
    info!(%addr, backend = cfg.backend.name(), "api-server listening");
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(err = %e, "server error");
    }

    if let Err(e) = state.catalog.close() {
        warn!(err = %e, "error while closing album repository");
    }
    info!("api-server stopped");
}

fn init_tracing(cfg: &config::Config) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);
    match cfg.log_format {
        config::LogFormat::Json => {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_timer(fmt::time::SystemTime)
                        .with_writer(std::io::stdout),
                )
                .init();
        }
        config::LogFormat::Pretty => {
            registry
                .with(
                    fmt::layer()
                        .pretty()
                        .with_target(true)
                        .with_writer(std::io::stdout),
                )
                .init();
        }
    }
}

fn build_router(state: AppState) -> Router {
    // Request ID header name
    let x_request_id = axum::http::HeaderName::from_static("x-request-id");

    Router::new()
        .route("/albums", get(list_albums).post(create_album))
        .route(
            "/albums/:id",
            get(get_album).put(replace_album).delete(delete_album),
        )
        .route("/api/search", get(search_albums))
        .route("/healthz", get(healthz))
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid))
        .with_state(state)
}

// CORS - origin already validated in Config::from_env()
fn cors_layer(origin: &HeaderValue) -> CorsLayer {
    if origin.as_bytes() == b"*" {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list([origin.clone()]))
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::PUT,
                axum::http::Method::DELETE,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers([axum::http::header::CONTENT_TYPE])
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(err = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(err = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}

/// Album body for create and replace. Any `id` in the body is ignored.
/// Missing fields decode to empty/zero and are then rejected by validation.
#[derive(Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct AlbumIn {
    title: String,
    artist: String,
    price: f64,
    year: i32,
    image_url: String,
    genre: String,
}

impl From<AlbumIn> for NewAlbum {
    fn from(a: AlbumIn) -> Self {
        NewAlbum {
            title: a.title,
            artist: a.artist,
            price: a.price,
            year: a.year,
            image_url: a.image_url,
            genre: a.genre,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AlbumOut {
    id: String,
    title: String,
    artist: String,
    price: f64,
    year: i32,
    image_url: String,
    genre: String,
}

impl From<Album> for AlbumOut {
    fn from(a: Album) -> Self {
        AlbumOut {
            id: a.id.into_string(),
            title: a.title,
            artist: a.artist,
            price: a.price,
            year: a.year,
            image_url: a.image_url,
            genre: a.genre,
        }
    }
}

#[derive(Serialize)]
struct SearchResultOut {
    title: String,
    artist: String,
    price: f64,
    year: i32,
    genre: String,
    image_url: String,
}

impl From<AlbumResponse> for SearchResultOut {
    fn from(r: AlbumResponse) -> Self {
        SearchResultOut {
            title: r.title,
            artist: r.artist,
            price: r.price,
            year: r.year,
            genre: r.genre,
            image_url: r.image_url,
        }
    }
}

#[derive(Deserialize)]
struct SearchParams {
    #[serde(default)]
    term: String,
}

/// Domain error rendered as the standard JSON error envelope.
struct ApiError(CoreError);

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = http_common::error_response(&self.0);
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!(err = %self.0, status = status.as_u16(), "request failed");
        } else {
            warn!(err = %self.0, status = status.as_u16(), "request rejected");
        }
        (status, Json(body)).into_response()
    }
}

fn bad_body(rejection: JsonRejection) -> Response {
    warn!(err = %rejection.body_text(), "bad request body");
    (
        StatusCode::BAD_REQUEST,
        Json(http_common::json_error_with_message(
            "bad_request",
            &rejection.body_text(),
        )),
    )
        .into_response()
}

async fn healthz() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

async fn list_albums(State(state): State<AppState>) -> Result<Json<Vec<AlbumOut>>, ApiError> {
    let albums = state.catalog.list()?;
    info!(count = albums.len(), "list ok");
    Ok(Json(albums.into_iter().map(AlbumOut::from).collect()))
}

async fn get_album(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AlbumOut>, ApiError> {
    let album = state.catalog.get(&AlbumId::from(id))?;
    Ok(Json(album.into()))
}

async fn create_album(
    State(state): State<AppState>,
    payload: Result<Json<AlbumIn>, JsonRejection>,
) -> Response {
    let Json(body) = match payload {
        Ok(b) => b,
        Err(rejection) => return bad_body(rejection),
    };
    match state.catalog.create(body.into()) {
        Ok(album) => {
            info!(id = %album.id, "create ok");
            (StatusCode::CREATED, Json(AlbumOut::from(album))).into_response()
        }
        Err(e) => ApiError(e).into_response(),
    }
}

async fn replace_album(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<AlbumIn>, JsonRejection>,
) -> Response {
    let Json(body) = match payload {
        Ok(b) => b,
        Err(rejection) => return bad_body(rejection),
    };
    match state.catalog.replace(AlbumId::from(id), body.into()) {
        Ok(album) => {
            info!(id = %album.id, "update ok");
            Json(AlbumOut::from(album)).into_response()
        }
        Err(e) => ApiError(e).into_response(),
    }
}

async fn delete_album(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = AlbumId::from(id);
    state.catalog.delete(&id)?;
    info!(id = %id, "delete ok");
    Ok(StatusCode::NO_CONTENT)
}

async fn search_albums(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<SearchResultOut>>, ApiError> {
    let results = state.catalog.search(&params.term)?;
    info!(count = results.len(), "search ok");
    Ok(Json(results.into_iter().map(SearchResultOut::from).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request};
    use domain::adapters::memory_repo::InMemoryAlbumRepo;
    use domain::validate::validate_search_term;
    use tower::util::ServiceExt;

    /// Returns one canned result, or a configured error.
    struct StubSearch {
        fail_with: Option<CoreError>,
    }

    impl AlbumSearch for StubSearch {
        fn search(&self, term: &str) -> Result<Vec<AlbumResponse>, CoreError> {
            let term = validate_search_term(term)?;
            if let Some(e) = &self.fail_with {
                return Err(e.clone());
            }
            Ok(vec![AlbumResponse {
                title: format!("{term} Greatest Hits"),
                artist: term.to_string(),
                price: 9.99,
                year: 1971,
                genre: "Soul".into(),
                image_url: "https://example.com/gh.jpg".into(),
            }])
        }
    }

    fn app_with_search(search: StubSearch) -> Router {
        let repo: Arc<dyn AlbumRepository> = Arc::new(InMemoryAlbumRepo::new());
        let search: Arc<dyn AlbumSearch> = Arc::new(search);
        build_router(AppState {
            catalog: CatalogService::new(repo, search),
        })
    }

    fn app() -> Router {
        app_with_search(StubSearch { fail_with: None })
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn album_json(title: &str) -> serde_json::Value {
        serde_json::json!({
            "title": title,
            "artist": "Y",
            "price": 9.99,
            "year": 1970,
            "imageUrl": "https://example.com/x.jpg",
            "genre": "Soul"
        })
    }

    #[tokio::test]
    async fn create_list_delete_flow() {
        let router = app();

        let resp = router.clone().oneshot(get_request("/albums")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await, serde_json::json!([]));

        let resp = router
            .clone()
            .oneshot(json_request("POST", "/albums", album_json("X")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created = body_json(resp).await;
        assert_eq!(created["id"], "1");
        assert_eq!(created["title"], "X");
        assert_eq!(created["imageUrl"], "https://example.com/x.jpg");

        let resp = router.clone().oneshot(get_request("/albums")).await.unwrap();
        let all = body_json(resp).await;
        assert_eq!(all.as_array().map(Vec::len), Some(1));
        assert_eq!(all[0]["title"], "X");

        let resp = router
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/albums/1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let resp = router.clone().oneshot(get_request("/albums")).await.unwrap();
        assert_eq!(body_json(resp).await, serde_json::json!([]));
    }

    #[tokio::test]
    async fn put_replaces_album_and_keeps_path_id() {
        let router = app();
        router
            .clone()
            .oneshot(json_request("POST", "/albums", album_json("X")))
            .await
            .unwrap();

        let mut changed = album_json("Z");
        changed["id"] = serde_json::json!("999");
        changed["genre"] = serde_json::json!("Funk");
        let resp = router
            .clone()
            .oneshot(json_request("PUT", "/albums/1", changed))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let got = body_json(router.clone().oneshot(get_request("/albums/1")).await.unwrap()).await;
        assert_eq!(got["id"], "1");
        assert_eq!(got["title"], "Z");
        assert_eq!(got["genre"], "Funk");
    }

    #[tokio::test]
    async fn missing_album_is_404() {
        let router = app();
        let resp = router.clone().oneshot(get_request("/albums/42")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(resp).await["error"]["code"], "not_found");

        let resp = router
            .clone()
            .oneshot(json_request("PUT", "/albums/42", album_json("X")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_id_is_400() {
        let resp = app().oneshot(get_request("/albums/abc")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["error"]["code"], "invalid_id");
    }

    #[tokio::test]
    async fn invalid_album_is_400() {
        let router = app();
        let mut bad = album_json("X");
        bad["price"] = serde_json::json!(-1.0);
        let resp = router
            .clone()
            .oneshot(json_request("POST", "/albums", bad))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["error"]["code"], "bad_request");

        // Missing fields decode to defaults and fail validation.
        let resp = router
            .clone()
            .oneshot(json_request("POST", "/albums", serde_json::json!({"title": "X"})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_json_is_400() {
        let req = Request::builder()
            .method("POST")
            .uri("/albums")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["error"]["code"], "bad_request");
    }

    #[tokio::test]
    async fn search_returns_snake_case_results() {
        let resp = app()
            .oneshot(get_request("/api/search?term=marvin%20gaye"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let results = body_json(resp).await;
        assert_eq!(results[0]["title"], "marvin gaye Greatest Hits");
        assert_eq!(results[0]["image_url"], "https://example.com/gh.jpg");
        assert_eq!(results[0]["year"], 1971);
    }

    #[tokio::test]
    async fn search_without_term_is_400() {
        let resp = app().oneshot(get_request("/api/search")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let resp = app().oneshot(get_request("/api/search?term=%20")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn upstream_failure_is_502() {
        let router = app_with_search(StubSearch {
            fail_with: Some(CoreError::Upstream {
                status: Some(500),
                message: "search endpoint returned 500".into(),
            }),
        });
        let resp = router.oneshot(get_request("/api/search?term=x")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(body_json(resp).await["error"]["code"], "upstream_error");
    }

    #[tokio::test]
    async fn healthz_is_ok() {
        let resp = app().oneshot(get_request("/healthz")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await, serde_json::json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn request_id_is_propagated() {
        let resp = app().oneshot(get_request("/healthz")).await.unwrap();
        assert!(resp.headers().contains_key("x-request-id"));
    }
}
