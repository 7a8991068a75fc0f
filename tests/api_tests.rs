use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::json;

use reelmatch::engine::{build_index, Catalog, Engine, EngineHandle, IndexConfig};
use reelmatch::error::{AppError, AppResult};
use reelmatch::models::{TmdbMovie, TmdbMovieDetails};
use reelmatch::routes::{create_router, AppState};
use reelmatch::services::{
    MetadataProvider, RecommendationService, RecommendationSettings, SearchHistory,
};

fn engine() -> Engine {
    let catalog = Catalog::from_rows([
        ("Alien", "space horror creature crew ship"),
        ("Aliens", "space horror creature marines ship"),
        ("The Notebook", "romance drama letters summer"),
        ("Titanic", "romance drama ship iceberg"),
        ("Moon", "space isolation clone"),
    ]);
    let bundle = build_index(&catalog, &IndexConfig::default()).unwrap();
    Engine::new(catalog, bundle).unwrap()
}

fn create_test_server() -> TestServer {
    create_server_with(EngineHandle::new(engine()))
}

fn create_server_with(handle: EngineHandle) -> TestServer {
    let service = RecommendationService::new(
        Arc::new(handle),
        Arc::new(SearchHistory::new()),
        RecommendationSettings::default(),
    );
    TestServer::new(create_router(AppState::new(service))).unwrap()
}

/// Fixed metadata: every title resolves to itself, id 603 has details
struct FixedMetadata;

#[async_trait::async_trait]
impl MetadataProvider for FixedMetadata {
    async fn search_movies(&self, title: &str) -> AppResult<Vec<TmdbMovie>> {
        let movie = |id: u64| TmdbMovie {
            id,
            title: Some(title.to_string()),
            poster_path: Some(format!("/{}.jpg", id)),
            overview: None,
            release_date: None,
        };
        Ok(vec![movie(title.len() as u64), movie(1000 + title.len() as u64)])
    }

    async fn movie_details(&self, id: u64) -> AppResult<TmdbMovieDetails> {
        if id != 603 {
            return Err(AppError::NotFound(format!("Movie {} not found", id)));
        }
        Ok(TmdbMovieDetails {
            id,
            title: Some("The Matrix".to_string()),
            tagline: Some("Welcome to the Real World.".to_string()),
            overview: None,
            poster_path: None,
            release_date: Some("1999-03-30".to_string()),
            runtime: Some(136),
            genres: vec![],
            vote_average: None,
        })
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

fn create_server_with_metadata() -> TestServer {
    let service = RecommendationService::new(
        Arc::new(EngineHandle::new(engine())),
        Arc::new(SearchHistory::new()),
        RecommendationSettings::default(),
    )
    .with_metadata(Arc::new(FixedMetadata));
    TestServer::new(create_router(AppState::new(service))).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server();
    let response = server.get("/health").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["engine"], "online");
    assert_eq!(body["catalog_rows"], 5);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let server = create_test_server();
    let response = server
        .get("/health")
        .add_header(
            axum::http::HeaderName::from_static("x-request-id"),
            axum::http::HeaderValue::from_static("abc-123"),
        )
        .await;
    assert_eq!(response.header("x-request-id"), "abc-123");
}

#[tokio::test]
async fn test_title_recommendations() {
    let server = create_test_server();
    let response = server
        .get("/api/v1/recommendations")
        .add_query_param("title", "alien")
        .add_query_param("top_n", 2)
        .await;

    response.assert_status_ok();
    let cards: Vec<serde_json::Value> = response.json();
    assert_eq!(cards.len(), 2);
    assert_eq!(cards[0]["title"], "Aliens");
    assert!(cards.iter().all(|c| c["title"] != "Alien"));
    assert!(cards[0]["poster_path"].is_null());
}

#[tokio::test]
async fn test_unknown_title_returns_empty_list() {
    let server = create_test_server();
    let response = server
        .get("/api/v1/recommendations")
        .add_query_param("title", "no such movie")
        .await;
    response.assert_status_ok();
    let cards: Vec<serde_json::Value> = response.json();
    assert!(cards.is_empty());
}

#[tokio::test]
async fn test_top_n_is_bounded() {
    let server = create_test_server();
    let response = server
        .get("/api/v1/recommendations")
        .add_query_param("title", "alien")
        .add_query_param("top_n", 1000)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_search_then_history_recommendations() {
    let server = create_test_server();

    let response = server
        .post("/api/v1/users/u1/searches")
        .json(&json!({ "query": "  Alien " }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let outcome: serde_json::Value = response.json();
    assert_eq!(outcome["query"], "Alien");
    assert_eq!(outcome["recommendations"][0]["title"], "Aliens");

    server
        .post("/api/v1/users/u1/searches")
        .json(&json!({ "query": "Titanic" }))
        .await
        .assert_status(StatusCode::CREATED);

    let response = server.get("/api/v1/users/u1/searches").await;
    let searches: Vec<serde_json::Value> = response.json();
    assert_eq!(searches.len(), 2);
    assert_eq!(searches[0]["movie_title"], "Titanic");

    let response = server.get("/api/v1/users/u1/recommendations").await;
    response.assert_status_ok();
    let cards: Vec<serde_json::Value> = response.json();
    assert_eq!(cards.len(), 3);
    assert!(cards
        .iter()
        .all(|c| c["title"] != "Alien" && c["title"] != "Titanic"));
}

#[tokio::test]
async fn test_history_for_new_user_is_empty() {
    let server = create_test_server();
    let response = server.get("/api/v1/users/nobody/recommendations").await;
    response.assert_status_ok();
    let cards: Vec<serde_json::Value> = response.json();
    assert!(cards.is_empty());
}

#[tokio::test]
async fn test_invalid_search_is_rejected() {
    let server = create_test_server();
    let response = server
        .post("/api/v1/users/u1/searches")
        .json(&json!({ "query": "<script>" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("unsupported character"));
}

#[tokio::test]
async fn test_popular_searches() {
    let server = create_test_server();
    for (user, query) in [("u1", "Moon"), ("u2", "Moon"), ("u2", "Titanic")] {
        server
            .post(&format!("/api/v1/users/{}/searches", user))
            .json(&json!({ "query": query }))
            .await;
    }

    let response = server
        .get("/api/v1/searches/popular")
        .add_query_param("limit", 1)
        .await;
    response.assert_status_ok();
    let popular: Vec<serde_json::Value> = response.json();
    assert_eq!(popular, vec![json!({ "movie_title": "Moon", "count": 2 })]);
}

#[tokio::test]
async fn test_offline_engine_returns_503() {
    let server = create_server_with(EngineHandle::offline());

    let response = server
        .get("/api/v1/recommendations")
        .add_query_param("title", "alien")
        .await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);

    let health: serde_json::Value = server.get("/health").await.json();
    assert_eq!(health["engine"], "offline");
}

#[tokio::test]
async fn test_reload_without_source_keeps_serving() {
    let server = create_test_server();
    let response = server.post("/api/v1/admin/reload").await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);

    server
        .get("/api/v1/recommendations")
        .add_query_param("title", "alien")
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_search_lists_matching_movies() {
    let server = create_server_with_metadata();
    let response = server
        .post("/api/v1/users/u1/searches")
        .json(&json!({ "query": "Moon" }))
        .await;
    response.assert_status(StatusCode::CREATED);

    let outcome: serde_json::Value = response.json();
    let movies = outcome["movies"].as_array().unwrap();
    assert_eq!(movies.len(), 1);
    assert_eq!(movies[0]["title"], "Moon");
    for card in outcome["recommendations"].as_array().unwrap() {
        let title_len = card["title"].as_str().unwrap().len() as u64;
        assert_eq!(card["id"], title_len);
        assert_eq!(card["poster_path"], format!("/{}.jpg", title_len));
    }
}

#[tokio::test]
async fn test_search_without_provider_has_no_movies() {
    let server = create_test_server();
    let outcome: serde_json::Value = server
        .post("/api/v1/users/u1/searches")
        .json(&json!({ "query": "Moon" }))
        .await
        .json();
    assert_eq!(outcome["movies"], json!([]));
}

#[tokio::test]
async fn test_movie_details() {
    let server = create_server_with_metadata();
    let response = server.get("/api/v1/movies/603").await;
    response.assert_status_ok();
    let details: serde_json::Value = response.json();
    assert_eq!(details["title"], "The Matrix");
    assert_eq!(details["runtime"], 136);

    let response = server.get("/api/v1/movies/1").await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: serde_json::Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn test_movie_details_without_provider_is_not_found() {
    let server = create_test_server();
    server
        .get("/api/v1/movies/603")
        .await
        .assert_status(StatusCode::NOT_FOUND);
    server
        .get("/api/v1/movies/not-a-number")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}
