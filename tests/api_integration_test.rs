// API integration tests that verify HTTP endpoints
// Drives the actual Axum router in-process; the provider is a mockito server
// and the database pool points at a closed port, which is exactly the
// "persistence is a side effect, never a precondition" contract under test.

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt; // For `.collect()`
use mockito::{Matcher, Server};
use serde_json::Value;
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use sqlx::MySqlPool;
use tower::ServiceExt; // For `oneshot`
use weather_tracker_service::api::{create_router, AppState};
use weather_tracker_service::db::ObservationRepository;
use weather_tracker_service::fetcher::WeatherFetcher;
use weather_tracker_service::services::WeatherService;

/// Pool aimed at a port nothing listens on. Lazy connect means construction
/// succeeds and every acquisition fails, like the source system with its
/// database down.
fn unreachable_pool() -> MySqlPool {
    let options = MySqlConnectOptions::new()
        .host("127.0.0.1")
        .port(9)
        .username("root")
        .database("weather_db");

    MySqlPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_millis(250))
        .connect_lazy_with(options)
}

fn test_app(provider_url: &str) -> axum::Router {
    let fetcher = WeatherFetcher::new(provider_url.to_string(), "test-key".to_string());
    let observation_repo = ObservationRepository::new(unreachable_pool());
    let weather_service = WeatherService::new(fetcher, observation_repo);
    create_router(AppState { weather_service })
}

async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

fn provider_query(city: &str) -> Matcher {
    Matcher::AllOf(vec![
        Matcher::UrlEncoded("q".into(), city.into()),
        Matcher::UrlEncoded("appid".into(), "test-key".into()),
        Matcher::UrlEncoded("units".into(), "metric".into()),
    ])
}

const LONDON_BODY: &str = r#"{
    "name": "London",
    "main": {"temp": 15.2, "humidity": 70, "pressure": 1012},
    "wind": {"speed": 3.1},
    "weather": [{"main": "Clouds", "description": "overcast clouds", "icon": "04d"}],
    "sys": {"country": "GB"}
}"#;

#[tokio::test]
async fn test_health_endpoint() {
    let app = test_app("http://127.0.0.1:9");
    let (status, json) = get_json(app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn test_current_weather_succeeds_even_with_database_down() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/weather")
        .match_query(provider_query("London"))
        .with_status(200)
        .with_body(LONDON_BODY)
        .create_async()
        .await;

    let app = test_app(&server.url());
    let (status, json) = get_json(app, "/api/weather/current/London").await;

    // The insert against the unreachable pool fails and is swallowed;
    // the response must still be a success.
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);

    let data = &json["data"];
    assert_eq!(data["city"], "London");
    assert_eq!(data["temperature"], 15.2);
    assert_eq!(data["humidity"], 70);
    assert_eq!(data["wind_speed"], 3.1);
    assert_eq!(data["pressure"], 1012);
    assert_eq!(data["condition"], "Clouds");
    assert_eq!(data["description"], "overcast clouds");
    assert_eq!(data["icon"], "04d");
    assert_eq!(data["country"], "GB");

    mock.assert_async().await;
}

#[tokio::test]
async fn test_current_weather_unknown_city_is_404_with_provider_message() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/weather")
        .match_query(provider_query("Nowheresville"))
        .with_status(404)
        .with_body(r#"{"cod": "404", "message": "city not found"}"#)
        .create_async()
        .await;

    let app = test_app(&server.url());
    let (status, json) = get_json(app, "/api/weather/current/Nowheresville").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "city not found");

    mock.assert_async().await;
}

#[tokio::test]
async fn test_current_weather_falls_back_to_fixed_message() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/weather")
        .match_query(provider_query("X"))
        .with_status(503)
        .with_body("{}")
        .create_async()
        .await;

    let app = test_app(&server.url());
    let (status, json) = get_json(app, "/api/weather/current/X").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "City not found");

    mock.assert_async().await;
}

#[tokio::test]
async fn test_current_weather_mapping_failure_is_500() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/weather")
        .match_query(provider_query("London"))
        .with_status(200)
        .with_body(r#"{"name": "London"}"#)
        .create_async()
        .await;

    let app = test_app(&server.url());
    let (status, json) = get_json(app, "/api/weather/current/London").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["success"], false);
    assert!(json["message"].as_str().unwrap().contains("decode"));

    mock.assert_async().await;
}

#[tokio::test]
async fn test_forecast_success_preserves_order_and_city() {
    let body = r#"{
        "city": {"name": "Paris"},
        "list": [
            {"dt_txt": "2025-01-01 00:00:00",
             "main": {"temp": 4.0, "humidity": 80, "pressure": 1001},
             "weather": [{"main": "Rain", "description": "light rain", "icon": "10d"}]},
            {"dt_txt": "2025-01-01 03:00:00",
             "main": {"temp": 3.5, "humidity": 82, "pressure": 1002},
             "weather": [{"main": "Rain", "description": "moderate rain", "icon": "10d"}]}
        ]
    }"#;

    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/forecast")
        .match_query(provider_query("Paris"))
        .with_status(200)
        .with_body(body)
        .create_async()
        .await;

    let app = test_app(&server.url());
    let (status, json) = get_json(app, "/api/weather/forecast/Paris").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["city"], "Paris");

    let data = json["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data[0]["datetime"], "2025-01-01 00:00:00");
    assert_eq!(data[1]["datetime"], "2025-01-01 03:00:00");
    assert_eq!(data[1]["description"], "moderate rain");

    mock.assert_async().await;
}

#[tokio::test]
async fn test_forecast_unknown_city_is_404() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/forecast")
        .match_query(provider_query("Nowheresville"))
        .with_status(404)
        .with_body(r#"{"cod": "404", "message": "city not found"}"#)
        .create_async()
        .await;

    let app = test_app(&server.url());
    let (status, json) = get_json(app, "/api/weather/forecast/Nowheresville").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "city not found");

    mock.assert_async().await;
}

#[tokio::test]
async fn test_history_database_failure_is_500_envelope() {
    // No provider involved; the unreachable pool turns the read into the
    // 500 error envelope.
    let app = test_app("http://127.0.0.1:9");
    let (status, json) = get_json(app, "/api/weather/history/London").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["success"], false);
    assert!(json["message"].as_str().is_some());
}

#[tokio::test]
async fn test_history_accepts_numeric_days() {
    let app = test_app("http://127.0.0.1:9");
    let (status, json) = get_json(app, "/api/weather/history/London?days=3").await;

    // Reaches the database layer (and fails there), so the parameter parsed.
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn test_history_rejects_non_numeric_days() {
    // Strict policy: a malformed days value is a client error, not a silent
    // fall-back to the 7-day default.
    let app = test_app("http://127.0.0.1:9");
    let (status, _) = get_json(app, "/api/weather/history/London?days=yesterday").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cities_database_failure_is_500_envelope() {
    let app = test_app("http://127.0.0.1:9");
    let (status, json) = get_json(app, "/api/weather/cities").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["success"], false);
    assert!(json["message"].as_str().is_some());
}
