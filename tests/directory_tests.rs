//! # Directory Client Tests
//!
//! Runs the HTTP directory client against a local stub server answering
//! with canned responses.

use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use recipes::config::{DirectoryConfig, RecoveryConfig};
use recipes::errors::BotError;
use recipes::{MealDbClient, RecipeDirectory};

/// Minimal HTTP/1.1 server replaying queued responses
struct StubServer {
    base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StubServer {
    async fn start(responses: Vec<(u16, String)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}/api/json/v1/1", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let queue = Arc::new(Mutex::new(VecDeque::from(responses)));

        let recorded = Arc::clone(&requests);
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let mut buffer = vec![0u8; 8192];
                let mut read = 0;
                while !buffer[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buffer[read..]).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => read += n,
                    }
                }
                let request = String::from_utf8_lossy(&buffer[..read]).to_string();
                let target = request.split_whitespace().nth(1).unwrap_or_default().to_string();
                recorded.lock().unwrap().push(target);

                let (status, body) = queue
                    .lock()
                    .unwrap()
                    .pop_front()
                    .unwrap_or((500, "{}".to_string()));
                let response = format!(
                    "HTTP/1.1 {status} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        Self { base_url, requests }
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

fn client(server: &StubServer, recovery: RecoveryConfig) -> MealDbClient {
    MealDbClient::new(&DirectoryConfig {
        base_url: server.base_url.clone(),
        request_timeout_secs: 5,
        recovery,
    })
    .unwrap()
}

fn fast_recovery() -> RecoveryConfig {
    RecoveryConfig {
        max_retries: 2,
        base_retry_delay_ms: 1,
        max_retry_delay_ms: 5,
        circuit_breaker_threshold: 10,
        circuit_breaker_reset_secs: 60,
    }
}

#[tokio::test]
async fn test_lookup_parses_meal() {
    let body = json!({
        "meals": [{
            "idMeal": "52772",
            "strMeal": "Teriyaki Chicken Casserole",
            "strCategory": "Chicken",
            "strInstructions": "Preheat oven to 350° F.",
            "strIngredient1": "soy sauce",
            "strIngredient2": "water",
            "strIngredient3": "",
            "strIngredient4": "brown sugar",
            "strIngredient5": null,
            "strMeasure1": "3/4 cup"
        }]
    });
    let server = StubServer::start(vec![(200, body.to_string())]).await;

    let detail = client(&server, fast_recovery()).lookup("52772").await.unwrap().unwrap();

    assert_eq!(detail.name.as_deref(), Some("Teriyaki Chicken Casserole"));
    assert_eq!(detail.instructions.as_deref(), Some("Preheat oven to 350° F."));
    assert_eq!(detail.ingredients, vec!["soy sauce", "water", "brown sugar"]);
    assert_eq!(server.requests(), vec!["/api/json/v1/1/lookup.php?i=52772"]);
}

#[tokio::test]
async fn test_filter_and_list_endpoints() {
    let server = StubServer::start(vec![
        (200, json!({"meals": [{"strCategory": "Beef"}, {"strCategory": "Vegan"}]}).to_string()),
        (200, json!({"meals": null}).to_string()),
        (200, json!({"meals": [{"strMeal": "Fish pie", "strMealThumb": "x", "idMeal": "52802"}]}).to_string()),
    ])
    .await;
    let client = client(&server, fast_recovery());

    assert_eq!(client.list_categories().await.unwrap(), vec!["Beef", "Vegan"]);
    assert!(client.filter_by_category("Dinosaur").await.unwrap().is_empty());
    let recipes = client.filter_by_category("Sea food").await.unwrap();
    assert_eq!(recipes[0].id, "52802");
    assert_eq!(recipes[0].name, "Fish pie");

    let requests = server.requests();
    assert_eq!(requests[0], "/api/json/v1/1/list.php?c=list");
    assert_eq!(requests[1], "/api/json/v1/1/filter.php?c=Dinosaur");
    assert_eq!(requests[2], "/api/json/v1/1/filter.php?c=Sea+food");
}

#[tokio::test]
async fn test_server_errors_are_retried() {
    let server = StubServer::start(vec![
        (503, "{}".to_string()),
        (200, json!({"meals": [{"strCategory": "Pasta"}]}).to_string()),
    ])
    .await;

    let categories = client(&server, fast_recovery()).list_categories().await.unwrap();

    assert_eq!(categories, vec!["Pasta"]);
    assert_eq!(server.requests().len(), 2);
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let server = StubServer::start(vec![(404, "{}".to_string())]).await;

    let error = client(&server, fast_recovery()).list_categories().await.unwrap_err();

    assert!(matches!(error, BotError::UpstreamUnavailable(_)));
    assert!(error.to_string().contains("404"));
    assert_eq!(server.requests().len(), 1);
}

#[tokio::test]
async fn test_retries_are_bounded() {
    let server = StubServer::start(vec![(500, "{}".to_string()); 5]).await;

    let result = client(&server, fast_recovery()).lookup("1").await;

    assert!(result.is_err());
    assert_eq!(server.requests().len(), 3);
}

#[tokio::test]
async fn test_open_circuit_fails_fast() {
    let server = StubServer::start(vec![(500, "{}".to_string()); 5]).await;
    let client = client(
        &server,
        RecoveryConfig {
            max_retries: 0,
            circuit_breaker_threshold: 2,
            ..fast_recovery()
        },
    );

    assert!(client.list_categories().await.is_err());
    assert!(client.list_categories().await.is_err());
    let error = client.list_categories().await.unwrap_err();

    assert!(error.to_string().contains("too many recent failures"));
    assert_eq!(server.requests().len(), 2);
}

#[tokio::test]
async fn test_malformed_body_is_upstream_error() {
    let server = StubServer::start(vec![(200, "not json".to_string())]).await;

    let error = client(&server, fast_recovery()).list_categories().await.unwrap_err();

    assert!(matches!(error, BotError::UpstreamUnavailable(_)));
    assert_eq!(server.requests().len(), 1);
}

#[tokio::test]
async fn test_retried_call_counts_as_one_failure() {
    let server = StubServer::start(vec![(500, "{}".to_string()); 9]).await;
    let client = client(
        &server,
        RecoveryConfig {
            max_retries: 2,
            circuit_breaker_threshold: 2,
            ..fast_recovery()
        },
    );

    // Each call makes three attempts but moves the breaker by one failure
    assert!(client.list_categories().await.is_err());
    assert_eq!(server.requests().len(), 3);
    assert!(client.list_categories().await.is_err());
    assert_eq!(server.requests().len(), 6);

    let error = client.list_categories().await.unwrap_err();
    assert!(error.to_string().contains("too many recent failures"));
    assert_eq!(server.requests().len(), 6);
}

#[tokio::test]
async fn test_missing_or_null_meals_decode_as_empty() {
    let server = StubServer::start(vec![
        (200, json!({}).to_string()),
        (200, json!({"meals": null}).to_string()),
        (200, json!({"meals": null}).to_string()),
    ])
    .await;
    let client = client(&server, fast_recovery());

    assert!(client.list_categories().await.unwrap().is_empty());
    assert!(client.filter_by_category("Goat").await.unwrap().is_empty());
    assert!(client.lookup("0").await.unwrap().is_none());
}
