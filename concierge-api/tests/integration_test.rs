use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use concierge_api::{app, AppState};
use concierge_core::repository::{AnalyticsSink, InsightStore, RepositoryError};
use concierge_core::{FlightOffer, SearchAnalyticsRecord, SearchRequest};
use concierge_offer::{
    ChatMessage, EnrichmentService, LlmClient, LlmError, QuoteAdapter, QuoteClient, QuoteError,
    SearchOrchestrator, SearchSettings,
};
use concierge_store::app_config::{FailurePolicy, InsightMode, RateLimitConfig};
use concierge_store::memory::{
    MemoryAnalyticsSink, MemoryCacheStore, MemoryInsightStore, MemoryRateLimiter,
};
use concierge_store::Backends;

struct TestApp {
    router: Router,
    analytics: Arc<MemoryAnalyticsSink>,
    insights: Arc<MemoryInsightStore>,
}

struct Options {
    quote_client: Option<Arc<dyn QuoteClient>>,
    policy: FailurePolicy,
    llm: Option<Arc<dyn LlmClient>>,
    settings: SearchSettings,
    rate_limit: RateLimitConfig,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            quote_client: None,
            policy: FailurePolicy::Fallback,
            llm: None,
            settings: SearchSettings::default(),
            rate_limit: RateLimitConfig {
                requests: 1000,
                window_seconds: 60,
                ..RateLimitConfig::default()
            },
        }
    }
}

fn test_app(options: Options) -> TestApp {
    let analytics = Arc::new(MemoryAnalyticsSink::new(100));
    let insights = Arc::new(MemoryInsightStore::new(100));
    let backends = Backends {
        cache: Arc::new(MemoryCacheStore::new()),
        analytics: analytics.clone(),
        insights: insights.clone(),
        rate_limiter: Arc::new(MemoryRateLimiter::new()),
    };

    let search = SearchOrchestrator::new(
        backends.cache.clone(),
        Arc::new(QuoteAdapter::new(options.quote_client, options.policy)),
        Arc::new(EnrichmentService::new(options.llm)),
        backends.insights.clone(),
        backends.analytics.clone(),
        options.settings,
    );

    let state = AppState {
        search: Arc::new(search),
        backends,
        rate_limit: options.rate_limit,
    };

    TestApp { router: app(state), analytics, insights }
}

struct DownProvider;

#[async_trait]
impl QuoteClient for DownProvider {
    async fn search(&self, _request: &SearchRequest) -> Result<Vec<FlightOffer>, QuoteError> {
        Err(QuoteError::Status(503))
    }
}

struct UnreachableSink;

#[async_trait]
impl AnalyticsSink for UnreachableSink {
    async fn record(&self, _record: &SearchAnalyticsRecord) -> Result<(), RepositoryError> {
        Err("connection reset".into())
    }

    async fn recent(
        &self,
        _user_id: Option<&str>,
        _limit: usize,
    ) -> Result<Vec<SearchAnalyticsRecord>, RepositoryError> {
        Err("connection reset".into())
    }

    async fn ping(&self) -> bool {
        false
    }
}

struct ScriptedLlm;

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, _messages: &[ChatMessage]) -> Result<String, LlmError> {
        Ok("Thoughts:\n- Morning departures are cheapest\n- We recommend the first direct flight".to_string())
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn jfk_lhr() -> Value {
    json!({
        "origin": "JFK",
        "destination": "LHR",
        "departure_date": "2025-06-01",
        "trip_type": "one_way"
    })
}

async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

#[tokio::test]
async fn test_search_without_provider_serves_mock_offers() {
    let app = test_app(Options::default());

    let (status, body) = send(&app.router, post_json("/api/search-flights", jfk_lhr())).await;

    assert_eq!(status, StatusCode::OK);
    let flights = body["flights"].as_array().unwrap();
    assert!(!flights.is_empty());
    assert_eq!(body["search_metadata"]["cached"], json!(false));
    assert_eq!(body["search_metadata"]["offer_source"], json!("mock"));
    assert_eq!(body["search_metadata"]["results_count"], json!(flights.len()));
    assert_eq!(body["search_metadata"]["passengers"]["adults"], json!(1));
    assert_eq!(body["search_metadata"]["currency"], json!("USD"));
    assert!(body["ai_insights"].is_null());
    assert!(flights.iter().all(|f| f.get("inbound_segments").is_none()));
}

#[tokio::test]
async fn test_repeat_search_is_served_from_cache() {
    let app = test_app(Options::default());

    let (_, first) = send(&app.router, post_json("/api/search-flights", jfk_lhr())).await;
    let (status, second) = send(&app.router, post_json("/api/search-flights", jfk_lhr())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["search_metadata"]["cached"], json!(true));
    assert_eq!(second["search_metadata"]["offer_source"], json!("cache"));
    assert_eq!(first["flights"].to_string(), second["flights"].to_string());
    assert_ne!(first["search_id"], second["search_id"]);
}

#[tokio::test]
async fn test_missing_departure_date_is_rejected() {
    let app = test_app(Options::default());

    let body = json!({ "origin": "JFK", "destination": "LHR", "trip_type": "one_way" });
    let (status, body) = send(&app.router, post_json("/api/search-flights", body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("departure_date"));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(app.analytics.len().await, 0);
}

#[tokio::test]
async fn test_semantic_validation_failures_are_bad_requests() {
    let app = test_app(Options::default());

    let same_airport = json!({
        "origin": "JFK",
        "destination": "jfk",
        "departure_date": "2025-06-01"
    });
    let (status, _) = send(&app.router, post_json("/api/search-flights", same_airport)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let round_trip_without_return = json!({
        "origin": "JFK",
        "destination": "LHR",
        "departure_date": "2025-06-01",
        "trip_type": "round_trip"
    });
    let (status, body) =
        send(&app.router, post_json("/api/search-flights", round_trip_without_return)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("return_date"));
}

#[tokio::test]
async fn test_oversized_passenger_counts_are_rejected() {
    let app = test_app(Options::default());

    let body = json!({
        "origin": "JFK",
        "destination": "LHR",
        "departure_date": "2025-06-01",
        "adults": 4294967295u32,
        "children": 1
    });
    let (status, body) = send(&app.router, post_json("/api/search-flights", body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("at most 9 passengers"));
}

#[tokio::test]
async fn test_offers_are_sorted_with_best_deal_first() {
    let app = test_app(Options::default());

    let mut request = jfk_lhr();
    request["budget"] = json!(450.0);
    let (status, body) = send(&app.router, post_json("/api/search-flights", request)).await;
    assert_eq!(status, StatusCode::OK);

    let flights = body["flights"].as_array().unwrap();
    let prices: Vec<f64> = flights.iter().map(|f| f["price"].as_f64().unwrap()).collect();
    assert!(prices.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(body["best_deal"], flights[0]);
    assert_eq!(body["alternatives"], json!([flights[1], flights[2]]));
}

#[tokio::test]
async fn test_flight_insights_on_demand() {
    let app = test_app(Options::default());

    let (status, body) = send(
        &app.router,
        get("/api/flight-insights?source=jfk&destination=cdg&date=2025-06-01&passengers=2"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], json!("fallback"));
    assert!(body["insights"][0].as_str().unwrap().contains("from JFK to CDG"));
    let total = body["statistics"]["total_options"].as_u64().unwrap();
    assert!((5..=8).contains(&total));
    assert!(body["statistics"]["min_price"].as_f64().unwrap() > 0.0);

    let (status, _) =
        send(&app.router, get("/api/flight-insights?source=JFK&destination=CDG")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app.router,
        get("/api/flight-insights?source=JFK&destination=JFK&date=2025-06-01"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(app.analytics.len().await, 0);
}

#[tokio::test]
async fn test_round_trip_offers_carry_inbound_segments() {
    let app = test_app(Options::default());

    let body = json!({
        "origin": "JFK",
        "destination": "LHR",
        "departure_date": "2025-06-01",
        "return_date": "2025-06-08",
        "trip_type": "round_trip",
        "adults": 2
    });
    let (status, body) = send(&app.router, post_json("/api/search-flights", body)).await;

    assert_eq!(status, StatusCode::OK);
    for flight in body["flights"].as_array().unwrap() {
        let inbound = flight["inbound_segments"].as_array().unwrap();
        assert!(!inbound.is_empty());
        assert_eq!(inbound[0]["origin"], json!("LHR"));
    }
}

#[tokio::test]
async fn test_deferred_insights_become_available() {
    let app = test_app(Options::default());

    let (_, body) = send(&app.router, post_json("/api/search-flights", jfk_lhr())).await;
    let search_id: uuid::Uuid = serde_json::from_value(body["search_id"].clone()).unwrap();
    let results = body["search_metadata"]["results_count"].clone();

    let insights = app.insights.clone();
    eventually(|| {
        let insights = insights.clone();
        async move { insights.get(search_id).await.unwrap().is_some() }
    })
    .await;

    let (status, insight) = send(&app.router, get(&format!("/api/ai-insights/{}", search_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(insight["source"], json!("fallback"));
    assert_eq!(insight["price_analysis"]["statistics"]["total_options"], results);
}

#[tokio::test]
async fn test_unknown_insight_gets_placeholder() {
    let app = test_app(Options::default());
    let search_id = uuid::Uuid::new_v4();

    let (status, body) = send(&app.router, get(&format!("/api/ai-insights/{}", search_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["search_id"], json!(search_id.to_string()));
    assert_eq!(body["source"], json!("fallback"));

    let (status, _) = send(&app.router, get("/api/ai-insights/not-a-uuid")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_inline_insights_from_model() {
    let app = test_app(Options {
        llm: Some(Arc::new(ScriptedLlm)),
        settings: SearchSettings {
            insight_mode: InsightMode::Inline,
            ..SearchSettings::default()
        },
        ..Options::default()
    });

    let (status, body) = send(&app.router, post_json("/api/search-flights", jfk_lhr())).await;

    assert_eq!(status, StatusCode::OK);
    let insight = &body["ai_insights"];
    assert_eq!(insight["source"], json!("llm"));
    assert_eq!(insight["insights"], json!(["Morning departures are cheapest"]));
    assert_eq!(
        insight["recommendations"],
        json!(["We recommend the first direct flight"])
    );
}

#[tokio::test]
async fn test_provider_failure_falls_back_to_mock() {
    let app = test_app(Options {
        quote_client: Some(Arc::new(DownProvider)),
        ..Options::default()
    });

    let (status, body) = send(&app.router, post_json("/api/search-flights", jfk_lhr())).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body["flights"].as_array().unwrap().is_empty());
    assert_eq!(body["search_metadata"]["offer_source"], json!("mock"));
}

#[tokio::test]
async fn test_strict_policy_reports_bad_gateway() {
    let app = test_app(Options {
        quote_client: Some(Arc::new(DownProvider)),
        policy: FailurePolicy::Strict,
        ..Options::default()
    });

    let (status, body) = send(&app.router, post_json("/api/search-flights", jfk_lhr())).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["detail"].as_str().unwrap().contains("503"));
}

#[tokio::test]
async fn test_search_analytics_listing() {
    let app = test_app(Options::default());

    let request = Request::builder()
        .method("POST")
        .uri("/api/search-flights")
        .header("content-type", "application/json")
        .header("x-user-id", "traveller-42")
        .header("x-forwarded-for", "198.51.100.4")
        .body(Body::from(jfk_lhr().to_string()))
        .unwrap();
    let (status, _) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);

    let analytics = app.analytics.clone();
    eventually(|| {
        let analytics = analytics.clone();
        async move { analytics.len().await == 1 }
    })
    .await;

    let (status, body) =
        send(&app.router, get("/api/search-analytics?user_id=traveller-42&limit=5")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], json!(1));
    let record = &body["analytics"][0];
    assert_eq!(record["ip_address"], json!("198.51.100.4"));
    assert_eq!(record["cached"], json!(false));
    assert_eq!(record["search_params"]["origin"], json!("JFK"));

    let (_, body) = send(&app.router, get("/api/search-analytics?user_id=someone-else")).await;
    assert_eq!(body["count"], json!(0));
    assert_eq!(app.analytics.recent(None, 10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_analytics_store_failure_is_internal_error() {
    let backends = Backends {
        analytics: Arc::new(UnreachableSink),
        ..Backends::in_memory(10, 10)
    };
    let search = SearchOrchestrator::new(
        backends.cache.clone(),
        Arc::new(QuoteAdapter::new(None, FailurePolicy::Fallback)),
        Arc::new(EnrichmentService::new(None)),
        backends.insights.clone(),
        backends.analytics.clone(),
        SearchSettings::default(),
    );
    let router = app(AppState {
        search: Arc::new(search),
        backends,
        rate_limit: RateLimitConfig::default(),
    });

    let (status, body) = send(&router, get("/api/search-analytics")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], json!("Internal Server Error"));
    assert_eq!(body["detail"], json!("connection reset"));
}

#[tokio::test]
async fn test_health_and_directory_endpoints() {
    let app = test_app(Options::default());

    let (status, body) = send(&app.router, get("/api/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("healthy"));
    assert_eq!(body["services"]["api"], json!(true));
    assert_eq!(body["services"]["cache"], json!(true));
    assert_eq!(body["services"]["llm"], json!(false));
    assert_eq!(body["services"]["quotes"], json!(false));

    let (status, body) = send(&app.router, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["version"].is_string());

    let (_, body) = send(&app.router, get("/api/airports")).await;
    assert_eq!(body["airports"].as_array().unwrap().len(), 15);

    let (_, body) = send(&app.router, get("/api/airports/search?query=london")).await;
    assert_eq!(body["airports"][0]["code"], json!("LHR"));

    let (_, body) = send(&app.router, get("/api/popular-routes")).await;
    let routes = body["popular_routes"].as_array().unwrap();
    assert_eq!(routes.len(), 5);
    assert_eq!(routes[0]["source"], json!("JFK"));
    assert_eq!(routes[0]["destination"], json!("LHR"));
}

#[tokio::test]
async fn test_rate_limit_rejects_excess_requests() {
    let app = test_app(Options {
        rate_limit: RateLimitConfig {
            requests: 2,
            window_seconds: 60,
            ..RateLimitConfig::default()
        },
        ..Options::default()
    });

    assert_eq!(send(&app.router, get("/api/health")).await.0, StatusCode::OK);
    assert_eq!(send(&app.router, get("/api/health")).await.0, StatusCode::OK);

    let (status, body) = send(&app.router, get("/api/health")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], json!("Rate limit exceeded"));
}

#[tokio::test]
async fn test_rate_limit_keys_on_peer_not_forwarded_header() {
    let app = test_app(Options {
        rate_limit: RateLimitConfig {
            requests: 2,
            window_seconds: 60,
            ..RateLimitConfig::default()
        },
        ..Options::default()
    });

    let from_peer = |peer: [u8; 4], forwarded: &str| {
        Request::builder()
            .uri("/api/health")
            .header("x-forwarded-for", forwarded)
            .extension(ConnectInfo(SocketAddr::from((peer, 40000))))
            .body(Body::empty())
            .unwrap()
    };

    let mut statuses = Vec::new();
    for n in 1..=5 {
        let request = from_peer([203, 0, 113, 5], &format!("198.51.100.{}", n));
        statuses.push(send(&app.router, request).await.0);
    }
    assert_eq!(
        statuses,
        vec![
            StatusCode::OK,
            StatusCode::OK,
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::TOO_MANY_REQUESTS,
        ]
    );

    let other = from_peer([203, 0, 113, 6], "198.51.100.1");
    assert_eq!(send(&app.router, other).await.0, StatusCode::OK);
}

#[tokio::test]
async fn test_trusted_proxy_forwards_client_address() {
    let app = test_app(Options {
        rate_limit: RateLimitConfig {
            requests: 1,
            window_seconds: 60,
            trusted_proxies: vec!["10.0.0.2".to_string()],
            ..RateLimitConfig::default()
        },
        ..Options::default()
    });

    let via_proxy = |forwarded: &str| {
        Request::builder()
            .uri("/api/health")
            .header("x-forwarded-for", forwarded)
            .extension(ConnectInfo(SocketAddr::from(([10, 0, 0, 2], 40000))))
            .body(Body::empty())
            .unwrap()
    };

    assert_eq!(send(&app.router, via_proxy("198.51.100.1")).await.0, StatusCode::OK);
    assert_eq!(send(&app.router, via_proxy("198.51.100.2")).await.0, StatusCode::OK);
    assert_eq!(
        send(&app.router, via_proxy("198.51.100.1")).await.0,
        StatusCode::TOO_MANY_REQUESTS
    );
}
