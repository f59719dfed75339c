//! HTTP-level tests for the dashboard API router.
//!
//! Requests go through `routes::routes()` with in-memory collaborators behind
//! the license store, token verifier, count provider, and billing seams. The
//! pool is lazy and never connects.

#![allow(clippy::unwrap_used)]

use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Request, StatusCode};
use brickyard_app::billing::webhook::sign;
use brickyard_app::billing::{
    BillingError, BillingGateway, CheckoutSessionRequest, CreatedSession,
};
use brickyard_app::config::{
    AppConfig, AuthConfig, BillingConfig, PlacesConfig, PropertyRecordsConfig,
};
use brickyard_app::crypto::SecretCodec;
use brickyard_app::db::licenses::GrantParams;
use brickyard_app::db::{AssetTypeRepository, LicenseStore, RepositoryError};
use brickyard_app::providers::{CountProvider, CountQuery, ProviderError};
use brickyard_app::routes;
use brickyard_app::services::{
    AssetTypeCatalog, AuthError, AuthUser, LicenseCheckout, Pricing, SearchAggregator,
    TokenVerifier,
};
use brickyard_app::state::{AppParts, AppState};
use brickyard_core::{AssetType, License, LicenseId, UserId};
use chrono::Utc;
use secrecy::SecretString;
use serde_json::{Value, json};
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

const USER: &str = "0b7e2f4a-9c1d-4e8f-a2b3-c4d5e6f7a8b9";
const TOKEN: &str = "dashboard-session-token";
const WEBHOOK_SECRET: &str = "whsec_routes_5Tq9xR2m";

const ADA: &str = "county:Ada County:ID";
const ADA_QUERY: &str = "county:Ada%20County:ID";

// =============================================================================
// Collaborators
// =============================================================================

struct Catalog;

#[async_trait]
impl AssetTypeCatalog for Catalog {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<AssetType>, RepositoryError> {
        Ok((slug == "industrial").then(|| AssetType {
            slug: slug.to_string(),
            name: "Industrial".to_string(),
            use_codes: vec![238, 239],
        }))
    }
}

/// Count provider returning a fixed count and recording how often it is asked.
struct CountingProvider {
    count: u64,
    calls: AtomicUsize,
}

impl CountingProvider {
    fn new(count: u64) -> Arc<Self> {
        Arc::new(Self {
            count,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CountProvider for CountingProvider {
    async fn estimate_count(&self, _query: &CountQuery<'_>) -> Result<u64, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.count)
    }
}

/// Billing gateway that remembers the last session it opened.
#[derive(Default)]
struct RecordingBilling {
    opened: Mutex<Option<CheckoutSessionRequest>>,
}

#[async_trait]
impl BillingGateway for RecordingBilling {
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CreatedSession, BillingError> {
        *self.opened.lock().unwrap() = Some(request.clone());
        Ok(CreatedSession {
            id: "cs_route_1".to_string(),
            url: None,
        })
    }
}

impl RecordingBilling {
    /// The `checkout.session.completed` event the provider would send.
    fn paid_event(&self) -> String {
        let opened = self.opened.lock().unwrap();
        let request = opened.as_ref().unwrap();
        json!({
            "id": "evt_route_1",
            "type": "checkout.session.completed",
            "data": {"object": {
                "id": "cs_route_1",
                "object": "checkout.session",
                "payment_status": "paid",
                "metadata": {
                    "user_id": request.user_id.to_string(),
                    "location": request.location,
                    "asset_types": request.asset_types.join(","),
                }
            }}
        })
        .to_string()
    }
}

/// License rows with the same uniqueness as the `license` table.
#[derive(Default)]
struct MemoryLicenses(Mutex<Vec<License>>);

impl MemoryLicenses {
    fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }
}

#[async_trait]
impl LicenseStore for MemoryLicenses {
    async fn list_for_user(
        &self,
        user_id: UserId,
        asset_type_slug: Option<&str>,
    ) -> Result<Vec<License>, RepositoryError> {
        Ok(self
            .0
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.user_id == user_id)
            .filter(|l| asset_type_slug.is_none_or(|slug| l.asset_type_slug == slug))
            .cloned()
            .collect())
    }

    async fn grant(&self, params: &GrantParams<'_>) -> Result<u64, RepositoryError> {
        let mut rows = self.0.lock().unwrap();
        let mut created = 0;
        for slug in params.asset_type_slugs {
            let exists = rows.iter().any(|l| {
                l.user_id == params.user_id
                    && l.asset_type_slug == *slug
                    && l.location_internal_id == params.location_internal_id
            });
            if !exists {
                let id = i32::try_from(rows.len()).unwrap() + 1;
                rows.push(License {
                    id: LicenseId::new(id),
                    user_id: params.user_id,
                    asset_type_slug: slug.clone(),
                    location_internal_id: params.location_internal_id.to_string(),
                    checkout_session_id: params.checkout_session_id.map(str::to_string),
                    created_at: Utc::now(),
                });
                created += 1;
            }
        }
        Ok(created)
    }
}

struct StaticTokens;

#[async_trait]
impl TokenVerifier for StaticTokens {
    async fn verify(&self, token: &str) -> Result<AuthUser, AuthError> {
        if token == TOKEN {
            Ok(AuthUser {
                id: UserId::parse(USER).unwrap(),
                email: Some("broker@example.test".to_string()),
            })
        } else {
            Err(AuthError::InvalidToken)
        }
    }
}

// =============================================================================
// Harness
// =============================================================================

struct Harness {
    app: Router,
    records: Arc<CountingProvider>,
    billing: Arc<RecordingBilling>,
    licenses: Arc<MemoryLicenses>,
}

fn config() -> AppConfig {
    let secret = |value: &str| SecretString::from(value.to_string());
    AppConfig {
        database_url: secret("postgres://brickyard@localhost/brickyard_test"),
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 3000,
        base_url: "https://app.test".to_string(),
        encryption_secret: None,
        auth: AuthConfig {
            url: "https://auth.test".to_string(),
            anon_key: secret("anon"),
        },
        places: PlacesConfig {
            base_url: "https://places.test".to_string(),
            api_key: secret("places"),
        },
        property_records: PropertyRecordsConfig {
            base_url: "https://records.test".to_string(),
            api_key: secret("records"),
        },
        billing: BillingConfig {
            api_base_url: "https://billing.test".to_string(),
            secret_key: secret("sk_test_routes"),
            webhook_secret: secret(WEBHOOK_SECRET),
            price_per_record_cents: 25,
            minimum_charge_cents: 100,
            currency: "usd".to_string(),
        },
        sentry_dsn: None,
        sentry_environment: None,
        sentry_traces_sample_rate: 0.0,
    }
}

fn harness() -> Harness {
    let config = config();
    let pool = PgPoolOptions::new()
        .connect_lazy("postgres://brickyard@localhost/brickyard_test")
        .unwrap();

    let catalog = Arc::new(Catalog);
    let records = CountingProvider::new(57);
    let billing = Arc::new(RecordingBilling::default());
    let licenses = Arc::new(MemoryLicenses::default());

    let state = AppState::from_parts(AppParts {
        codec: SecretCodec::new(Some(&SecretString::from("route test passphrase 3d9a")))
            .unwrap(),
        asset_types: AssetTypeRepository::new(pool.clone()),
        licenses: licenses.clone(),
        search: SearchAggregator::new(catalog.clone(), CountingProvider::new(3), records.clone()),
        checkout: LicenseCheckout::new(
            billing.clone(),
            catalog,
            Pricing::from(&config.billing),
            &config.base_url,
        ),
        auth: Arc::new(StaticTokens),
        config,
        pool,
    });

    Harness {
        app: routes::routes().with_state(state),
        records,
        billing,
        licenses,
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri)
        .header(AUTHORIZATION, format!("Bearer {TOKEN}"))
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header(AUTHORIZATION, format!("Bearer {TOKEN}"))
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn webhook(payload: &str, signature: Option<&str>) -> Request<Body> {
    let mut builder = Request::post("/webhooks/stripe").header(CONTENT_TYPE, "application/json");
    if let Some(signature) = signature {
        builder = builder.header("stripe-signature", signature);
    }
    builder.body(Body::from(payload.to_string())).unwrap()
}

fn signature_for(payload: &str) -> String {
    let now = Utc::now().timestamp();
    let v1 = sign(WEBHOOK_SECRET, &now.to_string(), payload).unwrap();
    format!("t={now},v1={v1}")
}

// =============================================================================
// Search
// =============================================================================

#[tokio::test]
async fn test_search_requires_bearer_token() {
    let h = harness();
    let request = Request::get(format!(
        "/api/search?assetType=industrial&location={ADA_QUERY}"
    ))
    .body(Body::empty())
    .unwrap();

    let (status, body) = send(&h.app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({"error": "Unauthorized"}));
    assert_eq!(h.records.calls(), 0);
}

#[tokio::test]
async fn test_paywall_summary_served_from_cache() {
    let h = harness();
    let uri = format!("/api/search?assetType=industrial&location={ADA_QUERY}");

    let (status, first) = send(&h.app, get(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        first,
        json!({
            "status": "unlicensed",
            "resultCount": 57,
            "formattedLocation": "Ada County, ID",
            "assetTypeName": "Industrial",
            "internalId": ADA,
        })
    );

    let (_, second) = send(&h.app, get(&uri)).await;
    assert_eq!(second, first);
    assert_eq!(h.records.calls(), 1);

    // Different location, different key
    send(&h.app, get("/api/search?assetType=industrial&location=state:ID")).await;
    assert_eq!(h.records.calls(), 2);
}

#[tokio::test]
async fn test_unknown_asset_type_is_not_found() {
    let h = harness();
    let (status, body) = send(
        &h.app,
        get("/api/search?assetType=no-such-type&location=state:ID"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Unknown asset type"}));
}

// =============================================================================
// Checkout
// =============================================================================

#[tokio::test]
async fn test_checkout_rejects_every_invalid_field() {
    let h = harness();
    let (status, body) = send(
        &h.app,
        post_json(
            "/api/checkout",
            &json!({
                "location": "nowhere",
                "assetTypes": ["no-such-type"],
                "resultCount": 0,
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let fields: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["location", "resultCount", "assetTypes"]);
    assert!(h.billing.opened.lock().unwrap().is_none());
}

// =============================================================================
// Paywall -> checkout -> webhook -> licensed
// =============================================================================

#[tokio::test]
async fn test_paid_webhook_unlocks_search() {
    let h = harness();
    let search_uri = format!("/api/search?assetType=industrial&location={ADA_QUERY}");

    let (_, paywall) = send(&h.app, get(&search_uri)).await;
    assert_eq!(paywall["status"], "unlicensed");

    let (status, session) = send(
        &h.app,
        post_json(
            "/api/checkout",
            &json!({
                "location": ADA,
                "assetTypes": ["industrial"],
                "resultCount": paywall["resultCount"],
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session, json!({"sessionId": "cs_route_1"}));
    assert_eq!(
        h.billing.opened.lock().unwrap().as_ref().unwrap().amount_cents,
        57 * 25
    );

    // Delivered twice; the second delivery grants nothing new
    let payload = h.billing.paid_event();
    let signature = signature_for(&payload);
    let (status, first) = send(&h.app, webhook(&payload, Some(&signature))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first, json!({"received": true, "granted": 1}));
    let (_, replay) = send(&h.app, webhook(&payload, Some(&signature))).await;
    assert_eq!(replay, json!({"received": true, "granted": 0}));
    assert_eq!(h.licenses.len(), 1);

    // The cached paywall summary does not mask the new license
    let (status, licensed) = send(&h.app, get(&search_uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        licensed,
        json!({
            "status": "licensed",
            "assetTypeSlug": "industrial",
            "internalId": ADA,
        })
    );
    assert_eq!(h.records.calls(), 1);

    let (status, split) = send(
        &h.app,
        get(&format!(
            "/api/licenses?assetType=industrial&locations={ADA_QUERY},state:ID"
        )),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        split,
        json!({
            "assetType": "industrial",
            "locations": [
                {"location": ADA, "state": "licensed"},
                {"location": "state:ID", "state": "no_license"},
            ],
            "unlicensed": ["state:ID"],
        })
    );
}

// =============================================================================
// Webhook rejection
// =============================================================================

#[tokio::test]
async fn test_webhook_rejects_unsigned_and_forged_events() {
    let h = harness();
    let payload = json!({
        "id": "evt_forged",
        "type": "checkout.session.completed",
        "data": {"object": {
            "id": "cs_forged",
            "payment_status": "paid",
            "metadata": {
                "user_id": USER,
                "location": ADA,
                "asset_types": "industrial",
            }
        }}
    })
    .to_string();

    let (status, _) = send(&h.app, webhook(&payload, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let forged = format!("t={},v1={}", Utc::now().timestamp(), "0".repeat(64));
    let (status, body) = send(&h.app, webhook(&payload, Some(&forged))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Invalid signature"}));

    let ancient = format!("t={},v1={}", i64::MIN, "0".repeat(64));
    let (status, _) = send(&h.app, webhook(&payload, Some(&ancient))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(h.licenses.len(), 0);
}

#[tokio::test]
async fn test_webhook_acknowledges_unrelated_events() {
    let h = harness();
    let payload = json!({
        "id": "evt_invoice",
        "type": "invoice.paid",
        "data": {"object": {"id": "in_1"}}
    })
    .to_string();

    let (status, body) = send(&h.app, webhook(&payload, Some(&signature_for(&payload)))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"received": true}));
    assert_eq!(h.licenses.len(), 0);
}
