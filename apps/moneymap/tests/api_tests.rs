//! Integration tests for the MoneyMap HTTP API.
//!
//! Uses axum-test against an in-memory store and a capturing mailer.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use axum::http::StatusCode;
use axum_test::TestServer;
use moneymap::api::{ApiSettings, AppState, router};
use moneymap::mail::{Mailer, OutgoingMail, RESET_SUBJECT};
use moneymap_core::{EntryKind, FieldCipher, Money, Store, UserId, Vault};
use serde_json::{Value, json};
use std::num::NonZeroU32;
use std::sync::{Arc, Mutex};

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

const KEY: [u8; 32] = [7; 32];

struct Harness {
    server: TestServer,
    vault: Arc<Vault>,
    outbox: Arc<Mutex<Vec<OutgoingMail>>>,
}

fn harness_with(settings: ApiSettings) -> Harness {
    let vault = Vault::new(Store::in_memory().unwrap(), FieldCipher::new(&KEY).unwrap())
        .with_hash_iterations(NonZeroU32::new(1_000).unwrap());
    let (mailer, outbox) = Mailer::capture();
    let state = AppState::new(vault, &settings, mailer);
    let vault = state.vault.clone();
    Harness {
        server: TestServer::new(router(state)).unwrap(),
        vault,
        outbox,
    }
}

fn harness() -> Harness {
    harness_with(ApiSettings::new("test-secret"))
}

async fn signup(server: &TestServer, email: &str) -> u64 {
    let response = server
        .post("/signup")
        .json(&json!({ "email": email, "password": "password123" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()["user_id"].as_u64().unwrap()
}

async fn login(server: &TestServer, email: &str, password: &str) -> String {
    let response = server
        .post("/login")
        .json(&json!({ "email": email, "password": password }))
        .await;
    response.assert_status_ok();
    response.json::<Value>()["access_token"]
        .as_str()
        .unwrap()
        .to_string()
}

async fn user(server: &TestServer, email: &str) -> (u64, String) {
    let id = signup(server, email).await;
    let token = login(server, email, "password123").await;
    (id, token)
}

fn msg(response: &axum_test::TestResponse) -> String {
    response.json::<Value>()["msg"].as_str().unwrap().to_string()
}

// =============================================================================
// HEALTH AND SIGNUP
// =============================================================================

#[tokio::test]
async fn test_health() {
    let h = harness();
    let response = h.server.get("/api/health").await;
    response.assert_status_ok();
    response.assert_json(&json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_signup_with_profile_fields() {
    let h = harness();
    let response = h
        .server
        .post("/signup")
        .json(&json!({
            "email": "ana@example.com",
            "password": "password123",
            "name": "Ana Silva",
            "age": "34",
            "annualIncome": 60000,
            "riskTolerance": "aggressive",
            "currentSavings": "1500.50",
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    assert_eq!(msg(&response), "User created successfully");
    let id = UserId(response.json::<Value>()["user_id"].as_u64().unwrap());
    let stored = h.vault.preferences(id).unwrap().unwrap();
    assert_eq!(stored.current_savings, Some(Money::from_cents(150_050)));

    let token = login(&h.server, "ana@example.com", "password123").await;
    let profile = h
        .server
        .get("/profile")
        .authorization_bearer(&token)
        .await
        .json::<Value>();
    assert_eq!(profile["email"], "ana@example.com");
    assert_eq!(profile["full_name"], "Ana Silva");
    assert_eq!(profile["age"], 34);
    assert_eq!(profile["annual_income"], json!(60000.0));
    assert_eq!(profile["risk_tolerance"], "aggressive");

    let prefs = h
        .server
        .get("/user-preferences")
        .authorization_bearer(&token)
        .await
        .json::<Value>();
    assert_eq!(prefs["current_savings"], json!(1500.5));
    assert_eq!(prefs["monthly_expenses"], Value::Null);
}

#[tokio::test]
async fn test_signup_validation_messages() {
    let h = harness();
    let cases = [
        (json!({ "password": "password123" }), StatusCode::BAD_REQUEST, "Missing email/username or password"),
        (json!({ "email": "a@example.com", "password": "password123", "age": 17 }), StatusCode::BAD_REQUEST, "Age must be between 18 and 100"),
        (json!({ "email": "a@example.com", "password": "password123", "age": "old" }), StatusCode::BAD_REQUEST, "Invalid age format"),
        (json!({ "email": "a@example.com", "password": "password123", "annualIncome": -5 }), StatusCode::BAD_REQUEST, "Annual income cannot be negative"),
        (json!({ "email": "a@example.com", "password": "password123", "annualIncome": "lots" }), StatusCode::BAD_REQUEST, "Invalid annual income format"),
        (json!({ "email": "a@example.com", "password": "short" }), StatusCode::BAD_REQUEST, "Password must be at least 8 characters long"),
    ];
    for (body, status, expected) in cases {
        let response = h.server.post("/signup").json(&body).await;
        response.assert_status(status);
        assert_eq!(msg(&response), expected);
    }

    // A body that is not JSON at all reads as empty.
    let response = h.server.post("/signup").text("garbage").await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(msg(&response), "Missing email/username or password");
}

#[tokio::test]
async fn test_duplicate_signup_conflicts() {
    let h = harness();
    signup(&h.server, "ana@example.com").await;
    let response = h
        .server
        .post("/signup")
        .json(&json!({ "email": "ANA@example.com", "password": "password123", "age": 5 }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    assert_eq!(msg(&response), "Email already exists");

    let response = h
        .server
        .post("/signup")
        .json(&json!({ "email": "Ana@Example.com", "password": "password123", "currentSavings": 10 }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    assert_eq!(h.vault.preferences(UserId(2)).unwrap(), None);
}

// =============================================================================
// LOGIN AND LOGOUT
// =============================================================================

#[tokio::test]
async fn test_bad_credentials_look_the_same() {
    let h = harness();
    signup(&h.server, "ana@example.com").await;

    let wrong = h
        .server
        .post("/login")
        .json(&json!({ "email": "ana@example.com", "password": "nope-nope" }))
        .await;
    let unknown = h
        .server
        .post("/login")
        .json(&json!({ "email": "who@example.com", "password": "nope-nope" }))
        .await;
    wrong.assert_status(StatusCode::UNAUTHORIZED);
    unknown.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.json::<Value>(), unknown.json::<Value>());
    assert_eq!(msg(&wrong), "Bad credentials");
}

#[tokio::test]
async fn test_protected_routes_need_a_token() {
    let h = harness();
    let response = h.server.get("/profile").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(msg(&response), "Missing Authorization Header");

    let response = h.server.get("/profile").authorization_bearer("not.a.jwt").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(msg(&response), "Invalid token");
}

#[tokio::test]
async fn test_logout_revokes_token() {
    let h = harness();
    let (_, token) = user(&h.server, "ana@example.com").await;

    let response = h.server.post("/logout").authorization_bearer(&token).await;
    response.assert_status_ok();
    assert_eq!(msg(&response), "Successfully logged out");

    let response = h.server.get("/profile").authorization_bearer(&token).await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(msg(&response), "Token has been revoked");

    // A fresh login still works.
    let token = login(&h.server, "ana@example.com", "password123").await;
    h.server
        .get("/profile")
        .authorization_bearer(&token)
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_login_is_rate_limited_per_account() {
    let mut settings = ApiSettings::new("test-secret");
    settings.auth_rate_per_minute = NonZeroU32::new(2).unwrap();
    let h = harness_with(settings);
    signup(&h.server, "ana@example.com").await;

    let body = json!({ "email": "ana@example.com", "password": "wrong-pass" });
    h.server.post("/login").json(&body).await.assert_status(StatusCode::UNAUTHORIZED);
    h.server.post("/login").json(&body).await.assert_status(StatusCode::UNAUTHORIZED);
    h.server
        .post("/login")
        .json(&body)
        .await
        .assert_status(StatusCode::TOO_MANY_REQUESTS);

    h.server
        .post("/login")
        .json(&json!({ "email": "bo@example.com", "password": "whatever1" }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

// =============================================================================
// PROFILE AND PREFERENCES
// =============================================================================

#[tokio::test]
async fn test_profile_partial_update() {
    let h = harness();
    let (_, token) = user(&h.server, "ana@example.com").await;

    let response = h
        .server
        .put("/profile")
        .authorization_bearer(&token)
        .json(&json!({
            "full_name": "Ana",
            "email": "ignored@example.com",
            "phone": null,
            "annual_income": "72000.25",
            "monthly_expenses": 2100,
        }))
        .await;
    response.assert_status_ok();

    let profile = h
        .server
        .get("/profile")
        .authorization_bearer(&token)
        .await
        .json::<Value>();
    assert_eq!(profile["full_name"], "Ana");
    assert_eq!(profile["email"], "ana@example.com");
    assert_eq!(profile["phone"], Value::Null);
    assert_eq!(profile["annual_income"], json!(72000.25));

    let prefs = h
        .server
        .get("/user-preferences")
        .authorization_bearer(&token)
        .await
        .json::<Value>();
    assert_eq!(prefs["monthly_expenses"], json!(2100.0));

    let response = h
        .server
        .put("/profile")
        .authorization_bearer(&token)
        .json(&json!({ "phone": null }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(msg(&response), "No fields to update");
}

#[tokio::test]
async fn test_preferences_update_and_budget_range() {
    let h = harness();
    let (_, token) = user(&h.server, "ana@example.com").await;

    let response = h
        .server
        .put("/user-preferences")
        .authorization_bearer(&token)
        .json(&json!({
            "emergency_fund_target": 10000,
            "emergency_goal": "six months",
            "budget_food_percent": "15.5",
            "user_id": 99,
        }))
        .await;
    response.assert_status_ok();

    let prefs = h
        .server
        .get("/user-preferences")
        .authorization_bearer(&token)
        .await
        .json::<Value>();
    assert_eq!(prefs["emergency_fund_target"], json!(10000.0));
    assert_eq!(prefs["emergency_goal"], "six months");
    assert_eq!(prefs["budget_food_percent"], json!(15.5));

    let response = h
        .server
        .put("/user-preferences")
        .authorization_bearer(&token)
        .json(&json!({ "budget_housing_percent": 150 }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(msg(&response), "budget_housing_percent must be between 0 and 100");
}

// =============================================================================
// MARKET AND WATCHLIST
// =============================================================================

fn tickers(body: &Value) -> Vec<String> {
    body["recommendations"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["ticker"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_recommendations_follow_risk_tolerance() {
    let h = harness();
    let (_, token) = user(&h.server, "ana@example.com").await;

    // Unset tolerance reads as level 5.
    let body = h
        .server
        .get("/stock-recommendations")
        .authorization_bearer(&token)
        .await
        .json::<Value>();
    assert_eq!(body["risk_tolerance"], 5);
    assert_eq!(body["category"], "moderate");
    assert_eq!(tickers(&body), ["NFLX", "META", "DIS", "AMZN", "GOOGL"]);

    let response = h
        .server
        .post("/update-risk-tolerance")
        .authorization_bearer(&token)
        .json(&json!({ "risk_tolerance": 2 }))
        .await;
    response.assert_status_ok();

    let body = h
        .server
        .get("/stock-recommendations")
        .authorization_bearer(&token)
        .await
        .json::<Value>();
    assert_eq!(body["category"], "conservative");
    assert_eq!(tickers(&body), ["VZ", "JNJ", "KO", "MSFT", "AAPL"]);

    h.server
        .post("/update-risk-tolerance")
        .authorization_bearer(&token)
        .json(&json!({ "risk_tolerance": 11 }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stock_details_and_prices() {
    let h = harness();
    let (_, token) = user(&h.server, "ana@example.com").await;

    let stock = h
        .server
        .get("/stocks/aapl")
        .authorization_bearer(&token)
        .await
        .json::<Value>();
    assert_eq!(stock["ticker"], "AAPL");
    assert!(stock["predicted_return_1yr"].is_number());

    let response = h
        .server
        .get("/stocks/NOPE")
        .authorization_bearer(&token)
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(msg(&response), "Stock not found: NOPE");

    let prices = h
        .server
        .get("/update-stock-prices")
        .authorization_bearer(&token)
        .await
        .json::<Value>();
    let prices = prices["prices"].as_array().unwrap();
    assert_eq!(prices.len(), 15);
    assert!(prices.iter().all(|p| p["current_price"].as_f64().unwrap() > 0.0));
}

#[tokio::test]
async fn test_watchlist_is_per_user() {
    let h = harness();
    let (_, ana) = user(&h.server, "ana@example.com").await;
    let (_, bo) = user(&h.server, "bo@example.com").await;

    let response = h
        .server
        .post("/watchlist")
        .authorization_bearer(&ana)
        .json(&json!({ "ticker": "tsla", "stock_name": "Tesla Inc.", "current_price": 242.84 }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let id = response.json::<Value>()["item"]["id"].as_u64().unwrap();

    let response = h
        .server
        .post("/watchlist")
        .authorization_bearer(&ana)
        .json(&json!({ "ticker": "TSLA" }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    assert_eq!(msg(&response), "Stock already in watchlist");

    let list = h
        .server
        .get("/watchlist")
        .authorization_bearer(&ana)
        .await
        .json::<Value>();
    assert_eq!(list["watchlist"][0]["stock_ticker"], "TSLA");
    assert_eq!(list["watchlist"][0]["current_price"], json!(242.84));

    let empty = h
        .server
        .get("/watchlist")
        .authorization_bearer(&bo)
        .await
        .json::<Value>();
    assert_eq!(empty["watchlist"], json!([]));

    h.server
        .delete(&format!("/watchlist/{id}"))
        .authorization_bearer(&bo)
        .await
        .assert_status(StatusCode::NOT_FOUND);
    h.server
        .delete(&format!("/watchlist/{id}"))
        .authorization_bearer(&ana)
        .await
        .assert_status_ok();

    let response = h
        .server
        .post("/watchlist")
        .authorization_bearer(&ana)
        .json(&json!({}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(msg(&response), "Ticker is required");
}

// =============================================================================
// LEDGER
// =============================================================================

#[tokio::test]
async fn test_entries_crud_and_isolation() {
    let h = harness();
    let (_, ana) = user(&h.server, "ana@example.com").await;
    let (_, bo) = user(&h.server, "bo@example.com").await;

    let response = h
        .server
        .post("/entries/expenses")
        .authorization_bearer(&ana)
        .json(&json!({ "amount": "42.50" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let id = response.json::<Value>()["entry"]["id"].as_u64().unwrap();

    let listing = h
        .server
        .get("/entries/expense")
        .authorization_bearer(&ana)
        .await
        .json::<Value>();
    assert_eq!(listing["entries"][0]["amount"], json!(42.5));
    assert_eq!(listing["entries"][0]["type"], "expense");

    let others = h
        .server
        .get("/entries/expenses")
        .authorization_bearer(&bo)
        .await
        .json::<Value>();
    assert_eq!(others["entries"], json!([]));

    h.server
        .put(&format!("/entries/expenses/{id}"))
        .authorization_bearer(&bo)
        .json(&json!({ "amount": 1 }))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    h.server
        .delete(&format!("/entries/expenses/{id}"))
        .authorization_bearer(&bo)
        .await
        .assert_status(StatusCode::NOT_FOUND);
    h.server
        .put(&format!("/entries/incomes/{id}"))
        .authorization_bearer(&ana)
        .json(&json!({ "amount": 1 }))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    h.server
        .put(&format!("/entries/expenses/{id}"))
        .authorization_bearer(&ana)
        .json(&json!({ "amount": 50 }))
        .await
        .assert_status_ok();
    let listing = h
        .server
        .get("/entries/expenses")
        .authorization_bearer(&ana)
        .await
        .json::<Value>();
    assert_eq!(listing["entries"][0]["amount"], json!(50.0));

    h.server
        .delete(&format!("/entries/expenses/{id}"))
        .authorization_bearer(&ana)
        .await
        .assert_status_ok();

    let response = h
        .server
        .post("/entries/expenses")
        .authorization_bearer(&ana)
        .json(&json!({}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(msg(&response), "Missing amount");

    h.server
        .get("/entries/bananas")
        .authorization_bearer(&ana)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_non_numeric_ids_are_json_errors() {
    let h = harness();
    let (_, ana) = user(&h.server, "ana@example.com").await;

    let response = h
        .server
        .delete("/entries/incomes/abc")
        .authorization_bearer(&ana)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(msg(&response).contains("abc"));

    let response = h
        .server
        .put("/entries/incomes/abc")
        .authorization_bearer(&ana)
        .json(&json!({ "amount": 1 }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(msg(&response).contains("abc"));

    let response = h
        .server
        .delete("/watchlist/abc")
        .authorization_bearer(&ana)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(msg(&response).contains("abc"));

    let response = h
        .server
        .delete("/watchlist/-1")
        .authorization_bearer(&ana)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(!msg(&response).is_empty());
}

#[tokio::test]
async fn test_amounts_are_encrypted_at_rest_and_unreadable_rows_skipped() {
    let h = harness();
    let (id, token) = user(&h.server, "ana@example.com").await;
    h.server
        .post("/entries/incomes")
        .authorization_bearer(&token)
        .json(&json!({ "amount": 1234.56 }))
        .await
        .assert_status(StatusCode::CREATED);

    let records = h.vault.store().entries(UserId(id)).unwrap();
    assert_eq!(records.len(), 1);
    assert!(!records[0].amount.windows(7).any(|w| w == b"1234.56"));

    let foreign = FieldCipher::new(&[1; 32]).unwrap();
    h.vault
        .store()
        .insert_entry(
            UserId(id),
            EntryKind::Income,
            foreign.seal_money(Money::from_cents(999)).unwrap(),
            chrono::Utc::now().timestamp(),
        )
        .unwrap();

    let listing = h
        .server
        .get("/entries/incomes")
        .authorization_bearer(&token)
        .await
        .json::<Value>();
    assert_eq!(listing["entries"].as_array().unwrap().len(), 1);

    let csv = h
        .server
        .get("/export/csv")
        .authorization_bearer(&token)
        .await
        .text();
    assert_eq!(csv.lines().count(), 2);
}

#[tokio::test]
async fn test_csv_export() {
    let h = harness();
    let (_, token) = user(&h.server, "ana@example.com").await;
    for (kind, amount) in [("savings", 10), ("incomes", 2000), ("expenses", 300)] {
        h.server
            .post(&format!("/entries/{kind}"))
            .authorization_bearer(&token)
            .json(&json!({ "amount": amount }))
            .await
            .assert_status(StatusCode::CREATED);
    }

    let response = h
        .server
        .get("/export/csv")
        .authorization_bearer(&token)
        .await;
    response.assert_status_ok();
    let disposition = response.header("content-disposition");
    let disposition = disposition.to_str().unwrap();
    assert!(disposition.starts_with("attachment; filename=\"moneymap-all-export-"));
    let csv = response.text();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "type,id,amount,created_at");
    assert!(lines[1].starts_with("income,"));
    assert!(lines[2].starts_with("expense,"));
    assert!(lines[3].starts_with("saving,"));
    assert_eq!(lines.len(), 4);

    let incomes = h
        .server
        .get("/export/csv")
        .add_query_param("type", "incomes")
        .authorization_bearer(&token)
        .await
        .text();
    assert_eq!(incomes.lines().count(), 2);

    let future = h
        .server
        .get("/export/csv")
        .add_query_param("start", "2999-01-01")
        .authorization_bearer(&token)
        .await
        .text();
    assert_eq!(future.lines().count(), 1);

    let response = h
        .server
        .get("/export/csv")
        .add_query_param("type", "stocks")
        .authorization_bearer(&token)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(msg(&response), "type must be one of incomes|expenses|savings|all");
}

#[tokio::test]
async fn test_pdf_summary_export() {
    let h = harness();
    let (_, token) = user(&h.server, "ana@example.com").await;
    h.server
        .post("/entries/incomes")
        .authorization_bearer(&token)
        .json(&json!({ "amount": 100 }))
        .await
        .assert_status(StatusCode::CREATED);

    let response = h
        .server
        .get("/export/pdf/summary")
        .add_query_param("start", "2020-01-01")
        .authorization_bearer(&token)
        .await;
    response.assert_status_ok();
    assert_eq!(response.header("content-type"), "application/pdf");
    let bytes = response.as_bytes();
    assert!(bytes.starts_with(b"%PDF-1.4"));
    assert!(bytes.ends_with(b"%%EOF\n"));
}

// =============================================================================
// PASSWORD RESET
// =============================================================================

fn token_from(mail: &OutgoingMail) -> String {
    let after = mail.text.split("token=").nth(1).unwrap();
    after.split_whitespace().next().unwrap().to_string()
}

#[tokio::test]
async fn test_password_reset_flow() {
    let h = harness();
    signup(&h.server, "ana@example.com").await;

    let unknown = h
        .server
        .post("/forgot-password")
        .json(&json!({ "email": "who@example.com" }))
        .await;
    let known = h
        .server
        .post("/forgot-password")
        .json(&json!({ "email": "ana@example.com" }))
        .await;
    unknown.assert_status_ok();
    known.assert_status_ok();
    assert_eq!(unknown.json::<Value>(), known.json::<Value>());

    let mail = {
        let outbox = h.outbox.lock().unwrap();
        assert_eq!(outbox.len(), 1);
        outbox[0].clone()
    };
    assert_eq!(mail.to, "ana@example.com");
    assert_eq!(mail.subject, RESET_SUBJECT);
    assert!(mail.html.contains("http://localhost:5173/reset-password?token="));
    let token = token_from(&mail);

    let verified = h
        .server
        .post("/verify-reset-token")
        .json(&json!({ "token": token }))
        .await;
    verified.assert_status_ok();
    verified.assert_json(&json!({ "valid": true, "email": "ana@example.com" }));

    let response = h
        .server
        .post("/reset-password")
        .json(&json!({ "token": token, "password": "short" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    h.server
        .post("/reset-password")
        .json(&json!({ "token": token, "password": "brand-new-pass" }))
        .await
        .assert_status_ok();
    login(&h.server, "ana@example.com", "brand-new-pass").await;

    let reused = h
        .server
        .post("/reset-password")
        .json(&json!({ "token": token, "password": "another-pass" }))
        .await;
    reused.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(msg(&reused), "Invalid or expired reset token");

    h.server
        .post("/verify-reset-token")
        .json(&json!({ "token": "made-up" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}
