//! Stock recommendations and the watchlist.

use super::{ApiError, AppState, AuthUser, JsonBody, PathParams};
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::Utc;
use moneymap_core::market::{self, Stock, Tier};
use moneymap_core::profile::risk_level;
use moneymap_core::{Money, NewWatchlistItem, WatchlistId, WatchlistItem};
use serde::Serialize;
use serde_json::{Value, json};

#[derive(Debug, Serialize)]
pub struct Recommendations {
    pub risk_tolerance: u8,
    pub category: Tier,
    pub recommendations: Vec<Stock>,
}

/// `GET /stock-recommendations`
pub async fn stock_recommendations(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Recommendations>, ApiError> {
    let profile = state.vault.profile(user.id)?;
    let level = risk_level(profile.risk_tolerance.as_ref());
    Ok(Json(Recommendations {
        risk_tolerance: level,
        category: Tier::for_level(level),
        recommendations: market::recommendations(level),
    }))
}

/// `GET /stocks/{ticker}`
pub async fn stock(_user: AuthUser, PathParams(ticker): PathParams<String>) -> Result<Json<Stock>, ApiError> {
    Ok(Json(market::stock_details(&ticker)?))
}

/// `GET /update-stock-prices`
pub async fn update_stock_prices(_user: AuthUser) -> Json<Value> {
    let prices = market::simulate_prices(&mut rand::thread_rng());
    Json(json!({ "prices": prices }))
}

/// `GET /watchlist`
pub async fn list_watchlist(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Value>, ApiError> {
    let watchlist: Vec<WatchlistItem> = state.vault.watchlist(user.id)?;
    Ok(Json(json!({ "watchlist": watchlist })))
}

/// `POST /watchlist`
pub async fn add_to_watchlist(
    State(state): State<AppState>,
    user: AuthUser,
    body: JsonBody,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let ticker = body
        .first_text(&["ticker", "stock_ticker"])
        .unwrap_or_default();
    let mut item = NewWatchlistItem::new(&ticker)?;
    item.stock_name = body.text("stock_name");
    item.notes = body.text("notes");
    item.current_price = body
        .text("current_price")
        .map(|price| Money::parse(&price))
        .transpose()
        .map_err(|_| ApiError::bad_request("Invalid current price"))?;

    let added = state.vault.add_watch(user.id, item, Utc::now())?;
    tracing::info!(user_id = %user.id, ticker = %added.ticker, "watchlist item added");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "msg": "Stock added to watchlist", "item": added })),
    ))
}

/// `DELETE /watchlist/{id}`
pub async fn remove_from_watchlist(
    State(state): State<AppState>,
    user: AuthUser,
    PathParams(id): PathParams<u64>,
) -> Result<Json<Value>, ApiError> {
    state.vault.remove_watch(user.id, WatchlistId(id))?;
    tracing::info!(user_id = %user.id, item = id, "watchlist item removed");
    Ok(Json(json!({ "msg": "Stock removed from watchlist" })))
}
