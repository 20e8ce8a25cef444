//! Ledger entries and exports.
//!
//! Rows whose amount cannot be decrypted are left out of listings and
//! exports; the count is logged at `warn`.

use super::{ApiError, AppState, AuthUser, JsonBody, PathParams};
use axum::Json;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use moneymap_core::formats::{rows_to_csv, summary_pdf};
use moneymap_core::ledger::{parse_amount, parse_date};
use moneymap_core::{DateWindow, EntryId, EntryKind, Selector, UserId};
use serde::Deserialize;
use serde_json::{Value, json};

fn kind(text: &str) -> Result<EntryKind, ApiError> {
    Ok(EntryKind::parse(text)?)
}

fn note_unreadable(user: UserId, unreadable: usize) {
    if unreadable > 0 {
        tracing::warn!(user_id = %user, unreadable, "skipped entries that could not be decrypted");
    }
}

/// `GET /entries/{kind}`
pub async fn list_entries(
    State(state): State<AppState>,
    user: AuthUser,
    PathParams(kind_text): PathParams<String>,
) -> Result<Json<Value>, ApiError> {
    let kind = kind(&kind_text)?;
    let listing = state.vault.list_entries(user.id, kind)?;
    note_unreadable(user.id, listing.unreadable);
    Ok(Json(json!({ "type": kind.plural(), "entries": listing.entries })))
}

/// `POST /entries/{kind}`
pub async fn add_entry(
    State(state): State<AppState>,
    user: AuthUser,
    PathParams(kind_text): PathParams<String>,
    body: JsonBody,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let kind = kind(&kind_text)?;
    let amount = parse_amount(body.text("amount").as_deref())?;
    let entry = state.vault.add_entry(user.id, kind, amount, Utc::now())?;
    tracing::info!(user_id = %user.id, entry_id = %entry.id, kind = kind.as_str(), "entry added");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "msg": "Entry added", "entry": entry })),
    ))
}

/// `PUT /entries/{kind}/{id}`
pub async fn update_entry(
    State(state): State<AppState>,
    user: AuthUser,
    PathParams((kind_text, id)): PathParams<(String, u64)>,
    body: JsonBody,
) -> Result<Json<Value>, ApiError> {
    let kind = kind(&kind_text)?;
    let amount = parse_amount(body.text("amount").as_deref())?;
    state.vault.update_entry(user.id, kind, EntryId(id), amount)?;
    tracing::info!(user_id = %user.id, entry_id = id, kind = kind.as_str(), "entry updated");
    Ok(Json(json!({ "msg": "Entry updated" })))
}

/// `DELETE /entries/{kind}/{id}`
pub async fn delete_entry(
    State(state): State<AppState>,
    user: AuthUser,
    PathParams((kind_text, id)): PathParams<(String, u64)>,
) -> Result<Json<Value>, ApiError> {
    let kind = kind(&kind_text)?;
    state.vault.delete_entry(user.id, kind, EntryId(id))?;
    tracing::info!(user_id = %user.id, entry_id = id, kind = kind.as_str(), "entry deleted");
    Ok(Json(json!({ "msg": "Entry deleted" })))
}

// =============================================================================
// EXPORTS
// =============================================================================

/// Query string of the export endpoints. Unparsable dates are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

impl ExportQuery {
    fn window(&self) -> DateWindow {
        DateWindow::new(
            self.start.as_deref().and_then(parse_date),
            self.end.as_deref().and_then(parse_date),
        )
    }
}

fn attachment(content_type: &str, filename: &str, body: impl IntoResponse) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response()
}

/// `GET /export/csv?type=&start=&end=`
pub async fn export_csv(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    let selector = Selector::parse(query.kind.as_deref().unwrap_or("all"))?;
    let listing = state.vault.fetch_rows(user.id, selector, &query.window())?;
    note_unreadable(user.id, listing.unreadable);

    let label = match selector {
        Selector::All => "all",
        Selector::Only(kind) => kind.plural(),
    };
    let filename = format!(
        "moneymap-{label}-export-{}.csv",
        Utc::now().format("%Y-%m-%d")
    );
    tracing::info!(user_id = %user.id, rows = listing.entries.len(), selector = label, "csv export");
    Ok(attachment(
        "text/csv; charset=utf-8",
        &filename,
        rows_to_csv(&listing.entries),
    ))
}

/// `GET /export/pdf/summary?start=&end=`
pub async fn export_pdf_summary(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    let window = query.window();
    let (summary, unreadable) = state.vault.summary(user.id, &window)?;
    note_unreadable(user.id, unreadable);

    let now = Utc::now();
    let filename = format!("moneymap-summary-{}.pdf", now.format("%Y-%m-%d"));
    tracing::info!(user_id = %user.id, period = %window.label(), "pdf summary export");
    Ok(attachment(
        "application/pdf",
        &filename,
        summary_pdf(&summary, &window, now),
    ))
}

// =============================================================================
// TESTS
// =============================================================================
