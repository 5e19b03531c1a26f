//! Credit balance handlers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use pagecredits_core::{CreditHistoryEntry, HistoryType};

use crate::auth::ServiceAuth;
use crate::error::ApiError;
use crate::handlers::parse_user_id;
use crate::state::AppState;

/// Default history page size.
const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Largest history page a caller may request.
const MAX_HISTORY_LIMIT: usize = 200;

/// Balance response.
#[derive(Debug, Serialize)]
pub struct CreditsResponse {
    /// User ID.
    pub user_id: String,
    /// Balance after the refill check.
    pub credits: i64,
    /// Whether this request performed the daily refill.
    pub refreshed: bool,
}

/// Return the balance, refilling it first if the window has passed.
///
/// Called before every credit-consuming operation.
pub async fn get_credits(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Path(user_id): Path<String>,
) -> Result<Json<CreditsResponse>, ApiError> {
    let user_id = parse_user_id(&user_id)?;

    let outcome = state.ledger.check_and_refresh(&user_id).await?;

    Ok(Json(CreditsResponse {
        user_id: user_id.to_string(),
        credits: outcome.credits,
        refreshed: outcome.refreshed,
    }))
}

/// Debit request.
#[derive(Debug, Deserialize)]
pub struct DebitRequest {
    /// Credits to take.
    pub amount: i64,
    /// What the credits paid for.
    #[serde(default)]
    pub description: String,
}

/// Debit response.
#[derive(Debug, Serialize)]
pub struct DebitResponse {
    /// Always true; refused debits are returned as 402.
    pub success: bool,
    /// Balance after the debit.
    pub remaining: i64,
}

/// Take credits for a generation, preview or deploy.
pub async fn debit(
    State(state): State<Arc<AppState>>,
    auth: ServiceAuth,
    Path(user_id): Path<String>,
    Json(body): Json<DebitRequest>,
) -> Result<Json<DebitResponse>, ApiError> {
    let user_id = parse_user_id(&user_id)?;

    let outcome = state
        .ledger
        .debit(&user_id, body.amount, HistoryType::Debit, &body.description)
        .await?;

    if !outcome.success() {
        tracing::info!(
            user_id = %user_id,
            amount = body.amount,
            service = %auth.service_name,
            "Debit refused"
        );
    }
    let remaining = outcome.into_result()?;

    Ok(Json(DebitResponse {
        success: true,
        remaining,
    }))
}

/// Purchase credit request, sent once the payment processor confirms.
#[derive(Debug, Deserialize)]
pub struct CreditRequest {
    /// Credits to add.
    pub amount: i64,
    /// Purchase reference, e.g. the checkout session.
    #[serde(default)]
    pub description: String,
}

/// Balance after a purchase.
#[derive(Debug, Serialize)]
pub struct CreditResponse {
    /// User ID.
    pub user_id: String,
    /// Balance after the purchase.
    pub credits: i64,
}

/// Add purchased credits.
pub async fn credit(
    State(state): State<Arc<AppState>>,
    auth: ServiceAuth,
    Path(user_id): Path<String>,
    Json(body): Json<CreditRequest>,
) -> Result<Json<CreditResponse>, ApiError> {
    let user_id = parse_user_id(&user_id)?;

    let credits = state
        .ledger
        .credit(&user_id, body.amount, HistoryType::Purchase, &body.description)
        .await?;

    tracing::info!(
        user_id = %user_id,
        amount = body.amount,
        service = %auth.service_name,
        "Purchased credits applied"
    );

    Ok(Json(CreditResponse {
        user_id: user_id.to_string(),
        credits,
    }))
}

/// Query parameters for history.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Maximum number of entries to return.
    #[serde(default)]
    pub limit: Option<usize>,
    /// Offset for pagination.
    #[serde(default)]
    pub offset: Option<usize>,
}

/// One history entry.
#[derive(Debug, Serialize)]
pub struct HistoryEntryResponse {
    /// Entry ID.
    pub id: String,
    /// Signed amount.
    pub amount: i64,
    /// Kind of change.
    pub entry_type: HistoryType,
    /// Balance right after the change.
    pub balance_after: i64,
    /// Description.
    pub description: String,
    /// Created timestamp.
    pub created_at: String,
}

impl From<&CreditHistoryEntry> for HistoryEntryResponse {
    fn from(entry: &CreditHistoryEntry) -> Self {
        Self {
            id: entry.id.to_string(),
            amount: entry.amount,
            entry_type: entry.entry_type,
            balance_after: entry.balance_after,
            description: entry.description.clone(),
            created_at: entry.created_at.to_rfc3339(),
        }
    }
}

/// History list response.
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    /// Entries, newest first.
    pub entries: Vec<HistoryEntryResponse>,
    /// Whether a further page may exist.
    pub has_more: bool,
}

/// List credit history, newest first.
pub async fn history(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Path(user_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let user_id = parse_user_id(&user_id)?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);
    let offset = query.offset.unwrap_or(0);

    // Surface a missing account as 404 rather than an empty list
    state.ledger.account(&user_id).await?;

    let entries = state.ledger.history(&user_id, limit, offset).await?;
    let has_more = entries.len() == limit;

    Ok(Json(HistoryResponse {
        entries: entries.iter().map(HistoryEntryResponse::from).collect(),
        has_more,
    }))
}
