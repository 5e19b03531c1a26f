//! Account lifecycle handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use pagecredits_core::{Tier, UserCreditAccount};

use crate::auth::ServiceAuth;
use crate::error::ApiError;
use crate::handlers::parse_user_id;
use crate::state::AppState;

/// Account response.
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    /// User ID.
    pub user_id: String,
    /// Current balance.
    pub credits: i64,
    /// Subscription tier.
    pub tier: Tier,
    /// Last refill, if any.
    pub last_refill_at: Option<String>,
    /// When the next refill becomes due. `None` when one is due already.
    pub next_refill_at: Option<String>,
    /// Created timestamp.
    pub created_at: String,
}

impl AccountResponse {
    fn new(state: &AppState, account: &UserCreditAccount) -> Self {
        Self {
            user_id: account.user_id.to_string(),
            credits: account.credits,
            tier: account.tier,
            last_refill_at: account.last_refill_at.map(|at| at.to_rfc3339()),
            next_refill_at: state
                .ledger
                .next_refill_at(account)
                .map(|at| at.to_rfc3339()),
            created_at: account.created_at.to_rfc3339(),
        }
    }
}

/// Create account request, sent by the signup flow.
#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    /// The new user's ID.
    pub user_id: String,
    /// Starting tier (default: free).
    #[serde(default)]
    pub tier: Tier,
}

/// Open a credit account for a newly signed-up user.
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    auth: ServiceAuth,
    Json(body): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<AccountResponse>), ApiError> {
    let user_id = parse_user_id(&body.user_id)?;

    let account = state.ledger.open_account(&user_id, body.tier).await?;

    tracing::info!(
        user_id = %user_id,
        service = %auth.service_name,
        "Account created"
    );

    Ok((
        StatusCode::CREATED,
        Json(AccountResponse::new(&state, &account)),
    ))
}

/// Read an account without refilling it.
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Path(user_id): Path<String>,
) -> Result<Json<AccountResponse>, ApiError> {
    let user_id = parse_user_id(&user_id)?;
    let account = state.ledger.account(&user_id).await?;

    Ok(Json(AccountResponse::new(&state, &account)))
}

/// Tier change request, sent by the payment webhook handler.
#[derive(Debug, Deserialize)]
pub struct ChangeTierRequest {
    /// New tier. Unknown names fall back to free.
    pub tier: Tier,
}

/// Move an account to another tier. Applies from the next refill.
pub async fn change_tier(
    State(state): State<Arc<AppState>>,
    auth: ServiceAuth,
    Path(user_id): Path<String>,
    Json(body): Json<ChangeTierRequest>,
) -> Result<Json<AccountResponse>, ApiError> {
    let user_id = parse_user_id(&user_id)?;

    let account = state.ledger.change_tier(&user_id, body.tier).await?;

    tracing::info!(
        user_id = %user_id,
        tier = %account.tier,
        service = %auth.service_name,
        "Tier updated"
    );

    Ok(Json(AccountResponse::new(&state, &account)))
}
