//! PostgreSQL storage implementation.
//!
//! The conditional update is a single `UPDATE ... WHERE version = $n`; zero
//! rows affected means another writer got there first.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

use pagecredits_core::{
    AccountUpdate, CreditHistoryEntry, HistoryType, Tier, UserCreditAccount, UserId,
};

use crate::error::{Result, StoreError};
use crate::CreditStore;

const ACCOUNT_COLUMNS: &str =
    "user_id, credits, tier, last_refill_at, version, created_at, updated_at";

/// PostgreSQL-backed storage implementation.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect to the database at `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be created.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the embedded schema migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        tracing::info!("Credit ledger migrations applied");
        Ok(())
    }
}

fn version_to_db(version: u64) -> Result<i64> {
    i64::try_from(version)
        .map_err(|_| StoreError::Serialization(format!("version {version} out of range")))
}

fn page_to_db(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn account_from_row(row: &PgRow) -> Result<UserCreditAccount> {
    let user_id: uuid::Uuid = row.try_get("user_id")?;
    let tier: String = row.try_get("tier")?;
    let version: i64 = row.try_get("version")?;

    Ok(UserCreditAccount {
        user_id: UserId::from_uuid(user_id),
        credits: row.try_get("credits")?,
        tier: Tier::from_name(&tier),
        last_refill_at: row.try_get::<Option<DateTime<Utc>>, _>("last_refill_at")?,
        version: u64::try_from(version)
            .map_err(|_| StoreError::Serialization(format!("negative version {version}")))?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn entry_from_row(row: &PgRow) -> Result<CreditHistoryEntry> {
    let id: String = row.try_get("id")?;
    let user_id: uuid::Uuid = row.try_get("user_id")?;
    let entry_type: String = row.try_get("entry_type")?;

    Ok(CreditHistoryEntry {
        id: id
            .parse()
            .map_err(|e| StoreError::Serialization(format!("history id {id}: {e}")))?,
        user_id: UserId::from_uuid(user_id),
        amount: row.try_get("amount")?,
        entry_type: HistoryType::from_name(&entry_type).ok_or_else(|| {
            StoreError::Serialization(format!("unknown history type: {entry_type}"))
        })?,
        balance_after: row.try_get("balance_after")?,
        description: row.try_get("description")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl CreditStore for PgStore {
    async fn get_account(&self, user_id: &UserId) -> Result<Option<UserCreditAccount>> {
        let row = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM credit_accounts WHERE user_id = $1"
        ))
        .bind(*user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(account_from_row).transpose()
    }

    async fn insert_account(&self, account: &UserCreditAccount) -> Result<bool> {
        let result = sqlx::query(&format!(
            "INSERT INTO credit_accounts ({ACCOUNT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (user_id) DO NOTHING"
        ))
        .bind(*account.user_id.as_uuid())
        .bind(account.credits)
        .bind(account.tier.as_str())
        .bind(account.last_refill_at)
        .bind(version_to_db(account.version)?)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn conditional_update_account(
        &self,
        user_id: &UserId,
        expected_version: u64,
        update: &AccountUpdate,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE credit_accounts \
             SET credits = $3, tier = $4, last_refill_at = $5, updated_at = $6, \
                 version = version + 1 \
             WHERE user_id = $1 AND version = $2",
        )
        .bind(*user_id.as_uuid())
        .bind(version_to_db(expected_version)?)
        .bind(update.credits)
        .bind(update.tier.as_str())
        .bind(update.last_refill_at)
        .bind(update.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }

        // Zero rows: either a lost race or no such account.
        let exists = sqlx::query("SELECT 1 FROM credit_accounts WHERE user_id = $1")
            .bind(*user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .is_some();

        if exists {
            Ok(false)
        } else {
            Err(StoreError::NotFound)
        }
    }

    async fn append_history(&self, entry: &CreditHistoryEntry) -> Result<()> {
        sqlx::query(
            "INSERT INTO credit_history \
             (id, user_id, amount, entry_type, balance_after, description, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(entry.id.to_string())
        .bind(*entry.user_id.as_uuid())
        .bind(entry.amount)
        .bind(entry.entry_type.as_str())
        .bind(entry.balance_after)
        .bind(&entry.description)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_history(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreditHistoryEntry>> {
        let rows = sqlx::query(
            "SELECT id, user_id, amount, entry_type, balance_after, description, created_at \
             FROM credit_history WHERE user_id = $1 \
             ORDER BY id DESC LIMIT $2 OFFSET $3",
        )
        .bind(*user_id.as_uuid())
        .bind(page_to_db(limit))
        .bind(page_to_db(offset))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(entry_from_row).collect()
    }
}
