//! PostgreSQL implementation of TransactionLedger.
//!
//! Activation runs in one database transaction whose first statement is a
//! compare-and-swap on `status = 'pending'`. Under READ COMMITTED a racing
//! second UPDATE blocks on the row lock, re-checks the predicate against the
//! committed row and matches nothing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::account_repository::db_error;
use crate::domain::billing::{
    BillingError, LedgerEntry, Resource, TransactionStatus, VerificationMethod,
};
use crate::domain::foundation::{PlanId, Timestamp, TransactionId, UserId};
use crate::ports::{ActivationCommit, CommitOutcome, TransactionLedger};

const ORDER_UNIQUE_CONSTRAINT: &str = "payment_transactions_gateway_order_id_key";
const COMPLETED_PAYMENT_UNIQUE_INDEX: &str = "payment_transactions_completed_payment_key";

pub struct PostgresTransactionLedger {
    pool: PgPool,
}

impl PostgresTransactionLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: Uuid,
    user_id: String,
    plan_id: String,
    gateway_order_id: String,
    gateway_payment_id: Option<String>,
    gateway_signature: Option<String>,
    verification_method: Option<String>,
    amount_minor_units: i64,
    currency: String,
    status: String,
    failure_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for LedgerEntry {
    type Error = BillingError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let verification_method = match row.verification_method {
            Some(method) => Some(VerificationMethod::parse(&method).ok_or_else(|| {
                BillingError::infrastructure(format!("Invalid verification method: {}", method))
            })?),
            None => None,
        };

        Ok(LedgerEntry {
            transaction_id: TransactionId::from_uuid(row.id),
            user_id: UserId::new(row.user_id)?,
            plan_id: PlanId::new(row.plan_id)?,
            gateway_order_id: row.gateway_order_id,
            gateway_payment_id: row.gateway_payment_id,
            gateway_signature: row.gateway_signature,
            verification_method,
            amount_minor_units: row.amount_minor_units,
            currency: row.currency,
            status: parse_status(&row.status)?,
            failure_reason: row.failure_reason,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn parse_status(s: &str) -> Result<TransactionStatus, BillingError> {
    TransactionStatus::parse(s)
        .ok_or_else(|| BillingError::infrastructure(format!("Invalid transaction status: {}", s)))
}

fn violates(e: &sqlx::Error, constraint: &str) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.constraint() == Some(constraint))
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, user_id, plan_id, gateway_order_id, gateway_payment_id, gateway_signature,
           verification_method, amount_minor_units, currency, status, failure_reason,
           created_at, updated_at
    FROM payment_transactions
"#;

#[async_trait]
impl TransactionLedger for PostgresTransactionLedger {
    async fn insert(&self, entry: &LedgerEntry) -> Result<(), BillingError> {
        sqlx::query(
            r#"
            INSERT INTO payment_transactions (
                id, user_id, plan_id, gateway_order_id, amount_minor_units, currency,
                status, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(entry.transaction_id.as_uuid())
        .bind(entry.user_id.as_str())
        .bind(entry.plan_id.as_str())
        .bind(&entry.gateway_order_id)
        .bind(entry.amount_minor_units)
        .bind(&entry.currency)
        .bind(entry.status.as_str())
        .bind(entry.created_at.as_datetime())
        .bind(entry.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if violates(&e, ORDER_UNIQUE_CONSTRAINT) {
                return BillingError::conflict(
                    Resource::Transaction,
                    format!("Order {} is already recorded", entry.gateway_order_id),
                );
            }
            db_error("insert transaction", e)
        })?;

        Ok(())
    }

    async fn find_by_order_for_user(
        &self,
        gateway_order_id: &str,
        user_id: &UserId,
    ) -> Result<Option<LedgerEntry>, BillingError> {
        let row: Option<TransactionRow> =
            sqlx::query_as(&format!("{} WHERE gateway_order_id = $1 AND user_id = $2", SELECT_COLUMNS))
                .bind(gateway_order_id)
                .bind(user_id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("find transaction", e))?;

        row.map(LedgerEntry::try_from).transpose()
    }

    async fn find_by_order(&self, gateway_order_id: &str) -> Result<Option<LedgerEntry>, BillingError> {
        let row: Option<TransactionRow> =
            sqlx::query_as(&format!("{} WHERE gateway_order_id = $1", SELECT_COLUMNS))
                .bind(gateway_order_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("find transaction", e))?;

        row.map(LedgerEntry::try_from).transpose()
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<LedgerEntry>, BillingError> {
        let rows: Vec<TransactionRow> = sqlx::query_as(&format!(
            "{} WHERE user_id = $1 ORDER BY created_at DESC",
            SELECT_COLUMNS
        ))
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list transactions", e))?;

        rows.into_iter().map(LedgerEntry::try_from).collect()
    }

    async fn mark_failed_if_pending(
        &self,
        transaction_id: &TransactionId,
        reason: &str,
        now: Timestamp,
    ) -> Result<bool, BillingError> {
        let result = sqlx::query(
            r#"
            UPDATE payment_transactions SET
                status = 'failed',
                failure_reason = $2,
                updated_at = $3
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(transaction_id.as_uuid())
        .bind(reason)
        .bind(now.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("mark transaction failed", e))?;

        Ok(result.rows_affected() == 1)
    }

    async fn commit_activation(&self, commit: ActivationCommit) -> Result<CommitOutcome, BillingError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("begin transaction", e))?;

        let claimed: Option<String> = sqlx::query_scalar(
            r#"
            UPDATE payment_transactions SET
                status = 'completed',
                gateway_payment_id = $2,
                gateway_signature = $3,
                verification_method = $4,
                updated_at = $5
            WHERE id = $1 AND status = 'pending'
            RETURNING user_id
            "#,
        )
        .bind(commit.transaction_id.as_uuid())
        .bind(&commit.gateway_payment_id)
        .bind(&commit.gateway_signature)
        .bind(commit.verification_method.as_str())
        .bind(commit.now.as_datetime())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            if violates(&e, COMPLETED_PAYMENT_UNIQUE_INDEX) {
                return BillingError::conflict(
                    Resource::Transaction,
                    format!(
                        "Payment {} already completed another order",
                        commit.gateway_payment_id
                    ),
                );
            }
            db_error("complete transaction", e)
        })?;

        if claimed.is_none() {
            let current: Option<String> =
                sqlx::query_scalar("SELECT status FROM payment_transactions WHERE id = $1")
                    .bind(commit.transaction_id.as_uuid())
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(|e| db_error("read transaction status", e))?;
            tx.rollback()
                .await
                .map_err(|e| db_error("roll back transaction", e))?;

            return match current {
                None => Err(BillingError::not_found(
                    Resource::Transaction,
                    commit.transaction_id.to_string(),
                )),
                Some(status) => match parse_status(&status)? {
                    TransactionStatus::Completed => Ok(CommitOutcome::AlreadyCompleted),
                    other => Ok(CommitOutcome::NotPending(other)),
                },
            };
        }

        let subscription = &commit.subscription;
        let updated = sqlx::query(
            r#"
            UPDATE users SET
                subscription_plan_id = $2,
                subscription_start_date = $3,
                subscription_end_date = $4,
                subscription_status = $5,
                subscription_activation_reference = $6,
                subscription_amount_paid = $7,
                updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(commit.user_id.as_str())
        .bind(subscription.plan_id.as_str())
        .bind(subscription.start_date.as_datetime())
        .bind(subscription.end_date.as_datetime())
        .bind(subscription.status.as_str())
        .bind(&subscription.activation_reference)
        .bind(subscription.amount_paid)
        .bind(commit.now.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("write subscription", e))?;

        if updated.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(|e| db_error("roll back transaction", e))?;
            return Err(BillingError::not_found(Resource::Account, commit.user_id.as_str()));
        }

        tx.commit()
            .await
            .map_err(|e| db_error("commit activation", e))?;

        Ok(CommitOutcome::Committed)
    }
}
