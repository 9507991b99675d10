//! PostgreSQL implementation of AccountRepository.
//!
//! The subscription slot lives in `subscription_*` columns on `users`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::billing::{
    no_active_subscription, BillingError, Resource, SubscriptionState, SubscriptionStatus,
    UserAccount,
};
use crate::domain::foundation::{PlanId, Timestamp, UserId};
use crate::ports::AccountRepository;

pub struct PostgresAccountRepository {
    pool: PgPool,
}

impl PostgresAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Subscription columns; all present or all null.
#[derive(Debug, sqlx::FromRow)]
pub(super) struct SubscriptionRow {
    subscription_plan_id: Option<String>,
    subscription_start_date: Option<DateTime<Utc>>,
    subscription_end_date: Option<DateTime<Utc>>,
    subscription_status: Option<String>,
    subscription_activation_reference: Option<String>,
    subscription_amount_paid: Option<i64>,
}

impl SubscriptionRow {
    pub(super) fn into_state(self) -> Result<Option<SubscriptionState>, BillingError> {
        let (Some(plan_id), Some(start), Some(end), Some(status), Some(reference), Some(amount)) = (
            self.subscription_plan_id,
            self.subscription_start_date,
            self.subscription_end_date,
            self.subscription_status,
            self.subscription_activation_reference,
            self.subscription_amount_paid,
        ) else {
            return Ok(None);
        };

        Ok(Some(SubscriptionState {
            plan_id: PlanId::new(plan_id)?,
            start_date: Timestamp::from_datetime(start),
            end_date: Timestamp::from_datetime(end),
            status: SubscriptionStatus::parse(&status).ok_or_else(|| {
                BillingError::infrastructure(format!("Invalid subscription status: {}", status))
            })?,
            activation_reference: reference,
            amount_paid: amount,
        }))
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: String,
    email: String,
    display_name: Option<String>,
    #[sqlx(flatten)]
    subscription: SubscriptionRow,
}

impl TryFrom<UserRow> for UserAccount {
    type Error = BillingError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(UserAccount {
            user_id: UserId::new(row.id)?,
            email: row.email,
            display_name: row.display_name,
            subscription: row.subscription.into_state()?,
        })
    }
}

pub(super) fn db_error(operation: &str, e: sqlx::Error) -> BillingError {
    tracing::error!(operation, error = %e, "Database operation failed");
    BillingError::infrastructure(format!("Failed to {}: {}", operation, e))
}

#[async_trait]
impl AccountRepository for PostgresAccountRepository {
    async fn find_by_id(&self, user_id: &UserId) -> Result<Option<UserAccount>, BillingError> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT id, email, display_name,
                   subscription_plan_id, subscription_start_date, subscription_end_date,
                   subscription_status, subscription_activation_reference, subscription_amount_paid
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find account", e))?;

        row.map(UserAccount::try_from).transpose()
    }

    async fn cancel_subscription(
        &self,
        user_id: &UserId,
        now: Timestamp,
    ) -> Result<SubscriptionState, BillingError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(
            r#"
            UPDATE users SET
                subscription_status = 'cancelled',
                updated_at = $2
            WHERE id = $1
              AND subscription_status = 'active'
              AND subscription_end_date > $2
            RETURNING subscription_plan_id, subscription_start_date, subscription_end_date,
                      subscription_status, subscription_activation_reference, subscription_amount_paid
            "#,
        )
        .bind(user_id.as_str())
        .bind(now.as_datetime())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("cancel subscription", e))?;

        if let Some(row) = row {
            return row.into_state()?.ok_or_else(|| {
                BillingError::inconsistent_state(format!(
                    "Cancelled subscription for {} has incomplete columns",
                    user_id
                ))
            });
        }

        match self.find_by_id(user_id).await? {
            None => Err(BillingError::not_found(Resource::Account, user_id.as_str())),
            Some(_) => Err(no_active_subscription()),
        }
    }
}
