//! Subscription plans.

use serde::Serialize;

use super::{BillingError, Resource};
use crate::domain::foundation::{PlanId, Timestamp};

/// A purchasable plan. Immutable once registered in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub plan_id: PlanId,
    pub display_name: String,
    /// Price in the currency's minor unit (paise for INR).
    pub price_minor_units: i64,
    /// ISO 4217 code, upper case.
    pub currency: String,
    pub duration_months: u32,
    pub features: Vec<String>,
}

impl Plan {
    /// End of the validity window for a subscription starting at `start`:
    /// `duration_months` calendar months later, at 23:59:59.999 UTC of that day.
    pub fn period_end(&self, start: Timestamp) -> Result<Timestamp, BillingError> {
        start
            .add_calendar_months(self.duration_months)
            .map(|end| end.end_of_day())
            .ok_or_else(|| {
                BillingError::validation(
                    "duration_months",
                    format!("Plan {} period overflows calendar", self.plan_id),
                )
            })
    }

    /// Price formatted in major units, e.g. `499.00 INR`.
    pub fn display_price(&self) -> String {
        format_amount(self.price_minor_units, &self.currency)
    }
}

/// Formats a minor-unit amount with two decimal places.
pub fn format_amount(minor_units: i64, currency: &str) -> String {
    format!(
        "{}.{:02} {}",
        minor_units / 100,
        (minor_units % 100).abs(),
        currency
    )
}

/// NotFound error for a plan id absent from the catalog.
pub(crate) fn plan_not_found(plan_id: &PlanId) -> BillingError {
    BillingError::not_found(Resource::Plan, plan_id.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn monthly() -> Plan {
        Plan {
            plan_id: PlanId::new("basic").unwrap(),
            display_name: "Basic".to_string(),
            price_minor_units: 49_900,
            currency: "INR".to_string(),
            duration_months: 1,
            features: vec![],
        }
    }

    #[test]
    fn one_month_plan_ends_at_end_of_day_a_month_later() {
        let start = Timestamp::from_datetime(Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap());
        let end = monthly().period_end(start).unwrap();

        let expected = Utc.with_ymd_and_hms(2024, 2, 15, 23, 59, 59).unwrap()
            + Duration::milliseconds(999);
        assert_eq!(end.as_datetime(), &expected);
    }

    #[test]
    fn display_price_uses_major_units() {
        assert_eq!(monthly().display_price(), "499.00 INR");
        assert_eq!(format_amount(129_905, "INR"), "1299.05 INR");
    }
}
