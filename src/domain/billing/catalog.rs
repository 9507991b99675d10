//! PlanCatalog - the static registry of purchasable plans.

use once_cell::sync::Lazy;

use super::plan::{plan_not_found, Plan};
use super::BillingError;
use crate::domain::foundation::PlanId;

static BUILTIN_PLANS: Lazy<Vec<Plan>> = Lazy::new(|| {
    [
        builtin(
            "basic",
            "Basic",
            49_900,
            1,
            &["Business profile", "Up to 100 products", "Email support"],
        ),
        builtin(
            "standard",
            "Standard",
            129_900,
            3,
            &[
                "Business profile",
                "Up to 1,000 products",
                "Sales reports",
                "Priority email support",
            ],
        ),
        builtin(
            "premium",
            "Premium",
            449_900,
            12,
            &[
                "Business profile",
                "Unlimited products",
                "Sales reports",
                "Multiple staff accounts",
                "Phone support",
            ],
        ),
    ]
    .into_iter()
    .flatten()
    .collect()
});

fn builtin(id: &str, name: &str, price: i64, months: u32, features: &[&str]) -> Option<Plan> {
    Some(Plan {
        plan_id: PlanId::new(id).ok()?,
        display_name: name.to_string(),
        price_minor_units: price,
        currency: "INR".to_string(),
        duration_months: months,
        features: features.iter().map(|f| f.to_string()).collect(),
    })
}

/// Read-only plan registry. Order of `list_plans` is registration order.
#[derive(Debug, Clone)]
pub struct PlanCatalog {
    plans: Vec<Plan>,
}

impl PlanCatalog {
    /// Catalog of the plans the product sells.
    pub fn builtin() -> Self {
        Self {
            plans: BUILTIN_PLANS.clone(),
        }
    }

    /// Catalog over an explicit plan list. Later duplicates of a plan id are ignored.
    pub fn new(plans: Vec<Plan>) -> Self {
        let mut unique: Vec<Plan> = Vec::with_capacity(plans.len());
        for plan in plans {
            if !unique.iter().any(|p| p.plan_id == plan.plan_id) {
                unique.push(plan);
            }
        }
        Self { plans: unique }
    }

    pub fn get_plan(&self, plan_id: &PlanId) -> Result<&Plan, BillingError> {
        self.plans
            .iter()
            .find(|p| &p.plan_id == plan_id)
            .ok_or_else(|| plan_not_found(plan_id))
    }

    pub fn list_plans(&self) -> &[Plan] {
        &self.plans
    }
}

impl Default for PlanCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::Resource;

    #[test]
    fn builtin_catalog_lists_plans_in_order() {
        let catalog = PlanCatalog::builtin();
        let ids: Vec<&str> = catalog.list_plans().iter().map(|p| p.plan_id.as_str()).collect();
        assert_eq!(ids, vec!["basic", "standard", "premium"]);
    }

    #[test]
    fn get_plan_returns_known_plan() {
        let catalog = PlanCatalog::builtin();
        let plan = catalog.get_plan(&PlanId::new("premium").unwrap()).unwrap();
        assert_eq!(plan.duration_months, 12);
        assert_eq!(plan.currency, "INR");
    }

    #[test]
    fn get_plan_unknown_is_not_found() {
        let catalog = PlanCatalog::builtin();
        let err = catalog.get_plan(&PlanId::new("platinum").unwrap()).unwrap_err();
        assert!(matches!(
            err,
            BillingError::NotFound { resource: Resource::Plan, .. }
        ));
    }

    #[test]
    fn new_ignores_duplicate_ids() {
        let basic = PlanCatalog::builtin().list_plans()[0].clone();
        let mut dup = basic.clone();
        dup.price_minor_units = 1;

        let catalog = PlanCatalog::new(vec![basic, dup]);
        assert_eq!(catalog.list_plans().len(), 1);
        assert_eq!(catalog.list_plans()[0].price_minor_units, 49_900);
    }

    #[test]
    fn every_builtin_plan_has_positive_price_and_duration() {
        for plan in PlanCatalog::builtin().list_plans() {
            assert!(plan.price_minor_units > 0);
            assert!(plan.duration_months >= 1);
        }
    }
}
