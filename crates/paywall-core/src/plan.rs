//! # Plans & Pricing
//!
//! Subscription plan catalog (`planType` -> provider price id) and the
//! flat price charged for a single download.

use crate::checkout::Currency;
use crate::error::{PaymentError, PaymentResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Plan types the storefront offers, with the env var holding each price id
pub const DEFAULT_PLANS: &[(&str, &str)] = &[
    ("1_month", "STRIPE_PRICE_1_MONTH"),
    ("6_months", "STRIPE_PRICE_6_MONTHS"),
    ("1_year", "STRIPE_PRICE_1_YEAR"),
];

/// Price charged for one pay-per-download checkout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadPricing {
    /// Amount in the smallest currency unit (199 = 1.99)
    #[serde(default = "default_unit_amount")]
    pub unit_amount: i64,

    #[serde(default)]
    pub currency: Currency,

    /// Product name prefix; the resource id is appended
    #[serde(default = "default_name_prefix")]
    pub name_prefix: String,
}

fn default_unit_amount() -> i64 {
    199
}

fn default_name_prefix() -> String {
    "Resource".to_string()
}

impl Default for DownloadPricing {
    fn default() -> Self {
        Self {
            unit_amount: default_unit_amount(),
            currency: Currency::default(),
            name_prefix: default_name_prefix(),
        }
    }
}

impl DownloadPricing {
    pub fn product_name(&self, resource_id: &str) -> String {
        format!("{} {}", self.name_prefix, resource_id)
    }
}

/// Catalog of subscription plans
///
/// A plan listed without a price id is known but not purchasable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanCatalog {
    plans: BTreeMap<String, Option<String>>,
}

impl PlanCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with the default plan types and no prices yet
    pub fn with_default_plans() -> Self {
        let mut catalog = Self::new();
        for (plan, _) in DEFAULT_PLANS {
            catalog.plans.insert(plan.to_string(), None);
        }
        catalog
    }

    /// Builder: set the price for a plan
    pub fn with_price(mut self, plan_type: impl Into<String>, price_id: impl Into<String>) -> Self {
        self.set_price(plan_type, price_id);
        self
    }

    pub fn set_price(&mut self, plan_type: impl Into<String>, price_id: impl Into<String>) {
        self.plans.insert(plan_type.into(), Some(price_id.into()));
    }

    /// Fill in prices from the default env vars for plans already in the
    /// catalog; existing prices are overridden
    pub fn apply_env(&mut self) {
        self.apply_prices(DEFAULT_PLANS.iter().filter_map(|(plan, var)| {
            std::env::var(var).ok().map(|price| (*plan, price))
        }));
    }

    /// Override prices of known plans; unknown plans and blank prices are ignored
    pub fn apply_prices<'a, I>(&mut self, prices: I)
    where
        I: IntoIterator<Item = (&'a str, String)>,
    {
        for (plan, price) in prices {
            let price = price.trim();
            if price.is_empty() {
                continue;
            }
            if let Some(slot) = self.plans.get_mut(plan) {
                *slot = Some(price.to_string());
            }
        }
    }

    /// Resolve a plan type to its price id
    pub fn price_for(&self, plan_type: &str) -> PaymentResult<&str> {
        self.plans
            .get(plan_type)
            .and_then(|p| p.as_deref())
            .ok_or_else(|| PaymentError::UnknownPlan {
                received: plan_type.to_string(),
                expected: self.plan_types(),
            })
    }

    /// All known plan types, sorted
    pub fn plan_types(&self) -> Vec<String> {
        self.plans.keys().cloned().collect()
    }

    /// Which plans have a price configured
    pub fn price_presence(&self) -> BTreeMap<String, bool> {
        self.plans
            .iter()
            .map(|(plan, price)| (plan.clone(), price.is_some()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_pricing_defaults() {
        let pricing = DownloadPricing::default();
        assert_eq!(pricing.unit_amount, 199);
        assert_eq!(pricing.currency, Currency::EUR);
        assert_eq!(pricing.product_name("r1"), "Resource r1");
    }

    #[test]
    fn test_price_lookup() {
        let catalog = PlanCatalog::with_default_plans().with_price("1_month", "price_m1");

        assert_eq!(catalog.price_for("1_month").unwrap(), "price_m1");
        assert_eq!(catalog.len(), 3);

        match catalog.price_for("6_months") {
            Err(PaymentError::UnknownPlan { received, expected }) => {
                assert_eq!(received, "6_months");
                assert_eq!(expected, vec!["1_month", "1_year", "6_months"]);
            }
            other => panic!("unexpected: {:?}", other),
        }

        assert!(catalog.price_for("lifetime").is_err());
    }

    #[test]
    fn test_price_presence() {
        let catalog = PlanCatalog::with_default_plans().with_price("1_year", "price_y");
        let presence = catalog.price_presence();
        assert_eq!(presence.get("1_year"), Some(&true));
        assert_eq!(presence.get("1_month"), Some(&false));
    }

    #[test]
    fn test_apply_prices_only_touches_known_plans() {
        let mut catalog = PlanCatalog::with_default_plans();
        catalog.apply_prices([
            ("1_month", " price_m ".to_string()),
            ("6_months", "   ".to_string()),
            ("lifetime", "price_l".to_string()),
        ]);

        assert_eq!(catalog.price_for("1_month").unwrap(), "price_m");
        assert!(catalog.price_for("6_months").is_err());
        assert!(catalog.price_for("lifetime").is_err());
        assert_eq!(catalog.len(), 3);
    }

    #[test]
    fn test_deserialize_from_toml() {
        let catalog: PlanCatalog = toml::from_str(
            r#"
            1_month = "price_a"
            "#,
        )
        .unwrap();
        assert_eq!(catalog.price_for("1_month").unwrap(), "price_a");
    }
}
