//! Data models for the build engine.
//!
//! The `models` module defines the serialisable types that flow in and
//! out of the engine: catalog products, the PC type and budget a caller
//! asks for, and the configuration that comes back.  Wire names are
//! camelCase so the storefront can post its product documents as-is.

use crate::error::ConfigError;
use crate::money::Money;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Component categories sold by the storefront.
///
/// The ordering of the variants is the order slots appear in a
/// configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Processor,
    Motherboard,
    #[serde(rename = "Graphics Card")]
    GraphicsCard,
    #[serde(rename = "RAM")]
    Ram,
    Storage,
    #[serde(rename = "Power Supply")]
    PowerSupply,
    Case,
    Monitor,
    #[serde(rename = "Cooling Fan")]
    CoolingFan,
    Mouse,
    Keyboard,
    Headset,
}

impl Category {
    /// Display label, identical to the serialised name.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Processor => "Processor",
            Category::Motherboard => "Motherboard",
            Category::GraphicsCard => "Graphics Card",
            Category::Ram => "RAM",
            Category::Storage => "Storage",
            Category::PowerSupply => "Power Supply",
            Category::Case => "Case",
            Category::Monitor => "Monitor",
            Category::CoolingFan => "Cooling Fan",
            Category::Mouse => "Mouse",
            Category::Keyboard => "Keyboard",
            Category::Headset => "Headset",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A product from the storefront catalog.  The engine only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Catalog identifier.  Documents exported from the store use `_id`.
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub category: Category,
    /// Regular price.
    pub price: Money,
    #[serde(default)]
    pub on_discount: bool,
    /// Sale price; only honoured while `on_discount` is set.
    #[serde(default)]
    pub discount_price: Option<Money>,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub model_no: String,
    #[serde(default)]
    pub description: String,
}

impl Product {
    /// The price a customer pays right now.
    ///
    /// A discount price counts only while the product is on discount and
    /// the discount is actually below the regular price.
    pub fn effective_price(&self) -> Money {
        match self.discount_price {
            Some(discount) if self.on_discount && discount < self.price => discount,
            _ => self.price,
        }
    }

    /// Whether the product can be put into a build.
    pub fn is_eligible(&self) -> bool {
        self.stock > 0 && !self.effective_price().is_negative()
    }
}

/// The kind of machine being configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PcType {
    Gaming,
    Productivity,
    Regular,
}

impl PcType {
    pub const ALL: [PcType; 3] = [PcType::Gaming, PcType::Productivity, PcType::Regular];

    pub fn as_str(&self) -> &'static str {
        match self {
            PcType::Gaming => "gaming",
            PcType::Productivity => "productivity",
            PcType::Regular => "regular",
        }
    }
}

impl FromStr for PcType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gaming" => Ok(PcType::Gaming),
            "productivity" => Ok(PcType::Productivity),
            "regular" => Ok(PcType::Regular),
            _ => Err(ConfigError::UnknownPcType(s.to_string())),
        }
    }
}

impl fmt::Display for PcType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Predefined price brackets offered per PC type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BudgetRangeKey {
    Budget,
    MidRange,
    HighEnd,
}

impl BudgetRangeKey {
    pub const ALL: [BudgetRangeKey; 3] = [
        BudgetRangeKey::Budget,
        BudgetRangeKey::MidRange,
        BudgetRangeKey::HighEnd,
    ];
}

/// A `(min, max)` price bracket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: Money,
    pub max: Money,
}

impl PriceRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self {
            min: Money::from_decimal(min),
            max: Money::from_decimal(max),
        }
    }
}

/// What the caller wants to spend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetTarget {
    /// One of the profile's predefined brackets.
    Range(BudgetRangeKey),
    /// An exact amount; custom builds are refined toward it.
    Custom(Money),
}

/// How products are picked per category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Best fit under each sub-budget, category by category.
    #[default]
    Greedy,
    /// Multiple-choice knapsack over discretised price buckets.
    Knapsack,
}

/// A configuration request as posted by the storefront.
///
/// `pc_type` stays a string so that an unknown type surfaces as a
/// [`ConfigError`] instead of a deserialisation failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigureRequest {
    pub pc_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_range: Option<BudgetRangeKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_budget: Option<f64>,
    #[serde(default)]
    pub strategy: StrategyKind,
}

impl ConfigureRequest {
    pub fn range(pc_type: PcType, key: BudgetRangeKey) -> Self {
        Self {
            pc_type: pc_type.to_string(),
            budget_range: Some(key),
            custom_budget: None,
            strategy: StrategyKind::default(),
        }
    }

    pub fn custom(pc_type: PcType, amount: f64) -> Self {
        Self {
            pc_type: pc_type.to_string(),
            budget_range: None,
            custom_budget: Some(amount),
            strategy: StrategyKind::default(),
        }
    }

    pub fn with_strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = strategy;
        self
    }

    /// Check the request and turn it into typed values.
    ///
    /// Runs before any allocation work so that bad input never reaches
    /// the generator.
    pub fn validate(&self) -> Result<(PcType, BudgetTarget), ConfigError> {
        let pc_type: PcType = self.pc_type.parse()?;
        let target = match (self.budget_range, self.custom_budget) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::InvalidInput(
                    "specify either budgetRange or customBudget, not both".into(),
                ))
            }
            (None, None) => {
                return Err(ConfigError::InvalidInput(
                    "one of budgetRange or customBudget is required".into(),
                ))
            }
            (Some(key), None) => BudgetTarget::Range(key),
            (None, Some(amount)) => {
                if !amount.is_finite() || amount <= 0.0 {
                    return Err(ConfigError::InvalidBudget(amount));
                }
                match Money::try_from_decimal(amount) {
                    Some(budget) if budget > Money::ZERO => BudgetTarget::Custom(budget),
                    _ => return Err(ConfigError::InvalidBudget(amount)),
                }
            }
        };
        Ok((pc_type, target))
    }
}

/// Non-fatal conditions the caller should surface to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Warning {
    /// A required category has no product in stock.
    #[serde(rename_all = "camelCase")]
    MissingRequiredCategory { category: Category },
    /// The budget is under the profile's documented minimum.
    #[serde(rename_all = "camelCase")]
    BelowMinimumViableBudget { budget: Money, minimum: Money },
    /// Refinement could not bring the build under the custom target.
    #[serde(rename_all = "camelCase")]
    OverBudget { target: Money, total: Money },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Downgrade,
    Upgrade,
}

/// One move of the refiner: a category swapped for its price neighbour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefinementStep {
    pub category: Category,
    pub direction: Direction,
    /// Price of the previous pick; `None` when the slot was empty.
    pub from: Option<Money>,
    pub to: Money,
}

/// A generated build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    pub pc_type: PcType,
    /// Selected product per profile category; `None` for empty slots.
    pub components: BTreeMap<Category, Option<Product>>,
    /// Exact sum of the effective prices of the selected products.
    pub total_price: Money,
    /// Amount the allocation was computed from.
    pub budget: Money,
    /// The bracket the budget came from, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<PriceRange>,
    pub allocation: BTreeMap<Category, Money>,
    #[serde(default)]
    pub warnings: Vec<Warning>,
    #[serde(default)]
    pub refinement: Vec<RefinementStep>,
}

impl Configuration {
    /// A configuration with every slot empty and a zero total.
    pub fn empty(pc_type: PcType, budget: Money, categories: impl IntoIterator<Item = Category>) -> Self {
        Self {
            pc_type,
            components: categories.into_iter().map(|c| (c, None)).collect(),
            total_price: Money::ZERO,
            budget,
            range: None,
            allocation: BTreeMap::new(),
            warnings: Vec::new(),
            refinement: Vec::new(),
        }
    }

    pub fn selected(&self, category: Category) -> Option<&Product> {
        self.components.get(&category).and_then(Option::as_ref)
    }

    /// Recompute `total_price` from the selected products.
    pub fn recompute_total(&mut self) {
        self.total_price = self
            .components
            .values()
            .flatten()
            .map(Product::effective_price)
            .sum();
    }

    /// True when no required category was left empty.
    pub fn is_complete(&self) -> bool {
        !self
            .warnings
            .iter()
            .any(|w| matches!(w, Warning::MissingRequiredCategory { .. }))
    }

    /// True when no slot holds a product.
    pub fn is_empty(&self) -> bool {
        self.components.values().all(Option::is_none)
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::product;
    use super::*;

    #[test]
    fn test_effective_price_honours_discount() {
        let mut p = product("gpu", Category::GraphicsCard, 400.0);
        p.discount_price = Some(Money::from_decimal(350.0));
        assert_eq!(p.effective_price(), Money::from_decimal(400.0));

        p.on_discount = true;
        assert_eq!(p.effective_price(), Money::from_decimal(350.0));

        // a "discount" above the regular price is ignored
        p.discount_price = Some(Money::from_decimal(450.0));
        assert_eq!(p.effective_price(), Money::from_decimal(400.0));
    }

    #[test]
    fn test_out_of_stock_is_not_eligible() {
        let mut p = product("ram", Category::Ram, 80.0);
        assert!(p.is_eligible());
        p.stock = 0;
        assert!(!p.is_eligible());
    }

    #[test]
    fn test_product_wire_format() {
        let json = r#"{
            "_id": "65f0c1",
            "name": "RTX 4070",
            "category": "Graphics Card",
            "price": 599.99,
            "onDiscount": true,
            "discountPrice": 549.99,
            "stock": 3,
            "brand": "Nvidia",
            "modelNo": "4070-FE"
        }"#;
        let p: Product = serde_json::from_str(json).unwrap();
        assert_eq!(p.id, "65f0c1");
        assert_eq!(p.category, Category::GraphicsCard);
        assert_eq!(p.effective_price().cents(), 54999);
        assert_eq!(p.model_no, "4070-FE");
    }

    #[test]
    fn test_pc_type_parse() {
        assert_eq!("Gaming".parse::<PcType>().unwrap(), PcType::Gaming);
        assert!(matches!(
            "workstation".parse::<PcType>(),
            Err(ConfigError::UnknownPcType(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_budgets() {
        for amount in [0.0, -10.0, f64::NAN, f64::INFINITY, 0.001, 1e13 + 1.0, 1e17] {
            let req = ConfigureRequest::custom(PcType::Gaming, amount);
            assert!(matches!(req.validate(), Err(ConfigError::InvalidBudget(_))), "{amount}");
        }

        // the caller's amount is reported, not its rounded form
        match ConfigureRequest::custom(PcType::Gaming, 0.004).validate() {
            Err(ConfigError::InvalidBudget(reported)) => assert_eq!(reported, 0.004),
            other => panic!("expected InvalidBudget, got {other:?}"),
        }

        let mut both = ConfigureRequest::custom(PcType::Gaming, 700.0);
        both.budget_range = Some(BudgetRangeKey::Budget);
        assert!(matches!(both.validate(), Err(ConfigError::InvalidInput(_))));

        let mut neither = ConfigureRequest::custom(PcType::Gaming, 700.0);
        neither.custom_budget = None;
        assert!(matches!(neither.validate(), Err(ConfigError::InvalidInput(_))));
    }

    #[test]
    fn test_validate_accepts_range_and_custom() {
        let (pc, target) = ConfigureRequest::range(PcType::Regular, BudgetRangeKey::HighEnd)
            .validate()
            .unwrap();
        assert_eq!(pc, PcType::Regular);
        assert_eq!(target, BudgetTarget::Range(BudgetRangeKey::HighEnd));

        let (_, target) = ConfigureRequest::custom(PcType::Gaming, 700.0).validate().unwrap();
        assert_eq!(target, BudgetTarget::Custom(Money::from_decimal(700.0)));

        let (_, target) = ConfigureRequest::custom(PcType::Gaming, 1e13).validate().unwrap();
        assert_eq!(target, BudgetTarget::Custom(Money::MAX));
    }

    #[test]
    fn test_configuration_components_serialise_with_category_labels() {
        let mut config = Configuration::empty(
            PcType::Gaming,
            Money::from_decimal(700.0),
            [Category::GraphicsCard, Category::Processor],
        );
        config.components.insert(
            Category::Processor,
            Some(product("cpu", Category::Processor, 120.0)),
        );
        config.recompute_total();
        let value = serde_json::to_value(&config).unwrap();
        assert!(value["components"]["Graphics Card"].is_null());
        assert_eq!(value["components"]["Processor"]["id"], "cpu");
        assert_eq!(value["totalPrice"], 120.0);
    }
}
