//! Product selection strategies.
//!
//! A [`SelectionStrategy`] decides which product fills each weighted
//! category of a profile given the sub-budgets from the allocator.  The
//! engine is indifferent to how the choice is made, which allows the
//! category-local greedy pick to be swapped for a global optimisation
//! without touching generation or refinement.
//!
//! Strategies must be thread-safe (`Send + Sync`) because presets and
//! batches run them concurrently.

use crate::allocator::Allocation;
use crate::catalog::CatalogIndex;
use crate::models::{Category, Product, StrategyKind};
use crate::money::Money;
use crate::profile::{Profile, MAX_KNAPSACK_BUCKETS};
use std::collections::BTreeMap;

/// Chosen product per weighted category.
pub type Selection<'c> = BTreeMap<Category, Option<&'c Product>>;

pub trait SelectionStrategy: Send + Sync {
    fn name(&self) -> &str;

    /// Pick at most one product per category of `profile`.  Every
    /// weighted category must appear in the result, `None` when empty.
    fn select<'c>(
        &self,
        catalog: &'c CatalogIndex,
        profile: &Profile,
        allocation: &Allocation,
        budget: Money,
    ) -> Selection<'c>;
}

/// Resolve a strategy by kind.
pub fn strategy_for(kind: StrategyKind) -> &'static dyn SelectionStrategy {
    static GREEDY: Greedy = Greedy;
    static KNAPSACK: Knapsack = Knapsack;
    match kind {
        StrategyKind::Greedy => &GREEDY,
        StrategyKind::Knapsack => &KNAPSACK,
    }
}

/// Best fit under each sub-budget, one category at a time.
///
/// When nothing fits, a required category takes its cheapest product and
/// an optional one stays empty.
pub struct Greedy;

impl SelectionStrategy for Greedy {
    fn name(&self) -> &str {
        "greedy"
    }

    fn select<'c>(
        &self,
        catalog: &'c CatalogIndex,
        profile: &Profile,
        allocation: &Allocation,
        _budget: Money,
    ) -> Selection<'c> {
        profile
            .categories()
            .map(|category| {
                let sub_budget = allocation.get(&category).copied().unwrap_or(Money::ZERO);
                let pick = match catalog.best_fit_under(category, sub_budget) {
                    Some(fit) if !fit.overshoot || profile.is_required(category) => {
                        Some(fit.product)
                    }
                    _ => None,
                };
                (category, pick)
            })
            .collect()
    }
}

/// Multiple-choice knapsack over discretised prices.
///
/// The budget is cut into `profile.knapsack_buckets` buckets and each
/// product costs its price rounded up to whole buckets, so any feasible
/// assignment is within the real budget.  A pick is worth the amount it
/// spends inside its sub-budget plus half of whatever it spends beyond.
/// Required categories must be filled; when that cannot be done within
/// the budget the greedy choice is returned instead.
pub struct Knapsack;

#[derive(Debug, Clone, Copy)]
enum Choice {
    Skip,
    Pick(usize),
}

impl Knapsack {
    fn value(price: Money, sub_budget: Money) -> i64 {
        let inside = price.min(sub_budget).cents().max(0);
        let beyond = price.saturating_sub(sub_budget).cents();
        inside.saturating_mul(2).saturating_add(beyond)
    }
}

impl SelectionStrategy for Knapsack {
    fn name(&self) -> &str {
        "knapsack"
    }

    fn select<'c>(
        &self,
        catalog: &'c CatalogIndex,
        profile: &Profile,
        allocation: &Allocation,
        budget: Money,
    ) -> Selection<'c> {
        let buckets = profile.knapsack_buckets.clamp(1, MAX_KNAPSACK_BUCKETS) as i64;
        let budget_cents = budget.cents().max(0);
        let bucket = (budget_cents / buckets + i64::from(budget_cents % buckets != 0)).max(1);
        let capacity = ((budget_cents / bucket) as usize).min(MAX_KNAPSACK_BUCKETS);
        // prices round up to whole buckets; anything beyond the budget costs capacity + 1
        let cost = |p: &Product| {
            let cents = p.effective_price().cents().max(0);
            let buckets = cents / bucket + i64::from(cents % bucket != 0);
            usize::try_from(buckets).map_or(capacity + 1, |b| b.min(capacity + 1))
        };

        let categories: Vec<Category> = profile.categories().collect();
        // best[w]: best value with at most w buckets spent so far
        let mut best: Vec<Option<i64>> = vec![Some(0); capacity + 1];
        let mut choices: Vec<Vec<Option<Choice>>> = Vec::with_capacity(categories.len());

        for category in &categories {
            let products = catalog.by_category(*category);
            let sub_budget = allocation.get(category).copied().unwrap_or(Money::ZERO);
            let may_skip = !profile.is_required(*category) || products.is_empty();

            let mut next: Vec<Option<i64>> = vec![None; capacity + 1];
            let mut chosen: Vec<Option<Choice>> = vec![None; capacity + 1];
            for w in 0..=capacity {
                if may_skip {
                    if let Some(v) = best[w] {
                        next[w] = Some(v);
                        chosen[w] = Some(Choice::Skip);
                    }
                }
                for (i, product) in products.iter().enumerate() {
                    let c = cost(product);
                    if c > w {
                        // sorted by price, so every later product costs at least as much
                        break;
                    }
                    if let Some(v) = best[w - c] {
                        let v = v.saturating_add(Self::value(product.effective_price(), sub_budget));
                        if next[w].map_or(true, |cur| v > cur) {
                            next[w] = Some(v);
                            chosen[w] = Some(Choice::Pick(i));
                        }
                    }
                }
            }
            best = next;
            choices.push(chosen);
        }

        if best[capacity].is_none() {
            tracing::debug!(%budget, "no feasible knapsack assignment, using greedy selection");
            return Greedy.select(catalog, profile, allocation, budget);
        }

        let mut selection = Selection::new();
        let mut w = capacity;
        for (idx, category) in categories.iter().enumerate().rev() {
            let pick = match choices[idx][w] {
                Some(Choice::Pick(i)) => {
                    let product = &catalog.by_category(*category)[i];
                    w -= cost(product);
                    Some(product)
                }
                _ => None,
            };
            selection.insert(*category, pick);
        }
        selection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::allocate;
    use crate::models::fixtures::{product, small_catalog};
    use crate::models::PcType;

    fn price_of(selection: &Selection<'_>, category: Category) -> Option<Money> {
        selection[&category].map(Product::effective_price)
    }

    #[test]
    fn test_greedy_picks_best_fit_per_category() {
        let catalog = CatalogIndex::build(&small_catalog());
        let profile = Profile::builtin(PcType::Gaming);
        let budget = Money::from_decimal(700.0);
        let selection = Greedy.select(&catalog, &profile, &allocate(budget, &profile), budget);

        assert_eq!(price_of(&selection, Category::Processor), Some(Money::from_decimal(120.0)));
        assert_eq!(price_of(&selection, Category::Motherboard), Some(Money::from_decimal(60.0)));
        assert_eq!(price_of(&selection, Category::GraphicsCard), Some(Money::from_decimal(200.0)));
        assert_eq!(selection[&Category::Ram], None);
        assert_eq!(selection.len(), profile.weights.len());
    }

    #[test]
    fn test_greedy_skips_optional_overshoot_but_fills_required() {
        let mut products = small_catalog();
        products.push(product("ram-300", Category::Ram, 300.0));
        let catalog = CatalogIndex::build(&products);
        let profile = Profile::builtin(PcType::Gaming);
        let budget = Money::from_decimal(400.0);
        let selection = Greedy.select(&catalog, &profile, &allocate(budget, &profile), budget);

        // GPU sub-budget is 140, below every GPU: required, so cheapest
        assert_eq!(price_of(&selection, Category::GraphicsCard), Some(Money::from_decimal(200.0)));
        // RAM sub-budget is 32: optional, so left empty
        assert_eq!(selection[&Category::Ram], None);
    }

    #[test]
    fn test_knapsack_stays_within_budget() {
        let mut products = small_catalog();
        products.push(product("ram-40", Category::Ram, 40.0));
        products.push(product("ram-90", Category::Ram, 90.0));
        products.push(product("ssd-70", Category::Storage, 70.0));
        let catalog = CatalogIndex::build(&products);
        let profile = Profile::builtin(PcType::Gaming);

        for amount in [310.0, 450.0, 700.0, 1000.0, 5000.0] {
            let budget = Money::from_decimal(amount);
            let selection =
                Knapsack.select(&catalog, &profile, &allocate(budget, &profile), budget);
            let total: Money = selection.values().flatten().map(|p| p.effective_price()).sum();
            assert!(total <= budget, "{amount}: {total}");
            for category in &profile.required {
                assert!(selection[category].is_some(), "{amount}: {category} empty");
            }
        }
    }

    #[test]
    fn test_knapsack_spends_more_than_greedy_when_it_can() {
        let catalog = CatalogIndex::build(&small_catalog());
        let profile = Profile::builtin(PcType::Gaming);
        let budget = Money::from_decimal(700.0);
        let allocation = allocate(budget, &profile);

        let total = |s: &Selection<'_>| -> Money { s.values().flatten().map(|p| p.effective_price()).sum() };
        let greedy = Greedy.select(&catalog, &profile, &allocation, budget);
        let knapsack = Knapsack.select(&catalog, &profile, &allocation, budget);
        assert!(total(&knapsack) >= total(&greedy));
        assert!(total(&knapsack) <= budget);
    }

    #[test]
    fn test_knapsack_falls_back_to_greedy_when_infeasible() {
        let catalog = CatalogIndex::build(&small_catalog());
        let profile = Profile::builtin(PcType::Gaming);
        let budget = Money::from_decimal(100.0);
        let allocation = allocate(budget, &profile);
        assert_eq!(
            Knapsack.select(&catalog, &profile, &allocation, budget),
            Greedy.select(&catalog, &profile, &allocation, budget)
        );
    }

    #[test]
    fn test_knapsack_table_is_bounded_by_bucket_cap() {
        let catalog = CatalogIndex::build(&small_catalog());
        let mut profile = Profile::builtin(PcType::Gaming);
        // bypasses validation, as a profile built in code may
        profile.knapsack_buckets = 1_000_000_000_000;
        let budget = Money::from_decimal(1e9);
        let selection = Knapsack.select(&catalog, &profile, &allocate(budget, &profile), budget);
        assert_eq!(price_of(&selection, Category::GraphicsCard), Some(Money::from_decimal(500.0)));
        assert_eq!(price_of(&selection, Category::Processor), Some(Money::from_decimal(120.0)));
    }

    #[test]
    fn test_knapsack_handles_largest_budget_and_prices() {
        let mut products = small_catalog();
        products.push(product("gpu-max", Category::GraphicsCard, 1e13));
        let catalog = CatalogIndex::build(&products);
        let profile = Profile::builtin(PcType::Gaming);
        let budget = Money::MAX;
        let selection = Knapsack.select(&catalog, &profile, &allocate(budget, &profile), budget);
        let total: Money = selection.values().flatten().map(|p| p.effective_price()).sum();
        assert!(total <= budget);
        for category in &profile.required {
            assert!(selection[category].is_some(), "{category} empty");
        }
    }

    #[test]
    fn test_strategy_for() {
        assert_eq!(strategy_for(StrategyKind::Greedy).name(), "greedy");
        assert_eq!(strategy_for(StrategyKind::Knapsack).name(), "knapsack");
    }
}
