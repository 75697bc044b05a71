//! Custom budget refinement.
//!
//! After generation a custom build gets at most one corrective pass:
//! downgrades when it is over the target by more than the profile's
//! overshoot tolerance, upgrades when more than the profile's upgrade
//! slack is left unspent.  Every step moves one category to its adjacent
//! price neighbour and a category moves at most once per pass, so the
//! number of steps is bounded by the number of weighted categories.

use crate::catalog::CatalogIndex;
use crate::models::{Category, Configuration, Direction, Product, RefinementStep, Warning};
use crate::money::Money;
use crate::profile::Profile;
use std::cmp::Reverse;
use std::collections::BTreeSet;

/// Refine `config` toward `target`, returning the number of steps taken.
pub fn refine(
    config: &mut Configuration,
    catalog: &CatalogIndex,
    profile: &Profile,
    target: Money,
) -> usize {
    config.recompute_total();
    let before = config.refinement.len();
    let over_limit = target + target.scale(profile.overshoot_tolerance);

    if config.total_price > over_limit {
        downgrade_pass(config, catalog, profile, target);
        if config.total_price > target {
            tracing::warn!(%target, total = %config.total_price, "build remains over the custom budget");
            config.warnings.push(Warning::OverBudget {
                target,
                total: config.total_price,
            });
        }
    } else {
        upgrade_pass(config, catalog, profile, target);
    }
    config.refinement.len() - before
}

fn downgrade_pass(config: &mut Configuration, catalog: &CatalogIndex, profile: &Profile, target: Money) {
    let mut moved = BTreeSet::new();
    while config.total_price > target {
        // optional slots first, most overpriced first; then required slots,
        // least critical first
        let candidate = profile
            .categories()
            .filter(|c| !moved.contains(c))
            .filter_map(|category| {
                let current = config.selected(category)?;
                let cheaper = catalog.priciest_below(category, current.effective_price())?;
                let required = profile.is_required(category);
                let overpriced = if required {
                    0
                } else {
                    let sub_budget = config.allocation.get(&category).copied().unwrap_or(Money::ZERO);
                    (current.effective_price() - sub_budget).cents()
                };
                let key = (required, Reverse(overpriced), Reverse(profile.rank(category)));
                Some((key, category, cheaper.clone()))
            })
            .min_by_key(|(key, _, _)| *key);

        let Some((_, category, cheaper)) = candidate else {
            break;
        };
        apply(config, category, cheaper, Direction::Downgrade);
        moved.insert(category);
    }
}

fn upgrade_pass(config: &mut Configuration, catalog: &CatalogIndex, profile: &Profile, target: Money) {
    let threshold = target.scale(profile.upgrade_slack);
    let mut moved = BTreeSet::new();
    loop {
        let slack = target.saturating_sub(config.total_price);
        if slack <= threshold {
            break;
        }
        let candidate = profile
            .priority
            .iter()
            .copied()
            .filter(|c| !moved.contains(c))
            .find_map(|category| {
                let (next, delta) = match config.selected(category) {
                    Some(current) => {
                        let price = current.effective_price();
                        let next = catalog.cheapest_above(category, price)?;
                        (next, next.effective_price() - price)
                    }
                    None => {
                        let next = catalog.cheapest(category)?;
                        (next, next.effective_price())
                    }
                };
                (delta <= slack).then(|| (category, next.clone()))
            });

        let Some((category, next)) = candidate else {
            break;
        };
        apply(config, category, next, Direction::Upgrade);
        moved.insert(category);
    }
}

fn apply(config: &mut Configuration, category: Category, product: Product, direction: Direction) {
    let from = config.selected(category).map(Product::effective_price);
    let to = product.effective_price();
    tracing::debug!(%category, ?direction, ?from, %to, "refinement step");
    config.components.insert(category, Some(product));
    config.refinement.push(RefinementStep {
        category,
        direction,
        from,
        to,
    });
    config.recompute_total();
}
