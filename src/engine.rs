//! Build configuration engine.
//!
//! The `engine` module turns a product list and a [`ConfigureRequest`]
//! into a [`Configuration`].  Generation allocates the budget across the
//! profile's categories and lets a [`SelectionStrategy`] pick products;
//! custom budgets are then refined toward the exact target.  Presets and
//! batches use the [`rayon`] crate to build several configurations from
//! one catalog snapshot in parallel.
//!
//! Everything here is a pure function of its arguments: the catalog and
//! the profile table are passed in on every call.

use crate::allocator::allocate;
use crate::catalog::CatalogIndex;
use crate::error::ConfigError;
use crate::models::{
    BudgetRangeKey, BudgetTarget, Configuration, ConfigureRequest, PcType, Product, StrategyKind,
    Warning,
};
use crate::money::Money;
use crate::profile::{Profile, ProfileTable};
use crate::refiner::refine;
use crate::strategy::{strategy_for, SelectionStrategy};
use rayon::prelude::*;
use std::collections::BTreeMap;

/// Generate a configuration for `budget` without refinement.
///
/// - When no required category has any product, every slot stays empty.
/// - When the budget does not exceed the cost of the cheapest required
///   parts, each required category takes its cheapest product and the
///   optional ones stay empty.
/// - Otherwise `strategy` picks the products.
///
/// Required categories left empty are reported as warnings.
#[tracing::instrument(skip_all, fields(pc_type = %profile.pc_type, budget = %budget, strategy = strategy.name()))]
pub fn generate(
    catalog: &CatalogIndex,
    profile: &Profile,
    budget: Money,
    strategy: &dyn SelectionStrategy,
) -> Configuration {
    let mut config = Configuration::empty(profile.pc_type, budget, profile.categories());
    config.allocation = allocate(budget, profile);

    let missing: Vec<_> = profile
        .required
        .iter()
        .copied()
        .filter(|c| !catalog.has_category(*c))
        .collect();
    for category in &missing {
        tracing::warn!(%category, "no eligible product for required category");
        config
            .warnings
            .push(Warning::MissingRequiredCategory { category: *category });
    }
    if !profile.required.is_empty() && missing.len() == profile.required.len() {
        return config;
    }

    let minimum = catalog.minimum_viable_cost(&profile.required);
    if budget <= minimum {
        tracing::debug!(%minimum, "budget at or below cheapest required parts");
        for category in &profile.required {
            let cheapest = catalog.cheapest(*category).cloned();
            config.components.insert(*category, cheapest);
        }
    } else {
        let selection = strategy.select(catalog, profile, &config.allocation, budget);
        for (category, pick) in selection {
            config.components.insert(category, pick.cloned());
        }
    }

    config.recompute_total();
    tracing::debug!(total = %config.total_price, "generated configuration");
    config
}

/// Validate `request` and build its configuration from `products`.
#[tracing::instrument(skip_all, fields(pc_type = %request.pc_type, products = products.len()))]
pub fn configure(
    products: &[Product],
    request: &ConfigureRequest,
    table: &ProfileTable,
) -> Result<Configuration, ConfigError> {
    let (pc_type, target) = request.validate()?;
    let profile = table.get(pc_type)?;
    let catalog = CatalogIndex::build(products);
    configure_with_index(&catalog, profile, target, request.strategy)
}

/// Build one configuration against an already indexed catalog.
pub fn configure_with_index(
    catalog: &CatalogIndex,
    profile: &Profile,
    target: BudgetTarget,
    strategy: StrategyKind,
) -> Result<Configuration, ConfigError> {
    let (budget, range) = match target {
        BudgetTarget::Range(key) => {
            let range = profile.range(key).ok_or_else(|| ConfigError::InvalidProfile {
                pc_type: profile.pc_type,
                reason: format!("missing {key:?} range"),
            })?;
            (range.max, Some(range))
        }
        BudgetTarget::Custom(amount) => (amount, None),
    };

    let mut config = generate(catalog, profile, budget, strategy_for(strategy));
    config.range = range;

    if budget < profile.minimum_viable_budget {
        config.warnings.push(Warning::BelowMinimumViableBudget {
            budget,
            minimum: profile.minimum_viable_budget,
        });
    }
    // nothing to refine when no required category can be filled
    let buildable =
        profile.required.is_empty() || profile.required.iter().any(|c| catalog.has_category(*c));
    match target {
        BudgetTarget::Custom(amount) if buildable => {
            let steps = refine(&mut config, catalog, profile, amount);
            tracing::debug!(steps, total = %config.total_price, "refined custom build");
        }
        _ => {}
    }
    Ok(config)
}

/// One configuration per predefined budget range of `pc_type`.
pub fn configure_presets(
    products: &[Product],
    pc_type: PcType,
    table: &ProfileTable,
) -> Result<BTreeMap<BudgetRangeKey, Configuration>, ConfigError> {
    let profile = table.get(pc_type)?;
    let catalog = CatalogIndex::build(products);
    BudgetRangeKey::ALL
        .as_slice()
        .par_iter()
        .map(|key| {
            configure_with_index(&catalog, profile, BudgetTarget::Range(*key), StrategyKind::default())
                .map(|config| (*key, config))
        })
        .collect()
}

/// Run many requests against one catalog snapshot.  Each request keeps
/// its own result so one invalid request does not fail the rest.
pub fn configure_batch(
    products: &[Product],
    requests: &[ConfigureRequest],
    table: &ProfileTable,
) -> Vec<Result<Configuration, ConfigError>> {
    let catalog = CatalogIndex::build(products);
    requests
        .par_iter()
        .map(|request| {
            let (pc_type, target) = request.validate()?;
            configure_with_index(&catalog, table.get(pc_type)?, target, request.strategy)
        })
        .collect()
}
