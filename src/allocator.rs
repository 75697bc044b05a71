//! Budget allocation.
//!
//! Splits a total budget into per-category sub-budgets using the
//! profile's weights.  Allocation never fails: a budget below the
//! profile's minimum still allocates, and the generator decides what
//! to do with sub-budgets nothing fits into.

use crate::models::Category;
use crate::money::Money;
use crate::profile::Profile;
use std::collections::BTreeMap;

/// Sub-budget per weighted category.
pub type Allocation = BTreeMap<Category, Money>;

/// Split `budget` across the profile's categories by weight, rounding each share to the cent.
pub fn allocate(budget: Money, profile: &Profile) -> Allocation {
    profile
        .weights
        .iter()
        .map(|(category, weight)| (*category, budget.scale(*weight)))
        .collect()
}
