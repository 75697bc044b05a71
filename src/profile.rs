//! PC type profiles.
//!
//! A [`Profile`] carries everything about a PC type that used to be a
//! tuned constant: the share of the budget each category receives, which
//! categories a build cannot do without, the order in which categories
//! matter, the predefined budget brackets and the refinement tolerances.
//! The [`ProfileTable`] starts from built-in defaults and may be
//! overridden per PC type by JSON files in a directory.

use crate::error::ConfigError;
use crate::models::{BudgetRangeKey, Category, PcType, PriceRange};
use crate::money::Money;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Allowed distance of the weight sum from 1.0.
const WEIGHT_SUM_EPSILON: f64 = 0.01;

/// Upper bound on `knapsackBuckets`; the knapsack table has one row per bucket.
pub const MAX_KNAPSACK_BUCKETS: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub pc_type: PcType,
    /// Fraction of the total budget per category.
    pub weights: BTreeMap<Category, f64>,
    /// Categories that must be filled whenever the catalog allows it.
    pub required: BTreeSet<Category>,
    /// Weighted categories, most critical first.
    pub priority: Vec<Category>,
    pub ranges: BTreeMap<BudgetRangeKey, PriceRange>,
    pub minimum_viable_budget: Money,
    /// Fraction of a custom target a build may exceed before downgrading.
    pub overshoot_tolerance: f64,
    /// Fraction of a custom target that must stay unspent for another upgrade.
    pub upgrade_slack: f64,
    #[serde(default = "default_knapsack_buckets")]
    pub knapsack_buckets: usize,
}

fn default_knapsack_buckets() -> usize {
    500
}

impl Profile {
    /// Weighted categories in slot order.
    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.weights.keys().copied()
    }

    pub fn is_required(&self, category: Category) -> bool {
        self.required.contains(&category)
    }

    /// Position in the priority order; lower is more critical.
    pub fn rank(&self, category: Category) -> usize {
        self.priority
            .iter()
            .position(|c| *c == category)
            .unwrap_or(self.priority.len())
    }

    pub fn range(&self, key: BudgetRangeKey) -> Option<PriceRange> {
        self.ranges.get(&key).copied()
    }

    /// Check the invariants the allocator and refiner rely on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidProfile {
            pc_type: self.pc_type,
            reason,
        };

        if self.weights.is_empty() {
            return Err(invalid("no category weights".into()));
        }
        if let Some((category, w)) = self
            .weights
            .iter()
            .find(|(_, w)| !w.is_finite() || **w < 0.0)
        {
            return Err(invalid(format!("weight for {category} is {w}")));
        }
        let sum: f64 = self.weights.values().sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_EPSILON {
            return Err(invalid(format!("weights sum to {sum:.4}, expected 1.0")));
        }
        if let Some(category) = self.required.iter().find(|c| !self.weights.contains_key(*c)) {
            return Err(ConfigError::UnweightedRequiredCategory {
                pc_type: self.pc_type,
                category: *category,
            });
        }

        let ranked: BTreeSet<Category> = self.priority.iter().copied().collect();
        if ranked.len() != self.priority.len() {
            return Err(invalid("priority lists a category twice".into()));
        }
        if !self.weights.keys().all(|c| ranked.contains(c)) || ranked.len() != self.weights.len() {
            return Err(invalid("priority must rank exactly the weighted categories".into()));
        }

        for key in BudgetRangeKey::ALL {
            match self.ranges.get(&key) {
                None => return Err(invalid(format!("missing {key:?} range"))),
                Some(range) if range.min > range.max || range.max <= Money::ZERO => {
                    return Err(invalid(format!("{key:?} range {}..{} is empty", range.min, range.max)))
                }
                Some(_) => {}
            }
        }
        if self.minimum_viable_budget.is_negative() {
            return Err(invalid("negative minimum viable budget".into()));
        }
        for (name, value) in [
            ("overshootTolerance", self.overshoot_tolerance),
            ("upgradeSlack", self.upgrade_slack),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(format!("{name} must be a non-negative fraction, got {value}")));
            }
        }
        if !(1..=MAX_KNAPSACK_BUCKETS).contains(&self.knapsack_buckets) {
            return Err(invalid(format!(
                "knapsackBuckets must be between 1 and {MAX_KNAPSACK_BUCKETS}, got {}",
                self.knapsack_buckets
            )));
        }
        Ok(())
    }

    /// The built-in profile for a PC type.
    pub fn builtin(pc_type: PcType) -> Self {
        use Category::*;

        let (weights, required, priority, ranges, minimum): (
            Vec<(Category, f64)>,
            Vec<Category>,
            [Category; 7],
            [(f64, f64); 3],
            f64,
        ) = match pc_type {
            PcType::Gaming => (
                vec![
                    (Processor, 0.20),
                    (GraphicsCard, 0.35),
                    (Motherboard, 0.12),
                    (Ram, 0.08),
                    (Storage, 0.10),
                    (PowerSupply, 0.07),
                    (Case, 0.08),
                ],
                vec![Processor, Motherboard, GraphicsCard],
                [GraphicsCard, Processor, Ram, Motherboard, Storage, PowerSupply, Case],
                [(600.0, 1000.0), (1000.0, 1800.0), (1800.0, 3500.0)],
                500.0,
            ),
            PcType::Productivity => (
                vec![
                    (Processor, 0.30),
                    (GraphicsCard, 0.12),
                    (Motherboard, 0.13),
                    (Ram, 0.15),
                    (Storage, 0.15),
                    (PowerSupply, 0.07),
                    (Case, 0.08),
                ],
                vec![Processor, Motherboard],
                [Processor, Ram, Storage, Motherboard, GraphicsCard, PowerSupply, Case],
                [(500.0, 900.0), (900.0, 1600.0), (1600.0, 3000.0)],
                400.0,
            ),
            PcType::Regular => (
                vec![
                    (Processor, 0.25),
                    (GraphicsCard, 0.10),
                    (Motherboard, 0.15),
                    (Ram, 0.12),
                    (Storage, 0.15),
                    (PowerSupply, 0.10),
                    (Case, 0.13),
                ],
                vec![Processor, Motherboard],
                [Processor, Storage, Ram, Motherboard, GraphicsCard, PowerSupply, Case],
                [(300.0, 600.0), (600.0, 1000.0), (1000.0, 1800.0)],
                250.0,
            ),
        };

        Profile {
            pc_type,
            weights: weights.into_iter().collect(),
            required: required.into_iter().collect(),
            priority: priority.to_vec(),
            ranges: BudgetRangeKey::ALL
                .into_iter()
                .zip(ranges)
                .map(|(key, (min, max))| (key, PriceRange::new(min, max)))
                .collect(),
            minimum_viable_budget: Money::from_decimal(minimum),
            overshoot_tolerance: 0.02,
            upgrade_slack: 0.25,
            knapsack_buckets: default_knapsack_buckets(),
        }
    }
}

/// The active profile per PC type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileTable {
    profiles: BTreeMap<PcType, Profile>,
}

impl Default for ProfileTable {
    fn default() -> Self {
        Self {
            profiles: PcType::ALL
                .into_iter()
                .map(|pc| (pc, Profile::builtin(pc)))
                .collect(),
        }
    }
}

impl ProfileTable {
    /// A table holding exactly the given profiles, each validated.
    pub fn from_profiles(profiles: impl IntoIterator<Item = Profile>) -> Result<Self, ConfigError> {
        let mut table = Self {
            profiles: BTreeMap::new(),
        };
        for profile in profiles {
            table.insert(profile)?;
        }
        Ok(table)
    }

    pub fn get(&self, pc_type: PcType) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(&pc_type)
            .ok_or(ConfigError::MissingProfile(pc_type))
    }

    /// Validate and install a profile, replacing any previous one.
    pub fn insert(&mut self, profile: Profile) -> Result<(), ConfigError> {
        profile.validate()?;
        self.profiles.insert(profile.pc_type, profile);
        Ok(())
    }

    pub fn profiles(&self) -> impl Iterator<Item = &Profile> {
        self.profiles.values()
    }

    /// Built-in defaults overridden by every valid profile found in `path`.
    ///
    /// Any `.json` file in the directory is parsed as a [`Profile`].  Files
    /// that fail to parse or validate are logged and skipped so that one
    /// bad file does not take the service down.  A missing directory
    /// leaves the defaults untouched.
    pub fn load_from_dir(path: &Path) -> Result<Self, ConfigError> {
        let mut table = Self::default();
        if !path.is_dir() {
            tracing::info!(dir = %path.display(), "profile directory not found, using built-in profiles");
            return Ok(table);
        }

        let mut files = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            let file = entry.path();
            if entry.file_type()?.is_file() && file.extension().is_some_and(|ext| ext == "json") {
                files.push(file);
            }
        }
        // later files win; sort so the outcome does not depend on readdir order
        files.sort();

        for file in files {
            let data = std::fs::read_to_string(&file)?;
            let profile = match serde_json::from_str::<Profile>(&data) {
                Ok(profile) => profile,
                Err(err) => {
                    tracing::warn!(file = %file.display(), error = %err, "failed to parse profile");
                    continue;
                }
            };
            let pc_type = profile.pc_type;
            match table.insert(profile) {
                Ok(()) => tracing::info!(file = %file.display(), %pc_type, "loaded profile"),
                Err(err) => tracing::warn!(file = %file.display(), error = %err, "rejected profile"),
            }
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_profiles_are_valid() {
        for pc in PcType::ALL {
            Profile::builtin(pc).validate().unwrap();
        }
        let gaming = Profile::builtin(PcType::Gaming);
        assert!(gaming.is_required(Category::GraphicsCard));
        assert_eq!(gaming.rank(Category::GraphicsCard), 0);
        assert!(!Profile::builtin(PcType::Regular).is_required(Category::GraphicsCard));
    }

    #[test]
    fn test_validate_rejects_weights_not_summing_to_one() {
        let mut profile = Profile::builtin(PcType::Gaming);
        profile.weights.insert(Category::Case, 0.30);
        assert!(matches!(
            profile.validate(),
            Err(ConfigError::InvalidProfile { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_unweighted_required_category() {
        let mut profile = Profile::builtin(PcType::Regular);
        profile.required.insert(Category::Monitor);
        assert!(matches!(
            profile.validate(),
            Err(ConfigError::UnweightedRequiredCategory {
                category: Category::Monitor,
                ..
            })
        ));
    }

    #[test]
    fn test_validate_rejects_incomplete_priority() {
        let mut profile = Profile::builtin(PcType::Productivity);
        profile.priority.pop();
        assert!(profile.validate().is_err());

        let mut profile = Profile::builtin(PcType::Productivity);
        profile.priority.push(Category::Processor);
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_range() {
        let mut profile = Profile::builtin(PcType::Gaming);
        profile
            .ranges
            .insert(BudgetRangeKey::Budget, PriceRange::new(900.0, 600.0));
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_validate_bounds_knapsack_buckets() {
        let mut profile = Profile::builtin(PcType::Gaming);
        for buckets in [0, MAX_KNAPSACK_BUCKETS + 1, 1_000_000_000_000] {
            profile.knapsack_buckets = buckets;
            assert!(
                matches!(profile.validate(), Err(ConfigError::InvalidProfile { .. })),
                "{buckets}"
            );
        }
        profile.knapsack_buckets = MAX_KNAPSACK_BUCKETS;
        assert!(profile.validate().is_ok());
    }

    #[test]
    fn test_profile_round_trips_through_json() {
        let profile = Profile::builtin(PcType::Gaming);
        let json = serde_json::to_string_pretty(&profile).unwrap();
        assert!(json.contains("\"Graphics Card\": 0.35"));
        let back: Profile = serde_json::from_str(&json).unwrap();
        assert_eq!(back, profile);
    }

    #[test]
    fn test_load_from_dir_overrides_and_skips_bad_files() {
        let dir = tempfile::tempdir().unwrap();

        let mut regular = Profile::builtin(PcType::Regular);
        regular.upgrade_slack = 0.10;
        let mut f = std::fs::File::create(dir.path().join("regular.json")).unwrap();
        f.write_all(serde_json::to_string(&regular).unwrap().as_bytes())
            .unwrap();

        let mut broken = Profile::builtin(PcType::Gaming);
        broken.weights.clear();
        std::fs::write(
            dir.path().join("gaming.json"),
            serde_json::to_string(&broken).unwrap(),
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.json"), "{ not json").unwrap();
        std::fs::write(dir.path().join("readme.txt"), "ignored").unwrap();

        let table = ProfileTable::load_from_dir(dir.path()).unwrap();
        assert_eq!(table.get(PcType::Regular).unwrap().upgrade_slack, 0.10);
        assert_eq!(
            table.get(PcType::Gaming).unwrap(),
            &Profile::builtin(PcType::Gaming)
        );
    }

    #[test]
    fn test_shipped_profiles_load() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("profiles");
        let table = ProfileTable::load_from_dir(&dir).unwrap();
        assert_eq!(table, ProfileTable::default());
    }

    #[test]
    fn test_missing_profile() {
        let table = ProfileTable::from_profiles([Profile::builtin(PcType::Gaming)]).unwrap();
        assert!(matches!(
            table.get(PcType::Regular),
            Err(ConfigError::MissingProfile(PcType::Regular))
        ));
    }
}
