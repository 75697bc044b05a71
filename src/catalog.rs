//! Per-request catalog index.
//!
//! The index is rebuilt from the caller's product list on every call and
//! never mutated afterwards.  Each category holds its eligible products
//! (in stock, non-negative effective price) sorted ascending by effective
//! price, with ties ordered by id so every lookup is deterministic.

use crate::models::{Category, Product};
use crate::money::Money;
use std::collections::BTreeMap;

/// Result of [`CatalogIndex::best_fit_under`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fit<'a> {
    pub product: &'a Product,
    /// Set when nothing fit and `product` is the cheapest fallback.
    pub overshoot: bool,
}

/// Products grouped by category.
#[derive(Debug, Clone, Default)]
pub struct CatalogIndex {
    by_category: BTreeMap<Category, Vec<Product>>,
}

impl CatalogIndex {
    pub fn build(products: &[Product]) -> Self {
        let mut by_category: BTreeMap<Category, Vec<Product>> = BTreeMap::new();
        for product in products.iter().filter(|p| p.is_eligible()) {
            by_category
                .entry(product.category)
                .or_default()
                .push(product.clone());
        }
        for list in by_category.values_mut() {
            list.sort_by(|a, b| {
                a.effective_price()
                    .cmp(&b.effective_price())
                    .then_with(|| a.id.cmp(&b.id))
            });
        }
        Self { by_category }
    }

    /// Eligible products of a category, cheapest first.
    pub fn by_category(&self, category: Category) -> &[Product] {
        self.by_category
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn has_category(&self, category: Category) -> bool {
        !self.by_category(category).is_empty()
    }

    /// Lowest-priced eligible product in `category`.
    pub fn cheapest(&self, category: Category) -> Option<&Product> {
        self.by_category(category).first()
    }

    /// Cheapest product priced strictly above `min_price`.
    pub fn cheapest_above(&self, category: Category, min_price: Money) -> Option<&Product> {
        let list = self.by_category(category);
        let idx = list.partition_point(|p| p.effective_price() <= min_price);
        list.get(idx)
    }

    /// Most expensive product priced strictly below `max_price`.
    pub fn priciest_below(&self, category: Category, max_price: Money) -> Option<&Product> {
        let list = self.by_category(category);
        let idx = list.partition_point(|p| p.effective_price() < max_price);
        idx.checked_sub(1).and_then(|i| list.get(i))
    }

    /// Most expensive product priced at or below `max_price`.
    ///
    /// Falls back to the cheapest product with `overshoot` set when
    /// nothing fits.  Returns `None` only for an empty category.
    pub fn best_fit_under(&self, category: Category, max_price: Money) -> Option<Fit<'_>> {
        let list = self.by_category(category);
        let idx = list.partition_point(|p| p.effective_price() <= max_price);
        match idx.checked_sub(1) {
            Some(i) => Some(Fit {
                product: &list[i],
                overshoot: false,
            }),
            None => list.first().map(|product| Fit {
                product,
                overshoot: true,
            }),
        }
    }

    /// Sum of the cheapest product of each listed category that has one.
    pub fn minimum_viable_cost<'c>(&self, categories: impl IntoIterator<Item = &'c Category>) -> Money {
        categories
            .into_iter()
            .filter_map(|c| self.cheapest(*c))
            .map(Product::effective_price)
            .sum()
    }

    /// Number of eligible products across all categories.
    pub fn len(&self) -> usize {
        self.by_category.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_category.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::{product, small_catalog};

    fn m(amount: f64) -> Money {
        Money::from_decimal(amount)
    }

    #[test]
    fn test_build_sorts_by_effective_price_and_drops_ineligible() {
        let mut discounted = product("cpu-disc", Category::Processor, 200.0);
        discounted.on_discount = true;
        discounted.discount_price = Some(m(70.0));
        let mut sold_out = product("cpu-none", Category::Processor, 10.0);
        sold_out.stock = 0;

        let mut products = small_catalog();
        products.push(discounted);
        products.push(sold_out);
        let index = CatalogIndex::build(&products);

        let prices: Vec<Money> = index
            .by_category(Category::Processor)
            .iter()
            .map(Product::effective_price)
            .collect();
        assert_eq!(prices, vec![m(50.0), m(70.0), m(80.0), m(120.0)]);
        assert_eq!(index.len(), 9);
    }

    #[test]
    fn test_best_fit_under() {
        let index = CatalogIndex::build(&small_catalog());

        let fit = index.best_fit_under(Category::Processor, m(140.0)).unwrap();
        assert_eq!(fit.product.id, "cpu-120");
        assert!(!fit.overshoot);

        let fit = index.best_fit_under(Category::Motherboard, m(84.0)).unwrap();
        assert_eq!(fit.product.id, "mb-60");

        // exact price fits
        let fit = index.best_fit_under(Category::GraphicsCard, m(350.0)).unwrap();
        assert_eq!(fit.product.id, "gpu-350");
    }

    #[test]
    fn test_best_fit_falls_back_to_cheapest() {
        let index = CatalogIndex::build(&small_catalog());
        let fit = index.best_fit_under(Category::GraphicsCard, m(100.0)).unwrap();
        assert_eq!(fit.product.id, "gpu-200");
        assert!(fit.overshoot);

        assert!(index.best_fit_under(Category::Ram, m(1000.0)).is_none());
    }

    #[test]
    fn test_neighbours() {
        let index = CatalogIndex::build(&small_catalog());
        assert_eq!(
            index.cheapest_above(Category::GraphicsCard, m(200.0)).unwrap().id,
            "gpu-350"
        );
        assert!(index.cheapest_above(Category::GraphicsCard, m(500.0)).is_none());
        assert_eq!(
            index.priciest_below(Category::Processor, m(120.0)).unwrap().id,
            "cpu-80"
        );
        assert!(index.priciest_below(Category::Processor, m(50.0)).is_none());
    }

    #[test]
    fn test_minimum_viable_cost() {
        let index = CatalogIndex::build(&small_catalog());
        let required = [Category::Processor, Category::Motherboard, Category::GraphicsCard];
        assert_eq!(index.minimum_viable_cost(&required), m(310.0));
        // missing categories contribute nothing
        assert_eq!(index.minimum_viable_cost(&[Category::Ram]), Money::ZERO);
    }
}
