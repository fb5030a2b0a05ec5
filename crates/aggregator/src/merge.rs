use crate::partial::{
    CountryProductKey, CountryProductTotals, PartialState, ProductTotals, RegionTotals,
};
use std::collections::HashMap;

/// Key-wise reduction of every worker's [`PartialState`].
///
/// Sums are value-equal across worker counts within floating-point tolerance; float rounding
/// order depends on how rows were distributed, so bit-for-bit equality is not guaranteed.
#[derive(Debug, Clone, Default)]
pub struct MergedState {
    pub country_product: HashMap<CountryProductKey, CountryProductTotals>,
    pub product: HashMap<String, ProductTotals>,
    pub month: HashMap<String, i64>,
    pub region: HashMap<String, RegionTotals>,
    pub rows: u64,
}

impl MergedState {
    /// Consume partial states after the worker barrier.
    pub fn from_partials(partials: impl IntoIterator<Item = PartialState>) -> Self {
        let mut merged = Self::default();
        for partial in partials {
            merged.absorb(partial);
        }
        merged
    }

    fn absorb(&mut self, partial: PartialState) {
        for (key, totals) in partial.country_product {
            let cp = self.country_product.entry(key).or_default();
            cp.revenue += totals.revenue;
            cp.transactions += totals.transactions;
        }

        for (key, totals) in partial.product {
            match self.product.get_mut(&key) {
                Some(p) => {
                    p.units = p.units.saturating_add(totals.units);
                    p.stock = p.stock.max(totals.stock);
                }
                None => {
                    self.product.insert(key, totals);
                }
            }
        }

        for (key, volume) in partial.month {
            let total = self.month.entry(key).or_default();
            *total = total.saturating_add(volume);
        }

        for (key, totals) in partial.region {
            let r = self.region.entry(key).or_default();
            r.revenue += totals.revenue;
            r.items_sold = r.items_sold.saturating_add(totals.items_sold);
        }

        self.rows += partial.rows;
    }
}
