use crate::record::RawRecord;
use std::collections::HashMap;

/// Composite (country, product) grouping key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CountryProductKey {
    pub country: String,
    pub product: String,
}

impl CountryProductKey {
    pub fn new(country: impl Into<String>, product: impl Into<String>) -> Self {
        Self {
            country: country.into(),
            product: product.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CountryProductTotals {
    pub revenue: f64,
    pub transactions: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProductTotals {
    pub units: i64,
    /// Last stock level seen by the owning worker; max across workers after merge.
    pub stock: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RegionTotals {
    pub revenue: f64,
    pub items_sold: i64,
}

/// Worker-private accumulator for the four rollups.
#[derive(Debug, Clone, Default)]
pub struct PartialState {
    pub(crate) country_product: HashMap<CountryProductKey, CountryProductTotals>,
    pub(crate) product: HashMap<String, ProductTotals>,
    pub(crate) month: HashMap<String, i64>,
    pub(crate) region: HashMap<String, RegionTotals>,
    pub(crate) rows: u64,
}

impl PartialState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one row into every rollup.
    ///
    /// Integer sums saturate, so an absurd quantity cell cannot fail the run.
    pub fn fold(&mut self, record: &RawRecord) {
        let quantity = record.quantity();
        let revenue = record.revenue();
        let product = record.product_name();

        let cp = self
            .country_product
            .entry(CountryProductKey::new(record.country(), product))
            .or_default();
        cp.revenue += revenue;
        cp.transactions += 1;

        let p = self.product.entry(product.to_string()).or_default();
        p.units = p.units.saturating_add(quantity);
        p.stock = record.stock_quantity();

        let volume = self.month.entry(record.month_key().to_string()).or_default();
        *volume = volume.saturating_add(quantity);

        let r = self.region.entry(record.region().to_string()).or_default();
        r.revenue += revenue;
        r.items_sold = r.items_sold.saturating_add(quantity);

        self.rows += 1;
    }

    /// Rows folded into this state.
    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn country_product(&self) -> &HashMap<CountryProductKey, CountryProductTotals> {
        &self.country_product
    }

    pub fn product(&self) -> &HashMap<String, ProductTotals> {
        &self.product
    }

    pub fn month(&self) -> &HashMap<String, i64> {
        &self.month
    }

    pub fn region(&self) -> &HashMap<String, RegionTotals> {
        &self.region
    }
}
