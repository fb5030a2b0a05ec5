use serde::{Deserialize, Serialize};

pub mod pagination;

pub use pagination::{paginate, Page, PageQuery, DEFAULT_PAGE_LIMIT};

/// Revenue earned by one product in one country.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CountryRevenue {
    pub country: String,
    pub product_name: String,
    pub total_revenue: f64,
    pub transaction_count: u64,
}

/// Units purchased for one product, with the stock level last reported for it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ProductFrequency {
    pub product_name: String,
    pub purchase_count: i64,
    pub stock_quantity: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct MonthlySales {
    /// `YYYY-MM`
    pub month: String,
    pub sales_volume: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RegionRevenue {
    pub region: String,
    pub total_revenue: f64,
    pub items_sold: i64,
}

/// Immutable snapshot produced by one aggregation run.
///
/// Every sequence is already sorted and capped; consumers must not re-order it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Insights {
    pub country_revenue: Vec<CountryRevenue>,
    pub top_products: Vec<ProductFrequency>,
    pub monthly_sales: Vec<MonthlySales>,
    pub top_regions: Vec<RegionRevenue>,
}

impl Insights {
    pub fn is_empty(&self) -> bool {
        self.country_revenue.is_empty()
            && self.top_products.is_empty()
            && self.monthly_sales.is_empty()
            && self.top_regions.is_empty()
    }
}
