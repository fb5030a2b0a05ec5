use crate::config::RankLimits;
use crate::merge::MergedState;
use ledger_protocol::{CountryRevenue, Insights, MonthlySales, ProductFrequency, RegionRevenue};
use std::cmp::Ordering;

/// Sort every merged rollup and apply its cap.
///
/// Rollups without a business tie-break are ordered by their grouping key so that repeated
/// runs return identical sequences.
pub fn rank(merged: MergedState, limits: &RankLimits) -> Insights {
    Insights {
        country_revenue: rank_country_revenue(&merged),
        top_products: rank_products(&merged, limits.top_products),
        monthly_sales: rank_months(&merged),
        top_regions: rank_regions(&merged, limits.top_regions),
    }
}

fn revenue_desc(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}

fn rank_country_revenue(merged: &MergedState) -> Vec<CountryRevenue> {
    let mut rows: Vec<CountryRevenue> = merged
        .country_product
        .iter()
        .map(|(key, totals)| CountryRevenue {
            country: key.country.clone(),
            product_name: key.product.clone(),
            total_revenue: totals.revenue,
            transaction_count: totals.transactions,
        })
        .collect();
    rows.sort_unstable_by(|a, b| {
        revenue_desc(a.total_revenue, b.total_revenue)
            .then_with(|| a.country.cmp(&b.country))
            .then_with(|| a.product_name.cmp(&b.product_name))
    });
    rows
}

fn rank_products(merged: &MergedState, cap: usize) -> Vec<ProductFrequency> {
    let mut rows: Vec<ProductFrequency> = merged
        .product
        .iter()
        .map(|(name, totals)| ProductFrequency {
            product_name: name.clone(),
            purchase_count: totals.units,
            stock_quantity: totals.stock,
        })
        .collect();
    rows.sort_unstable_by(|a, b| {
        b.purchase_count
            .cmp(&a.purchase_count)
            .then_with(|| b.product_name.cmp(&a.product_name))
    });
    rows.truncate(cap);
    rows
}

fn rank_months(merged: &MergedState) -> Vec<MonthlySales> {
    let mut rows: Vec<MonthlySales> = merged
        .month
        .iter()
        .map(|(month, volume)| MonthlySales {
            month: month.clone(),
            sales_volume: *volume,
        })
        .collect();
    // Zero-padded `YYYY-MM` keys sort chronologically as plain strings.
    rows.sort_unstable_by(|a, b| a.month.cmp(&b.month));
    rows
}

fn rank_regions(merged: &MergedState, cap: usize) -> Vec<RegionRevenue> {
    let mut rows: Vec<RegionRevenue> = merged
        .region
        .iter()
        .map(|(region, totals)| RegionRevenue {
            region: region.clone(),
            total_revenue: totals.revenue,
            items_sold: totals.items_sold,
        })
        .collect();
    rows.sort_unstable_by(|a, b| {
        revenue_desc(a.total_revenue, b.total_revenue).then_with(|| a.region.cmp(&b.region))
    });
    rows.truncate(cap);
    rows
}
