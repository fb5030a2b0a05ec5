use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use ledger_aggregator::RunStats;
use ledger_protocol::{
    paginate, CountryRevenue, Insights, MonthlySales, Page, PageQuery, ProductFrequency,
    RegionRevenue,
};
use serde::Serialize;
use std::sync::Arc;

/// Read-only snapshot shared by every request.
pub(crate) struct ApiState {
    pub(crate) insights: Insights,
    pub(crate) stats: RunStats,
}

#[derive(Debug, Serialize, PartialEq)]
pub(crate) struct HealthReport {
    pub(crate) status: &'static str,
    pub(crate) rows_read: u64,
    pub(crate) rows_skipped: u64,
    pub(crate) read_errors: u64,
    pub(crate) workers: usize,
}

pub(crate) fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/revenue/countries", get(country_revenue))
        .route("/api/products/top", get(top_products))
        .route("/api/sales/monthly", get(monthly_sales))
        .route("/api/regions/top", get(top_regions))
        .route("/health", get(health))
        .with_state(state)
}

async fn country_revenue(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<PageQuery>,
) -> Json<Page<CountryRevenue>> {
    Json(paginate(&state.insights.country_revenue, &query))
}

async fn top_products(State(state): State<Arc<ApiState>>) -> Json<Vec<ProductFrequency>> {
    Json(state.insights.top_products.clone())
}

async fn monthly_sales(State(state): State<Arc<ApiState>>) -> Json<Vec<MonthlySales>> {
    Json(state.insights.monthly_sales.clone())
}

async fn top_regions(State(state): State<Arc<ApiState>>) -> Json<Vec<RegionRevenue>> {
    Json(state.insights.top_regions.clone())
}

async fn health(State(state): State<Arc<ApiState>>) -> Json<HealthReport> {
    Json(HealthReport {
        status: "ok",
        rows_read: state.stats.rows_read,
        rows_skipped: state.stats.rows_skipped,
        read_errors: state.stats.read_errors,
        workers: state.stats.workers,
    })
}
