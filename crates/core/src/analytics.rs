//! Sales analytics derived from per-pool sales rows.
//!
//! The company dashboard receives one [`PoolSalesSummary`] per pool and
//! rolls them up into per-product totals, overview KPIs and chart series.
//! All aggregation is pure; nothing here performs IO.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::PoolStatus;
use crate::types::{flexible_date, DbId};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Share of spend a participant saves on a pool that reached its minimum.
pub const SAVINGS_RATE: f64 = 0.15;

/// Bars shown on the revenue chart.
pub const TOP_CHART_SIZE: usize = 10;

/// Longest chart label before truncation.
pub const LABEL_MAX_CHARS: usize = 20;

pub const LABEL_SUCCESSFUL: &str = "Successful";
pub const LABEL_NOT_REACHED: &str = "Not Reached";

// ---------------------------------------------------------------------------
// Backend rows
// ---------------------------------------------------------------------------

/// One row of the pools-sales endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolSalesSummary {
    pub pool_id: DbId,
    #[serde(default)]
    pub product_id: Option<DbId>,
    pub product_name: String,
    #[serde(default)]
    pub unit_price: f64,
    #[serde(default)]
    pub min_quantity: i64,
    #[serde(default, with = "flexible_date::option")]
    pub start_at: Option<NaiveDate>,
    #[serde(default, with = "flexible_date::option")]
    pub end_at: Option<NaiveDate>,
    #[serde(default)]
    pub total_quantity_sold: i64,
    #[serde(default)]
    pub total_participants: i64,
    #[serde(default)]
    pub total_revenue: f64,
    #[serde(default)]
    pub reached_min_quantity: Option<bool>,
    #[serde(default)]
    pub status: Option<PoolStatus>,
    #[serde(default)]
    pub total_savings: Option<f64>,
}

impl PoolSalesSummary {
    /// Backend flag when present, otherwise derived from status and
    /// quantity.
    pub fn is_successful(&self) -> bool {
        self.reached_min_quantity.unwrap_or_else(|| {
            self.status == Some(PoolStatus::Success)
                || self.total_quantity_sold >= self.min_quantity
        })
    }

    /// Backend savings when present, otherwise [`SAVINGS_RATE`] of revenue
    /// for successful pools.
    pub fn savings(&self) -> f64 {
        self.total_savings.unwrap_or_else(|| {
            if self.is_successful() {
                self.total_revenue * SAVINGS_RATE
            } else {
                0.0
            }
        })
    }
}

/// KPIs shown above the dashboard charts.
///
/// Matches the overview endpoint; optional fields are those the endpoint
/// may omit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsOverview {
    #[serde(default)]
    pub total_revenue: f64,
    #[serde(default)]
    pub total_pools: i64,
    #[serde(default)]
    pub active_pools: i64,
    /// Percentage in `[0, 100]`, unrounded.
    #[serde(default)]
    pub success_rate: f64,
    #[serde(default)]
    pub successful_pools: Option<i64>,
    #[serde(default)]
    pub total_customers: Option<i64>,
    #[serde(default)]
    pub total_products: Option<i64>,
    #[serde(default)]
    pub total_quantity_sold: Option<i64>,
    #[serde(default)]
    pub total_participants: Option<i64>,
    #[serde(default)]
    pub total_savings: Option<f64>,
}

impl AnalyticsOverview {
    /// Success rate rounded to two decimals, e.g. `66.67%`.
    pub fn success_rate_text(&self) -> String {
        format!("{}%", round2(self.success_rate))
    }

    /// Fill fields the backend left out with locally computed values.
    pub fn fill_missing_from(&mut self, computed: &AnalyticsOverview) {
        self.successful_pools = self.successful_pools.or(computed.successful_pools);
        self.total_customers = self.total_customers.or(computed.total_customers);
        self.total_products = self.total_products.or(computed.total_products);
        self.total_quantity_sold = self.total_quantity_sold.or(computed.total_quantity_sold);
        self.total_participants = self.total_participants.or(computed.total_participants);
        self.total_savings = self.total_savings.or(computed.total_savings);
    }
}

/// One row of the customers-savings endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerSavings {
    pub email: String,
    #[serde(default)]
    pub pools_joined: i64,
    #[serde(default)]
    pub total_quantity_purchased: i64,
    #[serde(default)]
    pub total_spent: f64,
    #[serde(default)]
    pub total_savings: f64,
}

// ---------------------------------------------------------------------------
// Sales report
// ---------------------------------------------------------------------------

/// Totals for one product across its pools.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductSalesSummary {
    pub product_id: Option<DbId>,
    pub product_name: String,
    pub unit_price: f64,
    pub pools: usize,
    pub successful_pools: usize,
    pub total_quantity_sold: i64,
    pub total_participants: i64,
    pub total_revenue: f64,
    pub total_savings: f64,
    /// At least one contributing pool succeeded.
    pub reached_min_quantity: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesReport {
    pub per_product: Vec<ProductSalesSummary>,
    pub overview: AnalyticsOverview,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ProductKey {
    Id(DbId),
    Name(String),
}

/// Roll pool sales rows up into per-product totals and overview KPIs.
///
/// Products appear in the order they are first seen. An empty input gives
/// zero totals and a zero success rate.
pub fn summarize(pools: &[PoolSalesSummary]) -> SalesReport {
    let mut per_product: Vec<ProductSalesSummary> = Vec::new();
    let mut index: HashMap<ProductKey, usize> = HashMap::new();

    let mut successful = 0usize;
    let mut active = 0i64;
    let mut total_revenue = 0.0;
    let mut total_savings = 0.0;
    let mut total_quantity = 0i64;
    let mut total_participants = 0i64;

    for pool in pools {
        let success = pool.is_successful();
        let savings = pool.savings();

        if success {
            successful += 1;
        }
        if pool.status == Some(PoolStatus::Open) {
            active += 1;
        }
        total_revenue += pool.total_revenue;
        total_savings += savings;
        total_quantity += pool.total_quantity_sold;
        total_participants += pool.total_participants;

        let key = match pool.product_id {
            Some(id) => ProductKey::Id(id),
            None => ProductKey::Name(pool.product_name.clone()),
        };
        let slot = *index.entry(key).or_insert_with(|| {
            per_product.push(ProductSalesSummary {
                product_id: pool.product_id,
                product_name: pool.product_name.clone(),
                unit_price: pool.unit_price,
                pools: 0,
                successful_pools: 0,
                total_quantity_sold: 0,
                total_participants: 0,
                total_revenue: 0.0,
                total_savings: 0.0,
                reached_min_quantity: false,
            });
            per_product.len() - 1
        });

        let entry = &mut per_product[slot];
        entry.pools += 1;
        entry.total_quantity_sold += pool.total_quantity_sold;
        entry.total_participants += pool.total_participants;
        entry.total_revenue += pool.total_revenue;
        entry.total_savings += savings;
        if success {
            entry.successful_pools += 1;
            entry.reached_min_quantity = true;
        }
    }

    let total_pools = pools.len();
    let overview = AnalyticsOverview {
        total_revenue,
        total_pools: total_pools as i64,
        active_pools: active,
        success_rate: success_rate(successful, total_pools),
        successful_pools: Some(successful as i64),
        total_customers: None,
        total_products: Some(per_product.len() as i64),
        total_quantity_sold: Some(total_quantity),
        total_participants: Some(total_participants),
        total_savings: Some(total_savings),
    };

    SalesReport {
        per_product,
        overview,
    }
}

/// `successful / total * 100`, or 0 for no pools.
pub fn success_rate(successful: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    successful as f64 / total as f64 * 100.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Charts
// ---------------------------------------------------------------------------

/// One bar of the revenue chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevenueBar {
    pub pool_id: DbId,
    /// Possibly truncated display label.
    pub label: String,
    pub product_name: String,
    pub revenue: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RevenueChart {
    pub bars: Vec<RevenueBar>,
}

impl RevenueChart {
    pub fn labels(&self) -> Vec<&str> {
        self.bars.iter().map(|b| b.label.as_str()).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.revenue).collect()
    }
}

/// Top `n` pools by revenue, highest first. Ties keep input order.
pub fn top_revenue_chart(pools: &[PoolSalesSummary], n: usize) -> RevenueChart {
    let mut ranked: Vec<&PoolSalesSummary> = pools.iter().collect();
    ranked.sort_by(|a, b| b.total_revenue.total_cmp(&a.total_revenue));

    let bars = ranked
        .into_iter()
        .take(n)
        .map(|p| RevenueBar {
            pool_id: p.pool_id,
            label: truncate_label(&p.product_name, LABEL_MAX_CHARS),
            product_name: p.product_name.clone(),
            revenue: p.total_revenue,
        })
        .collect();

    RevenueChart { bars }
}

/// Cut `name` to `max_chars` characters, marking the cut with `...`.
pub fn truncate_label(name: &str, max_chars: usize) -> String {
    if name.chars().count() <= max_chars {
        return name.to_string();
    }
    let mut label: String = name.chars().take(max_chars).collect();
    label.push_str("...");
    label
}

/// Doughnut chart data: pools that reached their minimum vs the rest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SuccessBreakdown {
    pub successful: usize,
    pub not_reached: usize,
}

impl SuccessBreakdown {
    pub fn labels(&self) -> [&'static str; 2] {
        [LABEL_SUCCESSFUL, LABEL_NOT_REACHED]
    }

    pub fn values(&self) -> [usize; 2] {
        [self.successful, self.not_reached]
    }
}

pub fn success_breakdown(pools: &[PoolSalesSummary]) -> SuccessBreakdown {
    let successful = pools.iter().filter(|p| p.is_successful()).count();
    SuccessBreakdown {
        successful,
        not_reached: pools.len() - successful,
    }
}

// ---------------------------------------------------------------------------
// Customers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CustomerSummary {
    /// Ordered by savings, highest first.
    pub customers: Vec<CustomerSavings>,
    pub total_customers: usize,
    pub total_quantity_purchased: i64,
    pub total_spent: f64,
    pub total_savings: f64,
}

pub fn summarize_customers(rows: Vec<CustomerSavings>) -> CustomerSummary {
    let mut customers = rows;
    customers.sort_by(|a, b| b.total_savings.total_cmp(&a.total_savings));

    CustomerSummary {
        total_customers: customers.len(),
        total_quantity_purchased: customers.iter().map(|c| c.total_quantity_purchased).sum(),
        total_spent: customers.iter().map(|c| c.total_spent).sum(),
        total_savings: customers.iter().map(|c| c.total_savings).sum(),
        customers,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pool_id: DbId, name: &str, revenue: f64) -> PoolSalesSummary {
        PoolSalesSummary {
            pool_id,
            product_id: Some(pool_id),
            product_name: name.to_string(),
            unit_price: 10.0,
            min_quantity: 5,
            start_at: None,
            end_at: None,
            total_quantity_sold: 0,
            total_participants: 0,
            total_revenue: revenue,
            reached_min_quantity: None,
            status: None,
            total_savings: None,
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    // -- success rule --

    #[test]
    fn backend_flag_wins_over_quantity() {
        let mut p = row(1, "Rice", 0.0);
        p.total_quantity_sold = 100;
        p.reached_min_quantity = Some(false);
        assert!(!p.is_successful());
    }

    #[test]
    fn missing_flag_falls_back_to_status_or_quantity() {
        let mut p = row(1, "Rice", 0.0);
        assert!(!p.is_successful());

        p.total_quantity_sold = 5;
        assert!(p.is_successful());

        p.total_quantity_sold = 0;
        p.status = Some(PoolStatus::Success);
        assert!(p.is_successful());
    }

    #[test]
    fn savings_default_to_rate_of_revenue_when_successful() {
        let mut p = row(1, "Rice", 200.0);
        p.reached_min_quantity = Some(true);
        assert!(approx(p.savings(), 30.0));

        p.reached_min_quantity = Some(false);
        assert_eq!(p.savings(), 0.0);

        p.total_savings = Some(12.0);
        assert_eq!(p.savings(), 12.0);
    }

    // -- summarize --

    #[test]
    fn empty_input_gives_zero_overview() {
        let report = summarize(&[]);
        assert!(report.per_product.is_empty());
        assert_eq!(report.overview.success_rate, 0.0);
        assert_eq!(report.overview.total_revenue, 0.0);
        assert_eq!(report.overview.total_pools, 0);
        assert_eq!(report.overview.success_rate_text(), "0%");
    }

    #[test]
    fn half_successful_pools_give_fifty_percent() {
        let mut a = row(1, "Rice", 100.0);
        a.status = Some(PoolStatus::Open);
        a.reached_min_quantity = Some(true);
        let mut b = row(2, "Beans", 50.0);
        b.status = Some(PoolStatus::Failed);
        b.reached_min_quantity = Some(false);

        let report = summarize(&[a, b]);

        assert!(approx(report.overview.success_rate, 50.0));
        assert!(approx(report.overview.total_revenue, 150.0));
        assert_eq!(report.overview.successful_pools, Some(1));
        assert_eq!(report.overview.active_pools, 1);
        assert!(approx(report.overview.total_savings.unwrap(), 15.0));
    }

    #[test]
    fn success_rate_is_rounded_only_for_display() {
        let mut rows: Vec<_> = (1..=3).map(|i| row(i, "Rice", 1.0)).collect();
        rows[0].reached_min_quantity = Some(true);
        rows[1].reached_min_quantity = Some(true);
        rows[2].reached_min_quantity = Some(false);

        let overview = summarize(&rows).overview;

        assert!(approx(overview.success_rate, 200.0 / 3.0));
        assert_eq!(overview.success_rate_text(), "66.67%");
    }

    #[test]
    fn pools_group_by_product_in_first_seen_order() {
        let mut a = row(1, "Rice", 10.0);
        a.product_id = Some(7);
        a.reached_min_quantity = Some(false);
        let mut b = row(2, "Beans", 20.0);
        b.product_id = Some(8);
        let mut c = row(3, "Rice", 30.0);
        c.product_id = Some(7);
        c.reached_min_quantity = Some(true);
        c.total_participants = 4;

        let report = summarize(&[a, b, c]);

        assert_eq!(report.per_product.len(), 2);
        let rice = &report.per_product[0];
        assert_eq!(rice.product_id, Some(7));
        assert_eq!(rice.pools, 2);
        assert_eq!(rice.successful_pools, 1);
        assert!(rice.reached_min_quantity);
        assert!(approx(rice.total_revenue, 40.0));
        assert_eq!(rice.total_participants, 4);
        assert_eq!(report.per_product[1].product_name, "Beans");
    }

    #[test]
    fn rows_without_product_id_group_by_name() {
        let mut a = row(1, "Honey", 5.0);
        a.product_id = None;
        let mut b = row(2, "Honey", 7.0);
        b.product_id = None;
        let mut c = row(3, "Tea", 1.0);
        c.product_id = None;

        let report = summarize(&[a, b, c]);

        assert_eq!(report.per_product.len(), 2);
        assert_eq!(report.per_product[0].pools, 2);
        assert!(approx(report.per_product[0].total_revenue, 12.0));
    }

    #[test]
    fn fill_missing_keeps_backend_values() {
        let mut backend = AnalyticsOverview {
            total_revenue: 99.0,
            successful_pools: Some(4),
            ..Default::default()
        };
        let computed = AnalyticsOverview {
            successful_pools: Some(1),
            total_savings: Some(3.0),
            ..Default::default()
        };

        backend.fill_missing_from(&computed);

        assert_eq!(backend.successful_pools, Some(4));
        assert_eq!(backend.total_savings, Some(3.0));
        assert_eq!(backend.total_revenue, 99.0);
    }

    // -- top_revenue_chart --

    #[test]
    fn top_chart_keeps_ten_highest_descending() {
        let rows: Vec<_> = (1..=15)
            .map(|i| row(i, &format!("Product {i}"), (i * 10) as f64))
            .collect();

        let chart = top_revenue_chart(&rows, TOP_CHART_SIZE);

        assert_eq!(chart.bars.len(), 10);
        let expected: Vec<f64> = (6..=15).rev().map(|i| (i * 10) as f64).collect();
        assert_eq!(chart.values(), expected);
        assert_eq!(chart.bars[0].pool_id, 15);
    }

    #[test]
    fn top_chart_ties_keep_input_order() {
        let rows = vec![row(1, "A", 5.0), row(2, "B", 9.0), row(3, "C", 5.0)];
        let chart = top_revenue_chart(&rows, 10);
        let ids: Vec<_> = chart.bars.iter().map(|b| b.pool_id).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }

    #[test]
    fn empty_chart_has_no_bars() {
        assert!(top_revenue_chart(&[], TOP_CHART_SIZE).bars.is_empty());
    }

    #[test]
    fn long_labels_are_truncated_but_names_kept() {
        let rows = vec![row(1, "Extra virgin olive oil, 5 litres", 1.0)];
        let chart = top_revenue_chart(&rows, 10);
        assert_eq!(chart.labels(), vec!["Extra virgin olive o..."]);
        assert_eq!(chart.bars[0].product_name, "Extra virgin olive oil, 5 litres");
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        assert_eq!(truncate_label("Café crème brûlée de luxe", 20), "Café crème brûlée de...");
        assert_eq!(truncate_label("exactly twenty chars", 20), "exactly twenty chars");
    }

    // -- success_breakdown --

    #[test]
    fn breakdown_counts_both_sides() {
        let mut rows = vec![row(1, "A", 1.0), row(2, "B", 1.0), row(3, "C", 1.0)];
        rows[0].reached_min_quantity = Some(true);
        let breakdown = success_breakdown(&rows);
        assert_eq!(breakdown.values(), [1, 2]);
        assert_eq!(breakdown.labels(), ["Successful", "Not Reached"]);
    }

    // -- summarize_customers --

    #[test]
    fn customers_sorted_by_savings() {
        let customer = |email: &str, spent: f64, saved: f64| CustomerSavings {
            email: email.to_string(),
            pools_joined: 1,
            total_quantity_purchased: 2,
            total_spent: spent,
            total_savings: saved,
        };
        let summary = summarize_customers(vec![
            customer("a@x.test", 10.0, 1.5),
            customer("b@x.test", 40.0, 6.0),
            customer("c@x.test", 5.0, 0.0),
        ]);

        let emails: Vec<_> = summary.customers.iter().map(|c| c.email.as_str()).collect();
        assert_eq!(emails, vec!["b@x.test", "a@x.test", "c@x.test"]);
        assert_eq!(summary.total_customers, 3);
        assert_eq!(summary.total_quantity_purchased, 6);
        assert!(approx(summary.total_savings, 7.5));
    }

    #[test]
    fn sales_row_deserializes_without_optional_fields() {
        let row: PoolSalesSummary = serde_json::from_value(serde_json::json!({
            "pool_id": 3,
            "product_name": "Rice",
            "unit_price": 2.5,
            "min_quantity": 10,
            "start_at": "2026-10-01",
            "end_at": "2026-10-30",
            "total_quantity_sold": 12,
            "total_participants": 3,
            "total_revenue": 30.0,
            "reached_min_quantity": true
        }))
        .unwrap();
        assert!(row.product_id.is_none());
        assert!(row.is_successful());
        assert!(approx(row.savings(), 4.5));
    }
}
