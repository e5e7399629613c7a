pub mod api;
pub mod dashboard;
pub mod purchases;
pub mod reports;

use axum::routing::{get, post};
use axum::Router;

use crate::filters;
use crate::models::{KpiSet, ProductTotal, PurchaseWithItems, TeamTotal};
use crate::state::{AppState, ViewSettings};

pub fn routes() -> Router<AppState> {
    Router::new()
        // Pages
        .route("/", get(dashboard::index))
        .route("/purchases", get(purchases::index))
        .route("/reports", get(reports::index))
        // Purchase registration and browsing
        .route("/purchases/new", get(purchases::new_form))
        .route("/purchases/create", post(purchases::create))
        .route("/purchases/table", get(purchases::table_partial))
        .route("/purchases/export.csv", get(purchases::export_csv))
        .route("/purchases/:id", get(purchases::show))
        // Report export
        .route("/reports/export", post(reports::export_simple))
        .route("/reports/export/complete", post(reports::export_complete))
        // API (JSON for charts)
        .route("/api/reports/team-spending", get(api::team_spending))
        .route("/api/reports/top-products", get(api::top_products))
        // Health check
        .route("/health", get(health))
}

async fn health() -> &'static str {
    "OK"
}

// Shared view rows, preformatted for templates.

pub struct KpiView {
    pub total_spend: String,
    pub purchase_count: usize,
    pub item_count: usize,
}

impl KpiView {
    pub fn from_kpis(kpis: &KpiSet, settings: &ViewSettings) -> Self {
        Self {
            total_spend: filters::format_money(
                kpis.total_spend_cents,
                &settings.currency,
                &settings.locale,
            ),
            purchase_count: kpis.purchase_count,
            item_count: kpis.item_count,
        }
    }
}

/// One row of an aggregate table (team or product breakdown).
pub struct TotalRow {
    pub name: String,
    pub value: String,
    pub percent: String,
}

fn total_row(name: &str, cents: i64, total_cents: i64, settings: &ViewSettings) -> TotalRow {
    TotalRow {
        name: name.to_string(),
        value: filters::format_money(cents, &settings.currency, &settings.locale),
        percent: filters::format_percent(
            filters::percent_of(cents, total_cents),
            &settings.locale,
        ),
    }
}

pub fn team_rows(teams: &[TeamTotal], kpis: &KpiSet, settings: &ViewSettings) -> Vec<TotalRow> {
    teams
        .iter()
        .map(|t| total_row(&t.team_name, t.total_cents, kpis.total_spend_cents, settings))
        .collect()
}

pub fn product_rows(
    products: &[ProductTotal],
    kpis: &KpiSet,
    settings: &ViewSettings,
) -> Vec<TotalRow> {
    products
        .iter()
        .map(|p| {
            total_row(
                &p.product_name,
                p.total_cents,
                kpis.total_spend_cents,
                settings,
            )
        })
        .collect()
}

/// One row of the purchase list table.
pub struct PurchaseRowView {
    pub id: i64,
    pub date: String,
    pub team_name: String,
    pub location_name: String,
    pub item_count: usize,
    pub total: String,
}

pub fn purchase_rows(
    purchases: &[PurchaseWithItems],
    settings: &ViewSettings,
) -> Vec<PurchaseRowView> {
    purchases
        .iter()
        .map(|p| PurchaseRowView {
            id: p.purchase.id,
            date: crate::date_utils::display_date(&p.purchase.purchase_date, &settings.locale),
            team_name: p.team_name.clone(),
            location_name: p.purchase.location_name.clone(),
            item_count: p.item_count(),
            total: filters::format_money(p.total_cents(), &settings.currency, &settings.locale),
        })
        .collect()
}
