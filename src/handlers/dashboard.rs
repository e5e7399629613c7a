use askama::Template;
use axum::extract::State;
use axum::response::Html;
use tracing::debug;

use crate::db::queries::purchases;
use crate::error::{AppResult, RenderHtml};
use crate::services::reporting;
use crate::state::{AppState, JsManifest, ViewSettings};
use crate::VERSION;

use super::{team_rows, product_rows, KpiView, TotalRow};

#[derive(Template)]
#[template(path = "pages/dashboard.html")]
pub struct DashboardTemplate {
    pub title: String,
    pub settings: ViewSettings,
    pub manifest: JsManifest,
    pub version: &'static str,
    pub xsrf_token: String,
    pub kpis: KpiView,
    pub teams: Vec<TotalRow>,
    pub products: Vec<TotalRow>,
}

/// Dashboard: KPI cards plus the team and top-product breakdowns over all
/// purchases. Aggregates are recomputed on every load.
pub async fn index(State(state): State<AppState>) -> AppResult<Html<String>> {
    debug!("Loading dashboard");
    let conn = state.db.get()?;
    let settings = state.view_settings();

    let all = purchases::list_purchases(&conn, &purchases::PurchaseFilter::default())?;

    let kpis = reporting::kpis(&all);
    let teams = reporting::team_totals(&all);
    let products = reporting::product_totals(&all);

    debug!(
        purchase_count = kpis.purchase_count,
        total_spend_cents = kpis.total_spend_cents,
        "Dashboard data loaded"
    );

    let template = DashboardTemplate {
        title: "Dashboard".into(),
        teams: team_rows(&teams, &kpis, &settings),
        products: product_rows(&products, &kpis, &settings),
        kpis: KpiView::from_kpis(&kpis, &settings),
        settings,
        manifest: state.manifest.clone(),
        version: VERSION,
        xsrf_token: state.xsrf_token.value(),
    };

    template.render_html()
}
