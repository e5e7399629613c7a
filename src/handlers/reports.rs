use askama::Template;
use axum::extract::{Multipart, Query, State};
use axum::http::header;
use axum::response::{Html, IntoResponse, Response};
use axum::Form;
use serde::Deserialize;
use tracing::{debug, info};

use crate::date_utils;
use crate::db::queries::{purchases, teams};
use crate::error::{AppError, AppResult, RenderHtml};
use crate::form_utils;
use crate::models::Team;
use crate::services::export::{self, ChartImages, ReportData};
use crate::services::reporting;
use crate::state::{AppState, JsManifest, ViewSettings};
use crate::VERSION;

use super::{product_rows, purchase_rows, team_rows, KpiView, PurchaseRowView, TotalRow};

#[derive(Debug, Default, Clone, Deserialize)]
pub struct ReportParams {
    #[serde(default, deserialize_with = "form_utils::deserialize_optional_i64")]
    pub team_id: Option<i64>,
    pub from_date: Option<String>,
    pub to_date: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

impl ReportParams {
    fn to_filter(&self) -> purchases::PurchaseFilter {
        purchases::PurchaseFilter {
            team_id: self.team_id,
            from_date: non_empty(&self.from_date),
            to_date: non_empty(&self.to_date),
            ..Default::default()
        }
    }

    pub fn matches_team(&self, id: &i64) -> bool {
        self.team_id == Some(*id)
    }

    pub fn team_id_value(&self) -> String {
        self.team_id.map(|id| id.to_string()).unwrap_or_default()
    }

    pub fn from_date_value(&self) -> &str {
        self.from_date.as_deref().unwrap_or("")
    }

    pub fn to_date_value(&self) -> &str {
        self.to_date.as_deref().unwrap_or("")
    }

    /// Query string re-applied to the chart API requests.
    pub fn query_string(&self) -> String {
        let mut parts = Vec::new();
        if let Some(team_id) = self.team_id {
            parts.push(format!("team_id={}", team_id));
        }
        if let Some(from) = non_empty(&self.from_date) {
            parts.push(format!("from_date={}", from));
        }
        if let Some(to) = non_empty(&self.to_date) {
            parts.push(format!("to_date={}", to));
        }
        parts.join("&")
    }
}

#[derive(Template)]
#[template(path = "pages/reports.html")]
pub struct ReportsTemplate {
    pub title: String,
    pub settings: ViewSettings,
    pub manifest: JsManifest,
    pub version: &'static str,
    pub xsrf_token: String,
    pub teams: Vec<Team>,
    pub filter: ReportParams,
    pub report_title: String,
    pub kpis: KpiView,
    pub team_totals: Vec<TotalRow>,
    pub product_totals: Vec<TotalRow>,
    pub purchases: Vec<PurchaseRowView>,
}

/// Report view with its three tabs (summary, charts, purchase list).
///
/// Everything shown is derived from the same filtered purchase set, so the
/// percentages in every table agree with the displayed grand total.
pub async fn index(
    State(state): State<AppState>,
    Query(params): Query<ReportParams>,
) -> AppResult<Html<String>> {
    let conn = state.db.get()?;
    let settings = state.view_settings();

    let list = purchases::list_purchases(&conn, &params.to_filter())?;

    let kpis = reporting::kpis(&list);
    let team_totals = reporting::team_totals(&list);
    let product_totals = reporting::product_totals(&list);

    let template = ReportsTemplate {
        title: "Reports".into(),
        manifest: state.manifest.clone(),
        version: VERSION,
        xsrf_token: state.xsrf_token.value(),
        teams: teams::list_teams(&conn)?,
        report_title: state.config.report_title.clone(),
        team_totals: team_rows(&team_totals, &kpis, &settings),
        product_totals: product_rows(&product_totals, &kpis, &settings),
        purchases: purchase_rows(&list, &settings),
        kpis: KpiView::from_kpis(&kpis, &settings),
        filter: params,
        settings,
    };

    template.render_html()
}

#[derive(Debug, Deserialize)]
pub struct ReportExportForm {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "form_utils::deserialize_optional_i64")]
    pub team_id: Option<i64>,
    pub from_date: Option<String>,
    pub to_date: Option<String>,
}

fn build_report_data(
    state: &AppState,
    title: Option<&str>,
    params: &ReportParams,
    has_charts: bool,
) -> AppResult<ReportData> {
    let conn = state.db.get()?;
    let settings = state.view_settings();

    let list = purchases::list_purchases(&conn, &params.to_filter())?;

    let kpis = reporting::kpis(&list);
    let team_totals = reporting::team_totals(&list);
    let product_totals = reporting::product_totals(&list);

    let title = title
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(&state.config.report_title);

    let period = date_utils::period_label(
        params.from_date.as_deref().filter(|v| !v.is_empty()),
        params.to_date.as_deref().filter(|v| !v.is_empty()),
        &settings.locale,
    );

    Ok(ReportData::build(
        title,
        period,
        &kpis,
        &team_totals,
        &product_totals,
        &list,
        &settings,
        has_charts,
    ))
}

fn pdf_response(bytes: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", export::export_filename()),
            ),
        ],
        bytes,
    )
        .into_response()
}

/// "Simple" export: KPI summary plus the aggregate tables and the purchase
/// list. No chart capture involved.
pub async fn export_simple(
    State(state): State<AppState>,
    Form(form): Form<ReportExportForm>,
) -> AppResult<Response> {
    let params = ReportParams {
        team_id: form.team_id,
        from_date: form.from_date.clone(),
        to_date: form.to_date.clone(),
    };

    let data = build_report_data(&state, form.title.as_deref(), &params, false)?;
    let pdf = export::generate_pdf(&data, None)?;

    info!(bytes = pdf.len(), "Simple report exported");
    Ok(pdf_response(pdf))
}

/// "Complete" export: same document with the two chart snapshots embedded.
///
/// The charts arrive as multipart PNG parts rasterized by the browser. A
/// missing or zero-sized capture fails the whole export with a recoverable
/// error before any document is assembled.
pub async fn export_complete(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Response> {
    let mut form = ReportExportForm {
        title: None,
        team_id: None,
        from_date: None,
        to_date: None,
    };
    let mut team_chart: Vec<u8> = Vec::new();
    let mut product_chart: Vec<u8> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed export request: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "team_chart" => {
                team_chart = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Malformed export request: {}", e)))?
                    .to_vec();
            }
            "product_chart" => {
                product_chart = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Malformed export request: {}", e)))?
                    .to_vec();
            }
            _ => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Malformed export request: {}", e)))?;
                match name.as_str() {
                    "title" => form.title = Some(value),
                    "team_id" => form.team_id = value.parse().ok(),
                    "from_date" => form.from_date = Some(value),
                    "to_date" => form.to_date = Some(value),
                    _ => debug!(field = %name, "Ignoring unknown export field"),
                }
            }
        }
    }

    export::validate_chart_png(&team_chart, "team")?;
    export::validate_chart_png(&product_chart, "product")?;

    let params = ReportParams {
        team_id: form.team_id,
        from_date: form.from_date.clone(),
        to_date: form.to_date.clone(),
    };

    let data = build_report_data(&state, form.title.as_deref(), &params, true)?;
    let charts = ChartImages {
        team_chart_png: team_chart,
        product_chart_png: product_chart,
    };
    let pdf = export::generate_pdf(&data, Some(&charts))?;

    info!(bytes = pdf.len(), "Complete report exported");
    Ok(pdf_response(pdf))
}
