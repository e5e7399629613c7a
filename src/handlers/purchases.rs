use askama::Template;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use serde::Deserialize;
use tracing::{debug, info};

use crate::date_utils;
use crate::db::queries::{purchases, teams};
use crate::error::{AppError, AppResult, RenderHtml};
use crate::filters;
use crate::form_utils;
use crate::models::{PurchaseWithItems, Team};
use crate::sort_utils::{Sortable, SortableColumn, TableSort};
use crate::state::{AppState, JsManifest, ViewSettings};
use crate::VERSION;

use super::{purchase_rows, PurchaseRowView};

const PAGE_SIZE: i64 = 50;

/// Sortable columns for the purchase table.
#[derive(Debug, Default, Clone, PartialEq)]
pub enum PurchaseSortColumn {
    #[default]
    Date,
    Team,
    Location,
    Total,
}

impl SortableColumn for PurchaseSortColumn {
    fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "date" => Some(Self::Date),
            "team" => Some(Self::Team),
            "location" => Some(Self::Location),
            "total" => Some(Self::Total),
            _ => None,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Team => "team",
            Self::Location => "location",
            Self::Total => "total",
        }
    }

    fn sql_expression(&self) -> &'static str {
        match self {
            Self::Date => "p.purchase_date",
            Self::Team => "t.name",
            Self::Location => "p.location_name",
            Self::Total => {
                "(SELECT COALESCE(SUM(pi.subtotal_cents), 0) \
                 FROM purchase_items pi WHERE pi.purchase_id = p.id)"
            }
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct PurchaseFilterParams {
    #[serde(default, deserialize_with = "form_utils::deserialize_optional_i64")]
    pub team_id: Option<i64>,
    pub product: Option<String>,
    pub location: Option<String>,
    pub from_date: Option<String>,
    pub to_date: Option<String>,
    pub page: Option<i64>,
    pub sort: Option<String>,
    pub dir: Option<String>,
}

impl Sortable for PurchaseFilterParams {
    fn sort_by(&self) -> Option<&String> {
        self.sort.as_ref()
    }

    fn sort_dir(&self) -> Option<&String> {
        self.dir.as_ref()
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

impl PurchaseFilterParams {
    fn to_filter(&self, sort: &TableSort<PurchaseSortColumn>) -> purchases::PurchaseFilter {
        purchases::PurchaseFilter {
            team_id: self.team_id,
            product: non_empty(&self.product),
            location: non_empty(&self.location),
            from_date: non_empty(&self.from_date),
            to_date: non_empty(&self.to_date),
            sort_sql: Some(sort.sql_order_by()),
            ..Default::default()
        }
    }

    pub fn matches_team(&self, id: &i64) -> bool {
        self.team_id == Some(*id)
    }

    pub fn product_value(&self) -> &str {
        self.product.as_deref().unwrap_or("")
    }

    pub fn location_value(&self) -> &str {
        self.location.as_deref().unwrap_or("")
    }

    pub fn from_date_value(&self) -> &str {
        self.from_date.as_deref().unwrap_or("")
    }

    pub fn to_date_value(&self) -> &str {
        self.to_date.as_deref().unwrap_or("")
    }

    /// Filter portion of the query string, used to keep the active filters
    /// on pagination, sort and export links.
    pub fn base_query_string(&self) -> String {
        let mut parts = Vec::new();
        if let Some(team_id) = self.team_id {
            parts.push(format!("team_id={}", team_id));
        }
        for (key, value) in [
            ("product", &self.product),
            ("location", &self.location),
            ("from_date", &self.from_date),
            ("to_date", &self.to_date),
        ] {
            if let Some(v) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                parts.push(format!("{}={}", key, urlencoding::encode(v)));
            }
        }
        parts.join("&")
    }

    /// Full query string including sort parameters.
    pub fn full_query_string(&self) -> String {
        let mut parts = Vec::new();
        let base = self.base_query_string();
        if !base.is_empty() {
            parts.push(base);
        }
        if let Some(sort) = &self.sort {
            parts.push(format!("sort={}", sort));
        }
        if let Some(dir) = &self.dir {
            parts.push(format!("dir={}", dir));
        }
        parts.join("&")
    }
}

#[derive(Template)]
#[template(path = "pages/purchases.html")]
pub struct PurchasesTemplate {
    pub title: String,
    pub settings: ViewSettings,
    pub manifest: JsManifest,
    pub version: &'static str,
    pub xsrf_token: String,
    pub teams: Vec<Team>,
    pub purchases: Vec<PurchaseRowView>,
    pub total_count: i64,
    pub page: i64,
    pub page_count: i64,
    pub filter: PurchaseFilterParams,
    pub sort: TableSort<PurchaseSortColumn>,
}

#[derive(Template)]
#[template(path = "partials/purchase_table.html")]
pub struct PurchaseTableTemplate {
    pub purchases: Vec<PurchaseRowView>,
    pub total_count: i64,
    pub page: i64,
    pub page_count: i64,
    pub filter: PurchaseFilterParams,
    pub sort: TableSort<PurchaseSortColumn>,
}

#[derive(Template)]
#[template(path = "pages/purchase_new.html")]
pub struct PurchaseNewTemplate {
    pub title: String,
    pub settings: ViewSettings,
    pub manifest: JsManifest,
    pub version: &'static str,
    pub xsrf_token: String,
    pub teams: Vec<Team>,
    pub today: String,
    pub units: &'static [&'static str],
}

/// Units offered by the registration form. Free reference data, matching
/// what teams actually buy.
pub const UNITS: &[&str] = &[
    "unit", "kg", "g", "liter", "ml", "box", "pack", "meter", "cm", "other",
];

/// One line item on the purchase detail page.
pub struct ItemView {
    pub product_name: String,
    pub quantity: String,
    pub unit_price: String,
    pub subtotal: String,
    pub notes: String,
}

#[derive(Template)]
#[template(path = "pages/purchase_detail.html")]
pub struct PurchaseDetailTemplate {
    pub title: String,
    pub settings: ViewSettings,
    pub manifest: JsManifest,
    pub version: &'static str,
    pub xsrf_token: String,
    pub date: String,
    pub team_name: String,
    pub location_name: String,
    pub notes: String,
    pub items: Vec<ItemView>,
    pub total: String,
}

fn fetch_page(
    state: &AppState,
    params: &PurchaseFilterParams,
) -> AppResult<(Vec<PurchaseRowView>, i64, i64, i64, TableSort<PurchaseSortColumn>)> {
    let conn = state.db.get()?;
    let settings = state.view_settings();

    let sort = params.resolve_sort::<PurchaseSortColumn>();
    let page = params.page.unwrap_or(1).max(1);

    let mut filter = params.to_filter(&sort);
    filter.limit = Some(PAGE_SIZE);
    filter.offset = Some((page - 1) * PAGE_SIZE);

    let list = purchases::list_purchases(&conn, &filter)?;
    let total_count = purchases::count_purchases(&conn, &filter)?;
    let page_count = (total_count + PAGE_SIZE - 1) / PAGE_SIZE;

    Ok((
        purchase_rows(&list, &settings),
        total_count,
        page,
        page_count.max(1),
        sort,
    ))
}

pub async fn index(
    State(state): State<AppState>,
    Query(params): Query<PurchaseFilterParams>,
) -> AppResult<Html<String>> {
    let (rows, total_count, page, page_count, sort) = fetch_page(&state, &params)?;

    let conn = state.db.get()?;
    let template = PurchasesTemplate {
        title: "Purchases".into(),
        settings: state.view_settings(),
        manifest: state.manifest.clone(),
        version: VERSION,
        xsrf_token: state.xsrf_token.value(),
        teams: teams::list_teams(&conn)?,
        purchases: rows,
        total_count,
        page,
        page_count,
        filter: params,
        sort,
    };

    template.render_html()
}

/// HTMX partial: just the table, re-rendered on filter changes.
pub async fn table_partial(
    State(state): State<AppState>,
    Query(params): Query<PurchaseFilterParams>,
) -> AppResult<Html<String>> {
    let (rows, total_count, page, page_count, sort) = fetch_page(&state, &params)?;

    let template = PurchaseTableTemplate {
        purchases: rows,
        total_count,
        page,
        page_count,
        filter: params,
        sort,
    };

    template.render_html()
}

pub async fn new_form(State(state): State<AppState>) -> AppResult<Html<String>> {
    let conn = state.db.get()?;

    let template = PurchaseNewTemplate {
        title: "Register Purchase".into(),
        settings: state.view_settings(),
        manifest: state.manifest.clone(),
        version: VERSION,
        xsrf_token: state.xsrf_token.value(),
        teams: teams::list_teams(&conn)?,
        today: date_utils::today(),
        units: UNITS,
    };

    template.render_html()
}

/// Register a purchase with its line items.
///
/// The raw form pairs are parsed manually because the item rows arrive as
/// parallel arrays. The purchase and all items land in one transaction.
pub async fn create(
    State(state): State<AppState>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> AppResult<Redirect> {
    let new = form_utils::parse_purchase_form(&pairs).map_err(AppError::Validation)?;

    let mut conn = state.db.get()?;

    if teams::get_team(&conn, new.team_id)?.is_none() {
        return Err(AppError::Validation(format!(
            "Unknown team: {}",
            new.team_id
        )));
    }

    let id = purchases::create_purchase(&mut conn, &new)?;
    info!(purchase_id = id, "Purchase registered");

    Ok(Redirect::to(&format!("/purchases/{}", id)))
}

pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Html<String>> {
    let conn = state.db.get()?;
    let settings = state.view_settings();

    let purchase = purchases::get_purchase(&conn, id)?
        .ok_or_else(|| AppError::NotFound(format!("Purchase {} not found", id)))?;

    let template = purchase_detail_template(&purchase, &settings, &state);
    template.render_html()
}

fn purchase_detail_template(
    purchase: &PurchaseWithItems,
    settings: &ViewSettings,
    state: &AppState,
) -> PurchaseDetailTemplate {
    let money = |cents: i64| filters::format_money(cents, &settings.currency, &settings.locale);

    let items = purchase
        .items
        .iter()
        .map(|item| ItemView {
            product_name: item.product_name.clone(),
            quantity: format!(
                "{} {}",
                filters::format_quantity(item.quantity, &settings.locale),
                item.unit_of_measure
            ),
            unit_price: money(item.unit_price_cents),
            subtotal: money(item.subtotal_cents),
            notes: item.notes.clone().unwrap_or_default(),
        })
        .collect();

    PurchaseDetailTemplate {
        title: "Purchase Details".into(),
        settings: settings.clone(),
        manifest: state.manifest.clone(),
        version: VERSION,
        xsrf_token: state.xsrf_token.value(),
        date: date_utils::display_date(&purchase.purchase.purchase_date, &settings.locale),
        team_name: purchase.team_name.clone(),
        location_name: purchase.purchase.location_name.clone(),
        notes: purchase.notes_text().to_string(),
        items,
        total: money(purchase.total_cents()),
    }
}

/// CSV export of the filtered purchase list, one row per line item.
pub async fn export_csv(
    State(state): State<AppState>,
    Query(params): Query<PurchaseFilterParams>,
) -> AppResult<Response> {
    let conn = state.db.get()?;

    let sort = params.resolve_sort::<PurchaseSortColumn>();
    let filter = params.to_filter(&sort);
    let list = purchases::list_purchases(&conn, &filter)?;

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record([
            "date",
            "team",
            "location",
            "product",
            "unit",
            "quantity",
            "unit_price",
            "subtotal",
            "item_notes",
        ])
        .map_err(|e| AppError::Internal(format!("CSV error: {}", e)))?;

    for purchase in &list {
        for item in &purchase.items {
            let quantity = item.quantity.to_string();
            let unit_price = format!("{:.2}", item.unit_price_cents as f64 / 100.0);
            let subtotal = format!("{:.2}", item.subtotal_cents as f64 / 100.0);
            writer
                .write_record([
                    purchase.purchase.purchase_date.as_str(),
                    purchase.team_name.as_str(),
                    purchase.purchase.location_name.as_str(),
                    item.product_name.as_str(),
                    item.unit_of_measure.as_str(),
                    quantity.as_str(),
                    unit_price.as_str(),
                    subtotal.as_str(),
                    item.notes.as_deref().unwrap_or(""),
                ])
                .map_err(|e| AppError::Internal(format!("CSV error: {}", e)))?;
        }
    }

    let data = writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("CSV error: {}", e)))?;

    debug!(purchase_count = list.len(), "Exported purchase CSV");

    let filename = format!("purchases-{}.csv", date_utils::today());
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        data,
    )
        .into_response())
}
