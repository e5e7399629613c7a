use axum::extract::{Query, State};
use axum::response::Json;
use serde::{Deserialize, Serialize};

use crate::db::queries::purchases;
use crate::error::AppResult;
use crate::filters::percent_of;
use crate::form_utils;
use crate::services::reporting;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ReportSeriesParams {
    #[serde(default, deserialize_with = "form_utils::deserialize_optional_i64")]
    pub team_id: Option<i64>,
    pub from_date: Option<String>,
    pub to_date: Option<String>,
}

impl ReportSeriesParams {
    fn to_filter(&self) -> purchases::PurchaseFilter {
        purchases::PurchaseFilter {
            team_id: self.team_id,
            from_date: self.from_date.clone().filter(|v| !v.is_empty()),
            to_date: self.to_date.clone().filter(|v| !v.is_empty()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TeamSpending {
    pub team: String,
    pub total_cents: i64,
    pub percentage: f64,
}

#[derive(Debug, Serialize)]
pub struct ProductSpending {
    pub product: String,
    pub total_cents: i64,
    pub percentage: f64,
}

/// Series for the spending-by-team pie chart.
pub async fn team_spending(
    State(state): State<AppState>,
    Query(params): Query<ReportSeriesParams>,
) -> AppResult<Json<Vec<TeamSpending>>> {
    let conn = state.db.get()?;

    let list = purchases::list_purchases(&conn, &params.to_filter())?;
    let kpis = reporting::kpis(&list);

    let result = reporting::team_totals(&list)
        .into_iter()
        .map(|t| TeamSpending {
            team: t.team_name,
            total_cents: t.total_cents,
            percentage: percent_of(t.total_cents, kpis.total_spend_cents),
        })
        .collect();

    Ok(Json(result))
}

/// Series for the top-ten-products bar chart.
pub async fn top_products(
    State(state): State<AppState>,
    Query(params): Query<ReportSeriesParams>,
) -> AppResult<Json<Vec<ProductSpending>>> {
    let conn = state.db.get()?;

    let list = purchases::list_purchases(&conn, &params.to_filter())?;
    let kpis = reporting::kpis(&list);

    let result = reporting::product_totals(&list)
        .into_iter()
        .map(|p| ProductSpending {
            product: p.product_name,
            total_cents: p.total_cents,
            percentage: percent_of(p.total_cents, kpis.total_spend_cents),
        })
        .collect();

    Ok(Json(result))
}
