use serde::Serialize;

/// Spend summed over one team's purchases, within the active filter set.
/// Derived on every read, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamTotal {
    pub team_id: i64,
    pub team_name: String,
    pub total_cents: i64,
}

/// Spend summed over items sharing the exact product name. Only the top ten
/// by value are retained for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductTotal {
    pub product_name: String,
    pub total_cents: i64,
}

/// At-a-glance summary numbers for the active filter set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KpiSet {
    pub total_spend_cents: i64,
    pub purchase_count: usize,
    pub item_count: usize,
}
