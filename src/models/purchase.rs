use serde::{Deserialize, Serialize};

/// One shopping event by a team. Immutable once registered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Purchase {
    pub id: i64,
    /// Purchase date as `YYYY-MM-DD`.
    pub purchase_date: String,
    pub team_id: i64,
    pub location_name: String,
    pub notes: Option<String>,
    pub created_at: String,
}

/// One product bought within a purchase.
///
/// `subtotal_cents` is computed once when the purchase is registered and is
/// authoritative from then on; readers sum the stored value and never
/// recompute `quantity * unit_price_cents`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseItem {
    pub id: i64,
    pub purchase_id: i64,
    pub product_name: String,
    pub unit_of_measure: String,
    pub quantity: f64,
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseWithItems {
    #[serde(flatten)]
    pub purchase: Purchase,
    pub team_name: String,
    pub items: Vec<PurchaseItem>,
}

impl PurchaseWithItems {
    /// Purchase total: the sum of the stored item subtotals.
    pub fn total_cents(&self) -> i64 {
        self.items.iter().map(|i| i.subtotal_cents).sum()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn has_notes(&self) -> bool {
        self.purchase.notes.is_some()
    }

    pub fn notes_text(&self) -> &str {
        self.purchase.notes.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPurchase {
    pub purchase_date: String,
    pub team_id: i64,
    pub location_name: String,
    pub notes: Option<String>,
    pub items: Vec<NewPurchaseItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPurchaseItem {
    pub product_name: String,
    pub unit_of_measure: String,
    pub quantity: f64,
    pub unit_price_cents: i64,
    pub notes: Option<String>,
}

impl NewPurchaseItem {
    /// Subtotal computed at registration time. The rounded result is what
    /// gets persisted; it is never re-derived afterwards.
    pub fn subtotal_cents(&self) -> i64 {
        (self.quantity * self.unit_price_cents as f64).round() as i64
    }
}
