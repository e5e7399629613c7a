//! Aggregation over fetched purchase records.
//!
//! Everything here is a pure function of the purchase list it is given: the
//! caller applies whatever filter set it wants at the query layer, and every
//! derived view (team totals, product totals, KPIs) is computed from that
//! same list, so displayed percentages always agree with the displayed
//! grand total. Nothing is cached; aggregates are recomputed on every read.

use crate::models::{KpiSet, ProductTotal, PurchaseWithItems, TeamTotal};

/// How many product groups the product breakdown retains.
pub const TOP_PRODUCTS: usize = 10;

/// Spend per team, sorted descending by value.
///
/// Groups accumulate in first-encountered order and the sort is stable, so
/// ties keep that order.
pub fn team_totals(purchases: &[PurchaseWithItems]) -> Vec<TeamTotal> {
    let mut totals: Vec<TeamTotal> = Vec::new();

    for purchase in purchases {
        let total = purchase.total_cents();
        match totals
            .iter_mut()
            .find(|t| t.team_id == purchase.purchase.team_id)
        {
            Some(existing) => existing.total_cents += total,
            None => totals.push(TeamTotal {
                team_id: purchase.purchase.team_id,
                team_name: purchase.team_name.clone(),
                total_cents: total,
            }),
        }
    }

    totals.sort_by(|a, b| b.total_cents.cmp(&a.total_cents));
    totals
}

/// Spend per product name, sorted descending, truncated to the top ten.
///
/// The grouping key is the exact product name string: "Rice" and "rice" are
/// distinct groups, no normalization happens here.
pub fn product_totals(purchases: &[PurchaseWithItems]) -> Vec<ProductTotal> {
    let mut totals: Vec<ProductTotal> = Vec::new();

    for item in purchases.iter().flat_map(|p| p.items.iter()) {
        match totals
            .iter_mut()
            .find(|t| t.product_name == item.product_name)
        {
            Some(existing) => existing.total_cents += item.subtotal_cents,
            None => totals.push(ProductTotal {
                product_name: item.product_name.clone(),
                total_cents: item.subtotal_cents,
            }),
        }
    }

    totals.sort_by(|a, b| b.total_cents.cmp(&a.total_cents));
    totals.truncate(TOP_PRODUCTS);
    totals
}

/// Summary numbers over the same purchase list the other views are built
/// from. An empty list yields an all-zero set, not an error.
pub fn kpis(purchases: &[PurchaseWithItems]) -> KpiSet {
    KpiSet {
        total_spend_cents: purchases.iter().map(|p| p.total_cents()).sum(),
        purchase_count: purchases.len(),
        item_count: purchases.iter().map(|p| p.items.len()).sum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::percent_of;
    use crate::models::{Purchase, PurchaseItem};

    fn purchase(
        id: i64,
        team_id: i64,
        team_name: &str,
        items: Vec<(&str, f64, i64)>,
    ) -> PurchaseWithItems {
        let items = items
            .into_iter()
            .enumerate()
            .map(|(i, (name, quantity, unit_price_cents))| PurchaseItem {
                id: id * 100 + i as i64,
                purchase_id: id,
                product_name: name.into(),
                unit_of_measure: "unit".into(),
                quantity,
                unit_price_cents,
                subtotal_cents: (quantity * unit_price_cents as f64).round() as i64,
                notes: None,
            })
            .collect();

        PurchaseWithItems {
            purchase: Purchase {
                id,
                purchase_date: "2026-05-01".into(),
                team_id,
                location_name: "Market".into(),
                notes: None,
                created_at: "2026-05-01 09:00:00".into(),
            },
            team_name: team_name.into(),
            items,
        }
    }

    #[test]
    fn test_team_totals_and_kpis_scenario() {
        // Two purchases for team A (2 x 5.00 and 1 x 10.00), one for team B.
        let purchases = vec![
            purchase(1, 1, "A", vec![("Rice", 2.0, 500)]),
            purchase(2, 1, "A", vec![("Beans", 1.0, 1000)]),
            purchase(3, 2, "B", vec![("Salt", 1.0, 300)]),
        ];

        let teams = team_totals(&purchases);
        assert_eq!(teams.len(), 2);
        assert_eq!(teams[0].team_name, "A");
        assert_eq!(teams[0].total_cents, 2000);
        assert_eq!(teams[1].team_name, "B");
        assert_eq!(teams[1].total_cents, 300);

        let k = kpis(&purchases);
        assert_eq!(k.total_spend_cents, 2300);
        assert_eq!(k.purchase_count, 3);
        assert_eq!(k.item_count, 3);
    }

    #[test]
    fn test_team_totals_sum_to_kpi_total() {
        let purchases = vec![
            purchase(1, 1, "A", vec![("Rice", 3.0, 499), ("Oil", 1.0, 1250)]),
            purchase(2, 2, "B", vec![("Rice", 2.0, 510)]),
            purchase(3, 3, "C", vec![("Cups", 100.0, 7)]),
        ];

        let teams = team_totals(&purchases);
        let sum: i64 = teams.iter().map(|t| t.total_cents).sum();
        assert_eq!(sum, kpis(&purchases).total_spend_cents);
    }

    #[test]
    fn test_empty_set_yields_empty_aggregates() {
        let purchases: Vec<PurchaseWithItems> = Vec::new();
        assert!(team_totals(&purchases).is_empty());
        assert!(product_totals(&purchases).is_empty());
        assert_eq!(kpis(&purchases), KpiSet::default());
    }

    #[test]
    fn test_percentages_never_nan_on_empty_set() {
        let k = kpis(&[]);
        let p = percent_of(0, k.total_spend_cents);
        assert_eq!(p, 0.0);
        assert!(p.is_finite());
    }

    #[test]
    fn test_product_totals_group_by_exact_name() {
        let purchases = vec![
            purchase(1, 1, "A", vec![("Rice", 1.0, 500), ("rice", 1.0, 300)]),
            purchase(2, 2, "B", vec![("Rice", 1.0, 200)]),
        ];

        let products = product_totals(&purchases);
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].product_name, "Rice");
        assert_eq!(products[0].total_cents, 700);
        assert_eq!(products[1].product_name, "rice");
        assert_eq!(products[1].total_cents, 300);
    }

    #[test]
    fn test_product_totals_truncate_to_top_ten() {
        let items: Vec<(String, f64, i64)> = (0..15)
            .map(|i| (format!("Product {}", i), 1.0, 100 + i as i64))
            .collect();
        let item_refs: Vec<(&str, f64, i64)> =
            items.iter().map(|(n, q, p)| (n.as_str(), *q, *p)).collect();
        let purchases = vec![purchase(1, 1, "A", item_refs)];

        let products = product_totals(&purchases);
        assert_eq!(products.len(), TOP_PRODUCTS);
        // Strictly descending
        for w in products.windows(2) {
            assert!(w[0].total_cents >= w[1].total_cents);
        }
        assert_eq!(products[0].product_name, "Product 14");
    }

    #[test]
    fn test_product_totals_shorter_than_ten_when_fewer_names() {
        let purchases = vec![purchase(1, 1, "A", vec![("Rice", 1.0, 100)])];
        assert_eq!(product_totals(&purchases).len(), 1);
    }

    #[test]
    fn test_descending_sort_ties_keep_first_encountered_order() {
        let purchases = vec![
            purchase(1, 1, "A", vec![("Cups", 1.0, 500)]),
            purchase(2, 2, "B", vec![("Plates", 1.0, 500)]),
            purchase(3, 3, "C", vec![("Napkins", 1.0, 900)]),
        ];

        let teams = team_totals(&purchases);
        assert_eq!(teams[0].team_name, "C");
        assert_eq!(teams[1].team_name, "A");
        assert_eq!(teams[2].team_name, "B");

        let products = product_totals(&purchases);
        assert_eq!(products[0].product_name, "Napkins");
        assert_eq!(products[1].product_name, "Cups");
        assert_eq!(products[2].product_name, "Plates");
    }
}
