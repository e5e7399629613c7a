use crate::date_utils;
use crate::models::{NewPurchase, Purchase, PurchaseItem, PurchaseWithItems};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use tracing::{debug, trace};

#[derive(Default)]
pub struct PurchaseFilter {
    pub team_id: Option<i64>,
    /// Substring match against any item's product name.
    pub product: Option<String>,
    /// Substring match against the location name.
    pub location: Option<String>,
    /// Inclusive lower bound (`YYYY-MM-DD`).
    pub from_date: Option<String>,
    /// Inclusive upper bound (`YYYY-MM-DD`). Internally advanced by one day
    /// and compared with `<` so purchases dated on the end day match.
    pub to_date: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    /// SQL ORDER BY expression. Defaults to "p.purchase_date DESC".
    pub sort_sql: Option<String>,
}

fn push_filter_clauses(
    filter: &PurchaseFilter,
    sql: &mut String,
    params_vec: &mut Vec<Box<dyn rusqlite::ToSql>>,
) {
    if let Some(team_id) = filter.team_id {
        sql.push_str(" AND p.team_id = ?");
        params_vec.push(Box::new(team_id));
    }
    if let Some(ref location) = filter.location {
        sql.push_str(" AND p.location_name LIKE ?");
        params_vec.push(Box::new(format!("%{}%", location)));
    }
    if let Some(ref product) = filter.product {
        sql.push_str(
            " AND EXISTS(SELECT 1 FROM purchase_items pi \
             WHERE pi.purchase_id = p.id AND pi.product_name LIKE ?)",
        );
        params_vec.push(Box::new(format!("%{}%", product)));
    }
    if let Some(ref from_date) = filter.from_date {
        sql.push_str(" AND p.purchase_date >= ?");
        params_vec.push(Box::new(from_date.clone()));
    }
    if let Some(ref to_date) = filter.to_date {
        // Inclusive end: compare strictly below the following day so any
        // time component on the stored date still matches.
        sql.push_str(" AND p.purchase_date < ?");
        params_vec.push(Box::new(date_utils::day_after(to_date)));
    }
}

pub fn list_purchases(
    conn: &Connection,
    filter: &PurchaseFilter,
) -> rusqlite::Result<Vec<PurchaseWithItems>> {
    let mut sql = String::from(
        "SELECT p.id, p.purchase_date, p.team_id, p.location_name, p.notes,
                p.created_at, t.name AS team_name
         FROM purchases p
         JOIN teams t ON p.team_id = t.id
         WHERE 1=1",
    );
    let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    push_filter_clauses(filter, &mut sql, &mut params_vec);

    let order_by = filter.sort_sql.as_deref().unwrap_or("p.purchase_date DESC");
    sql.push_str(&format!(" ORDER BY {}, p.id DESC", order_by));

    if let Some(limit) = filter.limit {
        sql.push_str(" LIMIT ?");
        params_vec.push(Box::new(limit));
    }
    if let Some(offset) = filter.offset {
        sql.push_str(" OFFSET ?");
        params_vec.push(Box::new(offset));
    }

    let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
    let mut stmt = conn.prepare(&sql)?;

    let purchase_iter = stmt.query_map(params_refs.as_slice(), |row| {
        Ok(PurchaseWithItems {
            purchase: Purchase {
                id: row.get(0)?,
                purchase_date: row.get(1)?,
                team_id: row.get(2)?,
                location_name: row.get(3)?,
                notes: row.get(4)?,
                created_at: row.get(5)?,
            },
            team_name: row.get(6)?,
            items: Vec::new(),
        })
    })?;

    let mut purchases: Vec<PurchaseWithItems> = purchase_iter.filter_map(|p| p.ok()).collect();

    let purchase_ids: Vec<i64> = purchases.iter().map(|p| p.purchase.id).collect();
    let mut items_map = get_items_for_purchases(conn, &purchase_ids)?;

    for purchase in &mut purchases {
        purchase.items = items_map.remove(&purchase.purchase.id).unwrap_or_default();
    }

    debug!(count = purchases.len(), "Listed purchases");
    Ok(purchases)
}

pub fn count_purchases(conn: &Connection, filter: &PurchaseFilter) -> rusqlite::Result<i64> {
    let mut sql = String::from("SELECT COUNT(*) FROM purchases p WHERE 1=1");
    let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    push_filter_clauses(filter, &mut sql, &mut params_vec);

    let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
    conn.query_row(&sql, params_refs.as_slice(), |row| row.get(0))
}

pub fn get_purchase(conn: &Connection, id: i64) -> rusqlite::Result<Option<PurchaseWithItems>> {
    trace!(purchase_id = id, "Fetching purchase");
    let purchase = conn
        .query_row(
            "SELECT p.id, p.purchase_date, p.team_id, p.location_name, p.notes,
                    p.created_at, t.name
             FROM purchases p
             JOIN teams t ON p.team_id = t.id
             WHERE p.id = ?",
            [id],
            |row| {
                Ok(PurchaseWithItems {
                    purchase: Purchase {
                        id: row.get(0)?,
                        purchase_date: row.get(1)?,
                        team_id: row.get(2)?,
                        location_name: row.get(3)?,
                        notes: row.get(4)?,
                        created_at: row.get(5)?,
                    },
                    team_name: row.get(6)?,
                    items: Vec::new(),
                })
            },
        )
        .optional()?;

    if let Some(mut p) = purchase {
        p.items = get_purchase_items(conn, id)?;
        Ok(Some(p))
    } else {
        Ok(None)
    }
}

/// Insert a purchase and all of its line items in one transaction.
///
/// Either everything lands or nothing does; a failed item insert can not
/// leave a zero-item purchase behind.
pub fn create_purchase(conn: &mut Connection, new: &NewPurchase) -> rusqlite::Result<i64> {
    let tx = conn.transaction()?;

    tx.execute(
        "INSERT INTO purchases (purchase_date, team_id, location_name, notes)
         VALUES (?, ?, ?, ?)",
        params![
            new.purchase_date,
            new.team_id,
            new.location_name,
            new.notes,
        ],
    )?;

    let id = tx.last_insert_rowid();

    for item in &new.items {
        tx.execute(
            "INSERT INTO purchase_items
             (purchase_id, product_name, unit_of_measure, quantity,
              unit_price_cents, subtotal_cents, notes)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                id,
                item.product_name,
                item.unit_of_measure,
                item.quantity,
                item.unit_price_cents,
                item.subtotal_cents(),
                item.notes,
            ],
        )?;
    }

    tx.commit()?;

    debug!(
        purchase_id = id,
        item_count = new.items.len(),
        "Created purchase"
    );
    Ok(id)
}

fn get_purchase_items(conn: &Connection, purchase_id: i64) -> rusqlite::Result<Vec<PurchaseItem>> {
    let mut stmt = conn.prepare(
        "SELECT id, purchase_id, product_name, unit_of_measure, quantity,
                unit_price_cents, subtotal_cents, notes
         FROM purchase_items
         WHERE purchase_id = ?
         ORDER BY id",
    )?;

    let items = stmt
        .query_map([purchase_id], map_item_row)?
        .filter_map(|i| i.ok())
        .collect();

    Ok(items)
}

fn get_items_for_purchases(
    conn: &Connection,
    purchase_ids: &[i64],
) -> rusqlite::Result<HashMap<i64, Vec<PurchaseItem>>> {
    if purchase_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let placeholders: String = purchase_ids
        .iter()
        .map(|_| "?")
        .collect::<Vec<_>>()
        .join(",");
    let sql = format!(
        "SELECT id, purchase_id, product_name, unit_of_measure, quantity,
                unit_price_cents, subtotal_cents, notes
         FROM purchase_items
         WHERE purchase_id IN ({})
         ORDER BY id",
        placeholders
    );

    let mut stmt = conn.prepare(&sql)?;
    let params: Vec<&dyn rusqlite::ToSql> = purchase_ids
        .iter()
        .map(|id| id as &dyn rusqlite::ToSql)
        .collect();

    let rows = stmt.query_map(params.as_slice(), map_item_row)?;

    let mut items_map: HashMap<i64, Vec<PurchaseItem>> = HashMap::new();
    for item in rows.filter_map(|r| r.ok()) {
        items_map.entry(item.purchase_id).or_default().push(item);
    }

    Ok(items_map)
}

fn map_item_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PurchaseItem> {
    Ok(PurchaseItem {
        id: row.get(0)?,
        purchase_id: row.get(1)?,
        product_name: row.get(2)?,
        unit_of_measure: row.get(3)?,
        quantity: row.get(4)?,
        unit_price_cents: row.get(5)?,
        subtotal_cents: row.get(6)?,
        notes: row.get(7)?,
    })
}
