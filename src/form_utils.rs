/// Serde helpers and parsers for HTML form deserialization.
///
/// HTML `<select>` elements with an empty `<option value="">` send an empty
/// string for the field, which `serde_urlencoded` cannot parse as an integer.
/// The registration form additionally posts its line items as parallel
/// `product_name[]`/`quantity[]`/... arrays which have to be zipped back
/// together by index.
use serde::{Deserialize, Deserializer};

use crate::models::{NewPurchase, NewPurchaseItem};

pub fn deserialize_optional_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s.as_deref() {
        None | Some("") => Ok(None),
        Some(v) => v.parse::<i64>().map(Some).map_err(serde::de::Error::custom),
    }
}

/// Parse a money amount like "12.34" (or "12,34") into cents.
pub fn parse_money_cents(s: &str) -> Result<i64, String> {
    let normalized = s.trim().replace(',', ".");
    let value: f64 = normalized
        .parse()
        .map_err(|_| format!("'{}' is not a valid amount", s.trim()))?;
    if !value.is_finite() {
        return Err(format!("'{}' is not a valid amount", s.trim()));
    }
    Ok((value * 100.0).round() as i64)
}

/// Parse a quantity like "2" or "1.5" (or "1,5").
pub fn parse_quantity(s: &str) -> Result<f64, String> {
    let normalized = s.trim().replace(',', ".");
    let value: f64 = normalized
        .parse()
        .map_err(|_| format!("'{}' is not a valid quantity", s.trim()))?;
    if !value.is_finite() {
        return Err(format!("'{}' is not a valid quantity", s.trim()));
    }
    Ok(value)
}

/// Assemble a [`NewPurchase`] from the raw urlencoded key/value pairs of the
/// registration form, validating as it goes.
pub fn parse_purchase_form(pairs: &[(String, String)]) -> Result<NewPurchase, String> {
    let single = |name: &str| -> Option<&str> {
        pairs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    };
    let many = |name: &str| -> Vec<&str> {
        pairs
            .iter()
            .filter(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .collect()
    };

    let purchase_date = single("purchase_date")
        .filter(|v| !v.trim().is_empty())
        .ok_or("Purchase date is required")?
        .to_string();
    if crate::date_utils::parse_ymd(&purchase_date).is_none() {
        return Err(format!("'{}' is not a valid date", purchase_date));
    }

    let team_id: i64 = single("team_id")
        .filter(|v| !v.is_empty())
        .ok_or("Team is required")?
        .parse()
        .map_err(|_| "Team is required".to_string())?;

    let location_name = single("location_name")
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or("Purchase location is required")?
        .to_string();

    let notes = single("notes")
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from);

    let names = many("product_name[]");
    let units = many("unit_of_measure[]");
    let quantities = many("quantity[]");
    let prices = many("unit_price[]");
    let item_notes = many("item_notes[]");

    if names.is_empty() {
        return Err("Add at least one item".into());
    }
    if units.len() != names.len() || quantities.len() != names.len() || prices.len() != names.len()
    {
        return Err("Malformed item rows".into());
    }

    let mut items = Vec::with_capacity(names.len());
    for (idx, name) in names.iter().enumerate() {
        let row = idx + 1;
        let product_name = name.trim();
        if product_name.is_empty() {
            return Err(format!("Item {}: product name is required", row));
        }

        let unit_of_measure = units[idx].trim();
        if unit_of_measure.is_empty() {
            return Err(format!("Item {}: unit of measure is required", row));
        }

        let quantity =
            parse_quantity(quantities[idx]).map_err(|e| format!("Item {}: {}", row, e))?;
        if quantity <= 0.0 {
            return Err(format!("Item {}: quantity must be greater than zero", row));
        }

        let unit_price_cents =
            parse_money_cents(prices[idx]).map_err(|e| format!("Item {}: {}", row, e))?;
        if unit_price_cents <= 0 {
            return Err(format!("Item {}: unit price must be greater than zero", row));
        }

        let notes = item_notes
            .get(idx)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(String::from);

        items.push(NewPurchaseItem {
            product_name: product_name.to_string(),
            unit_of_measure: unit_of_measure.to_string(),
            quantity,
            unit_price_cents,
            notes,
        });
    }

    Ok(NewPurchase {
        purchase_date,
        team_id,
        location_name,
        notes,
        items,
    })
}
